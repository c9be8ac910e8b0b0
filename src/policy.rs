//! Process-wide runtime policy: logging, error trailers, configuration paths.

mod env;
mod model;

pub use env::{
    configure_policy_from_env, ENV_CONFIG_PATHS, ENV_JSON_ERRORS, ENV_LOG_FILE, ENV_LOG_LEVEL,
};
pub use model::{configure_policy, policy_snapshot, PolicyPath, PolicyUpdate, StreamConfigPolicy};

#[cfg(test)]
pub(crate) use model::{policy_test_guard, reset_policy_for_tests};
