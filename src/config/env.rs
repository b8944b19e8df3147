//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `RELAYLINK_MASTER_TOKEN` - Telegram bot token
//! - `RELAYLINK_OPERATOR_ID` - Telegram user id of the operator
//! - `RELAYLINK_STORE_PATH` - Association store snapshot file

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "RELAYLINK";

/// Apply environment variable overrides to a config.
///
/// This allows the bot token to be provided via the environment instead of
/// the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_MASTER_TOKEN", ENV_PREFIX)) {
        config.master.token = token;
    }

    if let Ok(operator) = env::var(format!("{}_OPERATOR_ID", ENV_PREFIX)) {
        if let Ok(id) = operator.parse() {
            config.master.operator_id = id;
        }
    }

    if let Ok(path) = env::var(format!("{}_STORE_PATH", ENV_PREFIX)) {
        config.store.path = Some(path);
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `RELAYLINK_CONFIG` environment variable, otherwise returns "relaylink.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "relaylink.conf".to_string())
}
