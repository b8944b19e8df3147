//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_MESSAGE_LOG_LIMIT;

    #[test]
    fn test_minimal_config() {
        let config = load_config_str(
            r#"
            master {
                token = "123:abc"
                operator_id = 42
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.master.token, "123:abc");
        assert_eq!(config.master.operator_id, 42);
        assert!(config.master.admins.is_empty());
        assert!(config.store.path.is_none());
        assert_eq!(config.store.message_log_limit, DEFAULT_MESSAGE_LOG_LIMIT);
        assert!(config.sessions.ttl_secs.is_none());
        assert!(config.formats.linked_group.contains("%message"));
        assert!(!config.loopback_enabled());
    }

    #[test]
    fn test_full_config() {
        let config = load_config_str(
            r#"
            master {
                token = "123:abc"
                operator_id = 42
                admins = [7, 42]
            }
            store {
                path = "relaylink.json"
                message_log_limit = 50
            }
            sessions.ttl_secs = 600
            slaves.loopback {
                enabled = true
                chats = [
                    { uid = "alice", name = "Alice" }
                    { uid = "crew", name = "Crew", alias = "The Crew", type = "group" }
                ]
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.store.path.as_deref(), Some("relaylink.json"));
        assert_eq!(config.store.message_log_limit, 50);
        assert_eq!(config.sessions.ttl_secs, Some(600));
        assert!(config.loopback_enabled());

        let chats = &config.slaves.loopback.as_ref().unwrap().chats;
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].chat_type, "user");
        assert_eq!(chats[1].alias.as_deref(), Some("The Crew"));
        assert_eq!(chats[1].chat_type, "group");

        assert_eq!(config.allowed_users(), vec![42, 7]);
    }

    #[test]
    fn test_missing_master_section_fails() {
        let result = load_config_str("store { path = \"x.json\" }");
        assert!(result.is_err());
    }
}
