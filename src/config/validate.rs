//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::collections::HashSet;

use crate::bridge::payload::FIELD_SEPARATOR;
use crate::common::error::ConfigError;
use crate::common::types::ChatSource;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Master bot
    if config.master.token.is_empty() {
        errors.push("master.token is required".to_string());
    }
    if config.master.token == "YOUR_BOT_TOKEN_HERE" {
        errors.push("master.token has not been configured (still using placeholder)".to_string());
    }
    if config.master.operator_id == 0 {
        errors.push("master.operator_id must be non-zero".to_string());
    }

    // Formats
    let formats = [
        ("formats.linked_group", &config.formats.linked_group),
        ("formats.unlinked_group", &config.formats.unlinked_group),
        ("formats.unlinked_direct", &config.formats.unlinked_direct),
    ];
    for (field, format) in formats {
        if !format.contains("%message") {
            errors.push(format!("{} must contain the %message placeholder", field));
        }
    }

    // Store
    if config.store.message_log_limit == 0 {
        errors.push("store.message_log_limit must be non-zero".to_string());
    }

    // Loopback chats
    if let Some(ref loopback) = config.slaves.loopback {
        let mut seen = HashSet::new();
        for (i, chat) in loopback.chats.iter().enumerate() {
            if chat.uid.is_empty() {
                errors.push(format!("slaves.loopback.chats[{}].uid is required", i));
            }
            if chat.uid.contains(FIELD_SEPARATOR) {
                errors.push(format!(
                    "slaves.loopback.chats[{}].uid contains a control character",
                    i
                ));
            }
            if !seen.insert(chat.uid.as_str()) {
                errors.push(format!(
                    "slaves.loopback.chats[{}].uid '{}' is duplicated",
                    i, chat.uid
                ));
            }
            if ChatSource::from_name(&chat.chat_type).is_none() {
                errors.push(format!(
                    "slaves.loopback.chats[{}].type '{}' is invalid (use: user, group, system, unknown)",
                    i, chat.chat_type
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
