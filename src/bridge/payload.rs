//! Encoding of the state carried through the master transport.
//!
//! Inline button payloads have the form `<candidate id><SEP><label>` for a
//! chat choice and `<candidate id><SEP><label><SEP><verb>` for an action on
//! that chat. Telegram limits callback data to 64 bytes, so labels are
//! truncated to leave room for the longest verb.
//!
//! Deep-link start parameters carry the candidate id as unpadded URL-safe
//! base64, since Telegram only allows `[A-Za-z0-9_-]` there.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::common::types::QualifiedChatId;

/// Field separator inside callback payloads.
pub const FIELD_SEPARATOR: char = '\x1f';

/// Callback payload of every Cancel button.
pub const CANCEL: &str = "cancel";

/// Action verb for removing an association.
pub const UNLINK_VERB: &str = "Unlink";

/// Maximum callback data length accepted by Telegram, in bytes.
pub const MAX_CALLBACK_LEN: usize = 64;

/// A decoded callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Cancel,
    /// A chat was picked from the list.
    Choice {
        candidate: QualifiedChatId,
        label: String,
    },
    /// An action button on the confirmation step.
    Action {
        candidate: QualifiedChatId,
        label: String,
        verb: String,
    },
    Malformed,
}

impl Payload {
    pub fn decode(data: &str) -> Self {
        if data == CANCEL {
            return Payload::Cancel;
        }

        let fields: Vec<&str> = data.split(FIELD_SEPARATOR).collect();
        let Some(candidate) = fields.first().and_then(|id| QualifiedChatId::parse(id)) else {
            return Payload::Malformed;
        };

        match fields.as_slice() {
            [_, label] => Payload::Choice {
                candidate,
                label: label.to_string(),
            },
            [_, label, verb] => Payload::Action {
                candidate,
                label: label.to_string(),
                verb: verb.to_string(),
            },
            _ => Payload::Malformed,
        }
    }
}

/// Payload for picking `candidate` from the chat list.
///
/// Separators in the label become spaces, and the label is cut so that
/// appending an action verb later still fits the callback limit. Returns
/// None when the id alone is too long.
pub fn encode_choice(candidate: &QualifiedChatId, label: &str) -> Option<String> {
    let id = candidate.to_string();
    let reserved = id.len() + 2 * FIELD_SEPARATOR.len_utf8() + UNLINK_VERB.len();
    if reserved > MAX_CALLBACK_LEN {
        return None;
    }

    let label = label.replace(FIELD_SEPARATOR, " ");
    let label = truncate_bytes(&label, MAX_CALLBACK_LEN - reserved);
    Some(format!("{}{}{}", id, FIELD_SEPARATOR, label))
}

/// Payload for applying `verb` to a previously chosen chat.
pub fn encode_action(choice: &str, verb: &str) -> String {
    format!("{}{}{}", choice, FIELD_SEPARATOR, verb)
}

/// Start parameter for the group deep link.
pub fn encode_start_param(candidate: &QualifiedChatId) -> String {
    URL_SAFE_NO_PAD.encode(candidate.to_string())
}

/// Decode a `/start` argument. Accepts the base64 form produced by
/// [`encode_start_param`] and a raw qualified id typed by hand.
pub fn decode_start_param(arg: &str) -> Option<QualifiedChatId> {
    let arg = arg.trim();
    URL_SAFE_NO_PAD
        .decode(arg)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|decoded| QualifiedChatId::parse(&decoded))
        .or_else(|| QualifiedChatId::parse(arg))
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char
/// boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
