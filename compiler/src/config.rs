use mavgen_schema::{MAX_MESSAGE_ID_V1, MAX_MESSAGE_ID_V2, MAX_PAYLOAD_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MavgenError;

/// Protocol generation the contracts are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

impl ProtocolVersion {
    pub fn max_message_id(self) -> u32 {
        match self {
            ProtocolVersion::V1 => MAX_MESSAGE_ID_V1,
            ProtocolVersion::V2 => MAX_MESSAGE_ID_V2,
        }
    }
}

/// Knobs of a single compiler invocation.
///
/// ```
/// let config: mavgen_compiler::CompilerConfig =
///     serde_json::from_str(r#"{ "protocol": "v1" }"#).unwrap();
/// assert!(!config.allow_empty_messages);
/// assert_eq!(config.max_payload_length, 255);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub protocol:             ProtocolVersion,
    /// Accept messages with no fields (zero-length payloads).
    pub allow_empty_messages: bool,
    pub max_payload_length:   usize,
    /// Strip trailing zero extension bytes when encoding.
    pub truncate_extensions:  bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            protocol:             ProtocolVersion::V2,
            allow_empty_messages: false,
            max_payload_length:   MAX_PAYLOAD_LEN,
            truncate_extensions:  true,
        }
    }
}

impl CompilerConfig {
    pub fn from_json(text: &str) -> Result<Self, MavgenError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, MavgenError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn max_message_id(&self) -> u32 {
        self.protocol.max_message_id()
    }
}
