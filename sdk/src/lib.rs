//! mavgen
//!
//! This crate provides runtime support for working with compiled dialects.
//!
//! - `Value` / `Payload` dynamic field values
//! - `encode_payload` / `decode_payload` driven by a `MessageContract`
//! - `frame_checksum` with the CRC-EXTRA seed folded in
//! - `MavgenError` (re-exported from the compiler)

mod codec;
mod value;

pub use codec::{contracts_to_json, decode_payload, encode_payload, frame_checksum};
pub use mavgen_compiler::error::MavgenError;
pub use mavgen_compiler::{compile, CompiledDialect, CompilerConfig, MessageContract};
pub use mavgen_schema::{Dialect, EnumDef, FieldDecl, MessageDef};
pub use value::{Payload, Value};

/// Decode `bytes` as message `id` of `compiled` into pretty-printed JSON.
pub fn decode_to_json(compiled: &CompiledDialect, id: u32, bytes: &[u8]) -> Result<String, MavgenError> {
    let contract = compiled
        .contract(id)
        .ok_or_else(|| MavgenError::DecodeError(format!("unknown message id {}", id)))?;
    let payload = decode_payload(contract, bytes)?;
    Ok(serde_json::to_string_pretty(&payload)?)
}

pub mod error {
    pub use mavgen_compiler::error::MavgenError;
}

pub mod schema {
    pub use mavgen_schema::{Dialect, EnumDef, EnumEntry, FieldDecl, MessageDef};
}
