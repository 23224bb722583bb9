//! mavgen-compiler
//!
//! This crate implements:
//!  1) Include resolution and merging of dialects (`merge`),
//!  2) A dialect verifier (enum values, bitmask flags, field bindings),
//!  3) Wire layout resolution and CRC-EXTRA derivation,
//!  4) The contract builder (`compile` / `build`) producing `CompiledDialect`,
//!  5) Code generation (`compile_dialect_to_rust` → `String`),
//!  6) Error types (`MavgenError`) and `CompilerConfig`.

pub mod error;
pub mod config;
pub mod types;
pub mod utils;
pub mod registry;
pub mod merger;
pub mod verifier;
pub mod layout;
pub mod checksum;
pub mod compiler;
pub mod gen_rust;

pub use checksum::derive_seed;
pub use compiler::{build, build_with, compile};
pub use config::{CompilerConfig, ProtocolVersion};
pub use error::MavgenError;
pub use gen_rust::compile_dialect_to_rust;
pub use layout::{layout, LayoutEntry, MessageLayout};
pub use merger::merge;
pub use registry::{Primitive, ResolvedType, TypeRegistry};
pub use types::{CompiledDialect, MessageContract};
pub use verifier::verify_dialect;
