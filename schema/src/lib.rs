//! Schema model and wire primitives shared by the mavgen compiler and its
//! runtime. The model is what an external dialect parser (XML, IDL, ...)
//! hands to the compiler; the wire helpers are what generated codecs build
//! on.
//!
//! ```
//! use mavgen_schema::*;
//!
//! let dialect = Dialect::new("minimal").with_message(
//!     MessageDef::new(0, "HEARTBEAT")
//!         .field("uint8_t", "type")
//!         .field("uint32_t", "custom_mode"),
//! );
//! assert_eq!(dialect.message(0).unwrap().fields.len(), 2);
//! assert_eq!(x25(b"123456789"), 0x6F91);
//! ```

pub mod crc;
pub mod model;
pub mod wire;

pub use crc::*;
pub use model::*;
pub use wire::*;

/// Largest payload a MAVLink frame can carry.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Largest message id representable in a MAVLink 1 header.
pub const MAX_MESSAGE_ID_V1: u32 = 0xFF;

/// Largest message id representable in a MAVLink 2 header (24 bits).
pub const MAX_MESSAGE_ID_V2: u32 = 0xFF_FFFF;
