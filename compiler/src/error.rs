use thiserror::Error;

#[derive(Debug, Error)]
pub enum MavgenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown type {token} for field {message}.{field}")]
    UnknownType {
        message: String,
        field:   String,
        token:   String,
    },

    #[error("Invalid array length {length} for field {message}.{field}: {reason}")]
    InvalidArrayLength {
        message: String,
        field:   String,
        length:  i64,
        reason:  &'static str,
    },

    #[error("Message id {id} is defined differently by included dialects: {first} and {second}")]
    IdCollision {
        id:     u32,
        first:  String,
        second: String,
    },

    #[error("Enum {enum_name} conflicts on {entry}: {detail}")]
    EnumConflict {
        enum_name: String,
        entry:     String,
        detail:    String,
    },

    #[error("Include cycle: {}", cycle.join(" -> "))]
    CyclicInclude { cycle: Vec<String> },

    #[error("Dialect {dialect} includes unknown dialect {include}")]
    MissingInclude { dialect: String, include: String },

    #[error("Message id {id} is used by both {first} and {second}")]
    DuplicateId {
        id:     u32,
        first:  String,
        second: String,
    },

    #[error("Message {message} declares no fields")]
    EmptyMessage { message: String },

    #[error("Message {message} needs {length} bytes, more than the {max} byte payload limit")]
    PayloadTooLarge {
        message: String,
        length:  usize,
        max:     usize,
    },

    #[error("Message {message} has id {id}, above the protocol limit of {max}")]
    MessageIdOutOfRange { message: String, id: u32, max: u32 },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("Payload encode error: {0}")]
    EncodeError(String),

    #[error("Payload decode error: {0}")]
    DecodeError(String),
}

impl MavgenError {
    /// True for errors describing malformed or contradictory schema input,
    /// as opposed to I/O or payload errors.
    pub fn is_schema_error(&self) -> bool {
        !matches!(
            self,
            MavgenError::Io(_)
                | MavgenError::Json(_)
                | MavgenError::EncodeError(_)
                | MavgenError::DecodeError(_)
        )
    }
}
