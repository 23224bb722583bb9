//! Canonical primitive types and the immutable table that maps declared
//! type tokens onto them.

use lazy_static::lazy_static;
use mavgen_schema::{FieldDecl, MessageDef, MAX_PAYLOAD_LEN};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::MavgenError;

/// Closed set of wire primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    /// `uint8_t_mavlink_version`: a `uint8_t` whose value is the dialect version.
    MavlinkVersion,
}

impl Primitive {
    pub const ALL: [Primitive; 12] = [
        Primitive::Char,
        Primitive::Int8,
        Primitive::UInt8,
        Primitive::Int16,
        Primitive::UInt16,
        Primitive::Int32,
        Primitive::UInt32,
        Primitive::Int64,
        Primitive::UInt64,
        Primitive::Float,
        Primitive::Double,
        Primitive::MavlinkVersion,
    ];

    pub fn size(self) -> usize {
        match self {
            Primitive::Char | Primitive::Int8 | Primitive::UInt8 | Primitive::MavlinkVersion => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Int32 | Primitive::UInt32 | Primitive::Float => 4,
            Primitive::Int64 | Primitive::UInt64 | Primitive::Double => 8,
        }
    }

    /// Natural alignment. The wire layout is pad-free, so this only matters
    /// to emitters that map payloads onto native structs.
    pub fn alignment(self) -> usize {
        self.size()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::Float
                | Primitive::Double
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }

    pub fn is_integer(self) -> bool {
        !self.is_float() && self != Primitive::Char
    }

    /// Spelling used in dialect files.
    pub fn token(self) -> &'static str {
        match self {
            Primitive::Char           => "char",
            Primitive::Int8           => "int8_t",
            Primitive::UInt8          => "uint8_t",
            Primitive::Int16          => "int16_t",
            Primitive::UInt16         => "uint16_t",
            Primitive::Int32          => "int32_t",
            Primitive::UInt32         => "uint32_t",
            Primitive::Int64          => "int64_t",
            Primitive::UInt64         => "uint64_t",
            Primitive::Float          => "float",
            Primitive::Double         => "double",
            Primitive::MavlinkVersion => "uint8_t_mavlink_version",
        }
    }

    /// Spelling folded into CRC-EXTRA.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Primitive::MavlinkVersion => "uint8_t",
            other => other.token(),
        }
    }
}

/// A field type bound to a primitive, optionally as a fixed-length array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedType {
    Scalar(Primitive),
    Array { element: Primitive, length: u8 },
}

impl ResolvedType {
    pub fn element(&self) -> Primitive {
        match *self {
            ResolvedType::Scalar(p) => p,
            ResolvedType::Array { element, .. } => element,
        }
    }

    pub fn element_size(&self) -> usize {
        self.element().size()
    }

    /// Declared array length, `None` for scalars.
    pub fn array_length(&self) -> Option<u8> {
        match *self {
            ResolvedType::Scalar(_) => None,
            ResolvedType::Array { length, .. } => Some(length),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ResolvedType::Array { .. })
    }

    /// Bytes occupied on the wire: `element_size * max(length, 1)`.
    pub fn wire_size(&self) -> usize {
        self.element_size() * self.array_length().map_or(1, |n| n.max(1) as usize)
    }

    /// A `char[N]` field, carried as a NUL-padded string.
    pub fn is_string(&self) -> bool {
        matches!(self, ResolvedType::Array { element: Primitive::Char, .. })
    }
}

lazy_static! {
    static ref ARRAY_SUFFIX: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\[\s*(-?\d+)\s*\]\s*$").unwrap();
    static ref GLOBAL: TypeRegistry = TypeRegistry::with_primitives();
}

/// Maps declared type tokens to primitives. Populated once and immutable.
#[derive(Debug)]
pub struct TypeRegistry {
    primitives: HashMap<&'static str, Primitive>,
}

impl TypeRegistry {
    fn with_primitives() -> Self {
        let mut primitives = HashMap::new();
        for p in Primitive::ALL {
            primitives.insert(p.token(), p);
        }
        // Spellings accepted by older dialect files.
        primitives.insert("int8", Primitive::Int8);
        primitives.insert("uint8", Primitive::UInt8);
        primitives.insert("int16", Primitive::Int16);
        primitives.insert("uint16", Primitive::UInt16);
        primitives.insert("int32", Primitive::Int32);
        primitives.insert("uint32", Primitive::UInt32);
        primitives.insert("int64", Primitive::Int64);
        primitives.insert("uint64", Primitive::UInt64);
        TypeRegistry { primitives }
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    pub fn lookup(&self, token: &str) -> Option<Primitive> {
        self.primitives.get(token.trim()).copied()
    }

    /// Resolves a bare or suffixed (`char[16]`) token.
    pub fn resolve(&self, token: &str) -> Result<ResolvedType, MavgenError> {
        self.resolve_in(token, "", "")
    }

    fn resolve_in(&self, token: &str, message: &str, field: &str) -> Result<ResolvedType, MavgenError> {
        let unknown = || MavgenError::UnknownType {
            message: message.to_string(),
            field:   field.to_string(),
            token:   token.to_string(),
        };

        if let Some(caps) = ARRAY_SUFFIX.captures(token) {
            let element = self.lookup(&caps[1]).ok_or_else(unknown)?;
            let length: i64 = caps[2].parse().map_err(|_| MavgenError::InvalidArrayLength {
                message: message.to_string(),
                field:   field.to_string(),
                length:  i64::MAX,
                reason:  "length does not fit in an integer",
            })?;
            return check_array(ResolvedType::Scalar(element), length, message, field);
        }

        self.lookup(token).map(ResolvedType::Scalar).ok_or_else(unknown)
    }

    /// Turns a scalar into an array of `length` elements.
    pub fn validate_array(&self, resolved: ResolvedType, length: i64) -> Result<ResolvedType, MavgenError> {
        check_array(resolved, length, "", "")
    }

    /// Resolves the declared type of `field` of `message`, applying the
    /// declared array length. A declared length of 0 marks a scalar.
    pub fn bind(&self, message: &MessageDef, field: &FieldDecl) -> Result<ResolvedType, MavgenError> {
        let resolved = self.resolve_in(&field.type_token, &message.name, &field.name)?;
        match (resolved, field.array_length) {
            (_, None) | (_, Some(0)) => Ok(resolved),
            // `char[16]` with array_length 16 says the same thing twice.
            (ResolvedType::Array { length, .. }, Some(declared)) if declared == length as i64 => Ok(resolved),
            (_, Some(declared)) => check_array(resolved, declared, &message.name, &field.name),
        }
    }
}

fn check_array(resolved: ResolvedType, length: i64, message: &str, field: &str) -> Result<ResolvedType, MavgenError> {
    let invalid = |reason| MavgenError::InvalidArrayLength {
        message: message.to_string(),
        field:   field.to_string(),
        length,
        reason,
    };

    let element = match resolved {
        ResolvedType::Scalar(p) => p,
        ResolvedType::Array { .. } => return Err(invalid("element is already an array")),
    };
    if length <= 0 {
        return Err(invalid("length must be positive"));
    }
    if length > MAX_PAYLOAD_LEN as i64 {
        return Err(invalid("length exceeds 255"));
    }
    Ok(ResolvedType::Array { element, length: length as u8 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> &'static TypeRegistry {
        TypeRegistry::global()
    }

    #[test]
    fn resolves_every_primitive_token() {
        for p in Primitive::ALL {
            assert_eq!(registry().resolve(p.token()).unwrap(), ResolvedType::Scalar(p));
        }
    }

    #[test]
    fn sizes_and_signedness() {
        assert_eq!(Primitive::Char.size(), 1);
        assert_eq!(Primitive::UInt16.size(), 2);
        assert_eq!(Primitive::Float.size(), 4);
        assert_eq!(Primitive::Double.alignment(), 8);
        assert!(Primitive::Int32.is_signed());
        assert!(!Primitive::UInt64.is_signed());
        assert!(Primitive::MavlinkVersion.is_integer());
        assert!(!Primitive::Char.is_integer());
        assert_eq!(Primitive::MavlinkVersion.canonical_name(), "uint8_t");
    }

    #[test]
    fn resolves_suffixed_arrays() {
        assert_eq!(
            registry().resolve("char[16]").unwrap(),
            ResolvedType::Array { element: Primitive::Char, length: 16 }
        );
        assert_eq!(
            registry().resolve("float[ 4 ]").unwrap().wire_size(),
            16
        );
    }

    #[test]
    fn unknown_type() {
        assert!(matches!(
            registry().resolve("uint128_t"),
            Err(MavgenError::UnknownType { token, .. }) if token == "uint128_t"
        ));
        assert!(matches!(
            registry().resolve("vec3[2]"),
            Err(MavgenError::UnknownType { .. })
        ));
    }

    #[test]
    fn validate_array_rejects_bad_lengths() {
        let scalar = ResolvedType::Scalar(Primitive::UInt8);
        assert!(registry().validate_array(scalar, 0).is_err());
        assert!(registry().validate_array(scalar, -3).is_err());
        assert!(registry().validate_array(scalar, 256).is_err());
        assert!(registry().validate_array(scalar, 255).is_ok());

        let array = registry().validate_array(scalar, 4).unwrap();
        assert!(matches!(
            registry().validate_array(array, 2),
            Err(MavgenError::InvalidArrayLength { reason: "element is already an array", .. })
        ));
    }

    #[test]
    fn bind_reports_field_identity() {
        let message = MessageDef::new(1, "SYS_STATUS").array("uint16_t", "load", -3);
        match registry().bind(&message, &message.fields[0]) {
            Err(MavgenError::InvalidArrayLength { message, field, length, .. }) => {
                assert_eq!(message, "SYS_STATUS");
                assert_eq!(field, "load");
                assert_eq!(length, -3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bind_accepts_matching_suffix_and_rejects_nesting() {
        let message = MessageDef::new(1, "NAMED")
            .array("char[10]", "name", 10)
            .array("char[10]", "bad", 4);
        assert_eq!(
            registry().bind(&message, &message.fields[0]).unwrap(),
            ResolvedType::Array { element: Primitive::Char, length: 10 }
        );
        assert!(registry().bind(&message, &message.fields[1]).is_err());
    }

    #[test]
    fn zero_array_length_is_a_scalar() {
        let message: MessageDef = serde_json::from_str(
            r#"{ "id": 1, "name": "M", "fields": [
                { "type": "uint8_t", "name": "a", "array_length": 0 },
                { "type": "char[8]", "name": "b", "array_length": 0 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(
            registry().bind(&message, &message.fields[0]).unwrap(),
            ResolvedType::Scalar(Primitive::UInt8)
        );
        assert_eq!(
            registry().bind(&message, &message.fields[1]).unwrap(),
            ResolvedType::Array { element: Primitive::Char, length: 8 }
        );
        assert!(registry().validate_array(ResolvedType::Scalar(Primitive::UInt8), 0).is_err());
    }
}
