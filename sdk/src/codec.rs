//! Dynamic payload codec driven by a [`MessageContract`].
//!
//! Fields are written little-endian at their contract offsets. Receivers
//! zero-fill short payloads, so a sender may strip trailing zero bytes of
//! the extension region.

use mavgen_compiler::{CompiledDialect, MavgenError, MessageContract, Primitive, ResolvedType};
use mavgen_schema::{OutOfBounds, PayloadReader, PayloadWriter, X25};
use tracing::{debug, trace};

use crate::value::{Payload, Value};

fn encode_error(message: &str, field: &str, detail: impl std::fmt::Display) -> MavgenError {
    MavgenError::EncodeError(format!("{}.{}: {}", message, field, detail))
}

fn bounds<'a>(message: &'a str, field: &'a str) -> impl Fn(OutOfBounds) -> MavgenError + 'a {
    move |e| encode_error(message, field, e)
}

/// Encodes `payload` with the layout of `contract`. Fields missing from
/// `payload` encode as zero. With `truncate`, trailing zero bytes past
/// `base_length` are dropped.
pub fn encode_payload(
    contract: &MessageContract,
    payload: &Payload,
    truncate: bool,
) -> Result<Vec<u8>, MavgenError> {
    if let Some(unknown) = payload.keys().find(|name| contract.field(name).is_none()) {
        return Err(encode_error(contract.name(), unknown, "no such field"));
    }

    let mut writer = PayloadWriter::new(contract.total_length());
    for entry in contract.fields() {
        let Some(value) = payload.get(entry.name()) else {
            continue;
        };
        let scope = Scope { message: contract.name(), field: entry.name() };
        match entry.resolved() {
            ResolvedType::Scalar(primitive) => {
                scope.write_scalar(&mut writer, primitive, entry.offset(), value)?;
            }
            ResolvedType::Array { element, length } => {
                scope.write_array(&mut writer, element, length as usize, entry.offset(), value)?;
            }
        }
    }

    let bytes = if truncate {
        writer.truncated(contract.base_length())
    } else {
        writer.data()
    };
    trace!(message = contract.name(), length = bytes.len(), "encoded payload");
    Ok(bytes)
}

struct Scope<'a> {
    message: &'a str,
    field:   &'a str,
}

impl Scope<'_> {
    fn error(&self, detail: impl std::fmt::Display) -> MavgenError {
        encode_error(self.message, self.field, detail)
    }

    fn unsigned<T: TryFrom<u64>>(&self, value: &Value) -> Result<T, MavgenError> {
        value
            .as_u64()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| self.error(format!("{} is out of range", value)))
    }

    fn signed<T: TryFrom<i64>>(&self, value: &Value) -> Result<T, MavgenError> {
        value
            .as_i64()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| self.error(format!("{} is out of range", value)))
    }

    fn float(&self, value: &Value) -> Result<f64, MavgenError> {
        value.as_f64().ok_or_else(|| self.error(format!("{} is not a number", value)))
    }

    fn write_scalar(
        &self,
        writer: &mut PayloadWriter,
        primitive: Primitive,
        offset: usize,
        value: &Value,
    ) -> Result<(), MavgenError> {
        let oob = bounds(self.message, self.field);
        match primitive {
            Primitive::Char => {
                let byte = match value {
                    Value::Text(text) if text.len() <= 1 => text.bytes().next().unwrap_or(0),
                    other => self.unsigned::<u8>(other)?,
                };
                writer.write_u8(offset, byte).map_err(oob)
            }
            Primitive::UInt8 | Primitive::MavlinkVersion => writer.write_u8(offset, self.unsigned(value)?).map_err(oob),
            Primitive::Int8 => writer.write_i8(offset, self.signed(value)?).map_err(oob),
            Primitive::UInt16 => writer.write_u16(offset, self.unsigned(value)?).map_err(oob),
            Primitive::Int16 => writer.write_i16(offset, self.signed(value)?).map_err(oob),
            Primitive::UInt32 => writer.write_u32(offset, self.unsigned(value)?).map_err(oob),
            Primitive::Int32 => writer.write_i32(offset, self.signed(value)?).map_err(oob),
            Primitive::UInt64 => writer.write_u64(offset, self.unsigned(value)?).map_err(oob),
            Primitive::Int64 => writer.write_i64(offset, self.signed(value)?).map_err(oob),
            Primitive::Float => writer.write_f32(offset, self.float(value)? as f32).map_err(oob),
            Primitive::Double => writer.write_f64(offset, self.float(value)?).map_err(oob),
        }
    }

    fn write_array(
        &self,
        writer: &mut PayloadWriter,
        element: Primitive,
        length: usize,
        offset: usize,
        value: &Value,
    ) -> Result<(), MavgenError> {
        match value {
            Value::Text(text) if element == Primitive::Char => {
                if text.len() > length {
                    return Err(self.error(format!("{} bytes do not fit char[{}]", text.len(), length)));
                }
                writer
                    .write_bytes(offset, text.as_bytes())
                    .map_err(bounds(self.message, self.field))
            }
            Value::Array(items) => {
                if items.len() > length {
                    return Err(self.error(format!("{} items do not fit [{}]", items.len(), length)));
                }
                for (i, item) in items.iter().enumerate() {
                    self.write_scalar(writer, element, offset + i * element.size(), item)?;
                }
                Ok(())
            }
            other => Err(self.error(format!("expected an array, got {}", other))),
        }
    }
}

/// Decodes `bytes` with the layout of `contract`. Short payloads are
/// zero-filled up to `total_length`. Bytes past `total_length` belong to
/// extensions this contract does not know and are ignored.
pub fn decode_payload(contract: &MessageContract, bytes: &[u8]) -> Result<Payload, MavgenError> {
    if bytes.len() > contract.total_length() {
        debug!(
            message = contract.name(),
            ignored = bytes.len() - contract.total_length(),
            "payload carries unknown extension bytes"
        );
    }

    let reader = PayloadReader::new(bytes, contract.total_length());
    let mut payload = Payload::new();
    for entry in contract.fields() {
        let value = match entry.resolved() {
            ResolvedType::Scalar(primitive) => read_scalar(&reader, primitive, entry.offset()),
            ResolvedType::Array { element: Primitive::Char, length } => reader
                .read_bytes(entry.offset(), length as usize)
                .map(decode_text),
            ResolvedType::Array { element, length } => (0..length as usize)
                .map(|i| read_scalar(&reader, element, entry.offset() + i * element.size()))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
        .map_err(|e| MavgenError::DecodeError(format!("{}.{}: {}", contract.name(), entry.name(), e)))?;
        payload.insert(entry.name().to_string(), value);
    }

    trace!(
        message = contract.name(),
        length = bytes.len(),
        zero_filled = reader.was_zero_filled(),
        "decoded payload"
    );
    Ok(payload)
}

/// `char[N]` up to the first NUL as text. Bytes that are not UTF-8 come
/// back as the raw array so they encode to the same payload.
fn decode_text(raw: &[u8]) -> Value {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    match std::str::from_utf8(&raw[..end]) {
        Ok(text) => Value::Text(text.to_string()),
        Err(_) => Value::Array(raw.iter().map(|&b| Value::UInt(b as u64)).collect()),
    }
}

fn read_scalar(reader: &PayloadReader, primitive: Primitive, offset: usize) -> Result<Value, OutOfBounds> {
    Ok(match primitive {
        Primitive::Char => match reader.read_u8(offset)? {
            0 => Value::Text(String::new()),
            byte if byte.is_ascii() => Value::Text(char::from(byte).to_string()),
            byte => Value::UInt(byte as u64),
        },
        Primitive::UInt8 | Primitive::MavlinkVersion => Value::UInt(reader.read_u8(offset)? as u64),
        Primitive::Int8 => Value::Int(reader.read_i8(offset)? as i64),
        Primitive::UInt16 => Value::UInt(reader.read_u16(offset)? as u64),
        Primitive::Int16 => Value::Int(reader.read_i16(offset)? as i64),
        Primitive::UInt32 => Value::UInt(reader.read_u32(offset)? as u64),
        Primitive::Int32 => Value::Int(reader.read_i32(offset)? as i64),
        Primitive::UInt64 => Value::UInt(reader.read_u64(offset)?),
        Primitive::Int64 => Value::Int(reader.read_i64(offset)?),
        Primitive::Float => Value::Float(reader.read_f32(offset)?),
        Primitive::Double => Value::Double(reader.read_f64(offset)?),
    })
}

/// Frame checksum: X.25 over header and payload bytes with the message's
/// CRC-EXTRA folded in last.
pub fn frame_checksum(header_and_payload: &[u8], crc_extra: u8) -> u16 {
    let mut crc = X25::new();
    crc.accumulate_bytes(header_and_payload);
    crc.accumulate(crc_extra);
    crc.value()
}

/// Pretty-printed JSON of every contract in `compiled`.
pub fn contracts_to_json(compiled: &CompiledDialect) -> Result<String, MavgenError> {
    Ok(serde_json::to_string_pretty(compiled)?)
}
