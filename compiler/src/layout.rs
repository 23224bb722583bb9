//! Wire-order resolution.
//!
//! Base fields are stably sorted by descending element size, extension
//! fields follow in declaration order. Offsets are a running sum of field
//! sizes with no padding.

use mavgen_schema::{FieldDecl, MessageDef};
use serde::Serialize;
use tracing::trace;

use crate::{
    config::CompilerConfig,
    error::MavgenError,
    registry::{Primitive, ResolvedType, TypeRegistry},
};

/// One field at its resolved wire position. Only [`layout`] builds these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    name:           String,
    #[serde(rename = "type")]
    resolved:       ResolvedType,
    offset:         usize,
    extension:      bool,
    declared_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    enum_name:      Option<String>,
}

impl LayoutEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolved(&self) -> ResolvedType {
        self.resolved
    }

    pub fn primitive(&self) -> Primitive {
        self.resolved.element()
    }

    /// Array length, `None` for scalars.
    pub fn array_length(&self) -> Option<u8> {
        self.resolved.array_length()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes this field occupies on the wire.
    pub fn size(&self) -> usize {
        self.resolved.wire_size()
    }

    pub fn end(&self) -> usize {
        self.offset + self.size()
    }

    pub fn is_extension(&self) -> bool {
        self.extension
    }

    /// Position of the field in the dialect, independent of wire order.
    pub fn declared_index(&self) -> usize {
        self.declared_index
    }

    pub fn enum_name(&self) -> Option<&str> {
        self.enum_name.as_deref()
    }
}

/// Resolved wire layout of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageLayout {
    entries:      Vec<LayoutEntry>,
    base_length:  usize,
    total_length: usize,
}

impl MessageLayout {
    /// All entries in wire order: base fields first, then extensions.
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn base_entries(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.iter().filter(|e| !e.extension)
    }

    pub fn extension_entries(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.iter().filter(|e| e.extension)
    }

    /// Sum of base field sizes: the shortest payload a MAVLink 1 peer sends.
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Sum of all field sizes including extensions.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub(crate) fn into_parts(self) -> (Vec<LayoutEntry>, usize, usize) {
        (self.entries, self.base_length, self.total_length)
    }
}

/// Resolves the wire layout of `message`.
pub fn layout(
    message: &MessageDef,
    registry: &TypeRegistry,
    config: &CompilerConfig,
) -> Result<MessageLayout, MavgenError> {
    // Everything from the first extension marker on is an extension.
    let split = message
        .fields
        .iter()
        .position(|f| f.extension)
        .unwrap_or(message.fields.len());

    // No base fields means a zero base length, whatever follows.
    if split == 0 && !config.allow_empty_messages {
        return Err(MavgenError::EmptyMessage { message: message.name.clone() });
    }

    let mut base       = Vec::with_capacity(split);
    let mut extensions = Vec::with_capacity(message.fields.len() - split);
    for (index, field) in message.fields.iter().enumerate() {
        let resolved = registry.bind(message, field)?;
        let slot = (index, field, resolved);
        if index < split {
            base.push(slot);
        } else {
            extensions.push(slot);
        }
    }

    // `sort_by` is stable: equal sizes keep declaration order.
    base.sort_by(|a, b| b.2.element_size().cmp(&a.2.element_size()));

    let mut entries = Vec::with_capacity(message.fields.len());
    let mut cursor  = 0;
    let mut place = |(index, field, resolved): (usize, &FieldDecl, ResolvedType), extension: bool| {
        entries.push(LayoutEntry {
            name: field.name.clone(),
            resolved,
            offset: cursor,
            extension,
            declared_index: index,
            enum_name: field.enum_name.clone(),
        });
        cursor += resolved.wire_size();
        cursor
    };

    let mut base_length = 0;
    for slot in base {
        base_length = place(slot, false);
    }
    let mut total_length = base_length;
    for slot in extensions {
        total_length = place(slot, true);
    }

    if total_length > config.max_payload_length {
        return Err(MavgenError::PayloadTooLarge {
            message: message.name.clone(),
            length:  total_length,
            max:     config.max_payload_length,
        });
    }

    trace!(
        message = %message.name,
        base_length,
        total_length,
        "resolved layout"
    );

    Ok(MessageLayout { entries, base_length, total_length })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(message: &MessageDef) -> MessageLayout {
        layout(message, TypeRegistry::global(), &CompilerConfig::default()).unwrap()
    }

    fn order(layout: &MessageLayout) -> Vec<(&str, usize)> {
        layout.entries().iter().map(|e| (e.name(), e.offset())).collect()
    }

    #[test]
    fn heartbeat_equivalent() {
        let message = MessageDef::new(0, "HEARTBEAT")
            .field("uint8_t", "type")
            .field("uint8_t", "autopilot")
            .field("uint32_t", "custom_mode");
        let resolved = resolve(&message);

        assert_eq!(
            order(&resolved),
            vec![("custom_mode", 0), ("type", 4), ("autopilot", 5)]
        );
        assert_eq!(resolved.base_length(), 6);
        assert_eq!(resolved.total_length(), 6);
        assert_eq!(resolved.entries()[0].declared_index(), 2);
    }

    #[test]
    fn arrays_sort_by_element_size() {
        let message = MessageDef::new(1, "MIXED")
            .array("char", "name", 10)
            .field("uint16_t", "count")
            .array("float", "q", 4)
            .field("int8_t", "sign");
        let resolved = resolve(&message);

        assert_eq!(
            order(&resolved),
            vec![("q", 0), ("count", 16), ("name", 18), ("sign", 28)]
        );
        assert_eq!(resolved.base_length(), 29);
    }

    #[test]
    fn extensions_stay_in_declaration_order() {
        let message = MessageDef::new(2, "EXTENDED")
            .field("uint8_t", "a")
            .field("uint16_t", "b")
            .extension("uint8_t", "x")
            .push(FieldDecl::new("uint64_t", "y"))
            .extension("uint32_t", "z");
        let resolved = resolve(&message);

        assert_eq!(
            order(&resolved),
            vec![("b", 0), ("a", 2), ("x", 3), ("y", 4), ("z", 12)]
        );
        assert_eq!(resolved.base_length(), 3);
        assert_eq!(resolved.total_length(), 16);
        // `y` follows the first marker, so it is an extension too.
        assert!(resolved.entries()[3].is_extension());
        assert_eq!(resolved.extension_entries().count(), 3);
        assert_eq!(resolved.base_entries().count(), 2);
    }

    #[test]
    fn only_extensions_is_an_empty_base() {
        let message = MessageDef::new(3, "ALL_EXT").extension("uint16_t", "a");
        assert!(matches!(
            layout(&message, TypeRegistry::global(), &CompilerConfig::default()),
            Err(MavgenError::EmptyMessage { message }) if message == "ALL_EXT"
        ));

        let config = CompilerConfig { allow_empty_messages: true, ..CompilerConfig::default() };
        let resolved = layout(&message, TypeRegistry::global(), &config).unwrap();
        assert_eq!(resolved.base_length(), 0);
        assert_eq!(resolved.total_length(), 2);
    }

    #[test]
    fn empty_message_policy() {
        let message = MessageDef::new(4, "NOTHING");
        assert!(matches!(
            layout(&message, TypeRegistry::global(), &CompilerConfig::default()),
            Err(MavgenError::EmptyMessage { message }) if message == "NOTHING"
        ));

        let config = CompilerConfig { allow_empty_messages: true, ..CompilerConfig::default() };
        let resolved = layout(&message, TypeRegistry::global(), &config).unwrap();
        assert_eq!(resolved.base_length(), 0);
        assert!(resolved.entries().is_empty());
    }

    #[test]
    fn payload_limit() {
        let message = MessageDef::new(5, "HUGE")
            .array("uint64_t", "a", 30)
            .array("uint8_t", "b", 20);
        assert!(matches!(
            layout(&message, TypeRegistry::global(), &CompilerConfig::default()),
            Err(MavgenError::PayloadTooLarge { length: 260, max: 255, .. })
        ));
    }

    #[test]
    fn unknown_type_names_the_field() {
        let message = MessageDef::new(6, "BROKEN").field("uint24_t", "odd");
        assert!(matches!(
            layout(&message, TypeRegistry::global(), &CompilerConfig::default()),
            Err(MavgenError::UnknownType { message, field, .. })
                if message == "BROKEN" && field == "odd"
        ));
    }
}
