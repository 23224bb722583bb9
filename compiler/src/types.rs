use mavgen_schema::EnumDef;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::layout::{LayoutEntry, MessageLayout};

/// Everything a code emitter needs to know about one message on the wire.
/// Built once by the contract builder and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContract {
    id:           u32,
    name:         String,
    crc_extra:    u8,
    base_length:  usize,
    total_length: usize,
    fields:       Vec<LayoutEntry>,
}

impl MessageContract {
    pub(crate) fn new(id: u32, name: &str, layout: MessageLayout, crc_extra: u8) -> Self {
        let (fields, base_length, total_length) = layout.into_parts();
        MessageContract {
            id,
            name: name.to_string(),
            crc_extra,
            base_length,
            total_length,
            fields,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-byte seed folded into the frame checksum.
    pub fn crc_extra(&self) -> u8 {
        self.crc_extra
    }

    /// Payload length without extensions.
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Payload length with every extension present.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn has_extensions(&self) -> bool {
        self.fields.iter().any(|f| f.is_extension())
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[LayoutEntry] {
        &self.fields
    }

    pub fn base_fields(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.fields.iter().filter(|f| !f.is_extension())
    }

    pub fn extension_fields(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.fields.iter().filter(|f| f.is_extension())
    }

    /// Fields in the order the dialect declared them, for user-facing APIs.
    pub fn declaration_order(&self) -> Vec<&LayoutEntry> {
        let mut fields: Vec<&LayoutEntry> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.declared_index());
        fields
    }

    pub fn field(&self, name: &str) -> Option<&LayoutEntry> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

/// Output of a compiler run: the merged enum table and one contract per
/// message id. Immutable and safe to share across emission tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledDialect {
    pub name:      String,
    pub version:   Option<u8>,
    pub enums:     Vec<EnumDef>,
    pub contracts: BTreeMap<u32, MessageContract>,
}

impl CompiledDialect {
    pub fn contract(&self, id: u32) -> Option<&MessageContract> {
        self.contracts.get(&id)
    }

    pub fn contract_by_name(&self, name: &str) -> Option<&MessageContract> {
        self.contracts.values().find(|c| c.name() == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// `(id, crc_extra)` pairs in id order, the table a frame parser needs.
    pub fn crc_table(&self) -> Vec<(u32, u8)> {
        self.contracts.values().map(|c| (c.id(), c.crc_extra())).collect()
    }
}
