use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named collection of enums and messages, possibly extending other
/// dialects through `includes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialect {
    pub name:     String,
    #[serde(default)]
    pub version:  Option<u8>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub enums:    Vec<EnumDef>,
    #[serde(default)]
    pub messages: Vec<MessageDef>,
}

impl Dialect {
    pub fn new(name: &str) -> Self {
        Dialect {
            name:     name.to_string(),
            version:  None,
            includes: Vec::new(),
            enums:    Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_include(mut self, name: &str) -> Self {
        self.includes.push(name.to_string());
        self
    }

    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.enums.push(def);
        self
    }

    pub fn with_message(mut self, def: MessageDef) -> Self {
        self.messages.push(def);
        self
    }

    pub fn message(&self, id: u32) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }
}

/// Underlying integer width of an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumWidth {
    U8,
    U16,
    #[default]
    U32,
    U64,
}

impl EnumWidth {
    pub fn max_value(self) -> u64 {
        match self {
            EnumWidth::U8  => u8::MAX as u64,
            EnumWidth::U16 => u16::MAX as u64,
            EnumWidth::U32 => u32::MAX as u64,
            EnumWidth::U64 => u64::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name:    String,
    #[serde(default)]
    pub width:   EnumWidth,
    #[serde(default)]
    pub bitmask: bool,
    #[serde(default)]
    pub entries: Vec<EnumEntry>,
}

impl EnumDef {
    pub fn new(name: &str) -> Self {
        EnumDef {
            name:    name.to_string(),
            width:   EnumWidth::default(),
            bitmask: false,
            entries: Vec::new(),
        }
    }

    pub fn bitmask(mut self) -> Self {
        self.bitmask = true;
        self
    }

    pub fn entry(mut self, name: &str, value: u64) -> Self {
        self.entries.push(EnumEntry { name: name.to_string(), value, alias: false });
        self
    }

    pub fn alias(mut self, name: &str, value: u64) -> Self {
        self.entries.push(EnumEntry { name: name.to_string(), value, alias: true });
        self
    }
}

/// One named value of an enum. `alias` entries may repeat a value that
/// another entry already uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name:  String,
    pub value: u64,
    #[serde(default)]
    pub alias: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDef {
    pub id:     u32,
    pub name:   String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl MessageDef {
    pub fn new(id: u32, name: &str) -> Self {
        MessageDef { id, name: name.to_string(), fields: Vec::new() }
    }

    pub fn field(mut self, type_token: &str, name: &str) -> Self {
        self.fields.push(FieldDecl::new(type_token, name));
        self
    }

    pub fn array(mut self, type_token: &str, name: &str, length: i64) -> Self {
        let mut decl = FieldDecl::new(type_token, name);
        decl.array_length = Some(length);
        self.fields.push(decl);
        self
    }

    pub fn extension(mut self, type_token: &str, name: &str) -> Self {
        let mut decl = FieldDecl::new(type_token, name);
        decl.extension = true;
        self.fields.push(decl);
        self
    }

    pub fn push(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }
}

/// A field as written in the dialect. `array_length: None` is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name:         String,
    #[serde(rename = "type")]
    pub type_token:   String,
    #[serde(default)]
    pub array_length: Option<i64>,
    #[serde(default)]
    pub extension:    bool,
    #[serde(default, rename = "enum")]
    pub enum_name:    Option<String>,
}

impl FieldDecl {
    pub fn new(type_token: &str, name: &str) -> Self {
        FieldDecl {
            name:         name.to_string(),
            type_token:   type_token.to_string(),
            array_length: None,
            extension:    false,
            enum_name:    None,
        }
    }

    pub fn with_enum(mut self, enum_name: &str) -> Self {
        self.enum_name = Some(enum_name.to_string());
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.extension = true;
        self
    }
}

/// Index of a dialect inside a [`DialectLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialectId(pub usize);

/// Arena of dialects. Includes are resolved to indices so that a cyclic
/// include graph never turns into cyclic ownership.
#[derive(Debug, Default)]
pub struct DialectLibrary {
    dialects: Vec<Dialect>,
    by_name:  HashMap<String, DialectId>,
}

impl DialectLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dialect. Returns `Err` with the existing id when the name is
    /// already taken.
    pub fn insert(&mut self, dialect: Dialect) -> Result<DialectId, DialectId> {
        if let Some(&existing) = self.by_name.get(&dialect.name) {
            return Err(existing);
        }
        let id = DialectId(self.dialects.len());
        self.by_name.insert(dialect.name.clone(), id);
        self.dialects.push(dialect);
        Ok(id)
    }

    pub fn get(&self, id: DialectId) -> &Dialect {
        &self.dialects[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<DialectId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_parser_output() {
        let json = r#"{
            "name": "minimal",
            "version": 3,
            "enums": [
                { "name": "MAV_STATE", "width": "u8",
                  "entries": [ { "name": "MAV_STATE_UNINIT", "value": 0 } ] }
            ],
            "messages": [
                { "id": 0, "name": "HEARTBEAT", "fields": [
                    { "name": "type", "type": "uint8_t", "enum": "MAV_TYPE" },
                    { "name": "custom_mode", "type": "uint32_t" },
                    { "name": "extra", "type": "uint16_t", "extension": true }
                ] }
            ]
        }"#;

        let dialect: Dialect = serde_json::from_str(json).unwrap();
        assert_eq!(dialect.version, Some(3));
        assert!(dialect.includes.is_empty());
        assert_eq!(dialect.enums[0].width, EnumWidth::U8);
        assert!(!dialect.enums[0].entries[0].alias);

        let heartbeat = dialect.message(0).unwrap();
        assert_eq!(heartbeat.fields[0].enum_name.as_deref(), Some("MAV_TYPE"));
        assert_eq!(heartbeat.fields[1].array_length, None);
        assert!(heartbeat.fields[2].extension);
    }

    #[test]
    fn library_rejects_duplicate_names() {
        let mut library = DialectLibrary::new();
        let first = library.insert(Dialect::new("common")).unwrap();
        assert_eq!(library.insert(Dialect::new("common")), Err(first));
        assert_eq!(library.lookup("common"), Some(first));
        assert_eq!(library.len(), 1);
    }
}
