use crate::{
    error::MavgenError,
    registry::{Primitive, ResolvedType},
    types::{CompiledDialect, MessageContract},
    utils::quote,
};
use mavgen_schema::{EnumDef, EnumWidth};
use std::collections::HashMap;

/// Converts a string to PascalCase.
/// - Underscore separated words are capitalised and joined.
/// - A single all-uppercase word keeps only its first letter uppercase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            }
        })
        .collect()
}

/// Converts a string to snake_case without splitting acronyms
/// (e.g. "sessionID" becomes "session_id").
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if (!prev.is_uppercase() && prev != '_')
                    || (prev.is_uppercase() && i + 1 < chars.len() && chars[i + 1].is_lowercase())
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

fn to_screaming_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "break", "const", "continue", "crate", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

fn rust_type(resolved: ResolvedType) -> String {
    let element = match resolved.element() {
        Primitive::Char | Primitive::UInt8 | Primitive::MavlinkVersion => "u8",
        Primitive::Int8 => "i8",
        Primitive::Int16 => "i16",
        Primitive::UInt16 => "u16",
        Primitive::Int32 => "i32",
        Primitive::UInt32 => "u32",
        Primitive::Int64 => "i64",
        Primitive::UInt64 => "u64",
        Primitive::Float => "f32",
        Primitive::Double => "f64",
    };
    match resolved.array_length() {
        Some(length) => format!("[{}; {}]", element, length),
        None => element.to_string(),
    }
}

fn enum_repr(width: EnumWidth) -> &'static str {
    match width {
        EnumWidth::U8 => "u8",
        EnumWidth::U16 => "u16",
        EnumWidth::U32 => "u32",
        EnumWidth::U64 => "u64",
    }
}

/// Generated identifiers of one Rust namespace, mapped to the dialect name
/// each was derived from.
struct Names<'a> {
    kind:  &'static str,
    taken: HashMap<String, &'a str>,
}

impl<'a> Names<'a> {
    fn new(kind: &'static str) -> Self {
        Names { kind, taken: HashMap::new() }
    }

    /// Returns `Err` if `generated` was already produced from another name.
    fn claim(&mut self, generated: String, source: &'a str) -> Result<String, MavgenError> {
        match self.taken.get(generated.as_str()) {
            Some(&other) if other != source => Err(MavgenError::VerifierError(format!(
                "The {} names {} and {} both generate the Rust name {}",
                self.kind,
                quote(other),
                quote(source),
                quote(&generated)
            ))),
            _ => {
                self.taken.insert(generated.clone(), source);
                Ok(generated)
            }
        }
    }
}

/// Emits a Rust module holding the wire constants of every message and
/// enum in `dialect`: ids, CRC-EXTRA seeds, payload lengths and field
/// offsets, plus a sorted `CRC_EXTRAS` lookup table.
/// Returns `Err(MavgenError::VerifierError)` when two dialect names map to
/// the same Rust identifier.
pub fn compile_dialect_to_rust(dialect: &CompiledDialect) -> Result<String, MavgenError> {
    let mut rust_code: Vec<String> = Vec::new();
    // Enum newtypes and message modules share the type namespace.
    let mut types = Names::new("enum/message");

    rust_code.push(format!(
        "// Wire constants for the {} dialect. Generated, do not edit.",
        dialect.name
    ));
    rust_code.push("#[allow(dead_code, non_upper_case_globals)]".to_string());
    rust_code.push(format!("pub mod {} {{", escape_rust_keyword(&to_snake_case(&dialect.name))));

    if let Some(version) = dialect.version {
        rust_code.push(format!("    pub const MAVLINK_VERSION: u8 = {};", version));
        rust_code.push("".to_string());
    }

    for def in &dialect.enums {
        rust_code.push(generate_enum(def, &mut types)?);
        rust_code.push("".to_string());
    }

    for contract in dialect.contracts.values() {
        rust_code.push(generate_message(contract, &mut types)?);
        rust_code.push("".to_string());
    }

    rust_code.push("    /// `(message id, crc extra)`, sorted by id.".to_string());
    rust_code.push(format!(
        "    pub const CRC_EXTRAS: [(u32, u8); {}] = [",
        dialect.contracts.len()
    ));
    for (id, crc) in dialect.crc_table() {
        rust_code.push(format!("        ({}, {}),", id, crc));
    }
    rust_code.push("    ];".to_string());
    rust_code.push("".to_string());
    rust_code.push("    pub fn crc_extra(id: u32) -> Option<u8> {".to_string());
    rust_code.push("        CRC_EXTRAS".to_string());
    rust_code.push("            .binary_search_by_key(&id, |&(i, _)| i)".to_string());
    rust_code.push("            .ok()".to_string());
    rust_code.push("            .map(|index| CRC_EXTRAS[index].1)".to_string());
    rust_code.push("    }".to_string());
    rust_code.push("}".to_string());

    Ok(rust_code.join("\n"))
}

/// Enum entries as associated constants of a transparent newtype, so that
/// unknown values received from newer peers still round-trip.
fn generate_enum<'a>(def: &'a EnumDef, types: &mut Names<'a>) -> Result<String, MavgenError> {
    let type_name = types.claim(to_pascal_case(&def.name), &def.name)?;
    let const_names = entry_constants(def)?;
    let repr = enum_repr(def.width);
    let mut lines = Vec::new();

    lines.push("    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]".to_string());
    lines.push("    #[repr(transparent)]".to_string());
    lines.push(format!("    pub struct {}(pub {});", type_name, repr));
    lines.push("".to_string());
    lines.push(format!("    impl {} {{", type_name));
    for (entry, const_name) in def.entries.iter().zip(const_names) {
        lines.push(format!(
            "        pub const {}: {} = {}({});",
            const_name, type_name, type_name, entry.value
        ));
    }
    if def.bitmask {
        lines.push("".to_string());
        lines.push("        pub fn contains(self, other: Self) -> bool {".to_string());
        lines.push("            self.0 & other.0 == other.0".to_string());
        lines.push("        }".to_string());
    }
    lines.push("    }".to_string());

    Ok(lines.join("\n"))
}

/// Constant names for the entries of `def`: prefix-stripped when that keeps
/// them distinct, the full entry names otherwise.
fn entry_constants(def: &EnumDef) -> Result<Vec<String>, MavgenError> {
    let short: Vec<String> = def
        .entries
        .iter()
        .map(|e| escape_rust_keyword(&short_entry_name(&def.name, &e.name)))
        .collect();
    let mut names = Names::new("enum entry");
    if def.entries.iter().zip(&short).all(|(e, n)| names.claim(n.clone(), &e.name).is_ok()) {
        return Ok(short);
    }

    let mut names = Names::new("enum entry");
    def.entries
        .iter()
        .map(|e| names.claim(escape_rust_keyword(&e.name), &e.name))
        .collect()
}

/// `MAV_STATE_ACTIVE` in `MAV_STATE` becomes `ACTIVE`. Names that would
/// start with a digit keep the prefix.
fn short_entry_name(enum_name: &str, entry_name: &str) -> String {
    let prefix = format!("{}_", enum_name);
    match entry_name.strip_prefix(&prefix) {
        Some(rest) if rest.chars().next().is_some_and(|c| !c.is_ascii_digit()) => rest.to_string(),
        _ => entry_name.to_string(),
    }
}

fn generate_message<'a>(contract: &'a MessageContract, types: &mut Names<'a>) -> Result<String, MavgenError> {
    let module_name = types.claim(
        escape_rust_keyword(&to_snake_case(contract.name()).to_lowercase()),
        contract.name(),
    )?;
    let mut constants = Names::new("field");
    let mut lines = Vec::new();

    lines.push(format!("    pub mod {} {{", module_name));
    lines.push(format!("        pub const NAME: &str = \"{}\";", contract.name()));
    lines.push(format!("        pub const ID: u32 = {};", contract.id()));
    lines.push(format!("        pub const CRC_EXTRA: u8 = {};", contract.crc_extra()));
    lines.push(format!("        pub const BASE_LENGTH: usize = {};", contract.base_length()));
    lines.push(format!("        pub const TOTAL_LENGTH: usize = {};", contract.total_length()));

    for field in contract.fields() {
        let upper = constants.claim(to_screaming_case(field.name()), field.name())?;
        lines.push("".to_string());
        let mut doc = format!("        /// `{}`", rust_type(field.resolved()));
        if field.is_extension() {
            doc.push_str(", extension");
        }
        if let Some(enum_name) = field.enum_name() {
            doc.push_str(&format!(", values from `{}`", to_pascal_case(enum_name)));
        }
        lines.push(doc);
        lines.push(format!("        pub const OFF_{}: usize = {};", upper, field.offset()));
        lines.push(format!("        pub const LEN_{}: usize = {};", upper, field.size()));
    }
    lines.push("    }".to_string());

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::build, config::CompilerConfig};
    use mavgen_schema::{Dialect, MessageDef};

    #[test]
    fn naming_helpers() {
        assert_eq!(to_pascal_case("MAV_MODE_FLAG"), "MavModeFlag");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("custom_mode"), "custom_mode");
        assert_eq!(to_screaming_case("xAcc"), "X_ACC");
        assert_eq!(escape_rust_keyword("type"), "type_");
        assert_eq!(short_entry_name("MAV_STATE", "MAV_STATE_ACTIVE"), "ACTIVE");
        assert_eq!(short_entry_name("GPS_FIX", "GPS_FIX_3D"), "GPS_FIX_3D");
    }

    #[test]
    fn emits_message_constants() {
        let mut dialect = Dialect::new("minimal")
            .with_enum(EnumDef::new("MAV_STATE").entry("MAV_STATE_UNINIT", 0).entry("MAV_STATE_ACTIVE", 4))
            .with_message(
                MessageDef::new(0, "HEARTBEAT")
                    .field("uint8_t", "type")
                    .field("uint8_t", "autopilot")
                    .field("uint8_t", "base_mode")
                    .field("uint32_t", "custom_mode")
                    .field("uint8_t", "system_status")
                    .field("uint8_t_mavlink_version", "mavlink_version"),
            );
        dialect.version = Some(3);
        let compiled = build(&dialect, &CompilerConfig::default()).unwrap();
        let code = compile_dialect_to_rust(&compiled).unwrap();

        assert!(code.contains("pub mod minimal {"));
        assert!(code.contains("pub const MAVLINK_VERSION: u8 = 3;"));
        assert!(code.contains("pub struct MavState(pub u32);"));
        assert!(code.contains("pub const ACTIVE: MavState = MavState(4);"));
        assert!(code.contains("pub mod heartbeat {"));
        assert!(code.contains("pub const CRC_EXTRA: u8 = 50;"));
        assert!(code.contains("pub const BASE_LENGTH: usize = 9;"));
        assert!(code.contains("pub const OFF_CUSTOM_MODE: usize = 0;"));
        assert!(code.contains("pub const OFF_TYPE: usize = 4;"));
        assert!(code.contains("pub const CRC_EXTRAS: [(u32, u8); 1] = ["));
        assert!(code.contains("(0, 50),"));
    }

    #[test]
    fn marks_extensions_and_arrays() {
        let dialect = Dialect::new("d").with_message(
            MessageDef::new(253, "STATUSTEXT")
                .field("uint8_t", "severity")
                .array("char", "text", 50)
                .extension("uint16_t", "id"),
        );
        let compiled = build(&dialect, &CompilerConfig::default()).unwrap();
        let code = compile_dialect_to_rust(&compiled).unwrap();

        assert!(code.contains("/// `[u8; 50]`"));
        assert!(code.contains("/// `u16`, extension"));
        assert!(code.contains("pub const OFF_ID: usize = 51;"));
        assert!(code.contains("pub const TOTAL_LENGTH: usize = 53;"));
    }

    #[test]
    fn colliding_entry_names_keep_their_prefix() {
        let dialect = Dialect::new("d").with_enum(
            EnumDef::new("MAV_STATE").entry("MAV_STATE_ACTIVE", 4).entry("ACTIVE", 5),
        );
        let compiled = build(&dialect, &CompilerConfig::default()).unwrap();
        let code = compile_dialect_to_rust(&compiled).unwrap();

        assert!(code.contains("pub const MAV_STATE_ACTIVE: MavState = MavState(4);"));
        assert!(code.contains("pub const ACTIVE: MavState = MavState(5);"));
    }

    #[test]
    fn colliding_rust_names_are_reported() {
        let modules = Dialect::new("d")
            .with_message(MessageDef::new(1, "FOO_BAR").field("uint8_t", "a"))
            .with_message(MessageDef::new(2, "FooBar").field("uint8_t", "a"));
        let compiled = build(&modules, &CompilerConfig::default()).unwrap();
        assert!(matches!(
            compile_dialect_to_rust(&compiled),
            Err(MavgenError::VerifierError(msg)) if msg.contains("\"foo_bar\"")
        ));

        let fields = Dialect::new("d").with_message(
            MessageDef::new(1, "IMU").field("int16_t", "xAcc").field("int16_t", "x_acc"),
        );
        let compiled = build(&fields, &CompilerConfig::default()).unwrap();
        assert!(matches!(
            compile_dialect_to_rust(&compiled),
            Err(MavgenError::VerifierError(msg)) if msg.contains("\"X_ACC\"")
        ));
    }
}
