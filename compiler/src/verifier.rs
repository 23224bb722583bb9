use lazy_static::lazy_static;
use mavgen_schema::{Dialect, EnumDef, MessageDef};
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::{error::MavgenError, registry::TypeRegistry, utils::quote};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Returns `Ok(())` if the merged dialect is semantically sound. Type and
/// layout problems are left to the layout resolver, which reports them
/// with the field they belong to.
pub fn verify_dialect(dialect: &Dialect, registry: &TypeRegistry) -> Result<(), MavgenError> {
    check_identifier("dialect", &dialect.name)?;

    // 1) Enums: names, entries and values
    let mut enum_names: HashSet<&str> = HashSet::new();
    for def in &dialect.enums {
        check_identifier("enum", &def.name)?;
        if !enum_names.insert(def.name.as_str()) {
            return Err(MavgenError::VerifierError(format!(
                "The enum {} is defined twice",
                quote(&def.name)
            )));
        }
        verify_enum(def)?;
    }

    // 2) Fields inside each message
    for message in &dialect.messages {
        check_identifier("message", &message.name)?;
        verify_fields(message, &enum_names, registry)?;
    }

    Ok(())
}

fn check_identifier(kind: &str, name: &str) -> Result<(), MavgenError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(MavgenError::VerifierError(format!(
            "The {} name {} is not a valid identifier",
            kind,
            quote(name)
        )))
    }
}

/// Checks that entry names are unique, values fit the width, non-alias
/// values are unique and bitmask flags do not overlap.
pub fn verify_enum(def: &EnumDef) -> Result<(), MavgenError> {
    let conflict = |entry: &str, detail: String| MavgenError::EnumConflict {
        enum_name: def.name.clone(),
        entry:     entry.to_string(),
        detail,
    };

    let mut names: HashSet<&str> = HashSet::new();
    let mut values: HashMap<u64, &str> = HashMap::new();
    let mut bits_in_use: u64 = 0;

    for entry in &def.entries {
        check_identifier("enum entry", &entry.name)?;
        if !names.insert(entry.name.as_str()) {
            return Err(conflict(&entry.name, "entry is defined twice".to_string()));
        }
        if entry.value > def.width.max_value() {
            return Err(conflict(
                &entry.name,
                format!("value {} does not fit {:?}", entry.value, def.width),
            ));
        }
        if entry.alias {
            continue;
        }
        if let Some(other) = values.insert(entry.value, entry.name.as_str()) {
            return Err(conflict(
                &entry.name,
                format!("value {} is already used by {}", entry.value, other),
            ));
        }
        if def.bitmask {
            if bits_in_use & entry.value != 0 {
                return Err(conflict(
                    &entry.name,
                    format!("flag {:#x} overlaps another flag", entry.value),
                ));
            }
            bits_in_use |= entry.value;
        }
    }
    Ok(())
}

fn verify_fields(
    message: &MessageDef,
    enum_names: &HashSet<&str>,
    registry: &TypeRegistry,
) -> Result<(), MavgenError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for field in &message.fields {
        check_identifier("field", &field.name)?;
        if !seen.insert(field.name.as_str()) {
            return Err(MavgenError::VerifierError(format!(
                "The field {} is defined twice in message {}",
                quote(&field.name),
                quote(&message.name)
            )));
        }

        let Some(enum_name) = field.enum_name.as_deref() else {
            continue;
        };
        if !enum_names.contains(enum_name) {
            return Err(MavgenError::VerifierError(format!(
                "The enum {} is not defined for field {}.{}",
                quote(enum_name),
                message.name,
                field.name
            )));
        }
        if let Ok(resolved) = registry.bind(message, field) {
            if !resolved.element().is_integer() {
                return Err(MavgenError::VerifierError(format!(
                    "The field {}.{} binds enum {} but has non-integer type {}",
                    message.name,
                    field.name,
                    quote(enum_name),
                    quote(&field.type_token)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavgen_schema::{EnumWidth, FieldDecl};

    fn verify(dialect: &Dialect) -> Result<(), MavgenError> {
        verify_dialect(dialect, TypeRegistry::global())
    }

    #[test]
    fn accepts_sound_dialect() {
        let dialect = Dialect::new("minimal")
            .with_enum(EnumDef::new("MAV_STATE").entry("UNINIT", 0).entry("BOOT", 1))
            .with_enum(
                EnumDef::new("MAV_MODE_FLAG")
                    .bitmask()
                    .entry("SAFETY_ARMED", 128)
                    .entry("MANUAL_INPUT_ENABLED", 64)
                    .alias("ARMED_ALIAS", 128),
            )
            .with_message(
                MessageDef::new(0, "HEARTBEAT")
                    .push(FieldDecl::new("uint8_t", "system_status").with_enum("MAV_STATE"))
                    .push(FieldDecl::new("uint8_t", "base_mode").with_enum("MAV_MODE_FLAG")),
            );
        verify(&dialect).unwrap();
    }

    #[test]
    fn duplicate_values_need_alias() {
        let def = EnumDef::new("E").entry("A", 1).entry("B", 1);
        assert!(matches!(
            verify_enum(&def),
            Err(MavgenError::EnumConflict { entry, .. }) if entry == "B"
        ));
        verify_enum(&EnumDef::new("E").entry("A", 1).alias("B", 1)).unwrap();
    }

    #[test]
    fn bitmask_flags_must_not_overlap() {
        let def = EnumDef::new("F").bitmask().entry("LOW", 0b011).entry("MID", 0b110);
        assert!(matches!(verify_enum(&def), Err(MavgenError::EnumConflict { .. })));
    }

    #[test]
    fn values_must_fit_width() {
        let mut def = EnumDef::new("SMALL").entry("BIG", 300);
        def.width = EnumWidth::U8;
        assert!(matches!(verify_enum(&def), Err(MavgenError::EnumConflict { .. })));
    }

    #[test]
    fn duplicate_entry_names() {
        let def = EnumDef::new("E").entry("A", 1).entry("A", 2);
        assert!(matches!(verify_enum(&def), Err(MavgenError::EnumConflict { .. })));
    }

    #[test]
    fn duplicate_field_names() {
        let dialect = Dialect::new("d").with_message(
            MessageDef::new(1, "M").field("uint8_t", "a").field("uint16_t", "a"),
        );
        assert!(matches!(verify(&dialect), Err(MavgenError::VerifierError(_))));
    }

    #[test]
    fn enum_binding_must_exist_and_be_integer() {
        let missing = Dialect::new("d").with_message(
            MessageDef::new(1, "M").push(FieldDecl::new("uint8_t", "a").with_enum("NOPE")),
        );
        assert!(matches!(verify(&missing), Err(MavgenError::VerifierError(_))));

        let float = Dialect::new("d")
            .with_enum(EnumDef::new("E").entry("A", 0))
            .with_message(MessageDef::new(1, "M").push(FieldDecl::new("float", "a").with_enum("E")));
        assert!(matches!(verify(&float), Err(MavgenError::VerifierError(_))));
    }

    #[test]
    fn rejects_bad_identifiers() {
        let dialect = Dialect::new("d").with_message(MessageDef::new(1, "BAD NAME").field("uint8_t", "a"));
        assert!(matches!(verify(&dialect), Err(MavgenError::VerifierError(_))));
    }
}
