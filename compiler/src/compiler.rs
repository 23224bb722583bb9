use mavgen_schema::Dialect;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::{
    checksum::derive_seed,
    config::CompilerConfig,
    error::MavgenError,
    layout::layout,
    merger::merge,
    registry::TypeRegistry,
    types::{CompiledDialect, MessageContract},
    verifier::verify_dialect,
};

/// Merge `root` with its includes, verify the result and build one
/// contract per message.
/// Returns `Err(MavgenError)` on the first problem found; nothing is
/// emitted for a dialect that fails any stage.
pub fn compile(
    root: &Dialect,
    included: &[Dialect],
    config: &CompilerConfig,
) -> Result<CompiledDialect, MavgenError> {
    let merged = merge(root, included)?;
    let registry = TypeRegistry::global();
    verify_dialect(&merged, registry)?;
    build_with(&merged, registry, config)
}

/// Build contracts for an already merged and verified dialect.
pub fn build(dialect: &Dialect, config: &CompilerConfig) -> Result<CompiledDialect, MavgenError> {
    build_with(dialect, TypeRegistry::global(), config)
}

pub fn build_with(
    dialect: &Dialect,
    registry: &TypeRegistry,
    config: &CompilerConfig,
) -> Result<CompiledDialect, MavgenError> {
    let max_id = config.max_message_id();
    let mut contracts: BTreeMap<u32, MessageContract> = BTreeMap::new();
    let mut ids_by_name: HashMap<&str, u32> = HashMap::new();

    for message in &dialect.messages {
        if message.id > max_id {
            return Err(MavgenError::MessageIdOutOfRange {
                message: message.name.clone(),
                id:      message.id,
                max:     max_id,
            });
        }
        if let Some(existing) = contracts.get(&message.id) {
            return Err(MavgenError::DuplicateId {
                id:     message.id,
                first:  existing.name().to_string(),
                second: message.name.clone(),
            });
        }
        if let Some(other_id) = ids_by_name.insert(message.name.as_str(), message.id) {
            return Err(MavgenError::VerifierError(format!(
                "Message {} is declared with ids {} and {}",
                message.name, other_id, message.id
            )));
        }

        let resolved = layout(message, registry, config)?;
        let crc_extra = derive_seed(&message.name, &resolved);
        debug!(
            id = message.id,
            name = %message.name,
            crc_extra,
            base_length = resolved.base_length(),
            total_length = resolved.total_length(),
            "built contract"
        );
        contracts.insert(message.id, MessageContract::new(message.id, &message.name, resolved, crc_extra));
    }

    info!(dialect = %dialect.name, messages = contracts.len(), "compiled dialect");

    Ok(CompiledDialect {
        name: dialect.name.clone(),
        version: dialect.version,
        enums: dialect.enums.clone(),
        contracts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolVersion;
    use mavgen_schema::{EnumDef, FieldDecl, MessageDef};

    fn heartbeat() -> MessageDef {
        MessageDef::new(0, "HEARTBEAT")
            .field("uint8_t", "type")
            .field("uint8_t", "autopilot")
            .field("uint8_t", "base_mode")
            .field("uint32_t", "custom_mode")
            .field("uint8_t", "system_status")
            .field("uint8_t_mavlink_version", "mavlink_version")
    }

    #[test]
    fn builds_heartbeat_contract() {
        let dialect = Dialect::new("minimal").with_message(heartbeat());
        let compiled = build(&dialect, &CompilerConfig::default()).unwrap();
        let contract = compiled.contract(0).unwrap();

        assert_eq!(contract.name(), "HEARTBEAT");
        assert_eq!(contract.crc_extra(), 50);
        assert_eq!(contract.base_length(), 9);
        assert_eq!(contract.total_length(), 9);
        assert_eq!(contract.fields()[0].name(), "custom_mode");
        assert_eq!(contract.field("mavlink_version").unwrap().offset(), 8);
        assert_eq!(compiled.crc_table(), vec![(0, 50)]);
    }

    #[test]
    fn duplicate_id_in_one_dialect() {
        let dialect = Dialect::new("d")
            .with_message(MessageDef::new(7, "A").field("uint8_t", "x"))
            .with_message(MessageDef::new(7, "B").field("uint8_t", "y"));
        assert!(matches!(
            build(&dialect, &CompilerConfig::default()),
            Err(MavgenError::DuplicateId { id: 7, first, second }) if first == "A" && second == "B"
        ));
    }

    #[test]
    fn same_name_with_two_ids() {
        let dialect = Dialect::new("d")
            .with_message(MessageDef::new(1, "A").field("uint8_t", "x"))
            .with_message(MessageDef::new(2, "A").field("uint8_t", "x"));
        assert!(matches!(
            build(&dialect, &CompilerConfig::default()),
            Err(MavgenError::VerifierError(_))
        ));
    }

    #[test]
    fn id_range_follows_protocol() {
        let dialect = Dialect::new("d").with_message(MessageDef::new(300, "WIDE").field("uint8_t", "x"));
        build(&dialect, &CompilerConfig::default()).unwrap();

        let v1 = CompilerConfig { protocol: ProtocolVersion::V1, ..CompilerConfig::default() };
        assert!(matches!(
            build(&dialect, &v1),
            Err(MavgenError::MessageIdOutOfRange { id: 300, max: 255, .. })
        ));

        let too_wide = Dialect::new("d").with_message(MessageDef::new(1 << 24, "HUGE").field("uint8_t", "x"));
        assert!(matches!(
            build(&too_wide, &CompilerConfig::default()),
            Err(MavgenError::MessageIdOutOfRange { .. })
        ));
    }

    #[test]
    fn compile_runs_every_stage() {
        let common = Dialect::new("common")
            .with_enum(EnumDef::new("MAV_STATE").entry("UNINIT", 0).entry("ACTIVE", 4))
            .with_message(heartbeat());
        let mut root = Dialect::new("vendor")
            .with_include("common")
            .with_message(
                MessageDef::new(42000, "VENDOR_STATUS")
                    .push(FieldDecl::new("uint8_t", "state").with_enum("MAV_STATE"))
                    .field("float", "load"),
            );
        root.version = Some(3);

        let compiled = compile(&root, &[common], &CompilerConfig::default()).unwrap();
        assert_eq!(compiled.name, "vendor");
        assert_eq!(compiled.version, Some(3));
        assert_eq!(compiled.contracts.keys().copied().collect::<Vec<_>>(), vec![0, 42000]);
        assert!(compiled.enum_def("MAV_STATE").is_some());
        assert_eq!(compiled.contract_by_name("VENDOR_STATUS").unwrap().base_length(), 5);
    }

    #[test]
    fn compile_stops_at_verifier() {
        let root = Dialect::new("d").with_message(
            MessageDef::new(1, "M").push(FieldDecl::new("uint8_t", "mode").with_enum("MISSING")),
        );
        assert!(matches!(
            compile(&root, &[], &CompilerConfig::default()),
            Err(MavgenError::VerifierError(_))
        ));
    }
}
