//! Folds included dialects into a root dialect.
//!
//! A root definition replaces an included one of the same message id/name
//! or enum name. Included dialects may repeat each other only verbatim.
//! The include graph is walked with an explicit stack over dialect indices,
//! so malformed cyclic input is reported instead of recursing forever.

use mavgen_schema::{Dialect, DialectId, DialectLibrary, EnumDef, MessageDef};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::{error::MavgenError, utils::quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Merges `root` with the dialects it (transitively) includes, looked up by
/// name in `included`.
pub fn merge(root: &Dialect, included: &[Dialect]) -> Result<Dialect, MavgenError> {
    let mut library = DialectLibrary::new();
    let root_id = insert(&mut library, root.clone())?;
    for dialect in included {
        insert(&mut library, dialect.clone())?;
    }
    merge_library(&library, root_id)
}

fn insert(library: &mut DialectLibrary, dialect: Dialect) -> Result<DialectId, MavgenError> {
    let name = dialect.name.clone();
    library.insert(dialect).map_err(|_| {
        MavgenError::VerifierError(format!("The dialect {} is defined twice", quote(&name)))
    })
}

/// Merges the dialect at `root` with its includes from `library`.
pub fn merge_library(library: &DialectLibrary, root: DialectId) -> Result<Dialect, MavgenError> {
    let order = include_order(library, root)?;
    let root_dialect = library.get(root);

    let messages = merge_messages(library, &order, root_dialect)?;
    let enums = merge_enums(library, &order, root_dialect)?;

    let version = root_dialect
        .version
        .or_else(|| order.iter().rev().find_map(|&id| library.get(id).version));

    info!(
        dialect = %root_dialect.name,
        includes = order.len(),
        messages = messages.len(),
        enums = enums.len(),
        "merged dialect"
    );

    Ok(Dialect {
        name: root_dialect.name.clone(),
        version,
        includes: Vec::new(),
        enums,
        messages,
    })
}

/// Post-order of every dialect reachable from `root` through includes,
/// deepest first, excluding `root` itself. Each dialect appears once.
pub fn include_order(library: &DialectLibrary, root: DialectId) -> Result<Vec<DialectId>, MavgenError> {
    let mut state = vec![Visit::New; library.len()];
    let mut order = Vec::new();
    let mut stack: Vec<(DialectId, usize)> = vec![(root, 0)];
    state[root.0] = Visit::Active;

    while let Some(top) = stack.last_mut() {
        let (id, next) = *top;
        let dialect = library.get(id);

        if next == dialect.includes.len() {
            stack.pop();
            state[id.0] = Visit::Done;
            if id != root {
                order.push(id);
            }
            continue;
        }
        top.1 += 1;

        let include = &dialect.includes[next];
        let child = library.lookup(include).ok_or_else(|| MavgenError::MissingInclude {
            dialect: dialect.name.clone(),
            include: include.clone(),
        })?;

        match state[child.0] {
            Visit::Done => {}
            Visit::New => {
                state[child.0] = Visit::Active;
                stack.push((child, 0));
            }
            Visit::Active => {
                let start = stack.iter().position(|&(d, _)| d == child).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|&(d, _)| library.get(d).name.clone())
                    .collect();
                cycle.push(library.get(child).name.clone());
                return Err(MavgenError::CyclicInclude { cycle });
            }
        }
    }

    Ok(order)
}

fn merge_messages(
    library: &DialectLibrary,
    order: &[DialectId],
    root: &Dialect,
) -> Result<Vec<MessageDef>, MavgenError> {
    let root_ids: HashSet<u32> = root.messages.iter().map(|m| m.id).collect();
    let root_names: HashSet<&str> = root.messages.iter().map(|m| m.name.as_str()).collect();

    let mut merged: Vec<MessageDef> = Vec::new();
    let mut by_id: HashMap<u32, (usize, &str)> = HashMap::new();
    let mut by_name: HashMap<&str, (u32, &str)> = HashMap::new();

    for &id in order {
        let dialect = library.get(id);
        for message in &dialect.messages {
            if root_ids.contains(&message.id) || root_names.contains(message.name.as_str()) {
                debug!(
                    message = %message.name,
                    id = message.id,
                    from = %dialect.name,
                    "overridden by root dialect"
                );
                continue;
            }

            if let Some(&(index, source)) = by_id.get(&message.id) {
                // Duplicates inside one dialect are left for the contract builder.
                if source != dialect.name {
                    if merged[index] == *message {
                        debug!(message = %message.name, id = message.id, "identical include duplicate");
                        continue;
                    }
                    return Err(MavgenError::IdCollision {
                        id:     message.id,
                        first:  format!("{}.{}", source, merged[index].name),
                        second: format!("{}.{}", dialect.name, message.name),
                    });
                }
            }

            if let Some(&(other_id, source)) = by_name.get(message.name.as_str()) {
                if source != dialect.name && other_id != message.id {
                    return Err(MavgenError::IdCollision {
                        id:     message.id,
                        first:  format!("{}.{} (id {})", source, message.name, other_id),
                        second: format!("{}.{} (id {})", dialect.name, message.name, message.id),
                    });
                }
            }

            by_id.entry(message.id).or_insert((merged.len(), dialect.name.as_str()));
            by_name.entry(message.name.as_str()).or_insert((message.id, dialect.name.as_str()));
            merged.push(message.clone());
        }
    }

    merged.extend(root.messages.iter().cloned());
    Ok(merged)
}

fn merge_enums(
    library: &DialectLibrary,
    order: &[DialectId],
    root: &Dialect,
) -> Result<Vec<EnumDef>, MavgenError> {
    let root_names: HashSet<&str> = root.enums.iter().map(|e| e.name.as_str()).collect();

    let mut merged: Vec<EnumDef> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for &id in order {
        let dialect = library.get(id);
        for def in &dialect.enums {
            if root_names.contains(def.name.as_str()) {
                debug!(enum_name = %def.name, from = %dialect.name, "overridden by root dialect");
                continue;
            }
            match by_name.get(def.name.as_str()) {
                Some(&index) => extend_enum(&mut merged[index], def)?,
                None => {
                    by_name.insert(def.name.as_str(), merged.len());
                    merged.push(def.clone());
                }
            }
        }
    }

    merged.extend(root.enums.iter().cloned());
    Ok(merged)
}

/// Unions the entries of `incoming` into `target`. Entries present in both
/// must carry the same value.
fn extend_enum(target: &mut EnumDef, incoming: &EnumDef) -> Result<(), MavgenError> {
    if target.width != incoming.width || target.bitmask != incoming.bitmask {
        return Err(MavgenError::EnumConflict {
            enum_name: target.name.clone(),
            entry:     "<definition>".to_string(),
            detail:    "included dialects disagree on width or bitmask flag".to_string(),
        });
    }

    for entry in &incoming.entries {
        match target.entries.iter().find(|e| e.name == entry.name) {
            Some(existing) if existing.value == entry.value => {}
            Some(existing) => {
                return Err(MavgenError::EnumConflict {
                    enum_name: target.name.clone(),
                    entry:     entry.name.clone(),
                    detail:    format!("value {} vs {}", existing.value, entry.value),
                });
            }
            None => target.entries.push(entry.clone()),
        }
    }
    Ok(())
}
