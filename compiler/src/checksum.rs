use mavgen_schema::X25;

use crate::layout::MessageLayout;

/// Bytes hashed into CRC-EXTRA: `NAME `, then for every base field in wire
/// order `type name ` and, for arrays, one byte of array length.
/// Extension fields never take part.
pub fn canonical_signature(message_name: &str, layout: &MessageLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(message_name.len() + 1 + layout.entries().len() * 16);
    out.extend_from_slice(message_name.as_bytes());
    out.push(b' ');
    for entry in layout.base_entries() {
        out.extend_from_slice(entry.primitive().canonical_name().as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name().as_bytes());
        out.push(b' ');
        if let Some(length) = entry.array_length() {
            out.push(length);
        }
    }
    out
}

/// Folds a 16-bit X.25 checksum into the one-byte seed.
pub fn fold(crc: u16) -> u8 {
    ((crc & 0xFF) ^ (crc >> 8)) as u8
}

/// CRC-EXTRA of a message with the given base layout.
pub fn derive_seed(message_name: &str, layout: &MessageLayout) -> u8 {
    let mut crc = X25::new();
    crc.accumulate_bytes(&canonical_signature(message_name, layout));
    fold(crc.value())
}
