//! Hand-assembled module bytes for unit tests.
//!
//! The layout is written out table by table, independently of
//! [`crate::module::Module::encode`], so decode and encode are each checked
//! against bytes they did not produce.

use crate::cursor::Writer;
use crate::module::{TableKind, MAGIC};

pub const IDENTIFIERS: &[&str] = &[
    "TEMPLATE",
    "coin",
    "dummy_field",
    "init",
    "template",
    "transfer",
];

/// Index of `template` in [`IDENTIFIERS`].
pub const MODULE_NAME_INDEX: usize = 4;
/// Index of `TEMPLATE` in [`IDENTIFIERS`].
pub const WITNESS_NAME_INDEX: usize = 0;

// self: 0x0::template, then 0x2::coin
pub const MODULE_HANDLES: &[u8] = &[0x00, 0x04, 0x01, 0x01];
// struct TEMPLATE has drop
pub const STRUCT_HANDLES: &[u8] = &[0x00, 0x00, 0x04, 0x00];
// fun init()
pub const FUNCTION_HANDLES: &[u8] = &[0x00, 0x03, 0x00, 0x00, 0x00];
pub const SIGNATURES: &[u8] = &[0x00];
// TEMPLATE { dummy_field: bool }
pub const STRUCT_DEFS: &[u8] = &[0x00, 0x02, 0x01, 0x02, 0x01];
pub const FUNCTION_DEFS: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02];

pub fn u64_constant(v: u64) -> Vec<u8> {
    let mut out = vec![0x03, 0x08];
    out.extend_from_slice(&v.to_le_bytes());
    out
}

pub fn u8_constant(v: u8) -> Vec<u8> {
    vec![0x02, 0x01, v]
}

/// `vector<u8>` constant; only short strings so both prefixes are one byte.
pub fn string_constant(s: &str) -> Vec<u8> {
    assert!(s.len() < 127);
    let mut out = vec![0x0A, 0x02, s.len() as u8 + 1, s.len() as u8];
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn template_constants() -> Vec<u8> {
    [
        u64_constant(100),
        u8_constant(9),
        string_constant("Symbol"),
        string_constant("Name"),
        string_constant("Description"),
        string_constant("icon_url"),
        u64_constant(1000),
        u64_constant(10000),
    ]
    .concat()
}

pub fn identifier_table(idents: &[&str]) -> Vec<u8> {
    let mut w = Writer::new();
    for ident in idents {
        w.uleb128(ident.len() as u64);
        w.bytes(ident.as_bytes());
    }
    w.into_inner()
}

pub fn address_table() -> Vec<u8> {
    let mut out = vec![0u8; 64];
    out[63] = 0x02;
    out
}

/// Assemble a module from raw table contents, in the given order.
pub fn module_bytes(
    version_word: u32,
    tables: &[(TableKind, Vec<u8>)],
    self_handle: Option<u8>,
) -> Vec<u8> {
    let mut w = Writer::new();
    w.bytes(&MAGIC);
    w.u32(version_word);
    w.uleb128(tables.len() as u64);
    let mut offset = 0u64;
    for (kind, contents) in tables {
        w.u8(*kind as u8);
        w.uleb128(offset);
        w.uleb128(contents.len() as u64);
        offset += contents.len() as u64;
    }
    for (_, contents) in tables {
        w.bytes(contents);
    }
    if let Some(idx) = self_handle {
        w.u8(idx);
    }
    w.into_inner()
}

/// Like [`module_bytes`], but the table directory lists `tables` in the
/// order given by `listing` (indices into `tables`). Contents stay in
/// `tables` order.
pub fn module_bytes_listed(
    version_word: u32,
    tables: &[(TableKind, Vec<u8>)],
    listing: &[usize],
    self_handle: Option<u8>,
) -> Vec<u8> {
    let mut offsets = Vec::with_capacity(tables.len());
    let mut offset = 0u64;
    for (_, contents) in tables {
        offsets.push(offset);
        offset += contents.len() as u64;
    }

    let mut w = Writer::new();
    w.bytes(&MAGIC);
    w.u32(version_word);
    w.uleb128(listing.len() as u64);
    for &i in listing {
        w.u8(tables[i].0 as u8);
        w.uleb128(offsets[i]);
        w.uleb128(tables[i].1.len() as u64);
    }
    for (_, contents) in tables {
        w.bytes(contents);
    }
    if let Some(idx) = self_handle {
        w.u8(idx);
    }
    w.into_inner()
}

pub fn template_tables() -> Vec<(TableKind, Vec<u8>)> {
    vec![
        (TableKind::ModuleHandles, MODULE_HANDLES.to_vec()),
        (TableKind::StructHandles, STRUCT_HANDLES.to_vec()),
        (TableKind::FunctionHandles, FUNCTION_HANDLES.to_vec()),
        (TableKind::Signatures, SIGNATURES.to_vec()),
        (TableKind::ConstantPool, template_constants()),
        (TableKind::Identifiers, identifier_table(IDENTIFIERS)),
        (TableKind::AddressIdentifiers, address_table()),
        (TableKind::StructDefs, STRUCT_DEFS.to_vec()),
        (TableKind::FunctionDefs, FUNCTION_DEFS.to_vec()),
    ]
}

pub fn template_bytes_with_version(version_word: u32) -> Vec<u8> {
    let self_handle = if version_word & 0x00FF_FFFF >= 5 {
        Some(0)
    } else {
        None
    };
    module_bytes(version_word, &template_tables(), self_handle)
}

pub fn template_bytes() -> Vec<u8> {
    template_bytes_with_version(6)
}
