//! In-memory model of a compiled Move module.
//!
//! ## Binary layout
//!
//! ```text
//! magic(A1 1C EB 0B) | version(u32 LE) | table_count(uleb)
//! table_count x [ kind(u8) | offset(uleb) | length(uleb) ]
//! table contents, contiguous, in offset order
//! self_module_handle(uleb)            -- version >= 5 only
//! ```
//!
//! The identifier pool, constant pool, address identifiers and module handles
//! are decoded into typed records. Every other table (signatures, function
//! bodies, struct definitions, ...) is carried as an opaque byte blob: the
//! patcher never needs to look inside them, and they only ever refer to the
//! typed pools by index, which editing never changes.
//!
//! Headers may list the tables in any order; contents are read by offset.
//! Encoding writes contents back in offset order and the directory in its
//! original order, recomputing offsets and lengths. Together with canonical ULEB128 decoding this makes
//! `encode(decode(b)) == b` for every accepted `b`.

use std::fmt;

use crate::constant::{Constant, ConstantValue, ADDRESS_LENGTH};
use crate::cursor::{Reader, Writer};
use crate::error::{Result, StampError};

/// First four bytes of every Move module.
pub const MAGIC: [u8; 4] = [0xA1, 0x1C, 0xEB, 0x0B];

/// Highest bytecode version this crate carries.
pub const MAX_VERSION: u32 = 7;

/// First version that writes the self module handle after the tables.
pub const VERSION_WITH_SELF_HANDLE: u32 = 5;

/// Longest identifier the binary format can carry, in bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = u16::MAX as usize;

const VERSION_MASK: u32 = 0x00FF_FFFF;

/// Table identifiers used in the table directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TableKind {
    ModuleHandles = 0x01,
    StructHandles = 0x02,
    FunctionHandles = 0x03,
    FunctionInstantiations = 0x04,
    Signatures = 0x05,
    ConstantPool = 0x06,
    Identifiers = 0x07,
    AddressIdentifiers = 0x08,
    StructDefs = 0x0A,
    StructDefInstantiations = 0x0B,
    FunctionDefs = 0x0C,
    FieldHandles = 0x0D,
    FieldInstantiations = 0x0E,
    FriendDecls = 0x0F,
    Metadata = 0x10,
    EnumDefs = 0x11,
    EnumDefInstantiations = 0x12,
    VariantHandles = 0x13,
    VariantInstantiationHandles = 0x14,
}

impl TryFrom<u8> for TableKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        let kind = match value {
            0x01 => Self::ModuleHandles,
            0x02 => Self::StructHandles,
            0x03 => Self::FunctionHandles,
            0x04 => Self::FunctionInstantiations,
            0x05 => Self::Signatures,
            0x06 => Self::ConstantPool,
            0x07 => Self::Identifiers,
            0x08 => Self::AddressIdentifiers,
            0x0A => Self::StructDefs,
            0x0B => Self::StructDefInstantiations,
            0x0C => Self::FunctionDefs,
            0x0D => Self::FieldHandles,
            0x0E => Self::FieldInstantiations,
            0x0F => Self::FriendDecls,
            0x10 => Self::Metadata,
            0x11 => Self::EnumDefs,
            0x12 => Self::EnumDefInstantiations,
            0x13 => Self::VariantHandles,
            0x14 => Self::VariantInstantiationHandles,
            other => return Err(other),
        };
        Ok(kind)
    }
}

/// A reference to a module: `address_identifiers[address]::identifiers[name]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHandle {
    pub address: u16,
    pub name: u16,
}

struct TableHeader {
    kind: TableKind,
    offset: u64,
    length: u64,
    /// Position of the header entry, for error reporting.
    at: usize,
}

/// Where a table's contents live in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableSlot {
    /// Decoded into one of the typed pools on [`Module`].
    Typed(TableKind),
    /// Carried through byte-for-byte.
    Opaque(TableKind, Vec<u8>),
}

impl TableSlot {
    fn kind(&self) -> TableKind {
        match self {
            Self::Typed(kind) | Self::Opaque(kind, _) => *kind,
        }
    }
}

/// A decoded Move module.
///
/// The typed pools are plain vectors that the patcher only indexes and
/// overwrites; nothing in this crate inserts into or removes from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    version_word: u32,
    /// Table kinds in directory order.
    directory: Vec<TableKind>,
    /// Table contents in offset order.
    layout: Vec<TableSlot>,
    identifiers: Vec<String>,
    constants: Vec<Constant>,
    address_identifiers: Vec<[u8; ADDRESS_LENGTH]>,
    module_handles: Vec<ModuleHandle>,
    self_module_handle: Option<u16>,
}

impl Module {
    /// Decode a serialized module. Malformed input is rejected wholesale.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);

        let magic = r.bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(StampError::format(0, "bad magic, not a Move module"));
        }

        let version_word = r.u32()?;
        let version = version_word & VERSION_MASK;
        if version == 0 || version > MAX_VERSION {
            return Err(StampError::UnsupportedVersion {
                version,
                max: MAX_VERSION,
            });
        }

        let table_count = r.uleb128(u64::from(u8::MAX))?;
        let mut headers: Vec<TableHeader> = Vec::with_capacity(table_count as usize);
        for _ in 0..table_count {
            let at = r.offset();
            let raw_kind = r.u8()?;
            let kind = TableKind::try_from(raw_kind)
                .map_err(|k| StampError::format(at, format!("unknown table kind 0x{k:02x}")))?;
            if headers.iter().any(|h| h.kind == kind) {
                return Err(StampError::format(at, format!("duplicate table {kind:?}")));
            }
            headers.push(TableHeader {
                kind,
                offset: u64::from(r.uleb128_u32()?),
                length: u64::from(r.uleb128_u32()?),
                at,
            });
        }

        // Contents are read in offset order. Empty tables sort ahead of the
        // table sharing their offset so re-encoding gives them the same one.
        let directory: Vec<TableKind> = headers.iter().map(|h| h.kind).collect();
        headers.sort_by_key(|h| (h.offset, h.length));
        let mut expected_offset: u64 = 0;
        for h in &headers {
            if h.offset != expected_offset {
                return Err(StampError::format(
                    h.at,
                    format!(
                        "table {:?} at offset {}, expected {expected_offset}",
                        h.kind, h.offset
                    ),
                ));
            }
            expected_offset += h.length;
        }

        let contents_start = r.offset();
        if expected_offset > r.remaining() as u64 {
            return Err(StampError::format(
                contents_start,
                format!(
                    "tables need {expected_offset} bytes, only {} left",
                    r.remaining()
                ),
            ));
        }

        let mut module = Self {
            version_word,
            directory,
            layout: Vec::with_capacity(headers.len()),
            identifiers: Vec::new(),
            constants: Vec::new(),
            address_identifiers: Vec::new(),
            module_handles: Vec::new(),
            self_module_handle: None,
        };

        for TableHeader { kind, length, .. } in headers {
            let length = length as usize;
            let base = r.offset();
            let contents = r.bytes(length)?;
            let mut table = Reader::with_base(contents, base);
            let slot = match kind {
                TableKind::Identifiers => {
                    while !table.is_empty() {
                        module.identifiers.push(decode_identifier(&mut table)?);
                    }
                    TableSlot::Typed(kind)
                }
                TableKind::ConstantPool => {
                    while !table.is_empty() {
                        module.constants.push(Constant::decode(&mut table)?);
                    }
                    TableSlot::Typed(kind)
                }
                TableKind::AddressIdentifiers => {
                    if length % ADDRESS_LENGTH != 0 {
                        return Err(StampError::format(
                            base,
                            format!("address table length {length} is not a multiple of {ADDRESS_LENGTH}"),
                        ));
                    }
                    for chunk in contents.chunks_exact(ADDRESS_LENGTH) {
                        let mut addr = [0u8; ADDRESS_LENGTH];
                        addr.copy_from_slice(chunk);
                        module.address_identifiers.push(addr);
                    }
                    TableSlot::Typed(kind)
                }
                TableKind::ModuleHandles => {
                    while !table.is_empty() {
                        module.module_handles.push(ModuleHandle {
                            address: table.uleb128_u16()?,
                            name: table.uleb128_u16()?,
                        });
                    }
                    TableSlot::Typed(kind)
                }
                _ => TableSlot::Opaque(kind, contents.to_vec()),
            };
            module.layout.push(slot);
        }

        if version >= VERSION_WITH_SELF_HANDLE {
            module.self_module_handle = Some(r.uleb128_u16()?);
        }
        r.finish("module")?;

        tracing::debug!(
            version,
            tables = module.layout.len(),
            identifiers = module.identifiers.len(),
            constants = module.constants.len(),
            "decoded module"
        );
        Ok(module)
    }

    /// Serialize the module. Pools are written in place, never reordered.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut tables: Vec<(TableKind, Vec<u8>)> = Vec::with_capacity(self.layout.len());
        for slot in &self.layout {
            let contents = match slot {
                TableSlot::Opaque(_, bytes) => bytes.clone(),
                TableSlot::Typed(kind) => self.encode_typed(*kind),
            };
            if contents.len() > u32::MAX as usize {
                return Err(StampError::format(
                    0,
                    format!("table {:?} exceeds {} bytes", slot.kind(), u32::MAX),
                ));
            }
            tables.push((slot.kind(), contents));
        }

        let mut offsets = Vec::with_capacity(tables.len());
        let mut offset: u64 = 0;
        for (kind, contents) in &tables {
            offsets.push((*kind, offset, contents.len() as u64));
            offset += contents.len() as u64;
        }
        if offset > u64::from(u32::MAX) {
            return Err(StampError::format(0, "table contents exceed u32 offsets"));
        }

        let mut w = Writer::new();
        w.bytes(&MAGIC);
        w.u32(self.version_word);
        w.uleb128(self.directory.len() as u64);
        for kind in &self.directory {
            let (_, offset, length) = offsets
                .iter()
                .find(|(k, _, _)| k == kind)
                .copied()
                .ok_or_else(|| StampError::format(0, format!("no contents for table {kind:?}")))?;
            w.u8(*kind as u8);
            w.uleb128(offset);
            w.uleb128(length);
        }
        for (_, contents) in &tables {
            w.bytes(contents);
        }
        if let Some(idx) = self.self_module_handle {
            w.uleb128(u64::from(idx));
        }
        Ok(w.into_inner())
    }

    fn encode_typed(&self, kind: TableKind) -> Vec<u8> {
        let mut w = Writer::new();
        match kind {
            TableKind::Identifiers => {
                for ident in &self.identifiers {
                    w.uleb128(ident.len() as u64);
                    w.bytes(ident.as_bytes());
                }
            }
            TableKind::ConstantPool => {
                for constant in &self.constants {
                    constant.encode(&mut w);
                }
            }
            TableKind::AddressIdentifiers => {
                for addr in &self.address_identifiers {
                    w.bytes(addr);
                }
            }
            TableKind::ModuleHandles => {
                for handle in &self.module_handles {
                    w.uleb128(u64::from(handle.address));
                    w.uleb128(u64::from(handle.name));
                }
            }
            _ => {}
        }
        w.into_inner()
    }

    /// Bytecode version, without the flavor byte.
    pub fn version(&self) -> u32 {
        self.version_word & VERSION_MASK
    }

    /// Binary flavor tag carried in the high byte of the version word.
    pub fn flavor(&self) -> u8 {
        (self.version_word >> 24) as u8
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn address_identifiers(&self) -> &[[u8; ADDRESS_LENGTH]] {
        &self.address_identifiers
    }

    pub fn module_handles(&self) -> &[ModuleHandle] {
        &self.module_handles
    }

    /// Index of this module's own handle. Versions before 5 always use 0.
    pub fn self_module_handle(&self) -> u16 {
        self.self_module_handle.unwrap_or(0)
    }

    /// Table kinds in the order the table directory lists them.
    pub fn table_kinds(&self) -> Vec<TableKind> {
        self.directory.clone()
    }

    /// Raw bytes of a table carried through untouched.
    pub fn opaque_table(&self, kind: TableKind) -> Option<&[u8]> {
        self.layout.iter().find_map(|slot| match slot {
            TableSlot::Opaque(k, bytes) if *k == kind => Some(bytes.as_slice()),
            _ => None,
        })
    }

    /// The module's own name, resolved through its self handle.
    pub fn name(&self) -> Option<&str> {
        let handle = self.module_handles.get(usize::from(self.self_module_handle()))?;
        self.identifiers
            .get(usize::from(handle.name))
            .map(String::as_str)
    }

    /// Decoded value of the constant at `index`.
    pub fn constant_value(&self, index: usize) -> Result<ConstantValue> {
        let constant = self.constant(index)?;
        let ty = constant.constant_type().ok_or_else(|| StampError::TypeMismatch {
            index,
            expected: "a primitive or string constant".into(),
            found: constant.ty.to_string(),
        })?;
        ConstantValue::from_bcs(ty, &constant.data)
    }

    pub(crate) fn constant(&self, index: usize) -> Result<&Constant> {
        self.constants.get(index).ok_or(StampError::ConstantIndex {
            index,
            len: self.constants.len(),
        })
    }

    pub(crate) fn constants_mut(&mut self) -> &mut [Constant] {
        &mut self.constants
    }

    pub(crate) fn identifiers_mut(&mut self) -> &mut [String] {
        &mut self.identifiers
    }

    /// Check that every decoded handle points inside the pool it indexes.
    pub fn check_references(&self) -> Result<()> {
        for (i, handle) in self.module_handles.iter().enumerate() {
            if usize::from(handle.name) >= self.identifiers.len() {
                return Err(StampError::ReferenceIntegrity(format!(
                    "module handle {i} names identifier {} of {}",
                    handle.name,
                    self.identifiers.len()
                )));
            }
            if usize::from(handle.address) >= self.address_identifiers.len() {
                return Err(StampError::ReferenceIntegrity(format!(
                    "module handle {i} names address {} of {}",
                    handle.address,
                    self.address_identifiers.len()
                )));
            }
        }
        if let Some(idx) = self.self_module_handle {
            if usize::from(idx) >= self.module_handles.len() {
                return Err(StampError::ReferenceIntegrity(format!(
                    "self module handle {idx} of {}",
                    self.module_handles.len()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "module {} (v{}, {} identifiers, {} constants)",
            self.name().unwrap_or("<unnamed>"),
            self.version(),
            self.identifiers.len(),
            self.constants.len()
        )
    }
}

fn decode_identifier(r: &mut Reader<'_>) -> Result<String> {
    let len = r.uleb128(MAX_IDENTIFIER_LENGTH as u64)? as usize;
    let offset = r.offset();
    let bytes = r.bytes(len)?;
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| StampError::format(offset, format!("identifier is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use crate::signature::SignatureToken;

    #[test]
    fn test_decode_template_pools() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        assert_eq!(module.version(), 6);
        assert_eq!(module.identifiers(), fixture::IDENTIFIERS);
        assert_eq!(module.constants().len(), 8);
        assert_eq!(module.constants()[0].ty, SignatureToken::U64);
        assert_eq!(module.module_handles().len(), 2);
        assert_eq!(module.address_identifiers().len(), 2);
        assert_eq!(module.name(), Some("template"));
    }

    #[test]
    fn test_roundtrip_identity() {
        let bytes = fixture::template_bytes();
        let module = Module::decode(&bytes).unwrap();
        assert_eq!(module.encode().unwrap(), bytes);
    }

    #[test]
    fn test_directory_in_any_order() {
        let tables = fixture::template_tables();
        let listing: Vec<usize> = (0..tables.len()).rev().collect();
        let bytes = fixture::module_bytes_listed(6, &tables, &listing, Some(0));

        let module = Module::decode(&bytes).unwrap();
        let in_order = Module::decode(&fixture::template_bytes()).unwrap();
        assert_eq!(module.identifiers(), in_order.identifiers());
        assert_eq!(module.constants(), in_order.constants());
        assert_eq!(module.name(), Some("template"));
        assert_eq!(
            module.table_kinds(),
            listing.iter().map(|&i| tables[i].0).collect::<Vec<_>>()
        );
        assert_eq!(module.encode().unwrap(), bytes);
    }

    #[test]
    fn test_permuted_directory_survives_patching() {
        let tables = fixture::template_tables();
        let mut listing: Vec<usize> = (0..tables.len()).collect();
        listing.swap(0, tables.len() - 1);
        let bytes = fixture::module_bytes_listed(6, &tables, &listing, Some(0));

        let mut module = Module::decode(&bytes).unwrap();
        module
            .rename_identifiers(&crate::plan::RenameMap::module_rename("template", "joke_papa"))
            .unwrap();
        let reparsed = Module::decode(&module.encode().unwrap()).unwrap();
        assert_eq!(reparsed.name(), Some("joke_papa"));
        assert_eq!(reparsed.table_kinds(), module.table_kinds());
    }

    #[test]
    fn test_empty_table_sharing_an_offset_roundtrips() {
        let tables = vec![
            (TableKind::Identifiers, vec![0x01, b'a']),
            (TableKind::FriendDecls, Vec::new()),
            (TableKind::Metadata, vec![0x00]),
        ];
        // FriendDecls (empty) and Metadata share offset 2; list Metadata first
        let bytes = fixture::module_bytes_listed(4, &tables, &[2, 0, 1], None);
        let module = Module::decode(&bytes).unwrap();
        assert_eq!(module.opaque_table(TableKind::Metadata), Some(&[0x00][..]));
        assert_eq!(module.encode().unwrap(), bytes);
    }

    #[test]
    fn test_overlapping_tables_rejected() {
        let tables = vec![
            (TableKind::Identifiers, vec![0x01, b'a']),
            (TableKind::Metadata, vec![0x00]),
        ];
        let mut bytes = fixture::module_bytes_listed(4, &tables, &[1, 0], None);
        assert!(Module::decode(&bytes).is_ok());
        // Metadata header: kind at 9, offset at 10. Point it into Identifiers.
        bytes[10] = 0x00;
        let err = Module::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("expected 1"), "{err}");
    }

    #[test]
    fn test_roundtrip_preserves_flavor_byte() {
        let bytes = fixture::template_bytes_with_version(0x0500_0006);
        let module = Module::decode(&bytes).unwrap();
        assert_eq!(module.version(), 6);
        assert_eq!(module.flavor(), 5);
        assert_eq!(module.encode().unwrap(), bytes);
    }

    #[test]
    fn test_roundtrip_pre_v5_has_no_trailer() {
        let bytes = fixture::template_bytes_with_version(4);
        let module = Module::decode(&bytes).unwrap();
        assert_eq!(module.self_module_handle(), 0);
        assert_eq!(module.name(), Some("template"));
        assert_eq!(module.encode().unwrap(), bytes);
    }

    #[test]
    fn test_opaque_tables_carried_verbatim() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        assert_eq!(
            module.opaque_table(TableKind::StructHandles),
            Some(fixture::STRUCT_HANDLES)
        );
        assert_eq!(
            module.opaque_table(TableKind::FunctionDefs),
            Some(fixture::FUNCTION_DEFS)
        );
        assert_eq!(module.opaque_table(TableKind::Identifiers), None);
    }

    #[test]
    fn test_constant_value_lookup() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        assert_eq!(module.constant_value(1).unwrap(), ConstantValue::U8(9));
        assert_eq!(
            module.constant_value(2).unwrap(),
            ConstantValue::String("Symbol".into())
        );
        assert!(matches!(
            module.constant_value(8).unwrap_err(),
            StampError::ConstantIndex { index: 8, len: 8 }
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = fixture::template_bytes();
        bytes[0] = 0x00;
        assert!(matches!(
            Module::decode(&bytes).unwrap_err(),
            StampError::Format { offset: 0, .. }
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let bytes = fixture::template_bytes_with_version(99);
        assert!(matches!(
            Module::decode(&bytes).unwrap_err(),
            StampError::UnsupportedVersion { version: 99, .. }
        ));
    }

    #[test]
    fn test_truncated_input_rejected_at_every_length() {
        let bytes = fixture::template_bytes();
        for len in 0..bytes.len() {
            assert!(
                Module::decode(&bytes[..len]).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = fixture::template_bytes();
        bytes.push(0);
        assert!(Module::decode(&bytes).is_err());
    }

    #[test]
    fn test_unknown_table_kind_rejected() {
        let mut bytes = fixture::template_bytes();
        // first table header kind byte follows magic, version and table count
        bytes[9] = 0x09;
        let err = Module::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown table kind 0x09"));
    }

    #[test]
    fn test_out_of_range_table_offset_rejected() {
        let mut bytes = fixture::template_bytes();
        // offset of the first table must be zero
        bytes[10] = 0x01;
        assert!(Module::decode(&bytes).is_err());
    }

    #[test]
    fn test_unknown_constant_type_rejected() {
        let bytes = fixture::module_bytes(
            6,
            &[(TableKind::ConstantPool, vec![0x42, 0x01, 0x00])],
            Some(0),
        );
        let err = Module::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unrecognized type tag 0x42"));
    }

    #[test]
    fn test_reference_check_flags_dangling_handle() {
        let bytes = fixture::module_bytes(
            6,
            &[
                (TableKind::ModuleHandles, vec![0x00, 0x05]),
                (TableKind::Identifiers, vec![0x01, b'a']),
                (TableKind::AddressIdentifiers, vec![0u8; 32]),
            ],
            Some(0),
        );
        let module = Module::decode(&bytes).unwrap();
        assert!(matches!(
            module.check_references().unwrap_err(),
            StampError::ReferenceIntegrity(_)
        ));
    }

    #[test]
    fn test_template_references_are_sound() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        module.check_references().unwrap();
    }

    #[test]
    fn test_display() {
        let module = Module::decode(&fixture::template_bytes()).unwrap();
        assert_eq!(
            module.to_string(),
            "module template (v6, 6 identifiers, 8 constants)"
        );
    }
}
