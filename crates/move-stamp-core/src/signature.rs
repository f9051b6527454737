use std::fmt;

use crate::cursor::{Reader, Writer};
use crate::error::{Result, StampError};

/// Deepest type nesting accepted while decoding, e.g. `vector<vector<...>>`.
pub const MAX_TYPE_DEPTH: usize = 256;

const BOOL: u8 = 0x01;
const U8: u8 = 0x02;
const U64: u8 = 0x03;
const U128: u8 = 0x04;
const ADDRESS: u8 = 0x05;
const REFERENCE: u8 = 0x06;
const MUTABLE_REFERENCE: u8 = 0x07;
const DATATYPE: u8 = 0x08;
const TYPE_PARAMETER: u8 = 0x09;
const VECTOR: u8 = 0x0A;
const DATATYPE_INST: u8 = 0x0B;
const SIGNER: u8 = 0x0C;
const U16: u8 = 0x0D;
const U32: u8 = 0x0E;
const U256: u8 = 0x0F;

/// A serialized Move type, as found at the head of every constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureToken {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    Signer,
    Vector(Box<SignatureToken>),
    /// A struct or enum, by datatype handle index.
    Datatype(u16),
    DatatypeInstantiation(u16, Vec<SignatureToken>),
    Reference(Box<SignatureToken>),
    MutableReference(Box<SignatureToken>),
    TypeParameter(u16),
}

impl SignatureToken {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Self::decode_at_depth(r, 0)
    }

    fn decode_at_depth(r: &mut Reader<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_TYPE_DEPTH {
            return Err(r.error(format!("type nesting deeper than {MAX_TYPE_DEPTH}")));
        }
        let tag_offset = r.offset();
        let tag = r.u8()?;
        let token = match tag {
            BOOL => Self::Bool,
            U8 => Self::U8,
            U16 => Self::U16,
            U32 => Self::U32,
            U64 => Self::U64,
            U128 => Self::U128,
            U256 => Self::U256,
            ADDRESS => Self::Address,
            SIGNER => Self::Signer,
            VECTOR => Self::Vector(Box::new(Self::decode_at_depth(r, depth + 1)?)),
            REFERENCE => Self::Reference(Box::new(Self::decode_at_depth(r, depth + 1)?)),
            MUTABLE_REFERENCE => {
                Self::MutableReference(Box::new(Self::decode_at_depth(r, depth + 1)?))
            }
            DATATYPE => Self::Datatype(r.uleb128_u16()?),
            DATATYPE_INST => {
                let handle = r.uleb128_u16()?;
                let arity = r.uleb128_u16()?;
                let mut args = Vec::with_capacity(usize::from(arity).min(r.remaining()));
                for _ in 0..arity {
                    args.push(Self::decode_at_depth(r, depth + 1)?);
                }
                Self::DatatypeInstantiation(handle, args)
            }
            TYPE_PARAMETER => Self::TypeParameter(r.uleb128_u16()?),
            other => {
                return Err(StampError::format(
                    tag_offset,
                    format!("unrecognized type tag 0x{other:02x}"),
                ))
            }
        };
        Ok(token)
    }

    pub fn encode(&self, w: &mut Writer) {
        match self {
            Self::Bool => w.u8(BOOL),
            Self::U8 => w.u8(U8),
            Self::U16 => w.u8(U16),
            Self::U32 => w.u8(U32),
            Self::U64 => w.u8(U64),
            Self::U128 => w.u8(U128),
            Self::U256 => w.u8(U256),
            Self::Address => w.u8(ADDRESS),
            Self::Signer => w.u8(SIGNER),
            Self::Vector(inner) => {
                w.u8(VECTOR);
                inner.encode(w);
            }
            Self::Reference(inner) => {
                w.u8(REFERENCE);
                inner.encode(w);
            }
            Self::MutableReference(inner) => {
                w.u8(MUTABLE_REFERENCE);
                inner.encode(w);
            }
            Self::Datatype(handle) => {
                w.u8(DATATYPE);
                w.uleb128(u64::from(*handle));
            }
            Self::DatatypeInstantiation(handle, args) => {
                w.u8(DATATYPE_INST);
                w.uleb128(u64::from(*handle));
                w.uleb128(args.len() as u64);
                for arg in args {
                    arg.encode(w);
                }
            }
            Self::TypeParameter(idx) => {
                w.u8(TYPE_PARAMETER);
                w.uleb128(u64::from(*idx));
            }
        }
    }
}

impl fmt::Display for SignatureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::U128 => write!(f, "u128"),
            Self::U256 => write!(f, "u256"),
            Self::Address => write!(f, "address"),
            Self::Signer => write!(f, "signer"),
            Self::Vector(inner) => write!(f, "vector<{inner}>"),
            Self::Reference(inner) => write!(f, "&{inner}"),
            Self::MutableReference(inner) => write!(f, "&mut {inner}"),
            Self::Datatype(handle) => write!(f, "datatype#{handle}"),
            Self::DatatypeInstantiation(handle, args) => {
                write!(f, "datatype#{handle}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Self::TypeParameter(idx) => write!(f, "T{idx}"),
        }
    }
}
