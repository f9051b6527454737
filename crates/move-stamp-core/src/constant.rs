//! Typed constant values and their BCS wire encoding.
//!
//! Edits arrive as human-readable literals (`"100"`, `"Symbol"`). They are
//! parsed into a [`ConstantValue`] for a declared [`ConstantType`] before any
//! module bytes are touched, so an ill-typed literal never reaches the pool.
//!
//! ## Wire format
//!
//! A constant's payload is the BCS encoding of its value:
//! - integers: fixed-width little-endian (`u8` = 1 byte, ..., `u256` = 32 bytes)
//! - `bool`: one byte, `0` or `1`
//! - `address`: 32 raw bytes
//! - `string`: `vector<u8>`, i.e. ULEB128 length prefix followed by UTF-8 bytes

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{Num, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::cursor::{Reader, Writer};
use crate::error::{Result, StampError};
use crate::signature::SignatureToken;

/// Length of an on-chain address in bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// Largest string payload accepted in a constant edit.
pub const MAX_STRING_LENGTH: usize = u32::MAX as usize;

/// One entry of the constant pool: a declared type and its encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub ty: SignatureToken,
    /// BCS bytes of the value, without the outer length prefix.
    pub data: Vec<u8>,
}

impl Constant {
    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let ty = SignatureToken::decode(r)?;
        let len = r.uleb128_u32()?;
        let data = r.bytes(len as usize)?.to_vec();
        Ok(Self { ty, data })
    }

    pub(crate) fn encode(&self, w: &mut Writer) {
        self.ty.encode(w);
        w.uleb128(self.data.len() as u64);
        w.bytes(&self.data);
    }

    /// The edit type matching this constant's declared type, if it is one
    /// the patcher knows how to read and write.
    pub fn constant_type(&self) -> Option<ConstantType> {
        ConstantType::from_signature(&self.ty)
    }

    /// Decode the payload according to the declared type.
    pub fn value(&self) -> Option<ConstantValue> {
        let ty = self.constant_type()?;
        ConstantValue::from_bcs(ty, &self.data).ok()
    }
}

/// Types a constant edit can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    /// UTF-8 text stored as `vector<u8>`.
    String,
}

impl ConstantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::U256 => "u256",
            Self::Address => "address",
            Self::String => "string",
        }
    }

    /// The signature token a constant of this type is declared with.
    pub fn signature(&self) -> SignatureToken {
        match self {
            Self::Bool => SignatureToken::Bool,
            Self::U8 => SignatureToken::U8,
            Self::U16 => SignatureToken::U16,
            Self::U32 => SignatureToken::U32,
            Self::U64 => SignatureToken::U64,
            Self::U128 => SignatureToken::U128,
            Self::U256 => SignatureToken::U256,
            Self::Address => SignatureToken::Address,
            Self::String => SignatureToken::Vector(Box::new(SignatureToken::U8)),
        }
    }

    pub fn from_signature(token: &SignatureToken) -> Option<Self> {
        let ty = match token {
            SignatureToken::Bool => Self::Bool,
            SignatureToken::U8 => Self::U8,
            SignatureToken::U16 => Self::U16,
            SignatureToken::U32 => Self::U32,
            SignatureToken::U64 => Self::U64,
            SignatureToken::U128 => Self::U128,
            SignatureToken::U256 => Self::U256,
            SignatureToken::Address => Self::Address,
            SignatureToken::Vector(inner) if **inner == SignatureToken::U8 => Self::String,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for ConstantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstantType {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bool" => Ok(Self::Bool),
            "u8" => Ok(Self::U8),
            "u16" => Ok(Self::U16),
            "u32" => Ok(Self::U32),
            "u64" => Ok(Self::U64),
            "u128" => Ok(Self::U128),
            "u256" => Ok(Self::U256),
            "address" => Ok(Self::Address),
            "string" | "vector<u8>" => Ok(Self::String),
            other => Err(StampError::InvalidLiteral {
                ty: "constant type".into(),
                value: other.into(),
            }),
        }
    }
}

/// A constant value already validated against its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    U256(BigUint),
    Address([u8; ADDRESS_LENGTH]),
    String(String),
}

impl ConstantValue {
    /// Parse a literal as a value of `ty`.
    ///
    /// Integers are plain decimal; anything that is not a run of ASCII digits is
    /// an [`StampError::InvalidLiteral`], a well-formed number wider than the
    /// type is an [`StampError::EncodingRange`].
    pub fn parse(ty: ConstantType, literal: &str) -> Result<Self> {
        match ty {
            ConstantType::Bool => match literal {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(invalid(ty, literal)),
            },
            ConstantType::U8 => narrow(ty, literal, 8, BigUint::to_u8).map(Self::U8),
            ConstantType::U16 => narrow(ty, literal, 16, BigUint::to_u16).map(Self::U16),
            ConstantType::U32 => narrow(ty, literal, 32, BigUint::to_u32).map(Self::U32),
            ConstantType::U64 => narrow(ty, literal, 64, BigUint::to_u64).map(Self::U64),
            ConstantType::U128 => narrow(ty, literal, 128, BigUint::to_u128).map(Self::U128),
            ConstantType::U256 => parse_unsigned(ty, literal, 256).map(Self::U256),
            ConstantType::Address => parse_address(literal).map(Self::Address),
            ConstantType::String => {
                if literal.len() > MAX_STRING_LENGTH {
                    return Err(out_of_range(ty, &format!("{} bytes", literal.len())));
                }
                Ok(Self::String(literal.to_string()))
            }
        }
    }

    pub fn ty(&self) -> ConstantType {
        match self {
            Self::Bool(_) => ConstantType::Bool,
            Self::U8(_) => ConstantType::U8,
            Self::U16(_) => ConstantType::U16,
            Self::U32(_) => ConstantType::U32,
            Self::U64(_) => ConstantType::U64,
            Self::U128(_) => ConstantType::U128,
            Self::U256(_) => ConstantType::U256,
            Self::Address(_) => ConstantType::Address,
            Self::String(_) => ConstantType::String,
        }
    }

    /// BCS encoding of the value.
    pub fn to_bcs(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            Self::Bool(v) => w.u8(u8::from(*v)),
            Self::U8(v) => w.u8(*v),
            Self::U16(v) => w.bytes(&v.to_le_bytes()),
            Self::U32(v) => w.bytes(&v.to_le_bytes()),
            Self::U64(v) => w.bytes(&v.to_le_bytes()),
            Self::U128(v) => w.bytes(&v.to_le_bytes()),
            Self::U256(v) => {
                let mut le = v.to_bytes_le();
                le.resize(32, 0);
                w.bytes(&le);
            }
            Self::Address(addr) => w.bytes(addr),
            Self::String(s) => {
                w.uleb128(s.len() as u64);
                w.bytes(s.as_bytes());
            }
        }
        w.into_inner()
    }

    /// Decode a BCS payload as a value of `ty`. The payload must be consumed exactly.
    pub fn from_bcs(ty: ConstantType, data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let value = match ty {
            ConstantType::Bool => match r.u8()? {
                0 => Self::Bool(false),
                1 => Self::Bool(true),
                other => return Err(StampError::format(0, format!("invalid bool byte {other}"))),
            },
            ConstantType::U8 => Self::U8(r.u8()?),
            ConstantType::U16 => Self::U16(u16::from_le_bytes(fixed(&mut r)?)),
            ConstantType::U32 => Self::U32(u32::from_le_bytes(fixed(&mut r)?)),
            ConstantType::U64 => Self::U64(u64::from_le_bytes(fixed(&mut r)?)),
            ConstantType::U128 => Self::U128(u128::from_le_bytes(fixed(&mut r)?)),
            ConstantType::U256 => Self::U256(BigUint::from_bytes_le(r.bytes(32)?)),
            ConstantType::Address => Self::Address(fixed(&mut r)?),
            ConstantType::String => {
                let len = r.uleb128_u32()?;
                let offset = r.offset();
                let bytes = r.bytes(len as usize)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| StampError::format(offset, format!("invalid UTF-8: {e}")))?;
                Self::String(s.to_string())
            }
        };
        r.finish("constant value")?;
        Ok(value)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::U128(v) => write!(f, "{v}"),
            Self::U256(v) => write!(f, "{v}"),
            Self::Address(addr) => write!(f, "0x{}", hex::encode(addr)),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Parse an unsigned decimal and narrow it to a primitive no wider than `bits`.
fn narrow<T>(
    ty: ConstantType,
    literal: &str,
    bits: u64,
    convert: impl FnOnce(&BigUint) -> Option<T>,
) -> Result<T> {
    let n = parse_unsigned(ty, literal, bits)?;
    convert(&n).ok_or_else(|| out_of_range(ty, literal))
}

fn parse_unsigned(ty: ConstantType, literal: &str, bits: u64) -> Result<BigUint> {
    if literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(ty, literal));
    }
    let n = BigUint::from_str_radix(literal, 10).map_err(|_| invalid(ty, literal))?;
    if n.bits() > bits {
        return Err(out_of_range(ty, literal));
    }
    Ok(n)
}

/// Parse a hex address, with or without `0x`, left-padding short forms like `0x2`.
pub fn parse_address(literal: &str) -> Result<[u8; ADDRESS_LENGTH]> {
    let digits = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
        .unwrap_or(literal);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(ConstantType::Address, literal));
    }
    if digits.len() > ADDRESS_LENGTH * 2 {
        return Err(out_of_range(ConstantType::Address, literal));
    }
    let padded = format!("{digits:0>width$}", width = ADDRESS_LENGTH * 2);
    let mut out = [0u8; ADDRESS_LENGTH];
    hex::decode_to_slice(&padded, &mut out).map_err(|_| invalid(ConstantType::Address, literal))?;
    Ok(out)
}

fn fixed<const N: usize>(r: &mut Reader<'_>) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(r.bytes(N)?);
    Ok(out)
}

fn invalid(ty: ConstantType, literal: &str) -> StampError {
    StampError::InvalidLiteral {
        ty: ty.to_string(),
        value: literal.to_string(),
    }
}

fn out_of_range(ty: ConstantType, literal: &str) -> StampError {
    StampError::EncodingRange {
        ty: ty.to_string(),
        value: literal.to_string(),
    }
}
