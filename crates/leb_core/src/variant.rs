use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ValidationError};
use crate::reader::{LittleEndianReader, LittleEndianWriter, checked_u32};

pub const TAG_FLOAT: u32 = 0x2;
pub const TAG_INT: u32 = 0x3;
pub const TAG_NAME: u32 = 0x4;

/// Width of one encoded `(value, tag)` pair.
pub const VARIANT_WIDTH: usize = 8;

/// Tagged 8-byte value used for actor and relationship parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariantField {
    Int(i32),
    Float(f32),
    /// Reference into the room's name blob, held resolved.
    Name(String),
}

impl Default for VariantField {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl VariantField {
    pub fn decode(raw: [u8; 4], tag: u32, names: &[u8]) -> Result<Self, ParseError> {
        match tag {
            TAG_FLOAT => Ok(Self::Float(f32::from_le_bytes(raw))),
            TAG_INT => Ok(Self::Int(i32::from_le_bytes(raw))),
            TAG_NAME => {
                let offset = u32::from_le_bytes(raw) as usize;
                let name = LittleEndianReader::new(names).read_name(offset)?;
                Ok(Self::Name(name))
            }
            other => Err(ParseError::InvalidVariantTag {
                offset: 0,
                tag: other,
            }),
        }
    }

    /// Decode the pair stored at `offset` of a record.
    pub fn read(r: &LittleEndianReader<'_>, offset: usize, names: &[u8]) -> Result<Self, ParseError> {
        let raw = r.read_raw4(offset)?;
        let tag = r.read_u32(offset + 4)?;
        Self::decode(raw, tag, names).map_err(|e| match e {
            ParseError::InvalidVariantTag { tag, .. } => ParseError::InvalidVariantTag { offset, tag },
            other => other,
        })
    }

    /// Encode to `(raw, tag)`. String values are appended to `names` and the
    /// resulting offset is stored, so calls must happen in emission order.
    pub fn encode(&self, names: &mut NameTable) -> Result<([u8; 4], u32), ValidationError> {
        match self {
            Self::Int(v) => Ok((v.to_le_bytes(), TAG_INT)),
            Self::Float(v) => Ok((v.to_le_bytes(), TAG_FLOAT)),
            Self::Name(s) => Ok((names.push(s)?.to_le_bytes(), TAG_NAME)),
        }
    }

    pub fn write(&self, w: &mut LittleEndianWriter, names: &mut NameTable) -> Result<(), ValidationError> {
        let (raw, tag) = self.encode(names)?;
        w.write_bytes(&raw);
        w.write_u32(tag);
        Ok(())
    }

    /// Interpret text typed by a user: plain digits are integers, numbers
    /// with a `.` or `,` decimal separator are floats, anything else is a name.
    pub fn parse_user(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<i32>() {
            return Self::Int(v);
        }
        let normalized = trimmed.replace(',', ".");
        if normalized.chars().any(|c| c.is_ascii_digit())
            && let Ok(v) = normalized.parse::<f32>()
        {
            return Self::Float(v);
        }
        Self::Name(text.to_string())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VariantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

/// Name blob being rebuilt during a repack.
#[derive(Debug, Default, Clone)]
pub struct NameTable {
    bytes: Vec<u8>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append `name` plus terminator and return its offset.
    pub fn push(&mut self, name: &str) -> Result<u32, ValidationError> {
        if name.as_bytes().contains(&0) {
            return Err(ValidationError::InvalidName(name.to_string()));
        }
        let offset = checked_u32("name offset", self.bytes.len())?;
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        Ok(offset)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::{NameTable, TAG_FLOAT, TAG_INT, TAG_NAME, VariantField};
    use crate::error::ParseError;

    #[test]
    fn decodes_each_tag() {
        let names = b"Actor-1\0Switch\0";
        assert_eq!(
            VariantField::decode(7i32.to_le_bytes(), TAG_INT, names).unwrap(),
            VariantField::Int(7)
        );
        assert_eq!(
            VariantField::decode(1.5f32.to_le_bytes(), TAG_FLOAT, names).unwrap(),
            VariantField::Float(1.5)
        );
        assert_eq!(
            VariantField::decode(8u32.to_le_bytes(), TAG_NAME, names).unwrap(),
            VariantField::Name("Switch".to_string())
        );
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(matches!(
            VariantField::decode([0; 4], 0x5, b""),
            Err(ParseError::InvalidVariantTag { tag: 0x5, .. })
        ));
    }

    #[test]
    fn string_encoding_appends_to_shared_table() {
        let mut names = NameTable::new();
        names.push("Actor-0000000000000001").unwrap();
        let (raw, tag) = VariantField::Name("Door".into()).encode(&mut names).unwrap();
        assert_eq!(tag, TAG_NAME);
        assert_eq!(u32::from_le_bytes(raw), 23);
        assert_eq!(&names.as_bytes()[23..], b"Door\0");

        let before = names.len();
        VariantField::Int(3).encode(&mut names).unwrap();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn name_with_nul_is_rejected() {
        let mut names = NameTable::new();
        assert!(names.push("a\0b").is_err());
    }

    #[test]
    fn user_text_is_classified() {
        assert_eq!(VariantField::parse_user("12"), VariantField::Int(12));
        assert_eq!(VariantField::parse_user("-3"), VariantField::Int(-3));
        assert_eq!(VariantField::parse_user("2.5"), VariantField::Float(2.5));
        assert_eq!(VariantField::parse_user("2,5"), VariantField::Float(2.5));
        assert_eq!(
            VariantField::parse_user("ItemSword"),
            VariantField::Name("ItemSword".to_string())
        );
        assert_eq!(
            VariantField::parse_user("inf"),
            VariantField::Name("inf".to_string())
        );
    }
}
