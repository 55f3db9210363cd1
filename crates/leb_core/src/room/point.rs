use serde::{Deserialize, Serialize};

use super::Vec3;
use crate::error::{ParseError, ValidationError};
use crate::reader::{LittleEndianReader, LittleEndianWriter, checked_u16};

const POINT_POSITION_LEN: usize = 0xC;
const POINT_FILL_LEN: usize = 0xC;
const POINT_FILL: u8 = 0xFF;

const RAIL_HEADER_LEN: usize = 0x2C;
const RAIL_NUM_ENTRIES_OFFSET: usize = 0x2C;
const RAIL_NUM_INDEXES_OFFSET: usize = 0x2E;
const RAIL_INDICES_OFFSET: usize = 0x30;

/// A position actors can be attached to through rails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Vec3,
    /// Bytes after the position, kept as read.
    #[serde(skip)]
    pub tail: Vec<u8>,
}

impl Point {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            tail: Vec::new(),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        let r = LittleEndianReader::new(data);
        let position = Vec3::read(&r, 0)?;
        Ok(Self {
            position,
            tail: data[POINT_POSITION_LEN..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = LittleEndianWriter::with_capacity(POINT_POSITION_LEN + POINT_FILL_LEN);
        self.position.write(&mut w);
        if self.tail.is_empty() {
            w.write_bytes(&[POINT_FILL; POINT_FILL_LEN]);
        } else {
            w.write_bytes(&self.tail);
        }
        w.into_inner()
    }
}

/// An ordered path through points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    /// Leading parameter block, not interpreted.
    #[serde(skip)]
    pub header: Vec<u8>,
    pub num_indexes: u16,
    pub point_indices: Vec<u16>,
    #[serde(skip)]
    pub trailer: Vec<u8>,
}

impl Rail {
    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        let r = LittleEndianReader::new(data);
        let header = r.read_bytes(0, RAIL_HEADER_LEN)?.to_vec();
        let num_entries = r.read_u16(RAIL_NUM_ENTRIES_OFFSET)? as usize;
        let num_indexes = r.read_u16(RAIL_NUM_INDEXES_OFFSET)?;

        let point_indices = (0..num_entries)
            .map(|i| r.read_u16(RAIL_INDICES_OFFSET + i * 2))
            .collect::<Result<Vec<_>, _>>()?;
        let trailer = data[RAIL_INDICES_OFFSET + num_entries * 2..].to_vec();

        Ok(Self {
            header,
            num_indexes,
            point_indices,
            trailer,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ValidationError> {
        let mut w = LittleEndianWriter::with_capacity(
            RAIL_INDICES_OFFSET + self.point_indices.len() * 2 + self.trailer.len(),
        );
        let mut header = self.header.clone();
        header.resize(RAIL_HEADER_LEN, 0);
        w.write_bytes(&header);
        w.write_u16(checked_u16("rail point count", self.point_indices.len())?);
        w.write_u16(self.num_indexes);
        for &index in &self.point_indices {
            w.write_u16(index);
        }
        w.write_bytes(&self.trailer);
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, Rail};
    use crate::error::ParseError;
    use crate::room::Vec3;

    #[test]
    fn fresh_point_is_filled() {
        let bytes = Point::new(Vec3::new(1.0, 2.0, 3.0)).encode();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert!(bytes[12..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn point_tail_is_preserved() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0.5f32.to_le_bytes());
        raw.extend_from_slice(&1.5f32.to_le_bytes());
        raw.extend_from_slice(&2.5f32.to_le_bytes());
        raw.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        let point = Point::decode(&raw).unwrap();
        assert_eq!(point.position, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(point.encode(), raw);
    }

    #[test]
    fn short_point_is_truncated() {
        assert!(matches!(
            Point::decode(&[0; 8]),
            Err(ParseError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn rail_reads_indices_after_header() {
        let mut raw = vec![0x19; 0x2C];
        raw.extend_from_slice(&3u16.to_le_bytes());
        raw.extend_from_slice(&1u16.to_le_bytes());
        for i in [4u16, 0, 2] {
            raw.extend_from_slice(&i.to_le_bytes());
        }
        raw.extend_from_slice(&[0xAA, 0xBB]);

        let rail = Rail::decode(&raw).unwrap();
        assert_eq!(rail.point_indices, vec![4, 0, 2]);
        assert_eq!(rail.num_indexes, 1);
        assert_eq!(rail.trailer, vec![0xAA, 0xBB]);
        assert_eq!(rail.encode().unwrap(), raw);
    }
}
