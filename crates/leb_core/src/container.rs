//! The generic bucketed, recursive container every room file is built from.
//!
//! A container is a header, a bucket table, a table of 16-byte entry records,
//! a table of entry offsets, a data section and a blob of null-terminated
//! names. Entries point into the data section either at another container or
//! at a length-prefixed leaf blob.

use crate::error::{ParseError, ValidationError};
use crate::layout::{ContainerLayout, ENTRY_WIDTH, HEADER_LEN, SECTION_PREFIX_LEN};
use crate::reader::{LittleEndianReader, LittleEndianWriter, checked_u16, checked_u32};

/// Highest node index that marks a nested container.
pub const MAX_NESTED_NODE_INDEX: u16 = 0xFFED;
/// Lowest node index that marks a leaf blob.
pub const MIN_LEAF_NODE_INDEX: u16 = 0xFFF0;
/// `next_offset` value used for freshly created entries.
pub const NO_NEXT_OFFSET: u32 = 0xFFFF_FFFF;

const MAX_DEPTH: usize = 32;

/// Hash stored beside each entry. The engine looks entries up by this value,
/// so it must match the game's own algorithm exactly.
pub fn hash_name(name: &[u8]) -> u32 {
    let mut h: u32 = 0;
    for &b in name {
        if b == 0 {
            break;
        }
        h ^= (b as u32).wrapping_add(h >> 2).wrapping_add(h << 5);
    }
    h
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Nested(Container),
    Leaf(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub node_index: u16,
    /// Empty when the entry has no name.
    pub name: String,
    /// Preserved verbatim, never followed.
    pub next_offset: u32,
    pub payload: EntryPayload,
}

impl Entry {
    pub fn leaf(node_index: u16, name: impl Into<String>, next_offset: u32, data: Vec<u8>) -> Self {
        Self {
            node_index,
            name: name.into(),
            next_offset,
            payload: EntryPayload::Leaf(data),
        }
    }

    pub fn nested(
        node_index: u16,
        name: impl Into<String>,
        next_offset: u32,
        container: Container,
    ) -> Self {
        Self {
            node_index,
            name: name.into(),
            next_offset,
            payload: EntryPayload::Nested(container),
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.payload {
            EntryPayload::Nested(c) => Some(c),
            EntryPayload::Leaf(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.payload {
            EntryPayload::Nested(c) => Some(c),
            EntryPayload::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&[u8]> {
        match &self.payload {
            EntryPayload::Leaf(data) => Some(data),
            EntryPayload::Nested(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub magic: u8,
    pub version: u8,
    pub node_count: u16,
    pub reserved: u16,
    /// Opaque; re-emitted verbatim.
    pub buckets: Vec<u32>,
    pub entries: Vec<Entry>,
    pub names: Vec<u8>,
}

impl Container {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse_at(bytes, 0)
    }

    pub fn parse_at(bytes: &[u8], offset: usize) -> Result<Self, ParseError> {
        let r = LittleEndianReader::new(bytes);
        parse_internal(&r, offset, 0)
    }

    /// Section boundaries of the container stored at `offset`.
    pub fn layout_at(bytes: &[u8], offset: usize) -> Result<ContainerLayout, ParseError> {
        ContainerLayout::read(&LittleEndianReader::new(bytes), offset)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ValidationError> {
        self.serialize_at(0)
    }

    /// Serialize as if the first byte lands at `offset`; alignment padding is
    /// computed relative to that position.
    pub fn serialize_at(&self, offset: usize) -> Result<Vec<u8>, ValidationError> {
        // Append missing names up front so an unnamed entry's offset can
        // never alias a name added after it.
        let mut names = self.names.clone();
        for entry in self.entries.iter().filter(|e| !e.name.is_empty()) {
            locate_or_append_name(&mut names, &entry.name);
        }

        let mut out = LittleEndianWriter::new();
        out.write_u8(self.magic);
        out.write_u8(self.version);
        out.write_u16(checked_u16("bucket count", self.buckets.len())?);
        out.write_u16(self.node_count);
        out.write_u16(self.reserved);
        for &bucket in &self.buckets {
            out.write_u32(bucket);
        }

        let mut entries = LittleEndianWriter::with_capacity(self.entries.len() * ENTRY_WIDTH);
        let mut entry_offsets = LittleEndianWriter::new();
        let mut data = LittleEndianWriter::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let name_offset = locate_or_append_name(&mut names, &entry.name);
            entries.write_u16(entry.node_index);
            entries.write_u16(checked_u16("entry name offset", name_offset)?);
            entries.write_u32(hash_name(entry.name.as_bytes()));
            entries.write_u32(entry.next_offset);
            entries.write_u32(checked_u32("entry data offset", data.len())?);
            entry_offsets.write_u32(checked_u32("entry offset", i * ENTRY_WIDTH)?);

            match (&entry.payload, entry.node_index) {
                (EntryPayload::Nested(child), idx) if idx <= MAX_NESTED_NODE_INDEX => {
                    let nested = child.serialize_at(data.len())?;
                    data.write_bytes(&nested);
                }
                (EntryPayload::Leaf(blob), idx) if idx >= MIN_LEAF_NODE_INDEX => {
                    data.write_u64(blob.len() as u64);
                    data.write_bytes(blob);
                    data.pad_to(8, 0);
                }
                (_, idx) => {
                    return Err(ValidationError::ValueOutOfRange {
                        field: "entry node index",
                        value: idx as u64,
                    });
                }
            }
        }

        out.pad_to(8, offset);
        out.write_u64((self.entries.len() * ENTRY_WIDTH) as u64);
        out.write_bytes(entries.as_bytes());

        out.pad_to(8, offset);
        out.write_u64(entry_offsets.len() as u64);
        out.write_bytes(entry_offsets.as_bytes());

        out.pad_to(8, offset);
        out.write_u64(data.len() as u64);
        out.write_bytes(data.as_bytes());

        out.pad_to(4, offset);
        out.write_u32(checked_u32("names size", names.len())?);
        out.write_bytes(&names);

        Ok(out.into_inner())
    }
}

fn parse_internal(
    r: &LittleEndianReader<'_>,
    offset: usize,
    depth: usize,
) -> Result<Container, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::NestingTooDeep { offset });
    }

    let magic = r.read_u8(offset)?;
    let version = r.read_u8(offset + 0x1)?;
    let node_count = r.read_u16(offset + 0x4)?;
    let reserved = r.read_u16(offset + 0x6)?;

    let layout = ContainerLayout::read(r, offset)?;
    let mut buckets = Vec::with_capacity(layout.bucket_count as usize);
    for i in 0..layout.bucket_count as usize {
        buckets.push(r.read_u32(offset + HEADER_LEN + i * 4)?);
    }

    let names_range = layout.names_range();
    let names = r.read_bytes(names_range.start, names_range.len())?.to_vec();
    let data_offset = layout.data_offset();

    log::debug!(
        "container at {offset:#X}: {} buckets, {} entries, {} name bytes",
        layout.bucket_count,
        layout.entry_count,
        names.len()
    );

    let mut entries = Vec::with_capacity(layout.entry_count);
    for i in 0..layout.entry_count {
        let record = layout.entries_offset() + i * ENTRY_WIDTH;

        let node_index = r.read_u16(record)?;
        let name = if names.is_empty() {
            String::new()
        } else {
            r.read_name(names_range.start + r.read_u16(record + 0x2)? as usize)?
        };
        let next_offset = r.read_u32(record + 0x8)?;
        let entry_data = data_offset + r.read_u32(record + 0xC)? as usize;

        let payload = if node_index <= MAX_NESTED_NODE_INDEX {
            EntryPayload::Nested(parse_internal(r, entry_data, depth + 1)?)
        } else if node_index >= MIN_LEAF_NODE_INDEX {
            let size = r.read_len_u64(entry_data)?;
            EntryPayload::Leaf(r.read_bytes(entry_data + SECTION_PREFIX_LEN, size)?.to_vec())
        } else {
            return Err(ParseError::InvalidNodeIndex {
                offset: record,
                node_index,
            });
        };

        entries.push(Entry {
            node_index,
            name,
            next_offset,
            payload,
        });
    }

    Ok(Container {
        magic,
        version,
        node_count,
        reserved,
        buckets,
        entries,
        names,
    })
}

/// Offset of `name` in the blob, appending it when absent. An empty name in
/// an empty blob is stored at offset 0 without growing the blob.
fn locate_or_append_name(names: &mut Vec<u8>, name: &str) -> usize {
    if name.is_empty() && names.is_empty() {
        return 0;
    }
    let mut needle = Vec::with_capacity(name.len() + 1);
    needle.extend_from_slice(name.as_bytes());
    needle.push(0);

    if let Some(pos) = names.windows(needle.len()).position(|w| w == needle.as_slice()) {
        return pos;
    }
    let pos = names.len();
    names.extend_from_slice(&needle);
    pos
}

#[cfg(test)]
mod tests {
    use super::{Container, Entry, hash_name, locate_or_append_name};
    use crate::error::ParseError;

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(hash_name(b""), 0);
        // h = 0 ^ ('a' + 0 + 0)
        assert_eq!(hash_name(b"a"), 0x61);
        // h = 0x61 ^ ('b' + (0x61 >> 2) + (0x61 << 5))
        assert_eq!(hash_name(b"ab"), 0x61 ^ (0x62 + 0x18 + 0xC20));
    }

    #[test]
    fn hash_stops_at_first_nul() {
        assert_eq!(hash_name(b"grid\0junk"), hash_name(b"grid"));
    }

    #[test]
    fn name_lookup_reuses_existing_and_appends_missing() {
        let mut names = b"point\0rail\0".to_vec();
        assert_eq!(locate_or_append_name(&mut names, "rail"), 6);
        assert_eq!(locate_or_append_name(&mut names, ""), 5);
        assert_eq!(locate_or_append_name(&mut names, "grid"), 11);
        assert_eq!(names, b"point\0rail\0grid\0");

        let mut empty = Vec::new();
        assert_eq!(locate_or_append_name(&mut empty, ""), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn nested_and_leaf_entries_survive_serialization() {
        let inner = Container {
            magic: 0x01,
            buckets: vec![0xDEAD_BEEF],
            entries: vec![Entry::leaf(0xFFF0, "", 0xFFFF_FFFF, vec![1, 2, 3])],
            ..Container::default()
        };
        let outer = Container {
            magic: 0x01,
            version: 0x02,
            node_count: 2,
            buckets: vec![7, 8, 9],
            entries: vec![
                Entry::nested(0, "actor", 0, inner),
                Entry::leaf(0xFFF3, "blob", 0x10, vec![9; 13]),
            ],
            names: b"actor\0blob\0".to_vec(),
            ..Container::default()
        };

        let bytes = outer.serialize().expect("serialize");
        let parsed = Container::parse(&bytes).expect("parse");
        assert_eq!(parsed, outer);
    }

    #[test]
    fn node_index_in_reserved_gap_is_rejected() {
        let c = Container {
            entries: vec![Entry::leaf(0xFFF0, "", 0, vec![0; 4])],
            ..Container::default()
        };
        let mut bytes = c.serialize().expect("serialize");
        // First entry record sits right after the 8-byte header and entries prefix.
        bytes[16..18].copy_from_slice(&0xFFEEu16.to_le_bytes());
        assert!(matches!(
            Container::parse(&bytes),
            Err(ParseError::InvalidNodeIndex {
                node_index: 0xFFEE,
                ..
            })
        ));
    }

    #[test]
    fn truncated_container_fails() {
        let c = Container {
            entries: vec![Entry::leaf(0xFFF0, "", 0, vec![0; 32])],
            ..Container::default()
        };
        let bytes = c.serialize().expect("serialize");
        assert!(matches!(
            Container::parse(&bytes[..bytes.len() - 20]),
            Err(ParseError::TruncatedBuffer { .. })
        ));
    }
}
