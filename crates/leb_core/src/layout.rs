use crate::error::ParseError;
use crate::reader::LittleEndianReader;

pub const HEADER_LEN: usize = 8;
pub const BUCKET_WIDTH: usize = 4;
pub const ENTRY_WIDTH: usize = 0x10;
pub const ENTRY_OFFSET_WIDTH: usize = 4;
pub const SECTION_PREFIX_LEN: usize = 8;
pub const NAMES_PREFIX_LEN: usize = 4;

/// `None` when rounding up would overflow.
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    value.checked_next_multiple_of(align)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Header,
    Entries,
    EntryOffsets,
    Data,
    Names,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

/// Section boundaries of one container, computed from its header.
///
/// Each section after the header is preceded by its own length prefix and
/// starts at a fixed alignment; the ranges here include the prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    pub bucket_count: u16,
    pub entry_count: usize,
    pub sections: Vec<SectionLayout>,
}

impl ContainerLayout {
    pub fn read(r: &LittleEndianReader<'_>, offset: usize) -> Result<Self, ParseError> {
        let bucket_count = r.read_u16(offset + 0x2)?;
        let header_end = offset + HEADER_LEN + BUCKET_WIDTH * bucket_count as usize;

        let entries_start = align_up(header_end, 8).ok_or(truncated(header_end, r))?;
        let entries_offset = entries_start + SECTION_PREFIX_LEN;
        let declared_entries_len = r.read_len_u64(entries_start)?;
        if declared_entries_len % ENTRY_WIDTH != 0 {
            log::warn!(
                "entries section at {entries_start:#X} declares {declared_entries_len} bytes, not a multiple of {ENTRY_WIDTH}"
            );
        }
        let entry_count = declared_entries_len / ENTRY_WIDTH;
        let entries_end = entry_count
            .checked_mul(ENTRY_WIDTH)
            .and_then(|len| entries_offset.checked_add(len))
            .ok_or(truncated(entries_offset, r))?;
        if entries_end > r.len() {
            return Err(truncated(entries_offset, r));
        }

        let entry_offsets_start = entries_end;
        let entry_offsets_end = ENTRY_OFFSET_WIDTH
            .checked_mul(entry_count)
            .and_then(|len| len.checked_add(entry_offsets_start + SECTION_PREFIX_LEN))
            .ok_or(truncated(entry_offsets_start, r))?;

        let data_start = align_up(entry_offsets_end, 8).ok_or(truncated(entry_offsets_end, r))?;
        let data_len = r.read_len_u64(data_start)?;
        let data_end = data_start
            .checked_add(SECTION_PREFIX_LEN)
            .and_then(|start| start.checked_add(data_len))
            .ok_or(truncated(data_start, r))?;

        let names_start = align_up(data_end, 4).ok_or(truncated(data_end, r))?;
        let names_len = r.read_u32(names_start)? as usize;
        let names_end = names_start
            .checked_add(NAMES_PREFIX_LEN)
            .and_then(|start| start.checked_add(names_len))
            .ok_or(truncated(names_start, r))?;

        let layout = Self {
            bucket_count,
            entry_count,
            sections: vec![
                SectionLayout {
                    id: SectionId::Header,
                    range: ByteRange {
                        start: offset,
                        end: header_end,
                    },
                },
                SectionLayout {
                    id: SectionId::Entries,
                    range: ByteRange {
                        start: entries_start,
                        end: entries_end,
                    },
                },
                SectionLayout {
                    id: SectionId::EntryOffsets,
                    range: ByteRange {
                        start: entry_offsets_start,
                        end: entry_offsets_end,
                    },
                },
                SectionLayout {
                    id: SectionId::Data,
                    range: ByteRange {
                        start: data_start,
                        end: data_end,
                    },
                },
                SectionLayout {
                    id: SectionId::Names,
                    range: ByteRange {
                        start: names_start,
                        end: names_end,
                    },
                },
            ],
        };
        layout.validate(r.len())?;
        Ok(layout)
    }

    pub fn section(&self, id: SectionId) -> ByteRange {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.range)
            .unwrap_or(ByteRange { start: 0, end: 0 })
    }

    /// First entry record, just past the entries length prefix.
    pub fn entries_offset(&self) -> usize {
        self.section(SectionId::Entries).start + SECTION_PREFIX_LEN
    }

    /// Base that entry data offsets are relative to.
    pub fn data_offset(&self) -> usize {
        self.section(SectionId::Data).start + SECTION_PREFIX_LEN
    }

    pub fn names_range(&self) -> ByteRange {
        let names = self.section(SectionId::Names);
        ByteRange {
            start: names.start + NAMES_PREFIX_LEN,
            end: names.end,
        }
    }

    /// Sections must be ordered, non-overlapping and inside the buffer.
    pub fn validate(&self, buffer_len: usize) -> Result<(), ParseError> {
        let mut expected = 0usize;
        for section in &self.sections {
            if section.range.start < expected || section.range.end < section.range.start {
                return Err(ParseError::TruncatedBuffer {
                    offset: section.range.start,
                    needed: section.range.len(),
                    len: buffer_len,
                });
            }
            if section.range.end > buffer_len {
                return Err(ParseError::TruncatedBuffer {
                    offset: section.range.start,
                    needed: section.range.len(),
                    len: buffer_len,
                });
            }
            expected = section.range.end;
        }
        Ok(())
    }
}

fn truncated(offset: usize, r: &LittleEndianReader<'_>) -> ParseError {
    ParseError::TruncatedBuffer {
        offset,
        needed: usize::MAX,
        len: r.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::align_up;

    #[test]
    fn align_up_rounds_to_next_boundary() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(12, 8), Some(16));
        assert_eq!(align_up(16, 8), Some(16));
        assert_eq!(align_up(13, 4), Some(16));
        assert_eq!(align_up(usize::MAX - 2, 4), None);
    }
}
