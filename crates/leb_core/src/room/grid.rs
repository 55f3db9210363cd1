use std::fmt;

use serde::{Deserialize, Serialize};

use crate::container::{Container, Entry, MIN_LEAF_NODE_INDEX, NO_NEXT_OFFSET};
use crate::error::{DomainError, LebError, ParseError};
use crate::reader::{LittleEndianReader, LittleEndianWriter};

pub const INFO_ENTRY: &str = "info";
pub const DATA_ENTRY: &str = "data";
pub const CHAIN_ENTRY: &str = "chain";

pub const INFO_LEN: usize = 0x10;
pub const TILE_LEN: usize = 0x10;

const FLAGS_LEN: usize = 4;
const FLAGS_COPY_OFFSET: usize = 0x4;
const CHAIN_INDEX_OFFSET: usize = 0x8;
const ELEVATION_OFFSET: usize = 0xC;

// The info entry is the only grid entry written with a zero next offset.
const INFO_NEXT_OFFSET: u32 = 0x0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomDimension {
    /// Top-down room, height 8.
    ThreeD,
    /// Side-scrolling room, height 2.
    TwoD,
}

impl RoomDimension {
    pub fn from_height(height: u16) -> Result<Self, ParseError> {
        match height {
            8 => Ok(Self::ThreeD),
            2 => Ok(Self::TwoD),
            other => Err(ParseError::UnsupportedRoomHeight(other)),
        }
    }

    pub fn tile_count(&self) -> usize {
        match self {
            Self::ThreeD => 80,
            Self::TwoD => 20,
        }
    }
}

impl fmt::Display for RoomDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreeD => f.write_str("3D"),
            Self::TwoD => f.write_str("2D"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfoBlock {
    pub room_height: u16,
    pub room_width: u16,
    pub tile_size: f32,
    pub x: f32,
    pub z: f32,
}

impl InfoBlock {
    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        let r = LittleEndianReader::new(data);
        Ok(Self {
            room_height: r.read_u16(0x0)?,
            room_width: r.read_u16(0x2)?,
            tile_size: r.read_f32(0x4)?,
            x: r.read_f32(0x8)?,
            z: r.read_f32(0xC)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = LittleEndianWriter::with_capacity(INFO_LEN);
        w.write_u16(self.room_height);
        w.write_u16(self.room_width);
        w.write_f32(self.tile_size);
        w.write_f32(self.x);
        w.write_f32(self.z);
        w.into_inner()
    }
}

/// Named bit in one of a tile's four flag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFlag {
    pub byte: usize,
    pub mask: u8,
    pub name: &'static str,
}

impl TileFlag {
    const fn new(byte: usize, mask: u8, name: &'static str) -> Self {
        Self { byte, mask, name }
    }

    pub const DEEP_WATER_LAVA: Self = Self::new(0, 0x01, "deep_water_lava");
    pub const CONTAINS_COLLISION: Self = Self::new(0, 0x02, "contains_collision");
    pub const NORTH_COLLISION: Self = Self::new(0, 0x08, "north_collision");
    pub const EAST_COLLISION: Self = Self::new(0, 0x20, "east_collision");
    pub const SOUTH_COLLISION: Self = Self::new(0, 0x80, "south_collision");
    pub const WEST_COLLISION: Self = Self::new(1, 0x02, "west_collision");
    pub const DIG_SPOT: Self = Self::new(2, 0x01, "dig_spot");
    pub const WATER_LAVA: Self = Self::new(2, 0x04, "water_lava");
    pub const RESPAWN_VOID: Self = Self::new(2, 0x08, "respawn_void");
    pub const RESPAWN_LOAD: Self = Self::new(2, 0x10, "respawn_load");
    pub const CAN_REFRESH: Self = Self::new(2, 0x20, "can_refresh");
    pub const UNKNOWN6: Self = Self::new(2, 0x40, "unknown6");

    pub const ALL: [Self; 12] = [
        Self::DEEP_WATER_LAVA,
        Self::CONTAINS_COLLISION,
        Self::NORTH_COLLISION,
        Self::EAST_COLLISION,
        Self::SOUTH_COLLISION,
        Self::WEST_COLLISION,
        Self::DIG_SPOT,
        Self::WATER_LAVA,
        Self::RESPAWN_VOID,
        Self::RESPAWN_LOAD,
        Self::CAN_REFRESH,
        Self::UNKNOWN6,
    ];
}

/// The four flag bytes of a tile, kept raw so unnamed bits survive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFlags(pub [u8; FLAGS_LEN]);

impl TileFlags {
    pub fn get(&self, flag: TileFlag) -> bool {
        self.0[flag.byte] & flag.mask != 0
    }

    pub fn set(&mut self, flag: TileFlag, on: bool) {
        if on {
            self.0[flag.byte] |= flag.mask;
        } else {
            self.0[flag.byte] &= !flag.mask;
        }
    }

    /// Names of every set flag, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        TileFlag::ALL
            .iter()
            .filter(|f| self.get(**f))
            .map(|f| f.name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TileData {
    pub flags: TileFlags,
    pub chain_index: u32,
    pub elevation: f32,
}

impl TileData {
    /// The copy of the flags at +4 is ignored; it is rebuilt from the
    /// primary on encode.
    pub fn decode(r: &LittleEndianReader<'_>, offset: usize) -> Result<Self, ParseError> {
        let mut flags = [0u8; FLAGS_LEN];
        flags.copy_from_slice(r.read_bytes(offset, FLAGS_LEN)?);
        Ok(Self {
            flags: TileFlags(flags),
            chain_index: r.read_u32(offset + CHAIN_INDEX_OFFSET)?,
            elevation: r.read_f32(offset + ELEVATION_OFFSET)?,
        })
    }

    pub fn write(&self, w: &mut LittleEndianWriter) {
        let start = w.len();
        w.write_bytes(&self.flags.0);
        debug_assert_eq!(w.len() - start, FLAGS_COPY_OFFSET);
        // The copy always mirrors the primary flags.
        w.write_bytes(&self.flags.0);
        debug_assert_eq!(w.len() - start, CHAIN_INDEX_OFFSET);
        w.write_u32(self.chain_index);
        w.write_f32(self.elevation);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub info: InfoBlock,
    pub tiles: Vec<TileData>,
    /// Opaque chain blob, carried through unchanged.
    #[serde(skip)]
    pub chain: Option<Vec<u8>>,
}

impl Grid {
    pub fn decode(nested: &Container) -> Result<Self, LebError> {
        let info_data = grid_leaf(nested, INFO_ENTRY, "grid.info")?;
        let tile_data = grid_leaf(nested, DATA_ENTRY, "grid.data")?;
        let chain = nested
            .entry(CHAIN_ENTRY)
            .and_then(|e| e.as_leaf())
            .map(<[u8]>::to_vec);

        let info = InfoBlock::decode(info_data)?;
        let dimension = RoomDimension::from_height(info.room_height)?;
        let count = dimension.tile_count();

        let expected = count * TILE_LEN;
        if tile_data.len() > expected {
            log::warn!(
                "grid data is {} bytes, only the first {} are tile records",
                tile_data.len(),
                expected
            );
        }

        let r = LittleEndianReader::new(tile_data);
        let tiles = (0..count)
            .map(|i| TileData::decode(&r, i * TILE_LEN))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            info,
            tiles,
            chain,
        })
    }

    pub fn dimension(&self) -> Result<RoomDimension, ParseError> {
        RoomDimension::from_height(self.info.room_height)
    }

    pub fn encode_tiles(&self) -> Vec<u8> {
        let mut w = LittleEndianWriter::with_capacity(self.tiles.len() * TILE_LEN);
        for tile in &self.tiles {
            tile.write(&mut w);
        }
        w.into_inner()
    }

    /// Entries of the rebuilt grid container: data, then chain if present,
    /// then info.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries = vec![Entry::leaf(
            MIN_LEAF_NODE_INDEX,
            DATA_ENTRY,
            NO_NEXT_OFFSET,
            self.encode_tiles(),
        )];
        if let Some(chain) = &self.chain {
            entries.push(Entry::leaf(
                MIN_LEAF_NODE_INDEX,
                CHAIN_ENTRY,
                NO_NEXT_OFFSET,
                chain.clone(),
            ));
        }
        entries.push(Entry::leaf(
            MIN_LEAF_NODE_INDEX,
            INFO_ENTRY,
            INFO_NEXT_OFFSET,
            self.info.encode(),
        ));
        entries
    }
}

fn grid_leaf<'a>(
    nested: &'a Container,
    name: &str,
    section: &'static str,
) -> Result<&'a [u8], DomainError> {
    nested
        .entry(name)
        .ok_or(DomainError::MissingRequiredSection(section))?
        .as_leaf()
        .ok_or(DomainError::MalformedSection {
            section,
            reason: "expected a leaf blob",
        })
}
