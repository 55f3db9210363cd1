use std::fmt;

use serde::{Deserialize, Serialize};

use super::Vec3;
use super::relationship::Relationship;
use crate::error::{ParseError, ValidationError};
use crate::reader::{LittleEndianReader, LittleEndianWriter};
use crate::variant::{NameTable, VARIANT_WIDTH, VariantField};

const KEY_OFFSET: usize = 0x0;
const TYPE_OFFSET: usize = 0xC;
const ROOM_ID_OFFSET: usize = 0x10;
const POSITION_OFFSET: usize = 0x14;
const ROTATION_OFFSET: usize = 0x20;
const SCALE_OFFSET: usize = 0x2C;
const PARAMETERS_OFFSET: usize = 0x38;
const SWITCH_USAGE_OFFSET: usize = 0x78;
const SWITCH_INDEX_OFFSET: usize = 0x7C;
pub const RELATIONSHIP_OFFSET: usize = 0x84;

pub const PARAMETER_COUNT: usize = 8;
pub const SWITCH_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchUsage {
    /// Per-level flag.
    Local,
    /// Flag stored in the save.
    Global,
    /// Constant true or false.
    Hardcoded,
    /// Flag specific to panel levels.
    Panel,
    Unused,
    Unknown(u8),
}

impl SwitchUsage {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Local,
            1 => Self::Global,
            2 => Self::Hardcoded,
            3 => Self::Panel,
            4 => Self::Unused,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match *self {
            Self::Local => 0,
            Self::Global => 1,
            Self::Hardcoded => 2,
            Self::Panel => 3,
            Self::Unused => 4,
            Self::Unknown(other) => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Local => "Local",
            Self::Global => "Global",
            Self::Hardcoded => "Hardcoded",
            Self::Panel => "Panel",
            Self::Unused => "Unused",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for SwitchUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unknown(v) => write!(f, "Unknown ({})", v),
            _ => f.write_str(self.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    pub usage: SwitchUsage,
    pub index: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

/// One placed object in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub key: u64,
    pub type_id: u16,
    pub room_id: u32,
    pub transform: Transform,
    pub parameters: [VariantField; PARAMETER_COUNT],
    pub switches: [Switch; SWITCH_COUNT],
    pub relationship: Relationship,
    /// Editor-only; never written.
    #[serde(skip, default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Switch {
    pub const UNUSED: Self = Self {
        usage: SwitchUsage::Unused,
        index: 0,
    };
}

impl Actor {
    /// A fresh actor at the origin with unit scale and no links.
    pub fn new(key: u64, type_id: u16) -> Self {
        Self {
            key,
            type_id,
            room_id: 0,
            transform: Transform {
                scale: Vec3::new(1.0, 1.0, 1.0),
                ..Transform::default()
            },
            parameters: Default::default(),
            switches: [Switch::UNUSED; SWITCH_COUNT],
            relationship: Relationship::default(),
            visible: true,
        }
    }

    /// Decode one actor leaf. String parameters resolve against the
    /// top-level name blob.
    pub fn decode(data: &[u8], names: &[u8]) -> Result<Self, ParseError> {
        let r = LittleEndianReader::new(data);

        let key = r.read_u64(KEY_OFFSET)?;
        let type_id = r.read_u16(TYPE_OFFSET)?;
        let room_id = r.read_u32(ROOM_ID_OFFSET)?;
        let transform = Transform {
            position: Vec3::read(&r, POSITION_OFFSET)?,
            rotation: Vec3::read(&r, ROTATION_OFFSET)?,
            scale: Vec3::read(&r, SCALE_OFFSET)?,
        };

        let mut parameters: [VariantField; PARAMETER_COUNT] = Default::default();
        for (i, slot) in parameters.iter_mut().enumerate() {
            *slot = VariantField::read(&r, PARAMETERS_OFFSET + i * VARIANT_WIDTH, names)?;
        }

        let mut switches = [Switch::UNUSED; SWITCH_COUNT];
        for (i, switch) in switches.iter_mut().enumerate() {
            *switch = Switch {
                usage: SwitchUsage::from_raw(r.read_u8(SWITCH_USAGE_OFFSET + i)?),
                index: r.read_u16(SWITCH_INDEX_OFFSET + i * 2)?,
            };
        }

        let relationship = Relationship::decode(&r, RELATIONSHIP_OFFSET, names)?;

        Ok(Self {
            key,
            type_id,
            room_id,
            transform,
            parameters,
            switches,
            relationship,
            visible: true,
        })
    }

    /// Name written to the name blob for this actor. Only the key part is
    /// significant to the game.
    pub fn display_name(&self) -> String {
        format!("Actor-{:016X}", self.key)
    }

    /// Encode the leaf. Appends, in order, the display name, string
    /// parameters, and string relationship parameters to `names`.
    pub fn encode(&self, names: &mut NameTable) -> Result<Vec<u8>, ValidationError> {
        let display_name = self.display_name();
        let name_offset = names.push(&display_name)?;

        let mut w = LittleEndianWriter::with_capacity(RELATIONSHIP_OFFSET + self.relationship.encoded_len());
        w.write_u64(self.key);
        w.write_u32(name_offset);
        w.write_u16(self.type_id);
        w.write_u16(0);
        w.write_u32(self.room_id);
        self.transform.position.write(&mut w);
        self.transform.rotation.write(&mut w);
        self.transform.scale.write(&mut w);

        for param in &self.parameters {
            param.write(&mut w, names)?;
        }

        for switch in &self.switches {
            w.write_u8(switch.usage.raw());
        }
        for switch in &self.switches {
            w.write_u16(switch.index);
        }

        self.relationship.encode(&mut w, names, &display_name)?;
        Ok(w.into_inner())
    }
}
