use serde::{Deserialize, Serialize};

use crate::room::Vec3;
use crate::room::grid::RoomDimension;
use crate::variant::VariantField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub dimension: Option<RoomDimension>,
    pub room_width: Option<u16>,
    pub room_height: Option<u16>,
    pub actor_count: usize,
    pub point_count: usize,
    pub rail_count: usize,
    pub name_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterEntry {
    pub slot: usize,
    pub value: VariantField,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchEntry {
    pub slot: usize,
    pub usage: String,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlEntry {
    pub target: u32,
    pub params: [VariantField; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEntry {
    pub rail: u32,
    pub point: u32,
    pub params: [VariantField; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEntry {
    pub index: usize,
    pub key: u64,
    pub name: String,
    pub type_id: u16,
    pub type_name: String,
    pub room_id: u32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub parameters: Vec<ParameterEntry>,
    pub switches: Vec<SwitchEntry>,
    pub controls: Vec<ControlEntry>,
    pub dependencies: Vec<DependencyEntry>,
    pub controlled_by: Vec<u32>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointEntry {
    pub index: usize,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileEntry {
    pub index: usize,
    pub flags: Vec<String>,
    pub chain_index: u32,
    pub elevation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub dimension: RoomDimension,
    pub room_width: u16,
    pub room_height: u16,
    pub tile_size: f32,
    pub x: f32,
    pub z: f32,
    pub tiles: Vec<TileEntry>,
}
