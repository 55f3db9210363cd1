#![allow(dead_code)]

use leb_core::{Container, EntryPayload, RoomModel};
use leb_core::room::RoomSections;
use leb_core::room::Vec3;
use leb_core::room::actor::Actor;
use leb_core::room::grid::{Grid, InfoBlock, TileData, TileFlag, TileFlags};
use leb_core::room::point::{Point, Rail};
use leb_core::room::relationship::{ControlLink, DependencyLink};
use leb_core::variant::VariantField;

pub const MAP_STATIC: u16 = 0x185;

pub fn int_pair() -> (VariantField, VariantField) {
    (VariantField::Int(0), VariantField::Int(0))
}

pub fn control(target: u32) -> ControlLink {
    ControlLink {
        params: int_pair(),
        actor_index: target,
    }
}

pub fn actor(key: u64, type_id: u16) -> Actor {
    Actor::new(key, type_id)
}

pub fn point(x: f32, y: f32, z: f32) -> Point {
    Point {
        position: Vec3::new(x, y, z),
        tail: vec![0xFF; 12],
    }
}

pub fn rail(indices: Vec<u16>) -> Rail {
    Rail {
        header: vec![0; 0x2C],
        num_indexes: 1,
        point_indices: indices,
        trailer: Vec::new(),
    }
}

pub fn grid(height: u16) -> Grid {
    let count = if height == 8 { 80 } else { 20 };
    let tiles = (0..count)
        .map(|i| {
            let mut flags = TileFlags::default();
            flags.set(TileFlag::CONTAINS_COLLISION, i % 3 == 0);
            flags.set(TileFlag::WATER_LAVA, i % 7 == 0);
            TileData {
                flags,
                chain_index: i as u32,
                elevation: i as f32 * 0.5,
            }
        })
        .collect();
    Grid {
        info: InfoBlock {
            room_height: height,
            room_width: 10,
            tile_size: 1.5,
            x: 24.0,
            z: -16.0,
        },
        tiles,
        chain: Some(vec![0xAB; 16]),
    }
}

/// MapStatic, a chest holding a named item that controls the MapStatic, and
/// a door riding a rail.
pub fn sample_sections() -> RoomSections {
    let mut map_static = actor(0x1111, MAP_STATIC);
    map_static.relationship.controlled_by.push(1);

    let mut chest = actor(0x2222, 0x21);
    chest.room_id = 4;
    chest.transform.position = Vec3::new(3.0, 0.0, -4.5);
    chest.transform.rotation = Vec3::new(0.0, 90.0, 0.0);
    chest.parameters[0] = VariantField::Name("ItemSword".to_string());
    chest.parameters[1] = VariantField::Float(2.25);
    chest.parameters[2] = VariantField::Int(-7);
    chest.relationship.controls.push(ControlLink {
        params: (VariantField::Name("Open".to_string()), VariantField::Int(1)),
        actor_index: 0,
    });

    let mut door = actor(0x3333, 0x40);
    door.relationship.dependencies.push(DependencyLink {
        params: (VariantField::Int(3), VariantField::Name("Rail".to_string())),
        rail_index: 0,
        point_index: 1,
    });

    RoomSections {
        points: vec![point(0.0, 0.0, 0.0), point(1.0, 0.0, 2.0)],
        rails: vec![rail(vec![0, 1])],
        actors: vec![map_static, chest, door],
        grid: Some(grid(8)),
    }
}

pub fn model_with(actors: Vec<Actor>) -> RoomModel {
    RoomModel::from_sections(RoomSections {
        points: Vec::new(),
        rails: Vec::new(),
        actors,
        grid: None,
    })
    .expect("valid room")
}

pub fn sample_room_bytes() -> Vec<u8> {
    RoomModel::from_sections(sample_sections())
        .expect("valid room")
        .repack()
        .expect("repack")
}

/// Two actors sharing key 1, which a model can only get from disk.
pub fn duplicate_key_room_bytes() -> Vec<u8> {
    let bytes = model_with(vec![actor(1, 5), actor(2, 5)])
        .repack()
        .expect("repack");
    let mut container = Container::parse(&bytes).expect("parse");
    let actors = container
        .entry_mut("actor")
        .and_then(|e| e.as_container_mut())
        .expect("actor section");
    if let EntryPayload::Leaf(data) = &mut actors.entries[1].payload {
        data[0..8].copy_from_slice(&1u64.to_le_bytes());
    }
    container.serialize().expect("serialize")
}
