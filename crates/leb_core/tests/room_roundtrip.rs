mod common;

use leb_core::container::{Container, EntryPayload};
use leb_core::error::{DomainError, LebError, ParseError};
use leb_core::room::grid::TILE_LEN;
use leb_core::room::{ACTOR_SECTION, GRID_SECTION, Vec3};
use leb_core::RoomModel;

use common::{sample_room_bytes, sample_sections};

#[test]
fn repacked_room_parses_to_same_sections() {
    let sections = sample_sections();
    let bytes = sample_room_bytes();

    let model = RoomModel::parse(&bytes).expect("parse repacked room");
    assert_eq!(model.actors(), sections.actors.as_slice());
    assert_eq!(model.grid(), sections.grid.as_ref());
    assert_eq!(model.points(), sections.points.as_slice());
    assert_eq!(model.rails(), sections.rails.as_slice());
}

#[test]
fn repack_of_parsed_room_is_stable() {
    let first = sample_room_bytes();
    let model = RoomModel::parse(&first).expect("parse");
    let second = model.repack().expect("repack");
    assert_eq!(first, second);
}

#[test]
fn name_blob_follows_traversal_order() {
    let bytes = sample_room_bytes();
    let container = Container::parse(&bytes).expect("parse container");

    let expected: &[u8] = b"point\0rail\0\
Actor-0000000000001111\0\
Actor-0000000000002222\0ItemSword\0Open\0\
Actor-0000000000003333\0Rail\0\
actor\0grid\0";
    assert_eq!(container.names, expected);
}

#[test]
fn actor_entries_are_regenerated_leaves() {
    let bytes = sample_room_bytes();
    let container = Container::parse(&bytes).expect("parse container");
    let actors = container
        .entry(ACTOR_SECTION)
        .and_then(|e| e.as_container())
        .expect("actor section");

    assert_eq!(actors.entries.len(), 3);
    for entry in &actors.entries {
        assert_eq!(entry.node_index, 0xFFF0);
        assert_eq!(entry.name, "");
        assert_eq!(entry.next_offset, 0xFFFF_FFFF);
    }
}

#[test]
fn edits_survive_a_save_cycle() {
    let mut model = RoomModel::parse(&sample_room_bytes()).expect("parse");
    let mut transform = model.actors()[2].transform;
    transform.position = Vec3::new(-1.0, 2.0, 8.5);
    model.set_transform(2, transform).expect("set transform");
    model.set_point(1, Vec3::new(5.0, 5.0, 5.0)).expect("set point");
    model
        .grid_mut()
        .expect("grid")
        .tiles[4]
        .elevation = 3.0;

    let reparsed = RoomModel::parse(&model.repack().expect("repack")).expect("parse");
    assert_eq!(reparsed.actors()[2].transform.position, Vec3::new(-1.0, 2.0, 8.5));
    assert_eq!(reparsed.points()[1].position, Vec3::new(5.0, 5.0, 5.0));
    assert_eq!(reparsed.grid().expect("grid").tiles[4].elevation, 3.0);
}

#[test]
fn tile_flag_copies_are_rewritten_from_primary() {
    let bytes = sample_room_bytes();
    let mut container = Container::parse(&bytes).expect("parse container");

    // Corrupt the second copy of every tile's flags.
    let grid = container
        .entry_mut(GRID_SECTION)
        .and_then(|e| e.as_container_mut())
        .expect("grid section");
    let data = grid.entry_mut("data").expect("grid data");
    if let EntryPayload::Leaf(tiles) = &mut data.payload {
        for tile in tiles.chunks_mut(TILE_LEN) {
            tile[4..8].copy_from_slice(&[0x5A; 4]);
        }
    }
    let corrupted = container.serialize().expect("serialize");

    let repacked = RoomModel::parse(&corrupted)
        .expect("parse")
        .repack()
        .expect("repack");
    let container = Container::parse(&repacked).expect("parse container");
    let tiles = container
        .entry(GRID_SECTION)
        .and_then(|e| e.as_container())
        .and_then(|g| g.entry("data"))
        .and_then(|e| e.as_leaf())
        .expect("grid data");

    assert_eq!(tiles.len(), 80 * TILE_LEN);
    for tile in tiles.chunks(TILE_LEN) {
        assert_eq!(tile[0..4], tile[4..8]);
    }
}

#[test]
fn missing_actor_section_is_a_domain_error() {
    let bytes = sample_room_bytes();
    let mut container = Container::parse(&bytes).expect("parse container");
    container.entries.retain(|e| e.name != ACTOR_SECTION);
    let bytes = container.serialize().expect("serialize");

    let err = RoomModel::parse(&bytes).expect_err("actor section is required");
    assert!(matches!(
        err,
        LebError::Domain(DomainError::MissingRequiredSection("actor"))
    ));
}

#[test]
fn room_without_grid_loads() {
    let bytes = sample_room_bytes();
    let mut container = Container::parse(&bytes).expect("parse container");
    container.entries.retain(|e| e.name != GRID_SECTION);
    let bytes = container.serialize().expect("serialize");

    let model = RoomModel::parse(&bytes).expect("parse");
    assert!(model.grid().is_none());
    assert_eq!(model.actors().len(), 3);
}

#[test]
fn unsupported_grid_height_fails_the_load() {
    let mut sections = sample_sections();
    if let Some(grid) = sections.grid.as_mut() {
        grid.info.room_height = 4;
    }
    let bytes = RoomModel::from_sections(sections)
        .expect("valid room")
        .repack()
        .expect("repack");

    let err = RoomModel::parse(&bytes).expect_err("height 4 is not a room");
    assert!(matches!(
        err,
        LebError::Parse(ParseError::UnsupportedRoomHeight(4))
    ));
}

#[test]
fn truncated_file_fails_the_load() {
    let bytes = sample_room_bytes();
    let err = RoomModel::parse(&bytes[..bytes.len() / 2]).expect_err("truncated");
    assert!(matches!(
        err,
        LebError::Parse(ParseError::TruncatedBuffer { .. })
    ));
}
