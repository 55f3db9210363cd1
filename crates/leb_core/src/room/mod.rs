pub mod actor;
pub mod grid;
pub mod point;
pub mod relationship;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::container::{Container, EntryPayload};
use crate::error::{DomainError, LebError, ParseError};
use crate::reader::{LittleEndianReader, LittleEndianWriter};
use actor::Actor;
use grid::Grid;
use point::{Point, Rail};

pub const POINT_SECTION: &str = "point";
pub const RAIL_SECTION: &str = "rail";
pub const ACTOR_SECTION: &str = "actor";
pub const GRID_SECTION: &str = "grid";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn read(r: &LittleEndianReader<'_>, offset: usize) -> Result<Self, ParseError> {
        let [x, y, z] = r.read_f32_array::<3>(offset)?;
        Ok(Self { x, y, z })
    }

    pub(crate) fn write(&self, w: &mut LittleEndianWriter) {
        w.write_f32(self.x);
        w.write_f32(self.y);
        w.write_f32(self.z);
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// Typed view of the four room sections of a top-level container.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSections {
    pub points: Vec<Point>,
    pub rails: Vec<Rail>,
    pub actors: Vec<Actor>,
    pub grid: Option<Grid>,
}

pub fn decode_sections(container: &Container) -> Result<RoomSections, LebError> {
    let points = leaf_records(container, POINT_SECTION)?
        .into_iter()
        .map(Point::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let rails = leaf_records(container, RAIL_SECTION)?
        .into_iter()
        .map(Rail::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let actors = leaf_records(container, ACTOR_SECTION)?
        .into_iter()
        .map(|data| Actor::decode(data, &container.names))
        .collect::<Result<Vec<_>, _>>()?;

    let grid = match container.entry(GRID_SECTION) {
        Some(entry) => {
            let nested = entry.as_container().ok_or(DomainError::MalformedSection {
                section: GRID_SECTION,
                reason: "expected a nested container",
            })?;
            Some(Grid::decode(nested)?)
        }
        None => None,
    };

    log::info!(
        "decoded room: {} actors, {} points, {} rails, grid: {}",
        actors.len(),
        points.len(),
        rails.len(),
        grid.as_ref()
            .and_then(|g| g.dimension().ok())
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(RoomSections {
        points,
        rails,
        actors,
        grid,
    })
}

/// Leaf payloads of the nested container named `section`.
fn leaf_records<'a>(
    container: &'a Container,
    section: &'static str,
) -> Result<Vec<&'a [u8]>, DomainError> {
    let nested = container
        .entry(section)
        .ok_or(DomainError::MissingRequiredSection(section))?
        .as_container()
        .ok_or(DomainError::MalformedSection {
            section,
            reason: "expected a nested container",
        })?;

    nested
        .entries
        .iter()
        .map(|entry| match &entry.payload {
            EntryPayload::Leaf(data) => Ok(data.as_slice()),
            EntryPayload::Nested(_) => Err(DomainError::MalformedSection {
                section,
                reason: "expected leaf records",
            }),
        })
        .collect()
}
