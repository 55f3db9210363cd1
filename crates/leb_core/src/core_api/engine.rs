use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{LebError, ValidationError};
use crate::model::RoomModel;
use crate::room::actor::Actor;

use super::actor_catalog::ActorCatalog;
use super::types::{
    ActorEntry, ControlEntry, DependencyEntry, GridEntry, ParameterEntry, PointEntry,
    RoomSnapshot, SwitchEntry, TileEntry,
};

#[derive(Debug, Default, Clone)]
pub struct Engine {
    catalog: Arc<ActorCatalog>,
}

/// One open room plus the catalog used to describe it.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: Arc<ActorCatalog>,
    room: RoomModel,
    source: Option<PathBuf>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: ActorCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &ActorCatalog {
        &self.catalog
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, LebError> {
        let room = RoomModel::parse(bytes.as_ref())?
            .with_required_types(self.catalog.required_types().iter().copied());
        Ok(Session {
            catalog: Arc::clone(&self.catalog),
            room,
            source: None,
        })
    }

    pub fn open_path(&self, path: &Path) -> Result<Session, LebError> {
        let bytes = fs::read(path)?;
        log::info!("opening {} ({} bytes)", path.display(), bytes.len());
        let mut session = self.open_bytes(bytes)?;
        session.source = Some(path.to_path_buf());
        Ok(session)
    }
}

impl Session {
    pub fn room(&self) -> &RoomModel {
        &self.room
    }

    pub fn room_mut(&mut self) -> &mut RoomModel {
        &mut self.room
    }

    pub fn catalog(&self) -> &ActorCatalog {
        &self.catalog
    }

    /// File the room was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn type_name(&self, type_id: u16) -> String {
        self.catalog.display_name(type_id)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let grid = self.room.grid();
        RoomSnapshot {
            dimension: grid.and_then(|g| g.dimension().ok()),
            room_width: grid.map(|g| g.info.room_width),
            room_height: grid.map(|g| g.info.room_height),
            actor_count: self.room.actors().len(),
            point_count: self.room.points().len(),
            rail_count: self.room.rails().len(),
            name_bytes: self.room.container().names.len(),
        }
    }

    pub fn actors(&self) -> Vec<ActorEntry> {
        self.room
            .actors()
            .iter()
            .enumerate()
            .map(|(index, actor)| self.actor_entry(index, actor))
            .collect()
    }

    pub fn actor(&self, index: usize) -> Option<ActorEntry> {
        self.room
            .actor(index)
            .map(|actor| self.actor_entry(index, actor))
    }

    pub fn points(&self) -> Vec<PointEntry> {
        self.room
            .points()
            .iter()
            .enumerate()
            .map(|(index, point)| PointEntry {
                index,
                position: point.position,
            })
            .collect()
    }

    pub fn grid(&self) -> Option<GridEntry> {
        let grid = self.room.grid()?;
        let dimension = grid.dimension().ok()?;
        Some(GridEntry {
            dimension,
            room_width: grid.info.room_width,
            room_height: grid.info.room_height,
            tile_size: grid.info.tile_size,
            x: grid.info.x,
            z: grid.info.z,
            tiles: grid
                .tiles
                .iter()
                .enumerate()
                .map(|(index, tile)| TileEntry {
                    index,
                    flags: tile.flags.names().into_iter().map(str::to_string).collect(),
                    chain_index: tile.chain_index,
                    elevation: tile.elevation,
                })
                .collect(),
        })
    }

    pub fn copy_actor(&mut self, index: usize) -> Result<usize, LebError> {
        Ok(self.room.add_actor_copy(index)?)
    }

    pub fn delete_actor(&mut self, index: usize) -> Result<(), LebError> {
        Ok(self.room.remove_actor(index)?)
    }

    pub fn retype_actor(&mut self, index: usize, type_id: u16) -> Result<(), LebError> {
        Ok(self.room.retype_actor(index, type_id)?)
    }

    pub fn retype_actor_by_name(&mut self, index: usize, name: &str) -> Result<(), LebError> {
        let type_id = self
            .catalog
            .type_id(name)
            .ok_or_else(|| ValidationError::UnknownActorType(name.to_string()))?;
        self.retype_actor(index, type_id)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LebError> {
        Ok(self.room.repack()?)
    }

    /// Repack, then write. A failed repack leaves `path` untouched.
    pub fn save_to(&self, path: &Path) -> Result<(), LebError> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;
        log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn actor_entry(&self, index: usize, actor: &Actor) -> ActorEntry {
        let descriptions = self.catalog.parameter_descriptions(actor.type_id);
        let relationship = &actor.relationship;
        ActorEntry {
            index,
            key: actor.key,
            name: actor.display_name(),
            type_id: actor.type_id,
            type_name: self.type_name(actor.type_id),
            room_id: actor.room_id,
            position: actor.transform.position,
            rotation: actor.transform.rotation,
            scale: actor.transform.scale,
            parameters: actor
                .parameters
                .iter()
                .enumerate()
                .map(|(slot, value)| ParameterEntry {
                    slot,
                    value: value.clone(),
                    description: descriptions.get(slot).cloned(),
                })
                .collect(),
            switches: actor
                .switches
                .iter()
                .enumerate()
                .map(|(slot, switch)| SwitchEntry {
                    slot,
                    usage: switch.usage.to_string(),
                    index: switch.index,
                })
                .collect(),
            controls: relationship
                .controls
                .iter()
                .map(|link| ControlEntry {
                    target: link.actor_index,
                    params: [link.params.0.clone(), link.params.1.clone()],
                })
                .collect(),
            dependencies: relationship
                .dependencies
                .iter()
                .map(|link| DependencyEntry {
                    rail: link.rail_index,
                    point: link.point_index,
                    params: [link.params.0.clone(), link.params.1.clone()],
                })
                .collect(),
            controlled_by: relationship.controlled_by.clone(),
            visible: actor.visible,
        }
    }
}
