//! Editable view of one room.
//!
//! [`RoomModel`] owns the decoded sections alongside the container they came
//! from. Every mutation either applies completely or returns an error and
//! leaves the model untouched, and the relationship invariant (each control
//! link has a matching back-reference on its target) is kept by the model
//! rather than by callers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::RngCore;
use serde::Serialize;

use crate::container::{Container, Entry, EntryPayload, MIN_LEAF_NODE_INDEX, NO_NEXT_OFFSET};
use crate::error::{LebError, ValidationError};
use crate::reader::{checked_u8, checked_u32};
use crate::room::actor::{Actor, PARAMETER_COUNT, SWITCH_COUNT, Switch, Transform};
use crate::room::grid::Grid;
use crate::room::point::{Point, Rail};
use crate::room::relationship::{ControlLink, ParamPair};
use crate::room::{
    ACTOR_SECTION, GRID_SECTION, POINT_SECTION, RAIL_SECTION, RoomSections, Vec3, decode_sections,
};
use crate::variant::{NameTable, VariantField};

/// Types every room must keep at least one instance of.
pub const DEFAULT_REQUIRED_TYPES: [u16; 1] = [0x185];

const POINT_NODE_INDEX: u16 = 0xFFF3;
const RAIL_NODE_INDEX: u16 = 0xFFF2;
const ACTOR_NODE_INDEX: u16 = MIN_LEAF_NODE_INDEX;

/// A broken control link found by [`RoomModel::check_reference_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceViolation {
    /// `source` controls an index past the end of the actor list.
    DanglingControl { source: usize, target: u32 },
    /// `source` controls `target`, but `target` does not list `source` back.
    MissingBackReference { source: usize, target: usize },
    /// `target` lists a back-reference past the end of the actor list.
    DanglingBackReference { target: usize, source: u32 },
}

#[derive(Debug, Clone)]
pub struct RoomModel {
    container: Container,
    actors: Vec<Actor>,
    points: Vec<Point>,
    rails: Vec<Rail>,
    grid: Option<Grid>,
    keys: HashSet<u64>,
    required_types: BTreeSet<u16>,
}

impl RoomModel {
    /// Parse a whole room file. Nothing is returned on failure.
    pub fn parse(bytes: &[u8]) -> Result<Self, LebError> {
        let container = Container::parse(bytes)?;
        let sections = decode_sections(&container)?;

        let mut keys = HashSet::with_capacity(sections.actors.len());
        for actor in &sections.actors {
            if !keys.insert(actor.key) {
                log::warn!("duplicate actor key {:#018X}", actor.key);
            }
        }

        Ok(Self {
            container,
            actors: sections.actors,
            points: sections.points,
            rails: sections.rails,
            grid: sections.grid,
            keys,
            required_types: DEFAULT_REQUIRED_TYPES.into_iter().collect(),
        })
    }

    /// Build a room from scratch. The container gets one nested entry per
    /// section, plus `grid` when one is given.
    pub fn from_sections(sections: RoomSections) -> Result<Self, ValidationError> {
        let mut keys = HashSet::with_capacity(sections.actors.len());
        for actor in &sections.actors {
            if !keys.insert(actor.key) {
                return Err(ValidationError::DuplicateActorKey(actor.key));
            }
        }

        let mut section_names = vec![POINT_SECTION, RAIL_SECTION, ACTOR_SECTION];
        if sections.grid.is_some() {
            section_names.push(GRID_SECTION);
        }
        let mut names = NameTable::new();
        let mut entries = Vec::with_capacity(section_names.len());
        for (i, name) in section_names.into_iter().enumerate() {
            names.push(name)?;
            entries.push(Entry::nested(i as u16, name, NO_NEXT_OFFSET, Container::default()));
        }

        let container = Container {
            node_count: entries.len() as u16,
            entries,
            names: names.into_bytes(),
            ..Container::default()
        };

        Ok(Self {
            container,
            actors: sections.actors,
            points: sections.points,
            rails: sections.rails,
            grid: sections.grid,
            keys,
            required_types: DEFAULT_REQUIRED_TYPES.into_iter().collect(),
        })
    }

    pub fn with_required_types(mut self, types: impl IntoIterator<Item = u16>) -> Self {
        self.required_types = types.into_iter().collect();
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, index: usize) -> Option<&Actor> {
        self.actors.get(index)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn rails(&self) -> &[Rail] {
        &self.rails
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut Grid> {
        self.grid.as_mut()
    }

    pub fn required_types(&self) -> &BTreeSet<u16> {
        &self.required_types
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.keys.contains(&key)
    }

    pub fn count_of_type(&self, type_id: u16) -> usize {
        self.actors.iter().filter(|a| a.type_id == type_id).count()
    }

    /// Append a deep copy of the actor at `index` under a fresh random key.
    /// Returns the new actor's index.
    pub fn add_actor_copy(&mut self, index: usize) -> Result<usize, ValidationError> {
        self.add_actor_copy_with_rng(index, &mut rand::thread_rng())
    }

    pub fn add_actor_copy_with_rng<R: RngCore + ?Sized>(
        &mut self,
        index: usize,
        rng: &mut R,
    ) -> Result<usize, ValidationError> {
        let mut copy = self.checked_actor(index)?.clone();
        let new_index = self.actors.len();
        let new_ref = checked_u32("actor index", new_index)?;

        let mut key = rng.next_u64();
        while self.keys.contains(&key) {
            key = rng.next_u64();
        }
        copy.key = key;
        copy.visible = true;

        // Nothing refers to the copy yet; the copy's own controls need
        // matching back-references on their targets.
        copy.relationship.controlled_by.clear();
        let mut added: BTreeMap<usize, usize> = BTreeMap::new();
        for link in &copy.relationship.controls {
            *added.entry(link.actor_index as usize).or_default() += 1;
        }
        for (&target, &count) in &added {
            if let Some(actor) = self.actors.get(target) {
                checked_u8(
                    "section 3 count",
                    actor.relationship.controlled_by.len() + count,
                )?;
            }
        }
        for link in &copy.relationship.controls {
            match self.actors.get_mut(link.actor_index as usize) {
                Some(target) => target.relationship.controlled_by.push(new_ref),
                None => log::warn!(
                    "copied actor {:#018X} controls missing index {}",
                    key,
                    link.actor_index
                ),
            }
        }

        self.keys.insert(key);
        self.actors.push(copy);
        log::debug!("copied actor {index} to {new_index} with key {key:#018X}");
        Ok(new_index)
    }

    /// Delete the actor at `index`, dropping links to it and shifting links
    /// to later actors down by one.
    pub fn remove_actor(&mut self, index: usize) -> Result<(), ValidationError> {
        let type_id = self.checked_actor(index)?.type_id;
        self.guard_required_type(type_id)?;
        let removed_ref = checked_u32("actor index", index)?;

        let removed = self.actors.remove(index);
        if !self.actors.iter().any(|a| a.key == removed.key) {
            self.keys.remove(&removed.key);
        }
        for actor in &mut self.actors {
            actor.relationship.forget_actor(removed_ref);
        }

        log::debug!("removed actor {index} (key {:#018X})", removed.key);
        Ok(())
    }

    pub fn retype_actor(&mut self, index: usize, new_type: u16) -> Result<(), ValidationError> {
        let old_type = self.checked_actor(index)?.type_id;
        if old_type == new_type {
            return Ok(());
        }
        self.guard_required_type(old_type)?;
        self.actors[index].type_id = new_type;
        Ok(())
    }

    pub fn set_actor_key(&mut self, index: usize, key: u64) -> Result<(), ValidationError> {
        let old_key = self.checked_actor(index)?.key;
        if old_key == key {
            return Ok(());
        }
        if self.keys.contains(&key) {
            return Err(ValidationError::DuplicateActorKey(key));
        }

        self.actors[index].key = key;
        if !self.actors.iter().any(|a| a.key == old_key) {
            self.keys.remove(&old_key);
        }
        self.keys.insert(key);
        Ok(())
    }

    pub fn set_transform(&mut self, index: usize, transform: Transform) -> Result<(), ValidationError> {
        self.checked_actor_mut(index)?.transform = transform;
        Ok(())
    }

    pub fn set_parameter(
        &mut self,
        index: usize,
        slot: usize,
        value: VariantField,
    ) -> Result<(), ValidationError> {
        self.checked_actor(index)?;
        if slot >= PARAMETER_COUNT {
            return Err(ValidationError::ValueOutOfRange {
                field: "parameter slot",
                value: slot as u64,
            });
        }
        if let VariantField::Name(name) = &value
            && name.contains('\0')
        {
            return Err(ValidationError::InvalidName(name.clone()));
        }
        self.actors[index].parameters[slot] = value;
        Ok(())
    }

    pub fn set_switch(&mut self, index: usize, slot: usize, switch: Switch) -> Result<(), ValidationError> {
        self.checked_actor(index)?;
        if slot >= SWITCH_COUNT {
            return Err(ValidationError::ValueOutOfRange {
                field: "switch slot",
                value: slot as u64,
            });
        }
        self.actors[index].switches[slot] = switch;
        Ok(())
    }

    /// Flip the editor-only visibility flag; returns the new state.
    pub fn toggle_visible(&mut self, index: usize) -> Result<bool, ValidationError> {
        let actor = self.checked_actor_mut(index)?;
        actor.visible = !actor.visible;
        Ok(actor.visible)
    }

    pub fn set_point(&mut self, index: usize, position: Vec3) -> Result<(), ValidationError> {
        let point = self
            .points
            .get_mut(index)
            .ok_or(ValidationError::ValueOutOfRange {
                field: "point index",
                value: index as u64,
            })?;
        point.position = position;
        Ok(())
    }

    /// Make `source` control `target`, recording the back-reference on
    /// `target`.
    pub fn add_link(
        &mut self,
        source: usize,
        target: usize,
        params: ParamPair,
    ) -> Result<(), ValidationError> {
        let source_ref = checked_u32("actor index", source)?;
        let target_ref = checked_u32("actor index", target)?;
        checked_u8("section 1 count", self.checked_actor(source)?.relationship.controls.len() + 1)?;
        checked_u8(
            "section 3 count",
            self.checked_actor(target)?.relationship.controlled_by.len() + 1,
        )?;
        for name in [&params.0, &params.1].into_iter().filter_map(VariantField::as_name) {
            if name.contains('\0') {
                return Err(ValidationError::InvalidName(name.to_string()));
            }
        }

        self.actors[source].relationship.controls.push(ControlLink {
            params,
            actor_index: target_ref,
        });
        self.actors[target].relationship.controlled_by.push(source_ref);
        Ok(())
    }

    pub fn check_reference_integrity(&self) -> Vec<ReferenceViolation> {
        let mut violations = Vec::new();
        for (source, actor) in self.actors.iter().enumerate() {
            for link in &actor.relationship.controls {
                match self.actors.get(link.actor_index as usize) {
                    None => violations.push(ReferenceViolation::DanglingControl {
                        source,
                        target: link.actor_index,
                    }),
                    Some(target) => {
                        let back = source as u32;
                        if !target.relationship.controlled_by.contains(&back) {
                            violations.push(ReferenceViolation::MissingBackReference {
                                source,
                                target: link.actor_index as usize,
                            });
                        }
                    }
                }
            }
            for &back in &actor.relationship.controlled_by {
                if back as usize >= self.actors.len() {
                    violations.push(ReferenceViolation::DanglingBackReference {
                        target: source,
                        source: back,
                    });
                }
            }
        }
        violations
    }

    /// Serialize the room. The top-level name blob is rebuilt by walking the
    /// container's entries in order: actor names and string parameters are
    /// appended while the actor section is emitted, and each entry's own
    /// name follows its children.
    pub fn repack(&self) -> Result<Vec<u8>, ValidationError> {
        self.check_unique_keys()?;

        let mut container = self.container.clone();
        let mut names = NameTable::new();

        for entry in &mut container.entries {
            match (entry.name.as_str(), &mut entry.payload) {
                (POINT_SECTION, EntryPayload::Nested(nested)) => {
                    let leaves = self.points.iter().map(Point::encode).collect();
                    rewrite_leaves(nested, leaves, POINT_NODE_INDEX);
                }
                (RAIL_SECTION, EntryPayload::Nested(nested)) => {
                    let leaves = self
                        .rails
                        .iter()
                        .map(Rail::encode)
                        .collect::<Result<Vec<_>, _>>()?;
                    rewrite_leaves(nested, leaves, RAIL_NODE_INDEX);
                }
                (ACTOR_SECTION, EntryPayload::Nested(nested)) => {
                    let mut entries = Vec::with_capacity(self.actors.len());
                    for actor in &self.actors {
                        entries.push(Entry::leaf(
                            ACTOR_NODE_INDEX,
                            "",
                            NO_NEXT_OFFSET,
                            actor.encode(&mut names)?,
                        ));
                    }
                    nested.entries = entries;
                }
                (GRID_SECTION, EntryPayload::Nested(nested)) => {
                    if let Some(grid) = &self.grid {
                        nested.entries = grid.entries();
                    }
                }
                _ => {}
            }
            names.push(&entry.name)?;
        }

        container.names = names.into_bytes();
        let bytes = container.serialize()?;
        log::info!(
            "repacked room: {} actors, {} name bytes, {} bytes total",
            self.actors.len(),
            container.names.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn check_unique_keys(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.actors.len());
        for actor in &self.actors {
            if !seen.insert(actor.key) {
                return Err(ValidationError::DuplicateActorKey(actor.key));
            }
        }
        Ok(())
    }

    fn guard_required_type(&self, type_id: u16) -> Result<(), ValidationError> {
        if self.required_types.contains(&type_id) && self.count_of_type(type_id) <= 1 {
            return Err(ValidationError::RequiredActorTypeRemoved { type_id });
        }
        Ok(())
    }

    fn checked_actor(&self, index: usize) -> Result<&Actor, ValidationError> {
        self.actors.get(index).ok_or(ValidationError::ActorIndexOutOfRange {
            index,
            len: self.actors.len(),
        })
    }

    fn checked_actor_mut(&mut self, index: usize) -> Result<&mut Actor, ValidationError> {
        let len = self.actors.len();
        self.actors
            .get_mut(index)
            .ok_or(ValidationError::ActorIndexOutOfRange { index, len })
    }
}

/// Replace leaf payloads in place, keeping each existing entry's metadata.
/// Extra records get fresh entries; surplus entries are dropped.
fn rewrite_leaves(nested: &mut Container, leaves: Vec<Vec<u8>>, node_index: u16) {
    nested.entries.truncate(leaves.len());
    for (i, data) in leaves.into_iter().enumerate() {
        match nested.entries.get_mut(i) {
            Some(entry) => entry.payload = EntryPayload::Leaf(data),
            None => nested
                .entries
                .push(Entry::leaf(node_index, "", NO_NEXT_OFFSET, data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReferenceViolation, RoomModel};
    use crate::room::RoomSections;
    use crate::room::actor::Actor;
    use crate::room::relationship::ControlLink;
    use crate::variant::VariantField;

    fn link(target: u32) -> ControlLink {
        ControlLink {
            params: (VariantField::Int(0), VariantField::Int(0)),
            actor_index: target,
        }
    }

    fn room(actors: Vec<Actor>) -> RoomModel {
        RoomModel::from_sections(RoomSections {
            points: Vec::new(),
            rails: Vec::new(),
            actors,
            grid: None,
        })
        .unwrap()
    }

    #[test]
    fn copy_registers_back_references_for_its_controls() {
        let mut a = Actor::new(1, 0x185);
        let mut b = Actor::new(2, 5);
        a.relationship.controls.push(link(1));
        b.relationship.controlled_by.push(0);
        let mut model = room(vec![a, b]);

        let new_index = model.add_actor_copy(0).unwrap();
        assert_eq!(new_index, 2);
        assert_eq!(model.actors()[1].relationship.controlled_by, vec![0, 2]);
        assert!(model.actors()[2].relationship.controlled_by.is_empty());
        assert!(model.check_reference_integrity().is_empty());
    }

    #[test]
    fn set_key_rejects_existing_key_and_keeps_model() {
        let mut model = room(vec![Actor::new(1, 5), Actor::new(2, 5)]);
        assert!(model.set_actor_key(1, 1).is_err());
        assert_eq!(model.actors()[1].key, 2);

        model.set_actor_key(1, 7).unwrap();
        assert!(model.contains_key(7));
        assert!(!model.contains_key(2));
    }

    #[test]
    fn out_of_range_parameter_slot_is_rejected() {
        let mut model = room(vec![Actor::new(1, 5)]);
        assert!(model.set_parameter(0, 8, VariantField::Int(1)).is_err());
        model.set_parameter(0, 7, VariantField::Float(0.5)).unwrap();
        assert_eq!(model.actors()[0].parameters[7], VariantField::Float(0.5));
    }

    #[test]
    fn toggling_visibility_flips_state() {
        let mut model = room(vec![Actor::new(1, 5)]);
        assert!(!model.toggle_visible(0).unwrap());
        assert!(model.toggle_visible(0).unwrap());
    }

    #[test]
    fn integrity_check_reports_missing_back_reference() {
        let mut a = Actor::new(1, 5);
        a.relationship.controls.push(link(1));
        a.relationship.controls.push(link(9));
        let model = room(vec![a, Actor::new(2, 5)]);

        assert_eq!(
            model.check_reference_integrity(),
            vec![
                ReferenceViolation::MissingBackReference {
                    source: 0,
                    target: 1
                },
                ReferenceViolation::DanglingControl {
                    source: 0,
                    target: 9
                },
            ]
        );
    }

    #[test]
    fn add_link_keeps_invariant() {
        let mut model = room(vec![Actor::new(1, 5), Actor::new(2, 5)]);
        model
            .add_link(1, 0, (VariantField::Name("Open".into()), VariantField::Int(1)))
            .unwrap();
        assert_eq!(model.actors()[1].relationship.controls[0].actor_index, 0);
        assert_eq!(model.actors()[0].relationship.controlled_by, vec![1]);
        assert!(model.check_reference_integrity().is_empty());
    }
}
