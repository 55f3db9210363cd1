use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ValidationError};
use crate::reader::{LittleEndianReader, LittleEndianWriter, checked_u8};
use crate::variant::{NameTable, VARIANT_WIDTH, VariantField};

// Counts are stored in the order 1, 3, 2.
const CONTROL_COUNT_OFFSET: usize = 0x3;
const CONTROLLED_BY_COUNT_OFFSET: usize = 0x4;
const DEPENDENCY_COUNT_OFFSET: usize = 0x5;
const RESERVED_LEN: usize = 6;
pub const RELATIONSHIP_HEADER_LEN: usize = 0xC;

const CONTROL_WIDTH: usize = 20;
const DEPENDENCY_WIDTH: usize = 24;
const INDEX_WIDTH: usize = 4;

const ENEMY_PREFIX: &str = "Enemy";
const KILL_CHECK_SUFFIX: &str = "HolocaustChecker";

pub type ParamPair = (VariantField, VariantField);

/// Section 1 entry: an actor this actor controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlLink {
    pub params: ParamPair,
    pub actor_index: u32,
}

/// Section 2 entry: a positional dependency on a rail point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyLink {
    pub params: ParamPair,
    pub rail_index: u32,
    pub point_index: u32,
}

/// Flag bytes at the head of every relationship block. They are derived at
/// encode time and never carried through from a parsed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationshipFlags {
    pub is_enemy: bool,
    pub check_kills: bool,
    pub is_chamber_enemy: bool,
}

impl RelationshipFlags {
    pub fn derive(display_name: &str) -> Self {
        Self {
            is_enemy: display_name.starts_with(ENEMY_PREFIX),
            check_kills: display_name.ends_with(KILL_CHECK_SUFFIX),
            is_chamber_enemy: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Section 1.
    pub controls: Vec<ControlLink>,
    /// Section 2.
    pub dependencies: Vec<DependencyLink>,
    /// Section 3: indices of actors whose section 1 targets this actor.
    pub controlled_by: Vec<u32>,
}

impl Relationship {
    pub fn decode(r: &LittleEndianReader<'_>, base: usize, names: &[u8]) -> Result<Self, ParseError> {
        let control_count = r.read_u8(base + CONTROL_COUNT_OFFSET)? as usize;
        let controlled_by_count = r.read_u8(base + CONTROLLED_BY_COUNT_OFFSET)? as usize;
        let dependency_count = r.read_u8(base + DEPENDENCY_COUNT_OFFSET)? as usize;

        let mut pos = base + RELATIONSHIP_HEADER_LEN;

        let mut controls = Vec::with_capacity(control_count);
        for _ in 0..control_count {
            let params = read_pair(r, pos, names)?;
            let actor_index = r.read_u32(pos + 2 * VARIANT_WIDTH)?;
            controls.push(ControlLink {
                params,
                actor_index,
            });
            pos += CONTROL_WIDTH;
        }

        let mut dependencies = Vec::with_capacity(dependency_count);
        for _ in 0..dependency_count {
            let params = read_pair(r, pos, names)?;
            let rail_index = r.read_u32(pos + 2 * VARIANT_WIDTH)?;
            let point_index = r.read_u32(pos + 2 * VARIANT_WIDTH + 4)?;
            dependencies.push(DependencyLink {
                params,
                rail_index,
                point_index,
            });
            pos += DEPENDENCY_WIDTH;
        }

        let mut controlled_by = Vec::with_capacity(controlled_by_count);
        for i in 0..controlled_by_count {
            controlled_by.push(r.read_u32(pos + i * INDEX_WIDTH)?);
        }

        Ok(Self {
            controls,
            dependencies,
            controlled_by,
        })
    }

    /// Append the encoded block. String parameters are pushed to `names` in
    /// section 1 then section 2 order, first then second value of each pair.
    pub fn encode(
        &self,
        w: &mut LittleEndianWriter,
        names: &mut NameTable,
        display_name: &str,
    ) -> Result<(), ValidationError> {
        let flags = RelationshipFlags::derive(display_name);
        w.write_u8(flags.is_enemy as u8);
        w.write_u8(flags.check_kills as u8);
        w.write_u8(flags.is_chamber_enemy as u8);
        w.write_u8(checked_u8("section 1 count", self.controls.len())?);
        w.write_u8(checked_u8("section 3 count", self.controlled_by.len())?);
        w.write_u8(checked_u8("section 2 count", self.dependencies.len())?);
        w.write_bytes(&[0u8; RESERVED_LEN]);

        for link in &self.controls {
            link.params.0.write(w, names)?;
            link.params.1.write(w, names)?;
            w.write_u32(link.actor_index);
        }
        for link in &self.dependencies {
            link.params.0.write(w, names)?;
            link.params.1.write(w, names)?;
            w.write_u32(link.rail_index);
            w.write_u32(link.point_index);
        }
        for &index in &self.controlled_by {
            w.write_u32(index);
        }
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        RELATIONSHIP_HEADER_LEN
            + self.controls.len() * CONTROL_WIDTH
            + self.dependencies.len() * DEPENDENCY_WIDTH
            + self.controlled_by.len() * INDEX_WIDTH
    }

    /// Drop references to `removed` and shift higher indices down by one.
    pub(crate) fn forget_actor(&mut self, removed: u32) {
        self.controls.retain(|link| link.actor_index != removed);
        for link in &mut self.controls {
            if link.actor_index > removed {
                link.actor_index -= 1;
            }
        }
        self.controlled_by.retain(|&index| index != removed);
        for index in &mut self.controlled_by {
            if *index > removed {
                *index -= 1;
            }
        }
    }
}

fn read_pair(r: &LittleEndianReader<'_>, pos: usize, names: &[u8]) -> Result<ParamPair, ParseError> {
    Ok((
        VariantField::read(r, pos, names)?,
        VariantField::read(r, pos + VARIANT_WIDTH, names)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::{ControlLink, Relationship, RelationshipFlags};
    use crate::variant::VariantField;

    #[test]
    fn flags_follow_display_name() {
        let enemy = RelationshipFlags::derive("EnemyOctorok");
        assert!(enemy.is_enemy);
        assert!(!enemy.check_kills);

        let checker = RelationshipFlags::derive("TagHolocaustChecker");
        assert!(checker.check_kills);
        assert!(!checker.is_chamber_enemy);

        assert_eq!(
            RelationshipFlags::derive("Actor-00000000000000FF"),
            RelationshipFlags::default()
        );
    }

    #[test]
    fn forgetting_an_actor_removes_and_shifts() {
        let pair = (VariantField::Int(0), VariantField::Int(0));
        let mut rel = Relationship {
            controls: vec![
                ControlLink {
                    params: pair.clone(),
                    actor_index: 1,
                },
                ControlLink {
                    params: pair.clone(),
                    actor_index: 3,
                },
                ControlLink {
                    params: pair,
                    actor_index: 0,
                },
            ],
            dependencies: Vec::new(),
            controlled_by: vec![3, 1, 2],
        };
        rel.forget_actor(1);
        let targets: Vec<u32> = rel.controls.iter().map(|l| l.actor_index).collect();
        assert_eq!(targets, vec![2, 0]);
        assert_eq!(rel.controlled_by, vec![2, 1]);
    }
}
