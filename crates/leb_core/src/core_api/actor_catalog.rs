use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LebError, ValidationError};
use crate::model::DEFAULT_REQUIRED_TYPES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCatalogEntry {
    pub name: String,
    /// Human-readable meaning of each parameter slot, display only.
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    actors: Vec<ActorCatalogEntry>,
    #[serde(default = "default_required")]
    required: Vec<u16>,
}

fn default_required() -> Vec<u16> {
    DEFAULT_REQUIRED_TYPES.to_vec()
}

/// Actor type names, indexed by type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorCatalog {
    entries: Vec<ActorCatalogEntry>,
    by_name: HashMap<String, u16>,
    required: BTreeSet<u16>,
}

impl Default for ActorCatalog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            required: DEFAULT_REQUIRED_TYPES.into_iter().collect(),
        }
    }
}

impl ActorCatalog {
    /// Entry `i` names type `i`.
    pub fn from_entries(
        entries: Vec<ActorCatalogEntry>,
        required: impl IntoIterator<Item = u16>,
    ) -> Result<Self, ValidationError> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let type_id = u16::try_from(i).map_err(|_| ValidationError::ValueOutOfRange {
                field: "actor type id",
                value: i as u64,
            })?;
            // First definition wins for duplicate names.
            by_name.entry(entry.name.clone()).or_insert(type_id);
        }
        Ok(Self {
            entries,
            by_name,
            required: required.into_iter().collect(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, LebError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Ok(Self::from_entries(file.actors, file.required)?)
    }

    pub fn load(path: &Path) -> Result<Self, LebError> {
        let text = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&text)?;
        log::info!(
            "loaded {} actor types from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn name(&self, type_id: u16) -> Option<&str> {
        self.entries
            .get(type_id as usize)
            .map(|entry| entry.name.as_str())
    }

    /// Catalog name, or the hex type id for unknown types.
    pub fn display_name(&self, type_id: u16) -> String {
        match self.name(type_id) {
            Some(name) => name.to_string(),
            None => format!("0x{type_id:X}"),
        }
    }

    pub fn type_id(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// Resolve user input: a catalog name, a `0x` hex id or a decimal id.
    pub fn resolve_type(&self, text: &str) -> Result<u16, ValidationError> {
        let text = text.trim();
        if let Some(type_id) = self.type_id(text) {
            return Ok(type_id);
        }
        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16).ok(),
            None => text.parse::<u16>().ok(),
        };
        parsed.ok_or_else(|| ValidationError::UnknownActorType(text.to_string()))
    }

    pub fn parameter_descriptions(&self, type_id: u16) -> &[String] {
        self.entries
            .get(type_id as usize)
            .map(|entry| entry.parameters.as_slice())
            .unwrap_or(&[])
    }

    pub fn required_types(&self) -> &BTreeSet<u16> {
        &self.required
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ActorCatalog;
    use crate::error::ValidationError;

    const CATALOG: &str = r#"{
        "actors": [
            {"name": "Null"},
            {"name": "EnemyOctorok", "parameters": ["variant", "drop"]},
            {"name": "MapStatic"}
        ],
        "required": [2]
    }"#;

    #[test]
    fn names_resolve_both_ways() {
        let catalog = ActorCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(1), Some("EnemyOctorok"));
        assert_eq!(catalog.type_id("MapStatic"), Some(2));
        assert_eq!(catalog.display_name(0x1A5), "0x1A5");
        assert_eq!(catalog.parameter_descriptions(1), ["variant", "drop"]);
        assert!(catalog.parameter_descriptions(7).is_empty());
        assert!(catalog.required_types().contains(&2));
    }

    #[test]
    fn required_defaults_to_map_static() {
        let catalog = ActorCatalog::from_json_str(r#"{"actors": []}"#).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.required_types().iter().copied().collect::<Vec<_>>(), vec![0x185]);
        assert_eq!(ActorCatalog::default().required_types(), catalog.required_types());
    }

    #[test]
    fn type_text_accepts_names_and_numbers() {
        let catalog = ActorCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.resolve_type("EnemyOctorok").unwrap(), 1);
        assert_eq!(catalog.resolve_type("0x185").unwrap(), 0x185);
        assert_eq!(catalog.resolve_type("12").unwrap(), 12);
        assert_eq!(
            catalog.resolve_type("Nope").unwrap_err(),
            ValidationError::UnknownActorType("Nope".to_string())
        );
    }
}
