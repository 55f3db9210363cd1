use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LebError;

const LEVEL_DIR: [&str; 2] = ["region_common", "level"];
const ROOM_EXTENSION: &str = "leb";

/// Where rooms are read from and written to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Unpacked game files.
    pub romfs_path: PathBuf,
    /// Root of the modded output tree.
    pub output_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
}

impl EditorConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, LebError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), LebError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `<root>/region_common/level`
    pub fn level_root(root: &Path) -> PathBuf {
        LEVEL_DIR.iter().fold(root.to_path_buf(), |p, part| p.join(part))
    }

    /// Path a room file is written to: its level folder under the output tree.
    pub fn output_file_for(&self, input: &Path) -> Option<PathBuf> {
        let file_name = input.file_name()?;
        let prefix = level_prefix(input)?;
        Some(Self::level_root(&self.output_path).join(prefix).join(file_name))
    }

    /// Locate `<room>.leb`, preferring an already modded copy.
    pub fn room_path(&self, room: &str) -> Option<PathBuf> {
        let prefix = room.split('_').next()?;
        let file_name = format!("{room}.{ROOM_EXTENSION}");
        [&self.output_path, &self.romfs_path]
            .into_iter()
            .filter(|root| !root.as_os_str().is_empty())
            .map(|root| Self::level_root(root).join(prefix).join(&file_name))
            .find(|path| path.is_file())
    }

    /// Level folder names present in either tree.
    pub fn levels(&self) -> Result<BTreeSet<String>, LebError> {
        let mut levels = BTreeSet::new();
        for root in [&self.romfs_path, &self.output_path] {
            if root.as_os_str().is_empty() {
                continue;
            }
            let dir = Self::level_root(root);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    levels.insert(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        Ok(levels)
    }
}

/// Level folder a room belongs to: the file stem up to the first underscore.
pub fn level_prefix(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('_').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{EditorConfig, level_prefix};

    #[test]
    fn prefix_is_stem_before_first_underscore() {
        assert_eq!(level_prefix(Path::new("x/MarinTarinHouse_01A.leb")), Some("MarinTarinHouse"));
        assert_eq!(level_prefix(Path::new("Field.leb")), Some("Field"));
        assert_eq!(level_prefix(Path::new("_01A.leb")), None);
    }

    #[test]
    fn output_file_lands_in_level_folder() {
        let config = EditorConfig {
            output_path: PathBuf::from("/mods"),
            ..EditorConfig::default()
        };
        assert_eq!(
            config.output_file_for(Path::new("/rom/Lv01TailCave_05C.leb")),
            Some(PathBuf::from(
                "/mods/region_common/level/Lv01TailCave/Lv01TailCave_05C.leb"
            ))
        );
    }
}
