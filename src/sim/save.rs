/// Progress save: which level to resume at and how many were cleared.
///
/// Stored as `save.toml`:
///   ```toml
///   current_level = 2
///   levels_cleared = 2
///   ```
///
/// Written whenever a level is completed, read once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SAVE_FILE: &str = "save.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(default)]
    pub current_level: usize,
    #[serde(default)]
    pub levels_cleared: usize,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("save file {path} is corrupt: {source}")]
    Corrupt { path: PathBuf, source: toml::de::Error },
    #[error("cannot encode save data: {0}")]
    Encode(#[from] toml::ser::Error),
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn save_dir() -> PathBuf {
    // 1. Exe directory, if writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let test_path = parent.join(".write_test_preservation");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/preservation");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn save_path() -> PathBuf {
    save_dir().join(SAVE_FILE)
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn save_game(data: &SaveData) -> Result<(), SaveError> {
    write_save(&save_path(), data)
}

/// `Ok(None)` when no save exists yet.
pub fn load_save() -> Result<Option<SaveData>, SaveError> {
    read_save(&save_path())
}

pub fn write_save(path: &Path, data: &SaveData) -> Result<(), SaveError> {
    let text = toml::to_string(data)?;
    std::fs::write(path, text).map_err(|source| SaveError::Io { path: path.to_path_buf(), source })
}

pub fn read_save(path: &Path) -> Result<Option<SaveData>, SaveError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SaveError::Io { path: path.to_path_buf(), source }),
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|source| SaveError::Corrupt { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("preservation_save_{}_{}.toml", tag, std::process::id()))
    }

    #[test]
    fn write_then_read() {
        let path = temp_file("rw");
        let data = SaveData { current_level: 3, levels_cleared: 2 };
        write_save(&path, &data).unwrap();
        assert_eq!(read_save(&path).unwrap(), Some(data));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = temp_file("missing");
        let _ = std::fs::remove_file(&path);
        assert_eq!(read_save(&path).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_file("corrupt");
        std::fs::write(&path, "current_level = \"three\"").unwrap();
        assert!(matches!(read_save(&path), Err(SaveError::Corrupt { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_keys_default_to_zero() {
        let path = temp_file("partial");
        std::fs::write(&path, "levels_cleared = 4\n").unwrap();
        assert_eq!(
            read_save(&path).unwrap(),
            Some(SaveData { current_level: 0, levels_cleared: 4 }),
        );
        let _ = std::fs::remove_file(&path);
    }
}
