/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: Tuning,
    pub levels_dir: PathBuf,
    pub log: LogConfig,
}

/// Everything the simulation reads while running a level.
#[derive(Clone, Debug)]
pub struct Tuning {
    pub tick_rate_ms: u64,
    pub character: CharacterConfig,
    pub path: PathConfig,
    pub guard: GuardConfig,
    pub switch: SwitchConfig,
}

#[derive(Clone, Debug)]
pub struct CharacterConfig {
    pub radius: f32,
    pub speed: f32,            // world units per second along the drawn path
    pub start_resources: u32,  // added to the level's own starting stock
}

#[derive(Clone, Debug)]
pub struct PathConfig {
    pub spacing: f32,          // step between committed waypoints
}

#[derive(Clone, Debug)]
pub struct GuardConfig {
    pub patrol_speed: f32,
    pub chase_speed: f32,
    pub return_speed: f32,
    pub detection_radius: f32,
    pub lose_radius: f32,      // must exceed detection_radius
    pub trail_spacing: f32,    // min distance between recorded chase points
}

#[derive(Clone, Debug)]
pub struct SwitchConfig {
    pub debounce_secs: f32,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    pub file: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    character: TomlCharacter,
    #[serde(default)]
    path: TomlPath,
    #[serde(default)]
    guard: TomlGuard,
    #[serde(default)]
    switch: TomlSwitch,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlCharacter {
    #[serde(default = "default_character_radius")]
    radius: f32,
    #[serde(default = "default_character_speed")]
    speed: f32,
    #[serde(default)]
    start_resources: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPath {
    #[serde(default = "default_path_spacing")]
    spacing: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGuard {
    #[serde(default = "default_patrol_speed")]
    patrol_speed: f32,
    #[serde(default = "default_chase_speed")]
    chase_speed: f32,
    #[serde(default = "default_return_speed")]
    return_speed: f32,
    #[serde(default = "default_detection_radius")]
    detection_radius: f32,
    #[serde(default = "default_lose_radius")]
    lose_radius: f32,
    #[serde(default = "default_trail_spacing")]
    trail_spacing: f32,
}

#[derive(Deserialize, Debug)]
struct TomlSwitch {
    #[serde(default = "default_debounce")]
    debounce_secs: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }
fn default_character_radius() -> f32 { 25.0 }
fn default_character_speed() -> f32 { 120.0 }
fn default_path_spacing() -> f32 { 20.0 }
fn default_patrol_speed() -> f32 { 53.0 }
fn default_chase_speed() -> f32 { 95.0 }
fn default_return_speed() -> f32 { 80.0 }
fn default_detection_radius() -> f32 { 150.0 }
fn default_lose_radius() -> f32 { 230.0 }
fn default_trail_spacing() -> f32 { 20.0 }
fn default_debounce() -> f32 { 0.5 }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "preservation.log".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlCharacter {
    fn default() -> Self {
        TomlCharacter {
            radius: default_character_radius(),
            speed: default_character_speed(),
            start_resources: 0,
        }
    }
}

impl Default for TomlPath {
    fn default() -> Self {
        TomlPath { spacing: default_path_spacing() }
    }
}

impl Default for TomlGuard {
    fn default() -> Self {
        TomlGuard {
            patrol_speed: default_patrol_speed(),
            chase_speed: default_chase_speed(),
            return_speed: default_return_speed(),
            detection_radius: default_detection_radius(),
            lose_radius: default_lose_radius(),
            trail_spacing: default_trail_spacing(),
        }
    }
}

impl Default for TomlSwitch {
    fn default() -> Self {
        TomlSwitch { debounce_secs: default_debounce() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { level: default_log_level(), file: default_log_file() }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            tick_rate_ms: default_tick_rate(),
            character: CharacterConfig::default(),
            path: PathConfig::default(),
            guard: GuardConfig::default(),
            switch: SwitchConfig::default(),
        }
    }
}

impl Default for CharacterConfig {
    fn default() -> Self {
        TomlCharacter::default().into()
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig { spacing: default_path_spacing() }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        TomlGuard::default().into()
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        SwitchConfig { debounce_secs: default_debounce() }
    }
}

impl From<TomlCharacter> for CharacterConfig {
    fn from(t: TomlCharacter) -> Self {
        CharacterConfig { radius: t.radius, speed: t.speed, start_resources: t.start_resources }
    }
}

impl From<TomlGuard> for GuardConfig {
    fn from(t: TomlGuard) -> Self {
        let mut lose_radius = t.lose_radius;
        if lose_radius <= t.detection_radius {
            lose_radius = t.detection_radius * 1.5;
            log::warn!(
                "guard.lose_radius must exceed detection_radius ({}); using {}",
                t.detection_radius, lose_radius,
            );
        }
        GuardConfig {
            patrol_speed: t.patrol_speed,
            chase_speed: t.chase_speed,
            return_speed: t.return_speed,
            detection_radius: t.detection_radius,
            lose_radius,
            trail_spacing: t.trail_spacing,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no file search). Relative paths stay relative.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, &[]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let level = toml_cfg.log.level.parse().unwrap_or(log::LevelFilter::Info);

        GameConfig {
            tuning: Tuning {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                character: toml_cfg.character.into(),
                path: PathConfig { spacing: toml_cfg.path.spacing },
                guard: toml_cfg.guard.into(),
                switch: SwitchConfig { debounce_secs: toml_cfg.switch.debounce_secs },
            },
            levels_dir,
            log: LogConfig { level, file: PathBuf::from(toml_cfg.log.file) },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        log::warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.tuning.tick_rate_ms, 33);
        assert_eq!(cfg.tuning.path.spacing, 20.0);
        assert_eq!(cfg.tuning.switch.debounce_secs, 0.5);
        assert!(cfg.tuning.guard.lose_radius > cfg.tuning.guard.detection_radius);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[guard]\ndetection_radius = 90.0\n[character]\nstart_resources = 2\n",
        ).unwrap();
        assert_eq!(cfg.tuning.guard.detection_radius, 90.0);
        assert_eq!(cfg.tuning.guard.patrol_speed, 53.0);
        assert_eq!(cfg.tuning.character.start_resources, 2);
        assert_eq!(cfg.tuning.character.radius, 25.0);
    }

    #[test]
    fn lose_radius_is_forced_above_detection() {
        let cfg = GameConfig::from_toml_str(
            "[guard]\ndetection_radius = 100.0\nlose_radius = 80.0\n",
        ).unwrap();
        assert_eq!(cfg.tuning.guard.lose_radius, 150.0);
    }

    #[test]
    fn log_level_parses_or_falls_back() {
        let cfg = GameConfig::from_toml_str("[log]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(cfg.log.level, log::LevelFilter::Debug);
        let cfg = GameConfig::from_toml_str("[log]\nlevel = \"loud\"\n").unwrap();
        assert_eq!(cfg.log.level, log::LevelFilter::Info);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(GameConfig::from_toml_str("[guard\n").is_err());
    }
}
