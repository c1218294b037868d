/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels_dir/*.toml`, sorted by file name
///   2. Built-in embedded levels
///
/// ## Level format (TOML):
///   ```toml
///   name = "Courtyard"
///   artifact_goal = 1
///   start = [120.0, 300.0]
///   resources = 1
///   size = [800.0, 600.0]          # optional
///
///   [past]
///   obstacles = [{ vertices = [[300.0, 0.0], [340.0, 0.0], [340.0, 420.0], [300.0, 420.0]] }]
///   guards = [{ route = [[100.0, 500.0], [190.0, 500.0], [190.0, 400.0]] }]
///   items = [{ kind = "artifact", at = [700.0, 80.0] }]
///
///   [present]
///   # same keys; every world table is required, its lists are not
///   ```
///
/// A guard whose route has one point holds that post; an empty route needs
/// an explicit `at = [x, y]`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::config::{GameConfig, Tuning};
use crate::domain::ai::GuardAgent;
use crate::domain::entity::{Character, Item, ItemKind};
use crate::domain::geometry::{Polygon, Vec2};
use crate::domain::obstacle::{Atlas, ObstacleSet, WorldId};
use crate::domain::route::PatrolRoute;
use crate::sim::fleet::GuardFleet;
use crate::sim::switcher::{WorldContext, WorldSwitcher};
use crate::sim::world::{Phase, WorldState};

const DEFAULT_SIZE: [f32; 2] = [800.0, 600.0];

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{origin}: {source}")]
    Parse { origin: String, source: toml::de::Error },
    #[error("level '{level}' has no [{world}] table")]
    MissingWorld { level: String, world: &'static str },
    #[error("level '{level}': obstacle {index} in [{world}] has fewer than 3 vertices")]
    DegenerateObstacle { level: String, world: &'static str, index: usize },
    #[error("level '{level}': guard {index} in [{world}] has neither a route nor a post")]
    GuardWithoutPost { level: String, world: &'static str, index: usize },
    #[error("no playable levels")]
    NoLevels,
}

/// A validated level, kept around so restarts can rebuild from it.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub artifact_goal: u32,
    pub start: Vec2,
    pub resources: u32,
    pub size: Vec2,
    pub past: WorldDef,
    pub present: WorldDef,
}

#[derive(Clone, Debug, Default)]
pub struct WorldDef {
    pub obstacles: Vec<Polygon>,
    pub guards: Vec<GuardDef>,
    pub items: Vec<(ItemKind, Vec2)>,
}

#[derive(Clone, Debug)]
pub struct GuardDef {
    pub post: Vec2,
    pub route: Vec<Vec2>,
}

/// Everything a level load (or restart) installs into the world.
pub struct Stage {
    pub switcher: WorldSwitcher,
    pub atlas: Atlas,
    pub items: Vec<Item>,
}

// ── TOML Schema ──

#[derive(Deserialize)]
struct TomlLevel {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_goal")]
    artifact_goal: u32,
    start: Vec2,
    #[serde(default)]
    resources: u32,
    #[serde(default = "default_size")]
    size: Vec2,
    past: Option<TomlWorld>,
    present: Option<TomlWorld>,
}

#[derive(Deserialize, Default)]
struct TomlWorld {
    #[serde(default)]
    obstacles: Vec<TomlObstacle>,
    #[serde(default)]
    guards: Vec<TomlGuard>,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Deserialize)]
struct TomlObstacle {
    vertices: Vec<Vec2>,
}

#[derive(Deserialize)]
struct TomlGuard {
    #[serde(default)]
    route: Vec<Vec2>,
    at: Option<Vec2>,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum TomlItemKind {
    Resource,
    Artifact,
}

#[derive(Deserialize)]
struct TomlItem {
    kind: TomlItemKind,
    at: Vec2,
}

fn default_name() -> String { "Untitled".into() }
fn default_goal() -> u32 { 1 }
fn default_size() -> Vec2 { Vec2::from(DEFAULT_SIZE) }

impl From<TomlItemKind> for ItemKind {
    fn from(k: TomlItemKind) -> Self {
        match k {
            TomlItemKind::Resource => ItemKind::Resource,
            TomlItemKind::Artifact => ItemKind::Artifact,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse and validate one level document. `origin` names it in errors.
pub fn parse_level(text: &str, origin: &str) -> Result<LevelDef, LevelError> {
    let raw: TomlLevel = toml::from_str(text).map_err(|source| LevelError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    let name = raw.name;
    let past = raw.past.ok_or_else(|| LevelError::MissingWorld { level: name.clone(), world: "past" })?;
    let present = raw.present.ok_or_else(|| LevelError::MissingWorld { level: name.clone(), world: "present" })?;

    Ok(LevelDef {
        past: world_def(past, &name, WorldId::Past)?,
        present: world_def(present, &name, WorldId::Present)?,
        name,
        artifact_goal: raw.artifact_goal,
        start: raw.start,
        resources: raw.resources,
        size: raw.size,
    })
}

/// All levels to play: the levels directory if it has any valid file,
/// otherwise the embedded set. Broken files are skipped with a warning.
pub fn load_levels(config: &GameConfig) -> Result<Vec<LevelDef>, LevelError> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir)?;
        if !levels.is_empty() {
            log::info!("loaded {} level(s) from {}", levels.len(), dir.display());
            return Ok(levels);
        }
        log::warn!("{} has no usable levels, using built-in set", dir.display());
    }
    embedded_levels()
}

/// Install level `level_idx` (wrapping past the last one) into the world.
pub fn load_level(world: &mut WorldState, level_idx: usize) {
    if world.levels.is_empty() {
        return;
    }
    let idx = level_idx % world.levels.len();
    world.current_level = idx;
    let stage = world.levels[idx].instantiate(&world.tuning);
    world.install(stage);
    world.phase = Phase::Playing;
    log::info!("level {} '{}' loaded", idx + 1, world.levels[idx].name);
}

impl LevelDef {
    pub fn instantiate(&self, tuning: &Tuning) -> Stage {
        let character = Character::new(
            self.start,
            tuning.character.radius,
            self.resources + tuning.character.start_resources,
        );
        let mut next_id = 0;
        let past = WorldContext::new(WorldId::Past, self.past.fleet(WorldId::Past, &mut next_id));
        let present = WorldContext::new(WorldId::Present, self.present.fleet(WorldId::Present, &mut next_id));

        let mut atlas = Atlas::new(
            ObstacleSet::new(self.past.obstacles.clone()),
            ObstacleSet::new(self.present.obstacles.clone()),
        );
        let switcher = WorldSwitcher::new(past, present, character, tuning.switch.debounce_secs, &mut atlas);

        let items = self.past.items(WorldId::Past)
            .chain(self.present.items(WorldId::Present))
            .collect();

        Stage { switcher, atlas, items }
    }
}

impl WorldDef {
    /// Guard ids are unique across both worlds.
    fn fleet(&self, world: WorldId, next_id: &mut usize) -> GuardFleet {
        let guards = self.guards.iter().map(|g| {
            let id = *next_id;
            *next_id += 1;
            GuardAgent::new(id, g.post, PatrolRoute::new(g.route.clone(), g.post))
        }).collect();
        GuardFleet::new(world, guards)
    }

    fn items(&self, world: WorldId) -> impl Iterator<Item = Item> + '_ {
        self.items.iter().map(move |&(kind, position)| Item { kind, position, world })
    }
}

// ══════════════════════════════════════════════════════════════
// Internal
// ══════════════════════════════════════════════════════════════

fn world_def(raw: TomlWorld, level: &str, world: WorldId) -> Result<WorldDef, LevelError> {
    let label = table_name(world);

    let obstacles = raw.obstacles.into_iter().enumerate()
        .map(|(index, o)| {
            Polygon::new(o.vertices).ok_or_else(|| LevelError::DegenerateObstacle {
                level: level.to_string(), world: label, index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let guards = raw.guards.into_iter().enumerate()
        .map(|(index, g)| {
            let post = g.at.or_else(|| g.route.first().copied()).ok_or_else(|| {
                LevelError::GuardWithoutPost { level: level.to_string(), world: label, index }
            })?;
            Ok(GuardDef { post, route: g.route })
        })
        .collect::<Result<Vec<_>, LevelError>>()?;

    let items = raw.items.into_iter().map(|i| (i.kind.into(), i.at)).collect();

    Ok(WorldDef { obstacles, guards, items })
}

fn table_name(world: WorldId) -> &'static str {
    match world {
        WorldId::Past => "past",
        WorldId::Present => "present",
    }
}

fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LevelError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "toml"))
        .collect();
    paths.sort();

    let mut levels = vec![];
    for path in paths {
        match read_level_file(&path) {
            Ok(def) => levels.push(def),
            Err(e) => log::warn!("skipping level: {e}"),
        }
    }
    Ok(levels)
}

fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level(&text, &path.display().to_string())
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[(&str, &str)] = &[
    ("01_courtyard.toml", include_str!("../../levels/01_courtyard.toml")),
    ("02_archive.toml", include_str!("../../levels/02_archive.toml")),
];

fn embedded_levels() -> Result<Vec<LevelDef>, LevelError> {
    let levels = EMBEDDED.iter()
        .map(|(origin, text)| parse_level(text, origin))
        .collect::<Result<Vec<_>, _>>()?;
    if levels.is_empty() {
        return Err(LevelError::NoLevels);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::obstacle::CollisionOracle;

    const SMALL: &str = r#"
        name = "Test"
        artifact_goal = 2
        start = [50.0, 50.0]
        resources = 1

        [past]
        obstacles = [{ vertices = [[100.0, 0.0], [120.0, 0.0], [120.0, 100.0], [100.0, 100.0]] }]
        guards = [{ route = [[100.0, 500.0], [190.0, 500.0], [190.0, 400.0]] }]
        items = [{ kind = "artifact", at = [10.0, 10.0] }]

        [present]
        guards = [{ route = [[300.0, 300.0]] }, { at = [5.0, 5.0] }]
        items = [{ kind = "resource", at = [20.0, 20.0] }, { kind = "artifact", at = [30.0, 30.0] }]
    "#;

    #[test]
    fn parses_both_worlds() {
        let def = parse_level(SMALL, "small").unwrap();
        assert_eq!(def.name, "Test");
        assert_eq!(def.artifact_goal, 2);
        assert_eq!(def.start, Vec2::new(50.0, 50.0));
        assert_eq!(def.size, Vec2::new(800.0, 600.0));
        assert_eq!(def.past.obstacles.len(), 1);
        assert_eq!(def.past.guards[0].route.len(), 3);
        assert_eq!(def.present.guards[0].post, Vec2::new(300.0, 300.0));
        assert_eq!(def.present.guards[1].post, Vec2::new(5.0, 5.0));
        assert!(def.present.guards[1].route.is_empty());
        assert_eq!(def.present.items.len(), 2);
    }

    #[test]
    fn missing_world_is_fatal() {
        let text = r#"
            start = [0.0, 0.0]
            [past]
        "#;
        match parse_level(text, "t") {
            Err(LevelError::MissingWorld { world, .. }) => assert_eq!(world, "present"),
            other => panic!("expected MissingWorld, got {:?}", other.map(|d| d.name)),
        }
    }

    #[test]
    fn degenerate_obstacle_is_rejected() {
        let text = r#"
            start = [0.0, 0.0]
            [past]
            [present]
            obstacles = [{ vertices = [[0.0, 0.0], [1.0, 1.0]] }]
        "#;
        assert!(matches!(
            parse_level(text, "t"),
            Err(LevelError::DegenerateObstacle { world: "present", index: 0, .. })
        ));
    }

    #[test]
    fn guard_needs_a_post() {
        let text = r#"
            start = [0.0, 0.0]
            [past]
            guards = [{ route = [] }]
            [present]
        "#;
        assert!(matches!(parse_level(text, "t"), Err(LevelError::GuardWithoutPost { .. })));
    }

    #[test]
    fn malformed_toml_reports_origin() {
        let err = parse_level("start = [", "broken.toml").unwrap_err();
        assert!(err.to_string().starts_with("broken.toml"));
    }

    #[test]
    fn instantiate_builds_stage() {
        let def = parse_level(SMALL, "small").unwrap();
        let tuning = Tuning::default();
        let stage = def.instantiate(&tuning);

        assert_eq!(stage.switcher.active(), WorldId::Past);
        assert_eq!(stage.switcher.character().position, Vec2::new(50.0, 50.0));
        assert_eq!(stage.switcher.character().resources, 1 + tuning.character.start_resources);
        assert!(stage.atlas.past.visible && !stage.atlas.present.visible);
        assert!(stage.atlas.is_obstructed(Vec2::new(110.0, 50.0), WorldId::Past));
        assert!(!stage.atlas.is_obstructed(Vec2::new(110.0, 50.0), WorldId::Present));
        assert_eq!(stage.items.len(), 3);

        let past_ids: Vec<usize> = stage.switcher.context(WorldId::Past).fleet.guards().iter().map(|g| g.id).collect();
        let present_ids: Vec<usize> = stage.switcher.context(WorldId::Present).fleet.guards().iter().map(|g| g.id).collect();
        assert_eq!(past_ids, vec![0]);
        assert_eq!(present_ids, vec![1, 2]);
        assert!(stage.switcher.context(WorldId::Present).fleet.guards()[0].route().is_static());
    }

    #[test]
    fn embedded_levels_are_valid() {
        let levels = embedded_levels().unwrap();
        assert!(levels.len() >= 2);
        for def in &levels {
            assert!(def.artifact_goal > 0);
            let artifacts = def.past.items.iter().chain(&def.present.items)
                .filter(|(k, _)| *k == ItemKind::Artifact)
                .count() as u32;
            assert!(artifacts >= def.artifact_goal, "{} cannot be completed", def.name);
        }
    }

    #[test]
    fn directory_levels_sorted_and_broken_skipped() {
        let dir = std::env::temp_dir().join(format!("preservation_levels_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.toml"), SMALL.replace("\"Test\"", "\"Second\"")).unwrap();
        std::fs::write(dir.join("a.toml"), SMALL.replace("\"Test\"", "\"First\"")).unwrap();
        std::fs::write(dir.join("c.toml"), "not = [valid").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let levels = load_from_directory(&dir).unwrap();
        let names: Vec<&str> = levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
