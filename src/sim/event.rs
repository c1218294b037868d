/// Events emitted during a simulation step.
/// The presentation layer turns these into messages; `main` saves on completion.

use crate::domain::entity::ItemKind;
use crate::domain::obstacle::WorldId;

use super::switcher::BlockReason;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    WorldSwitched { from: WorldId, to: WorldId },
    SwitchBlocked(BlockReason),
    PathObstructed,
    ItemCollected { kind: ItemKind, world: WorldId },
    CharacterCaught { guard: usize, world: WorldId },
    LevelComplete,
}
