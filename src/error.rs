use thiserror::Error;

use crate::types::Vec2;

#[derive(Debug, Error)]
pub enum SimError {
    /// Bad level data detected at construction time; the level must not start.
    #[error("level configuration error: {0}")]
    Configuration(String),

    /// A trigger was fired against the registry with no matching callback.
    #[error("no trigger callback registered for action `{0}`")]
    UnregisteredTrigger(String),

    /// A dialog was started that was never registered.
    #[error("unknown dialog id `{0}`")]
    UnknownDialog(String),

    /// No route between two tiles; recoverable, the actor holds position.
    #[error("no path from ({},{}) to ({},{})", from.x, from.y, to.x, to.y)]
    Pathfinding { from: Vec2, to: Vec2 },

    /// A native handle was released twice; expected during fast level
    /// transitions, caught and logged rather than propagated.
    #[error("native handle for `{0}` was already released")]
    ResourceTeardown(String),
}
