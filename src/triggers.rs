use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::engine::player::PlayerController;
use crate::error::SimError;
use crate::ports::{AudioPort, PhysicsPort};
use crate::types::{GameProgress, RuntimeEvent, Vec2, Vec2f};
use crate::world::WorldMap;

/// The actor whose trigger evaluation caused the fire.
#[derive(Clone, Debug)]
pub struct TriggerSource {
    pub actor_id: String,
    pub position: Vec2f,
}

/// Operations a callback cannot apply while the simulation is mid-frame;
/// the orchestrator drains the queue after the callback returns.
#[derive(Clone, Debug)]
pub enum SimCommand {
    ShiftWorld {
        ghost: bool,
    },
    StartDialog {
        dialog_id: String,
    },
    RequestLevel {
        level_id: String,
        position: Vec2,
    },
    SpawnProjectile {
        from: Vec2f,
        direction: Vec2f,
        speed: f32,
        lifetime_ms: u64,
    },
}

/// Read/mutate handles passed to a trigger callback: the live world, the
/// player, the injected progress/audio services, the frame's event sink and
/// the deferred command queue. Callbacks never reach for globals.
pub struct TriggerContext<'a> {
    pub now_ms: u64,
    pub source: TriggerSource,
    pub world: &'a mut WorldMap,
    pub player: &'a mut PlayerController,
    pub progress: &'a mut GameProgress,
    pub physics: &'a mut dyn PhysicsPort,
    pub audio: &'a mut dyn AudioPort,
    pub events: &'a mut Vec<RuntimeEvent>,
    pub commands: &'a mut Vec<SimCommand>,
}

pub type TriggerCallback = Box<dyn FnMut(&mut TriggerContext<'_>)>;

/// Named-callback bus decoupling spatial detection from gameplay reactions.
/// Dispatch is synchronous and single: the firing actor's update resumes
/// only after the callback returns, nothing is queued.
#[derive(Default)]
pub struct TriggerRegistry {
    callbacks: HashMap<String, TriggerCallback>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `action_id`; an existing registration is
    /// replaced after a warning.
    pub fn register(&mut self, action_id: &str, callback: TriggerCallback) {
        if self
            .callbacks
            .insert(action_id.to_string(), callback)
            .is_some()
        {
            warn!(action_id, "replacing existing trigger callback");
        }
    }

    pub fn fire(
        &mut self,
        action_id: &str,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), SimError> {
        let Some(callback) = self.callbacks.get_mut(action_id) else {
            return Err(SimError::UnregisteredTrigger(action_id.to_string()));
        };
        callback(ctx);
        Ok(())
    }

    pub fn is_registered(&self, action_id: &str) -> bool {
        self.callbacks.contains_key(action_id)
    }

    /// Level teardown: drops every registration.
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("TriggerRegistry").field("ids", &ids).finish()
    }
}
