use std::collections::BTreeMap;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALPHA_PER_MS, DEFAULT_AMBIENT_ALPHA, DEFAULT_LIGHT_RADIUS_TILES, TILE_SIZE,
};

/// Tile coordinates. World-space positions use [`Vec2f`]; the two spaces are
/// never mixed without an explicit conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn center_world(self) -> Vec2f {
        Vec2f {
            x: (self.x as f32 + 0.5) * TILE_SIZE,
            y: (self.y as f32 + 0.5) * TILE_SIZE,
        }
    }
}

/// World coordinates in world units ([`TILE_SIZE`] units per tile).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn to_tile(self) -> Vec2 {
        Vec2 {
            x: (self.x / TILE_SIZE).floor() as i32,
            y: (self.y / TILE_SIZE).floor() as i32,
        }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON {
            return Self::ZERO;
        }
        Self {
            x: self.x / length,
            y: self.y / length,
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl Add for Vec2f {
    type Output = Vec2f;

    fn add(self, other: Vec2f) -> Vec2f {
        Vec2f {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Vec2f {
    type Output = Vec2f;

    fn sub(self, other: Vec2f) -> Vec2f {
        Vec2f {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

/// Inclusive tile-space rectangle, used for the camera window handed to the
/// visibility field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl TileRect {
    pub fn contains(&self, tile: Vec2) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }

    pub fn expanded(&self, tiles: i32) -> TileRect {
        TileRect {
            min: Vec2 {
                x: self.min.x - tiles,
                y: self.min.y - tiles,
            },
            max: Vec2 {
                x: self.max.x + tiles,
                y: self.max.y + tiles,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Enemy,
    Npc,
    StaticProp,
    Projectile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyVariant {
    Chasing,
    Patrolling,
    Dashing,
    Shooting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Collide,
    Action,
    InArea,
    NearArea,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Keyboard,
    Joystick,
    Gamepad,
}

impl InputSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keyboard" => Some(Self::Keyboard),
            "joystick" => Some(Self::Joystick),
            "gamepad" => Some(Self::Gamepad),
            _ => None,
        }
    }
}

/// Per-frame directional/action input as delivered by the host shell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub move_dir: Vec2f,
    pub action_held: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    #[serde(rename = "playerLightRadius")]
    pub player_light_radius: f32,
    #[serde(rename = "ambientAlpha")]
    pub ambient_alpha: f32,
    #[serde(rename = "alphaPerMs")]
    pub alpha_per_ms: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            player_light_radius: DEFAULT_LIGHT_RADIUS_TILES,
            ambient_alpha: DEFAULT_AMBIENT_ALPHA,
            alpha_per_ms: DEFAULT_ALPHA_PER_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileLayer {
    pub name: String,
    pub tiles: Vec<Vec<i32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorSpec {
    #[serde(rename = "fromPosition")]
    pub from_position: Vec2,
    #[serde(rename = "toPosition")]
    pub to_position: Vec2,
    #[serde(rename = "toLevelId")]
    pub to_level_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub event: TriggerEvent,
    #[serde(rename = "actionId")]
    pub action_id: String,
    #[serde(rename = "minIntervalMs")]
    pub min_interval_ms: u64,
}

/// Authoring-time behavior parameters; which fields are required depends on
/// the actor kind and enemy variant, validated when the level is built.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorMeta {
    pub variant: Option<EnemyVariant>,
    pub speed: Option<f32>,
    pub hp: Option<i32>,
    #[serde(rename = "chaseRadius")]
    pub chase_radius: Option<f32>,
    #[serde(rename = "updateCooldown")]
    pub update_cooldown: Option<f32>,
    #[serde(rename = "patrolFrom")]
    pub patrol_from: Option<Vec2>,
    #[serde(rename = "patrolTo")]
    pub patrol_to: Option<Vec2>,
    #[serde(rename = "dashRadius")]
    pub dash_radius: Option<f32>,
    #[serde(rename = "dashCooldownMs")]
    pub dash_cooldown_ms: Option<u64>,
    #[serde(rename = "dashDurationMs")]
    pub dash_duration_ms: Option<u64>,
    pub direction: Option<Vec2f>,
    #[serde(rename = "lifetimeMs")]
    pub lifetime_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorDescriptor {
    pub id: String,
    pub kind: ActorKind,
    pub position: Vec2,
    pub size: Vec2f,
    #[serde(rename = "graphicsRef")]
    pub graphics_ref: String,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub meta: ActorMeta,
    #[serde(rename = "belongsToGhostWorld", default)]
    pub belongs_to_ghost_world: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldData {
    pub collision: Vec<Vec<u8>>,
    #[serde(rename = "backgroundLayers", default)]
    pub background_layers: Vec<TileLayer>,
    #[serde(rename = "foregroundLayers", default)]
    pub foreground_layers: Vec<TileLayer>,
    #[serde(default)]
    pub doors: Vec<DoorSpec>,
    #[serde(default)]
    pub actors: Vec<ActorDescriptor>,
    #[serde(default)]
    pub light: Option<LightSettings>,
    #[serde(rename = "themeId", default)]
    pub theme_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DialogStep {
    #[serde(rename = "portraitRef")]
    pub portrait_ref: String,
    pub title: String,
    pub text: String,
    #[serde(rename = "panelSide")]
    pub panel_side: PanelSide,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameDialog {
    pub id: String,
    pub steps: Vec<DialogStep>,
    #[serde(rename = "onFinishTriggerId", default)]
    pub on_finish_trigger_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelData {
    pub id: String,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "realWorld")]
    pub real_world: WorldData,
    #[serde(rename = "ghostWorld", default)]
    pub ghost_world: Option<WorldData>,
    #[serde(rename = "startPosition")]
    pub start_position: Vec2,
    #[serde(default)]
    pub dialogs: Vec<GameDialog>,
}

/// Opaque progress snapshot; the host serializes it for save data, trigger
/// callbacks mutate it through the context.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameProgress {
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Normal,
    Attacking,
    Staggered,
    Defeated,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub state: PlayerState,
    pub health: i32,
    #[serde(rename = "maxHealth")]
    pub max_health: i32,
    #[serde(rename = "textureSet")]
    pub texture_set: String,
    pub animation: String,
    #[serde(rename = "attackUntil")]
    pub attack_until: u64,
    #[serde(rename = "attackReadyAt")]
    pub attack_ready_at: u64,
    #[serde(rename = "invulnUntil")]
    pub invuln_until: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActorView {
    pub id: String,
    pub kind: ActorKind,
    pub x: f32,
    pub y: f32,
    pub alive: bool,
    pub animation: String,
    #[serde(rename = "graphicsRef")]
    pub graphics_ref: String,
    #[serde(rename = "ghostWorld")]
    pub ghost_world: bool,
    pub emitting: bool,
    pub fading: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    WorldShifted {
        ghost: bool,
    },
    DoorEntered {
        #[serde(rename = "toLevelId")]
        to_level_id: String,
        #[serde(rename = "toPosition")]
        to_position: Vec2,
    },
    TriggerFired {
        #[serde(rename = "actionId")]
        action_id: String,
        #[serde(rename = "actorId")]
        actor_id: String,
    },
    EnemyDashed {
        #[serde(rename = "enemyId")]
        enemy_id: String,
    },
    EnemyDied {
        #[serde(rename = "enemyId")]
        enemy_id: String,
    },
    ActorRemoved {
        #[serde(rename = "actorId")]
        actor_id: String,
    },
    ProjectileBroke {
        #[serde(rename = "projectileId")]
        projectile_id: String,
    },
    PlayerDashed,
    PlayerDamaged {
        health: i32,
        by: String,
    },
    PlayerDefeated,
    DialogStarted {
        #[serde(rename = "dialogId")]
        dialog_id: String,
    },
    DialogStepShown {
        #[serde(rename = "dialogId")]
        dialog_id: String,
        #[serde(rename = "stepIndex")]
        step_index: usize,
    },
    DialogFinished {
        #[serde(rename = "dialogId")]
        dialog_id: String,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEntry {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    PlayerDefeated,
    DoorExit,
    TimeExpired,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    #[serde(rename = "ghostActive")]
    pub ghost_active: bool,
    #[serde(rename = "themeId")]
    pub theme_id: String,
    pub player: PlayerView,
    pub actors: Vec<ActorView>,
    #[serde(rename = "pendingDoor")]
    pub pending_door: Option<DoorSpec>,
    pub events: Vec<RuntimeEvent>,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: RunEndReason,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
    #[serde(rename = "playerHealth")]
    pub player_health: i32,
    #[serde(rename = "enemiesDefeated")]
    pub enemies_defeated: i32,
    pub timeline: Vec<TimelineEntry>,
}

#[cfg(test)]
mod tests {
    use super::{Vec2, Vec2f};
    use crate::constants::TILE_SIZE;

    #[test]
    fn tile_and_world_conversions_round_trip_through_centers() {
        let tile = Vec2 { x: 3, y: 7 };
        let center = tile.center_world();
        assert_eq!(center.to_tile(), tile);
        assert!((center.x - 3.5 * TILE_SIZE).abs() < f32::EPSILON);
    }

    #[test]
    fn normalized_or_zero_handles_zero_vector() {
        assert_eq!(Vec2f::ZERO.normalized_or_zero(), Vec2f::ZERO);
        let unit = Vec2f { x: 3.0, y: 4.0 }.normalized_or_zero();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }
}
