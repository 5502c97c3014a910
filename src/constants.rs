pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

/// World units per tile. Tile coordinates and world coordinates are distinct
/// types; every conversion goes through this factor.
pub const TILE_SIZE: f32 = 16.0;

pub const PLAYER_BASE_SPEED: f32 = 88.0;
pub const PLAYER_DASH_MULTIPLIER: f32 = 2.5;
pub const PLAYER_DASH_DURATION_MS: u64 = 300;
pub const PLAYER_DASH_COOLDOWN_MS: u64 = 1_000;
pub const PLAYER_MAX_HEALTH: i32 = 5;
pub const PLAYER_KNOCKBACK_SPEED: f32 = 180.0;
pub const PLAYER_HIT_CONTROL_LOCK_MS: u64 = 400;
pub const PLAYER_HIT_INVULN_MS: u64 = 1_500;

pub const ENEMY_DASH_MULTIPLIER: f32 = 3.0;
pub const ENEMY_DEATH_ANIM_MS: u64 = 700;
pub const ENEMY_FADE_OUT_MS: u64 = 400;
pub const PROJECTILE_BREAK_MS: u64 = 250;

/// Numerator of the path-recompute interval: an enemy replans at most once
/// every `update_cooldown / speed` milliseconds.
pub const DEFAULT_UPDATE_COOLDOWN: f32 = 30_000.0;
pub const DEFAULT_ENEMY_HP: i32 = 1;

pub const DEFAULT_LIGHT_RADIUS_TILES: f32 = 6.0;
pub const DEFAULT_AMBIENT_ALPHA: f32 = 0.85;
pub const DEFAULT_ALPHA_PER_MS: f32 = 0.004;
/// Smoothing rate floor so per-tile alpha never decays asymptotically
/// without reaching its target.
pub const ALPHA_RATE_FLOOR: f32 = 0.05;

pub const TIMELINE_CAP: usize = 24;

/// Action id the engine registers at level start; enemies and projectiles
/// fire it through the trigger registry on player contact.
pub const ENEMY_HIT_PLAYER_ACTION: &str = "enemy_hit_player";
