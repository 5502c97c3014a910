use crate::constants::{
    PLAYER_BASE_SPEED, PLAYER_DASH_COOLDOWN_MS, PLAYER_DASH_DURATION_MS, PLAYER_DASH_MULTIPLIER,
    PLAYER_HIT_CONTROL_LOCK_MS, PLAYER_HIT_INVULN_MS, PLAYER_KNOCKBACK_SPEED, PLAYER_MAX_HEALTH,
};
use crate::ports::{AudioPort, BodyHandle, PhysicsPort};
use crate::types::{InputSource, InputState, PlayerState, PlayerView, RuntimeEvent, Vec2f};

use super::utils::facing_animation;

/// The player-controlled actor. Input arrives from one source fixed at level
/// entry; hit recovery, the dash window and invulnerability are all
/// virtual-clock windows layered over a single state struct.
pub struct PlayerController {
    pub(super) view: PlayerView,
    pub(super) body: BodyHandle,
    pub(super) input_source: InputSource,
    pub(super) input: InputState,
    pub(super) input_suspended: bool,
    pub(super) control_locked_until: u64,
    pub(super) action_edge: bool,
    action_was_held: bool,
    knockback_velocity: Vec2f,
    facing: Vec2f,
}

impl PlayerController {
    pub(super) fn new(body: BodyHandle, position: Vec2f, input_source: InputSource) -> Self {
        Self {
            view: PlayerView {
                x: position.x,
                y: position.y,
                state: PlayerState::Normal,
                health: PLAYER_MAX_HEALTH,
                max_health: PLAYER_MAX_HEALTH,
                texture_set: "player_real".to_string(),
                animation: "idle".to_string(),
                attack_until: 0,
                attack_ready_at: 0,
                invuln_until: 0,
            },
            body,
            input_source,
            input: InputState::default(),
            input_suspended: false,
            control_locked_until: 0,
            action_edge: false,
            action_was_held: false,
            knockback_velocity: Vec2f::ZERO,
            facing: Vec2f { x: 0.0, y: 1.0 },
        }
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn input_source(&self) -> InputSource {
        self.input_source
    }

    pub fn is_input_suspended(&self) -> bool {
        self.input_suspended
    }

    pub fn position(&self) -> Vec2f {
        Vec2f {
            x: self.view.x,
            y: self.view.y,
        }
    }

    pub(super) fn update(
        &mut self,
        now_ms: u64,
        ghost_active: bool,
        physics: &mut dyn PhysicsPort,
        audio: &mut dyn AudioPort,
        events: &mut Vec<RuntimeEvent>,
    ) {
        let position = physics.position(self.body);
        self.view.x = position.x;
        self.view.y = position.y;

        let action_edge = self.input.action_held && !self.action_was_held;
        self.action_was_held = self.input.action_held;
        self.action_edge = action_edge;

        if self.view.health <= 0 {
            self.view.state = PlayerState::Defeated;
            physics.set_velocity(self.body, Vec2f::ZERO);
            return;
        }

        // Dash window: movement input is ignored, velocity stays locked to
        // the pre-dash facing at elevated speed.
        if now_ms < self.view.attack_until {
            self.view.state = PlayerState::Attacking;
            physics.set_velocity(
                self.body,
                self.facing.scaled(PLAYER_BASE_SPEED * PLAYER_DASH_MULTIPLIER),
            );
            return;
        }

        // Hit recovery: control returns only after the knockback window,
        // while invulnerability keeps running past it.
        if now_ms < self.control_locked_until {
            self.view.state = PlayerState::Staggered;
            physics.set_velocity(self.body, self.knockback_velocity);
            return;
        }
        self.view.state = PlayerState::Normal;

        let direction = if self.input_suspended {
            Vec2f::ZERO
        } else {
            self.input.move_dir.normalized_or_zero()
        };
        if direction.length() > 0.0 {
            self.facing = direction;
        }

        let dash_allowed =
            ghost_active && !self.input_suspended && now_ms >= self.view.attack_ready_at;
        if action_edge && dash_allowed {
            self.view.attack_until = now_ms + PLAYER_DASH_DURATION_MS;
            self.view.attack_ready_at = now_ms + PLAYER_DASH_COOLDOWN_MS;
            self.view.state = PlayerState::Attacking;
            self.set_animation("dash", physics);
            audio.play_effect("player_dash");
            events.push(RuntimeEvent::PlayerDashed);
            physics.set_velocity(
                self.body,
                self.facing.scaled(PLAYER_BASE_SPEED * PLAYER_DASH_MULTIPLIER),
            );
            return;
        }

        let velocity = direction.scaled(PLAYER_BASE_SPEED);
        physics.set_velocity(self.body, velocity);
        self.set_animation(facing_animation(velocity), physics);
    }

    /// Reaction to `enemy_hit_player`: knockback away from the enemy, a
    /// control lock, a longer invulnerability window and one health point
    /// lost. Repeat hits inside the invulnerability window are ignored.
    pub fn apply_hit(
        &mut self,
        now_ms: u64,
        enemy_position: Vec2f,
        by: &str,
        physics: &mut dyn PhysicsPort,
        audio: &mut dyn AudioPort,
        events: &mut Vec<RuntimeEvent>,
    ) {
        if now_ms < self.view.invuln_until || self.view.health <= 0 {
            return;
        }
        let position = physics.position(self.body);
        let mut away = (position - enemy_position).normalized_or_zero();
        if away == Vec2f::ZERO {
            away = Vec2f { x: 0.0, y: 1.0 };
        }
        self.knockback_velocity = away.scaled(PLAYER_KNOCKBACK_SPEED);
        self.control_locked_until = now_ms + PLAYER_HIT_CONTROL_LOCK_MS;
        self.view.invuln_until = now_ms + PLAYER_HIT_INVULN_MS;
        self.view.attack_until = 0;
        self.view.health -= 1;
        self.view.state = PlayerState::Staggered;
        self.set_animation("hurt", physics);
        physics.set_velocity(self.body, self.knockback_velocity);
        audio.play_effect("player_hit");
        events.push(RuntimeEvent::PlayerDamaged {
            health: self.view.health,
            by: by.to_string(),
        });
        if self.view.health <= 0 {
            events.push(RuntimeEvent::PlayerDefeated);
        }
    }

    /// Swapped together with the world flag so no frame ever shows a real
    /// texture set over a ghost grid or vice versa.
    pub(super) fn set_ghost_textures(&mut self, ghost: bool, physics: &mut dyn PhysicsPort) {
        self.view.texture_set = if ghost { "player_ghost" } else { "player_real" }.to_string();
        let animation = self.view.animation.clone();
        physics.play_animation(self.body, &animation);
    }

    pub(super) fn is_attacking(&self, now_ms: u64) -> bool {
        now_ms < self.view.attack_until
    }

    fn set_animation(&mut self, key: &str, physics: &mut dyn PhysicsPort) {
        if self.view.animation != key {
            self.view.animation = key.to_string();
            physics.play_animation(self.body, key);
        }
    }
}
