use tracing::debug;

use crate::constants::{
    ENEMY_DASH_MULTIPLIER, ENEMY_DEATH_ANIM_MS, ENEMY_FADE_OUT_MS, ENEMY_HIT_PLAYER_ACTION,
    PROJECTILE_BREAK_MS, TILE_SIZE,
};
use crate::path::find_path;
use crate::triggers::TriggerSource;
use crate::types::{EnemyVariant, RuntimeEvent, Vec2f};

use super::utils::{facing_animation, path_recompute_interval_ms};
use super::{Behavior, LevelSimulation, ScheduledEvent, ScheduledKind};

impl LevelSimulation {
    pub(super) fn update_enemy(&mut self, idx: usize, now_ms: u64) {
        if !self.actors[idx].view.alive {
            // a dead enemy never re-enters the state machine; it only shuts
            // off any visual emitter still running
            self.actors[idx].view.emitting = false;
            return;
        }
        let variant = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.variant,
            _ => return,
        };
        match variant {
            EnemyVariant::Chasing => self.update_chasing(idx, now_ms),
            EnemyVariant::Patrolling => self.update_patrolling(idx, now_ms),
            EnemyVariant::Dashing => self.update_dashing(idx, now_ms),
            EnemyVariant::Shooting => {
                // reserved variant, nothing implemented yet
            }
        }
    }

    fn update_chasing(&mut self, idx: usize, now_ms: u64) {
        let body = self.actors[idx].body;
        let position = self.physics.position(body);
        let player_position = self.physics.position(self.player.body);
        let params = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.params,
            _ => return,
        };

        if (player_position - position).length() >= params.chase_radius {
            self.physics.set_velocity(body, Vec2f::ZERO);
            self.set_actor_animation(idx, "idle");
            return;
        }

        let velocity = self.pursuit_velocity(
            idx,
            position,
            player_position,
            params.speed,
            params.update_cooldown,
            now_ms,
            true,
        );
        self.physics.set_velocity(body, velocity);
        self.set_actor_animation(idx, facing_animation(velocity));
        self.fire_on_player_contact(idx, position);
    }

    fn update_patrolling(&mut self, idx: usize, now_ms: u64) {
        let body = self.actors[idx].body;
        let position = self.physics.position(body);
        let params = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.params,
            _ => return,
        };

        let target = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.patrol_target,
            _ => return,
        };
        if (target.center_world() - position).length() <= TILE_SIZE * 0.5 {
            if let Behavior::Enemy(state) = &mut self.actors[idx].behavior {
                std::mem::swap(&mut state.patrol_target, &mut state.patrol_opposite);
                state.path.clear();
                state.next_path_at = now_ms;
            }
        }

        let target = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.patrol_target,
            _ => return,
        };
        let velocity = self.pursuit_velocity(
            idx,
            position,
            target.center_world(),
            params.speed,
            params.update_cooldown,
            now_ms,
            false,
        );
        self.physics.set_velocity(body, velocity);
        self.set_actor_animation(idx, facing_animation(velocity));
    }

    fn update_dashing(&mut self, idx: usize, now_ms: u64) {
        let body = self.actors[idx].body;
        let position = self.physics.position(body);
        let player_position = self.physics.position(self.player.body);
        let (params, dash_until, next_dash_at) = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => (state.params, state.dash_until, state.next_dash_at),
            _ => return,
        };

        // inside the dash window normal chase movement stays suppressed
        if now_ms < dash_until {
            let velocity = match &self.actors[idx].behavior {
                Behavior::Enemy(state) => state.dash_velocity,
                _ => Vec2f::ZERO,
            };
            self.physics.set_velocity(body, velocity);
            self.fire_on_player_contact(idx, position);
            return;
        }
        if self.actors[idx].view.emitting {
            self.actors[idx].view.emitting = false;
        }

        let distance = (player_position - position).length();
        if distance < params.dash_radius && now_ms >= next_dash_at {
            let direction = (position - player_position).normalized_or_zero();
            let velocity = direction.scaled(params.speed * ENEMY_DASH_MULTIPLIER);
            // small jitter so a pack of dashers never re-arms in lockstep
            let rearm_jitter = self.rng.int(0, 120) as u64;
            if let Behavior::Enemy(state) = &mut self.actors[idx].behavior {
                state.dash_velocity = velocity;
                state.dash_until = now_ms + params.dash_duration_ms;
                state.next_dash_at = now_ms + params.dash_cooldown_ms + rearm_jitter;
            }
            self.actors[idx].view.emitting = true;
            self.set_actor_animation(idx, "dash");
            self.audio.play_effect("enemy_dash");
            let enemy_id = self.actors[idx].view.id.clone();
            self.events.push(RuntimeEvent::EnemyDashed { enemy_id });
            self.physics.set_velocity(body, velocity);
            return;
        }

        if distance >= params.chase_radius {
            self.physics.set_velocity(body, Vec2f::ZERO);
            self.set_actor_animation(idx, "idle");
            return;
        }
        let velocity = self.pursuit_velocity(
            idx,
            position,
            player_position,
            params.speed,
            params.update_cooldown,
            now_ms,
            true,
        );
        self.physics.set_velocity(body, velocity);
        self.set_actor_animation(idx, facing_animation(velocity));
        self.fire_on_player_contact(idx, position);
    }

    /// Rate-limited A* pursuit on the active grid. With `direct_fallback`, a
    /// very short path next to the target (which A* may legitimately leave
    /// empty or degenerate) falls back to the straight normalized vector.
    fn pursuit_velocity(
        &mut self,
        idx: usize,
        position: Vec2f,
        target: Vec2f,
        speed: f32,
        update_cooldown: f32,
        now_ms: u64,
        direct_fallback: bool,
    ) -> Vec2f {
        let due = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => state.next_path_at <= now_ms,
            _ => false,
        };
        if due {
            let interval = path_recompute_interval_ms(update_cooldown, speed);
            let result = find_path(
                self.world.active_grid(),
                position.to_tile(),
                target.to_tile(),
            );
            let actor_id = self.actors[idx].view.id.clone();
            let mut failed = false;
            if let Behavior::Enemy(state) = &mut self.actors[idx].behavior {
                state.next_path_at = now_ms + interval;
                match result {
                    Ok(path) => state.path = path,
                    Err(error) => {
                        debug!(actor_id = %actor_id, %error, "enemy holds position this frame");
                        state.path.clear();
                        failed = true;
                    }
                }
            }
            if failed {
                return Vec2f::ZERO;
            }
        }

        // consume traversed waypoints so the second waypoint stays ahead of
        // the actor between replans
        if let Behavior::Enemy(state) = &mut self.actors[idx].behavior {
            while state.path.len() >= 2 {
                let next = state.path[1].center_world();
                if (next - position).length() > TILE_SIZE * 0.5 {
                    break;
                }
                state.path.remove(0);
            }
        }

        let (steps, waypoint) = match &self.actors[idx].behavior {
            Behavior::Enemy(state) => (state.path.len(), state.path.get(1).copied()),
            _ => (0, None),
        };
        if direct_fallback && steps <= 3 {
            let contact = self.physics.overlaps(self.actors[idx].body, self.player.body);
            if !contact {
                return (target - position).normalized_or_zero().scaled(speed);
            }
        }
        match waypoint {
            Some(tile) => (tile.center_world() - position)
                .normalized_or_zero()
                .scaled(speed),
            None => Vec2f::ZERO,
        }
    }

    fn fire_on_player_contact(&mut self, idx: usize, position: Vec2f) {
        if self.physics.overlaps(self.actors[idx].body, self.player.body) {
            let actor_id = self.actors[idx].view.id.clone();
            self.pending_fires.push((
                ENEMY_HIT_PLAYER_ACTION.to_string(),
                TriggerSource { actor_id, position },
            ));
        }
    }

    /// Idempotent via the alive flag: hitting a dead enemy has no effect at
    /// all, no duplicate death animation and no duplicate schedule entries.
    pub(super) fn enemy_on_hit(&mut self, idx: usize, now_ms: u64) {
        if !self.actors[idx].view.alive {
            return;
        }
        let hp_left = match &mut self.actors[idx].behavior {
            Behavior::Enemy(state) => {
                state.hp -= 1;
                state.hp
            }
            _ => return,
        };
        if hp_left > 0 {
            self.set_actor_animation(idx, "hurt");
            self.audio.play_effect("enemy_hurt");
            return;
        }

        let body = self.actors[idx].body;
        self.actors[idx].view.alive = false;
        self.actors[idx].view.emitting = false;
        self.physics.set_velocity(body, Vec2f::ZERO);
        self.physics.set_collision_enabled(body, false);
        self.set_actor_animation(idx, "die");
        self.audio.play_effect("enemy_die");
        let enemy_id = self.actors[idx].view.id.clone();
        self.events.push(RuntimeEvent::EnemyDied {
            enemy_id: enemy_id.clone(),
        });
        self.timeline_push(now_ms, format!("{enemy_id} destroyed"));
        self.enemies_defeated += 1;
        // death animation, then fade, then removal; both continuations die
        // with the actor if it is destroyed early
        self.schedule.push(ScheduledEvent {
            at_ms: now_ms + ENEMY_DEATH_ANIM_MS,
            actor_id: enemy_id.clone(),
            kind: ScheduledKind::EnemyFade,
        });
        self.schedule.push(ScheduledEvent {
            at_ms: now_ms + ENEMY_DEATH_ANIM_MS + ENEMY_FADE_OUT_MS,
            actor_id: enemy_id,
            kind: ScheduledKind::ActorRemove,
        });
    }

    pub(super) fn update_projectile(&mut self, idx: usize, now_ms: u64) {
        if !self.actors[idx].view.alive {
            return;
        }
        let body = self.actors[idx].body;
        let position = self.physics.position(body);
        let velocity = match &self.actors[idx].behavior {
            Behavior::Projectile(state) => state.velocity,
            _ => return,
        };
        self.physics.set_velocity(body, velocity);

        if !self.world.passable(position.to_tile()) {
            self.break_projectile(idx, now_ms);
            return;
        }
        if self.physics.overlaps(body, self.player.body) {
            let actor_id = self.actors[idx].view.id.clone();
            self.pending_fires.push((
                ENEMY_HIT_PLAYER_ACTION.to_string(),
                TriggerSource { actor_id, position },
            ));
            self.break_projectile(idx, now_ms);
        }
    }

    pub(super) fn break_projectile(&mut self, idx: usize, now_ms: u64) {
        if !self.actors[idx].view.alive {
            return;
        }
        let body = self.actors[idx].body;
        self.actors[idx].view.alive = false;
        self.physics.set_velocity(body, Vec2f::ZERO);
        self.physics.set_collision_enabled(body, false);
        self.set_actor_animation(idx, "break");
        let projectile_id = self.actors[idx].view.id.clone();
        self.events.push(RuntimeEvent::ProjectileBroke {
            projectile_id: projectile_id.clone(),
        });
        self.cancel_scheduled(&projectile_id);
        self.schedule.push(ScheduledEvent {
            at_ms: now_ms + PROJECTILE_BREAK_MS,
            actor_id: projectile_id,
            kind: ScheduledKind::ActorRemove,
        });
    }
}
