use std::collections::HashSet;

use tracing::warn;

use crate::constants::{
    DEFAULT_ENEMY_HP, DEFAULT_UPDATE_COOLDOWN, ENEMY_HIT_PLAYER_ACTION, TILE_SIZE, TIMELINE_CAP,
};
use crate::dialog::{AdvanceListener, AdvanceOutcome, DialogOrchestrator, StartOutcome, StepCallback};
use crate::error::SimError;
use crate::ports::{AudioPort, BodyHandle, PhysicsPort};
use crate::rng::Rng;
use crate::triggers::{SimCommand, TriggerCallback, TriggerContext, TriggerRegistry, TriggerSource};
use crate::types::{
    ActorDescriptor, ActorKind, ActorView, DoorSpec, EnemyVariant, GameDialog, GameProgress,
    GameSummary, InputState, InputSource, LevelData, RunEndReason, RuntimeEvent, Snapshot,
    TileRect, TimelineEntry, TriggerEvent, TriggerSpec, Vec2, Vec2f,
};
use crate::visibility::VisibilityField;
use crate::world::WorldMap;

mod enemies;
pub mod player;
mod utils;

use self::player::PlayerController;
use self::utils::footprint;

#[derive(Clone, Debug)]
struct TriggerRuntime {
    spec: TriggerSpec,
    last_fired_at: Option<u64>,
}

#[derive(Clone, Copy, Debug)]
struct EnemyParams {
    speed: f32,
    chase_radius: f32,
    update_cooldown: f32,
    dash_radius: f32,
    dash_cooldown_ms: u64,
    dash_duration_ms: u64,
}

#[derive(Clone, Debug)]
struct EnemyState {
    variant: EnemyVariant,
    params: EnemyParams,
    hp: i32,
    path: Vec<Vec2>,
    next_path_at: u64,
    patrol_target: Vec2,
    patrol_opposite: Vec2,
    dash_until: u64,
    next_dash_at: u64,
    dash_velocity: Vec2f,
}

#[derive(Clone, Copy, Debug)]
struct ProjectileState {
    velocity: Vec2f,
}

#[derive(Clone, Debug)]
enum Behavior {
    Static,
    Npc,
    Enemy(EnemyState),
    Projectile(ProjectileState),
}

struct ActorInternal {
    view: ActorView,
    body: BodyHandle,
    size: Vec2f,
    triggers: Vec<TriggerRuntime>,
    behavior: Behavior,
    removed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScheduledKind {
    EnemyFade,
    ActorRemove,
    ProjectileExpire,
}

/// Deferred continuation keyed to the simulation clock. Entries are dropped
/// when their actor is destroyed, so nothing fires against freed state.
#[derive(Clone, Debug)]
struct ScheduledEvent {
    at_ms: u64,
    actor_id: String,
    kind: ScheduledKind,
}

#[derive(Clone, Debug)]
pub struct SimOptions {
    pub seed: u32,
    pub input_source: InputSource,
    pub progress: GameProgress,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            input_source: InputSource::Keyboard,
            progress: GameProgress::default(),
        }
    }
}

/// Top-level per-frame world model of one level: the two-sided map, the
/// player, the actor collection, the trigger bus, dialogs and the visibility
/// field. Strictly single-threaded and frame-driven; the host calls
/// [`LevelSimulation::step`] once per frame and rebuilds the whole thing on
/// a level transition.
pub struct LevelSimulation {
    level_id: String,
    world: WorldMap,
    visibility: VisibilityField,
    player: PlayerController,
    actors: Vec<ActorInternal>,
    triggers: TriggerRegistry,
    dialogs: DialogOrchestrator,
    physics: Box<dyn PhysicsPort>,
    audio: Box<dyn AudioPort>,
    progress: GameProgress,
    rng: Rng,
    schedule: Vec<ScheduledEvent>,
    commands: Vec<SimCommand>,
    pending_fires: Vec<(String, TriggerSource)>,
    events: Vec<RuntimeEvent>,
    timeline: Vec<TimelineEntry>,
    camera: TileRect,
    pending_door: Option<DoorSpec>,
    now_ms: u64,
    tick_counter: u64,
    next_id_counter: u64,
    enemies_defeated: i32,
    ended: bool,
    end_reason: Option<RunEndReason>,
    torn_down: bool,
}

impl LevelSimulation {
    pub fn new(
        level: &LevelData,
        options: SimOptions,
        physics: Box<dyn PhysicsPort>,
        audio: Box<dyn AudioPort>,
    ) -> Result<Self, SimError> {
        let mut physics = physics;
        let world = WorldMap::build(level)?;
        if !world.active_grid().in_bounds(level.start_position) {
            return Err(SimError::Configuration(format!(
                "start position ({},{}) is outside the grid",
                level.start_position.x, level.start_position.y
            )));
        }

        let visibility = VisibilityField::new(world.active_grid(), world.active().light);
        let start = level.start_position.center_world();
        let player_size = Vec2f {
            x: TILE_SIZE * 0.75,
            y: TILE_SIZE * 0.75,
        };
        let body = physics.create_body(start, player_size);
        let player = PlayerController::new(body, start, options.input_source);

        let mut dialogs = DialogOrchestrator::new();
        for dialog in &level.dialogs {
            dialogs.register_dialog(dialog.clone())?;
        }

        let mut rng = Rng::new(options.seed);
        let mut actors = Vec::new();
        let mut lifetimes = Vec::new();
        let mut seen_ids = HashSet::new();
        let ghost_descriptors = level
            .ghost_world
            .as_ref()
            .map(|side| side.actors.as_slice())
            .unwrap_or(&[]);
        let all_descriptors = level
            .real_world
            .actors
            .iter()
            .map(|descriptor| (descriptor, false))
            .chain(ghost_descriptors.iter().map(|descriptor| (descriptor, true)));
        for (descriptor, ghost_hint) in all_descriptors {
            if !seen_ids.insert(descriptor.id.clone()) {
                return Err(SimError::Configuration(format!(
                    "duplicate actor id `{}`",
                    descriptor.id
                )));
            }
            let (actor, lifetime) = build_actor(descriptor, ghost_hint, physics.as_mut(), &mut rng)?;
            if let Some(lifetime) = lifetime {
                lifetimes.push((actor.view.id.clone(), lifetime));
            }
            actors.push(actor);
        }

        let camera = TileRect {
            min: Vec2 { x: 0, y: 0 },
            max: Vec2 {
                x: world.width() - 1,
                y: world.height() - 1,
            },
        };

        let mut engine = Self {
            level_id: level.id.clone(),
            world,
            visibility,
            player,
            actors,
            triggers: TriggerRegistry::new(),
            dialogs,
            physics,
            audio,
            progress: options.progress,
            rng,
            schedule: Vec::new(),
            commands: Vec::new(),
            pending_fires: Vec::new(),
            events: Vec::new(),
            timeline: Vec::new(),
            camera,
            pending_door: None,
            now_ms: 0,
            tick_counter: 0,
            next_id_counter: 1,
            enemies_defeated: 0,
            ended: false,
            end_reason: None,
            torn_down: false,
        };

        for (actor_id, lifetime) in lifetimes {
            engine.schedule.push(ScheduledEvent {
                at_ms: lifetime,
                actor_id,
                kind: ScheduledKind::ProjectileExpire,
            });
        }

        // The player's reaction to enemy contact goes through the same bus
        // everything else uses.
        engine.triggers.register(
            ENEMY_HIT_PLAYER_ACTION,
            Box::new(|ctx| {
                let from = ctx.source.position;
                let by = ctx.source.actor_id.clone();
                ctx.player
                    .apply_hit(ctx.now_ms, from, &by, ctx.physics, ctx.audio, ctx.events);
            }),
        );

        engine.timeline_push(0, format!("entered {}", level.id));
        Ok(engine)
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end_reason(&self) -> Option<RunEndReason> {
        self.end_reason
    }

    pub fn pending_door(&self) -> Option<&DoorSpec> {
        self.pending_door.as_ref()
    }

    pub fn progress(&self) -> &GameProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut GameProgress {
        &mut self.progress
    }

    pub fn visibility(&self) -> &VisibilityField {
        &self.visibility
    }

    pub fn world(&self) -> &WorldMap {
        &self.world
    }

    pub fn is_ghost_active(&self) -> bool {
        self.world.is_ghost_active()
    }

    pub fn set_input(&mut self, input: InputState) {
        self.player.input = input;
    }

    pub fn set_camera(&mut self, camera: TileRect) {
        self.camera = camera;
    }

    pub fn register_trigger(&mut self, action_id: &str, callback: TriggerCallback) {
        self.triggers.register(action_id, callback);
    }

    pub fn initialize_dialog_presenter(&mut self, on_step_changed: StepCallback) {
        self.dialogs.initialize(on_step_changed);
    }

    pub fn is_dialog_active(&self) -> bool {
        self.dialogs.is_active()
    }

    /// Dialogs normally arrive with the level data; hosts can add more
    /// before the first frame.
    pub fn register_dialog(&mut self, dialog: GameDialog) -> Result<(), SimError> {
        self.dialogs.register_dialog(dialog)
    }

    /// One frame. Order matters and is part of the contract: door check,
    /// then the player, then each active-world actor (triggers dispatched
    /// synchronously after each), then scheduled continuations, then
    /// physics integration, and the visibility field last so visuals match
    /// the frame's final positions.
    pub fn step(&mut self, dt_ms: u64) -> Result<(), SimError> {
        if self.ended || self.torn_down {
            return Ok(());
        }
        self.tick_counter += 1;
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        let now_ms = self.now_ms;

        self.check_door();
        self.player.update(
            now_ms,
            self.world.is_ghost_active(),
            self.physics.as_mut(),
            self.audio.as_mut(),
            &mut self.events,
        );
        self.resolve_player_attack(now_ms);
        self.update_actors(now_ms)?;
        self.process_schedule(now_ms);
        self.actors.retain(|actor| !actor.removed);

        self.physics.step(dt_ms, self.world.active_grid());
        self.sync_positions();
        let player_tile = self.player.position().to_tile();
        self.visibility.update(player_tile, self.camera, dt_ms);

        self.finish_frame(now_ms);
        Ok(())
    }

    /// Flips the active world. The grid/layer set and the player's texture
    /// set change together; no frame can observe a partial toggle.
    pub fn shift_world(&mut self, ghost: bool) {
        if !self.world.toggle_active_world(ghost) {
            return;
        }
        self.player.set_ghost_textures(ghost, self.physics.as_mut());
        self.audio.play_effect("world_shift");
        self.events.push(RuntimeEvent::WorldShifted { ghost });
        let label = if ghost {
            "crossed into the ghost world"
        } else {
            "returned to the real world"
        };
        self.timeline_push(self.now_ms, label.to_string());
    }

    pub fn start_dialog(&mut self, dialog_id: &str) -> Result<(), SimError> {
        match self.dialogs.start(dialog_id, self.player.input_source)? {
            StartOutcome::Started => {
                self.player.input_suspended = true;
                self.events.push(RuntimeEvent::DialogStarted {
                    dialog_id: dialog_id.to_string(),
                });
                self.events.push(RuntimeEvent::DialogStepShown {
                    dialog_id: dialog_id.to_string(),
                    step_index: 0,
                });
            }
            StartOutcome::IgnoredActive => {}
        }
        Ok(())
    }

    /// The host routes the advance input (action key or pointer tap,
    /// whichever the input mode listens for) here while a dialog is shown.
    pub fn notify_dialog_input(&mut self, input: AdvanceListener) -> Result<(), SimError> {
        if self.dialogs.listener() != Some(input) {
            return Ok(());
        }
        match self.dialogs.advance() {
            AdvanceOutcome::Idle => {}
            AdvanceOutcome::Step(view) => {
                self.events.push(RuntimeEvent::DialogStepShown {
                    dialog_id: view.dialog_id,
                    step_index: view.step_index,
                });
            }
            AdvanceOutcome::Finished {
                dialog_id,
                on_finish_trigger_id,
            } => {
                self.player.input_suspended = false;
                self.events.push(RuntimeEvent::DialogFinished {
                    dialog_id: dialog_id.clone(),
                });
                self.timeline_push(self.now_ms, format!("dialog {dialog_id} finished"));
                if let Some(action_id) = on_finish_trigger_id {
                    let source = TriggerSource {
                        actor_id: dialog_id,
                        position: self.player.position(),
                    };
                    self.dispatch_trigger(&action_id, source)?;
                }
            }
        }
        Ok(())
    }

    /// Host-facing damage entry point (level scripts, debug tooling).
    pub fn hit_enemy(&mut self, actor_id: &str) {
        let now_ms = self.now_ms;
        if let Some(idx) = self.actor_index(actor_id) {
            self.enemy_on_hit(idx, now_ms);
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let ghost_active = self.world.is_ghost_active();
        let snapshot = Snapshot {
            tick: self.tick_counter,
            now_ms: self.now_ms,
            ghost_active,
            theme_id: self.world.active().theme_id.clone(),
            player: self.player.view.clone(),
            actors: self
                .actors
                .iter()
                .filter(|actor| !actor.removed && actor.view.ghost_world == ghost_active)
                .map(|actor| actor.view.clone())
                .collect(),
            pending_door: self.pending_door.clone(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
            timeline: self.timeline.clone(),
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            reason: self.end_reason.unwrap_or(RunEndReason::TimeExpired),
            duration_ms: self.now_ms,
            ticks: self.tick_counter,
            player_health: self.player.view.health,
            enemies_defeated: self.enemies_defeated,
            timeline: self.timeline.clone(),
        }
    }

    /// Level teardown: cancels every deferred continuation, releases native
    /// bodies (double-release races are logged, not propagated) and clears
    /// the trigger and dialog registries.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.schedule.clear();
        self.commands.clear();
        self.pending_fires.clear();
        for idx in 0..self.actors.len() {
            let body = self.actors[idx].body;
            if let Err(error) = self.physics.destroy_body(body) {
                warn!(actor_id = %self.actors[idx].view.id, %error, "actor teardown raced");
            }
            self.actors[idx].removed = true;
        }
        if let Err(error) = self.physics.destroy_body(self.player.body) {
            warn!(%error, "player teardown raced");
        }
        self.triggers.clear();
        self.dialogs.clear();
    }

    fn check_door(&mut self) {
        if self.pending_door.is_some() {
            return;
        }
        let tile = self.physics.position(self.player.body).to_tile();
        let Some(door) = self.world.door_at(tile).cloned() else {
            return;
        };
        self.events.push(RuntimeEvent::DoorEntered {
            to_level_id: door.to_level_id.clone(),
            to_position: door.to_position,
        });
        self.timeline_push(self.now_ms, format!("door to {}", door.to_level_id));
        self.pending_door = Some(door);
    }

    fn resolve_player_attack(&mut self, now_ms: u64) {
        if !self.player.is_attacking(now_ms) {
            return;
        }
        for idx in 0..self.actors.len() {
            if self.actors[idx].removed || !self.actors[idx].view.alive {
                continue;
            }
            if self.actors[idx].view.ghost_world != self.world.is_ghost_active() {
                continue;
            }
            if !matches!(self.actors[idx].behavior, Behavior::Enemy(_)) {
                continue;
            }
            if self.physics.overlaps(self.player.body, self.actors[idx].body) {
                self.enemy_on_hit(idx, now_ms);
            }
        }
    }

    fn update_actors(&mut self, now_ms: u64) -> Result<(), SimError> {
        for idx in 0..self.actors.len() {
            if self.actors[idx].removed {
                continue;
            }
            if self.actors[idx].view.ghost_world != self.world.is_ghost_active() {
                self.physics.set_velocity(self.actors[idx].body, Vec2f::ZERO);
                continue;
            }
            self.sync_actor_view(idx);
            match self.actors[idx].view.kind {
                ActorKind::Enemy => self.update_enemy(idx, now_ms),
                ActorKind::Projectile => self.update_projectile(idx, now_ms),
                ActorKind::Npc | ActorKind::StaticProp => {}
            }
            self.evaluate_actor_triggers(idx, now_ms);

            // Dispatch synchronously: this actor's update has returned, the
            // next actor has not started yet.
            let fires = std::mem::take(&mut self.pending_fires);
            for (action_id, source) in fires {
                self.dispatch_trigger(&action_id, source)?;
            }
        }
        Ok(())
    }

    fn evaluate_actor_triggers(&mut self, idx: usize, now_ms: u64) {
        if self.actors[idx].triggers.is_empty() || !self.actors[idx].view.alive {
            return;
        }
        let position = Vec2f {
            x: self.actors[idx].view.x,
            y: self.actors[idx].view.y,
        };
        let rect = footprint(position, self.actors[idx].size);
        let near_rect = rect.expanded(1);
        let player_tile = self.player.position().to_tile();
        let overlap = self.physics.overlaps(self.actors[idx].body, self.player.body);
        let action_edge = self.player.action_edge && !self.player.input_suspended;

        for trigger_idx in 0..self.actors[idx].triggers.len() {
            let spec = self.actors[idx].triggers[trigger_idx].spec.clone();
            let satisfied = match spec.event {
                TriggerEvent::Collide => overlap,
                TriggerEvent::Action => overlap && action_edge,
                TriggerEvent::InArea => rect.contains(player_tile),
                TriggerEvent::NearArea => near_rect.contains(player_tile),
            };
            if !satisfied {
                continue;
            }
            if let Some(last) = self.actors[idx].triggers[trigger_idx].last_fired_at {
                if now_ms.saturating_sub(last) < spec.min_interval_ms {
                    continue;
                }
            }
            self.actors[idx].triggers[trigger_idx].last_fired_at = Some(now_ms);
            let actor_id = self.actors[idx].view.id.clone();
            self.events.push(RuntimeEvent::TriggerFired {
                action_id: spec.action_id.clone(),
                actor_id: actor_id.clone(),
            });
            self.pending_fires
                .push((spec.action_id, TriggerSource { actor_id, position }));
        }
    }

    fn dispatch_trigger(&mut self, action_id: &str, source: TriggerSource) -> Result<(), SimError> {
        {
            let Self {
                triggers,
                world,
                player,
                progress,
                physics,
                audio,
                events,
                commands,
                now_ms,
                ..
            } = self;
            let mut ctx = TriggerContext {
                now_ms: *now_ms,
                source,
                world,
                player,
                progress,
                physics: physics.as_mut(),
                audio: audio.as_mut(),
                events,
                commands,
            };
            triggers.fire(action_id, &mut ctx)?;
        }
        self.drain_commands()
    }

    fn drain_commands(&mut self) -> Result<(), SimError> {
        let mut safety = 0;
        while !self.commands.is_empty() {
            safety += 1;
            if safety > 8 {
                warn!("command queue did not settle; dropping the remainder");
                self.commands.clear();
                break;
            }
            let batch = std::mem::take(&mut self.commands);
            for command in batch {
                match command {
                    SimCommand::ShiftWorld { ghost } => self.shift_world(ghost),
                    SimCommand::StartDialog { dialog_id } => self.start_dialog(&dialog_id)?,
                    SimCommand::RequestLevel { level_id, position } => {
                        if self.pending_door.is_none() {
                            let door = DoorSpec {
                                from_position: self.player.position().to_tile(),
                                to_position: position,
                                to_level_id: level_id,
                            };
                            self.events.push(RuntimeEvent::DoorEntered {
                                to_level_id: door.to_level_id.clone(),
                                to_position: door.to_position,
                            });
                            self.pending_door = Some(door);
                        }
                    }
                    SimCommand::SpawnProjectile {
                        from,
                        direction,
                        speed,
                        lifetime_ms,
                    } => self.spawn_projectile(from, direction, speed, lifetime_ms),
                }
            }
        }
        Ok(())
    }

    fn spawn_projectile(&mut self, from: Vec2f, direction: Vec2f, speed: f32, lifetime_ms: u64) {
        let id = self.make_id("projectile");
        let size = Vec2f {
            x: TILE_SIZE * 0.4,
            y: TILE_SIZE * 0.4,
        };
        let body = self.physics.create_body(from, size);
        let velocity = direction.normalized_or_zero().scaled(speed);
        self.physics.set_velocity(body, velocity);
        self.actors.push(ActorInternal {
            view: ActorView {
                id: id.clone(),
                kind: ActorKind::Projectile,
                x: from.x,
                y: from.y,
                alive: true,
                animation: "fly".to_string(),
                graphics_ref: "projectile".to_string(),
                ghost_world: self.world.is_ghost_active(),
                emitting: false,
                fading: false,
            },
            body,
            size,
            triggers: Vec::new(),
            behavior: Behavior::Projectile(ProjectileState { velocity }),
            removed: false,
        });
        self.schedule.push(ScheduledEvent {
            at_ms: self.now_ms.saturating_add(lifetime_ms),
            actor_id: id,
            kind: ScheduledKind::ProjectileExpire,
        });
    }

    fn process_schedule(&mut self, now_ms: u64) {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.schedule.len() {
            if self.schedule[index].at_ms <= now_ms {
                due.push(self.schedule.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| (a.at_ms, &a.actor_id).cmp(&(b.at_ms, &b.actor_id)));
        for event in due {
            let Some(idx) = self.actor_index(&event.actor_id) else {
                continue;
            };
            match event.kind {
                ScheduledKind::EnemyFade => {
                    self.actors[idx].view.fading = true;
                    self.set_actor_animation(idx, "fade");
                }
                ScheduledKind::ActorRemove => self.remove_actor(idx),
                ScheduledKind::ProjectileExpire => self.break_projectile(idx, now_ms),
            }
        }
    }

    fn remove_actor(&mut self, idx: usize) {
        let body = self.actors[idx].body;
        let actor_id = self.actors[idx].view.id.clone();
        if let Err(error) = self.physics.destroy_body(body) {
            warn!(actor_id = %actor_id, %error, "actor removal raced");
        }
        self.actors[idx].removed = true;
        self.cancel_scheduled(&actor_id);
        self.events.push(RuntimeEvent::ActorRemoved { actor_id });
    }

    fn cancel_scheduled(&mut self, actor_id: &str) {
        self.schedule.retain(|event| event.actor_id != actor_id);
    }

    fn actor_index(&self, actor_id: &str) -> Option<usize> {
        self.actors
            .iter()
            .position(|actor| !actor.removed && actor.view.id == actor_id)
    }

    fn sync_actor_view(&mut self, idx: usize) {
        let position = self.physics.position(self.actors[idx].body);
        self.actors[idx].view.x = position.x;
        self.actors[idx].view.y = position.y;
    }

    fn sync_positions(&mut self) {
        let position = self.physics.position(self.player.body);
        self.player.view.x = position.x;
        self.player.view.y = position.y;
        for idx in 0..self.actors.len() {
            if !self.actors[idx].removed {
                self.sync_actor_view(idx);
            }
        }
    }

    fn set_actor_animation(&mut self, idx: usize, key: &str) {
        if self.actors[idx].view.animation != key {
            self.actors[idx].view.animation = key.to_string();
            let body = self.actors[idx].body;
            self.physics.play_animation(body, key);
        }
    }

    fn timeline_push(&mut self, at_ms: u64, label: String) {
        if self.timeline.len() >= TIMELINE_CAP {
            self.timeline.remove(0);
        }
        self.timeline.push(TimelineEntry { at_ms, label });
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }

    fn finish_frame(&mut self, now_ms: u64) {
        if self.end_reason.is_some() {
            self.ended = true;
            return;
        }
        if self.player.view.health <= 0 {
            self.end_reason = Some(RunEndReason::PlayerDefeated);
            self.timeline_push(now_ms, "the player fell".to_string());
            self.ended = true;
        } else if self.pending_door.is_some() {
            self.end_reason = Some(RunEndReason::DoorExit);
            self.ended = true;
        }
    }
}

fn build_actor(
    descriptor: &ActorDescriptor,
    ghost_hint: bool,
    physics: &mut dyn PhysicsPort,
    rng: &mut Rng,
) -> Result<(ActorInternal, Option<u64>), SimError> {
    if descriptor.size.x <= 0.0 || descriptor.size.y <= 0.0 {
        return Err(SimError::Configuration(format!(
            "actor `{}` has a non-positive size",
            descriptor.id
        )));
    }
    let position = descriptor.position.center_world();
    let (behavior, lifetime) = match descriptor.kind {
        ActorKind::Enemy => (Behavior::Enemy(build_enemy_state(descriptor, rng)?), None),
        ActorKind::Npc => (Behavior::Npc, None),
        ActorKind::StaticProp => (Behavior::Static, None),
        ActorKind::Projectile => {
            let direction = descriptor
                .meta
                .direction
                .ok_or_else(|| missing_meta(descriptor, "direction"))?;
            let speed = descriptor
                .meta
                .speed
                .ok_or_else(|| missing_meta(descriptor, "speed"))?;
            let lifetime = descriptor.meta.lifetime_ms.unwrap_or(2_000);
            (
                Behavior::Projectile(ProjectileState {
                    velocity: direction.normalized_or_zero().scaled(speed),
                }),
                Some(lifetime),
            )
        }
    };
    let body = physics.create_body(position, descriptor.size);
    Ok((
        ActorInternal {
            view: ActorView {
                id: descriptor.id.clone(),
                kind: descriptor.kind,
                x: position.x,
                y: position.y,
                alive: true,
                animation: "idle".to_string(),
                graphics_ref: descriptor.graphics_ref.clone(),
                ghost_world: ghost_hint || descriptor.belongs_to_ghost_world,
                emitting: false,
                fading: false,
            },
            body,
            size: descriptor.size,
            triggers: descriptor
                .triggers
                .iter()
                .map(|spec| TriggerRuntime {
                    spec: spec.clone(),
                    last_fired_at: None,
                })
                .collect(),
            behavior,
            removed: false,
        },
        lifetime,
    ))
}

fn build_enemy_state(descriptor: &ActorDescriptor, rng: &mut Rng) -> Result<EnemyState, SimError> {
    let meta = &descriptor.meta;
    let variant = meta
        .variant
        .ok_or_else(|| missing_meta(descriptor, "variant"))?;
    let speed = meta.speed.ok_or_else(|| missing_meta(descriptor, "speed"))?;
    let update_cooldown = meta.update_cooldown.unwrap_or(DEFAULT_UPDATE_COOLDOWN);
    let hp = meta.hp.unwrap_or(DEFAULT_ENEMY_HP);

    let chase_radius = match variant {
        EnemyVariant::Chasing | EnemyVariant::Dashing => meta
            .chase_radius
            .ok_or_else(|| missing_meta(descriptor, "chaseRadius"))?,
        EnemyVariant::Patrolling | EnemyVariant::Shooting => meta.chase_radius.unwrap_or(0.0),
    };
    let (patrol_target, patrol_opposite) = match variant {
        EnemyVariant::Patrolling => {
            let from = meta
                .patrol_from
                .ok_or_else(|| missing_meta(descriptor, "patrolFrom"))?;
            let to = meta
                .patrol_to
                .ok_or_else(|| missing_meta(descriptor, "patrolTo"))?;
            (to, from)
        }
        _ => (descriptor.position, descriptor.position),
    };
    let (dash_radius, dash_cooldown_ms, dash_duration_ms) = match variant {
        EnemyVariant::Dashing => (
            meta.dash_radius
                .ok_or_else(|| missing_meta(descriptor, "dashRadius"))?,
            meta.dash_cooldown_ms
                .ok_or_else(|| missing_meta(descriptor, "dashCooldownMs"))?,
            meta.dash_duration_ms
                .ok_or_else(|| missing_meta(descriptor, "dashDurationMs"))?,
        ),
        _ => (0.0, 0, 0),
    };

    Ok(EnemyState {
        variant,
        params: EnemyParams {
            speed,
            chase_radius,
            update_cooldown,
            dash_radius,
            dash_cooldown_ms,
            dash_duration_ms,
        },
        hp,
        path: Vec::new(),
        // desync replanning so a pack of enemies does not recompute on the
        // same frame
        next_path_at: rng.int(0, 150) as u64,
        patrol_target,
        patrol_opposite,
        dash_until: 0,
        next_dash_at: 0,
        dash_velocity: Vec2f::ZERO,
    })
}

fn missing_meta(descriptor: &ActorDescriptor, field: &str) -> SimError {
    SimError::Configuration(format!(
        "actor `{}` is missing required meta `{field}`",
        descriptor.id
    ))
}
