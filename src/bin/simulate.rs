use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use twinveil::constants::TICK_MS;
use twinveil::dialog::AdvanceListener;
use twinveil::engine::{LevelSimulation, SimOptions};
use twinveil::ports::{HeadlessPhysics, NullAudio};
use twinveil::triggers::SimCommand;
use twinveil::types::{
    ActorDescriptor, ActorKind, ActorMeta, DialogStep, EnemyVariant, GameDialog, InputSource,
    InputState, LevelData, PanelSide, RunEndReason, RuntimeEvent, Snapshot, TriggerEvent,
    TriggerSpec, Vec2, Vec2f, WorldData,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Level document (JSON); the built-in demo level when omitted.
    #[arg(long)]
    level: Option<PathBuf>,
    /// Simulated seconds to run.
    #[arg(long)]
    seconds: Option<u64>,
    #[arg(long)]
    seed: Option<u32>,
    /// keyboard | joystick | gamepad
    #[arg(long)]
    input: Option<String>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct EventCounts {
    #[serde(rename = "enemiesDefeated")]
    enemies_defeated: i32,
    #[serde(rename = "playerHits")]
    player_hits: i32,
    #[serde(rename = "playerDashes")]
    player_dashes: i32,
    #[serde(rename = "enemyDashes")]
    enemy_dashes: i32,
    #[serde(rename = "worldShifts")]
    world_shifts: i32,
    #[serde(rename = "dialogsFinished")]
    dialogs_finished: i32,
    #[serde(rename = "triggersFired")]
    triggers_fired: i32,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunResult {
    #[serde(rename = "levelId")]
    level_id: String,
    seed: u32,
    reason: RunEndReason,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    ticks: u64,
    #[serde(rename = "playerHealth")]
    player_health: i32,
    #[serde(rename = "ghostActive")]
    ghost_active: bool,
    counts: EventCounts,
    anomalies: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(flatten)]
    result: RunResult,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let started_at_ms = wall_ms();
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| format!("sim_{seed}_{started_at_ms}"));
    let input_source = cli
        .input
        .as_deref()
        .map(|value| InputSource::parse(value).unwrap_or(InputSource::Keyboard))
        .unwrap_or(InputSource::Keyboard);

    let level = match &cli.level {
        Some(path) => match load_level(path) {
            Ok(level) => level,
            Err(message) => {
                emit_log("error", "level_load_failed", &match_id, None, json!({ "error": message }));
                std::process::exit(2);
            }
        },
        None => demo_level(),
    };

    emit_log(
        "info",
        "run_started",
        &match_id,
        Some(seed),
        json!({
            "levelId": level.id,
            "seconds": cli.seconds.unwrap_or(30),
            "input": input_source,
        }),
    );

    let result = match run_scenario(&level, seed, input_source, cli.seconds.unwrap_or(30)) {
        Ok(result) => result,
        Err(message) => {
            emit_log("error", "run_failed", &match_id, Some(seed), json!({ "error": message }));
            std::process::exit(2);
        }
    };

    for anomaly in &result.anomalies {
        emit_log(
            "warn",
            "anomaly_detected",
            &match_id,
            Some(seed),
            json!({ "tick": anomaly.tick, "message": anomaly.message }),
        );
    }

    let summary = RunSummary {
        match_id: match_id.clone(),
        started_at_ms,
        finished_at_ms: wall_ms(),
        anomaly_count: result.anomalies.len(),
        result: result.clone(),
    };

    println!(
        "{}",
        serde_json::to_string(&summary).expect("summary should serialize")
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                Some(seed),
                json!({ "path": path.to_string_lossy(), "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        Some(seed),
        json!({
            "reason": summary.result.reason,
            "durationMs": summary.result.duration_ms,
            "anomalyCount": summary.anomaly_count,
        }),
    );

    if !result.anomalies.is_empty() {
        std::process::exit(1);
    }
}

fn run_scenario(
    level: &LevelData,
    seed: u32,
    input_source: InputSource,
    seconds: u64,
) -> Result<RunResult, String> {
    let options = SimOptions {
        seed,
        input_source,
        ..SimOptions::default()
    };
    let mut sim = LevelSimulation::new(
        level,
        options,
        Box::new(HeadlessPhysics::new()),
        Box::new(NullAudio),
    )
    .map_err(|error| error.to_string())?;

    // gameplay reactions the excluded shell would normally wire up
    sim.register_trigger(
        "shrine_touched",
        Box::new(|ctx| {
            ctx.audio.play_effect("shrine_chime");
            ctx.commands.push(SimCommand::ShiftWorld { ghost: true });
        }),
    );
    sim.register_trigger(
        "npc_talk",
        Box::new(|ctx| {
            ctx.commands.push(SimCommand::StartDialog {
                dialog_id: "shade_warning".to_string(),
            });
        }),
    );
    sim.register_trigger(
        "gate_unlocked",
        Box::new(|ctx| {
            ctx.progress.flags.insert("gate_unlocked".to_string(), true);
        }),
    );

    let total_ticks = seconds * 1000 / TICK_MS;
    let mut counts = EventCounts {
        enemies_defeated: 0,
        player_hits: 0,
        player_dashes: 0,
        enemy_dashes: 0,
        world_shifts: 0,
        dialogs_finished: 0,
        triggers_fired: 0,
    };
    let mut anomalies = Vec::new();
    let mut anomaly_seen = HashSet::new();

    for tick in 0..total_ticks {
        sim.set_input(scripted_input(tick));
        if sim.is_dialog_active() && tick % 10 == 0 {
            sim.notify_dialog_input(AdvanceListener::for_input_source(input_source))
                .map_err(|error| error.to_string())?;
        }
        if tick == total_ticks / 4 {
            sim.shift_world(true);
        }

        sim.step(TICK_MS).map_err(|error| error.to_string())?;
        let snapshot = sim.build_snapshot(true);
        tally_events(&snapshot.events, &mut counts);
        for message in collect_snapshot_anomalies(level, &snapshot) {
            if anomaly_seen.insert(message.clone()) {
                anomalies.push(AnomalyRecord {
                    tick: snapshot.tick,
                    message,
                });
            }
        }
        if sim.is_ended() {
            break;
        }
    }

    let summary = sim.build_summary();
    let ghost_active = sim.is_ghost_active();
    sim.teardown();
    Ok(RunResult {
        level_id: level.id.clone(),
        seed,
        reason: summary.reason,
        duration_ms: summary.duration_ms,
        ticks: summary.ticks,
        player_health: summary.player_health,
        ghost_active,
        counts,
        anomalies,
    })
}

/// Deterministic wander: the direction sweeps every two simulated seconds,
/// the action key pulses once a second.
fn scripted_input(tick: u64) -> InputState {
    let phase = (tick / 40) % 4;
    let move_dir = match phase {
        0 => Vec2f { x: 1.0, y: 0.0 },
        1 => Vec2f { x: 0.0, y: 1.0 },
        2 => Vec2f { x: -1.0, y: 0.0 },
        _ => Vec2f { x: 0.0, y: -1.0 },
    };
    InputState {
        move_dir,
        action_held: tick % 20 == 0,
    }
}

fn tally_events(events: &[RuntimeEvent], counts: &mut EventCounts) {
    for event in events {
        match event {
            RuntimeEvent::EnemyDied { .. } => counts.enemies_defeated += 1,
            RuntimeEvent::PlayerDamaged { .. } => counts.player_hits += 1,
            RuntimeEvent::PlayerDashed => counts.player_dashes += 1,
            RuntimeEvent::EnemyDashed { .. } => counts.enemy_dashes += 1,
            RuntimeEvent::WorldShifted { .. } => counts.world_shifts += 1,
            RuntimeEvent::DialogFinished { .. } => counts.dialogs_finished += 1,
            RuntimeEvent::TriggerFired { .. } => counts.triggers_fired += 1,
            _ => {}
        }
    }
}

fn collect_snapshot_anomalies(level: &LevelData, snapshot: &Snapshot) -> Vec<String> {
    let mut out = Vec::new();
    if snapshot.player.health < 0 || snapshot.player.health > 99 {
        out.push(format!("player health out of range: {}", snapshot.player.health));
    }
    let tile = Vec2f {
        x: snapshot.player.x,
        y: snapshot.player.y,
    }
    .to_tile();
    if tile.x < 0 || tile.y < 0 || tile.x >= level.width || tile.y >= level.height {
        out.push(format!("player left the grid at ({},{})", tile.x, tile.y));
    }
    for actor in &snapshot.actors {
        if actor.ghost_world != snapshot.ghost_active {
            out.push(format!(
                "actor {} from the inactive world is visible",
                actor.id
            ));
        }
    }
    out
}

fn load_level(path: &Path) -> Result<LevelData, String> {
    let raw = fs::read_to_string(path).map_err(|error| error.to_string())?;
    serde_json::from_str(&raw).map_err(|error| error.to_string())
}

fn write_summary(path: &Path, summary: &RunSummary) -> std::io::Result<()> {
    let body = serde_json::to_string_pretty(summary)?;
    fs::write(path, body)
}

fn emit_log(level: &str, event: &str, match_id: &str, seed: Option<u32>, details: Value) {
    let mut line = BTreeMap::new();
    line.insert("timestampMs".to_string(), json!(wall_ms()));
    line.insert("level".to_string(), json!(level));
    line.insert("event".to_string(), json!(event));
    line.insert("matchId".to_string(), json!(match_id));
    if let Some(seed) = seed {
        line.insert("seed".to_string(), json!(seed));
    }
    line.insert("details".to_string(), details);
    eprintln!(
        "{}",
        serde_json::to_string(&line).expect("log line should serialize")
    );
}

fn wall_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A compact two-world level exercising every subsystem: a chaser, a
/// patroller, a ghost-side dasher, a talkative NPC, a shrine that shifts the
/// veil and a door out.
fn demo_level() -> LevelData {
    let width = 20usize;
    let height = 14usize;
    let mut real_rows = vec![vec![0u8; width]; height];
    for x in 0..width {
        real_rows[0][x] = 1;
        real_rows[height - 1][x] = 1;
    }
    for row in real_rows.iter_mut() {
        row[0] = 1;
        row[width - 1] = 1;
    }
    let mut ghost_rows = real_rows.clone();
    // pillars exist only on the real side; the veil opens those lanes
    for &(x, y) in &[(7, 5), (7, 6), (7, 7), (13, 5), (13, 6), (13, 7)] {
        real_rows[y][x] = 1;
    }
    // and the ghost side walls off its own corner
    for &(x, y) in &[(16, 3), (17, 3), (16, 4)] {
        ghost_rows[y][x] = 1;
    }

    let real_world = WorldData {
        collision: real_rows,
        background_layers: Vec::new(),
        foreground_layers: Vec::new(),
        doors: vec![twinveil::types::DoorSpec {
            from_position: Vec2 { x: 18, y: 12 },
            to_position: Vec2 { x: 2, y: 2 },
            to_level_id: "crypt".to_string(),
        }],
        actors: vec![
            ActorDescriptor {
                id: "shade".to_string(),
                kind: ActorKind::Enemy,
                position: Vec2 { x: 15, y: 4 },
                size: Vec2f { x: 12.0, y: 12.0 },
                graphics_ref: "shade".to_string(),
                triggers: Vec::new(),
                meta: ActorMeta {
                    variant: Some(EnemyVariant::Chasing),
                    speed: Some(70.0),
                    chase_radius: Some(96.0),
                    ..ActorMeta::default()
                },
                belongs_to_ghost_world: false,
            },
            ActorDescriptor {
                id: "warden".to_string(),
                kind: ActorKind::Enemy,
                position: Vec2 { x: 5, y: 10 },
                size: Vec2f { x: 12.0, y: 12.0 },
                graphics_ref: "warden".to_string(),
                triggers: Vec::new(),
                meta: ActorMeta {
                    variant: Some(EnemyVariant::Patrolling),
                    speed: Some(60.0),
                    patrol_from: Some(Vec2 { x: 5, y: 10 }),
                    patrol_to: Some(Vec2 { x: 14, y: 10 }),
                    ..ActorMeta::default()
                },
                belongs_to_ghost_world: false,
            },
            ActorDescriptor {
                id: "keeper".to_string(),
                kind: ActorKind::Npc,
                position: Vec2 { x: 3, y: 3 },
                size: Vec2f { x: 14.0, y: 14.0 },
                graphics_ref: "keeper".to_string(),
                triggers: vec![TriggerSpec {
                    event: TriggerEvent::Action,
                    action_id: "npc_talk".to_string(),
                    min_interval_ms: 5_000,
                }],
                meta: ActorMeta::default(),
                belongs_to_ghost_world: false,
            },
            ActorDescriptor {
                id: "shrine".to_string(),
                kind: ActorKind::StaticProp,
                position: Vec2 { x: 8, y: 3 },
                size: Vec2f { x: 16.0, y: 16.0 },
                graphics_ref: "shrine".to_string(),
                triggers: vec![TriggerSpec {
                    event: TriggerEvent::NearArea,
                    action_id: "shrine_touched".to_string(),
                    min_interval_ms: 60_000,
                }],
                meta: ActorMeta::default(),
                belongs_to_ghost_world: false,
            },
        ],
        light: None,
        theme_id: "hollow".to_string(),
    };

    let ghost_world = WorldData {
        collision: ghost_rows,
        background_layers: Vec::new(),
        foreground_layers: Vec::new(),
        doors: Vec::new(),
        actors: vec![
            ActorDescriptor {
                id: "lunger".to_string(),
                kind: ActorKind::Enemy,
                position: Vec2 { x: 12, y: 8 },
                size: Vec2f { x: 12.0, y: 12.0 },
                graphics_ref: "lunger".to_string(),
                triggers: Vec::new(),
                meta: ActorMeta {
                    variant: Some(EnemyVariant::Dashing),
                    speed: Some(55.0),
                    chase_radius: Some(112.0),
                    dash_radius: Some(64.0),
                    dash_cooldown_ms: Some(2_500),
                    dash_duration_ms: Some(350),
                    ..ActorMeta::default()
                },
                belongs_to_ghost_world: true,
            },
            ActorDescriptor {
                id: "wisp".to_string(),
                kind: ActorKind::Enemy,
                position: Vec2 { x: 17, y: 10 },
                size: Vec2f { x: 10.0, y: 10.0 },
                graphics_ref: "wisp".to_string(),
                triggers: Vec::new(),
                meta: ActorMeta {
                    variant: Some(EnemyVariant::Chasing),
                    speed: Some(50.0),
                    chase_radius: Some(128.0),
                    ..ActorMeta::default()
                },
                belongs_to_ghost_world: true,
            },
        ],
        light: None,
        theme_id: "hollow_veil".to_string(),
    };

    LevelData {
        id: "hollow_court".to_string(),
        width: width as i32,
        height: height as i32,
        real_world,
        ghost_world: Some(ghost_world),
        start_position: Vec2 { x: 2, y: 2 },
        dialogs: vec![GameDialog {
            id: "shade_warning".to_string(),
            steps: vec![
                DialogStep {
                    portrait_ref: "keeper".to_string(),
                    title: "Keeper".to_string(),
                    text: "The shades only bleed on the other side.".to_string(),
                    panel_side: PanelSide::Left,
                },
                DialogStep {
                    portrait_ref: "hero".to_string(),
                    title: "Wanderer".to_string(),
                    text: "Then show me the shrine.".to_string(),
                    panel_side: PanelSide::Right,
                },
            ],
            on_finish_trigger_id: Some("gate_unlocked".to_string()),
        }],
    }
}
