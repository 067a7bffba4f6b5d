use std::time::Instant;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crowd_runner_core::config::CrowdConfig;
use crowd_runner_core::crowd::gate::{FlowState, Gate, GateOp};
use crowd_runner_core::crowd::oracle::{FenceSpan, FenceTrack};
use crowd_runner_core::crowd::{CrowdEvent, CrowdSession};
use crowd_runner_core::util::vec2::Vec2;

/// Simulated render rate
const FPS: f32 = 60.0;
/// Default number of frames to simulate (`SIM_FRAMES`)
const DEFAULT_FRAMES: u64 = 3600;
/// Leader forward speed in units per second
const RUN_SPEED: f32 = 8.0;
/// Distance between scripted gates
const GATE_SPACING: f32 = 40.0;
/// Length of one fence and the gap after it
const FENCE_LENGTH: f32 = 12.0;
const FENCE_GAP: f32 = 48.0;

/// Gates met along the track, in order; `None` is a mystery gate
const GATE_SCRIPT: [Option<Gate>; 8] = [
    Some(Gate::new(GateOp::Add, 20.0)),
    Some(Gate::new(GateOp::Multiply, 2.0)),
    None,
    Some(Gate::new(GateOp::Subtract, 15.0)),
    Some(Gate::new(GateOp::Multiply, 3.0)),
    None,
    Some(Gate::new(GateOp::Divide, 2.0)),
    Some(Gate::new(GateOp::Add, 50.0)),
];

fn build_track(length: f32) -> FenceTrack {
    let mut track = FenceTrack::new();
    let mut z = -30.0;
    while z > -length {
        track.push(FenceSpan::new(z - FENCE_LENGTH, z, 0.75));
        z -= FENCE_LENGTH + FENCE_GAP;
    }
    track
}

fn flow_for(gate_index: usize) -> FlowState {
    match gate_index % 3 {
        0 => FlowState::Recovery,
        1 => FlowState::Challenge,
        _ => FlowState::Grinder,
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Crowd Runner simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = CrowdConfig::load_or_default();
    info!(
        "Configuration loaded: max_total={}, logic_hz={}, seed={}",
        config.max_total, config.logic_hz, config.seed
    );

    let frames = match std::env::var("SIM_FRAMES") {
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            warn!("Invalid SIM_FRAMES '{}', using default", raw);
            DEFAULT_FRAMES
        }),
        Err(_) => DEFAULT_FRAMES,
    };

    let dt = 1.0 / FPS;
    let track_length = frames as f32 * dt * RUN_SPEED + 100.0;
    let mut session = CrowdSession::start(config, build_track(track_length))?;

    let mut next_gate_z = -GATE_SPACING * 0.5;
    let mut gate_index = 0usize;

    for frame in 0..frames {
        let t = frame as f32 * dt;
        let leader = Vec2::new((t * 0.7).sin() * 2.5, -t * RUN_SPEED);
        session.set_leader_position(leader);

        if leader.z <= next_gate_z {
            let gate = match GATE_SCRIPT[gate_index % GATE_SCRIPT.len()] {
                Some(gate) => {
                    session.apply_gate(gate);
                    gate
                }
                None => session.apply_mystery_gate(flow_for(gate_index)),
            };
            info!(frame, gate = %gate, total = session.population().projected_total(), "Gate passed");
            gate_index += 1;
            next_gate_z -= GATE_SPACING;
        }

        // An enemy wave ahead of the crowd picks off front-row agents
        if frame % 45 == 44 {
            let enemy = leader + Vec2::new(0.0, -6.0);
            if let Some(target) = session.frontline_unit() {
                session.add_lock(target);
                session.kill_frontline(enemy);
                session.remove_lock(target);
            }
        }

        // Deadlock breaker
        if frame % 600 == 599 {
            session.sacrifice(3);
        }

        // Fences the crowd has left behind are recycled
        session.oracle_mut().clear_range(leader.z + 30.0, leader.z + 1000.0);

        let started = Instant::now();
        session.tick(dt);
        session.metrics_mut().record_tick_time(started.elapsed());

        let mut ended = false;
        for event in session.drain_events() {
            match event {
                CrowdEvent::GameOver { final_total, peak_total } => {
                    info!(frame, final_total, peak_total, "Game over");
                    ended = true;
                }
                other => debug!(frame, ?other, "Crowd event"),
            }
        }
        if ended {
            break;
        }
    }

    debug!("\n{}", session.metrics().to_prometheus());

    let summary = session.end();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
