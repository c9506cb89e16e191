//! DroneGPT operator console
//!
//! Flies the simulated aircraft. Each line on stdin is a command for the
//! agent; `stop` cancels the active run; EOF or Ctrl-C exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dronegpt_agent::{
    loops::{telemetry_loop::run_telemetry_loop, vision_loop::run_vision_loop},
    Agent, AgentContext, AgentError, Config, FlightActuator, LoopState, RunSummary,
    TelemetryStore, VisionFeed,
};
use dronegpt_chat::{ChatCompletion, ChatCompletionClient};
use dronegpt_core::{ConversationMessage, Role};
use dronegpt_sdk::{
    CameraStream, FlightController, LocationCoordinate2D, SimulatedAircraft, SimulatedCamera,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SIM_ORIGIN: LocationCoordinate2D = LocationCoordinate2D {
    longitude: -117.8265,
    latitude: 33.6845,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("dronegpt_agent=debug".parse()?))
        .init();

    let config = Config::from_env();
    tracing::info!("Starting DroneGPT agent (model {})", config.model);
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; requests will be unauthenticated");
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Simulated aircraft and camera
    let aircraft = SimulatedAircraft::new(SIM_ORIGIN);
    let camera = SimulatedCamera::new(320, 240);
    let sim_tasks = [
        aircraft.spawn(Duration::from_millis(100), shutdown_tx.subscribe()),
        camera.spawn(aircraft.clone(), Duration::from_millis(500), shutdown_tx.subscribe()),
    ];

    // Ingest
    let telemetry = Arc::new(TelemetryStore::new());
    telemetry.prime(aircraft.as_ref());
    let vision = Arc::new(VisionFeed::new(config.jpeg_quality));
    let ingest_tasks = [
        tokio::spawn(run_telemetry_loop(
            telemetry.clone(),
            aircraft.listen(),
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(run_vision_loop(
            vision.clone(),
            camera.frames(),
            shutdown_tx.subscribe(),
        )),
    ];

    let model: Arc<dyn ChatCompletion> = Arc::new(ChatCompletionClient::new(
        config.api_url.as_str(),
        config.api_key.clone(),
        config.request_timeout,
    )?);
    let actuator = Arc::new(FlightActuator::new(
        aircraft.clone(),
        telemetry.clone(),
        config.action_timeout,
    ));
    let agent = Arc::new(Agent::new(AgentContext {
        config,
        model,
        telemetry,
        vision,
        actuator,
    }));

    tokio::spawn(print_transcript(agent.clone()));
    tokio::spawn(report_stopped_runs(agent.clone()));

    println!("DroneGPT ready. Type a command, `stop` to halt, Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        // A new command always replaces the active run.
        if agent.cancel().is_some() {
            report(agent.wait().await);
        }
        if command.eq_ignore_ascii_case("stop") {
            continue;
        }
        agent.run(command)?;
    }

    tracing::info!("Shutting down");
    agent.cancel();
    report(agent.wait().await);

    let _ = shutdown_tx.send(());
    for task in sim_tasks.into_iter().chain(ingest_tasks) {
        let _ = task.await;
    }
    Ok(())
}

async fn print_transcript(agent: Arc<Agent>) {
    let mut transcript = agent.subscribe_transcript();
    let mut printed = 0;
    while transcript.changed().await.is_ok() {
        let messages = transcript.borrow_and_update().clone();
        for message in messages.iter().skip(printed) {
            print_message(message);
        }
        printed = messages.len();
    }
}

/// Report runs that end on their own, without waiting for the next command.
async fn report_stopped_runs(agent: Arc<Agent>) {
    let mut state = agent.subscribe_state();
    while state.changed().await.is_ok() {
        let stopped = *state.borrow_and_update() == LoopState::Stopped;
        if stopped {
            report(agent.wait_stopped().await);
        }
    }
}

fn print_message(message: &ConversationMessage) {
    let speaker = match message.role() {
        Role::User => "you",
        Role::Assistant => "drone",
        Role::System | Role::Tool => return,
    };
    if let Some(text) = message.text() {
        println!("[{}] {}", speaker, text);
    }
}

fn report(result: Option<Result<RunSummary, AgentError>>) {
    match result {
        Some(Ok(summary)) => println!(
            "Run {} ended ({:?}) after {} iterations",
            summary.run_id, summary.outcome, summary.iterations
        ),
        Some(Err(err)) => println!("Run failed: {}", err),
        None => {}
    }
}
