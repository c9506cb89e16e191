//! The closed control loop.
//!
//! Each cycle snapshots telemetry and the latest frame, asks the model what
//! to do, applies the answer, then sleeps out the rest of the period. The
//! loop ends when a reply carries no instruction, on an unrecoverable error,
//! or on cancellation. Every exit applies exactly one final Stop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use dronegpt_chat::{ChatCompletion, ModelError};
use dronegpt_core::{
    parse_reply, AircraftState, AssistantMessage, CompletionRequest, CompletionResponse,
    ConversationLog, ConversationMessage, Observation,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::actuator::FlightActuator;
use crate::config::Config;
use crate::error::AgentError;
use crate::pacing::{pace, Pace};
use crate::state::{TelemetryStore, VisionFeed};

/// Logged in place of a reply when the model could not be reached.
pub const STOP_CONTROL_MESSAGE: &str =
    r#"{"type":"stop","message":"Something went wrong with DroneGPT, stopping."}"#;

/// Dependencies shared by every run.
pub struct AgentContext {
    pub config: Config,
    pub model: Arc<dyn ChatCompletion>,
    pub telemetry: Arc<TelemetryStore>,
    pub vision: Arc<VisionFeed>,
    pub actuator: Arc<FlightActuator>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Observing,
    AwaitingModel,
    Executing,
    PacedWait,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model's reply carried no instruction.
    Finished,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Finished,
    Cancelled,
}

/// Drive one run to completion. The user command must already be the last
/// entry in `log`.
pub async fn run_agent_loop(
    ctx: Arc<AgentContext>,
    log: Arc<Mutex<ConversationLog>>,
    state: Arc<watch::Sender<LoopState>>,
    transcript: Arc<watch::Sender<Vec<ConversationMessage>>>,
    run_id: Uuid,
    shutdown: broadcast::Receiver<()>,
) -> Result<RunSummary, AgentError> {
    let span = tracing::info_span!("agent_run", %run_id);
    AgentLoop {
        ctx,
        log,
        state,
        transcript,
        shutdown,
        iterations: 0,
    }
    .run(run_id)
    .instrument(span)
    .await
}

struct AgentLoop {
    ctx: Arc<AgentContext>,
    log: Arc<Mutex<ConversationLog>>,
    state: Arc<watch::Sender<LoopState>>,
    transcript: Arc<watch::Sender<Vec<ConversationMessage>>>,
    shutdown: broadcast::Receiver<()>,
    iterations: u32,
}

impl AgentLoop {
    async fn run(mut self, run_id: Uuid) -> Result<RunSummary, AgentError> {
        let started_at = Utc::now();
        tracing::info!("Run started");

        let result = loop {
            match self.cycle().await {
                Ok(Step::Continue) => continue,
                Ok(Step::Finished) => break Ok(RunOutcome::Finished),
                Ok(Step::Cancelled) => break Ok(RunOutcome::Cancelled),
                Err(err) => break Err(err),
            }
        };

        let stopped = self.ctx.actuator.stop();
        self.state.send_replace(LoopState::Stopped);

        let outcome = match (result, stopped) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(err)) => {
                tracing::error!("Failed to neutralize sticks at end of run: {}", err);
                return Err(err.into());
            }
            (Err(err), stopped) => {
                if let Err(stop_err) = stopped {
                    tracing::error!("Failed to neutralize sticks at end of run: {}", stop_err);
                }
                tracing::error!("Run failed after {} iterations: {}", self.iterations, err);
                return Err(err);
            }
        };

        tracing::info!(
            "Run ended ({:?}) after {} iterations",
            outcome,
            self.iterations
        );
        Ok(RunSummary {
            run_id,
            outcome,
            iterations: self.iterations,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn cycle(&mut self) -> Result<Step, AgentError> {
        if self.cancelled() {
            return Ok(Step::Cancelled);
        }
        self.iterations += 1;
        let cycle_start = Instant::now();
        self.state.send_replace(LoopState::Observing);

        let snapshot = self.ctx.telemetry.snapshot();
        let image = self.ctx.vision.snapshot();
        let observation =
            Observation::new(&snapshot, image.as_deref(), self.ctx.config.image_detail)?;
        let messages = {
            let mut log = self.lock_log();
            log.append(ConversationMessage::Observation(observation))?;
            log.select_context()?
        };
        let request = CompletionRequest::new(self.ctx.config.model.as_str(), messages)
            .with_max_tokens(self.ctx.config.max_tokens);

        self.state.send_replace(LoopState::AwaitingModel);
        let model_start = Instant::now();
        let response = tokio::select! {
            _ = self.shutdown.recv() => {
                tracing::info!("Cancelled while awaiting model");
                return Ok(Step::Cancelled);
            }
            response = self.ctx.model.complete(&request) => response,
        };
        let model_time = model_start.elapsed();

        self.state.send_replace(LoopState::Executing);
        let actuator_start = Instant::now();
        let step = self.handle_response(response, &snapshot).await?;
        let actuator_time = actuator_start.elapsed();

        let elapsed = cycle_start.elapsed();
        tracing::debug!(
            "Cycle {} took {} ms (model {} ms + actuator {} ms)",
            self.iterations,
            elapsed.as_millis(),
            model_time.as_millis(),
            actuator_time.as_millis()
        );

        if step != Step::Continue {
            return Ok(step);
        }

        self.state.send_replace(LoopState::PacedWait);
        match pace(elapsed, self.ctx.config.loop_period) {
            Pace::Sleep(remaining) => tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Cancelled during paced wait");
                    return Ok(Step::Cancelled);
                }
                _ = sleep(remaining) => {}
            },
            Pace::Overrun(overrun) => tracing::warn!(
                "Cycle {} overran the {} ms period by {} ms",
                self.iterations,
                self.ctx.config.loop_period.as_millis(),
                overrun.as_millis()
            ),
        }
        Ok(Step::Continue)
    }

    async fn handle_response(
        &mut self,
        response: Result<CompletionResponse, ModelError>,
        snapshot: &AircraftState,
    ) -> Result<Step, AgentError> {
        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_transient() => {
                tracing::warn!("Model call failed, stopping aircraft: {}", err);
                self.ctx.actuator.stop()?;
                self.append(ConversationMessage::control(STOP_CONTROL_MESSAGE))?;
                return Ok(Step::Continue);
            }
            Err(err) => return Err(err.into()),
        };

        let reply = response
            .into_first_message()
            .ok_or(ModelError::EmptyResponse)?;
        let text = match &reply {
            ConversationMessage::Assistant(AssistantMessage {
                content: Some(text),
                ..
            }) => text.clone(),
            other => return Err(AgentError::UnexpectedReply(other.role())),
        };
        self.append(reply)?;

        match parse_reply(&text)? {
            Some(instruction) => {
                self.ctx.actuator.execute(&instruction, snapshot).await?;
                Ok(Step::Continue)
            }
            None => {
                tracing::info!("Reply carries no instruction, ending run");
                Ok(Step::Finished)
            }
        }
    }

    fn append(&self, message: ConversationMessage) -> Result<(), AgentError> {
        let visible = message.is_visible();
        let mut log = self.lock_log();
        log.append(message)?;
        if visible {
            self.transcript
                .send_replace(log.visible().cloned().collect());
        }
        Ok(())
    }

    fn lock_log(&self) -> MutexGuard<'_, ConversationLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A cancel sent while the loop was busy elsewhere.
    fn cancelled(&mut self) -> bool {
        !matches!(self.shutdown.try_recv(), Err(TryRecvError::Empty))
    }
}
