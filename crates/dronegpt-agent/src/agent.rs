//! Session facade: owns the conversation and at most one active run.

use std::sync::{Arc, Mutex, PoisonError};

use dronegpt_core::{ConversationLog, ConversationMessage, SYSTEM_PROMPT};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AgentError;
use crate::loops::agent_loop::{run_agent_loop, AgentContext, LoopState, RunSummary};

struct ActiveRun {
    run_id: Uuid,
    cancel: broadcast::Sender<()>,
    handle: JoinHandle<Result<RunSummary, AgentError>>,
}

pub struct Agent {
    ctx: Arc<AgentContext>,
    log: Arc<Mutex<ConversationLog>>,
    state: Arc<watch::Sender<LoopState>>,
    transcript: Arc<watch::Sender<Vec<ConversationMessage>>>,
    active: Mutex<Option<ActiveRun>>,
}

impl Agent {
    pub fn new(ctx: AgentContext) -> Self {
        Self::with_system_prompt(ctx, SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(ctx: AgentContext, system_prompt: &str) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        let (transcript, _) = watch::channel(Vec::new());
        Self {
            ctx: Arc::new(ctx),
            log: Arc::new(Mutex::new(ConversationLog::new(system_prompt))),
            state: Arc::new(state),
            transcript: Arc::new(transcript),
            active: Mutex::new(None),
        }
    }

    /// Loop state of the current or most recent run.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Operator transcript: user commands and model replies.
    pub fn subscribe_transcript(&self) -> watch::Receiver<Vec<ConversationMessage>> {
        self.transcript.subscribe()
    }

    /// Copy of the full conversation log, observations included.
    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .all()
            .to_vec()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Start a run for `command`. Fails if a run is still active; cancel and
    /// wait for it first.
    pub fn run(&self, command: impl Into<String>) -> Result<Uuid, AgentError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|run| !run.handle.is_finished()) {
            return Err(AgentError::AlreadyRunning);
        }

        {
            let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
            log.append(ConversationMessage::user(command))?;
            self.transcript
                .send_replace(log.visible().cloned().collect());
        }

        // Reset under the lock so `Stopped` always refers to the run in `active`.
        self.state.send_replace(LoopState::Idle);
        let run_id = Uuid::new_v4();
        let (cancel, shutdown) = broadcast::channel(1);
        let handle = tokio::spawn(run_agent_loop(
            self.ctx.clone(),
            self.log.clone(),
            self.state.clone(),
            self.transcript.clone(),
            run_id,
            shutdown,
        ));
        *active = Some(ActiveRun {
            run_id,
            cancel,
            handle,
        });
        Ok(run_id)
    }

    /// Ask the active run to stop. Returns the id of the run that was
    /// signalled, if any.
    pub fn cancel(&self) -> Option<Uuid> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let run = active.as_ref().filter(|run| !run.handle.is_finished())?;
        tracing::info!("Cancelling run {}", run.run_id);
        // The receiver only goes away once the run has ended.
        let _ = run.cancel.send(());
        Some(run.run_id)
    }

    /// Wait for the most recent run to end and take its result. `None` if
    /// there is no run to wait for.
    pub async fn wait(&self) -> Option<Result<RunSummary, AgentError>> {
        let run = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        Some(join(run).await)
    }

    /// Take the result of a run that has already reached `Stopped`. `None`
    /// while the run is still going or once its result has been taken.
    pub async fn wait_stopped(&self) -> Option<Result<RunSummary, AgentError>> {
        let run = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if *self.state.borrow() != LoopState::Stopped {
                return None;
            }
            active.take()?
        };
        Some(join(run).await)
    }
}

async fn join(run: ActiveRun) -> Result<RunSummary, AgentError> {
    match run.handle.await {
        Ok(result) => result,
        Err(err) => Err(AgentError::Aborted(err.to_string())),
    }
}
