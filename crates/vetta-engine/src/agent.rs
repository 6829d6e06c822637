//! The page automation agent.
//!
//! A single tokio task that drives the review site through a [`HostPage`],
//! one cycle per page: extract the profile container, submit it to the job
//! server, click the next-page control, await navigation, repeat. The task
//! rehydrates its state from the [`StateStore`] at every cycle head, so a
//! run survives full page navigations where any in-memory state would be
//! lost.
//!
//! Cancellation is cooperative and polled: `stop` commands take effect only
//! at checkpoints (loop head, pre-navigation, post-navigation). An in-flight
//! submission or navigation poll always completes first.

use crate::client::JobServerClient;
use crate::config::VettaConfig;
use crate::detector::{self, DetectorSettings, NavigationOutcome};
use crate::page::{HostPage, PageError};
use crate::store::{StateStore, StoreError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use vetta_common::protocol::{AgentCommand, StatusUpdate};
use vetta_common::state::ProcessingState;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
    #[error("Page error: {0}")]
    Page(#[from] PageError),
}

/// Why a run left the `Running` state. Every exit clears persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// No profile container on the current page: the natural end of the list.
    EndOfList,
    /// Submission succeeded but there is no next-page control.
    NextControlMissing,
    /// A stop was observed at a checkpoint.
    Stopped,
    /// Persisted state said processing with no job id.
    StateInconsistent,
}

impl LoopExit {
    fn notice(&self) -> &'static str {
        match self {
            Self::EndOfList => "Processing finished: no more profiles",
            Self::NextControlMissing => "Processing finished: no next page control",
            Self::Stopped => "Processing stopped",
            Self::StateInconsistent => "Processing aborted: saved state is inconsistent",
        }
    }

    fn is_error(&self) -> bool {
        matches!(self, Self::StateInconsistent)
    }
}

enum CycleOutcome {
    Continue,
    Exit(LoopExit),
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub profile_container_id: String,
    pub next_control_id: String,
    pub detector: DetectorSettings,
    /// Pacing delay after each submission.
    pub step_delay: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from(&VettaConfig::default())
    }
}

impl From<&VettaConfig> for AgentSettings {
    fn from(config: &VettaConfig) -> Self {
        Self {
            profile_container_id: config.profile_container_id.clone(),
            next_control_id: config.next_control_id.clone(),
            detector: DetectorSettings {
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                max_polls: config.max_polls,
            },
            step_delay: Duration::from_millis(config.step_delay_ms),
        }
    }
}

pub struct Agent<P, S> {
    page: P,
    store: S,
    client: JobServerClient,
    commands: mpsc::Receiver<AgentCommand>,
    status: mpsc::Sender<StatusUpdate>,
    settings: AgentSettings,
}

impl<P: HostPage, S: StateStore> Agent<P, S> {
    pub fn new(
        page: P,
        store: S,
        client: JobServerClient,
        commands: mpsc::Receiver<AgentCommand>,
        status: mpsc::Sender<StatusUpdate>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            page,
            store,
            client,
            commands,
            status,
            settings,
        }
    }

    /// Run until the command channel closes or `shutdown` fires, then close
    /// the page session. Persisted state is left as-is on shutdown so a later
    /// session can resume or stop the run.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Result<(), AgentError> {
        let result = {
            let drive = self.drive();
            tokio::pin!(drive);
            tokio::select! {
                res = &mut drive => res,
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    Ok(())
                }
            }
        };

        if let Err(e) = self.page.close().await {
            warn!("failed to close page session: {}", e);
        }
        result
    }

    async fn drive(&mut self) -> Result<(), AgentError> {
        info!("agent started");
        loop {
            self.drain_commands().await?;
            let state = self.store.load().await?;

            if !state.is_processing {
                // Idle: park until the controller says something.
                match self.commands.recv().await {
                    Some(command) => {
                        self.apply_command(command).await?;
                        continue;
                    }
                    None => {
                        info!("command channel closed, agent exiting");
                        return Ok(());
                    }
                }
            }

            let job_id = match state.active_job_id() {
                Ok(Some(id)) => id,
                Ok(None) | Err(_) => {
                    error!("processing flag set with no job id, aborting run");
                    self.finish(LoopExit::StateInconsistent).await?;
                    continue;
                }
            };

            match self.run_cycle(job_id).await {
                Ok(CycleOutcome::Continue) => {}
                Ok(CycleOutcome::Exit(reason)) => self.finish(reason).await?,
                Err(AgentError::Page(e)) => {
                    // Unrecoverable extraction error: end the run, keep the task.
                    error!("page failure during cycle: {}", e);
                    self.store.clear().await?;
                    self.emit(StatusUpdate::error(format!("Processing aborted: {e}")));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One process-and-advance cycle on the current page.
    async fn run_cycle(&mut self, job_id: i64) -> Result<CycleOutcome, AgentError> {
        if !self
            .page
            .element_exists(&self.settings.profile_container_id)
            .await?
        {
            info!("no profile container on this page, treating as end of list");
            return Ok(CycleOutcome::Exit(LoopExit::EndOfList));
        }

        let profile_html = self
            .page
            .element_html(&self.settings.profile_container_id)
            .await?;
        self.submit(&profile_html, job_id).await;
        tokio::time::sleep(self.settings.step_delay).await;

        if !self.checkpoint().await? {
            return Ok(CycleOutcome::Exit(LoopExit::Stopped));
        }

        if !self
            .page
            .element_exists(&self.settings.next_control_id)
            .await?
        {
            info!("no next page control, treating as end of list");
            return Ok(CycleOutcome::Exit(LoopExit::NextControlMissing));
        }

        let pre_nav_url = self.page.current_url().await?;
        self.page.click(&self.settings.next_control_id).await?;

        let outcome = detector::await_navigation(
            &mut self.page,
            &pre_nav_url,
            &self.settings.profile_container_id,
            &self.settings.detector,
        )
        .await;
        match outcome {
            NavigationOutcome::Completed { polls } => {
                debug!(polls, "next page ready");
            }
            NavigationOutcome::TimedOut { polls } => {
                // Fail-open: the deadline is a liveness fallback, not a failure.
                warn!(polls, "navigation not detected, continuing anyway");
            }
        }

        if !self.checkpoint().await? {
            return Ok(CycleOutcome::Exit(LoopExit::Stopped));
        }
        Ok(CycleOutcome::Continue)
    }

    async fn submit(&mut self, profile_html: &str, job_id: i64) {
        match self.client.submit_profile(profile_html, job_id).await {
            Ok(outcome) if outcome.accepted => {
                info!(job_id, "profile submitted");
                self.emit(StatusUpdate::info("Profile submitted").with_data(outcome.response));
            }
            Ok(outcome) => {
                let message = outcome
                    .response
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Submission rejected by job server")
                    .to_string();
                warn!(job_id, reason = %message, "job server rejected submission");
                self.emit(StatusUpdate::error(message).with_data(outcome.response));
            }
            Err(e) => {
                // Logged, not retried: continued traversal matters more than
                // one lost submission.
                warn!(job_id, "submission failed: {}", e);
                self.emit(StatusUpdate::error(format!("Submission failed: {e}")));
            }
        }
    }

    /// A stop takes effect here and only here: drain the inbox, apply any
    /// commands to the store, then re-read the persisted flag.
    async fn checkpoint(&mut self) -> Result<bool, AgentError> {
        self.drain_commands().await?;
        Ok(self.store.load().await?.is_processing)
    }

    async fn drain_commands(&mut self) -> Result<(), AgentError> {
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command).await?;
        }
        Ok(())
    }

    async fn apply_command(&mut self, command: AgentCommand) -> Result<(), AgentError> {
        match command {
            AgentCommand::Start {
                job_posting_id,
                job_posting,
            } => {
                info!(job_posting_id, "start command received");
                self.store
                    .save(&ProcessingState::running(job_posting_id, job_posting))
                    .await?;
                self.emit(StatusUpdate::info(format!(
                    "Processing started for job posting {job_posting_id}"
                )));
            }
            AgentCommand::Stop {} => {
                info!("stop command received");
                self.store.clear().await?;
            }
        }
        Ok(())
    }

    async fn finish(&mut self, reason: LoopExit) -> Result<(), AgentError> {
        info!(?reason, "processing loop finished");
        self.store.clear().await?;
        let update = if reason.is_error() {
            StatusUpdate::error(reason.notice())
        } else {
            StatusUpdate::info(reason.notice())
        };
        self.emit(update);
        Ok(())
    }

    fn emit(&self, update: StatusUpdate) {
        // Fire-and-forget: status events are ephemeral and lost if nobody
        // is listening or the channel is full.
        let _ = self.status.try_send(update);
    }
}
