//! The controller session: the interactive counterpart of the page agent.
//!
//! Stateless across its own open/close cycles: presentation is derived from
//! persisted processing state plus a fresh job-postings fetch on open.

use chrono::Local;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use vetta_engine::client::JobServerClient;
use vetta_engine::protocol::{AgentCommand, JobPosting, StatusUpdate};
use vetta_engine::state::ProcessingState;
use vetta_engine::store::StateStore;

pub struct Session<S: StateStore> {
    client: JobServerClient,
    store: S,
    commands: mpsc::Sender<AgentCommand>,
    status: mpsc::Receiver<StatusUpdate>,
    postings: Vec<JobPosting>,
}

impl<S: StateStore> Session<S> {
    pub fn new(
        client: JobServerClient,
        store: S,
        commands: mpsc::Sender<AgentCommand>,
        status: mpsc::Receiver<StatusUpdate>,
    ) -> Self {
        Self {
            client,
            store,
            commands,
            status,
            postings: Vec::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("vetta - applicant review automation");
        self.load_postings().await;
        self.print_presentation().await;

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin).lines();

        loop {
            print!("> ");
            io::stdout().flush()?;

            tokio::select! {
                line = reader.next_line() => {
                    match line? {
                        Some(input) => {
                            let input = input.trim();
                            if input.is_empty() {
                                continue;
                            }
                            if input == "exit" || input == "quit" {
                                break;
                            }
                            self.handle_command(input).await;
                        }
                        None => break, // EOF
                    }
                }
                update = self.status.recv() => {
                    match update {
                        Some(update) => render_status(&update),
                        None => {
                            warn!("agent ended, closing session");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, input: &str) {
        let mut parts = input.split_whitespace();
        match parts.next() {
            Some("jobs") => self.load_postings().await,
            Some("start") => self.start(parts.next()).await,
            Some("stop") => self.stop().await,
            Some("status") => self.print_state().await,
            Some("help") => print_help(),
            _ => println!("Unknown command: {input}. Type 'help' for commands."),
        }
    }

    async fn load_postings(&mut self) {
        match self.client.fetch_job_postings().await {
            Ok(postings) => {
                println!("Job postings:");
                for job in &postings {
                    println!("  {}  {} ({})", job.id, job.job_title, job.job_location);
                }
                self.postings = postings;
            }
            Err(e) => {
                // Recoverable: the next 'jobs' is the retry.
                println!("Failed to load job postings: {e}");
                println!("Type 'jobs' to retry.");
            }
        }
    }

    async fn start(&mut self, arg: Option<&str>) {
        let Some(raw) = arg else {
            println!("Select a job posting first: start <id>");
            return;
        };
        let Ok(job_id) = raw.parse::<i64>() else {
            println!("Invalid job posting id: {raw}");
            return;
        };
        let Some(posting) = self.postings.iter().find(|p| p.id == job_id).cloned() else {
            println!("Unknown job posting id {job_id}. Type 'jobs' to refresh the list.");
            return;
        };

        // Persist before messaging: the store, not the message, is what the
        // agent trusts at its checkpoints.
        let state = ProcessingState::running(job_id, Some(posting.clone()));
        if let Err(e) = self.store.save(&state).await {
            println!("Failed to persist processing state: {e}");
            return;
        }
        if self
            .commands
            .try_send(AgentCommand::Start {
                job_posting_id: job_id,
                job_posting: Some(posting.clone()),
            })
            .is_err()
        {
            warn!("start command not delivered");
        }
        println!(
            "Processing started for \"{}\" ({}). Type 'stop' to halt.",
            posting.job_title, posting.job_location
        );
    }

    async fn stop(&mut self) {
        if self.commands.try_send(AgentCommand::Stop {}).is_err() {
            warn!("stop command not delivered");
        }
        if let Err(e) = self.store.clear().await {
            println!("Failed to clear processing state: {e}");
            return;
        }
        println!("Stop requested. The current cycle finishes before it takes effect.");
    }

    async fn print_state(&mut self) {
        match self.store.load().await {
            Ok(state) if state.is_processing => {
                let title = state
                    .selected_job_posting
                    .as_ref()
                    .map(|p| format!(" ({})", p.job_title))
                    .unwrap_or_default();
                println!(
                    "Running: job posting {}{}",
                    state
                        .processing_job_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "?".into()),
                    title
                );
            }
            Ok(_) => println!("Idle."),
            Err(e) => println!("Failed to read processing state: {e}"),
        }
    }

    async fn print_presentation(&mut self) {
        match self.store.load().await {
            Ok(state) if state.is_processing => {
                println!(
                    "A run is active (job posting {}). Type 'stop' to halt it.",
                    state
                        .processing_job_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "?".into())
                );
            }
            Ok(_) => println!("Type 'start <id>' to begin, 'help' for commands."),
            Err(e) => warn!("failed to read processing state: {}", e),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  jobs         refresh the job posting list");
    println!("  start <id>   start processing for a job posting");
    println!("  stop         stop the current run");
    println!("  status       show persisted processing state");
    println!("  exit | quit  end the session");
}

fn render_status(update: &StatusUpdate) {
    let ts = Local::now().format("%H:%M:%S");
    let detail = update.data.as_ref().and_then(summarize_submission);
    match (update.is_error, detail) {
        (true, _) => println!("\n[{ts}] ERROR {}", update.message),
        (false, Some(detail)) => println!("\n[{ts}] {} - {detail}", update.message),
        (false, None) => println!("\n[{ts}] {}", update.message),
    }
}

/// Pull applicant/job summary fields out of the echoed server response.
/// The shape is assumed, not validated; anything missing is simply omitted.
fn summarize_submission(data: &serde_json::Value) -> Option<String> {
    let payload = data.get("data")?;
    let applicant = payload
        .get("applicant")
        .and_then(|a| a.get("name"))
        .and_then(|n| n.as_str());
    let job = payload
        .get("jobPosting")
        .and_then(|j| j.get("job_title"))
        .and_then(|t| t.as_str());
    match (applicant, job) {
        (Some(applicant), Some(job)) => Some(format!("{applicant} for {job}")),
        (Some(applicant), None) => Some(applicant.to_string()),
        (None, Some(job)) => Some(job.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use vetta_engine::store::{MemoryStore, StoreError};

    fn sample_posting(id: i64) -> JobPosting {
        JobPosting {
            id,
            job_title: "Engineer".into(),
            job_location: "Remote".into(),
            post_url: format!("https://example.com/jobs/{id}"),
            job_description: "desc".into(),
            assessment_test_id: "t-1".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
        }
    }

    fn test_session<S: StateStore>(
        store: S,
        cmd_tx: mpsc::Sender<AgentCommand>,
    ) -> Session<S> {
        let (_status_tx, status_rx) = mpsc::channel(1);
        let client = JobServerClient::new("http://localhost:3000").unwrap();
        Session::new(client, store, cmd_tx, status_rx)
    }

    /// Flags whether a command was already in the channel when `save` ran.
    #[derive(Clone)]
    struct SequencedStore {
        inner: MemoryStore,
        commands: Arc<Mutex<mpsc::Receiver<AgentCommand>>>,
        command_arrived_first: Arc<AtomicBool>,
    }

    #[async_trait]
    impl StateStore for SequencedStore {
        async fn load(&self) -> Result<ProcessingState, StoreError> {
            self.inner.load().await
        }

        async fn save(&self, state: &ProcessingState) -> Result<(), StoreError> {
            if self.commands.lock().unwrap().try_recv().is_ok() {
                self.command_arrived_first.store(true, Ordering::SeqCst);
            }
            self.inner.save(state).await
        }
    }

    #[tokio::test]
    async fn start_rejects_missing_unknown_and_malformed_ids() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let store = MemoryStore::new();
        let mut session = test_session(store.clone(), cmd_tx);
        session.postings = vec![sample_posting(1)];

        session.start(None).await;
        session.start(Some("999")).await;
        session.start(Some("one")).await;

        // Nothing persisted, nothing sent.
        assert!(!store.load().await.unwrap().is_processing);
        assert!(cmd_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn start_persists_state_before_sending_the_command() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let commands = Arc::new(Mutex::new(cmd_rx));
        let store = SequencedStore {
            inner: MemoryStore::new(),
            commands: commands.clone(),
            command_arrived_first: Arc::new(AtomicBool::new(false)),
        };
        let mut session = test_session(store.clone(), cmd_tx);
        session.postings = vec![sample_posting(1)];

        session.start(Some("1")).await;

        // The store, not the message, is what the agent trusts; the write
        // must land before the command is observable.
        assert!(!store.command_arrived_first.load(Ordering::SeqCst));

        let state = store.inner.load().await.unwrap();
        assert!(state.is_processing);
        assert_eq!(state.processing_job_id, Some(1));
        assert_eq!(state.selected_job_posting.as_ref().map(|p| p.id), Some(1));

        match commands.lock().unwrap().try_recv() {
            Ok(AgentCommand::Start {
                job_posting_id,
                job_posting,
            }) => {
                assert_eq!(job_posting_id, 1);
                assert_eq!(
                    job_posting.map(|p| p.job_title),
                    Some("Engineer".to_string())
                );
            }
            other => panic!("expected start command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_sends_the_command_and_clears_state() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let store = MemoryStore::seeded(ProcessingState::running(1, Some(sample_posting(1))));
        let mut session = test_session(store.clone(), cmd_tx);

        session.stop().await;

        assert!(matches!(cmd_rx.try_recv(), Ok(AgentCommand::Stop {})));
        assert_eq!(store.load().await.unwrap(), ProcessingState::idle());
    }

    #[test]
    fn summarizes_applicant_and_job_fields() {
        let data = json!({
            "success": true,
            "data": {
                "applicant": {"name": "Jane"},
                "jobPosting": {"job_title": "Engineer"}
            }
        });
        assert_eq!(
            summarize_submission(&data).as_deref(),
            Some("Jane for Engineer")
        );
    }

    #[test]
    fn tolerates_partial_response_shapes() {
        let only_applicant = json!({"data": {"applicant": {"name": "Jane"}}});
        assert_eq!(summarize_submission(&only_applicant).as_deref(), Some("Jane"));

        let nothing_useful = json!({"data": {"unexpected": true}});
        assert_eq!(summarize_submission(&nothing_useful), None);

        let no_data = json!({"success": true});
        assert_eq!(summarize_submission(&no_data), None);
    }
}
