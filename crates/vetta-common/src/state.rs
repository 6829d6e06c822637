use crate::protocol::JobPosting;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("processing is active but no job posting id is recorded")]
    MissingJobId,
}

/// The persisted record that coordinates the controller and the page agent.
///
/// Persistence is the only synchronization point between the two contexts:
/// in-memory agent state is lost on every page navigation, so the agent
/// rehydrates from this record at every cycle head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub is_processing: bool,
    pub processing_job_id: Option<i64>,
    pub selected_job_posting: Option<JobPosting>,
}

impl ProcessingState {
    /// State written when a run starts.
    pub fn running(job_id: i64, posting: Option<JobPosting>) -> Self {
        Self {
            is_processing: true,
            processing_job_id: Some(job_id),
            selected_job_posting: posting,
        }
    }

    /// Cleared state, written on stop and on every terminal loop exit.
    pub fn idle() -> Self {
        Self::default()
    }

    /// The job id to process, if a run is active.
    ///
    /// A running state with no job id is a fatal inconsistency: callers must
    /// abort the cycle and clear persisted state.
    pub fn active_job_id(&self) -> Result<Option<i64>, StateError> {
        if !self.is_processing {
            return Ok(None);
        }
        match self.processing_job_id {
            Some(id) => Ok(Some(id)),
            None => Err(StateError::MissingJobId),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_state_has_no_active_job() {
        assert_eq!(ProcessingState::idle().active_job_id().unwrap(), None);
    }

    #[test]
    fn running_state_exposes_its_job_id() {
        let state = ProcessingState::running(42, None);
        assert_eq!(state.active_job_id().unwrap(), Some(42));
    }

    #[test]
    fn processing_without_job_id_is_an_error() {
        let state = ProcessingState {
            is_processing: true,
            processing_job_id: None,
            selected_job_posting: None,
        };
        assert!(matches!(
            state.active_job_id(),
            Err(StateError::MissingJobId)
        ));
    }
}
