use serde::{Deserialize, Serialize};

/// A job posting as returned by the job server. Field names match the server
/// JSON exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    pub job_title: String,
    pub job_location: String,
    pub post_url: String,
    pub job_description: String,
    pub assessment_test_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Envelope for `GET /job-postings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPostingsResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<JobPosting>>,
}

/// Body for `POST /indeed-applicant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Raw inner markup of the profile container.
    pub profile: String,
    pub job_posting_id: i64,
}

/// Commands sent from the controller to the page agent.
///
/// At-most-once delivery: the agent drains its inbox only at checkpoints, so
/// a command racing an in-flight cycle may be observed one cycle late.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentCommand {
    Start {
        job_posting_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        job_posting: Option<JobPosting>,
    },
    Stop {},
}

/// Ephemeral agent-to-controller event. Lost if nobody is listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub message: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StatusUpdate {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
