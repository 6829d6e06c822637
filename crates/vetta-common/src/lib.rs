pub mod protocol;
pub mod state;

pub use protocol::{AgentCommand, JobPosting, JobPostingsResponse, StatusUpdate, SubmitRequest};
pub use state::{ProcessingState, StateError};
