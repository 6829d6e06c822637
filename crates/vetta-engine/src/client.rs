use thiserror::Error;
use url::Url;
use vetta_common::protocol::{JobPosting, JobPostingsResponse, SubmitRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid job server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Job server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Job server error: {0}")]
    Server(String),
}

/// The result of a profile submission.
///
/// The server's response body is echoed as-is into status events; the shape
/// `{success, message, data: {applicant, jobPosting}}` is assumed when
/// rendering details but never validated strictly.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The envelope's `success` field; false is a soft failure.
    pub accepted: bool,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct JobServerClient {
    http: reqwest::Client,
    base: Url,
}

impl JobServerClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `GET {base}/job-postings`.
    pub async fn fetch_job_postings(&self) -> Result<Vec<JobPosting>, ClientError> {
        let url = self.base.join("job-postings")?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JobPostingsResponse = response.json().await?;
        if !envelope.success {
            return Err(ClientError::Server(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Server("No job postings found".into()))
    }

    /// `POST {base}/indeed-applicant` with the extracted profile markup.
    ///
    /// Transport and HTTP-level failures are hard errors; a 2xx response with
    /// `success: false` is a soft failure reported through `accepted`.
    pub async fn submit_profile(
        &self,
        profile_html: &str,
        job_posting_id: i64,
    ) -> Result<SubmitOutcome, ClientError> {
        let url = self.base.join("indeed-applicant")?;
        let body = SubmitRequest {
            profile: profile_html.to_string(),
            job_posting_id,
        };

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response.json().await?;
        let accepted = value
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(SubmitOutcome {
            accepted,
            response: value,
        })
    }
}
