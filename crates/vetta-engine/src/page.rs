use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Page session not launched")]
    NotReady,
    #[error("Navigation error: {0}")]
    Navigation(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Element not found: #{0}")]
    MissingElement(String),
    #[error("Page error: {0}")]
    Other(String),
}

/// `document.readyState` as reported by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentReadyState {
    Loading,
    Interactive,
    Complete,
}

impl DocumentReadyState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "complete" => Self::Complete,
            "interactive" => Self::Interactive,
            _ => Self::Loading,
        }
    }
}

/// The seam between the automation and a live page of the review site.
///
/// The DOM contract behind this trait (fixed element ids for the profile
/// container and the next-page control) is external and possibly fragile;
/// implementations surface lookup failures rather than guessing.
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Start the underlying browser session.
    async fn launch(&mut self) -> Result<(), PageError>;

    /// Close the session and clean up resources.
    async fn close(&mut self) -> Result<(), PageError>;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// The current page URL; snapshotted before triggering navigation.
    async fn current_url(&mut self) -> Result<String, PageError>;

    /// The document's load state.
    async fn ready_state(&mut self) -> Result<DocumentReadyState, PageError>;

    /// Whether an element with the given id exists in the current DOM.
    async fn element_exists(&mut self, dom_id: &str) -> Result<bool, PageError>;

    /// Raw inner markup of the element with the given id.
    async fn element_html(&mut self, dom_id: &str) -> Result<String, PageError>;

    /// Activate (click) the element with the given id.
    async fn click(&mut self, dom_id: &str) -> Result<(), PageError>;
}
