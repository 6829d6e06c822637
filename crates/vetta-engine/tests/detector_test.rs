use async_trait::async_trait;
use std::time::Duration;
use vetta_engine::detector::{self, DetectorSettings, NavigationOutcome};
use vetta_engine::page::{DocumentReadyState, HostPage, PageError};

const CONTAINER_ID: &str = "candidateProfileContainer";

/// A page whose post-navigation shape is scripted per probe.
struct ScriptedPage {
    pre_nav_url: String,
    new_url: String,
    /// URL probes answered with the old URL before the change shows up.
    url_changes_after: u32,
    /// Container probes answered false before the element shows up.
    container_after: u32,
    ready: DocumentReadyState,
    url_probe_fails: bool,
    url_probes: u32,
    container_probes: u32,
}

impl ScriptedPage {
    fn new(pre_nav_url: &str, new_url: &str) -> Self {
        Self {
            pre_nav_url: pre_nav_url.to_string(),
            new_url: new_url.to_string(),
            url_changes_after: 0,
            container_after: 0,
            ready: DocumentReadyState::Complete,
            url_probe_fails: false,
            url_probes: 0,
            container_probes: 0,
        }
    }
}

#[async_trait]
impl HostPage for ScriptedPage {
    async fn launch(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    async fn navigate(&mut self, _url: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, PageError> {
        if self.url_probe_fails {
            return Err(PageError::Script("lost page context".into()));
        }
        self.url_probes += 1;
        if self.url_probes > self.url_changes_after {
            Ok(self.new_url.clone())
        } else {
            Ok(self.pre_nav_url.clone())
        }
    }

    async fn ready_state(&mut self) -> Result<DocumentReadyState, PageError> {
        Ok(self.ready)
    }

    async fn element_exists(&mut self, dom_id: &str) -> Result<bool, PageError> {
        assert_eq!(dom_id, CONTAINER_ID);
        self.container_probes += 1;
        Ok(self.container_probes > self.container_after)
    }

    async fn element_html(&mut self, dom_id: &str) -> Result<String, PageError> {
        Err(PageError::MissingElement(dom_id.to_string()))
    }

    async fn click(&mut self, dom_id: &str) -> Result<(), PageError> {
        Err(PageError::MissingElement(dom_id.to_string()))
    }
}

fn fast_settings(max_polls: u32) -> DetectorSettings {
    DetectorSettings {
        poll_interval: Duration::from_millis(1),
        max_polls,
    }
}

#[tokio::test]
async fn resolves_on_first_poll_when_page_is_ready() {
    let mut page = ScriptedPage::new("https://site/page/1", "https://site/page/2");
    let outcome = detector::await_navigation(
        &mut page,
        "https://site/page/1",
        CONTAINER_ID,
        &fast_settings(10),
    )
    .await;
    assert_eq!(outcome, NavigationOutcome::Completed { polls: 1 });
}

#[tokio::test]
async fn waits_for_the_container_to_appear() {
    let mut page = ScriptedPage::new("https://site/page/1", "https://site/page/2");
    page.container_after = 3;
    let outcome = detector::await_navigation(
        &mut page,
        "https://site/page/1",
        CONTAINER_ID,
        &fast_settings(10),
    )
    .await;
    assert_eq!(outcome, NavigationOutcome::Completed { polls: 4 });
}

#[tokio::test]
async fn times_out_when_url_never_changes() {
    let mut page = ScriptedPage::new("https://site/page/1", "https://site/page/1");
    let outcome = detector::await_navigation(
        &mut page,
        "https://site/page/1",
        CONTAINER_ID,
        &fast_settings(5),
    )
    .await;
    // The detector always resolves; a never-changing URL hits the deadline.
    assert_eq!(outcome, NavigationOutcome::TimedOut { polls: 5 });
}

#[tokio::test]
async fn incomplete_document_degrades_to_timeout() {
    let mut page = ScriptedPage::new("https://site/page/1", "https://site/page/2");
    page.ready = DocumentReadyState::Interactive;
    let outcome = detector::await_navigation(
        &mut page,
        "https://site/page/1",
        CONTAINER_ID,
        &fast_settings(5),
    )
    .await;
    assert_eq!(outcome, NavigationOutcome::TimedOut { polls: 5 });
}

#[tokio::test]
async fn probe_errors_count_as_not_ready() {
    let mut page = ScriptedPage::new("https://site/page/1", "https://site/page/2");
    page.url_probe_fails = true;
    let outcome = detector::await_navigation(
        &mut page,
        "https://site/page/1",
        CONTAINER_ID,
        &fast_settings(5),
    )
    .await;
    assert_eq!(outcome, NavigationOutcome::TimedOut { polls: 5 });
}
