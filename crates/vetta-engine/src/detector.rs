//! Navigation-completion detection.
//!
//! After the agent clicks the next-page control it has no event telling it
//! when the new page is ready; it polls. The detector resolves, never
//! rejects: if readiness is not observed within the deadline it reports
//! `TimedOut` and callers proceed anyway (fail-open), since blocking forever
//! would stall the whole run on any page that does not match the expected
//! post-navigation shape.

use crate::page::{DocumentReadyState, HostPage};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// URL changed, the container is present, and the document is complete.
    Completed { polls: u32 },
    /// The deadline elapsed without observing readiness.
    TimedOut { polls: u32 },
}

/// Poll until the page looks ready to query, or the deadline elapses.
///
/// Ready means: the URL differs from `pre_nav_url`, the profile container
/// exists in the new DOM, and `document.readyState` is complete. Probe
/// errors mid-poll count as "not ready yet" and degrade to the timeout
/// path; no distinction is made between "navigation never happened" and
/// "navigation happened but the page differs from expectations".
pub async fn await_navigation<P: HostPage + ?Sized>(
    page: &mut P,
    pre_nav_url: &str,
    container_id: &str,
    settings: &DetectorSettings,
) -> NavigationOutcome {
    for poll in 1..=settings.max_polls {
        tokio::time::sleep(settings.poll_interval).await;

        if page_ready(page, pre_nav_url, container_id).await {
            debug!(polls = poll, "navigation completed");
            return NavigationOutcome::Completed { polls: poll };
        }
    }

    debug!(
        polls = settings.max_polls,
        "navigation detection timed out, proceeding anyway"
    );
    NavigationOutcome::TimedOut {
        polls: settings.max_polls,
    }
}

async fn page_ready<P: HostPage + ?Sized>(
    page: &mut P,
    pre_nav_url: &str,
    container_id: &str,
) -> bool {
    let url_changed = match page.current_url().await {
        Ok(url) => url != pre_nav_url,
        Err(_) => false,
    };
    if !url_changed {
        return false;
    }

    let container_present = page.element_exists(container_id).await.unwrap_or(false);
    if !container_present {
        return false;
    }

    matches!(page.ready_state().await, Ok(DocumentReadyState::Complete))
}
