use crate::cdp::CdpClient;
use async_trait::async_trait;
use tracing::info;
use vetta_engine::page::{DocumentReadyState, HostPage, PageError};

/// `HostPage` over a CDP-driven Chromium session.
///
/// DOM probes go through JavaScript evaluation in the page context, the same
/// `document.getElementById` contract the review site is expected to expose.
pub struct HeadlessPage {
    client: Option<CdpClient>,
    visible: bool,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self {
            client: None,
            visible: false,
        }
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            client: None,
            visible,
        }
    }

    fn client(&self) -> Result<&CdpClient, PageError> {
        self.client.as_ref().ok_or(PageError::NotReady)
    }

    async fn evaluate(&self, expr: &str) -> Result<serde_json::Value, PageError> {
        let client = self.client()?;
        let result = client
            .page
            .evaluate(expr)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| PageError::Script(e.to_string()))
    }
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

// Element ids come from config; quote them as JSON strings so the probe
// expressions stay well-formed whatever the id contains.
fn js_string(raw: &str) -> String {
    serde_json::Value::String(raw.to_string()).to_string()
}

#[async_trait]
impl HostPage for HeadlessPage {
    async fn launch(&mut self) -> Result<(), PageError> {
        info!("Launching Chromium session...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| PageError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| PageError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        let client = self.client()?;
        info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| PageError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, PageError> {
        let client = self.client()?;
        let url = client
            .page
            .url()
            .await
            .map_err(|e| PageError::Navigation(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn ready_state(&mut self) -> Result<DocumentReadyState, PageError> {
        let value = self.evaluate("document.readyState").await?;
        Ok(DocumentReadyState::parse(value.as_str().unwrap_or("")))
    }

    async fn element_exists(&mut self, dom_id: &str) -> Result<bool, PageError> {
        let expr = format!(
            "document.getElementById({}) !== null",
            js_string(dom_id)
        );
        let value = self.evaluate(&expr).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn element_html(&mut self, dom_id: &str) -> Result<String, PageError> {
        let expr = format!(
            "(() => {{ const el = document.getElementById({}); return el ? el.innerHTML : null; }})()",
            js_string(dom_id)
        );
        let value = self.evaluate(&expr).await?;
        match value {
            serde_json::Value::String(html) => Ok(html),
            _ => Err(PageError::MissingElement(dom_id.to_string())),
        }
    }

    async fn click(&mut self, dom_id: &str) -> Result<(), PageError> {
        let expr = format!(
            "(() => {{ const el = document.getElementById({}); if (el) {{ el.click(); return true; }} return false; }})()",
            js_string(dom_id)
        );
        let value = self.evaluate(&expr).await?;
        if value.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(PageError::MissingElement(dom_id.to_string()))
        }
    }
}
