use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to build browser config: {0}")]
    Config(String),
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("Failed to prepare user data dir: {0}")]
    Io(#[from] std::io::Error),
    #[error("Browser handler task failed: {0}")]
    Handler(#[from] tokio::task::JoinError),
    #[error("System clock error: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(visible: bool) -> Result<Self, BrowserError> {
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;

        // no_sandbox is needed in docker/CI/restricted environments.
        let mut config_builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(&user_data_dir);
        if visible {
            config_builder = config_builder.with_head();
        }
        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using Chrome binary from CHROME_BIN: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        tracing::info!(visible, "Launching Chromium");
        let config = config_builder.build().map_err(BrowserError::Config)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::debug!("Browser handler task ended");
        });

        let page = browser.new_page("about:blank").await?;
        accept_dialogs(&page).await?;

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    pub async fn close(mut self) -> Result<(), BrowserError> {
        self.browser.close().await?;
        self.handler_task.await?;

        if self.cleanup_user_data_dir {
            if let Some(dir) = &self.user_data_dir {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
                }
            }
        }

        Ok(())
    }
}

/// Auto-accept JavaScript dialogs so an unattended run never stalls on an
/// alert/confirm thrown by the review site.
async fn accept_dialogs(page: &Page) -> Result<(), BrowserError> {
    use chromiumoxide::cdp::browser_protocol::page::{
        EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };

    let mut dialogs = page.event_listener::<EventJavascriptDialogOpening>().await?;
    let page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialogs.next().await {
            tracing::info!("Accepting dialog: {} ({:?})", event.message, event.r#type);
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                tracing::error!("Failed to accept dialog: {}", e);
            }
        }
    });
    Ok(())
}

fn resolve_user_data_dir() -> Result<(PathBuf, bool), BrowserError> {
    if let Ok(dir) = std::env::var("VETTA_USER_DATA_DIR") {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path)?;
        tracing::info!(
            "Using user data dir from VETTA_USER_DATA_DIR: {}",
            path.display()
        );
        return Ok((path, false));
    }

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let unique = format!("vetta-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::debug!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
