use chatdrop_engine::config::schema::BrowserConfig as BrowserOptions;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

type CdpResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(options: &BrowserOptions) -> CdpResult<Self> {
        let mut config_builder = BrowserConfig::builder();
        config_builder = config_builder.no_sandbox(); // Often needed in docker/CI/restricted envs
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir(options)?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if options.visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Some(chrome_bin) = resolve_chrome_bin(options) {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin.display());
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                    continue;
                }
            }
            tracing::info!("Browser handler task ended");
        });

        Ok(Self {
            browser,
            handler_task,
            user_data_dir,
            cleanup_user_data_dir,
        })
    }

    pub async fn new_page(&self) -> CdpResult<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;
        attach_page_listeners(&page).await?;
        Ok(page)
    }

    pub async fn close(mut self) -> CdpResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;

        if self.cleanup_user_data_dir {
            if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
                tracing::debug!(
                    "Failed to clean up user-data-dir {}: {}",
                    self.user_data_dir.display(),
                    e
                );
            }
        }

        Ok(())
    }
}

/// Forward page console output into the log and auto-accept JavaScript dialogs,
/// which would otherwise block every later evaluation in the tab.
async fn attach_page_listeners(page: &Page) -> CdpResult<()> {
    let mut console_events = page
        .event_listener::<chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled>()
        .await
        .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

    tokio::spawn(async move {
        while let Some(event) = console_events.next().await {
            let args_str: Vec<String> = event
                .args
                .iter()
                .map(|arg| {
                    arg.value
                        .as_ref()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .or_else(|| arg.description.clone())
                        .unwrap_or_else(|| "unknown".to_string())
                })
                .collect();
            tracing::info!("Page console [{:?}]: {}", event.r#type, args_str.join(" "));
        }
    });

    let mut dialog_events = page
        .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
        .await
        .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

    let page_clone = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialog_events.next().await {
            tracing::info!(
                "Handling JavaScript Dialog: {} ({:?})",
                event.message,
                event.r#type
            );
            let cmd =
                chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(true);
            if let Err(e) = page_clone.execute(cmd).await {
                tracing::error!("Failed to handle/accept dialog: {}", e);
            }
        }
    });

    Ok(())
}

fn resolve_chrome_bin(options: &BrowserOptions) -> Option<PathBuf> {
    options
        .chrome_bin
        .clone()
        .or_else(|| std::env::var("CHROME_BIN").ok().map(PathBuf::from))
}

/// Configured or `CHATDROP_USER_DATA_DIR` profiles are kept (so a signed-in
/// session survives); otherwise an isolated temporary profile is removed on close.
fn resolve_user_data_dir(options: &BrowserOptions) -> CdpResult<(PathBuf, bool)> {
    let configured = options.user_data_dir.clone().or_else(|| {
        std::env::var("CHATDROP_USER_DATA_DIR")
            .ok()
            .map(PathBuf::from)
    });
    if let Some(path) = configured {
        std::fs::create_dir_all(&path)?;
        tracing::info!("Using user data dir: {}", path.display());
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}", e))?
        .as_nanos();
    let unique = format!("chatdrop-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
