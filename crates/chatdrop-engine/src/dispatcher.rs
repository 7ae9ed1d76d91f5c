//! Entry points: context-menu clicks and toolbar-icon clicks.
//!
//! Each request opens its own tab, waits for it to load, lets the page settle
//! and hands over to the retry loop. Nothing is shared between requests.

use crate::backend::{Backend, BackendError};
use crate::load_watch::PendingLoadWatch;
use crate::retry::{RetryLoop, RetryReport};
use chatdrop_common::config::schema::ChatdropConfig;
use chatdrop_common::protocol::{SEND_MENU_ITEM, TabId};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to open target tab: {0}")]
    OpenTab(#[source] BackendError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A context-menu click as delivered by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuClick {
    pub menu_item_id: String,
    pub selection_text: Option<String>,
}

impl MenuClick {
    pub fn send(selection_text: impl Into<String>) -> Self {
        Self {
            menu_item_id: SEND_MENU_ITEM.id.to_string(),
            selection_text: Some(selection_text.into()),
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// The event was not for us or carried no text.
    Ignored,
    /// The target tab was opened without anything to insert.
    OpenedOnly { tab: TabId },
    /// The tab never reported completion; nothing was attempted.
    LoadFailed { tab: TabId, reason: String },
    /// The retry loop ran to a terminal state.
    Delivered { tab: TabId, report: RetryReport },
}

pub struct Dispatcher {
    config: ChatdropConfig,
    retry: RetryLoop,
}

impl Dispatcher {
    pub fn new(config: ChatdropConfig) -> Self {
        let retry = RetryLoop::from_timing(&config.timing);
        Self { config, retry }
    }

    pub async fn on_context_menu<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        click: &MenuClick,
    ) -> Result<DispatchOutcome, DispatchError> {
        if click.menu_item_id != SEND_MENU_ITEM.id {
            debug!("Ignoring menu item {}", click.menu_item_id);
            return Ok(DispatchOutcome::Ignored);
        }
        let text = click
            .selection_text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            debug!("Ignoring menu click without selected text");
            return Ok(DispatchOutcome::Ignored);
        }
        self.deliver(backend, text).await
    }

    /// Reads the selection of `active_tab` and delivers it, even when empty.
    pub async fn on_icon_clicked<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        active_tab: TabId,
    ) -> Result<DispatchOutcome, DispatchError> {
        let text = match backend.read_selection(active_tab).await {
            Ok(selection) => selection.trim().to_string(),
            Err(e) => {
                warn!("Error getting selected text from tab {}: {}", active_tab, e);
                String::new()
            }
        };
        self.deliver(backend, &text).await
    }

    pub async fn deliver<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !backend.is_ready().await {
            return Err(BackendError::NotReady.into());
        }
        let pending = PendingLoadWatch::new(backend.subscribe_tabs()?);
        let url = self.config.target.primary_url();
        let tab = backend
            .open_tab(url)
            .await
            .map_err(DispatchError::OpenTab)?;
        info!("Opened {} in tab {}", url, tab);

        if text.is_empty() {
            return Ok(DispatchOutcome::OpenedOnly { tab });
        }

        if let Err(e) = pending.bind(tab).wait().await {
            warn!("{}", e);
            return Ok(DispatchOutcome::LoadFailed {
                tab,
                reason: e.to_string(),
            });
        }

        // Let the page's own scripts finish initializing.
        tokio::time::sleep(self.config.timing.settle_delay()).await;

        let report = self
            .retry
            .run(backend, tab, text, &self.config.locators)
            .await;
        Ok(DispatchOutcome::Delivered { tab, report })
    }
}
