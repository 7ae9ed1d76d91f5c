use crate::cdp::CdpClient;
use crate::inject;
use async_trait::async_trait;
use chatdrop_engine::backend::{Backend, BackendError};
use chatdrop_engine::config::schema::{BrowserConfig, TimingConfig};
use chatdrop_engine::protocol::{InsertionReport, TabEvent, TabId, TabStatus};
use chromiumoxide::Page;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{info, warn};

const TAB_EVENT_CAPACITY: usize = 64;

/// Chromium driven over CDP, headless unless configured visible.
pub struct HeadlessBackend {
    client: Option<CdpClient>,
    browser: BrowserConfig,
    timing: TimingConfig,
    pages: HashMap<TabId, Page>,
    next_tab: u32,
    events: broadcast::Sender<TabEvent>,
}

impl HeadlessBackend {
    pub fn new(browser: BrowserConfig, timing: TimingConfig) -> Self {
        let (events, _) = broadcast::channel(TAB_EVENT_CAPACITY);
        Self {
            client: None,
            browser,
            timing,
            pages: HashMap::new(),
            next_tab: 1,
            events,
        }
    }

    pub fn page(&self, tab: TabId) -> Option<&Page> {
        self.pages.get(&tab)
    }

    fn page_for(&self, tab: TabId) -> Result<&Page, BackendError> {
        if self.client.is_none() {
            return Err(BackendError::NotReady);
        }
        self.pages.get(&tab).ok_or(BackendError::TabNotFound(tab))
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        let client = CdpClient::launch(&self.browser)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        for tab in self.pages.keys() {
            let _ = self.events.send(TabEvent::new(*tab, TabStatus::Closed));
        }
        self.pages.clear();
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    fn subscribe_tabs(&self) -> Result<broadcast::Receiver<TabEvent>, BackendError> {
        Ok(self.events.subscribe())
    }

    async fn open_tab(&mut self, url: &str) -> Result<TabId, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let page = client
            .new_page()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let tab = TabId(self.next_tab);
        self.next_tab += 1;
        self.pages.insert(tab, page.clone());
        let _ = self.events.send(TabEvent::new(tab, TabStatus::Loading));

        info!("Navigating tab {} to: {}", tab, url);
        let events = self.events.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            // Chrome reports error pages as loaded too; the retry loop absorbs
            // whatever the page turns out to be.
            if let Err(e) = page.goto(url.as_str()).await {
                warn!("Navigation of tab {} to {} failed: {}", tab, url, e);
            }
            let _ = events.send(TabEvent::new(tab, TabStatus::Complete));
        });

        Ok(tab)
    }

    async fn read_selection(&mut self, tab: TabId) -> Result<String, BackendError> {
        let page = self.page_for(tab)?;
        inject::read_selection(page, self.timing.evaluation_timeout()).await
    }

    async fn insert_text(
        &mut self,
        tab: TabId,
        text: &str,
        locators: &[String],
    ) -> Result<InsertionReport, BackendError> {
        let page = self.page_for(tab)?;
        inject::run_injector(
            page,
            text,
            locators,
            self.timing.verify_delay_ms,
            self.timing.evaluation_timeout(),
        )
        .await
    }

    async fn notify(&mut self, tab: TabId, message: &str) -> Result<(), BackendError> {
        let page = self.page_for(tab)?;
        inject::show_notice(page, message, self.timing.evaluation_timeout()).await
    }
}
