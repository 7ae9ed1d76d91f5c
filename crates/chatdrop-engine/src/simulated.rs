//! In-process backend over [`MemoryDocument`] pages.
//!
//! Tabs are documents produced by a page factory; loading completes after a
//! configurable delay. Injector passes run under the document lock, so each
//! one is a single uninterrupted pass like a real page evaluation.

use crate::backend::{Backend, BackendError};
use crate::dom::memory::MemoryDocument;
use crate::injector::run_injector;
use crate::insertion::verify_insertion;
use async_trait::async_trait;
use chatdrop_common::protocol::{InsertionReport, TabEvent, TabId, TabStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub type SharedDocument = Arc<Mutex<MemoryDocument>>;

type PageFactory = Box<dyn Fn(&str) -> MemoryDocument + Send + Sync>;

const TAB_EVENT_CAPACITY: usize = 64;
const VERIFY_DELAY: Duration = Duration::from_millis(300);

pub struct SimulatedBackend {
    factory: PageFactory,
    events: broadcast::Sender<TabEvent>,
    tabs: HashMap<TabId, SharedDocument>,
    next_tab: u32,
    load_delay: Duration,
    abandon_loads: bool,
    ready: bool,
}

impl SimulatedBackend {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> MemoryDocument + Send + Sync + 'static,
    {
        let (events, _) = broadcast::channel(TAB_EVENT_CAPACITY);
        Self {
            factory: Box::new(factory),
            events,
            tabs: HashMap::new(),
            next_tab: 1,
            load_delay: Duration::from_millis(100),
            abandon_loads: false,
            ready: false,
        }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Opened tabs are closed by the user before they finish loading.
    pub fn abandoning_loads(mut self) -> Self {
        self.abandon_loads = true;
        self
    }

    /// Adds an already-loaded tab, e.g. the page a selection is read from.
    pub fn add_tab(&mut self, document: MemoryDocument) -> TabId {
        let tab = self.allocate_tab();
        self.tabs.insert(tab, Arc::new(Mutex::new(document)));
        tab
    }

    pub fn document(&self, tab: TabId) -> Option<SharedDocument> {
        self.tabs.get(&tab).cloned()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn close_tab(&mut self, tab: TabId) {
        if self.tabs.remove(&tab).is_some() {
            let _ = self.events.send(TabEvent::new(tab, TabStatus::Closed));
        }
    }

    fn allocate_tab(&mut self) -> TabId {
        let tab = TabId(self.next_tab);
        self.next_tab += 1;
        tab
    }

    fn tab(&self, tab: TabId) -> Result<&SharedDocument, BackendError> {
        self.tabs.get(&tab).ok_or(BackendError::TabNotFound(tab))
    }
}

fn lock(document: &SharedDocument) -> Result<MutexGuard<'_, MemoryDocument>, BackendError> {
    document
        .lock()
        .map_err(|_| BackendError::Other("document lock poisoned".into()))
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching simulated backend");
        self.ready = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        let tabs: Vec<TabId> = self.tabs.keys().copied().collect();
        for tab in tabs {
            self.close_tab(tab);
        }
        self.ready = false;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready
    }

    fn subscribe_tabs(&self) -> Result<broadcast::Receiver<TabEvent>, BackendError> {
        Ok(self.events.subscribe())
    }

    async fn open_tab(&mut self, url: &str) -> Result<TabId, BackendError> {
        if !self.ready {
            return Err(BackendError::NotReady);
        }
        let tab = self.allocate_tab();
        self.tabs
            .insert(tab, Arc::new(Mutex::new((self.factory)(url))));
        let _ = self.events.send(TabEvent::new(tab, TabStatus::Loading));

        if self.abandon_loads {
            self.close_tab(tab);
            return Ok(tab);
        }

        let events = self.events.clone();
        let delay = self.load_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(TabEvent::new(tab, TabStatus::Complete));
        });
        Ok(tab)
    }

    async fn read_selection(&mut self, tab: TabId) -> Result<String, BackendError> {
        let document = self.tab(tab)?;
        let guard = lock(document)?;
        Ok(guard.selection_text())
    }

    async fn insert_text(
        &mut self,
        tab: TabId,
        text: &str,
        locators: &[String],
    ) -> Result<InsertionReport, BackendError> {
        let document = self.tab(tab)?.clone();
        let run = {
            let mut guard = lock(&document)?;
            run_injector(&mut *guard, text, locators)
        };

        if let Some(target) = run.target.clone().filter(|_| run.report.inserted) {
            let text = text.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(VERIFY_DELAY).await;
                if let Ok(guard) = document.lock() {
                    verify_insertion(&*guard, &target, &text);
                }
            });
        }

        debug!("Injector report for tab {}: {:?}", tab, run.report);
        Ok(run.report)
    }

    async fn notify(&mut self, tab: TabId, message: &str) -> Result<(), BackendError> {
        let document = self.tab(tab)?;
        lock(document)?.log_to_console(message);
        Ok(())
    }
}
