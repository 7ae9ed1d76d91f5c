use async_trait::async_trait;
pub use chatdrop_common::error::BackendError;
use chatdrop_common::protocol::{InsertionReport, TabEvent, TabId};
use tokio::sync::broadcast;

/// A browser host the dispatcher drives.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the backend (start browser, connect to remote, etc.)
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the backend and cleanup resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to open tabs.
    async fn is_ready(&self) -> bool;

    /// Subscribe to tab lifecycle events. Subscribe before opening a tab so its
    /// completion event cannot be missed.
    fn subscribe_tabs(&self) -> Result<broadcast::Receiver<TabEvent>, BackendError>;

    /// Open a new tab on `url`. Returns once the tab exists; loading continues
    /// in the background and is reported through [`Backend::subscribe_tabs`].
    async fn open_tab(&mut self, url: &str) -> Result<TabId, BackendError>;

    /// Current text selection of the tab's page.
    async fn read_selection(&mut self, tab: TabId) -> Result<String, BackendError>;

    /// Run one injector pass inside the tab's page.
    async fn insert_text(
        &mut self,
        tab: TabId,
        text: &str,
        locators: &[String],
    ) -> Result<InsertionReport, BackendError>;

    /// Write a passive notice to the page console.
    async fn notify(&mut self, tab: TabId, message: &str) -> Result<(), BackendError>;
}
