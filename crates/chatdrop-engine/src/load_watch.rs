//! Single-use wait for one tab to finish loading.
//!
//! The subscription is taken before the tab exists ([`PendingLoadWatch`]),
//! bound to the tab id once it is known, and dropped after the first matching
//! event. Consuming `wait(self)` makes a second wait impossible.

use chatdrop_common::protocol::{TabEvent, TabId, TabStatus};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("Tab {0} was closed before it finished loading")]
    Closed(TabId),
    #[error("Tab event stream ended while waiting for tab {0}")]
    StreamEnded(TabId),
}

/// A tab-event subscription not yet tied to a tab.
pub struct PendingLoadWatch {
    events: broadcast::Receiver<TabEvent>,
}

impl PendingLoadWatch {
    pub fn new(events: broadcast::Receiver<TabEvent>) -> Self {
        Self { events }
    }

    pub fn bind(self, tab: TabId) -> LoadWatch {
        LoadWatch {
            tab,
            events: self.events,
        }
    }
}

pub struct LoadWatch {
    tab: TabId,
    events: broadcast::Receiver<TabEvent>,
}

impl LoadWatch {
    /// Resolves on the first `Complete` event for this tab.
    pub async fn wait(mut self) -> Result<(), WatchError> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.tab != self.tab => continue,
                Ok(event) => match event.status {
                    TabStatus::Complete => {
                        debug!("Tab {} finished loading", self.tab);
                        return Ok(());
                    }
                    TabStatus::Closed => return Err(WatchError::Closed(self.tab)),
                    TabStatus::Loading => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Load watch for tab {} skipped {} tab events",
                        self.tab, skipped
                    );
                }
                Err(RecvError::Closed) => return Err(WatchError::StreamEnded(self.tab)),
            }
        }
    }
}
