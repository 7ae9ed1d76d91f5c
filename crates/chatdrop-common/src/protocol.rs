//! Types that cross the boundary between the host process and the page.
//!
//! The page-side injector answers every evaluation with an [`InsertionReport`]
//! serialized as JSON, so field names here are the wire names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a browser tab owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    Loading,
    Complete,
    Closed,
}

/// Tab lifecycle notification published by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabEvent {
    pub tab: TabId,
    pub status: TabStatus,
}

impl TabEvent {
    pub fn new(tab: TabId, status: TabStatus) -> Self {
        Self { tab, status }
    }
}

/// The closed set of element shapes the injector knows how to write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    ContentEditable,
    TextArea,
    PlainInput,
    Other,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::ContentEditable => "contenteditable",
            ElementKind::TextArea => "textarea",
            ElementKind::PlainInput => "input",
            ElementKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// What the page looked like when no input could be found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDiagnostics {
    pub textareas: usize,
    pub content_editables: usize,
    pub url: String,
}

/// Result of a single injector run inside the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionReport {
    pub inserted: bool,
    #[serde(default)]
    pub locator: Option<String>,
    #[serde(default)]
    pub kind: Option<ElementKind>,
    #[serde(default = "default_authorized")]
    pub authorized: bool,
    /// Set when an element was found but writing into it failed.
    #[serde(default)]
    pub failure: Option<String>,
    /// Set when no element was found.
    #[serde(default)]
    pub diagnostics: Option<PageDiagnostics>,
}

fn default_authorized() -> bool {
    true
}

impl InsertionReport {
    pub fn inserted(locator: impl Into<String>, kind: ElementKind, authorized: bool) -> Self {
        Self {
            inserted: true,
            locator: Some(locator.into()),
            kind: Some(kind),
            authorized,
            failure: None,
            diagnostics: None,
        }
    }

    pub fn not_found(diagnostics: PageDiagnostics, authorized: bool) -> Self {
        Self {
            inserted: false,
            locator: None,
            kind: None,
            authorized,
            failure: None,
            diagnostics: Some(diagnostics),
        }
    }

    pub fn failed(
        locator: impl Into<String>,
        kind: ElementKind,
        authorized: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            inserted: false,
            locator: Some(locator.into()),
            kind: Some(kind),
            authorized,
            failure: Some(reason.into()),
            diagnostics: None,
        }
    }
}

/// Context-menu entry a front end registers to offer the send action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: &'static str,
    pub title: &'static str,
    pub contexts: &'static [&'static str],
}

pub const SEND_MENU_ITEM: MenuItem = MenuItem {
    id: "send-to-chatgpt",
    title: "Send selected text to ChatGPT",
    contexts: &["selection"],
};
