//! Document abstraction the injector runs against.
//!
//! Every call is synchronous: one injector pass runs to completion without
//! yielding, the same way it does inside a single page evaluation.

pub mod memory;
pub mod selector;

use chatdrop_common::protocol::ElementKind;
use thiserror::Error;

/// Index of an element within its document.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
    #[error("Node {0} does not exist or is detached")]
    Detached(NodeId),
    #[error("Event '{0}' is not supported")]
    UnsupportedEvent(&'static str),
    #[error("Selection range is not supported on this element")]
    SelectionUnsupported,
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Events the injector fires so the page's own framework notices the new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    /// `InputEvent('input', { inputType: 'insertText', data })`
    TextInput { data: String },
    Input,
    Change,
    KeyDown,
    KeyUp,
}

impl SyntheticEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SyntheticEvent::TextInput { .. } => "input(insertText)",
            SyntheticEvent::Input => "input",
            SyntheticEvent::Change => "change",
            SyntheticEvent::KeyDown => "keydown",
            SyntheticEvent::KeyUp => "keyup",
        }
    }
}

pub trait Dom {
    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError>;

    /// All elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Whether the element has a layout box (`offsetParent !== null`).
    fn is_rendered(&self, node: NodeId) -> bool;

    /// Bottom edge of the element's bounding box, in viewport pixels.
    fn bounding_bottom(&self, node: NodeId) -> f64;

    fn viewport_height(&self) -> f64;

    fn element_kind(&self, node: NodeId) -> ElementKind;

    fn location(&self) -> String;

    fn text_content(&self, node: NodeId) -> Option<String>;

    fn value(&self, node: NodeId) -> Option<String>;

    fn focus(&mut self, node: NodeId) -> Result<(), DomError>;

    fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), DomError>;

    fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError>;

    /// Collapse the document selection to the end of the element's content.
    fn collapse_selection_to_end(&mut self, node: NodeId) -> Result<(), DomError>;

    /// `setSelectionRange` on a form control. Offsets are UTF-16 code units.
    fn set_selection_range(&mut self, node: NodeId, start: usize, end: usize)
    -> Result<(), DomError>;

    fn dispatch_event(&mut self, node: NodeId, event: SyntheticEvent) -> Result<(), DomError>;
}

/// Length of `text` as the page measures it (UTF-16 code units).
pub fn dom_length(text: &str) -> usize {
    text.encode_utf16().count()
}
