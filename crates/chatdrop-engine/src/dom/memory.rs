//! A flat, in-process document model.
//!
//! Elements live in document order with explicit layout facts (rendered or not,
//! bounding-box bottom). Every event dispatched into the document is recorded
//! so callers can inspect what the page would have observed.

use super::selector::Selector;
use super::{Dom, DomError, NodeId, SyntheticEvent, dom_length};
use chatdrop_common::protocol::ElementKind;
use std::collections::{BTreeMap, HashSet};

/// Input types that accept `setSelectionRange`; all others throw in browsers.
const SELECTABLE_INPUT_TYPES: &[&str] = &["text", "search", "url", "tel", "password"];

#[derive(Debug, Clone)]
pub struct MemoryElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    rendered: bool,
    attached: bool,
    read_only: bool,
    bottom: f64,
    selection: Option<(usize, usize)>,
}

impl MemoryElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            rendered: true,
            attached: true,
            read_only: false,
            bottom: 0.0,
            selection: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// No layout box (`display: none` or inside a hidden subtree).
    pub fn hidden(mut self) -> Self {
        self.rendered = false;
        self
    }

    /// Writes into this element fail, as with a frozen or proxied node.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn bottom(mut self, bottom: f64) -> Self {
        self.bottom = bottom;
        self
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    fn is_content_editable(&self) -> bool {
        matches!(
            self.attributes.get("contenteditable").map(String::as_str),
            Some("" | "true" | "plaintext-only")
        )
    }

    fn kind(&self) -> ElementKind {
        if self.is_content_editable() {
            ElementKind::ContentEditable
        } else if self.tag == "textarea" {
            ElementKind::TextArea
        } else if self.tag == "input" {
            ElementKind::PlainInput
        } else {
            ElementKind::Other
        }
    }

    fn accepts_selection_range(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => {
                let input_type = self
                    .attributes
                    .get("type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string());
                SELECTABLE_INPUT_TYPES.contains(&input_type.as_str())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub node: NodeId,
    pub event: SyntheticEvent,
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    url: String,
    viewport_height: f64,
    elements: Vec<MemoryElement>,
    rejected_events: HashSet<&'static str>,
    focused: Option<NodeId>,
    events: Vec<RecordedEvent>,
    console: Vec<String>,
    selection_text: String,
}

impl MemoryDocument {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            viewport_height: 800.0,
            elements: Vec::new(),
            rejected_events: HashSet::new(),
            focused: None,
            events: Vec::new(),
            console: Vec::new(),
            selection_text: String::new(),
        }
    }

    pub fn with_viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height;
        self
    }

    /// Text the user has highlighted on the page (`getSelection().toString()`).
    pub fn with_selection(mut self, text: &str) -> Self {
        self.selection_text = text.to_string();
        self
    }

    pub fn selection_text(&self) -> String {
        self.selection_text.clone()
    }

    /// Simulates an environment without the `InputEvent` constructor.
    pub fn without_rich_input(mut self) -> Self {
        self.rejected_events.insert("input(insertText)");
        self
    }

    /// Make dispatching the named event (see [`SyntheticEvent::name`]) fail.
    pub fn reject_event(mut self, name: &'static str) -> Self {
        self.rejected_events.insert(name);
        self
    }

    /// Appends an element at the end of the document and returns its id.
    pub fn append(&mut self, element: MemoryElement) -> NodeId {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Removes the element from the document without reusing its id.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(element) = self.elements.get_mut(node) {
            element.attached = false;
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&MemoryElement> {
        self.elements.get(node)
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn events_for(&self, node: NodeId) -> Vec<&SyntheticEvent> {
        self.events
            .iter()
            .filter(|r| r.node == node)
            .map(|r| &r.event)
            .collect()
    }

    /// Messages written to the page console by notices.
    pub fn console(&self) -> &[String] {
        &self.console
    }

    pub fn log_to_console(&mut self, message: &str) {
        self.console.push(message.to_string());
    }

    fn attached(&self, node: NodeId) -> Result<&MemoryElement, DomError> {
        self.elements
            .get(node)
            .filter(|e| e.attached)
            .ok_or(DomError::Detached(node))
    }

    fn attached_mut(&mut self, node: NodeId) -> Result<&mut MemoryElement, DomError> {
        self.elements
            .get_mut(node)
            .filter(|e| e.attached)
            .ok_or(DomError::Detached(node))
    }

    fn writable_mut(&mut self, node: NodeId) -> Result<&mut MemoryElement, DomError> {
        let element = self.attached_mut(node)?;
        if element.read_only {
            return Err(DomError::Rejected(format!("<{}> is read-only", element.tag)));
        }
        Ok(element)
    }
}

impl Dom for MemoryDocument {
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.attached && parsed.matches(&e.tag, &e.attributes))
            .map(|(id, _)| id)
            .collect())
    }

    fn is_rendered(&self, node: NodeId) -> bool {
        self.attached(node).is_ok_and(|e| e.rendered)
    }

    fn bounding_bottom(&self, node: NodeId) -> f64 {
        self.attached(node).map(|e| e.bottom).unwrap_or(0.0)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn element_kind(&self, node: NodeId) -> ElementKind {
        self.elements
            .get(node)
            .map(MemoryElement::kind)
            .unwrap_or(ElementKind::Other)
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        self.elements.get(node).map(|e| e.text.clone())
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.elements
            .get(node)
            .filter(|e| matches!(e.kind(), ElementKind::TextArea | ElementKind::PlainInput))
            .map(|e| e.value.clone())
    }

    fn focus(&mut self, node: NodeId) -> Result<(), DomError> {
        self.attached(node)?;
        self.focused = Some(node);
        Ok(())
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let element = self.writable_mut(node)?;
        element.text = text.to_string();
        Ok(())
    }

    fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        let element = self.writable_mut(node)?;
        element.value = value.to_string();
        // Caret placement is left to `set_selection_range`.
        Ok(())
    }

    fn collapse_selection_to_end(&mut self, node: NodeId) -> Result<(), DomError> {
        let element = self.attached_mut(node)?;
        let end = dom_length(&element.text);
        element.selection = Some((end, end));
        Ok(())
    }

    fn set_selection_range(
        &mut self,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        let element = self.attached_mut(node)?;
        if !element.accepts_selection_range() {
            return Err(DomError::SelectionUnsupported);
        }
        let len = dom_length(&element.value);
        element.selection = Some((start.min(len), end.min(len)));
        Ok(())
    }

    fn dispatch_event(&mut self, node: NodeId, event: SyntheticEvent) -> Result<(), DomError> {
        self.attached(node)?;
        if self.rejected_events.contains(event.name()) {
            return Err(DomError::UnsupportedEvent(event.name()));
        }
        self.events.push(RecordedEvent { node, event });
        Ok(())
    }
}
