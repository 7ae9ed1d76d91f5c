//! Writing the payload into a resolved element.

use crate::dom::{Dom, DomError, NodeId, SyntheticEvent, dom_length};
use crate::resolution::InsertionTarget;
use chatdrop_common::protocol::ElementKind;
use thiserror::Error;
use tracing::{debug, warn};

/// Characters of the payload checked by [`verify_insertion`].
pub const VERIFY_PREFIX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to {step} <{kind}>: {source}")]
pub struct InsertionError {
    pub step: &'static str,
    pub kind: ElementKind,
    #[source]
    pub source: DomError,
}

pub fn insert_text<D: Dom + ?Sized>(
    dom: &mut D,
    target: &InsertionTarget,
    text: &str,
) -> Result<(), InsertionError> {
    let node = target.node;
    let kind = target.kind;
    let fail = |step: &'static str| move |source: DomError| InsertionError { step, kind, source };

    match kind {
        ElementKind::ContentEditable => {
            dom.focus(node).map_err(fail("focus"))?;
            dom.set_text_content(node, "").map_err(fail("clear"))?;
            dom.set_text_content(node, text).map_err(fail("write"))?;
            dom.collapse_selection_to_end(node)
                .map_err(fail("move caret"))?;
            dispatch_text_input(dom, node, text).map_err(fail("dispatch input"))?;
            dom.dispatch_event(node, SyntheticEvent::Input)
                .map_err(fail("dispatch input"))?;
            dom.dispatch_event(node, SyntheticEvent::Change)
                .map_err(fail("dispatch change"))?;
            let keys = dom
                .dispatch_event(node, SyntheticEvent::KeyDown)
                .and_then(|_| dom.dispatch_event(node, SyntheticEvent::KeyUp));
            if let Err(e) = keys {
                debug!("Keyboard events rejected: {}", e);
            }
        }
        ElementKind::TextArea | ElementKind::PlainInput => {
            dom.focus(node).map_err(fail("focus"))?;
            dom.set_value(node, text).map_err(fail("write"))?;
            dispatch_text_input(dom, node, text).map_err(fail("dispatch input"))?;
            dom.dispatch_event(node, SyntheticEvent::Change)
                .map_err(fail("dispatch change"))?;
            let end = dom_length(text);
            if let Err(e) = dom.set_selection_range(node, end, end) {
                debug!("Selection range not applied: {}", e);
            }
        }
        ElementKind::Other => {
            dom.set_text_content(node, text).map_err(fail("write"))?;
            dom.dispatch_event(node, SyntheticEvent::Input)
                .map_err(fail("dispatch input"))?;
        }
    }

    Ok(())
}

/// Rich `InputEvent` carrying the text, or a plain `input` event where the
/// environment rejects the rich one.
fn dispatch_text_input<D: Dom + ?Sized>(
    dom: &mut D,
    node: NodeId,
    text: &str,
) -> Result<(), DomError> {
    let rich = SyntheticEvent::TextInput {
        data: text.to_string(),
    };
    match dom.dispatch_event(node, rich) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("Falling back to plain input event: {}", e);
            dom.dispatch_event(node, SyntheticEvent::Input)
        }
    }
}

/// Re-reads the element and checks the payload's leading characters are there.
///
/// Advisory only: a mismatch is logged, never reported as a failure.
pub fn verify_insertion<D: Dom + ?Sized>(dom: &D, target: &InsertionTarget, text: &str) -> bool {
    let current = match target.kind {
        ElementKind::TextArea | ElementKind::PlainInput => dom.value(target.node),
        ElementKind::ContentEditable | ElementKind::Other => dom.text_content(target.node),
    }
    .unwrap_or_default();
    let prefix: String = text.chars().take(VERIFY_PREFIX_CHARS).collect();

    if current.contains(&prefix) {
        debug!("Confirmed: text is present in input field");
        true
    } else {
        warn!(
            "Text may not be fully inserted into {} ({})",
            target.kind, target.locator
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDocument, MemoryElement};

    fn target(node: NodeId, kind: ElementKind) -> InsertionTarget {
        InsertionTarget {
            node,
            kind,
            locator: "test".into(),
        }
    }

    #[test]
    fn content_editable_is_replaced_not_appended() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(
            MemoryElement::new("div")
                .attr("contenteditable", "true")
                .text("draft"),
        );

        insert_text(&mut doc, &target(node, ElementKind::ContentEditable), "Hello").unwrap();

        assert_eq!(doc.text_content(node).as_deref(), Some("Hello"));
        assert_eq!(doc.focused(), Some(node));
        assert_eq!(doc.element(node).unwrap().selection(), Some((5, 5)));

        let events = doc.events_for(node);
        let count = |e: &SyntheticEvent| events.iter().filter(|x| **x == e).count();
        assert_eq!(
            count(&SyntheticEvent::TextInput {
                data: "Hello".into()
            }),
            1
        );
        assert_eq!(count(&SyntheticEvent::Input), 1);
        assert_eq!(count(&SyntheticEvent::Change), 1);
        assert_eq!(
            events,
            vec![
                &SyntheticEvent::TextInput {
                    data: "Hello".into()
                },
                &SyntheticEvent::Input,
                &SyntheticEvent::Change,
                &SyntheticEvent::KeyDown,
                &SyntheticEvent::KeyUp,
            ]
        );
    }

    #[test]
    fn legacy_input_event_fires_without_rich_support() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/").without_rich_input();
        let node = doc.append(MemoryElement::new("div").attr("contenteditable", "true"));

        insert_text(&mut doc, &target(node, ElementKind::ContentEditable), "hi").unwrap();

        assert_eq!(
            doc.events_for(node),
            vec![
                &SyntheticEvent::Input,
                &SyntheticEvent::Input,
                &SyntheticEvent::Change,
                &SyntheticEvent::KeyDown,
                &SyntheticEvent::KeyUp,
            ]
        );
    }

    #[test]
    fn keyboard_failures_are_ignored() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/").reject_event("keydown");
        let node = doc.append(MemoryElement::new("div").attr("contenteditable", "true"));

        assert!(insert_text(&mut doc, &target(node, ElementKind::ContentEditable), "hi").is_ok());
    }

    #[test]
    fn textarea_value_is_replaced_and_caret_at_end() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("textarea").value("old"));
        assert_eq!(doc.element(node).unwrap().selection(), None);

        insert_text(&mut doc, &target(node, ElementKind::TextArea), "new text").unwrap();

        assert_eq!(doc.value(node).as_deref(), Some("new text"));
        assert_eq!(doc.element(node).unwrap().selection(), Some((8, 8)));
        assert_eq!(
            doc.events_for(node),
            vec![
                &SyntheticEvent::TextInput {
                    data: "new text".into()
                },
                &SyntheticEvent::Change,
            ]
        );
    }

    #[test]
    fn selection_range_failure_is_not_fatal() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("input").attr("type", "email"));

        let result = insert_text(&mut doc, &target(node, ElementKind::PlainInput), "a@b.c");
        assert!(result.is_ok());
        assert_eq!(doc.value(node).as_deref(), Some("a@b.c"));
        assert_eq!(doc.element(node).unwrap().selection(), None);
        assert_eq!(
            doc.events_for(node),
            vec![
                &SyntheticEvent::TextInput {
                    data: "a@b.c".into()
                },
                &SyntheticEvent::Change,
            ]
        );
    }

    #[test]
    fn plain_input_caret_lands_after_multibyte_text() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("input").attr("type", "search"));

        insert_text(&mut doc, &target(node, ElementKind::PlainInput), "héllo 🦀").unwrap();

        // UTF-16 units, as the DOM counts them.
        assert_eq!(doc.element(node).unwrap().selection(), Some((8, 8)));
    }

    #[test]
    fn other_elements_get_text_and_one_input_event() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("div").text("x"));

        insert_text(&mut doc, &target(node, ElementKind::Other), "payload").unwrap();

        assert_eq!(doc.text_content(node).as_deref(), Some("payload"));
        assert_eq!(doc.events_for(node), vec![&SyntheticEvent::Input]);
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("textarea").read_only());

        let err = insert_text(&mut doc, &target(node, ElementKind::TextArea), "x").unwrap_err();
        assert_eq!(err.step, "write");
        assert!(doc.events().is_empty());
    }

    #[test]
    fn verification_checks_prefix() {
        let mut doc = MemoryDocument::new("https://chatgpt.com/");
        let node = doc.append(MemoryElement::new("textarea"));
        let t = target(node, ElementKind::TextArea);
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";

        insert_text(&mut doc, &t, long).unwrap();
        assert!(verify_insertion(&doc, &t, long));

        assert!(!verify_insertion(&doc, &t, "something else entirely"));
    }
}
