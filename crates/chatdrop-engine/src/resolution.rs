//! Locator resolution: find the prompt input for one attempt.
//!
//! The layered search runs the configured locators first, then two structural
//! fallbacks. It never errors; an unresolvable page yields `None`.

use crate::dom::{Dom, NodeId};
use chatdrop_common::protocol::{ElementKind, PageDiagnostics};
use tracing::debug;

pub const CONTENT_EDITABLE_SELECTOR: &str = r#"[contenteditable="true"]"#;
pub const TEXTAREA_SELECTOR: &str = "textarea";

/// Locator label reported when the content-editable scan found the input.
pub const CONTENT_EDITABLE_FALLBACK: &str = "contenteditable (auto-search)";
/// Locator label reported when the last textarea was taken.
pub const LAST_TEXTAREA_FALLBACK: &str = "textarea (last)";

/// The element an attempt acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionTarget {
    pub node: NodeId,
    pub kind: ElementKind,
    pub locator: String,
}

pub fn resolve_target<D: Dom + ?Sized>(dom: &D, locators: &[String]) -> Option<InsertionTarget> {
    by_locators(dom, locators)
        .or_else(|| lower_content_editable(dom))
        .or_else(|| last_textarea(dom))
        .map(|(node, locator)| InsertionTarget {
            node,
            kind: dom.element_kind(node),
            locator,
        })
}

fn by_locators<D: Dom + ?Sized>(dom: &D, locators: &[String]) -> Option<(NodeId, String)> {
    for locator in locators {
        match dom.query_selector(locator) {
            Ok(Some(node)) if dom.is_rendered(node) => {
                debug!("Found input field by selector: {}", locator);
                return Some((node, locator.clone()));
            }
            Ok(Some(node)) => {
                debug!("Selector {} matched node {} without a layout box", locator, node);
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Skipping locator {}: {}", locator, e);
            }
        }
    }
    None
}

/// Input areas sit near the bottom of chat UIs.
fn lower_content_editable<D: Dom + ?Sized>(dom: &D) -> Option<(NodeId, String)> {
    let midpoint = dom.viewport_height() * 0.5;
    let node = dom
        .query_selector_all(CONTENT_EDITABLE_SELECTOR)
        .ok()?
        .into_iter()
        .find(|&node| dom.is_rendered(node) && dom.bounding_bottom(node) > midpoint)?;
    debug!("Found input field via contenteditable auto-search");
    Some((node, CONTENT_EDITABLE_FALLBACK.to_string()))
}

/// The most recently added textarea is likeliest to be the active composer.
fn last_textarea<D: Dom + ?Sized>(dom: &D) -> Option<(NodeId, String)> {
    let node = dom.query_selector_all(TEXTAREA_SELECTOR).ok()?.pop()?;
    debug!("Found input field as last textarea");
    Some((node, LAST_TEXTAREA_FALLBACK.to_string()))
}

pub fn page_diagnostics<D: Dom + ?Sized>(dom: &D) -> PageDiagnostics {
    let count = |selector| dom.query_selector_all(selector).map_or(0, |nodes| nodes.len());
    PageDiagnostics {
        textareas: count(TEXTAREA_SELECTOR),
        content_editables: count(CONTENT_EDITABLE_SELECTOR),
        url: dom.location(),
    }
}

const SEND_BUTTON_SELECTORS: &[&str] = &[
    r#"button[data-testid="send-button"]"#,
    r#"button[aria-label*="Send"]"#,
    r#"button[aria-label*="Отправить"]"#,
];
const SIDEBAR_SELECTORS: &[&str] = &["nav", r#"[data-testid="sidebar"]"#];
const LOGIN_SELECTORS: &[&str] = &[r#"form[action*="login"]"#, r#"a[href*="login"]"#];

/// Heuristic sign-in check: a composer or sidebar is present and no login form is.
///
/// Query failures count as signed in, since this only drives a warning.
pub fn looks_signed_in<D: Dom + ?Sized>(dom: &D) -> bool {
    let any = |selectors: &[&str]| -> Result<bool, crate::dom::DomError> {
        for selector in selectors {
            if dom.query_selector(selector)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    };
    let check = || -> Result<bool, crate::dom::DomError> {
        let chrome = any(SEND_BUTTON_SELECTORS)? || any(SIDEBAR_SELECTORS)?;
        Ok(chrome && !any(LOGIN_SELECTORS)?)
    };
    check().unwrap_or(true)
}
