//! One injector pass: session check, locator resolution, insertion.
//!
//! Runs synchronously against a [`Dom`] and always answers with an
//! [`InsertionReport`]; failures are data, never panics.

use crate::dom::Dom;
use crate::insertion::insert_text;
use crate::resolution::{InsertionTarget, looks_signed_in, page_diagnostics, resolve_target};
use chatdrop_common::protocol::InsertionReport;
use tracing::{debug, warn};

/// Report plus the resolved target, for callers that verify afterwards.
#[derive(Debug, Clone)]
pub struct InjectorRun {
    pub report: InsertionReport,
    pub target: Option<InsertionTarget>,
}

pub fn run_injector<D: Dom + ?Sized>(dom: &mut D, text: &str, locators: &[String]) -> InjectorRun {
    let authorized = looks_signed_in(&*dom);
    if !authorized {
        warn!("Page does not look signed in; insertion may not stick");
    }

    let Some(target) = resolve_target(&*dom, locators) else {
        let diagnostics = page_diagnostics(&*dom);
        warn!(
            "Input field not found (textareas: {}, contenteditable: {}, url: {})",
            diagnostics.textareas, diagnostics.content_editables, diagnostics.url
        );
        return InjectorRun {
            report: InsertionReport::not_found(diagnostics, authorized),
            target: None,
        };
    };

    let report = match insert_text(dom, &target, text) {
        Ok(()) => {
            debug!("Text inserted (selector: {})", target.locator);
            InsertionReport::inserted(target.locator.clone(), target.kind, authorized)
        }
        Err(e) => {
            warn!("Insertion into {} failed: {}", target.locator, e);
            InsertionReport::failed(target.locator.clone(), target.kind, authorized, e.to_string())
        }
    };

    InjectorRun {
        report,
        target: Some(target),
    }
}
