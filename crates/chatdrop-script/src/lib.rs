//! Scripts evaluated inside the target page.

/// The injector as a function expression: `(text, locators, verifyDelayMs) => report`.
pub const INJECTOR_JS: &str = include_str!("injector.js");

/// Reads the page's current text selection.
pub const SELECTION_JS: &str = "(window.getSelection() ? window.getSelection().toString() : '')";

/// Expression running one injector pass with the given arguments.
pub fn insertion_expression(
    text: &str,
    locators: &[String],
    verify_delay_ms: u64,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "({})({}, {}, {})",
        INJECTOR_JS.trim_end(),
        serde_json::to_string(text)?,
        serde_json::to_string(locators)?,
        verify_delay_ms
    ))
}

/// Expression writing `message` to the page console as a warning.
pub fn notice_expression(message: &str) -> Result<String, serde_json::Error> {
    Ok(format!("console.warn({})", serde_json::to_string(message)?))
}
