use chatdrop_engine::backend::BackendError;
use chatdrop_engine::protocol::InsertionReport;
use chatdrop_script::{SELECTION_JS, insertion_expression, notice_expression};
use chromiumoxide::Page;
use std::time::Duration;

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

impl From<EvalError> for BackendError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Timeout => BackendError::Timeout,
            EvalError::Context(msg) => {
                BackendError::Navigation(format!("Page context unavailable: {}", msg))
            }
            EvalError::Other(msg) => BackendError::Evaluation(msg),
        }
    }
}

/// Evaluate `expression` once. No retries here: the caller's retry loop owns
/// that decision.
async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    let eval_result = tokio::time::timeout(timeout, page.evaluate(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => remote_object
            .into_value::<serde_json::Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}

pub async fn run_injector(
    page: &Page,
    text: &str,
    locators: &[String],
    verify_delay_ms: u64,
    timeout: Duration,
) -> Result<InsertionReport, BackendError> {
    let expression = insertion_expression(text, locators, verify_delay_ms)?;
    tracing::debug!(
        "Evaluating injector ({} chars of text, {} locators)",
        text.chars().count(),
        locators.len()
    );
    let value = evaluate_with_timeout(page, &expression, timeout).await?;
    Ok(serde_json::from_value(value)?)
}

pub async fn read_selection(page: &Page, timeout: Duration) -> Result<String, BackendError> {
    let value = evaluate_with_timeout(page, SELECTION_JS, timeout).await?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

pub async fn show_notice(page: &Page, message: &str, timeout: Duration) -> Result<(), BackendError> {
    let expression = notice_expression(message)?;
    evaluate_with_timeout(page, &expression, timeout).await?;
    Ok(())
}
