use chatdrop_engine::backend::Backend;
use chatdrop_engine::config::schema::{BrowserConfig, TimingConfig, default_locators};
use chatdrop_engine::load_watch::PendingLoadWatch;
use chatdrop_engine::protocol::{ElementKind, TabId};
use chatdrop_engine::retry::RetryLoop;
use chatdrop_h::backend::HeadlessBackend;
use serial_test::serial;
use std::time::Duration;

async fn launch_or_skip() -> Option<HeadlessBackend> {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let mut backend = HeadlessBackend::new(BrowserConfig::default(), TimingConfig::default());
    match backend.launch().await {
        Ok(_) => Some(backend),
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            None
        }
    }
}

async fn open_loaded(backend: &mut HeadlessBackend, html: &str) -> TabId {
    let pending = PendingLoadWatch::new(backend.subscribe_tabs().unwrap());
    let url = format!(
        "data:text/html,{}",
        html.replace('%', "%25").replace('#', "%23")
    );
    let tab = backend.open_tab(&url).await.expect("open_tab failed");
    pending.bind(tab).wait().await.expect("tab never loaded");
    tab
}

async fn eval_string(backend: &HeadlessBackend, tab: TabId, expression: &str) -> String {
    backend
        .page(tab)
        .expect("page missing")
        .evaluate(expression)
        .await
        .expect("evaluate failed")
        .into_value()
        .expect("not a string")
}

/// Records `input` and `change` events as `id:type:inputType` in `window.__events`.
const EVENT_RECORDER: &str = "<script>window.__events = [];\
['input', 'change'].forEach(function (type) {\
document.addEventListener(type, function (e) {\
window.__events.push(e.target.id + ':' + type + ':' + (e.inputType || ''));\
}, true);\
});</script>";

async fn recorded_events(backend: &HeadlessBackend, tab: TabId) -> Vec<String> {
    let json = eval_string(backend, tab, "JSON.stringify(window.__events)").await;
    serde_json::from_str(&json).expect("events not a string array")
}

fn locators(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
#[serial]
async fn test_textarea_insertion_in_real_page() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    let html = "<html><body><nav></nav><textarea id='prompt-textarea'>old</textarea></body></html>";
    let tab = open_loaded(&mut backend, html).await;

    let retry = RetryLoop::new(3, Duration::from_millis(100));
    let report = retry
        .run(&mut backend, tab, "Hello \"quoted\" world", &default_locators())
        .await;
    assert!(report.succeeded(), "attempts: {:?}", report.attempts);

    let page = backend.page(tab).expect("page missing");
    let value: String = page
        .evaluate("document.querySelector('textarea').value")
        .await
        .expect("evaluate failed")
        .into_value()
        .expect("not a string");
    assert_eq!(value, "Hello \"quoted\" world");

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_content_editable_and_selection() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    let html = "<html><body><div id='prompt-textarea' contenteditable='true'>draft</div></body></html>";
    let tab = open_loaded(&mut backend, html).await;

    let report = backend
        .insert_text(tab, "from the host", &default_locators())
        .await
        .expect("evaluation failed");
    assert!(report.inserted);
    assert_eq!(report.kind, Some(ElementKind::ContentEditable));
    assert_eq!(report.locator.as_deref(), Some("div#prompt-textarea"));

    // Insertion moved the caret into the editable; nothing is selected.
    let selection = backend.read_selection(tab).await.expect("selection failed");
    assert_eq!(selection, "");

    backend
        .notify(tab, "notice from test")
        .await
        .expect("notify failed");

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_missing_input_reports_diagnostics() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    let tab = open_loaded(&mut backend, "<html><body><p>nothing here</p></body></html>").await;

    let report = backend
        .insert_text(tab, "hello", &default_locators())
        .await
        .expect("evaluation failed");
    assert!(!report.inserted);
    let diagnostics = report.diagnostics.expect("diagnostics missing");
    assert_eq!(diagnostics.textareas, 0);
    assert!(diagnostics.url.starts_with("data:text/html"));

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_hidden_locator_match_falls_through_to_next_locator() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    let html = "<html><body>\
        <textarea id='ghost' style='display:none'></textarea>\
        <textarea id='real'></textarea>\
        </body></html>";
    let tab = open_loaded(&mut backend, html).await;

    let report = backend
        .insert_text(tab, "visible only", &locators(&["#ghost", "#real"]))
        .await
        .expect("evaluation failed");
    assert!(report.inserted);
    assert_eq!(report.locator.as_deref(), Some("#real"));

    let values = eval_string(
        &backend,
        tab,
        "document.getElementById('ghost').value + '|' + document.getElementById('real').value",
    )
    .await;
    assert_eq!(values, "|visible only");

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_lower_content_editable_fallback_and_its_events() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    // The upper editable ends well above the viewport midpoint, the lower one
    // well below it.
    let html = format!(
        "<html><body>{}\
        <div id='top' contenteditable='true'>top</div>\
        <div style='height:1500px'></div>\
        <div id='bottom' contenteditable='true'>bottom</div>\
        <textarea id='last'></textarea>\
        </body></html>",
        EVENT_RECORDER
    );
    let tab = open_loaded(&mut backend, &html).await;

    let report = backend
        .insert_text(tab, "to the composer", &locators(&["#missing"]))
        .await
        .expect("evaluation failed");
    assert!(report.inserted);
    assert_eq!(report.locator.as_deref(), Some("contenteditable (auto-search)"));
    assert_eq!(report.kind, Some(ElementKind::ContentEditable));

    let contents = eval_string(
        &backend,
        tab,
        "['top', 'bottom'].map(function (id) { return document.getElementById(id).textContent; }).join('|') \
         + '|' + document.getElementById('last').value",
    )
    .await;
    assert_eq!(contents, "top|to the composer|");

    // One rich input, one plain input and one change, in that order.
    assert_eq!(
        recorded_events(&backend, tab).await,
        vec![
            "bottom:input:insertText".to_string(),
            "bottom:input:".to_string(),
            "bottom:change:".to_string(),
        ]
    );

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_last_textarea_fallback_puts_caret_at_end() {
    let Some(mut backend) = launch_or_skip().await else {
        return;
    };

    // Resetting the caret on `change` means only a later setSelectionRange
    // can leave it at the end.
    let html = format!(
        "<html><body>{}\
        <script>document.addEventListener('change', function (e) {{\
        e.target.setSelectionRange(0, 0); }}, true);</script>\
        <textarea id='first'>one</textarea>\
        <textarea id='second'>two</textarea>\
        </body></html>",
        EVENT_RECORDER
    );
    let tab = open_loaded(&mut backend, &html).await;

    let text = "héllo 🦀";
    let report = backend
        .insert_text(tab, text, &locators(&["#missing"]))
        .await
        .expect("evaluation failed");
    assert!(report.inserted);
    assert_eq!(report.locator.as_deref(), Some("textarea (last)"));
    assert_eq!(report.kind, Some(ElementKind::TextArea));

    let state = eval_string(
        &backend,
        tab,
        "var first = document.getElementById('first'); \
         var second = document.getElementById('second'); \
         [first.value, second.value, second.selectionStart, second.selectionEnd].join('|')",
    )
    .await;
    // Caret offsets are UTF-16 units.
    assert_eq!(state, format!("one|{}|8|8", text));

    assert_eq!(
        recorded_events(&backend, tab).await,
        vec![
            "second:input:insertText".to_string(),
            "second:change:".to_string(),
        ]
    );

    backend.close().await.expect("Close failed");
}
