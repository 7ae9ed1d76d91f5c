use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatdropConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "default_locators")]
    pub locators: Vec<String>,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Default for ChatdropConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            timing: TimingConfig::default(),
            locators: default_locators(),
            browser: BrowserConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
        }
    }
}

impl TargetConfig {
    /// The URL new tabs are opened on.
    pub fn primary_url(&self) -> &str {
        self.urls
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_TARGET_URL)
    }
}

const DEFAULT_TARGET_URL: &str = "https://chatgpt.com/";

fn default_urls() -> Vec<String> {
    vec![
        DEFAULT_TARGET_URL.to_string(),
        "https://chat.openai.com/".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,
    #[serde(default = "default_verify_delay_ms")]
    pub verify_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
            verify_delay_ms: default_verify_delay_ms(),
        }
    }
}

impl TimingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_retry_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    8
}

fn default_evaluation_timeout_ms() -> u64 {
    15000
}

fn default_verify_delay_ms() -> u64 {
    300
}

/// Input locators, most specific first. Generic fallbacks stay at the end.
pub fn default_locators() -> Vec<String> {
    [
        r#"textarea[data-id="root"]"#,
        r#"div[contenteditable="true"][data-id="root"]"#,
        r#"[role="textbox"][contenteditable="true"]"#,
        r#"[contenteditable="true"][data-id="root"]"#,
        r#"textarea[placeholder*="Message"]"#,
        r#"textarea[placeholder*="Сообщение"]"#,
        r#"textarea[placeholder*="message"]"#,
        "div#prompt-textarea",
        "textarea#prompt-textarea",
        r#"[data-testid="textbox"]"#,
        "textarea[rows]",
        "textarea",
        r#"[contenteditable="true"]"#,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub chrome_bin: Option<PathBuf>,
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
}
