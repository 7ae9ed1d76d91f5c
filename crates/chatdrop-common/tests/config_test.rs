use chatdrop_common::config::loader::{ConfigError, ConfigLoader};
use chatdrop_common::config::schema::ChatdropConfig;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_default_values() {
    let config = ChatdropConfig::default();
    assert_eq!(config.target.primary_url(), "https://chatgpt.com/");
    assert_eq!(config.target.urls.len(), 2);
    assert_eq!(config.timing.settle_delay(), Duration::from_millis(2000));
    assert_eq!(config.timing.retry_interval(), Duration::from_millis(500));
    assert_eq!(config.timing.max_attempts, 8);
    assert_eq!(config.timing.evaluation_timeout(), Duration::from_secs(15));
    assert!(!config.browser.visible);
}

#[test]
fn test_default_locator_order() {
    let config = ChatdropConfig::default();
    assert_eq!(config.locators.first().unwrap(), r#"textarea[data-id="root"]"#);
    assert_eq!(config.locators.last().unwrap(), r#"[contenteditable="true"]"#);
    assert_eq!(config.locators.len(), 13);
}

#[tokio::test]
async fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
timing:
  retry_interval_ms: 250
  max_attempts: 3
locators:
  - "textarea#composer"
browser:
  visible: true
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path())
        .await
        .expect("Failed to load config from file");

    assert_eq!(config.timing.retry_interval_ms, 250);
    assert_eq!(config.timing.max_attempts, 3);
    // Untouched fields keep their defaults.
    assert_eq!(config.timing.settle_delay_ms, 2000);
    assert_eq!(config.locators, vec!["textarea#composer".to_string()]);
    assert!(config.browser.visible);
    assert_eq!(config.target.primary_url(), "https://chatgpt.com/");
}

#[tokio::test]
async fn test_load_from_empty_file() {
    let file = NamedTempFile::new().unwrap();
    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config.timing.max_attempts, 8);
}

#[tokio::test]
async fn test_load_from_nonexistent_file() {
    let result =
        ConfigLoader::load_from(std::path::Path::new("/nonexistent/path/config.yaml")).await;
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[tokio::test]
async fn test_load_from_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{invalid yaml: [unclosed").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[tokio::test]
async fn test_zero_attempts_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "timing:\n  max_attempts: 0").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
