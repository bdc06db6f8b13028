/*!
 * Tests for configuration loading, validation and engine credentials
 */

use pdftrans::app_config::{Config, CredentialSource, EngineCredentials, LogLevel, MAX_THREADS};
use pdftrans::orchestrator::{CachePolicy, JobConfig};

#[test]
fn test_default_config_shouldBeValid() {
    let config = Config::default();
    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "zh-CN");
    assert_eq!(config.threads, 4);
    assert!(!config.skip_font_subsetting);
    assert!(!config.ignore_cache);
    assert!(config.fonts.enabled);
    assert!(config.passphrase.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_shouldFillDefaults() {
    let json = r#"{
        "target_language": "ja",
        "threads": 8,
        "engine": { "endpoint": "http://engine.internal:9000" },
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "ja");
    assert_eq!(config.threads, MAX_THREADS);
    assert_eq!(config.engine.endpoint, "http://engine.internal:9000");
    assert_eq!(config.engine.service, "azure-openai");
    assert_eq!(config.engine.poll_interval_ms, 500);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withThreadsOutOfRange_shouldFail() {
    let config = Config {
        threads: 9,
        ..Config::default()
    };
    assert!(config.validate().is_err());

    let config = Config {
        threads: 0,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withBadLanguageOrEndpoint_shouldFail() {
    let config = Config {
        target_language: "not a language".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_job_config_from_config_shouldCarryOptions() {
    let config = Config {
        threads: 2,
        skip_font_subsetting: true,
        ignore_cache: true,
        ..Config::default()
    };
    let job_config = JobConfig::from_config(&config).unwrap();

    assert_eq!(job_config.threads, 2);
    assert!(job_config.skip_font_subsetting);
    assert_eq!(job_config.cache_policy, CachePolicy::IgnoreCache);
    assert!(job_config.cache_policy.ignores_cache());
}

#[test]
fn test_credentials_from_lookup_withNothingSet_shouldUseDefaults() {
    let creds = EngineCredentials::from_lookup(|_| None);
    assert!(creds.endpoint.is_empty());
    assert!(creds.api_key.is_empty());
    assert_eq!(creds.deployment, "gpt-4o-mini");
    assert_eq!(creds.api_version, "2024-06-01");
}

#[test]
fn test_credentials_as_source_shouldReturnThemselves() {
    let creds = EngineCredentials::from_lookup(|key| match key {
        "AZURE_OPENAI_ENDPOINT" => Some("https://example.openai.azure.com/".to_string()),
        "AZURE_OPENAI_API_KEY" => Some("key".to_string()),
        _ => None,
    });
    let source: &dyn CredentialSource = &creds;
    let loaded = source.load();
    assert_eq!(loaded, creds);
    assert_eq!(loaded.endpoint, "https://example.openai.azure.com");
}
