use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "VERITY_PORT",
        "VERITY_BIND_ADDR",
        "VERITY_QDRANT_URL",
        "VERITY_REASONING_MODEL",
        "VERITY_CLASSIFIER_URL",
        "VERITY_SEARCH_URL",
        "VERITY_SEARCH_API_KEY",
        "VERITY_SEARCH_CX",
        "VERITY_FACTCHECK_URL",
        "VERITY_FACTCHECK_API_KEY",
        "VERITY_EMBEDDING_URL",
    ] {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn defaults_when_env_is_empty() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
    assert_eq!(config.reasoning_model, DEFAULT_REASONING_MODEL);
    assert!(config.search_url.is_none());
    config.validate().unwrap();
}

#[test]
#[serial]
fn port_override() {
    clear_env();
    unsafe { std::env::set_var("VERITY_PORT", "9123") };
    let config = Config::from_env().unwrap();
    assert_eq!(config.port, 9123);
    clear_env();
}

#[test]
#[serial]
fn invalid_port_rejected() {
    clear_env();
    unsafe { std::env::set_var("VERITY_PORT", "not-a-port") };
    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::PortParseError { .. })
    ));
    unsafe { std::env::set_var("VERITY_PORT", "0") };
    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::InvalidPort { .. })
    ));
    clear_env();
}

#[test]
#[serial]
fn search_endpoint_requires_key() {
    clear_env();
    let mut config = Config::default();
    config.search_url = Some("https://search.example.com/v1".into());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingCredential { .. })
    ));

    config.search_api_key = Some("key".into());
    config.validate().unwrap();
}

#[test]
#[serial]
fn non_http_endpoint_rejected() {
    clear_env();
    let mut config = Config::default();
    config.classifier_url = Some("ftp://nope".into());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEndpoint { .. })
    ));
}

#[test]
#[serial]
fn empty_optional_env_is_none() {
    clear_env();
    unsafe { std::env::set_var("VERITY_EMBEDDING_URL", "") };
    let config = Config::from_env().unwrap();
    assert!(config.embedding_url.is_none());
    clear_env();
}
