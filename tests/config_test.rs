//! Config loading and defaults integration tests

use std::io::Write;

use hygraph_migrate::backend::{
    ChainedParameterStore, FileParameterStore, MemoryParameterStore, ParameterStore,
};
use hygraph_migrate::config::{ParameterNames, ResolvedParameters};
use hygraph_migrate::pipeline::FieldClassifier;
use hygraph_migrate::{Config, ConfigError, FieldKind, TransformSpec};

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert!(config.job.throttle);
    assert!(!config.job.dry_run);
    assert!(!config.job.continue_on_error);
    assert_eq!(config.source.first, 1000);
    assert_eq!(config.destination.management_url, "https://api.contentful.com");
    assert_eq!(config.destination.delivery_url, "https://cdn.contentful.com");
    assert_eq!(config.destination.space_id, None);
    assert_eq!(config.parameters.query_for("venue"), "hygraph_query_venue");
    assert_eq!(config.parameters.transforms_for("venue"), "transforms_venue");
}

#[test]
fn test_config_with_all_fields() {
    let toml_str = r#"
[job]
throttle = false
dry_run = true
continue_on_error = true

[parameters]
hygraph_key = "/migration/hygraph/key"
hygraph_api = "/migration/hygraph/api"
contentful_mgmt_token = "/migration/contentful/cma"
contentful_delivery_token = "/migration/contentful/cda"
contentful_env_name = "/migration/contentful/env"
locales = "/migration/locales"
query_prefix = "/migration/query/"
transforms_prefix = "/migration/transforms/"

[source]
first = 500
timeout_secs = 10

[converter]
endpoint = "http://converter.internal/convert"
timeout_secs = 5

[destination]
management_url = "https://api.eu.contentful.com"
delivery_url = "https://cdn.eu.contentful.com"
space_id = "abc123"
timeout_secs = 60
"#;

    let config = Config::from_toml(toml_str).expect("valid TOML");

    assert!(!config.job.throttle);
    assert!(config.job.dry_run);
    assert!(config.job.continue_on_error);
    assert_eq!(config.parameters.hygraph_key, "/migration/hygraph/key");
    assert_eq!(config.parameters.query_for("event"), "/migration/query/event");
    assert_eq!(config.source.first, 500);
    assert_eq!(config.converter.endpoint, "http://converter.internal/convert");
    assert_eq!(config.destination.space_id.as_deref(), Some("abc123"));
    assert_eq!(config.destination.timeout_secs, 60);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(
        r#"
[destination]
space_id = "xyz"
"#,
    )
    .expect("valid TOML");

    assert_eq!(config.destination.space_id.as_deref(), Some("xyz"));
    assert_eq!(config.destination.management_url, "https://api.contentful.com");
    assert!(config.job.throttle);
    assert_eq!(config.parameters.locales, "locales");
}

#[test]
fn test_config_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[job]\ndry_run = true").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert!(config.job.dry_run);
}

#[test]
fn test_config_missing_file() {
    let result = Config::load(std::path::Path::new("/nonexistent/path/to/config.toml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn test_invalid_toml_returns_error() {
    let result = Config::from_toml("this is not valid { toml }}}");
    assert!(matches!(result, Err(ConfigError::Toml(_))));
}

#[test]
fn test_parameter_file_overrides_memory_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
hygraph_key = "file-key"
hygraph_query_venue = "slug title body {{ markdown }}"
transforms_venue = '{{"markdown_fields": ["body"], "remap_fields": {{"name": "title"}}}}'
"#
    )
    .unwrap();

    let fallback = MemoryParameterStore::new()
        .with("hygraph_key", "memory-key")
        .with("hygraph_api", "https://api.hygraph.example/v2/p/master")
        .with("contentful_mgmt_token", "cma")
        .with("contentful_delivery_token", "cda")
        .with("contentful_env_name", "master")
        .with("locales", r#"{"locales": ["en", "fr"]}"#);

    let store = ChainedParameterStore::new()
        .with_store(FileParameterStore::load(file.path()).unwrap())
        .with_store(fallback);

    assert_eq!(store.get("hygraph_key").unwrap(), "file-key");

    let params =
        ResolvedParameters::resolve(&store, &ParameterNames::default(), "venue").unwrap();
    assert_eq!(params.query_fields, "slug title body { markdown }");
    assert_eq!(params.locales, vec!["en", "fr"]);
    assert_eq!(params.transforms.markdown_fields, vec!["body".to_string()]);
    assert_eq!(
        params.transforms.remap_fields.get("name").map(String::as_str),
        Some("title")
    );
}

#[test]
fn test_transform_spec_to_classifier() {
    let spec = TransformSpec::from_json(
        r#"{
            "remap_fields": {"coordinates": "location"},
            "markdown_fields": ["description"],
            "reference_fields": ["organiser", "categories"],
            "location_fields": ["location"]
        }"#,
    )
    .unwrap();

    let classifier = FieldClassifier::from_spec(&spec).unwrap();
    assert_eq!(classifier.kind_of("description"), FieldKind::Markdown);
    assert_eq!(classifier.kind_of("categories"), FieldKind::Reference);
    assert_eq!(classifier.kind_of("location"), FieldKind::Location);
    assert_eq!(classifier.kind_of("coordinates"), FieldKind::Plain);
}

#[test]
fn test_transform_spec_overlap_is_config_error() {
    let spec = TransformSpec::from_json(
        r#"{"markdown_fields": ["body"], "reference_fields": ["body"]}"#,
    )
    .unwrap();
    assert!(matches!(
        FieldClassifier::from_spec(&spec),
        Err(ConfigError::OverlappingFieldSets { .. })
    ));
}
