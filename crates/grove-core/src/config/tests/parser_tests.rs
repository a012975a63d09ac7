use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::config::error::ConfigError;
use crate::config::parser::{ConfigBindings, ConfigFormat, ConfigParser, FileConfigParser};
use crate::kernel::bootstrap::{AppMetadata, Environment};

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(Path::new("application.json")), Some(ConfigFormat::Json));
    #[cfg(feature = "toml-config")]
    assert_eq!(ConfigFormat::from_path(Path::new("application.TOML")), Some(ConfigFormat::Toml));
    #[cfg(feature = "yaml-config")]
    assert_eq!(ConfigFormat::from_path(Path::new("application.yml")), Some(ConfigFormat::Yaml));
    assert_eq!(ConfigFormat::from_path(Path::new("application.ini")), None);
}

#[test]
fn test_substitute_bindings() {
    let bindings = ConfigBindings::new().with("appName", "bookstore").with("userHome", "/home/ada");
    assert_eq!(bindings.substitute("${userHome}/.${appName}"), "/home/ada/.bookstore");
    assert_eq!(bindings.substitute("${unknown}-x"), "${unknown}-x");
    assert_eq!(bindings.substitute("open ${brace"), "open ${brace");
    assert_eq!(bindings.substitute("plain"), "plain");
}

#[test]
fn test_standard_bindings_include_metadata() {
    let metadata = AppMetadata {
        name: "bookstore".to_string(),
        version: "2.1.0".to_string(),
        framework_version: Some("1.0.0".to_string()),
    };
    let bindings = ConfigBindings::standard(&metadata);
    assert_eq!(bindings.get("appName"), Some("bookstore"));
    assert_eq!(bindings.get("appVersion"), Some("2.1.0"));
    assert_eq!(bindings.get("frameworkVersion"), Some("1.0.0"));
}

#[test]
fn test_environment_block_is_merged() {
    let data = r#"{
        "server": { "port": 8080, "host": "localhost" },
        "environments": {
            "production": { "server": { "port": 80 } },
            "test": { "server": { "port": 0 } }
        }
    }"#;
    let parser = FileConfigParser::new();
    let tree = parser
        .parse_str(data, ConfigFormat::Json, &Environment::new("production"), &ConfigBindings::new())
        .unwrap();

    assert_eq!(tree.get_as::<u16>("server.port"), Some(80));
    assert_eq!(tree.get_as::<String>("server.host").as_deref(), Some("localhost"));
    assert!(!tree.contains("environments"));

    let dev = parser
        .parse_str(data, ConfigFormat::Json, &Environment::new("development"), &ConfigBindings::new())
        .unwrap();
    assert_eq!(dev.get_as::<u16>("server.port"), Some(8080));
}

#[test]
fn test_parse_rejects_non_table_document() {
    let parser = FileConfigParser::new();
    let result = parser.parse_str("[1, 2]", ConfigFormat::Json, &Environment::default(), &ConfigBindings::new());
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_parse_file_reports_path_on_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("application.json");
    fs::write(&path, "{ not json").unwrap();

    let err = FileConfigParser::new()
        .parse(&path, &Environment::default(), &ConfigBindings::new())
        .unwrap_err();
    match err {
        ConfigError::Parse { path: Some(p), format, .. } => {
            assert_eq!(p, path);
            assert_eq!(format, "JSON");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_parse_file_unsupported_and_missing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let parser = FileConfigParser::new();

    let ini = dir.path().join("application.ini");
    fs::write(&ini, "a=1").unwrap();
    assert!(matches!(
        parser.parse(&ini, &Environment::default(), &ConfigBindings::new()),
        Err(ConfigError::UnsupportedFormat(_))
    ));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        parser.parse(&missing, &Environment::default(), &ConfigBindings::new()),
        Err(ConfigError::Io { .. })
    ));
}

#[cfg(feature = "toml-config")]
#[test]
fn test_parse_toml_file_with_bindings() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("application.toml");
    fs::write(
        &path,
        r#"
[storage]
root = "${userHome}/data"

[environments.test.storage]
root = "/tmp/${appName}"
"#,
    )
    .unwrap();

    let bindings = ConfigBindings::new().with("userHome", "/home/ada").with("appName", "shop");
    let parser = FileConfigParser::new();

    let dev = parser.parse(&path, &Environment::new("development"), &bindings).unwrap();
    assert_eq!(dev.get_as::<String>("storage.root").as_deref(), Some("/home/ada/data"));

    let test = parser.parse(&path, &Environment::new("test"), &bindings).unwrap();
    assert_eq!(test.get_as::<String>("storage.root").as_deref(), Some("/tmp/shop"));
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_parse_yaml_string() {
    let tree = FileConfigParser::new()
        .parse_str(
            "server:\n  port: 8443\n",
            ConfigFormat::Yaml,
            &Environment::default(),
            &ConfigBindings::new(),
        )
        .unwrap();
    assert_eq!(tree.get_as::<u16>("server.port"), Some(8443));
}
