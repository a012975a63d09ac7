use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use crate::config::ConfigFormat;
use crate::plugin_system::classes::BASIC_PLUGIN_CLASS;
use crate::plugin_system::descriptor::WatchPattern;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::version::VersionRequirement;

const FULL_MANIFEST: &str = r#"{
    "name": "spring-security",
    "version": "2.1.0",
    "class": "acme.SpringSecurityPlugin",
    "framework_version": "1.0 > *",
    "depends_on": { "core": "1.0 > *", "domain-classes": "*" },
    "load_after": ["controllers"],
    "load_before": ["url-mappings"],
    "evicts": ["basic-auth"],
    "observes": ["*"],
    "watched_resources": [{ "directory": "conf", "extension": ".groovy" }],
    "provides": ["acme.SecurityService"],
    "environments": ["production"],
    "profiles": ["web"]
}"#;

#[test]
fn test_is_manifest_path() {
    assert!(PluginManifest::is_manifest_path(Path::new("plugins/security.plugin.json")));
    assert!(!PluginManifest::is_manifest_path(Path::new("conf/application.json")));
    assert!(!PluginManifest::is_manifest_path(Path::new("security.plugin.ini")));
}

#[test]
fn test_parse_full_manifest() {
    let path = PathBuf::from("/opt/app/plugins/security.plugin.json");
    let manifest = PluginManifest::parse(FULL_MANIFEST, ConfigFormat::Json, &path).unwrap();
    let d = &manifest.descriptor;

    assert_eq!(manifest.class_id, "acme.SpringSecurityPlugin");
    assert_eq!(manifest.path, path);
    assert_eq!(d.name, "springSecurity");
    assert_eq!(d.version, "2.1.0");
    assert_eq!(d.framework_version.as_deref(), Some("1.0 > *"));
    assert_eq!(d.dependency_names(), vec!["core", "domainClasses"]);
    assert_eq!(
        d.dependent_version("core"),
        Some(&VersionRequirement::parse("1.0 > *").unwrap())
    );
    assert_eq!(d.load_after, vec!["controllers"]);
    assert_eq!(d.load_before, vec!["urlMappings"]);
    assert_eq!(d.evicts, vec!["basicAuth"]);
    assert_eq!(d.observes, vec!["*"]);
    assert_eq!(
        d.watched_resources,
        vec![WatchPattern::new("/opt/app/plugins/conf", "groovy")]
    );
    assert_eq!(d.provided_artefacts, vec!["acme.SecurityService"]);
    assert_eq!(d.environments, vec!["production"]);
    assert_eq!(d.profiles, vec!["web"]);
    assert!(d.enabled);
}

#[test]
fn test_minimal_manifest_defaults() {
    let manifest = PluginManifest::parse(
        r#"{ "name": "audit", "version": "0.1" }"#,
        ConfigFormat::Json,
        Path::new("audit.plugin.json"),
    )
    .unwrap();

    assert_eq!(manifest.class_id, BASIC_PLUGIN_CLASS);
    assert!(manifest.descriptor.dependencies.is_empty());
    assert!(manifest.descriptor.enabled);
    assert!(manifest.descriptor.framework_version.is_none());
}

#[test]
fn test_invalid_manifests_are_rejected() {
    let path = Path::new("bad.plugin.json");

    let empty_name = PluginManifest::parse(r#"{ "name": " ", "version": "1.0" }"#, ConfigFormat::Json, path);
    assert!(matches!(empty_name, Err(PluginSystemError::Manifest { .. })));

    let missing_version = PluginManifest::parse(r#"{ "name": "x" }"#, ConfigFormat::Json, path);
    assert!(matches!(missing_version, Err(PluginSystemError::Manifest { .. })));

    let bad_range = PluginManifest::parse(
        r#"{ "name": "x", "version": "1.0", "depends_on": { "core": "* > 1.0" } }"#,
        ConfigFormat::Json,
        path,
    );
    assert!(matches!(bad_range, Err(PluginSystemError::Manifest { .. })));

    let not_json = PluginManifest::parse("name = x", ConfigFormat::Json, path);
    assert!(matches!(not_json, Err(PluginSystemError::Manifest { .. })));
}

#[test]
fn test_load_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.plugin.json");
    fs::write(&path, r#"{ "name": "audit", "version": "1.2", "enabled": false }"#).unwrap();

    let manifest = PluginManifest::load(&path).unwrap();
    assert_eq!(manifest.descriptor.name, "audit");
    assert!(!manifest.descriptor.enabled);

    let missing = PluginManifest::load(&dir.path().join("ghost.plugin.json"));
    assert!(matches!(missing, Err(PluginSystemError::Manifest { .. })));
}

#[cfg(feature = "toml-config")]
#[test]
fn test_parse_toml_manifest() {
    let content = r#"
name = "audit"
version = "1.0"
load_after = ["core"]

[depends_on]
core = "1.0 > *"
"#;
    let manifest = PluginManifest::parse(content, ConfigFormat::Toml, Path::new("audit.plugin.toml")).unwrap();
    assert_eq!(manifest.descriptor.dependency_names(), vec!["core"]);
    assert_eq!(manifest.descriptor.load_after, vec!["core"]);
}
