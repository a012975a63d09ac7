use std::fs;

use tempfile::tempdir;

use crate::plugin_system::classes::{PluginClass, StaticClassResolver, BASIC_PLUGIN_CLASS};
use crate::plugin_system::compat::CompatibilityChecker;
use crate::plugin_system::descriptor::{PluginDescriptor, PluginOrigin};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::registry::PluginEntry;

use super::mock::{class_for, tracker, MockPlugin};

fn names(plugins: &[PluginEntry]) -> Vec<&str> {
    plugins.iter().map(PluginEntry::name).collect()
}

#[test]
fn test_discover_core_and_user_classes() {
    let t = tracker();
    let core = PluginDescriptor::new("core", "1.0");
    let web = PluginDescriptor::new("web", "1.0");
    let resolver = StaticClassResolver::new()
        .with_class(class_for(&core, MockPlugin::new("core", &t)))
        .with_class(class_for(&web, MockPlugin::new("web", &t)));
    let loader = PluginLoader::new()
        .with_user_class("test.webPlugin")
        .with_core_class("test.corePlugin");

    let discovered = loader.discover(&resolver, &CompatibilityChecker::default(), true).unwrap();

    assert_eq!(discovered.len(), 2);
    assert_eq!(names(&discovered.core), vec!["core"]);
    assert_eq!(names(&discovered.user), vec!["web"]);
    assert_eq!(discovered.core[0].origin(), PluginOrigin::Core);
    assert_eq!(discovered.user[0].class_id(), "test.webPlugin");

    let ordered = discovered.into_ordered();
    assert_eq!(names(&ordered), vec!["core", "web"]);
}

#[test]
fn test_core_classes_are_skipped_when_disabled() {
    let t = tracker();
    let core = PluginDescriptor::new("core", "1.0");
    let resolver = StaticClassResolver::new().with_class(class_for(&core, MockPlugin::new("core", &t)));
    let loader = PluginLoader::new().with_core_class("test.corePlugin");

    let discovered = loader.discover(&resolver, &CompatibilityChecker::default(), false).unwrap();
    assert!(discovered.is_empty());
}

#[test]
fn test_discover_manifests_from_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("audit.plugin.json"),
        r#"{ "name": "audit", "version": "1.0" }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("nested/reports.plugin.json"),
        r#"{ "name": "reports", "version": "1.0", "depends_on": { "audit": "*" } }"#,
    )
    .unwrap();
    fs::write(dir.path().join("application.json"), "{}").unwrap();

    let loader = PluginLoader::new().with_manifest_source(dir.path());
    let discovered = loader
        .discover(&StaticClassResolver::new(), &CompatibilityChecker::default(), true)
        .unwrap();

    assert_eq!(names(&discovered.user), vec!["audit", "reports"]);
    assert!(discovered.user.iter().all(|e| e.class_id() == BASIC_PLUGIN_CLASS));
    assert_eq!(
        discovered.user[0].source(),
        Some(dir.path().join("audit.plugin.json").as_path())
    );
}

#[test]
fn test_manifest_class_without_plugin_suffix_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("helper.plugin.json"),
        r#"{ "name": "helper", "version": "1.0", "class": "acme.Helper" }"#,
    )
    .unwrap();

    let loader = PluginLoader::new().with_manifest_source(dir.path());
    let discovered = loader
        .discover(&StaticClassResolver::new(), &CompatibilityChecker::default(), true)
        .unwrap();
    assert!(discovered.is_empty());
}

#[test]
fn test_unknown_manifest_class_fails_discovery() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("ghost.plugin.json"),
        r#"{ "name": "ghost", "version": "1.0", "class": "acme.GhostPlugin" }"#,
    )
    .unwrap();

    let loader = PluginLoader::new().with_manifest_source(dir.path());
    let err = loader
        .discover(&StaticClassResolver::new(), &CompatibilityChecker::default(), true)
        .unwrap_err();
    assert!(matches!(err, PluginSystemError::Discovery { .. }));
}

#[test]
fn test_unknown_core_class_fails_discovery() {
    let loader = PluginLoader::new().with_core_class("acme.MissingPlugin");
    let err = loader
        .discover(&StaticClassResolver::new(), &CompatibilityChecker::default(), true)
        .unwrap_err();
    assert!(matches!(err, PluginSystemError::ClassNotFound { ref class_id } if class_id == "acme.MissingPlugin"));
}

#[test]
fn test_class_without_descriptor_fails_discovery() {
    let t = tracker();
    let plugin = MockPlugin::new("bare", &t);
    let resolver =
        StaticClassResolver::new().with_class(PluginClass::new("acme.BarePlugin", move || Box::new(plugin.clone())));
    let loader = PluginLoader::new().with_user_class("acme.BarePlugin");

    let err = loader
        .discover(&resolver, &CompatibilityChecker::default(), true)
        .unwrap_err();
    assert!(matches!(err, PluginSystemError::Discovery { .. }));
}
