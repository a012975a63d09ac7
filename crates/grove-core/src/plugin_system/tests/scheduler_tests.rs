use std::collections::BTreeMap;

use crate::kernel::bootstrap::Application;
use crate::plugin_system::descriptor::{PluginDescriptor, PluginState};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::eviction::EvictionManager;
use crate::plugin_system::observer::ObserverRegistry;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::scheduler::{DelayedLoadScheduler, FailedPlugin, LoadPass, Registration};
use crate::plugin_system::version::VersionRequirement;

use super::mock::{calls, entry, tracker, Tracker};

// --- Test Harness ---

#[derive(Default)]
struct Harness {
    registry: PluginRegistry,
    observers: ObserverRegistry,
    evictions: EvictionManager,
    failed: BTreeMap<String, FailedPlugin>,
    application: Application,
}

impl Harness {
    fn pass(&mut self) -> LoadPass<'_> {
        LoadPass {
            registry: &mut self.registry,
            observers: &mut self.observers,
            evictions: &mut self.evictions,
            failed: &mut self.failed,
            application: &self.application,
        }
    }

    /// Run both registration passes over `descriptors`
    fn load(&mut self, descriptors: Vec<PluginDescriptor>, tracker: &Tracker, max_idle_rounds: usize) {
        let mut scheduler = DelayedLoadScheduler::new(max_idle_rounds);
        let mut pass = self.pass();
        scheduler.attempt_load(descriptors.into_iter().map(|d| entry(d, tracker)), &mut pass);
        scheduler.load_delayed(&mut pass);
        assert_eq!(scheduler.queued(), 0);
    }

    fn registered(&self) -> Vec<&str> {
        self.registry.names().iter().map(String::as_str).collect()
    }

    fn failed_names(&self) -> Vec<&str> {
        self.failed.keys().map(String::as_str).collect()
    }
}

#[test]
fn test_delayed_plugin_loads_after_its_load_after_target() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("p3", "1.0").load_after("p2"),
            PluginDescriptor::new("p1", "1.0"),
            PluginDescriptor::new("p2", "1.0").depends_on_any("p1"),
        ],
        &t,
        2,
    );

    assert_eq!(harness.registered(), vec!["p1", "p2", "p3"]);
    assert!(harness.failed.is_empty());
}

#[test]
fn test_first_pass_queues_unresolved_plugins() {
    let t = tracker();
    let mut harness = Harness::default();
    let mut scheduler = DelayedLoadScheduler::new(2);
    {
        let mut pass = harness.pass();
        scheduler.attempt_load(
            vec![
                entry(PluginDescriptor::new("web", "1.0").depends_on_any("core"), &t),
                entry(PluginDescriptor::new("core", "1.0"), &t),
            ],
            &mut pass,
        );
    }
    assert_eq!(scheduler.queued(), 1);
    assert_eq!(harness.registered(), vec!["core"]);

    let mut pass = harness.pass();
    scheduler.load_delayed(&mut pass);
    assert_eq!(harness.registered(), vec!["core", "web"]);
}

#[test]
fn test_registration_sets_application_and_state() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(vec![PluginDescriptor::new("core", "1.0")], &t, 2);

    assert_eq!(calls(&t, "set_application"), vec!["set_application:core"]);
    assert_eq!(harness.registry.get("core").unwrap().state(), PluginState::Registered);
}

#[test]
fn test_missing_dependency_fails_plugin() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(vec![PluginDescriptor::new("needsGhost", "1.0").depends_on_any("ghost")], &t, 2);

    assert!(harness.registry.is_empty());
    let failed = &harness.failed["needsGhost"];
    assert!(matches!(
        &failed.error,
        PluginSystemError::UnresolvedDependency { missing, .. } if missing == &vec!["ghost".to_string()]
    ));
    assert_eq!(
        failed.error.to_string(),
        "Plugin [needsGhost] cannot be loaded because its dependencies [ghost] cannot be resolved"
    );
}

#[test]
fn test_version_mismatch_fails_plugin() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("core", "1.0"),
            PluginDescriptor::new("web", "1.0").depends_on("core", VersionRequirement::parse("2.0").unwrap()),
        ],
        &t,
        2,
    );

    assert_eq!(harness.registered(), vec!["core"]);
    assert_eq!(harness.failed_names(), vec!["web"]);
}

#[test]
fn test_failures_propagate_along_delayed_chain() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("c", "1.0").depends_on_any("b"),
            PluginDescriptor::new("b", "1.0").depends_on_any("a"),
            PluginDescriptor::new("a", "1.0").depends_on_any("ghost"),
            PluginDescriptor::new("free", "1.0"),
        ],
        &t,
        2,
    );

    assert_eq!(harness.registered(), vec!["free"]);
    assert_eq!(harness.failed_names(), vec!["a", "b", "c"]);
}

#[test]
fn test_load_after_target_that_cannot_load_does_not_block() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("x", "1.0").load_after("y"),
            PluginDescriptor::new("y", "1.0").depends_on_any("ghost"),
        ],
        &t,
        2,
    );

    assert_eq!(harness.registered(), vec!["x"]);
    assert_eq!(harness.failed_names(), vec!["y"]);
}

#[test]
fn test_idle_rounds_bound_the_delayed_queue() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("x", "1.0").load_after("y"),
            PluginDescriptor::new("y", "1.0").load_after("x"),
        ],
        &t,
        1,
    );

    assert!(harness.registry.is_empty());
    assert_eq!(harness.failed_names(), vec!["x", "y"]);
    assert!(matches!(
        &harness.failed["x"].error,
        PluginSystemError::UnresolvedDependency { missing, .. } if missing == &vec!["y".to_string()]
    ));
}

#[test]
fn test_disabled_and_unsupported_plugins_are_skipped() {
    let t = tracker();
    let mut harness = Harness::default();
    let mut pass = harness.pass();

    let disabled = entry(PluginDescriptor::new("off", "1.0").disabled(), &t);
    let prod_only = entry(PluginDescriptor::new("prod", "1.0").environments(["production"]), &t);
    let dev = entry(PluginDescriptor::new("dev", "1.0").environments(["Development"]), &t);

    assert_eq!(pass.register(disabled), Registration::Skipped);
    assert_eq!(pass.register(prod_only), Registration::Skipped);
    assert_eq!(pass.register(dev), Registration::Registered);
    assert_eq!(harness.registered(), vec!["dev"]);
    assert!(harness.failed.is_empty());
}

#[test]
fn test_duplicate_name_is_skipped() {
    let t = tracker();
    let mut harness = Harness::default();
    let mut pass = harness.pass();

    assert_eq!(pass.register(entry(PluginDescriptor::new("core", "1.0"), &t)), Registration::Registered);
    assert_eq!(pass.register(entry(PluginDescriptor::new("core", "2.0"), &t)), Registration::Skipped);
    assert_eq!(harness.registry.get("core").unwrap().version(), "1.0");
}

#[test]
fn test_registration_records_observers_and_evictions() {
    let t = tracker();
    let mut harness = Harness::default();
    harness.load(
        vec![
            PluginDescriptor::new("core", "1.0"),
            PluginDescriptor::new("audit", "1.0").observes("core").evicts("legacy"),
        ],
        &t,
        2,
    );

    assert_eq!(harness.observers.observers_of("core"), vec!["audit"]);
    assert_eq!(harness.evictions.pending_count(), 1);
}
