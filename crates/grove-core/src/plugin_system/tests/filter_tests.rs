use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::filter::PluginFilter;
use crate::plugin_system::registry::PluginEntry;

use super::mock::{entry, tracker};

fn candidates() -> Vec<PluginEntry> {
    let t = tracker();
    vec![
        entry(PluginDescriptor::new("a", "1.0"), &t),
        entry(PluginDescriptor::new("b", "1.0").depends_on_any("a"), &t),
        entry(PluginDescriptor::new("c", "1.0").depends_on_any("b"), &t),
        entry(PluginDescriptor::new("d", "1.0"), &t),
    ]
}

fn names(plugins: &[PluginEntry]) -> Vec<&str> {
    plugins.iter().map(PluginEntry::name).collect()
}

#[test]
fn test_identity_keeps_everything() {
    let filtered = PluginFilter::Identity.filter_plugin_list(candidates());
    assert_eq!(names(&filtered), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_including_adds_transitive_dependencies() {
    let filter = PluginFilter::Including(vec!["c".to_string()]);
    let filtered = filter.filter_plugin_list(candidates());
    assert_eq!(names(&filtered), vec!["a", "b", "c"]);
}

#[test]
fn test_excluding_removes_transitive_dependents() {
    let filter = PluginFilter::Excluding(vec!["a".to_string()]);
    let filtered = filter.filter_plugin_list(candidates());
    assert_eq!(names(&filtered), vec!["d"]);
}

#[test]
fn test_from_settings_prefers_includes() {
    let includes = vec!["spring-security".to_string()];
    let excludes = vec!["d".to_string()];

    assert_eq!(
        PluginFilter::from_settings(&includes, &excludes),
        PluginFilter::Including(vec!["springSecurity".to_string()])
    );
    assert_eq!(
        PluginFilter::from_settings(&[], &excludes),
        PluginFilter::Excluding(vec!["d".to_string()])
    );
    assert_eq!(PluginFilter::from_settings(&[], &[]), PluginFilter::Identity);
}
