pub mod types;

pub use types::{EventMap, EventSource, PluginEvent, PluginEventKind};
