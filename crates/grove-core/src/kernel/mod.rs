//! # Grove Core Kernel
//!
//! Application-level building blocks shared by every subsystem.
//!
//! ## Key Components
//!
//! - **`bootstrap`**: The [`Application`](bootstrap::Application) model: metadata,
//!   environment, merged configuration, artefact registry and class resolver.
//! - **`context`**: The shared [`ApplicationContext`](context::ApplicationContext)
//!   and the [`RuntimeConfiguration`](context::RuntimeConfiguration) bean builder.
//! - **`artefact`**: Artefact handlers and the artefacts registered against them.
//! - **`constants`**: Application-wide constant values.
//! - **`error`**: The top-level [`Error`](error::Error) type and `Result` alias.
pub mod artefact;
pub mod bootstrap;
pub mod constants;
pub mod context;
pub mod error;
