//! Desired-state stores over the KV backend.
//!
//! Key layout, shared by the API and controller processes:
//!
//! ```text
//! /flowpipe/flows/<name>/active                 -> ascii-decimal version
//! /flowpipe/flows/<name>/versions/<v>/spec      -> encoded FlowSpec
//! /flowpipe/flows/<name>/status                 -> encoded FlowStatus
//! /flowpipe/schemas/<registry_id>/active        -> ascii-decimal version
//! /flowpipe/schemas/<registry_id>/versions/<v>  -> JSON SchemaDefinition
//! ```

mod flows;
#[cfg(test)]
mod flows_test;
mod keys;
mod schemas;
mod watch;
#[cfg(test)]
mod watch_test;

pub use flows::FlowStore;
pub use keys::flow_name_from_active_key;
pub use schemas::SchemaRegistry;
pub use watch::{translate_event, FlowWatchEvent, FlowWatchEventKind};
