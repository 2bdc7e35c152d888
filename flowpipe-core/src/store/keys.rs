//! Key construction for the desired-state stores.

use crate::{FLOWS_PREFIX, SCHEMAS_PREFIX};

/// The prefix watched for flow desired-state changes.
pub(crate) fn flows_watch_prefix() -> String {
    format!("{}/", FLOWS_PREFIX)
}

/// The subtree holding every key of the named flow.
///
/// The trailing slash keeps prefix operations from touching flows whose
/// name shares a prefix with `name`.
pub(crate) fn flow_subtree(name: &str) -> String {
    format!("{}/{}/", FLOWS_PREFIX, name)
}

pub(crate) fn active_key(name: &str) -> String {
    format!("{}/{}/active", FLOWS_PREFIX, name)
}

pub(crate) fn version_spec_key(name: &str, version: u64) -> String {
    format!("{}/{}/versions/{}/spec", FLOWS_PREFIX, name, version)
}

pub(crate) fn status_key(name: &str) -> String {
    format!("{}/{}/status", FLOWS_PREFIX, name)
}

pub(crate) fn schema_subtree(registry_id: &str) -> String {
    format!("{}/{}/", SCHEMAS_PREFIX, registry_id)
}

pub(crate) fn schema_active_key(registry_id: &str) -> String {
    format!("{}/{}/active", SCHEMAS_PREFIX, registry_id)
}

pub(crate) fn schema_version_key(registry_id: &str, version: u32) -> String {
    format!("{}/{}/versions/{}", SCHEMAS_PREFIX, registry_id, version)
}

pub(crate) fn schema_versions_prefix(registry_id: &str) -> String {
    format!("{}/{}/versions/", SCHEMAS_PREFIX, registry_id)
}

/// Extract the flow name from an active-pointer key.
///
/// Returns `None` for keys which are not active pointers.
pub fn flow_name_from_active_key(key: &str) -> Option<&str> {
    let dir = key.strip_suffix("/active")?;
    let name = dir.rsplit('/').next()?;
    if name.is_empty() {
        return None;
    }
    Some(name)
}
