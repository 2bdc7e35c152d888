//! Flowpipe data model.
//!
//! The wire model lives in [`proto`] as committed generated code; this module
//! carries the hand-written extensions and the schema registry model.

pub mod proto;

use anyhow::{Context, Result};
use prost::Message;
use serde::{Deserialize, Serialize};

use proto::{
    CronConcurrencyPolicy, ExecutionMode, FlowSpec, FlowState, FlowStatus, ImagePullPolicy,
    KubernetesCronOptions, KubernetesOptions, QueueSchemaFormat, Resources, RestartPolicy,
    StreamingWorkloadKind,
};

/// A versioned schema artifact, keyed by registry id.
///
/// Schema definitions are persisted as JSON documents rather than protobuf;
/// the payload itself is opaque to the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub registry_id: String,
    /// Stamped by the registry during version allocation.
    pub version: u32,
    pub format: i32,
    pub raw_schema: Vec<u8>,
}

impl SchemaDefinition {
    /// The schema format, if the encoded value is known.
    pub fn format(&self) -> Option<QueueSchemaFormat> {
        QueueSchemaFormat::from_i32(self.format).filter(|f| *f != QueueSchemaFormat::Unspecified)
    }
}

impl FlowSpec {
    /// The execution mode of this flow, defaulting to streaming.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution
            .as_ref()
            .and_then(|exec| ExecutionMode::from_i32(exec.mode))
            .filter(|mode| *mode != ExecutionMode::Unspecified)
            .unwrap_or(ExecutionMode::Streaming)
    }

    /// The workload kind used when this flow runs in streaming mode.
    ///
    /// Flows are replicated workloads unless explicitly declared node-local.
    pub fn streaming_workload_kind(&self) -> StreamingWorkloadKind {
        self.kubernetes_options
            .as_ref()
            .and_then(|opts| StreamingWorkloadKind::from_i32(opts.streaming_workload_kind))
            .filter(|kind| *kind == StreamingWorkloadKind::DaemonSet)
            .unwrap_or(StreamingWorkloadKind::Deployment)
    }

    /// The runtime image of this flow, if declared and non-empty.
    pub fn image(&self) -> Option<&str> {
        self.kubernetes
            .as_ref()
            .and_then(|k8s| k8s.image.as_deref())
            .filter(|image| !image.is_empty())
    }

    /// The image pull policy as its cluster-side name.
    pub fn image_pull_policy_name(&self) -> &'static str {
        let policy = self
            .kubernetes
            .as_ref()
            .and_then(|k8s| ImagePullPolicy::from_i32(k8s.image_pull_policy));
        match policy {
            Some(ImagePullPolicy::Always) => "Always",
            Some(ImagePullPolicy::Never) => "Never",
            _ => "IfNotPresent",
        }
    }

    /// The pod restart policy as its cluster-side name.
    pub fn restart_policy_name(&self) -> &'static str {
        let policy = self
            .kubernetes
            .as_ref()
            .and_then(|k8s| RestartPolicy::from_i32(k8s.restart_policy));
        match policy {
            Some(RestartPolicy::Always) => "Always",
            Some(RestartPolicy::OnFailure) => "OnFailure",
            _ => "Never",
        }
    }

    /// The resource intent of this flow, if any.
    pub fn resources(&self) -> Option<&Resources> {
        self.kubernetes.as_ref().and_then(|k8s| k8s.resources.as_ref())
    }

    /// The cluster-specific knobs of this flow, if any.
    pub fn options(&self) -> Option<&KubernetesOptions> {
        self.kubernetes_options.as_ref()
    }

    /// The scheduled-job options of this flow, if a non-empty schedule is declared.
    pub fn cron(&self) -> Option<&KubernetesCronOptions> {
        self.kubernetes_options
            .as_ref()
            .and_then(|opts| opts.cron.as_ref())
            .filter(|cron| !cron.schedule.is_empty())
    }
}

impl KubernetesCronOptions {
    /// The concurrency policy as its cluster-side name, if explicitly set.
    pub fn concurrency_policy_name(&self) -> Option<&'static str> {
        match CronConcurrencyPolicy::from_i32(self.concurrency_policy) {
            Some(CronConcurrencyPolicy::Allow) => Some("Allow"),
            Some(CronConcurrencyPolicy::Forbid) => Some("Forbid"),
            Some(CronConcurrencyPolicy::Replace) => Some("Replace"),
            _ => None,
        }
    }
}

impl FlowStatus {
    /// Compose a status for a flow whose runtime objects were just applied.
    pub fn deploying(active_version: u64, workload: String, message: impl Into<String>) -> Self {
        Self {
            state: FlowState::Deploying as i32,
            message: message.into(),
            active_version,
            workload,
            updated_at_unix_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Encode the given model into a bytes vec.
pub fn encode_model<M: Message>(model: &M) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(model.encoded_len());
    model.encode(&mut buf).context("error serializing data model")?;
    Ok(buf)
}

/// Decode a model from the given buffer.
pub fn decode_model<M: Message + Default>(data: &[u8]) -> Result<M> {
    M::decode(data).context("error decoding object from storage")
}
