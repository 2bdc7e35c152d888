/// A named, versioned flow definition along with its controller-owned status.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct Flow {
    /// The unique name of this flow.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The active version of this flow.
    #[prost(uint64, tag = "2")]
    pub version: u64,
    /// The spec at the active version.
    #[prost(message, optional, tag = "3")]
    pub spec: ::core::option::Option<FlowSpec>,
    /// The last observed status, owned by the controller.
    #[prost(message, optional, tag = "4")]
    pub status: ::core::option::Option<FlowStatus>,
}
/// The desired state of a flow at a single version.
///
/// Specs are immutable once committed; the `version` field is stamped by the
/// store during version allocation, never by the client.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct FlowSpec {
    /// The unique name of this flow.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The version of this spec, stamped by the store.
    #[prost(uint64, tag = "2")]
    pub version: u64,
    /// Execution intent for this flow.
    #[prost(message, optional, tag = "3")]
    pub execution: ::core::option::Option<Execution>,
    /// Cluster runtime settings.
    #[prost(message, optional, tag = "4")]
    pub kubernetes: ::core::option::Option<KubernetesSettings>,
    /// Cluster-specific knobs applied to the materialized workload.
    #[prost(message, optional, tag = "5")]
    pub kubernetes_options: ::core::option::Option<KubernetesOptions>,
    /// The bounded queues connecting stages.
    #[prost(message, repeated, tag = "6")]
    pub queues: ::prost::alloc::vec::Vec<QueueSpec>,
    /// The stages of this flow.
    #[prost(message, repeated, tag = "7")]
    pub stages: ::prost::alloc::vec::Vec<StageSpec>,
    /// Arbitrary environment passed to the runtime container.
    #[prost(btree_map = "string, string", tag = "8")]
    pub env: ::prost::alloc::collections::BTreeMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
}
/// Execution intent of a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct Execution {
    #[prost(enumeration = "ExecutionMode", tag = "1")]
    pub mode: i32,
}
/// Cluster runtime settings of a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct KubernetesSettings {
    /// The runtime container image.
    #[prost(string, optional, tag = "1")]
    pub image: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "ImagePullPolicy", tag = "2")]
    pub image_pull_policy: i32,
    #[prost(enumeration = "RestartPolicy", tag = "3")]
    pub restart_policy: i32,
    /// Optional resource intent for the runtime container.
    #[prost(message, optional, tag = "4")]
    pub resources: ::core::option::Option<Resources>,
}
/// Resource intent for the runtime container.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct Resources {
    /// Requested CPU in whole cores.
    #[prost(uint32, optional, tag = "1")]
    pub cpu_cores: ::core::option::Option<u32>,
    /// Requested memory in megabytes.
    #[prost(uint64, optional, tag = "2")]
    pub memory_mb: ::core::option::Option<u64>,
    /// Opaque resource profile tag.
    #[prost(string, optional, tag = "3")]
    pub profile: ::core::option::Option<::prost::alloc::string::String>,
}
/// Cluster-specific knobs projected onto the materialized workload.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct KubernetesOptions {
    /// The workload kind used for streaming flows.
    #[prost(enumeration = "StreamingWorkloadKind", tag = "1")]
    pub streaming_workload_kind: i32,
    /// Extra labels applied to runtime pods.
    #[prost(btree_map = "string, string", tag = "2")]
    pub pod_labels: ::prost::alloc::collections::BTreeMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    /// Extra annotations applied to runtime pods.
    #[prost(btree_map = "string, string", tag = "3")]
    pub pod_annotations: ::prost::alloc::collections::BTreeMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    /// The service account used by runtime pods.
    #[prost(string, optional, tag = "4")]
    pub service_account_name: ::core::option::Option<::prost::alloc::string::String>,
    /// Names of image pull secrets used by runtime pods.
    #[prost(string, repeated, tag = "5")]
    pub image_pull_secrets: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// The runtime class of runtime pods.
    #[prost(string, optional, tag = "6")]
    pub runtime_class_name: ::core::option::Option<::prost::alloc::string::String>,
    /// Scheduled-job options; only consulted for job-mode flows.
    #[prost(message, optional, tag = "7")]
    pub cron: ::core::option::Option<KubernetesCronOptions>,
}
/// Scheduled-job options for job-mode flows.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct KubernetesCronOptions {
    /// The cron expression of the schedule.
    #[prost(string, tag = "1")]
    pub schedule: ::prost::alloc::string::String,
    /// The time zone the schedule is evaluated in.
    #[prost(string, optional, tag = "2")]
    pub time_zone: ::core::option::Option<::prost::alloc::string::String>,
    /// Suspend subsequent executions.
    #[prost(bool, optional, tag = "3")]
    pub suspend: ::core::option::Option<bool>,
    /// Deadline in seconds for starting a job which misses its scheduled time.
    #[prost(int64, optional, tag = "4")]
    pub starting_deadline_seconds: ::core::option::Option<i64>,
    /// Number of successful finished jobs to retain.
    #[prost(int32, optional, tag = "5")]
    pub successful_jobs_history_limit: ::core::option::Option<i32>,
    /// Number of failed finished jobs to retain.
    #[prost(int32, optional, tag = "6")]
    pub failed_jobs_history_limit: ::core::option::Option<i32>,
    #[prost(enumeration = "CronConcurrencyPolicy", tag = "7")]
    pub concurrency_policy: i32,
}
/// A bounded queue connecting stages of a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct QueueSpec {
    /// The name of this queue, unique per flow.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The capacity of this queue, always positive.
    #[prost(uint32, tag = "2")]
    pub capacity: u32,
}
/// A processing stage of a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct StageSpec {
    /// The name of this stage, unique per flow.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The implementation type of this stage.
    #[prost(string, tag = "2")]
    pub r#type: ::prost::alloc::string::String,
    /// The number of worker threads of this stage.
    #[prost(uint32, tag = "3")]
    pub threads: u32,
    /// The input queue of this stage; sources omit it.
    #[prost(string, optional, tag = "4")]
    pub input: ::core::option::Option<::prost::alloc::string::String>,
    /// The output queue of this stage; sinks omit it.
    #[prost(string, optional, tag = "5")]
    pub output: ::core::option::Option<::prost::alloc::string::String>,
}
/// The observed status of a flow, owned by the controller.
#[derive(Clone, PartialEq, ::prost::Message)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
pub struct FlowStatus {
    #[prost(enumeration = "FlowState", tag = "1")]
    pub state: i32,
    /// Freeform human-readable detail.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// The version this status was observed against.
    #[prost(uint64, tag = "3")]
    pub active_version: u64,
    /// The name of the materialized workload object.
    #[prost(string, tag = "4")]
    pub workload: ::prost::alloc::string::String,
    /// Unix milliseconds of the last status update.
    #[prost(int64, tag = "5")]
    pub updated_at_unix_ms: i64,
}
/// The execution intent of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum ExecutionMode {
    Unspecified = 0,
    /// A long-running streaming workload.
    Streaming = 1,
    /// A run-to-completion job.
    Job = 2,
}
/// The workload kind used for streaming flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum StreamingWorkloadKind {
    Unspecified = 0,
    /// A replicated workload.
    Deployment = 1,
    /// A node-local workload.
    DaemonSet = 2,
}
/// The image pull policy of the runtime container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum ImagePullPolicy {
    Unspecified = 0,
    Always = 1,
    Never = 2,
    IfNotPresent = 3,
}
/// The restart policy of runtime pods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum RestartPolicy {
    Unspecified = 0,
    Always = 1,
    OnFailure = 2,
    Never = 3,
}
/// Concurrency policy of a scheduled job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum CronConcurrencyPolicy {
    Unspecified = 0,
    Allow = 1,
    Forbid = 2,
    Replace = 3,
}
/// The lifecycle state of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum FlowState {
    Unspecified = 0,
    Pending = 1,
    Deploying = 2,
    Running = 3,
    Failed = 4,
}
/// The format of a registered queue schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[repr(i32)]
pub enum QueueSchemaFormat {
    Unspecified = 0,
    Avro = 1,
    JsonSchema = 2,
    Protobuf = 3,
    Flatbuffers = 4,
    Parquet = 5,
}
