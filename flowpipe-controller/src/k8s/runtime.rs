//! Materialization of flow specs into cluster objects.
//!
//! Every flow owns a config artifact plus exactly one workload object,
//! chosen by execution mode: a Deployment or DaemonSet for streaming flows,
//! a Job or CronJob for job flows. The config artifact's content checksum is
//! stamped onto the pod template, so a spec change rolls the running pods.
//!
//! Object construction is pure and deterministic; only the apply and delete
//! paths talk to the cluster.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, Job, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EnvVar, LocalObjectReference, PodSpec,
    PodTemplateSpec, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use maplit::btreemap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::timeout;

use flowpipe_core::models::proto::{ExecutionMode, FlowSpec, StreamingWorkloadKind};

/// The default timeout to use for cluster API calls.
const API_TIMEOUT: Duration = Duration::from_secs(5);
/// The canonical flow-name label.
const LABEL_FLOW_NAME: &str = "flowpipe.io/flow-name";
/// The pod annotation carrying the config artifact checksum.
const ANNOTATION_CONFIG_CHECKSUM: &str = "flowpipe.io/flow-config-checksum";
/// The pod annotation carrying the resource profile tag.
const ANNOTATION_RESOURCE_PROFILE: &str = "flowpipe.io/resource-profile";
/// The key of the spec document inside the config artifact.
const CONFIG_KEY: &str = "flow.yaml";
/// The directory the config artifact is mounted at.
const CONFIG_MOUNT_DIR: &str = "/config";
/// The full path of the mounted spec document.
const CONFIG_PATH: &str = "/config/flow.yaml";
/// The pod container name of the flow runtime.
///
/// NOTE WELL: do not change the name of this container. It will cause breaking changes.
const CONTAINER_NAME_RUNTIME: &str = "runtime";
/// The volume name of the mounted config artifact.
const CONFIG_VOLUME: &str = "flow-config";

/// The cluster-facing surface the reconciler drives.
#[async_trait]
pub trait RuntimeBackend: Send + Sync + 'static {
    /// Converge the cluster onto the given spec; returns the workload name.
    async fn ensure(&self, spec: &FlowSpec) -> Result<String>;

    /// Best-effort removal of every object the named flow may own.
    async fn delete_all(&self, name: &str) -> Result<()>;
}

/// The pure object-construction half of the materializer.
#[derive(Clone)]
pub(crate) struct RuntimeSettings {
    pub namespace: String,
    pub observability_enabled: bool,
    pub otel_endpoint: String,
}

/// The desired object graph of a single flow.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DesiredRuntime {
    pub config_map: ConfigMap,
    pub config_map_name: String,
    pub checksum: String,
    pub workload_name: String,
    pub workload: DesiredWorkload,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum DesiredWorkload {
    Deployment(Deployment),
    DaemonSet(DaemonSet),
    Job(Job),
    CronJob(CronJob),
}

impl RuntimeSettings {
    /// Compute the full desired object graph for the given spec.
    pub(crate) fn desired(&self, spec: &FlowSpec) -> Result<DesiredRuntime> {
        if spec.name.is_empty() {
            bail!("flow name is required");
        }
        let image = match spec.image() {
            Some(image) => image.to_string(),
            None => bail!("runtime image is required for flow {:?}", spec.name),
        };

        let config_map_name = format!("{}-config", spec.name);
        let (config_map, checksum) = self.config_artifact(spec, &config_map_name)?;

        let (workload_name, workload) = match spec.execution_mode() {
            ExecutionMode::Job => {
                if spec.cron().is_some() {
                    let cron_job = self.cron_job(spec, &image, &config_map_name, &checksum);
                    (spec.name.clone(), DesiredWorkload::CronJob(cron_job))
                } else {
                    let job = self.job(spec, &image, &config_map_name, &checksum);
                    (spec.name.clone(), DesiredWorkload::Job(job))
                }
            }
            _ => {
                let workload_name = format!("{}-runtime", spec.name);
                match spec.streaming_workload_kind() {
                    StreamingWorkloadKind::DaemonSet => {
                        let set = self.daemon_set(spec, &workload_name, &image, &config_map_name, &checksum);
                        (workload_name, DesiredWorkload::DaemonSet(set))
                    }
                    _ => {
                        let deploy =
                            self.deployment(spec, &workload_name, &image, &config_map_name, &checksum);
                        (workload_name, DesiredWorkload::Deployment(deploy))
                    }
                }
            }
        };

        Ok(DesiredRuntime {
            config_map,
            config_map_name,
            checksum,
            workload_name,
            workload,
        })
    }

    /// Build the config artifact and its content checksum.
    ///
    /// The spec is rendered as a canonical YAML document; the hex SHA-256 of
    /// those exact bytes becomes the config hash stamped onto pod templates.
    fn config_artifact(&self, spec: &FlowSpec, name: &str) -> Result<(ConfigMap, String)> {
        let value = serde_json::to_value(spec).context("error encoding flow spec")?;
        let payload = serde_yaml::to_string(&value).context("error rendering flow spec as yaml")?;
        let checksum = hex::encode(Sha256::digest(payload.as_bytes()));

        let config_map = ConfigMap {
            metadata: self.object_meta(name, &spec.name),
            data: Some(btreemap! {
                CONFIG_KEY.to_string() => payload,
            }),
            ..Default::default()
        };
        Ok((config_map, checksum))
    }

    fn deployment(
        &self,
        spec: &FlowSpec,
        name: &str,
        image: &str,
        config_map_name: &str,
        checksum: &str,
    ) -> Deployment {
        Deployment {
            metadata: self.object_meta(name, &spec.name),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(flow_labels(&spec.name)),
                    ..Default::default()
                },
                template: self.pod_template(spec, image, config_map_name, checksum, None),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn daemon_set(
        &self,
        spec: &FlowSpec,
        name: &str,
        image: &str,
        config_map_name: &str,
        checksum: &str,
    ) -> DaemonSet {
        DaemonSet {
            metadata: self.object_meta(name, &spec.name),
            spec: Some(DaemonSetSpec {
                selector: LabelSelector {
                    match_labels: Some(flow_labels(&spec.name)),
                    ..Default::default()
                },
                template: self.pod_template(spec, image, config_map_name, checksum, None),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn job(&self, spec: &FlowSpec, image: &str, config_map_name: &str, checksum: &str) -> Job {
        Job {
            metadata: self.object_meta(&spec.name, &spec.name),
            spec: Some(JobSpec {
                template: self.pod_template(
                    spec,
                    image,
                    config_map_name,
                    checksum,
                    Some(spec.restart_policy_name().to_string()),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn cron_job(
        &self,
        spec: &FlowSpec,
        image: &str,
        config_map_name: &str,
        checksum: &str,
    ) -> CronJob {
        let cron = spec.cron().expect("cron options checked by caller");
        let template = self.pod_template(
            spec,
            image,
            config_map_name,
            checksum,
            Some(spec.restart_policy_name().to_string()),
        );
        CronJob {
            metadata: self.object_meta(&spec.name, &spec.name),
            spec: Some(CronJobSpec {
                schedule: cron.schedule.clone(),
                time_zone: cron.time_zone.clone(),
                suspend: cron.suspend,
                starting_deadline_seconds: cron.starting_deadline_seconds,
                successful_jobs_history_limit: cron.successful_jobs_history_limit,
                failed_jobs_history_limit: cron.failed_jobs_history_limit,
                concurrency_policy: cron.concurrency_policy_name().map(Into::into),
                job_template: JobTemplateSpec {
                    spec: Some(JobSpec {
                        template,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Build the shared runtime pod template.
    fn pod_template(
        &self,
        spec: &FlowSpec,
        image: &str,
        config_map_name: &str,
        checksum: &str,
        restart_policy: Option<String>,
    ) -> PodTemplateSpec {
        let mut template = PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(flow_labels(&spec.name)),
                annotations: Some(btreemap! {
                    ANNOTATION_CONFIG_CHECKSUM.to_string() => checksum.to_string(),
                }),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                restart_policy,
                containers: vec![Container {
                    name: CONTAINER_NAME_RUNTIME.into(),
                    image: Some(image.to_string()),
                    image_pull_policy: Some(spec.image_pull_policy_name().into()),
                    args: Some(vec![CONFIG_PATH.into()]),
                    env: Some(self.runtime_env(&spec.env)),
                    volume_mounts: Some(vec![VolumeMount {
                        name: CONFIG_VOLUME.into(),
                        mount_path: CONFIG_MOUNT_DIR.into(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                volumes: Some(vec![Volume {
                    name: CONFIG_VOLUME.into(),
                    config_map: Some(ConfigMapVolumeSource {
                        name: Some(config_map_name.to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        };
        self.apply_resource_intent(&mut template, spec);
        self.apply_kubernetes_options(&mut template, spec);
        template
    }

    /// Build the runtime container environment.
    ///
    /// The fixed observability set comes first; spec entries follow in key
    /// order and never overwrite a fixed entry.
    fn runtime_env(&self, extra: &BTreeMap<String, String>) -> Vec<EnvVar> {
        let mut env = vec![EnvVar {
            name: "FLOWPIPE_OBSERVABILITY_ENABLED".into(),
            value: Some(self.observability_enabled.to_string()),
            ..Default::default()
        }];
        if self.observability_enabled {
            for name in &[
                "FLOWPIPE_METRICS_ENABLED",
                "FLOWPIPE_TRACING_ENABLED",
                "FLOWPIPE_LOGS_ENABLED",
            ] {
                env.push(EnvVar {
                    name: (*name).into(),
                    value: Some("true".into()),
                    ..Default::default()
                });
            }
            env.push(EnvVar {
                name: "OTEL_EXPORTER_OTLP_ENDPOINT".into(),
                value: Some(self.otel_endpoint.clone()),
                ..Default::default()
            });
        }

        for (key, value) in extra {
            if env.iter().any(|entry| entry.name == *key) {
                continue;
            }
            env.push(EnvVar {
                name: key.clone(),
                value: Some(value.clone()),
                ..Default::default()
            });
        }
        env
    }

    /// Project the spec's resource intent onto the pod template.
    fn apply_resource_intent(&self, template: &mut PodTemplateSpec, spec: &FlowSpec) {
        let intent = match spec.resources() {
            Some(intent) => intent,
            None => return,
        };

        if let Some(profile) = intent.profile.as_deref().filter(|profile| !profile.is_empty()) {
            let metadata = template.metadata.get_or_insert_with(Default::default);
            metadata
                .annotations
                .get_or_insert_with(Default::default)
                .insert(ANNOTATION_RESOURCE_PROFILE.to_string(), profile.to_string());
        }

        let mut requests = BTreeMap::new();
        if let Some(cores) = intent.cpu_cores.filter(|cores| *cores > 0) {
            requests.insert("cpu".to_string(), Quantity(cores.to_string()));
        }
        if let Some(memory_mb) = intent.memory_mb.filter(|memory| *memory > 0) {
            requests.insert("memory".to_string(), Quantity(format!("{}M", memory_mb)));
        }
        if requests.is_empty() {
            return;
        }

        let pod_spec = match template.spec.as_mut() {
            Some(pod_spec) => pod_spec,
            None => return,
        };
        let container = match pod_spec.containers.first_mut() {
            Some(container) => container,
            None => return,
        };
        let resources = container.resources.get_or_insert_with(ResourceRequirements::default);
        resources.requests.get_or_insert_with(Default::default).extend(requests);
    }

    /// Project the spec's cluster-specific knobs onto the pod template.
    ///
    /// The reserved flow-name label and checksum annotation cannot be
    /// overridden by the spec.
    fn apply_kubernetes_options(&self, template: &mut PodTemplateSpec, spec: &FlowSpec) {
        let options = match spec.options() {
            Some(options) => options,
            None => return,
        };

        if !options.pod_labels.is_empty() {
            let metadata = template.metadata.get_or_insert_with(Default::default);
            let labels = metadata.labels.get_or_insert_with(Default::default);
            for (key, value) in &options.pod_labels {
                if key == LABEL_FLOW_NAME {
                    continue;
                }
                labels.insert(key.clone(), value.clone());
            }
        }

        if !options.pod_annotations.is_empty() {
            let metadata = template.metadata.get_or_insert_with(Default::default);
            let annotations = metadata.annotations.get_or_insert_with(Default::default);
            for (key, value) in &options.pod_annotations {
                if key == ANNOTATION_CONFIG_CHECKSUM {
                    continue;
                }
                annotations.insert(key.clone(), value.clone());
            }
        }

        let pod_spec = match template.spec.as_mut() {
            Some(pod_spec) => pod_spec,
            None => return,
        };
        if let Some(account) = options.service_account_name.clone() {
            pod_spec.service_account_name = Some(account);
        }
        if !options.image_pull_secrets.is_empty() {
            let secrets: Vec<_> = options
                .image_pull_secrets
                .iter()
                .filter(|name| !name.is_empty())
                .map(|name| LocalObjectReference { name: Some(name.clone()) })
                .collect();
            pod_spec.image_pull_secrets = Some(secrets);
        }
        if let Some(class) = options.runtime_class_name.clone() {
            pod_spec.runtime_class_name = Some(class);
        }
    }

    fn object_meta(&self, name: &str, flow: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(flow_labels(flow)),
            ..Default::default()
        }
    }
}

/// The canonical labels identifying a flow's objects.
fn flow_labels(flow: &str) -> BTreeMap<String, String> {
    btreemap! {
        LABEL_FLOW_NAME.to_string() => flow.to_string(),
    }
}

/// The cluster-backed materializer.
pub struct FlowRuntime {
    client: Client,
    settings: RuntimeSettings,
}

impl FlowRuntime {
    /// Create a new instance.
    pub fn new(
        client: Client,
        namespace: String,
        observability_enabled: bool,
        otel_endpoint: String,
    ) -> Self {
        Self {
            client,
            settings: RuntimeSettings {
                namespace,
                observability_enabled,
                otel_endpoint,
            },
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.settings.namespace)
    }

    /// Get-then-create-or-replace of a single object. Re-entrant: repeated
    /// calls with the same desired object converge.
    async fn apply<K, F>(&self, api: Api<K>, name: &str, desired: K, merge: F) -> Result<()>
    where
        K: Clone + DeserializeOwned + Serialize + Debug,
        F: FnOnce(&mut K, K),
    {
        let found = timeout(API_TIMEOUT, api.get(name))
            .await
            .context("timeout fetching object")?;
        match found {
            Ok(mut current) => {
                merge(&mut current, desired);
                timeout(API_TIMEOUT, api.replace(name, &PostParams::default(), &current))
                    .await
                    .context("timeout updating object")?
                    .context("error updating object")?;
                Ok(())
            }
            Err(err) if is_not_found(&err) => {
                timeout(API_TIMEOUT, api.create(&PostParams::default(), &desired))
                    .await
                    .context("timeout creating object")?
                    .context("error creating object")?;
                Ok(())
            }
            Err(err) => Err(err).context("error fetching object"),
        }
    }

    /// Jobs are create-only: their pod template is immutable, and a finished
    /// run is left in place for inspection.
    async fn apply_job(&self, name: &str, desired: Job) -> Result<()> {
        let api: Api<Job> = self.api();
        let found = timeout(API_TIMEOUT, api.get(name))
            .await
            .context("timeout fetching job")?;
        match found {
            Ok(_current) => Ok(()),
            Err(err) if is_not_found(&err) => {
                timeout(API_TIMEOUT, api.create(&PostParams::default(), &desired))
                    .await
                    .context("timeout creating job")?
                    .context("error creating job")?;
                Ok(())
            }
            Err(err) => Err(err).context("error fetching job"),
        }
    }

    /// Best-effort delete of a single object; not-found is success.
    async fn delete_object<K>(&self, api: Api<K>, name: &str) -> Result<()>
    where
        K: Clone + DeserializeOwned + Debug,
    {
        let res = timeout(API_TIMEOUT, api.delete(name, &DeleteParams::default()))
            .await
            .context("timeout deleting object")?;
        match res {
            Ok(_status) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err).context("error deleting object"),
        }
    }
}

#[async_trait]
impl RuntimeBackend for FlowRuntime {
    #[tracing::instrument(level = "debug", skip(self, spec), fields(flow = %spec.name))]
    async fn ensure(&self, spec: &FlowSpec) -> Result<String> {
        let desired = self.settings.desired(spec)?;

        self.apply(
            self.api::<ConfigMap>(),
            &desired.config_map_name,
            desired.config_map,
            |current, wanted| {
                current.data = wanted.data;
                current.metadata.labels = wanted.metadata.labels;
            },
        )
        .await
        .context("error applying config artifact")?;

        match desired.workload {
            DesiredWorkload::Deployment(deployment) => {
                self.apply(
                    self.api::<Deployment>(),
                    &desired.workload_name,
                    deployment,
                    |current, wanted| {
                        current.spec = wanted.spec;
                        current.metadata.labels = wanted.metadata.labels;
                    },
                )
                .await
                .context("error applying deployment")?;
            }
            DesiredWorkload::DaemonSet(set) => {
                self.apply(
                    self.api::<DaemonSet>(),
                    &desired.workload_name,
                    set,
                    |current, wanted| {
                        current.spec = wanted.spec;
                        current.metadata.labels = wanted.metadata.labels;
                    },
                )
                .await
                .context("error applying daemonset")?;
            }
            DesiredWorkload::Job(job) => {
                self.apply_job(&desired.workload_name, job)
                    .await
                    .context("error applying job")?;
            }
            DesiredWorkload::CronJob(cron_job) => {
                self.apply(
                    self.api::<CronJob>(),
                    &desired.workload_name,
                    cron_job,
                    |current, wanted| {
                        current.spec = wanted.spec;
                        current.metadata.labels = wanted.metadata.labels;
                    },
                )
                .await
                .context("error applying cronjob")?;
            }
        }

        Ok(desired.workload_name)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_all(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            bail!("flow name is required for runtime deletion");
        }

        let runtime_name = format!("{}-runtime", name);
        let config_map_name = format!("{}-config", name);
        let mut failures = Vec::new();

        if let Err(err) = self.delete_object(self.api::<Deployment>(), &runtime_name).await {
            failures.push(format!("delete deployment {:?}: {:#}", runtime_name, err));
        }
        if let Err(err) = self.delete_object(self.api::<DaemonSet>(), &runtime_name).await {
            failures.push(format!("delete daemonset {:?}: {:#}", runtime_name, err));
        }
        if let Err(err) = self.delete_object(self.api::<Job>(), name).await {
            failures.push(format!("delete job {:?}: {:#}", name, err));
        }
        if let Err(err) = self.delete_object(self.api::<CronJob>(), name).await {
            failures.push(format!("delete cronjob {:?}: {:#}", name, err));
        }
        if let Err(err) = self.delete_object(self.api::<ConfigMap>(), &config_map_name).await {
            failures.push(format!("delete configmap {:?}: {:#}", config_map_name, err));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(failures.join("; ")))
        }
    }
}

/// Check whether the given cluster error is a not-found response.
fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == http::StatusCode::NOT_FOUND.as_u16())
}
