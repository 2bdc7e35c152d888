use sha2::{Digest, Sha256};

use flowpipe_core::models::proto::{
    CronConcurrencyPolicy, Execution, ExecutionMode, FlowSpec, KubernetesCronOptions,
    KubernetesOptions, KubernetesSettings, Resources, RestartPolicy, StreamingWorkloadKind,
};

use super::runtime::{DesiredWorkload, RuntimeSettings};

fn settings() -> RuntimeSettings {
    RuntimeSettings {
        namespace: "default".into(),
        observability_enabled: true,
        otel_endpoint: "collector:4317".into(),
    }
}

fn spec(name: &str, mode: ExecutionMode) -> FlowSpec {
    FlowSpec {
        name: name.into(),
        execution: Some(Execution { mode: mode as i32 }),
        kubernetes: Some(KubernetesSettings {
            image: Some("runtime:latest".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn streaming_flow_materializes_a_deployment() {
    let desired = settings()
        .desired(&spec("noop-observability", ExecutionMode::Streaming))
        .expect("desired objects");

    assert_eq!(desired.config_map_name, "noop-observability-config");
    assert_eq!(desired.workload_name, "noop-observability-runtime");

    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let deploy_spec = deployment.spec.as_ref().expect("deployment spec");
    assert_eq!(deploy_spec.replicas, Some(1));

    let pod_spec = deploy_spec.template.spec.as_ref().expect("pod spec");
    let container = &pod_spec.containers[0];
    assert_eq!(container.name, "runtime");
    assert_eq!(container.image.as_deref(), Some("runtime:latest"));
    assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
    assert_eq!(
        container.args.as_deref(),
        Some(&["/config/flow.yaml".to_string()][..])
    );
    let mounts = container.volume_mounts.as_ref().expect("volume mounts");
    assert_eq!(mounts[0].mount_path, "/config");
    let volumes = pod_spec.volumes.as_ref().expect("volumes");
    assert_eq!(
        volumes[0].config_map.as_ref().and_then(|cm| cm.name.as_deref()),
        Some("noop-observability-config")
    );

    let labels = deploy_spec.template.metadata.as_ref().and_then(|m| m.labels.as_ref()).unwrap();
    assert_eq!(
        labels.get("flowpipe.io/flow-name").map(String::as_str),
        Some("noop-observability")
    );
}

#[test]
fn node_local_flow_materializes_a_daemon_set() {
    let mut flow_spec = spec("noop-daemon", ExecutionMode::Streaming);
    flow_spec.kubernetes_options = Some(KubernetesOptions {
        streaming_workload_kind: StreamingWorkloadKind::DaemonSet as i32,
        ..Default::default()
    });

    let desired = settings().desired(&flow_spec).expect("desired objects");
    assert_eq!(desired.workload_name, "noop-daemon-runtime");
    assert!(matches!(desired.workload, DesiredWorkload::DaemonSet(_)));
}

#[test]
fn job_flow_materializes_a_job_with_never_restart_default() {
    let desired = settings()
        .desired(&spec("simple-pipeline-job", ExecutionMode::Job))
        .expect("desired objects");

    assert_eq!(desired.workload_name, "simple-pipeline-job");
    let job = match &desired.workload {
        DesiredWorkload::Job(job) => job,
        other => panic!("expected job, got {:?}", other),
    };
    let pod_spec = job
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .expect("pod spec");
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("Never"));
}

#[test]
fn job_restart_policy_follows_the_spec() {
    let mut flow_spec = spec("retrying-job", ExecutionMode::Job);
    flow_spec.kubernetes.as_mut().unwrap().restart_policy = RestartPolicy::OnFailure as i32;

    let desired = settings().desired(&flow_spec).expect("desired objects");
    let job = match &desired.workload {
        DesiredWorkload::Job(job) => job,
        other => panic!("expected job, got {:?}", other),
    };
    let pod_spec = job
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .expect("pod spec");
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("OnFailure"));
}

#[test]
fn scheduled_job_flow_materializes_a_cron_job() {
    let mut flow_spec = spec("nightly", ExecutionMode::Job);
    flow_spec.kubernetes_options = Some(KubernetesOptions {
        cron: Some(KubernetesCronOptions {
            schedule: "*/5 * * * *".into(),
            time_zone: Some("Etc/UTC".into()),
            suspend: Some(true),
            starting_deadline_seconds: Some(120),
            successful_jobs_history_limit: Some(3),
            failed_jobs_history_limit: Some(1),
            concurrency_policy: CronConcurrencyPolicy::Forbid as i32,
        }),
        ..Default::default()
    });

    let desired = settings().desired(&flow_spec).expect("desired objects");
    assert_eq!(desired.workload_name, "nightly");
    let cron_job = match &desired.workload {
        DesiredWorkload::CronJob(cron_job) => cron_job,
        other => panic!("expected cronjob, got {:?}", other),
    };
    let cron_spec = cron_job.spec.as_ref().expect("cronjob spec");
    assert_eq!(cron_spec.schedule, "*/5 * * * *");
    assert_eq!(cron_spec.time_zone.as_deref(), Some("Etc/UTC"));
    assert_eq!(cron_spec.suspend, Some(true));
    assert_eq!(cron_spec.starting_deadline_seconds, Some(120));
    assert_eq!(cron_spec.successful_jobs_history_limit, Some(3));
    assert_eq!(cron_spec.failed_jobs_history_limit, Some(1));
    assert_eq!(cron_spec.concurrency_policy.as_deref(), Some("Forbid"));

    let pod_spec = cron_spec
        .job_template
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .expect("pod spec");
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("Never"));
}

#[test]
fn checksum_annotation_matches_config_artifact_bytes() {
    let desired = settings()
        .desired(&spec("orders", ExecutionMode::Streaming))
        .expect("desired objects");

    let payload = desired
        .config_map
        .data
        .as_ref()
        .and_then(|data| data.get("flow.yaml"))
        .expect("config artifact payload");
    let expected = hex::encode(Sha256::digest(payload.as_bytes()));
    assert_eq!(desired.checksum, expected);

    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let annotations = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.metadata.as_ref())
        .and_then(|meta| meta.annotations.as_ref())
        .expect("pod annotations");
    assert_eq!(
        annotations.get("flowpipe.io/flow-config-checksum"),
        Some(&expected)
    );
}

#[test]
fn spec_changes_change_the_checksum() {
    let first = settings().desired(&spec("orders", ExecutionMode::Streaming)).unwrap();

    let mut changed = spec("orders", ExecutionMode::Streaming);
    changed.kubernetes.as_mut().unwrap().image = Some("runtime:v2".into());
    let second = settings().desired(&changed).unwrap();

    assert_ne!(first.checksum, second.checksum);
}

#[test]
fn environment_merges_fixed_set_first_without_overwrites() {
    let mut flow_spec = spec("orders", ExecutionMode::Streaming);
    flow_spec.env.insert("ZED".into(), "z".into());
    flow_spec.env.insert("ALPHA".into(), "a".into());
    flow_spec.env.insert("FLOWPIPE_OBSERVABILITY_ENABLED".into(), "false".into());

    let desired = settings().desired(&flow_spec).unwrap();
    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let env = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod| pod.containers[0].env.as_ref().expect("container env"))
        .expect("pod spec");

    let names: Vec<_> = env.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "FLOWPIPE_OBSERVABILITY_ENABLED",
            "FLOWPIPE_METRICS_ENABLED",
            "FLOWPIPE_TRACING_ENABLED",
            "FLOWPIPE_LOGS_ENABLED",
            "OTEL_EXPORTER_OTLP_ENDPOINT",
            "ALPHA",
            "ZED",
        ]
    );
    // The spec entry must not overwrite the fixed toggle.
    assert_eq!(env[0].value.as_deref(), Some("true"));
    assert_eq!(env[4].value.as_deref(), Some("collector:4317"));
}

#[test]
fn observability_disabled_projects_only_the_toggle() {
    let mut quiet = settings();
    quiet.observability_enabled = false;

    let desired = quiet.desired(&spec("orders", ExecutionMode::Streaming)).unwrap();
    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let env = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod| pod.containers[0].env.as_ref().expect("container env"))
        .expect("pod spec");
    assert_eq!(env.len(), 1);
    assert_eq!(env[0].name, "FLOWPIPE_OBSERVABILITY_ENABLED");
    assert_eq!(env[0].value.as_deref(), Some("false"));
}

#[test]
fn kubernetes_options_project_onto_the_pod_template() {
    let mut flow_spec = spec("noop-options", ExecutionMode::Streaming);
    let mut options = KubernetesOptions {
        service_account_name: Some("flow-runner".into()),
        image_pull_secrets: vec!["regcred".into(), "".into()],
        runtime_class_name: Some("kata".into()),
        ..Default::default()
    };
    options.pod_labels.insert("team".into(), "edge".into());
    options.pod_labels.insert("flowpipe.io/flow-name".into(), "spoofed".into());
    options.pod_annotations.insert("example.com/trace".into(), "true".into());
    options
        .pod_annotations
        .insert("flowpipe.io/flow-config-checksum".into(), "spoofed".into());
    flow_spec.kubernetes_options = Some(options);

    let desired = settings().desired(&flow_spec).unwrap();
    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let template = &deployment.spec.as_ref().unwrap().template;
    let metadata = template.metadata.as_ref().unwrap();
    let labels = metadata.labels.as_ref().unwrap();
    let annotations = metadata.annotations.as_ref().unwrap();

    assert_eq!(labels.get("team").map(String::as_str), Some("edge"));
    assert_eq!(
        labels.get("flowpipe.io/flow-name").map(String::as_str),
        Some("noop-options"),
        "reserved label must win over spec overrides"
    );
    assert_eq!(annotations.get("example.com/trace").map(String::as_str), Some("true"));
    assert_eq!(
        annotations.get("flowpipe.io/flow-config-checksum"),
        Some(&desired.checksum),
        "reserved annotation must win over spec overrides"
    );

    let pod_spec = template.spec.as_ref().unwrap();
    assert_eq!(pod_spec.service_account_name.as_deref(), Some("flow-runner"));
    assert_eq!(
        pod_spec
            .image_pull_secrets
            .as_ref()
            .map(|secrets| secrets.iter().filter_map(|s| s.name.as_deref()).collect::<Vec<_>>()),
        Some(vec!["regcred"]),
        "empty pull secret names are dropped"
    );
    assert_eq!(pod_spec.runtime_class_name.as_deref(), Some("kata"));
}

#[test]
fn resource_intent_projects_requests_and_profile() {
    let mut flow_spec = spec("orders", ExecutionMode::Streaming);
    flow_spec.kubernetes.as_mut().unwrap().resources = Some(Resources {
        cpu_cores: Some(2),
        memory_mb: Some(512),
        profile: Some("burst".into()),
    });

    let desired = settings().desired(&flow_spec).unwrap();
    let deployment = match &desired.workload {
        DesiredWorkload::Deployment(deployment) => deployment,
        other => panic!("expected deployment, got {:?}", other),
    };
    let template = &deployment.spec.as_ref().unwrap().template;
    let annotations = template.metadata.as_ref().and_then(|m| m.annotations.as_ref()).unwrap();
    assert_eq!(
        annotations.get("flowpipe.io/resource-profile").map(String::as_str),
        Some("burst")
    );

    let requests = template
        .spec
        .as_ref()
        .and_then(|pod| pod.containers[0].resources.as_ref())
        .and_then(|resources| resources.requests.as_ref())
        .expect("resource requests");
    assert_eq!(requests.get("cpu").map(|q| q.0.as_str()), Some("2"));
    assert_eq!(requests.get("memory").map(|q| q.0.as_str()), Some("512M"));
}

#[test]
fn materialization_is_deterministic() {
    let mut flow_spec = spec("orders", ExecutionMode::Streaming);
    flow_spec.env.insert("A".into(), "1".into());
    flow_spec.env.insert("B".into(), "2".into());

    let first = settings().desired(&flow_spec).unwrap();
    let second = settings().desired(&flow_spec).unwrap();
    assert_eq!(first, second);

    // Byte-level equality of the serialized objects, not just struct equality.
    let first_bytes = serde_json::to_vec(&match &first.workload {
        DesiredWorkload::Deployment(deployment) => deployment.clone(),
        other => panic!("expected deployment, got {:?}", other),
    })
    .unwrap();
    let second_bytes = serde_json::to_vec(&match &second.workload {
        DesiredWorkload::Deployment(deployment) => deployment.clone(),
        other => panic!("expected deployment, got {:?}", other),
    })
    .unwrap();
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(
        serde_json::to_vec(&first.config_map).unwrap(),
        serde_json::to_vec(&second.config_map).unwrap()
    );
}

#[test]
fn missing_image_is_a_hard_error() {
    let mut flow_spec = spec("orders", ExecutionMode::Streaming);
    flow_spec.kubernetes = None;
    assert!(settings().desired(&flow_spec).is_err());

    flow_spec.kubernetes = Some(KubernetesSettings {
        image: Some("".into()),
        ..Default::default()
    });
    assert!(settings().desired(&flow_spec).is_err());
}
