use kfp_config::load_config_from_str;
use kfp_config::resolver::{
    resolve_node_pool, resolve_resources, resolve_retry_policy, resolve_tolerations,
};
use kfp_config::shared::{DEFAULT_NODE_POOL, RetryPolicy};
use kfp_telemetry::init_test_tracing;

const PIPELINE_YAML: &str = r#"
host: https://kubeflow.example.com/pipeline
run_config:
  image: registry.example.com/pipelines/training:1.4.0
  experiment_name: training
  run_name: nightly
  resources:
    __default__:
      cpu: 200m
      memory: 64Mi
    gpu-pool:
      nvidia.com/gpu: 1
      memory: 16Gi
  tolerations:
    __default__:
      - key: dedicated
        operator: Equal
        value: pipelines
        effect: NoSchedule
    gpu-pool:
      - key: nvidia.com/gpu
        operator: Exists
        effect: NoSchedule
  retry_policy:
    gpu-pool:
      num_retries: "3"
      backoff_duration: 5m
      backoff_factor: 2
"#;

#[test]
fn resolves_every_domain_for_a_specific_pool() {
    init_test_tracing();

    let config = load_config_from_str(PIPELINE_YAML).unwrap();
    let resolved = resolve_node_pool(&config, "gpu-pool");

    assert_eq!(resolved.resources["cpu"], "200m");
    assert_eq!(resolved.resources["memory"], "16Gi");
    assert_eq!(resolved.resources["nvidia.com/gpu"], "1");

    assert_eq!(resolved.tolerations.len(), 1);
    assert_eq!(resolved.tolerations[0].key, "nvidia.com/gpu");
    assert_eq!(resolved.tolerations[0].value, None);

    assert_eq!(
        resolved.retry_policy,
        Some(RetryPolicy {
            num_retries: 3,
            backoff_duration: "5m".to_string(),
            backoff_factor: 2.0,
        })
    );
    assert!(resolved.extra_volumes.is_empty());
}

#[test]
fn unknown_pools_fall_back_to_defaults() {
    init_test_tracing();

    let config = load_config_from_str(PIPELINE_YAML).unwrap();

    for pool in ["cpu-pool", "highmem", DEFAULT_NODE_POOL] {
        let resources = resolve_resources(&config, pool);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources["cpu"], "200m");
        assert_eq!(resources["memory"], "64Mi");

        let tolerations = resolve_tolerations(&config, pool);
        assert_eq!(tolerations.len(), 1);
        assert_eq!(tolerations[0].key, "dedicated");

        assert_eq!(resolve_retry_policy(&config, pool), None);
    }
}

#[test]
fn scheduled_run_name_follows_run_name() {
    init_test_tracing();

    let config = load_config_from_str(PIPELINE_YAML).unwrap();

    assert_eq!(
        config.run_config.scheduled_run_name.as_deref(),
        Some("nightly")
    );
    assert_eq!(
        config.referenced_node_pools(),
        vec!["__default__", "gpu-pool"]
    );
}
