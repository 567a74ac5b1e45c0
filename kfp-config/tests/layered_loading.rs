use std::fs;

use kfp_config::{Environment, load_config};
use kfp_telemetry::init_test_tracing;

const BASE_YAML: &str = r#"
host: https://kubeflow.example.com
run_config:
  image: registry.example.com/pipeline:1.0
  run_name: base
  description: from base
  ttl: 100
"#;

const DEV_YAML: &str = r#"
run_config:
  description: from dev
"#;

fn set_var(key: &str, value: &str) {
    // SAFETY: this binary runs a single test, nothing else reads the environment concurrently.
    unsafe { std::env::set_var(key, value) };
}

// Layered loading reads the working directory and process environment, so everything runs in one
// test to keep this binary free of concurrent mutations.
#[test]
fn environment_overrides_reach_the_typed_model_as_strings() {
    init_test_tracing();

    let root = std::env::temp_dir().join(format!("kfp-layered-{}", std::process::id()));
    let configuration = root.join("configuration");
    fs::create_dir_all(&configuration).unwrap();
    fs::write(configuration.join("base.yaml"), BASE_YAML).unwrap();
    fs::write(configuration.join("dev.yaml"), DEV_YAML).unwrap();
    std::env::set_current_dir(&root).unwrap();

    Environment::Dev.set();
    set_var("KFP_RUN_CONFIG__RUN_NAME", "007");
    set_var("KFP_RUN_CONFIG__EXPERIMENT_NAME", "1.10");
    set_var("KFP_RUN_CONFIG__TTL", "300");
    set_var("KFP_RUN_CONFIG__WAIT_FOR_COMPLETION", "true");
    set_var(
        "KFP_RUN_CONFIG__VOLUME__ACCESS_MODES",
        "ReadWriteOnce,ReadOnlyMany"
    );

    let config = load_config().unwrap();
    let run_config = &config.run_config;

    assert_eq!(run_config.run_name.as_deref(), Some("007"));
    assert_eq!(run_config.scheduled_run_name.as_deref(), Some("007"));
    assert_eq!(run_config.experiment_name.as_deref(), Some("1.10"));
    assert_eq!(run_config.description.as_deref(), Some("from dev"));
    assert_eq!(run_config.ttl, 300);
    assert!(run_config.wait_for_completion);
    assert_eq!(
        run_config.volume.as_ref().unwrap().access_modes,
        vec!["ReadWriteOnce", "ReadOnlyMany"]
    );

    set_var("KFP_RUN_CONFIG__RUN_NAME", "true");

    let config = load_config().unwrap();
    assert_eq!(config.run_config.run_name.as_deref(), Some("true"));

    fs::remove_dir_all(&root).unwrap();
}
