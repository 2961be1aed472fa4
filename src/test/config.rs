use crate::config::{SimConfig, MAX_WINDOW_SIZE};
use crate::error::{ConfigError, RdtError};
use crate::proto::Protocol;
use crate::sim::SimTime;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("rdt-sim-config-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_match_the_classic_setup() {
    let cfg = SimConfig::default();
    assert_eq!(cfg.prob_loss, 0.1);
    assert_eq!(cfg.prob_corruption, 0.1);
    assert_eq!(cfg.prob_delay, 0.1);
    assert_eq!(cfg.max_delay(), SimTime::from_millis(500));
    assert_eq!(cfg.timeout(), SimTime::from_secs(1));
    assert_eq!(cfg.window_size, 4);
    assert_eq!(cfg.total_packets, 10);
    cfg.validate().expect("defaults are valid");
}

#[test]
fn payloads_are_numbered_from_zero() {
    let cfg = SimConfig {
        total_packets: 3,
        ..SimConfig::lossless()
    };
    assert_eq!(cfg.payloads(), vec!["DATA_0", "DATA_1", "DATA_2"]);
}

#[test]
fn probabilities_outside_unit_interval_are_rejected() {
    for bad in [-0.1, 1.5, f64::NAN] {
        let cfg = SimConfig {
            prob_corruption: bad,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability {
                field: "prob_corruption",
                ..
            })
        ));
    }
    let edge = SimConfig {
        prob_loss: 1.0,
        prob_delay: 0.0,
        ..SimConfig::default()
    };
    edge.validate().expect("0 and 1 are valid probabilities");
}

#[test]
fn durations_must_be_positive() {
    let cfg = SimConfig {
        timeout_secs: 0.0,
        ..SimConfig::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::NonPositive {
            field: "timeout_secs",
            ..
        })
    ));

    let cfg = SimConfig {
        max_delay_secs: f64::INFINITY,
        ..SimConfig::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::NonPositive {
            field: "max_delay_secs",
            ..
        })
    ));
}

#[test]
fn window_size_must_fit_the_sequence_space() {
    for value in [0, MAX_WINDOW_SIZE + 1, usize::MAX / 2 + 1] {
        let cfg = SimConfig {
            window_size: value,
            ..SimConfig::default()
        };
        assert!(
            matches!(cfg.validate(), Err(ConfigError::WindowSize { value: v, .. }) if v == value),
            "window_size {value}"
        );
    }
    let cfg = SimConfig {
        window_size: MAX_WINDOW_SIZE,
        ..SimConfig::default()
    };
    cfg.validate().expect("largest window is valid");
}

#[test]
fn json_file_fills_missing_fields_with_defaults() {
    let path = temp_file("partial.json", r#"{ "prob_loss": 0.0, "window_size": 8, "seed": 9 }"#);
    let cfg = SimConfig::from_json_file(&path).expect("load");
    assert_eq!(cfg.prob_loss, 0.0);
    assert_eq!(cfg.window_size, 8);
    assert_eq!(cfg.seed, 9);
    assert_eq!(cfg.total_packets, 10);
    assert_eq!(cfg.timeout_secs, 1.0);
}

#[test]
fn unreadable_or_malformed_files_report_the_path() {
    let missing = std::env::temp_dir().join("rdt-sim-definitely-missing.json");
    assert!(matches!(
        SimConfig::from_json_file(&missing),
        Err(ConfigError::Io { path, .. }) if path == missing
    ));

    let path = temp_file("broken.json", "{ prob_loss: ");
    let err = SimConfig::from_json_file(&path).expect_err("malformed");
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn invalid_config_fails_before_the_run_starts() {
    let cfg = SimConfig {
        prob_loss: 2.0,
        ..SimConfig::default()
    };
    let err = crate::run_with_random_faults(Protocol::GoBackN, &cfg).expect_err("invalid");
    assert!(matches!(err, RdtError::Config(ConfigError::Probability { .. })));
}
