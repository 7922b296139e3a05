//! Fleet runs against unreachable and malformed roster records.
//!
//! These tests exercise the orchestrator's isolation guarantees without
//! any reachable device: every roster record must end up as exactly one
//! failed row, and one bad record must not disturb its siblings.

use linkfleet::config::EngineConfig;
use linkfleet::fleet::{Device, FleetOrchestrator};

fn unreachable(host: &str, command: &str) -> Device {
    Device {
        host: host.to_string(),
        user: "admin".to_string(),
        password: "admin".to_string(),
        // The discard port is closed on loopback, so connects fail fast.
        port: 9,
        connect_timeout_secs: Some(2),
        command: command.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_unreachable_device_gets_its_own_failed_row() {
    let config = EngineConfig {
        workers: 3,
        ..EngineConfig::default()
    };
    let orchestrator = FleetOrchestrator::new(config);

    let roster = vec![
        unreachable("127.0.0.2", "scan"),
        unreachable("127.0.0.3", "scan"),
        unreachable("127.0.0.4", "accept"),
        unreachable("127.0.0.5", "run_sw"),
        unreachable("127.0.0.6", "scan"),
    ];

    let report = orchestrator.run(&roster).await.expect("run completes");

    assert_eq!(report.len(), 5, "one row per requested device");
    for row in report.rows() {
        assert!(!row.success);
        assert!(
            row.detail.contains("no connection"),
            "unexpected detail: {}",
            row.detail
        );
    }

    let mut hosts: Vec<_> = report.rows().iter().map(|row| row.host.clone()).collect();
    hosts.sort();
    assert_eq!(
        hosts,
        vec!["127.0.0.2", "127.0.0.3", "127.0.0.4", "127.0.0.5", "127.0.0.6"]
    );

    // The failed rows keep the requested operation label.
    assert!(report.rows().iter().any(|row| row.operation == "accept"));
    assert!(report.rows().iter().any(|row| row.operation == "run_sw"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_descriptor_is_rejected_before_any_session() {
    let orchestrator = FleetOrchestrator::new(EngineConfig::default());

    let mut no_user = unreachable("127.0.0.2", "scan");
    no_user.user = String::new();

    let report = orchestrator.run(&[no_user]).await.expect("run completes");

    assert_eq!(report.len(), 1);
    let row = &report.rows()[0];
    assert!(!row.success);
    assert!(row.detail.contains("invalid device"));
}

#[tokio::test(flavor = "multi_thread")]
async fn report_header_covers_every_battery_field() {
    let config = EngineConfig {
        rings: 1,
        multi_hop: true,
        ..EngineConfig::default()
    };
    let orchestrator = FleetOrchestrator::new(config);

    let report = orchestrator.run(&[]).await.expect("empty run completes");

    assert!(report.is_empty());
    let header = report.header();
    assert_eq!(&header[..5], &["timestamp", "host", "operation", "success", "detail"]);
    assert!(header.iter().any(|name| name == "system_name"));
    assert!(header.iter().any(|name| name == "ring_1_state"));
    assert!(header.iter().any(|name| name == "tu_ssid"));
}
