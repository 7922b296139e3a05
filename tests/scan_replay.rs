//! Full scan battery over a recorded session transcript.

use linkfleet::config::EngineConfig;
use linkfleet::dispatch::dispatch;
use linkfleet::grammar::ABSENT_MARKER;
use linkfleet::screens::{battery_field_names, battery_width, scan_battery};
use linkfleet::session::ScriptedSession;

const SCAN_TRANSCRIPT: &str = include_str!("fixtures/scan_session.jsonl");

fn field<'a>(names: &[String], values: &'a [String], name: &str) -> &'a str {
    let idx = names
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("unknown field '{name}'"));
    &values[idx]
}

#[tokio::test]
async fn full_battery_scan_replays_without_ssh() {
    let config = EngineConfig::default();
    let battery = scan_battery(&config).expect("battery builds");
    let names = battery_field_names(&battery);

    let mut session =
        ScriptedSession::from_jsonl("10.0.0.7", SCAN_TRANSCRIPT).expect("transcript loads");

    let result = dispatch(&mut session, "scan", &battery, &config).await;

    assert!(result.success, "scan failed: {:?}", result.error);
    assert_eq!(result.operation, "scan");
    assert_eq!(result.fields.len(), battery_width(&battery));
    assert!(session.is_drained(), "battery must consume every exchange");

    let values = &result.fields;
    assert_eq!(field(&names, values, "system_sn"), "F123456789");
    assert_eq!(field(&names, values, "system_name"), "Unit-12");
    assert_eq!(field(&names, values, "system_up_days"), "243");
    assert_eq!(field(&names, values, "ntp_1_server"), "10.0.0.1");
    assert_eq!(field(&names, values, "snmp_agent_write_com"), "private");

    // Newest populated statistics bucket.
    assert_eq!(field(&names, values, "rf_last_interval"), "2");
    assert_eq!(field(&names, values, "rf_last_min_rssi"), "-55");
    assert_eq!(field(&names, values, "rf_last_min_mod"), "qam64");

    // Firmware banks.
    assert_eq!(field(&names, values, "b1_ver"), "7.4.1");
    assert_eq!(field(&names, values, "b1_running"), "yes");
    assert_eq!(field(&names, values, "b2_scheduled_to_run"), "yes");

    // RF and interface status.
    assert_eq!(field(&names, values, "rf_rssi"), "-55");
    assert_eq!(field(&names, values, "rf_frequency"), "74375");
    assert_eq!(field(&names, values, "eth1_act_type"), "1000fd");
    assert_eq!(field(&names, values, "eth2_act_type"), "disable");

    // LLDP: only eth0 has a neighbor in the transcript.
    assert_eq!(field(&names, values, "chassis_id_0"), "00:24:a4:01:02:03");
    assert_eq!(field(&names, values, "sys_name_0"), "core-sw-1");
    assert_eq!(field(&names, values, "sys_name_1"), ABSENT_MARKER);

    // Daily summary: two populated days, the rest absent.
    assert_eq!(field(&names, values, "min_mod_0"), "qpsk");
    assert_eq!(field(&names, values, "min_mod_1"), "qam16");
    assert_eq!(field(&names, values, "min_mod_31"), ABSENT_MARKER);
}

#[tokio::test]
async fn scan_against_unrelated_output_yields_absent_markers_only() {
    let config = EngineConfig::default();
    let battery = scan_battery(&config).expect("battery builds");

    // Every screen answers with text no field pattern matches.
    let replies: Vec<(&str, &str)> = battery
        .iter()
        .map(|spec| (spec.text(), "% unrecognized output\r\n"))
        .collect();
    let mut session = ScriptedSession::from_pairs("10.0.0.7", replies);

    let result = dispatch(&mut session, "scan", &battery, &config).await;

    assert!(result.success);
    assert_eq!(result.fields.len(), battery_width(&battery));
    // Literal fields (bank/slot indices) keep their fixed values; every
    // pattern-extracted field must be the absent marker.
    let names = battery_field_names(&battery);
    for (name, value) in names.iter().zip(result.fields.iter()) {
        if name.starts_with("bank_") || name.starts_with("ring_") || name.starts_with("tu_num_") {
            continue;
        }
        assert_eq!(value, ABSENT_MARKER, "field '{name}' should be absent");
    }
}
