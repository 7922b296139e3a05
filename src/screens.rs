//! Screen catalog for the radio link CLI.
//!
//! Every "show" screen the engine understands is declared here as data:
//! a factory function returning a [`CommandSpec`] or [`TableSpec`] value.
//! Supporting a new firmware screen means adding a factory, never new
//! parsing code.
//!
//! Field patterns mirror the key/value layout of the unit's CLI, where
//! scalar screens print `key : value` lines and statistics screens print
//! fixed-width tables indexed by time bucket or slot number.

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grammar::{CommandSpec, TableRow, TableSpec};

/// Timestamp layout used by the unit's statistics tables.
const STATS_TS_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Remote terminal-unit slots a base unit can report.
pub const REMOTE_TU_SLOTS: usize = 8;

/// Ethernet interfaces covered by the LLDP neighbor screen.
pub const LLDP_PORTS: usize = 5;

/// Quarter-hour buckets in a statistics summary.
pub const SUMMARY_INTERVALS: usize = 96;

/// Day buckets in the daily statistics summary.
pub const DAILY_INTERVALS: usize = 32;

/// `show inventory 1 serial`
pub fn inventory() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show inventory 1 serial")
        .field("system_sn", r"inventory 1 serial\s+: (.+)\n")
        .build()
}

/// `show system`
pub fn system() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show system")
        .field("system_description", r"system description\s+: (.+)\n")
        .field("system_name", r"system name\s+: (.+)\n")
        .field("system_location", r"system location\s+: (.+)\n")
        .field_with("system_up_days", r"system uptime\s+: (.+)\n", days_from_uptime)
        .field("system_time", r"system time\s+: (.+)\n")
        .field("system_date", r"system date\s+: (.+)\n")
        .field("system_temp", r"system temperature\s+: (.+)\n")
        .field("queue_early_discard", r"system queue-early-discard\s+: (.+)\n")
        .build()
}

/// `show ntp`
pub fn ntp() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show ntp")
        .field("ntp_1_server", r"ntp 1 server\s+: (.+)\n")
        .field("ntp_1_tmz", r"ntp 1 tmz\s+: (.+)\n")
        .build()
}

/// `show syslog`
pub fn syslog() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show syslog")
        .field("syslog_1_server", r"syslog 1 server\s+: (.+)\n")
        .build()
}

/// `show snmp-mng`
pub fn snmp_manager() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show snmp-mng")
        .field("snmp_mng_1_ip_addr", r"snmp-mng 1 ip-addr\s+: (.+)\n")
        .field("snmp_mng_1_sec_name", r"snmp-mng 1 security-name\s+: (.+)\n")
        .build()
}

/// `show snmp-agent`
pub fn snmp_agent() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show snmp-agent")
        .field("snmp_agent_read_com", r"snmp-agent read-com\s+: (.+)\n")
        .field("snmp_agent_write_com", r"snmp-agent write-com\s+: (.+)\n")
        .build()
}

/// `show log`, newest entries first.
pub fn last_log_events() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show log")
        .reversed()
        .multiline()
        .field(
            "last_rf_reset",
            r"([A-Z]{1}[a-z]{2}[0-9:\s]+) sw cad: link down eth eth0",
        )
        .field(
            "last_system_reset",
            r"([A-Z]{1}[a-z]{2}[0-9:\s]+) sw bspd: \*\*\* Reset",
        )
        .build()
}

/// `show sw` — both firmware banks.
///
/// The bank table has no key/value layout, so each column is carved out
/// of the row by position.
pub fn software_banks() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show sw")
        .literal("bank_1", "1")
        .field("b1_ver", r"1\s+[MH-]*?([\.\d]+)\s+")
        .field(
            "b1_running",
            r"1\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+([\w-]+)\s+",
        )
        .field(
            "b1_scheduled_to_run",
            r"1\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+[\w-]+\s+([\w]+)\s+",
        )
        .field(
            "b1_startup",
            r"1\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+[\w-]+\s+[\w]+\s+([\w]+)",
        )
        .literal("bank_2", "2")
        .field("b2_ver", r"2\s+[MH-]*?([\.\d]+)\s+")
        .field(
            "b2_running",
            r"2\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+([\w-]+)\s+",
        )
        .field(
            "b2_scheduled_to_run",
            r"2\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+[\w-]+\s+([\w]+)\s+",
        )
        .field(
            "b2_startup",
            r"2\s+[MH-]*?[\.\d]+\s+[-\d]+\s+[:\d]+\s+[\w-]+\s+[\w]+\s+([\w]+)",
        )
        .build()
}

/// `show rf`
pub fn rf() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show rf")
        .field("rf_operational", r"rf operational\s+: (.+)\n")
        .field("rf_cinr", r"rf cinr\s+: (.+)\n")
        .field("rf_rssi", r"rf rssi\s+: (.+)\n")
        .field("rf_frequency", r"rf [tx-]*?frequency\s+: (.+)\n")
        .field("rf_mode", r"rf mode\s+: (.+)\n")
        .field("rf_role", r"rf role\s+: (.+)\n")
        .field("rf_tx_asymmetry", r"rf tx-asymmetry\s+: (.+)\n")
        .build()
}

/// `show rf-debug`
pub fn rf_debug() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show rf-debug")
        .field("cinr_low", r"rf-debug cinr-low\s+: (.+)\n")
        .field("link_length", r"rf-debug link-length\s+: (.+)\n")
        .field("tx_temp", r"rf-debug tx-temperature\s+: (.+)\n")
        .field("rx_temp", r"rf-debug rx-temperature\s+: (.+)\n")
        .build()
}

/// `show rf rssi` — single-metric probe used by signal loggers.
pub fn rssi() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show rf rssi")
        .field("rf_rssi", r"rf rssi\s+: (.+)\n")
        .build()
}

/// `show license`
pub fn license() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show license")
        .field(
            "data_rate_status",
            r"license\s+data-rate\s+status\s+:\s+(.+)\n",
        )
        .field(
            "data_rate_permission",
            r"license\s+data-rate\s+permission\s+:\s+(.+)\n",
        )
        .build()
}

/// `show ring <n>` — one protection ring's role and health.
pub fn ring(n: u32) -> Result<CommandSpec, EngineError> {
    CommandSpec::builder(format!("show ring {n}"))
        .literal(format!("ring_{n}_number"), n.to_string())
        .field(format!("ring_{n}_ring_id"), r"ring \d ring-id\s+: (.+)\n")
        .field(format!("ring_{n}_type"), r"ring \d type\s+: (.+)\n")
        .field(format!("ring_{n}_role"), r"ring \d role\s+: (.+)\n")
        .field(
            format!("ring_{n}_parent_ring"),
            r"ring \d parent-ring\s+: (.+)\n",
        )
        .field(format!("ring_{n}_cw_port"), r"ring \d cw-port\s+: (.+)\n")
        .field(format!("ring_{n}_acw_port"), r"ring \d acw-port\s+: (.+)\n")
        .field(
            format!("ring_{n}_raps_cvid"),
            r"ring \d raps-cvid\s+: (.+)\n",
        )
        .field(format!("ring_{n}_state"), r"ring \d state\s+: (.+)\n")
        .field(
            format!("ring_{n}_last_state_time"),
            r"ring \d last-state-time\s+: (.+)\n",
        )
        .field(
            format!("ring_{n}_cw_status_data"),
            r"ring \d cw-status-data\s+: (.+)\n",
        )
        .field(
            format!("ring_{n}_acw_status_data"),
            r"ring \d acw-status-data\s+: (.+)\n",
        )
        .field(
            format!("ring_{n}_cw_status_raps"),
            r"ring \d cw-status-raps\s+: (.+)\n",
        )
        .field(
            format!("ring_{n}_acw_status_raps"),
            r"ring \d acw-status-raps\s+: (.+)\n",
        )
        .build()
}

/// `show bridge-port c3 eth1 pvid` — management VLAN of the host port.
pub fn management_vlan() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show bridge-port c3 eth1 pvid")
        .field("eth1_pvid", r"bridge-port c3 eth1 pvid\s+: (.+)\n")
        .build()
}

/// `show eth eth<n> eth-act-type`
pub fn eth_act_type(n: u8) -> Result<CommandSpec, EngineError> {
    CommandSpec::builder(format!("show eth eth{n} eth-act-type"))
        .field(
            format!("eth{n}_act_type"),
            format!(r"eth eth{n} eth-act-type\s+: (.+)\n"),
        )
        .build()
}

/// `show base-unit` — multi-hop only.
pub fn base_unit() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show base-unit")
        .field("bu_self_mac", r"base-unit self-mac\s+: (.+)\n")
        .field("bu_ssid", r"base-unit ssid\s+: (.+)\n")
        .field("bu_password", r"base-unit password\s+: (.+)\n")
        .field("bu_frequency", r"base-unit frequency\s+: (.+)\n")
        .build()
}

/// `show terminal-unit` — multi-hop only.
pub fn terminal_unit() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show terminal-unit")
        .field("tu_self_mac", r"terminal-unit self-mac\s+: (.+)\n")
        .field("tu_bu_mac", r"terminal-unit base-unit-mac\s+: (.+)\n")
        .field("tu_ssid", r"terminal-unit ssid\s+: (.+)\n")
        .field("tu_password", r"terminal-unit password\s+: (.+)\n")
        .field("tu_frequency", r"terminal-unit frequency\s+: (.+)\n")
        .field("tu_tx_mcs", r"terminal-unit tx-mcs\s+: (.+)\n")
        .field("tu_rssi", r"terminal-unit rssi\s+: (.+)\n")
        .field("tu_signal_quality", r"terminal-unit signal-quality\s+: (.+)\n")
        .field("tu_connect_time", r"terminal-unit connect-time\s+: (.+)\n")
        .build()
}

/// `show remote-terminal-unit` — all peer slots of a base unit.
pub fn remote_terminal_units() -> Result<CommandSpec, EngineError> {
    let mut builder = CommandSpec::builder("show remote-terminal-unit");
    for slot in 1..=REMOTE_TU_SLOTS {
        builder = builder
            .literal(format!("tu_num_{slot}"), slot.to_string())
            .field(
                format!("eth_port_{slot}"),
                format!(r"remote-terminal-unit {slot} eth-port\s+: (.+)\n"),
            )
            .field(
                format!("mac_{slot}"),
                format!(r"remote-terminal-unit {slot} mac\s+: (.+)\n"),
            )
            .field(
                format!("name_{slot}"),
                format!(r"remote-terminal-unit {slot} name\s+: (.+)\n"),
            )
            .field(
                format!("status_{slot}"),
                format!(r"remote-terminal-unit {slot} status\s+: (.+)\n"),
            )
            .field(
                format!("tx_mcs_{slot}"),
                format!(r"remote-terminal-unit {slot} tx-mcs\s+: (.+)\n"),
            )
            .field(
                format!("rssi_{slot}"),
                format!(r"remote-terminal-unit {slot} rssi\s+: (.+)\n"),
            )
            .field(
                format!("signal_quality_{slot}"),
                format!(r"remote-terminal-unit {slot} signal-quality\s+: (.+)\n"),
            )
            .field(
                format!("tx_sector_{slot}"),
                format!(r"remote-terminal-unit {slot} tx-sector\s+: (.+)\n"),
            )
            .field(
                format!("rem_tx_sector_{slot}"),
                format!(r"remote-terminal-unit {slot} rem-tx-sector\s+: (.+)\n"),
            );
    }
    builder.build()
}

/// `show lldp-remote` — neighbors on every Ethernet port.
pub fn lldp_remote() -> Result<CommandSpec, EngineError> {
    let mut builder = CommandSpec::builder("show lldp-remote");
    for port in 0..LLDP_PORTS {
        builder = builder
            .field(
                format!("chassis_id_{port}"),
                format!(r"lldp-remote eth{port} [\d]{{1}} chassis-id\s+: (.+)\n"),
            )
            .field(
                format!("port_descr_{port}"),
                format!(r"lldp-remote eth{port} [\d]{{1}} port-descr\s+: (.+)\n"),
            )
            .field(
                format!("sys_name_{port}"),
                format!(r"lldp-remote eth{port} [\d]{{1}} sys-name\s+: (.+)\n"),
            )
            .field(
                format!("sys_descr_{port}"),
                format!(r"lldp-remote eth{port} [\d]{{1}} sys-descr\s+: (.+)\n"),
            );
    }
    builder.build()
}

/// `show rf statistics-summary-days` — worst modulation per day bucket.
pub fn rf_summary_daily() -> Result<CommandSpec, EngineError> {
    let mut builder = CommandSpec::builder("show rf statistics-summary-days").multiline();
    for day in 0..DAILY_INTERVALS {
        builder = builder.field(
            format!("min_mod_{day}"),
            format!(
                r"^{day}\s+[\.\d]+\s+[:\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+([\w\d]+)\s+[\w\d]+\s+[yesno]+"
            ),
        );
    }
    builder.build()
}

/// `show rf statistics-summary`, reduced to the newest populated bucket.
///
/// The reply is an append-only ring of quarter-hour rows; reversing the
/// line order makes first-match-wins pick the most recent one.
pub fn rf_summary_last() -> Result<CommandSpec, EngineError> {
    CommandSpec::builder("show rf statistics-summary")
        .multiline()
        .reversed()
        .field(
            "rf_last_interval",
            r"^(\d+)\s+[\.\d]+\s+[:\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[\w\d]+\s+[\w\d]+\s+[yesno]+",
        )
        .field(
            "rf_last_min_rssi",
            r"^\d+\s+[\.\d]+\s+[:\d]+\s+([-\d]+)\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[\w\d]+\s+[\w\d]+\s+[yesno]+",
        )
        .field(
            "rf_last_min_cinr",
            r"^\d+\s+[\.\d]+\s+[:\d]+\s+[-\d]+\s+[-\d]+\s+([-\d]+)\s+[-\d]+\s+[\w\d]+\s+[\w\d]+\s+[yesno]+",
        )
        .field(
            "rf_last_min_mod",
            r"^\d+\s+[\.\d]+\s+[:\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+([\w\d]+)\s+[\w\d]+\s+[yesno]+",
        )
        .build()
}

/// Full `show rf statistics-summary` table, one row per quarter-hour.
pub fn rf_statistics_summary() -> Result<TableSpec, EngineError> {
    TableSpec::new(
        "show rf statistics-summary",
        SUMMARY_INTERVALS,
        |i| {
            format!(
                r"^({i}\s+[\.\d]+\s+[:\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[-\d]+\s+[\w\d\s\.]+\s{{2,}}[\w\d\s\.]+\s{{2,}}[yesnounknown]+)"
            )
        },
        r"(\d+)\s+([\.\d]+\s+[:\d]+)\s+([-\d]+)\s+([-\d]+)\s+([-\d]+)\s+([-\d]+)\s+(.+?)\s{2,}(.+?)\s{2,}\S+$",
        &[
            "interval", "start_ts", "min_rssi", "max_rssi", "min_cinr", "max_cinr", "min_mod",
            "max_mod",
        ],
    )
}

/// Full `show eth <ethN> statistics-summary` table.
pub fn eth_statistics_summary(eth: &str) -> Result<TableSpec, EngineError> {
    TableSpec::new(
        format!("show eth {eth} statistics-summary"),
        SUMMARY_INTERVALS,
        |i| format!(r"^({i}\s+[\.\d]+\s+[:\d]+\s+eth\d\s+\d+\s+\d+\s+\d+\s+\d+\s+\d+)"),
        r"(\d+)\s+([\.\d]+\s+[:\d]+)\s+(eth\d)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)",
        &[
            "interval", "start_ts", "interface", "in_octets", "out_octets", "in_rate", "out_rate",
            "util",
        ],
    )
}

/// Ordered scan battery for one engine configuration.
pub fn scan_battery(config: &EngineConfig) -> Result<Vec<CommandSpec>, EngineError> {
    let mut battery = vec![
        inventory()?,
        system()?,
        ntp()?,
        syslog()?,
        snmp_manager()?,
        snmp_agent()?,
        rf_summary_last()?,
        software_banks()?,
        rf()?,
        rf_debug()?,
        license()?,
        management_vlan()?,
        eth_act_type(1)?,
        eth_act_type(2)?,
        eth_act_type(3)?,
        lldp_remote()?,
    ];
    for n in 1..=config.rings {
        battery.push(ring(n)?);
    }
    battery.push(rf_summary_daily()?);
    if config.multi_hop {
        battery.push(base_unit()?);
        battery.push(terminal_unit()?);
        battery.push(remote_terminal_units()?);
    }
    Ok(battery)
}

/// Flattened field names of a battery, in report column order.
pub fn battery_field_names(battery: &[CommandSpec]) -> Vec<String> {
    battery
        .iter()
        .flat_map(|spec| spec.field_names().map(|name| name.to_string()))
        .collect()
}

/// Total number of columns a battery contributes to the report.
pub fn battery_width(battery: &[CommandSpec]) -> usize {
    battery.iter().map(|spec| spec.width()).sum()
}

/// One typed row of the RF statistics summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RfSummaryRow {
    pub interval: u32,
    pub start_ts: NaiveDateTime,
    pub min_rssi: i32,
    pub max_rssi: i32,
    pub min_cinr: i32,
    pub max_cinr: i32,
    pub min_mod: String,
    pub max_mod: String,
}

impl RfSummaryRow {
    /// Convert a raw table row; rows with malformed cells are dropped.
    pub fn from_table_row(row: &TableRow) -> Option<Self> {
        let cells = &row.cells;
        if cells.len() != 8 {
            return None;
        }
        Some(Self {
            interval: cells[0].parse().ok()?,
            start_ts: NaiveDateTime::parse_from_str(&cells[1], STATS_TS_FORMAT).ok()?,
            min_rssi: cells[2].parse().ok()?,
            max_rssi: cells[3].parse().ok()?,
            min_cinr: cells[4].parse().ok()?,
            max_cinr: cells[5].parse().ok()?,
            min_mod: cells[6].clone(),
            max_mod: cells[7].clone(),
        })
    }
}

/// One typed row of an Ethernet statistics summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EthSummaryRow {
    pub interval: u32,
    pub start_ts: NaiveDateTime,
    pub interface: String,
    pub in_octets: u64,
    pub out_octets: u64,
    pub in_rate: u64,
    pub out_rate: u64,
    pub util: u64,
}

impl EthSummaryRow {
    /// Convert a raw table row; rows with malformed cells are dropped.
    pub fn from_table_row(row: &TableRow) -> Option<Self> {
        let cells = &row.cells;
        if cells.len() != 8 {
            return None;
        }
        Some(Self {
            interval: cells[0].parse().ok()?,
            start_ts: NaiveDateTime::parse_from_str(&cells[1], STATS_TS_FORMAT).ok()?,
            interface: cells[2].clone(),
            in_octets: cells[3].parse().ok()?,
            out_octets: cells[4].parse().ok()?,
            in_rate: cells[5].parse().ok()?,
            out_rate: cells[6].parse().ok()?,
            util: cells[7].parse().ok()?,
        })
    }
}

/// Uptime is `days:hours:minutes:seconds`; keep whole days only.
fn days_from_uptime(raw: &str) -> String {
    raw.split(':')
        .next()
        .and_then(|days| days.trim().parse::<i64>().ok())
        .map(|days| days.to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ABSENT_MARKER;

    #[test]
    fn system_screen_extracts_name_from_key_value_line() {
        let spec = system().expect("screen builds");
        let reply = "system description  : EH-1200F\r\n\
                     system name         : Unit-12\r\n\
                     system location     : rooftop-north\r\n\
                     system uptime       : 243:11:14:30\r\n";

        let values = spec.parse_reply(reply);
        let names: Vec<_> = spec.field_names().collect();
        let name_idx = names.iter().position(|n| *n == "system_name").unwrap();
        let days_idx = names.iter().position(|n| *n == "system_up_days").unwrap();

        assert_eq!(values[name_idx], "Unit-12");
        assert_eq!(values[days_idx], "243");
    }

    #[test]
    fn software_banks_screen_reads_both_bank_rows() {
        let spec = software_banks().expect("screen builds");
        let reply = "\
bank  version  date        time      running  scheduled  startup\r\n\
1     7.4.1    2023-11-02  04:12:33  yes      no         yes\r\n\
2     8.0.2    2024-03-15  09:41:02  no       yes        no\r\n";

        let values = spec.parse_reply(reply);
        let names: Vec<_> = spec.field_names().collect();
        let get = |field: &str| {
            let idx = names.iter().position(|n| *n == field).unwrap();
            values[idx].clone()
        };

        assert_eq!(get("bank_1"), "1");
        assert_eq!(get("b1_ver"), "7.4.1");
        assert_eq!(get("b1_running"), "yes");
        assert_eq!(get("bank_2"), "2");
        assert_eq!(get("b2_ver"), "8.0.2");
        assert_eq!(get("b2_scheduled_to_run"), "yes");
    }

    #[test]
    fn ring_screen_fields_are_suffixed_per_ring() {
        let spec = ring(2).expect("screen builds");
        assert_eq!(spec.text(), "show ring 2");

        let reply = "ring 2 ring-id        : 7\r\nring 2 state          : idle\r\n";
        let values = spec.parse_reply(reply);
        let names: Vec<_> = spec.field_names().collect();

        assert_eq!(names[0], "ring_2_number");
        assert_eq!(values[0], "2");
        let id_idx = names.iter().position(|n| *n == "ring_2_ring_id").unwrap();
        assert_eq!(values[id_idx], "7");
    }

    #[test]
    fn rf_summary_last_picks_newest_populated_bucket() {
        let spec = rf_summary_last().expect("screen builds");
        let reply = "\
interval  start                min-rssi max-rssi min-cinr max-cinr min-mod  max-mod  valid\r\n\
0         2024.05.01 00:00:00  -58      -52      17       21       qpsk     qam64    yes\r\n\
1         2024.05.01 00:15:00  -57      -51      18       22       qam16    qam64    yes\r\n\
2         2024.05.01 00:30:00  -55      -50      19       23       qam64    qam64    yes\r\n";

        let values = spec.parse_reply(reply);
        assert_eq!(values, vec!["2", "-55", "19", "qam64"]);
    }

    #[test]
    fn daily_summary_reports_absent_for_unpopulated_days() {
        let spec = rf_summary_daily().expect("screen builds");
        let reply = "\
0   2024.05.01 00:00:00  -58  -52  17  21  qpsk   qam64  yes\r\n\
1   2024.05.02 00:00:00  -57  -51  18  22  qam16  qam64  yes\r\n";

        let values = spec.parse_reply(reply);
        assert_eq!(values[0], "qpsk");
        assert_eq!(values[1], "qam16");
        assert_eq!(values[31], ABSENT_MARKER);
    }

    #[test]
    fn default_battery_excludes_ring_and_multi_hop_screens() {
        let config = EngineConfig::default();
        let battery = scan_battery(&config).expect("battery builds");
        let names = battery_field_names(&battery);

        assert_eq!(names[0], "system_sn");
        assert!(names.iter().any(|n| n == "rf_cinr"));
        assert!(!names.iter().any(|n| n.starts_with("ring_")));
        assert!(!names.iter().any(|n| n.starts_with("tu_")));
        assert_eq!(names.len(), battery_width(&battery));
    }

    #[test]
    fn battery_grows_with_rings_and_multi_hop() {
        let config = EngineConfig {
            rings: 2,
            multi_hop: true,
            ..EngineConfig::default()
        };
        let battery = scan_battery(&config).expect("battery builds");
        let names = battery_field_names(&battery);

        assert!(names.iter().any(|n| n == "ring_1_state"));
        assert!(names.iter().any(|n| n == "ring_2_state"));
        assert!(names.iter().any(|n| n == "bu_ssid"));
        assert!(names.iter().any(|n| n == "rem_tx_sector_8"));
    }

    #[test]
    fn rf_statistics_table_converts_to_typed_rows() {
        let table = rf_statistics_summary().expect("table builds");
        let reply = "\
0   2024.05.01 00:00:00  -58  -52  17  21  qpsk 0.5    qam64 0.83  yes\r\n\
1   2024.05.01 00:15:00  -57  -51  18  22  qam16 0.75  qam64 0.83  yes\r\n";

        let rows = table.parse_reply(reply);
        assert_eq!(rows.len(), 2);

        let typed: Vec<_> = rows
            .iter()
            .filter_map(RfSummaryRow::from_table_row)
            .collect();
        assert_eq!(typed.len(), 2);
        assert_eq!(typed[0].min_rssi, -58);
        assert_eq!(typed[0].min_mod, "qpsk 0.5");
        assert_eq!(typed[1].interval, 1);
    }

    #[test]
    fn eth_statistics_table_converts_to_typed_rows() {
        let table = eth_statistics_summary("eth1").expect("table builds");
        assert_eq!(table.text(), "show eth eth1 statistics-summary");

        let reply = "0   2024.05.01 00:00:00  eth1  1024  2048  10  20  3\r\n";
        let rows = table.parse_reply(reply);
        let typed: Vec<_> = rows
            .iter()
            .filter_map(EthSummaryRow::from_table_row)
            .collect();

        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].interface, "eth1");
        assert_eq!(typed[0].in_octets, 1024);
        assert_eq!(typed[0].util, 3);
    }

    #[test]
    fn log_screen_reads_newest_reset_events() {
        let spec = last_log_events().expect("screen builds");
        let reply = "\
Jan 03 11:02:44 sw bspd: *** Reset\r\n\
Feb 11 08:30:01 sw cad: link down eth eth0\r\n\
Mar 20 17:45:12 sw cad: link down eth eth0\r\n";

        let values = spec.parse_reply(reply);
        assert!(values[0].starts_with("Mar 20"));
        assert!(values[1].starts_with("Jan 03"));
    }
}
