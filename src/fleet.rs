//! Fleet orchestration.
//!
//! Runs one device task per roster record on a bounded pool of workers
//! and assembles a single tabular report. Tasks are independent: each
//! owns its session exclusively, shares nothing mutable with siblings,
//! and resolves every failure into its own report row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{ConnectionSecurityOptions, EngineConfig};
use crate::dispatch::{OperationKind, OperationResult, RolloutState, dispatch};
use crate::error::EngineError;
use crate::grammar::{ABSENT_MARKER, CommandSpec, TableSpec};
use crate::screens::{self, EthSummaryRow, RfSummaryRow};
use crate::session::{CliDialect, TerminalSession};

/// One roster record: a unit plus the operation requested on it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Device {
    /// Host address; the identity key of the unit.
    pub host: String,

    /// Login user.
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-device connect timeout override.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Operation keyword with its optional raw argument, e.g.
    /// `scan` or `upload_sw sw tftp://10.0.0.1/image.bin`.
    pub command: String,
}

fn default_port() -> u16 {
    22
}

impl Device {
    /// Reject records missing required identity fields.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.host.trim().is_empty() {
            return Err(EngineError::InvalidDevice("empty host".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(EngineError::InvalidDevice(format!(
                "{}: empty user",
                self.host
            )));
        }
        if self.command.trim().is_empty() {
            return Err(EngineError::InvalidDevice(format!(
                "{}: empty command",
                self.host
            )));
        }
        Ok(())
    }
}

/// One assembled report row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportRow {
    /// Completion time of the device task.
    pub timestamp: DateTime<Local>,
    /// Host identity of the unit.
    pub host: String,
    /// Operation label.
    pub operation: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure reason, or the absent marker on success.
    pub detail: String,
    /// Battery field values, padded to the report's field width.
    pub fields: Vec<String>,
}

impl ReportRow {
    /// Row cells in header order.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.timestamp.format(REPORT_TS_FORMAT).to_string(),
            self.host.clone(),
            self.operation.clone(),
            self.success.to_string(),
            self.detail.clone(),
        ];
        cells.extend(self.fields.iter().cloned());
        cells
    }
}

/// Timestamp layout of the report's first column.
const REPORT_TS_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Tabular outcome of one fleet run.
///
/// The header is fixed for the lifetime of the report; non-scan rows pad
/// the battery columns with the absent marker so column alignment stays
/// stable for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    header: Vec<String>,
    field_width: usize,
    rows: Vec<ReportRow>,
}

impl Report {
    /// Empty report with the given battery field names as tail columns.
    pub fn new(battery_fields: Vec<String>) -> Self {
        let field_width = battery_fields.len();
        let mut header = vec![
            "timestamp".to_string(),
            "host".to_string(),
            "operation".to_string(),
            "success".to_string(),
            "detail".to_string(),
        ];
        header.extend(battery_fields);
        Self {
            header,
            field_width,
            rows: Vec::new(),
        }
    }

    /// Column names, stable across all rows.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Assembled rows in completion order.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows have been assembled.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one result, stamped with the current time.
    pub fn push_result(&mut self, result: OperationResult) {
        let mut fields = result.fields;
        fields.resize(self.field_width, ABSENT_MARKER.to_string());
        self.rows.push(ReportRow {
            timestamp: Local::now(),
            host: result.host,
            operation: result.operation,
            success: result.success,
            detail: result.error.unwrap_or_else(|| ABSENT_MARKER.to_string()),
            fields,
        });
    }

    /// Render the report as CSV text, header first.
    pub fn to_csv(&self) -> String {
        let mut lines = vec![self.header.join(",")];
        lines.extend(self.rows.iter().map(|row| row.cells().join(",")));
        lines.join("\n")
    }
}

/// Statistics collected from one unit for external storage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HostStatistics {
    /// Host identity of the unit.
    pub host: String,
    /// Whether collection succeeded.
    pub success: bool,
    /// Failure reason for unsuccessful hosts.
    pub error: Option<String>,
    /// RF summary rows, oldest bucket first.
    pub rf: Vec<RfSummaryRow>,
    /// Ethernet summary rows, oldest bucket first.
    pub eth: Vec<EthSummaryRow>,
}

impl HostStatistics {
    fn failed(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            success: false,
            error: Some(reason.into()),
            rf: Vec::new(),
            eth: Vec::new(),
        }
    }
}

/// Runs roster operations across a bounded worker pool.
pub struct FleetOrchestrator {
    config: EngineConfig,
    dialect: CliDialect,
    security: ConnectionSecurityOptions,
    rollout: Mutex<HashMap<String, RolloutState>>,
}

impl FleetOrchestrator {
    /// Build an orchestrator with the default device dialect.
    pub fn new(config: EngineConfig) -> Self {
        let security = ConnectionSecurityOptions::for_level(config.security);
        Self {
            config,
            dialect: CliDialect::default(),
            security,
            rollout: Mutex::new(HashMap::new()),
        }
    }

    /// Override the prompt/banner wording for a different device family.
    pub fn with_dialect(mut self, dialect: CliDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Current rollout state of one host.
    pub fn rollout_state(&self, host: &str) -> RolloutState {
        self.rollout
            .lock()
            .map(|states| states.get(host).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Record that a host's rollback timer elapsed without an accept.
    ///
    /// The revert happens on the device; this only updates the tracked
    /// state once an operator or a later scan observes it.
    pub fn mark_rollback_elapsed(&self, host: &str) {
        if let Ok(mut states) = self.rollout.lock() {
            let state = states.entry(host.to_string()).or_default();
            *state = state.on_rollback_elapsed();
        }
    }

    fn track_rollout(&self, result: &OperationResult) {
        if !result.success {
            return;
        }
        let Some(kind) = OperationKind::from_label(&result.operation) else {
            return;
        };
        if let Ok(mut states) = self.rollout.lock() {
            let state = states.entry(result.host.clone()).or_default();
            *state = state.advance(kind);
        }
    }

    /// Run every roster operation and assemble the report.
    ///
    /// Results are appended as device tasks complete; ordering across
    /// devices is not guaranteed. Every roster record produces exactly
    /// one row.
    pub async fn run(&self, roster: &[Device]) -> Result<Report, EngineError> {
        let battery = Arc::new(screens::scan_battery(&self.config)?);
        let mut report = Report::new(screens::battery_field_names(&battery));

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        // Track what each host owes the report, so even an aborted task
        // cannot silently drop a requested device.
        let mut pending: HashMap<String, Vec<String>> = HashMap::new();
        for device in roster {
            let label = OperationKind::parse(&device.command)
                .map(|kind| kind.label().to_string())
                .unwrap_or_else(|| device.command.trim().to_string());
            pending.entry(device.host.clone()).or_default().push(label);
        }

        for device in roster.iter().cloned() {
            let battery = Arc::clone(&battery);
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let dialect = self.dialect.clone();
            let security = self.security.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                run_device(device, &battery, &config, dialect, &security).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let Some(labels) = pending.get_mut(&result.host) {
                        labels.pop();
                    }
                    self.track_rollout(&result);
                    report.push_result(result);
                }
                Err(err) => warn!("device task aborted: {err}"),
            }
        }

        // Synthesize failed rows for any task that vanished.
        for (host, labels) in pending {
            for label in labels {
                report.push_result(OperationResult::failed(
                    host.clone(),
                    &label,
                    "device task aborted",
                ));
            }
        }

        Ok(report)
    }

    /// Collect the 96-bucket RF and Ethernet summaries from every unit.
    ///
    /// The roster's command column is ignored here; statistics downloads
    /// run the same two tabular screens on every host.
    pub async fn collect_statistics(
        &self,
        roster: &[Device],
        eth: &str,
    ) -> Result<Vec<HostStatistics>, EngineError> {
        let rf_table = Arc::new(screens::rf_statistics_summary()?);
        let eth_table = Arc::new(screens::eth_statistics_summary(eth)?);

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for device in roster.iter().cloned() {
            let rf_table = Arc::clone(&rf_table);
            let eth_table = Arc::clone(&eth_table);
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let dialect = self.dialect.clone();
            let security = self.security.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                collect_host_statistics(device, &rf_table, &eth_table, &config, dialect, &security)
                    .await
            });
        }

        let mut out = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(stats) => out.push(stats),
                Err(err) => warn!("statistics task aborted: {err}"),
            }
        }
        Ok(out)
    }
}

/// One device task: validate, connect, dispatch, disconnect.
async fn run_device(
    device: Device,
    battery: &[CommandSpec],
    config: &EngineConfig,
    dialect: CliDialect,
    security: &ConnectionSecurityOptions,
) -> OperationResult {
    let label = OperationKind::parse(&device.command)
        .map(|kind| kind.label().to_string())
        .unwrap_or_else(|| device.command.trim().to_string());

    if let Err(err) = device.validate() {
        return OperationResult::failed(device.host.clone(), &label, err.to_string());
    }

    let mut session = match TerminalSession::new(
        &device.host,
        dialect,
        Duration::from_secs(config.command_timeout_secs),
    ) {
        Ok(session) => session,
        Err(err) => return OperationResult::failed(device.host.clone(), &label, err.to_string()),
    };

    let connect_timeout = Duration::from_secs(
        device
            .connect_timeout_secs
            .unwrap_or(config.connect_timeout_secs),
    );
    if let Err(err) = session
        .connect(
            &device.user,
            &device.password,
            device.port,
            connect_timeout,
            security,
        )
        .await
    {
        return OperationResult::failed(
            device.host.clone(),
            &label,
            format!("no connection: {err}"),
        );
    }

    let result = dispatch(&mut session, &device.command, battery, config).await;

    if let Err(err) = session.disconnect().await {
        debug!("[{}] disconnect after dispatch failed: {err}", device.host);
    }

    result
}

async fn collect_host_statistics(
    device: Device,
    rf_table: &TableSpec,
    eth_table: &TableSpec,
    config: &EngineConfig,
    dialect: CliDialect,
    security: &ConnectionSecurityOptions,
) -> HostStatistics {
    if let Err(err) = device.validate() {
        return HostStatistics::failed(device.host.clone(), err.to_string());
    }

    let mut session = match TerminalSession::new(
        &device.host,
        dialect,
        Duration::from_secs(config.command_timeout_secs),
    ) {
        Ok(session) => session,
        Err(err) => return HostStatistics::failed(device.host.clone(), err.to_string()),
    };

    let connect_timeout = Duration::from_secs(
        device
            .connect_timeout_secs
            .unwrap_or(config.connect_timeout_secs),
    );
    if let Err(err) = session
        .connect(
            &device.user,
            &device.password,
            device.port,
            connect_timeout,
            security,
        )
        .await
    {
        return HostStatistics::failed(device.host.clone(), format!("no connection: {err}"));
    }

    let outcome = async {
        let rf_rows = rf_table.run(&mut session).await?;
        let eth_rows = eth_table.run(&mut session).await?;
        Ok::<_, EngineError>((rf_rows, eth_rows))
    }
    .await;

    if let Err(err) = session.disconnect().await {
        debug!("[{}] disconnect after statistics failed: {err}", device.host);
    }

    match outcome {
        Ok((rf_rows, eth_rows)) => HostStatistics {
            host: device.host,
            success: true,
            error: None,
            rf: rf_rows
                .iter()
                .filter_map(RfSummaryRow::from_table_row)
                .collect(),
            eth: eth_rows
                .iter()
                .filter_map(EthSummaryRow::from_table_row)
                .collect(),
        },
        Err(err) => HostStatistics::failed(device.host, err.to_string()),
    }
}
