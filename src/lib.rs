//! # linkfleet - Radio Link Fleet Automation
//!
//! `linkfleet` automates remote operation of fixed-wireless radio link
//! units that expose only an interactive, line-oriented CLI over SSH. It
//! drives fleets of units concurrently: scanning status and telemetry
//! screens into a tabular report, and performing firmware rollout with a
//! device-side rollback safety net against bricking unreachable units.
//!
//! ## Features
//!
//! - **Expect-style sessions**: login handshake and command exchange as a
//!   timeout-bounded state machine over the shell byte stream
//! - **Screens as data**: each device screen is a declarative spec of
//!   request text plus field-extraction rules; new screens need no code
//! - **Fleet orchestration**: a bounded worker pool with per-device
//!   failure isolation; every roster record produces exactly one row
//! - **Firmware safety**: candidate images are promoted with an armed
//!   rollback watchdog, so a unit that becomes unreachable after an
//!   upgrade reverts instead of bricking
//! - **Maximum compatibility**: SSH algorithm profiles down to the
//!   permissive set legacy field units require
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linkfleet::config::EngineConfig;
//! use linkfleet::fleet::{Device, FleetOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig {
//!         workers: 10,
//!         ..EngineConfig::default()
//!     };
//!
//!     let roster = vec![Device {
//!         host: "192.168.1.1".to_string(),
//!         user: "admin".to_string(),
//!         password: "admin".to_string(),
//!         port: 22,
//!         connect_timeout_secs: None,
//!         command: "scan".to_string(),
//!     }];
//!
//!     let orchestrator = FleetOrchestrator::new(config);
//!     let report = orchestrator.run(&roster).await?;
//!     println!("{}", report.to_csv());
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::TerminalSession`] - One interactive shell session per unit
//! - [`grammar::CommandSpec`] - Declarative screen grammar
//! - [`screens`] - The screen catalog and scan battery
//! - [`dispatch`] - Per-device operation dispatch with failure containment
//! - [`fleet::FleetOrchestrator`] - Bounded concurrent fleet runs
//! - [`error::EngineError`] - Error taxonomy for sessions and dispatch

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod grammar;
pub mod screens;
pub mod session;
