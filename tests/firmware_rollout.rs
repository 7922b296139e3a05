//! Firmware rollout safety workflow.

use linkfleet::config::EngineConfig;
use linkfleet::dispatch::{OperationKind, RolloutState, dispatch};
use linkfleet::screens::software_banks;
use linkfleet::session::{ScriptedExchange, ScriptedSession};

fn waited(command: &str, reply: &str) -> ScriptedExchange {
    ScriptedExchange {
        command: command.to_string(),
        reply: reply.to_string(),
        wait: true,
    }
}

#[tokio::test]
async fn promote_arms_rollback_and_silence_reverts_to_prior_bank() {
    let config = EngineConfig {
        accept_timeout_secs: 600,
        rollback_timeout_secs: 600,
        ..EngineConfig::default()
    };

    // Operator promotes the candidate in bank 2.
    let mut session = ScriptedSession::new(
        "10.0.0.7",
        vec![
            waited("copy running-configuration startup-configuration", "\r\n"),
            waited("run sw next-rst 600", "reset scheduled\r\n"),
            waited("set rollback timeout 600", "rollback armed\r\n"),
        ],
    );
    let result = dispatch(&mut session, "run_sw", &[], &config).await;
    assert!(result.success);

    let mut rollout = RolloutState::Idle
        .advance(OperationKind::UploadFirmware)
        .on_transfer_complete()
        .advance(OperationKind::RunFirmware);
    assert_eq!(rollout, RolloutState::Running);

    // `accept sw` is never issued; the device-side watchdog fires and the
    // unit reverts autonomously.
    rollout = rollout.on_rollback_elapsed();
    assert_eq!(rollout, RolloutState::RolledBack);

    // A later bank query must show the previously running bank active
    // and the rejected candidate back to standby.
    let mut session = ScriptedSession::from_pairs(
        "10.0.0.7",
        vec![(
            "show sw",
            "bank  version  date        time      running  scheduled  startup\r\n\
             1     7.4.1    2023-11-02  04:12:33  yes      no         yes\r\n\
             2     8.0.2    2024-03-15  09:41:02  no       no         no\r\n",
        )],
    );
    let banks = software_banks().expect("screen builds");
    let values = banks
        .run(&mut session)
        .await
        .expect("bank query replays");
    let names: Vec<_> = banks.field_names().collect();
    let get = |name: &str| {
        let idx = names.iter().position(|n| *n == name).unwrap();
        values[idx].clone()
    };

    assert_eq!(get("b1_running"), "yes");
    assert_eq!(get("b2_running"), "no");
    assert_eq!(get("b2_scheduled_to_run"), "no");
}

#[tokio::test]
async fn accept_in_time_cancels_the_rollback_timer() {
    let config = EngineConfig::default();
    let mut session =
        ScriptedSession::from_pairs("10.0.0.7", vec![("accept sw", "sw accepted\r\n")]);

    let result = dispatch(&mut session, "accept", &[], &config).await;
    assert!(result.success);

    let rollout = RolloutState::Running.advance(OperationKind::AcceptFirmware);
    assert_eq!(rollout, RolloutState::Accepted);
    // The elapsed timer is a no-op once the candidate was accepted.
    assert_eq!(rollout.on_rollback_elapsed(), RolloutState::Accepted);
}
