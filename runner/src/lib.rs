//! `tvrunner`: runs P4Runtime test vectors against a device.
//!
//! Exit status: `0` when every selected test case passed, `1` when any failed,
//! `2` when the run could not start (bad arguments or config, unreadable test
//! vectors, unreachable device).

pub mod cli;
pub mod config;
pub mod error;

use {
    crate::{cli::CliArgs, config::RunnerConfig, error::Result},
    log::{info, warn},
    std::sync::Arc,
    tvr_p4rt::P4RuntimeSession,
    tvr_testvector::{
        register_p4rt_handlers, HandlerRegistry, NoHooks, SuiteReport, TestSuite,
        TestVectorEngine,
    },
};

pub const EXIT_PASSED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_SETUP_ERROR: i32 = 2;

/// Load everything, connect, run the suite and print the report.
///
/// Returns whether every test case passed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config = RunnerConfig::resolve(&args)?;
    tvr_logger::setup_with_default(&config.log_filter);

    let files = config.test_vector_files()?;
    let suite = TestSuite::load(&files)?;

    info!("connecting to {}", config.target.address);
    let session = P4RuntimeSession::init(&config.target, config.p4rt_config()).await?;
    let report = execute(&suite, session, args.filter.as_deref()).await?;
    println!("{report}");
    Ok(report.passed())
}

/// Run `suite` through `session` with the P4Runtime handlers, then tear the
/// session down.
///
/// No test case runs when the device refused the stream channel.
pub async fn execute(
    suite: &TestSuite,
    session: P4RuntimeSession,
    filter: Option<&str>,
) -> Result<SuiteReport> {
    if let Err(e) = session.ensure_stream_open().await {
        session.tear_down().await;
        return Err(e.into());
    }

    let session = Arc::new(session);
    let mut registry = HandlerRegistry::new();
    let registered = register_p4rt_handlers(&mut registry, &session);
    let engine = TestVectorEngine::new(registry);

    let report = match registered {
        Ok(()) => Ok(suite.run(&engine, &NoHooks, filter).await),
        Err(e) => Err(e.into()),
    };

    drop(engine);
    match Arc::try_unwrap(session) {
        Ok(session) => session.tear_down().await,
        Err(_) => warn!("P4Runtime session still shared, skipping teardown"),
    }
    report
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::RunnerError,
        assert_matches::assert_matches,
        std::fs,
        tempfile::TempDir,
        tvr_p4rt::{loopback::LoopbackDevice, P4rtConfig, P4rtError},
    };

    const PUNT: &str = r#"
test_cases:
  - test_case_id: punt-echo
    action_groups:
      - action_group_id: send
        actions:
          - kind: packet_out
            payload: "0x00aabbccddeeff"
    expectations:
      - expectation_id: receive
        check:
          kind: packet_in
          payload: "00aabbccddeeff"
  - test_case_id: write-entry
    action_groups:
      - action_group_id: insert
        actions:
          - kind: write
            device_id: 1
            election_id: { high: 1, low: 5 }
            updates:
              - { type: insert, entity: "0a0412020801" }
"#;

    fn load(contents: &str) -> (TempDir, TestSuite) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("punt.yaml");
        fs::write(&path, contents).unwrap();
        let suite = TestSuite::load(&[path]).unwrap();
        (dir, suite)
    }

    #[tokio::test]
    async fn test_execute_against_loopback() {
        let (_dir, suite) = load(PUNT);
        let device = Arc::new(LoopbackDevice::new());
        let session = P4RuntimeSession::with_service(device.clone(), P4rtConfig::dev_default());

        let report = execute(&suite, session, None).await.unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(report.total_cases(), 2);
        assert_eq!(device.writes().len(), 1);
        device.wait_for_half_close().await;
    }

    #[tokio::test]
    async fn test_execute_filters_cases() {
        let (_dir, suite) = load(PUNT);
        let device = Arc::new(LoopbackDevice::new());
        let session = P4RuntimeSession::with_service(device.clone(), P4rtConfig::dev_default());

        let report = execute(&suite, session, Some("write")).await.unwrap();
        assert!(report.failed_cases().is_empty());
        assert_eq!(report.total_cases(), 1);
        assert!(device.packets_out().is_empty());
    }

    #[tokio::test]
    async fn test_refused_stream_aborts_before_any_case() {
        let (_dir, suite) = load(PUNT);
        let device = Arc::new(LoopbackDevice::new().refuse_stream());
        let session = P4RuntimeSession::with_service(device.clone(), P4rtConfig::dev_default());

        let result = execute(&suite, session, None).await;
        assert_matches!(
            result.err(),
            Some(RunnerError::Session(P4rtError::StreamOpen(_)))
        );
        assert!(device.writes().is_empty());
        assert!(device.packets_out().is_empty());
    }
}
