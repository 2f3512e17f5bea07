//! Handlers that apply test vector units through a P4Runtime session.

use {
    crate::{
        dispatch::{ActionHandler, ExpectationHandler, HandlerRegistry},
        error::Result,
        model::{Action, Check, Expectation},
    },
    async_trait::async_trait,
    log::error,
    std::sync::Arc,
    tvr_p4rt::P4RuntimeSession,
};

fn wrong_kind(handler: &str, kind: &str) -> bool {
    error!("{} handler cannot run a {} unit", handler, kind);
    false
}

pub struct WriteHandler {
    session: Arc<P4RuntimeSession>,
}

impl WriteHandler {
    pub fn new(session: Arc<P4RuntimeSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ActionHandler for WriteHandler {
    async fn handle(&self, action: &Action) -> bool {
        match action {
            Action::Write(write) => self.session.write(Some(&write.to_request())).await,
            other => wrong_kind("write", other.kind()),
        }
    }
}

pub struct PipelineConfigHandler {
    session: Arc<P4RuntimeSession>,
}

impl PipelineConfigHandler {
    pub fn new(session: Arc<P4RuntimeSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ActionHandler for PipelineConfigHandler {
    async fn handle(&self, action: &Action) -> bool {
        match action {
            Action::PipelineConfig(config) => {
                self.session
                    .set_pipeline_config(Some(&config.to_request()))
                    .await
            }
            other => wrong_kind("pipeline config", other.kind()),
        }
    }
}

/// Sends packet-outs as the action's own arbitration identity, or the
/// session's configured packet-out identity when the action has none.
pub struct PacketOutHandler {
    session: Arc<P4RuntimeSession>,
}

impl PacketOutHandler {
    pub fn new(session: Arc<P4RuntimeSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ActionHandler for PacketOutHandler {
    async fn handle(&self, action: &Action) -> bool {
        match action {
            Action::PacketOut(packet) => {
                let identity = packet
                    .identity
                    .unwrap_or(self.session.config().packet_out_identity);
                self.session
                    .packet_out(&packet.to_packet(), &identity)
                    .await
            }
            other => wrong_kind("packet-out", other.kind()),
        }
    }
}

pub struct PacketInHandler {
    session: Arc<P4RuntimeSession>,
}

impl PacketInHandler {
    pub fn new(session: Arc<P4RuntimeSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ExpectationHandler for PacketInHandler {
    async fn handle(&self, expectation: &Expectation) -> bool {
        match &expectation.check {
            Check::PacketIn(check) => self.session.await_packet_in(&check.to_packet()).await,
        }
    }
}

/// Register the P4Runtime handlers for every action and expectation kind
/// they cover.
pub fn register_p4rt_handlers(
    registry: &mut HandlerRegistry,
    session: &Arc<P4RuntimeSession>,
) -> Result<()> {
    registry.register_action(Action::WRITE, Arc::new(WriteHandler::new(session.clone())))?;
    registry.register_action(
        Action::PIPELINE_CONFIG,
        Arc::new(PipelineConfigHandler::new(session.clone())),
    )?;
    registry.register_action(
        Action::PACKET_OUT,
        Arc::new(PacketOutHandler::new(session.clone())),
    )?;
    registry.register_expectation(
        Check::PACKET_IN,
        Arc::new(PacketInHandler::new(session.clone())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            engine::{ActionGroupDispatcher, TestVectorEngine},
            model::{
                ActionGroup, Atomicity, ExecutionMode, PacketInCheck, PacketOutAction,
                TestCase, UpdateSpec, UpdateType, WriteAction,
            },
        },
        tvr_p4rt::{
            loopback::{ArbitrationPolicy, LoopbackDevice},
            ArbitrationIdentity, ElectionId, P4rtConfig,
        },
    };

    fn engine(
        device: &Arc<LoopbackDevice>,
    ) -> (Arc<P4RuntimeSession>, TestVectorEngine<HandlerRegistry>) {
        tvr_logger::setup_for_tests();
        let session = Arc::new(P4RuntimeSession::with_service(
            device.clone(),
            P4rtConfig::dev_default(),
        ));
        let mut registry = HandlerRegistry::new();
        register_p4rt_handlers(&mut registry, &session).unwrap();
        (session, TestVectorEngine::new(registry))
    }

    fn packet_out(payload: &[u8], identity: Option<ArbitrationIdentity>) -> Action {
        Action::PacketOut(PacketOutAction {
            payload: payload.to_vec(),
            metadata: vec![],
            identity,
        })
    }

    fn packet_in(id: &str, payload: &[u8]) -> Expectation {
        Expectation {
            expectation_id: id.to_string(),
            check: Check::PacketIn(PacketInCheck {
                payload: payload.to_vec(),
                metadata: vec![],
            }),
        }
    }

    #[tokio::test]
    async fn test_loopback_case_passes() {
        let device = Arc::new(LoopbackDevice::new());
        let (_session, engine) = engine(&device);
        let case = TestCase {
            test_case_id: "punt".to_string(),
            description: None,
            action_groups: vec![ActionGroup {
                action_group_id: "ag-1".to_string(),
                mode: ExecutionMode::Sequential,
                actions: vec![
                    Action::Write(WriteAction {
                        device_id: 1,
                        role_id: 0,
                        election_id: Some(ElectionId::new(1, 5)),
                        updates: vec![UpdateSpec {
                            update_type: UpdateType::Insert,
                            entity: vec![0x0a],
                        }],
                        atomicity: Atomicity::default(),
                    }),
                    packet_out(b"\xca\xfe", None),
                ],
            }],
            expectations: vec![packet_in("exp-1", b"\xca\xfe")],
        };

        let outcome = engine.run_test_case(&case).await;
        assert!(outcome.passed(), "{outcome:?}");
        assert_eq!(device.writes().len(), 1);
        assert_eq!(device.packets_out().len(), 1);
    }

    #[tokio::test]
    async fn test_packet_out_identity_selection() {
        let device = Arc::new(LoopbackDevice::new().without_echo());
        let (session, engine) = engine(&device);
        let explicit = ArbitrationIdentity::new(7, ElectionId::new(0, 42));
        let group = ActionGroup {
            action_group_id: "ag".to_string(),
            mode: ExecutionMode::Sequential,
            actions: vec![packet_out(b"\x01", None), packet_out(b"\x02", Some(explicit))],
        };

        assert!(engine.dispatcher().process_action_group(&group).await);
        let identities: Vec<_> = device
            .arbitration_updates()
            .iter()
            .map(|update| update.device_id)
            .collect();
        assert_eq!(
            identities,
            vec![session.config().packet_out_identity.device_id, 7]
        );
    }

    #[tokio::test]
    async fn test_denied_device_fails_packet_out() {
        let device = Arc::new(
            LoopbackDevice::new()
                .with_arbitration(ArbitrationPolicy::Deny)
                .without_echo(),
        );
        let (_session, engine) = engine(&device);
        let case = TestCase {
            test_case_id: "denied".to_string(),
            description: None,
            action_groups: vec![ActionGroup {
                action_group_id: "ag-1".to_string(),
                mode: ExecutionMode::Parallel,
                actions: vec![packet_out(b"\x01", None)],
            }],
            expectations: vec![],
        };

        let outcome = engine.run_test_case(&case).await;
        assert!(!outcome.passed());
        assert!(device.packets_out().is_empty());
        assert_eq!(device.arbitration_updates().len(), 1);
    }
}
