//! Handler registry: routes actions and expectations to handlers by kind.

use {
    crate::{
        engine::ActionGroupDispatcher,
        error::{Result, TestVectorError},
        model::{Action, ActionGroup, ExecutionMode, Expectation},
    },
    async_trait::async_trait,
    futures::future::join_all,
    log::{debug, error},
    rand::seq::SliceRandom,
    std::{collections::HashMap, sync::Arc},
};

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, action: &Action) -> bool;
}

#[async_trait]
pub trait ExpectationHandler: Send + Sync {
    async fn handle(&self, expectation: &Expectation) -> bool;
}

/// An [`ActionGroupDispatcher`] backed by handlers registered per kind.
///
/// A unit whose kind has no handler fails.
#[derive(Default)]
pub struct HandlerRegistry {
    actions: HashMap<&'static str, Arc<dyn ActionHandler>>,
    expectations: HashMap<&'static str, Arc<dyn ExpectationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action(
        &mut self,
        kind: &'static str,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<()> {
        if self.actions.contains_key(kind) {
            return Err(TestVectorError::Duplicate {
                unit: "action",
                kind: kind.to_string(),
            });
        }
        self.actions.insert(kind, handler);
        Ok(())
    }

    pub fn register_expectation(
        &mut self,
        kind: &'static str,
        handler: Arc<dyn ExpectationHandler>,
    ) -> Result<()> {
        if self.expectations.contains_key(kind) {
            return Err(TestVectorError::Duplicate {
                unit: "expectation",
                kind: kind.to_string(),
            });
        }
        self.expectations.insert(kind, handler);
        Ok(())
    }

    async fn dispatch_action(&self, action: &Action) -> bool {
        match self.actions.get(action.kind()) {
            Some(handler) => handler.handle(action).await,
            None => {
                error!("no handler registered for {} actions", action.kind());
                false
            }
        }
    }
}

#[async_trait]
impl ActionGroupDispatcher for HandlerRegistry {
    async fn process_action_group(&self, action_group: &ActionGroup) -> bool {
        debug!(
            "running {} actions of group {} ({:?})",
            action_group.actions.len(),
            action_group.action_group_id,
            action_group.mode
        );
        let results = match action_group.mode {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(action_group.actions.len());
                for action in &action_group.actions {
                    results.push(self.dispatch_action(action).await);
                }
                results
            }
            ExecutionMode::Parallel => {
                join_all(
                    action_group
                        .actions
                        .iter()
                        .map(|action| self.dispatch_action(action)),
                )
                .await
            }
            ExecutionMode::Random => {
                let order = {
                    let mut order: Vec<&Action> = action_group.actions.iter().collect();
                    order.shuffle(&mut rand::rng());
                    order
                };
                let mut results = Vec::with_capacity(order.len());
                for action in order {
                    results.push(self.dispatch_action(action).await);
                }
                results
            }
        };
        results.into_iter().fold(true, |passed, result| passed && result)
    }

    async fn process_expectation(&self, expectation: &Expectation) -> bool {
        match self.expectations.get(expectation.kind()) {
            Some(handler) => handler.handle(expectation).await,
            None => {
                error!(
                    "no handler registered for {} expectations",
                    expectation.kind()
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::model::{Check, PacketInCheck, PacketOutAction},
        assert_matches::assert_matches,
        parking_lot::Mutex,
        test_case::test_case,
    };

    /// Passes or fails every action, recording payload bytes as it goes.
    struct Recorder {
        result: bool,
        seen: Mutex<Vec<u8>>,
    }

    impl Recorder {
        fn new(result: bool) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl ActionHandler for Recorder {
        async fn handle(&self, action: &Action) -> bool {
            if let Action::PacketOut(packet) = action {
                self.seen.lock().extend_from_slice(&packet.payload);
            }
            self.result
        }
    }

    #[async_trait]
    impl ExpectationHandler for Recorder {
        async fn handle(&self, _expectation: &Expectation) -> bool {
            self.result
        }
    }

    fn packet_out(byte: u8) -> Action {
        Action::PacketOut(PacketOutAction {
            payload: vec![byte],
            metadata: vec![],
            identity: None,
        })
    }

    fn group(mode: ExecutionMode, actions: Vec<Action>) -> ActionGroup {
        ActionGroup {
            action_group_id: "ag".to_string(),
            mode,
            actions,
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_action(Action::PACKET_OUT, Recorder::new(true))
            .unwrap();
        assert_matches!(
            registry.register_action(Action::PACKET_OUT, Recorder::new(true)),
            Err(TestVectorError::Duplicate { unit: "action", .. })
        );
        registry
            .register_expectation(Check::PACKET_IN, Recorder::new(true))
            .unwrap();
        assert_matches!(
            registry.register_expectation(Check::PACKET_IN, Recorder::new(true)),
            Err(TestVectorError::Duplicate { unit: "expectation", .. })
        );
    }

    #[test_case(ExecutionMode::Sequential; "sequential")]
    #[test_case(ExecutionMode::Parallel; "parallel")]
    #[test_case(ExecutionMode::Random; "random")]
    #[tokio::test]
    async fn test_every_action_runs_once(mode: ExecutionMode) {
        let recorder = Recorder::new(true);
        let mut registry = HandlerRegistry::new();
        registry
            .register_action(Action::PACKET_OUT, recorder.clone())
            .unwrap();

        let actions = (0..8).map(packet_out).collect();
        assert!(registry.process_action_group(&group(mode, actions)).await);

        let mut seen = recorder.seen.lock().clone();
        if mode == ExecutionMode::Sequential {
            assert_eq!(seen, (0..8).collect::<Vec<u8>>());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_failing_action_fails_group_without_stopping() {
        let recorder = Recorder::new(false);
        let mut registry = HandlerRegistry::new();
        registry
            .register_action(Action::PACKET_OUT, recorder.clone())
            .unwrap();

        let actions = vec![packet_out(1), packet_out(2)];
        assert!(
            !registry
                .process_action_group(&group(ExecutionMode::Sequential, actions))
                .await
        );
        assert_eq!(*recorder.seen.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unregistered_kinds_fail() {
        let registry = HandlerRegistry::new();
        assert!(
            !registry
                .process_action_group(&group(ExecutionMode::Sequential, vec![packet_out(1)]))
                .await
        );

        let expectation = Expectation {
            expectation_id: "exp".to_string(),
            check: Check::PacketIn(PacketInCheck {
                payload: vec![],
                metadata: vec![],
            }),
        };
        assert!(!registry.process_expectation(&expectation).await);
    }

    #[tokio::test]
    async fn test_empty_group_passes() {
        let registry = HandlerRegistry::new();
        assert!(
            registry
                .process_action_group(&group(ExecutionMode::Parallel, vec![]))
                .await
        );
    }
}
