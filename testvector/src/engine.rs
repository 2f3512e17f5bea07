//! Test vector execution engine.
//!
//! Each test case walks `Pending → RunningActions → RunningExpectations →
//! Done`. Every action group and every expectation is dispatched exactly
//! once, in file order, whatever the earlier units returned; the results are
//! collected first and folded with AND afterwards. Expectations run even when
//! an action group failed, so a single pass shows the full divergence.
//!
//! Failed units are not rolled back and nothing is retried.

use {
    crate::model::{ActionGroup, Expectation, TestCase, TestVector},
    async_trait::async_trait,
    log::{debug, error, info},
    std::fmt,
};

/// The engine's only contract with the outside world: run one unit, report
/// pass or fail.
#[async_trait]
pub trait ActionGroupDispatcher: Send + Sync {
    async fn process_action_group(&self, action_group: &ActionGroup) -> bool;

    async fn process_expectation(&self, expectation: &Expectation) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Pending,
    RunningActions,
    RunningExpectations,
    Done,
}

impl CaseState {
    fn next(self) -> Self {
        match self {
            Self::Pending => Self::RunningActions,
            Self::RunningActions => Self::RunningExpectations,
            Self::RunningExpectations | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::RunningActions => "running actions",
            Self::RunningExpectations => "running expectations",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one action group or expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    pub id: String,
    pub passed: bool,
}

/// Everything a test case run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub test_case_id: String,
    pub state: CaseState,
    pub actions: Vec<UnitResult>,
    pub expectations: Vec<UnitResult>,
}

impl CaseOutcome {
    fn new(test_case_id: &str) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            state: CaseState::Pending,
            actions: Vec::new(),
            expectations: Vec::new(),
        }
    }

    fn advance(&mut self) {
        let next = self.state.next();
        debug!("test case {}: {} -> {}", self.test_case_id, self.state, next);
        self.state = next;
    }

    pub fn actions_passed(&self) -> bool {
        all_passed(&self.actions)
    }

    pub fn expectations_passed(&self) -> bool {
        all_passed(&self.expectations)
    }

    pub fn passed(&self) -> bool {
        self.actions_passed() && self.expectations_passed()
    }

    /// Ids of the units that failed, action groups first.
    pub fn failed_units(&self) -> impl Iterator<Item = &str> {
        self.actions
            .iter()
            .chain(&self.expectations)
            .filter(|unit| !unit.passed)
            .map(|unit| unit.id.as_str())
    }
}

fn all_passed(units: &[UnitResult]) -> bool {
    units.iter().fold(true, |passed, unit| passed && unit.passed)
}

pub struct TestVectorEngine<D> {
    dispatcher: D,
}

impl<D: ActionGroupDispatcher> TestVectorEngine<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Run every test case in `test_vector`; passes only if all of them do.
    pub async fn process_test_vector(&self, test_vector: &TestVector) -> bool {
        let mut outcomes = Vec::with_capacity(test_vector.test_cases.len());
        for test_case in &test_vector.test_cases {
            outcomes.push(self.run_test_case(test_case).await);
        }
        outcomes
            .iter()
            .fold(true, |passed, outcome| passed && outcome.passed())
    }

    pub async fn process_test_case(&self, test_case: &TestCase) -> bool {
        self.run_test_case(test_case).await.passed()
    }

    pub async fn run_test_case(&self, test_case: &TestCase) -> CaseOutcome {
        info!("test case id: {}", test_case.test_case_id);
        let mut outcome = CaseOutcome::new(&test_case.test_case_id);

        outcome.advance();
        for action_group in &test_case.action_groups {
            info!("action group id: {}", action_group.action_group_id);
            let passed = self.dispatcher.process_action_group(action_group).await;
            if !passed {
                error!(
                    "test case {}: action group {} failed",
                    test_case.test_case_id, action_group.action_group_id
                );
            }
            outcome.actions.push(UnitResult {
                id: action_group.action_group_id.clone(),
                passed,
            });
        }

        outcome.advance();
        for expectation in &test_case.expectations {
            info!("expectation id: {}", expectation.expectation_id);
            let passed = self.dispatcher.process_expectation(expectation).await;
            if !passed {
                error!(
                    "test case {}: expectation {} failed",
                    test_case.test_case_id, expectation.expectation_id
                );
            }
            outcome.expectations.push(UnitResult {
                id: expectation.expectation_id.clone(),
                passed,
            });
        }

        outcome.advance();
        if outcome.passed() {
            info!("test case {} passed", test_case.test_case_id);
        } else {
            error!("test case {} failed", test_case.test_case_id);
        }
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::model::{Check, ExecutionMode, PacketInCheck},
        parking_lot::Mutex,
        std::collections::HashSet,
    };

    /// Records every dispatched unit and fails the ids it was told to.
    #[derive(Default)]
    pub(crate) struct ScriptedDispatcher {
        failing: HashSet<String>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedDispatcher {
        pub(crate) fn failing(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|id| id.to_string()).collect(),
                calls: Mutex::default(),
            }
        }

        fn run(&self, id: &str) -> bool {
            self.calls.lock().push(id.to_string());
            !self.failing.contains(id)
        }
    }

    #[async_trait]
    impl ActionGroupDispatcher for ScriptedDispatcher {
        async fn process_action_group(&self, action_group: &ActionGroup) -> bool {
            self.run(&action_group.action_group_id)
        }

        async fn process_expectation(&self, expectation: &Expectation) -> bool {
            self.run(&expectation.expectation_id)
        }
    }

    pub(crate) fn test_case(id: &str, groups: &[&str], expectations: &[&str]) -> TestCase {
        TestCase {
            test_case_id: id.to_string(),
            description: None,
            action_groups: groups
                .iter()
                .map(|group| ActionGroup {
                    action_group_id: group.to_string(),
                    mode: ExecutionMode::Sequential,
                    actions: vec![],
                })
                .collect(),
            expectations: expectations
                .iter()
                .map(|expectation| Expectation {
                    expectation_id: expectation.to_string(),
                    check: Check::PacketIn(PacketInCheck {
                        payload: vec![],
                        metadata: vec![],
                    }),
                })
                .collect(),
        }
    }

    fn calls(engine: &TestVectorEngine<ScriptedDispatcher>) -> Vec<String> {
        engine.dispatcher().calls.lock().clone()
    }

    #[tokio::test]
    async fn test_case_runs_every_unit_in_order() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::default());
        let case = test_case("tc", &["ag-1", "ag-2"], &["exp-1"]);

        let outcome = engine.run_test_case(&case).await;
        assert!(outcome.passed());
        assert_eq!(outcome.state, CaseState::Done);
        assert_eq!(calls(&engine), vec!["ag-1", "ag-2", "exp-1"]);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_stop_the_case() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::failing(&["ag-1"]));
        let case = test_case("tc", &["ag-1", "ag-2"], &["exp-1", "exp-2"]);

        let outcome = engine.run_test_case(&case).await;
        assert!(!outcome.actions_passed());
        assert!(outcome.expectations_passed());
        assert!(!outcome.passed());
        assert_eq!(calls(&engine), vec!["ag-1", "ag-2", "exp-1", "exp-2"]);
        assert_eq!(outcome.failed_units().collect::<Vec<_>>(), vec!["ag-1"]);
    }

    #[tokio::test]
    async fn test_multiple_failures_are_all_reported() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::failing(&["ag-2", "exp-1"]));
        let case = test_case("tc", &["ag-1", "ag-2"], &["exp-1", "exp-2"]);

        let outcome = engine.run_test_case(&case).await;
        assert_eq!(
            outcome.failed_units().collect::<Vec<_>>(),
            vec!["ag-2", "exp-1"]
        );
    }

    #[tokio::test]
    async fn test_vector_runs_every_case() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::failing(&["a-1"]));
        let test_vector = TestVector {
            test_cases: vec![
                test_case("first", &["a-1"], &["e-1"]),
                test_case("second", &["a-2"], &["e-2"]),
            ],
        };

        assert!(!engine.process_test_vector(&test_vector).await);
        assert_eq!(calls(&engine), vec!["a-1", "e-1", "a-2", "e-2"]);
    }

    #[tokio::test]
    async fn test_empty_case_passes() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::default());
        assert!(engine.process_test_case(&test_case("empty", &[], &[])).await);
        assert!(engine.process_test_vector(&TestVector::default()).await);
    }
}
