//! A run over many test vector files, with lifecycle hooks and a report.

use {
    crate::{
        engine::{ActionGroupDispatcher, CaseOutcome, TestVectorEngine},
        error::Result,
        loader::{load_test_vector, test_vector_name},
        model::{TestCase, TestVector},
    },
    async_trait::async_trait,
    log::{info, warn},
    std::{
        fmt,
        path::{Path, PathBuf},
    },
};

/// Setup and teardown around test vectors and test cases.
///
/// Hooks cannot fail a test: whatever they do is outside the reported
/// results.
#[async_trait]
pub trait SuiteHooks: Send + Sync {
    async fn setup_test_vector(&self, _name: &str) {}

    async fn teardown_test_vector(&self, _name: &str) {}

    async fn setup_test_case(&self, _test_case: &TestCase) {}

    async fn teardown_test_case(&self, _test_case: &TestCase) {}
}

/// Hooks that do nothing.
pub struct NoHooks;

impl SuiteHooks for NoHooks {}

#[derive(Debug, Clone)]
pub struct NamedTestVector {
    pub name: String,
    pub path: PathBuf,
    pub test_vector: TestVector,
}

#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    vectors: Vec<NamedTestVector>,
}

impl TestSuite {
    /// Load every file in `paths`. The first file that fails to load aborts
    /// the whole suite.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let vectors = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                Ok(NamedTestVector {
                    name: test_vector_name(path),
                    path: path.to_path_buf(),
                    test_vector: load_test_vector(path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!("loaded {} test vectors", vectors.len());
        Ok(Self { vectors })
    }

    pub fn from_vectors(vectors: Vec<NamedTestVector>) -> Self {
        Self { vectors }
    }

    pub fn vectors(&self) -> &[NamedTestVector] {
        &self.vectors
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Run the suite. With a `filter`, only test cases whose id contains it
    /// run, and vectors left without cases are skipped entirely.
    pub async fn run<D: ActionGroupDispatcher>(
        &self,
        engine: &TestVectorEngine<D>,
        hooks: &dyn SuiteHooks,
        filter: Option<&str>,
    ) -> SuiteReport {
        let mut report = SuiteReport::default();
        for vector in &self.vectors {
            let cases: Vec<&TestCase> = vector
                .test_vector
                .test_cases
                .iter()
                .filter(|case| filter.map_or(true, |f| case.test_case_id.contains(f)))
                .collect();
            if cases.is_empty() {
                if filter.is_some() {
                    info!("skipping test vector {}: no matching test cases", vector.name);
                } else {
                    warn!("test vector {} has no test cases", vector.name);
                }
                continue;
            }

            info!("running test vector {}", vector.name);
            hooks.setup_test_vector(&vector.name).await;
            let mut outcomes = Vec::with_capacity(cases.len());
            for case in cases {
                hooks.setup_test_case(case).await;
                outcomes.push(engine.run_test_case(case).await);
                hooks.teardown_test_case(case).await;
            }
            hooks.teardown_test_vector(&vector.name).await;

            report.vectors.push(VectorReport {
                name: vector.name.clone(),
                cases: outcomes,
            });
        }
        report
    }
}

#[derive(Debug, Clone)]
pub struct VectorReport {
    pub name: String,
    pub cases: Vec<CaseOutcome>,
}

impl VectorReport {
    pub fn passed(&self) -> bool {
        self.cases
            .iter()
            .fold(true, |passed, case| passed && case.passed())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub vectors: Vec<VectorReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.vectors
            .iter()
            .fold(true, |passed, vector| passed && vector.passed())
    }

    pub fn total_cases(&self) -> usize {
        self.vectors.iter().map(|vector| vector.cases.len()).sum()
    }

    /// `(test vector, test case)` ids of every failed case.
    pub fn failed_cases(&self) -> Vec<(&str, &str)> {
        self.vectors
            .iter()
            .flat_map(|vector| {
                vector
                    .cases
                    .iter()
                    .filter(|case| !case.passed())
                    .map(|case| (vector.name.as_str(), case.test_case_id.as_str()))
            })
            .collect()
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for vector in &self.vectors {
            writeln!(f, "{}", vector.name)?;
            for case in &vector.cases {
                if case.passed() {
                    writeln!(f, "  PASS {}", case.test_case_id)?;
                } else {
                    let failed: Vec<_> = case.failed_units().collect();
                    writeln!(
                        f,
                        "  FAIL {} ({})",
                        case.test_case_id,
                        failed.join(", ")
                    )?;
                }
            }
        }
        let failed = self.failed_cases().len();
        write!(
            f,
            "{} test cases, {} passed, {} failed",
            self.total_cases(),
            self.total_cases().saturating_sub(failed),
            failed
        )
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::engine::tests::{test_case, ScriptedDispatcher},
        parking_lot::Mutex,
        pretty_assertions::assert_eq,
    };

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SuiteHooks for RecordingHooks {
        async fn setup_test_vector(&self, name: &str) {
            self.events.lock().push(format!("setup {name}"));
        }

        async fn teardown_test_vector(&self, name: &str) {
            self.events.lock().push(format!("teardown {name}"));
        }

        async fn setup_test_case(&self, test_case: &TestCase) {
            self.events
                .lock()
                .push(format!("setup {}", test_case.test_case_id));
        }

        async fn teardown_test_case(&self, test_case: &TestCase) {
            self.events
                .lock()
                .push(format!("teardown {}", test_case.test_case_id));
        }
    }

    fn suite() -> TestSuite {
        TestSuite::from_vectors(vec![
            NamedTestVector {
                name: "routing".to_string(),
                path: PathBuf::from("routing.yaml"),
                test_vector: TestVector {
                    test_cases: vec![
                        test_case("route-v4", &["r4-ag"], &["r4-exp"]),
                        test_case("route-v6", &["r6-ag"], &["r6-exp"]),
                    ],
                },
            },
            NamedTestVector {
                name: "punt".to_string(),
                path: PathBuf::from("punt.yaml"),
                test_vector: TestVector {
                    test_cases: vec![test_case("punt-arp", &["p-ag"], &["p-exp"])],
                },
            },
        ])
    }

    #[tokio::test]
    async fn test_hooks_wrap_each_phase() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::default());
        let hooks = RecordingHooks::default();

        let report = suite().run(&engine, &hooks, None).await;
        assert!(report.passed());
        assert_eq!(
            *hooks.events.lock(),
            vec![
                "setup routing",
                "setup route-v4",
                "teardown route-v4",
                "setup route-v6",
                "teardown route-v6",
                "teardown routing",
                "setup punt",
                "setup punt-arp",
                "teardown punt-arp",
                "teardown punt",
            ]
        );
    }

    #[tokio::test]
    async fn test_report_lists_failures() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::failing(&["r6-exp", "p-ag"]));

        let report = suite().run(&engine, &NoHooks, None).await;
        assert!(!report.passed());
        assert_eq!(report.total_cases(), 3);
        assert_eq!(
            report.failed_cases(),
            vec![("routing", "route-v6"), ("punt", "punt-arp")]
        );
        assert_eq!(
            report.to_string(),
            "routing\n  PASS route-v4\n  FAIL route-v6 (r6-exp)\n\
             punt\n  FAIL punt-arp (p-ag)\n\
             3 test cases, 1 passed, 2 failed"
        );
    }

    #[tokio::test]
    async fn test_filter_selects_cases() {
        let engine = TestVectorEngine::new(ScriptedDispatcher::default());
        let hooks = RecordingHooks::default();

        let report = suite().run(&engine, &hooks, Some("v6")).await;
        assert_eq!(report.vectors.len(), 1);
        assert_eq!(report.vectors[0].cases[0].test_case_id, "route-v6");
        assert!(!hooks.events.lock().contains(&"setup punt".to_string()));
        assert_eq!(
            *engine.dispatcher().calls.lock(),
            vec!["r6-ag", "r6-exp"]
        );
    }

    #[test]
    fn test_load_fails_on_first_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"test_cases": []}"#).unwrap();
        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "").unwrap();

        let suite = TestSuite::load(&[&good]).unwrap();
        assert_eq!(suite.vectors()[0].name, "good");
        assert!(TestSuite::load(&[good, bad]).is_err());
    }
}
