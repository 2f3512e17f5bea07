//! Test vectors: the declarative description of a conformance test, and the
//! engine that runs them.
//!
//! A test vector holds test cases; a test case holds action groups (stimuli)
//! and expectations (checks). The engine hands each unit to an
//! [`ActionGroupDispatcher`] and aggregates the boolean results without ever
//! skipping a unit, so one run reports every divergence at once.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`model`]       | Serde model of the test vector tree |
//! | [`loader`]      | JSON/YAML loading and directory discovery |
//! | [`engine`]      | Per-case state machine and AND aggregation |
//! | [`dispatch`]    | Handler registry keyed by action/expectation kind |
//! | [`p4_handlers`] | Handlers backed by a P4Runtime session |
//! | [`suite`]       | Multi-file runs, lifecycle hooks and the report |

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod p4_handlers;
pub mod suite;

pub use {
    dispatch::{ActionHandler, ExpectationHandler, HandlerRegistry},
    engine::{ActionGroupDispatcher, CaseOutcome, CaseState, TestVectorEngine, UnitResult},
    error::{Result, TestVectorError},
    model::{Action, ActionGroup, Check, ExecutionMode, Expectation, TestCase, TestVector},
    p4_handlers::register_p4rt_handlers,
    suite::{NoHooks, SuiteHooks, SuiteReport, TestSuite},
};
