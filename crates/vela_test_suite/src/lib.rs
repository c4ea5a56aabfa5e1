//! Vela Scenario Test Suite
//!
//! End-to-end scenarios for the Vela runtime, run against [`harness::MemoryHost`],
//! an in-memory host tree that counts every operation the renderer performs.
//!
//! # Test Categories
//!
//! - **reactivity**: batching, memoization and consistency of derived values
//! - **keyed**: child list reconciliation, move counts and idempotence
//! - **components**: lifecycle order, props, render failures and teardown
//! - **watch**: coalescing, flush timing and deep sources
//! - **app**: mount targets, dispatch and unmount

pub mod harness;
pub mod runner;
pub mod tests;

pub use harness::{init_test_logging, HostOpCounts, MemoryHost, TestContext, TestResult};
pub use runner::{TestRunner, TestSuite};
