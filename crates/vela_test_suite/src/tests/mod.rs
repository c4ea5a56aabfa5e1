//! Scenario suites organized by category

pub mod reactivity;
pub mod watch;

use crate::runner::TestSuite;

/// Create all scenario suites
pub fn all_suites() -> Vec<TestSuite> {
    vec![
        reactivity::suite(),
        keyed::suite(),
        components::suite(),
        watch::suite(),
        app::suite(),
    ]
}

#[cfg(test)]
mod run {
    use super::*;
    use crate::runner::TestRunner;

    fn assert_suite_passes(suite: TestSuite) {
        crate::harness::init_test_logging();
        let mut runner = TestRunner::new();
        runner.add_suite(suite);
        let result = runner.run();
        assert!(result.total() > 0);
        assert!(result.all_passed(), "failed: {:#?}", result.failures());
    }

    #[test]
    fn test_reactivity_suite() {
        assert_suite_passes(reactivity::suite());
    }

    #[test]
    fn test_keyed_suite() {
        assert_suite_passes(keyed::suite());
    }

    #[test]
    fn test_components_suite() {
        assert_suite_passes(components::suite());
    }

    #[test]
    fn test_watch_suite() {
        assert_suite_passes(watch::suite());
    }

    #[test]
    fn test_app_suite() {
        assert_suite_passes(app::suite());
    }
}
