//! Property tests over generated schedules.

use ccreplay_core::{OccConfig, OccDriver, TplConfig, TplDriver};
use ccreplay_testkit::prelude::*;
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = TplConfig> {
    (any::<bool>(), any::<bool>())
        .prop_map(|(upgrade, rollback)| TplConfig::new().upgrade(upgrade).rollback(rollback))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn lock_table_invariant_holds_after_every_step(
        schedule in tpl_schedule_strategy(),
        config in config_strategy(),
    ) {
        let mut driver = TplDriver::from_input(&schedule, config).unwrap();
        step_checking_locks(&mut driver);
    }

    #[test]
    fn tpl_trace_tokens_are_well_formed(
        schedule in tpl_schedule_strategy(),
        config in config_strategy(),
    ) {
        let mut driver = TplDriver::from_input(&schedule, config).unwrap();
        let _ = driver.run();
        for token in driver.trace().tokens() {
            prop_assert!(is_tpl_token(&token), "{}", token);
        }
    }

    #[test]
    fn completed_tpl_run_releases_every_lock(
        schedule in tpl_schedule_strategy(),
        config in config_strategy(),
    ) {
        let mut driver = TplDriver::from_input(&schedule, config).unwrap();
        if driver.run().is_ok() {
            prop_assert!(driver.lock_table().is_empty());
            prop_assert_eq!(driver.waiting().count(), 0);
        } else {
            prop_assert!(driver.waiting().count() > 0);
        }
    }

    #[test]
    fn tpl_without_rollback_commits_in_trace_order(schedule in tpl_schedule_strategy()) {
        let mut driver = TplDriver::from_input(&schedule, TplConfig::new()).unwrap();
        if let Ok(outcome) = driver.run() {
            let commits: Vec<String> = outcome
                .tokens()
                .into_iter()
                .filter(|t| t.starts_with('C'))
                .collect();
            let expected: Vec<String> =
                outcome.committed.iter().map(|t| format!("C{t}")).collect();
            prop_assert_eq!(commits, expected);
        }
    }

    #[test]
    fn occ_relabels_move_past_the_schedule(scenario in occ_scenario_strategy()) {
        let mut driver =
            OccDriver::new(scenario.transactions(), scenario.schedule.clone(), OccConfig::default())
                .unwrap();
        step_checking_relabels(&mut driver);
    }

    #[test]
    fn occ_replay_terminates_with_every_transaction_committed(
        scenario in occ_scenario_strategy(),
    ) {
        let mut driver =
            OccDriver::new(scenario.transactions(), scenario.schedule.clone(), OccConfig::default())
                .unwrap();
        let outcome = driver.run().unwrap();
        prop_assert!(outcome.transactions.iter().all(|t| t.is_committed()));
        for token in outcome.tokens() {
            prop_assert!(is_occ_token(&token), "{}", token);
        }
    }
}
