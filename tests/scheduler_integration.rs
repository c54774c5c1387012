//! Integration tests for the rotation scheduler
//!
//! These tests verify the complete workflow of:
//! - Single-day runs over realistic pools
//! - Cooldowns carried across days through history
//! - Weekly planning
//! - Auditing produced and tampered plans

mod common;

use std::collections::HashSet;

use chrono::{Duration, NaiveTime};
use common::{audiences, monday, pools, safety};
use rotapost::models::HistoryEntry;
use rotapost::scheduler::{
    audit_assignments, AssignmentPlan, RotationScheduler, Termination, Violation, WeeklyPlanner,
};

fn posted(plan: &AssignmentPlan) -> Vec<HistoryEntry> {
    plan.assignments
        .iter()
        .map(|a| HistoryEntry::posted(a, a.scheduled_time))
        .collect()
}

// ============================================================================
// Single Day
// ============================================================================

#[test]
fn test_full_day_respects_every_limit() {
    let pools = pools(4, &audiences(30), 5, 2);
    let config = safety(5, 1, 3, 20);

    let plan = RotationScheduler::new()
        .generate_plan(&pools, &[], &config, monday(), 20)
        .unwrap();

    assert_eq!(plan.termination, Termination::Completed);
    assert_eq!(plan.len(), 20);
    assert!(audit_assignments(&plan.assignments, &[], &config).is_empty());

    let summary = plan.summary();
    for actor in ["A1", "A2", "A3", "A4"] {
        assert_eq!(summary.per_actor.get(actor), Some(&5), "actor {actor}");
    }

    let lunch = NaiveTime::from_hms_opt(12, 0, 0).unwrap()..NaiveTime::from_hms_opt(13, 0, 0).unwrap();
    for pair in plan.assignments.windows(2) {
        assert!(pair[1].scheduled_time > pair[0].scheduled_time);
    }
    assert!(plan
        .assignments
        .iter()
        .all(|a| !lunch.contains(&a.scheduled_time.time())));
}

#[test]
fn test_largest_groups_come_first() {
    let pools = pools(2, &[50, 900, 300, 10], 3, 0);
    let config = safety(5, 1, 0, 30);

    let plan = RotationScheduler::new()
        .generate_plan(&pools, &[], &config, monday(), 4)
        .unwrap();

    let targets: Vec<_> = plan.assignments.iter().map(|a| a.target_id.as_str()).collect();
    assert_eq!(targets, vec!["T2", "T3", "T1", "T4"]);
}

#[test]
fn test_determinism_across_calls() {
    let pools = pools(3, &audiences(8), 4, 2);
    let config = safety(3, 2, 1, 15);
    let scheduler = RotationScheduler::new();

    let first = scheduler
        .generate_assignments(&pools, &[], &config, monday(), 12)
        .unwrap();
    for _ in 0..5 {
        let again = scheduler
            .generate_assignments(&pools, &[], &config, monday(), 12)
            .unwrap();
        assert_eq!(again, first);
    }
}

// ============================================================================
// History Across Days
// ============================================================================

#[test]
fn test_target_cooldown_spans_days() {
    let pools = pools(3, &audiences(6), 3, 0);
    let config = safety(2, 1, 3, 20);
    let scheduler = RotationScheduler::new();

    let first = scheduler
        .generate_plan(&pools, &[], &config, monday(), 6)
        .unwrap();
    assert_eq!(first.len(), 6);
    let history = posted(&first);

    // Every group was used on Monday and is cooling down on Tuesday
    let tuesday = monday() + Duration::days(1);
    let blocked = scheduler
        .generate_plan(&pools, &history, &config, tuesday, 6)
        .unwrap();
    assert!(blocked.is_empty());
    assert_eq!(blocked.termination, Termination::CapacityExhausted);

    let friday = monday() + Duration::days(4);
    let reopened = scheduler
        .generate_plan(&pools, &history, &config, friday, 6)
        .unwrap();
    assert_eq!(reopened.len(), 6);
    assert!(audit_assignments(&reopened.assignments, &history, &config).is_empty());
}

#[test]
fn test_weekly_plan_passes_audit_day_by_day() {
    let pools = pools(3, &audiences(10), 4, 1);
    let config = safety(2, 1, 2, 30);

    let week = WeeklyPlanner::new(5)
        .plan_week(&pools, &[], &config, monday())
        .unwrap();
    assert_eq!(week.days.len(), 5);

    let mut history = Vec::new();
    for plan in &week.days {
        assert!(
            audit_assignments(&plan.assignments, &history, &config).is_empty(),
            "violations on {}",
            plan.day
        );
        if let Some(first) = plan.assignments.first() {
            assert_eq!(first.sequence_number, 1);
        }
        history.extend(posted(plan));
    }

    assert_eq!(week.total(), week.assignments().count());
}

// ============================================================================
// Audit
// ============================================================================

#[test]
fn test_audit_flags_tampered_plan() {
    let pools = pools(2, &audiences(4), 2, 0);
    let config = safety(5, 1, 0, 30);

    let plan = RotationScheduler::new()
        .generate_plan(&pools, &[], &config, monday(), 3)
        .unwrap();

    let mut tampered = plan.assignments.clone();
    let mut repeat = tampered[0].clone();
    repeat.sequence_number = 4;
    repeat.scheduled_time = tampered[2].scheduled_time + Duration::minutes(30);
    tampered.push(repeat);

    let violations = audit_assignments(&tampered, &[], &config);
    assert!(violations
        .iter()
        .any(|v| matches!(v, Violation::DuplicateTuple { sequence_number: 4 })));
    assert!(violations
        .iter()
        .any(|v| matches!(v, Violation::TargetCapExceeded { count: 2, .. })));
}

#[test]
fn test_no_repeated_tuples_when_pairs_run_out() {
    let pools = pools(1, &[100], 2, 2);
    let config = safety(10, 10, 0, 20);

    let plan = RotationScheduler::new()
        .generate_plan(&pools, &[], &config, monday(), 10)
        .unwrap();

    // One actor and one group leave exactly texts x media distinct tuples
    assert_eq!(plan.len(), 4);
    assert_eq!(plan.termination, Termination::CapacityExhausted);
    let unique: HashSet<_> = plan.assignments.iter().map(|a| a.tuple_key()).collect();
    assert_eq!(unique.len(), 4);
}

// ============================================================================
// Plan Files
// ============================================================================

#[tokio::test]
async fn test_plan_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");

    let plan = RotationScheduler::new()
        .generate_plan(&pools(2, &audiences(3), 2, 0), &[], &safety(2, 1, 0, 30), monday(), 3)
        .unwrap();
    plan.save_to_file(&path).await.unwrap();

    let loaded = AssignmentPlan::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.assignments, plan.assignments);
    assert_eq!(loaded.termination, plan.termination);
}
