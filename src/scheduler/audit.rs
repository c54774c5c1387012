//! Post-hoc verification of produced assignments
//!
//! [`audit_assignments`] re-checks a list of assignments against the same
//! rules the rotation run enforces. Used by the `verify` command, the
//! integration tests and anyone who edits a plan by hand before storing it.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::history::HistoryIndex;
use super::safety::SafetyConfig;
use crate::models::{Assignment, HistoryEntry};

/// A rule broken by a list of assignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    ActorCapExceeded {
        actor_id: String,
        day: NaiveDate,
        count: u32,
        cap: u32,
    },
    TargetCapExceeded {
        target_id: String,
        day: NaiveDate,
        count: u32,
        cap: u32,
    },
    TargetCooldown {
        sequence_number: u32,
        target_id: String,
        at: NaiveDateTime,
    },
    DuplicateTuple {
        sequence_number: u32,
    },
    OutsideWorkingHours {
        sequence_number: u32,
        at: NaiveDateTime,
    },
    InsideBreak {
        sequence_number: u32,
        at: NaiveDateTime,
    },
    SpacingTooShort {
        sequence_number: u32,
        gap_minutes: i64,
    },
    SequenceGap {
        expected: u32,
        found: u32,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorCapExceeded {
                actor_id,
                day,
                count,
                cap,
            } => write!(f, "actor {actor_id} has {count} assignments on {day} (cap {cap})"),
            Self::TargetCapExceeded {
                target_id,
                day,
                count,
                cap,
            } => write!(f, "target {target_id} has {count} assignments on {day} (cap {cap})"),
            Self::TargetCooldown {
                sequence_number,
                target_id,
                at,
            } => write!(f, "#{sequence_number}: target {target_id} still cooling down at {at}"),
            Self::DuplicateTuple { sequence_number } => {
                write!(f, "#{sequence_number}: actor/target/text/media combination repeated")
            }
            Self::OutsideWorkingHours { sequence_number, at } => {
                write!(f, "#{sequence_number}: {at} is outside working hours")
            }
            Self::InsideBreak { sequence_number, at } => {
                write!(f, "#{sequence_number}: {at} falls in the break window")
            }
            Self::SpacingTooShort {
                sequence_number,
                gap_minutes,
            } => write!(f, "#{sequence_number}: only {gap_minutes} min after previous slot"),
            Self::SequenceGap { expected, found } => {
                write!(f, "sequence number {found} where {expected} was expected")
            }
        }
    }
}

/// Check `assignments` (in run order) against `history` and `config`
///
/// Returns every violation found; an empty list means the assignments
/// respect caps, cooldowns, uniqueness, working hours and spacing.
pub fn audit_assignments(
    assignments: &[Assignment],
    history: &[HistoryEntry],
    config: &SafetyConfig,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut index = HistoryIndex::build(history, &[]);
    let mut seen = HashSet::new();
    let mut actor_days = BTreeSet::new();
    let mut target_days = BTreeSet::new();
    let min_gap = Duration::minutes(config.slot_interval_minutes as i64);

    let mut previous: Option<&Assignment> = None;
    for (i, a) in assignments.iter().enumerate() {
        let seq = a.sequence_number;
        let expected = assignments[0].sequence_number + i as u32;
        if seq != expected {
            violations.push(Violation::SequenceGap {
                expected,
                found: seq,
            });
        }

        let time = a.scheduled_time.time();
        if !config.working_hours.contains(time) {
            violations.push(Violation::OutsideWorkingHours {
                sequence_number: seq,
                at: a.scheduled_time,
            });
        }
        if config.break_window.is_some_and(|b| b.contains(time)) {
            violations.push(Violation::InsideBreak {
                sequence_number: seq,
                at: a.scheduled_time,
            });
        }

        if let Some(prev) = previous {
            if prev.day() == a.day() {
                let gap = a.scheduled_time - prev.scheduled_time;
                if gap < min_gap {
                    violations.push(Violation::SpacingTooShort {
                        sequence_number: seq,
                        gap_minutes: gap.num_minutes(),
                    });
                }
            }
        }

        if index.target_on_cooldown(&a.target_id, a.scheduled_time, config.target_cooldown_days) {
            violations.push(Violation::TargetCooldown {
                sequence_number: seq,
                target_id: a.target_id.clone(),
                at: a.scheduled_time,
            });
        }

        if !seen.insert(a.tuple_key()) {
            violations.push(Violation::DuplicateTuple {
                sequence_number: seq,
            });
        }

        index.record_planned(a);
        actor_days.insert((a.actor_id.as_str(), a.day()));
        target_days.insert((a.target_id.as_str(), a.day()));
        previous = Some(a);
    }

    for (actor_id, day) in actor_days {
        let count = index.actor_count(actor_id, day);
        if count > config.max_per_actor_per_day {
            violations.push(Violation::ActorCapExceeded {
                actor_id: actor_id.to_string(),
                day,
                count,
                cap: config.max_per_actor_per_day,
            });
        }
    }

    for (target_id, day) in target_days {
        let count = index.target_count(target_id, day);
        if count > config.max_per_target_per_day {
            violations.push(Violation::TargetCapExceeded {
                target_id: target_id.to_string(),
                day,
                count,
                cap: config.max_per_target_per_day,
            });
        }
    }

    if !violations.is_empty() {
        tracing::warn!(count = violations.len(), "Assignment audit found violations");
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentOutcome;
    use crate::scheduler::safety::TimeWindow;

    fn config() -> SafetyConfig {
        SafetyConfig::builder()
            .max_per_actor_per_day(2)
            .max_per_target_per_day(1)
            .target_cooldown_days(1)
            .content_reuse_cooldown_days(0)
            .working_hours(TimeWindow::parse("09:00", "17:00").unwrap())
            .break_window(TimeWindow::parse("12:00", "13:00").unwrap())
            .slot_interval_minutes(30)
            .build()
            .unwrap()
    }

    fn assignment(seq: u32, actor: &str, target: &str, at: &str) -> Assignment {
        Assignment {
            actor_id: actor.into(),
            target_id: target.into(),
            text_id: "x1".into(),
            media_id: None,
            scheduled_time: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M").unwrap(),
            sequence_number: seq,
        }
    }

    #[test]
    fn test_clean_assignments() {
        let assignments = vec![
            assignment(1, "a1", "g1", "2024-03-04 09:00"),
            assignment(2, "a2", "g2", "2024-03-04 09:30"),
            assignment(3, "a1", "g3", "2024-03-04 13:00"),
        ];
        assert!(audit_assignments(&assignments, &[], &config()).is_empty());
    }

    #[test]
    fn test_detects_caps_and_duplicates() {
        let assignments = vec![
            assignment(1, "a1", "g1", "2024-03-04 09:00"),
            assignment(2, "a1", "g1", "2024-03-04 09:30"),
            assignment(3, "a1", "g2", "2024-03-04 10:00"),
        ];
        let violations = audit_assignments(&assignments, &[], &config());

        assert!(violations.contains(&Violation::DuplicateTuple { sequence_number: 2 }));
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::ActorCapExceeded { count: 3, cap: 2, .. }
        )));
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::TargetCapExceeded { target_id, count: 2, .. } if target_id == "g1"
        )));
    }

    #[test]
    fn test_detects_time_rules() {
        let assignments = vec![
            assignment(1, "a1", "g1", "2024-03-04 08:30"),
            assignment(2, "a2", "g2", "2024-03-04 12:15"),
            assignment(4, "a3", "g3", "2024-03-04 12:20"),
        ];
        let violations = audit_assignments(&assignments, &[], &config());

        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::OutsideWorkingHours { sequence_number: 1, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::InsideBreak { sequence_number: 2, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::SpacingTooShort { gap_minutes: 5, .. })));
        assert!(violations.contains(&Violation::SequenceGap {
            expected: 3,
            found: 4
        }));
    }

    #[test]
    fn test_detects_cooldown_from_history() {
        let history = vec![HistoryEntry {
            actor_id: "a9".into(),
            target_id: "g1".into(),
            text_id: "x5".into(),
            media_id: None,
            occurred_at: NaiveDateTime::parse_from_str("2024-03-03 16:00", "%Y-%m-%d %H:%M")
                .unwrap(),
            outcome: AssignmentOutcome::Posted,
        }];
        let assignments = vec![assignment(1, "a1", "g1", "2024-03-04 09:00")];

        let violations = audit_assignments(&assignments, &history, &config());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].to_string().contains("cooling down"));
    }
}
