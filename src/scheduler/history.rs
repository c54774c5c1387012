//! Usage index over assignment history
//!
//! Built once at the start of a run from the successful history entries,
//! then extended with the run's own assignments as they are produced. All
//! cap and cooldown checks in the hot loop are map lookups against this
//! index; nothing goes back to the data store mid-run.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};

use crate::models::{Assignment, HistoryEntry, Target};

/// Text+media pair reused by one actor
type ContentKey = (String, String, Option<String>);

/// Per-day usage counts and last-use timestamps
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    actor_day_counts: HashMap<String, HashMap<NaiveDate, u32>>,
    target_day_counts: HashMap<String, HashMap<NaiveDate, u32>>,

    /// Last successful post per target, from history
    target_last_success: HashMap<String, NaiveDateTime>,
    /// Last planned post per target, from the current run
    target_last_planned: HashMap<String, NaiveDateTime>,

    content_last_success: HashMap<ContentKey, NaiveDateTime>,
    content_last_planned: HashMap<ContentKey, NaiveDateTime>,

    /// Targets used per (linked actor, day)
    linked_usage: HashMap<(String, NaiveDate), HashSet<String>>,

    /// Target id -> linked actor id
    links: HashMap<String, String>,
}

impl HistoryIndex {
    /// Index the successful entries of `history`
    ///
    /// `targets` supplies the linked-actor mapping used by the linkage
    /// constraint; history rows for unknown targets still count toward
    /// caps and cooldowns.
    pub fn build(history: &[HistoryEntry], targets: &[Target]) -> Self {
        let links = targets
            .iter()
            .filter_map(|t| t.linked_actor_id.clone().map(|a| (t.id.clone(), a)))
            .collect();

        let mut index = Self {
            links,
            ..Default::default()
        };

        let mut skipped = 0usize;
        for entry in history {
            if !entry.outcome.is_success() {
                skipped += 1;
                continue;
            }

            let day = entry.occurred_at.date();
            index.bump_counts(&entry.actor_id, &entry.target_id, day);
            index.mark_linked(&entry.target_id, day);

            latest(
                &mut index.target_last_success,
                entry.target_id.clone(),
                entry.occurred_at,
            );
            latest(
                &mut index.content_last_success,
                content_key(&entry.actor_id, &entry.text_id, entry.media_id.as_deref()),
                entry.occurred_at,
            );
        }

        tracing::debug!(
            entries = history.len(),
            ignored = skipped,
            targets_seen = index.target_last_success.len(),
            "History index built"
        );

        index
    }

    /// Fold a produced assignment into the index
    pub fn record_planned(&mut self, assignment: &Assignment) {
        let day = assignment.day();
        self.bump_counts(&assignment.actor_id, &assignment.target_id, day);
        self.mark_linked(&assignment.target_id, day);

        latest(
            &mut self.target_last_planned,
            assignment.target_id.clone(),
            assignment.scheduled_time,
        );
        latest(
            &mut self.content_last_planned,
            content_key(
                &assignment.actor_id,
                &assignment.text_id,
                assignment.media_id.as_deref(),
            ),
            assignment.scheduled_time,
        );
    }

    pub fn actor_count(&self, actor_id: &str, day: NaiveDate) -> u32 {
        day_count(&self.actor_day_counts, actor_id, day)
    }

    pub fn target_count(&self, target_id: &str, day: NaiveDate) -> u32 {
        day_count(&self.target_day_counts, target_id, day)
    }

    pub fn target_last_success(&self, target_id: &str) -> Option<NaiveDateTime> {
        self.target_last_success.get(target_id).copied()
    }

    /// Whether posting to `target_id` at `at` falls inside its cooldown
    ///
    /// Planned assignments of the current run only count when they sit on
    /// an earlier day; same-day reuse is governed by the per-target cap.
    pub fn target_on_cooldown(&self, target_id: &str, at: NaiveDateTime, cooldown_days: u32) -> bool {
        self.target_cooldown_until(target_id, at, cooldown_days).is_some()
    }

    /// When the cooldown covering `at` ends, or `None` if `target_id` is free at `at`
    pub fn target_cooldown_until(
        &self,
        target_id: &str,
        at: NaiveDateTime,
        cooldown_days: u32,
    ) -> Option<NaiveDateTime> {
        if cooldown_days == 0 {
            return None;
        }
        let window = Duration::days(cooldown_days as i64);

        let from_history = self
            .target_last_success
            .get(target_id)
            .filter(|last| **last <= at && at - **last < window);
        let from_run = self
            .target_last_planned
            .get(target_id)
            .filter(|last| last.date() < at.date() && at - **last < window);

        from_history.into_iter().chain(from_run).map(|last| *last + window).max()
    }

    /// Whether `actor_id` used this text+media pair within the cooldown
    pub fn content_on_cooldown(
        &self,
        actor_id: &str,
        text_id: &str,
        media_id: Option<&str>,
        at: NaiveDateTime,
        cooldown_days: u32,
    ) -> bool {
        if cooldown_days == 0 {
            return false;
        }
        let window = Duration::days(cooldown_days as i64);
        let key = content_key(actor_id, text_id, media_id);

        let recent = |last: &NaiveDateTime| *last <= at && at - *last < window;
        let from_history = self.content_last_success.get(&key).is_some_and(recent);
        let from_run = self
            .content_last_planned
            .get(&key)
            .is_some_and(|last| last.date() < at.date() && recent(last));

        from_history || from_run
    }

    /// Whether another target linked to the same actor is already used on `day`
    pub fn linked_actor_busy(&self, target_id: &str, day: NaiveDate) -> bool {
        let Some(linked) = self.links.get(target_id) else {
            return false;
        };

        self.linked_usage
            .get(&(linked.clone(), day))
            .is_some_and(|used| used.iter().any(|t| t != target_id))
    }

    fn bump_counts(&mut self, actor_id: &str, target_id: &str, day: NaiveDate) {
        *self
            .actor_day_counts
            .entry(actor_id.to_string())
            .or_default()
            .entry(day)
            .or_insert(0) += 1;
        *self
            .target_day_counts
            .entry(target_id.to_string())
            .or_default()
            .entry(day)
            .or_insert(0) += 1;
    }

    fn mark_linked(&mut self, target_id: &str, day: NaiveDate) {
        if let Some(linked) = self.links.get(target_id) {
            self.linked_usage
                .entry((linked.clone(), day))
                .or_default()
                .insert(target_id.to_string());
        }
    }
}

fn content_key(actor_id: &str, text_id: &str, media_id: Option<&str>) -> ContentKey {
    (
        actor_id.to_string(),
        text_id.to_string(),
        media_id.map(String::from),
    )
}

fn day_count(map: &HashMap<String, HashMap<NaiveDate, u32>>, id: &str, day: NaiveDate) -> u32 {
    map.get(id)
        .and_then(|days| days.get(&day))
        .copied()
        .unwrap_or(0)
}

fn latest<K: std::hash::Hash + Eq>(map: &mut HashMap<K, NaiveDateTime>, key: K, at: NaiveDateTime) {
    map.entry(key)
        .and_modify(|last| {
            if at > *last {
                *last = at;
            }
        })
        .or_insert(at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentOutcome;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn entry(actor: &str, target: &str, at: &str, outcome: AssignmentOutcome) -> HistoryEntry {
        HistoryEntry {
            actor_id: actor.into(),
            target_id: target.into(),
            text_id: "x1".into(),
            media_id: None,
            occurred_at: ts(at),
            outcome,
        }
    }

    #[test]
    fn test_counts_only_successful_entries() {
        let history = vec![
            entry("a1", "g1", "2024-03-04 09:00", AssignmentOutcome::Posted),
            entry("a1", "g2", "2024-03-04 10:00", AssignmentOutcome::Failed),
            entry("a1", "g3", "2024-03-03 10:00", AssignmentOutcome::Posted),
        ];
        let index = HistoryIndex::build(&history, &[]);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        assert_eq!(index.actor_count("a1", day), 1);
        assert_eq!(index.target_count("g1", day), 1);
        assert_eq!(index.target_count("g2", day), 0);
        assert!(index.target_last_success("g2").is_none());
    }

    #[test]
    fn test_target_cooldown_is_measured_in_hours() {
        let history = vec![entry("a1", "g1", "2024-03-03 15:00", AssignmentOutcome::Posted)];
        let index = HistoryIndex::build(&history, &[]);

        // 18h later with a 1-day cooldown
        assert!(index.target_on_cooldown("g1", ts("2024-03-04 09:00"), 1));
        assert!(!index.target_on_cooldown("g1", ts("2024-03-04 15:00"), 1));
        assert!(!index.target_on_cooldown("g1", ts("2024-03-04 09:00"), 0));
    }

    #[test]
    fn test_target_cooldown_until() {
        let history = vec![entry("a1", "g1", "2024-03-03 15:00", AssignmentOutcome::Posted)];
        let index = HistoryIndex::build(&history, &[]);

        assert_eq!(
            index.target_cooldown_until("g1", ts("2024-03-04 09:00"), 1),
            Some(ts("2024-03-04 15:00"))
        );
        assert_eq!(index.target_cooldown_until("g1", ts("2024-03-04 15:00"), 1), None);
        assert_eq!(index.target_cooldown_until("g2", ts("2024-03-04 09:00"), 1), None);
    }

    #[test]
    fn test_planned_same_day_does_not_trigger_cooldown() {
        let mut index = HistoryIndex::default();
        index.record_planned(&Assignment {
            actor_id: "a1".into(),
            target_id: "g1".into(),
            text_id: "x1".into(),
            media_id: None,
            scheduled_time: ts("2024-03-04 09:00"),
            sequence_number: 1,
        });

        assert!(!index.target_on_cooldown("g1", ts("2024-03-04 11:00"), 2));
        assert!(index.target_on_cooldown("g1", ts("2024-03-05 08:00"), 2));
        assert_eq!(
            index.target_count("g1", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
            1
        );
    }

    #[test]
    fn test_content_cooldown_per_actor() {
        let history = vec![entry("a1", "g1", "2024-03-01 09:00", AssignmentOutcome::Posted)];
        let index = HistoryIndex::build(&history, &[]);
        let at = ts("2024-03-04 09:00");

        assert!(index.content_on_cooldown("a1", "x1", None, at, 7));
        assert!(!index.content_on_cooldown("a2", "x1", None, at, 7));
        assert!(!index.content_on_cooldown("a1", "x1", Some("m1"), at, 7));
        assert!(!index.content_on_cooldown("a1", "x1", None, at, 2));
    }

    #[test]
    fn test_linked_actor_busy() {
        let targets = vec![
            Target::new("g1", "One", 100).with_linked_actor("a9"),
            Target::new("g2", "Two", 100).with_linked_actor("a9"),
            Target::new("g3", "Three", 100),
        ];
        let history = vec![entry("a1", "g1", "2024-03-04 09:00", AssignmentOutcome::Posted)];
        let index = HistoryIndex::build(&history, &targets);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        assert!(index.linked_actor_busy("g2", day));
        assert!(!index.linked_actor_busy("g1", day));
        assert!(!index.linked_actor_busy("g3", day));
        assert!(!index.linked_actor_busy("g2", day.succ_opt().unwrap()));
    }
}
