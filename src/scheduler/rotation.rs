//! Rotation algorithm for posting assignments
//!
//! This module implements the greedy round-robin assignment run:
//! - Actors and content rotate through cursors, so every account and every
//!   text/media pair is used before any of them repeats
//! - Targets are walked in descending audience order from a rotating offset
//! - Daily caps, cooldowns and the no-repeat rule are checked against a
//!   [`HistoryIndex`] built once per run
//!
//! A run is a pure function of its inputs: same pools, history, config and
//! day always give the same assignments.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::error::{PoolKind, SchedulerError, SchedulerResult};
use super::history::HistoryIndex;
use super::plan::{AssignmentPlan, Termination};
use super::safety::SafetyConfig;
use super::slots::{RunWindow, SlotClock};
use crate::models::{
    Actor, Assignment, ContentMedia, ContentText, HistoryEntry, Pools, Target, TupleKey,
};

// ============================================================================
// Cursor Seed
// ============================================================================

/// Where actor and content cursors start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorSeed {
    /// Always start at the first actor and first content item
    #[default]
    Fixed,
    /// Start offsets derived from the day, reproducible per date
    Daily,
}

// ============================================================================
// Rotation Scheduler
// ============================================================================

/// Greedy round-robin assignment scheduler
///
/// Holds only run options; every call to [`generate_plan`](Self::generate_plan)
/// is independent.
#[derive(Debug, Clone, Default)]
pub struct RotationScheduler {
    window: RunWindow,
    start_time: Option<NaiveTime>,
    enforce_linkage: bool,
    cursor_seed: CursorSeed,
}

impl RotationScheduler {
    /// Create a single-day scheduler with fixed cursors
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the day boundary policy
    pub fn with_window(mut self, window: RunWindow) -> Self {
        self.window = window;
        self
    }

    /// Start the first day no earlier than `time`
    pub fn with_start_time(mut self, time: Option<NaiveTime>) -> Self {
        self.start_time = time;
        self
    }

    /// Skip groups whose linked account already has another group that day
    pub fn with_linkage_constraint(mut self, enabled: bool) -> Self {
        self.enforce_linkage = enabled;
        self
    }

    /// Choose where actor and content cursors start
    pub fn with_cursor_seed(mut self, seed: CursorSeed) -> Self {
        self.cursor_seed = seed;
        self
    }

    /// Day boundary policy in effect
    pub fn window(&self) -> RunWindow {
        self.window
    }

    /// Produce up to `desired_count` assignments for `day`
    ///
    /// Returns fewer assignments when the constraint space is exhausted;
    /// fails only when actors, targets or texts have no eligible member.
    pub fn generate_assignments(
        &self,
        pools: &Pools,
        history: &[HistoryEntry],
        config: &SafetyConfig,
        day: NaiveDate,
        desired_count: usize,
    ) -> SchedulerResult<Vec<Assignment>> {
        self.generate_plan(pools, history, config, day, desired_count)
            .map(|plan| plan.assignments)
    }

    /// Same as [`generate_assignments`](Self::generate_assignments), keeping
    /// the termination reason
    pub fn generate_plan(
        &self,
        pools: &Pools,
        history: &[HistoryEntry],
        config: &SafetyConfig,
        day: NaiveDate,
        desired_count: usize,
    ) -> SchedulerResult<AssignmentPlan> {
        self.continue_plan(pools, history, config, day, desired_count, &[])
    }

    /// Extend assignments already placed on `day` by up to `desired_count` more
    ///
    /// `placed` counts toward caps and the no-repeat rule as if this run had
    /// produced it. New slots start after the latest placed slot and sequence
    /// numbers continue from the highest placed one. Only the new assignments
    /// are returned.
    pub fn continue_plan(
        &self,
        pools: &Pools,
        history: &[HistoryEntry],
        config: &SafetyConfig,
        day: NaiveDate,
        desired_count: usize,
        placed: &[Assignment],
    ) -> SchedulerResult<AssignmentPlan> {
        let started = Instant::now();
        let eligible = pools.eligible();

        if eligible.actors.is_empty() {
            return Err(SchedulerError::insufficient_pool(PoolKind::Actors));
        }
        if eligible.targets.is_empty() {
            return Err(SchedulerError::insufficient_pool(PoolKind::Targets));
        }
        if eligible.texts.is_empty() {
            return Err(SchedulerError::insufficient_pool(PoolKind::Texts));
        }

        let mut run = Run::new(&eligible, history, config, self.enforce_linkage);
        if self.cursor_seed == CursorSeed::Daily {
            run.seed_cursors(day);
        }

        let mut clock = SlotClock::new(config, day, self.window).starting_at(self.start_time);
        for assignment in placed {
            run.absorb(assignment);
        }
        if let Some(last) = placed.iter().map(|a| a.scheduled_time).max() {
            clock.commit(last);
        }
        let first_sequence = placed.iter().map(|a| a.sequence_number).max().unwrap_or(0) + 1;
        let mut assignments = Vec::new();

        let termination = loop {
            if assignments.len() >= desired_count {
                break Termination::Completed;
            }

            let Some(slot) = clock.peek() else {
                break Termination::SlotsExhausted;
            };

            match run.choose(slot) {
                Some(choice) => {
                    let sequence_number = first_sequence + assignments.len() as u32;
                    let assignment = run.apply(choice, slot, sequence_number);
                    clock.commit(slot);

                    tracing::debug!(
                        seq = sequence_number,
                        actor = %assignment.actor_id,
                        target = %assignment.target_id,
                        text = %assignment.text_id,
                        media = ?assignment.media_id,
                        at = %assignment.scheduled_time,
                        "Assignment placed"
                    );
                    assignments.push(assignment);
                }
                None => {
                    if let Some(release) = run.next_release(slot) {
                        tracing::debug!(at = %release, "Waiting for a target cooldown to end");
                        clock.defer_until(release);
                        continue;
                    }
                    tracing::debug!(day = %clock.current_day(), "No feasible combination left for day");
                    if !clock.advance_day() {
                        break Termination::CapacityExhausted;
                    }
                }
            }
        };

        let plan = AssignmentPlan::new(day, desired_count, assignments, termination);

        tracing::info!(
            day = %day,
            requested = desired_count,
            produced = plan.len(),
            termination = termination.as_str(),
            actors = eligible.actors.len(),
            targets = eligible.targets.len(),
            "Rotation run finished"
        );
        crate::metrics::record_scheduler_run(
            termination.as_str(),
            plan.len(),
            plan.shortfall(),
            started.elapsed().as_secs_f64(),
        );

        Ok(plan)
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Indices of one chosen combination
#[derive(Debug, Clone, Copy)]
struct Choice {
    actor: usize,
    target: usize,
    text: usize,
    media: Option<usize>,
}

/// Mutable state of a single run
struct Run<'a> {
    config: &'a SafetyConfig,
    actors: &'a [Actor],
    /// Descending audience, stable for ties
    targets: Vec<&'a Target>,
    texts: &'a [ContentText],
    media: &'a [ContentMedia],
    index: HistoryIndex,
    used: HashSet<TupleKey>,
    /// Content tuples used per (actor, target)
    pair_usage: HashMap<(usize, usize), usize>,
    enforce_linkage: bool,

    actor_cursor: usize,
    target_offset: usize,
    text_cursor: usize,
    media_cursor: usize,
}

impl<'a> Run<'a> {
    fn new(
        pools: &'a Pools,
        history: &[HistoryEntry],
        config: &'a SafetyConfig,
        enforce_linkage: bool,
    ) -> Self {
        let mut targets: Vec<&Target> = pools.targets.iter().collect();
        targets.sort_by(|a, b| b.audience_size.cmp(&a.audience_size));

        Self {
            config,
            actors: &pools.actors,
            targets,
            texts: &pools.texts,
            media: &pools.media,
            index: HistoryIndex::build(history, &pools.targets),
            used: HashSet::new(),
            pair_usage: HashMap::new(),
            enforce_linkage,
            actor_cursor: 0,
            target_offset: 0,
            text_cursor: 0,
            media_cursor: 0,
        }
    }

    /// Derive starting cursors from the day; the target offset stays at 0
    fn seed_cursors(&mut self, day: NaiveDate) {
        let mut rng = ChaCha8Rng::seed_from_u64(day.num_days_from_ce() as u64);
        self.actor_cursor = rng.gen_range(0..self.actors.len());
        self.text_cursor = rng.gen_range(0..self.texts.len());
        if !self.media.is_empty() {
            self.media_cursor = rng.gen_range(0..self.media.len());
        }
    }

    /// Fold an assignment placed before this run into the run state
    ///
    /// Cursors move past it when its members are still in the pools.
    fn absorb(&mut self, assignment: &Assignment) {
        self.index.record_planned(assignment);
        self.used.insert(assignment.tuple_key());

        let actor = self.actors.iter().position(|a| a.id == assignment.actor_id);
        let target = self.targets.iter().position(|t| t.id == assignment.target_id);
        if let (Some(actor), Some(target)) = (actor, target) {
            *self.pair_usage.entry((actor, target)).or_insert(0) += 1;
        }

        if let Some(actor) = actor {
            self.actor_cursor = (actor + 1) % self.actors.len();
        }
        if let Some(target) = target {
            self.target_offset = (target + 1) % self.targets.len();
        }
        if let Some(text) = self.texts.iter().position(|t| t.id == assignment.text_id) {
            self.text_cursor = (text + 1) % self.texts.len();
        }
        let media = assignment
            .media_id
            .as_ref()
            .and_then(|id| self.media.iter().position(|m| &m.id == id));
        if let Some(media) = media {
            self.media_cursor = (media + 1) % self.media.len();
        }
    }

    /// Earliest time later on `slot`'s working day when a target cooling
    /// down at `slot` becomes free again
    ///
    /// Minute precision, rounded up. Targets at their daily cap are ignored,
    /// and nothing is released once every actor is at its cap.
    fn next_release(&self, slot: NaiveDateTime) -> Option<NaiveDateTime> {
        let day = slot.date();
        let actor_free = self
            .actors
            .iter()
            .any(|a| self.index.actor_count(&a.id, day) < self.config.max_per_actor_per_day);
        if !actor_free {
            return None;
        }

        let closing = day.and_time(self.config.working_hours.end);

        self.targets
            .iter()
            .filter(|t| self.index.target_count(&t.id, day) < self.config.max_per_target_per_day)
            .filter_map(|t| {
                self.index
                    .target_cooldown_until(&t.id, slot, self.config.target_cooldown_days)
            })
            .map(ceil_to_minute)
            .filter(|release| *release > slot && *release < closing)
            .min()
    }

    /// Distinct text/media pairs available to one (actor, target)
    fn content_combinations(&self) -> usize {
        self.texts.len() * self.media.len().max(1)
    }

    /// Find a feasible combination for `slot`, trying actors in cursor order
    fn choose(&self, slot: NaiveDateTime) -> Option<Choice> {
        let day = slot.date();

        for step in 0..self.actors.len() {
            let actor_idx = (self.actor_cursor + step) % self.actors.len();
            let actor = &self.actors[actor_idx];

            if self.index.actor_count(&actor.id, day) >= self.config.max_per_actor_per_day {
                continue;
            }

            let Some(target_idx) = self.pick_target(actor_idx, slot) else {
                tracing::trace!(actor = %actor.id, "No eligible target for actor");
                continue;
            };

            if let Some((text, media)) = self.pick_content(actor_idx, target_idx, slot) {
                return Some(Choice {
                    actor: actor_idx,
                    target: target_idx,
                    text,
                    media,
                });
            }
        }

        None
    }

    fn pick_target(&self, actor_idx: usize, slot: NaiveDateTime) -> Option<usize> {
        let day = slot.date();
        let combinations = self.content_combinations();

        for step in 0..self.targets.len() {
            let target_idx = (self.target_offset + step) % self.targets.len();
            let target = self.targets[target_idx];

            if self.index.target_count(&target.id, day) >= self.config.max_per_target_per_day {
                continue;
            }
            if self
                .index
                .target_on_cooldown(&target.id, slot, self.config.target_cooldown_days)
            {
                continue;
            }
            if self.enforce_linkage && self.index.linked_actor_busy(&target.id, day) {
                continue;
            }
            let used_pairs = self
                .pair_usage
                .get(&(actor_idx, target_idx))
                .copied()
                .unwrap_or(0);
            if used_pairs >= combinations {
                continue;
            }

            return Some(target_idx);
        }

        None
    }

    /// Next unused text/media pair for (actor, target)
    ///
    /// Pairs are walked diagonally from the cursors so that every
    /// combination is reachable. A pair inside the content cooldown is only
    /// taken when nothing else is left.
    fn pick_content(
        &self,
        actor_idx: usize,
        target_idx: usize,
        slot: NaiveDateTime,
    ) -> Option<(usize, Option<usize>)> {
        let actor = &self.actors[actor_idx];
        let target = self.targets[target_idx];
        let text_count = self.texts.len();
        let media_count = self.media.len();

        let mut fallback = None;

        for shift in 0..media_count.max(1) {
            for step in 0..text_count {
                let text_idx = (self.text_cursor + step) % text_count;
                let media_idx =
                    (media_count > 0).then(|| (self.media_cursor + step + shift) % media_count);

                let text_id = &self.texts[text_idx].id;
                let media_id = media_idx.map(|m| self.media[m].id.as_str());

                let key = TupleKey {
                    actor_id: actor.id.clone(),
                    target_id: target.id.clone(),
                    text_id: text_id.clone(),
                    media_id: media_id.map(String::from),
                };
                if self.used.contains(&key) {
                    continue;
                }

                if self.index.content_on_cooldown(
                    &actor.id,
                    text_id,
                    media_id,
                    slot,
                    self.config.content_reuse_cooldown_days,
                ) {
                    if fallback.is_none() {
                        fallback = Some((text_idx, media_idx));
                    }
                    continue;
                }

                return Some((text_idx, media_idx));
            }
        }

        if fallback.is_some() {
            tracing::debug!(
                actor = %actor.id,
                target = %target.id,
                "Content cooldown relaxed, every pair was used recently"
            );
        }
        fallback
    }

    /// Record the choice and advance all cursors past it
    fn apply(&mut self, choice: Choice, slot: NaiveDateTime, sequence_number: u32) -> Assignment {
        let assignment = Assignment {
            actor_id: self.actors[choice.actor].id.clone(),
            target_id: self.targets[choice.target].id.clone(),
            text_id: self.texts[choice.text].id.clone(),
            media_id: choice.media.map(|m| self.media[m].id.clone()),
            scheduled_time: slot,
            sequence_number,
        };

        self.index.record_planned(&assignment);
        self.used.insert(assignment.tuple_key());
        *self
            .pair_usage
            .entry((choice.actor, choice.target))
            .or_insert(0) += 1;

        self.actor_cursor = (choice.actor + 1) % self.actors.len();
        self.target_offset = (choice.target + 1) % self.targets.len();
        self.text_cursor = (choice.text + 1) % self.texts.len();
        if let Some(m) = choice.media {
            self.media_cursor = (m + 1) % self.media.len();
        }

        assignment
    }
}

fn ceil_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    let truncated = at
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at);
    if truncated < at {
        truncated + Duration::minutes(1)
    } else {
        truncated
    }
}

// ============================================================================
// Tests
// ============================================================================
