//! Per-entity debounce state machines.
//!
//! Every entity (a tracked box, the single untracked subject, or an audio
//! channel) owns one [`DebounceState`]:
//!
//! ```text
//! IDLE --candidate--> ARMED(1) --candidate--> ARMED(n) --n >= required--> CONFIRMED --emit--> IDLE
//!                       |                                                      |
//!                       +--non-candidate--> IDLE              (cooldown > 0) --> COOLDOWN(k) --> IDLE
//! ```
//!
//! CONFIRMED is only ever observed as the returned [`Transition`]; the stored
//! phase has already moved on to IDLE or COOLDOWN when `observe` returns.

use crate::processing::classifier::Verdict;
use crate::sensor::detection::BoundingBox;
use chrono::{DateTime, Local};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    /// Reported through [`Transition::Confirmed`]; never left in a stored state.
    Confirmed,
    Cooldown,
}

/// Key of an independently debounced subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// Used when the detector supplies no track ids.
    Synthetic,
    Track(u64),
    Channel(u16),
}

impl EntityId {
    pub fn for_track(track_id: Option<u64>) -> Self {
        track_id.map(EntityId::Track).unwrap_or(EntityId::Synthetic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebounceState {
    pub phase: Phase,
    pub consecutive: u32,
    pub last_value: Option<f32>,
    pub cooldown_remaining: u32,
    pub last_seen: DateTime<Local>,
}

impl DebounceState {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            phase: Phase::Idle,
            consecutive: 0,
            last_value: None,
            cooldown_remaining: 0,
            last_seen: now,
        }
    }
}

/// Outcome of feeding one verdict to a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Non-candidate while already idle.
    Unchanged,
    Armed(u32),
    /// A run was broken before reaching the required length.
    Reset,
    Confirmed,
    CoolingDown(u32),
}

/// Consecutive-count strategy.
#[derive(Debug, Clone, Copy)]
pub struct RunLengthDebouncer {
    required: u32,
    cooldown: u32,
}

impl RunLengthDebouncer {
    pub fn new(required: u32, cooldown: u32) -> Self {
        Self {
            required: required.max(1),
            cooldown,
        }
    }

    pub fn observe(&self, state: &mut DebounceState, verdict: Verdict) -> Transition {
        if state.phase == Phase::Cooldown {
            state.cooldown_remaining = state.cooldown_remaining.saturating_sub(1);
            if state.cooldown_remaining == 0 {
                state.phase = Phase::Idle;
            }
            return Transition::CoolingDown(state.cooldown_remaining);
        }

        if !verdict.is_candidate {
            let was_armed = state.phase == Phase::Armed;
            state.consecutive = 0;
            state.phase = Phase::Idle;
            return if was_armed {
                Transition::Reset
            } else {
                Transition::Unchanged
            };
        }

        state.consecutive += 1;
        if state.consecutive < self.required {
            state.phase = Phase::Armed;
            return Transition::Armed(state.consecutive);
        }

        state.consecutive = 0;
        if self.cooldown > 0 {
            state.phase = Phase::Cooldown;
            state.cooldown_remaining = self.cooldown;
        } else {
            state.phase = Phase::Idle;
        }
        Transition::Confirmed
    }
}

/// Delta-magnitude test on a box's lower edge: a candidate when the bottom
/// moved down by more than `threshold * current_bottom` since the previous
/// observation of the same entity.
#[derive(Debug, Clone, Copy)]
pub struct BottomDropTest {
    threshold: f32,
}

impl BottomDropTest {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn verdict(&self, state: &mut DebounceState, bbox: &BoundingBox) -> Verdict {
        let bottom = bbox.bottom() as f32;
        match state.last_value.replace(bottom) {
            Some(previous) => {
                let delta = bottom - previous;
                if delta > self.threshold * bottom {
                    Verdict::candidate(delta)
                } else {
                    Verdict::rejected(delta)
                }
            }
            None => Verdict::rejected(0.0),
        }
    }
}

/// Owns the debounce state of every live entity of one stream.
pub struct EntityTracker {
    debouncer: RunLengthDebouncer,
    idle_timeout_secs: f64,
    states: HashMap<EntityId, DebounceState>,
}

impl EntityTracker {
    pub fn new(debouncer: RunLengthDebouncer, idle_timeout_secs: f64) -> Self {
        Self {
            debouncer,
            idle_timeout_secs,
            states: HashMap::new(),
        }
    }

    fn entry(&mut self, entity: EntityId, now: DateTime<Local>) -> &mut DebounceState {
        let state = self
            .states
            .entry(entity)
            .or_insert_with(|| DebounceState::new(now));
        state.last_seen = now;
        state
    }

    pub fn observe(&mut self, entity: EntityId, verdict: Verdict, now: DateTime<Local>) -> Transition {
        let debouncer = self.debouncer;
        debouncer.observe(self.entry(entity, now), verdict)
    }

    /// Runs the bottom-drop test for `entity` and feeds its verdict to the
    /// run-length debouncer.
    pub fn observe_bottom(
        &mut self,
        entity: EntityId,
        bbox: &BoundingBox,
        test: &BottomDropTest,
        now: DateTime<Local>,
    ) -> (Verdict, Transition) {
        let debouncer = self.debouncer;
        let state = self.entry(entity, now);
        let verdict = test.verdict(state, bbox);
        (verdict, debouncer.observe(state, verdict))
    }

    /// Drops entities not observed within the idle window; returns how many.
    pub fn expire(&mut self, now: DateTime<Local>) -> usize {
        let before = self.states.len();
        let timeout_ms = (self.idle_timeout_secs * 1000.0) as i64;
        self.states.retain(|_, state| {
            now.signed_duration_since(state.last_seen).num_milliseconds() <= timeout_ms
        });
        before - self.states.len()
    }

    pub fn state(&self, entity: &EntityId) -> Option<&DebounceState> {
        self.states.get(entity)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn feed(debouncer: &RunLengthDebouncer, pattern: &[bool]) -> (DebounceState, usize) {
        let mut state = DebounceState::new(Local::now());
        let confirmations = pattern
            .iter()
            .map(|&hit| {
                let verdict = if hit {
                    Verdict::candidate(1.0)
                } else {
                    Verdict::rejected(0.0)
                };
                debouncer.observe(&mut state, verdict)
            })
            .filter(|t| *t == Transition::Confirmed)
            .count();
        (state, confirmations)
    }

    #[test]
    fn short_runs_never_confirm() {
        let debouncer = RunLengthDebouncer::new(5, 0);
        let pattern = [
            true, true, true, true, false, true, true, false, true, true, true, true,
        ];
        let (_, confirmations) = feed(&debouncer, &pattern);
        assert_eq!(confirmations, 0);
    }

    #[test]
    fn exact_run_confirms_once() {
        let debouncer = RunLengthDebouncer::new(5, 0);
        let (state, confirmations) = feed(&debouncer, &[true, true, true, true, true, false]);
        assert_eq!(confirmations, 1);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.consecutive, 0);
    }

    #[test]
    fn sustained_run_must_reaccumulate() {
        let debouncer = RunLengthDebouncer::new(3, 0);
        let (_, confirmations) = feed(&debouncer, &[true; 7]);
        assert_eq!(confirmations, 2);
    }

    #[test]
    fn flicker_resets_armed_count() {
        let debouncer = RunLengthDebouncer::new(5, 0);
        let mut state = DebounceState::new(Local::now());
        for expected in 1..=4 {
            assert_eq!(
                debouncer.observe(&mut state, Verdict::candidate(0.9)),
                Transition::Armed(expected)
            );
        }
        assert_eq!(
            debouncer.observe(&mut state, Verdict::rejected(0.1)),
            Transition::Reset
        );
        assert_eq!(state.consecutive, 0);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(
            debouncer.observe(&mut state, Verdict::rejected(0.1)),
            Transition::Unchanged
        );
    }

    #[test]
    fn single_sample_mode_confirms_immediately() {
        let debouncer = RunLengthDebouncer::new(1, 0);
        let mut state = DebounceState::new(Local::now());
        assert_eq!(
            debouncer.observe(&mut state, Verdict::candidate(0.95)),
            Transition::Confirmed
        );
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn cooldown_suppresses_bursts() {
        let debouncer = RunLengthDebouncer::new(1, 2);
        let (state, confirmations) = feed(&debouncer, &[true, true, true, true]);
        // Confirm, two ignored observations, confirm again.
        assert_eq!(confirmations, 2);
        assert_eq!(state.phase, Phase::Cooldown);
    }

    #[test]
    fn bottom_drop_compares_against_current_bottom() {
        let test = BottomDropTest::new(0.5);
        let mut state = DebounceState::new(Local::now());

        let first = test.verdict(&mut state, &BoundingBox::new(0, 0, 10, 100));
        assert!(!first.is_candidate);

        // 250 - 100 = 150 > 0.5 * 250
        let drop = test.verdict(&mut state, &BoundingBox::new(0, 0, 10, 250));
        assert!(drop.is_candidate);
        assert_eq!(drop.strength, 150.0);

        // 300 - 250 = 50 <= 150
        let slow = test.verdict(&mut state, &BoundingBox::new(0, 0, 10, 300));
        assert!(!slow.is_candidate);
        assert_eq!(state.last_value, Some(300.0));
    }

    #[test]
    fn bottom_drop_run_resets_on_single_miss() {
        let mut tracker = EntityTracker::new(RunLengthDebouncer::new(5, 0), 3.0);
        let test = BottomDropTest::new(0.5);
        let now = Local::now();
        let entity = EntityId::Synthetic;

        let mut bottom = 1;
        tracker.observe_bottom(entity, &BoundingBox::new(0, 0, 1, bottom), &test, now);
        for _ in 0..3 {
            bottom *= 3;
            let (verdict, _) =
                tracker.observe_bottom(entity, &BoundingBox::new(0, 0, 1, bottom), &test, now);
            assert!(verdict.is_candidate);
        }
        assert_eq!(tracker.state(&entity).map(|s| s.consecutive), Some(3));

        let (verdict, transition) =
            tracker.observe_bottom(entity, &BoundingBox::new(0, 0, 1, bottom), &test, now);
        assert!(!verdict.is_candidate);
        assert_eq!(transition, Transition::Reset);
        assert_eq!(tracker.state(&entity).map(|s| s.consecutive), Some(0));
    }

    #[test]
    fn entities_are_isolated() {
        let mut tracker = EntityTracker::new(RunLengthDebouncer::new(2, 0), 3.0);
        let now = Local::now();
        let a = EntityId::Track(1);
        let b = EntityId::Track(2);

        tracker.observe(a, Verdict::candidate(0.9), now);
        tracker.observe(b, Verdict::rejected(0.1), now);
        assert_eq!(
            tracker.observe(a, Verdict::candidate(0.9), now),
            Transition::Confirmed
        );
        assert_eq!(tracker.state(&b).map(|s| s.consecutive), Some(0));
    }

    #[test]
    fn stale_entities_expire() {
        let mut tracker = EntityTracker::new(RunLengthDebouncer::new(5, 0), 2.0);
        let start = Local::now();
        tracker.observe(EntityId::Track(1), Verdict::candidate(0.9), start);
        tracker.observe(EntityId::Track(2), Verdict::candidate(0.9), start + Duration::seconds(2));

        assert_eq!(tracker.expire(start + Duration::seconds(3)), 1);
        assert!(tracker.state(&EntityId::Track(1)).is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn missing_track_id_maps_to_synthetic_entity() {
        assert_eq!(EntityId::for_track(None), EntityId::Synthetic);
        assert_eq!(EntityId::for_track(Some(4)), EntityId::Track(4));
    }
}
