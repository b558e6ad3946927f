//! # Gesture Detector
//!
//! Tracks live pointer sequences and turns them into [`GestureEvent`]s.
//!
//! Each sequence is a candidate moving through
//!
//! ```text
//! idle -> tracking -> matched | abandoned
//! ```
//!
//! A candidate is resolved when one of its pointers is released or
//! cancelled, when its long-press timer fires and the long-press detector
//! accepts it, or when it sees no new samples for `idle_timeout_ms`. Either
//! way the candidate is dropped once its outcome is decided; later samples
//! for its pointers are ignored until they go down again.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::event::{GestureEvent, GestureType, PointerSample};
use crate::pattern::{CandidateView, DetectorRegistry, PatternDetector};
use crate::timer::{TimerId, TimerQueue};

/// Identifier of a gesture candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(u64);

/// Lifecycle state of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateState {
    /// Receiving samples.
    Tracking,
    /// A detector accepted the samples.
    Matched,
    /// Resolved without a match.
    Abandoned,
}

/// Read-only summary of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSnapshot {
    /// Candidate identifier.
    pub id: CandidateId,
    /// Pointers in the candidate.
    pub pointer_ids: Vec<u32>,
    /// Number of retained samples.
    pub sample_count: usize,
    /// First sample timestamp.
    pub start_ms: u64,
    /// Latest sample timestamp.
    pub last_ms: u64,
    /// Current state.
    pub state: CandidateState,
}

#[derive(Debug)]
struct Candidate {
    id: CandidateId,
    pointer_ids: Vec<u32>,
    samples: Vec<PointerSample>,
    start_ms: u64,
    last_ms: u64,
    state: CandidateState,
    long_press_timer: Option<TimerId>,
    idle_timer: Option<TimerId>,
}

impl Candidate {
    fn view(&self, end_ms: u64, released: bool) -> CandidateView<'_> {
        CandidateView {
            samples: &self.samples,
            pointer_ids: &self.pointer_ids,
            start_ms: self.start_ms,
            end_ms,
            released,
        }
    }

    fn snapshot(&self) -> CandidateSnapshot {
        CandidateSnapshot {
            id: self.id,
            pointer_ids: self.pointer_ids.clone(),
            sample_count: self.samples.len(),
            start_ms: self.start_ms,
            last_ms: self.last_ms,
            state: self.state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureTimer {
    LongPress(CandidateId),
    Idle(CandidateId),
}

/// Owns the active candidates and feeds them to the detector registry.
#[derive(Debug)]
pub struct GestureDetector {
    config: GestureConfig,
    registry: DetectorRegistry,
    candidates: BTreeMap<CandidateId, Candidate>,
    by_pointer: HashMap<u32, CandidateId>,
    timers: TimerQueue<GestureTimer>,
    next_id: u64,
}

impl GestureDetector {
    /// Create a detector with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    /// Create a detector with custom thresholds and priority.
    #[must_use]
    pub fn with_config(config: GestureConfig) -> Self {
        let registry = DetectorRegistry::with_priority(&config.priority);
        Self {
            config,
            registry,
            candidates: BTreeMap::new(),
            by_pointer: HashMap::new(),
            timers: TimerQueue::new(),
            next_id: 0,
        }
    }

    /// Current thresholds.
    #[must_use]
    pub const fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// The detector registry.
    #[must_use]
    pub const fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// Install or replace a pattern detector.
    pub fn register_detector(&mut self, detector: Box<dyn PatternDetector>) {
        self.registry.register(detector);
    }

    /// Number of candidates being tracked.
    #[must_use]
    pub fn active_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Summary of the candidate a pointer belongs to.
    #[must_use]
    pub fn candidate_for(&self, pointer_id: u32) -> Option<CandidateSnapshot> {
        let id = self.by_pointer.get(&pointer_id)?;
        self.candidates.get(id).map(Candidate::snapshot)
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Handle a pointer going down.
    pub fn pointer_down(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        if self.by_pointer.contains_key(&sample.pointer_id) {
            // Repeated down without an up: keep extending the same sequence.
            return self.pointer_move(sample);
        }

        if let Some(id) = self.joinable_candidate(&sample) {
            self.join(id, sample);
            return None;
        }

        let id = CandidateId(self.next_id);
        self.next_id += 1;

        let long_press_timer = self.registry.contains(GestureType::LongPress).then(|| {
            self.timers.schedule(
                sample.timestamp_ms.saturating_add(self.config.long_press_ms),
                GestureTimer::LongPress(id),
            )
        });
        let idle_timer = Some(self.timers.schedule(
            sample.timestamp_ms.saturating_add(self.config.idle_timeout_ms),
            GestureTimer::Idle(id),
        ));

        tracing::debug!(candidate = id.0, pointer = sample.pointer_id, "Gesture candidate started");
        self.by_pointer.insert(sample.pointer_id, id);
        self.candidates.insert(
            id,
            Candidate {
                id,
                pointer_ids: vec![sample.pointer_id],
                samples: vec![sample],
                start_ms: sample.timestamp_ms,
                last_ms: sample.timestamp_ms,
                state: CandidateState::Tracking,
                long_press_timer,
                idle_timer,
            },
        );
        None
    }

    /// A tracking candidate that a new pointer should merge into, if any
    /// multi-pointer detector is installed.
    fn joinable_candidate(&self, sample: &PointerSample) -> Option<CandidateId> {
        let max_pointers = self.registry.max_pointers();
        if max_pointers < 2 {
            return None;
        }
        self.candidates
            .values()
            .rev()
            .find(|c| {
                c.state == CandidateState::Tracking
                    && c.pointer_ids.len() < max_pointers
                    && sample.timestamp_ms.saturating_sub(c.start_ms)
                        <= self.config.multi_pointer_join_ms
            })
            .map(|c| c.id)
    }

    fn join(&mut self, id: CandidateId, sample: PointerSample) {
        let idle_deadline = sample.timestamp_ms.saturating_add(self.config.idle_timeout_ms);
        let Some(candidate) = self.candidates.get_mut(&id) else {
            return;
        };
        candidate.pointer_ids.push(sample.pointer_id);
        candidate.samples.push(sample);
        candidate.last_ms = sample.timestamp_ms;
        // Multi-pointer candidates can no longer be long presses.
        if let Some(timer) = candidate.long_press_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(timer) = candidate.idle_timer.take() {
            self.timers.cancel(timer);
        }
        candidate.idle_timer = Some(self.timers.schedule(idle_deadline, GestureTimer::Idle(id)));

        tracing::debug!(
            candidate = id.0,
            pointer = sample.pointer_id,
            pointers = candidate.pointer_ids.len(),
            "Pointer joined gesture candidate"
        );
        self.by_pointer.insert(sample.pointer_id, id);
    }

    /// Handle a pointer move. Moves for untracked pointers are ignored.
    pub fn pointer_move(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        let id = *self.by_pointer.get(&sample.pointer_id)?;
        let idle_deadline = sample.timestamp_ms.saturating_add(self.config.idle_timeout_ms);
        let candidate = self.candidates.get_mut(&id)?;
        candidate.samples.push(sample);
        candidate.last_ms = sample.timestamp_ms;
        if let Some(timer) = candidate.idle_timer.take() {
            self.timers.cancel(timer);
        }
        candidate.idle_timer = Some(self.timers.schedule(idle_deadline, GestureTimer::Idle(id)));
        None
    }

    /// Handle a pointer release: evaluate and drop its candidate.
    pub fn pointer_up(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        self.release(sample)
    }

    /// Handle a pointer cancel: evaluated the same way as a release.
    pub fn pointer_cancel(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        self.release(sample)
    }

    fn release(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        let id = *self.by_pointer.get(&sample.pointer_id)?;
        if let Some(candidate) = self.candidates.get_mut(&id) {
            candidate.samples.push(sample);
            candidate.last_ms = sample.timestamp_ms;
        }
        self.resolve(id, sample.timestamp_ms, true)
    }

    /// Fire due timers: long-press checks and idle eviction.
    pub fn tick(&mut self, now_ms: u64) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        for timer in self.timers.drain_due(now_ms) {
            match timer {
                GestureTimer::LongPress(id) => {
                    if let Some(event) = self.check_long_press(id, now_ms) {
                        events.push(event);
                    }
                }
                GestureTimer::Idle(id) => {
                    if let Some(candidate) = self.candidates.get_mut(&id) {
                        candidate.idle_timer = None;
                        tracing::debug!(
                            candidate = id.0,
                            "Gesture candidate idle, forcing evaluation"
                        );
                    }
                    if let Some(event) = self.resolve(id, now_ms, false) {
                        events.push(event);
                    }
                }
            }
        }
        events
    }

    fn check_long_press(&mut self, id: CandidateId, now_ms: u64) -> Option<GestureEvent> {
        let candidate = self.candidates.get_mut(&id)?;
        candidate.long_press_timer = None;
        let matched = self.registry.detect_kind(
            GestureType::LongPress,
            &candidate.view(now_ms, false),
            &self.config,
        )?;
        candidate.state = CandidateState::Matched;
        self.remove(id);
        Some(GestureEvent::new(matched))
    }

    /// Run the full registry and drop the candidate.
    fn resolve(&mut self, id: CandidateId, end_ms: u64, released: bool) -> Option<GestureEvent> {
        let candidate = self.candidates.get_mut(&id)?;
        let matched = self.registry.detect(&candidate.view(end_ms, released), &self.config);
        candidate.state = if matched.is_some() {
            CandidateState::Matched
        } else {
            CandidateState::Abandoned
        };
        tracing::debug!(
            candidate = id.0,
            state = ?candidate.state,
            samples = candidate.samples.len(),
            "Gesture candidate resolved"
        );
        self.remove(id);
        matched.map(GestureEvent::new)
    }

    fn remove(&mut self, id: CandidateId) {
        let Some(candidate) = self.candidates.remove(&id) else {
            return;
        };
        for pointer in &candidate.pointer_ids {
            self.by_pointer.remove(pointer);
        }
        for timer in [candidate.long_press_timer, candidate.idle_timer].into_iter().flatten() {
            self.timers.cancel(timer);
        }
    }

    /// Drop every candidate and pending timer.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.by_pointer.clear();
        self.timers.clear();
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}
