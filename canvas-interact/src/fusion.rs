//! # Multi-Modal Fusion
//!
//! Fuses voice commands and gestures into compound bindings.
//!
//! When a user says a bound phrase while performing the bound gesture, both
//! halves are combined and delivered to the binding's callback:
//!
//! ```text
//! "delete" at t=0  +  swipe ending at t=300   (window 500 ms)
//!   -> FusedEvent { name: "delete-swipe", voice, gesture }
//! ```
//!
//! The halves may arrive in either order. Each event can complete at most one
//! binding; once a binding fires, both of its halves are cleared.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::event::{FusedEvent, GestureEvent, GestureType, SwipeDirection, VoiceEvent};
use crate::manager::{InteractionManager, SubscriptionId};
use crate::timer::{TimerId, TimerQueue};
use crate::voice::VoicePattern;

/// Options attached to the gesture half of a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingOptions {
    /// Override of the default fusion window.
    pub window_ms: Option<u64>,
    /// Only swipes in this direction qualify.
    pub direction: Option<SwipeDirection>,
}

impl BindingOptions {
    /// Options with a custom fusion window.
    #[must_use]
    pub fn window(window_ms: u64) -> Self {
        Self {
            window_ms: Some(window_ms),
            ..Self::default()
        }
    }

    /// Restrict to swipes in one direction.
    #[must_use]
    pub fn direction(mut self, direction: SwipeDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    fn accepts(&self, event: &GestureEvent) -> bool {
        match self.direction {
            Some(wanted) => event.matched.direction() == Some(wanted),
            None => true,
        }
    }
}

/// Callback invoked when a binding fires.
pub type FusedCallback = Box<dyn FnMut(&FusedEvent)>;

/// A recorded half of a binding awaiting its counterpart.
#[derive(Debug, Clone)]
struct Half<T> {
    event: T,
    /// Sequence number of the originating event.
    seq: u64,
    expiry: TimerId,
}

struct Binding {
    name: String,
    gesture: GestureType,
    options: BindingOptions,
    window_ms: u64,
    callback: FusedCallback,
    voice: Option<Half<VoiceEvent>>,
    gesture_half: Option<Half<GestureEvent>>,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("gesture", &self.gesture)
            .field("options", &self.options)
            .field("window_ms", &self.window_ms)
            .field("voice", &self.voice.as_ref().map(|h| h.event.timestamp_ms))
            .field("gesture_half", &self.gesture_half.as_ref().map(|h| h.event.timestamp_ms()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Voice,
    Gesture,
}

#[derive(Debug, Clone)]
struct Expiry {
    binding: String,
    side: Side,
    seq: u64,
}

fn within(a: u64, b: u64, window_ms: u64) -> bool {
    a.abs_diff(b) <= window_ms
}

/// First tick at which a half recorded at `at` is outside the window.
fn expiry_deadline(at: u64, window_ms: u64) -> u64 {
    at.saturating_add(window_ms).saturating_add(1)
}

/// Correlates voice and gesture events into compound bindings.
#[derive(Debug)]
pub struct MultiModalCombinator {
    /// Bindings in registration order.
    bindings: Vec<Binding>,
    timers: TimerQueue<Expiry>,
    config: FusionConfig,
    next_seq: u64,
}

impl MultiModalCombinator {
    /// Create a combinator with the default fusion window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FusionConfig::default())
    }

    /// Create a combinator with custom configuration.
    #[must_use]
    pub fn with_config(config: FusionConfig) -> Self {
        Self {
            bindings: Vec::new(),
            timers: TimerQueue::new(),
            config,
            next_seq: 0,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Install a binding, replacing any existing binding with the same name.
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        gesture: GestureType,
        options: BindingOptions,
        callback: FusedCallback,
    ) {
        let name = name.into();
        self.unbind(&name);
        let window_ms = options.window_ms.unwrap_or(self.config.window_ms);
        tracing::debug!(binding = %name, %gesture, window_ms, "Multi-modal binding installed");
        self.bindings.push(Binding {
            name,
            gesture,
            options,
            window_ms,
            callback,
            voice: None,
            gesture_half: None,
        });
    }

    /// Remove a binding and its pending halves.
    pub fn unbind(&mut self, name: &str) -> bool {
        let Some(index) = self.bindings.iter().position(|b| b.name == name) else {
            return false;
        };
        let binding = self.bindings.remove(index);
        self.cancel_halves(&binding);
        true
    }

    /// Whether a binding with `name` is installed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b.name == name)
    }

    /// Number of installed bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no bindings are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Which halves of a binding are waiting: `(voice, gesture)`.
    #[must_use]
    pub fn pending_halves(&self, name: &str) -> Option<(bool, bool)> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| (b.voice.is_some(), b.gesture_half.is_some()))
    }

    /// Earliest pending half-match expiry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    fn cancel_halves(&mut self, binding: &Binding) {
        if let Some(half) = &binding.voice {
            self.timers.cancel(half.expiry);
        }
        if let Some(half) = &binding.gesture_half {
            self.timers.cancel(half.expiry);
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Process a voice event. Fires the binding named after the voice
    /// command if a qualifying gesture is waiting within the window.
    pub fn on_voice(&mut self, voice: &VoiceEvent) -> Option<FusedEvent> {
        let index = self.bindings.iter().position(|b| b.name == voice.name)?;
        let seq = self.next_seq();
        let now = voice.timestamp_ms;

        let pending = {
            let binding = &self.bindings[index];
            binding
                .gesture_half
                .as_ref()
                .filter(|half| within(half.event.timestamp_ms(), now, binding.window_ms))
                .map(|half| half.seq)
        };

        if let Some(gesture_seq) = pending {
            let binding = &mut self.bindings[index];
            let gesture = binding.gesture_half.take().map(|h| {
                self.timers.cancel(h.expiry);
                h.event
            })?;
            if let Some(stale) = binding.voice.take() {
                self.timers.cancel(stale.expiry);
            }
            let fused = FusedEvent {
                name: binding.name.clone(),
                voice: voice.clone(),
                gesture,
            };
            (binding.callback)(&fused);
            self.forget_gesture(gesture_seq);
            tracing::debug!(binding = %fused.name, "Multi-modal binding fired (gesture first)");
            return Some(fused);
        }

        let deadline = expiry_deadline(now, self.bindings[index].window_ms);
        let expiry = self.timers.schedule(
            deadline,
            Expiry {
                binding: voice.name.clone(),
                side: Side::Voice,
                seq,
            },
        );
        let binding = &mut self.bindings[index];
        if let Some(old) = binding.voice.replace(Half {
            event: voice.clone(),
            seq,
            expiry,
        }) {
            self.timers.cancel(old.expiry);
        }
        None
    }

    /// Process a gesture event. Fires at most one binding (the earliest
    /// registered) whose voice half is waiting within the window; if none
    /// fires, the gesture is recorded as a half-match for every binding it
    /// qualifies for.
    pub fn on_gesture(&mut self, gesture: &GestureEvent) -> Option<FusedEvent> {
        let now = gesture.timestamp_ms();
        let qualifies = |b: &Binding| b.gesture == gesture.gesture && b.options.accepts(gesture);

        let ready = self.bindings.iter().position(|b| {
            qualifies(b)
                && b.voice
                    .as_ref()
                    .is_some_and(|half| within(half.event.timestamp_ms, now, b.window_ms))
        });

        if let Some(index) = ready {
            let binding = &mut self.bindings[index];
            let voice = binding.voice.take().map(|h| {
                self.timers.cancel(h.expiry);
                h.event
            })?;
            if let Some(stale) = binding.gesture_half.take() {
                self.timers.cancel(stale.expiry);
            }
            let fused = FusedEvent {
                name: binding.name.clone(),
                voice,
                gesture: gesture.clone(),
            };
            (binding.callback)(&fused);
            tracing::debug!(binding = %fused.name, "Multi-modal binding fired (voice first)");
            return Some(fused);
        }

        let seq = self.next_seq();
        for binding in self.bindings.iter_mut().filter(|b| qualifies(&**b)) {
            let expiry = self.timers.schedule(
                expiry_deadline(now, binding.window_ms),
                Expiry {
                    binding: binding.name.clone(),
                    side: Side::Gesture,
                    seq,
                },
            );
            if let Some(old) = binding.gesture_half.replace(Half {
                event: gesture.clone(),
                seq,
                expiry,
            }) {
                self.timers.cancel(old.expiry);
            }
        }
        None
    }

    /// Drop a consumed gesture from every other binding it was recorded in.
    fn forget_gesture(&mut self, seq: u64) {
        for binding in &mut self.bindings {
            if binding.gesture_half.as_ref().is_some_and(|h| h.seq == seq) {
                if let Some(half) = binding.gesture_half.take() {
                    self.timers.cancel(half.expiry);
                }
            }
        }
    }

    /// Expire half-matches whose window has passed.
    pub fn tick(&mut self, now_ms: u64) {
        for expiry in self.timers.drain_due(now_ms) {
            let Some(binding) = self.bindings.iter_mut().find(|b| b.name == expiry.binding) else {
                continue;
            };
            let slot_seq = match expiry.side {
                Side::Voice => binding.voice.as_ref().map(|h| h.seq),
                Side::Gesture => binding.gesture_half.as_ref().map(|h| h.seq),
            };
            if slot_seq == Some(expiry.seq) {
                tracing::debug!(binding = %binding.name, side = ?expiry.side, "Half-match expired");
                match expiry.side {
                    Side::Voice => binding.voice = None,
                    Side::Gesture => binding.gesture_half = None,
                }
            }
        }
    }

    /// Drop every binding and pending half-match.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.timers.clear();
    }
}

impl Default for MultiModalCombinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for a compound binding.
///
/// ```text
/// manager
///     .multi_modal_gesture("delete-swipe")
///     .when_saying(VoicePattern::exact("delete"))
///     .while_gesturing(GestureType::Swipe, BindingOptions::default())
///     .then(|fused| ...)?;
/// ```
///
/// Nothing is installed until [`then`](Self::then) runs; a dropped builder
/// leaves no trace.
#[must_use = "a binding is only installed by calling `then`"]
pub struct BindingBuilder<'a> {
    manager: &'a mut InteractionManager,
    name: String,
    voice: Option<VoicePattern>,
    gesture: Option<(GestureType, BindingOptions)>,
}

impl std::fmt::Debug for BindingBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("name", &self.name)
            .field("voice", &self.voice)
            .field("gesture", &self.gesture)
            .finish_non_exhaustive()
    }
}

impl<'a> BindingBuilder<'a> {
    pub(crate) fn new(manager: &'a mut InteractionManager, name: String) -> Self {
        Self {
            manager,
            name,
            voice: None,
            gesture: None,
        }
    }

    /// The voice half of the binding.
    pub fn when_saying(mut self, pattern: VoicePattern) -> Self {
        self.voice = Some(pattern);
        self
    }

    /// The gesture half of the binding.
    pub fn while_gesturing(mut self, gesture: GestureType, options: BindingOptions) -> Self {
        self.gesture = Some((gesture, options));
        self
    }

    /// Install the binding with its callback.
    ///
    /// Registers the voice pattern under the binding name and records the
    /// binding in one step.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::IncompleteBinding`] if `when_saying` or
    /// `while_gesturing` was never called (nothing is installed), or
    /// [`InteractionError::Destroyed`] after the manager was destroyed.
    pub fn then(
        self,
        callback: impl FnMut(&FusedEvent) + 'static,
    ) -> InteractionResult<SubscriptionId> {
        let Some(pattern) = self.voice else {
            tracing::warn!(binding = %self.name, "Binding has no voice pattern; ignored");
            return Err(InteractionError::IncompleteBinding {
                name: self.name,
                missing: "when_saying",
            });
        };
        let Some((gesture, options)) = self.gesture else {
            tracing::warn!(binding = %self.name, "Binding has no gesture; ignored");
            return Err(InteractionError::IncompleteBinding {
                name: self.name,
                missing: "while_gesturing",
            });
        };
        self.manager
            .install_binding(self.name, pattern, gesture, options, Box::new(callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{GestureDetail, GestureMatch, Point};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn voice(name: &str, t: u64) -> VoiceEvent {
        VoiceEvent {
            name: name.to_string(),
            transcript: name.to_string(),
            confidence: 0.9,
            timestamp_ms: t,
            captures: Default::default(),
        }
    }

    fn swipe(direction: SwipeDirection, end_ms: u64) -> GestureEvent {
        GestureEvent::new(GestureMatch {
            detail: GestureDetail::Swipe {
                direction,
                distance: 100.0,
                velocity: 1.0,
            },
            pointer_ids: vec![1],
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            start_ms: end_ms.saturating_sub(100),
            end_ms,
        })
    }

    fn counter() -> (Rc<RefCell<Vec<FusedEvent>>>, FusedCallback) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        (fired, Box::new(move |e: &FusedEvent| sink.borrow_mut().push(e.clone())))
    }

    #[test]
    fn test_voice_then_gesture_within_window() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        assert!(fusion.on_voice(&voice("go", 0)).is_none());
        assert_eq!(fusion.pending_halves("go"), Some((true, false)));

        let fused = fusion.on_gesture(&swipe(SwipeDirection::Right, 400)).unwrap();
        assert_eq!(fused.name, "go");
        assert_eq!(fused.voice.timestamp_ms, 0);
        assert_eq!(fired.borrow().len(), 1);
        assert_eq!(fusion.pending_halves("go"), Some((false, false)));
    }

    #[test]
    fn test_gesture_outside_window_does_not_fire() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 600)).is_none());
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_voice_consumed_after_firing() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 400)).is_some());
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 450)).is_none());
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn test_gesture_then_voice() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        assert!(fusion.on_gesture(&swipe(SwipeDirection::Up, 1000)).is_none());
        assert_eq!(fusion.pending_halves("go"), Some((false, true)));
        let fused = fusion.on_voice(&voice("go", 1300)).unwrap();
        assert_eq!(fused.gesture.matched.end_ms, 1000);
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn test_gesture_type_must_match() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Tap, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 100)).is_none());
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_direction_option_filters() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind(
            "next",
            GestureType::Swipe,
            BindingOptions::default().direction(SwipeDirection::Left),
            cb,
        );

        fusion.on_voice(&voice("next", 0));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 100)).is_none());
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Left, 200)).is_some());
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn test_custom_window() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("slow", GestureType::Swipe, BindingOptions::window(2000), cb);

        fusion.on_voice(&voice("slow", 0));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 1800)).is_some());
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn test_one_gesture_completes_one_binding() {
        let mut fusion = MultiModalCombinator::new();
        let (first, cb_a) = counter();
        let (second, cb_b) = counter();
        fusion.bind("a", GestureType::Swipe, BindingOptions::default(), cb_a);
        fusion.bind("b", GestureType::Swipe, BindingOptions::default(), cb_b);

        // Gesture first: recorded for both bindings
        fusion.on_gesture(&swipe(SwipeDirection::Right, 100));
        assert_eq!(fusion.pending_halves("a"), Some((false, true)));
        assert_eq!(fusion.pending_halves("b"), Some((false, true)));

        assert!(fusion.on_voice(&voice("a", 200)).is_some());
        // The same gesture can no longer complete "b"
        assert_eq!(fusion.pending_halves("b"), Some((false, false)));
        assert!(fusion.on_voice(&voice("b", 250)).is_none());

        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn test_voice_first_fires_earliest_binding_only() {
        let mut fusion = MultiModalCombinator::new();
        let (first, cb_a) = counter();
        let (second, cb_b) = counter();
        fusion.bind("a", GestureType::Swipe, BindingOptions::default(), cb_a);
        fusion.bind("b", GestureType::Swipe, BindingOptions::default(), cb_b);

        fusion.on_voice(&voice("a", 0));
        fusion.on_voice(&voice("b", 10));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 100)).is_some());
        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
        // "b" keeps its voice half for the next gesture
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 150)).is_some());
        assert_eq!(second.borrow().len(), 1);
    }

    #[test]
    fn test_tick_expires_halves() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        assert_eq!(fusion.next_deadline(), Some(501));
        // Still inside the window at exactly 500
        fusion.tick(500);
        assert_eq!(fusion.pending_halves("go"), Some((true, false)));
        fusion.tick(501);
        assert_eq!(fusion.pending_halves("go"), Some((false, false)));
        assert!(fusion.next_deadline().is_none());
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_tick_then_gesture_at_window_edge_fires() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        fusion.tick(500);
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 500)).is_some());
        assert_eq!(fired.borrow().len(), 1);
    }

    #[test]
    fn test_tick_expires_gesture_half() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_gesture(&swipe(SwipeDirection::Right, 100));
        fusion.tick(600);
        assert_eq!(fusion.pending_halves("go"), Some((false, true)));
        fusion.tick(601);
        assert_eq!(fusion.pending_halves("go"), Some((false, false)));
        assert!(fusion.on_voice(&voice("go", 601)).is_none());
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_newer_half_replaces_older() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);

        fusion.on_voice(&voice("go", 0));
        fusion.on_voice(&voice("go", 400));
        // Old expiry was cancelled; the newer half survives past 500
        fusion.tick(600);
        assert_eq!(fusion.pending_halves("go"), Some((true, false)));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 850)).is_some());
        assert_eq!(fired.borrow()[0].voice.timestamp_ms, 400);
    }

    #[test]
    fn test_unbind_and_clear() {
        let mut fusion = MultiModalCombinator::new();
        let (fired, cb) = counter();
        fusion.bind("go", GestureType::Swipe, BindingOptions::default(), cb);
        fusion.on_voice(&voice("go", 0));
        assert!(fusion.unbind("go"));
        assert!(fusion.on_gesture(&swipe(SwipeDirection::Right, 100)).is_none());
        assert!(fusion.next_deadline().is_none());

        let (_, cb) = counter();
        fusion.bind("x", GestureType::Tap, BindingOptions::default(), cb);
        fusion.clear();
        assert!(fusion.is_empty());
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_unknown_voice_name_ignored() {
        let mut fusion = MultiModalCombinator::new();
        assert!(fusion.on_voice(&voice("nobody", 0)).is_none());
        assert!(fusion.next_deadline().is_none());
    }
}
