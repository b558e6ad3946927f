//! # Interaction Manager
//!
//! The single entry point of the engine. Owns the coordinate transform, the
//! gesture detector, the voice matcher and the multi-modal combinator, and
//! routes input between them:
//!
//! ```text
//! pointer ──► transform ──► gesture detector ──► gesture callbacks
//!                                     │
//!                                     ▼
//!                             multi-modal combinator ──► fused callbacks
//!                                     ▲
//!                                     │
//! transcript ──────────────► voice matcher ──► voice callbacks
//! ```
//!
//! Everything runs synchronously inside [`handle`](InteractionManager::handle),
//! [`pump`](InteractionManager::pump) and [`tick`](InteractionManager::tick).
//! Each manager is independent; several can coexist in one process.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::event::{
    FusedEvent, GestureEvent, GestureType, InputEvent, PointerInput, PointerPhase, PointerSample,
    Transcript, VoiceEvent,
};
use crate::fusion::{BindingBuilder, BindingOptions, FusedCallback, MultiModalCombinator};
use crate::gesture::GestureDetector;
use crate::pattern::PatternDetector;
use crate::source::{InputSource, Modality};
use crate::transform::{Bounds, CoordinateTransform, TransformChanged};
use crate::voice::{VoiceCommandMatcher, VoicePattern};

/// Number of diagnostic entries retained while debug mode is on.
pub const DEBUG_TRACE_CAPACITY: usize = 100;

/// Handle returned by every registration; pass it to
/// [`InteractionManager::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// A dispatched high-level intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Intent {
    /// A recognized gesture.
    Gesture(GestureEvent),
    /// A matched voice command.
    Voice(VoiceEvent),
    /// A fired multi-modal binding.
    Fused(FusedEvent),
}

impl Intent {
    /// Name the intent was dispatched under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Gesture(event) => event.gesture.as_str(),
            Self::Voice(event) => &event.name,
            Self::Fused(event) => &event.name,
        }
    }

    /// Timestamp of the event that produced this intent.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Gesture(event) => event.timestamp_ms(),
            Self::Voice(event) => event.timestamp_ms,
            Self::Fused(event) => event.voice.timestamp_ms.max(event.gesture.timestamp_ms()),
        }
    }
}

/// A diagnostic record kept while debug mode is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Intent name.
    pub name: String,
    /// When the intent was produced.
    pub timestamp_ms: u64,
    /// The full intent with its parameters.
    pub intent: Intent,
}

type GestureCallback = Box<dyn FnMut(&GestureEvent)>;
type VoiceCallback = Box<dyn FnMut(&VoiceEvent)>;

#[derive(Debug, Clone)]
enum Registration {
    Gesture(GestureType),
    Voice(String),
    Binding(String),
    Transform(SubscriptionId),
}

/// Multi-modal interaction engine facade.
pub struct InteractionManager {
    transform: CoordinateTransform,
    gestures: GestureDetector,
    voice: VoiceCommandMatcher,
    fusion: MultiModalCombinator,
    gesture_callbacks: HashMap<GestureType, Vec<(SubscriptionId, GestureCallback)>>,
    voice_callbacks: HashMap<String, Vec<(SubscriptionId, VoiceCallback)>>,
    registrations: HashMap<SubscriptionId, Registration>,
    sources: Vec<Box<dyn InputSource>>,
    speech_available: bool,
    debug: bool,
    trace: VecDeque<TraceEntry>,
    destroyed: bool,
    next_subscription: u64,
}

impl std::fmt::Debug for InteractionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionManager")
            .field("transform", &self.transform)
            .field("gestures", &self.gestures)
            .field("voice", &self.voice)
            .field("fusion", &self.fusion)
            .field("registrations", &self.registrations.len())
            .field("sources", &self.sources.len())
            .field("speech_available", &self.speech_available)
            .field("debug", &self.debug)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl InteractionManager {
    /// Create a manager from configuration.
    #[must_use]
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            transform: CoordinateTransform::with_config(&config.zoom),
            gestures: GestureDetector::with_config(config.gesture),
            voice: VoiceCommandMatcher::with_config(config.voice),
            fusion: MultiModalCombinator::with_config(config.fusion),
            gesture_callbacks: HashMap::new(),
            voice_callbacks: HashMap::new(),
            registrations: HashMap::new(),
            sources: Vec::new(),
            speech_available: false,
            debug: false,
            trace: VecDeque::with_capacity(DEBUG_TRACE_CAPACITY),
            destroyed: false,
            next_subscription: 0,
        }
    }

    fn ensure_live(&self) -> InteractionResult<()> {
        if self.destroyed {
            return Err(InteractionError::Destroyed);
        }
        Ok(())
    }

    fn register(&mut self, registration: Registration) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.registrations.insert(id, registration);
        id
    }

    // ---- Registration ----

    /// Call `callback` for every recognized gesture of `gesture` type.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn gesture(
        &mut self,
        gesture: GestureType,
        callback: impl FnMut(&GestureEvent) + 'static,
    ) -> InteractionResult<SubscriptionId> {
        self.ensure_live()?;
        let id = self.register(Registration::Gesture(gesture));
        self.gesture_callbacks
            .entry(gesture)
            .or_default()
            .push((id, Box::new(callback)));
        tracing::debug!(%gesture, "Gesture callback registered");
        Ok(id)
    }

    /// Register `pattern` under `name` and call `callback` on every match.
    ///
    /// Voice commands and multi-modal bindings share one namespace:
    /// registering a pattern under an existing name replaces that pattern.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn voice(
        &mut self,
        name: impl Into<String>,
        pattern: VoicePattern,
        callback: impl FnMut(&VoiceEvent) + 'static,
    ) -> InteractionResult<SubscriptionId> {
        self.ensure_live()?;
        let name = name.into();
        self.voice.command(name.clone(), pattern);
        let id = self.register(Registration::Voice(name.clone()));
        self.voice_callbacks
            .entry(name)
            .or_default()
            .push((id, Box::new(callback)));
        Ok(id)
    }

    /// Start building a compound voice + gesture binding.
    pub fn multi_modal_gesture(&mut self, name: impl Into<String>) -> BindingBuilder<'_> {
        BindingBuilder::new(self, name.into())
    }

    pub(crate) fn install_binding(
        &mut self,
        name: String,
        pattern: VoicePattern,
        gesture: GestureType,
        options: BindingOptions,
        callback: FusedCallback,
    ) -> InteractionResult<SubscriptionId> {
        self.ensure_live()?;
        self.registrations
            .retain(|_, r| !matches!(r, Registration::Binding(existing) if *existing == name));
        self.voice.command(name.clone(), pattern);
        self.fusion.bind(name.clone(), gesture, options, callback);
        Ok(self.register(Registration::Binding(name)))
    }

    /// Call `callback` after every zoom/pan change.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn on_transform_change(
        &mut self,
        callback: impl FnMut(&TransformChanged) + 'static,
    ) -> InteractionResult<SubscriptionId> {
        self.ensure_live()?;
        let listener = self.transform.on_change(callback);
        Ok(self.register(Registration::Transform(listener)))
    }

    /// Remove a registration. Returns `false` for unknown or already removed ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(registration) = self.registrations.remove(&id) else {
            return false;
        };
        match registration {
            Registration::Gesture(gesture) => {
                if let Some(callbacks) = self.gesture_callbacks.get_mut(&gesture) {
                    callbacks.retain(|(cid, _)| *cid != id);
                }
            }
            Registration::Voice(name) => {
                if let Some(callbacks) = self.voice_callbacks.get_mut(&name) {
                    callbacks.retain(|(cid, _)| *cid != id);
                    if callbacks.is_empty() {
                        self.voice_callbacks.remove(&name);
                    }
                }
                if !self.voice_callbacks.contains_key(&name) && !self.fusion.contains(&name) {
                    self.voice.remove(&name);
                }
            }
            Registration::Binding(name) => {
                self.fusion.unbind(&name);
                if !self.voice_callbacks.contains_key(&name) {
                    self.voice.remove(&name);
                }
            }
            Registration::Transform(listener) => {
                self.transform.remove_listener(listener);
            }
        }
        true
    }

    /// Install or replace a pattern detector.
    pub fn register_detector(&mut self, detector: Box<dyn PatternDetector>) {
        self.gestures.register_detector(detector);
    }

    // ---- Components ----

    /// The coordinate transform.
    #[must_use]
    pub const fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Mutable access to the coordinate transform for zoom/pan operations.
    pub fn transform_mut(&mut self) -> &mut CoordinateTransform {
        &mut self.transform
    }

    /// Supply canvas content bounds and container bounds.
    pub fn set_references(&mut self, canvas: Bounds, container: Bounds) {
        self.transform.set_references(canvas, container);
    }

    /// The gesture detector.
    #[must_use]
    pub const fn gestures(&self) -> &GestureDetector {
        &self.gestures
    }

    /// The voice command matcher.
    #[must_use]
    pub const fn voice_matcher(&self) -> &VoiceCommandMatcher {
        &self.voice
    }

    /// The multi-modal combinator.
    #[must_use]
    pub const fn fusion(&self) -> &MultiModalCombinator {
        &self.fusion
    }

    // ---- Input ----

    /// Start `source` and subscribe to it.
    ///
    /// # Errors
    ///
    /// Returns the source's start error. A failed speech source leaves the
    /// engine running in gesture-only mode; the source is not attached.
    pub fn attach(&mut self, mut source: Box<dyn InputSource>) -> InteractionResult<()> {
        self.ensure_live()?;
        let modality = source.modality();
        if let Err(err) = source.start() {
            match modality {
                Modality::Speech => {
                    tracing::warn!(
                        error = %err,
                        "Speech input unavailable; continuing gesture-only"
                    );
                }
                Modality::Pointer => {
                    tracing::warn!(error = %err, "Pointer source failed to start");
                }
            }
            return Err(err);
        }
        if modality == Modality::Speech {
            self.speech_available = true;
        }
        tracing::info!(%modality, "Input source attached");
        self.sources.push(source);
        Ok(())
    }

    /// Whether a speech source is attached.
    #[must_use]
    pub const fn speech_available(&self) -> bool {
        self.speech_available
    }

    /// Drain every attached source, then run timers up to `now_ms`.
    pub fn pump(&mut self, now_ms: u64) -> Vec<Intent> {
        let mut intents = Vec::new();
        let mut index = 0;
        while index < self.sources.len() {
            while let Some(event) = self.sources[index].poll() {
                intents.extend(self.handle(event));
                if self.destroyed {
                    return intents;
                }
            }
            index += 1;
        }
        intents.extend(self.tick(now_ms));
        intents
    }

    /// Process one input event.
    ///
    /// Timers due at or before the event's timestamp run first.
    pub fn handle(&mut self, event: InputEvent) -> Vec<Intent> {
        if self.destroyed {
            return Vec::new();
        }
        let mut intents = self.tick(event.timestamp_ms());
        match event {
            InputEvent::Pointer(input) => {
                if let Some(gesture) = self.route_pointer(input) {
                    self.dispatch_gesture(gesture, &mut intents);
                }
            }
            InputEvent::Transcript(transcript) => self.route_transcript(&transcript, &mut intents),
        }
        intents
    }

    /// Advance time: fire long-press and idle timers and expire half-matches.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Intent> {
        if self.destroyed {
            return Vec::new();
        }
        let mut intents = Vec::new();
        for gesture in self.gestures.tick(now_ms) {
            self.dispatch_gesture(gesture, &mut intents);
        }
        self.fusion.tick(now_ms);
        intents
    }

    /// Earliest time at which [`tick`](Self::tick) has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.gestures.next_deadline(), self.fusion.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn route_pointer(&mut self, input: PointerInput) -> Option<GestureEvent> {
        let point = self.transform.screen_to_canvas(input.screen_x, input.screen_y);
        let sample = PointerSample {
            pressure: input.pressure,
            ..PointerSample::new(input.pointer_id, point.x, point.y, input.timestamp_ms)
        };
        match input.phase {
            PointerPhase::Down => self.gestures.pointer_down(sample),
            PointerPhase::Move => self.gestures.pointer_move(sample),
            PointerPhase::Up => self.gestures.pointer_up(sample),
            PointerPhase::Cancel => self.gestures.pointer_cancel(sample),
        }
    }

    fn route_transcript(&mut self, transcript: &Transcript, intents: &mut Vec<Intent>) {
        for event in self.voice.match_transcript(transcript) {
            if let Some(callbacks) = self.voice_callbacks.get_mut(&event.name) {
                for (_, callback) in callbacks.iter_mut() {
                    callback(&event);
                }
            }
            let fused = self.fusion.on_voice(&event);
            self.record(Intent::Voice(event), intents);
            if let Some(fused) = fused {
                self.record(Intent::Fused(fused), intents);
            }
        }
    }

    fn dispatch_gesture(&mut self, event: GestureEvent, intents: &mut Vec<Intent>) {
        if let Some(callbacks) = self.gesture_callbacks.get_mut(&event.gesture) {
            for (_, callback) in callbacks.iter_mut() {
                callback(&event);
            }
        }
        let fused = self.fusion.on_gesture(&event);
        self.record(Intent::Gesture(event), intents);
        if let Some(fused) = fused {
            self.record(Intent::Fused(fused), intents);
        }
    }

    fn record(&mut self, intent: Intent, intents: &mut Vec<Intent>) {
        if self.debug {
            let entry = TraceEntry {
                name: intent.name().to_string(),
                timestamp_ms: intent.timestamp_ms(),
                intent: intent.clone(),
            };
            tracing::debug!(
                target: "canvas_interact::debug",
                name = %entry.name,
                timestamp_ms = entry.timestamp_ms,
                intent = ?entry.intent,
                "Recognized"
            );
            if self.trace.len() == DEBUG_TRACE_CAPACITY {
                self.trace.pop_front();
            }
            self.trace.push_back(entry);
        }
        intents.push(intent);
    }

    // ---- Lifecycle ----

    /// Emit a diagnostic trace for every recognized event.
    pub fn enable_debug(&mut self) {
        self.debug = true;
        tracing::info!("Interaction debug mode enabled");
    }

    /// Stop tracing and drop the retained trace.
    pub fn disable_debug(&mut self) {
        self.debug = false;
        self.trace.clear();
    }

    /// Whether debug mode is on.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Most recent diagnostic entries, oldest first.
    pub fn debug_trace(&self) -> impl Iterator<Item = &TraceEntry> {
        self.trace.iter()
    }

    /// Release every registration and pending state. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for source in &mut self.sources {
            source.stop();
        }
        self.sources.clear();
        self.speech_available = false;
        self.gesture_callbacks.clear();
        self.voice_callbacks.clear();
        self.registrations.clear();
        self.voice.clear();
        self.fusion.clear();
        self.gestures.clear();
        self.transform.clear_listeners();
        self.trace.clear();
        tracing::info!("Interaction manager destroyed");
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Default for InteractionManager {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn down(id: u32, x: f32, y: f32, t: u64) -> InputEvent {
        InputEvent::Pointer(PointerInput::down(id, x, y, t))
    }

    fn moved(id: u32, x: f32, y: f32, t: u64) -> InputEvent {
        InputEvent::Pointer(PointerInput::moved(id, x, y, t))
    }

    fn up(id: u32, x: f32, y: f32, t: u64) -> InputEvent {
        InputEvent::Pointer(PointerInput::up(id, x, y, t))
    }

    fn say(text: &str, t: u64) -> InputEvent {
        InputEvent::Transcript(Transcript::new(text, 0.9, t))
    }

    fn names(intents: &[Intent]) -> Vec<&str> {
        intents.iter().map(Intent::name).collect()
    }

    #[test]
    fn test_gesture_callback_receives_tap() {
        let mut manager = InteractionManager::default();
        let taps = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&taps);
        manager
            .gesture(GestureType::Tap, move |_| *sink.borrow_mut() += 1)
            .unwrap();

        manager.handle(down(1, 10.0, 10.0, 0));
        let intents = manager.handle(up(1, 11.0, 10.0, 100));
        assert_eq!(names(&intents), vec!["tap"]);
        assert_eq!(*taps.borrow(), 1);
    }

    #[test]
    fn test_voice_callback_and_unsubscribe() {
        let mut manager = InteractionManager::default();
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heard);
        let id = manager
            .voice("undo", VoicePattern::exact("undo"), move |e| {
                sink.borrow_mut().push(e.timestamp_ms);
            })
            .unwrap();

        manager.handle(say("Undo", 10));
        assert!(manager.unsubscribe(id));
        assert!(!manager.unsubscribe(id));
        assert!(manager.handle(say("undo", 20)).is_empty());
        assert_eq!(*heard.borrow(), vec![10]);
        assert!(!manager.voice_matcher().contains("undo"));
    }

    #[test]
    fn test_gesture_coordinates_in_canvas_space() {
        let mut manager = InteractionManager::default();
        manager.set_references(
            Bounds::new(0.0, 0.0, 1000.0, 1000.0),
            Bounds::new(100.0, 100.0, 500.0, 500.0),
        );
        manager.transform_mut().set_zoom(2.0);

        manager.handle(down(1, 100.0, 100.0, 0));
        manager.handle(moved(1, 150.0, 100.0, 50));
        let intents = manager.handle(up(1, 200.0, 100.0, 100));
        let Intent::Gesture(event) = &intents[0] else {
            panic!("expected gesture, got {intents:?}");
        };
        // 100 screen pixels at 2x zoom is 50 canvas units
        assert!((event.matched.distance().unwrap() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_fused_binding_fires_with_both_halves() {
        let mut manager = InteractionManager::default();
        let fired = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&fired);
        manager
            .multi_modal_gesture("delete")
            .when_saying(VoicePattern::exact("delete"))
            .while_gesturing(GestureType::Swipe, BindingOptions::default())
            .then(move |_| *sink.borrow_mut() += 1)
            .unwrap();

        let voice = manager.handle(say("delete", 0));
        assert_eq!(names(&voice), vec!["delete"]);

        manager.handle(down(1, 0.0, 0.0, 200));
        manager.handle(moved(1, 50.0, 0.0, 250));
        let intents = manager.handle(up(1, 100.0, 0.0, 300));
        assert_eq!(names(&intents), vec!["swipe", "delete"]);
        assert!(matches!(intents[1], Intent::Fused(_)));
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_incomplete_binding_installs_nothing() {
        let mut manager = InteractionManager::default();
        let err = manager
            .multi_modal_gesture("half")
            .when_saying(VoicePattern::exact("half"))
            .then(|_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            InteractionError::IncompleteBinding { missing: "while_gesturing", .. }
        ));
        assert!(!manager.fusion().contains("half"));
        assert!(!manager.voice_matcher().contains("half"));
    }

    #[test]
    fn test_unsubscribe_binding() {
        let mut manager = InteractionManager::default();
        let id = manager
            .multi_modal_gesture("go")
            .when_saying(VoicePattern::exact("go"))
            .while_gesturing(GestureType::Tap, BindingOptions::default())
            .then(|_| {})
            .unwrap();
        assert!(manager.unsubscribe(id));
        assert!(!manager.fusion().contains("go"));
        assert!(manager.handle(say("go", 0)).is_empty());
    }

    #[test]
    fn test_long_press_fires_from_tick() {
        let mut manager = InteractionManager::default();
        manager.handle(down(1, 5.0, 5.0, 0));
        assert_eq!(manager.next_deadline(), Some(500));
        let intents = manager.tick(500);
        assert_eq!(names(&intents), vec!["long-press"]);
        assert!(manager.handle(up(1, 5.0, 5.0, 700)).is_empty());
    }

    #[test]
    fn test_speech_failure_keeps_gestures() {
        let mut manager = InteractionManager::default();
        let speech = ScriptedSource::new(Modality::Speech, vec![say("go", 0)]).failing("denied");
        let err = manager.attach(Box::new(speech)).unwrap_err();
        assert!(matches!(err, InteractionError::SpeechUnavailable(_)));
        assert!(!manager.speech_available());

        let pointer = ScriptedSource::new(
            Modality::Pointer,
            vec![down(1, 0.0, 0.0, 0), up(1, 0.0, 0.0, 50)],
        );
        manager.attach(Box::new(pointer)).unwrap();
        let intents = manager.pump(100);
        assert_eq!(names(&intents), vec!["tap"]);
    }

    #[test]
    fn test_debug_trace_is_bounded() {
        let mut manager = InteractionManager::default();
        manager.voice("go", VoicePattern::exact("go"), |_| {}).unwrap();
        manager.handle(say("go", 0));
        assert_eq!(manager.debug_trace().count(), 0);

        manager.enable_debug();
        for t in 0..(DEBUG_TRACE_CAPACITY as u64 + 20) {
            manager.handle(say("go", t));
        }
        let trace: Vec<_> = manager.debug_trace().collect();
        assert_eq!(trace.len(), DEBUG_TRACE_CAPACITY);
        assert_eq!(trace[0].timestamp_ms, 20);
        assert_eq!(trace[0].name, "go");

        manager.disable_debug();
        assert_eq!(manager.debug_trace().count(), 0);
    }

    #[test]
    fn test_destroy_is_idempotent_and_silences_callbacks() {
        let mut manager = InteractionManager::default();
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        manager.gesture(GestureType::Tap, move |_| *sink.borrow_mut() += 1).unwrap();
        let sink = Rc::clone(&calls);
        manager.on_transform_change(move |_| *sink.borrow_mut() += 1).unwrap();
        manager.handle(down(1, 0.0, 0.0, 0));

        manager.destroy();
        manager.destroy();
        assert!(manager.is_destroyed());
        assert!(manager.handle(up(1, 0.0, 0.0, 50)).is_empty());
        assert!(manager.tick(10_000).is_empty());
        manager.transform_mut().pan(10.0, 0.0);
        assert_eq!(*calls.borrow(), 0);

        assert!(matches!(
            manager.gesture(GestureType::Tap, |_| {}),
            Err(InteractionError::Destroyed)
        ));
        assert_eq!(manager.gestures().active_candidates(), 0);
    }

    #[test]
    fn test_intent_serializes_tagged() {
        let mut manager = InteractionManager::default();
        manager.voice("go", VoicePattern::exact("go"), |_| {}).unwrap();
        let intents = manager.handle(say("go", 5));
        let json = serde_json::to_value(&intents[0]).unwrap();
        assert_eq!(json["type"], "voice");
        assert_eq!(json["data"]["name"], "go");
    }
}
