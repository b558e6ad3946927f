//! # Pattern Detectors
//!
//! Stateless matchers that classify a finished (or timed-out) gesture
//! candidate. Detectors are tried in priority order and the first match wins:
//!
//! ```text
//! long-press > pinch > rotate > swipe > tap
//! ```
//!
//! A candidate that satisfies no detector produces nothing.

use std::f32::consts::{PI, TAU};
use std::fmt;

use crate::config::{GestureConfig, SwipeBuckets};
use crate::event::{GestureDetail, GestureMatch, GestureType, Point, PointerSample, SwipeDirection};

/// Read-only view of a candidate handed to detectors.
#[derive(Debug, Clone, Copy)]
pub struct CandidateView<'a> {
    /// Every sample in arrival order, across all pointers.
    pub samples: &'a [PointerSample],
    /// Pointers in the candidate, in the order they went down.
    pub pointer_ids: &'a [u32],
    /// Timestamp of the first sample.
    pub start_ms: u64,
    /// Evaluation time: the release timestamp, or the timer tick.
    pub end_ms: u64,
    /// Whether evaluation was triggered by a pointer release or cancel.
    pub released: bool,
}

impl<'a> CandidateView<'a> {
    /// Samples belonging to one pointer.
    pub fn samples_for(&self, pointer_id: u32) -> impl Iterator<Item = &'a PointerSample> + 'a {
        let samples = self.samples;
        samples.iter().filter(move |s| s.pointer_id == pointer_id)
    }

    /// First and last sample for one pointer.
    #[must_use]
    pub fn endpoints(&self, pointer_id: u32) -> Option<(&'a PointerSample, &'a PointerSample)> {
        let first = self.samples_for(pointer_id).next()?;
        let last = self.samples_for(pointer_id).last()?;
        Some((first, last))
    }

    /// Index of the first sample of the last pointer to join, if the
    /// candidate holds more than one pointer.
    #[must_use]
    pub fn join_index(&self) -> Option<usize> {
        let [_, .., last] = self.pointer_ids else {
            return None;
        };
        self.samples.iter().position(|s| s.pointer_id == *last)
    }

    /// The pointer if this is a single-pointer candidate.
    #[must_use]
    pub fn single_pointer(&self) -> Option<u32> {
        match self.pointer_ids {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Largest distance any sample of `pointer_id` strayed from its first sample.
    #[must_use]
    pub fn max_displacement(&self, pointer_id: u32) -> f32 {
        let Some(origin) = self.samples_for(pointer_id).next().map(PointerSample::point) else {
            return 0.0;
        };
        self.samples_for(pointer_id)
            .map(|s| origin.distance_to(s.point()))
            .fold(0.0, f32::max)
    }

    /// All sample positions.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(PointerSample::point).collect()
    }

    fn to_match(&self, detail: GestureDetail) -> GestureMatch {
        GestureMatch {
            detail,
            pointer_ids: self.pointer_ids.to_vec(),
            points: self.points(),
            start_ms: self.start_ms,
            end_ms: self.end_ms,
        }
    }
}

/// A matcher for one gesture kind.
pub trait PatternDetector {
    /// The gesture this detector reports.
    fn gesture_type(&self) -> GestureType;

    /// Number of pointers the detector needs.
    fn pointer_count(&self) -> usize {
        1
    }

    /// Classify the candidate, or return `None` for no match.
    fn detect(&self, candidate: &CandidateView<'_>, config: &GestureConfig) -> Option<GestureMatch>;
}

/// Short press with little movement, released before `tap_max_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapDetector;

impl PatternDetector for TapDetector {
    fn gesture_type(&self) -> GestureType {
        GestureType::Tap
    }

    fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        if !candidate.released {
            return None;
        }
        let id = candidate.single_pointer()?;
        let (_, last) = candidate.endpoints(id)?;
        let duration = candidate.end_ms.saturating_sub(candidate.start_ms);
        if duration >= config.tap_max_ms
            || candidate.max_displacement(id) >= config.tap_max_distance
        {
            return None;
        }
        Some(candidate.to_match(GestureDetail::Tap {
            position: last.point(),
        }))
    }
}

/// Held press with little movement, lasting at least `long_press_ms`.
///
/// Evaluated on release and on timer ticks, so it can fire while the
/// pointer is still down.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongPressDetector;

impl PatternDetector for LongPressDetector {
    fn gesture_type(&self) -> GestureType {
        GestureType::LongPress
    }

    fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        let id = candidate.single_pointer()?;
        let (first, _) = candidate.endpoints(id)?;
        let duration_ms = candidate.end_ms.saturating_sub(candidate.start_ms);
        if duration_ms < config.long_press_ms
            || candidate.max_displacement(id) >= config.tap_max_distance
        {
            return None;
        }
        Some(candidate.to_match(GestureDetail::LongPress {
            position: first.point(),
            duration_ms,
        }))
    }
}

/// Single-pointer stroke longer than `swipe_min_distance`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwipeDetector;

impl PatternDetector for SwipeDetector {
    fn gesture_type(&self) -> GestureType {
        GestureType::Swipe
    }

    fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        let id = candidate.single_pointer()?;
        let (first, last) = candidate.endpoints(id)?;
        let distance = first.point().distance_to(last.point());
        if distance < config.swipe_min_distance {
            return None;
        }
        let elapsed = last.timestamp_ms.saturating_sub(first.timestamp_ms).max(1);
        #[allow(clippy::cast_precision_loss)]
        let velocity = distance / elapsed as f32;
        let direction = SwipeDirection::from_vector(
            last.x - first.x,
            last.y - first.y,
            config.swipe_buckets == SwipeBuckets::Eight,
        );
        Some(candidate.to_match(GestureDetail::Swipe {
            direction,
            distance,
            velocity,
        }))
    }
}

/// Start and end geometry of a two-pointer candidate.
#[derive(Debug, Clone, Copy)]
struct TwoPointerGeometry {
    scale: f32,
    rotation: f32,
    center: Point,
}

impl TwoPointerGeometry {
    fn measure(candidate: &CandidateView<'_>) -> Option<Self> {
        let [a, b] = candidate.pointer_ids else {
            return None;
        };
        // Start geometry is taken when the second pointer lands.
        let (before, after) = candidate.samples.split_at(candidate.join_index()?);
        let a_start = before.iter().rev().find(|s| s.pointer_id == *a)?;
        let b_start = after.first()?;
        let a_end = candidate.samples_for(*a).last()?;
        let b_end = candidate.samples_for(*b).last()?;

        let initial = a_start.point().distance_to(b_start.point());
        if initial <= f32::EPSILON {
            return None;
        }
        let current = a_end.point().distance_to(b_end.point());
        let rotation = normalize_angle(
            a_end.point().angle_to(b_end.point()) - a_start.point().angle_to(b_start.point()),
        );
        Some(Self {
            scale: current / initial,
            rotation,
            center: a_end.point().midpoint(b_end.point()),
        })
    }
}

/// Wrap an angle into `(-PI, PI]`.
fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Two pointers whose distance changed by at least `pinch_scale_threshold`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinchDetector;

impl PatternDetector for PinchDetector {
    fn gesture_type(&self) -> GestureType {
        GestureType::Pinch
    }

    fn pointer_count(&self) -> usize {
        2
    }

    fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        let geometry = TwoPointerGeometry::measure(candidate)?;
        if (geometry.scale - 1.0).abs() < config.pinch_scale_threshold {
            return None;
        }
        Some(candidate.to_match(GestureDetail::Pinch {
            scale: geometry.scale,
            rotation: geometry.rotation,
            center: geometry.center,
        }))
    }
}

/// Two pointers whose connecting vector turned by at least `rotate_threshold`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotateDetector;

impl PatternDetector for RotateDetector {
    fn gesture_type(&self) -> GestureType {
        GestureType::Rotate
    }

    fn pointer_count(&self) -> usize {
        2
    }

    fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        let geometry = TwoPointerGeometry::measure(candidate)?;
        if geometry.rotation.abs() < config.rotate_threshold {
            return None;
        }
        Some(candidate.to_match(GestureDetail::Rotate {
            rotation: geometry.rotation,
            scale: geometry.scale,
            center: geometry.center,
        }))
    }
}

/// Built-in detector for a gesture kind.
#[must_use]
pub fn builtin(kind: GestureType) -> Box<dyn PatternDetector> {
    match kind {
        GestureType::Tap => Box::new(TapDetector),
        GestureType::LongPress => Box::new(LongPressDetector),
        GestureType::Swipe => Box::new(SwipeDetector),
        GestureType::Pinch => Box::new(PinchDetector),
        GestureType::Rotate => Box::new(RotateDetector),
    }
}

/// Detectors in priority order.
pub struct DetectorRegistry {
    priority: Vec<GestureType>,
    detectors: Vec<Box<dyn PatternDetector>>,
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("priority", &self.priority)
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.gesture_type()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DetectorRegistry {
    /// Built-in detectors for the kinds in `priority`, in that order.
    ///
    /// Kinds left out of `priority` are not recognized.
    #[must_use]
    pub fn with_priority(priority: &[GestureType]) -> Self {
        let mut registry = Self {
            priority: Vec::new(),
            detectors: Vec::new(),
        };
        for kind in priority {
            if !registry.priority.contains(kind) {
                registry.priority.push(*kind);
                registry.detectors.push(builtin(*kind));
            }
        }
        registry
    }

    /// Install a detector, replacing any existing one for the same kind.
    ///
    /// New kinds are appended at the lowest priority.
    pub fn register(&mut self, detector: Box<dyn PatternDetector>) {
        let kind = detector.gesture_type();
        if let Some(slot) = self.detectors.iter_mut().find(|d| d.gesture_type() == kind) {
            *slot = detector;
        } else {
            self.priority.push(kind);
            self.detectors.push(detector);
        }
    }

    /// Remove the detector for `kind`.
    pub fn remove(&mut self, kind: GestureType) -> bool {
        let before = self.detectors.len();
        self.detectors.retain(|d| d.gesture_type() != kind);
        self.priority.retain(|k| *k != kind);
        self.detectors.len() != before
    }

    /// Kinds in priority order.
    #[must_use]
    pub fn priority(&self) -> &[GestureType] {
        &self.priority
    }

    /// Whether any detector needs more than one pointer.
    #[must_use]
    pub fn max_pointers(&self) -> usize {
        self.detectors
            .iter()
            .map(|d| d.pointer_count())
            .max()
            .unwrap_or(1)
    }

    /// Whether a detector for `kind` is installed.
    #[must_use]
    pub fn contains(&self, kind: GestureType) -> bool {
        self.priority.contains(&kind)
    }

    /// Run only the detector for `kind`.
    #[must_use]
    pub fn detect_kind(
        &self,
        kind: GestureType,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        self.detectors
            .iter()
            .find(|d| d.gesture_type() == kind)
            .and_then(|detector| detector.detect(candidate, config))
    }

    /// Run detectors in priority order; the first match wins.
    #[must_use]
    pub fn detect(
        &self,
        candidate: &CandidateView<'_>,
        config: &GestureConfig,
    ) -> Option<GestureMatch> {
        self.detectors
            .iter()
            .find_map(|detector| detector.detect(candidate, config))
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_priority(&GestureConfig::default().priority)
    }
}
