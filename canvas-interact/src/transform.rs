//! # Coordinate Transform
//!
//! Maps screen-space pointer positions to canvas space and back, and owns the
//! zoom/pan state of a single canvas.
//!
//! ```text
//! canvas = (screen - origin - pan) / level
//! screen = canvas * level + pan + origin
//! ```
//!
//! `origin` is the top-left corner of the container on screen. Every mutation
//! keeps `min <= level <= max` and synchronously notifies listeners with a
//! [`TransformChanged`].

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::config::ZoomConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::event::Point;
use crate::manager::SubscriptionId;

/// Zoom and pan state of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Current zoom level (1.0 = 100%).
    pub level: f32,
    /// Pan offset X in screen pixels.
    pub pan_x: f32,
    /// Pan offset Y in screen pixels.
    pub pan_y: f32,
    /// Minimum zoom level.
    pub min: f32,
    /// Maximum zoom level.
    pub max: f32,
}

impl ZoomState {
    /// Unzoomed, unpanned state with the given limits.
    ///
    /// Reversed limits are swapped. Limits that are not finite and positive
    /// fall back to the [`ZoomConfig`] defaults.
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        let (min, max) = ordered_limits(min, max).unwrap_or_else(|| {
            tracing::warn!(min, max, "Invalid zoom limits, using defaults");
            let defaults = ZoomConfig::default();
            (defaults.min, defaults.max)
        });
        Self {
            level: 1.0_f32.clamp(min, max),
            pan_x: 0.0,
            pan_y: 0.0,
            min,
            max,
        }
    }

    /// Clamp into the limits. NaN keeps the current level.
    fn clamp(&self, level: f32) -> f32 {
        if level.is_nan() {
            self.level
        } else {
            level.clamp(self.min, self.max)
        }
    }
}

/// Sort a pair of zoom limits, or `None` unless both are finite and positive.
fn ordered_limits(min: f32, max: f32) -> Option<(f32, f32)> {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    (min.is_finite() && max.is_finite() && min > 0.0).then_some((min, max))
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Bounds {
    /// Create new bounds.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Notification emitted after every zoom/pan mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformChanged {
    /// New zoom level.
    pub level: f32,
    /// Zoom level as a rounded percentage.
    pub percentage: u32,
    /// Pan offset X.
    pub pan_x: f32,
    /// Pan offset Y.
    pub pan_y: f32,
    /// Minimum zoom level.
    pub min_zoom: f32,
    /// Maximum zoom level.
    pub max_zoom: f32,
}

impl From<&ZoomState> for TransformChanged {
    fn from(state: &ZoomState) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percentage = (state.level * 100.0).round().max(0.0) as u32;
        Self {
            level: state.level,
            percentage,
            pan_x: state.pan_x,
            pan_y: state.pan_y,
            min_zoom: state.min,
            max_zoom: state.max,
        }
    }
}

type TransformListener = Box<dyn FnMut(&TransformChanged)>;

/// Zoom/pan state plus the screen geometry needed to convert coordinates.
pub struct CoordinateTransform {
    state: ZoomState,
    step: f32,
    fit_padding: f32,
    /// Canvas content bounds (canvas units).
    canvas: Option<Bounds>,
    /// Container bounds (screen pixels).
    container: Option<Bounds>,
    listeners: Vec<(SubscriptionId, TransformListener)>,
    observers: Vec<Sender<TransformChanged>>,
    next_listener: u64,
}

impl std::fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateTransform")
            .field("state", &self.state)
            .field("step", &self.step)
            .field("fit_padding", &self.fit_padding)
            .field("canvas", &self.canvas)
            .field("container", &self.container)
            .field("listeners", &self.listeners.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl CoordinateTransform {
    /// Create a transform with default zoom limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&ZoomConfig::default())
    }

    /// Create a transform from zoom configuration.
    #[must_use]
    pub fn with_config(config: &ZoomConfig) -> Self {
        let defaults = ZoomConfig::default();
        let step = if config.step.is_finite() && config.step >= 0.0 {
            config.step
        } else {
            defaults.step
        };
        let fit_padding = if config.fit_padding.is_finite() && config.fit_padding > 0.0 {
            config.fit_padding
        } else {
            defaults.fit_padding
        };
        Self {
            state: ZoomState::new(config.min, config.max),
            step,
            fit_padding,
            canvas: None,
            container: None,
            listeners: Vec::new(),
            observers: Vec::new(),
            next_listener: 0,
        }
    }

    /// Current zoom/pan state.
    #[must_use]
    pub const fn state(&self) -> &ZoomState {
        &self.state
    }

    /// Current zoom level.
    #[must_use]
    pub const fn level(&self) -> f32 {
        self.state.level
    }

    /// Supply the canvas content bounds and the container bounds on screen.
    pub fn set_references(&mut self, canvas: Bounds, container: Bounds) {
        self.canvas = Some(canvas);
        self.container = Some(container);
    }

    /// Whether [`set_references`](Self::set_references) has been called.
    #[must_use]
    pub fn has_references(&self) -> bool {
        self.canvas.is_some() && self.container.is_some()
    }

    /// Screen position of the container's top-left corner.
    fn origin(&self) -> Point {
        self.container
            .map_or_else(Point::default, |c| Point::new(c.x, c.y))
    }

    /// Register a callback invoked after every mutation.
    pub fn on_change(
        &mut self,
        listener: impl FnMut(&TransformChanged) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback registered with [`on_change`](Self::on_change).
    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Open a channel that receives every transform-changed notification.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<TransformChanged> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Drop all listeners and observers.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
        self.observers.clear();
    }

    fn notify(&mut self) {
        let change = TransformChanged::from(&self.state);
        tracing::debug!(
            level = change.level,
            pan_x = change.pan_x,
            pan_y = change.pan_y,
            "Transform changed"
        );
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        self.observers.retain(|tx| tx.send(change).is_ok());
    }

    /// Set the zoom level, clamped into `[min, max]`.
    ///
    /// Returns `false` (and does not notify) if the clamped value equals the
    /// current level. NaN is ignored.
    pub fn set_zoom(&mut self, level: f32) -> bool {
        let clamped = self.state.clamp(level);
        if (clamped - self.state.level).abs() < f32::EPSILON {
            return false;
        }
        self.state.level = clamped;
        self.notify();
        true
    }

    /// Change zoom by `delta` while keeping the canvas point under
    /// `(screen_x, screen_y)` fixed on screen.
    pub fn zoom_at(&mut self, screen_x: f32, screen_y: f32, delta: f32) -> bool {
        if !(screen_x.is_finite() && screen_y.is_finite() && delta.is_finite()) {
            return false;
        }
        let old_level = self.state.level;
        let new_level = self.state.clamp(old_level + delta);
        if (new_level - old_level).abs() < f32::EPSILON {
            return false;
        }

        let origin = self.origin();
        let anchor_x = screen_x - origin.x;
        let anchor_y = screen_y - origin.y;
        let ratio = new_level / old_level;

        self.state.pan_x = anchor_x - (anchor_x - self.state.pan_x) * ratio;
        self.state.pan_y = anchor_y - (anchor_y - self.state.pan_y) * ratio;
        self.state.level = new_level;
        self.notify();
        true
    }

    /// Zoom in by one configured step, anchored at the container center.
    pub fn zoom_in(&mut self) -> bool {
        let (x, y) = self.center();
        self.zoom_at(x, y, self.step)
    }

    /// Zoom out by one configured step, anchored at the container center.
    pub fn zoom_out(&mut self) -> bool {
        let (x, y) = self.center();
        self.zoom_at(x, y, -self.step)
    }

    fn center(&self) -> (f32, f32) {
        self.container.map_or((0.0, 0.0), |c| {
            (c.x + c.width / 2.0, c.y + c.height / 2.0)
        })
    }

    /// Accumulate a pan offset. Always notifies, except that non-finite
    /// offsets are ignored.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.state.pan_x += dx;
        self.state.pan_y += dy;
        self.notify();
    }

    /// Reset to 100% (clamped) with no pan. Always notifies.
    pub fn reset(&mut self) {
        self.state.level = self.state.clamp(1.0);
        self.state.pan_x = 0.0;
        self.state.pan_y = 0.0;
        self.notify();
    }

    /// Change the zoom limits; the current level is re-clamped.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidZoomLimits`] unless both limits are
    /// finite and positive. The previous limits stay in place.
    pub fn set_zoom_limits(&mut self, min: f32, max: f32) -> InteractionResult<()> {
        let (lo, hi) =
            ordered_limits(min, max).ok_or(InteractionError::InvalidZoomLimits { min, max })?;
        self.state.min = lo;
        self.state.max = hi;
        self.state.level = self.state.clamp(self.state.level);
        self.notify();
        Ok(())
    }

    /// Convert a screen position to canvas coordinates.
    #[must_use]
    pub fn screen_to_canvas(&self, x: f32, y: f32) -> Point {
        let origin = self.origin();
        Point::new(
            (x - origin.x - self.state.pan_x) / self.state.level,
            (y - origin.y - self.state.pan_y) / self.state.level,
        )
    }

    /// Convert a canvas position to screen coordinates.
    #[must_use]
    pub fn canvas_to_screen(&self, x: f32, y: f32) -> Point {
        let origin = self.origin();
        Point::new(
            x * self.state.level + self.state.pan_x + origin.x,
            y * self.state.level + self.state.pan_y + origin.y,
        )
    }

    /// Zoom so the canvas content fills the container on its smaller axis,
    /// scaled by the fit padding, and reset pan to the origin.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::MissingReferences`] if references are not
    /// set or either rectangle is empty.
    pub fn fit_to_screen(&mut self) -> InteractionResult<()> {
        let (Some(canvas), Some(container)) = (self.canvas, self.container) else {
            return Err(InteractionError::MissingReferences);
        };
        if canvas.is_empty() || container.is_empty() {
            return Err(InteractionError::MissingReferences);
        }

        let sx = container.width / canvas.width;
        let sy = container.height / canvas.height;
        self.state.level = self.state.clamp(sx.min(sy) * self.fit_padding);
        self.state.pan_x = 0.0;
        self.state.pan_y = 0.0;
        self.notify();
        Ok(())
    }
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn with_container() -> CoordinateTransform {
        let mut transform = CoordinateTransform::new();
        transform.set_references(
            Bounds::new(0.0, 0.0, 2000.0, 1000.0),
            Bounds::new(50.0, 20.0, 800.0, 600.0),
        );
        transform
    }

    #[test]
    fn test_set_zoom_clamps() {
        let mut transform = CoordinateTransform::new();
        assert!(transform.set_zoom(100.0));
        assert!(close(transform.level(), 5.0));
        assert!(transform.set_zoom(0.0));
        assert!(close(transform.level(), 0.1));
    }

    #[test]
    fn test_set_zoom_same_value_does_not_notify() {
        let mut transform = CoordinateTransform::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        transform.on_change(move |_| *counter.borrow_mut() += 1);

        assert!(!transform.set_zoom(1.0));
        assert!(transform.set_zoom(2.0));
        assert!(!transform.set_zoom(2.0));
        // Clamped to the same value as well
        assert!(transform.set_zoom(10.0));
        assert!(!transform.set_zoom(20.0));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_pan_always_notifies() {
        let mut transform = CoordinateTransform::new();
        let rx = transform.subscribe();
        transform.pan(0.0, 0.0);
        transform.pan(10.0, -5.0);
        transform.pan(5.0, 5.0);

        let changes: Vec<_> = rx.try_iter().collect();
        assert_eq!(changes.len(), 3);
        assert!(close(changes[2].pan_x, 15.0));
        assert!(close(changes[2].pan_y, 0.0));
    }

    #[test]
    fn test_zoom_at_preserves_anchor() {
        let mut transform = with_container();
        transform.pan(30.0, -12.0);
        let before = transform.screen_to_canvas(300.0, 250.0);

        assert!(transform.zoom_at(300.0, 250.0, 0.75));
        let after = transform.screen_to_canvas(300.0, 250.0);

        assert!(close(before.x, after.x), "{before:?} vs {after:?}");
        assert!(close(before.y, after.y), "{before:?} vs {after:?}");
        assert!(close(transform.level(), 1.75));
    }

    #[test]
    fn test_zoom_at_clamped_noop() {
        let mut transform = with_container();
        transform.set_zoom(5.0);
        let rx = transform.subscribe();
        assert!(!transform.zoom_at(100.0, 100.0, 1.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_round_trip() {
        let mut transform = with_container();
        transform.set_zoom(2.5);
        transform.pan(-40.0, 13.0);

        let screen = transform.canvas_to_screen(123.0, -77.0);
        let canvas = transform.screen_to_canvas(screen.x, screen.y);
        assert!(close(canvas.x, 123.0));
        assert!(close(canvas.y, -77.0));
    }

    #[test]
    fn test_screen_to_canvas_accounts_for_origin() {
        let transform = with_container();
        let p = transform.screen_to_canvas(50.0, 20.0);
        assert!(close(p.x, 0.0) && close(p.y, 0.0));
    }

    #[test]
    fn test_fit_to_screen() {
        let mut transform = with_container();
        transform.pan(100.0, 100.0);
        transform.fit_to_screen().unwrap();

        // 800 / 2000 = 0.4 on the smaller axis, times padding 0.9
        assert!(close(transform.level(), 0.36));
        assert!(close(transform.state().pan_x, 0.0));
        assert!(close(transform.state().pan_y, 0.0));
    }

    #[test]
    fn test_fit_to_screen_requires_references() {
        let mut transform = CoordinateTransform::new();
        assert!(matches!(
            transform.fit_to_screen(),
            Err(InteractionError::MissingReferences)
        ));
    }

    #[test]
    fn test_zoom_in_out_steps() {
        let mut transform = with_container();
        transform.zoom_in();
        assert!(close(transform.level(), 1.1));
        transform.zoom_out();
        transform.zoom_out();
        assert!(close(transform.level(), 0.9));
    }

    #[test]
    fn test_set_zoom_limits_reclamps() {
        let mut transform = CoordinateTransform::new();
        transform.set_zoom(4.0);
        transform.set_zoom_limits(0.5, 2.0).unwrap();
        assert!(close(transform.level(), 2.0));
    }

    #[test]
    fn test_set_zoom_limits_rejects_invalid() {
        let mut transform = CoordinateTransform::new();
        let rx = transform.subscribe();
        for (min, max) in [(f32::NAN, 5.0), (0.0, 5.0), (-1.0, 2.0), (0.5, f32::INFINITY)] {
            assert!(matches!(
                transform.set_zoom_limits(min, max),
                Err(InteractionError::InvalidZoomLimits { .. })
            ));
        }
        assert!(close(transform.state().min, 0.1));
        assert!(close(transform.state().max, 5.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut transform = with_container();
        let rx = transform.subscribe();
        assert!(!transform.set_zoom(f32::NAN));
        assert!(!transform.zoom_at(100.0, 100.0, f32::NAN));
        assert!(!transform.zoom_at(f32::INFINITY, 100.0, 0.5));
        transform.pan(f32::NAN, 0.0);
        assert!(rx.try_recv().is_err());
        assert!(close(transform.level(), 1.0));
        assert!(close(transform.state().pan_x, 0.0));

        // Infinity is a value like any other and clamps
        assert!(transform.set_zoom(f32::INFINITY));
        assert!(close(transform.level(), 5.0));
    }

    #[test]
    fn test_invalid_config_limits_fall_back() {
        let config = ZoomConfig {
            min: 0.0,
            fit_padding: f32::NAN,
            ..ZoomConfig::default()
        };
        let mut transform = CoordinateTransform::with_config(&config);
        transform.set_references(
            Bounds::new(0.0, 0.0, 2000.0, 1000.0),
            Bounds::new(0.0, 0.0, 800.0, 600.0),
        );
        assert!(close(transform.state().min, 0.1));
        let p = transform.screen_to_canvas(10.0, 10.0);
        assert!(p.x.is_finite() && p.y.is_finite());
        transform.fit_to_screen().unwrap();
        assert!(close(transform.level(), 0.36));
    }

    #[test]
    fn test_zoom_state_swaps_reversed_limits() {
        let state = ZoomState::new(4.0, 0.5);
        assert!(close(state.min, 0.5));
        assert!(close(state.max, 4.0));
        assert!(close(state.level, 1.0));
    }

    #[test]
    fn test_change_payload() {
        let mut transform = CoordinateTransform::new();
        let rx = transform.subscribe();
        transform.set_zoom(1.25);
        let change = rx.try_recv().unwrap();
        assert_eq!(change.percentage, 125);
        assert!(close(change.min_zoom, 0.1));
        assert!(close(change.max_zoom, 5.0));
    }

    #[test]
    fn test_remove_listener() {
        let mut transform = CoordinateTransform::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = transform.on_change(move |_| *counter.borrow_mut() += 1);
        transform.pan(1.0, 1.0);
        assert!(transform.remove_listener(id));
        transform.pan(1.0, 1.0);
        assert_eq!(*count.borrow(), 1);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn value_or_non_finite() -> impl Strategy<Value = f32> {
            prop_oneof![
                8 => -10.0f32..10.0,
                1 => Just(f32::NAN),
                1 => Just(f32::INFINITY),
                1 => Just(f32::NEG_INFINITY),
            ]
        }

        proptest! {
            #[test]
            fn prop_level_always_within_limits(
                ops in prop::collection::vec(
                    (0u8..5, value_or_non_finite(), value_or_non_finite(), 0.0f32..800.0),
                    0..30,
                )
            ) {
                let mut transform = with_container();
                for (op, value, other, x) in ops {
                    match op {
                        0 => { transform.set_zoom(value); }
                        1 => { transform.zoom_at(x, 300.0, value); }
                        2 => transform.pan(value, -value),
                        3 => { let _ = transform.set_zoom_limits(value, other); }
                        _ => { let _ = transform.fit_to_screen(); }
                    }
                    let state = transform.state();
                    prop_assert!(state.min > 0.0 && state.max.is_finite());
                    prop_assert!(state.min <= state.level && state.level <= state.max,
                        "level {} escaped [{}, {}]", state.level, state.min, state.max);
                }
            }

            #[test]
            fn prop_canvas_screen_round_trip(
                level in 0.1f32..5.0,
                pan_x in -500.0f32..500.0,
                pan_y in -500.0f32..500.0,
                x in -1000.0f32..1000.0,
                y in -1000.0f32..1000.0,
            ) {
                let mut transform = with_container();
                transform.set_zoom(level);
                transform.pan(pan_x, pan_y);
                let screen = transform.canvas_to_screen(x, y);
                let back = transform.screen_to_canvas(screen.x, screen.y);
                prop_assert!((back.x - x).abs() < 1e-2, "x {} -> {}", x, back.x);
                prop_assert!((back.y - y).abs() < 1e-2, "y {} -> {}", y, back.y);
            }

            #[test]
            fn prop_zoom_at_preserves_anchor(
                start in 0.2f32..4.0,
                delta in -2.0f32..2.0,
                x in 50.0f32..850.0,
                y in 20.0f32..620.0,
            ) {
                let mut transform = with_container();
                transform.set_zoom(start);
                let before = transform.screen_to_canvas(x, y);
                transform.zoom_at(x, y, delta);
                let after = transform.screen_to_canvas(x, y);
                prop_assert!((before.x - after.x).abs() < 1e-2);
                prop_assert!((before.y - after.y).abs() < 1e-2);
            }
        }
    }
}
