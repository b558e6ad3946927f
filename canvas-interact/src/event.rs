//! Input and output events for the interaction engine.
//!
//! Raw input arrives as [`InputEvent`]s in screen space. Recognized intents
//! leave the engine as [`GestureEvent`], [`VoiceEvent`] and [`FusedEvent`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Pointer pressed (finger down).
    Down,
    /// Pointer moved while pressed.
    Move,
    /// Pointer released.
    Up,
    /// Pointer cancelled (e.g., palm rejection).
    Cancel,
}

/// A raw pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Pointer identifier (for multi-touch).
    pub pointer_id: u32,
    /// X position in screen coordinates.
    pub screen_x: f32,
    /// Y position in screen coordinates.
    pub screen_y: f32,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Pressure (0.0 to 1.0, if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
}

impl PointerInput {
    /// Create a new pointer event without pressure information.
    #[must_use]
    pub fn new(
        phase: PointerPhase,
        pointer_id: u32,
        screen_x: f32,
        screen_y: f32,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            phase,
            pointer_id,
            screen_x,
            screen_y,
            timestamp_ms,
            pressure: None,
        }
    }

    /// Pointer down.
    #[must_use]
    pub fn down(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Down, pointer_id, x, y, timestamp_ms)
    }

    /// Pointer move.
    #[must_use]
    pub fn moved(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Move, pointer_id, x, y, timestamp_ms)
    }

    /// Pointer up.
    #[must_use]
    pub fn up(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Up, pointer_id, x, y, timestamp_ms)
    }

    /// Pointer cancel.
    #[must_use]
    pub fn cancel(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Cancel, pointer_id, x, y, timestamp_ms)
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle (radians) of the vector from `self` to `other`, in screen
    /// orientation (y grows downward).
    #[must_use]
    pub fn angle_to(self, other: Self) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A pointer sample in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Pointer identifier.
    pub pointer_id: u32,
    /// X position in canvas coordinates.
    pub x: f32,
    /// Y position in canvas coordinates.
    pub y: f32,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Pressure (0.0 to 1.0, if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
}

impl PointerSample {
    /// Create a sample without pressure information.
    #[must_use]
    pub fn new(pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self {
            pointer_id,
            x,
            y,
            timestamp_ms,
            pressure: None,
        }
    }

    /// Position of this sample.
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

fn default_true() -> bool {
    true
}

/// A transcript chunk from the speech source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Recognized text.
    pub text: String,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
    /// Whether this is a final (committed) result.
    #[serde(default = "default_true")]
    pub is_final: bool,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl Transcript {
    /// Create a final transcript chunk.
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f32, timestamp_ms: u64) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: true,
            timestamp_ms,
        }
    }

    /// Create an interim transcript chunk.
    #[must_use]
    pub fn interim(text: impl Into<String>, confidence: f32, timestamp_ms: u64) -> Self {
        Self {
            is_final: false,
            ..Self::new(text, confidence, timestamp_ms)
        }
    }
}

/// All raw input the engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum InputEvent {
    /// Pointer or touch input.
    Pointer(PointerInput),
    /// Speech transcript chunk.
    Transcript(Transcript),
}

impl InputEvent {
    /// Timestamp of the underlying event.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Pointer(p) => p.timestamp_ms,
            Self::Transcript(t) => t.timestamp_ms,
        }
    }
}

/// Kinds of gesture the built-in detectors recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureType {
    /// Short press with little movement.
    Tap,
    /// Held press with little movement.
    LongPress,
    /// Directional single-pointer stroke.
    Swipe,
    /// Two-pointer spread or squeeze.
    Pinch,
    /// Two-pointer twist.
    Rotate,
}

impl GestureType {
    /// Canonical gesture name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::LongPress => "long-press",
            Self::Swipe => "swipe",
            Self::Pinch => "pinch",
            Self::Rotate => "rotate",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown gesture name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown gesture type: {0}")]
pub struct UnknownGesture(pub String);

impl FromStr for GestureType {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tap" => Ok(Self::Tap),
            "long-press" | "longpress" | "long_press" => Ok(Self::LongPress),
            "swipe" => Ok(Self::Swipe),
            "pinch" => Ok(Self::Pinch),
            "rotate" => Ok(Self::Rotate),
            other => Err(UnknownGesture(other.to_string())),
        }
    }
}

/// Direction bucket of a swipe.
///
/// "Up" means toward the top of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwipeDirection {
    /// Toward +x.
    Right,
    /// Toward +x, -y.
    UpRight,
    /// Toward -y.
    Up,
    /// Toward -x, -y.
    UpLeft,
    /// Toward -x.
    Left,
    /// Toward -x, +y.
    DownLeft,
    /// Toward +y.
    Down,
    /// Toward +x, +y.
    DownRight,
}

impl SwipeDirection {
    const EIGHT: [Self; 8] = [
        Self::Right,
        Self::UpRight,
        Self::Up,
        Self::UpLeft,
        Self::Left,
        Self::DownLeft,
        Self::Down,
        Self::DownRight,
    ];
    const FOUR: [Self; 4] = [Self::Right, Self::Up, Self::Left, Self::Down];

    /// Classify a displacement vector (screen orientation) into one of four
    /// sectors, or eight when `eight` is set.
    #[must_use]
    pub fn from_vector(dx: f32, dy: f32, eight: bool) -> Self {
        // Flip y so that angles grow counter-clockwise with "up" at +90 degrees.
        let angle = (-dy).atan2(dx).rem_euclid(std::f32::consts::TAU);
        let table: &[Self] = if eight { &Self::EIGHT } else { &Self::FOUR };
        #[allow(clippy::cast_precision_loss)]
        let sector = std::f32::consts::TAU / table.len() as f32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = ((angle + sector / 2.0) / sector).floor() as usize % table.len();
        table[index]
    }
}

/// Kind-specific parameters of a recognized gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", content = "data", rename_all = "kebab-case")]
pub enum GestureDetail {
    /// Short press.
    Tap {
        /// Release position.
        position: Point,
    },
    /// Held press.
    LongPress {
        /// Press position.
        position: Point,
        /// How long the pointer was held, in milliseconds.
        duration_ms: u64,
    },
    /// Directional stroke.
    Swipe {
        /// Direction bucket.
        direction: SwipeDirection,
        /// Start-to-end displacement in canvas units.
        distance: f32,
        /// Distance per millisecond.
        velocity: f32,
    },
    /// Two-pointer spread or squeeze.
    Pinch {
        /// Final over initial inter-pointer distance.
        scale: f32,
        /// Change in angle of the inter-pointer vector (radians).
        rotation: f32,
        /// Final midpoint between the pointers.
        center: Point,
    },
    /// Two-pointer twist.
    Rotate {
        /// Change in angle of the inter-pointer vector (radians).
        rotation: f32,
        /// Final over initial inter-pointer distance.
        scale: f32,
        /// Final midpoint between the pointers.
        center: Point,
    },
}

/// The result of a detector accepting a candidate.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureMatch {
    /// Kind-specific parameters.
    pub detail: GestureDetail,
    /// Pointers that took part.
    pub pointer_ids: Vec<u32>,
    /// Sample positions in arrival order, canvas coordinates.
    pub points: Vec<Point>,
    /// First sample timestamp.
    pub start_ms: u64,
    /// Last sample timestamp (or evaluation time for timer-driven matches).
    pub end_ms: u64,
}

impl GestureMatch {
    /// Kind of this match.
    #[must_use]
    pub fn gesture_type(&self) -> GestureType {
        match self.detail {
            GestureDetail::Tap { .. } => GestureType::Tap,
            GestureDetail::LongPress { .. } => GestureType::LongPress,
            GestureDetail::Swipe { .. } => GestureType::Swipe,
            GestureDetail::Pinch { .. } => GestureType::Pinch,
            GestureDetail::Rotate { .. } => GestureType::Rotate,
        }
    }

    /// Elapsed time between first and last sample.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Swipe direction, if this is a swipe.
    #[must_use]
    pub fn direction(&self) -> Option<SwipeDirection> {
        match self.detail {
            GestureDetail::Swipe { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Swipe distance, if this is a swipe.
    #[must_use]
    pub fn distance(&self) -> Option<f32> {
        match self.detail {
            GestureDetail::Swipe { distance, .. } => Some(distance),
            _ => None,
        }
    }

    /// Swipe velocity, if this is a swipe.
    #[must_use]
    pub fn velocity(&self) -> Option<f32> {
        match self.detail {
            GestureDetail::Swipe { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    /// Scale factor, if this is a two-pointer gesture.
    #[must_use]
    pub fn scale(&self) -> Option<f32> {
        match self.detail {
            GestureDetail::Pinch { scale, .. } | GestureDetail::Rotate { scale, .. } => Some(scale),
            _ => None,
        }
    }

    /// Rotation in radians, if this is a two-pointer gesture.
    #[must_use]
    pub fn rotation(&self) -> Option<f32> {
        match self.detail {
            GestureDetail::Pinch { rotation, .. } | GestureDetail::Rotate { rotation, .. } => {
                Some(rotation)
            }
            _ => None,
        }
    }
}

/// A recognized gesture delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    /// Gesture name.
    pub gesture: GestureType,
    /// Match parameters.
    pub matched: GestureMatch,
}

impl GestureEvent {
    /// Wrap a match into an event.
    #[must_use]
    pub fn new(matched: GestureMatch) -> Self {
        Self {
            gesture: matched.gesture_type(),
            matched,
        }
    }

    /// Timestamp used for fusion (end of the gesture).
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.matched.end_ms
    }
}

/// A matched voice command delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceEvent {
    /// Command name the pattern was registered under.
    pub name: String,
    /// Transcript text as received.
    pub transcript: String,
    /// Confidence of the recognition.
    pub confidence: f32,
    /// Timestamp of the transcript chunk.
    pub timestamp_ms: u64,
    /// Named captures from regular-expression patterns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub captures: BTreeMap<String, String>,
}

/// A compound voice + gesture match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEvent {
    /// Binding name.
    pub name: String,
    /// The voice half.
    pub voice: VoiceEvent,
    /// The gesture half.
    pub gesture: GestureEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_geometry() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < f32::EPSILON);
        assert_eq!(a.midpoint(b), Point::new(1.5, 2.0));
        assert!((a.angle_to(Point::new(0.0, 1.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_swipe_direction_four_buckets() {
        assert_eq!(SwipeDirection::from_vector(50.0, 0.0, false), SwipeDirection::Right);
        assert_eq!(SwipeDirection::from_vector(-50.0, 5.0, false), SwipeDirection::Left);
        assert_eq!(SwipeDirection::from_vector(0.0, -50.0, false), SwipeDirection::Up);
        assert_eq!(SwipeDirection::from_vector(3.0, 50.0, false), SwipeDirection::Down);
        // 40 degrees above the x axis still reads as right
        assert_eq!(SwipeDirection::from_vector(50.0, -42.0, false), SwipeDirection::Right);
    }

    #[test]
    fn test_swipe_direction_eight_buckets() {
        assert_eq!(SwipeDirection::from_vector(50.0, -50.0, true), SwipeDirection::UpRight);
        assert_eq!(SwipeDirection::from_vector(-50.0, 50.0, true), SwipeDirection::DownLeft);
        assert_eq!(SwipeDirection::from_vector(50.0, 0.0, true), SwipeDirection::Right);
        assert_eq!(SwipeDirection::from_vector(50.0, 1.0, true), SwipeDirection::Right);
    }

    #[test]
    fn test_gesture_type_names_round_trip() {
        for kind in [
            GestureType::Tap,
            GestureType::LongPress,
            GestureType::Swipe,
            GestureType::Pinch,
            GestureType::Rotate,
        ] {
            assert_eq!(kind.as_str().parse::<GestureType>(), Ok(kind));
        }
        assert_eq!(" Long_Press ".parse::<GestureType>(), Ok(GestureType::LongPress));
        assert!("wave".parse::<GestureType>().is_err());
    }

    #[test]
    fn test_gesture_type_serde_name() {
        let json = serde_json::to_string(&GestureType::LongPress).unwrap();
        assert_eq!(json, "\"long-press\"");
    }

    #[test]
    fn test_input_event_json_shape() {
        let json =
            r#"{"type":"transcript","data":{"text":"go","confidence":0.9,"timestamp_ms":10}}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        match event {
            InputEvent::Transcript(t) => {
                assert_eq!(t.text, "go");
                assert!(t.is_final);
            }
            InputEvent::Pointer(_) => panic!("Expected transcript"),
        }
    }

    #[test]
    fn test_match_accessors() {
        let matched = GestureMatch {
            detail: GestureDetail::Swipe {
                direction: SwipeDirection::Left,
                distance: 80.0,
                velocity: 0.4,
            },
            pointer_ids: vec![1],
            points: vec![Point::new(100.0, 0.0), Point::new(20.0, 0.0)],
            start_ms: 100,
            end_ms: 300,
        };
        assert_eq!(matched.gesture_type(), GestureType::Swipe);
        assert_eq!(matched.direction(), Some(SwipeDirection::Left));
        assert_eq!(matched.duration_ms(), 200);
        assert!(matched.scale().is_none());

        let event = GestureEvent::new(matched);
        assert_eq!(event.gesture, GestureType::Swipe);
        assert_eq!(event.timestamp_ms(), 300);
    }
}
