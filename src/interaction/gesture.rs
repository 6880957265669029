//! Normalized gestures and the per-device state machines that produce them.
//!
//! Raw pointer, wheel and touch events are decoded by the host. Each input
//! device gets a small explicit state machine (`Idle` / `Dragging` for a mouse,
//! `Idle` / `Panning` / `Pinching` for touch) that turns those events into
//! [`Gesture`]s. [`GestureStream`] is the merge step: it collects timestamped
//! gestures from any number of sources, applies per-source axis restrictions
//! and hands them out in time order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::core::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GestureSourceId(u32);

impl GestureSourceId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gesture {
    /// Pointer movement since the previous sample, in screen pixels with y
    /// pointing down.
    ///
    /// The content follows the pointer: the plot point under the pointer when
    /// the drag started stays under it, so the viewport moves the opposite way
    /// on x and the same way on plot y.
    Pan {
        dx: f64,
        dy: f64,
        source: GestureSourceId,
    },
    /// Multiplicative zoom about a screen-space origin; `scale_factor < 1` zooms in.
    Zoom {
        origin_x: f64,
        origin_y: f64,
        scale_factor: f64,
        source: GestureSourceId,
        prevent_horizontal: bool,
        prevent_vertical: bool,
    },
    /// Start of a new discrete interaction; stops any running animation.
    Pin { source: GestureSourceId },
}

impl Gesture {
    #[must_use]
    pub fn source(self) -> GestureSourceId {
        match self {
            Self::Pan { source, .. } | Self::Zoom { source, .. } | Self::Pin { source } => source,
        }
    }

    #[must_use]
    pub fn zoom(origin: Point, scale_factor: f64, source: GestureSourceId) -> Self {
        Self::Zoom {
            origin_x: origin.x,
            origin_y: origin.y,
            scale_factor,
            source,
            prevent_horizontal: false,
            prevent_vertical: false,
        }
    }

    /// Confines the gesture to one axis.
    ///
    /// Pans lose their orthogonal component; zooms get the orthogonal
    /// `prevent_*` flag so they cannot resize the other axis.
    #[must_use]
    pub fn restricted_to(self, restriction: AxisRestriction) -> Self {
        match (self, restriction) {
            (gesture, AxisRestriction::None) | (gesture @ Self::Pin { .. }, _) => gesture,
            (Self::Pan { dx, source, .. }, AxisRestriction::Horizontal) => Self::Pan {
                dx,
                dy: 0.0,
                source,
            },
            (Self::Pan { dy, source, .. }, AxisRestriction::Vertical) => Self::Pan {
                dx: 0.0,
                dy,
                source,
            },
            (
                Self::Zoom {
                    origin_x,
                    origin_y,
                    scale_factor,
                    source,
                    prevent_horizontal,
                    prevent_vertical,
                },
                axis,
            ) => Self::Zoom {
                origin_x,
                origin_y,
                scale_factor,
                source,
                prevent_horizontal: prevent_horizontal || axis == AxisRestriction::Vertical,
                prevent_vertical: prevent_vertical || axis == AxisRestriction::Horizontal,
            },
        }
    }
}

/// Axis an input source is allowed to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisRestriction {
    #[default]
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedGesture {
    pub timestamp_ms: f64,
    pub gesture: Gesture,
}

impl TimedGesture {
    #[must_use]
    pub const fn new(timestamp_ms: f64, gesture: Gesture) -> Self {
        Self {
            timestamp_ms,
            gesture,
        }
    }
}

pub type GestureBatch = SmallVec<[TimedGesture; 2]>;

/// Scale factor for one wheel notch: positive deltas zoom in.
///
/// Both directions use the same factor, reciprocated, so a notch in and a
/// notch out cancel exactly.
#[must_use]
pub fn wheel_scale_factor(delta: f64, zoom_level_factor: f64) -> Option<f64> {
    if delta > 0.0 {
        Some(1.0 / zoom_level_factor)
    } else if delta < 0.0 {
        Some(zoom_level_factor)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerState {
    Idle,
    Dragging { last: Point },
}

/// Mouse-style input: press-drag-release pans, wheel zooms.
#[derive(Debug, Clone)]
pub struct PointerGestureSource {
    id: GestureSourceId,
    zoom_level_factor: f64,
    state: PointerState,
}

impl PointerGestureSource {
    #[must_use]
    pub fn new(id: GestureSourceId, zoom_level_factor: f64) -> Self {
        Self {
            id,
            zoom_level_factor,
            state: PointerState::Idle,
        }
    }

    #[must_use]
    pub fn id(&self) -> GestureSourceId {
        self.id
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PointerState::Dragging { .. })
    }

    pub fn pointer_down(&mut self, timestamp_ms: f64, position: Point) -> GestureBatch {
        self.state = PointerState::Dragging { last: position };
        let mut batch = GestureBatch::new();
        batch.push(TimedGesture::new(timestamp_ms, Gesture::Pin { source: self.id }));
        batch
    }

    pub fn pointer_move(&mut self, timestamp_ms: f64, position: Point) -> GestureBatch {
        let mut batch = GestureBatch::new();
        if let PointerState::Dragging { last } = &mut self.state {
            let dx = position.x - last.x;
            let dy = position.y - last.y;
            *last = position;
            if dx != 0.0 || dy != 0.0 {
                batch.push(TimedGesture::new(
                    timestamp_ms,
                    Gesture::Pan {
                        dx,
                        dy,
                        source: self.id,
                    },
                ));
            }
        }
        batch
    }

    pub fn pointer_up(&mut self) {
        self.state = PointerState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.state = PointerState::Idle;
    }

    pub fn wheel(&mut self, timestamp_ms: f64, position: Point, delta: f64) -> GestureBatch {
        let mut batch = GestureBatch::new();
        if let Some(scale_factor) = wheel_scale_factor(delta, self.zoom_level_factor) {
            batch.push(TimedGesture::new(
                timestamp_ms,
                Gesture::zoom(position, scale_factor, self.id),
            ));
        }
        batch
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Point,
}

impl TouchPoint {
    #[must_use]
    pub const fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TouchState {
    Idle,
    Panning { id: u64, last: Point },
    Pinching { first: u64, second: u64, last_distance: f64 },
}

/// Touch input: one finger pans, two fingers pinch-zoom about their midpoint.
#[derive(Debug, Clone)]
pub struct TouchGestureSource {
    id: GestureSourceId,
    state: TouchState,
}

impl TouchGestureSource {
    #[must_use]
    pub fn new(id: GestureSourceId) -> Self {
        Self {
            id,
            state: TouchState::Idle,
        }
    }

    #[must_use]
    pub fn id(&self) -> GestureSourceId {
        self.id
    }

    /// Called with every touch currently on the surface after a touch starts.
    pub fn touch_start(&mut self, timestamp_ms: f64, touches: &[TouchPoint]) -> GestureBatch {
        self.reset_from(touches);
        let mut batch = GestureBatch::new();
        if !matches!(self.state, TouchState::Idle) {
            batch.push(TimedGesture::new(timestamp_ms, Gesture::Pin { source: self.id }));
        }
        batch
    }

    pub fn touch_move(&mut self, timestamp_ms: f64, touches: &[TouchPoint]) -> GestureBatch {
        let mut batch = GestureBatch::new();
        match &mut self.state {
            TouchState::Idle => {}
            TouchState::Panning { id, last } => {
                if let Some(touch) = touches.iter().find(|touch| touch.id == *id) {
                    let dx = touch.position.x - last.x;
                    let dy = touch.position.y - last.y;
                    *last = touch.position;
                    if dx != 0.0 || dy != 0.0 {
                        batch.push(TimedGesture::new(
                            timestamp_ms,
                            Gesture::Pan {
                                dx,
                                dy,
                                source: self.id,
                            },
                        ));
                    }
                }
            }
            TouchState::Pinching {
                first,
                second,
                last_distance,
            } => {
                let a = touches.iter().find(|touch| touch.id == *first);
                let b = touches.iter().find(|touch| touch.id == *second);
                if let (Some(a), Some(b)) = (a, b) {
                    let distance = a.position.distance_to(b.position);
                    if distance > 0.0 && *last_distance > 0.0 && distance != *last_distance {
                        let origin = Point::new(
                            (a.position.x + b.position.x) / 2.0,
                            (a.position.y + b.position.y) / 2.0,
                        );
                        let scale_factor = *last_distance / distance;
                        *last_distance = distance;
                        batch.push(TimedGesture::new(
                            timestamp_ms,
                            Gesture::zoom(origin, scale_factor, self.id),
                        ));
                    }
                }
            }
        }
        batch
    }

    /// Called with the touches that remain after one or more were lifted.
    pub fn touch_end(&mut self, timestamp_ms: f64, remaining: &[TouchPoint]) -> GestureBatch {
        let was_pinching = matches!(self.state, TouchState::Pinching { .. });
        self.reset_from(remaining);
        let mut batch = GestureBatch::new();
        // Lifting one finger of a pinch starts a fresh pan from the other.
        if was_pinching && matches!(self.state, TouchState::Panning { .. }) {
            batch.push(TimedGesture::new(timestamp_ms, Gesture::Pin { source: self.id }));
        }
        batch
    }

    fn reset_from(&mut self, touches: &[TouchPoint]) {
        self.state = match touches {
            [] => TouchState::Idle,
            [only] => TouchState::Panning {
                id: only.id,
                last: only.position,
            },
            [a, b, ..] => TouchState::Pinching {
                first: a.id,
                second: b.id,
                last_distance: a.position.distance_to(b.position),
            },
        };
    }
}

/// Time-ordered merge of gestures from several sources.
#[derive(Debug, Clone, Default)]
pub struct GestureStream {
    pending: Vec<(f64, u64, Gesture)>,
    next_seq: u64,
    restrictions: IndexMap<GestureSourceId, AxisRestriction>,
}

impl GestureStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confines every future gesture from `source` to one axis.
    pub fn restrict_source(&mut self, source: GestureSourceId, restriction: AxisRestriction) {
        self.restrictions.insert(source, restriction);
    }

    #[must_use]
    pub fn restriction_of(&self, source: GestureSourceId) -> AxisRestriction {
        self.restrictions.get(&source).copied().unwrap_or_default()
    }

    pub fn push(&mut self, timed: TimedGesture) {
        let restriction = self.restriction_of(timed.gesture.source());
        let gesture = timed.gesture.restricted_to(restriction);
        trace!(?gesture, timestamp_ms = timed.timestamp_ms, "gesture queued");
        self.pending.push((timed.timestamp_ms, self.next_seq, gesture));
        self.next_seq += 1;
    }

    pub fn extend<I: IntoIterator<Item = TimedGesture>>(&mut self, gestures: I) {
        for timed in gestures {
            self.push(timed);
        }
    }

    /// Moves every queued gesture of `other` into this stream.
    ///
    /// Gestures keep their timestamps; `other`'s axis restrictions were
    /// already applied when they were queued there.
    pub fn merge(&mut self, other: &mut Self) {
        let mut taken = std::mem::take(&mut other.pending);
        taken.sort_by(|a, b| a.1.cmp(&b.1));
        for (timestamp_ms, _, gesture) in taken {
            self.pending.push((timestamp_ms, self.next_seq, gesture));
            self.next_seq += 1;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Removes all queued gestures ordered by timestamp, then arrival.
    pub fn drain(&mut self) -> Vec<Gesture> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        pending.into_iter().map(|(_, _, gesture)| gesture).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AxisRestriction, Gesture, GestureSourceId, wheel_scale_factor};

    #[test]
    fn wheel_directions_are_reciprocal() {
        let zoom_in = wheel_scale_factor(1.0, 1.2).expect("zoom in");
        let zoom_out = wheel_scale_factor(-3.0, 1.2).expect("zoom out");
        assert!((zoom_in * zoom_out - 1.0).abs() <= 1e-12);
        assert!(wheel_scale_factor(0.0, 1.2).is_none());
    }

    #[test]
    fn pin_is_never_restricted() {
        let pin = Gesture::Pin {
            source: GestureSourceId::new(1),
        };
        assert_eq!(pin.restricted_to(AxisRestriction::Vertical), pin);
    }
}
