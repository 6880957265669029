use serde::{Deserialize, Serialize};

use crate::core::{CoordinateTransform, Rect, ScreenRect, ScreenSize};
use crate::interaction::{GestureStream, NavigationController};
use crate::render::{Plot, SurfaceMode};

use super::events::{EventHub, RectChangeOrigin};

/// Stable identity of a plot inside a [`Composition`](super::Composition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotId(u32);

impl PlotId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// One-shot fit requested through `fit_to_view_x`/`fit_to_view_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FitRequest {
    pub(crate) x: bool,
    pub(crate) y: bool,
}

impl FitRequest {
    pub(crate) fn any(self) -> bool {
        self.x || self.y
    }
}

pub(crate) struct PlotNode {
    pub(crate) parent: Option<PlotId>,
    pub(crate) master: PlotId,
    pub(crate) children: Vec<PlotId>,
    pub(crate) plot: Box<dyn Plot>,
    /// `None` until computed; dropped by `invalidate_local_bounds`.
    pub(crate) cached_bounds: Option<Option<Rect>>,
    pub(crate) requests_render: bool,
    pub(crate) arranged_rect: ScreenRect,
    pub(crate) master_state: Option<MasterState>,
}

impl PlotNode {
    pub(crate) fn new(id: PlotId, plot: Box<dyn Plot>, master_state: MasterState) -> Self {
        Self {
            parent: None,
            master: id,
            children: Vec::new(),
            plot,
            cached_bounds: None,
            requests_render: true,
            arranged_rect: ScreenRect::from_size(master_state.screen_size),
            master_state: Some(master_state),
        }
    }
}

/// State owned exclusively by the root of a tree.
pub(crate) struct MasterState {
    pub(crate) transform: CoordinateTransform,
    pub(crate) screen_size: ScreenSize,
    pub(crate) aspect_ratio: Option<f64>,
    pub(crate) auto_fit: bool,
    pub(crate) fit_request: FitRequest,
    /// Rect mapped onto the full screen when auto fit is off.
    pub(crate) explicit_rect: Rect,
    pub(crate) visible_rect: Rect,
    /// Rect and animating flag of the last visible-rect notification.
    pub(crate) last_notified: Option<(Rect, bool)>,
    pub(crate) requests_update_layout: bool,
    pub(crate) frame_pending: bool,
    /// Set when the pending rect came from a bound master.
    pub(crate) suppress_binding_echo: bool,
    /// Set when this tree's own navigation or fit changed the rect since the
    /// last notification; an update pushed in meanwhile still gets broadcast.
    pub(crate) own_change_pending: bool,
    pub(crate) is_animating_frame: bool,
    pub(crate) change_origin: RectChangeOrigin,
    pub(crate) navigation: NavigationController,
    pub(crate) gestures: Option<GestureStream>,
    pub(crate) has_viewport_provider: bool,
    pub(crate) surface_mode: SurfaceMode,
    pub(crate) events: EventHub,
}

impl MasterState {
    pub(crate) fn new(
        screen_size: ScreenSize,
        aspect_ratio: Option<f64>,
        surface_mode: SurfaceMode,
        navigation: NavigationController,
    ) -> Self {
        let explicit_rect = Rect::UNIT;
        let transform = CoordinateTransform::for_screen(explicit_rect, screen_size, aspect_ratio);
        Self {
            transform,
            screen_size,
            aspect_ratio,
            auto_fit: true,
            fit_request: FitRequest::default(),
            explicit_rect,
            visible_rect: transform.plot_rect(ScreenRect::from_size(screen_size)),
            last_notified: None,
            requests_update_layout: true,
            frame_pending: false,
            suppress_binding_echo: false,
            own_change_pending: false,
            is_animating_frame: false,
            change_origin: RectChangeOrigin::Layout,
            navigation,
            gestures: None,
            has_viewport_provider: false,
            surface_mode,
            events: EventHub::default(),
        }
    }

    /// Maps `rect` onto the full screen and refreshes the derived visible rect.
    pub(crate) fn apply_explicit_rect(&mut self, rect: Rect) {
        self.explicit_rect = rect;
        self.transform =
            CoordinateTransform::for_screen(rect, self.screen_size, self.aspect_ratio);
        self.refresh_visible_rect();
    }

    pub(crate) fn apply_transform(&mut self, transform: CoordinateTransform) {
        self.transform = transform;
        self.refresh_visible_rect();
        self.explicit_rect = self.visible_rect;
    }

    fn refresh_visible_rect(&mut self) {
        self.visible_rect = self
            .transform
            .plot_rect(ScreenRect::from_size(self.screen_size));
    }
}
