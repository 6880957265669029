use crate::core::Rect;

use super::PlotId;

/// Handle returned by every `on_*` subscription; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Why a master's visible rect moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectChangeOrigin {
    /// Fit or explicit rect applied by a layout pass.
    Layout,
    /// Gesture, animation tick or `set_visible_rect`.
    Navigation,
    /// Pushed from a bound master.
    Binding,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRectChanged {
    pub master: PlotId,
    pub rect: Rect,
    /// `false` for the final frame of an animation and for static changes.
    pub is_animating: bool,
    pub origin: RectChangeOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildrenChanged {
    pub master: PlotId,
    pub parent: PlotId,
    pub added: Option<PlotId>,
    pub removed: Option<PlotId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppearanceChanged {
    pub master: PlotId,
    pub plot: PlotId,
}

type Handler<E> = Box<dyn FnMut(&E)>;

/// Ordered handler list for one notification kind.
pub(crate) struct Subscribers<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> Subscribers<E> {
    fn insert(&mut self, id: SubscriptionId, handler: Handler<E>) {
        self.handlers.push((id, handler));
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }
}

/// Typed subscription lists owned by one master.
#[derive(Default)]
pub(crate) struct EventHub {
    next_id: u64,
    visible_rect_changed: Subscribers<VisibleRectChanged>,
    children_changed: Subscribers<ChildrenChanged>,
    appearance_changed: Subscribers<AppearanceChanged>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("visible_rect_changed", &self.visible_rect_changed.len())
            .field("children_changed", &self.children_changed.len())
            .field("appearance_changed", &self.appearance_changed.len())
            .finish()
    }
}

impl EventHub {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub(crate) fn on_visible_rect_changed(
        &mut self,
        handler: Box<dyn FnMut(&VisibleRectChanged)>,
    ) -> SubscriptionId {
        let id = self.allocate();
        self.visible_rect_changed.insert(id, handler);
        id
    }

    pub(crate) fn on_children_changed(
        &mut self,
        handler: Box<dyn FnMut(&ChildrenChanged)>,
    ) -> SubscriptionId {
        let id = self.allocate();
        self.children_changed.insert(id, handler);
        id
    }

    pub(crate) fn on_appearance_changed(
        &mut self,
        handler: Box<dyn FnMut(&AppearanceChanged)>,
    ) -> SubscriptionId {
        let id = self.allocate();
        self.appearance_changed.insert(id, handler);
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.visible_rect_changed.remove(id)
            || self.children_changed.remove(id)
            || self.appearance_changed.remove(id)
    }

    pub(crate) fn emit_visible_rect_changed(&mut self, event: &VisibleRectChanged) {
        self.visible_rect_changed.emit(event);
    }

    pub(crate) fn emit_children_changed(&mut self, event: &ChildrenChanged) {
        self.children_changed.emit(event);
    }

    pub(crate) fn emit_appearance_changed(&mut self, event: &AppearanceChanged) {
        self.appearance_changed.emit(event);
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.visible_rect_changed.len() + self.children_changed.len() + self.appearance_changed.len()
    }
}
