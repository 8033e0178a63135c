//! Marker interaction state machine for the listings map.
//!
//! Pointer devices get hover previews and click-to-navigate. Touch devices
//! get two-tap semantics: the first tap opens an in-place overlay, a second
//! tap on the same marker navigates. At most one marker is open at a time.
//!
//! The controller does no rendering. Each event returns the effects the
//! surface should apply, in order.

use std::time::Duration;

/// Delay before a hover preview hides after the cursor leaves the marker.
pub const HOVER_GRACE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Pointer,
    Touch,
}

/// Cursor position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPosition {
    pub x: f64,
    pub y: f64,
}

/// The single shared marker slot of a map instance.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerState<Id> {
    Closed,
    Hovering { id: Id, position: ScreenPosition },
    Open(Id),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent<Id> {
    MouseOver { id: Id, position: ScreenPosition },
    MouseOut { id: Id },
    /// A previously scheduled hide fired.
    HideTimerElapsed { token: u64 },
    Click { id: Id },
    Tap { id: Id },
    /// Click or tap on the map itself, not on a marker.
    BackgroundTap,
    /// Overlay button: view business details.
    ViewDetails { id: Id },
    /// Overlay button: open the external navigation link.
    OpenNavigation { id: Id },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEffect<Id> {
    ShowPreview { id: Id, position: ScreenPosition },
    /// Deliver `HideTimerElapsed { token }` after `after`.
    ScheduleHide { token: u64, after: Duration },
    HidePreview { id: Id },
    OpenOverlay { id: Id },
    CloseOverlay { id: Id },
    Navigate { id: Id },
    OpenExternal { id: Id },
}

/// Per-map interaction controller.
#[derive(Debug)]
pub struct MapInteractionController<Id> {
    device: DeviceKind,
    state: MarkerState<Id>,
    grace: Duration,
    next_token: u64,
    pending_hide: Option<u64>,
}

impl<Id: Clone + PartialEq> MapInteractionController<Id> {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            state: MarkerState::Closed,
            grace: HOVER_GRACE,
            next_token: 0,
            pending_hide: None,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    pub fn state(&self) -> &MarkerState<Id> {
        &self.state
    }

    /// The marker whose overlay is open, if any.
    pub fn open_marker(&self) -> Option<&Id> {
        match &self.state {
            MarkerState::Open(id) => Some(id),
            _ => None,
        }
    }

    pub fn hovered_marker(&self) -> Option<&Id> {
        match &self.state {
            MarkerState::Hovering { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Back to `Closed` without emitting effects (map unmount / remount).
    pub fn reset(&mut self) {
        self.state = MarkerState::Closed;
        self.pending_hide = None;
    }

    pub fn handle(&mut self, event: MapEvent<Id>) -> Vec<MapEffect<Id>> {
        match event {
            MapEvent::MouseOver { id, position } => self.mouse_over(id, position),
            MapEvent::MouseOut { id } => self.mouse_out(id),
            MapEvent::HideTimerElapsed { token } => self.hide_elapsed(token),
            MapEvent::Click { id } | MapEvent::Tap { id } => match self.device {
                DeviceKind::Pointer => self.navigate(id),
                DeviceKind::Touch => self.tap(id),
            },
            MapEvent::BackgroundTap => self.dismiss(),
            MapEvent::ViewDetails { id } => self.navigate(id),
            MapEvent::OpenNavigation { id } => vec![MapEffect::OpenExternal { id }],
        }
    }

    fn mouse_over(&mut self, id: Id, position: ScreenPosition) -> Vec<MapEffect<Id>> {
        // Touch browsers synthesise mouse events around taps.
        if self.device == DeviceKind::Touch {
            return Vec::new();
        }
        self.pending_hide = None;
        let mut effects = self.dismiss();
        effects.retain(|e| !matches!(e, MapEffect::HidePreview { id: hidden } if *hidden == id));
        effects.push(MapEffect::ShowPreview {
            id: id.clone(),
            position,
        });
        self.state = MarkerState::Hovering { id, position };
        effects
    }

    fn mouse_out(&mut self, id: Id) -> Vec<MapEffect<Id>> {
        if self.hovered_marker() != Some(&id) {
            return Vec::new();
        }
        self.next_token += 1;
        self.pending_hide = Some(self.next_token);
        vec![MapEffect::ScheduleHide {
            token: self.next_token,
            after: self.grace,
        }]
    }

    fn hide_elapsed(&mut self, token: u64) -> Vec<MapEffect<Id>> {
        if self.pending_hide != Some(token) {
            return Vec::new();
        }
        self.pending_hide = None;
        self.dismiss()
    }

    fn tap(&mut self, id: Id) -> Vec<MapEffect<Id>> {
        if self.open_marker() == Some(&id) {
            return self.navigate(id);
        }
        let mut effects = self.dismiss();
        effects.push(MapEffect::OpenOverlay { id: id.clone() });
        self.state = MarkerState::Open(id);
        effects
    }

    /// Leave the map for the business detail view.
    fn navigate(&mut self, id: Id) -> Vec<MapEffect<Id>> {
        self.pending_hide = None;
        let mut effects = self.dismiss();
        effects.push(MapEffect::Navigate { id });
        effects
    }

    /// Close whatever is showing.
    fn dismiss(&mut self) -> Vec<MapEffect<Id>> {
        let effect = match std::mem::replace(&mut self.state, MarkerState::Closed) {
            MarkerState::Closed => None,
            MarkerState::Hovering { id, .. } => Some(MapEffect::HidePreview { id }),
            MarkerState::Open(id) => Some(MapEffect::CloseOverlay { id }),
        };
        effect.into_iter().collect()
    }
}
