pub mod interaction;

pub use interaction::{
    DeviceKind, MapEffect, MapEvent, MapInteractionController, MarkerState, ScreenPosition,
    HOVER_GRACE,
};
