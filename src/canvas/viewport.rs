// Viewport transform for the Flow Studio canvas
//
// Pure mapping between screen pixels and graph world coordinates:
// `world = (screen - pan) / zoom`.

use serde::{Deserialize, Serialize};

use crate::graph::Point;

/// Smallest allowed zoom factor
pub const MIN_ZOOM: f64 = 0.2;

/// Largest allowed zoom factor
pub const MAX_ZOOM: f64 = 3.0;

/// Zoom change per wheel delta unit
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.001;

/// Current pan offset and zoom factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Screen-space translation
    pub pan: Point,
    /// Scale factor, always within [MIN_ZOOM, MAX_ZOOM]
    pub zoom: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewportState {
    /// Create a viewport, clamping the zoom into range
    pub fn new(pan: Point, zoom: f64) -> Self {
        Self {
            pan,
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn to_world(&self, screen: Point) -> Point {
        to_world(screen, self)
    }

    pub fn to_screen(&self, world: Point) -> Point {
        to_screen(world, self)
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Screen point to world point
pub fn to_world(screen: Point, viewport: &ViewportState) -> Point {
    (screen - viewport.pan) / viewport.zoom
}

/// World point to screen point
pub fn to_screen(world: Point, viewport: &ViewportState) -> Point {
    world * viewport.zoom + viewport.pan
}

/// Add `delta` to the zoom factor, clamped to range. Pan is unchanged, so the
/// zoom is anchored at the viewport origin rather than at the cursor.
pub fn zoom_by(delta: f64, viewport: &ViewportState) -> ViewportState {
    if !delta.is_finite() {
        return *viewport;
    }
    ViewportState {
        pan: viewport.pan,
        zoom: clamp_zoom(viewport.zoom + delta),
    }
}

/// Zoom for a wheel event. Scrolling down (positive delta) zooms out.
pub fn wheel_zoom(wheel_delta_y: f64, viewport: &ViewportState) -> ViewportState {
    zoom_by(-wheel_delta_y * WHEEL_ZOOM_SENSITIVITY, viewport)
}
