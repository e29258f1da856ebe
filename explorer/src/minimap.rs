//! Top-down view of the plane for the windowed binary.

use engine::canvas::{self, Canvas, Color};
use engine::surface::SurfaceSize;

use crate::registry::Registry;
use crate::scene::FrameOutput;

pub const BACKGROUND: Color = [12, 14, 28, 255];
pub const BORDER: Color = [60, 64, 96, 255];
pub const VEHICLE: Color = [240, 240, 240, 255];
pub const HEADING: Color = [255, 200, 40, 255];
pub const HIGHLIGHT: Color = [255, 255, 255, 255];
const FALLBACK_POINT: Color = [128, 128, 128, 255];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimap {
    boundary: f32,
}

impl Minimap {
    pub fn new(boundary: f32) -> Self {
        Self {
            boundary: boundary.max(1.0),
        }
    }

    /// `+z` points up. World `-x` is drawn to the right so a right turn looks like one.
    pub fn world_to_screen(&self, size: SurfaceSize, x: f32, z: f32) -> (i32, i32) {
        let span = 2.0 * self.boundary;
        let side = size.min_side() as f32;
        let ox = (size.width as f32 - side) / 2.0;
        let oy = (size.height as f32 - side) / 2.0;
        let sx = ox + (self.boundary - x) / span * (side - 1.0);
        let sy = oy + (self.boundary - z) / span * (side - 1.0);
        (sx.round() as i32, sy.round() as i32)
    }

    fn scale(&self, size: SurfaceSize) -> f32 {
        size.min_side() as f32 / (2.0 * self.boundary)
    }

    pub fn draw(&self, canvas: &mut Canvas<'_>, registry: &Registry, frame: &FrameOutput) {
        let size = canvas.size();
        if size.is_empty() {
            return;
        }
        canvas.clear(BACKGROUND);
        let scale = self.scale(size);

        let (x0, y0) = self.world_to_screen(size, self.boundary, self.boundary);
        let (x1, y1) = self.world_to_screen(size, -self.boundary, -self.boundary);
        canvas.line(x0, y0, x1, y0, BORDER);
        canvas.line(x1, y0, x1, y1, BORDER);
        canvas.line(x1, y1, x0, y1, BORDER);
        canvas.line(x0, y1, x0, y0, BORDER);

        let radius = (scale * 1.5).round().max(2.0) as i32;
        let active = frame.active_point.as_ref().map(|p| p.identity.as_str());
        for (poi, glow) in registry.points().iter().zip(&frame.glow) {
            let (px, py) = self.world_to_screen(size, poi.position.x, poi.position.z);
            let color = canvas::parse_hex_color(&poi.payload.color).unwrap_or(FALLBACK_POINT);
            if glow.glow > 0.0 {
                let halo = radius + (glow.glow * radius as f32 * 2.0).round() as i32;
                canvas.ring(px, py, halo, color);
            }
            canvas.fill_circle(px, py, radius, color);
            if active == Some(poi.identity.as_str()) {
                canvas.ring(px, py, radius + 2, HIGHLIGHT);
            }
        }

        let v = frame.vehicle;
        let (vx, vy) = self.world_to_screen(size, v.position.x, v.position.z);
        let reach = 3.0;
        let (hx, hy) = self.world_to_screen(
            size,
            v.position.x + v.heading.sin() * reach,
            v.position.z + v.heading.cos() * reach,
        );
        canvas.line(vx, vy, hx, hy, HEADING);
        canvas.fill_circle(vx, vy, (radius - 1).max(1), VEHICLE);
    }
}
