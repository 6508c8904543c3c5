//! Resize handshake between the window, the camera projection and the surface.
//!
//! The drawing buffer is the logical (CSS) size times the device pixel ratio, with that
//! ratio capped so high-density displays do not render at full density.

use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub logical_width: f64,
    pub logical_height: f64,
    /// Ratio reported by the window, before the cap.
    pub device_pixel_ratio: f64,
    pub pixel_ratio: f64,
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Viewport {
    /// Compute the viewport for a logical size and a device pixel ratio, the ratio capped at
    /// `max_pixel_ratio`.
    pub fn handshake(
        logical_width: f64,
        logical_height: f64,
        device_pixel_ratio: f64,
        max_pixel_ratio: f64,
    ) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let pixel_ratio = device_pixel_ratio.min(max_pixel_ratio);
        let logical_width = logical_width.max(0.0);
        let logical_height = logical_height.max(0.0);
        Self {
            logical_width,
            logical_height,
            device_pixel_ratio,
            pixel_ratio,
            surface_width: (logical_width * pixel_ratio).round() as u32,
            surface_height: (logical_height * pixel_ratio).round() as u32,
        }
    }

    /// Adapter for winit, which reports the physical size and the scale factor.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f64) -> Self {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let logical = size.to_logical::<f64>(scale_factor);
        Self::handshake(logical.width, logical.height, scale_factor, max_pixel_ratio)
    }

    /// `width / height` of the logical viewport.
    pub fn aspect(&self) -> f32 {
        (self.logical_width / self.logical_height) as f32
    }

    /// Window height in physical pixels, the unit pointer positions are reported in.
    /// Differs from `surface_height` whenever the pixel ratio is capped.
    pub fn physical_height(&self) -> u32 {
        (self.logical_height * self.device_pixel_ratio).round() as u32
    }

    /// A zero-sized viewport (minimised window) must not reconfigure the surface.
    pub fn is_drawable(&self) -> bool {
        self.surface_width > 0 && self.surface_height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_is_width_over_height() {
        let viewport = Viewport::handshake(1280.0, 720.0, 1.0, 2.0);
        assert!((viewport.aspect() - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!((viewport.surface_width, viewport.surface_height), (1280, 720));
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::handshake(800.0, 600.0, 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_eq!((viewport.surface_width, viewport.surface_height), (1600, 1200));

        let viewport = Viewport::handshake(800.0, 600.0, 1.5, 2.0);
        assert_eq!(viewport.pixel_ratio, 1.5);
        assert_eq!(viewport.surface_width, 1200);
    }

    #[test]
    fn physical_sizes_are_scaled_back() {
        // a 3x display: 2400x1800 physical is 800x600 logical, rendered at 2x
        let viewport = Viewport::from_physical(PhysicalSize::new(2400, 1800), 3.0, 2.0);
        assert_eq!(viewport.logical_width, 800.0);
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_eq!((viewport.surface_width, viewport.surface_height), (1600, 1200));
        assert!((viewport.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn pointer_height_ignores_the_cap() {
        let viewport = Viewport::from_physical(PhysicalSize::new(2400, 1800), 3.0, 2.0);
        assert_eq!(viewport.physical_height(), 1800);
        assert_eq!(viewport.surface_height, 1200);

        let viewport = Viewport::handshake(800.0, 600.0, 1.5, 2.0);
        assert_eq!(viewport.physical_height(), viewport.surface_height);
    }

    #[test]
    fn minimised_windows_are_not_drawable() {
        let viewport = Viewport::from_physical(PhysicalSize::new(0, 0), 1.0, 2.0);
        assert!(!viewport.is_drawable());
        let viewport = Viewport::handshake(100.0, 100.0, f64::NAN, 2.0);
        assert_eq!(viewport.pixel_ratio, 1.0);
        assert!(viewport.is_drawable());
    }
}
