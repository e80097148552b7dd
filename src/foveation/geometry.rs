use crate::config::LayerConfig;

/// Render viewport for one layer.
///
/// The origin can be negative and the extent larger than the layer's target:
/// the mapping positions the full-screen projection so that only the centered
/// `size` footprint lands inside the `resolution`-sized target, at the
/// layer's pixel density. WebGPU requires viewports to lie inside the
/// attachment, so render passes apply this as the equivalent clip-space
/// scale (`clip_scale`) instead of an oversized viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Clip-space scale equivalent to this viewport on a `resolution`-sized
    /// target. A degenerate full-screen layer yields (1, 1).
    pub fn clip_scale(&self, resolution: (u32, u32)) -> [f32; 2] {
        [
            self.width as f32 / resolution.0 as f32,
            self.height as f32 / resolution.1 as f32,
        ]
    }
}

/// Screen-space footprint of a non-base layer as fractions of the screen,
/// consumed by the compositor's per-pixel layer selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl BoundaryRect {
    pub fn contains(&self, u: f32, v: f32) -> bool {
        u >= self.left && u <= self.right && v >= self.top && v <= self.bottom
    }

    /// Packed as (left, right, top, bottom) for the compositing shader
    pub fn to_array(&self) -> [f32; 4] {
        [self.left, self.right, self.top, self.bottom]
    }
}

/// Viewports and compositor boundaries for a layer stack.
///
/// Pure data, recomputed only when the screen size or layer list changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGeometry {
    pub viewports: Vec<Viewport>,
    /// One per non-base layer; the base covers the whole screen and needs none
    pub boundaries: Vec<BoundaryRect>,
}

/// Computes per-layer viewports and boundary rectangles.
///
/// Integer viewport arithmetic matches the reference mapping exactly; callers
/// must have validated the layers first (zero-sized footprints divide by
/// zero here).
pub fn compute_geometry(screen: (u32, u32), layers: &[LayerConfig]) -> LayerGeometry {
    let (sw, sh) = (screen.0 as i64, screen.1 as i64);

    let viewports = layers
        .iter()
        .map(|layer| {
            let (w, h) = (layer.size.0 as i64, layer.size.1 as i64);
            let (rw, rh) = (layer.resolution.0 as i64, layer.resolution.1 as i64);
            Viewport {
                x: -(((sw - w) * rw) / (2 * w)) as i32,
                y: -(((sh - h) * rh) / (2 * h)) as i32,
                width: ((sw * rw) / w) as u32,
                height: ((sh * rh) / h) as u32,
            }
        })
        .collect();

    let boundaries = layers
        .iter()
        .skip(1)
        .map(|layer| {
            let (w, h) = (layer.size.0 as f32, layer.size.1 as f32);
            let (sw, sh) = (screen.0 as f32, screen.1 as f32);
            BoundaryRect {
                left: (sw - w) / (2.0 * sw),
                right: (sw + w) / (2.0 * sw),
                top: (sh - h) / (2.0 * sh),
                bottom: (sh + h) / (2.0 * sh),
            }
        })
        .collect();

    LayerGeometry {
        viewports,
        boundaries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;

    const SCREEN: (u32, u32) = (1920, 1080);

    fn reference_layers() -> Vec<LayerConfig> {
        vec![
            LayerConfig::new((1920, 1080), (640, 360)),
            LayerConfig::new((900, 900), (450, 450)),
            LayerConfig::new((250, 250), (250, 250)),
        ]
    }

    #[test]
    fn base_layer_viewport_spans_its_target() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        assert_eq!(
            geometry.viewports[0],
            Viewport {
                x: 0,
                y: 0,
                width: 640,
                height: 360
            }
        );
    }

    #[test]
    fn mid_layer_viewport_matches_reference_numbers() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        assert_eq!(
            geometry.viewports[1],
            Viewport {
                x: -255,
                y: -45,
                width: 960,
                height: 540
            }
        );
    }

    #[test]
    fn fovea_viewport_matches_reference_numbers() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        // 1920 * 250 / 250 = 1920: the fovea sees the full-screen projection
        // at native density, clipped to its 250x250 target
        assert_eq!(
            geometry.viewports[2],
            Viewport {
                x: -835,
                y: -415,
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn degenerate_fullscreen_layer_has_identity_viewport() {
        let layers = vec![LayerConfig::new((1920, 1080), (1920, 1080))];
        let geometry = compute_geometry(SCREEN, &layers);
        assert_eq!(
            geometry.viewports[0],
            Viewport {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(geometry.viewports[0].clip_scale((1920, 1080)), [1.0, 1.0]);
    }

    #[test]
    fn clip_scale_equals_screen_over_footprint() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        let scale = geometry.viewports[1].clip_scale((450, 450));
        assert!((scale[0] - 1920.0 / 900.0).abs() < 1e-6);
        assert!((scale[1] - 1080.0 / 900.0).abs() < 1e-6);
    }

    #[test]
    fn mid_layer_boundary_matches_reference_numbers() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        let b = geometry.boundaries[0];
        assert!((b.left - 0.265625).abs() < 1e-6);
        assert!((b.right - 0.734375).abs() < 1e-6);
    }

    #[test]
    fn boundaries_are_symmetric_about_center() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        for b in &geometry.boundaries {
            assert!((b.left + b.right - 1.0).abs() < 1e-6);
            assert!((b.top + b.bottom - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn base_layer_gets_no_boundary() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        assert_eq!(geometry.boundaries.len(), 2);
    }

    #[test]
    fn computation_is_deterministic() {
        let layers = reference_layers();
        let first = compute_geometry(SCREEN, &layers);
        let second = compute_geometry(SCREEN, &layers);
        assert_eq!(first, second);
    }

    #[test]
    fn boundary_contains_screen_center() {
        let geometry = compute_geometry(SCREEN, &reference_layers());
        for b in &geometry.boundaries {
            assert!(b.contains(0.5, 0.5));
            assert!(!b.contains(0.0, 0.0));
        }
    }

    #[test]
    fn default_config_geometry_is_consistent() {
        let config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        let geometry = compute_geometry(SCREEN, &config.layers);
        assert_eq!(geometry.viewports.len(), config.layers.len());
        assert_eq!(geometry.boundaries.len(), config.layers.len() - 1);
    }
}
