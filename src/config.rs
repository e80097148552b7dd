use clap::ValueEnum;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// One foveation layer: the screen footprint it covers and the resolution it
/// is rendered at. Both are in pixels; `resolution <= size` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfig {
    /// On-screen footprint, centered on the screen center
    pub size: (u32, u32),
    /// Render target resolution
    pub resolution: (u32, u32),
}

impl LayerConfig {
    pub const fn new(size: (u32, u32), resolution: (u32, u32)) -> Self {
        Self { size, resolution }
    }

    pub fn area(&self) -> u64 {
        self.size.0 as u64 * self.size.1 as u64
    }
}

/// How the compositor treats layer boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlendPolicy {
    /// Innermost containing layer wins outright
    Hard,
    /// Circular feathered transition between adjacent layers
    Smooth,
}

/// Full pipeline configuration, validated before any GPU resource exists
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Layers ordered base (full screen) to fovea (innermost)
    pub layers: Vec<LayerConfig>,
    /// MSAA samples; 0 or 1 disables multisampling
    pub sample_count: u32,
    pub instance_count: usize,
    pub light_count: usize,
    pub blend: BlendPolicy,
}

impl RenderConfig {
    /// Reproduces the reference three-layer setup for a given screen size,
    /// clamping the inner layers on small screens so validation always holds.
    pub fn default_for_screen(width: u32, height: u32) -> Self {
        let mid = 900.min(width).min(height);
        let mid_res = 450.min(mid);
        let fovea = 250.min(mid);

        let layers = vec![
            // Base layer covers the full screen at a third of native density
            LayerConfig::new((width, height), ((width / 3).max(1), (height / 3).max(1))),
            LayerConfig::new((mid, mid), (mid_res, mid_res)),
            // Fovea layer is rendered at native density
            LayerConfig::new((fovea, fovea), (fovea, fovea)),
        ];

        Self {
            layers,
            sample_count: 4,
            instance_count: 20,
            light_count: 10,
            blend: BlendPolicy::Hard,
        }
    }

    pub fn multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Effective per-pass sample count for wgpu (never 0)
    pub fn effective_samples(&self) -> u32 {
        self.sample_count.max(1)
    }

    /// Rejects configurations the pipeline cannot render correctly.
    /// Must pass before any render target is allocated.
    pub fn validate(&self, screen: (u32, u32)) -> Result<()> {
        if screen.0 == 0 || screen.1 == 0 {
            return Err(format!("screen size {}x{} is degenerate", screen.0, screen.1).into());
        }
        if self.layers.is_empty() {
            return Err("at least one layer is required".into());
        }
        if !matches!(self.sample_count, 0 | 1 | 2 | 4 | 8) {
            return Err(format!("unsupported sample count {}", self.sample_count).into());
        }
        if self.instance_count == 0 {
            return Err("instance count must be nonzero".into());
        }

        let base = &self.layers[0];
        if base.size != screen {
            return Err(format!(
                "base layer size {}x{} must cover the full screen {}x{}",
                base.size.0, base.size.1, screen.0, screen.1
            )
            .into());
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.size.0 == 0 || layer.size.1 == 0 {
                return Err(format!("layer {} has a zero-sized footprint", i).into());
            }
            if layer.resolution.0 == 0 || layer.resolution.1 == 0 {
                return Err(format!("layer {} has a zero resolution", i).into());
            }
            if layer.resolution.0 > layer.size.0 || layer.resolution.1 > layer.size.1 {
                return Err(format!(
                    "layer {} resolution {}x{} exceeds its footprint {}x{}",
                    i, layer.resolution.0, layer.resolution.1, layer.size.0, layer.size.1
                )
                .into());
            }
        }

        for pair in self.layers.windows(2) {
            if pair[1].area() > pair[0].area() {
                return Err("layer footprints must shrink from base to fovea".into());
            }
        }

        let fovea = self.layers.last().unwrap();
        if self.layers.len() > 1 && fovea.resolution != fovea.size {
            return Err(format!(
                "fovea layer must render at native density ({}x{} footprint, {}x{} resolution)",
                fovea.size.0, fovea.size.1, fovea.resolution.0, fovea.resolution.1
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: (u32, u32) = (1920, 1080);

    #[test]
    fn default_config_is_valid() {
        let config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        assert!(config.validate(SCREEN).is_ok());
    }

    #[test]
    fn default_config_matches_reference_layers() {
        let config = RenderConfig::default_for_screen(1920, 1080);
        assert_eq!(config.layers[0], LayerConfig::new((1920, 1080), (640, 360)));
        assert_eq!(config.layers[1], LayerConfig::new((900, 900), (450, 450)));
        assert_eq!(config.layers[2], LayerConfig::new((250, 250), (250, 250)));
    }

    #[test]
    fn default_config_clamps_on_small_screens() {
        let config = RenderConfig::default_for_screen(800, 600);
        assert!(config.validate((800, 600)).is_ok());
        assert!(config.layers[1].size.0 <= 600);
    }

    #[test]
    fn rejects_zero_screen() {
        let config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        assert!(config.validate((0, 1080)).is_err());
    }

    #[test]
    fn rejects_zero_sized_layer() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.layers[1] = LayerConfig::new((0, 900), (450, 450));
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn rejects_resolution_above_footprint() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.layers[1] = LayerConfig::new((900, 900), (901, 450));
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn rejects_base_not_covering_screen() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.layers[0] = LayerConfig::new((1000, 1000), (500, 500));
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn rejects_growing_layers() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.layers[2] = LayerConfig::new((950, 950), (950, 950));
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn rejects_undersampled_fovea() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.layers[2] = LayerConfig::new((250, 250), (125, 125));
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn rejects_odd_sample_counts() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.sample_count = 3;
        assert!(config.validate(SCREEN).is_err());
    }

    #[test]
    fn sample_count_zero_disables_multisampling() {
        let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
        config.sample_count = 0;
        assert!(config.validate(SCREEN).is_ok());
        assert!(!config.multisampled());
        assert_eq!(config.effective_samples(), 1);
    }
}
