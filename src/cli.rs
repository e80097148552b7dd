// cli.rs - Command-line interface configuration
use clap::Parser;

use crate::config::BlendPolicy;

#[derive(Parser, Debug, Clone)]
#[command(name = "foveated-renderer")]
#[command(about = "Multi-layer foveated renderer", long_about = None)]
pub struct Cli {
    /// glTF model to render; falls back to the built-in city scene
    #[arg(long = "model")]
    pub model: Option<String>,

    /// Uniform scale applied to the loaded model
    #[arg(long = "model-scale", default_value = "1.0")]
    pub model_scale: f32,

    /// MSAA sample count (0 or 1 disables multisampling)
    #[arg(long = "samples", default_value = "4")]
    pub samples: u32,

    /// Number of scene instances drawn per frame
    #[arg(long = "instances", default_value = "20")]
    pub instances: usize,

    /// Number of point lights
    #[arg(long = "lights", default_value = "10")]
    pub lights: usize,

    /// Layer transition policy at boundaries
    #[arg(long = "blend", value_enum, default_value = "hard")]
    pub blend: BlendPolicy,

    /// Camera pose as printed by the pose dump key (JSON)
    #[arg(long = "pose")]
    pub pose: Option<String>,

    /// Run windowed at WIDTHxHEIGHT instead of fullscreen
    #[arg(long = "windowed")]
    pub windowed: Option<String>,

    /// Sync the GPU after every frame and report ms/draw (slow, measurement only)
    #[arg(long = "draw-timing", default_value = "false")]
    pub draw_timing: bool,
}

impl Cli {
    /// Parses the --windowed argument, e.g. "1280x720"
    pub fn windowed_size(&self) -> Option<(u32, u32)> {
        let value = self.windowed.as_deref()?;
        let (w, h) = value.split_once('x')?;
        Some((w.parse().ok()?, h.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windowed_size_parses_dimensions() {
        let cli = Cli::parse_from(["foveated-renderer", "--windowed", "1280x720"]);
        assert_eq!(cli.windowed_size(), Some((1280, 720)));
    }

    #[test]
    fn windowed_size_rejects_garbage() {
        let cli = Cli::parse_from(["foveated-renderer", "--windowed", "huge"]);
        assert_eq!(cli.windowed_size(), None);
    }

    #[test]
    fn defaults_match_reference_configuration() {
        let cli = Cli::parse_from(["foveated-renderer"]);
        assert_eq!(cli.samples, 4);
        assert_eq!(cli.instances, 20);
        assert_eq!(cli.lights, 10);
        assert!(!cli.draw_timing);
    }
}
