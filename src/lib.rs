pub mod camera;
pub mod cli;
pub mod config;
pub mod foveation;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod lights;
pub mod renderer;
pub mod rng;
pub mod scene;

pub use config::{BlendPolicy, LayerConfig, RenderConfig};
pub use foveation::geometry::{compute_geometry, BoundaryRect, LayerGeometry, Viewport};
