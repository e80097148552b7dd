pub mod compositor;
pub mod geometry;
pub mod pipeline;
pub mod target;

pub use pipeline::{FoveationPipeline, RenderMode};
