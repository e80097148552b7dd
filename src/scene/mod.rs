pub mod gltf;
pub mod mesh;
pub mod pipeline;
pub mod procedural;

pub use mesh::{Material, Mesh, Vertex};
pub use pipeline::{FrameGlobals, InstanceTransforms, ScenePipeline};

use wgpu::{BindGroupLayout, Device, Queue, Sampler, TextureView};

/// A drawable scene: a flat list of meshes, each with its own material.
pub struct Scene {
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    /// Draws every mesh with one instanced call each. The caller has already
    /// bound the scene pipeline, the frame bind group and a layer bind
    /// group; this only touches the per-mesh state.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: u32) {
        for mesh in &self.meshes {
            mesh.draw(pass, instances);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }
}

/// Loads the requested model, degrading to the built-in city scene when the
/// load fails - startup always produces something drawable.
pub fn load(
    device: &Device,
    queue: &Queue,
    material_layout: &BindGroupLayout,
    sampler: &Sampler,
    fallback_view: &TextureView,
    model_path: Option<&str>,
) -> Scene {
    if let Some(path) = model_path {
        match gltf::load_scene(device, queue, material_layout, sampler, fallback_view, path) {
            Ok(scene) => return scene,
            Err(error) => {
                eprintln!("Error loading scene: {:#}", error);
                eprintln!("Falling back to the built-in city scene");
            }
        }
    }
    procedural::build_city(device, material_layout, sampler, fallback_view)
}
