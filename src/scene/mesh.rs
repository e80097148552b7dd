use glam::Vec3;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Sampler, TextureView};

/// One vertex as the scene shader consumes it
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
];

pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Material uniform as laid out in the scene shader
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    colour: [f32; 3],
    shininess: f32,
    diffuse_enabled: u32,
    specular_enabled: u32,
    _pad: [f32; 2],
}

/// Mesh material. A missing map is an explicit `None`, never an
/// indeterminate flag: the shader is always told which inputs are live.
pub struct Material {
    pub diffuse: Option<TextureView>,
    pub specular: Option<TextureView>,
    /// Fallback when no diffuse map exists
    pub colour: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: None,
            specular: None,
            colour: Vec3::ONE,
            shininess: 32.0,
        }
    }
}

impl Material {
    fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            colour: self.colour.to_array(),
            shininess: self.shininess,
            diffuse_enabled: self.diffuse.is_some() as u32,
            specular_enabled: self.specular.is_some() as u32,
            _pad: [0.0; 2],
        }
    }
}

/// GPU-resident mesh: vertex/index buffers plus its material bind group
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    vertex_count: usize,
    bind_group: BindGroup,
}

impl Mesh {
    pub fn new(
        device: &Device,
        material_layout: &BindGroupLayout,
        sampler: &Sampler,
        fallback_view: &TextureView,
        vertices: &[Vertex],
        indices: &[u32],
        material: Material,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertices"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Indices"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Material"),
            contents: bytemuck::cast_slice(&[material.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let diffuse_view = material.diffuse.as_ref().unwrap_or(fallback_view);
        let specular_view = material.specular.as_ref().unwrap_or(fallback_view);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Material Bind Group"),
            layout: material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(diffuse_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(specular_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: material_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_count: vertices.len(),
            bind_group,
        }
    }

    /// Issues one instanced, indexed draw with this mesh's material bound
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: u32) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..instances);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader_locations() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(VERTEX_ATTRIBUTES[1].offset, 12);
        assert_eq!(VERTEX_ATTRIBUTES[2].offset, 24);
    }

    #[test]
    fn absent_maps_are_explicitly_disabled() {
        let uniform = Material::default().to_uniform();
        assert_eq!(uniform.diffuse_enabled, 0);
        assert_eq!(uniform.specular_enabled, 0);
        assert_eq!(uniform.shininess, 32.0);
    }
}
