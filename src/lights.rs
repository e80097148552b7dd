use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, Buffer, Device, Queue, RenderPipeline};

use crate::foveation::target::DEPTH_FORMAT;
use crate::rng::Lcg;

/// Point light as the scene shader consumes it
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub atten_const: f32,
    pub diffuse: [f32; 3],
    pub atten_linear: f32,
    pub specular: [f32; 3],
    pub atten_quad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MarkerParams {
    vp: [[f32; 4]; 4],
    screen_size: [f32; 2],
    point_size: f32,
    _pad: f32,
}

/// Deterministic light placement: evenly spaced around an ellipse above the
/// scene, with seeded pseudo-random colours and fixed attenuation.
pub fn point_lights(count: usize) -> Vec<PointLight> {
    let mut rng = Lcg::new(1);

    (0..count)
        .map(|i| {
            let angle = (360.0 * i as f32 / count as f32).to_radians();
            let colour = [rng.next_f32(), rng.next_f32(), rng.next_f32()];
            PointLight {
                position: [angle.sin() * 2.5, 1.5, angle.cos() * 3.5],
                atten_const: 1.0,
                diffuse: colour,
                atten_linear: 0.22,
                specular: colour,
                atten_quad: 0.20,
            }
        })
        .collect()
}

/// The point lights plus the debug marker pipeline that visualizes them in
/// direct mode.
pub struct LightRig {
    count: u32,
    buffer: Buffer,
    marker_pipeline: RenderPipeline,
    marker_vertices: Buffer,
    marker_params: Buffer,
    marker_bind_group: BindGroup,
}

impl LightRig {
    pub fn new(
        device: &Device,
        format: wgpu::TextureFormat,
        sample_count: u32,
        count: usize,
    ) -> Self {
        let lights = point_lights(count.max(1));

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Lights"),
            contents: bytemuck::cast_slice(&lights),
            usage: wgpu::BufferUsages::STORAGE,
        });

        // Interleaved position + colour, one entry per light
        let marker_data: Vec<[f32; 6]> = lights
            .iter()
            .map(|light| {
                [
                    light.position[0],
                    light.position[1],
                    light.position[2],
                    light.diffuse[0],
                    light.diffuse[1],
                    light.diffuse[2],
                ]
            })
            .collect();
        let marker_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Marker Vertices"),
            contents: bytemuck::cast_slice(&marker_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let marker_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Marker Params"),
            contents: bytemuck::cast_slice(&[MarkerParams {
                vp: Mat4::IDENTITY.to_cols_array_2d(),
                screen_size: [1.0, 1.0],
                point_size: 10.0,
                _pad: 0.0,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Marker Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let marker_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Marker Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: marker_params.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Marker Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("light_markers.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Marker Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let marker_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Light Marker Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 24,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
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
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count.max(1),
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Self {
            count: lights.len() as u32,
            buffer,
            marker_pipeline,
            marker_vertices,
            marker_params,
            marker_bind_group,
        }
    }

    /// Storage buffer bound by the scene shader
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Lights live in world space, so the marker pass only needs the
    /// combined view-projection.
    pub fn write_frame(&self, queue: &Queue, vp: Mat4, screen: (u32, u32)) {
        queue.write_buffer(
            &self.marker_params,
            0,
            bytemuck::cast_slice(&[MarkerParams {
                vp: vp.to_cols_array_2d(),
                screen_size: [screen.0 as f32, screen.1 as f32],
                point_size: 10.0,
                _pad: 0.0,
            }]),
        );
    }

    /// Draws the markers into the already-open direct render pass
    pub fn draw_markers(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.marker_pipeline);
        pass.set_bind_group(0, &self.marker_bind_group, &[]);
        pass.set_vertex_buffer(0, self.marker_vertices.slice(..));
        pass.draw(0..6, 0..self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lights_are_deterministic() {
        assert_eq!(point_lights(10), point_lights(10));
    }

    #[test]
    fn lights_sit_on_the_ellipse() {
        for light in point_lights(10) {
            let x = light.position[0] / 2.5;
            let z = light.position[2] / 3.5;
            assert!((x * x + z * z - 1.0).abs() < 1e-5);
            assert_eq!(light.position[1], 1.5);
        }
    }

    #[test]
    fn attenuation_matches_reference_coefficients() {
        let light = &point_lights(1)[0];
        assert_eq!(light.atten_const, 1.0);
        assert_eq!(light.atten_linear, 0.22);
        assert_eq!(light.atten_quad, 0.20);
    }

    #[test]
    fn diffuse_and_specular_share_the_colour() {
        for light in point_lights(6) {
            assert_eq!(light.diffuse, light.specular);
        }
    }

    #[test]
    fn light_struct_is_tightly_packed_for_the_gpu() {
        assert_eq!(std::mem::size_of::<PointLight>(), 48);
    }

    #[test]
    fn first_light_points_down_positive_z() {
        let lights = point_lights(4);
        assert!((lights[0].position[0]).abs() < 1e-6);
        assert!((lights[0].position[2] - 3.5).abs() < 1e-6);
    }
}
