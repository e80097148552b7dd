use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, TextureView};

use crate::config::BlendPolicy;
use crate::foveation::geometry::LayerGeometry;

/// Full-screen quad as two triangles; position in clip space, uv with the
/// origin at the top-left so layer images display upright.
const QUAD_VERTICES: [[f32; 4]; 6] = [
    [-1.0, 1.0, 0.0, 0.0],
    [-1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 1.0, 1.0],
    [-1.0, 1.0, 0.0, 0.0],
    [1.0, -1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0, 0.0],
];

/// Generates the compositing shader for a given layer count by expanding the
/// template markers. The reference kept the count hard-coded in the shader
/// ("remember to change the shader too"); generating the source removes that
/// coupling.
pub fn composite_shader_source(layer_count: usize) -> String {
    assert!(layer_count >= 1, "compositor needs at least the base layer");

    let boundaries = if layer_count > 1 {
        format!("boundaries: array<vec4<f32>, {}>,", layer_count - 1)
    } else {
        String::new()
    };

    let mut bindings = String::new();
    for i in 0..layer_count {
        bindings.push_str(&format!(
            "@group(0) @binding({}) var layer{}_tex: texture_2d<f32>;\n",
            i + 2,
            i
        ));
    }

    // Outermost inner layer first so the innermost wins the final mix
    let mut select = String::new();
    for i in 1..layer_count {
        select.push_str(&format!(
            "let bounds{i} = params.boundaries[{prev}];\n    \
             let sample{i} = textureSample(layer{i}_tex, layer_sampler, layer_uv(in.uv, bounds{i})).rgb;\n    \
             colour = mix(colour, sample{i}, layer_weight(in.uv, bounds{i}));\n    ",
            i = i,
            prev = i - 1
        ));
    }

    include_str!("../composite.wgsl")
        .replace("//@BOUNDARIES@", &boundaries)
        .replace("//@LAYER_BINDINGS@", &bindings)
        .replace("//@LAYER_SELECT@", &select)
}

fn params_bytes(screen: (u32, u32), blend: BlendPolicy, geometry: &LayerGeometry) -> Vec<u8> {
    let blend_mode: u32 = match blend {
        BlendPolicy::Hard => 0,
        BlendPolicy::Smooth => 1,
    };
    let layer_count = geometry.viewports.len() as u32;

    let mut bytes = Vec::with_capacity(16 + geometry.boundaries.len() * 16);
    bytes.extend_from_slice(bytemuck::cast_slice(&[screen.0 as f32, screen.1 as f32]));
    bytes.extend_from_slice(bytemuck::cast_slice(&[blend_mode, layer_count]));
    for boundary in &geometry.boundaries {
        bytes.extend_from_slice(bytemuck::cast_slice(&boundary.to_array()));
    }
    bytes
}

/// Draws the final frame: binds every layer image base-to-fovea and runs the
/// per-pixel layer selection over one full-screen quad.
pub struct Compositor {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    params_buffer: Buffer,
    quad_buffer: Buffer,
    layer_count: usize,
    blend: BlendPolicy,
}

impl Compositor {
    pub fn new(
        device: &Device,
        format: wgpu::TextureFormat,
        geometry: &LayerGeometry,
        layer_views: &[&TextureView],
        blend: BlendPolicy,
        screen: (u32, u32),
    ) -> Self {
        let layer_count = layer_views.len();
        assert_eq!(layer_count, geometry.viewports.len());

        let shader_source = composite_shader_source(layer_count);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let mut layout_entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        for i in 0..layer_count {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: (i + 2) as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &layout_entries,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Params"),
            contents: &params_bytes(screen, blend, geometry),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group =
            Self::create_bind_group(device, &bind_group_layout, &params_buffer, layer_views);

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 16,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 8,
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
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            bind_group,
            params_buffer,
            quad_buffer,
            layer_count,
            blend,
        }
    }

    fn create_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        params_buffer: &Buffer,
        layer_views: &[&TextureView],
    ) -> BindGroup {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Composite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ];
        for (i, view) in layer_views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (i + 2) as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout,
            entries: &entries,
        })
    }

    /// Rebinds layer images and boundary data after a reconfiguration.
    /// The pipeline itself only depends on the layer count, which is fixed.
    pub fn update(
        &mut self,
        device: &Device,
        queue: &Queue,
        geometry: &LayerGeometry,
        layer_views: &[&TextureView],
        screen: (u32, u32),
    ) {
        assert_eq!(layer_views.len(), self.layer_count);
        queue.write_buffer(
            &self.params_buffer,
            0,
            &params_bytes(screen, self.blend, geometry),
        );
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.params_buffer,
            layer_views,
        );
    }

    /// Runs the compositing pass into the on-screen target
    pub fn composite(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_shader_has_one_binding_per_layer() {
        let source = composite_shader_source(3);
        assert!(source.contains("@binding(2) var layer0_tex"));
        assert!(source.contains("@binding(3) var layer1_tex"));
        assert!(source.contains("@binding(4) var layer2_tex"));
        assert!(!source.contains("layer3_tex"));
    }

    #[test]
    fn generated_shader_sizes_boundary_array() {
        let source = composite_shader_source(3);
        assert!(source.contains("boundaries: array<vec4<f32>, 2>"));
    }

    #[test]
    fn generated_shader_applies_layers_outer_to_inner() {
        let source = composite_shader_source(3);
        let outer = source.find("sample1").unwrap();
        let inner = source.find("sample2").unwrap();
        assert!(outer < inner);
    }

    #[test]
    fn generated_shader_leaves_no_template_markers() {
        for count in 1..=4 {
            let source = composite_shader_source(count);
            assert!(!source.contains("//@"), "markers left for {} layers", count);
        }
    }

    #[test]
    fn single_layer_shader_skips_boundaries() {
        let source = composite_shader_source(1);
        assert!(!source.contains("boundaries"));
        assert!(source.contains("layer0_tex"));
    }

    #[test]
    fn params_layout_is_header_plus_boundaries() {
        use crate::config::LayerConfig;
        use crate::foveation::geometry::compute_geometry;

        let layers = vec![
            LayerConfig::new((1920, 1080), (640, 360)),
            LayerConfig::new((900, 900), (450, 450)),
        ];
        let geometry = compute_geometry((1920, 1080), &layers);
        let bytes = params_bytes((1920, 1080), BlendPolicy::Hard, &geometry);
        assert_eq!(bytes.len(), 16 + 16);

        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(floats[0], 1920.0);
        assert_eq!(floats[1], 1080.0);
        assert_eq!(floats[4], geometry.boundaries[0].left);
    }
}
