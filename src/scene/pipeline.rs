use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler, TextureView};

use crate::foveation::target::DEPTH_FORMAT;
use crate::scene::mesh;

/// Per-instance transform set uploaded every frame. The same array is shared
/// by every layer pass and the direct path, so all paths see an identical
/// scene framing.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransforms {
    pub mvp: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl InstanceTransforms {
    pub fn new(vp: Mat4, model: Mat4, normal: Mat4) -> Self {
        Self {
            mvp: (vp * model).to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

/// Frame-global shading inputs
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameGlobals {
    pub cam_pos: [f32; 3],
    pub light_count: u32,
    pub global_dir: [f32; 3],
    pub _pad0: f32,
    pub global_ambient: [f32; 3],
    pub _pad1: f32,
    pub global_diffuse: [f32; 3],
    pub _pad2: f32,
    pub global_specular: [f32; 3],
    pub _pad3: f32,
}

impl FrameGlobals {
    /// Directional light tuned for the city scene
    pub fn new(cam_pos: [f32; 3], light_count: u32) -> Self {
        Self {
            cam_pos,
            light_count,
            global_dir: [0.0, -1.0, 0.5],
            _pad0: 0.0,
            global_ambient: [0.0, 0.0, 0.0],
            _pad1: 0.0,
            global_diffuse: [0.2, 0.2, 0.2],
            _pad2: 0.0,
            global_specular: [1.0, 1.0, 1.0],
            _pad3: 0.0,
        }
    }
}

/// The scene render pipeline and the frame-level GPU resources it draws
/// with. One instance serves both the foveated layer passes and the direct
/// path; per-layer differences enter through small layer bind groups.
pub struct ScenePipeline {
    pipeline: RenderPipeline,
    wireframe_pipeline: Option<RenderPipeline>,
    frame_bind_group: BindGroup,
    instance_buffer: Buffer,
    globals_buffer: Buffer,
    material_layout: BindGroupLayout,
    layer_layout: BindGroupLayout,
    sampler: Sampler,
    fallback_view: TextureView,
    max_instances: usize,
}

impl ScenePipeline {
    pub fn new(
        device: &Device,
        queue: &Queue,
        format: wgpu::TextureFormat,
        sample_count: u32,
        supports_wireframe: bool,
        max_instances: usize,
        lights_buffer: &Buffer,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../scene.wgsl").into()),
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Transforms"),
            size: (max_instances * std::mem::size_of::<InstanceTransforms>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Globals"),
            contents: bytemuck::cast_slice(&[FrameGlobals::new([0.0; 3], 0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let layer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layer Bind Group Layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &material_layout, &layer_layout],
            push_constant_ranges: &[],
        });

        let build = |polygon_mode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[mesh::vertex_buffer_layout()],
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
                    polygon_mode,
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
            })
        };

        let pipeline = build(wgpu::PolygonMode::Fill);
        let wireframe_pipeline = supports_wireframe.then(|| build(wgpu::PolygonMode::Line));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fallback_view = Self::create_fallback_texture(device, queue);

        Self {
            pipeline,
            wireframe_pipeline,
            frame_bind_group,
            instance_buffer,
            globals_buffer,
            material_layout,
            layer_layout,
            sampler,
            fallback_view,
            max_instances,
        }
    }

    /// 1x1 white texture bound wherever a mesh has no map; the material
    /// uniform's enabled flags keep it out of the shading result.
    fn create_fallback_texture(device: &Device, queue: &Queue) -> TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Uploads this frame's transforms and shading globals
    pub fn write_frame(
        &self,
        queue: &Queue,
        transforms: &[InstanceTransforms],
        globals: &FrameGlobals,
    ) {
        debug_assert!(transforms.len() <= self.max_instances);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(transforms));
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[*globals]));
    }

    /// Creates the per-layer bind group carrying the clip-space scale that
    /// stands in for the layer's oversized viewport.
    pub fn create_layer_bind_group(&self, device: &Device, clip_scale: [f32; 2]) -> BindGroup {
        let data: [f32; 4] = [clip_scale[0], clip_scale[1], 0.0, 0.0];
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Layer Params"),
            contents: bytemuck::cast_slice(&data),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Layer Bind Group"),
            layout: &self.layer_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn pipeline(&self, wireframe: bool) -> &RenderPipeline {
        if wireframe {
            self.wireframe_pipeline.as_ref().unwrap_or(&self.pipeline)
        } else {
            &self.pipeline
        }
    }

    pub fn frame_bind_group(&self) -> &BindGroup {
        &self.frame_bind_group
    }

    pub fn material_layout(&self) -> &BindGroupLayout {
        &self.material_layout
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn fallback_view(&self) -> &TextureView {
        &self.fallback_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn instance_transforms_compose_mvp() {
        let vp = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let t = InstanceTransforms::new(vp, model, Mat4::IDENTITY);

        let expected = (vp * model).to_cols_array_2d();
        assert_eq!(t.mvp, expected);
    }

    #[test]
    fn frame_globals_use_reference_lighting() {
        let globals = FrameGlobals::new([1.0, 2.0, 3.0], 10);
        assert_eq!(globals.global_dir, [0.0, -1.0, 0.5]);
        assert_eq!(globals.global_ambient, [0.0, 0.0, 0.0]);
        assert_eq!(globals.global_diffuse, [0.2, 0.2, 0.2]);
        assert_eq!(globals.light_count, 10);
    }
}
