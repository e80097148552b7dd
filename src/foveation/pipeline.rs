use wgpu::{BindGroup, CommandEncoder, Device, Queue, Texture, TextureView};

use crate::config::RenderConfig;
use crate::foveation::compositor::Compositor;
use crate::foveation::geometry::{compute_geometry, LayerGeometry};
use crate::foveation::target::{OffscreenTarget, ResolveStage, DEPTH_FORMAT};
use crate::lights::LightRig;
use crate::scene::{Scene, ScenePipeline};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Which path draws the frame. Toggled only between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Layer passes, optional resolves, then the compositing pass
    Foveated,
    /// One full-resolution pass straight at the screen
    Direct,
}

/// Full-resolution attachments for the direct path: a depth buffer, plus a
/// multisampled color target resolving into the surface when MSAA is on.
struct DirectTarget {
    msaa_view: Option<TextureView>,
    depth_view: TextureView,
}

impl DirectTarget {
    fn create(device: &Device, screen: (u32, u32), format: wgpu::TextureFormat, samples: u32) -> Self {
        let extent = wgpu::Extent3d {
            width: screen.0,
            height: screen.1,
            depth_or_array_layers: 1,
        };

        let msaa_view = (samples > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Direct MSAA Color"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth: Texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Direct Depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: samples.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            msaa_view,
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }
}

/// Orchestrates the per-frame rendering: either the foveated layer stack or
/// the direct fallback, never both, never switching mid-frame.
///
/// Owns every render target. Reconfiguration tears all of them down and
/// rebuilds from scratch; nothing from the previous configuration survives.
pub struct FoveationPipeline {
    config: RenderConfig,
    geometry: LayerGeometry,
    targets: Vec<OffscreenTarget>,
    layer_bind_groups: Vec<BindGroup>,
    direct_bind_group: BindGroup,
    direct_target: DirectTarget,
    compositor: Option<Compositor>,
    mode: RenderMode,
    screen: (u32, u32),
}

impl FoveationPipeline {
    pub fn new(
        device: &Device,
        scene_pipeline: &ScenePipeline,
        format: wgpu::TextureFormat,
        config: RenderConfig,
        screen: (u32, u32),
    ) -> Result<Self> {
        config.validate(screen)?;

        let geometry = compute_geometry(screen, &config.layers);
        let resolve = ResolveStage::for_sample_count(config.sample_count);

        let mut targets = Vec::with_capacity(config.layers.len());
        let mut failed = None;
        for layer in &config.layers {
            match OffscreenTarget::create(device, layer.resolution, format, resolve) {
                Ok(target) => targets.push(target),
                Err(error) => {
                    failed = Some(error);
                    break;
                }
            }
        }

        // An incomplete layer set must never be rendered into; dropping to
        // the direct path keeps the application usable.
        let (targets, compositor, mode) = match failed {
            None => {
                let views: Vec<&TextureView> =
                    targets.iter().map(OffscreenTarget::sampled_view).collect();
                let compositor = Compositor::new(
                    device,
                    format,
                    &geometry,
                    &views,
                    config.blend,
                    screen,
                );
                (targets, Some(compositor), RenderMode::Foveated)
            }
            Some(error) => {
                eprintln!("Foveated targets unavailable: {}", error);
                eprintln!("Continuing in direct rendering mode");
                (Vec::new(), None, RenderMode::Direct)
            }
        };

        let layer_bind_groups = geometry
            .viewports
            .iter()
            .zip(&config.layers)
            .map(|(viewport, layer)| {
                scene_pipeline.create_layer_bind_group(device, viewport.clip_scale(layer.resolution))
            })
            .collect();

        let direct_bind_group = scene_pipeline.create_layer_bind_group(device, [1.0, 1.0]);
        let direct_target =
            DirectTarget::create(device, screen, format, config.effective_samples());

        Ok(Self {
            config,
            geometry,
            targets,
            layer_bind_groups,
            direct_bind_group,
            direct_target,
            compositor,
            mode,
            screen,
        })
    }

    /// Full teardown and recreation for a new screen size. Must only be
    /// called between frames: nothing from the previous configuration is
    /// referenced once this returns, including on failure, when the
    /// foveated path is dropped and the pipeline continues in direct mode.
    pub fn reconfigure(
        &mut self,
        device: &Device,
        queue: &Queue,
        scene_pipeline: &ScenePipeline,
        format: wgpu::TextureFormat,
        config: RenderConfig,
        screen: (u32, u32),
    ) -> Result<()> {
        config.validate(screen)?;

        let geometry = compute_geometry(screen, &config.layers);
        let resolve = ResolveStage::for_sample_count(config.sample_count);

        // The direct path is rebuilt first so it is valid for the new screen
        // even if the layer targets below fail
        self.direct_target =
            DirectTarget::create(device, screen, format, config.effective_samples());
        self.targets.clear();
        self.geometry = geometry.clone();
        self.screen = screen;

        let mut targets = Vec::with_capacity(config.layers.len());
        for layer in &config.layers {
            match OffscreenTarget::create(device, layer.resolution, format, resolve) {
                Ok(target) => targets.push(target),
                Err(error) => {
                    eprintln!("Foveated targets unavailable after resize: {}", error);
                    self.compositor = None;
                    self.mode = RenderMode::Direct;
                    self.config = config;
                    return Ok(());
                }
            }
        }

        let views: Vec<&TextureView> = targets.iter().map(OffscreenTarget::sampled_view).collect();
        match &mut self.compositor {
            Some(compositor) if views.len() == self.layer_bind_groups.len() => {
                compositor.update(device, queue, &geometry, &views, screen);
            }
            _ => {
                self.compositor = Some(Compositor::new(
                    device,
                    format,
                    &geometry,
                    &views,
                    config.blend,
                    screen,
                ));
            }
        }

        self.layer_bind_groups = geometry
            .viewports
            .iter()
            .zip(&config.layers)
            .map(|(viewport, layer)| {
                scene_pipeline.create_layer_bind_group(device, viewport.clip_scale(layer.resolution))
            })
            .collect();
        self.targets = targets;
        self.config = config;
        Ok(())
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            RenderMode::Foveated => RenderMode::Direct,
            RenderMode::Direct if self.compositor.is_some() => RenderMode::Foveated,
            RenderMode::Direct => {
                eprintln!("Foveated path unavailable, staying in direct mode");
                RenderMode::Direct
            }
        };
    }

    pub fn geometry(&self) -> &LayerGeometry {
        &self.geometry
    }

    /// Screen size the current targets were built for
    pub fn screen(&self) -> (u32, u32) {
        self.screen
    }

    /// Encodes one frame. The command order is fixed: layer 0..N-1 passes
    /// (resolving at end of pass when multisampled), then the composite -
    /// or the single direct pass.
    pub fn render_frame(
        &self,
        encoder: &mut CommandEncoder,
        surface_view: &TextureView,
        scene_pipeline: &ScenePipeline,
        scene: &Scene,
        lights: &LightRig,
        wireframe: bool,
    ) {
        match self.mode {
            RenderMode::Foveated if self.compositor.is_some() => {
                self.render_foveated(encoder, surface_view, scene_pipeline, scene, wireframe);
            }
            _ => self.render_direct(encoder, surface_view, scene_pipeline, scene, lights, wireframe),
        }
    }

    fn render_foveated(
        &self,
        encoder: &mut CommandEncoder,
        surface_view: &TextureView,
        scene_pipeline: &ScenePipeline,
        scene: &Scene,
        wireframe: bool,
    ) {
        let instances = self.config.instance_count as u32;

        for (target, layer_bind_group) in self.targets.iter().zip(&self.layer_bind_groups) {
            let (view, resolve_target) = target.color_attachment();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Layer Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(scene_pipeline.pipeline(wireframe));
            pass.set_bind_group(0, scene_pipeline.frame_bind_group(), &[]);
            pass.set_bind_group(2, layer_bind_group, &[]);
            scene.draw(&mut pass, instances);
        }

        if let Some(compositor) = &self.compositor {
            compositor.composite(encoder, surface_view);
        }
    }

    fn render_direct(
        &self,
        encoder: &mut CommandEncoder,
        surface_view: &TextureView,
        scene_pipeline: &ScenePipeline,
        scene: &Scene,
        lights: &LightRig,
        wireframe: bool,
    ) {
        let instances = self.config.instance_count as u32;

        let (view, resolve_target) = match &self.direct_target.msaa_view {
            Some(msaa_view) => (msaa_view, Some(surface_view)),
            None => (surface_view, None),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Direct Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.direct_target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(scene_pipeline.pipeline(wireframe));
        pass.set_bind_group(0, scene_pipeline.frame_bind_group(), &[]);
        pass.set_bind_group(2, &self.direct_bind_group, &[]);
        scene.draw(&mut pass, instances);

        // Marker overlay doubles as a check that light positions are sane
        lights.draw_markers(&mut pass);
    }
}
