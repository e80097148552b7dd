use std::sync::Arc;
use std::time::Instant;

use glam::{Mat3, Mat4, Vec3};
use winit::window::Window;

use crate::camera::Camera;
use crate::cli::Cli;
use crate::config::{BlendPolicy, RenderConfig};
use crate::foveation::{FoveationPipeline, RenderMode};
use crate::frame::{FrameContext, IntervalStats};
use crate::gpu::GpuContext;
use crate::lights::LightRig;
use crate::scene::{self, FrameGlobals, InstanceTransforms, Scene, ScenePipeline};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Fixed world placement for the instanced scene copies: a loose street grid
/// marching away from the origin.
pub fn instance_models(count: usize, scale: f32) -> Vec<Mat4> {
    (0..count)
        .map(|i| {
            let x = ((i % 4) as f32 - 2.0) * 0.5;
            let z = (-(i as f32) + count as f32 / 2.0) * 0.3;
            Mat4::from_translation(Vec3::new(x, 0.0, z)) * Mat4::from_scale(Vec3::splat(scale))
        })
        .collect()
}

pub fn normal_matrix(model: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose())
}

/// Per-frame transform set. Mode-independent by construction: the foveated
/// and direct paths receive the exact same array, so toggling only changes
/// the rendering path, never the scene framing.
pub fn frame_transforms(
    vp: Mat4,
    models: &[Mat4],
    normals: &[Mat4],
) -> Vec<InstanceTransforms> {
    models
        .iter()
        .zip(normals)
        .map(|(&model, &normal)| InstanceTransforms::new(vp, model, normal))
        .collect()
}

/// Top-level renderer: owns the GPU context, the scene and its pipeline, the
/// light rig and the foveation pipeline, and drives one frame at a time.
pub struct Renderer {
    gpu: GpuContext,
    scene: Scene,
    scene_pipeline: ScenePipeline,
    lights: LightRig,
    foveation: FoveationPipeline,
    models: Vec<Mat4>,
    normal_matrices: Vec<Mat4>,
    projection: Mat4,
    last_fov: f32,
    wireframe: bool,
    sample_count: u32,
    blend: BlendPolicy,
    draw_timing: Option<IntervalStats>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, cli: &Cli) -> Result<Self> {
        let gpu = GpuContext::new(window).await?;
        let (width, height) = gpu.size();
        let format = gpu.surface_format();

        let mut config = RenderConfig::default_for_screen(width, height);
        config.sample_count = cli.samples;
        config.instance_count = cli.instances;
        config.light_count = cli.lights;
        config.blend = cli.blend;
        // Configuration problems are fatal here, before targets exist
        config.validate((width, height))?;

        let lights = LightRig::new(
            gpu.device(),
            format,
            config.effective_samples(),
            config.light_count,
        );
        let scene_pipeline = ScenePipeline::new(
            gpu.device(),
            gpu.queue(),
            format,
            config.effective_samples(),
            gpu.supports_wireframe(),
            config.instance_count,
            lights.buffer(),
        );
        let scene = scene::load(
            gpu.device(),
            gpu.queue(),
            scene_pipeline.material_layout(),
            scene_pipeline.sampler(),
            scene_pipeline.fallback_view(),
            cli.model.as_deref(),
        );

        let models = instance_models(config.instance_count, cli.model_scale);
        let normal_matrices = models.iter().map(|&m| normal_matrix(m)).collect();

        let sample_count = config.sample_count;
        let foveation =
            FoveationPipeline::new(gpu.device(), &scene_pipeline, format, config, (width, height))?;

        println!(
            "Renderer initialized: {}x{}, {} meshes, mode {:?}",
            width,
            height,
            scene.mesh_count(),
            foveation.mode()
        );

        Ok(Self {
            gpu,
            scene,
            scene_pipeline,
            lights,
            foveation,
            models,
            normal_matrices,
            projection: Mat4::IDENTITY,
            last_fov: f32::NAN,
            wireframe: false,
            sample_count,
            blend: cli.blend,
            draw_timing: cli
                .draw_timing
                .then(|| IntervalStats::new("ms/draw", 5.0)),
        })
    }

    pub fn mode(&self) -> RenderMode {
        self.foveation.mode()
    }

    pub fn toggle_foveation(&mut self) {
        self.foveation.toggle_mode();
        println!("Swapped rendering method (disregard next timing result)");
    }

    pub fn toggle_wireframe(&mut self) {
        if self.gpu.supports_wireframe() {
            self.wireframe = !self.wireframe;
        } else {
            eprintln!("Wireframe not supported by this adapter");
        }
    }

    /// Tears down every render target and rebuilds for the new screen size;
    /// nothing sized to the old screen survives this call.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);

        let mut config = RenderConfig::default_for_screen(width, height);
        config.sample_count = self.sample_count;
        config.instance_count = self.models.len();
        config.light_count = self.lights.count() as usize;
        config.blend = self.blend;

        if let Err(error) = self.foveation.reconfigure(
            self.gpu.device(),
            self.gpu.queue(),
            &self.scene_pipeline,
            self.gpu.surface_format(),
            config,
            (width, height),
        ) {
            eprintln!("Reconfiguration failed: {}", error);
        }

        // Aspect ratio changed; recompute the projection on the next frame
        self.last_fov = f32::NAN;
    }

    /// Draws one frame. The projection matrix is only rebuilt on the frame a
    /// FOV change is detected.
    pub fn render(&mut self, camera: &Camera, _frame: &FrameContext) -> Result<()> {
        let (width, height) = self.gpu.size();

        if camera.fov != self.last_fov {
            self.projection = Mat4::perspective_rh(
                camera.fov.to_radians(),
                width as f32 / height as f32,
                0.1,
                100.0,
            );
            self.last_fov = camera.fov;
        }

        let vp = self.projection * camera.view_matrix();
        let transforms = frame_transforms(vp, &self.models, &self.normal_matrices);
        self.scene_pipeline.write_frame(
            self.gpu.queue(),
            &transforms,
            &FrameGlobals::new(camera.position.to_array(), self.lights.count()),
        );
        self.lights.write_frame(self.gpu.queue(), vp, (width, height));

        let surface_texture = match self.gpu.surface().get_current_texture() {
            Ok(texture) => texture,
            // The next frame is the retry
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(error) => return Err(format!("surface error: {:?}", error).into()),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draw_start = self.draw_timing.as_ref().map(|_| Instant::now());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.foveation.render_frame(
            &mut encoder,
            &surface_view,
            &self.scene_pipeline,
            &self.scene,
            &self.lights,
            self.wireframe,
        );
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        if let Some(start) = draw_start {
            // Diagnostic only: serializes the GPU to attribute time to draws
            self.gpu.wait_idle();
            if let Some(stats) = &mut self.draw_timing {
                stats.report(start.elapsed().as_secs_f32());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_models_form_a_grid() {
        let models = instance_models(20, 1.0);
        assert_eq!(models.len(), 20);
        // x repeats with period 4
        let p0 = models[0].transform_point3(Vec3::ZERO);
        let p4 = models[4].transform_point3(Vec3::ZERO);
        assert!((p0.x - p4.x).abs() < 1e-6);
        assert!(p0.z > p4.z);
    }

    #[test]
    fn instance_models_apply_scale() {
        let models = instance_models(1, 0.001);
        let unit = models[0].transform_vector3(Vec3::X);
        assert!((unit.length() - 0.001).abs() < 1e-9);
    }

    #[test]
    fn normal_matrix_inverts_scale() {
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let n = normal_matrix(model);
        let transformed = n.transform_vector3(Vec3::Y);
        assert!((transformed.length() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn frame_transforms_are_mode_independent_and_deterministic() {
        let models = instance_models(8, 1.0);
        let normals: Vec<Mat4> = models.iter().map(|&m| normal_matrix(m)).collect();
        let vp = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);

        let first = frame_transforms(vp, &models, &normals);
        let second = frame_transforms(vp, &models, &normals);
        assert_eq!(first.len(), 8);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.mvp, b.mvp);
            assert_eq!(a.model, b.model);
        }
    }
}
