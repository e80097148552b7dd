use wgpu::{Device, Texture, TextureFormat, TextureView};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24Plus;

/// How a layer's image becomes sampleable by the compositor. Chosen once at
/// pipeline construction from the configured sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    /// Single-sampled targets are sampled directly
    PassThrough,
    /// Multisampled targets resolve into an intermediate single-sample image
    /// at the end of each layer's render pass
    Multisample { samples: u32 },
}

impl ResolveStage {
    pub fn for_sample_count(sample_count: u32) -> Self {
        if sample_count > 1 {
            Self::Multisample {
                samples: sample_count,
            }
        } else {
            Self::PassThrough
        }
    }

    pub fn samples(&self) -> u32 {
        match self {
            Self::PassThrough => 1,
            Self::Multisample { samples } => *samples,
        }
    }
}

/// One layer's render target: a color attachment and a depth attachment at
/// the layer's resolution, plus a resolve image when multisampling.
///
/// Owned exclusively by the pipeline; recreated as a set on resize and never
/// mid-frame.
pub struct OffscreenTarget {
    color: Texture,
    color_view: TextureView,
    depth_view: TextureView,
    resolve_view: Option<TextureView>,
    resolution: (u32, u32),
}

impl OffscreenTarget {
    /// Allocates and validates the attachments. An incomplete target would
    /// render silently black, so creation errors are surfaced immediately.
    pub fn create(
        device: &Device,
        resolution: (u32, u32),
        format: TextureFormat,
        resolve: ResolveStage,
    ) -> Result<Self> {
        let (width, height) = resolution;
        let samples = resolve.samples();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Color Attachment"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: if samples > 1 {
                wgpu::TextureUsages::RENDER_ATTACHMENT
            } else {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            },
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Depth Attachment"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let resolve_view = match resolve {
            ResolveStage::PassThrough => None,
            ResolveStage::Multisample { .. } => {
                let resolved = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Layer Resolve Image"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                });
                Some(resolved.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        };

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!(
                "render target {}x{} ({} samples) is not complete: {}",
                width, height, samples, error
            )
            .into());
        }

        Ok(Self {
            color,
            color_view,
            depth_view,
            resolve_view,
            resolution,
        })
    }

    /// Color attachment for the layer's render pass. With multisampling the
    /// resolve image is named as the pass's resolve target, so the resolve
    /// runs after every draw of the layer and before the compositor samples
    /// it; depth is discarded.
    pub fn color_attachment(&self) -> (&TextureView, Option<&TextureView>) {
        (&self.color_view, self.resolve_view.as_ref())
    }

    pub fn depth_view(&self) -> &TextureView {
        &self.depth_view
    }

    /// The single-sample image the compositor binds
    pub fn sampled_view(&self) -> &TextureView {
        self.resolve_view.as_ref().unwrap_or(&self.color_view)
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn format(&self) -> TextureFormat {
        self.color.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_stage_selection() {
        assert_eq!(ResolveStage::for_sample_count(0), ResolveStage::PassThrough);
        assert_eq!(ResolveStage::for_sample_count(1), ResolveStage::PassThrough);
        assert_eq!(
            ResolveStage::for_sample_count(4),
            ResolveStage::Multisample { samples: 4 }
        );
    }

    #[test]
    fn pass_through_renders_single_sampled() {
        assert_eq!(ResolveStage::PassThrough.samples(), 1);
        assert_eq!(ResolveStage::Multisample { samples: 8 }.samples(), 8);
    }
}
