use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Mat3, Mat4, Vec3};
use wgpu::{BindGroupLayout, Device, Queue, Sampler, TextureView};

use crate::scene::mesh::{Material, Mesh, Vertex};
use crate::scene::Scene;

/// Loads a glTF model into a renderable scene.
///
/// The node hierarchy is flattened - node transforms are baked into the
/// vertices - since the scene is drawn statically and the per-instance
/// transforms come from the renderer instead.
pub fn load_scene(
    device: &Device,
    queue: &Queue,
    material_layout: &BindGroupLayout,
    sampler: &Sampler,
    fallback_view: &TextureView,
    path: impl AsRef<Path>,
) -> Result<Scene> {
    let path = path.as_ref();
    println!("Loading glTF file: {:?}", path);

    let (gltf, buffers, images) =
        gltf::import(path).context(format!("Failed to load glTF file: {:?}", path))?;

    let mut loader = Loader {
        device,
        queue,
        material_layout,
        sampler,
        fallback_view,
        buffers: &buffers,
        images: &images,
        texture_cache: HashMap::new(),
        meshes: Vec::new(),
    };

    for scene in gltf.scenes() {
        for node in scene.nodes() {
            loader.process_node(&node, Mat4::IDENTITY)?;
        }
    }

    if loader.meshes.is_empty() {
        anyhow::bail!("no geometry found in {:?}", path);
    }

    let scene = Scene::new(loader.meshes);
    println!("Vertices: {}", scene.vertex_count());
    Ok(scene)
}

struct Loader<'a> {
    device: &'a Device,
    queue: &'a Queue,
    material_layout: &'a BindGroupLayout,
    sampler: &'a Sampler,
    fallback_view: &'a TextureView,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    /// Shared images upload once, keyed by source image index
    texture_cache: HashMap<usize, TextureView>,
    meshes: Vec<Mesh>,
}

impl Loader<'_> {
    fn process_node(&mut self, node: &gltf::Node, parent_transform: Mat4) -> Result<()> {
        let local = Mat4::from_cols_array_2d(&node.transform().matrix());
        let transform = parent_transform * local;

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                self.process_primitive(&primitive, transform)?;
            }
        }

        for child in node.children() {
            self.process_node(&child, transform)?;
        }
        Ok(())
    }

    fn process_primitive(
        &mut self,
        primitive: &gltf::Primitive,
        transform: Mat4,
    ) -> Result<()> {
        let reader = primitive.reader(|buffer| Some(&self.buffers[buffer.index()]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .context("mesh primitive has no positions")?
            .map(|p| transform.transform_point3(Vec3::from_array(p)))
            .collect();
        if positions.is_empty() {
            return Ok(());
        }

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let normals: Vec<Vec3> = match reader.read_normals() {
            Some(normals) => normals
                .map(|n| (normal_matrix * Vec3::from_array(n)).normalize_or_zero())
                .collect(),
            None => compute_vertex_normals(&positions, &indices),
        };

        let (tex_coords, has_tex_coords) = match reader.read_tex_coords(0) {
            Some(uv) => (uv.into_f32().map(|t| [t[0], t[1]]).collect(), true),
            None => (vec![[0.0, 0.0]; positions.len()], false),
        };

        let vertices: Vec<Vertex> = positions
            .iter()
            .zip(&normals)
            .zip(&tex_coords)
            .map(|((p, n), t)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                tex_coords: *t,
            })
            .collect();

        let material = self.load_material(primitive, has_tex_coords);
        self.meshes.push(Mesh::new(
            self.device,
            self.material_layout,
            self.sampler,
            self.fallback_view,
            &vertices,
            &indices,
            material,
        ));
        Ok(())
    }

    /// Textures only count when the primitive actually carries texture
    /// coordinates; anything missing leaves the map explicitly disabled and
    /// falls back to the base colour factor.
    fn load_material(&mut self, primitive: &gltf::Primitive, has_tex_coords: bool) -> Material {
        let pbr = primitive.material().pbr_metallic_roughness();
        let factor = pbr.base_color_factor();

        let diffuse = if has_tex_coords {
            pbr.base_color_texture()
                .and_then(|info| self.upload_image(info.texture().source().index()))
        } else {
            None
        };

        Material {
            diffuse,
            // glTF metallic-roughness materials have no specular map
            specular: None,
            colour: Vec3::new(factor[0], factor[1], factor[2]),
            shininess: 32.0,
        }
    }

    fn upload_image(&mut self, index: usize) -> Option<TextureView> {
        if let Some(view) = self.texture_cache.get(&index) {
            return Some(view.clone());
        }

        let data = &self.images[index];
        let pixels = match to_rgba(data) {
            Some(pixels) => pixels,
            None => {
                eprintln!("Unsupported texture format {:?} in image {}", data.format, index);
                return None;
            }
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Texture"),
            size: wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.texture_cache.insert(index, view.clone());
        Some(view)
    }
}

/// Expands 8-bit images to RGBA; there is no 24bpp texture format on the GPU
fn to_rgba(data: &gltf::image::Data) -> Option<Vec<u8>> {
    use gltf::image::Format;

    let pixel_count = (data.width * data.height) as usize;
    match data.format {
        Format::R8G8B8A8 => Some(data.pixels.clone()),
        Format::R8G8B8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                out.extend_from_slice(rgb);
                out.push(255);
            }
            Some(out)
        }
        Format::R8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for &v in &data.pixels {
                out.extend_from_slice(&[v, v, v, 255]);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Area-weighted vertex normals for primitives that ship without them
fn compute_vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        );
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .map(|n| {
            if n.length_squared() > 0.0 {
                n.normalize()
            } else {
                Vec3::Y
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_normals_face_out_of_the_winding() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let normals = compute_vertex_normals(&positions, &[0, 1, 2]);
        for n in normals {
            assert!((n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn isolated_vertices_default_to_up() {
        let positions = vec![Vec3::ZERO];
        let normals = compute_vertex_normals(&positions, &[]);
        assert_eq!(normals[0], Vec3::Y);
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let data = gltf::image::Data {
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
            pixels: vec![10, 20, 30, 40, 50, 60],
        };
        let rgba = to_rgba(&data).unwrap();
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
