use glam::Vec3;
use wgpu::{BindGroupLayout, Device, Sampler, TextureView};

use crate::rng::Lcg;
use crate::scene::mesh::{Material, Mesh, Vertex};
use crate::scene::Scene;

/// Fixed palette the reference cycled point lights and debug objects through
const PALETTE: [[f32; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 0.0],
];

pub fn palette_colour(i: usize) -> Vec3 {
    Vec3::from_array(PALETTE[i % PALETTE.len()])
}

/// Deterministic block-city tile used when no model is supplied.
///
/// Sized to roughly half a unit so the instance grid spacing of the render
/// loop tiles it into a street grid. None of the materials carry texture
/// maps, which keeps the colour-fallback shading path exercised.
pub fn build_city(
    device: &Device,
    material_layout: &BindGroupLayout,
    sampler: &Sampler,
    fallback_view: &TextureView,
) -> Scene {
    let mut rng = Lcg::new(1);
    let mut meshes = Vec::new();

    // Ground slab
    let (vertices, indices) = box_geometry(
        Vec3::new(-0.24, -0.02, -0.24),
        Vec3::new(0.24, 0.0, 0.24),
    );
    meshes.push(Mesh::new(
        device,
        material_layout,
        sampler,
        fallback_view,
        &vertices,
        &indices,
        Material {
            colour: Vec3::new(0.2, 0.2, 0.2),
            ..Material::default()
        },
    ));

    // Buildings grouped into one mesh per palette colour so each group
    // shares a material bind group
    let grid = 4;
    let mut groups: Vec<(Vec<Vertex>, Vec<u32>)> = vec![Default::default(); PALETTE.len()];

    for gx in 0..grid {
        for gz in 0..grid {
            let index = gx * grid + gz;
            let x = -0.18 + gx as f32 * 0.12;
            let z = -0.18 + gz as f32 * 0.12;
            let half = 0.035;
            let height = rng.range(0.05, 0.25);

            let (vertices, indices) = box_geometry(
                Vec3::new(x - half, 0.0, z - half),
                Vec3::new(x + half, height, z + half),
            );

            let (group_vertices, group_indices) = &mut groups[index % PALETTE.len()];
            let base = group_vertices.len() as u32;
            group_vertices.extend_from_slice(&vertices);
            group_indices.extend(indices.iter().map(|i| i + base));
        }
    }

    for (i, (vertices, indices)) in groups.iter().enumerate() {
        if vertices.is_empty() {
            continue;
        }
        meshes.push(Mesh::new(
            device,
            material_layout,
            sampler,
            fallback_view,
            vertices,
            indices,
            Material {
                colour: palette_colour(i),
                ..Material::default()
            },
        ));
    }

    let scene = Scene::new(meshes);
    println!("Built-in city scene: {} vertices", scene.vertex_count());
    scene
}

/// Axis-aligned box with per-face normals, 24 vertices and 36 indices
pub fn box_geometry(min: Vec3, max: Vec3) -> (Vec<Vertex>, Vec<u32>) {
    let faces: [([f32; 3], [Vec3; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [
                Vec3::new(min.x, min.y, max.z),
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(min.x, max.y, max.z),
            ],
        ),
        (
            [0.0, 0.0, -1.0],
            [
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(max.x, max.y, min.z),
            ],
        ),
        (
            [1.0, 0.0, 0.0],
            [
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(max.x, max.y, max.z),
            ],
        ),
        (
            [-1.0, 0.0, 0.0],
            [
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(min.x, min.y, max.z),
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(min.x, max.y, min.z),
            ],
        ),
        (
            [0.0, 1.0, 0.0],
            [
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(min.x, max.y, min.z),
            ],
        ),
        (
            [0.0, -1.0, 0.0],
            [
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(min.x, min.y, max.z),
            ],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]) {
            vertices.push(Vertex {
                position: corner.to_array(),
                normal,
                tex_coords: uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_24_vertices_and_12_triangles() {
        let (vertices, indices) = box_geometry(Vec3::ZERO, Vec3::ONE);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
    }

    #[test]
    fn box_indices_stay_in_range() {
        let (vertices, indices) = box_geometry(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn box_normals_are_unit_axis_vectors() {
        let (vertices, _) = box_geometry(Vec3::ZERO, Vec3::ONE);
        for v in vertices {
            let n = Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert_eq!(n.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(palette_colour(0), palette_colour(6));
        assert_ne!(palette_colour(0), palette_colour(1));
    }
}
