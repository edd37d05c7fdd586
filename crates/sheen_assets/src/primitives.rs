use std::f32::consts::PI;

use crate::{error::Result, geometry::Geometry};

/// UV sphere centered on the origin, Y up, counter-clockwise front faces.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Result<Geometry> {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let ring = (width_segments + 1) as usize;
    let vertex_count = ring * (height_segments + 1) as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        // Latitude: 0 at the north pole, PI at the south pole.
        let theta = v * PI;

        for x in 0..=width_segments {
            let u = x as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;

            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            positions.push(normal.map(|c| c * radius));
            normals.push(normal);
            uvs.push([u, 1.0 - v]);
        }
    }

    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
    let ring = width_segments + 1;
    for y in 0..height_segments {
        for x in 0..width_segments {
            let a = y * ring + x + 1;
            let b = y * ring + x;
            let c = (y + 1) * ring + x;
            let d = (y + 1) * ring + x + 1;

            // The pole rows collapse to a point; skip their degenerate triangles.
            if y != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if y != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry::from_indices(positions, normals, Some(uvs), &indices)
}

/// Single triangle facing +Z, handy for smoke tests of the pipeline.
pub fn triangle() -> Result<Geometry> {
    Geometry::from_indices(
        vec![[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]],
        vec![[0.0, 0.0, 1.0]; 3],
        Some(vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]]),
        &[0, 1, 2],
    )
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::IndexWidth;

    #[test]
    fn sphere_normals_are_unit_and_radial() {
        let geometry = sphere(0.15, 32, 32).unwrap();

        for (p, n) in geometry.positions().iter().zip(geometry.normals()) {
            let n = Vec3::from_array(*n);
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!(Vec3::from_array(*p).abs_diff_eq(n * 0.15, 1e-5));
        }
    }

    #[test]
    fn sphere_picks_index_width_from_vertex_count() {
        // 33 * 33 = 1089 vertices -> 16-bit.
        let geometry = sphere(1.0, 32, 32).unwrap();
        assert_eq!(geometry.vertex_count(), 1089);
        assert_eq!(geometry.indices().width(), IndexWidth::U16);

        // 4 * 3 = 12 vertices -> 8-bit.
        let small = sphere(1.0, 3, 2).unwrap();
        assert_eq!(small.indices().width(), IndexWidth::U8);
    }

    #[test]
    fn sphere_faces_wind_outward() {
        let geometry = sphere(1.0, 16, 8).unwrap();
        let positions = geometry.positions();
        let indices: Vec<u32> = geometry.indices().iter().collect();

        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(positions[i as usize]));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "inward face {tri:?}");
        }
    }
}
