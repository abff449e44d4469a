// Copyright @yucwang 2026

use crate::core::interaction::{SurfaceIntersection, SurfaceSampleRecord};
use crate::core::shape::Shape;
use crate::math::aabb::AABB;
use crate::math::constants::{EPSILON, Float, Vector2f, Vector3f};
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;

// Parallelogram spanned by two edge vectors from a corner point.
pub struct Rectangle {
    origin: Vector3f,
    edge_u: Vector3f,
    edge_v: Vector3f,
    normal: Vector3f,
    area: Float,
    inv_area: Float,
}

impl Rectangle {
    pub fn new(origin: Vector3f, edge_u: Vector3f, edge_v: Vector3f) -> Self {
        let cross = edge_u.cross(&edge_v);
        let area = cross.norm();
        let inv_area = if area > 0.0 { 1.0 / area } else { 0.0 };
        let normal = if area > 0.0 {
            cross / area
        } else {
            Vector3f::new(0.0, 0.0, 1.0)
        };

        Self { origin, edge_u, edge_v, normal, area, inv_area }
    }

    // Plane hit plus edge-space coordinates, solved through the Gram system
    // of the two (possibly non-orthogonal) edges.
    fn intersect_plane(&self, ray: &Ray3f) -> Option<(Float, Float, Float)> {
        let denom = ray.dir().dot(&self.normal);
        if denom.abs() < EPSILON {
            return None;
        }

        let t = (self.origin - ray.origin()).dot(&self.normal) / denom;
        let q = ray.at(t) - self.origin;

        let uu = self.edge_u.dot(&self.edge_u);
        let vv = self.edge_v.dot(&self.edge_v);
        let uv = self.edge_u.dot(&self.edge_v);
        let det = uu * vv - uv * uv;
        if det.abs() < EPSILON * EPSILON {
            return None;
        }

        let qu = q.dot(&self.edge_u);
        let qv = q.dot(&self.edge_v);
        let a = (vv * qu - uv * qv) / det;
        let b = (uu * qv - uv * qu) / det;
        if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
            return None;
        }

        Some((t, a, b))
    }
}

impl Shape for Rectangle {
    fn bounding_box(&self) -> AABB {
        let mut bbox = AABB::default();
        bbox.expand_by_point(&self.origin);
        bbox.expand_by_point(&(self.origin + self.edge_u));
        bbox.expand_by_point(&(self.origin + self.edge_v));
        bbox.expand_by_point(&(self.origin + self.edge_u + self.edge_v));
        bbox
    }

    fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let (t, _, _) = self.intersect_plane(ray)?;
        if !ray.test_segment(t) {
            return None;
        }

        Some(SurfaceIntersection::new(
            ray.at(t),
            self.normal,
            self.normal,
            t,
            RGBSpectrum::default(),
            None,
            None,
        ))
    }

    fn ray_intersection_t(&self, ray: &Ray3f) -> bool {
        match self.intersect_plane(ray) {
            Some((t, _, _)) => ray.test_segment(t),
            None => false,
        }
    }

    fn sample(&self, u: &Vector2f) -> SurfaceSampleRecord {
        let p = self.origin + self.edge_u * u.x + self.edge_v * u.y;
        let intersection = SurfaceIntersection::new(
            p,
            self.normal,
            self.normal,
            0.0,
            RGBSpectrum::default(),
            None,
            None,
        );
        SurfaceSampleRecord::new(intersection, self.inv_area)
    }

    fn surface_area(&self) -> Float {
        self.area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_floor() -> Rectangle {
        Rectangle::new(Vector3f::new(-1.0, 0.0, -1.0),
                       Vector3f::new(2.0, 0.0, 0.0),
                       Vector3f::new(0.0, 0.0, 2.0))
    }

    #[test]
    fn test_rectangle_hit_and_miss() {
        let rect = unit_floor();
        assert!((rect.surface_area() - 4.0).abs() < 1e-5);

        let hit_ray = Ray3f::new(Vector3f::new(0.5, 1.0, 0.5),
                                 Vector3f::new(0.0, -1.0, 0.0), None, None);
        let hit = rect.ray_intersection(&hit_ray).expect("expected hit");
        assert!((hit.t() - 1.0).abs() < 1e-5);
        assert!(rect.ray_intersection_t(&hit_ray));

        let miss_ray = Ray3f::new(Vector3f::new(3.0, 1.0, 0.0),
                                  Vector3f::new(0.0, -1.0, 0.0), None, None);
        assert!(rect.ray_intersection(&miss_ray).is_none());

        let parallel_ray = Ray3f::new(Vector3f::new(0.0, 1.0, 0.0),
                                      Vector3f::new(1.0, 0.0, 0.0), None, None);
        assert!(rect.ray_intersection(&parallel_ray).is_none());
    }

    #[test]
    fn test_rectangle_sample_on_surface() {
        let rect = unit_floor();
        let sample = rect.sample(&Vector2f::new(0.25, 0.75));
        let p = sample.intersection().p();
        assert!((p.x + 0.5).abs() < 1e-5);
        assert!((p.y - 0.0).abs() < 1e-5);
        assert!((p.z - 0.5).abs() < 1e-5);
        assert!((sample.pdf() - 0.25).abs() < 1e-5);
    }
}
