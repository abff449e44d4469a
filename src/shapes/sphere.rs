// Copyright @yucwang 2026

use crate::core::interaction::{SurfaceIntersection, SurfaceSampleRecord};
use crate::core::shape::Shape;
use crate::math::aabb::AABB;
use crate::math::constants::{Float, PI, Vector2f, Vector3f};
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;
use crate::math::warp::sample_uniform_sphere;

pub struct Sphere {
    center: Vector3f,
    radius: Float,
}

impl Sphere {
    pub fn new(center: Vector3f, radius: Float) -> Self {
        Self { center, radius }
    }

    fn hit_t(&self, ray: &Ray3f) -> Option<Float> {
        let oc = ray.origin() - self.center;
        let b = oc.dot(&ray.dir());
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let t_near = -b - sqrt_d;
        if ray.test_segment(t_near) {
            return Some(t_near);
        }
        let t_far = -b + sqrt_d;
        if ray.test_segment(t_far) {
            return Some(t_far);
        }

        None
    }
}

impl Shape for Sphere {
    fn bounding_box(&self) -> AABB {
        let r = Vector3f::new(self.radius, self.radius, self.radius);
        AABB::new(self.center - r, self.center + r)
    }

    fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let t = self.hit_t(ray)?;
        let p = ray.at(t);
        let normal = (p - self.center) / self.radius;

        Some(SurfaceIntersection::new(
            p,
            normal,
            normal,
            t,
            RGBSpectrum::default(),
            None,
            None,
        ))
    }

    fn ray_intersection_t(&self, ray: &Ray3f) -> bool {
        self.hit_t(ray).is_some()
    }

    fn sample(&self, u: &Vector2f) -> SurfaceSampleRecord {
        let normal = sample_uniform_sphere(u);
        let p = self.center + normal * self.radius;
        let intersection = SurfaceIntersection::new(
            p,
            normal,
            normal,
            0.0,
            RGBSpectrum::default(),
            None,
            None,
        );
        SurfaceSampleRecord::new(intersection, 1.0 / self.surface_area())
    }

    fn surface_area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_from_outside_and_inside() {
        let sphere = Sphere::new(Vector3f::new(0.0, 0.0, 0.0), 1.0);

        let outside = Ray3f::new(Vector3f::new(0.0, 0.0, -3.0),
                                 Vector3f::new(0.0, 0.0, 1.0), None, None);
        let hit = sphere.ray_intersection(&outside).expect("expected hit");
        assert!((hit.t() - 2.0).abs() < 1e-5);
        assert!((hit.geo_normal().z + 1.0).abs() < 1e-5);

        let inside = Ray3f::new(Vector3f::zeros(),
                                Vector3f::new(1.0, 0.0, 0.0), None, None);
        let hit = sphere.ray_intersection(&inside).expect("expected hit");
        assert!((hit.t() - 1.0).abs() < 1e-5);

        let miss = Ray3f::new(Vector3f::new(0.0, 2.0, -3.0),
                              Vector3f::new(0.0, 0.0, 1.0), None, None);
        assert!(sphere.ray_intersection(&miss).is_none());
    }

    #[test]
    fn test_sphere_sample_on_surface() {
        let sphere = Sphere::new(Vector3f::new(1.0, 2.0, 3.0), 0.5);
        let sample = sphere.sample(&Vector2f::new(0.3, 0.8));
        let p = sample.intersection().p();
        let d = (p - Vector3f::new(1.0, 2.0, 3.0)).norm();
        assert!((d - 0.5).abs() < 1e-5);
        assert!((sample.pdf() - 1.0 / sphere.surface_area()).abs() < 1e-8);
    }
}
