// Copyright @yucwang 2026

use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::math::constants::{Vector2f, Vector3f};

pub trait Integrator: Send + Sync {
    fn samples_per_pixel(&self) -> u32;

    // Estimate radiance through one film sample at the given pixel.
    fn trace_ray_forward(&self, scene: &Scene, sensor: &dyn Sensor,
                         pixel: Vector2f, seed: u64) -> Vector3f;
}
