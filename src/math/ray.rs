// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

pub struct Ray3f {
    origin: Vector3f,
    dir: Vector3f,
    pub min_t: Float,
    pub max_t: Float,
    pub depth: u32,
    pub dirac_delta: bool,
    pub medium_ior: Float,
}

impl Ray3f {
    pub fn new(o: Vector3f, d: Vector3f,
               min_t: Option<Float>, max_t: Option<Float>) -> Self {
        Self { origin: o, dir: d.normalize(),
               min_t: min_t.unwrap_or(0.0),
               max_t: max_t.unwrap_or(std::f32::MAX),
               depth: 0,
               dirac_delta: false,
               medium_ior: 1.0 }
    }

    pub fn with_medium(o: Vector3f, d: Vector3f, medium_ior: Float) -> Self {
        let mut ray = Self::new(o, d, None, None);
        ray.medium_ior = medium_ior;
        ray
    }

    // Continuation ray spawned at a surface interaction.
    pub fn spawn(o: Vector3f, d: Vector3f, depth: u32,
                 dirac_delta: bool, medium_ior: Float) -> Self {
        let mut ray = Self::new(o, d, Some(0.0), None);
        ray.depth = depth;
        ray.dirac_delta = dirac_delta;
        ray.medium_ior = medium_ior;
        ray
    }

    pub fn origin(&self) -> Vector3f {
        self.origin
    }

    pub fn dir(&self) -> Vector3f {
        self.dir
    }

    pub fn at(&self, t: Float) -> Vector3f {
        self.origin + self.dir * t
    }

    pub fn update(&mut self, t: Float) -> bool {
        if t < self.min_t || t > self.max_t {
            false
        } else {
            self.max_t = t;
            true
        }
    }

    pub fn test_segment(&self, t: Float) -> bool {
        t >= self.min_t && t <= self.max_t
    }
}

/* Tests for Ray */

#[cfg(test)]
mod tests {
    use super::Ray3f;
    use super::Vector3f;

    #[test]
    fn test_ray3f() {
        let o = Vector3f::new(0.0, 0.0, 0.0);
        let d = Vector3f::new(1.0, 0.0, 1.0);
        let mut ray = Ray3f::new(o, d, None, None);
        assert_eq!(o, ray.origin());
        assert_eq!(ray.depth, 0);
        assert!(!ray.dirac_delta);

        let v1 = ray.at(2.0);
        assert!((v1[0] - std::f32::consts::SQRT_2).abs() < 1e-6);
        assert!((v1[1] - 0.0).abs() < 1e-6);
        assert!((v1[2] - std::f32::consts::SQRT_2).abs() < 1e-6);

        let status1 = ray.update(100.0);
        let status2 = ray.update(105.0);
        assert_eq!(status1, true);
        assert_eq!(status2, false);
    }

    #[test]
    fn test_ray3f_spawn() {
        let ray = Ray3f::spawn(Vector3f::new(1.0, 2.0, 3.0),
                               Vector3f::new(0.0, 1.0, 0.0),
                               3, true, 1.5);
        assert_eq!(ray.depth, 3);
        assert!(ray.dirac_delta);
        assert!((ray.medium_ior - 1.5).abs() < 1e-6);
    }
}
