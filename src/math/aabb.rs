// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f, FLOAT_MIN, FLOAT_MAX};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AABB {
    pub p_min: Vector3f,
    pub p_max: Vector3f
}

impl Default for AABB {
    fn default() -> Self {
        Self { p_min: Vector3f::new(FLOAT_MAX, FLOAT_MAX, FLOAT_MAX),
               p_max: Vector3f::new(FLOAT_MIN, FLOAT_MIN, FLOAT_MIN) }
    }
}

impl AABB {
    pub fn new(p_min: Vector3f, p_max: Vector3f) -> Self {
        let mut min = Vector3f::new(0.0, 0.0, 0.0);
        let mut max = Vector3f::new(0.0, 0.0, 0.0);
        for idx in 0..3 {
            min[idx] = p_min[idx].min(p_max[idx]);
            max[idx] = p_max[idx].max(p_min[idx]);
        }
        Self { p_min: min, p_max: max }
    }

    pub fn center(&self) -> Vector3f {
        0.5f32 * self.p_min + 0.5f32 * self.p_max
    }

    pub fn expand_by_point(&mut self, p: &Vector3f) {
        for idx in 0..3 {
            self.p_min[idx] = self.p_min[idx].min(p[idx]);
            self.p_max[idx] = self.p_max[idx].max(p[idx]);
        }
    }

    pub fn expand_by_aabb(&mut self, other: &AABB) {
        for idx in 0..3 {
            self.p_min[idx] = self.p_min[idx].min(other.p_min[idx]);
            self.p_max[idx] = self.p_max[idx].max(other.p_max[idx]);
        }
    }

    pub fn contains(&self, p: &Vector3f) -> bool {
        let mut result = true;
        for idx in 0..3 {
            if p[idx] < self.p_min[idx] || p[idx] > self.p_max[idx] {
                result = false;
                break;
            }
        }

        result
    }

    // Squared distance from p to the closest point of the box, 0 when inside.
    pub fn distance2(&self, p: &Vector3f) -> Float {
        let mut d2: Float = 0.0;
        for idx in 0..3 {
            let v = p[idx].max(self.p_min[idx]).min(self.p_max[idx]) - p[idx];
            d2 += v * v;
        }

        d2
    }

    // Squared distance from p to the farthest corner of the box.
    pub fn max_distance2(&self, p: &Vector3f) -> Float {
        let mut d2: Float = 0.0;
        for idx in 0..3 {
            let v = (p[idx] - self.p_min[idx]).abs().max((p[idx] - self.p_max[idx]).abs());
            d2 += v * v;
        }

        d2
    }

    pub fn diagnal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    pub fn is_valid(&self) -> bool {
        let mut result = true;
        for idx in 0..3 {
            if self.p_min[idx] > self.p_max[idx] {
                result = false;
                break;
            }
        }

        result
    }
}

/* Test for AABB */
#[cfg(test)]
mod tests {
    use super::AABB;
    use super::Vector3f;
    use crate::core::rng::LcgRng;

    #[test]
    fn test_aabb_geometry() {
        let min = Vector3f::new(1.0, 7.0, 3.0);
        let max = Vector3f::new(4.0, 4.0, 4.0);
        let mut bbox: AABB = AABB::new(min, max);

        let center = bbox.center();
        assert!((center[0] - 2.5f32).abs() < 1e-6);
        assert!((center[1] - 5.5f32).abs() < 1e-6);
        assert!((center[2] - 3.5f32).abs() < 1e-6);

        bbox.expand_by_point(&Vector3f::new(-1.0, 5.0, 6.0));
        assert!((bbox.p_min[0] + 1.0f32).abs() < 1e-6);
        assert!((bbox.p_max[2] - 6.0f32).abs() < 1e-6);

        let mut bbox1: AABB = AABB::default();
        assert!(!bbox1.is_valid());
        bbox1.expand_by_aabb(&bbox);
        assert!(bbox1.is_valid());
        assert_eq!(bbox1, bbox);
    }

    #[test]
    fn test_aabb_contains_and_distance2() {
        let bbox = AABB::new(Vector3f::new(-1.0, -1.0, -1.0),
                             Vector3f::new(1.0, 1.0, 1.0));

        assert!(bbox.contains(&Vector3f::new(0.0, 0.0, 0.0)));
        assert!(bbox.contains(&Vector3f::new(1.0, -1.0, 1.0)));
        assert!(!bbox.contains(&Vector3f::new(1.1, 0.0, 0.0)));

        assert_eq!(bbox.distance2(&Vector3f::new(0.5, -0.5, 0.0)), 0.0);
        assert!((bbox.distance2(&Vector3f::new(2.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert!((bbox.distance2(&Vector3f::new(2.0, 2.0, 0.0)) - 2.0).abs() < 1e-6);

        assert!((bbox.max_distance2(&Vector3f::new(0.0, 0.0, 0.0)) - 3.0).abs() < 1e-6);
        assert!((bbox.max_distance2(&Vector3f::new(2.0, 0.0, 0.0)) - 11.0).abs() < 1e-5);
    }

    // distance2 and max_distance2 bound the squared distance to every point
    // of the box.
    #[test]
    fn test_aabb_distance_bounds_random() {
        let mut rng = LcgRng::new(7);
        for _ in 0..1000 {
            let a = Vector3f::new(rng.next_f32() * 8.0 - 4.0,
                                  rng.next_f32() * 8.0 - 4.0,
                                  rng.next_f32() * 8.0 - 4.0);
            let b = Vector3f::new(rng.next_f32() * 8.0 - 4.0,
                                  rng.next_f32() * 8.0 - 4.0,
                                  rng.next_f32() * 8.0 - 4.0);
            let bbox = AABB::new(a, b);
            let p = Vector3f::new(rng.next_f32() * 16.0 - 8.0,
                                  rng.next_f32() * 16.0 - 8.0,
                                  rng.next_f32() * 16.0 - 8.0);

            let lo = bbox.distance2(&p);
            let hi = bbox.max_distance2(&p);
            for _ in 0..32 {
                let q = Vector3f::new(
                    bbox.p_min[0] + rng.next_f32() * (bbox.p_max[0] - bbox.p_min[0]),
                    bbox.p_min[1] + rng.next_f32() * (bbox.p_max[1] - bbox.p_min[1]),
                    bbox.p_min[2] + rng.next_f32() * (bbox.p_max[2] - bbox.p_min[2]));
                let d2 = (q - p).dot(&(q - p));
                assert!(lo <= d2 + 1e-4);
                assert!(d2 <= hi + 1e-4);
            }
        }
    }
}
