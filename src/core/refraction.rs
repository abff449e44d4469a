// Copyright @yucwang 2026

use crate::math::constants::Float;
use crate::math::ray::Ray3f;

// Stack of nested transmissive media along one traced path. The top entry is
// the medium the ray currently travels in; the entry below it is what the
// ray would return to on exit. Lives exactly as long as the path.
pub struct RefractionHistory {
    stack: Vec<Float>,
}

impl RefractionHistory {
    pub fn new(ray: &Ray3f) -> Self {
        Self { stack: vec![ray.medium_ior] }
    }

    // Index of refraction surrounding the medium the ray is inside of.
    pub fn external_ior(&self) -> Float {
        let len = self.stack.len();
        if len >= 2 {
            self.stack[len - 2]
        } else {
            self.stack[len - 1]
        }
    }

    pub fn update(&mut self, ray: &Ray3f) {
        let top = self.stack[self.stack.len() - 1];
        if ray.medium_ior == top {
            return;
        }

        let len = self.stack.len();
        if len >= 2 && self.stack[len - 2] == ray.medium_ior {
            // Refracted back out of the current medium.
            self.stack.pop();
        } else {
            // Refracted into a new medium.
            self.stack.push(ray.medium_ior);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RefractionHistory;
    use crate::math::constants::Vector3f;
    use crate::math::ray::Ray3f;

    fn ray_in_medium(ior: f32) -> Ray3f {
        Ray3f::with_medium(Vector3f::zeros(), Vector3f::new(0.0, 0.0, 1.0), ior)
    }

    #[test]
    fn test_enter_and_exit_nested_media() {
        let air = ray_in_medium(1.0);
        let mut history = RefractionHistory::new(&air);
        assert_eq!(history.external_ior(), 1.0);

        // Enter glass.
        let glass = ray_in_medium(1.5);
        history.update(&glass);
        assert_eq!(history.external_ior(), 1.0);

        // Enter a water inclusion inside the glass.
        let water = ray_in_medium(1.33);
        history.update(&water);
        assert_eq!(history.external_ior(), 1.5);

        // Exit back into glass, then into air.
        history.update(&glass);
        assert_eq!(history.external_ior(), 1.0);
        history.update(&air);
        assert_eq!(history.external_ior(), 1.0);
    }

    #[test]
    fn test_reflection_keeps_state() {
        let glass = ray_in_medium(1.5);
        let mut history = RefractionHistory::new(&ray_in_medium(1.0));
        history.update(&glass);
        let before = history.external_ior();
        // A reflected ray stays in the same medium.
        history.update(&glass);
        assert_eq!(history.external_ior(), before);
    }
}
