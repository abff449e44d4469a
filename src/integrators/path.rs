// Copyright @yucwang 2026

use crate::core::integrator::Integrator;
use crate::core::interaction::Interaction;
use crate::core::refraction::RefractionHistory;
use crate::core::sampler::{Dim, Sampler};
use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::math::constants::{EPSILON, Float, Vector2f, Vector3f};
use crate::math::ray::Ray3f;
use crate::math::spectrum::{RGBSpectrum, Spectrum};

// Baseline unidirectional path tracer with next event estimation, kept as a
// reference against the photon mapping integrator.
pub struct PathIntegrator {
    pub max_depth: u32,
    pub samples_per_pixel: u32,
}

impl PathIntegrator {
    pub fn new(max_depth: u32, samples_per_pixel: u32) -> Self {
        Self { max_depth, samples_per_pixel }
    }
}

impl Integrator for PathIntegrator {
    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    fn trace_ray_forward(&self, scene: &Scene, sensor: &dyn Sensor,
                         pixel: Vector2f, seed: u64) -> Vector3f {
        let mut sampler = Sampler::new((seed ^ (seed >> 32)) as u32);

        let bitmap = sensor.bitmap();
        let width = bitmap.width().max(1) as Float;
        let height = bitmap.height().max(1) as Float;

        let jitter = sampler.get::<2>(Dim::Camera);
        let u = Vector2f::new((pixel.x + jitter[0]) / width,
                              (pixel.y + jitter[1]) / height);
        let mut ray = sensor.sample_ray(&u);
        ray.medium_ior = scene.ior;

        self.trace_path(scene, ray, &mut sampler).to_vector()
    }
}

impl PathIntegrator {
    fn trace_path(&self, scene: &Scene, mut ray: Ray3f, sampler: &mut Sampler) -> RGBSpectrum {
        let mut radiance = RGBSpectrum::default();
        let mut throughput = RGBSpectrum::new(1.0, 1.0, 1.0);
        let mut refraction_history = RefractionHistory::new(&ray);
        let mut prev_bsdf_pdf: Float = 0.0;

        for bounce in 0..self.max_depth {
            sampler.shuffle();

            let intersection = match scene.ray_intersection(&ray) {
                Some(hit) => hit,
                None => break,
            };
            let interaction =
                match Interaction::new(&intersection, &ray, refraction_history.external_ior()) {
                    Some(interaction) => interaction,
                    None => break,
                };

            let le = interaction.le;
            if !le.is_black() && !interaction.inside {
                if bounce == 0 || ray.dirac_delta {
                    radiance += throughput * le;
                } else if let Some(light_pdf_area) = intersection.light_pdf_area() {
                    // Hit a light through BSDF sampling; weigh against the
                    // light-sampling strategy.
                    let emitter_count = scene.emissive_indices().len() as Float;
                    let to_light = interaction.position - ray.origin();
                    let dist2 = to_light.dot(&to_light);
                    let cos_light = interaction.normal.dot(&interaction.wi_world).max(0.0);
                    if cos_light > 0.0 && dist2 > 0.0 && emitter_count > 0.0 {
                        let light_pdf = light_pdf_area / emitter_count * dist2 / cos_light;
                        let weight = power_heuristic(prev_bsdf_pdf, light_pdf);
                        radiance += throughput * le * weight;
                    }
                }
            }

            // Next event estimation, skipped on dirac surfaces and the last
            // bounce.
            if !interaction.dirac_delta() && bounce + 1 < self.max_depth {
                radiance += throughput * self.sample_direct(scene, &interaction, sampler);
            }

            let (weight, pdf) = match interaction.sample_bsdf(sampler, &mut ray, false) {
                Some(result) => result,
                None => break,
            };
            throughput = throughput * (weight / pdf);
            if throughput.is_black() {
                break;
            }

            if bounce >= 2 {
                let survival = throughput.max_component().min(0.95).max(0.05);
                if sampler.get::<1>(Dim::Absorb)[0] > survival {
                    break;
                }
                throughput = throughput / survival;
            }

            prev_bsdf_pdf = if interaction.dirac_delta() { 0.0 } else { pdf };
            refraction_history.update(&ray);
        }

        radiance
    }

    fn sample_direct(&self, scene: &Scene, interaction: &Interaction,
                     sampler: &mut Sampler) -> RGBSpectrum {
        let u = sampler.get::<3>(Dim::Emitter);
        let light_sample = match scene.sample_emitter(u[0], &Vector2f::new(u[1], u[2])) {
            Some(sample) => sample,
            None => return RGBSpectrum::default(),
        };

        let light_intersection = light_sample.intersection();
        let light_le = light_intersection.le();
        if light_le.is_black() {
            return RGBSpectrum::default();
        }

        let to_light = light_intersection.p() - interaction.position;
        let dist2 = to_light.dot(&to_light);
        if dist2 <= 0.0 {
            return RGBSpectrum::default();
        }
        let dist = dist2.sqrt();
        let wo_world = to_light / dist;

        let cos_light = light_intersection.geo_normal().dot(&(-wo_world)).max(0.0);
        if cos_light <= 0.0 {
            return RGBSpectrum::default();
        }

        let (bsdf_weight, bsdf_pdf) = match interaction.eval_bsdf(&wo_world) {
            Some(result) => result,
            None => return RGBSpectrum::default(),
        };

        let shadow_ray = Ray3f::new(
            interaction.position + interaction.normal * EPSILON,
            wo_world,
            Some(EPSILON),
            Some(dist * (1.0 - 1e-3)),
        );
        if scene.ray_intersection(&shadow_ray).is_some() {
            return RGBSpectrum::default();
        }

        let light_pdf = light_sample.pdf() * dist2 / cos_light;
        if light_pdf <= 0.0 {
            return RGBSpectrum::default();
        }

        let weight = power_heuristic(light_pdf, bsdf_pdf.max(0.0));
        light_le * bsdf_weight * (weight / light_pdf)
    }
}

fn power_heuristic(pdf_a: Float, pdf_b: Float) -> Float {
    let a2 = pdf_a * pdf_a;
    let b2 = pdf_b * pdf_b;
    if a2 + b2 == 0.0 {
        0.0
    } else {
        a2 / (a2 + b2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::SceneObject;
    use crate::materials::lambertian_diffuse::LambertianDiffuseBSDF;
    use crate::shapes::rectangle::Rectangle;
    use std::sync::Arc;

    #[test]
    fn test_power_heuristic() {
        assert_eq!(power_heuristic(0.0, 0.0), 0.0);
        assert!((power_heuristic(1.0, 1.0) - 0.5).abs() < 1e-6);
        assert!(power_heuristic(10.0, 0.1) > 0.99);
    }

    // A floor lit by an overhead panel: direct light at the first bounce
    // must be non-zero and finite.
    #[test]
    fn test_direct_light_on_floor() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new(
            Box::new(Rectangle::new(Vector3f::new(-2.0, 0.0, -2.0),
                                    Vector3f::new(0.0, 0.0, 4.0),
                                    Vector3f::new(4.0, 0.0, 0.0))),
            Arc::new(LambertianDiffuseBSDF::new(RGBSpectrum::splat(0.7)))));
        scene.add_object(SceneObject::with_emission(
            Box::new(Rectangle::new(Vector3f::new(-0.5, 2.0, -0.5),
                                    Vector3f::new(1.0, 0.0, 0.0),
                                    Vector3f::new(0.0, 0.0, 1.0))),
            Arc::new(LambertianDiffuseBSDF::new(RGBSpectrum::splat(0.0))),
            RGBSpectrum::splat(10.0)));

        let integrator = PathIntegrator::new(4, 1);
        let mut sampler = Sampler::new(21);

        let mut total = RGBSpectrum::default();
        let samples: u32 = 256;
        for i in 0..samples {
            sampler.set_index(i);
            let ray = Ray3f::new(Vector3f::new(0.0, 1.0, 0.0),
                                 Vector3f::new(0.1, -1.0, 0.05), None, None);
            total += integrator.trace_path(&scene, ray, &mut sampler);
        }
        let mean = total / samples as Float;
        assert!(mean[0] > 0.0);
        assert!(mean[0].is_finite());
    }
}
