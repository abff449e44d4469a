// Copyright @yucwang 2026

use crate::core::bsdf::BSDF;
use crate::core::interaction::SurfaceIntersection;
use crate::core::sensor::Sensor;
use crate::core::shape::Shape;
use crate::math::aabb::AABB;
use crate::math::ray::Ray3f;
use crate::math::spectrum::{RGBSpectrum, Spectrum};
use crate::math::constants::{ Float, Vector2f };
use std::sync::Arc;

pub struct SceneObject {
    pub shape: Box<dyn Shape>,
    pub material: Arc<dyn BSDF>,
    pub emission: RGBSpectrum,
}

impl SceneObject {
    pub fn new(shape: Box<dyn Shape>, material: Arc<dyn BSDF>) -> Self {
        Self { shape, material, emission: RGBSpectrum::default() }
    }

    pub fn with_emission(shape: Box<dyn Shape>, material: Arc<dyn BSDF>, emission: RGBSpectrum) -> Self {
        Self { shape, material, emission }
    }

    pub fn is_emissive(&self) -> bool {
        !self.emission.is_black()
    }
}

pub struct Scene {
    objects: Vec<SceneObject>,
    sensors: Vec<Option<Box<dyn Sensor>>>,
    // Index of refraction of the surrounding medium.
    pub ior: Float,
}

impl Scene {
    pub fn new() -> Self {
        Self { objects: Vec::new(), sensors: Vec::new(), ior: 1.0 }
    }

    pub fn with_objects(objects: Vec<SceneObject>) -> Self {
        Self { objects, sensors: Vec::new(), ior: 1.0 }
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &Vec<SceneObject> {
        &self.objects
    }

    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.push(Some(sensor));
    }

    pub fn camera(&self, camera_id: usize) -> Option<&dyn Sensor> {
        self.sensors.get(camera_id).and_then(|s| s.as_deref())
    }

    pub fn take_sensor(&mut self, camera_id: usize) -> Option<Box<dyn Sensor>> {
        self.sensors.get_mut(camera_id).and_then(|s| s.take())
    }

    pub fn insert_sensor(&mut self, camera_id: usize, sensor: Box<dyn Sensor>) {
        if camera_id < self.sensors.len() {
            self.sensors[camera_id] = Some(sensor);
        } else {
            self.sensors.push(Some(sensor));
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bounding_box(&self) -> AABB {
        let mut bbox = AABB::default();
        for object in &self.objects {
            bbox.expand_by_aabb(&object.shape.bounding_box());
        }
        bbox
    }

    pub fn emissive_indices(&self) -> Vec<usize> {
        self.objects.iter()
            .enumerate()
            .filter(|(_, obj)| obj.is_emissive())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceIntersection> {
        let mut closest_hit: Option<SurfaceIntersection> = None;
        let mut closest_t = std::f32::MAX;

        for object in &self.objects {
            if let Some(hit) = object.shape.ray_intersection(ray) {
                let hit_t = hit.t();
                if hit_t < closest_t {
                    closest_t = hit_t;
                    let light_pdf_area = if object.is_emissive() {
                        let area = object.shape.surface_area();
                        if area > 0.0 { Some(1.0 / area) } else { None }
                    } else {
                        None
                    };
                    let hit = hit.with_le(object.emission)
                        .with_material(object.material.clone())
                        .with_light_pdf_area(light_pdf_area);
                    closest_hit = Some(hit);
                }
            }
        }

        closest_hit
    }

    pub fn sample_emitter(&self, u1: Float, u2: &Vector2f) -> Option<crate::core::interaction::SurfaceSampleRecord> {
        let emitter_indices = self.emissive_indices();

        if emitter_indices.is_empty() {
            return None;
        }

        let emitter_count = emitter_indices.len() as Float;
        let mut emitter_index = (u1 * emitter_count) as usize;
        if emitter_index >= emitter_indices.len() {
            emitter_index = emitter_indices.len() - 1;
        }

        let object = &self.objects[emitter_indices[emitter_index]];
        let sample = object.shape.sample(u2);
        let intersection = sample.intersection().with_le(object.emission);
        let pdf = sample.pdf() / emitter_count;

        Some(crate::core::interaction::SurfaceSampleRecord::new(intersection, pdf))
    }
}
