// Copyright @yucwang 2023

use crate::core::bsdf::{BSDF, BSDFSampleRecord};
use crate::core::sampler::{Dim, Sampler};
use crate::core::tangent_frame::{build_tangent_frame, local_to_world, world_to_local};
use crate::math::constants::{ EPSILON, Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;
use crate::math::spectrum::{RGBSpectrum, Spectrum};
use std::sync::Arc;

pub struct SurfaceIntersection {
    p: Vector3f,
    geo_normal: Vector3f,
    sh_normal:  Vector3f,
    t: Float,
    le: RGBSpectrum,
    material: Option<Arc<dyn BSDF>>,
    light_pdf_area: Option<Float>,
}

pub struct SurfaceSampleRecord {
    intersection: SurfaceIntersection,
    pdf: Float,
}

impl SurfaceIntersection {
    pub fn new(new_p: Vector3f,
               new_geo_normal: Vector3f,
               new_sh_normal: Vector3f,
               new_t: Float,
               new_le: RGBSpectrum,
               new_material: Option<Arc<dyn BSDF>>,
               new_light_pdf_area: Option<Float>) -> Self {
        Self { p: new_p, geo_normal: new_geo_normal, sh_normal: new_sh_normal,
               t: new_t, le: new_le, material: new_material,
               light_pdf_area: new_light_pdf_area }
    }

    pub fn t(&self) -> Float {
        self.t
    }

    pub fn le(&self) -> RGBSpectrum {
        self.le
    }

    pub fn p(&self) -> Vector3f {
        self.p
    }

    pub fn geo_normal(&self) -> Vector3f {
        self.geo_normal
    }

    pub fn sh_normal(&self) -> Vector3f {
        self.sh_normal
    }

    pub fn material(&self) -> Option<&dyn BSDF> {
        self.material.as_deref()
    }

    pub fn with_le(&self, new_le: RGBSpectrum) -> Self {
        Self {
            p: self.p,
            geo_normal: self.geo_normal,
            sh_normal: self.sh_normal,
            t: self.t,
            le: new_le,
            material: self.material.clone(),
            light_pdf_area: self.light_pdf_area,
        }
    }

    pub fn with_material(&self, new_material: Arc<dyn BSDF>) -> Self {
        Self {
            p: self.p,
            geo_normal: self.geo_normal,
            sh_normal: self.sh_normal,
            t: self.t,
            le: self.le,
            material: Some(new_material),
            light_pdf_area: self.light_pdf_area,
        }
    }

    pub fn light_pdf_area(&self) -> Option<Float> {
        self.light_pdf_area
    }

    pub fn with_light_pdf_area(&self, new_light_pdf_area: Option<Float>) -> Self {
        Self {
            p: self.p,
            geo_normal: self.geo_normal,
            sh_normal: self.sh_normal,
            t: self.t,
            le: self.le,
            material: self.material.clone(),
            light_pdf_area: new_light_pdf_area,
        }
    }
}

impl SurfaceSampleRecord {
    pub fn new(new_intersection: SurfaceIntersection,
               new_pdf: Float) -> Self {
        Self { intersection: new_intersection, pdf: new_pdf }
    }

    pub fn intersection(&self) -> &SurfaceIntersection {
        &self.intersection
    }

    pub fn pdf(&self) -> Float {
        self.pdf
    }

    pub fn set_pdf(&mut self, pdf: Float) {
        self.pdf = pdf;
    }
}

// A surface hit bound to its shading frame and the refraction state of the
// path that reached it. The local frame has the (flipped) geometric normal
// along +z, so wi_local.z > 0 at every valid hit.
pub struct Interaction<'a> {
    pub position: Vector3f,
    pub normal: Vector3f,
    pub tangent: Vector3f,
    pub bitangent: Vector3f,
    pub wi_world: Vector3f,
    pub wi_local: Vector3f,
    pub le: RGBSpectrum,
    pub t: Float,
    pub material: &'a dyn BSDF,
    // Index of refraction on the incident side and beyond the surface.
    pub n1: Float,
    pub n2: Float,
    pub inside: bool,
}

impl<'a> Interaction<'a> {
    pub fn new(hit: &'a SurfaceIntersection, ray: &Ray3f, external_ior: Float) -> Option<Self> {
        let material = hit.material()?;
        let wi_world = -ray.dir();
        let geo_normal = hit.geo_normal();
        let inside = geo_normal.dot(&wi_world) < 0.0;
        let normal = if inside { -geo_normal } else { geo_normal };
        let (tangent, bitangent) = build_tangent_frame(&normal);
        let wi_local = world_to_local(&wi_world, &tangent, &bitangent, &normal);

        let n1 = ray.medium_ior;
        let n2 = if inside {
            external_ior
        } else {
            material.interior_ior().unwrap_or(n1)
        };

        Some(Self {
            position: hit.p(),
            normal,
            tangent,
            bitangent,
            wi_world,
            wi_local,
            le: hit.le(),
            t: hit.t(),
            material,
            n1,
            n2,
            inside,
        })
    }

    pub fn dirac_delta(&self) -> bool {
        self.material.dirac_delta()
    }

    pub fn eta(&self) -> Float {
        if self.n2 != 0.0 { self.n1 / self.n2 } else { 1.0 }
    }

    // Samples an outgoing direction and replaces ray with the continuation
    // ray. Returns (f * |cos|, pdf) of the sampled lobe, or None when the
    // path should terminate.
    pub fn sample_bsdf(&self, sampler: &mut Sampler, ray: &mut Ray3f,
                       adjoint: bool) -> Option<(RGBSpectrum, Float)> {
        let u = sampler.get::<4>(Dim::Bsdf);
        let record = self.material.sample(
            Vector2f::new(u[0], u[1]),
            Vector2f::new(u[2], u[3]),
            self.wi_local,
            self.eta(),
            adjoint,
        );

        if record.pdf <= 0.0 || record.weight.is_black() {
            return None;
        }

        let dir_world = local_to_world(&record.wo, &self.tangent, &self.bitangent, &self.normal);
        let offset = if record.wo.z >= 0.0 {
            self.normal * EPSILON
        } else {
            self.normal * -EPSILON
        };
        let medium_ior = if record.transmitted { self.n2 } else { self.n1 };

        *ray = Ray3f::spawn(self.position + offset, dir_world,
                            ray.depth + 1, record.dirac_delta, medium_ior);

        Some((record.weight, record.pdf))
    }

    // Evaluates f * |cos| and pdf for a given incoming direction, e.g. a
    // photon's arrival direction during density estimation.
    pub fn eval_bsdf(&self, dir_world: &Vector3f) -> Option<(RGBSpectrum, Float)> {
        let wo_local = world_to_local(dir_world, &self.tangent, &self.bitangent, &self.normal);

        let record = BSDFSampleRecord {
            wi: self.wi_local,
            wo: wo_local,
            ..BSDFSampleRecord::default()
        };
        let result = self.material.eval(record);
        if result.pdf <= 0.0 || result.value.is_black() {
            return None;
        }

        Some((result.value * wo_local.z.abs(), result.pdf))
    }
}
