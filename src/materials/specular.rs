// Copyright @yucwang 2026

use crate::core::bsdf::{BSDFSampleRecord, BSDFEvalResult, BSDF};
use crate::math::constants::{Float, Vector2f, Vector3f};
use crate::math::spectrum::RGBSpectrum;

// Fresnel reflectance for a smooth dielectric boundary. eta is the relative
// index n_incident / n_transmit; returns (reflectance, cos_t). Total internal
// reflection yields (1, 0).
pub fn fresnel_dielectric(cos_i: Float, eta: Float) -> (Float, Float) {
    let cos_i = cos_i.abs().min(1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return (1.0, 0.0);
    }

    let cos_t = (1.0 - sin2_t).sqrt();
    let r_s = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let r_p = (eta * cos_t - cos_i) / (eta * cos_t + cos_i);
    (0.5 * (r_s * r_s + r_p * r_p), cos_t)
}

fn reflect_local(wi: &Vector3f) -> Vector3f {
    Vector3f::new(-wi.x, -wi.y, wi.z)
}

pub struct SpecularMirrorBSDF {
    specular_reflectance: RGBSpectrum,
}

impl SpecularMirrorBSDF {
    pub fn new(specular_reflectance: RGBSpectrum) -> Self {
        Self { specular_reflectance }
    }
}

impl BSDF for SpecularMirrorBSDF {
    fn dirac_delta(&self) -> bool {
        true
    }

    fn eval(&self, _sample_record: BSDFSampleRecord) -> BSDFEvalResult {
        // A dirac lobe has zero value for any sampled direction pair.
        BSDFEvalResult::default()
    }

    fn sample(&self,
              _u1: Vector2f,
              _u2: Vector2f,
              wi: Vector3f,
              _eta: Float,
              _adjoint: bool) -> BSDFSampleRecord {
        let mut sampling_record = BSDFSampleRecord::default();
        sampling_record.wi = wi;
        sampling_record.wo = reflect_local(&wi);
        sampling_record.pdf = 1.0;
        sampling_record.weight = self.specular_reflectance;
        sampling_record.dirac_delta = true;
        sampling_record
    }
}

pub struct SpecularDielectricBSDF {
    int_ior: Float,
    specular_reflectance: RGBSpectrum,
    specular_transmittance: RGBSpectrum,
}

impl SpecularDielectricBSDF {
    pub fn new(int_ior: Float,
               specular_reflectance: RGBSpectrum,
               specular_transmittance: RGBSpectrum) -> Self {
        Self { int_ior, specular_reflectance, specular_transmittance }
    }
}

impl BSDF for SpecularDielectricBSDF {
    fn dirac_delta(&self) -> bool {
        true
    }

    fn interior_ior(&self) -> Option<Float> {
        Some(self.int_ior)
    }

    fn eval(&self, _sample_record: BSDFSampleRecord) -> BSDFEvalResult {
        BSDFEvalResult::default()
    }

    fn sample(&self,
              _u1: Vector2f,
              u2: Vector2f,
              wi: Vector3f,
              eta: Float,
              adjoint: bool) -> BSDFSampleRecord {
        let mut sampling_record = BSDFSampleRecord::default();
        sampling_record.wi = wi;
        sampling_record.dirac_delta = true;

        let cos_i = wi.z;
        let (fresnel, cos_t) = fresnel_dielectric(cos_i, eta);

        if u2.x < fresnel {
            sampling_record.wo = reflect_local(&wi);
            sampling_record.pdf = fresnel;
            sampling_record.weight = self.specular_reflectance * fresnel;
        } else {
            sampling_record.wo = Vector3f::new(-wi.x * eta, -wi.y * eta, -cos_t);
            sampling_record.pdf = 1.0 - fresnel;
            // Radiance is compressed by the squared relative IOR on
            // refraction; photon power is not.
            let scale = if adjoint { 1.0 } else { 1.0 / (eta * eta) };
            sampling_record.weight =
                self.specular_transmittance * ((1.0 - fresnel) * scale);
            sampling_record.transmitted = true;
        }

        sampling_record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::spectrum::Spectrum;

    #[test]
    fn test_fresnel_normal_incidence() {
        // n1 = 1, n2 = 1.5: R0 = ((1 - 1.5) / (1 + 1.5))^2 = 0.04.
        let (f, cos_t) = fresnel_dielectric(1.0, 1.0 / 1.5);
        assert!((f - 0.04).abs() < 1e-3);
        assert!((cos_t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_fresnel_total_internal_reflection() {
        // Glass to air beyond the critical angle (~41.8 degrees).
        let cos_i = (45.0f32).to_radians().cos();
        let (f, _) = fresnel_dielectric(cos_i, 1.5);
        assert_eq!(f, 1.0);
    }

    #[test]
    fn test_mirror_reflects_about_normal() {
        let bsdf = SpecularMirrorBSDF::new(RGBSpectrum::new(0.9, 0.9, 0.9));
        let wi = Vector3f::new(0.3, -0.4, 0.866).normalize();
        let record = bsdf.sample(Vector2f::zeros(), Vector2f::zeros(), wi, 1.0, false);

        assert!(record.dirac_delta);
        assert_eq!(record.pdf, 1.0);
        assert!((record.wo.x + wi.x).abs() < 1e-6);
        assert!((record.wo.y + wi.y).abs() < 1e-6);
        assert!((record.wo.z - wi.z).abs() < 1e-6);
    }

    #[test]
    fn test_dielectric_refraction_bends_ray() {
        let bsdf = SpecularDielectricBSDF::new(
            1.5,
            RGBSpectrum::new(1.0, 1.0, 1.0),
            RGBSpectrum::new(1.0, 1.0, 1.0));
        let wi = Vector3f::new(0.5, 0.0, 0.866).normalize();
        // u2.x = 1 - epsilon forces the transmission lobe.
        let record = bsdf.sample(Vector2f::zeros(), Vector2f::new(0.999, 0.0),
                                 wi, 1.0 / 1.5, false);

        assert!(record.transmitted);
        assert!(record.wo.z < 0.0);
        assert!((record.wo.norm() - 1.0).abs() < 1e-5);
        // Snell: sin_t = eta * sin_i.
        let sin_i = (1.0 - wi.z * wi.z).sqrt();
        let sin_t = (1.0 - record.wo.z * record.wo.z).sqrt();
        assert!((sin_t - sin_i / 1.5).abs() < 1e-5);
        assert!(!record.weight.is_black());
    }

    #[test]
    fn test_dielectric_weight_over_pdf() {
        let bsdf = SpecularDielectricBSDF::new(
            1.5,
            RGBSpectrum::new(1.0, 1.0, 1.0),
            RGBSpectrum::new(1.0, 1.0, 1.0));
        let wi = Vector3f::new(0.0, 0.0, 1.0);
        let eta = 1.0 / 1.5;

        let reflect = bsdf.sample(Vector2f::zeros(), Vector2f::new(0.0, 0.0),
                                  wi, eta, true);
        assert!(!reflect.transmitted);
        assert!((reflect.weight[0] / reflect.pdf - 1.0).abs() < 1e-5);

        let refract = bsdf.sample(Vector2f::zeros(), Vector2f::new(0.999, 0.0),
                                  wi, eta, true);
        assert!(refract.transmitted);
        assert!((refract.weight[0] / refract.pdf - 1.0).abs() < 1e-5);
    }
}
