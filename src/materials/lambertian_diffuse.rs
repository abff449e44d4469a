// Copyright @yucwang 2023

use crate::core::bsdf::{BSDFSampleRecord, BSDFEvalResult, BSDF};
use crate::math::constants::{ INV_PI, Float, Vector2f, Vector3f };
use crate::math::spectrum::RGBSpectrum;
use crate::math::warp::{ sample_cosine_hemisphere, sample_cosine_hemisphere_pdf };

pub struct LambertianDiffuseBSDF {
    color: RGBSpectrum
}

impl BSDF for LambertianDiffuseBSDF {
    fn eval(&self, sample_record: BSDFSampleRecord) -> BSDFEvalResult {
        // Reflection only; directions below the surface carry nothing.
        if sample_record.wi.z <= 0.0 || sample_record.wo.z <= 0.0 {
            return BSDFEvalResult::default();
        }

        let mut eval_result = BSDFEvalResult::default();
        eval_result.value = self.color * INV_PI;
        eval_result.pdf = sample_cosine_hemisphere_pdf(sample_record.wo.z.abs());

        return eval_result
    }

    fn sample(&self,
              u1: Vector2f,
              _u2: Vector2f,
              wi: Vector3f,
              _eta: Float,
              _adjoint: bool) -> BSDFSampleRecord {
        let mut sampling_record = BSDFSampleRecord::default();
        sampling_record.wi = wi;
        sampling_record.wo = sample_cosine_hemisphere(&u1);
        if wi.z < 0.0 {
            sampling_record.wo.z *= -1.0;
        }
        sampling_record.pdf = sample_cosine_hemisphere_pdf(sampling_record.wo.z.abs());
        sampling_record.weight = self.color * INV_PI * sampling_record.wo.z.abs();

        return sampling_record
    }
}

impl LambertianDiffuseBSDF {
    pub fn new(rgb: RGBSpectrum) -> Self {
        Self {
            color: rgb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::spectrum::Spectrum;

    #[test]
    fn test_sample_weight_over_pdf_is_albedo() {
        let albedo = RGBSpectrum::new(0.25, 0.5, 0.75);
        let bsdf = LambertianDiffuseBSDF::new(albedo);
        let wi = Vector3f::new(0.0, 0.0, 1.0);

        let record = bsdf.sample(Vector2f::new(0.3, 0.7), Vector2f::new(0.0, 0.0),
                                 wi, 1.0, false);
        assert!(record.pdf > 0.0);
        assert!(!record.dirac_delta);
        let ratio = record.weight / record.pdf;
        assert!((ratio[0] - 0.25).abs() < 1e-5);
        assert!((ratio[2] - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_eval_below_hemisphere_is_zero() {
        let bsdf = LambertianDiffuseBSDF::new(RGBSpectrum::new(0.5, 0.5, 0.5));
        let mut record = BSDFSampleRecord::default();
        record.wi = Vector3f::new(0.0, 0.0, 1.0);
        record.wo = Vector3f::new(0.0, 0.0, -1.0);
        let result = bsdf.eval(record);
        assert!(result.value.is_black());
        assert_eq!(result.pdf, 0.0);
    }
}
