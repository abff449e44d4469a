// Copyright @yucwang 2023

use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::spectrum::RGBSpectrum;

// Definitions of types used in BSDF sampling and eval
// processes
pub type BSDFValue = RGBSpectrum;

// Directions are in the local shading frame with the normal along +z and the
// incoming direction on the +z side.
#[derive(Debug, PartialEq)]
pub struct BSDFSampleRecord {
    pub wi: Vector3f,
    pub wo: Vector3f,
    pub pdf: Float,
    // f * |cos(wo)| of the sampled lobe; for a dirac-delta lobe this is the
    // lobe's full reflectance or transmittance.
    pub weight: BSDFValue,
    pub dirac_delta: bool,
    pub transmitted: bool,
}

#[derive(Debug, PartialEq)]
pub struct BSDFEvalResult {
    pub value: BSDFValue,
    pub pdf: Float,
}

pub trait BSDF: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    // True iff the BSDF is a sum of dirac deltas (perfect mirror or
    // perfect refraction).
    fn dirac_delta(&self) -> bool {
        false
    }

    // Index of refraction of the medium behind the surface, for
    // transmissive materials.
    fn interior_ior(&self) -> Option<Float> {
        None
    }

    fn eval(&self, sample_record: BSDFSampleRecord) -> BSDFEvalResult;

    // eta is the relative index of refraction n_incident / n_transmit at
    // this interaction; adjoint marks importance (photon) transport.
    fn sample(&self, u1: Vector2f,
                     u2: Vector2f,
                     wi: Vector3f,
                     eta: Float,
                     adjoint: bool) -> BSDFSampleRecord;
}

impl Default for BSDFSampleRecord {
    fn default() -> Self {
        Self {
            wi: Vector3f::zeros(),
            wo: Vector3f::zeros(),
            pdf: 0.0,
            weight: RGBSpectrum::default(),
            dirac_delta: false,
            transmitted: false,
        }
    }
}

impl Default for BSDFEvalResult {
    fn default() -> Self {
        Self {
            value: RGBSpectrum::default(),
            pdf: 0.0,
        }
    }
}
