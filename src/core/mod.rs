// Copyright @yucwang 2026

pub mod bsdf;
pub mod integrator;
pub mod interaction;
pub mod refraction;
pub mod rng;
pub mod sampler;
pub mod scene;
pub mod scene_loader;
pub mod sensor;
pub mod shape;
pub mod tangent_frame;
pub mod work_queue;
