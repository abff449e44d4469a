// Copyright @yucwang 2026

use crate::core::integrator::Integrator;
use crate::core::interaction::Interaction;
use crate::core::refraction::RefractionHistory;
use crate::core::rng::LcgRng;
use crate::core::sampler::{Dim, Sampler};
use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::core::tangent_frame::{build_tangent_frame, local_to_world};
use crate::core::work_queue::WorkQueue;
use crate::math::constants::{EPSILON, Float, INV_PI, PI, Vector2f, Vector3f};
use crate::math::ray::Ray3f;
use crate::math::spectrum::{RGBSpectrum, Spectrum};
use crate::math::warp::sample_cosine_hemisphere;
use crate::octree::linear_octree::{LinearOctree, SearchResult};
use crate::octree::octree::{Octree, OctreeData};
use crate::octree::priority_queue::PriorityQueue;

use indicatif::{ProgressBar, ProgressStyle};
use std::thread;

// Emissions per unit of queued work.
const EMISSIONS_PER_WORK: usize = 100_000;

// An energy packet deposited at a non-specular interaction. dir points from
// the surface back toward the photon's previous vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Photon {
    flux: RGBSpectrum,
    position: Vector3f,
    dir: Vector3f,
}

impl Photon {
    pub fn new(flux: RGBSpectrum, position: Vector3f, dir: Vector3f) -> Self {
        Self { flux, position, dir }
    }

    pub fn flux(&self) -> RGBSpectrum {
        self.flux
    }

    pub fn dir(&self) -> Vector3f {
        self.dir
    }
}

impl OctreeData for Photon {
    fn pos(&self) -> Vector3f {
        self.position
    }
}

#[derive(Debug, Clone)]
pub struct PhotonMapSettings {
    // Nominal photon count before caustic oversampling.
    pub emissions: usize,
    pub caustic_factor: Float,
    pub k_nearest_photons: usize,
    pub max_photons_per_octree_leaf: usize,
    pub direct_visualization: bool,
    pub samples_per_pixel: u32,
}

impl Default for PhotonMapSettings {
    fn default() -> Self {
        Self {
            emissions: 0,
            caustic_factor: 1.0,
            k_nearest_photons: 50,
            max_photons_per_octree_leaf: 200,
            direct_visualization: false,
            samples_per_pixel: 1,
        }
    }
}

impl PhotonMapSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.caustic_factor >= 1.0) {
            return Err(format!("caustic_factor must be >= 1, got {}", self.caustic_factor));
        }
        if self.k_nearest_photons < 1 {
            return Err(String::from("k_nearest_photons must be >= 1"));
        }
        if self.max_photons_per_octree_leaf < 1 {
            return Err(String::from("max_photons_per_octree_leaf must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct EmissionWork {
    light_index: usize,
    emissions_offset: usize,
    num_emissions: usize,
    photon_flux: RGBSpectrum,
}

pub struct PhotonMapper {
    caustic_map: LinearOctree<Photon>,
    global_map: LinearOctree<Photon>,
    k_nearest_photons: usize,
    non_caustic_reject: Float,
    direct_visualization: bool,
    samples_per_pixel: u32,
}

impl PhotonMapper {
    // Runs the full photon emission pass and builds both maps.
    pub fn new(scene: &Scene, settings: &PhotonMapSettings, seed: u64) -> Result<Self, String> {
        settings.validate()?;

        let non_caustic_reject = 1.0 / settings.caustic_factor;
        let photon_emissions =
            (settings.emissions as Float * settings.caustic_factor) as usize;

        let emissive_indices = scene.emissive_indices();
        if emissive_indices.is_empty() {
            log::warn!("scene has no emissive objects, photon maps will be empty");
        }

        // Allocate emissions across lights proportional to their flux, in
        // fixed-size batches that are shuffled to balance worker cost.
        let mut work_vec: Vec<EmissionWork> = Vec::new();
        if !emissive_indices.is_empty() && photon_emissions > 0 {
            let mut total_add_flux: Float = 0.0;
            for &idx in &emissive_indices {
                let object = &scene.objects()[idx];
                total_add_flux +=
                    (object.emission * object.shape.surface_area()).sum_components();
            }

            for &idx in &emissive_indices {
                let object = &scene.objects()[idx];
                let light_flux = object.emission * object.shape.surface_area();
                let share = light_flux.sum_components() / total_add_flux;
                let num_light_emissions = (photon_emissions as Float * share) as usize;
                if num_light_emissions == 0 {
                    continue;
                }
                let photon_flux = light_flux / num_light_emissions as Float;

                let mut count = 0;
                while count != num_light_emissions {
                    let emissions = if count + EMISSIONS_PER_WORK > num_light_emissions {
                        num_light_emissions - count
                    } else {
                        EMISSIONS_PER_WORK
                    };
                    work_vec.push(EmissionWork {
                        light_index: idx,
                        emissions_offset: count,
                        num_emissions: emissions,
                        photon_flux,
                    });
                    count += emissions;
                }
            }
        }

        let mut rng = LcgRng::new(seed);
        rng.shuffle(&mut work_vec);

        let progress = ProgressBar::new(work_vec.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} emission batches")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let work_queue = WorkQueue::new(work_vec);
        let thread_count = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        // Per-worker deposit buffers, concatenated after the joins.
        let mut caustic_vecs: Vec<Vec<Photon>> = Vec::new();
        let mut global_vecs: Vec<Vec<Photon>> = Vec::new();

        thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..thread_count {
                let progress = progress.clone();
                let work_queue = &work_queue;
                handles.push(scope.spawn(move || {
                    let mut caustic_vec: Vec<Photon> = Vec::new();
                    let mut global_vec: Vec<Photon> = Vec::new();
                    let mut sampler = Sampler::new(0);

                    while let Some(work) = work_queue.get_work() {
                        let object = &scene.objects()[work.light_index];
                        sampler.initiate(work.light_index as u32);
                        for i in 0..work.num_emissions {
                            sampler.set_index((work.emissions_offset + i) as u32);

                            let u = sampler.get::<4>(Dim::PmLight);
                            let sample = object.shape.sample(&Vector2f::new(u[0], u[1]));
                            let pos = sample.intersection().p();
                            let normal = sample.intersection().geo_normal();
                            let (tangent, bitangent) = build_tangent_frame(&normal);
                            let local_dir =
                                sample_cosine_hemisphere(&Vector2f::new(u[2], u[3]));
                            let dir = local_to_world(&local_dir, &tangent, &bitangent, &normal);

                            let origin = pos + normal * EPSILON;
                            let ray = Ray3f::with_medium(origin, dir, scene.ior);
                            emit_photon(scene, ray, work.photon_flux, non_caustic_reject,
                                        &mut sampler, &mut caustic_vec, &mut global_vec);
                        }
                        progress.inc(1);
                    }

                    (caustic_vec, global_vec)
                }));
            }

            for handle in handles {
                if let Ok((caustic_vec, global_vec)) = handle.join() {
                    caustic_vecs.push(caustic_vec);
                    global_vecs.push(global_vec);
                }
            }
        });
        progress.finish_and_clear();

        log::info!("photon mapping pass: {} emissions from {} lights",
                   photon_emissions, emissive_indices.len());

        // Intermediate octrees, converted to linear octrees once filled.
        let scene_bb = scene.bounding_box();
        let mut caustic_map_t = Octree::new(scene_bb, settings.max_photons_per_octree_leaf);
        let mut global_map_t = Octree::new(scene_bb, settings.max_photons_per_octree_leaf);

        let mut num_caustic_photons = 0;
        let mut num_global_photons = 0;
        for mut deposit_vec in global_vecs {
            num_global_photons += deposit_vec.len();
            insert_and_pop(&mut deposit_vec, &mut global_map_t);
        }
        for mut deposit_vec in caustic_vecs {
            num_caustic_photons += deposit_vec.len();
            insert_and_pop(&mut deposit_vec, &mut caustic_map_t);
        }

        let caustic_map = LinearOctree::new(caustic_map_t);
        let global_map = LinearOctree::new(global_map_t);

        log::info!("photon maps built: {} global photons, {} caustic photons",
                   num_global_photons, num_caustic_photons);

        Ok(Self {
            caustic_map,
            global_map,
            k_nearest_photons: settings.k_nearest_photons,
            non_caustic_reject,
            direct_visualization: settings.direct_visualization,
            samples_per_pixel: settings.samples_per_pixel,
        })
    }

    pub fn caustic_map(&self) -> &LinearOctree<Photon> {
        &self.caustic_map
    }

    pub fn global_map(&self) -> &LinearOctree<Photon> {
        &self.global_map
    }

    pub fn sample_ray(&self, scene: &Scene, mut ray: Ray3f, sampler: &mut Sampler) -> RGBSpectrum {
        let mut radiance = RGBSpectrum::default();
        let mut throughput = RGBSpectrum::new(1.0, 1.0, 1.0);
        let mut refraction_history = RefractionHistory::new(&ray);

        loop {
            sampler.shuffle();

            let intersection = match scene.ray_intersection(&ray) {
                Some(hit) => hit,
                None => return radiance,
            };
            let interaction =
                match Interaction::new(&intersection, &ray, refraction_history.external_ior()) {
                    Some(interaction) => interaction,
                    None => return radiance,
                };

            radiance += self.sample_emissive(&interaction, &ray) * throughput;

            if interaction.dirac_delta() {
                // A specular surface reached through a diffuse bounce is
                // already accounted for by the caustic map.
                if !ray.dirac_delta && ray.depth != 0 {
                    return radiance;
                }
                let (weight, pdf) = match interaction.sample_bsdf(sampler, &mut ray, false) {
                    Some(result) => result,
                    None => return radiance,
                };
                throughput = throughput * (weight / pdf);
            } else {
                radiance += self.estimate_caustic_radiance(&interaction) * throughput;

                if !self.direct_visualization && (ray.dirac_delta || ray.depth == 0) {
                    // Direct light by next-event estimation here; the global
                    // map is consulted one bounce later, which avoids the
                    // kernel estimator's boundary bias.
                    radiance += self.sample_direct(scene, &interaction, sampler) * throughput;
                    let (weight, pdf) = match interaction.sample_bsdf(sampler, &mut ray, false) {
                        Some(result) => result,
                        None => return radiance,
                    };
                    throughput = throughput * (weight / pdf);
                } else {
                    return radiance + self.estimate_global_radiance(&interaction) * throughput;
                }
            }

            if absorb(sampler, &mut throughput) {
                return radiance;
            }

            refraction_history.update(&ray);
        }
    }

    // Emitted radiance, counted only where next-event estimation cannot
    // reach: primary hits and specular-continued paths.
    fn sample_emissive(&self, interaction: &Interaction, ray: &Ray3f) -> RGBSpectrum {
        if interaction.le.is_black() || interaction.inside {
            return RGBSpectrum::default();
        }
        if ray.depth == 0 || ray.dirac_delta {
            interaction.le
        } else {
            RGBSpectrum::default()
        }
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

        let (bsdf_weight, _bsdf_pdf) = match interaction.eval_bsdf(&wo_world) {
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

        light_le * bsdf_weight / light_pdf
    }

    // Indirect radiance from the global map: constant kernel over the disk
    // spanned by the k-th neighbor.
    fn estimate_global_radiance(&self, interaction: &Interaction) -> RGBSpectrum {
        let mut photons: PriorityQueue<SearchResult<Photon>> = PriorityQueue::new();
        self.global_map.knn_search(&interaction.position, self.k_nearest_photons, &mut photons);
        if photons.is_empty() {
            return RGBSpectrum::default();
        }

        let mut radiance = RGBSpectrum::default();
        for photon in &photons {
            if let Some((bsdf_abs_idot_n, bsdf_pdf)) = interaction.eval_bsdf(&photon.data.dir()) {
                radiance += photon.data.flux() * bsdf_abs_idot_n / bsdf_pdf;
            }
        }

        radiance / (photons.top().unwrap().distance2 * PI)
    }

    // Cone-filtered caustic estimate (filter slope k = 1, hence the 3 in the
    // normalization); the weight applies to all k neighbors.
    fn estimate_caustic_radiance(&self, interaction: &Interaction) -> RGBSpectrum {
        let mut photons: PriorityQueue<SearchResult<Photon>> = PriorityQueue::new();
        self.caustic_map.knn_search(&interaction.position, self.k_nearest_photons, &mut photons);
        if photons.is_empty() {
            return RGBSpectrum::default();
        }

        let inv_max_squared_radius = 1.0 / photons.top().unwrap().distance2;

        let mut radiance = RGBSpectrum::default();
        for photon in &photons {
            if let Some((bsdf_abs_idot_n, bsdf_pdf)) = interaction.eval_bsdf(&photon.data.dir()) {
                let wp = (1.0 - (photon.distance2 * inv_max_squared_radius).sqrt()).max(0.0);
                radiance += photon.data.flux() * bsdf_abs_idot_n * wp / bsdf_pdf;
            }
        }

        radiance * (3.0 * inv_max_squared_radius * INV_PI)
    }
}

impl Integrator for PhotonMapper {
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

        self.sample_ray(scene, ray, &mut sampler).to_vector()
    }
}

fn emit_photon(scene: &Scene, mut ray: Ray3f, mut flux: RGBSpectrum,
               non_caustic_reject: Float, sampler: &mut Sampler,
               caustic_vec: &mut Vec<Photon>, global_vec: &mut Vec<Photon>) {
    let mut refraction_history = RefractionHistory::new(&ray);

    loop {
        sampler.shuffle();

        let intersection = match scene.ray_intersection(&ray) {
            Some(hit) => hit,
            None => return,
        };
        let interaction =
            match Interaction::new(&intersection, &ray, refraction_history.external_ior()) {
                Some(interaction) => interaction,
                None => return,
            };

        // Photons are only stored where a non-dirac interaction can be
        // density-estimated later. Specular-carried arrivals are caustics by
        // definition; the rest pass the non-caustic rejection gate.
        if !interaction.dirac_delta() {
            if ray.dirac_delta {
                caustic_vec.push(Photon::new(flux, interaction.position, interaction.wi_world));
            } else if non_caustic_reject > sampler.get::<1>(Dim::PmReject)[0] {
                global_vec.push(Photon::new(flux / non_caustic_reject,
                                            interaction.position, interaction.wi_world));
            }
        }

        let (weight, pdf) = match interaction.sample_bsdf(sampler, &mut ray, true) {
            Some(result) => result,
            None => return,
        };
        let bsdf_weight = weight / pdf;

        // Reduce the survival probability rather than the flux so stored
        // photons keep roughly constant magnitude.
        let survive = bsdf_weight.max_component().min(0.95);
        if survive <= 0.0 || survive <= sampler.get::<1>(Dim::Absorb)[0] {
            return;
        }

        flux = flux * (bsdf_weight / survive);

        refraction_history.update(&ray);
    }
}

fn absorb(sampler: &mut Sampler, throughput: &mut RGBSpectrum) -> bool {
    let survive = throughput.max_component().min(0.95);
    if survive <= 0.0 || survive <= sampler.get::<1>(Dim::Absorb)[0] {
        return true;
    }
    *throughput = *throughput / survive;
    false
}

// Moves a deposit buffer into an octree tail-first, shrinking the buffer
// every 16 MiB freed to cap the peak working set.
fn insert_and_pop(deposit_vec: &mut Vec<Photon>, photon_map: &mut Octree<Photon>) {
    let mut removed_bytes: usize = 0;
    while let Some(photon) = deposit_vec.pop() {
        photon_map.insert(photon);
        removed_bytes += std::mem::size_of::<Photon>();
        if removed_bytes > (1 << 24) {
            deposit_vec.shrink_to_fit();
            removed_bytes = 0;
        }
    }
    deposit_vec.shrink_to_fit();
}

/* Tests for the photon mapping integrator */
