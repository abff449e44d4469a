// Copyright @yucwang 2026

#![allow(dead_code)]

use praline::core::integrator::Integrator;
use praline::core::scene_loader::load_scene_with_settings;
use praline::integrators::path::PathIntegrator;
use praline::integrators::photon_map::PhotonMapper;
use praline::io::exr_utils;
use praline::io::png_utils;
use praline::renderers::simple::{ SimpleRenderer, Renderer };

use std::env;

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <scene.xml> <output.exr> [--png output.png] [--spp N] [--seed N] [--camera N]", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];
    let mut png_path: Option<String> = None;
    let mut spp_override: Option<u32> = None;
    let mut seed: u64 = 0;
    let mut camera_id: usize = 0;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--png" => {
                i += 1;
                png_path = args.get(i).cloned();
            }
            "--spp" => {
                i += 1;
                spp_override = args.get(i).and_then(|v| v.parse::<u32>().ok());
            }
            "--seed" => {
                i += 1;
                seed = args.get(i).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
            }
            "--camera" => {
                i += 1;
                camera_id = args.get(i).and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);
            }
            _ => {}
        }
        i += 1;
    }

    let load_result = match load_scene_with_settings(input_path) {
        Ok(result) => result,
        Err(error) => {
            log::error!("failed to load scene {}: {}", input_path, error);
            std::process::exit(1);
        }
    };

    let mut scene = load_result.scene;

    let integrator: Box<dyn Integrator> = match load_result.integrator_type.as_deref() {
        Some("photon_mapper") => {
            let mut settings = load_result.photon_map_settings
                .expect("photon_mapper settings present after successful load");
            if let Some(spp) = spp_override {
                settings.samples_per_pixel = spp;
            }
            match PhotonMapper::new(&scene, &settings, seed) {
                Ok(mapper) => Box::new(mapper),
                Err(error) => {
                    log::error!("failed to build photon maps: {}", error);
                    std::process::exit(1);
                }
            }
        }
        _ => {
            let max_depth = load_result.max_depth.unwrap_or(8);
            let spp = spp_override.or(load_result.samples_per_pixel).unwrap_or(1);
            Box::new(PathIntegrator::new(max_depth, spp))
        }
    };

    let renderer: SimpleRenderer = SimpleRenderer::new(integrator, camera_id, seed);
    let image = renderer.render(&mut scene);
    if image.width() == 0 || image.height() == 0 {
        log::error!("scene has no camera {}", camera_id);
        std::process::exit(1);
    }

    let raw = image.raw_copy();
    exr_utils::write_exr_to_file(&raw, image.width(), image.height(), output_path);
    if let Some(png_path) = png_path {
        png_utils::write_png_to_file(&raw, image.width(), image.height(), &png_path);
    }
}
