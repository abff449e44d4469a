/* Copyright 2020 @TwoCookingMice */

use crate::math::constants::Float;

use exr::prelude::*;

// Write a linear RGB image to an OpenEXR file.
pub fn write_exr_to_file(image: &Vec<(Float, Float, Float)>,
                         width: usize,
                         height: usize,
                         file_path: &str) {
    log::info!("Starting writing openexr images: {}.", file_path);

    let result = write_rgb_file(file_path, width, height, |x, y| {
        let pixel = image[y * width + x];
        (pixel.0, pixel.1, pixel.2)
    });

    if let Err(error) = result {
        log::error!("Failed to write {}: {}.", file_path, error);
    }
}

// Read a linear RGB image from an OpenEXR file.
pub fn read_exr_from_file(file_path: &str)
    -> Option<(Vec<(Float, Float, Float)>, usize, usize)> {
    log::info!("Starting reading OpenEXR image from: {}.", file_path);

    let image = read_first_rgba_layer_from_file(
        file_path,
        |resolution, _| {
            (vec![(0.0f32, 0.0f32, 0.0f32); resolution.width() * resolution.height()],
             resolution.width())
        },
        |(pixels, width), position, (r, g, b, _a): (f32, f32, f32, f32)| {
            pixels[position.y() * *width + position.x()] = (r, g, b);
        },
    );

    match image {
        Ok(image) => {
            let size = image.layer_data.size;
            let (pixels, _) = image.layer_data.channel_data.pixels;
            log::info!("OpenEXR loaded, width = {}, height = {}.",
                       size.width(), size.height());
            Some((pixels, size.width(), size.height()))
        }
        Err(error) => {
            log::error!("Failed to read {}: {}.", file_path, error);
            None
        }
    }
}
