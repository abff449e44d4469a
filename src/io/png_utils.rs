// Copyright @yucwang 2026

use crate::math::constants::Float;

// Gamma 2.2 encoding of a clamped linear value.
fn encode(v: Float) -> u8 {
    let clamped = v.max(0.0).min(1.0);
    (clamped.powf(1.0 / 2.2) * 255.0 + 0.5) as u8
}

// Write a tonemapped 8-bit PNG preview of a linear radiance image.
pub fn write_png_to_file(image: &Vec<(Float, Float, Float)>,
                        width: usize,
                        height: usize,
                        file_path: &str) {
    log::info!("Starting writing png image: {}.", file_path);

    let mut png = image::RgbImage::new(width as u32, height as u32);
    for (index, pixel) in image.iter().enumerate() {
        let x = (index % width) as u32;
        let y = (index / width) as u32;
        png.put_pixel(x, y, image::Rgb([encode(pixel.0), encode(pixel.1), encode(pixel.2)]));
    }

    if let Err(error) = png.save(file_path) {
        log::error!("Failed to write {}: {}.", file_path, error);
    }
}
