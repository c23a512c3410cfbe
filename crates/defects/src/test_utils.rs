//! Synthetic rock-core images for pipeline tests.

use image::{DynamicImage, Rgb, RgbImage};

pub const BACKGROUND: u8 = 220;
pub const DARK: u8 = 30;

pub fn uniform_image(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3])))
}

/// Paint the half-open box `[x0, x1) × [y0, y1)`
pub fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
    for y in y0..y1.min(image.height()) {
        for x in x0..x1.min(image.width()) {
            image.put_pixel(x, y, Rgb([value; 3]));
        }
    }
}

pub fn fill_disk(image: &mut RgbImage, cx: f64, cy: f64, radius: f64, value: u8) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        if dx * dx + dy * dy <= radius * radius {
            *pixel = Rgb([value; 3]);
        }
    }
}

/// L-shaped crack 10 px wide: a long horizontal leg with a short vertical leg
pub fn l_crack_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(200, 100, Rgb([BACKGROUND; 3]));
    fill_rect(&mut image, 20, 20, 180, 30, DARK);
    fill_rect(&mut image, 20, 20, 30, 80, DARK);
    DynamicImage::ImageRgb8(image)
}

/// Two separate L-shaped cracks; the lower one is larger
pub fn two_l_cracks_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(240, 170, Rgb([BACKGROUND; 3]));
    fill_rect(&mut image, 20, 20, 120, 30, DARK);
    fill_rect(&mut image, 20, 20, 30, 60, DARK);
    fill_rect(&mut image, 20, 90, 220, 100, DARK);
    fill_rect(&mut image, 20, 90, 30, 150, DARK);
    DynamicImage::ImageRgb8(image)
}

/// One compact dark square
pub fn square_blob_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(120, 120, Rgb([BACKGROUND; 3]));
    fill_rect(&mut image, 30, 30, 90, 90, DARK);
    DynamicImage::ImageRgb8(image)
}

/// A 50×50 square on the left and a disk of similar area on the right
pub fn square_and_disk_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(200, 100, Rgb([BACKGROUND; 3]));
    fill_rect(&mut image, 20, 20, 70, 70, DARK);
    fill_disk(&mut image, 140.0, 50.0, 28.0, DARK);
    DynamicImage::ImageRgb8(image)
}

/// Two dark disks, radius 5 and radius 12
pub fn small_and_large_holes_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(120, 60, Rgb([BACKGROUND; 3]));
    fill_disk(&mut image, 25.0, 30.0, 5.0, DARK);
    fill_disk(&mut image, 80.0, 30.0, 12.0, DARK);
    DynamicImage::ImageRgb8(image)
}

/// Grid of four 10×10 grains
pub fn grains_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(100, 100, Rgb([200; 3]));
    for (x, y) in [(15, 15), (60, 15), (15, 60), (60, 60)] {
        fill_rect(&mut image, x, y, x + 10, y + 10, 40);
    }
    DynamicImage::ImageRgb8(image)
}
