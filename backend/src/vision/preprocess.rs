use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use ndarray::Array4;

pub const INPUT_SIZE: u32 = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// ITU-R 601-2 luma in 16-bit fixed point, the same integer transform PIL
/// applies for an RGB to "L" conversion.
pub fn luma_601(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// Chest X-ray input: grayscale replicated over three channels, 224x224,
/// ImageNet-normalised, laid out as `[1, 3, H, W]`.
pub fn preprocess_xray(image: &RgbImage) -> Array4<f32> {
    let gray = image::imageops::resize(&luma_601(image), INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
        let value = gray.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0;
        (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
    })
}

/// CT input: 224x224 RGB scaled into [0, 1], channels-last `[1, H, W, 3]`.
pub fn preprocess_ctscan(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
        resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
    })
}
