use image::imageops::{self, FilterType};
use ndarray::Array3;
use std::path::Path;

use super::ClassifierError;

pub const INPUT_SIZE: u32 = 224;
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Loads an image file and turns it into a normalized CHW array of shape (3, 224, 224).
pub fn load_image(image_path: &Path) -> Result<Array3<f32>, ClassifierError> {
    if !image_path.exists() {
        return Err(ClassifierError::InputMissing(image_path.to_path_buf()));
    }
    let image = image::open(image_path)?;
    Ok(to_normalized_chw(&image.to_rgb8()))
}

/// Resize to 224x224, scale to [0, 1], then normalize each channel with the ImageNet statistics.
pub fn to_normalized_chw(rgb: &image::RgbImage) -> Array3<f32> {
    let resized = imageops::resize(rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let size = INPUT_SIZE as usize;
    let mut tensor = Array3::<f32>::zeros((3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[channel, y as usize, x as usize]] = normalize(pixel[channel], channel);
        }
    }
    tensor
}

#[inline]
pub fn normalize(value: u8, channel: usize) -> f32 {
    (value as f32 / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn output_has_chw_shape() {
        let image = RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]));
        let tensor = to_normalized_chw(&image);
        assert_eq!(tensor.shape(), &[3, 224, 224]);
    }

    #[test]
    fn uniform_image_normalizes_to_channel_constants() {
        let image = RgbImage::from_pixel(300, 300, Rgb([255, 0, 128]));
        let tensor = to_normalized_chw(&image);

        let red = (1.0f32 - 0.485) / 0.229;
        let green = (0.0f32 - 0.456) / 0.224;
        let blue = (128.0f32 / 255.0 - 0.406) / 0.225;

        assert!((tensor[[0, 0, 0]] - red).abs() < 1e-6);
        assert!((tensor[[1, 100, 17]] - green).abs() < 1e-6);
        assert!((tensor[[2, 223, 223]] - blue).abs() < 1e-6);
        assert!((red - 2.2489083).abs() < 1e-5);
        assert!((green + 2.0357141).abs() < 1e-5);
    }

    #[test]
    fn preprocessing_is_deterministic() {
        let mut image = RgbImage::new(97, 61);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8]);
        }
        let first = to_normalized_chw(&image);
        let second = to_normalized_chw(&image);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_is_reported_as_missing_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.png");
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::InputMissing(p) if p == path));
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }

    #[test]
    fn png_on_disk_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("white.png");
        RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();
        let tensor = load_image(&path).unwrap();
        assert!((tensor[[0, 5, 5]] - normalize(255, 0)).abs() < 1e-6);
    }
}
