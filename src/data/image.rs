// ============================================================
// Layer 4 — Image Transform
// ============================================================
// Decodes an image file and turns it into the fixed-shape float
// tensor the image encoder expects:
//
//   1. resize to size × size (triangle filter, aspect ignored)
//   2. convert to 8-bit RGB
//   3. scale to [0, 1] and normalise with ImageNet mean / std
//   4. lay out channel-major: [3, size, size]

use image::imageops::FilterType;
use std::path::Path;

use crate::domain::error::{VqaError, VqaResult};
use crate::domain::traits::{ImagePixels, ImageSource};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD:  [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone)]
pub struct ImageTransform {
    size: usize,
}

impl ImageTransform {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn apply(&self, img: &image::DynamicImage) -> ImagePixels {
        let side = self.size as u32;
        let rgb = img.resize_exact(side, side, FilterType::Triangle).to_rgb8();

        let mut values = Vec::with_capacity(3 * self.size * self.size);
        for c in 0..3 {
            for y in 0..side {
                for x in 0..side {
                    let v = rgb.get_pixel(x, y)[c] as f32 / 255.0;
                    values.push((v - MEAN[c]) / STD[c]);
                }
            }
        }

        ImagePixels { shape: self.shape(), values }
    }
}

impl ImageSource for ImageTransform {
    fn load(&self, path: &Path) -> VqaResult<ImagePixels> {
        if !path.is_file() {
            return Err(VqaError::data(path.display().to_string(), "image file not found"));
        }
        let img = image::open(path)
            .map_err(|e| VqaError::data(path.display().to_string(), format!("cannot decode image: {e}")))?;
        Ok(self.apply(&img))
    }

    fn shape(&self) -> [usize; 3] {
        [3, self.size, self.size]
    }
}
