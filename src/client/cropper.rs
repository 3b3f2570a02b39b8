use anyhow::Result;
use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::image_processing;

/// Share of the shorter image side covered by the initial crop region.
const INITIAL_COVERAGE: f32 = 0.8;

/// Square crop region in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Interactive crop state over one decoded image.
///
/// The aspect ratio is fixed at 1:1 and the region never leaves the image.
pub struct CropWidget {
    image: DynamicImage,
    region: CropRegion,
}

impl CropWidget {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(image_processing::decode_image(bytes)?))
    }

    pub fn new(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let shorter = width.min(height);
        let side = ((shorter as f32 * INITIAL_COVERAGE).round() as u32).max(1).min(shorter);
        let region = CropRegion {
            x: (width - side) / 2,
            y: (height - side) / 2,
            side,
        };
        Self { image, region }
    }

    pub fn image_dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Place the region, shrinking it to fit and shifting it back inside
    /// the image where needed.
    pub fn set_region(&mut self, x: i64, y: i64, side: u32) {
        let (width, height) = self.image.dimensions();
        let shorter = width.min(height);
        let side = side.max(1).min(shorter);
        let max_x = i64::from(width - side);
        let max_y = i64::from(height - side);
        self.region = CropRegion {
            x: x.clamp(0, max_x) as u32,
            y: y.clamp(0, max_y) as u32,
            side,
        };
    }

    pub fn move_by(&mut self, dx: i64, dy: i64) {
        let CropRegion { x, y, side } = self.region;
        self.set_region(i64::from(x) + dx, i64::from(y) + dy, side);
    }

    /// Resize around the current centre.
    pub fn resize_to(&mut self, side: u32) {
        let CropRegion { x, y, side: current } = self.region;
        let center_x = i64::from(x) + i64::from(current) / 2;
        let center_y = i64::from(y) + i64::from(current) / 2;
        let half = i64::from(side) / 2;
        self.set_region(center_x - half, center_y - half, side);
    }

    pub fn cropped_canvas(&self) -> RgbaImage {
        let CropRegion { x, y, side } = self.region;
        image_processing::crop_square(&self.image, x, y, side)
    }

    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        image_processing::encode_jpeg(&self.cropped_canvas())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::png_fixture;

    fn widget(width: u32, height: u32) -> CropWidget {
        CropWidget::from_bytes(&png_fixture(width, height)).unwrap()
    }

    #[test]
    fn initial_region_is_centered_square() {
        let w = widget(200, 100);
        assert_eq!(w.region(), CropRegion { x: 60, y: 10, side: 80 });

        let w = widget(50, 120);
        assert_eq!(w.region(), CropRegion { x: 5, y: 40, side: 40 });
    }

    #[test]
    fn move_is_clamped_to_image() {
        let mut w = widget(200, 100);
        w.move_by(-1000, 5);
        assert_eq!(w.region(), CropRegion { x: 0, y: 15, side: 80 });
        w.move_by(1000, 1000);
        assert_eq!(w.region(), CropRegion { x: 120, y: 20, side: 80 });
    }

    #[test]
    fn resize_keeps_square_within_bounds() {
        let mut w = widget(200, 100);
        w.resize_to(500);
        let region = w.region();
        assert_eq!(region.side, 100);
        assert_eq!(region.y, 0);
        assert!(region.x + region.side <= 200);

        w.resize_to(0);
        assert_eq!(w.region().side, 1);
    }

    #[test]
    fn set_region_shifts_back_inside() {
        let mut w = widget(64, 64);
        w.set_region(50, 60, 32);
        assert_eq!(w.region(), CropRegion { x: 32, y: 32, side: 32 });
    }

    #[test]
    fn cropped_canvas_is_square_region() {
        let mut w = widget(64, 48);
        w.set_region(8, 4, 16);
        let canvas = w.cropped_canvas();
        assert_eq!(canvas.dimensions(), (16, 16));
        assert_eq!(canvas.get_pixel(0, 0).0, [8, 4, 128, 255]);
    }

    #[test]
    fn jpeg_output_has_region_dimensions() {
        let w = widget(30, 20);
        let jpeg = w.to_jpeg().unwrap();
        let decoded = image_processing::decode_image(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (16, 16));
    }
}
