use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage, codecs::jpeg::JpegEncoder};

/// Quality used when the crop is serialised, matching a browser canvas'
/// default for `image/jpeg`.
pub const JPEG_QUALITY: u8 = 92;

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let format = match detect_mime_type(bytes) {
        Some(mime_type) => mime_to_format(mime_type)?,
        None => image::guess_format(bytes).map_err(|err| anyhow!("unknown image format: {err}"))?,
    };
    image::load_from_memory_with_format(bytes, format)
        .map_err(|err| anyhow!("decode image failed: {err}"))
}

/// Copy the `side`×`side` square at (`x`, `y`). The square is clipped to
/// the image bounds.
pub fn crop_square(image: &DynamicImage, x: u32, y: u32, side: u32) -> RgbaImage {
    image.crop_imm(x, y, side, side).to_rgba8()
}

/// Encode as baseline JPEG. Alpha is dropped since JPEG has none.
pub fn encode_jpeg(pixels: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY))
        .map_err(|err| anyhow!("encode jpeg failed: {err}"))?;
    Ok(output)
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/bmp" => Ok(ImageFormat::Bmp),
        _ => Err(anyhow!("unsupported mime type: {mime_type}")),
    }
}

#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .unwrap();
    output
}

#[cfg(test)]
mod tests {
    use image::GenericImageView;

    use super::*;

    #[test]
    fn detects_common_signatures() {
        assert_eq!(detect_mime_type(&png_fixture(2, 2)), Some("image/png"));
        assert_eq!(detect_mime_type(b"\xFF\xD8\xFF\xE0rest"), Some("image/jpeg"));
        assert_eq!(detect_mime_type(b"GIF89a...."), Some("image/gif"));
        assert_eq!(detect_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_mime_type(b"plain text"), None);
    }

    #[test]
    fn decode_reads_png_dimensions() {
        let image = decode_image(&png_fixture(40, 30)).unwrap();
        assert_eq!(image.dimensions(), (40, 30));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn crop_square_copies_region() {
        let image = decode_image(&png_fixture(40, 30)).unwrap();
        let cropped = crop_square(&image, 10, 5, 20);
        assert_eq!(cropped.dimensions(), (20, 20));
        assert_eq!(cropped.get_pixel(0, 0).0, [10, 5, 128, 255]);
        assert_eq!(cropped.get_pixel(19, 19).0, [29, 24, 128, 255]);
    }

    #[test]
    fn encode_jpeg_produces_decodable_jpeg() {
        let image = decode_image(&png_fixture(16, 16)).unwrap();
        let jpeg = encode_jpeg(&crop_square(&image, 0, 0, 8)).unwrap();
        assert_eq!(detect_mime_type(&jpeg), Some("image/jpeg"));
        assert_eq!(decode_image(&jpeg).unwrap().dimensions(), (8, 8));
    }
}
