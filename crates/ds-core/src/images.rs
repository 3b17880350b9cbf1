use std::io::Cursor;
use image::{ImageFormat, Rgb, RgbImage};
use crate::error::{Error, Result};

/// Decode an encoded image and normalize it to 8-bit RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(Error::EmptyInput("image payload is empty".into()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::InvalidRequest(format!("cannot decode image: {e}")))?;
    Ok(image.to_rgb8())
}

pub fn encode_png(image: &RgbImage) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Flat grey square used to exercise the whole pipeline once at startup.
pub fn warm_up_png(size: u32) -> image::ImageResult<Vec<u8>> {
    encode_png(&RgbImage::from_pixel(size, size, Rgb([128, 128, 128])))
}
