use crate::{Error, Result};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Decodes the whole upload so truncated or corrupt files are rejected
/// before they reach the model.
pub fn decode_upload(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::invalid_image("image data is empty"));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::invalid_image(e.to_string()))?;

    if reader.format().is_none() {
        return Err(Error::invalid_image("cannot identify image file"));
    }

    let image = reader
        .decode()
        .map_err(|e| Error::invalid_image(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(Error::invalid_image("image has no pixels"));
    }

    Ok(image)
}
