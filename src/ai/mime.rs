use image::ImageFormat;

/// Formats accepted as person or outfit photos.
const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Sniff the media type of image bytes. Returns `None` for anything that is
/// not one of the accepted photo formats, including formats the `image`
/// crate knows but the upload surface does not offer (PNM, TGA, ...).
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Some(format.to_mime_type()),
        Ok(format) => {
            tracing::debug!("Rejecting unsupported image format {:?}", format);
            None
        }
        Err(_) => {
            tracing::debug!(
                "Unrecognized image format (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            None
        }
    }
}

/// Media type for arbitrary file bytes, `application/octet-stream` when the
/// content is not a known image.
pub fn detect_mime_or_octet_stream(bytes: &[u8]) -> &'static str {
    detect_image_mime(bytes).unwrap_or("application/octet-stream")
}
