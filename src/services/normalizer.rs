//! Optional WebP re-encoding of uploaded images.

use bytes::Bytes;
use image::DynamicImage;
use tracing::debug;

pub const WEBP_MIME: &str = "image/webp";
pub const SVG_MIME: &str = "image/svg+xml";

/// Outcome of normalization. When `was_compressed` is false the original
/// bytes and MIME type are returned untouched; `failure` says why if an
/// encode was attempted.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Bytes,
    pub mime_type: String,
    pub extension: &'static str,
    pub was_compressed: bool,
    pub failure: Option<String>,
}

/// File extension for the MIME types we store.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        WEBP_MIME => "webp",
        SVG_MIME => "svg",
        _ => "bin",
    }
}

/// MIME type guessed from a key's extension, for listings that do not
/// report one.
pub fn mime_for_key(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => WEBP_MIME,
        Some("svg") => SVG_MIME,
        _ => "application/octet-stream",
    }
}

pub fn passthrough(bytes: Bytes, mime: &str, failure: Option<String>) -> NormalizedImage {
    NormalizedImage {
        extension: extension_for_mime(mime),
        mime_type: mime.to_string(),
        bytes,
        was_compressed: false,
        failure,
    }
}

/// Re-encode `bytes` to WebP when `compress` is set and the type is a raster
/// image. SVG always passes through.
///
/// Encoding is lossy at `quality`, clamped to 1..=100.
pub fn normalize(bytes: Bytes, mime: &str, compress: bool, quality: u8) -> NormalizedImage {
    if !compress || !mime.starts_with("image/") || mime == SVG_MIME {
        return passthrough(bytes, mime, None);
    }
    let quality = quality.clamp(1, 100);
    debug!(quality, "re-encoding {} as WebP", mime);

    match encode_webp(&bytes, quality) {
        Ok(encoded) => NormalizedImage {
            bytes: Bytes::from(encoded),
            mime_type: WEBP_MIME.to_string(),
            extension: "webp",
            was_compressed: true,
            failure: None,
        },
        Err(reason) => passthrough(bytes, mime, Some(reason)),
    }
}

fn encode_webp(data: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(data).map_err(|e| format!("decode failed: {e}"))?;
    // The WebP encoder only accepts 8-bit RGB(A).
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let encoder =
        webp::Encoder::from_image(&img).map_err(|e| format!("WebP encode failed: {e}"))?;
    Ok(encoder.encode(f32::from(quality)).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Bytes {
        let img = DynamicImage::new_rgba8(8, 8);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    #[test]
    fn disabled_compression_is_identity() {
        let input = png_bytes();
        let out = normalize(input.clone(), "image/png", false, 80);
        assert_eq!(out.bytes, input);
        assert_eq!(out.mime_type, "image/png");
        assert_eq!(out.extension, "png");
        assert!(!out.was_compressed);
        assert!(out.failure.is_none());
    }

    #[test]
    fn svg_is_never_reencoded() {
        let input = Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
        let out = normalize(input.clone(), SVG_MIME, true, 80);
        assert_eq!(out.bytes, input);
        assert_eq!(out.extension, "svg");
        assert!(!out.was_compressed);
    }

    #[test]
    fn png_becomes_webp() {
        let out = normalize(png_bytes(), "image/png", true, 75);
        assert!(out.was_compressed);
        assert_eq!(out.mime_type, WEBP_MIME);
        assert_eq!(out.extension, "webp");
        assert_eq!(&out.bytes[0..4], b"RIFF");
        assert_eq!(&out.bytes[8..12], b"WEBP");
    }

    /// A busy gradient so lossy quality has something to throw away.
    fn photo_like_png() -> Bytes {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            let v = x.wrapping_mul(37) ^ y.wrapping_mul(91);
            image::Rgb([(v % 251) as u8, (x * 4) as u8, (v.wrapping_mul(13) % 241) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        Bytes::from(buf.into_inner())
    }

    #[test]
    fn quality_changes_the_encoded_size() {
        let input = photo_like_png();
        let low = normalize(input.clone(), "image/png", true, 10);
        let high = normalize(input, "image/png", true, 90);
        assert!(low.was_compressed && high.was_compressed);
        assert!(
            low.bytes.len() < high.bytes.len(),
            "q10 = {} bytes, q90 = {} bytes",
            low.bytes.len(),
            high.bytes.len()
        );
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let input = photo_like_png();
        let zero = normalize(input.clone(), "image/png", true, 0);
        let one = normalize(input, "image/png", true, 1);
        assert_eq!(zero.bytes, one.bytes);
    }

    #[test]
    fn corrupt_input_falls_back_to_original() {
        let input = Bytes::from_static(b"\x89PNG\r\n\x1a\nnot really");
        let out = normalize(input.clone(), "image/png", true, 80);
        assert_eq!(out.bytes, input);
        assert_eq!(out.mime_type, "image/png");
        assert!(!out.was_compressed);
        assert!(out.failure.is_some());
    }

    #[test]
    fn non_images_pass_through() {
        let input = Bytes::from_static(b"hello");
        let out = normalize(input.clone(), "text/plain", true, 80);
        assert_eq!(out.bytes, input);
        assert_eq!(out.extension, "bin");
    }

    #[test]
    fn guesses_mime_from_key() {
        assert_eq!(mime_for_key("1700_a.JPG"), "image/jpeg");
        assert_eq!(mime_for_key("abc.webp"), WEBP_MIME);
        assert_eq!(mime_for_key("noext"), "application/octet-stream");
    }
}
