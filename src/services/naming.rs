//! Storage key derivation for uploaded files.

use rand::Rng;

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension of `name` (without the dot), if it has one.
pub fn file_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// Swap the extension of `name` for `extension`, appending one if missing.
fn with_extension(name: &str, extension: &str) -> String {
    let stem = match file_extension(name) {
        Some(ext) => &name[..name.len() - ext.len() - 1],
        None => name,
    };
    format!("{}.{}", stem, extension)
}

/// Random 128-bit hex token.
pub fn random_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Derive the object key for an upload.
///
/// `extension` is the extension of the bytes actually stored, which differs
/// from the original name's when the image was re-encoded. Uniqueness is
/// probabilistic in hashed mode and relies on millisecond granularity
/// otherwise; no collision check is made.
pub fn generate_key(
    original_name: &str,
    extension: &str,
    use_hash_name: bool,
    now_millis: i64,
) -> String {
    if use_hash_name {
        return format!("{}.{}", random_token(), extension);
    }

    let original_ext = file_extension(original_name);
    let name = if original_ext.is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
        original_name.to_string()
    } else {
        with_extension(original_name, extension)
    };
    format!("{}_{}", now_millis, sanitize_filename(&name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_000_000;

    #[test]
    fn timestamp_mode_sanitizes_name() {
        assert_eq!(generate_key("a b.png", "png", false, T), format!("{}_a_b.png", T));
        assert_eq!(
            generate_key("my photo (1).JPG", "jpg", false, T),
            format!("{}_my_photo__1_.JPG", T)
        );
    }

    #[test]
    fn timestamp_mode_follows_reencoded_extension() {
        assert_eq!(
            generate_key("holiday.png", "webp", false, T),
            format!("{}_holiday.webp", T)
        );
        assert_eq!(generate_key("README", "png", false, T), format!("{}_README.png", T));
    }

    #[test]
    fn hash_mode_is_random_hex() {
        let a = generate_key("a.png", "webp", true, T);
        let b = generate_key("a.png", "webp", true, T);
        assert_ne!(a, b);

        let (token, ext) = a.split_once('.').unwrap();
        assert_eq!(ext, "webp");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(file_extension("a.tar.gz"), Some("gz"));
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("none"), None);
    }

    #[test]
    fn sanitize_keeps_allowed_characters() {
        assert_eq!(sanitize_filename("Ab-9.x"), "Ab-9.x");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
    }
}
