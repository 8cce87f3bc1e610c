//! Title sanitization and path derivation for transfers.
//!
//! Titles come from untrusted page content, so the mapping is deliberately narrow:
//! only ASCII letters and digits survive, everything else becomes `_`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::constants::{MEDIA_EXTENSION, STAGING_SUFFIX};

/// Name used when a title is missing or sanitizes to nothing.
pub const PLACEHOLDER: &str = "untitled_video";

/// Maximum length of a sanitized name, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Maps an arbitrary title to a filesystem-safe stem.
///
/// Every character outside `[A-Za-z0-9]` becomes one `_` (runs are not collapsed), the
/// result is cut to [`MAX_FILENAME_CHARS`], and an empty result falls back to
/// [`PLACEHOLDER`].
///
/// ```
/// use clipfetch_core::download::sanitize;
///
/// assert_eq!(sanitize(Some("My Cool Video!")), "My_Cool_Video_");
/// assert_eq!(sanitize(None), "untitled_video");
/// ```
#[must_use]
pub fn sanitize(title: Option<&str>) -> String {
    let Some(title) = title.filter(|value| !value.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    let cleaned: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_FILENAME_CHARS)
        .collect();

    if cleaned.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cleaned
    }
}

/// Final file name for a title: `<sanitized>.mp4`.
#[must_use]
pub fn media_file_name(title: Option<&str>) -> String {
    format!("{}.{MEDIA_EXTENSION}", sanitize(title))
}

/// Sibling staging path for `target_path`: the same path with `.partial` appended.
#[must_use]
pub fn staging_path_for(target_path: &Path) -> PathBuf {
    let mut raw: OsString = target_path.as_os_str().to_owned();
    raw.push(STAGING_SUFFIX);
    PathBuf::from(raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_missing_or_empty_yields_placeholder() {
        assert_eq!(sanitize(None), PLACEHOLDER);
        assert_eq!(sanitize(Some("")), PLACEHOLDER);
    }

    #[test]
    fn test_sanitize_replaces_each_disallowed_char() {
        assert_eq!(sanitize(Some("My Cool Video!")), "My_Cool_Video_");
        assert_eq!(sanitize(Some("a  b")), "a__b");
        assert_eq!(sanitize(Some("../etc/passwd")), "___etc_passwd");
    }

    #[test]
    fn test_sanitize_replaces_non_ascii_per_character() {
        assert_eq!(sanitize(Some("café")), "caf_");
        assert_eq!(sanitize(Some("日本")), "__");
    }

    #[test]
    fn test_sanitize_all_disallowed_still_non_empty() {
        let out = sanitize(Some("!!!"));
        assert_eq!(out, "___");
    }

    #[test]
    fn test_sanitize_bounds_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize(Some(&long)).chars().count(), MAX_FILENAME_CHARS);

        let long_unicode = "é".repeat(500);
        let out = sanitize(Some(&long_unicode));
        assert_eq!(out.len(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_sanitize_output_character_set() {
        let samples = [
            "plain",
            "with spaces and: colons",
            "tab\tnew\nline",
            "emoji 🎬 clip",
            "quotes \"and\" 'apostrophes'",
        ];
        for sample in samples {
            let out = sanitize(Some(sample));
            assert!(!out.is_empty());
            assert!(out.chars().count() <= MAX_FILENAME_CHARS);
            assert!(
                out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "unexpected char in {out:?}"
            );
        }
    }

    #[test]
    fn test_media_file_name_appends_extension() {
        assert_eq!(media_file_name(Some("My Cool Video!")), "My_Cool_Video_.mp4");
        assert_eq!(media_file_name(None), "untitled_video.mp4");
    }

    #[test]
    fn test_staging_path_is_sibling_with_suffix() {
        let target = Path::new("/tmp/out/My_Cool_Video_.mp4");
        assert_eq!(
            staging_path_for(target),
            PathBuf::from("/tmp/out/My_Cool_Video_.mp4.partial")
        );
    }
}
