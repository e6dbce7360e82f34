//! Content-type resolution for uploaded files.
//!
//! The MIME type is settled once at upload time and stored on the record;
//! delivery never re-derives it.

/// Fallback for anything we cannot identify.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the MIME type from a file name's extension.
pub fn guess_from_name(file_name: &str) -> &'static str {
    let ext = extension_of(file_name).unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => OCTET_STREAM,
    }
}

/// Pick the canonical MIME type for an upload.
///
/// A client-declared type wins unless it is missing, unparseable or the
/// generic octet-stream, in which case the name's extension decides.
pub fn resolve(declared: Option<&str>, original_name: &str) -> String {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|d| is_plausible_mime(d) && d != OCTET_STREAM);

    match declared {
        Some(d) => d,
        None => guess_from_name(original_name).to_string(),
    }
}

/// Lower-cased extension of `file_name`, restricted to short alphanumerics so
/// it is safe to reuse in generated storage names.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn is_plausible_mime(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, sub)) => {
            !kind.is_empty()
                && !sub.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "/.+-_".contains(c))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_types() {
        assert_eq!(guess_from_name("movie.mp4"), "video/mp4");
        assert_eq!(guess_from_name("movie.MKV"), "video/x-matroska");
        assert_eq!(guess_from_name("song.flac"), "audio/flac");
        assert_eq!(guess_from_name("notes"), OCTET_STREAM);
        assert_eq!(guess_from_name("weird.xyz"), OCTET_STREAM);
    }

    #[test]
    fn declared_type_wins() {
        assert_eq!(resolve(Some("video/webm"), "clip.mp4"), "video/webm");
        assert_eq!(
            resolve(Some("Text/Plain; charset=utf-8"), "a.bin"),
            "text/plain"
        );
    }

    #[test]
    fn octet_stream_or_garbage_falls_back_to_name() {
        assert_eq!(resolve(Some(OCTET_STREAM), "clip.mp4"), "video/mp4");
        assert_eq!(resolve(Some("not a mime"), "clip.mp4"), "video/mp4");
        assert_eq!(resolve(None, "clip.mov"), "video/quicktime");
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension_of("a.MP4").as_deref(), Some("mp4"));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("evil.m p4"), None);
        assert_eq!(extension_of("../../etc.passwd/x"), None);
    }
}
