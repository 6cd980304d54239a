/// MIME type returned for extensions not in the table.
pub const DEFAULT_VIDEO_MIME: &str = "video/mpeg";

/// MIME type for a video file extension. Matching ignores case and a leading dot.
pub fn mime_for_extension(extension: &str) -> &'static str {
    let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    match extension.as_str() {
        "avi" => "video/avi",
        "ogg" | "ogv" => "application/ogg",
        "wmv" => "audio/x-ms-wmv",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "divx" => "video/x-divx",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        // mpg, mpeg, m2ts and anything unknown
        _ => DEFAULT_VIDEO_MIME,
    }
}
