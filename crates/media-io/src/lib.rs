use mime_guess::Mime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod probe;

pub use probe::{parse_ffprobe_json, FfprobeProbe, MediaProbe};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported media type: {0}")]
    Unsupported(String),
    #[error("ffprobe not found: {0}")]
    ToolMissing(String),
    #[error("probe failed for {path}: {reason}")]
    ProbeFailed { path: String, reason: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad probe output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind { Video, Image, Audio }

impl MediaKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let (category, _) = mime.split_once('/')?;
        match category {
            "video" => Some(MediaKind::Video),
            "image" => Some(MediaKind::Image),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub kind: MediaKind,
    pub mime: String,
    pub duration_seconds: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps_num: Option<u32>,
    pub fps_den: Option<u32>,
    pub audio_channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// MIME type guessed from the file extension, the same way a browser file picker reports it.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}

pub fn is_video_mime(mime: &str) -> bool {
    mime.parse::<Mime>().is_ok_and(|m| m.type_() == mime_guess::mime::VIDEO)
}

/// Every file extension registered for a `video/*` type, for file-picker filters.
pub fn video_extensions() -> Vec<&'static str> {
    mime_guess::get_mime_extensions_str("video/*").map(|exts| exts.to_vec()).unwrap_or_default()
}

/// Probes with ffprobe found on `PATH`.
pub fn probe_media(path: &Path) -> Result<MediaInfo, MediaError> {
    FfprobeProbe::locate(None)?.probe(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(&PathBuf::from("a/b/clip.MP4")), Some("video/mp4"));
        assert_eq!(mime_for_path(&PathBuf::from("clip.mov")), Some("video/quicktime"));
        assert_eq!(mime_for_path(&PathBuf::from("song.mp3")), Some("audio/mpeg"));
        assert_eq!(mime_for_path(&PathBuf::from("notes.txt")), Some("text/plain"));
        assert_eq!(mime_for_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn less_common_containers_are_video() {
        for name in ["a.wmv", "c.flv", "d.mkv", "e.3gp", "f.ogv"] {
            let mime = mime_for_path(&PathBuf::from(name));
            assert!(mime.is_some_and(is_video_mime), "{name} -> {mime:?}");
        }
    }

    #[test]
    fn picker_extensions_cover_common_video() {
        let exts = video_extensions();
        for ext in ["mp4", "mov", "webm", "wmv", "flv"] {
            assert!(exts.contains(&ext), "missing {ext}");
        }
        assert!(!exts.contains(&"png"));
    }

    #[test]
    fn video_category() {
        assert!(is_video_mime("video/webm"));
        assert!(!is_video_mime("image/png"));
        assert!(!is_video_mime("application/video"));
        assert!(!is_video_mime("video"));
        assert!(is_video_mime("video/x-ms-wmv"));
        assert_eq!(MediaKind::from_mime("audio/wav"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("text/plain"), None);
    }
}
