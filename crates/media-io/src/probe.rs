use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::{mime_for_path, MediaError, MediaInfo, MediaKind};

/// Resolves intrinsic media properties. Implementations must be callable from worker threads.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    bin: PathBuf,
}

impl FfprobeProbe {
    /// Uses `explicit` when given, otherwise searches `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, MediaError> {
        let bin = match explicit {
            Some(p) if p.is_file() => p.to_path_buf(),
            Some(p) => return Err(MediaError::ToolMissing(p.display().to_string())),
            None => which::which("ffprobe").map_err(|e| MediaError::ToolMissing(e.to_string()))?,
        };
        debug!(bin = %bin.display(), "using ffprobe");
        Ok(Self { bin })
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let mime = mime_for_path(path)
            .ok_or_else(|| MediaError::Unsupported(path.display().to_string()))?;
        let out = Command::new(&self.bin)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !out.status.success() {
            return Err(MediaError::ProbeFailed {
                path: path.display().to_string(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        parse_ffprobe_json(&String::from_utf8_lossy(&out.stdout), mime)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u16>,
    sample_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_rate(s: &str) -> Option<(u32, u32)> {
    let (n, d) = s.split_once('/')?;
    let (n, d) = (n.parse().ok()?, d.parse().ok()?);
    if n == 0 || d == 0 { return None; }
    Some((n, d))
}

fn parse_seconds(s: Option<&String>) -> Option<f64> {
    s.and_then(|v| v.parse::<f64>().ok()).filter(|d| d.is_finite() && *d > 0.0)
}

/// Builds [`MediaInfo`] from `ffprobe -print_format json` output.
pub fn parse_ffprobe_json(json: &str, mime: &str) -> Result<MediaInfo, MediaError> {
    let parsed: ProbeOutput = serde_json::from_str(json)?;
    let kind = MediaKind::from_mime(mime).ok_or_else(|| MediaError::Unsupported(mime.to_string()))?;
    let video = parsed.streams.iter().find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = parsed.streams.iter().find(|s| s.codec_type.as_deref() == Some("audio"));
    // container duration first, stream duration as fallback
    let duration_seconds = parse_seconds(parsed.format.as_ref().and_then(|f| f.duration.as_ref()))
        .or_else(|| parse_seconds(video.and_then(|v| v.duration.as_ref())));
    let rate = video.and_then(|v| v.r_frame_rate.as_deref()).and_then(parse_rate);
    Ok(MediaInfo {
        kind,
        mime: mime.to_string(),
        duration_seconds,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        fps_num: rate.map(|r| r.0),
        fps_den: rate.map(|r| r.1),
        audio_channels: audio.and_then(|a| a.channels),
        sample_rate: audio.and_then(|a| a.sample_rate.as_deref()).and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "30000/1001", "duration": "89.9" },
            { "codec_type": "audio", "channels": 2, "sample_rate": "48000" }
        ],
        "format": { "duration": "90.048000" }
    }"#;

    #[test]
    fn parses_container_duration_and_streams() {
        let info = parse_ffprobe_json(SAMPLE, "video/mp4").unwrap();
        assert_eq!(info.kind, MediaKind::Video);
        assert_eq!(info.duration_seconds, Some(90.048));
        assert_eq!((info.width, info.height), (Some(1920), Some(1080)));
        assert_eq!((info.fps_num, info.fps_den), (Some(30000), Some(1001)));
        assert_eq!(info.audio_channels, Some(2));
        assert_eq!(info.sample_rate, Some(48000));
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let json = r#"{ "streams": [ { "codec_type": "video", "duration": "12.5", "r_frame_rate": "0/0" } ], "format": {} }"#;
        let info = parse_ffprobe_json(json, "video/webm").unwrap();
        assert_eq!(info.duration_seconds, Some(12.5));
        assert_eq!(info.fps_num, None);
    }

    #[test]
    fn unresolved_duration_stays_none() {
        let json = r#"{ "streams": [], "format": { "duration": "N/A" } }"#;
        let info = parse_ffprobe_json(json, "video/mp4").unwrap();
        assert_eq!(info.duration_seconds, None);
    }

    #[test]
    fn garbage_output_is_an_error() {
        assert!(matches!(parse_ffprobe_json("not json", "video/mp4"), Err(MediaError::Json(_))));
    }

    #[test]
    fn explicit_tool_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("ffprobe-missing");
        assert!(matches!(FfprobeProbe::locate(Some(&missing)), Err(MediaError::ToolMissing(_))));

        let present = dir.path().join("ffprobe");
        std::fs::write(&present, b"").unwrap();
        assert!(FfprobeProbe::locate(Some(&present)).is_ok());
    }
}
