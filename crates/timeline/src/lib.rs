use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub mod effect;

pub use effect::{apply_chain, EffectError, EffectPreset, EffectToken, FilterOp, ENHANCE_PRESET, PRESETS};

/// Longest trim window a clip may carry, in seconds.
pub const MAX_CLIP_SECONDS: f64 = 60.0;

/// Label used on the timeline when the source file has no usable name.
pub const FALLBACK_CLIP_LABEL: &str = "Video Clip";

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
    #[error("invalid trim window [{start}, {end}] for duration {duration}")]
    InvalidTrim { start: f64, end: f64, duration: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(Uuid);

impl ClipId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for ClipId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough for logs and labels
        write!(f, "{}", &self.0.simple().to_string()[..9])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayId(Uuid);

impl OverlayId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for OverlayId {
    fn default() -> Self { Self::new() }
}

/// Handle to the uploaded media. Owned by exactly one clip for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub path: PathBuf,
    pub mime: String,
}

impl MediaSource {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self { path: path.into(), mime: mime.into() }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
    }
}

/// Half-open playback window inside a clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn new(start: f64, end: f64, duration: f64) -> Result<Self, TimelineError> {
        if !(0.0 <= start && start < end && end <= duration) {
            return Err(TimelineError::InvalidTrim { start, end, duration });
        }
        Ok(Self { start, end })
    }

    /// Window a freshly uploaded clip starts with: `[0, min(duration, limit)]`.
    pub fn initial(duration: f64, limit: f64) -> Result<Self, TimelineError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimelineError::InvalidDuration(duration));
        }
        Self::new(0.0, duration.min(limit), duration)
    }

    pub fn len(&self) -> f64 { self.end - self.start }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub name: Option<String>,
    pub source: MediaSource,
    pub trim: TrimWindow,
    pub duration: f64,
    pub effects: Vec<EffectToken>,
}

impl Clip {
    pub fn new(source: MediaSource, duration: f64, limit: f64) -> Result<Self, TimelineError> {
        let trim = TrimWindow::initial(duration, limit)?;
        Ok(Self {
            id: ClipId::new(),
            name: source.file_name(),
            source,
            trim,
            duration,
            effects: Vec::new(),
        })
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_CLIP_LABEL)
    }

    pub fn trimmed_duration(&self) -> f64 { self.trim.len() }

    /// Pulls the trim end back to `limit` when the media runs longer than it.
    pub fn clamp_to(&self, limit: f64) -> Self {
        let mut out = self.clone();
        if self.duration > limit {
            out.trim.end = limit;
        }
        out
    }
}

/// Text drawn over the preview. Position is a percentage of the frame and is not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub id: OverlayId,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: String,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32, color: impl Into<String>) -> Self {
        Self { id: OverlayId::new(), text: text.into(), x, y, font_size, color: color.into() }
    }

    /// Overlay appended by the "add text" action.
    pub fn placeholder() -> Self { Self::new("Edit Me", 50.0, 50.0, 24.0, "#ffffff") }

    /// Caption written by auto-edit.
    pub fn ai_caption() -> Self { Self::new("AI Enhanced", 50.0, 10.0, 32.0, "#ffffff") }
}

/// `m:ss`, both parts floored.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

pub fn timeline_header(clip_count: usize) -> String {
    let noun = if clip_count == 1 { "clip" } else { "clips" };
    format!("Timeline ({clip_count} {noun})")
}

pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let s = hex.trim().trim_start_matches('#');
    if !s.is_ascii() { return None; }
    let expand = |c: char| c.to_digit(16).map(|v| (v * 17) as u8);
    match s.len() {
        3 => {
            let mut chars = s.chars();
            Some([expand(chars.next()?)?, expand(chars.next()?)?, expand(chars.next()?)?])
        }
        6 => {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some([r, g, b])
        }
        _ => None,
    }
}
