//! Editing state and its transitions.
//!
//! [`EditorState`] is a value. Each user action or surface event is a method
//! that borrows the current snapshot and returns the next one; a rejected
//! action returns an error and the caller keeps the snapshot it had.

use jobs::JobKind;
use media_io::is_video_mime;
use serde::Serialize;
use timeline::{Clip, ClipId, EffectToken, MediaSource, TextOverlay, ENHANCE_PRESET, MAX_CLIP_SECONDS};
use tracing::debug;

use crate::EditorError;

pub const EXPORT_NOTICE: &str = "Video export feature would render the final video with all effects and overlays. \
In a production app, this would use server-side processing or client-side canvas rendering.";

/// The single long-running operation currently in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingJob {
    pub kind: JobKind,
    pub job_id: String,
    /// Active clip at the time the job was scheduled.
    pub target: ClipId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    AddClip { source: MediaSource, duration: f64 },
    SetActiveClip(ClipId),
    TogglePlay,
    Play,
    Pause,
    Seek(f64),
    ToggleMute,
    Reset,
    SetEffect(EffectToken),
    AddTextOverlay,
    BeginProcessing(ProcessingJob),
    CompleteAutoEdit { job_id: String },
    CompleteExport { job_id: String },
    CancelProcessing { job_id: String },
    DismissNotice,
    TimeUpdate(f64),
    MetadataLoaded(f64),
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorState {
    pub clips: Vec<Clip>,
    pub active: Option<ClipId>,
    pub current_time: f64,
    pub duration: f64,
    pub effect: EffectToken,
    pub overlays: Vec<TextOverlay>,
    pub is_playing: bool,
    pub is_muted: bool,
    pub processing: Option<ProcessingJob>,
    pub notice: Option<String>,
    pub limit: f64,
}

impl Default for EditorState {
    fn default() -> Self { Self::new(MAX_CLIP_SECONDS) }
}

impl EditorState {
    pub fn new(limit: f64) -> Self {
        Self {
            clips: Vec::new(),
            active: None,
            current_time: 0.0,
            duration: 0.0,
            effect: EffectToken::none(),
            overlays: Vec::new(),
            is_playing: false,
            is_muted: false,
            processing: None,
            notice: None,
            limit,
        }
    }

    pub fn active_clip(&self) -> Option<&Clip> {
        let id = self.active?;
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> { self.clips.iter().find(|c| c.id == id) }

    pub fn is_processing(&self) -> bool { self.processing.is_some() }

    pub fn has_active_clip(&self) -> bool { self.active.is_some() }

    /// Upper bound of the seek slider.
    pub fn max_seek(&self) -> f64 { self.duration.min(self.limit).max(0.0) }

    pub fn exceeds_limit(&self) -> bool { self.has_active_clip() && self.duration > self.limit }

    pub fn can_start_processing(&self) -> bool { self.has_active_clip() && !self.is_processing() }

    pub fn apply(&self, action: EditorAction) -> Result<Self, EditorError> {
        match action {
            EditorAction::AddClip { source, duration } => self.add_clip(source, duration),
            EditorAction::SetActiveClip(id) => self.set_active_clip(id),
            EditorAction::TogglePlay => Ok(self.toggle_play()),
            EditorAction::Play => Ok(self.play()),
            EditorAction::Pause => Ok(self.pause()),
            EditorAction::Seek(t) => self.seek(t),
            EditorAction::ToggleMute => Ok(self.toggle_mute()),
            EditorAction::Reset => Ok(self.reset()),
            EditorAction::SetEffect(token) => self.set_effect(token),
            EditorAction::AddTextOverlay => self.add_text_overlay(),
            EditorAction::BeginProcessing(job) => self.begin_processing(job),
            EditorAction::CompleteAutoEdit { job_id } => Ok(self.complete_auto_edit(&job_id)),
            EditorAction::CompleteExport { job_id } => Ok(self.complete_export(&job_id)),
            EditorAction::CancelProcessing { job_id } => Ok(self.cancel_processing(&job_id)),
            EditorAction::DismissNotice => Ok(self.dismiss_notice()),
            EditorAction::TimeUpdate(t) => Ok(self.on_time_update(t)),
            EditorAction::MetadataLoaded(d) => Ok(self.on_metadata_loaded(d)),
            EditorAction::Ended => Ok(self.on_ended()),
        }
    }

    /// Appends a clip with trim window `[0, min(duration, limit)]`. The first clip becomes active.
    pub fn add_clip(&self, source: MediaSource, duration: f64) -> Result<Self, EditorError> {
        if !is_video_mime(&source.mime) {
            return Err(EditorError::UnsupportedMediaType(source.mime));
        }
        let clip = Clip::new(source, duration, self.limit)?;
        let mut next = self.clone();
        if next.active.is_none() {
            next.active = Some(clip.id);
        }
        next.clips.push(clip);
        Ok(next)
    }

    /// Switches the active clip. Time, effect and overlays carry over unchanged.
    pub fn set_active_clip(&self, id: ClipId) -> Result<Self, EditorError> {
        if self.clip(id).is_none() {
            return Err(EditorError::UnknownClip(id));
        }
        let mut next = self.clone();
        next.active = Some(id);
        Ok(next)
    }

    pub fn toggle_play(&self) -> Self {
        if self.is_playing { self.pause() } else { self.play() }
    }

    pub fn play(&self) -> Self {
        if !self.has_active_clip() { return self.clone(); }
        Self { is_playing: true, ..self.clone() }
    }

    pub fn pause(&self) -> Self {
        if !self.has_active_clip() { return self.clone(); }
        Self { is_playing: false, ..self.clone() }
    }

    pub fn seek(&self, time: f64) -> Result<Self, EditorError> {
        if !self.has_active_clip() { return Ok(self.clone()); }
        let max = self.max_seek();
        if !(0.0..=max).contains(&time) {
            return Err(EditorError::SeekOutOfRange { time, max });
        }
        Ok(Self { current_time: time, ..self.clone() })
    }

    /// Clamps `time` into the seekable range before seeking.
    pub fn seek_clamped(&self, time: f64) -> Self {
        let t = if time.is_nan() { 0.0 } else { time.clamp(0.0, self.max_seek()) };
        self.seek(t).unwrap_or_else(|_| self.clone())
    }

    pub fn toggle_mute(&self) -> Self {
        if !self.has_active_clip() { return self.clone(); }
        Self { is_muted: !self.is_muted, ..self.clone() }
    }

    pub fn reset(&self) -> Self {
        if !self.has_active_clip() { return self.clone(); }
        Self { current_time: 0.0, is_playing: false, ..self.clone() }
    }

    pub fn set_effect(&self, effect: EffectToken) -> Result<Self, EditorError> {
        if !self.has_active_clip() { return Ok(self.clone()); }
        if self.is_processing() { return Err(EditorError::Busy); }
        Ok(Self { effect, ..self.clone() })
    }

    pub fn add_text_overlay(&self) -> Result<Self, EditorError> {
        if !self.has_active_clip() { return Ok(self.clone()); }
        if self.is_processing() { return Err(EditorError::Busy); }
        let mut next = self.clone();
        next.overlays.push(TextOverlay::placeholder());
        Ok(next)
    }

    /// Enters the processing state. Without an active clip this is a no-op.
    pub fn begin_processing(&self, job: ProcessingJob) -> Result<Self, EditorError> {
        if !self.has_active_clip() { return Ok(self.clone()); }
        if self.is_processing() { return Err(EditorError::Busy); }
        Ok(Self { processing: Some(job), ..self.clone() })
    }

    fn owns_job(&self, job_id: &str, kind: JobKind) -> Option<&ProcessingJob> {
        self.processing.as_ref().filter(|p| p.job_id == job_id && p.kind == kind)
    }

    pub fn complete_auto_edit(&self, job_id: &str) -> Self {
        let Some(job) = self.owns_job(job_id, JobKind::AutoEdit) else {
            debug!(job = %job_id, "ignoring completion for a job that is not in flight");
            return self.clone();
        };
        let target = job.target;
        let mut next = self.clone();
        next.processing = None;
        if !next.has_active_clip() { return next; }
        let limit = next.limit;
        if let Some(clip) = next.clips.iter_mut().find(|c| c.id == target) {
            *clip = clip.clamp_to(limit);
        }
        next.effect = EffectToken::new(ENHANCE_PRESET);
        next.overlays = vec![TextOverlay::ai_caption()];
        next
    }

    pub fn complete_export(&self, job_id: &str) -> Self {
        if self.owns_job(job_id, JobKind::Export).is_none() {
            debug!(job = %job_id, "ignoring completion for a job that is not in flight");
            return self.clone();
        }
        Self { processing: None, notice: Some(EXPORT_NOTICE.to_string()), ..self.clone() }
    }

    /// Leaves processing without applying the job's mutation.
    pub fn cancel_processing(&self, job_id: &str) -> Self {
        match &self.processing {
            Some(p) if p.job_id == job_id => Self { processing: None, ..self.clone() },
            _ => self.clone(),
        }
    }

    pub fn dismiss_notice(&self) -> Self { Self { notice: None, ..self.clone() } }

    pub fn on_time_update(&self, time: f64) -> Self {
        if !time.is_finite() { return self.clone(); }
        Self { current_time: time.max(0.0), ..self.clone() }
    }

    pub fn on_metadata_loaded(&self, duration: f64) -> Self {
        if !duration.is_finite() || duration < 0.0 { return self.clone(); }
        Self { duration, ..self.clone() }
    }

    pub fn on_ended(&self) -> Self { Self { is_playing: false, ..self.clone() } }
}
