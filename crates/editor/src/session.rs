use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use jobs::{JobKind, JobSpec, JobStatus, JobsHandle, JobsRuntime};
use media_io::{is_video_mime, mime_for_path, FfprobeProbe, MediaError, MediaInfo, MediaProbe};
use timeline::{ClipId, EffectToken, MediaSource, MAX_CLIP_SECONDS};
use tracing::{debug, info, warn};

use crate::bridge::{MediaSurface, PlaybackBridge};
use crate::state::{EditorState, ProcessingJob};
use crate::{EditorConfig, EditorError};

struct ProbeResult {
    path: PathBuf,
    mime: String,
    result: Result<MediaInfo, MediaError>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UploadReport {
    /// Video files handed to the prober.
    pub queued: Vec<PathBuf>,
    /// Everything else. Dropped without touching the state.
    pub ignored: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Completed(JobKind),
    Cancelled(JobKind),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PollReport {
    pub added: Vec<ClipId>,
    /// Files whose duration could not be resolved.
    pub unresolved: Vec<PathBuf>,
    pub finished: Vec<ProcessingOutcome>,
}

impl PollReport {
    fn merge(&mut self, other: PollReport) {
        self.added.extend(other.added);
        self.unresolved.extend(other.unresolved);
        self.finished.extend(other.finished);
    }
}

/// One editing session: state, playback surface, background jobs and pending probes.
pub struct Session<S: MediaSurface> {
    state: EditorState,
    bridge: PlaybackBridge<S>,
    jobs: JobsHandle,
    probe: Arc<dyn MediaProbe>,
    probe_tx: Sender<ProbeResult>,
    probe_rx: Receiver<ProbeResult>,
    pending_probes: usize,
    delay: Duration,
    closed: bool,
}

impl<S: MediaSurface> Session<S> {
    pub fn new(config: &EditorConfig, surface: S, probe: Arc<dyn MediaProbe>) -> Self {
        let (probe_tx, probe_rx) = unbounded();
        let limit = match config.validate() {
            Ok(()) => config.max_clip_seconds,
            Err(e) => {
                warn!("{e}; using the {MAX_CLIP_SECONDS}s clip limit");
                MAX_CLIP_SECONDS
            }
        };
        Self {
            state: EditorState::new(limit),
            bridge: PlaybackBridge::new(surface),
            jobs: JobsRuntime::start(config.job_workers),
            probe,
            probe_tx,
            probe_rx,
            pending_probes: 0,
            delay: config.processing_delay(),
            closed: false,
        }
    }

    /// Probes with the ffprobe binary named in `config`, or the one on `PATH`.
    pub fn with_ffprobe(config: &EditorConfig, surface: S) -> Result<Self, MediaError> {
        let probe = FfprobeProbe::locate(config.ffprobe.as_deref())?;
        Ok(Self::new(config, surface, Arc::new(probe)))
    }

    pub fn state(&self) -> &EditorState { &self.state }

    pub fn bridge(&self) -> &PlaybackBridge<S> { &self.bridge }

    pub fn pending_probes(&self) -> usize { self.pending_probes }

    pub fn is_closed(&self) -> bool { self.closed }

    fn commit(&mut self, next: EditorState) {
        self.state = next;
        // a closed session never rebinds the surface
        if !self.closed {
            self.bridge.sync(&self.state);
        }
    }

    fn ensure_open(&self) -> Result<(), EditorError> {
        if self.closed { Err(EditorError::Closed) } else { Ok(()) }
    }

    /// Queues every video file for probing. Clips appear on a later [`poll`](Self::poll).
    pub fn upload(&mut self, paths: &[PathBuf]) -> Result<UploadReport, EditorError> {
        self.ensure_open()?;
        let mut report = UploadReport::default();
        for path in paths {
            let mime = match mime_for_path(path) {
                Some(m) if is_video_mime(m) => m.to_string(),
                other => {
                    debug!(path = %path.display(), mime = ?other, "ignoring non-video upload");
                    report.ignored.push(path.clone());
                    continue;
                }
            };
            let probe = self.probe.clone();
            let tx = self.probe_tx.clone();
            let path = path.clone();
            report.queued.push(path.clone());
            self.pending_probes += 1;
            thread::spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| probe.probe(&path))).unwrap_or_else(|_| {
                    Err(MediaError::ProbeFailed { path: path.display().to_string(), reason: "prober panicked".into() })
                });
                let _ = tx.send(ProbeResult { path, mime, result });
            });
        }
        Ok(report)
    }

    pub fn select(&mut self, id: ClipId) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.set_active_clip(id)?;
        self.commit(next);
        // pick up the new clip's metadata before the next transport call
        let next = self.bridge.drain(&self.state);
        self.commit(next);
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.toggle_play();
        self.commit(next);
        Ok(())
    }

    pub fn seek(&mut self, time: f64) -> Result<(), EditorError> {
        self.ensure_open()?;
        if !self.state.has_active_clip() { return Ok(()); }
        let next = self.state.seek(time)?;
        self.commit(next);
        self.bridge.seek_to(time);
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.toggle_mute();
        self.commit(next);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), EditorError> {
        self.ensure_open()?;
        if !self.state.has_active_clip() { return Ok(()); }
        let next = self.state.reset();
        self.commit(next);
        self.bridge.seek_to(0.0);
        Ok(())
    }

    pub fn set_effect(&mut self, effect: EffectToken) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.set_effect(effect)?;
        self.commit(next);
        Ok(())
    }

    pub fn add_text_overlay(&mut self) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.add_text_overlay()?;
        self.commit(next);
        Ok(())
    }

    /// Returns whether a job was scheduled. Nothing is scheduled without an active
    /// clip or while another operation is processing.
    pub fn auto_edit(&mut self) -> Result<bool, EditorError> { self.schedule(JobKind::AutoEdit) }

    pub fn export(&mut self) -> Result<bool, EditorError> { self.schedule(JobKind::Export) }

    fn schedule(&mut self, kind: JobKind) -> Result<bool, EditorError> {
        self.ensure_open()?;
        if !self.state.can_start_processing() {
            debug!(?kind, processing = self.state.is_processing(), "not scheduling");
            return Ok(false);
        }
        let Some(target) = self.state.active else { return Ok(false); };
        let job_id = self.jobs.enqueue(JobSpec { target: target.to_string(), kind, delay: self.delay })?;
        info!(job = %job_id, ?kind, clip = %target, "scheduled");
        let next = self.state.begin_processing(ProcessingJob { kind, job_id, target })?;
        self.commit(next);
        Ok(true)
    }

    pub fn dismiss_notice(&mut self) -> Result<(), EditorError> {
        self.ensure_open()?;
        let next = self.state.dismiss_notice();
        self.commit(next);
        Ok(())
    }

    /// Applies finished probes, job results and playback events.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();
        if self.closed { return report; }

        while let Ok(ProbeResult { path, mime, result }) = self.probe_rx.try_recv() {
            self.pending_probes = self.pending_probes.saturating_sub(1);
            let duration = match result {
                Ok(MediaInfo { duration_seconds: Some(d), .. }) => d,
                Ok(_) => {
                    warn!(path = %path.display(), "duration unresolved");
                    report.unresolved.push(path);
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), "probe failed: {e}");
                    report.unresolved.push(path);
                    continue;
                }
            };
            match self.state.add_clip(MediaSource::new(path.clone(), mime), duration) {
                Ok(next) => {
                    if let Some(clip) = next.clips.last() { report.added.push(clip.id); }
                    self.commit(next);
                }
                Err(e) => {
                    warn!(path = %path.display(), "dropping upload: {e}");
                    report.unresolved.push(path);
                }
            }
        }

        while let Ok(ev) = self.jobs.rx_events.try_recv() {
            if !ev.status.is_terminal() { continue; }
            let in_flight = self.state.processing.as_ref().is_some_and(|p| p.job_id == ev.id);
            if !in_flight {
                debug!(job = %ev.id, "event for a job that is not in flight");
                continue;
            }
            let next = match ev.status {
                JobStatus::Done => {
                    report.finished.push(ProcessingOutcome::Completed(ev.kind));
                    match ev.kind {
                        JobKind::AutoEdit => self.state.complete_auto_edit(&ev.id),
                        JobKind::Export => self.state.complete_export(&ev.id),
                    }
                }
                _ => {
                    report.finished.push(ProcessingOutcome::Cancelled(ev.kind));
                    self.state.cancel_processing(&ev.id)
                }
            };
            self.commit(next);
        }

        let next = self.bridge.drain(&self.state);
        self.commit(next);
        report
    }

    /// Polls until no probes or jobs are outstanding, or `timeout` elapses.
    pub fn run_until_idle(&mut self, timeout: Duration) -> PollReport {
        let deadline = Instant::now() + timeout;
        let mut report = self.poll();
        while (self.pending_probes > 0 || self.state.is_processing()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            report.merge(self.poll());
        }
        report
    }

    /// Ends the session. An in-flight job is cancelled and never applied.
    pub fn close(&mut self) -> Option<ProcessingOutcome> {
        if self.closed { return None; }
        self.closed = true;
        let outcome = self.state.processing.clone().map(|job| {
            self.jobs.cancel_job(&job.job_id);
            self.state = self.state.cancel_processing(&job.job_id);
            ProcessingOutcome::Cancelled(job.kind)
        });
        self.bridge.release();
        info!(?outcome, "session closed");
        outcome
    }
}

impl<S: MediaSurface> Drop for Session<S> {
    fn drop(&mut self) { self.close(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::{Call, FakeSurface};
    use media_io::MediaKind;
    use std::collections::HashMap;
    use std::path::Path;

    struct TableProbe(HashMap<PathBuf, f64>);

    impl MediaProbe for TableProbe {
        fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
            let d = self.0.get(path).copied();
            Ok(MediaInfo {
                kind: MediaKind::Video,
                mime: "video/mp4".into(),
                duration_seconds: d,
                width: None,
                height: None,
                fps_num: None,
                fps_den: None,
                audio_channels: None,
                sample_rate: None,
            })
        }
    }

    fn session(delay_ms: u64, table: &[(&str, f64)]) -> Session<FakeSurface> {
        let cfg = EditorConfig { processing_delay_ms: delay_ms, ..Default::default() };
        let probe = TableProbe(table.iter().map(|(p, d)| (PathBuf::from(p), *d)).collect());
        Session::new(&cfg, FakeSurface::default(), Arc::new(probe))
    }

    #[test]
    fn upload_filters_and_probes() {
        let mut s = session(0, &[("a.mp4", 90.0)]);
        let report = s.upload(&["a.mp4".into(), "b.png".into(), "c".into(), "d.mov".into()]).unwrap();
        assert_eq!(report.ignored, vec![PathBuf::from("b.png"), PathBuf::from("c")]);
        let polled = s.run_until_idle(Duration::from_secs(5));
        assert_eq!(polled.added.len(), 1);
        assert_eq!(polled.unresolved, vec![PathBuf::from("d.mov")]);
        let clip = s.state().active_clip().unwrap();
        assert_eq!(clip.trim.end, 60.0);
        assert_eq!(s.state().duration, 90.0);
        assert_eq!(s.bridge().surface().calls.first(), Some(&Call::Load("a.mp4".into())));
    }

    #[test]
    fn close_cancels_in_flight_job() {
        let mut s = session(5_000, &[("a.mp4", 90.0)]);
        s.upload(&["a.mp4".into()]).unwrap();
        s.run_until_idle(Duration::from_secs(5));
        assert!(s.auto_edit().unwrap());
        assert_eq!(s.close(), Some(ProcessingOutcome::Cancelled(JobKind::AutoEdit)));
        assert!(!s.state().is_processing());
        assert!(s.state().overlays.is_empty());
        assert_eq!(s.auto_edit(), Err(EditorError::Closed));
        assert_eq!(s.bridge().bound_clip(), None);
    }

    #[test]
    fn seek_outside_range_is_rejected() {
        let mut s = session(0, &[("a.mp4", 30.0)]);
        s.upload(&["a.mp4".into()]).unwrap();
        s.run_until_idle(Duration::from_secs(5));
        assert!(matches!(s.seek(31.0), Err(EditorError::SeekOutOfRange { .. })));
        s.seek(10.0).unwrap();
        assert_eq!(s.state().current_time, 10.0);
        assert_eq!(s.bridge().surface().calls.last(), Some(&Call::Seek(10.0)));
    }

    #[test]
    fn closed_session_leaves_the_surface_unbound() {
        let mut s = session(0, &[("a.mp4", 30.0)]);
        s.upload(&["a.mp4".into()]).unwrap();
        s.run_until_idle(Duration::from_secs(5));
        assert!(s.bridge().bound_clip().is_some());
        s.close();
        let calls = s.bridge().surface().calls.len();
        assert_eq!(s.dismiss_notice(), Err(EditorError::Closed));
        assert_eq!(s.bridge().bound_clip(), None);
        assert_eq!(s.bridge().surface().calls.len(), calls);
        assert_eq!(s.bridge().surface().calls.last(), Some(&Call::Unload));
    }

    #[test]
    fn select_applies_the_new_duration_at_once() {
        let mut s = session(0, &[("short.mp4", 30.0), ("long.mp4", 90.0)]);
        s.upload(&["short.mp4".into(), "long.mp4".into()]).unwrap();
        s.run_until_idle(Duration::from_secs(5));
        let long = s.state().clips.iter().find(|c| c.duration == 90.0).map(|c| c.id).unwrap();
        if s.state().active == Some(long) {
            let short = s.state().clips.iter().find(|c| c.id != long).map(|c| c.id).unwrap();
            s.select(short).unwrap();
            s.poll();
        }
        assert_eq!(s.state().duration, 30.0);
        s.select(long).unwrap();
        assert_eq!(s.state().duration, 90.0);
        s.seek(45.0).unwrap();
        assert_eq!(s.state().current_time, 45.0);
    }

    struct PanickingProbe;

    impl MediaProbe for PanickingProbe {
        fn probe(&self, _path: &Path) -> Result<MediaInfo, MediaError> {
            panic!("decoder blew up");
        }
    }

    #[test]
    fn panicking_prober_does_not_wedge_the_session() {
        let mut s = Session::new(&EditorConfig::default(), FakeSurface::default(), Arc::new(PanickingProbe));
        s.upload(&["boom.mp4".into()]).unwrap();
        let started = Instant::now();
        let report = s.run_until_idle(Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(report.unresolved, vec![PathBuf::from("boom.mp4")]);
        assert_eq!(s.pending_probes(), 0);
        assert!(s.state().clips.is_empty());
    }

    #[test]
    fn invalid_clip_limit_falls_back_to_default() {
        let cfg = EditorConfig { max_clip_seconds: 0.0, processing_delay_ms: 0, ..Default::default() };
        let probe = TableProbe([(PathBuf::from("a.mp4"), 30.0)].into_iter().collect());
        let mut s = Session::new(&cfg, FakeSurface::default(), Arc::new(probe));
        s.upload(&["a.mp4".into()]).unwrap();
        let report = s.run_until_idle(Duration::from_secs(5));
        assert_eq!(report.added.len(), 1);
        assert_eq!(s.state().limit, MAX_CLIP_SECONDS);
    }

    #[test]
    fn less_common_video_containers_are_queued() {
        let mut s = session(0, &[("a.wmv", 20.0), ("c.flv", 25.0)]);
        let report = s.upload(&["a.wmv".into(), "c.flv".into(), "notes.txt".into()]).unwrap();
        assert_eq!(report.queued, vec![PathBuf::from("a.wmv"), PathBuf::from("c.flv")]);
        assert_eq!(report.ignored, vec![PathBuf::from("notes.txt")]);
        let polled = s.run_until_idle(Duration::from_secs(5));
        assert_eq!(polled.added.len(), 2);
    }
}
