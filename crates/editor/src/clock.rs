use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use timeline::MediaSource;

use crate::bridge::{MediaSurface, SurfaceEvent};

/// Wall-clock playhead. Position advances only while playing.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    pub playing: bool,
    anchor_sec: f64,
    anchor_t: Instant,
}

impl Default for PlaybackClock {
    fn default() -> Self { Self { playing: false, anchor_sec: 0.0, anchor_t: Instant::now() } }
}

impl PlaybackClock {
    pub fn play(&mut self, at_sec: f64, now: Instant) {
        self.anchor_sec = at_sec;
        self.anchor_t = now;
        self.playing = true;
    }

    pub fn pause(&mut self, at_sec: f64) {
        self.anchor_sec = at_sec;
        self.playing = false;
    }

    pub fn seek(&mut self, at_sec: f64, now: Instant) {
        self.anchor_sec = at_sec;
        self.anchor_t = now;
    }

    pub fn now_at(&self, now: Instant) -> f64 {
        if self.playing {
            self.anchor_sec + now.saturating_duration_since(self.anchor_t).as_secs_f64()
        } else {
            self.anchor_sec
        }
    }
}

/// Playback surface that keeps time but decodes nothing.
///
/// Reports `MetadataLoaded` with the probed duration on load, `TimeUpdate` on every
/// tick while playing and after seeks, and `Ended` when the playhead reaches the end.
#[derive(Debug, Default)]
pub struct ClockSurface {
    tx: Option<Sender<SurfaceEvent>>,
    clock: PlaybackClock,
    duration: f64,
    loaded: bool,
    muted: bool,
}

impl ClockSurface {
    pub fn new() -> Self { Self::default() }

    pub fn position(&self) -> f64 { self.clock.now_at(Instant::now()).min(self.duration) }

    pub fn is_muted(&self) -> bool { self.muted }

    pub fn is_loaded(&self) -> bool { self.loaded }

    fn emit(&self, ev: SurfaceEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means the subscription was released
            let _ = tx.send(ev);
        }
    }

    pub fn tick_at(&mut self, now: Instant) {
        if !self.loaded || !self.clock.playing { return; }
        let t = self.clock.now_at(now);
        if t >= self.duration {
            self.clock.pause(self.duration);
            self.emit(SurfaceEvent::TimeUpdate(self.duration));
            self.emit(SurfaceEvent::Ended);
        } else {
            self.emit(SurfaceEvent::TimeUpdate(t));
        }
    }
}

impl MediaSurface for ClockSurface {
    fn subscribe(&mut self) -> Receiver<SurfaceEvent> {
        let (tx, rx) = unbounded();
        self.tx = Some(tx);
        rx
    }

    fn load(&mut self, _source: &MediaSource, duration_hint: f64) {
        self.clock = PlaybackClock::default();
        self.duration = duration_hint.max(0.0);
        self.loaded = true;
        self.emit(SurfaceEvent::MetadataLoaded { duration: self.duration });
    }

    fn unload(&mut self) {
        self.loaded = false;
        self.clock = PlaybackClock::default();
        self.tx = None;
    }

    fn play(&mut self) {
        if !self.loaded { return; }
        let now = Instant::now();
        let mut at = self.clock.now_at(now);
        // playing from the end restarts, like a media element does
        if at >= self.duration { at = 0.0; }
        self.clock.play(at, now);
    }

    fn pause(&mut self) {
        let at = self.clock.now_at(Instant::now()).min(self.duration);
        self.clock.pause(at);
    }

    fn seek_to(&mut self, time: f64) {
        if !self.loaded { return; }
        let t = time.clamp(0.0, self.duration);
        self.clock.seek(t, Instant::now());
        self.emit(SurfaceEvent::TimeUpdate(t));
    }

    fn set_muted(&mut self, muted: bool) { self.muted = muted; }

    fn tick(&mut self) { self.tick_at(Instant::now()); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loaded(duration: f64) -> (ClockSurface, Receiver<SurfaceEvent>) {
        let mut s = ClockSurface::new();
        let rx = s.subscribe();
        s.load(&MediaSource::new("x.mp4", "video/mp4"), duration);
        (s, rx)
    }

    #[test]
    fn clock_advances_only_while_playing() {
        let start = Instant::now();
        let mut c = PlaybackClock::default();
        c.play(2.0, start);
        assert_eq!(c.now_at(start + Duration::from_millis(1500)), 3.5);
        c.pause(3.5);
        assert_eq!(c.now_at(start + Duration::from_secs(10)), 3.5);
    }

    #[test]
    fn load_reports_metadata() {
        let (_s, rx) = loaded(42.0);
        assert_eq!(rx.try_recv(), Ok(SurfaceEvent::MetadataLoaded { duration: 42.0 }));
    }

    #[test]
    fn reaching_the_end_fires_ended_once() {
        let (mut s, rx) = loaded(1.0);
        let _ = rx.try_recv();
        s.play();
        s.tick_at(Instant::now() + Duration::from_secs(5));
        s.tick_at(Instant::now() + Duration::from_secs(6));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![SurfaceEvent::TimeUpdate(1.0), SurfaceEvent::Ended]);
    }

    #[test]
    fn seek_is_clamped_and_reported() {
        let (mut s, rx) = loaded(10.0);
        let _ = rx.try_recv();
        s.seek_to(25.0);
        assert_eq!(rx.try_recv(), Ok(SurfaceEvent::TimeUpdate(10.0)));
        assert_eq!(s.position(), 10.0);
    }

    #[test]
    fn resubscribing_cuts_off_old_receiver() {
        let (mut s, old) = loaded(10.0);
        let _ = old.try_recv();
        let fresh = s.subscribe();
        s.seek_to(1.0);
        assert!(old.try_recv().is_err());
        assert_eq!(fresh.try_recv(), Ok(SurfaceEvent::TimeUpdate(1.0)));
    }
}
