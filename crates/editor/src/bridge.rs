//! Adapter between [`EditorState`] and a native playback surface.

use crossbeam_channel::Receiver;
use timeline::{ClipId, MediaSource};
use tracing::debug;

use crate::EditorState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    TimeUpdate(f64),
    MetadataLoaded { duration: f64 },
    Ended,
}

/// A native media-playback element.
///
/// Events go to the receiver returned by the most recent [`subscribe`](MediaSurface::subscribe);
/// earlier receivers stop getting anything.
pub trait MediaSurface {
    fn subscribe(&mut self) -> Receiver<SurfaceEvent>;
    /// `duration_hint` is the probed duration; surfaces that decode may ignore it.
    fn load(&mut self, source: &MediaSource, duration_hint: f64);
    fn unload(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, time: f64);
    fn set_muted(&mut self, muted: bool);
    /// Lets surfaces without their own event loop emit progress.
    fn tick(&mut self) {}
}

/// Event feed for one loaded source. Dropping it releases the subscription.
pub struct EventSubscription {
    clip: ClipId,
    rx: Receiver<SurfaceEvent>,
}

impl EventSubscription {
    pub fn clip(&self) -> ClipId { self.clip }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Transport {
    playing: bool,
    muted: bool,
}

pub struct PlaybackBridge<S: MediaSurface> {
    surface: S,
    subscription: Option<EventSubscription>,
    pushed: Transport,
}

impl<S: MediaSurface> PlaybackBridge<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, subscription: None, pushed: Transport::default() }
    }

    pub fn surface(&self) -> &S { &self.surface }

    pub fn surface_mut(&mut self) -> &mut S { &mut self.surface }

    pub fn bound_clip(&self) -> Option<ClipId> { self.subscription.as_ref().map(|s| s.clip) }

    /// Pushes playback intent to the surface, issuing calls only for what changed.
    pub fn sync(&mut self, state: &EditorState) {
        if self.bound_clip() != state.active {
            self.rebind(state);
        }
        if self.subscription.is_none() { return; }
        let want = Transport { playing: state.is_playing, muted: state.is_muted };
        if want.muted != self.pushed.muted {
            self.surface.set_muted(want.muted);
        }
        if want.playing != self.pushed.playing {
            if want.playing { self.surface.play() } else { self.surface.pause() }
        }
        self.pushed = want;
    }

    fn rebind(&mut self, state: &EditorState) {
        self.release();
        let Some(clip) = state.active_clip() else { return; };
        debug!(clip = %clip.id, "binding playback surface");
        let rx = self.surface.subscribe();
        self.surface.load(&clip.source, clip.duration);
        self.subscription = Some(EventSubscription { clip: clip.id, rx });
        // time carries over between clips
        if state.current_time > 0.0 {
            self.surface.seek_to(state.current_time);
        }
    }

    pub fn seek_to(&mut self, time: f64) {
        if self.subscription.is_some() {
            self.surface.seek_to(time);
        }
    }

    /// Applies pending surface events in the order the surface emitted them.
    pub fn drain(&mut self, state: &EditorState) -> EditorState {
        self.surface.tick();
        let Some(sub) = &self.subscription else { return state.clone(); };
        sub.rx.try_iter().fold(state.clone(), |acc, ev| match ev {
            SurfaceEvent::TimeUpdate(t) => acc.on_time_update(t),
            SurfaceEvent::MetadataLoaded { duration } => acc.on_metadata_loaded(duration),
            SurfaceEvent::Ended => acc.on_ended(),
        })
    }

    /// Drops the event subscription and unloads the surface.
    pub fn release(&mut self) {
        if let Some(old) = self.subscription.take() {
            debug!(clip = %old.clip, "releasing playback surface");
            drop(old);
            self.surface.unload();
        }
        self.pushed = Transport::default();
    }
}

impl<S: MediaSurface> Drop for PlaybackBridge<S> {
    fn drop(&mut self) { self.release(); }
}
