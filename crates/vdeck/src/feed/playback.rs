use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info, warn};

use super::annotation::IndexAnnotator;
use super::host::{Host, SlideId};
use super::slide::Slide;

/// Result of a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// Autoplay was refused with sound; playing muted instead.
    StartedMuted,
    /// The media was already running; only the annotation was refreshed.
    AlreadyPlaying,
    /// Another request won while this one was pending. Result discarded.
    Superseded,
    Failed,
}

/// Keeps at most one media element playing.
#[derive(Default)]
pub(crate) struct PlaybackController {
    playing: RefCell<Weak<Slide>>,
    requested: Cell<Option<SlideId>>,
}

impl PlaybackController {
    /// The slide whose video is recorded as playing, if it is still mounted.
    pub(crate) fn playing(&self) -> Option<Rc<Slide>> {
        self.playing
            .borrow()
            .upgrade()
            .filter(|slide| slide.is_attached())
    }

    pub(crate) async fn play(
        &self,
        host: &Rc<dyn Host>,
        annotator: &IndexAnnotator,
        slide: &Rc<Slide>,
    ) -> PlayOutcome {
        self.requested.set(Some(slide.id()));
        self.pause_previous(host.as_ref(), annotator, slide);

        let media = slide.media();
        if !media.is_paused() {
            self.record(slide);
            annotator.show(host, slide);
            return PlayOutcome::AlreadyPlaying;
        }

        debug!("Attempting to play line {}", slide.line());
        let attempt = match media.play().await {
            Ok(()) => Ok(PlayOutcome::Started),
            Err(rejected) if !media.is_muted() => {
                warn!("Autoplay failed for line {}: {rejected}", slide.line());
                media.set_muted(true);
                media.play().await.map(|()| PlayOutcome::StartedMuted)
            }
            Err(rejected) => Err(rejected),
        };

        if self.requested.get() != Some(slide.id()) || !slide.is_attached() {
            debug!("Discarding superseded play of line {}", slide.line());
            media.pause();
            return PlayOutcome::Superseded;
        }

        match attempt {
            Ok(outcome) => {
                // Another slide may have started while this one was pending.
                self.pause_previous(host.as_ref(), annotator, slide);
                self.record(slide);
                slide.mark_playing(host.as_ref());
                annotator.show(host, slide);
                info!("Playing line {} ({:?})", slide.line(), outcome);
                outcome
            }
            Err(rejected) => {
                warn!("Playback failed for line {}: {rejected}", slide.line());
                self.requested.set(None);
                slide.mark_playback_failed(host.as_ref());
                PlayOutcome::Failed
            }
        }
    }

    pub(crate) fn pause(&self, slide: &Slide) {
        if !slide.media().is_paused() {
            debug!("Pausing line {}", slide.line());
            slide.media().pause();
        }
        if self.is_recorded(slide.id()) {
            self.playing.replace(Weak::new());
        }
        if self.requested.get() == Some(slide.id()) {
            self.requested.set(None);
        }
    }

    /// Forget the playing video without touching any media.
    pub(crate) fn reset(&self) {
        self.playing.replace(Weak::new());
        self.requested.set(None);
    }

    fn pause_previous(&self, host: &dyn Host, annotator: &IndexAnnotator, next: &Slide) {
        let Some(previous) = self.playing() else {
            return;
        };
        if previous.id() == next.id() {
            return;
        }
        if !previous.media().is_paused() {
            debug!("Pausing previous line {}", previous.line());
            previous.media().pause();
            annotator.clear(host, &previous);
        }
        self.playing.replace(Weak::new());
    }

    fn record(&self, slide: &Rc<Slide>) {
        self.playing.replace(Rc::downgrade(slide));
    }

    fn is_recorded(&self, id: SlideId) -> bool {
        self.playing
            .borrow()
            .upgrade()
            .is_some_and(|slide| slide.id() == id)
    }
}
