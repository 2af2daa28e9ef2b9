use std::cell::Cell;
use std::rc::Rc;

use log::{debug, error};

use super::host::{Host, MediaElement, Preload, SlideId};
use super::order::VideoRef;

/// Loading sub-state of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideStatus {
    Loading,
    Ready,
    LoadFailed,
    PlaybackFailed,
}

/// Lifecycle of the original-line label on a slide. The serial ties timers
/// to the annotation they were started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationPhase {
    #[default]
    Hidden,
    Visible(u64),
    FadingOut(u64),
}

/// A mounted slide bound to one video and one position of the active order.
pub struct Slide {
    id: SlideId,
    active_index: usize,
    video: VideoRef,
    media: Box<dyn MediaElement>,
    status: Cell<SlideStatus>,
    annotation: Cell<AnnotationPhase>,
    attached: Cell<bool>,
}

impl std::fmt::Debug for Slide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slide")
            .field("id", &self.id)
            .field("active_index", &self.active_index)
            .field("video", &self.video)
            .field("status", &self.status.get())
            .field("annotation", &self.annotation.get())
            .field("attached", &self.attached.get())
            .finish()
    }
}

impl Slide {
    /// Create the node and its media element. The media is configured for
    /// lazy loading, looping and inline playback; nothing plays yet.
    pub(crate) fn build(
        host: &dyn Host,
        id: SlideId,
        video: VideoRef,
        active_index: usize,
    ) -> Rc<Self> {
        let media = host.create_media(id);
        media.set_source(video.url());
        media.set_looping(true);
        media.set_plays_inline(true);
        media.set_preload(Preload::Metadata);
        host.create_slide(id, &video);

        Rc::new(Self {
            id,
            active_index,
            video,
            media,
            status: Cell::new(SlideStatus::Loading),
            annotation: Cell::new(AnnotationPhase::Hidden),
            attached: Cell::new(true),
        })
    }

    pub fn id(&self) -> SlideId {
        self.id
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn video(&self) -> &VideoRef {
        &self.video
    }

    pub fn line(&self) -> usize {
        self.video.line()
    }

    pub fn media(&self) -> &dyn MediaElement {
        self.media.as_ref()
    }

    pub fn status(&self) -> SlideStatus {
        self.status.get()
    }

    pub fn annotation(&self) -> AnnotationPhase {
        self.annotation.get()
    }

    pub(crate) fn set_annotation(&self, phase: AnnotationPhase) {
        self.annotation.set(phase);
    }

    /// False once the slide has left the document.
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn detach(&self) {
        self.attached.set(false);
        self.annotation.set(AnnotationPhase::Hidden);
    }

    /// Media reported it can play. Removes the placeholder exactly once.
    pub(crate) fn mark_ready(&self, host: &dyn Host) {
        if self.status.get() == SlideStatus::Loading {
            self.status.set(SlideStatus::Ready);
            host.remove_loading(self.id);
        }
    }

    /// Terminal load failure. No retry.
    pub(crate) fn mark_load_failed(&self, host: &dyn Host) {
        error!(
            "Video loading error (line {}, URL: {})",
            self.line(),
            self.video.url()
        );
        self.status.set(SlideStatus::LoadFailed);
        host.show_slide_error(
            self.id,
            &format!("Video failed to load (line {})", self.line()),
        );
    }

    pub(crate) fn mark_playback_failed(&self, host: &dyn Host) {
        self.status.set(SlideStatus::PlaybackFailed);
        host.show_slide_error(
            self.id,
            &format!("Playback failed, tap to retry (line {})", self.line()),
        );
    }

    /// A retry succeeded after a playback failure.
    pub(crate) fn mark_playing(&self, host: &dyn Host) {
        if self.status.get() == SlideStatus::PlaybackFailed {
            debug!("Clearing playback error on line {}", self.line());
            self.status.set(SlideStatus::Ready);
            host.clear_slide_error(self.id);
        }
    }
}
