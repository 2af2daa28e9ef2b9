//! The viewport-driven slide lifecycle manager.
//!
//! A [`Feed`] owns the session (original and active order, active index,
//! play mode), the mounted slide window, the visibility tracker, the
//! playback controller and the index annotator. It drives a [`Host`] that
//! does the actual rendering and decoding, and reacts to the host's
//! [`HostEvent`]s.
//!
//! Everything runs on one thread inside a `tokio::task::LocalSet`.

mod annotation;
pub mod error;
pub mod host;
mod lock;
mod navigation;
pub mod order;
mod playback;
pub mod shuffle;
mod slide;
pub mod source;
mod tasks;
mod visibility;
mod window;

#[cfg(test)]
pub(crate) mod testing;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use annotation::IndexAnnotator;
use lock::TryLock;
use playback::PlaybackController;
use slide::Slide;
use visibility::VisibilityTracker;
use window::SlideWindow;

pub use error::{FetchError, LoadError, NavigationError, PlayRejected};
pub use host::{
    Controls, Host, HostEvent, Intersection, MediaElement, MediaFactory, Preload, SlideId,
    Surface, Viewport,
};
pub use order::{Duplicate, OriginalOrder, PlayMode, VideoRef};
pub use playback::PlayOutcome;
pub use slide::{AnnotationPhase, SlideStatus};
pub use source::{FileSource, HttpSource, InlineSource, ListSource, source_for};
pub use window::{RenderWindow, WindowChange};

/// Tunables of a feed. Defaults match the stock page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOptions {
    /// Slides kept mounted on each side of the active one.
    pub render_buffer: usize,
    /// Mounted neighbours switched to eager preload.
    pub preload_ahead: usize,
    /// Fraction of a slide that must be visible for it to become current.
    pub visibility_threshold: f32,
    pub annotation_visible: Duration,
    pub annotation_fade: Duration,
    /// Layout settle time before the rebuild guard is released.
    pub rebuild_settle: Duration,
    /// Time the jump guard is held after scrolling to the target.
    pub jump_settle: Duration,
    pub start_mode: PlayMode,
    /// Fixed shuffle seed for reproducible random order.
    pub seed: Option<u64>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            render_buffer: 2,
            preload_ahead: 1,
            visibility_threshold: 0.8,
            annotation_visible: Duration::from_millis(2500),
            annotation_fade: Duration::from_millis(500),
            rebuild_settle: Duration::from_millis(50),
            jump_settle: Duration::from_millis(600),
            start_mode: PlayMode::Random,
            seed: None,
        }
    }
}

/// Lifecycle of the feed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    Ready,
    /// Loading failed. Terminal.
    Failed,
}

/// The orderings and the current position.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) original: OriginalOrder,
    pub(crate) active: Vec<VideoRef>,
    pub(crate) mode: PlayMode,
    pub(crate) active_index: usize,
}

/// Point-in-time summary for status displays.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStatus {
    pub state: FeedState,
    pub mode: PlayMode,
    pub len: usize,
    pub active_index: usize,
    /// Original line of the current slide.
    pub current_line: Option<usize>,
    pub playing_line: Option<usize>,
    pub mounted: Vec<usize>,
    pub rebuilding: bool,
    pub jumping: bool,
    pub dropped_rebuilds: u64,
}

pub(crate) struct FeedCore {
    host: Rc<dyn Host>,
    options: FeedOptions,
    session: RefCell<Session>,
    rng: RefCell<StdRng>,
    window: SlideWindow,
    tracker: VisibilityTracker,
    playback: PlaybackController,
    annotator: IndexAnnotator,
    /// Held while a jump or mode toggle runs. Suppresses visibility
    /// handling and slide taps.
    jump_lock: TryLock,
    state: Cell<FeedState>,
}

/// Handle to one feed. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Feed {
    core: Rc<FeedCore>,
}

impl Feed {
    pub fn new(host: Rc<dyn Host>, options: FeedOptions) -> Self {
        let tracker = VisibilityTracker::new(options.visibility_threshold);
        host.configure_observer(tracker.threshold());
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let session = Session {
            mode: options.start_mode,
            ..Session::default()
        };
        let core = FeedCore {
            window: SlideWindow::new(options.render_buffer, options.rebuild_settle),
            tracker,
            playback: PlaybackController::default(),
            annotator: IndexAnnotator::new(options.annotation_visible, options.annotation_fade),
            jump_lock: TryLock::default(),
            session: RefCell::new(session),
            rng: RefCell::new(rng),
            state: Cell::new(FeedState::Idle),
            host,
            options,
        };
        Self {
            core: Rc::new(core),
        }
    }

    /// Fetch and parse the list, build the active order and mount the
    /// initial window. On failure the feed is replaced by an error message,
    /// controls are disabled and the feed stays unusable.
    pub async fn load(&self, source: &dyn ListSource) -> Result<usize, LoadError> {
        info!("Loading video list from {}", source.describe());
        match self.try_load(source).await {
            Ok(len) => Ok(len),
            Err(err) => {
                error!("Error loading videos: {err}");
                let core = &self.core;
                core.state.set(FeedState::Failed);
                core.host.show_fatal_error(&format!(
                    "Failed to load videos: {err}. Check the list file and network connection."
                ));
                core.host.update_controls(&Controls {
                    enabled: false,
                    mode: self.mode(),
                    max_line: 0,
                });
                Err(err)
            }
        }
    }

    async fn try_load(&self, source: &dyn ListSource) -> Result<usize, LoadError> {
        let text = source.fetch().await?;
        let original = OriginalOrder::parse(&text);
        if original.is_empty() {
            return Err(LoadError::Empty);
        }

        let core = &self.core;
        // Reloading starts from a clean slate.
        self.teardown_window();
        core.playback.reset();
        core.annotator.reset();

        let len = original.len();
        {
            let mut session = core.session.borrow_mut();
            let active = arrange(&original, session.mode, &mut core.rng.borrow_mut());
            session.original = original;
            session.active = active;
            session.active_index = 0;
        }
        core.state.set(FeedState::Ready);
        info!("Loaded {len} videos in {} order", self.mode());

        core.host.update_controls(&self.controls());
        self.rebuild_awaited().await;
        self.preload_neighbors(0);
        Ok(len)
    }

    /// Route one host notification.
    pub fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Intersections(batch) => self.handle_intersections(&batch),
            HostEvent::MediaReady(slide) => self.handle_media_ready(slide),
            HostEvent::MediaError(slide) => self.handle_media_error(slide),
            HostEvent::Tap(slide) => self.handle_tap(slide),
        }
    }

    pub fn handle_media_ready(&self, slide: SlideId) {
        if let Some(slide) = self.core.window.find(slide) {
            slide.mark_ready(self.core.host.as_ref());
        }
    }

    pub fn handle_media_error(&self, slide: SlideId) {
        let Some(slide) = self.core.window.find(slide) else {
            debug!("Media error for unmounted {slide}");
            return;
        };
        self.core.playback.pause(&slide);
        self.core.annotator.clear(self.core.host.as_ref(), &slide);
        slide.mark_load_failed(self.core.host.as_ref());
    }

    pub(crate) async fn play_slide(&self, slide: &Rc<Slide>) -> PlayOutcome {
        let core = &self.core;
        core.playback.play(&core.host, &core.annotator, slide).await
    }

    /// Play whatever is mounted at `index` of the active order.
    pub async fn play_index(&self, index: usize) -> Option<PlayOutcome> {
        let slide = self.core.window.at(index)?;
        Some(self.play_slide(&slide).await)
    }

    pub fn state(&self) -> FeedState {
        self.core.state.get()
    }

    pub fn mode(&self) -> PlayMode {
        self.core.session.borrow().mode
    }

    pub fn len(&self) -> usize {
        self.core.session.borrow().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_index(&self) -> usize {
        self.core.session.borrow().active_index
    }

    /// The active order, for display.
    pub fn active_order(&self) -> Vec<VideoRef> {
        self.core.session.borrow().active.clone()
    }

    pub fn original_order(&self) -> OriginalOrder {
        self.core.session.borrow().original.clone()
    }

    pub fn mounted_indices(&self) -> Vec<usize> {
        self.core.window.indices()
    }

    pub fn slide_id_at(&self, index: usize) -> Option<SlideId> {
        self.core.window.at(index).map(|slide| slide.id())
    }

    /// Active index of a mounted slide.
    pub fn index_of(&self, slide: SlideId) -> Option<usize> {
        self.core.window.find(slide).map(|slide| slide.active_index())
    }

    /// The video recorded as playing.
    pub fn playing(&self) -> Option<VideoRef> {
        self.core
            .playback
            .playing()
            .map(|slide| slide.video().clone())
    }

    pub fn is_rebuilding(&self) -> bool {
        self.core.window.is_rebuilding()
    }

    pub fn is_jumping(&self) -> bool {
        self.core.jump_lock.is_locked()
    }

    pub fn controls(&self) -> Controls {
        Controls {
            enabled: self.state() == FeedState::Ready,
            mode: self.mode(),
            max_line: self.core.session.borrow().original.len(),
        }
    }

    pub fn status(&self) -> FeedStatus {
        let session = self.core.session.borrow();
        FeedStatus {
            state: self.state(),
            mode: session.mode,
            len: session.active.len(),
            active_index: session.active_index,
            current_line: session.active.get(session.active_index).map(VideoRef::line),
            playing_line: self.playing().map(|video| video.line()),
            mounted: self.mounted_indices(),
            rebuilding: self.is_rebuilding(),
            jumping: self.is_jumping(),
            dropped_rebuilds: self.core.window.dropped_rebuilds(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_active_index(&self, index: usize) {
        self.core.session.borrow_mut().active_index = index;
    }
}

/// Shuffled copy in random mode, identity copy in sequential mode.
fn arrange(original: &OriginalOrder, mode: PlayMode, rng: &mut StdRng) -> Vec<VideoRef> {
    match mode {
        PlayMode::Random => shuffle::shuffled(original.videos(), rng),
        PlayMode::Sequential => original.videos().to_vec(),
    }
}
