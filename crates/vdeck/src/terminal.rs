//! Terminal rendition of the feed's host.
//!
//! The "viewport" shows one full-height slide at a time. Scrolling moves the
//! centered slide through the mounted document and reports intersection
//! batches the way a browser observer would. Media elements only simulate
//! playback; they honour the configured autoplay policy.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use colored::Colorize;
use futures::future::LocalBoxFuture;
use log::{debug, trace};

use crate::config::AutoplayPolicy;
use crate::feed::{
    Controls, HostEvent, Intersection, MediaElement, MediaFactory, PlayRejected, Preload, SlideId,
    Surface, VideoRef, Viewport,
};

type EventQueue = Rc<RefCell<VecDeque<HostEvent>>>;

#[derive(Debug, Default)]
struct MediaState {
    label: RefCell<String>,
    preload: Cell<Preload>,
    muted: Cell<bool>,
    playing: Cell<bool>,
    broken: Cell<bool>,
}

struct TerminalMedia {
    slide: SlideId,
    state: Rc<MediaState>,
    policy: AutoplayPolicy,
    base: Option<PathBuf>,
    events: EventQueue,
    quiet: bool,
}

impl TerminalMedia {
    fn is_loadable(&self, url: &str) -> bool {
        if url.starts_with("http://") || url.starts_with("https://") {
            return true;
        }
        let path = Path::new(url);
        match &self.base {
            Some(base) if path.is_relative() => base.join(path).exists(),
            _ => path.exists(),
        }
    }
}

impl MediaElement for TerminalMedia {
    fn set_source(&self, url: &str) {
        let loadable = self.is_loadable(url);
        self.state.broken.set(!loadable);
        let event = if loadable {
            HostEvent::MediaReady(self.slide)
        } else {
            HostEvent::MediaError(self.slide)
        };
        self.events.borrow_mut().push_back(event);
    }

    fn set_preload(&self, preload: Preload) {
        trace!("{} preload {:?}", self.slide, preload);
        self.state.preload.set(preload);
    }

    fn preload(&self) -> Preload {
        self.state.preload.get()
    }

    fn set_looping(&self, looping: bool) {
        trace!("{} loop {looping}", self.slide);
    }

    fn set_plays_inline(&self, inline: bool) {
        trace!("{} inline {inline}", self.slide);
    }

    fn set_muted(&self, muted: bool) {
        self.state.muted.set(muted);
    }

    fn is_muted(&self) -> bool {
        self.state.muted.get()
    }

    fn is_paused(&self) -> bool {
        !self.state.playing.get()
    }

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlayRejected>> {
        let state = Rc::clone(&self.state);
        let policy = self.policy;
        Box::pin(async move {
            if state.broken.get() {
                return Err(PlayRejected::new(
                    "NotSupportedError: no supported sources",
                ));
            }
            match policy {
                AutoplayPolicy::Allow => {}
                AutoplayPolicy::Muted if state.muted.get() => {}
                AutoplayPolicy::Muted => {
                    return Err(PlayRejected::new(
                        "NotAllowedError: unmuted autoplay is not allowed",
                    ));
                }
                AutoplayPolicy::Block => {
                    return Err(PlayRejected::new("NotAllowedError: autoplay is blocked"));
                }
            }
            state.playing.set(true);
            Ok(())
        })
    }

    fn pause(&self) {
        if self.state.playing.replace(false) && !self.quiet {
            println!("{} {}", "⏸".dimmed(), self.state.label.borrow().dimmed());
        }
    }
}

/// One rendered slide.
#[derive(Debug)]
struct SlideView {
    line: usize,
    url: String,
    loading: bool,
    error: Option<String>,
    annotation: Option<String>,
}

/// Host that prints to the terminal and simulates a one-slide viewport.
pub struct TerminalHost {
    policy: AutoplayPolicy,
    base: Option<PathBuf>,
    quiet: bool,
    events: EventQueue,
    views: RefCell<HashMap<SlideId, SlideView>>,
    media: RefCell<HashMap<SlideId, Rc<MediaState>>>,
    document: RefCell<Vec<SlideId>>,
    observed: RefCell<BTreeSet<SlideId>>,
    centered: Cell<Option<SlideId>>,
    fatal: RefCell<Option<String>>,
}

impl TerminalHost {
    pub fn new(policy: AutoplayPolicy, base: Option<PathBuf>, quiet: bool) -> Self {
        Self {
            policy,
            base,
            quiet,
            events: Rc::default(),
            views: RefCell::default(),
            media: RefCell::default(),
            document: RefCell::default(),
            observed: RefCell::default(),
            centered: Cell::new(None),
            fatal: RefCell::default(),
        }
    }

    /// Take everything the host has queued for the feed.
    pub fn drain_events(&self) -> Vec<HostEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    /// Message the feed replaced itself with, if loading failed.
    pub fn fatal_error(&self) -> Option<String> {
        self.fatal.borrow().clone()
    }

    /// The slide under the viewport.
    pub fn centered(&self) -> Option<SlideId> {
        self.centered.get()
    }

    /// Natural scroll by whole slides. Returns false at either end of the
    /// mounted document.
    pub fn scroll_by(&self, delta: isize) -> bool {
        let target = {
            let document = self.document.borrow();
            let Some(current) = self.centered.get() else {
                return false;
            };
            let Some(position) = document.iter().position(|id| *id == current) else {
                return false;
            };
            let last = document.len().saturating_sub(1);
            let target = position.saturating_add_signed(delta).min(last);
            if target == position {
                return false;
            }
            document[target]
        };
        self.center_on(target);
        true
    }

    /// Tap whatever is under the viewport.
    pub fn tap(&self) -> bool {
        let Some(slide) = self.centered.get() else {
            return false;
        };
        self.events.borrow_mut().push_back(HostEvent::Tap(slide));
        true
    }

    /// One-line description of the centered slide.
    pub fn describe_centered(&self) -> Option<String> {
        let slide = self.centered.get()?;
        let views = self.views.borrow();
        let view = views.get(&slide)?;
        let media = self.media.borrow();
        let state = media.get(&slide)?;
        let status = if let Some(error) = &view.error {
            error.red().to_string()
        } else if view.loading {
            "loading".dimmed().to_string()
        } else if state.playing.get() && state.muted.get() {
            "playing (muted)".green().to_string()
        } else if state.playing.get() {
            "playing".green().to_string()
        } else {
            "paused".yellow().to_string()
        };
        let label = view.annotation.as_deref().unwrap_or_default();
        Some(format!(
            "line {} {} {} {}",
            view.line,
            view.url.dimmed(),
            status,
            label.bold()
        ))
    }

    fn center_on(&self, next: SlideId) {
        let previous = self.centered.replace(Some(next));
        let observed = self.observed.borrow();
        let mut batch = Vec::new();
        if let Some(previous) = previous.filter(|p| *p != next && observed.contains(p)) {
            batch.push(Intersection::hidden(previous));
        }
        if observed.contains(&next) {
            batch.push(Intersection::visible(next));
        }
        if !batch.is_empty() {
            trace!("Intersections {batch:?}");
            self.events
                .borrow_mut()
                .push_back(HostEvent::Intersections(batch));
        }
    }

    fn line_of(&self, slide: SlideId) -> Option<usize> {
        self.views.borrow().get(&slide).map(|view| view.line)
    }
}

impl MediaFactory for TerminalHost {
    fn create_media(&self, slide: SlideId) -> Box<dyn MediaElement> {
        let state = Rc::new(MediaState::default());
        self.media.borrow_mut().insert(slide, Rc::clone(&state));
        Box::new(TerminalMedia {
            slide,
            state,
            policy: self.policy,
            base: self.base.clone(),
            events: Rc::clone(&self.events),
            quiet: self.quiet,
        })
    }
}

impl Surface for TerminalHost {
    fn create_slide(&self, slide: SlideId, video: &VideoRef) {
        if let Some(state) = self.media.borrow().get(&slide) {
            *state.label.borrow_mut() = format!("# {}", video.line());
        }
        self.views.borrow_mut().insert(
            slide,
            SlideView {
                line: video.line(),
                url: video.url().to_string(),
                loading: true,
                error: None,
                annotation: None,
            },
        );
    }

    fn insert_slide(&self, slide: SlideId, before: Option<SlideId>) {
        let mut document = self.document.borrow_mut();
        let position = before
            .and_then(|sibling| document.iter().position(|id| *id == sibling))
            .unwrap_or(document.len());
        document.insert(position, slide);
        if self.centered.get().is_none() {
            self.centered.set(Some(slide));
        }
        debug!("Inserted {slide} at {position}");
    }

    fn remove_slide(&self, slide: SlideId) {
        self.document.borrow_mut().retain(|id| *id != slide);
        self.views.borrow_mut().remove(&slide);
        self.media.borrow_mut().remove(&slide);
        if self.centered.get() == Some(slide) {
            self.centered.set(None);
        }
        debug!("Removed {slide}");
    }

    fn remove_loading(&self, slide: SlideId) {
        if let Some(view) = self.views.borrow_mut().get_mut(&slide) {
            view.loading = false;
        }
    }

    fn show_slide_error(&self, slide: SlideId, message: &str) {
        if let Some(view) = self.views.borrow_mut().get_mut(&slide) {
            view.loading = false;
            view.error = Some(message.to_string());
        }
        println!("{} {}", "✗".red(), message.red());
    }

    fn clear_slide_error(&self, slide: SlideId) {
        if let Some(view) = self.views.borrow_mut().get_mut(&slide) {
            view.error = None;
        }
    }

    fn show_annotation(&self, slide: SlideId, text: &str) {
        let views = self.views.borrow();
        let url = views.get(&slide).map(|view| view.url.as_str()).unwrap_or_default();
        let muted = self
            .media
            .borrow()
            .get(&slide)
            .is_some_and(|state| state.muted.get());
        let suffix = if muted { " (muted)" } else { "" };
        println!("{} {} {}{}", "▶".green(), text.bold(), url.dimmed(), suffix.dimmed());
        drop(views);
        if let Some(view) = self.views.borrow_mut().get_mut(&slide) {
            view.annotation = Some(text.to_string());
        }
    }

    fn fade_annotation(&self, slide: SlideId) {
        trace!("Fading label on {slide}");
    }

    fn remove_annotation(&self, slide: SlideId) {
        if let Some(view) = self.views.borrow_mut().get_mut(&slide) {
            view.annotation = None;
        }
    }

    fn scroll_into_view(&self, slide: SlideId) {
        // Smooth scrolling passes every slide in between.
        let path: Vec<SlideId> = {
            let document = self.document.borrow();
            let Some(to) = document.iter().position(|id| *id == slide) else {
                return;
            };
            let from = self
                .centered
                .get()
                .and_then(|current| document.iter().position(|id| *id == current));
            match from {
                Some(from) if from < to => document[from + 1..=to].to_vec(),
                Some(from) if from > to => document[to..from].iter().rev().copied().collect(),
                Some(_) => Vec::new(),
                None => vec![slide],
            }
        };
        debug!(
            "Scrolling to line {:?} past {} slides",
            self.line_of(slide),
            path.len().saturating_sub(1)
        );
        for step in path {
            self.center_on(step);
        }
    }

    fn scroll_to_start(&self) {
        let first = self.document.borrow().first().copied();
        if let Some(first) = first {
            self.center_on(first);
        }
    }

    fn alert(&self, message: &str) {
        println!("{} {}", "!".yellow().bold(), message);
    }

    fn reset_jump_input(&self) {
        trace!("Jump input cleared");
    }

    fn update_controls(&self, controls: &Controls) {
        if self.quiet || !controls.enabled {
            return;
        }
        println!(
            "{} {}  {} 1-{}",
            "mode:".dimmed(),
            controls.mode.to_string().cyan(),
            "lines:".dimmed(),
            controls.max_line
        );
    }

    fn show_fatal_error(&self, message: &str) {
        self.views.borrow_mut().clear();
        *self.fatal.borrow_mut() = Some(message.to_string());
    }
}

impl Viewport for TerminalHost {
    fn configure_observer(&self, threshold: f32) {
        // One slide fills the viewport, so any threshold is met exactly
        // when a slide is centered.
        debug!("Observer threshold {threshold}");
    }

    fn observe(&self, slide: SlideId) {
        self.observed.borrow_mut().insert(slide);
        // A fresh observation reports the current state once.
        let entry = if self.centered.get() == Some(slide) {
            Intersection::visible(slide)
        } else {
            Intersection::hidden(slide)
        };
        self.events
            .borrow_mut()
            .push_back(HostEvent::Intersections(vec![entry]));
    }

    fn unobserve(&self, slide: SlideId) {
        self.observed.borrow_mut().remove(&slide);
    }
}
