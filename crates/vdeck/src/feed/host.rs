//! Collaborator interfaces the feed drives.
//!
//! The feed never renders or decodes anything itself. A host (a browser
//! binding, the terminal front end, a test fake) implements these traits and
//! feeds its notifications back through [`HostEvent`]. Hosts must not call
//! back into the feed from inside a trait method; events are queued and
//! dispatched on a later turn, the way a browser delivers observer callbacks.

use std::fmt;

use futures::future::LocalBoxFuture;

use super::error::PlayRejected;
use super::order::{PlayMode, VideoRef};

/// Handle of one mounted slide. Never reused, so events for a slide that was
/// unmounted in the meantime are recognisable and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlideId(pub u64);

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide-{}", self.0)
    }
}

/// How much of the media to fetch ahead of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preload {
    #[default]
    Metadata,
    Auto,
}

/// A platform media element (a `<video>` in the browser).
pub trait MediaElement {
    fn set_source(&self, url: &str);
    fn set_preload(&self, preload: Preload);
    fn preload(&self) -> Preload;
    fn set_looping(&self, looping: bool);
    fn set_plays_inline(&self, inline: bool);
    fn set_muted(&self, muted: bool);
    fn is_muted(&self) -> bool;
    fn is_paused(&self) -> bool;
    /// Start playback. Rejection is reported asynchronously.
    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlayRejected>>;
    fn pause(&self);
}

pub trait MediaFactory {
    fn create_media(&self, slide: SlideId) -> Box<dyn MediaElement>;
}

/// State of the mode toggle and jump controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub enabled: bool,
    pub mode: PlayMode,
    pub max_line: usize,
}

/// The rendered document: slide nodes inside a scrolling container.
pub trait Surface {
    /// Build a detached slide node showing a loading placeholder.
    fn create_slide(&self, slide: SlideId, video: &VideoRef);
    /// Insert before `before`, or append when `None`.
    fn insert_slide(&self, slide: SlideId, before: Option<SlideId>);
    fn remove_slide(&self, slide: SlideId);
    fn remove_loading(&self, slide: SlideId);
    /// Replace any placeholder or previous error on the slide with `message`.
    fn show_slide_error(&self, slide: SlideId, message: &str);
    fn clear_slide_error(&self, slide: SlideId);
    fn show_annotation(&self, slide: SlideId, text: &str);
    fn fade_annotation(&self, slide: SlideId);
    fn remove_annotation(&self, slide: SlideId);
    /// Smooth scroll so the slide is centered.
    fn scroll_into_view(&self, slide: SlideId);
    /// Instant scroll back to the first slide.
    fn scroll_to_start(&self);
    fn alert(&self, message: &str);
    /// Clear the jump input and give it focus again.
    fn reset_jump_input(&self);
    fn update_controls(&self, controls: &Controls);
    /// Replace the whole feed with a fatal error message.
    fn show_fatal_error(&self, message: &str);
}

/// Viewport intersection signal for mounted slides.
pub trait Viewport {
    fn configure_observer(&self, threshold: f32);
    fn observe(&self, slide: SlideId);
    fn unobserve(&self, slide: SlideId);
}

/// Everything the feed needs from its environment.
pub trait Host: Surface + Viewport + MediaFactory {}

impl<T: Surface + Viewport + MediaFactory + ?Sized> Host for T {}

/// One entry of an intersection batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub slide: SlideId,
    pub ratio: f32,
    pub is_intersecting: bool,
}

impl Intersection {
    pub fn visible(slide: SlideId) -> Self {
        Self {
            slide,
            ratio: 1.0,
            is_intersecting: true,
        }
    }

    pub fn hidden(slide: SlideId) -> Self {
        Self {
            slide,
            ratio: 0.0,
            is_intersecting: false,
        }
    }
}

/// Notifications flowing from the host back into the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Intersections(Vec<Intersection>),
    MediaReady(SlideId),
    MediaError(SlideId),
    Tap(SlideId),
}
