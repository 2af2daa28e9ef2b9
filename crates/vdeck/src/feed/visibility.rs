use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use log::trace;

use super::Feed;
use super::host::{Host, Intersection, SlideId};
use super::slide::Slide;
use super::tasks;

/// The observation set and the visibility threshold.
pub(crate) struct VisibilityTracker {
    threshold: f32,
    observed: RefCell<BTreeSet<SlideId>>,
}

impl VisibilityTracker {
    pub(crate) fn new(threshold: f32) -> Self {
        Self {
            threshold,
            observed: RefCell::new(BTreeSet::new()),
        }
    }

    pub(crate) fn threshold(&self) -> f32 {
        self.threshold
    }

    pub(crate) fn observe(&self, host: &dyn Host, slide: SlideId) {
        if self.observed.borrow_mut().insert(slide) {
            host.observe(slide);
        }
    }

    pub(crate) fn unobserve(&self, host: &dyn Host, slide: SlideId) {
        if self.observed.borrow_mut().remove(&slide) {
            host.unobserve(slide);
        }
    }

    pub(crate) fn unobserve_all(&self, host: &dyn Host) {
        let observed = std::mem::take(&mut *self.observed.borrow_mut());
        for slide in observed {
            host.unobserve(slide);
        }
    }

    pub(crate) fn is_observed(&self, slide: SlideId) -> bool {
        self.observed.borrow().contains(&slide)
    }

    fn is_sufficiently_visible(&self, entry: &Intersection) -> bool {
        entry.is_intersecting && entry.ratio >= self.threshold
    }
}

impl Feed {
    /// Process one observation batch. Ignored entirely while a jump runs.
    pub fn handle_intersections(&self, batch: &[Intersection]) {
        let core = &self.core;
        if core.jump_lock.is_locked() {
            trace!("Ignoring {} intersections during jump", batch.len());
            return;
        }

        for entry in batch {
            if !core.tracker.is_observed(entry.slide) {
                continue;
            }
            let Some(slide) = core.window.find(entry.slide) else {
                continue;
            };

            if core.tracker.is_sufficiently_visible(entry) {
                let index = slide.active_index();
                let changed = {
                    let mut session = core.session.borrow_mut();
                    let changed = session.active_index != index;
                    session.active_index = index;
                    changed
                };
                if changed {
                    let feed = self.clone();
                    tasks::post(async move {
                        feed.rebuild_if_idle().await;
                    });
                }
                self.request_play(&slide);
                self.preload_neighbors(index);
            } else if !slide.media().is_paused() {
                core.playback.pause(&slide);
            }
        }
    }

    /// Kick off playback without waiting for it.
    pub(crate) fn request_play(&self, slide: &Rc<Slide>) {
        let feed = self.clone();
        let slide = Rc::clone(slide);
        tasks::post(async move {
            feed.play_slide(&slide).await;
        });
    }

    /// Tap on a slide toggles play/pause, except during a jump.
    pub fn handle_tap(&self, slide: SlideId) {
        let core = &self.core;
        if core.jump_lock.is_locked() {
            trace!("Ignoring tap on {slide} during jump");
            return;
        }
        let Some(slide) = core.window.find(slide) else {
            return;
        };
        if slide.media().is_paused() {
            self.request_play(&slide);
        } else {
            core.playback.pause(&slide);
        }
    }
}
