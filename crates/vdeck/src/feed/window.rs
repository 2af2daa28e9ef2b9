use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, trace, warn};

use super::Feed;
use super::host::{Preload, SlideId};
use super::lock::{TryLock, TryLockGuard};
use super::slide::Slide;
use super::tasks;

/// Contiguous range of active indices that must be mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderWindow {
    pub start: usize,
    pub end: usize,
}

impl RenderWindow {
    /// `[index - buffer, index + buffer]` clamped to `[0, len - 1]`.
    pub fn around(index: usize, buffer: usize, len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let start = index.saturating_sub(buffer);
        let end = index.saturating_add(buffer).min(len - 1);
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// What one rebuild changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowChange {
    pub removed: Vec<usize>,
    pub added: Vec<usize>,
}

/// Mounted slides keyed by active index, plus the rebuild lock.
pub(crate) struct SlideWindow {
    buffer: usize,
    settle: Duration,
    mounted: RefCell<BTreeMap<usize, Rc<Slide>>>,
    next_id: Cell<u64>,
    lock: TryLock,
    /// Set when a request was dropped while a rebuild was in flight.
    stale: Cell<bool>,
    dropped: Cell<u64>,
}

impl SlideWindow {
    pub(crate) fn new(buffer: usize, settle: Duration) -> Self {
        Self {
            buffer,
            settle,
            mounted: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
            lock: TryLock::default(),
            stale: Cell::new(false),
            dropped: Cell::new(0),
        }
    }

    pub(crate) fn at(&self, index: usize) -> Option<Rc<Slide>> {
        self.mounted.borrow().get(&index).cloned()
    }

    pub(crate) fn find(&self, id: SlideId) -> Option<Rc<Slide>> {
        self.mounted
            .borrow()
            .values()
            .find(|slide| slide.id() == id)
            .cloned()
    }

    pub(crate) fn indices(&self) -> Vec<usize> {
        self.mounted.borrow().keys().copied().collect()
    }

    pub(crate) fn is_rebuilding(&self) -> bool {
        self.lock.is_locked()
    }

    pub(crate) fn dropped_rebuilds(&self) -> u64 {
        self.dropped.get()
    }

    fn allocate_id(&self) -> SlideId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SlideId(id)
    }

    /// Switch mounted neighbours within `ahead` of `center` to eager preload.
    pub(crate) fn preload_neighbors(&self, center: usize, ahead: usize) {
        let mounted = self.mounted.borrow();
        for distance in 1..=ahead {
            let neighbours = [center.checked_add(distance), center.checked_sub(distance)];
            for index in neighbours.into_iter().flatten() {
                let Some(slide) = mounted.get(&index) else {
                    continue;
                };
                if slide.media().preload() != Preload::Auto {
                    trace!("Preloading active index {index}");
                    slide.media().set_preload(Preload::Auto);
                }
            }
        }
    }
}

impl Feed {
    /// Rebuild unless one is already running, in which case the request is
    /// dropped. Used by natural scrolling. The in-flight rebuild notices the
    /// drop and converges once more before it releases the lock.
    pub(crate) async fn rebuild_if_idle(&self) -> Option<WindowChange> {
        let window = &self.core.window;
        let Some(guard) = window.lock.try_lock() else {
            debug!("Window rebuild already in progress, skipping");
            window.stale.set(true);
            window.dropped.set(window.dropped.get() + 1);
            return None;
        };
        Some(self.rebuild_locked(guard).await)
    }

    /// Wait for any in-flight rebuild, then run a fresh one against the
    /// current active index.
    pub(crate) async fn rebuild_awaited(&self) -> WindowChange {
        let guard = self.acquire_window().await;
        self.rebuild_locked(guard).await
    }

    /// Wait for the rebuild guard without rebuilding yet.
    pub(crate) async fn acquire_window(&self) -> TryLockGuard<'_> {
        self.core.window.lock.lock().await
    }

    /// Converge under a guard the caller already holds, then settle and
    /// release it.
    pub(crate) async fn rebuild_locked(&self, guard: TryLockGuard<'_>) -> WindowChange {
        let window = &self.core.window;
        window.stale.set(false);
        let mut change = self.converge_window();
        loop {
            tasks::settle(window.settle).await;
            if !window.stale.replace(false) {
                break;
            }
            let again = self.converge_window();
            change.removed.extend(again.removed);
            change.added.extend(again.added);
        }
        drop(guard);
        change
    }

    /// Diff the mounted set against the render window and mutate the
    /// document to match.
    fn converge_window(&self) -> WindowChange {
        let core = &self.core;
        let session = core.session.borrow();
        let len = session.active.len();
        let required = RenderWindow::around(session.active_index, core.window.buffer, len);
        let mut mounted = core.window.mounted.borrow_mut();

        let mut change = WindowChange {
            removed: mounted
                .keys()
                .copied()
                .filter(|index| !required.is_some_and(|window| window.contains(*index)))
                .collect(),
            added: required
                .map(|window| {
                    window
                        .indices()
                        .filter(|index| !mounted.contains_key(index))
                        .collect()
                })
                .unwrap_or_default(),
        };

        for index in &change.removed {
            let Some(slide) = mounted.remove(index) else {
                continue;
            };
            if !slide.media().is_paused() {
                slide.media().pause();
            }
            core.tracker.unobserve(core.host.as_ref(), slide.id());
            core.host.remove_slide(slide.id());
            slide.detach();
            trace!("Removed slide at active index {index}");
        }

        change.added.retain(|&index| {
            let Some(video) = session.active.get(index) else {
                warn!("Attempted to add slide with invalid active index: {index}");
                return false;
            };
            let slide = Slide::build(
                core.host.as_ref(),
                core.window.allocate_id(),
                video.clone(),
                index,
            );
            let before = mounted
                .iter()
                .find(|(mounted_index, _)| **mounted_index > index)
                .map(|(_, sibling)| sibling.id());
            core.host.insert_slide(slide.id(), before);
            core.tracker.observe(core.host.as_ref(), slide.id());
            mounted.insert(index, slide);
            trace!("Added slide at active index {index}");
            true
        });

        debug!(
            "Window around {} now {:?} (removed {:?}, added {:?})",
            session.active_index,
            mounted.keys().collect::<Vec<_>>(),
            change.removed,
            change.added
        );
        change
    }

    /// Unmount everything without diffing. The mode toggle uses this because
    /// the whole index space has been permuted.
    pub(crate) fn teardown_window(&self) {
        let core = &self.core;
        let slides = std::mem::take(&mut *core.window.mounted.borrow_mut());
        for slide in slides.into_values() {
            if !slide.media().is_paused() {
                slide.media().pause();
            }
            core.tracker.unobserve(core.host.as_ref(), slide.id());
            core.host.remove_slide(slide.id());
            slide.detach();
        }
        core.tracker.unobserve_all(core.host.as_ref());
    }

    pub(crate) fn preload_neighbors(&self, center: usize) {
        self.core
            .window
            .preload_neighbors(center, self.core.options.preload_ahead);
    }
}
