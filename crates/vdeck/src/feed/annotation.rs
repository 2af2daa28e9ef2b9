use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::trace;
use tokio::task::JoinHandle;

use super::host::Host;
use super::slide::{AnnotationPhase, Slide};
use super::tasks;

/// Shows the transient `# N` label on the playing slide.
///
/// One global timer slot governs the Visible -> FadingOut step. Starting a
/// new annotation aborts the pending timer and clears the previous slide's
/// label, so at most one label is on screen.
pub(crate) struct IndexAnnotator {
    visible_for: Duration,
    fade_for: Duration,
    serial: Cell<u64>,
    timer: RefCell<Option<JoinHandle<()>>>,
    current: RefCell<Weak<Slide>>,
}

impl IndexAnnotator {
    pub(crate) fn new(visible_for: Duration, fade_for: Duration) -> Self {
        Self {
            visible_for,
            fade_for,
            serial: Cell::new(0),
            timer: RefCell::new(None),
            current: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn show(&self, host: &Rc<dyn Host>, slide: &Rc<Slide>) {
        self.cancel_timer();

        let previous = self.current.replace(Rc::downgrade(slide));
        if let Some(previous) = previous.upgrade() {
            if previous.id() != slide.id() {
                self.clear(host.as_ref(), &previous);
            }
        }
        self.clear(host.as_ref(), slide);

        let serial = self.serial.get() + 1;
        self.serial.set(serial);
        slide.set_annotation(AnnotationPhase::Visible(serial));
        host.show_annotation(slide.id(), &format!("# {}", slide.line()));

        let host = Rc::clone(host);
        let target = Rc::downgrade(slide);
        let visible_for = self.visible_for;
        let fade_for = self.fade_for;
        let handle = tasks::post(async move {
            tokio::time::sleep(visible_for).await;
            let Some(slide) = target.upgrade() else {
                return;
            };
            if !slide.is_attached() || slide.annotation() != AnnotationPhase::Visible(serial) {
                return;
            }
            trace!("Fading annotation on line {}", slide.line());
            slide.set_annotation(AnnotationPhase::FadingOut(serial));
            host.fade_annotation(slide.id());

            // The removal is not owned by the timer slot: a newer annotation
            // must not strand this one half-faded.
            tasks::post(async move {
                tokio::time::sleep(fade_for).await;
                let Some(slide) = target.upgrade() else {
                    return;
                };
                if slide.is_attached() && slide.annotation() == AnnotationPhase::FadingOut(serial)
                {
                    slide.set_annotation(AnnotationPhase::Hidden);
                    host.remove_annotation(slide.id());
                }
            });
        });
        *self.timer.borrow_mut() = Some(handle);
    }

    /// Remove the label immediately. No-op when nothing is shown or the
    /// slide is already detached.
    pub(crate) fn clear(&self, host: &dyn Host, slide: &Slide) {
        if slide.annotation() == AnnotationPhase::Hidden || !slide.is_attached() {
            return;
        }
        slide.set_annotation(AnnotationPhase::Hidden);
        host.remove_annotation(slide.id());
    }

    /// Abort the pending Visible -> FadingOut timer, if any.
    pub(crate) fn cancel_timer(&self) {
        if let Some(handle) = self.timer.borrow_mut().take() {
            handle.abort();
        }
    }

    pub(crate) fn reset(&self) {
        self.cancel_timer();
        self.current.replace(Weak::new());
    }
}
