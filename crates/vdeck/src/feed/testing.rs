//! Recording fake host for the feed tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

use super::error::PlayRejected;
use super::host::{Controls, MediaElement, MediaFactory, Preload, SlideId, Surface, Viewport};
use super::order::VideoRef;
use super::source::InlineSource;
use super::{Feed, FeedOptions};

/// Every surface mutation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SurfaceCall {
    Create(SlideId, usize),
    Insert(SlideId, Option<SlideId>),
    Remove(SlideId),
    RemoveLoading(SlideId),
    ShowError(SlideId, String),
    ClearError(SlideId),
    ShowAnnotation(SlideId, String),
    FadeAnnotation(SlideId),
    RemoveAnnotation(SlideId),
    ScrollIntoView(SlideId),
    ScrollToStart,
    Alert(String),
    ResetJumpInput,
    UpdateControls(Controls),
    FatalError(String),
}

/// How a fake media element answers `play()`, keyed by source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayScript {
    Allow,
    /// Rejected unless muted.
    RequireMuted,
    Reject,
    /// Resolves successfully after the delay.
    Delay(Duration),
}

/// Observable state of one fake media element.
#[derive(Debug)]
pub(crate) struct FakeMediaState {
    source: RefCell<String>,
    preload: Cell<Preload>,
    looping: Cell<bool>,
    plays_inline: Cell<bool>,
    muted: Cell<bool>,
    paused: Cell<bool>,
    play_calls: Cell<usize>,
    preload_changes: Cell<usize>,
}

impl Default for FakeMediaState {
    fn default() -> Self {
        Self {
            source: RefCell::new(String::new()),
            preload: Cell::new(Preload::Metadata),
            looping: Cell::new(false),
            plays_inline: Cell::new(false),
            muted: Cell::new(false),
            paused: Cell::new(true),
            play_calls: Cell::new(0),
            preload_changes: Cell::new(0),
        }
    }
}

impl FakeMediaState {
    pub(crate) fn source(&self) -> String {
        self.source.borrow().clone()
    }

    pub(crate) fn preload(&self) -> Preload {
        self.preload.get()
    }

    pub(crate) fn looping(&self) -> bool {
        self.looping.get()
    }

    pub(crate) fn plays_inline(&self) -> bool {
        self.plays_inline.get()
    }

    pub(crate) fn is_muted(&self) -> bool {
        self.muted.get()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub(crate) fn play_calls(&self) -> usize {
        self.play_calls.get()
    }

    /// Number of switches to eager preload.
    pub(crate) fn preload_changes(&self) -> usize {
        self.preload_changes.get()
    }
}

struct FakeMedia {
    state: Rc<FakeMediaState>,
    scripts: Rc<RefCell<HashMap<String, PlayScript>>>,
}

impl MediaElement for FakeMedia {
    fn set_source(&self, url: &str) {
        *self.state.source.borrow_mut() = url.to_string();
    }

    fn set_preload(&self, preload: Preload) {
        if preload == Preload::Auto {
            self.state.preload_changes.set(self.state.preload_changes.get() + 1);
        }
        self.state.preload.set(preload);
    }

    fn preload(&self) -> Preload {
        self.state.preload.get()
    }

    fn set_looping(&self, looping: bool) {
        self.state.looping.set(looping);
    }

    fn set_plays_inline(&self, inline: bool) {
        self.state.plays_inline.set(inline);
    }

    fn set_muted(&self, muted: bool) {
        self.state.muted.set(muted);
    }

    fn is_muted(&self) -> bool {
        self.state.muted.get()
    }

    fn is_paused(&self) -> bool {
        self.state.paused.get()
    }

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlayRejected>> {
        let state = Rc::clone(&self.state);
        state.play_calls.set(state.play_calls.get() + 1);
        let script = self
            .scripts
            .borrow()
            .get(state.source.borrow().as_str())
            .copied()
            .unwrap_or(PlayScript::Allow);
        Box::pin(async move {
            match script {
                PlayScript::Allow => {}
                PlayScript::RequireMuted if state.muted.get() => {}
                PlayScript::RequireMuted => {
                    return Err(PlayRejected::new("NotAllowedError: unmuted autoplay"));
                }
                PlayScript::Reject => return Err(PlayRejected::new("NotSupportedError")),
                PlayScript::Delay(delay) => tokio::time::sleep(delay).await,
            }
            state.paused.set(false);
            Ok(())
        })
    }

    fn pause(&self) {
        self.state.paused.set(true);
    }
}

#[derive(Default)]
struct Document {
    calls: Vec<SurfaceCall>,
    lines: HashMap<SlideId, usize>,
    order: Vec<SlideId>,
    errors: HashMap<SlideId, String>,
    annotations: HashMap<SlideId, String>,
    observed: BTreeSet<SlideId>,
    threshold: Option<f32>,
}

/// In-memory host that records every call the feed makes.
#[derive(Default)]
pub(crate) struct FakeHost {
    document: RefCell<Document>,
    media: RefCell<HashMap<SlideId, Rc<FakeMediaState>>>,
    scripts: Rc<RefCell<HashMap<String, PlayScript>>>,
}

impl FakeHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn script(&self, url: &str, script: PlayScript) {
        self.scripts.borrow_mut().insert(url.to_string(), script);
    }

    pub(crate) fn media(&self, slide: SlideId) -> Rc<FakeMediaState> {
        let media = self.media.borrow();
        let state = media.get(&slide).expect("media created for slide");
        Rc::clone(state)
    }

    /// Media elements currently playing, mounted or not.
    pub(crate) fn playing_count(&self) -> usize {
        self.media
            .borrow()
            .values()
            .filter(|state| !state.is_paused())
            .count()
    }

    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.document.borrow().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.document.borrow_mut().calls.clear();
    }

    pub(crate) fn alerts(&self) -> Vec<String> {
        self.document
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Alert(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_controls(&self) -> Option<Controls> {
        self.document
            .borrow()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::UpdateControls(controls) => Some(controls.clone()),
                _ => None,
            })
    }

    pub(crate) fn count(&self, wanted: &SurfaceCall) -> usize {
        self.document
            .borrow()
            .calls
            .iter()
            .filter(|call| *call == wanted)
            .count()
    }

    pub(crate) fn slide_error(&self, slide: SlideId) -> Option<String> {
        self.document.borrow().errors.get(&slide).cloned()
    }

    pub(crate) fn annotation(&self, slide: SlideId) -> Option<String> {
        self.document.borrow().annotations.get(&slide).cloned()
    }

    /// 1-based lines of the inserted slides, in document order.
    pub(crate) fn document_lines(&self) -> Vec<usize> {
        let document = self.document.borrow();
        document
            .order
            .iter()
            .filter_map(|id| document.lines.get(id).copied())
            .collect()
    }

    pub(crate) fn observed(&self) -> BTreeSet<SlideId> {
        self.document.borrow().observed.clone()
    }

    pub(crate) fn threshold(&self) -> Option<f32> {
        self.document.borrow().threshold
    }

    fn record(&self, call: SurfaceCall) {
        self.document.borrow_mut().calls.push(call);
    }
}

impl MediaFactory for FakeHost {
    fn create_media(&self, slide: SlideId) -> Box<dyn MediaElement> {
        let state = Rc::new(FakeMediaState::default());
        self.media.borrow_mut().insert(slide, Rc::clone(&state));
        Box::new(FakeMedia {
            state,
            scripts: Rc::clone(&self.scripts),
        })
    }
}

impl Surface for FakeHost {
    fn create_slide(&self, slide: SlideId, video: &VideoRef) {
        self.document
            .borrow_mut()
            .lines
            .insert(slide, video.line());
        self.record(SurfaceCall::Create(slide, video.original_index()));
    }

    fn insert_slide(&self, slide: SlideId, before: Option<SlideId>) {
        {
            let mut document = self.document.borrow_mut();
            let position = before
                .and_then(|sibling| document.order.iter().position(|id| *id == sibling))
                .unwrap_or(document.order.len());
            document.order.insert(position, slide);
        }
        self.record(SurfaceCall::Insert(slide, before));
    }

    fn remove_slide(&self, slide: SlideId) {
        {
            let mut document = self.document.borrow_mut();
            document.order.retain(|id| *id != slide);
            document.annotations.remove(&slide);
            document.errors.remove(&slide);
        }
        self.record(SurfaceCall::Remove(slide));
    }

    fn remove_loading(&self, slide: SlideId) {
        self.record(SurfaceCall::RemoveLoading(slide));
    }

    fn show_slide_error(&self, slide: SlideId, message: &str) {
        self.document
            .borrow_mut()
            .errors
            .insert(slide, message.to_string());
        self.record(SurfaceCall::ShowError(slide, message.to_string()));
    }

    fn clear_slide_error(&self, slide: SlideId) {
        self.document.borrow_mut().errors.remove(&slide);
        self.record(SurfaceCall::ClearError(slide));
    }

    fn show_annotation(&self, slide: SlideId, text: &str) {
        self.document
            .borrow_mut()
            .annotations
            .insert(slide, text.to_string());
        self.record(SurfaceCall::ShowAnnotation(slide, text.to_string()));
    }

    fn fade_annotation(&self, slide: SlideId) {
        self.record(SurfaceCall::FadeAnnotation(slide));
    }

    fn remove_annotation(&self, slide: SlideId) {
        self.document.borrow_mut().annotations.remove(&slide);
        self.record(SurfaceCall::RemoveAnnotation(slide));
    }

    fn scroll_into_view(&self, slide: SlideId) {
        self.record(SurfaceCall::ScrollIntoView(slide));
    }

    fn scroll_to_start(&self) {
        self.record(SurfaceCall::ScrollToStart);
    }

    fn alert(&self, message: &str) {
        self.record(SurfaceCall::Alert(message.to_string()));
    }

    fn reset_jump_input(&self) {
        self.record(SurfaceCall::ResetJumpInput);
    }

    fn update_controls(&self, controls: &Controls) {
        self.record(SurfaceCall::UpdateControls(controls.clone()));
    }

    fn show_fatal_error(&self, message: &str) {
        self.record(SurfaceCall::FatalError(message.to_string()));
    }
}

impl Viewport for FakeHost {
    fn configure_observer(&self, threshold: f32) {
        self.document.borrow_mut().threshold = Some(threshold);
    }

    fn observe(&self, slide: SlideId) {
        self.document.borrow_mut().observed.insert(slide);
    }

    fn unobserve(&self, slide: SlideId) {
        self.document.borrow_mut().observed.remove(&slide);
    }
}

/// Run `future` inside a `LocalSet` so `spawn_local` works.
pub(crate) async fn run_local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

/// A feed over `fake` with `list` already loaded.
pub(crate) async fn loaded_feed(fake: &Rc<FakeHost>, list: &str, options: FeedOptions) -> Feed {
    let feed = Feed::new(fake.clone(), options);
    feed.load(&InlineSource::new(list))
        .await
        .expect("test list loads");
    feed
}
