use log::{debug, error, info, warn};

use super::error::NavigationError;
use super::order::{PlayMode, position_in};
use super::{Feed, FeedState, arrange, tasks};

impl Feed {
    /// Switch between random and sequential order.
    ///
    /// The whole index space is permuted, so the window is torn down and
    /// rebuilt from scratch at index 0 instead of being diffed. Waits for an
    /// in-flight rebuild first. Visibility handling is suspended until the
    /// new window is in place.
    pub async fn toggle_mode(&self) -> Result<PlayMode, NavigationError> {
        self.ensure_loaded()?;
        let core = &self.core;
        let Some(navigation) = core.jump_lock.try_lock() else {
            debug!("Mode toggle ignored while navigating");
            return Err(NavigationError::Busy);
        };
        let window = self.acquire_window().await;

        let mode = {
            let mut session = core.session.borrow_mut();
            let mode = session.mode.toggled();
            let active = arrange(&session.original, mode, &mut core.rng.borrow_mut());
            session.mode = mode;
            session.active = active;
            session.active_index = 0;
            mode
        };
        core.playback.reset();
        core.annotator.reset();
        self.teardown_window();
        self.rebuild_locked(window).await;

        core.host.scroll_to_start();
        self.preload_neighbors(0);
        core.host.update_controls(&self.controls());
        info!("Switched to {mode} order");
        drop(navigation);

        if let Some(first) = core.window.at(0) {
            self.play_slide(&first).await;
        }
        Ok(mode)
    }

    /// Jump to a 1-based line of the original list, whatever the current
    /// order. Returns the active index the line resolved to.
    pub async fn jump_to_line(&self, line: usize) -> Result<usize, NavigationError> {
        self.ensure_loaded()?;
        let core = &self.core;
        let Some(navigation) = core.jump_lock.try_lock() else {
            debug!("Jump to line {line} ignored, another jump is running");
            return Err(NavigationError::Busy);
        };

        let resolved = {
            let session = core.session.borrow();
            let max = session.original.len();
            match session.original.line(line) {
                None => Err(NavigationError::InvalidLine { line, max }),
                Some(video) => position_in(&session.active, video)
                    .ok_or(NavigationError::Unresolvable { line }),
            }
        };
        let index = match resolved {
            Ok(index) => index,
            Err(err) => {
                if matches!(err, NavigationError::Unresolvable { .. }) {
                    error!("Line {line} is missing from the active order");
                } else {
                    warn!("Rejected jump: {err}");
                }
                core.host.alert(&err.to_string());
                core.host.reset_jump_input();
                return Err(err);
            }
        };

        info!("Jumping to line {line} (active index {index})");
        core.session.borrow_mut().active_index = index;
        self.rebuild_awaited().await;

        let target = core.window.at(index);
        match &target {
            Some(slide) => core.host.scroll_into_view(slide.id()),
            None => {
                error!("Jump target for line {line} not mounted at active index {index}");
                core.host.scroll_to_start();
            }
        }
        tasks::settle(core.options.jump_settle).await;
        core.host.reset_jump_input();
        drop(navigation);

        let Some(slide) = target else {
            let err = NavigationError::TargetMissing {
                line,
                active_index: index,
            };
            core.host.alert(&err.to_string());
            return Err(err);
        };
        // Visibility was suspended while the slide scrolled into view.
        if slide.is_attached() {
            self.preload_neighbors(index);
            self.play_slide(&slide).await;
        }
        Ok(index)
    }

    /// Jump from raw text typed into the line input.
    pub async fn jump_to_input(&self, input: &str) -> Result<usize, NavigationError> {
        self.ensure_loaded()?;
        let core = &self.core;
        if core.jump_lock.is_locked() {
            return Err(NavigationError::Busy);
        }
        match input.trim().parse::<usize>() {
            Ok(line) => self.jump_to_line(line).await,
            Err(_) => {
                let err = NavigationError::NotANumber {
                    input: input.to_string(),
                    max: core.session.borrow().original.len(),
                };
                warn!("Rejected jump input {input:?}");
                core.host.alert(&err.to_string());
                core.host.reset_jump_input();
                Err(err)
            }
        }
    }

    fn ensure_loaded(&self) -> Result<(), NavigationError> {
        match self.core.state.get() {
            FeedState::Ready => Ok(()),
            FeedState::Idle | FeedState::Failed => Err(NavigationError::NotLoaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedOptions;
    use crate::feed::host::Intersection;
    use crate::feed::order::VideoRef;
    use crate::feed::testing::{FakeHost, SurfaceCall, loaded_feed, run_local};
    use std::time::Duration;

    fn sequential() -> FeedOptions {
        FeedOptions {
            start_mode: PlayMode::Sequential,
            seed: Some(7),
            ..FeedOptions::default()
        }
    }

    fn urls(feed: &Feed) -> Vec<String> {
        feed.active_order()
            .iter()
            .map(|video| video.url().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_to_line_four() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne", sequential()).await;

            assert_eq!(feed.jump_to_line(4).await, Ok(3));
            assert_eq!(feed.active_index(), 3);
            assert_eq!(feed.mounted_indices(), vec![1, 2, 3, 4]);
            assert_eq!(feed.playing().map(|v| v.url().to_string()).as_deref(), Some("d"));
            let target = feed.slide_id_at(3).unwrap();
            assert_eq!(fake.annotation(target).as_deref(), Some("# 4"));
            assert!(fake.calls().contains(&SurfaceCall::ScrollIntoView(target)));
            assert!(fake.calls().contains(&SurfaceCall::ResetJumpInput));
            assert!(!feed.is_jumping());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_jump_mutates_nothing() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne", sequential()).await;
            let order = urls(&feed);
            fake.clear_calls();

            for line in [0, 6, 100] {
                assert_eq!(
                    feed.jump_to_line(line).await,
                    Err(NavigationError::InvalidLine { line, max: 5 })
                );
            }
            assert_eq!(feed.active_index(), 0);
            assert_eq!(urls(&feed), order);
            assert_eq!(feed.mounted_indices(), vec![0, 1, 2]);
            assert_eq!(fake.alerts().len(), 3);
            assert_eq!(fake.count(&SurfaceCall::ResetJumpInput), 3);
            assert!(!feed.is_jumping());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_target_falls_back_to_start() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne\nf\ng\nh", sequential()).await;
            fake.clear_calls();

            let jump = {
                let feed = feed.clone();
                tokio::task::spawn_local(async move { feed.jump_to_line(6).await })
            };
            // The target is mounted, then swept away before the rebuild settles.
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(feed.is_rebuilding());
            feed.teardown_window();

            assert_eq!(
                jump.await.unwrap(),
                Err(NavigationError::TargetMissing {
                    line: 6,
                    active_index: 5,
                })
            );
            assert!(fake.calls().contains(&SurfaceCall::ScrollToStart));
            assert_eq!(
                fake.alerts(),
                vec!["jump failed: target slide for line 6 is not mounted".to_string()]
            );
            assert_eq!(fake.count(&SurfaceCall::ResetJumpInput), 1);
            assert!(!feed.is_jumping());
            assert!(feed.playing().is_none());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_input_parsing() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne", sequential()).await;

            let err = feed.jump_to_input("four").await.unwrap_err();
            assert_eq!(err.to_string(), "please enter a valid line number (1 to 5)");
            assert_eq!(
                fake.alerts(),
                vec!["please enter a valid line number (1 to 5)".to_string()]
            );
            assert_eq!(feed.active_index(), 0);

            assert_eq!(feed.jump_to_input(" 2 ").await, Ok(1));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_line_resolves_to_first_occurrence() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\nb", sequential()).await;

            assert_eq!(feed.jump_to_line(5).await, Ok(1));
            let playing = feed.playing().unwrap();
            assert_eq!(playing.url(), "b");
            assert_eq!(playing.line(), 2);
            let target = feed.slide_id_at(1).unwrap();
            assert_eq!(fake.annotation(target).as_deref(), Some("# 2"));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_line_in_random_order() {
        run_local(async {
            let fake = FakeHost::new();
            let options = FeedOptions {
                seed: Some(3),
                ..FeedOptions::default()
            };
            let feed = loaded_feed(&fake, "a\nb\nc\nd\nb\nf\ng", options).await;

            let index = feed.jump_to_line(5).await.unwrap();
            let order = feed.active_order();
            assert_eq!(order[index].url(), "b");
            // The first "b" in the active order wins.
            assert_eq!(order.iter().position(|v| v.url() == "b"), Some(index));
            assert_eq!(feed.playing().map(|v| v.line()), Some(2));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_twice_restores_original_order() {
        run_local(async {
            let fake = FakeHost::new();
            let list: String = (1..=12).map(|i| format!("v{i}.mp4\n")).collect();
            let feed = loaded_feed(&fake, &list, sequential()).await;
            let original = urls(&feed);
            feed.jump_to_line(6).await.unwrap();

            assert_eq!(feed.toggle_mode().await, Ok(PlayMode::Random));
            assert_eq!(feed.active_index(), 0);
            assert_eq!(feed.mounted_indices(), vec![0, 1, 2]);
            let mut shuffled = urls(&feed);
            shuffled.sort();
            let mut sorted = original.clone();
            sorted.sort();
            assert_eq!(shuffled, sorted);
            assert!(fake.calls().contains(&SurfaceCall::ScrollToStart));
            assert_eq!(fake.last_controls().map(|c| c.mode), Some(PlayMode::Random));

            assert_eq!(feed.toggle_mode().await, Ok(PlayMode::Sequential));
            assert_eq!(urls(&feed), original);
            assert_eq!(fake.document_lines(), vec![1, 2, 3]);
            assert_eq!(fake.observed().len(), 3);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_tears_down_playback() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne", sequential()).await;
            feed.jump_to_line(3).await.unwrap();
            let old = feed.slide_id_at(2).unwrap();

            feed.toggle_mode().await.unwrap();
            assert!(fake.media(old).is_paused());
            assert!(fake.calls().contains(&SurfaceCall::Remove(old)));
            assert!(fake.annotation(old).is_none());
            // The first slide of the new order plays; nothing else does.
            let first = feed.slide_id_at(0).unwrap();
            assert!(!fake.media(first).is_paused());
            assert_eq!(fake.playing_count(), 1);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_waits_for_inflight_rebuild() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne\nf\ng", sequential()).await;
            feed.set_active_index(4);
            let scroll = {
                let feed = feed.clone();
                tokio::task::spawn_local(async move { feed.rebuild_if_idle().await })
            };
            tokio::task::yield_now().await;
            assert!(feed.is_rebuilding());

            feed.toggle_mode().await.unwrap();
            assert!(scroll.await.unwrap().is_some());
            assert_eq!(feed.active_index(), 0);
            assert_eq!(feed.mounted_indices(), vec![0, 1, 2]);
            assert_eq!(fake.document_lines().len(), 3);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_and_taps_suspended_during_jump() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne\nf\ng\nh", sequential()).await;
            let passing = feed.slide_id_at(1).unwrap();

            let jump = {
                let feed = feed.clone();
                tokio::task::spawn_local(async move { feed.jump_to_line(7).await })
            };
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(feed.is_jumping());
            assert_eq!(feed.active_index(), 6);

            // A slide scrolled past mid-jump steals nothing.
            let mid = feed.slide_id_at(5).unwrap();
            feed.handle_intersections(&[Intersection::visible(mid)]);
            feed.handle_tap(mid);
            tokio::task::yield_now().await;
            assert_eq!(feed.active_index(), 6);
            assert!(fake.media(mid).is_paused());
            assert_eq!(fake.playing_count(), 0);

            assert_eq!(jump.await.unwrap(), Ok(6));
            assert_eq!(feed.playing().map(|v| v.line()), Some(7));
            assert!(!fake.observed().contains(&passing));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_jump_and_toggle_are_busy() {
        run_local(async {
            let fake = FakeHost::new();
            let feed = loaded_feed(&fake, "a\nb\nc\nd\ne", sequential()).await;
            let jump = {
                let feed = feed.clone();
                tokio::task::spawn_local(async move { feed.jump_to_line(5).await })
            };
            tokio::task::yield_now().await;

            assert_eq!(feed.jump_to_line(2).await, Err(NavigationError::Busy));
            assert_eq!(feed.jump_to_input("2").await, Err(NavigationError::Busy));
            assert_eq!(feed.toggle_mode().await, Err(NavigationError::Busy));
            assert_eq!(jump.await.unwrap(), Ok(4));
            assert_eq!(feed.mode(), PlayMode::Sequential);
            assert_eq!(
                feed.active_order().last().map(VideoRef::line),
                Some(5)
            );
        })
        .await;
    }
}
