//! Frontier behaviour under update sequences and concurrent transactions.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tidemark_core::{Bookmark, BookmarksUpdated, Frontier};
use tidemark_manager::{BookmarkManager, DefaultBookmarkManager, EventChannel};

fn bm(s: &str) -> Bookmark {
    Bookmark::parse(s).unwrap()
}

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

#[test]
fn sequence_matches_set_algebra() {
    for seed in 0..20 {
        let mut rng = Lcg(seed);
        let initial: Vec<Bookmark> = (0..5).map(|i| bm(&format!("init-{i}"))).collect();
        let manager = DefaultBookmarkManager::builder()
            .initial(initial.clone())
            .build();

        let mut model: HashSet<Bookmark> = initial.into_iter().collect();

        for step in 0..50 {
            let universe: Vec<Bookmark> = model.iter().cloned().collect();
            let used: Frontier = universe
                .iter()
                .filter(|_| rng.below(3) == 0)
                .cloned()
                .collect();
            let new: Vec<Option<Bookmark>> = (0..rng.below(3))
                .map(|i| {
                    if rng.below(4) == 0 {
                        None
                    } else {
                        Some(bm(&format!("s{seed}-t{step}-{i}")))
                    }
                })
                .collect();

            manager.update_bookmarks(&used, &new);

            for b in &used {
                model.remove(b);
            }
            model.extend(new.into_iter().flatten());

            assert_eq!(manager.get_bookmarks(), Frontier::from(model.clone()));
        }
    }
}

#[test]
fn removed_tokens_never_reappear() {
    let manager = DefaultBookmarkManager::builder().build();
    let mut previous = Frontier::new();

    for i in 0..100 {
        let token = bm(&format!("tx-{i}"));
        manager.update_bookmarks(&previous, &[Some(token.clone())]);

        let current = manager.get_bookmarks();
        for old in &previous {
            assert!(!current.contains(old));
        }
        assert!(current.contains(&token));
        previous = current;
    }
}

#[test]
fn concurrent_disjoint_updates_commute() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    let initial: Vec<Bookmark> = (0..THREADS).map(|t| bm(&format!("seed-{t}"))).collect();
    let manager = Arc::new(
        DefaultBookmarkManager::builder()
            .initial(initial)
            .build(),
    );

    thread::scope(|scope| {
        for t in 0..THREADS {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                // Each thread owns its own chain of tokens.
                let mut last = bm(&format!("seed-{t}"));
                for r in 0..ROUNDS {
                    let next = bm(&format!("t{t}-r{r}"));
                    let used: Frontier = std::iter::once(last).collect();
                    manager.update_bookmarks(&used, &[Some(next.clone()), None]);
                    last = next;
                }
            });
        }
    });

    let expected: Frontier = (0..THREADS)
        .map(|t| bm(&format!("t{t}-r{}", ROUNDS - 1)))
        .collect();
    assert_eq!(manager.get_bookmarks(), expected);
    assert_eq!(manager.generation(), (THREADS * ROUNDS) as u64);
}

#[test]
fn every_update_notifies_once_with_unique_generation() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 100;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let manager = Arc::new(
        DefaultBookmarkManager::builder()
            .observer(move |e: &BookmarksUpdated| sink.lock().push(e.generation))
            .build(),
    );

    thread::scope(|scope| {
        for t in 0..THREADS {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                for r in 0..ROUNDS {
                    manager.update_bookmarks(&Frontier::new(), &[Some(bm(&format!("{t}-{r}")))]);
                }
            });
        }
    });

    let mut generations = seen.lock().clone();
    generations.sort_unstable();
    let expected: Vec<u64> = (1..=(THREADS * ROUNDS) as u64).collect();
    assert_eq!(generations, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn channel_subscriber_can_track_latest_frontier() {
    let channel = EventChannel::with_capacity(4096);
    let mut rx = channel.subscribe();
    let manager = Arc::new(DefaultBookmarkManager::builder().observer(channel).build());

    let mut handles = Vec::new();
    for t in 0..4 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            for r in 0..50 {
                manager.update_bookmarks(&Frontier::new(), &[Some(bm(&format!("{t}:{r}")))]);
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Keep only the newest event, whatever order they arrived in.
    let mut latest: Option<BookmarksUpdated> = None;
    while let Ok(event) = rx.try_recv() {
        if latest.as_ref().map_or(true, |l| event.supersedes(l)) {
            latest = Some(event);
        }
    }

    let latest = latest.unwrap();
    assert_eq!(latest.generation, 200);
    assert_eq!(latest.bookmarks, manager.get_bookmarks());
    assert_eq!(latest.bookmarks.len(), 200);
}
