//! Announcement queue integration tests
//!
//! Exercises ordering, suppression, clearing, muting, and language switching
//! through the real worker task, with fakes standing in for the speaker and
//! translator.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use drishti::Announcer;

mod common;

use common::{FakeSpeaker, FakeTranslator};

const GAP: Duration = Duration::from_millis(5);
const DRAIN: Duration = Duration::from_secs(3);

fn announcer_with(speaker: Arc<FakeSpeaker>, language: &str) -> Announcer {
    Announcer::new(
        speaker,
        Arc::new(FakeTranslator),
        language.to_string(),
        GAP,
    )
}

#[tokio::test]
async fn announcements_are_spoken_in_enqueue_order() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("Chair detected ahead of you");
    announcer.enqueue("2 people detected");
    announcer.enqueue("Door detected to your left");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(
        speaker.spoken_texts(),
        vec![
            "Chair detected ahead of you",
            "2 people detected",
            "Door detected to your left",
        ]
    );
}

#[tokio::test]
async fn repeated_text_is_suppressed() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("3 people detected");
    announcer.enqueue("3 people detected");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["3 people detected"]);
}

#[tokio::test]
async fn forced_announcements_bypass_suppression() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("Camera stopped");
    assert!(announcer.wait_idle(DRAIN).await);

    announcer.enqueue("Camera stopped"); // suppressed
    announcer.enqueue_forced("Camera stopped");
    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["Camera stopped", "Camera stopped"]);
}

#[tokio::test]
async fn empty_text_is_dropped() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("");
    announcer.enqueue_forced("");
    announcer.enqueue("Chair detected ahead of you");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["Chair detected ahead of you"]);
}

#[tokio::test]
async fn clear_drops_pending_items_and_cancels_playback() {
    let speaker = Arc::new(FakeSpeaker::with_delay(Duration::from_millis(150)));
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("first");
    announcer.enqueue("second");

    // Let the worker start on "first", then clear while it is speaking
    tokio::time::sleep(Duration::from_millis(50)).await;
    announcer.clear();
    announcer.enqueue("third");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["first", "third"]);
    assert!(speaker.cancelled.load(Ordering::SeqCst) >= 1);
    assert_eq!(announcer.pending(), 0);
}

#[tokio::test]
async fn clear_resets_suppression_memory() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("1 person detected");
    assert!(announcer.wait_idle(DRAIN).await);

    announcer.clear();
    announcer.enqueue("1 person detected");
    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(
        speaker.spoken_texts(),
        vec!["1 person detected", "1 person detected"]
    );
}

#[tokio::test]
async fn speaker_failure_does_not_stall_the_queue() {
    let speaker = Arc::new(FakeSpeaker::default());
    speaker.fail_next.store(true, Ordering::SeqCst);
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("lost to a failure");
    announcer.enqueue("still announced");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["still announced"]);
}

#[tokio::test]
async fn mute_drops_new_announcements() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.set_muted(true);
    announcer.enqueue("dropped while muted");
    announcer.enqueue_forced("also dropped while muted");
    assert!(announcer.wait_idle(DRAIN).await);

    announcer.set_muted(false);
    announcer.enqueue("heard again");
    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(speaker.spoken_texts(), vec!["heard again"]);
}

#[tokio::test]
async fn language_change_clears_queue_and_confirms_in_new_language() {
    let speaker = Arc::new(FakeSpeaker::with_delay(Duration::from_millis(100)));
    let announcer = announcer_with(Arc::clone(&speaker), "en");

    announcer.enqueue("in flight");
    announcer.enqueue("never spoken");

    tokio::time::sleep(Duration::from_millis(30)).await;
    announcer.set_language("hi");

    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(announcer.language(), "hi");
    // Pending work is gone; the confirmation runs through the translator
    assert_eq!(
        speaker.spoken_texts(),
        vec!["in flight", "[hi] Language changed to Hindi"]
    );
}

#[tokio::test]
async fn setting_the_same_language_announces_nothing() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "te");

    announcer.set_language("te");
    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert!(speaker.spoken_texts().is_empty());
}

#[tokio::test]
async fn non_english_announcements_are_translated() {
    let speaker = Arc::new(FakeSpeaker::default());
    let announcer = announcer_with(Arc::clone(&speaker), "te");

    announcer.enqueue("Chair detected ahead of you");
    assert!(announcer.wait_idle(DRAIN).await);
    announcer.shutdown().await;

    assert_eq!(
        speaker.spoken_texts(),
        vec!["[te] Chair detected ahead of you"]
    );
}
