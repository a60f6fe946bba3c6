//! End-to-end scenarios over a shared store: two participants, live
//! subscriptions, fan-out and the delivery inbox.

use std::sync::Arc;

use chrono::Utc;

use causerie_blob::{BlobStore, MemoryBlobStore};
use causerie_shared::ParticipantId;
use causerie_store::Database;
use causerie_sync::{
    FixedIdentity, SessionError, SessionState, SyncConfig, SyncContext,
};

/// Both participants wired over one database, as two signed-in identities.
fn shared_contexts() -> (SyncContext, SyncContext) {
    let db = Database::open_in_memory().unwrap().into_shared();
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

    let u1 = SyncContext::assemble(
        db,
        Arc::new(FixedIdentity::signed_in("u1", "Uno")),
        blobs,
    );
    let u2 = u1.with_identity(Arc::new(FixedIdentity::signed_in("u2", "Dos")));
    (u1, u2)
}

#[tokio::test]
async fn text_message_reaches_both_live_sessions() {
    let (ctx1, ctx2) = shared_contexts();

    let mut alice = ctx1.session("u2".into(), "Dos");
    let mut bob = ctx2.session("u1".into(), "Uno");
    alice.open().unwrap();
    bob.open().unwrap();

    // Both sessions derived the same conversation, regardless of who opened.
    assert_eq!(alice.conversation(), bob.conversation());

    let subscribed_at = Utc::now();
    let sent = alice.send_text("hi").unwrap();

    let batch = bob.next_batch().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].text, "hi");
    assert_eq!(batch[0].id, sent.id);
    assert!(batch[0].created_at >= subscribed_at);

    // The sender's own subscription observes the append too.
    let echoed = alice.next_batch().await.unwrap();
    assert_eq!(echoed[0].id, sent.id);
}

#[tokio::test]
async fn both_sessions_observe_the_same_order() {
    let (ctx1, ctx2) = shared_contexts();

    let mut alice = ctx1.session("u2".into(), "Dos");
    let mut bob = ctx2.session("u1".into(), "Uno");
    alice.open().unwrap();
    bob.open().unwrap();

    alice.send_text("first").unwrap();
    bob.send_text("second").unwrap();
    alice.send_text("third").unwrap();

    for session in [&mut alice, &mut bob] {
        let mut seen = Vec::new();
        for _ in 0..3 {
            let batch = session.next_batch().await.unwrap();
            seen.extend(batch.into_iter().map(|m| m.text));
        }
        assert_eq!(seen, ["first", "second", "third"]);
    }
}

#[tokio::test]
async fn fan_out_covers_every_registered_device_exactly_once() {
    let (ctx1, _ctx2) = shared_contexts();
    let u2 = ParticipantId::from("u2");
    ctx1.registry.add_target(&u2, &"tokA".into()).unwrap();
    ctx1.registry.add_target(&u2, &"tokB".into()).unwrap();

    let mut alice = ctx1.session("u2".into(), "Dos");
    alice.open().unwrap();
    let sent = alice.send_text("hola").unwrap();

    let inbox = ctx1.inbox(u2.clone());
    let pending = inbox.pending().unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|r| r.notification_key == sent.notification_key()));
    assert!(pending.iter().all(|r| r.message_summary == "hola"));

    // A retried trigger for the same stored message converges.
    let report = ctx1.fanout.notify(&sent).unwrap();
    assert_eq!(report.records.len(), 2);
    assert_eq!(inbox.pending().unwrap().len(), 2);
}

#[tokio::test]
async fn recipient_without_devices_is_not_an_error() {
    let (ctx1, _ctx2) = shared_contexts();

    let mut alice = ctx1.session("u2".into(), "Dos");
    alice.open().unwrap();
    let sent = alice.send_text("hola").unwrap();

    let report = ctx1.fanout.notify(&sent).unwrap();
    assert!(report.records.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn inbox_signals_each_delivery_once() {
    let (ctx1, ctx2) = shared_contexts();
    let u2 = ParticipantId::from("u2");
    ctx1.registry.add_target(&u2, &"tokA".into()).unwrap();

    let mut alice = ctx1.session("u2".into(), "Dos");
    alice.open().unwrap();
    alice.send_text("uno").unwrap();
    alice.send_text("dos").unwrap();

    let inbox = ctx2.inbox(u2);
    let drained = inbox.take_pending().unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].message_summary, "uno");
    assert_eq!(drained[1].message_summary, "dos");

    // Acknowledged on drain: nothing left to signal.
    assert!(inbox.take_pending().unwrap().is_empty());
}

#[tokio::test]
async fn send_requires_a_live_session() {
    let (ctx1, _ctx2) = shared_contexts();

    let mut session = ctx1.session("u2".into(), "Dos");
    assert!(matches!(
        session.send_text("hi"),
        Err(SessionError::SessionNotLive {
            state: SessionState::Closed
        })
    ));

    session.open().unwrap();
    session.send_text("hi").unwrap();

    session.close();
    assert!(matches!(
        session.send_text("again"),
        Err(SessionError::SessionNotLive { .. })
    ));
}

#[tokio::test]
async fn open_fails_closed_without_identity() {
    let (ctx1, _ctx2) = shared_contexts();
    let anonymous = ctx1.with_identity(Arc::new(FixedIdentity::signed_out()));

    let mut session = anonymous.session("u2".into(), "Dos");
    assert!(matches!(
        session.open(),
        Err(SessionError::IdentityUnavailable)
    ));
    assert_eq!(session.state(), SessionState::Closed);

    // open is retryable after the provider recovers; double-open is not.
    let mut live = ctx1.session("u2".into(), "Dos");
    live.open().unwrap();
    assert!(matches!(live.open(), Err(SessionError::AlreadyOpen)));
}

#[tokio::test]
async fn empty_draft_is_rejected() {
    let (ctx1, _ctx2) = shared_contexts();

    let mut session = ctx1.session("u2".into(), "Dos");
    session.open().unwrap();

    assert!(matches!(
        session.send_text("   "),
        Err(SessionError::InvalidDraft(_))
    ));
}

#[tokio::test]
async fn image_message_references_a_fetchable_blob() {
    let (ctx1, ctx2) = shared_contexts();

    let mut alice = ctx1.session("u2".into(), "Dos");
    let mut bob = ctx2.session("u1".into(), "Uno");
    alice.open().unwrap();
    bob.open().unwrap();

    let bytes = b"jpeg-bytes";
    alice.send_image(bytes, "photo.jpg").await.unwrap();

    let batch = bob.next_batch().await.unwrap();
    let message = &batch[0];
    assert!(message.is_image());
    assert!(message.text.is_empty());

    let attachment = message.attachment.as_ref().unwrap();
    assert_eq!(attachment.name, "photo.jpg");
    assert_eq!(ctx2.blobs.fetch(&attachment.url).await.unwrap(), bytes);
}

#[tokio::test]
async fn closed_session_stops_delivering() {
    let (ctx1, ctx2) = shared_contexts();

    let mut alice = ctx1.session("u2".into(), "Dos");
    let mut bob = ctx2.session("u1".into(), "Uno");
    alice.open().unwrap();
    bob.open().unwrap();

    bob.close();
    bob.close(); // idempotent

    alice.send_text("into the void").unwrap();
    assert!(bob.try_next_batch().is_none());
    assert!(bob.next_batch().await.is_none());
}

#[tokio::test]
async fn context_opens_from_config_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        db_path: Some(dir.path().join("causerie.db")),
        blob_dir: dir.path().join("blobs"),
        max_blob_size: 1024,
    };

    let ctx = SyncContext::open(&config, Arc::new(FixedIdentity::signed_in("u1", "Uno")))
        .await
        .unwrap();

    let mut session = ctx.session("u2".into(), "Dos");
    session.open().unwrap();
    session.send_text("persisted").unwrap();

    let conversation = session.conversation().unwrap().clone();
    let history = ctx.store.history(&conversation, 10, 0).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "persisted");
}
