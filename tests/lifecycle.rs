mod common;

use std::time::Duration;

use swipe_sessions::{
    ConnectionHandle, Departure, Error, ExpiredDeletion, SessionManager, SessionStatus,
};

use common::{filters, location, manager, store, FixedKey};

#[tokio::test]
async fn created_session_is_waiting_and_findable_by_key() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();

    assert_eq!(session.status, SessionStatus::Waiting);
    assert!(session.participants.is_empty());
    assert_eq!(session.key.len(), 4);
    assert_eq!(session.filters.max_distance, 5000);

    let found = sessions
        .join_by_key(&session.key.to_lowercase())
        .await
        .unwrap();
    assert_eq!(found.id, session.id);
    // Looking a session up never admits anyone
    assert_eq!(found.participant_count(), 0);
}

#[tokio::test]
async fn join_by_key_validates_before_lookup() {
    let sessions = manager().await;
    sessions.create_session(filters(), location()).await.unwrap();

    assert!(matches!(
        sessions.join_by_key("AB1").await,
        Err(Error::InvalidKeyFormat(_))
    ));
    assert!(matches!(
        sessions.join_by_key("12AB").await,
        Err(Error::InvalidKeyFormat(_))
    ));
}

#[tokio::test]
async fn join_by_unknown_key_is_not_found() {
    let sessions = manager().await.with_key_generator(FixedKey("ABCD"));
    sessions.create_session(filters(), location()).await.unwrap();

    assert!(matches!(
        sessions.join_by_key("WXYZ").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn admission_activates_at_two_and_rejects_a_third() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();
    let (a, b, c) = (
        ConnectionHandle::from("a"),
        ConnectionHandle::from("b"),
        ConnectionHandle::from("c"),
    );

    let after_a = sessions.admit_participant(&session.id, &a).await.unwrap();
    assert_eq!(after_a.status, SessionStatus::Waiting);
    assert_eq!(after_a.participant_count(), 1);

    let after_b = sessions.admit_participant(&session.id, &b).await.unwrap();
    assert_eq!(after_b.status, SessionStatus::Active);
    assert_eq!(after_b.participant_count(), 2);

    assert!(matches!(
        sessions.admit_participant(&session.id, &c).await,
        Err(Error::SessionFull(_))
    ));
    assert!(matches!(
        sessions.join_by_key(&session.key).await,
        Err(Error::SessionFull(_))
    ));

    // Re-admitting a member changes nothing
    let again = sessions.admit_participant(&session.id, &a).await.unwrap();
    assert_eq!(again.participant_count(), 2);
    assert_eq!(again.participants[0].handle, a);
    assert_eq!(again.participants[1].handle, b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_never_exceed_two() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let sessions = sessions.clone();
        let id = session.id;
        tasks.push(tokio::spawn(async move {
            sessions
                .admit_participant(&id, &ConnectionHandle::from(format!("conn-{i}")))
                .await
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(Error::SessionFull(_)) => {}
            Err(other) => panic!("unexpected error {other}"),
        }
    }
    assert_eq!(admitted, 2);

    let stored = sessions.get_session(&session.id).await.unwrap();
    assert_eq!(stored.participant_count(), 2);
    assert_eq!(stored.status, SessionStatus::Active);
}

#[tokio::test]
async fn last_departure_retires_the_session() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();
    let (a, b) = (ConnectionHandle::from("a"), ConnectionHandle::from("b"));
    sessions.admit_participant(&session.id, &a).await.unwrap();
    sessions.admit_participant(&session.id, &b).await.unwrap();

    match sessions.remove_participant(&session.id, &a).await.unwrap() {
        Departure::Remaining(remaining) => {
            assert_eq!(remaining.status, SessionStatus::Waiting);
            assert_eq!(remaining.participant_count(), 1);
            assert!(remaining.is_member(&b));
        }
        Departure::Retired(_) => panic!("session retired with a member left"),
    }

    assert_eq!(
        sessions.remove_participant(&session.id, &b).await.unwrap(),
        Departure::Retired(session.id)
    );
    assert!(matches!(
        sessions.join_by_key(&session.key).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        sessions.get_session(&session.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn removing_a_stranger_is_rejected() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();
    sessions
        .admit_participant(&session.id, &"a".into())
        .await
        .unwrap();

    assert!(matches!(
        sessions.remove_participant(&session.id, &"z".into()).await,
        Err(Error::NotParticipant(_))
    ));
    assert_eq!(
        sessions
            .get_session(&session.id)
            .await
            .unwrap()
            .participant_count(),
        1
    );
}

#[tokio::test]
async fn slot_frees_up_after_a_departure() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();
    sessions.admit_participant(&session.id, &"a".into()).await.unwrap();
    sessions.admit_participant(&session.id, &"b".into()).await.unwrap();
    sessions.remove_participant(&session.id, &"a".into()).await.unwrap();

    // A reconnect arrives with a fresh handle
    let rejoined = sessions
        .admit_participant(&session.id, &"a2".into())
        .await
        .unwrap();
    assert_eq!(rejoined.status, SessionStatus::Active);
    assert_eq!(rejoined.participant_count(), 2);
}

#[tokio::test]
async fn key_collisions_exhaust_the_retry_budget() {
    let sessions = manager()
        .await
        .with_key_generator(FixedKey("QQQQ"))
        .with_key_max_attempts(3);

    let first = sessions.create_session(filters(), location()).await.unwrap();
    assert_eq!(first.key, "QQQQ");

    assert!(matches!(
        sessions.create_session(filters(), location()).await,
        Err(Error::KeyGenerationExhausted(3))
    ));
}

#[tokio::test]
async fn completed_is_terminal() {
    let sessions = manager().await;
    let session = sessions.create_session(filters(), location()).await.unwrap();
    sessions.admit_participant(&session.id, &"a".into()).await.unwrap();
    sessions.admit_participant(&session.id, &"b".into()).await.unwrap();

    let completed = sessions.complete_session(&session.id).await.unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);

    match sessions.remove_participant(&session.id, &"a".into()).await.unwrap() {
        Departure::Remaining(s) => assert_eq!(s.status, SessionStatus::Completed),
        Departure::Retired(_) => panic!("retired too early"),
    }
    assert!(matches!(
        sessions.admit_participant(&session.id, &"c".into()).await,
        Err(Error::SessionCompleted(_))
    ));
    assert!(matches!(
        sessions.join_by_key(&session.key).await,
        Err(Error::SessionCompleted(_))
    ));

    assert!(matches!(
        sessions.remove_participant(&session.id, &"b".into()).await,
        Ok(Departure::Retired(_))
    ));
}

#[tokio::test]
async fn expired_sessions_read_as_not_found_and_free_their_key() {
    let store = store()
        .await
        .with_retention(time::Duration::milliseconds(200));
    let sessions = SessionManager::new(store.clone()).with_key_generator(FixedKey("EXPD"));
    let session = sessions.create_session(filters(), location()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(matches!(
        sessions.get_session(&session.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        sessions.join_by_key("EXPD").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        sessions.admit_participant(&session.id, &"a".into()).await,
        Err(Error::NotFound(_))
    ));

    // The key is free again even before the sweep ran
    let replacement = sessions.create_session(filters(), location()).await.unwrap();
    assert_eq!(replacement.key, "EXPD");
    assert_ne!(replacement.id, session.id);
}

#[tokio::test]
async fn sweep_removes_expired_rows() {
    let store = store()
        .await
        .with_retention(time::Duration::milliseconds(200));
    let sessions = SessionManager::new(store.clone());
    let session = sessions.create_session(filters(), location()).await.unwrap();
    sessions.admit_participant(&session.id, &"a".into()).await.unwrap();

    assert_eq!(store.delete_expired().await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.delete_expired().await.unwrap(), 1);
    assert_eq!(store.delete_expired().await.unwrap(), 0);
}
