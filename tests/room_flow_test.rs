//! Room lifecycle and queue sync scenarios driven through the RoomServer actor

use std::collections::{HashSet, VecDeque};

use queue_rooms::{
    AppError, ClientId, CodeGenerator, QueueSyncChannel, RegistryConfig, RoomCode, RoomHandle,
    RoomRegistry, ServerMessage, Song, TeardownPolicy,
};
use serde_json::json;
use tokio::sync::mpsc;

/// Returns the scripted codes in order, then repeats the last one forever
struct ScriptedCodes(VecDeque<&'static str>);

impl CodeGenerator for ScriptedCodes {
    fn generate(&mut self, _length: usize) -> RoomCode {
        let code = if self.0.len() > 1 {
            self.0.pop_front().unwrap()
        } else {
            self.0[0]
        };
        RoomCode::parse(code)
    }
}

fn spawn_with(codes: &[&'static str], policy: TeardownPolicy) -> RoomHandle {
    RoomHandle::spawn(
        RoomRegistry::new(
            Box::new(ScriptedCodes(codes.iter().copied().collect())),
            RegistryConfig::default(),
        ),
        QueueSyncChannel::new(policy),
    )
}

fn song(id: &str) -> Song {
    match json!({ "id": id }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

async fn subscriber(handle: &RoomHandle, code: &str) -> (ClientId, mpsc::Receiver<ServerMessage>) {
    let (tx, mut rx) = mpsc::channel(64);
    let client_id = ClientId::new();
    handle.connect(client_id, tx).await.unwrap();
    handle.subscribe(client_id, code.to_string()).await.unwrap();
    match rx.recv().await {
        Some(ServerMessage::UpdateQueue { .. }) => {}
        other => panic!("expected initial queue, got {:?}", other),
    }
    (client_id, rx)
}

#[tokio::test]
async fn test_create_add_publish_get_scenario() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);

    let code = handle.create_room("tok1".to_string()).await.unwrap();
    assert_eq!(code.as_str(), "ABCD");
    assert!(handle.exists(code.clone()).await.unwrap());

    let (_owner, mut rx) = subscriber(&handle, "ABCD").await;

    handle.append_song(code.clone(), song("s1")).await.unwrap();

    match rx.recv().await {
        Some(ServerMessage::UpdateQueue { queue }) => assert_eq!(queue, vec![song("s1")]),
        other => panic!("expected queue update, got {:?}", other),
    }
    assert_eq!(handle.get_queue(code).await.unwrap(), vec![song("s1")]);
}

#[tokio::test]
async fn test_create_room_retries_repeated_code() {
    let handle = spawn_with(&["ABCD", "ABCD", "ABCD", "QRST"], TeardownPolicy::Owner);

    let first = handle.create_room("a".to_string()).await.unwrap();
    let second = handle.create_room("b".to_string()).await.unwrap();

    assert_eq!(first.as_str(), "ABCD");
    assert_eq!(second.as_str(), "QRST");
    assert_eq!(handle.credential(first).await.unwrap(), "a");
    assert_eq!(handle.credential(second).await.unwrap(), "b");
}

#[tokio::test]
async fn test_concurrent_creates_yield_distinct_codes() {
    let handle = RoomHandle::spawn(
        RoomRegistry::new(
            Box::new(queue_rooms::RandomCodeGenerator),
            RegistryConfig {
                code_length: 2,
                ..RegistryConfig::default()
            },
        ),
        QueueSyncChannel::new(TeardownPolicy::Owner),
    );

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.create_room(format!("tok{}", i)).await })
        })
        .collect();

    let mut codes = HashSet::new();
    for task in tasks {
        let code = task.await.unwrap().unwrap();
        assert_eq!(code.as_str().len(), 2);
        assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase()));
        assert!(codes.insert(code));
    }
    assert_eq!(handle.stats().await.unwrap().rooms, 200);
}

#[tokio::test]
async fn test_concurrent_appends_are_all_kept() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let handle = handle.clone();
            let code = code.clone();
            tokio::spawn(async move { handle.append_song(code, song(&format!("s{}", i))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let queue = handle.get_queue(code).await.unwrap();
    assert_eq!(queue.len(), 50);
    let ids: HashSet<_> = queue
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn test_replace_then_get_returns_exact_queue() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();
    handle.append_song(code.clone(), song("s1")).await.unwrap();

    let reordered = vec![song("s3"), song("s1"), song("s2")];
    handle
        .replace_queue(code.clone(), reordered.clone())
        .await
        .unwrap();

    assert_eq!(handle.get_queue(code).await.unwrap(), reordered);
}

#[tokio::test]
async fn test_unknown_room_operations_are_not_found() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = RoomCode::parse("ZZZZ");

    assert!(!handle.exists(code.clone()).await.unwrap());
    assert!(matches!(
        handle.get_queue(code.clone()).await,
        Err(AppError::RoomNotFound(_))
    ));
    assert!(matches!(
        handle.append_song(code.clone(), song("s1")).await,
        Err(AppError::RoomNotFound(_))
    ));
    assert!(matches!(
        handle.replace_queue(code.clone(), Vec::new()).await,
        Err(AppError::RoomNotFound(_))
    ));
    assert!(matches!(
        handle.credential(code).await,
        Err(AppError::RoomNotFound(_))
    ));
}

#[tokio::test]
async fn test_owner_disconnect_ends_room_for_everyone() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();
    let (_early, mut early_rx) = subscriber(&handle, "ABCD").await;
    let (owner, _owner_rx) = subscriber(&handle, "ABCD").await;

    handle.disconnect(owner).await.unwrap();

    assert!(!handle.exists(code.clone()).await.unwrap());
    assert!(matches!(
        handle.get_queue(code).await,
        Err(AppError::RoomNotFound(_))
    ));
    match early_rx.recv().await {
        Some(ServerMessage::RoomClosed { room_code }) => assert_eq!(room_code, "ABCD"),
        other => panic!("expected room_closed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_owner_disconnect_keeps_room() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();
    let (early, _early_rx) = subscriber(&handle, "ABCD").await;
    let (_owner, _owner_rx) = subscriber(&handle, "ABCD").await;

    handle.disconnect(early).await.unwrap();

    assert!(handle.exists(code).await.unwrap());
}

#[tokio::test]
async fn test_last_subscriber_policy_waits_for_everyone() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::LastSubscriber);
    let code = handle.create_room("tok".to_string()).await.unwrap();
    let (a, _a_rx) = subscriber(&handle, "ABCD").await;
    let (b, _b_rx) = subscriber(&handle, "ABCD").await;

    handle.disconnect(b).await.unwrap();
    assert!(handle.exists(code.clone()).await.unwrap());

    handle.disconnect(a).await.unwrap();
    assert!(!handle.exists(code).await.unwrap());
}

#[tokio::test]
async fn test_room_without_subscribers_survives() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let stranger = ClientId::new();
    handle.connect(stranger, tx).await.unwrap();
    handle.disconnect(stranger).await.unwrap();

    assert!(handle.exists(code).await.unwrap());
}

#[tokio::test]
async fn test_owner_switching_rooms_leaves_old_room_alive() {
    let handle = spawn_with(&["ABCD", "WXYZ"], TeardownPolicy::Owner);
    let first = handle.create_room("a".to_string()).await.unwrap();
    let second = handle.create_room("b".to_string()).await.unwrap();
    let (owner, mut rx) = subscriber(&handle, "ABCD").await;

    handle.subscribe(owner, "WXYZ".to_string()).await.unwrap();
    assert!(matches!(rx.recv().await, Some(ServerMessage::UpdateQueue { .. })));

    assert!(handle.exists(first.clone()).await.unwrap());
    assert!(handle.exists(second).await.unwrap());
    assert_eq!(
        handle.append_song(first, song("s1")).await.unwrap(),
        vec![song("s1")]
    );
}

#[tokio::test]
async fn test_late_join_from_dropped_connection_does_not_pin_room() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::LastSubscriber);
    let code = handle.create_room("tok".to_string()).await.unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let dropped = ClientId::new();
    handle.connect(dropped, tx).await.unwrap();
    handle.disconnect(dropped).await.unwrap();
    handle.subscribe(dropped, "ABCD".to_string()).await.unwrap();

    let (b, _b_rx) = subscriber(&handle, "ABCD").await;
    handle.disconnect(b).await.unwrap();

    assert!(!handle.exists(code).await.unwrap());
    assert_eq!(handle.stats().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_undrained_subscriber_still_sees_final_queue() {
    let handle = spawn_with(&["ABCD"], TeardownPolicy::Owner);
    let code = handle.create_room("tok".to_string()).await.unwrap();

    let (tx, mut rx) = mpsc::channel(2);
    let client_id = ClientId::new();
    handle.connect(client_id, tx).await.unwrap();
    handle.subscribe(client_id, "ABCD".to_string()).await.unwrap();

    handle.append_song(code.clone(), song("s1")).await.unwrap();
    handle.append_song(code.clone(), song("s2")).await.unwrap();

    let mut last = None;
    while let Ok(Some(msg)) =
        tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await
    {
        last = Some(msg);
    }
    match last {
        Some(ServerMessage::UpdateQueue { queue }) => {
            assert_eq!(queue, vec![song("s1"), song("s2")])
        }
        other => panic!("expected final queue, got {:?}", other),
    }
}
