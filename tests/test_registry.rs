use std::collections::HashSet;
use std::sync::Arc;

use carbide::Error;
use carbide::http::connection::{Connection, ConnectionHandle};
use carbide::net::socket::Timeouts;
use carbide::server::ConnectionRegistry;
use tokio::net::TcpListener;

async fn handles(count: usize) -> (TcpListener, Vec<Arc<ConnectionHandle>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut handles = Vec::with_capacity(count);
    for _ in 0..count {
        let connection = Connection::connect(addr, Timeouts::default()).await.unwrap();
        handles.push(connection.handle().clone());
    }
    (listener, handles)
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (_listener, handles) = handles(20).await;

    let ids: HashSet<_> = handles.iter().map(|h| h.id()).collect();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_add_get_and_remove() {
    let (_listener, handles) = handles(3).await;
    let registry = ConnectionRegistry::new();
    assert!(registry.is_empty());

    for handle in &handles {
        registry.add(handle.clone()).unwrap();
    }
    assert_eq!(registry.len(), 3);
    assert!(registry.contains(handles[1].id()));
    assert_eq!(registry.get(handles[2].id()).unwrap().id(), handles[2].id());

    let removed = registry.remove(handles[1].id()).unwrap();
    assert_eq!(removed.id(), handles[1].id());
    assert!(!registry.contains(handles[1].id()));
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn test_duplicate_add_is_rejected() {
    let (_listener, handles) = handles(1).await;
    let registry = ConnectionRegistry::new();

    registry.add(handles[0].clone()).unwrap();
    let err = registry.add(handles[0].clone()).unwrap_err();

    assert!(matches!(err, Error::DuplicateConnection(id) if id == handles[0].id()));
    assert!(err.to_string().contains(&handles[0].id().to_string()));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_remove_absent_is_noop() {
    let (_listener, handles) = handles(1).await;
    let registry = ConnectionRegistry::new();

    assert!(registry.remove(handles[0].id()).is_none());
    registry.add(handles[0].clone()).unwrap();
    assert!(registry.remove(handles[0].id()).is_some());
    assert!(registry.remove(handles[0].id()).is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_snapshot_is_detached() {
    let (_listener, handles) = handles(2).await;
    let registry = ConnectionRegistry::new();
    for handle in &handles {
        registry.add(handle.clone()).unwrap();
    }

    let snapshot = registry.snapshot();
    for handle in &snapshot {
        registry.remove(handle.id());
    }

    assert_eq!(snapshot.len(), 2);
    assert!(registry.is_empty());
}
