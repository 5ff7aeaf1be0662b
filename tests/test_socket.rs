use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carbide::Error;
use carbide::events::AddressResolution;
use carbide::net::socket::{self, ByteOrder, ResolveHook};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use uuid::Uuid;

const SHORT: Duration = Duration::from_millis(200);

async fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (client.unwrap(), accepted.unwrap().0)
}

#[test]
fn test_integer_byte_orders() {
    let be = socket::i32_bytes(ByteOrder::BigEndian, 0x0102_0304);
    assert_eq!(be, [1, 2, 3, 4]);
    assert_eq!(socket::to_i32(ByteOrder::BigEndian, &be, 0).unwrap(), 0x0102_0304);

    let le = socket::i16_bytes(ByteOrder::LittleEndian, -2);
    assert_eq!(socket::to_i16(ByteOrder::LittleEndian, &le, 0).unwrap(), -2);

    let wide = socket::i64_bytes(ByteOrder::BigEndian, i64::MIN + 7);
    assert_eq!(socket::to_i64(ByteOrder::BigEndian, &wide, 0).unwrap(), i64::MIN + 7);
}

#[test]
fn test_uuid_byte_orders() {
    let id = Uuid::new_v4();

    assert_eq!(socket::uuid_bytes(ByteOrder::BigEndian, &id), *id.as_bytes());

    let le = socket::uuid_bytes(ByteOrder::LittleEndian, &id);
    assert_eq!(socket::to_uuid(ByteOrder::LittleEndian, &le, 0).unwrap(), id);
    // Only the first three fields are swapped.
    assert_eq!(&le[8..], &id.as_bytes()[8..]);
}

#[test]
fn test_i32_arrays() {
    let values = [1, -1, 65_536];
    let bytes = socket::i32_array_bytes(ByteOrder::BigEndian, &values);

    assert_eq!(bytes.len(), 12);
    assert_eq!(socket::to_i32_array(ByteOrder::BigEndian, &bytes, 0, 3).unwrap(), values);
    assert!(socket::to_i32_array(ByteOrder::BigEndian, &bytes, 4, 3).is_err());
}

#[test]
fn test_combine_and_block_copy() {
    let combined = socket::combine(&[b"ab", b"", b"cd"]);
    assert_eq!(combined, b"abcd".to_vec());

    assert_eq!(socket::block_copy(&combined, 1, 2).unwrap(), b"bc".to_vec());
    assert!(socket::block_copy(&combined, 3, 2).is_err());
}

#[test]
fn test_get_percent() {
    assert_eq!(socket::get_percent(0, 10), 0);
    assert_eq!(socket::get_percent(5, 0), 0);
    assert_eq!(socket::get_percent(1, 3), 33);
    assert_eq!(socket::get_percent(10, 10), 100);
}

#[tokio::test]
async fn test_resolve_literal_addresses_skip_dns() {
    let v4 = socket::resolve("127.0.0.1", 80, None).await.unwrap();
    assert_eq!(v4.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(v4.port(), 80);

    let v6 = socket::resolve("[::1]", 443, None).await.unwrap();
    assert_eq!(v6.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
}

#[tokio::test]
async fn test_resolve_notifies_hook_and_survives_its_panic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let hook: &ResolveHook = &move |event: &AddressResolution| {
        assert_eq!(event.address, "10.0.0.1");
        assert_eq!(event.port, 8080);
        seen.fetch_add(1, Ordering::SeqCst);
        panic!("hook failure");
    };

    let addr = socket::resolve("10.0.0.1", 8080, Some(hook)).await.unwrap();

    assert_eq!(addr.to_string(), "10.0.0.1:8080");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolve_empty_address_fails() {
    assert!(matches!(
        socket::resolve("", 80, None).await,
        Err(Error::AddressResolution(_))
    ));
}

#[tokio::test]
async fn test_receive_reports_closed_peer() {
    let (mut reader, writer) = tokio::io::duplex(64);
    drop(writer);

    let mut buf = [0u8; 8];
    let result = socket::receive_bytes(&mut reader, &mut buf, SHORT).await;
    assert!(matches!(result, Err(Error::ConnectionClosedByPeer)));
}

#[tokio::test]
async fn test_receive_times_out() {
    let (mut reader, _writer) = tokio::io::duplex(64);

    let mut buf = [0u8; 8];
    let result = socket::receive_bytes(&mut reader, &mut buf, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(Error::Timeout(50))));
}

#[tokio::test]
async fn test_receive_exact_over_fragments() {
    let (mut reader, mut writer) = tokio::io::duplex(64);
    tokio::spawn(async move {
        for piece in [&b"he"[..], b"ll", b"o!"] {
            writer.write_all(piece).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let bytes = socket::receive_exact(&mut reader, 5, SHORT).await.unwrap();
    assert_eq!(bytes, b"hello".to_vec());
}

#[tokio::test]
async fn test_send_bytes() {
    let (mut writer, mut reader) = tokio::io::duplex(64);
    socket::send_bytes(&mut writer, b"ping", SHORT).await.unwrap();

    let bytes = socket::receive_exact(&mut reader, 4, SHORT).await.unwrap();
    assert_eq!(bytes, b"ping".to_vec());
}

#[tokio::test]
async fn test_wait_for_available_bytes() {
    let (mut client, server) = tcp_pair().await;
    let (_abort_tx, mut abort_rx) = watch::channel(false);

    client.write_all(b"abc").await.unwrap();

    let available = socket::wait_for_available_bytes(&server, &mut abort_rx, 3, SHORT)
        .await
        .unwrap();
    assert!(available >= 3);
}

#[tokio::test]
async fn test_wait_for_available_bytes_aborts() {
    let (_client, server) = tcp_pair().await;
    let (abort_tx, mut abort_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        abort_tx.send_replace(true);
        // Keep the sender alive until the waiter has seen the signal.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let result = socket::wait_for_available_bytes(&server, &mut abort_rx, 1, Duration::from_secs(5)).await;
    assert!(matches!(result, Err(Error::OperationAborted)));
}

#[test]
fn test_create_tcp_socket() {
    let addr = "127.0.0.1:0".parse().unwrap();
    let socket = socket::create_tcp_socket(&addr, true).unwrap();
    assert!(socket.reuseaddr().unwrap());
}
