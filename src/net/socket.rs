//! Socket helpers shared by the server and client paths.
//!
//! Byte-order aware conversions, bounded reads and writes that turn an orderly
//! shutdown into [`Error::ConnectionClosedByPeer`], address resolution with a
//! pre-resolution hook, and an availability wait that honours an abort signal.

use std::net::{IpAddr, SocketAddr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::AddressResolution;

/// Called with the address and port about to be resolved.
pub type ResolveHook = dyn Fn(&AddressResolution) + Send + Sync;

/// Listen backlog used for server sockets.
pub const LISTEN_BACKLOG: u32 = 100;

/// Receive buffer size for a single read.
pub const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    /// Network order.
    BigEndian,
}

/// Per-operation limits applied to every read, write and wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub send: Duration,
    pub recv: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            send: Duration::from_millis(30_000),
            recv: Duration::from_millis(60_000),
        }
    }
}

fn array<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| bytes.get(offset..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            Error::format(format!(
                "need {N} bytes at offset {offset}, buffer holds {}",
                bytes.len()
            ))
        })
}

pub fn to_i16(order: ByteOrder, bytes: &[u8], offset: usize) -> Result<i16> {
    let raw = array::<2>(bytes, offset)?;
    Ok(match order {
        ByteOrder::LittleEndian => i16::from_le_bytes(raw),
        ByteOrder::BigEndian => i16::from_be_bytes(raw),
    })
}

pub fn to_i32(order: ByteOrder, bytes: &[u8], offset: usize) -> Result<i32> {
    let raw = array::<4>(bytes, offset)?;
    Ok(match order {
        ByteOrder::LittleEndian => i32::from_le_bytes(raw),
        ByteOrder::BigEndian => i32::from_be_bytes(raw),
    })
}

pub fn to_i64(order: ByteOrder, bytes: &[u8], offset: usize) -> Result<i64> {
    let raw = array::<8>(bytes, offset)?;
    Ok(match order {
        ByteOrder::LittleEndian => i64::from_le_bytes(raw),
        ByteOrder::BigEndian => i64::from_be_bytes(raw),
    })
}

/// Reads a UUID whose first three fields are stored in `order`; the last
/// eight bytes are always taken as-is.
pub fn to_uuid(order: ByteOrder, bytes: &[u8], offset: usize) -> Result<Uuid> {
    let raw = array::<16>(bytes, offset)?;
    Ok(match order {
        ByteOrder::LittleEndian => Uuid::from_bytes_le(raw),
        ByteOrder::BigEndian => Uuid::from_bytes(raw),
    })
}

/// Reads `count` consecutive 32-bit integers starting at `offset`.
pub fn to_i32_array(order: ByteOrder, bytes: &[u8], offset: usize, count: usize) -> Result<Vec<i32>> {
    (0..count)
        .map(|i| to_i32(order, bytes, offset + 4 * i))
        .collect()
}

pub fn i16_bytes(order: ByteOrder, value: i16) -> [u8; 2] {
    match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    }
}

pub fn i32_bytes(order: ByteOrder, value: i32) -> [u8; 4] {
    match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    }
}

pub fn i64_bytes(order: ByteOrder, value: i64) -> [u8; 8] {
    match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    }
}

pub fn uuid_bytes(order: ByteOrder, value: &Uuid) -> [u8; 16] {
    match order {
        ByteOrder::LittleEndian => value.to_bytes_le(),
        ByteOrder::BigEndian => *value.as_bytes(),
    }
}

/// `4 * values.len()` bytes, each value encoded in `order`.
pub fn i32_array_bytes(order: ByteOrder, values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| i32_bytes(order, *v)).collect()
}

/// Concatenates the buffers in order.
pub fn combine(buffers: &[&[u8]]) -> Vec<u8> {
    buffers.concat()
}

/// Copies `len` bytes starting at `start` into a new buffer.
pub fn block_copy(buffer: &[u8], start: usize, len: usize) -> Result<Vec<u8>> {
    start
        .checked_add(len)
        .and_then(|end| buffer.get(start..end))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::format(format!("range {start}+{len} outside buffer of {}", buffer.len())))
}

/// Formats a byte count as whole kilobytes (1000 bytes) with thousands
/// separators, e.g. `1,235 KB`. Any non-zero count shows at least `1 KB`.
pub fn format_in_kilobytes(bytes: u64) -> String {
    let kb = if bytes == 0 {
        0
    } else {
        ((bytes as f64 / 1000.0).round() as u64).max(1)
    };

    let digits = kb.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push_str(" KB");
    out
}

/// Integer percentage of `value` over `total`, truncated; 0 when either is 0.
pub fn get_percent(value: u64, total: u64) -> u32 {
    if value == 0 || total == 0 {
        return 0;
    }
    ((value as f64 / total as f64) * 100.0) as u32
}

/// A TCP socket for `addr`'s family with `SO_REUSEADDR` set as requested.
pub fn create_tcp_socket(addr: &SocketAddr, reuse_address: bool) -> Result<TcpSocket> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(reuse_address)?;
    Ok(socket)
}

/// Reads whatever is available into `buf`, up to its length.
///
/// A zero-byte read is reported as [`Error::ConnectionClosedByPeer`].
pub async fn receive_bytes<R>(stream: &mut R, buf: &mut [u8], limit: Duration) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let n = timeout(limit, stream.read(buf))
        .await
        .map_err(|_| Error::Timeout(limit.as_millis() as u64))??;
    if n == 0 && !buf.is_empty() {
        return Err(Error::ConnectionClosedByPeer);
    }
    Ok(n)
}

/// Reads exactly `count` bytes, each individual read bounded by `limit`.
pub async fn receive_exact<R>(stream: &mut R, count: usize, limit: Duration) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; count];
    let mut filled = 0;
    while filled < count {
        filled += receive_bytes(stream, &mut buf[filled..], limit).await?;
    }
    Ok(buf)
}

/// Writes all of `bytes`. A write failure means the peer is gone.
pub async fn send_bytes<W>(stream: &mut W, bytes: &[u8], limit: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match timeout(limit, stream.write_all(bytes)).await {
        Err(_) => Err(Error::Timeout(limit.as_millis() as u64)),
        Ok(Err(e)) => {
            debug!(error = %e, "send failed");
            Err(Error::ConnectionClosedByPeer)
        }
        Ok(Ok(())) => Ok(()),
    }
}

/// Resolves `address:port`, notifying `on_resolving` first.
///
/// A panicking hook is logged and ignored. Literal IPv4/IPv6 addresses never
/// touch DNS; anything else goes through the system resolver and the first
/// result wins.
pub async fn resolve(
    address: &str,
    port: u16,
    on_resolving: Option<&ResolveHook>,
) -> Result<SocketAddr> {
    if address.is_empty() {
        return Err(Error::AddressResolution(address.to_string()));
    }

    if let Some(hook) = on_resolving {
        let event = AddressResolution {
            address: address.to_string(),
            port,
        };
        if catch_unwind(AssertUnwindSafe(|| hook(&event))).is_err() {
            warn!(address, port, "address resolution hook panicked");
        }
    }

    let literal = address.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    lookup_host((address, port))
        .await?
        .next()
        .ok_or_else(|| Error::AddressResolution(address.to_string()))
}

/// Waits until `stream` has at least `needed` bytes queued, it becomes
/// readable at EOF, or `abort` fires.
///
/// Returns the number of bytes available. An abort signal wins over data and
/// surfaces as [`Error::OperationAborted`].
pub async fn wait_for_available_bytes(
    stream: &TcpStream,
    abort: &mut watch::Receiver<bool>,
    needed: usize,
    limit: Duration,
) -> Result<usize> {
    if *abort.borrow() {
        return Err(Error::OperationAborted);
    }

    let needed = needed.max(1);
    let mut peeked = vec![0u8; needed];

    let wait = async {
        loop {
            stream.readable().await?;
            match stream.peek(&mut peeked).await {
                // 0 means EOF; let the caller's read report it.
                Ok(n) if n >= needed || n == 0 => return Ok(n),
                Ok(_) => tokio::time::sleep(Duration::from_millis(10)).await,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(Error::from(e)),
            }
        }
    };

    tokio::select! {
        biased;
        _ = abort.wait_for(|aborted| *aborted) => Err(Error::OperationAborted),
        res = timeout(limit, wait) => res.map_err(|_| Error::Timeout(limit.as_millis() as u64))?,
    }
}
