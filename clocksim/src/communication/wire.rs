//! One-message-per-connection text protocol between machines.
//!
//! 1. The sender connects to the peer's listening port.
//! 2. The listener answers with [`READY_TOKEN`].
//! 3. The sender discards the token, writes its payload and closes.
//! 4. The listener does a single read of at most [`RECEIVE_BUFFER_SIZE`]
//!    bytes and enqueues them. It never waits for the sender to close.

use std::{net::IpAddr, time::Duration};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
};

use crate::{Inbox, Payload, Port, Result, SimulationError};

pub const READY_TOKEN: &str = "Ready to receive!";

pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// How long a connected peer may stay silent before the listener moves on.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Accept loop of a single machine. Runs until `shutdown` flips to `true`
/// or its sender is dropped.
pub(crate) async fn listen(
    listener: TcpListener,
    port: Port,
    inbox: Inbox,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow_and_update() {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = accept_one(&listener, &inbox) => {
                if let Err(err) = received {
                    inbox.record_dropped();
                    warn!("Machine {port} dropped an inbound connection: {err}");
                }
            }
        }
    }
    info!("Machine {port} terminated");
}

async fn accept_one(listener: &TcpListener, inbox: &Inbox) -> Result<()> {
    let (mut stream, peer) = listener.accept().await?;
    stream.write_all(READY_TOKEN.as_bytes()).await?;

    let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
    let read = tokio::time::timeout(RECEIVE_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| SimulationError::ReceiveTimeout(peer))??;
    if read == 0 {
        return Err(SimulationError::EmptyPayload);
    }

    // No validation: whatever arrived is what the machine will drain.
    let payload = String::from_utf8_lossy(&buf[..read]).into_owned();
    debug!("Accepted {payload:?} from {peer}");
    inbox.push(payload)
}

/// Delivers one payload to one peer. Fire-and-forget from the caller's side.
pub(crate) async fn send_message(addr: &str, payload: &Payload) -> Result<()> {
    let mut stream = TcpStream::connect(addr).await?;

    let mut token = [0u8; RECEIVE_BUFFER_SIZE];
    if stream.read(&mut token).await? == 0 {
        return Err(SimulationError::HandshakeClosed);
    }

    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Machines bound to a wildcard address are reached over loopback.
pub(crate) fn connect_host(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => "127.0.0.1".to_string(),
        Ok(IpAddr::V6(ip)) if ip.is_unspecified() => "[::1]".to_string(),
        Ok(IpAddr::V6(ip)) => format!("[{ip}]"),
        _ => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_connect_host() {
        assert_eq!(connect_host("0.0.0.0"), "127.0.0.1");
        assert_eq!(connect_host("::"), "[::1]");
        assert_eq!(connect_host("::1"), "[::1]");
        assert_eq!(connect_host("127.0.0.1"), "127.0.0.1");
        assert_eq!(connect_host("localhost"), "localhost");
    }

    #[tokio::test]
    async fn test_send_reaches_listener_inbox() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listen(listener, port, inbox.clone(), shutdown_rx));

        send_message(&format!("127.0.0.1:{port}"), &"17".to_string())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while inbox.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(inbox.pop().unwrap(), Some(("17".to_string(), 0)));

        shutdown_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_to_closed_port_fails() {
        let port = {
            let scratch = TcpListener::bind("127.0.0.1:0").await.unwrap();
            scratch.local_addr().unwrap().port()
        };
        let result = send_message(&format!("127.0.0.1:{port}"), &"1".to_string()).await;
        assert!(matches!(result, Err(SimulationError::Io(_))));
    }

    #[tokio::test]
    async fn test_empty_connection_is_not_enqueued() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let mut token = [0u8; READY_TOKEN.len()];
            stream.read_exact(&mut token).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let result = accept_one(&listener, &inbox).await;
        client.await.unwrap();
        assert!(matches!(result, Err(SimulationError::EmptyPayload)));
        assert!(inbox.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_payload_is_truncated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let mut token = [0u8; READY_TOKEN.len()];
            stream.read_exact(&mut token).await.unwrap();
            // The listener stops reading at the buffer limit, so the tail
            // of this write may be reset; only the prefix matters here.
            let _ = stream.write_all(&[b'9'; RECEIVE_BUFFER_SIZE + 16]).await;
            let _ = stream.shutdown().await;
        });

        accept_one(&listener, &inbox).await.unwrap();
        let _ = client.await;
        let (payload, _) = inbox.pop().unwrap().unwrap();
        assert!(!payload.is_empty() && payload.len() <= RECEIVE_BUFFER_SIZE);
        assert!(payload.bytes().all(|b| b == b'9'));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_payload_delivered_while_connection_stays_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listen(listener, port, inbox.clone(), shutdown_rx));

        let mut lingering = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut token = [0u8; READY_TOKEN.len()];
        lingering.read_exact(&mut token).await.unwrap();
        lingering.write_all(b"42").await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while inbox.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("payload must not wait for the sender to close");
        assert_eq!(inbox.pop().unwrap(), Some(("42".to_string(), 0)));

        // The next peer is served even though the first socket is still open.
        let mut next = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut token = [0u8; READY_TOKEN.len()];
        tokio::time::timeout(Duration::from_secs(1), next.read_exact(&mut token))
            .await
            .expect("second peer never got the readiness token")
            .unwrap();
        assert_eq!(&token, READY_TOKEN.as_bytes());

        drop(lingering);
        shutdown_tx.send_replace(true);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let mut token = [0u8; READY_TOKEN.len()];
            stream.read_exact(&mut token).await.unwrap();
            // Hold the socket open without writing.
            tokio::time::sleep(RECEIVE_TIMEOUT * 2).await;
        });

        let result = accept_one(&listener, &inbox).await;
        assert!(matches!(result, Err(SimulationError::ReceiveTimeout(_))));
        assert!(inbox.is_empty());
        client.abort();
    }

    #[tokio::test]
    async fn test_listener_counts_dropped_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inbox = Inbox::new(port);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listen(listener, port, inbox.clone(), shutdown_rx));

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut token = [0u8; READY_TOKEN.len()];
        stream.read_exact(&mut token).await.unwrap();
        stream.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while inbox.dropped() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(inbox.dropped(), 1);
        assert!(inbox.is_empty());

        shutdown_tx.send_replace(true);
        task.await.unwrap();
    }
}
