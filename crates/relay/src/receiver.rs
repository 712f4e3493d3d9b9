//! UDP syslog receiver -- the queue's producer.
//!
//! Each datagram becomes one [`LogEvent`] (at most [`MAX_EVENT_LEN`]
//! bytes). When a forward address is configured the raw datagram is also
//! copied there; forwarding failures are logged and ignored.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use alertik_core::LogEvent;
use alertik_core::config::{QueueFullPolicy, ReceiverConfig};
use alertik_core::event::MAX_EVENT_LEN;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::queue::EventQueue;

/// First delay after a failed `recv_from`; doubles per consecutive failure
const RECV_BACKOFF_BASE: Duration = Duration::from_millis(10);
/// Upper bound for the receive backoff
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Receiver counters
#[derive(Debug, Default)]
pub struct ReceiverStats {
    received: AtomicU64,
    dropped: AtomicU64,
    forward_failures: AtomicU64,
}

impl ReceiverStats {
    /// Datagrams received.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Datagrams that could not be forwarded.
    pub fn forward_failures(&self) -> u64 {
        self.forward_failures.load(Ordering::Relaxed)
    }
}

/// UDP syslog receiver
pub struct SyslogReceiver {
    socket: UdpSocket,
    queue: Arc<EventQueue>,
    policy: QueueFullPolicy,
    forward_to: Option<SocketAddr>,
    stats: Arc<ReceiverStats>,
}

impl SyslogReceiver {
    /// Binds the socket and resolves the forward address.
    pub async fn bind(config: &ReceiverConfig, queue: Arc<EventQueue>) -> Result<Self, RelayError> {
        let socket = UdpSocket::bind(config.bind.as_str()).await.map_err(|e| {
            RelayError::Receiver(format!("unable to bind {}: {e}", config.bind))
        })?;

        let forward_to = match (&config.forward_host, config.forward_port) {
            (Some(host), Some(port)) => Some(resolve(host, port).await?),
            _ => None,
        };

        info!(
            bind = %config.bind,
            queue_capacity = queue.capacity(),
            policy = %config.queue_full_policy,
            forward = ?forward_to,
            "syslog receiver bound"
        );

        Ok(Self {
            socket,
            queue,
            policy: config.queue_full_policy,
            forward_to,
            stats: Arc::new(ReceiverStats::default()),
        })
    }

    /// Bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ReceiverStats> {
        Arc::clone(&self.stats)
    }

    /// Receives until `cancel` fires.
    ///
    /// # Errors
    /// Returns [`RelayError::QueueFull`] when the queue is full under
    /// [`QueueFullPolicy::Abort`].
    pub async fn run(self, cancel: CancellationToken) -> Result<(), RelayError> {
        let mut buf = [0u8; MAX_EVENT_LEN];
        let mut consecutive_errors: u32 = 0;

        loop {
            let (len, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("syslog receiver stopping");
                    return Ok(());
                }
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => {
                        consecutive_errors = 0;
                        received
                    }
                    Err(e) => {
                        // e.g. ICMP port unreachable caused by forwarding
                        consecutive_errors = consecutive_errors.saturating_add(1);
                        let delay = recv_backoff(consecutive_errors);
                        warn!(error = %e, consecutive_errors, ?delay, "recv_from failed");
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                info!("syslog receiver stopping");
                                return Ok(());
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }
                },
            };

            self.stats.received.fetch_add(1, Ordering::Relaxed);
            let payload = &buf[..len];
            debug!(%peer, len, "datagram received");

            if let Some(target) = self.forward_to {
                self.forward(payload, target).await;
            }

            self.enqueue(LogEvent::from_datagram(payload, SystemTime::now()))?;
        }
    }

    async fn forward(&self, payload: &[u8], target: SocketAddr) {
        if let Err(e) = self.socket.send_to(payload, target).await {
            self.stats.forward_failures.fetch_add(1, Ordering::Relaxed);
            warn!(%target, error = %e, "unable to forward datagram");
        }
    }

    fn enqueue(&self, event: LogEvent) -> Result<(), RelayError> {
        match self.policy {
            QueueFullPolicy::DropNewest => {
                if !self.queue.push(event) {
                    let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        dropped,
                        capacity = self.queue.capacity(),
                        "event queue full, rejected new event"
                    );
                }
            }
            QueueFullPolicy::DropOldest => {
                if self.queue.push_evicting(event).is_some() {
                    let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        dropped,
                        capacity = self.queue.capacity(),
                        "event queue full, dropped oldest event"
                    );
                }
            }
            QueueFullPolicy::Abort => {
                if !self.queue.push(event) {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    error!(capacity = self.queue.capacity(), "event queue full, aborting");
                    return Err(RelayError::QueueFull {
                        capacity: self.queue.capacity(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Delay before retrying after `failures` consecutive receive errors.
fn recv_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    RECV_BACKOFF_BASE
        .saturating_mul(1u32 << shift)
        .min(RECV_BACKOFF_MAX)
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, RelayError> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| RelayError::Receiver(format!("unable to resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| RelayError::Receiver(format!("no address found for {host}:{port}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: QueueFullPolicy) -> ReceiverConfig {
        ReceiverConfig {
            bind: "127.0.0.1:0".to_owned(),
            queue_full_policy: policy,
            ..Default::default()
        }
    }

    async fn send(to: SocketAddr, payload: &[u8]) {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(payload, to).await.unwrap();
    }

    #[tokio::test]
    async fn datagrams_become_events() {
        let queue = Arc::new(EventQueue::new(8));
        let receiver = SyslogReceiver::bind(&config(QueueFullPolicy::DropNewest), Arc::clone(&queue))
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let stats = receiver.stats();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receiver.run(cancel.clone()));

        send(addr, b"<30>router: link up\0\0").await;
        let event = tokio::time::timeout(Duration::from_secs(2), queue.pop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.text, "<30>router: link up");
        assert_eq!(stats.received(), 1);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn forwards_raw_datagrams() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        let mut cfg = config(QueueFullPolicy::DropNewest);
        cfg.forward_host = Some("127.0.0.1".to_owned());
        cfg.forward_port = Some(upstream_addr.port());

        let queue = Arc::new(EventQueue::new(8));
        let receiver = SyslogReceiver::bind(&cfg, Arc::clone(&queue)).await.unwrap();
        let addr = receiver.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receiver.run(cancel.clone()));

        send(addr, b"forward me").await;

        let mut buf = [0u8; 64];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), upstream.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"forward me");
        assert!(queue.pop().await.is_some());

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn drop_newest_keeps_running_when_full() {
        let queue = Arc::new(EventQueue::new(2));
        let receiver = SyslogReceiver::bind(&config(QueueFullPolicy::DropNewest), Arc::clone(&queue))
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let stats = receiver.stats();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receiver.run(cancel.clone()));

        for payload in [b"one".as_slice(), b"two", b"three"] {
            send(addr, payload).await;
        }
        tokio::time::timeout(Duration::from_secs(2), async {
            while stats.received() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(stats.dropped(), 2);
        assert_eq!(queue.try_pop().unwrap().text, "one");

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn abort_policy_fails_when_full() {
        let queue = Arc::new(EventQueue::new(2));
        let receiver = SyslogReceiver::bind(&config(QueueFullPolicy::Abort), Arc::clone(&queue))
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let task = tokio::spawn(receiver.run(CancellationToken::new()));

        send(addr, b"one").await;
        send(addr, b"two").await;

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(RelayError::QueueFull { capacity: 2 })));
    }

    #[test]
    fn recv_backoff_doubles_up_to_the_cap() {
        assert_eq!(recv_backoff(1), Duration::from_millis(10));
        assert_eq!(recv_backoff(2), Duration::from_millis(20));
        assert_eq!(recv_backoff(4), Duration::from_millis(80));
        assert_eq!(recv_backoff(7), Duration::from_millis(640));
        assert_eq!(recv_backoff(8), RECV_BACKOFF_MAX);
        assert_eq!(recv_backoff(u32::MAX), RECV_BACKOFF_MAX);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let cfg = ReceiverConfig {
            bind: "256.0.0.1:5140".to_owned(),
            ..Default::default()
        };
        let result = SyslogReceiver::bind(&cfg, Arc::new(EventQueue::new(4))).await;
        assert!(matches!(result, Err(RelayError::Receiver(_))));
    }
}
