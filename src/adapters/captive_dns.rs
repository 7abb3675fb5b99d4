//! Captive-portal DNS responder: UDP/53 lifecycle and receive loop.
//!
//! Runs in a dedicated thread using `edge-executor` with `async-io-mini`
//! for the socket and timers. Each iteration races three futures:
//!
//! 1. **Receive**: `Async<UdpSocket>::recv_from`
//! 2. **Idle**: reactor timer, `recv_timeout_ms`
//! 3. **Stop**: `embassy-sync` [`Signal`] raised by [`CaptiveDns::stop`]
//!
//! ```text
//!  ┌────────────────────────────────────────────────────┐
//!  │  "captive-dns" thread                              │
//!  │  futures_lite::block_on                            │
//!  │  └─ edge_executor::LocalExecutor                   │
//!  │     └─ serve:  recv ─┬─▶ build_response ─▶ send_to │
//!  │                idle ─┤   (drop on Rejection)       │
//!  │                stop ─┘─▶ exit                      │
//!  └────────────────────────────────────────────────────┘
//! ```
//!
//! The socket is bound on the caller's thread so bind failures surface
//! from [`CaptiveDns::start`]; reactor registration happens on the
//! responder thread and is reported back through a readiness handshake.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_io_mini::{Async, Timer};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use crate::config::DnsConfig;
use crate::dns::{self, MAX_MESSAGE};
use crate::drivers::task_pin::{DNS_TASK, spawn_on_core};
use crate::error::{Error, Result};

/// Pause after a failed receive so a persistent socket error cannot spin.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);
const STOP_POLL: Duration = Duration::from_millis(10);

type StopSignal = Signal<CriticalSectionRawMutex, ()>;

// ── Counters ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counters {
    answered: AtomicU32,
    dropped: AtomicU32,
    recv_errors: AtomicU32,
}

/// Snapshot of responder activity since the last [`CaptiveDns::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderStats {
    pub answered: u32,
    /// Datagrams rejected by the wire parser (not A, truncated, ...).
    pub dropped: u32,
    pub recv_errors: u32,
}

impl Counters {
    fn snapshot(&self) -> ResponderStats {
        ResponderStats {
            answered: self.answered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

// ── Session ───────────────────────────────────────────────────

struct Session {
    running: Arc<AtomicBool>,
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
    redirect: Ipv4Addr,
}

struct ServeCtx {
    socket: Async<UdpSocket>,
    redirect: Ipv4Addr,
    recv_timeout: Duration,
    running: Arc<AtomicBool>,
    stop: Arc<StopSignal>,
    counters: Arc<Counters>,
}

enum Wake {
    Datagram(io::Result<(usize, SocketAddr)>),
    Idle,
    Stop,
}

/// Start/stop handle for the responder. Not `Sync`; owned by the
/// provisioning flow.
pub struct CaptiveDns {
    config: DnsConfig,
    session: Option<Session>,
    counters: Arc<Counters>,
}

impl CaptiveDns {
    pub fn new(config: DnsConfig) -> Self {
        Self {
            config,
            session: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Bind the socket and start answering every A query with `redirect`.
    ///
    /// Starting an already running responder is a logged no-op.
    pub fn start(&mut self, redirect: Ipv4Addr) -> Result<()> {
        if self.is_running() {
            warn!("dns: already running");
            return Ok(());
        }
        self.reap();

        let port = self.config.port;
        let bind = SocketAddrV4::new(self.config.bind_addr, port);
        let socket = UdpSocket::bind(bind).map_err(|e| {
            log::error!("dns: bind {bind} failed: {e}");
            Error::Bind { port, kind: e.kind() }
        })?;
        let local_addr = socket.local_addr().map_err(|e| Error::Socket(e.kind()))?;

        self.counters = Arc::new(Counters::default());
        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(StopSignal::new());
        let (ready_tx, ready_rx) = mpsc::sync_channel::<io::Result<()>>(1);

        let thread_running = Arc::clone(&running);
        let thread_stop = Arc::clone(&stop);
        let counters = Arc::clone(&self.counters);
        let recv_timeout = Duration::from_millis(u64::from(self.config.recv_timeout_ms));

        let handle = spawn_on_core(DNS_TASK, move || {
            let socket = match Async::new(socket) {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            run(ServeCtx {
                socket,
                redirect,
                recv_timeout,
                running: thread_running,
                stop: thread_stop,
                counters,
            });
        })
        .map_err(|e| {
            log::error!("dns: task spawn failed: {e}");
            Error::Spawn(DNS_TASK.display_name())
        })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                log::error!("dns: reactor registration failed: {e}");
                return Err(Error::Socket(e.kind()));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(Error::Spawn(DNS_TASK.display_name()));
            }
        }

        info!("dns: listening on {local_addr}, all queries -> {redirect}");
        self.session = Some(Session {
            running,
            stop,
            handle,
            local_addr,
            redirect,
        });
        Ok(())
    }

    /// Stop the loop and wait up to `stop_grace_ms` for it to exit.
    /// No-op when not running.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.running.store(false, Ordering::Release);
        session.stop.signal(());

        let deadline = Instant::now() + Duration::from_millis(u64::from(self.config.stop_grace_ms));
        while !session.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(STOP_POLL);
        }
        if session.handle.is_finished() {
            if session.handle.join().is_err() {
                warn!("dns: responder task panicked");
            }
        } else {
            warn!("dns: responder still running after grace period, detaching");
        }
        info!("dns: stopped");
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::Acquire) && !s.handle.is_finished())
    }

    /// Bound address while running (resolves port 0 to the real port).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session.as_ref().map(|s| s.local_addr)
    }

    pub fn redirect(&self) -> Option<Ipv4Addr> {
        self.session.as_ref().map(|s| s.redirect)
    }

    pub fn stats(&self) -> ResponderStats {
        self.counters.snapshot()
    }

    /// Drop a session whose thread exited on its own.
    fn reap(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.handle.join();
        }
    }
}

impl Drop for CaptiveDns {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Responder thread ──────────────────────────────────────────

fn run(ctx: ServeCtx) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let task = executor.spawn(serve(ctx));
    futures_lite::future::block_on(executor.run(task));
}

async fn serve(ctx: ServeCtx) {
    let mut buf = [0u8; MAX_MESSAGE];
    debug!("dns: serve loop started");

    while ctx.running.load(Ordering::Acquire) {
        let wake = futures_lite::future::or(
            async { Wake::Datagram(ctx.socket.recv_from(&mut buf).await) },
            futures_lite::future::or(
                async {
                    Timer::after(ctx.recv_timeout).await;
                    Wake::Idle
                },
                async {
                    ctx.stop.wait().await;
                    Wake::Stop
                },
            ),
        )
        .await;

        match wake {
            Wake::Stop => break,
            Wake::Idle => {}
            Wake::Datagram(Ok((len, peer))) => answer(&ctx, &buf[..len], peer).await,
            Wake::Datagram(Err(e)) => {
                ctx.counters.recv_errors.fetch_add(1, Ordering::Relaxed);
                if ctx.running.load(Ordering::Acquire) {
                    debug!("dns: recv failed: {e}");
                    Timer::after(RECV_ERROR_BACKOFF).await;
                }
            }
        }
    }

    debug!("dns: serve loop exited");
}

async fn answer(ctx: &ServeCtx, query: &[u8], peer: SocketAddr) {
    match dns::build_response(query, ctx.redirect) {
        Ok(resp) => match ctx.socket.send_to(&resp, peer).await {
            Ok(_) => {
                ctx.counters.answered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => debug!("dns: send to {peer} failed: {e}"),
        },
        Err(why) => {
            ctx.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("dns: dropped {} bytes from {peer}: {why}", query.len());
        }
    }
}
