//! Shared utilities for integration tests.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;

use netguard::Transport;

/// Transport whose "network calls" are timed sleeps that a hard
/// termination cuts short, standing in for a slow server.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    terminated: Mutex<bool>,
    wake: Condvar,
    terminations: AtomicUsize,
}

impl SimulatedTransport {
    /// Block like a round trip that takes `duration` on the server.
    #[allow(dead_code)]
    pub fn round_trip(&self, duration: Duration) -> io::Result<()> {
        let terminated = self.terminated.lock().unwrap();
        let (terminated, _) = self
            .wake
            .wait_timeout_while(terminated, duration, |t| !*t)
            .unwrap();
        if *terminated {
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "terminated"))
        } else {
            Ok(())
        }
    }

    #[allow(dead_code)]
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl Transport for SimulatedTransport {
    fn hard_terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        *self.terminated.lock().unwrap() = true;
        self.wake.notify_all();
    }
}

/// Start a TCP peer that accepts connections and never sends anything.
#[allow(dead_code)]
pub fn start_silent_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let mut held: Vec<TcpStream> = Vec::new();
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => held.push(stream),
                Err(_) => break,
            }
        }
    });

    addr
}
