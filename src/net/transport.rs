//! Transport boundary.
//!
//! The wire protocol lives elsewhere; this module only defines what the
//! timeout subsystem needs from a transport, plus a TCP implementation.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};

/// The byte stream underneath a connection.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Tear the transport down immediately, interrupting any blocked I/O.
    /// Must be safe to call from any thread and more than once.
    fn hard_terminate(&self);

    /// Graceful close. Defaults to a hard termination.
    fn close(&self) -> io::Result<()> {
        self.hard_terminate();
        Ok(())
    }
}

/// A TCP transport usable from several threads at once.
///
/// Reads and writes go through `&TcpStream`, so one thread may block in
/// [`TcpTransport::read`] while another calls [`Transport::hard_terminate`].
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    terminated: AtomicBool,
}

impl TcpTransport {
    /// Connect to `addr`.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Self::from_stream(TcpStream::connect(addr)?)
    }

    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            terminated: AtomicBool::new(false),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Blocking read. After a hard termination the resulting end-of-stream
    /// is reported as `ConnectionAborted` rather than a clean EOF.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let result = (&self.stream).read(buf);
        match result {
            Ok(0) if !buf.is_empty() && self.is_terminated() => Err(terminated_error()),
            Err(_) if self.is_terminated() => Err(terminated_error()),
            other => other,
        }
    }

    /// Blocking write of the whole buffer.
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        if self.is_terminated() {
            return Err(terminated_error());
        }
        (&self.stream).write_all(buf)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl Transport for TcpTransport {
    fn hard_terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!(peer = %self.peer, error = %e, "Socket shutdown failed");
            }
        }
    }

    fn close(&self) -> io::Result<()> {
        self.terminated.store(true, Ordering::Release);
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

fn terminated_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "transport terminated")
}

/// Transport that only counts terminations.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingTransport {
    pub(crate) terminations: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CountingTransport {
    pub(crate) fn count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Transport for CountingTransport {
    fn hard_terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn hard_terminate_unblocks_reader() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = Arc::new(TcpTransport::connect(addr).unwrap());
        // Keep the peer open but silent.
        let (_peer, _) = listener.accept().unwrap();

        let reader = transport.clone();
        let start = Instant::now();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.read(&mut buf)
        });

        thread::sleep(Duration::from_millis(100));
        transport.hard_terminate();

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(transport.write_all(b"x").is_err());
    }

    #[test]
    fn reads_peer_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = TcpTransport::connect(addr).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        peer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        let n = transport.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &b"ping"[..n]);
        assert_eq!(transport.peer_addr(), addr);
    }
}
