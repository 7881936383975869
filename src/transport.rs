//! The transport seam between the decoder and the network.
//!
//! The decoder never blocks: reads are best-effort and report `WouldBlock` when nothing is
//! available, which the buffer layer turns into a "wait for more data" signal.

use std::io::{Read, Write};
use std::net::TcpStream;

/// A bidirectional byte transport. `read` follows non-blocking socket semantics: `Ok(0)` means
/// the peer closed the connection, `ErrorKind::WouldBlock` means no data is available right now.
pub trait Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
}

/// A TCP transport in non-blocking mode.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16) -> std::io::Result<TcpTransport> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        log::info!("connected to {}:{}", host, port);
        Ok(TcpTransport { stream })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        // The socket is non-blocking and outbound messages are at most a few dozen bytes, so a
        // full send buffer resolves within a few retries.
        let mut remaining = buf;
        while !remaining.is_empty() {
            match self.stream.write(remaining) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "transport refused to accept more bytes",
                    ))
                }
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // Let the kernel drain the send buffer instead of spinning on it.
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
