//! A client-side decoder for the Remote Framebuffer protocol (RFB, the protocol behind VNC).
//!
//! The crate drives the handshake, keeps a framebuffer update stream flowing, and decodes the
//! classic encodings (Raw, CopyRect, RRE, CoRRE, Hextile) into paint and copy callbacks on a
//! [`Surface`]. It never blocks: the [`Decoder`] makes progress whenever the transport has bytes
//! and reports [`Status::WaitingForData`] otherwise, so it slots into any poll loop.

pub mod auth;
pub mod buffer;
pub mod decoder;
pub mod messages;
pub mod transport;

pub use decoder::{Config, Decoder, SessionError, Status, Surface};
pub use messages::{ImageFormat, PixelFormat, ProtocolVersion};
pub use transport::{TcpTransport, Transport};
