//! Messages sent from the client to the server.

use super::server::Encoding;
use super::PixelFormat;

use std::fmt::Display;

use bytes::{BufMut, BytesMut};

/// The encodings this client declares, in preference order. Raw is the universal fallback and is
/// always last.
pub const SUPPORTED_ENCODINGS: [Encoding; 5] = [
    Encoding::CopyRect,
    Encoding::Hextile,
    Encoding::Rre,
    Encoding::CoRre,
    Encoding::Raw,
];

/// Represents a message that is sent from the client to the server.
#[derive(Debug)]
pub enum Message {
    /// The 1-byte ClientInit handshake message. Not numbered; it can only appear once, right
    /// after the security handshake.
    ClientInit { shared: bool },
    SetPixelFormat(PixelFormat),
    SetEncodings(Vec<Encoding>),
    FramebufferUpdateRequest {
        incremental: bool,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
    KeyEvent { down: bool, keysym: u32 },
    PointerEvent { button_mask: u8, x: u16, y: u16 },
}

impl Display for Message {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Message::*;

        match self {
            SetEncodings(encodings) => {
                write!(fmt, "SetEncodings(")?;
                for encoding in encodings {
                    write!(fmt, " {}", encoding.id())?;
                }
                write!(fmt, " )")
            }
            m => {
                write!(fmt, "{:?}", m)
            }
        }
    }
}

impl Message {
    /// Serializes the message into its wire layout.
    pub fn write_to(&self, buf: &mut BytesMut) {
        use Message::*;

        match self {
            ClientInit { shared } => {
                buf.put_u8(u8::from(*shared));
            }
            SetPixelFormat(format) => {
                buf.put_u8(0);
                buf.put_bytes(0, 3);
                format.write_to(buf);
            }
            SetEncodings(encodings) => {
                buf.put_u8(2);
                buf.put_u8(0);
                buf.put_u16(encodings.len() as u16);
                for encoding in encodings {
                    buf.put_i32(encoding.id());
                }
            }
            FramebufferUpdateRequest {
                incremental,
                x,
                y,
                width,
                height,
            } => {
                buf.put_u8(3);
                buf.put_u8(u8::from(*incremental));
                buf.put_u16(*x);
                buf.put_u16(*y);
                buf.put_u16(*width);
                buf.put_u16(*height);
            }
            KeyEvent { down, keysym } => {
                buf.put_u8(4);
                buf.put_u8(u8::from(*down));
                buf.put_bytes(0, 2);
                buf.put_u32(*keysym);
            }
            PointerEvent { button_mask, x, y } => {
                buf.put_u8(5);
                buf.put_u8(*button_mask);
                buf.put_u16(*x);
                buf.put_u16(*y);
            }
        }
    }

    /// Gets the raw u8 array representation of the message.
    pub fn into_data(self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.to_vec()
    }
}
