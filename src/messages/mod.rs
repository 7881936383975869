//! Parsers and encoders for RFB messages.

pub mod client;
pub(crate) mod io;
pub mod server;

use std::fmt::Display;

use bytes::{Buf, BufMut, BytesMut};

/// An error for the message parsers. `Incomplete` is used to signal that the buffer from where the
/// message is being parsed does not contain enough data to parse a full message.
#[derive(Debug)]
pub enum Error {
    Incomplete,
    Other(anyhow::Error),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Incomplete => "stream ended early".fmt(fmt),
            Error::Other(err) => err.fmt(fmt),
        }
    }
}

/// The RFB protocol version negotiated during the handshake. The client speaks 3.3 through 3.8;
/// anything the server reports above 3.8 is clamped down to 3.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

/// The highest version this client speaks.
pub const CLIENT_VERSION: ProtocolVersion = ProtocolVersion { major: 3, minor: 8 };

impl ProtocolVersion {
    /// Parses the fixed 12-byte `"RFB XXX.YYY\n"` version line.
    pub fn parse(raw: &[u8; 12]) -> Result<ProtocolVersion, Error> {
        if &raw[0..4] != b"RFB " || raw[7] != b'.' || raw[11] != b'\n' {
            return Err(Error::Other(anyhow::anyhow!(
                "malformed version line: {:?}",
                String::from_utf8_lossy(raw)
            )));
        }
        let digits = |bytes: &[u8]| -> Result<u16, Error> {
            std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    Error::Other(anyhow::anyhow!("non-numeric version digits: {:?}", bytes))
                })
        };
        Ok(ProtocolVersion {
            major: digits(&raw[4..7])?,
            minor: digits(&raw[8..11])?,
        })
    }

    /// Serializes the version back into its 12-byte wire form.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(format!("RFB {:03}.{:03}\n", self.major, self.minor).as_bytes());
    }

    /// Whether the server offers a security-type list (3.7+) instead of dictating a single type.
    pub fn has_security_type_list(&self) -> bool {
        *self >= ProtocolVersion { major: 3, minor: 7 }
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}.{}", self.major, self.minor)
    }
}

/// Classification of a [`PixelFormat`] used to pick a decode path. Anything that is not one of
/// the two recognized layouts decodes through the generic path as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Unknown,
    Rgb332,
    XRgb,
}

/// A structure that represents how pixel values are represented in `FramebufferUpdate` messages.
///
/// This is documented at
/// https://github.com/rfbproto/rfbproto/blob/master/rfbproto.rst#setpixelformat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian_flag: u8,
    pub true_colour_flag: u8,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    pub fn new(buf: &[u8]) -> PixelFormat {
        let mut cur = std::io::Cursor::new(buf);
        PixelFormat {
            bits_per_pixel: cur.get_u8(),
            depth: cur.get_u8(),
            big_endian_flag: cur.get_u8(),
            true_colour_flag: cur.get_u8(),
            red_max: cur.get_u16(),
            green_max: cur.get_u16(),
            blue_max: cur.get_u16(),
            red_shift: cur.get_u8(),
            green_shift: cur.get_u8(),
            blue_shift: cur.get_u8(),
        }
    }

    /// The 32-bit xRGB layout: 8 bits per channel, red in the third byte.
    pub fn xrgb() -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// The 8-bit 3:3:2 layout.
    pub fn rgb332() -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 8,
            depth: 8,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 7,
            green_max: 7,
            blue_max: 3,
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
        }
    }

    pub fn for_image_format(format: ImageFormat, server_default: &PixelFormat) -> PixelFormat {
        match format {
            ImageFormat::Rgb332 => PixelFormat::rgb332(),
            ImageFormat::XRgb => PixelFormat::xrgb(),
            ImageFormat::Unknown => server_default.clone(),
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        if *self == PixelFormat::xrgb() {
            ImageFormat::XRgb
        } else if *self == PixelFormat::rgb332() {
            ImageFormat::Rgb332
        } else {
            ImageFormat::Unknown
        }
    }

    /// Bytes each pixel occupies on the wire.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Serializes into the 16-byte wire form (13 value bytes plus 3 padding bytes).
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(self.depth);
        buf.put_u8(self.big_endian_flag);
        buf.put_u8(self.true_colour_flag);
        buf.put_u16(self.red_max);
        buf.put_u16(self.green_max);
        buf.put_u16(self.blue_max);
        buf.put_u8(self.red_shift);
        buf.put_u8(self.green_shift);
        buf.put_u8(self.blue_shift);
        buf.put_bytes(0, 3);
    }
}
