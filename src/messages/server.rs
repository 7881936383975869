//! Parsers for messages sent from the server to the client.
//!
//! Rectangle bodies are parsed in full from a cursor over buffered bytes; when the buffer does
//! not yet hold a complete body the parser returns [`Error::Incomplete`] without any side
//! effects, so a later attempt restarts from the exact same position. Decoded pixel data is
//! returned as [`RectOp`]s and only delivered once the whole body has been consumed.

use super::io::*;
use super::Error;

use anyhow::{anyhow, Result};

// Server-to-client message ids.
pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;

// Hextile subencoding mask bits.
const HEXTILE_RAW: u8 = 1 << 0;
const HEXTILE_BACKGROUND_SPECIFIED: u8 = 1 << 1;
const HEXTILE_FOREGROUND_SPECIFIED: u8 = 1 << 2;
const HEXTILE_ANY_SUBRECTS: u8 = 1 << 3;
const HEXTILE_SUBRECTS_COLOURED: u8 = 1 << 4;

/// The rectangle encodings this client can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    CopyRect,
    Rre,
    CoRre,
    Hextile,
}

impl Encoding {
    pub fn from_id(id: i32) -> Option<Encoding> {
        match id {
            0 => Some(Encoding::Raw),
            1 => Some(Encoding::CopyRect),
            2 => Some(Encoding::Rre),
            4 => Some(Encoding::CoRre),
            5 => Some(Encoding::Hextile),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Encoding::Raw => 0,
            Encoding::CopyRect => 1,
            Encoding::Rre => 2,
            Encoding::CoRre => 4,
            Encoding::Hextile => 5,
        }
    }
}

/// The security type negotiated once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityType {
    None,
    VncAuthentication,
}

impl SecurityType {
    pub fn from_id(id: u8) -> Option<SecurityType> {
        match id {
            1 => Some(SecurityType::None),
            2 => Some(SecurityType::VncAuthentication),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            SecurityType::None => 1,
            SecurityType::VncAuthentication => 2,
        }
    }
}

/// The security-type offer a 3.7+ server makes after the version exchange. A zero-length list
/// means the server refused the connection and carries a reason string instead.
#[derive(Debug)]
pub enum SecurityTypes {
    Offered(Vec<u8>),
    Refused(String),
}

impl SecurityTypes {
    pub(crate) fn parse(src: &mut std::io::Cursor<&[u8]>) -> Result<SecurityTypes, Error> {
        let count = get_u8(src)? as usize;
        if count == 0 {
            let reason_length = get_u32(src)? as usize;
            check_message_length(reason_length)?;
            let reason = read_bytes(src, reason_length)?;
            return Ok(SecurityTypes::Refused(
                String::from_utf8_lossy(&reason).into_owned(),
            ));
        }
        Ok(SecurityTypes::Offered(read_bytes(src, count)?))
    }
}

/// The `ServerInit` message: framebuffer geometry, the server's native pixel format, and the
/// server-declared desktop name.
#[derive(Debug)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub pixel_format: super::PixelFormat,
    pub name: String,
}

impl ServerInit {
    pub(crate) fn parse(src: &mut std::io::Cursor<&[u8]>) -> Result<ServerInit, Error> {
        let width = get_u16(src)?;
        let height = get_u16(src)?;
        let format_bytes = read_bytes(src, 16)?;
        let pixel_format = super::PixelFormat::new(&format_bytes);
        let name_length = get_u32(src)? as usize;
        check_message_length(name_length)?;
        let name = read_bytes(src, name_length)?;
        Ok(ServerInit {
            width,
            height,
            pixel_format,
            name: String::from_utf8_lossy(&name).into_owned(),
        })
    }
}

/// Parses the 4-byte `FramebufferUpdate` header (id, padding, rectangle count). The caller has
/// already matched the message id.
pub(crate) fn parse_update_header(src: &mut std::io::Cursor<&[u8]>) -> Result<u16, Error> {
    skip(src, 2)?; // id + padding
    get_u16(src)
}

/// Consumes a `SetColourMapEntries` message. The palette itself is ignored; this client only
/// negotiates true-colour formats.
pub(crate) fn parse_colour_map_entries(src: &mut std::io::Cursor<&[u8]>) -> Result<u16, Error> {
    skip(src, 4)?; // id, padding, first colour
    let number_of_colours = get_u16(src)?;
    skip(src, number_of_colours as usize * 6)?;
    Ok(number_of_colours)
}

/// Consumes a standard `ServerCutText` message. The extended (negative length) clipboard form is
/// an extension this client does not speak.
pub(crate) fn parse_server_cut_text(src: &mut std::io::Cursor<&[u8]>) -> Result<usize, Error> {
    skip(src, 4)?; // id + padding
    let length = get_i32(src)?;
    if length < 0 {
        return Err(Error::Other(anyhow!(
            "extended clipboard message is not supported: {}",
            length
        )));
    }
    check_message_length(length as usize)?;
    skip(src, length as usize)?;
    Ok(length as usize)
}

/// A rectangle header from a `FramebufferUpdate`. The encoding id is kept raw so the caller can
/// report unsupported values.
#[derive(Debug, Clone, Copy)]
pub struct RectHeader {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding_id: i32,
}

impl RectHeader {
    pub(crate) fn parse(src: &mut std::io::Cursor<&[u8]>) -> Result<RectHeader, Error> {
        Ok(RectHeader {
            x: get_u16(src)?,
            y: get_u16(src)?,
            width: get_u16(src)?,
            height: get_u16(src)?,
            encoding_id: get_i32(src)?,
        })
    }
}

/// A decoded rectangle body, ready to be delivered to the consumer.
#[derive(Debug, PartialEq, Eq)]
pub enum RectOp {
    /// Paint `width * height` pixels (in wire pixel layout) at the given position.
    Paint {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        pixels: Vec<u8>,
    },
    /// Copy an already-painted region of the framebuffer.
    Copy {
        dst_x: u16,
        dst_y: u16,
        width: u16,
        height: u16,
        src_x: u16,
        src_y: u16,
    },
}

/// Parses one rectangle body. Consumes exactly the bytes the encoding declares for `rect`, so a
/// successful return leaves the cursor at the start of the next rectangle header.
pub(crate) fn parse_rect_body(
    src: &mut std::io::Cursor<&[u8]>,
    rect: &RectHeader,
    encoding: Encoding,
    bytes_per_pixel: usize,
) -> Result<RectOp, Error> {
    match encoding {
        Encoding::Raw => parse_raw(src, rect, bytes_per_pixel),
        Encoding::CopyRect => parse_copy_rect(src, rect),
        Encoding::Rre => parse_rre(src, rect, bytes_per_pixel, false),
        Encoding::CoRre => parse_rre(src, rect, bytes_per_pixel, true),
        Encoding::Hextile => parse_hextile(src, rect, bytes_per_pixel),
    }
}

fn parse_raw(
    src: &mut std::io::Cursor<&[u8]>,
    rect: &RectHeader,
    bytes_per_pixel: usize,
) -> Result<RectOp, Error> {
    let length = rect.width as usize * rect.height as usize * bytes_per_pixel;
    check_message_length(length)?;
    let pixels = read_bytes(src, length)?;
    Ok(RectOp::Paint {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        pixels,
    })
}

fn parse_copy_rect(src: &mut std::io::Cursor<&[u8]>, rect: &RectHeader) -> Result<RectOp, Error> {
    let src_x = get_u16(src)?;
    let src_y = get_u16(src)?;
    Ok(RectOp::Copy {
        dst_x: rect.x,
        dst_y: rect.y,
        width: rect.width,
        height: rect.height,
        src_x,
        src_y,
    })
}

/// RRE and CoRRE share the two-phase paint: the whole rectangle takes the background pixel, then
/// each subrectangle is painted over it. CoRRE packs subrectangle geometry into single bytes.
fn parse_rre(
    src: &mut std::io::Cursor<&[u8]>,
    rect: &RectHeader,
    bytes_per_pixel: usize,
    compact: bool,
) -> Result<RectOp, Error> {
    check_message_length(rect.width as usize * rect.height as usize * bytes_per_pixel)?;
    let number_of_subrects = get_u32(src)? as usize;
    let geometry_size = if compact { 4 } else { 8 };
    check_message_length(number_of_subrects.saturating_mul(bytes_per_pixel + geometry_size))?;

    let background = read_bytes(src, bytes_per_pixel)?;
    let mut pixels = tile_filled_with(rect.width as usize, rect.height as usize, &background);

    for _ in 0..number_of_subrects {
        let pixel = read_bytes(src, bytes_per_pixel)?;
        let (sx, sy, sw, sh) = if compact {
            (
                get_u8(src)? as usize,
                get_u8(src)? as usize,
                get_u8(src)? as usize,
                get_u8(src)? as usize,
            )
        } else {
            (
                get_u16(src)? as usize,
                get_u16(src)? as usize,
                get_u16(src)? as usize,
                get_u16(src)? as usize,
            )
        };
        if sx + sw > rect.width as usize || sy + sh > rect.height as usize {
            return Err(Error::Other(anyhow!(
                "subrectangle {}x{}+{}+{} exceeds its {}x{} rectangle",
                sw,
                sh,
                sx,
                sy,
                rect.width,
                rect.height
            )));
        }
        fill(
            &mut pixels,
            rect.width as usize,
            bytes_per_pixel,
            sx,
            sy,
            sw,
            sh,
            &pixel,
        );
    }

    Ok(RectOp::Paint {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        pixels,
    })
}

/// Hextile tiles the rectangle into 16x16 blocks (clipped at the right/bottom edges), processed
/// row-major. Background and foreground colours carry over from the previous tile when a tile
/// does not respecify them; a raw tile invalidates neither.
fn parse_hextile(
    src: &mut std::io::Cursor<&[u8]>,
    rect: &RectHeader,
    bytes_per_pixel: usize,
) -> Result<RectOp, Error> {
    let width = rect.width as usize;
    let height = rect.height as usize;
    check_message_length(width * height * bytes_per_pixel)?;
    let mut pixels = vec![0u8; width * height * bytes_per_pixel];

    // Carried across tiles, scoped to this rectangle.
    let mut background = vec![0u8; bytes_per_pixel];
    let mut foreground = vec![0u8; bytes_per_pixel];

    for tile_y in (0..height).step_by(16) {
        for tile_x in (0..width).step_by(16) {
            let tile_w = std::cmp::min(16, width - tile_x);
            let tile_h = std::cmp::min(16, height - tile_y);

            let subencoding = get_u8(src)?;

            if subencoding & HEXTILE_RAW != 0 {
                // Raw overrides every other bit for this tile.
                let raw = read_bytes(src, tile_w * tile_h * bytes_per_pixel)?;
                for row in 0..tile_h {
                    let src_offset = row * tile_w * bytes_per_pixel;
                    let dst_offset = ((tile_y + row) * width + tile_x) * bytes_per_pixel;
                    pixels[dst_offset..dst_offset + tile_w * bytes_per_pixel]
                        .copy_from_slice(&raw[src_offset..src_offset + tile_w * bytes_per_pixel]);
                }
                continue;
            }

            if subencoding & HEXTILE_BACKGROUND_SPECIFIED != 0 {
                background = read_bytes(src, bytes_per_pixel)?;
            }
            fill(
                &mut pixels,
                width,
                bytes_per_pixel,
                tile_x,
                tile_y,
                tile_w,
                tile_h,
                &background,
            );

            if subencoding & HEXTILE_FOREGROUND_SPECIFIED != 0 {
                foreground = read_bytes(src, bytes_per_pixel)?;
            }

            if subencoding & HEXTILE_ANY_SUBRECTS != 0 {
                let number_of_subrects = get_u8(src)? as usize;
                for _ in 0..number_of_subrects {
                    let pixel = if subencoding & HEXTILE_SUBRECTS_COLOURED != 0 {
                        read_bytes(src, bytes_per_pixel)?
                    } else {
                        foreground.clone()
                    };
                    let xy = get_u8(src)? as usize;
                    let wh = get_u8(src)? as usize;
                    let sx = xy >> 4;
                    let sy = xy & 0x0f;
                    let sw = (wh >> 4) + 1;
                    let sh = (wh & 0x0f) + 1;
                    if sx + sw > tile_w || sy + sh > tile_h {
                        return Err(Error::Other(anyhow!(
                            "hextile subrectangle {}x{}+{}+{} exceeds its {}x{} tile",
                            sw,
                            sh,
                            sx,
                            sy,
                            tile_w,
                            tile_h
                        )));
                    }
                    fill(
                        &mut pixels,
                        width,
                        bytes_per_pixel,
                        tile_x + sx,
                        tile_y + sy,
                        sw,
                        sh,
                        &pixel,
                    );
                }
            }
        }
    }

    Ok(RectOp::Paint {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        pixels,
    })
}

fn tile_filled_with(width: usize, height: usize, pixel: &[u8]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * pixel.len());
    for _ in 0..width * height {
        pixels.extend_from_slice(pixel);
    }
    pixels
}

#[allow(clippy::too_many_arguments)]
fn fill(
    pixels: &mut [u8],
    stride: usize,
    bytes_per_pixel: usize,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    pixel: &[u8],
) {
    for row in y..y + h {
        for col in x..x + w {
            let offset = (row * stride + col) * bytes_per_pixel;
            pixels[offset..offset + bytes_per_pixel].copy_from_slice(pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(width: u16, height: u16, encoding: Encoding) -> RectHeader {
        RectHeader {
            x: 0,
            y: 0,
            width,
            height,
            encoding_id: encoding.id(),
        }
    }

    #[test]
    fn test_raw_consumes_exact_length() -> Result<(), Error> {
        let body: Vec<u8> = (0..32).collect();
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(&mut cur, &rect(4, 2, Encoding::Raw), Encoding::Raw, 4)?;
        assert_eq!(cur.position(), 32);
        match op {
            RectOp::Paint {
                width,
                height,
                pixels,
                ..
            } => {
                assert_eq!((width, height), (4, 2));
                assert_eq!(pixels, body);
            }
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_raw_incomplete() {
        let body = [0u8; 31];
        let mut cur = std::io::Cursor::new(&body[..]);
        assert!(matches!(
            parse_rect_body(&mut cur, &rect(4, 2, Encoding::Raw), Encoding::Raw, 4),
            Err(Error::Incomplete)
        ));
    }

    #[test]
    fn test_copy_rect() -> Result<(), Error> {
        let body = [0x00, 0x10, 0x00, 0x20];
        let mut cur = std::io::Cursor::new(&body[..]);
        let header = RectHeader {
            x: 5,
            y: 6,
            width: 7,
            height: 8,
            encoding_id: 1,
        };
        let op = parse_rect_body(&mut cur, &header, Encoding::CopyRect, 4)?;
        assert_eq!(cur.position(), 4);
        assert_eq!(
            op,
            RectOp::Copy {
                dst_x: 5,
                dst_y: 6,
                width: 7,
                height: 8,
                src_x: 0x10,
                src_y: 0x20,
            }
        );
        Ok(())
    }

    #[test]
    fn test_rre_background_only() -> Result<(), Error> {
        // Zero subrectangles, 2x2 at 1bpp with background 0xaa.
        let body = [0, 0, 0, 0, 0xaa];
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(&mut cur, &rect(2, 2, Encoding::Rre), Encoding::Rre, 1)?;
        assert_eq!(cur.position(), 5);
        match op {
            RectOp::Paint { pixels, .. } => assert_eq!(pixels, vec![0xaa; 4]),
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_rre_subrect_paint() -> Result<(), Error> {
        // One 1x1 subrectangle of 0xbb at (1, 0) over an 0xaa background, 2x1 at 1bpp.
        let body = [
            0, 0, 0, 1, // subrect count
            0xaa, // background
            0xbb, // subrect pixel
            0, 1, 0, 0, 0, 1, 0, 1, // x=1 y=0 w=1 h=1
        ];
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(&mut cur, &rect(2, 1, Encoding::Rre), Encoding::Rre, 1)?;
        assert_eq!(cur.position() as usize, body.len());
        match op {
            RectOp::Paint { pixels, .. } => assert_eq!(pixels, vec![0xaa, 0xbb]),
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_rre_subrect_out_of_bounds() {
        let body = [
            0, 0, 0, 1, // subrect count
            0xaa, 0xbb, //
            0, 1, 0, 0, 0, 4, 0, 1, // x=1 w=4 exceeds width 2
        ];
        let mut cur = std::io::Cursor::new(&body[..]);
        assert!(matches!(
            parse_rect_body(&mut cur, &rect(2, 1, Encoding::Rre), Encoding::Rre, 1),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn test_rre_rejects_oversized_rectangle() {
        // A rectangle whose declared area blows the message-length cap must be rejected before
        // the background pixel buffer is allocated, not after.
        let body = [
            0, 0, 0, 1, // subrect count
            0xaa, 0xaa, 0xaa, 0xaa, // background
            0xbb, 0xbb, 0xbb, 0xbb, // subrect pixel
            0, 0, 0, 0, 0, 1, 0, 1, // x=0 y=0 w=1 h=1
        ];
        let huge = rect(65535, 65535, Encoding::Rre);
        for encoding in [Encoding::Rre, Encoding::CoRre] {
            let mut cur = std::io::Cursor::new(&body[..]);
            assert!(matches!(
                parse_rect_body(&mut cur, &huge, encoding, 4),
                Err(Error::Other(_))
            ));
        }
    }

    #[test]
    fn test_corre_compact_geometry() -> Result<(), Error> {
        // Same paint as test_rre_subrect_paint, with single-byte geometry.
        let body = [
            0, 0, 0, 1, // subrect count
            0xaa, // background
            0xbb, // subrect pixel
            1, 0, 1, 1, // x=1 y=0 w=1 h=1
        ];
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(&mut cur, &rect(2, 1, Encoding::CoRre), Encoding::CoRre, 1)?;
        assert_eq!(cur.position() as usize, body.len());
        match op {
            RectOp::Paint { pixels, .. } => assert_eq!(pixels, vec![0xaa, 0xbb]),
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_hextile_raw_tile_consumes_exact_length() -> Result<(), Error> {
        // A full 16x16 tile at 1bpp with the raw bit set (plus stray bits that must be
        // ignored) consumes exactly 1 + 256 bytes.
        let mut body = vec![HEXTILE_RAW | HEXTILE_BACKGROUND_SPECIFIED | HEXTILE_ANY_SUBRECTS];
        body.extend((0..=255u8).collect::<Vec<u8>>());
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(
            &mut cur,
            &rect(16, 16, Encoding::Hextile),
            Encoding::Hextile,
            1,
        )?;
        assert_eq!(cur.position() as usize, 1 + 256);
        match op {
            RectOp::Paint { pixels, .. } => {
                assert_eq!(pixels, (0..=255u8).collect::<Vec<u8>>());
            }
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_hextile_colour_carry_over() -> Result<(), Error> {
        // Two 16x16 tiles side by side at 1bpp. The first tile specifies background 0x11 and
        // foreground 0x22 with one subrect; the second specifies neither and must reuse both.
        let body = [
            HEXTILE_BACKGROUND_SPECIFIED | HEXTILE_FOREGROUND_SPECIFIED | HEXTILE_ANY_SUBRECTS,
            0x11, // background
            0x22, // foreground
            1,    // one subrect
            0x00, // x=0 y=0
            0x00, // w=1 h=1
            HEXTILE_ANY_SUBRECTS,
            1,    // one subrect
            0x00, // x=0 y=0
            0x00, // w=1 h=1
        ];
        let mut cur = std::io::Cursor::new(&body[..]);
        let op = parse_rect_body(
            &mut cur,
            &rect(32, 16, Encoding::Hextile),
            Encoding::Hextile,
            1,
        )?;
        assert_eq!(cur.position() as usize, body.len());
        match op {
            RectOp::Paint { pixels, .. } => {
                // Both tiles: background everywhere except a foreground pixel at their origin.
                assert_eq!(pixels[0], 0x22);
                assert_eq!(pixels[1], 0x11);
                assert_eq!(pixels[16], 0x22);
                assert_eq!(pixels[17], 0x11);
                assert_eq!(pixels[32], 0x11);
            }
            op => panic!("unexpected op: {:?}", op),
        }
        Ok(())
    }

    #[test]
    fn test_hextile_incomplete_mid_tile() {
        // Second tile's subencoding byte is missing.
        let body = [HEXTILE_BACKGROUND_SPECIFIED, 0x11];
        let mut cur = std::io::Cursor::new(&body[..]);
        assert!(matches!(
            parse_rect_body(
                &mut cur,
                &rect(32, 16, Encoding::Hextile),
                Encoding::Hextile,
                1
            ),
            Err(Error::Incomplete)
        ));
    }

    #[test]
    fn test_rect_header_parse() -> Result<(), Error> {
        let body = [
            0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x00, 0x00, 0x05,
        ];
        let mut cur = std::io::Cursor::new(&body[..]);
        let header = RectHeader::parse(&mut cur)?;
        assert_eq!(
            (header.x, header.y, header.width, header.height),
            (1, 2, 3, 4)
        );
        assert_eq!(header.encoding_id, 5);
        assert_eq!(Encoding::from_id(header.encoding_id), Some(Encoding::Hextile));
        assert_eq!(Encoding::from_id(99), None);
        Ok(())
    }

    #[test]
    fn test_server_init_parse() -> Result<(), Error> {
        let mut body = vec![0x03, 0x20, 0x02, 0x58]; // 800x600
        let mut format = bytes::BytesMut::new();
        super::super::PixelFormat::xrgb().write_to(&mut format);
        body.extend_from_slice(&format);
        body.extend_from_slice(&[0, 0, 0, 4]);
        body.extend_from_slice(b"orac");
        let mut cur = std::io::Cursor::new(&body[..]);
        let init = ServerInit::parse(&mut cur)?;
        assert_eq!((init.width, init.height), (800, 600));
        assert_eq!(init.pixel_format, super::super::PixelFormat::xrgb());
        assert_eq!(init.name, "orac");
        Ok(())
    }

    #[test]
    fn test_server_init_incomplete_name() {
        let mut body = vec![0x03, 0x20, 0x02, 0x58];
        let mut format = bytes::BytesMut::new();
        super::super::PixelFormat::xrgb().write_to(&mut format);
        body.extend_from_slice(&format);
        body.extend_from_slice(&[0, 0, 0, 10]);
        body.extend_from_slice(b"orac"); // 6 bytes short
        let mut cur = std::io::Cursor::new(&body[..]);
        assert!(matches!(ServerInit::parse(&mut cur), Err(Error::Incomplete)));
    }

    #[test]
    fn test_security_types_offered() -> Result<(), Error> {
        let body = [2, 1, 2];
        let mut cur = std::io::Cursor::new(&body[..]);
        match SecurityTypes::parse(&mut cur)? {
            SecurityTypes::Offered(types) => assert_eq!(types, vec![1, 2]),
            offer => panic!("unexpected offer: {:?}", offer),
        }
        Ok(())
    }

    #[test]
    fn test_security_types_refused() -> Result<(), Error> {
        let mut body = vec![0, 0, 0, 0, 7];
        body.extend_from_slice(b"go away");
        let mut cur = std::io::Cursor::new(&body[..]);
        match SecurityTypes::parse(&mut cur)? {
            SecurityTypes::Refused(reason) => assert_eq!(reason, "go away"),
            offer => panic!("unexpected offer: {:?}", offer),
        }
        Ok(())
    }

    #[test]
    fn test_colour_map_entries_skip() -> Result<(), Error> {
        let mut body = vec![1, 0, 0, 0, 0, 2];
        body.extend_from_slice(&[0u8; 12]);
        let mut cur = std::io::Cursor::new(&body[..]);
        assert_eq!(parse_colour_map_entries(&mut cur)?, 2);
        assert_eq!(cur.position() as usize, body.len());
        Ok(())
    }

    #[test]
    fn test_server_cut_text_skip() -> Result<(), Error> {
        let mut body = vec![3, 0, 0, 0, 0, 0, 0, 5];
        body.extend_from_slice(b"hello");
        let mut cur = std::io::Cursor::new(&body[..]);
        assert_eq!(parse_server_cut_text(&mut cur)?, 5);
        assert_eq!(cur.position() as usize, body.len());
        Ok(())
    }

    #[test]
    fn test_server_cut_text_extended_rejected() {
        let body = [3, 0, 0, 0, 0xff, 0xff, 0xff, 0xf8];
        let mut cur = std::io::Cursor::new(&body[..]);
        assert!(matches!(
            parse_server_cut_text(&mut cur),
            Err(Error::Other(_))
        ));
    }
}
