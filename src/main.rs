//! A headless RFB client.
//!
//! Connects to an RFB server, performs the handshake, and keeps an in-memory copy of the remote
//! framebuffer up to date. Mostly useful for exercising servers and watching the protocol traffic
//! with `RUST_LOG=debug`.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use rfbclient::{Config, Decoder, ImageFormat, Status, Surface, TcpTransport};

/// Keeps the remote framebuffer in a flat pixel array, resizing lazily on the first paint.
struct Framebuffer {
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    pixels: Vec<u8>,
    updates: u64,
}

impl Framebuffer {
    fn new() -> Framebuffer {
        Framebuffer {
            width: 0,
            height: 0,
            bytes_per_pixel: 0,
            pixels: Vec::new(),
            updates: 0,
        }
    }

    fn resize(&mut self, width: u16, height: u16, bytes_per_pixel: usize) {
        self.width = width as usize;
        self.height = height as usize;
        self.bytes_per_pixel = bytes_per_pixel;
        self.pixels = vec![0; self.width * self.height * bytes_per_pixel];
    }
}

impl Surface for Framebuffer {
    fn paint_rect(&mut self, x: u16, y: u16, width: u16, height: u16, pixels: &[u8]) {
        let bpp = self.bytes_per_pixel;
        let row_len = width as usize * bpp;
        for row in 0..height as usize {
            let src = &pixels[row * row_len..(row + 1) * row_len];
            let offset = ((y as usize + row) * self.width + x as usize) * bpp;
            self.pixels[offset..offset + row_len].copy_from_slice(src);
        }
        self.updates += 1;
    }

    fn copy_rect(&mut self, dst_x: u16, dst_y: u16, width: u16, height: u16, src_x: u16, src_y: u16) {
        let bpp = self.bytes_per_pixel;
        let row_len = width as usize * bpp;
        // Copy through a scratch buffer since the regions may overlap.
        let mut scratch = vec![0; row_len * height as usize];
        for row in 0..height as usize {
            let offset = ((src_y as usize + row) * self.width + src_x as usize) * bpp;
            scratch[row * row_len..(row + 1) * row_len]
                .copy_from_slice(&self.pixels[offset..offset + row_len]);
        }
        for row in 0..height as usize {
            let offset = ((dst_y as usize + row) * self.width + dst_x as usize) * bpp;
            self.pixels[offset..offset + row_len]
                .copy_from_slice(&scratch[row * row_len..(row + 1) * row_len]);
        }
        self.updates += 1;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = clap::App::new("rfbclient")
        .about("A headless RFB (VNC) client")
        .arg(
            clap::Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .default_value("127.0.0.1")
                .help("The hostname of the RFB server")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("port")
                .long("port")
                .value_name("PORT")
                .default_value("5900")
                .help("The port the RFB server is listening on")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("password")
                .long("password")
                .takes_value(true)
                .help("The password to use if the server requires VNC authentication"),
        )
        .arg(
            clap::Arg::with_name("exclusive")
                .long("exclusive")
                .help("Ask the server to disconnect any other clients"),
        )
        .arg(
            clap::Arg::with_name("format")
                .long("format")
                .value_name("FORMAT")
                .possible_values(&["native", "xrgb", "rgb332"])
                .default_value("native")
                .help("The pixel format to request for framebuffer updates"),
        )
        .get_matches();

    let host = matches.value_of("host").context("--host is missing")?;
    let port: u16 = matches
        .value_of("port")
        .context("--port is missing")?
        .parse()
        .context("--port is not a valid port number")?;
    let image_format = match matches.value_of("format") {
        Some("xrgb") => ImageFormat::XRgb,
        Some("rgb332") => ImageFormat::Rgb332,
        _ => ImageFormat::Unknown,
    };

    let config = Config {
        password: matches.value_of("password").map(str::to_string),
        shared: !matches.is_present("exclusive"),
        image_format,
    };

    let transport =
        TcpTransport::connect(host, port).with_context(|| format!("connect to {}:{}", host, port))?;
    let mut decoder = Decoder::new(transport, config);
    let mut framebuffer = Framebuffer::new();
    let mut sized = false;

    loop {
        match decoder.iterate(&mut framebuffer) {
            Status::Progressed => {
                if !sized && decoder.is_inited() {
                    framebuffer.resize(
                        decoder.width(),
                        decoder.height(),
                        decoder.pixel_format().bytes_per_pixel(),
                    );
                    sized = true;
                    log::info!(
                        "session established with \"{}\" ({}x{})",
                        decoder.name(),
                        decoder.width(),
                        decoder.height()
                    );
                }
            }
            Status::WaitingForData => std::thread::sleep(Duration::from_millis(5)),
            Status::Fatal(err) => {
                log::info!("session ended after {} updates", framebuffer.updates);
                bail!("session failed: {}", err);
            }
        }
    }
}
