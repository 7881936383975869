//! The client-side session driver: handshake, framebuffer updates, and input events.
//!
//! The driver is cooperative. Each [`Decoder::iterate`] call drains whatever the transport has
//! available, then makes at most one unit of protocol progress (one handshake message or one
//! rectangle), so a poll loop can interleave it with other work.

use crate::auth;
use crate::buffer::StreamBuffer;
use crate::messages::client;
use crate::messages::server::{
    self, Encoding, RectHeader, RectOp, SecurityType, SecurityTypes, ServerInit,
};
use crate::messages::{Error, ImageFormat, PixelFormat, ProtocolVersion, CLIENT_VERSION};
use crate::transport::Transport;

use bytes::BytesMut;
use thiserror::Error as ThisError;

/// A fatal session error. Once one of these is raised the session is unrecoverable: the driver
/// latches it and every later call reports the same value.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("transport closed by peer")]
    TransportClosed,

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("protocol desynchronized: {0}")]
    ProtocolDesync(String),

    #[error("unsupported encoding {0}")]
    UnsupportedEncoding(i32),

    #[error("server offered no supported security type")]
    NoSupportedSecurityType,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// The outcome of one [`Decoder::iterate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// At least one protocol step completed; call again without waiting.
    Progressed,
    /// A message is only partially buffered; poll the transport before calling again.
    WaitingForData,
    /// The session is dead. Repeated calls keep returning the same error.
    Fatal(SessionError),
}

/// Consumer of decoded framebuffer contents. Pixels arrive in the negotiated wire layout; one
/// rectangle produces exactly one callback.
pub trait Surface {
    fn paint_rect(&mut self, x: u16, y: u16, width: u16, height: u16, pixels: &[u8]);
    fn copy_rect(&mut self, dst_x: u16, dst_y: u16, width: u16, height: u16, src_x: u16, src_y: u16);
}

/// Session parameters fixed before the handshake starts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Required if the server demands VNC authentication.
    pub password: Option<String>,
    /// Whether other clients may stay connected.
    pub shared: bool,
    /// The pixel layout to request. `Unknown` keeps the server's native format.
    pub image_format: ImageFormat,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            password: None,
            shared: true,
            image_format: ImageFormat::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    ServerVersion,
    SecurityTypes,
    AuthChallenge,
    SecurityResult,
    ServerInit,
    UpdateHeader,
    RectHeader,
    RectBody { rect: RectHeader, encoding: Encoding },
}

enum StepError {
    Incomplete,
    Fatal(SessionError),
}

impl From<Error> for StepError {
    fn from(err: Error) -> StepError {
        match err {
            Error::Incomplete => StepError::Incomplete,
            Error::Other(err) => {
                StepError::Fatal(SessionError::MalformedMessage(format!("{:#}", err)))
            }
        }
    }
}

impl From<SessionError> for StepError {
    fn from(err: SessionError) -> StepError {
        StepError::Fatal(err)
    }
}

/// An RFB client session over a non-blocking transport.
pub struct Decoder<T> {
    transport: T,
    buffer: StreamBuffer,
    config: Config,
    state: State,
    error: Option<SessionError>,
    version: ProtocolVersion,
    security_type: Option<SecurityType>,
    pixel_format: PixelFormat,
    width: u16,
    height: u16,
    name: String,
    pending_rects: u16,
    inited: bool,
}

impl<T: Transport> Decoder<T> {
    pub fn new(transport: T, config: Config) -> Decoder<T> {
        Decoder {
            transport,
            buffer: StreamBuffer::new(),
            config,
            state: State::ServerVersion,
            error: None,
            version: CLIENT_VERSION,
            security_type: None,
            pixel_format: PixelFormat::xrgb(),
            width: 0,
            height: 0,
            name: String::new(),
            pending_rects: 0,
            inited: false,
        }
    }

    /// Drains the transport and makes at most one step of protocol progress.
    pub fn iterate<S: Surface>(&mut self, surface: &mut S) -> Status {
        if let Some(err) = &self.error {
            return Status::Fatal(err.clone());
        }
        if let Err(err) = self.buffer.fill(&mut self.transport) {
            return self.fail(err);
        }
        match self.step(surface) {
            Ok(()) => Status::Progressed,
            Err(StepError::Incomplete) => Status::WaitingForData,
            Err(StepError::Fatal(err)) => self.fail(err),
        }
    }

    fn fail(&mut self, err: SessionError) -> Status {
        log::error!("session failed: {}", err);
        self.error = Some(err.clone());
        Status::Fatal(err)
    }

    fn step<S: Surface>(&mut self, surface: &mut S) -> Result<(), StepError> {
        match self.state {
            State::ServerVersion => self.step_server_version(),
            State::SecurityTypes => self.step_security_types(),
            State::AuthChallenge => self.step_auth_challenge(),
            State::SecurityResult => self.step_security_result(),
            State::ServerInit => self.step_server_init(),
            State::UpdateHeader => self.step_update_header(),
            State::RectHeader => self.step_rect_header(),
            State::RectBody { rect, encoding } => self.step_rect_body(surface, rect, encoding),
        }
    }

    fn step_server_version(&mut self) -> Result<(), StepError> {
        let line = match self.buffer.try_take(12) {
            Some(line) => line,
            None => return Err(StepError::Incomplete),
        };
        let mut raw = [0u8; 12];
        raw.copy_from_slice(&line);
        let server_version = ProtocolVersion::parse(&raw)?;
        if server_version < (ProtocolVersion { major: 3, minor: 3 }) {
            return Err(StepError::Fatal(SessionError::ProtocolDesync(format!(
                "server protocol version {} is too old",
                server_version
            ))));
        }
        self.version = std::cmp::min(server_version, CLIENT_VERSION);
        log::info!(
            "server speaks {}, continuing with {}",
            server_version,
            self.version
        );

        let mut reply = BytesMut::new();
        self.version.write_to(&mut reply);
        self.send_bytes(&reply)?;
        self.state = State::SecurityTypes;
        Ok(())
    }

    fn step_security_types(&mut self) -> Result<(), StepError> {
        let chosen = if self.version.has_security_type_list() {
            let offered = match self.buffer.try_parse(SecurityTypes::parse)? {
                SecurityTypes::Offered(types) => types,
                SecurityTypes::Refused(reason) => {
                    return Err(StepError::Fatal(SessionError::AuthenticationFailed(reason)))
                }
            };
            // Prefer the cheapest type the server offers.
            let chosen = if offered.contains(&SecurityType::None.id()) {
                SecurityType::None
            } else if offered.contains(&SecurityType::VncAuthentication.id()) {
                SecurityType::VncAuthentication
            } else {
                return Err(StepError::Fatal(SessionError::NoSupportedSecurityType));
            };
            self.send_bytes(&[chosen.id()])?;
            chosen
        } else {
            // 3.3 servers dictate a single type as a u32; 0 means refusal with a reason string.
            let raw = match self.buffer.try_take(4) {
                Some(raw) => raw,
                None => return Err(StepError::Incomplete),
            };
            let id = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
            if id == 0 {
                return Err(StepError::Fatal(SessionError::AuthenticationFailed(
                    "server refused the connection".to_string(),
                )));
            }
            match u8::try_from(id).ok().and_then(SecurityType::from_id) {
                Some(t) => t,
                None => return Err(StepError::Fatal(SessionError::NoSupportedSecurityType)),
            }
        };

        log::debug!("security type: {:?}", chosen);
        self.security_type = Some(chosen);
        match chosen {
            SecurityType::VncAuthentication => self.state = State::AuthChallenge,
            SecurityType::None => {
                // Only 3.8 sends a SecurityResult for the None type.
                if self.version >= (ProtocolVersion { major: 3, minor: 8 }) {
                    self.state = State::SecurityResult;
                } else {
                    self.send_client_init()?;
                }
            }
        }
        Ok(())
    }

    fn step_auth_challenge(&mut self) -> Result<(), StepError> {
        let raw = match self.buffer.try_take(16) {
            Some(raw) => raw,
            None => return Err(StepError::Incomplete),
        };
        let password = match &self.config.password {
            Some(password) => password.clone(),
            None => {
                return Err(StepError::Fatal(SessionError::AuthenticationFailed(
                    "server requires a password but none was configured".to_string(),
                )))
            }
        };
        let mut challenge = [0u8; 16];
        challenge.copy_from_slice(&raw);
        let response = auth::encrypt_challenge(&challenge, &password);
        self.send_bytes(&response)?;
        self.state = State::SecurityResult;
        Ok(())
    }

    fn step_security_result(&mut self) -> Result<(), StepError> {
        let raw = match self.buffer.try_take(4) {
            Some(raw) => raw,
            None => return Err(StepError::Incomplete),
        };
        let result = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if result != 0 {
            // 3.8 appends a reason string, but the session is dead either way.
            return Err(StepError::Fatal(SessionError::AuthenticationFailed(
                format!("server rejected the security handshake (result {})", result),
            )));
        }
        self.send_client_init()
    }

    fn send_client_init(&mut self) -> Result<(), StepError> {
        self.send_message(client::Message::ClientInit {
            shared: self.config.shared,
        })?;
        self.state = State::ServerInit;
        Ok(())
    }

    fn step_server_init(&mut self) -> Result<(), StepError> {
        let init: ServerInit = self.buffer.try_parse(ServerInit::parse)?;
        log::info!(
            "server \"{}\": {}x{}, native format {:?}",
            init.name,
            init.width,
            init.height,
            init.pixel_format.image_format()
        );
        self.width = init.width;
        self.height = init.height;
        self.name = init.name;
        self.pixel_format =
            PixelFormat::for_image_format(self.config.image_format, &init.pixel_format);

        self.send_message(client::Message::SetPixelFormat(self.pixel_format.clone()))?;
        self.send_message(client::Message::SetEncodings(
            client::SUPPORTED_ENCODINGS.to_vec(),
        ))?;
        // Kick off the update stream with a full (non-incremental) request.
        self.request_update(false)?;
        self.inited = true;
        self.state = State::UpdateHeader;
        Ok(())
    }

    fn step_update_header(&mut self) -> Result<(), StepError> {
        let id = match self.buffer.peek(1) {
            Some(raw) => raw[0],
            None => return Err(StepError::Incomplete),
        };
        match id {
            server::MSG_FRAMEBUFFER_UPDATE => {
                let count = self.buffer.try_parse(server::parse_update_header)?;
                log::debug!("framebuffer update: {} rects", count);
                self.pending_rects = count;
                if count == 0 {
                    self.request_update(true)?;
                } else {
                    self.state = State::RectHeader;
                }
            }
            server::MSG_SET_COLOUR_MAP_ENTRIES => {
                let count = self.buffer.try_parse(server::parse_colour_map_entries)?;
                log::debug!("ignoring colour map update with {} entries", count);
            }
            server::MSG_BELL => {
                if self.buffer.skip(1).is_none() {
                    return Err(StepError::Incomplete);
                }
                log::debug!("bell");
            }
            server::MSG_SERVER_CUT_TEXT => {
                let length = self.buffer.try_parse(server::parse_server_cut_text)?;
                log::debug!("ignoring server cut text ({} bytes)", length);
            }
            id => {
                return Err(StepError::Fatal(SessionError::ProtocolDesync(format!(
                    "unexpected server message id {}",
                    id
                ))))
            }
        }
        Ok(())
    }

    fn step_rect_header(&mut self) -> Result<(), StepError> {
        let rect = self.buffer.try_parse(RectHeader::parse)?;
        let encoding = match Encoding::from_id(rect.encoding_id) {
            Some(encoding) => encoding,
            None => {
                return Err(StepError::Fatal(SessionError::UnsupportedEncoding(
                    rect.encoding_id,
                )))
            }
        };
        self.check_bounds(rect.x, rect.y, rect.width, rect.height, "rectangle")?;
        self.state = State::RectBody { rect, encoding };
        Ok(())
    }

    fn step_rect_body<S: Surface>(
        &mut self,
        surface: &mut S,
        rect: RectHeader,
        encoding: Encoding,
    ) -> Result<(), StepError> {
        let bytes_per_pixel = self.pixel_format.bytes_per_pixel();
        let op = self
            .buffer
            .try_parse(|src| server::parse_rect_body(src, &rect, encoding, bytes_per_pixel))?;
        match op {
            RectOp::Paint {
                x,
                y,
                width,
                height,
                pixels,
            } => surface.paint_rect(x, y, width, height, &pixels),
            RectOp::Copy {
                dst_x,
                dst_y,
                width,
                height,
                src_x,
                src_y,
            } => {
                self.check_bounds(src_x, src_y, width, height, "copy source")?;
                surface.copy_rect(dst_x, dst_y, width, height, src_x, src_y);
            }
        }
        self.pending_rects -= 1;
        if self.pending_rects == 0 {
            self.request_update(true)?;
            self.state = State::UpdateHeader;
        } else {
            self.state = State::RectHeader;
        }
        Ok(())
    }

    fn check_bounds(&self, x: u16, y: u16, width: u16, height: u16, what: &str) -> Result<(), StepError> {
        if x as u32 + width as u32 > self.width as u32
            || y as u32 + height as u32 > self.height as u32
        {
            return Err(StepError::Fatal(SessionError::MalformedMessage(format!(
                "{} {}x{} at ({}, {}) exceeds the {}x{} framebuffer",
                what, width, height, x, y, self.width, self.height
            ))));
        }
        Ok(())
    }

    fn request_update(&mut self, incremental: bool) -> Result<(), SessionError> {
        self.send_message(client::Message::FramebufferUpdateRequest {
            incremental,
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        })
    }

    fn send_message(&mut self, message: client::Message) -> Result<(), SessionError> {
        log::debug!("->: {}", &message);
        self.send_bytes(&message.into_data())
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.transport.write_all(bytes).map_err(|err| {
            let err = SessionError::TransportError(err.to_string());
            self.error = Some(err.clone());
            err
        })
    }

    fn ensure_healthy(&self) -> Result<(), SessionError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Sends a key press or release. `keysym` is an X11 keysym value.
    pub fn send_key_event(&mut self, down: bool, keysym: u32) -> Result<(), SessionError> {
        self.ensure_healthy()?;
        self.send_message(client::Message::KeyEvent { down, keysym })
    }

    /// Sends the current pointer position and button state. Bit 0 of the mask is the left button.
    pub fn send_pointer_event(
        &mut self,
        button_mask: u8,
        x: u16,
        y: u16,
    ) -> Result<(), SessionError> {
        self.ensure_healthy()?;
        self.send_message(client::Message::PointerEvent { button_mask, x, y })
    }

    /// Requests an update for an arbitrary region, outside the driver's own request cadence.
    pub fn send_update_request(
        &mut self,
        incremental: bool,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<(), SessionError> {
        self.ensure_healthy()?;
        self.send_message(client::Message::FramebufferUpdateRequest {
            incremental,
            x,
            y,
            width,
            height,
        })
    }

    /// Framebuffer width; zero until `ServerInit` has been processed.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Framebuffer height; zero until `ServerInit` has been processed.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The desktop name the server reported.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pixel format updates are delivered in.
    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// The security type agreed during the handshake, if it has happened yet.
    pub fn security_type(&self) -> Option<SecurityType> {
        self.security_type
    }

    /// The protocol version in use (the client maximum until the handshake settles it).
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Whether the handshake has completed and the update stream is running.
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    /// Whether the driver is in the middle of a framebuffer update.
    pub fn is_busy(&self) -> bool {
        self.pending_rects > 0
    }

    /// The latched fatal error, if the session has died.
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }
}
