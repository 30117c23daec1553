//! The stdio transport loop an application binary drives,
//! grounded on `boldui_app.py`'s `BoldUIApplication.main_loop`: read the
//! renderer's hello, negotiate a version, then alternate reading `R2A`
//! frames and writing back `A2R` frames until the renderer disconnects.

use std::io::{BufReader, BufWriter, Read, Write};

use boldui_protocol::{
    negotiate, read_frame, read_magic, skip_extra, write_frame, A2RHelloResponse, A2RMessage, A2R_MAGIC, Error,
    LATEST_MAJOR_VER, LATEST_MINOR_VER, R2AHello, R2AMessage, R2A_MAGIC,
};

use crate::dispatch::{Dispatcher, ReplyHandler, StateFactory, ViewHandler};
use crate::session_store::{MemorySessionStore, SessionStore};

/// The few knobs a host binary supplies explicitly: no implicit global
/// config file, matching `Controller::start` taking explicit parameters.
pub struct RunnerConfig {
    pub min_major: u16,
    pub min_minor: u16,
    pub max_major: u16,
}
impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig { min_major: LATEST_MAJOR_VER, min_minor: LATEST_MINOR_VER, max_major: LATEST_MAJOR_VER }
    }
}

/// Installs a `tracing-subscriber` `fmt` layer reading `RUST_LOG`, mirroring
/// `boldui.app.BoldUIApplication.setup_logging`. Safe to call more than once
/// per process; later calls are no-ops.
pub fn setup_logging() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

/// An application process: view/reply handler registries plus the transport
/// loop that drives them against a connected renderer.
pub struct BoldUiApplication<S> {
    dispatcher: Dispatcher<S>,
    config: RunnerConfig,
}

impl<S: Clone> BoldUiApplication<S> {
    pub fn new(config: RunnerConfig) -> Self {
        BoldUiApplication { dispatcher: Dispatcher::new(Box::new(MemorySessionStore::new())), config }
    }

    pub fn with_session_store(config: RunnerConfig, store: Box<dyn SessionStore<S>>) -> Self {
        BoldUiApplication { dispatcher: Dispatcher::new(store), config }
    }

    pub fn view_handler(&mut self, path: impl Into<zng_txt::Txt>, handler: ViewHandler<S>, state_factory: StateFactory<S>) -> &mut Self {
        self.dispatcher.register_view(path, handler, state_factory);
        self
    }

    pub fn reply_handler(&mut self, path: impl Into<zng_txt::Txt>, handler: ReplyHandler<S>) -> &mut Self {
        self.dispatcher.register_reply(path, handler);
        self
    }

    /// Runs the handshake then the read/dispatch/write loop over `r`/`w`
    /// until a clean EOF.
    pub fn main_loop(&mut self, r: impl Read, w: impl Write) -> Result<(), boldui_protocol::CodecError> {
        let mut r = BufReader::new(r);
        let mut w = BufWriter::new(w);

        read_magic(&mut r, R2A_MAGIC)?;
        let hello: R2AHello = read_frame(&mut r)?.ok_or(boldui_protocol::CodecError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before hello",
        )))?;
        skip_extra(&mut r, hello.extra_len)?;

        write_all(&mut w, A2R_MAGIC)?;
        let negotiated = negotiate(&hello, LATEST_MAJOR_VER, LATEST_MINOR_VER);
        let response = match negotiated {
            Ok((major, minor)) => A2RHelloResponse { proto_major: major, proto_minor: minor, extra_len: 0, error: None },
            Err(e) => {
                tracing::warn!(%e, "rejecting renderer: incompatible protocol version");
                A2RHelloResponse {
                    proto_major: self.config.max_major,
                    proto_minor: 0,
                    extra_len: 0,
                    error: Some(Error::new(Error::SCHEMA, e.to_string())),
                }
            }
        };
        let version_ok = response.error.is_none();
        write_frame(&mut w, &response)?;
        w.flush().map_err(boldui_protocol::CodecError::Io)?;
        if !version_ok {
            return Ok(());
        }

        loop {
            let Some(msg): Option<R2AMessage> = read_frame(&mut r)? else {
                tracing::debug!("renderer disconnected");
                return Ok(());
            };
            match msg {
                R2AMessage::Open(open) => {
                    tracing::debug!(path = %open.path, "R2AOpen");
                    let reply = match self.dispatcher.handle_open(open) {
                        Ok(update) => A2RMessage::Update(update),
                        Err(err) => {
                            tracing::warn!(%err, "request failed");
                            A2RMessage::Error(err.to_wire_error())
                        }
                    };
                    write_frame(&mut w, &reply)?;
                }
                R2AMessage::Update(update) => {
                    tracing::debug!(replies = update.replies.len(), "R2AUpdate");
                    match self.dispatcher.handle_update(update) {
                        Ok((update, acks)) => {
                            // Watch acks release the handler-side watch before the
                            // renderer sees the re-render they unblocked (spec §4.H,
                            // §8 invariant 6).
                            for ack in acks {
                                write_frame(&mut w, &A2RMessage::WatchAck(ack))?;
                            }
                            write_frame(&mut w, &A2RMessage::Update(update))?;
                        }
                        Err(err) => {
                            tracing::warn!(%err, "request failed");
                            write_frame(&mut w, &A2RMessage::Error(err.to_wire_error()))?;
                        }
                    }
                }
                R2AMessage::Error(err) => {
                    tracing::warn!(code = err.code, text = %err.text, "renderer reported an error");
                    continue;
                }
            };
            w.flush().map_err(boldui_protocol::CodecError::Io)?;
        }
    }
}

fn write_all(w: &mut impl Write, buf: &[u8]) -> Result<(), boldui_protocol::CodecError> {
    w.write_all(buf).map_err(boldui_protocol::CodecError::Io)
}
