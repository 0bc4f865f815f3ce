//! Session — bincode values on a byte stream, plus both sides of the
//! descriptor handshake.
//!
//! Values are written back to back with no extra framing; bincode reads
//! exactly as many bytes as the target type needs.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use tracing::trace;

use super::protocol::{Descriptor, FormType, Request};
use crate::error::{ResolverError, Result};

/// Upper bound for a single decoded value.
const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_MESSAGE_BYTES)
}

/// Outcome of the server side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiated {
    /// The peer announced a request of this shape.
    Form(FormType),
    /// The peer closed the stream or sent the termination tag.
    Closed,
}

/// One end of a connection.
pub struct Session<S = UnixStream> {
    stream: S,
}

impl<S: Read + Write> Session<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Encode `value` and flush it to the peer.
    pub fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        codec().serialize_into(&mut self.stream, value)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Decode the next value from the peer.
    pub fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        Ok(codec().deserialize_from(&mut self.stream)?)
    }

    /// Server side: read the descriptor, echo it, select the shape.
    ///
    /// The echo goes out before the tag is interpreted, so an unknown tag
    /// is still acknowledged and then reported as
    /// [`ResolverError::UnknownFormType`].
    pub fn accept_descriptor(&mut self) -> Result<Negotiated> {
        let descriptor: Descriptor = match self.recv() {
            Ok(d) => d,
            Err(e) if e.is_disconnect() => return Ok(Negotiated::Closed),
            Err(e) => return Err(e),
        };
        trace!(form_type = %descriptor.form_type, "descriptor received");
        match self.send(&descriptor) {
            Ok(()) => {}
            Err(e) if e.is_disconnect() => return Ok(Negotiated::Closed),
            Err(e) => return Err(e),
        }

        Ok(match FormType::parse(&descriptor.form_type)? {
            Some(form) => Negotiated::Form(form),
            None => Negotiated::Closed,
        })
    }

    /// Client side: announce `form` and wait for the echo.
    pub fn offer(&mut self, form: FormType) -> Result<()> {
        let sent = form.descriptor();
        self.send(&sent)?;
        let echoed: Descriptor = self.recv()?;
        if echoed != sent {
            return Err(ResolverError::DescriptorMismatch {
                sent: sent.form_type,
                echoed: echoed.form_type,
            });
        }
        Ok(())
    }

    /// Decode the payload announced by a completed handshake.
    pub fn recv_request(&mut self, form: FormType) -> Result<Request> {
        Ok(match form {
            FormType::Point => Request::Point(self.recv()?),
            FormType::Node => Request::Node(self.recv()?),
        })
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
