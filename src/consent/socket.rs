// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! Client for the user interface daemon listening on a Unix socket.
//!
//! Every message in both directions is prefixed with its length as a big-endian `u16`.  Requests
//! start with a command byte, replies with a result byte that must be `0x00`.  The reply to the
//! version request is the bare API version.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::{Consent, ConsentGate, UiStatus};
use crate::card::state::MAX_USER_PIN_LENGTH;
use crate::error::Error;

/// Default location of the user interface socket
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/pivacy_ui-comm";

const API_VERSION: u8 = 0x00;
const RESULT_OK: u8 = 0x00;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
enum Request {
    GetApiVersion = 0x01,
    Disconnect = 0x02,
    ShowStatus = 0x03,
    RequestPin = 0x04,
    RequestConsent = 0x05,
    ShowMessage = 0x06,
}

/// [`ConsentGate`] talking to the user interface daemon.
#[derive(Debug)]
pub struct SocketGate {
    path: PathBuf,
    stream: Option<UnixStream>,
}

impl Default for SocketGate {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl SocketGate {
    /// Creates a client for the socket at `path` without connecting
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
        }
    }

    /// The socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sends a request and waits for the reply, stripping the result byte.
    fn transact(&mut self, request: &[u8]) -> Result<Vec<u8>, Error> {
        self.send(request)?;
        let reply = self.receive()?;
        match reply.split_first() {
            Some((&RESULT_OK, data)) => Ok(data.to_vec()),
            Some((result, _)) => {
                warn!("User interface returned error 0x{result:02X}");
                Err(Error::ProtocolError)
            }
            None => {
                warn!("User interface returned an empty reply");
                Err(Error::ProtocolError)
            }
        }
    }

    fn send(&mut self, message: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(message.len()).map_err(|_| Error::InvalidParameter)?;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let result = stream
            .write_all(&len.to_be_bytes())
            .and_then(|()| stream.write_all(message))
            .and_then(|()| stream.flush());
        result.map_err(|err| self.transport_failed(err))
    }

    fn receive(&mut self) -> Result<Vec<u8>, Error> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let mut len = [0; 2];
        let result = stream.read_exact(&mut len).and_then(|()| {
            let mut message = vec![0; u16::from_be_bytes(len).into()];
            stream.read_exact(&mut message).map(|()| message)
        });
        result.map_err(|err| self.transport_failed(err))
    }

    fn transport_failed(&mut self, err: std::io::Error) -> Error {
        error!("Lost connection to the user interface: {err}");
        self.stream = None;
        Error::Disconnected
    }
}

impl ConsentGate for SocketGate {
    fn connect(&mut self) -> Result<(), Error> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = UnixStream::connect(&self.path).map_err(|err| {
            warn!(
                "Failed to connect to user interface at {}: {err}",
                self.path.display()
            );
            Error::ConnectFailed
        })?;
        self.stream = Some(stream);

        self.send(&[Request::GetApiVersion as u8])?;
        let version = self.receive()?;
        if version != [API_VERSION] {
            warn!("Unsupported user interface API version {version:02X?}");
            self.stream = None;
            return Err(Error::VersionMismatch);
        }
        info!("Connected to user interface at {}", self.path.display());
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.stream.is_none() {
            return;
        }
        // The daemon does not reply to a disconnect
        self.send(&[Request::Disconnect as u8]).ok();
        self.stream = None;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn show_status(&mut self, status: UiStatus) -> Result<(), Error> {
        self.transact(&[Request::ShowStatus as u8, status.into()])?;
        Ok(())
    }

    fn request_pin(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        let pin = Zeroizing::new(self.transact(&[Request::RequestPin as u8])?);
        if pin.len() > MAX_USER_PIN_LENGTH {
            warn!("User interface returned a PIN of {} bytes", pin.len());
            return Err(Error::ProtocolError);
        }
        Ok(pin)
    }

    fn request_consent(
        &mut self,
        requester: &str,
        attributes: &[&str],
        allow_always: bool,
    ) -> Result<Consent, Error> {
        let mut request = vec![Request::RequestConsent as u8, allow_always.into()];
        for value in core::iter::once(&requester).chain(attributes) {
            let len = u8::try_from(value.len()).map_err(|_| {
                warn!("String too long for consent request: {value}");
                Error::InvalidParameter
            })?;
            request.push(len);
            request.extend_from_slice(value.as_bytes());
        }
        match self.transact(&request)?.as_slice() {
            [code] => Consent::try_from(*code),
            other => {
                warn!("Malformed consent reply {other:02X?}");
                Err(Error::ProtocolError)
            }
        }
    }

    fn show_message(&mut self, message: &str) -> Result<(), Error> {
        let mut request = vec![Request::ShowMessage as u8];
        request.extend_from_slice(message.as_bytes());
        self.transact(&request)?;
        Ok(())
    }
}

impl Drop for SocketGate {
    fn drop(&mut self) {
        self.disconnect();
    }
}
