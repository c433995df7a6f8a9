// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

/// Failures reported by the collaborators of the card (UI, prover, credential loader).
///
/// None of these ever reach the terminal directly: the command handlers map them to a status
/// word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Credentials could not be loaded
    Loading,
    /// The UI could not be reached
    ConnectFailed,
    /// The connection with the UI was closed unexpectedly
    Disconnected,
    /// There is no connection with the UI
    NotConnected,
    /// The UI speaks another API version
    VersionMismatch,
    /// The UI sent a malformed or negative reply
    ProtocolError,
    /// A request could not be encoded for the UI
    InvalidParameter,
    /// The prover failed or produced inconsistent output
    Prover,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let to_write = match self {
            Error::Loading => "Failed to load credentials",
            Error::ConnectFailed => "Failed to connect to the UI",
            Error::Disconnected => "Connection with the UI was closed unexpectedly",
            Error::NotConnected => "Not connected to the UI",
            Error::VersionMismatch => "The UI reported a mismatching API version",
            Error::ProtocolError => "UI protocol error",
            Error::InvalidParameter => "Invalid parameter for UI request",
            Error::Prover => "Failed to compute the proof",
        };
        f.write_str(to_write)
    }
}

impl std::error::Error for Error {}
