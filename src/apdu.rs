// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! Parsing of the short command APDUs sent by IRMA terminals.

use iso7816::command::FromSliceError;
use iso7816::Status;

/// Largest command data field of a short APDU
pub const MAX_COMMAND_DATA_LEN: usize = 255;

const HEADER_LEN: usize = 4;

/// A parsed command APDU
pub type Apdu = iso7816::Command<MAX_COMMAND_DATA_LEN>;

/// Parses a command APDU.
///
/// A short APDU whose `Lc` announces more bytes than were received is parsed with the data that
/// did arrive.  SELECT and VERIFY PIN compare that shortened payload, the proof commands reject
/// it because their payload length is fixed.
pub fn parse(apdu: &[u8]) -> Result<Apdu, Status> {
    Apdu::try_from(apdu).or_else(|err| match err {
        FromSliceError::InvalidSliceLength | FromSliceError::InvalidFirstBodyByteForExtended => {
            let clamped = clamp_lc(apdu).ok_or_else(|| {
                warn!("Inconsistent length fields in {apdu:02x?}");
                Status::WrongLength
            })?;
            debug!("Lc clamped to {} received byte(s)", clamped.len() - HEADER_LEN - 1);
            Apdu::try_from(clamped.as_slice()).map_err(map_error)
        }
        err => Err(map_error(err)),
    })
}

fn map_error(err: FromSliceError) -> Status {
    warn!("Malformed command APDU: {err:?}");
    match err {
        FromSliceError::TooShort => Status::UnspecifiedCheckingError,
        FromSliceError::InvalidClass => Status::ClassNotSupported,
        FromSliceError::TooLong
        | FromSliceError::InvalidSliceLength
        | FromSliceError::InvalidFirstBodyByteForExtended => Status::WrongLength,
    }
}

/// Rewrites `Lc` of a truncated short APDU to the number of data bytes received.
fn clamp_lc(apdu: &[u8]) -> Option<heapless::Vec<u8, { HEADER_LEN + 1 + MAX_COMMAND_DATA_LEN }>> {
    let header = apdu.get(..HEADER_LEN)?;
    let (&lc, data) = apdu.get(HEADER_LEN..)?.split_first()?;
    if data.is_empty() || data.len() >= usize::from(lc) {
        return None;
    }
    let mut clamped = heapless::Vec::new();
    clamped.extend_from_slice(header).ok()?;
    clamped.push(u8::try_from(data.len()).ok()?).ok()?;
    clamped.extend_from_slice(data).ok()?;
    Some(clamped)
}

/// Whether the command carries a body at all, `Lc` or `Le`
pub fn has_body(command: &Apdu) -> bool {
    !command.data().is_empty() || command.expected() != 0
}
