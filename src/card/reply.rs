// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

use iso7816::Status;

use core::ops::{Deref, DerefMut};

#[derive(Debug)]
pub struct Reply<'v, const R: usize>(pub &'v mut heapless::Vec<u8, R>);

impl<'v, const R: usize> Deref for Reply<'v, R> {
    type Target = &'v mut heapless::Vec<u8, R>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'v, const R: usize> DerefMut for Reply<'v, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'v, const R: usize> Reply<'v, R> {
    /// Extend the reply and return an error otherwise
    ///
    /// A response that does not fit the reader buffer is answered with 6F00, like any other
    /// failure without precise diagnosis.
    ///
    /// Named expand and not extend to avoid conflicts with Deref
    pub fn expand(&mut self, data: &[u8]) -> Result<(), Status> {
        self.0.extend_from_slice(data).map_err(|_| {
            error!("Buffer full");
            Status::UnspecifiedCheckingError
        })
    }

    /// Inserts the BER length of everything written after `offset` at `offset`.
    pub fn prepend_len(&mut self, offset: usize) -> Result<(), Status> {
        let Some(len) = self.len().checked_sub(offset) else {
            error!("Length offset {offset} past the end of the reply");
            return Err(Status::UnspecifiedCheckingError);
        };
        let encoded = ber_len(len)?;
        self.expand(&encoded)?;
        self[offset..].rotate_right(encoded.len());
        Ok(())
    }

    /// Write a constructed or primitive TLV whose value is produced by `value`.
    pub fn tlv<F>(&mut self, tag: u8, value: F) -> Result<(), Status>
    where
        F: FnOnce(&mut Self) -> Result<(), Status>,
    {
        self.expand(&[tag])?;
        let offset = self.len();
        value(self)?;
        self.prepend_len(offset)
    }

    pub fn lend(&mut self) -> Reply<'_, R> {
        Reply(self.0)
    }
}

/// Definite BER length in short form or with one or two length octets
fn ber_len(len: usize) -> Result<heapless::Vec<u8, 3>, Status> {
    let bytes = (len as u32).to_be_bytes();
    let encoded = match len {
        0..=0x7F => heapless::Vec::from_slice(&bytes[3..]),
        0x80..=0xFF => heapless::Vec::from_slice(&[0x81, bytes[3]]),
        0x100..=0xFFFF => heapless::Vec::from_slice(&[0x82, bytes[2], bytes[3]]),
        _ => Err(()),
    };
    encoded.map_err(|()| {
        error!("Length {len} cannot be encoded");
        Status::UnspecifiedCheckingError
    })
}
