// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! Selection of the attributes revealed in a proof.

use bitflags::bitflags;

bitflags! {
    /// The 16-bit disclosure mask `D` sent with PROVE CREDENTIAL.
    ///
    /// Bit 0 stands for the master secret, which is never revealed.  Bit `i + 1` reveals
    /// attribute `i` of the credential.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DisclosureMask: u16 {
        /// The master secret; ignored
        const MASTER_SECRET = 1;
    }
}

impl DisclosureMask {
    /// Number of attributes that can be addressed by the mask
    pub const MAX_ATTRIBUTES: usize = u16::BITS as usize - 1;

    /// Whether attribute `index` is revealed; attributes beyond the mask stay hidden.
    pub fn reveals(&self, index: usize) -> bool {
        if index >= Self::MAX_ATTRIBUTES {
            return false;
        }
        self.bits() & (1 << (index + 1)) != 0
    }
}

/// The disclosure decision for one credential.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Disclosure {
    revealed: Vec<bool>,
}

impl Disclosure {
    /// Applies `mask` to the given attributes, logging the decision for each one.
    pub fn select<S: AsRef<str>>(mask: DisclosureMask, attributes: &[S]) -> Self {
        let revealed = attributes
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let reveal = mask.reveals(index);
                if reveal {
                    info!("Revealing attribute {}", name.as_ref());
                } else {
                    info!("Keeping attribute {} hidden", name.as_ref());
                }
                reveal
            })
            .collect();
        Self { revealed }
    }

    /// One flag per attribute, `true` for revealed
    pub fn vector(&self) -> &[bool] {
        &self.revealed
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.revealed.len()
    }

    /// Whether the credential has no attribute
    pub fn is_empty(&self) -> bool {
        self.revealed.is_empty()
    }

    /// Number of attributes proved in zero knowledge
    pub fn hidden_count(&self) -> usize {
        self.revealed.iter().filter(|r| !**r).count()
    }

    /// Number of revealed attributes
    pub fn revealed_count(&self) -> usize {
        self.len() - self.hidden_count()
    }

    /// The names of the revealed attributes, in declaration order
    pub fn revealed_names<'a, S: AsRef<str>>(&self, attributes: &'a [S]) -> Vec<&'a str> {
        attributes
            .iter()
            .zip(&self.revealed)
            .filter(|(_, revealed)| **revealed)
            .map(|(name, _)| name.as_ref())
            .collect()
    }
}
