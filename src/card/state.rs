// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::session::ProofSession;

/// Maximum supported length for the user PIN
pub const MAX_USER_PIN_LENGTH: usize = 8;
/// Maximum supported length for the admin PIN
pub const MAX_ADMIN_PIN_LENGTH: usize = 12;

/// The PIN roles selected by P2 of VERIFY PIN.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// P2 = 0
    User,
    /// P2 = 1
    Admin,
}

impl TryFrom<u8> for Role {
    type Error = u8;

    fn try_from(p2: u8) -> Result<Self, u8> {
        match p2 {
            0x00 => Ok(Self::User),
            0x01 => Ok(Self::Admin),
            _ => Err(p2),
        }
    }
}

/// PIN verification state.
///
/// The stored PINs live as long as the card; the verified flags are cleared by every card reset.
#[derive(Clone)]
pub struct AccessState {
    user_pin: heapless::Vec<u8, MAX_USER_PIN_LENGTH>,
    admin_pin: heapless::Vec<u8, MAX_ADMIN_PIN_LENGTH>,
    user_verified: bool,
    admin_verified: bool,
}

impl AccessState {
    pub(crate) fn new(
        user_pin: &heapless::Vec<u8, MAX_USER_PIN_LENGTH>,
        admin_pin: &heapless::Vec<u8, MAX_ADMIN_PIN_LENGTH>,
    ) -> Self {
        Self {
            user_pin: user_pin.clone(),
            admin_pin: admin_pin.clone(),
            user_verified: false,
            admin_verified: false,
        }
    }

    /// Compares `value` with the PIN of `role` and records the outcome for that role only.
    pub(crate) fn verify(&mut self, role: Role, value: &[u8]) -> bool {
        let (reference, verified) = match role {
            Role::User => (self.user_pin.as_slice(), &mut self.user_verified),
            Role::Admin => (self.admin_pin.as_slice(), &mut self.admin_verified),
        };
        *verified = value.ct_eq(reference).into();
        *verified
    }

    /// Whether the user PIN was verified since the last reset
    pub fn user_verified(&self) -> bool {
        self.user_verified
    }

    /// Whether the admin PIN was verified since the last reset
    pub fn admin_verified(&self) -> bool {
        self.admin_verified
    }

    pub(crate) fn clear(&mut self) {
        self.user_verified = false;
        self.admin_verified = false;
    }
}

impl core::fmt::Debug for AccessState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessState")
            .field("user_verified", &self.user_verified)
            .field("admin_verified", &self.admin_verified)
            .finish_non_exhaustive()
    }
}

impl AccessState {
    fn wipe(&mut self) {
        self.user_pin[..].zeroize();
        self.admin_pin[..].zeroize();
        self.clear();
    }
}

impl Drop for AccessState {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// Volatile state of the card, cleared on every reset
#[derive(Debug)]
pub struct State {
    pub access: AccessState,
    pub session: ProofSession,
}

impl State {
    pub fn new(access: AccessState) -> Self {
        Self {
            access,
            session: ProofSession::default(),
        }
    }

    pub fn reset(&mut self) {
        self.access.clear();
        self.session.reset();
    }
}
