// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! This crate emulates an IRMA smart card running the Idemix selective-disclosure protocol.
//!
//! A terminal talks to the emulated card with the same ISO7816-4 APDUs it would send to a real
//! card: it selects the application, optionally verifies a PIN, picks a credential together with
//! the attributes to disclose, and then runs the four round trips of the zero-knowledge proof.
//!
//! # Collaborators
//!
//! The card performs no big-integer arithmetic itself.  It is built from three injected
//! capabilities:
//!
//! - a [`Prover`][`prover::Prover`] that computes the Idemix proof for a credential,
//! - a [`ConsentGate`][`consent::ConsentGate`] that asks the card holder whether the requested
//!   attributes may be disclosed ([`SocketGate`][`consent::SocketGate`] talks to the UI daemon,
//!   [`NoUi`][`consent::NoUi`] never connects),
//! - a [`Catalog`] of credentials, usually filled by a
//!   [`CredentialLoader`][`catalog::CredentialLoader`].
//!
//! # Command handling
//!
//! The [`Card`] struct is the main entry point for this crate.  It can be configured using
//! [`Options`].  Its [`Card::handle`] method expects a full APDU command and writes the response
//! data to a buffer, [`Card::process`] returns the complete response including the status word.
//!
//! # Virtual card
//!
//! If the `virtual` feature is enabled, [`VirtualCard`] can be used to emulate a smart card
//! using [`vsmartcard`](https://frankmorgner.github.io/vsmartcard/) and `vpicc-rs`.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    non_ascii_idents,
    trivial_casts,
    unused,
    unused_qualifications,
    clippy::expect_used,
    clippy::unwrap_used
)]
#![deny(unsafe_code)]

#[macro_use]
extern crate log;

mod apdu;
mod card;
pub mod catalog;
mod command;
pub mod consent;
pub mod disclosure;
mod error;
pub mod prover;
pub mod session;
mod utils;
#[cfg(feature = "virtual")]
mod vpicc;

#[cfg(feature = "virtual")]
pub use self::vpicc::VirtualCard;
pub use card::state::{AccessState, Role, MAX_ADMIN_PIN_LENGTH, MAX_USER_PIN_LENGTH};
pub use card::{
    Card, IdemixParameters, Options, AID, DEFAULT_ADMIN_PIN, DEFAULT_REQUESTER, DEFAULT_USER_PIN,
    MAX_RESPONSE_LEN,
};
pub use catalog::{Catalog, Credential};
pub use error::Error;
