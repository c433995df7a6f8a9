// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! The zero-knowledge prover behind the card.
//!
//! As this crate does not implement the Idemix arithmetic, a [`Card`][`crate::Card`] has to be
//! provided with a [`Prover`] implementation.  All values cross this boundary as big-endian
//! byte strings.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::catalog::Credential;
use crate::error::Error;

/// Output of one Idemix proof.
#[derive(Clone, Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct Proof {
    /// The challenge `c`
    pub c: Vec<u8>,
    /// The randomised signature `A'`
    pub a_prime: Vec<u8>,
    /// The response `e^`
    pub e_hat: Vec<u8>,
    /// The response `v'^`
    pub v_prime_hat: Vec<u8>,
    /// Responses for the hidden values: the master secret first, then one per hidden attribute
    /// in declaration order
    pub hidden: Vec<Vec<u8>>,
    /// Plaintext values of the revealed attributes in declaration order
    pub revealed: Vec<Vec<u8>>,
}

impl Proof {
    /// Checks that the number of responses and values matches `disclosure`.
    pub fn matches(&self, disclosure: &[bool]) -> bool {
        let revealed = disclosure.iter().filter(|r| **r).count();
        let hidden = disclosure.len() - revealed;
        self.revealed.len() == revealed && self.hidden.len() == hidden + 1
    }

    /// Orders the responses the way GET RESPONSE hands them out: the master secret first, then
    /// per attribute either the plaintext value or the hidden response.
    ///
    /// Must only be called if [`Proof::matches`] holds for `disclosure`.
    pub(crate) fn take_responses(&mut self, disclosure: &[bool]) -> Vec<Zeroizing<Vec<u8>>> {
        let mut hidden = core::mem::take(&mut self.hidden).into_iter();
        let mut revealed = core::mem::take(&mut self.revealed).into_iter();
        let mut responses = Vec::with_capacity(disclosure.len() + 1);
        responses.extend(hidden.next().map(Zeroizing::new));
        for reveal in disclosure {
            let next = if *reveal {
                revealed.next()
            } else {
                hidden.next()
            };
            responses.extend(next.map(Zeroizing::new));
        }
        responses
    }
}

/// Computes Idemix proofs of possession.
pub trait Prover {
    /// The credential secret (signature, master secret, issuer public key) used for proving
    type Handle;

    /// Proves possession of `credential`, revealing the attributes flagged in `disclosure`.
    ///
    /// `nonce` is the terminal's challenge and `context` the context sent with PROVE CREDENTIAL.
    fn prove(
        &mut self,
        disclosure: &[bool],
        nonce: &[u8],
        context: &[u8],
        credential: &Credential<Self::Handle>,
    ) -> Result<Proof, Error>;
}

/// Dummy prover.
///
/// This prover can be used to compile code without relying on a proper [`Prover`]
/// implementation.  All calls fail.
#[derive(Clone, Copy, Debug, Default)]
pub struct DummyProver;

impl Prover for DummyProver {
    type Handle = ();

    fn prove(
        &mut self,
        _disclosure: &[bool],
        _nonce: &[u8],
        _context: &[u8],
        _credential: &Credential<()>,
    ) -> Result<Proof, Error> {
        Err(Error::Prover)
    }
}
