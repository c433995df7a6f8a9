// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! State of the proof currently running on the card.
//!
//! A proof goes through three states:
//!
//! ```text
//!            PROVE CREDENTIAL          PROVE COMMITMENT
//!   Idle ─────────────────────> Committing ──────────────────> Proved
//!    ^                                                           │
//!    └─────────── last GET RESPONSE, error, reset ───────────────┘
//! ```
//!
//! Every buffer holding proof material is wiped when the session is reset.

use zeroize::Zeroizing;

use crate::disclosure::Disclosure;
use crate::prover::Proof;

/// The observable state of a [`ProofSession`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// No proof in progress
    Idle,
    /// Credential and disclosure selected, waiting for the nonce
    Committing,
    /// Proof computed, responses can be read
    Proved,
}

/// Responses of a finished proof, drained by GET RESPONSE.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    entries: Vec<Zeroizing<Vec<u8>>>,
}

impl ResponseBuffer {
    pub(crate) fn new(entries: Vec<Zeroizing<Vec<u8>>>) -> Self {
        Self { entries }
    }

    /// Returns the entry at `index`
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|entry| entry.as_slice())
    }

    /// Whether `index` addresses the final entry
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.entries.len()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct Selection {
    /// Index of the credential in the catalog
    pub credential: usize,
    pub disclosure: Disclosure,
    pub context: Zeroizing<Vec<u8>>,
}

#[derive(Debug)]
pub(crate) struct Outputs {
    pub a_prime: Zeroizing<Vec<u8>>,
    pub e_hat: Zeroizing<Vec<u8>>,
    pub v_prime_hat: Zeroizing<Vec<u8>>,
    pub responses: ResponseBuffer,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Committing(Selection),
    Proved(Selection, Outputs),
}

/// The proof session of the card.
#[derive(Debug, Default)]
pub struct ProofSession {
    phase: Phase,
}

impl ProofSession {
    /// Current state of the proof
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Committing(_) => SessionState::Committing,
            Phase::Proved(..) => SessionState::Proved,
        }
    }

    /// The disclosure vector of the running proof
    pub fn disclosure(&self) -> Option<&[bool]> {
        self.selection().map(|s| s.disclosure.vector())
    }

    /// The responses of a finished proof
    pub fn responses(&self) -> Option<&ResponseBuffer> {
        self.outputs().map(|o| &o.responses)
    }

    /// Drops all proof material, wiping secret buffers.
    pub fn reset(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            debug!("Resetting proof session");
        }
        // Dropping the phase zeroizes every buffer it owns
        drop(core::mem::take(&mut self.phase));
    }

    pub(crate) fn start(&mut self, selection: Selection) {
        self.phase = Phase::Committing(selection);
    }

    pub(crate) fn selection(&self) -> Option<&Selection> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Committing(selection) | Phase::Proved(selection, _) => Some(selection),
        }
    }

    pub(crate) fn outputs(&self) -> Option<&Outputs> {
        match &self.phase {
            Phase::Proved(_, outputs) => Some(outputs),
            _ => None,
        }
    }

    /// Moves a committing session to `Proved` with the prover output.
    ///
    /// Returns `None`, leaving the session untouched, if no proof is being committed or if
    /// `proof` does not match the disclosure vector.  Otherwise returns `c`.
    pub(crate) fn prove(&mut self, mut proof: Proof) -> Option<Zeroizing<Vec<u8>>> {
        let Phase::Committing(selection) = &self.phase else {
            return None;
        };
        if !proof.matches(selection.disclosure.vector()) {
            return None;
        }
        let responses = ResponseBuffer::new(proof.take_responses(selection.disclosure.vector()));
        let outputs = Outputs {
            a_prime: Zeroizing::new(core::mem::take(&mut proof.a_prime)),
            e_hat: Zeroizing::new(core::mem::take(&mut proof.e_hat)),
            v_prime_hat: Zeroizing::new(core::mem::take(&mut proof.v_prime_hat)),
            responses,
        };
        let c = Zeroizing::new(core::mem::take(&mut proof.c));
        let Phase::Committing(selection) = core::mem::take(&mut self.phase) else {
            return None;
        };
        self.phase = Phase::Proved(selection, outputs);
        Some(c)
    }
}
