// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

use crate::card::Card;
use crate::consent::ConsentGate;
use crate::prover::Prover;

/// Virtual IRMA smart card implementation.
///
/// This struct provides a virtual IRMA smart card implementation that can be used with
/// `vpicc-rs` and [`vsmartcard`](https://frankmorgner.github.io/vsmartcard/) to emulate the card.
#[derive(Debug)]
pub struct VirtualCard<P: Prover, G: ConsentGate> {
    card: Card<P, G>,
}

impl<P: Prover, G: ConsentGate> VirtualCard<P, G> {
    /// Creates a new virtual smart card from the given card.
    pub fn new(card: Card<P, G>) -> Self {
        Self { card }
    }

    /// The emulated card
    pub fn card(&self) -> &Card<P, G> {
        &self.card
    }
}

impl<P: Prover, G: ConsentGate> vpicc::VSmartCard for VirtualCard<P, G> {
    fn power_on(&mut self) {
        self.card.power_up();
    }

    fn power_off(&mut self) {
        self.card.power_down();
    }

    fn reset(&mut self) {
        self.card.power_up();
    }

    fn execute(&mut self, request: &[u8]) -> Vec<u8> {
        self.card.process(request)
    }
}
