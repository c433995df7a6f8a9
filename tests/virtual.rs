// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

#![cfg(feature = "virtual")]

use hex_literal::hex;
use idemix_card::session::SessionState;
use idemix_card::VirtualCard;
use test_log::test;
use vpicc::VSmartCard;

mod card;

use card::{
    catalog, options_without_ui, prove_commitment, prove_credential, MockProver, ScriptedGate,
};

fn virtual_card() -> VirtualCard<MockProver, ScriptedGate> {
    VirtualCard::new(idemix_card::Card::new(
        catalog(),
        MockProver::default(),
        ScriptedGate::unreachable(),
        options_without_ui(),
    ))
}

#[test]
fn execute() {
    let mut card = virtual_card();
    card.power_on();
    assert_eq!(
        card.execute(&hex!("00 A4 04 00 09 F849524D4163617264")),
        hex!("6F11 A50F 100D 020100 020108 1005 0C03454D55 9000")
    );
    assert_eq!(card.execute(&hex!("00 B0 00 00")), hex!("6D00"));
}

#[test]
fn power_cycle() {
    let mut card = virtual_card();
    card.power_on();
    assert_eq!(card.execute(&prove_credential(1, 0b0110)), hex!("9000"));
    assert_eq!(card.card().session().state(), SessionState::Committing);

    card.reset();
    assert_eq!(card.card().session().state(), SessionState::Idle);

    assert_eq!(card.execute(&prove_credential(1, 0b0110)), hex!("9000"));
    card.power_off();
    assert_eq!(card.card().session().state(), SessionState::Idle);
    assert_eq!(card.execute(&prove_commitment()), hex!("6985"));
}
