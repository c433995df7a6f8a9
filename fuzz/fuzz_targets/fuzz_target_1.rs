// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: CC0-1.0

#![no_main]
use libfuzzer_sys::fuzz_target;

use idemix_card::{Card, Options};
use iso7816::Status;
use idemix_card_fuzz::{catalog, FuzzGate, FuzzProver, Input};

const KNOWN: [Status; 11] = [
    Status::Success,
    Status::RemainingRetries(0),
    Status::WrongLength,
    Status::SecurityStatusNotSatisfied,
    Status::ConditionsOfUseNotSatisfied,
    Status::IncorrectDataParameter,
    Status::NotFound,
    Status::WrongParameters,
    Status::InstructionNotSupportedOrInvalid,
    Status::ClassNotSupported,
    Status::UnspecifiedCheckingError,
];

fuzz_target!(|input: Input| {
    #[cfg(feature = "log")]
    let _ = env_logger::builder().is_test(true).try_init();

    let Input {
        commands,
        mut user_pin,
        ui_enabled,
        ui_optional,
        ui_reachable,
        consent,
        prover_fails,
    } = input;
    user_pin.truncate(idemix_card::MAX_USER_PIN_LENGTH);
    let mut options = Options::default();
    options.user_pin = heapless::Vec::from_slice(&user_pin).unwrap();
    options.ui_enabled = ui_enabled;
    options.ui_optional = ui_optional;

    let gate = FuzzGate {
        reachable: ui_reachable,
        connected: false,
        answers: consent.into_iter(),
    };
    let mut card = Card::new(
        catalog(),
        FuzzProver {
            fails: prover_fails,
        },
        gate,
        options,
    );

    for data in commands {
        let response = card.process(&data);
        let (data, sw) = response.split_at(response.len() - 2);
        let status = Status::from([sw[0], sw[1]]);
        assert!(KNOWN.contains(&status), "unexpected status {status:?}");
        assert!(status == Status::Success || data.is_empty());
        let sessions = card.session().responses().map(|r| r.len());
        if let (Some(len), Some(disclosure)) = (sessions, card.session().disclosure()) {
            assert_eq!(len, disclosure.len() + 1);
        }
    }
});
