// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only
#![allow(unused)]

use std::collections::VecDeque;

use hex_literal::hex;
use idemix_card::consent::{Consent, ConsentGate, UiStatus};
use idemix_card::prover::{Proof, Prover};
use idemix_card::{Card, Catalog, Credential, Error, Options};
use iso7816::Status;
use zeroize::Zeroizing;

pub const CONTEXT: [u8; 32] = [0x42; 32];
pub const NONCE: [u8; 10] = hex!("00112233445566778899");
pub const TIMESTAMP: u32 = 0x5F00_0000;

/// Plaintext values of the attributes of a credential
pub type Values = Vec<Vec<u8>>;

pub type TestCard = Card<MockProver, ScriptedGate>;

/// The credential used by most tests: id 1 with attributes A, B and C
pub fn catalog() -> Catalog<Values> {
    [
        Credential::new(
            0x0001,
            "student",
            "university",
            ["A", "B", "C"],
            vec![b"alice".to_vec(), b"1990".to_vec(), b"cs".to_vec()],
        ),
        Credential::new(
            0x0102,
            "everything",
            "issuer",
            (0..17).map(|i| format!("attr{i}")),
            (0..17u8).map(|i| vec![i]).collect(),
        ),
    ]
    .into_iter()
    .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProverMode {
    Correct,
    Fail,
    /// Drops one hidden response
    Inconsistent,
}

/// Deterministic prover: hidden responses are `[0xA0 + position]`, revealed values the handle
#[derive(Debug)]
pub struct MockProver {
    pub mode: ProverMode,
}

impl Default for MockProver {
    fn default() -> Self {
        Self {
            mode: ProverMode::Correct,
        }
    }
}

pub const C: [u8; 4] = hex!("C0FFEE00");
pub const A_PRIME: [u8; 3] = hex!("A1A1A1");
pub const E_HAT: [u8; 3] = hex!("E1E1E1");
pub const V_PRIME_HAT: [u8; 3] = hex!("717171");

impl Prover for MockProver {
    type Handle = Values;

    fn prove(
        &mut self,
        disclosure: &[bool],
        nonce: &[u8],
        context: &[u8],
        credential: &Credential<Values>,
    ) -> Result<Proof, Error> {
        assert_eq!(nonce, NONCE);
        assert_eq!(context, CONTEXT);
        assert_eq!(disclosure.len(), credential.attribute_count());
        if self.mode == ProverMode::Fail {
            return Err(Error::Prover);
        }

        let mut hidden = vec![vec![0xA0]];
        let mut revealed = Vec::new();
        for (index, reveal) in disclosure.iter().enumerate() {
            if *reveal {
                revealed.push(credential.handle()[index].clone());
            } else {
                hidden.push(vec![0xA1 + index as u8]);
            }
        }
        if self.mode == ProverMode::Inconsistent {
            hidden.pop();
        }
        Ok(Proof {
            c: C.to_vec(),
            a_prime: A_PRIME.to_vec(),
            e_hat: E_HAT.to_vec(),
            v_prime_hat: V_PRIME_HAT.to_vec(),
            hidden,
            revealed,
        })
    }
}

/// User interface answering consent requests from a script
#[derive(Debug, Default)]
pub struct ScriptedGate {
    pub reachable: bool,
    pub connected: bool,
    pub connects: usize,
    pub answers: VecDeque<Result<Consent, Error>>,
    pub statuses: Vec<UiStatus>,
    pub requests: Vec<(String, Vec<String>, bool)>,
    pub disconnects: usize,
}

impl ScriptedGate {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn answering(answers: impl IntoIterator<Item = Result<Consent, Error>>) -> Self {
        Self {
            reachable: true,
            answers: answers.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl ConsentGate for ScriptedGate {
    fn connect(&mut self) -> Result<(), Error> {
        self.connects += 1;
        self.connected = self.reachable;
        if self.connected {
            Ok(())
        } else {
            Err(Error::ConnectFailed)
        }
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn show_status(&mut self, status: UiStatus) -> Result<(), Error> {
        self.statuses.push(status);
        Ok(())
    }

    fn request_pin(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        Err(Error::NotConnected)
    }

    fn request_consent(
        &mut self,
        requester: &str,
        attributes: &[&str],
        allow_always: bool,
    ) -> Result<Consent, Error> {
        self.requests.push((
            requester.to_owned(),
            attributes.iter().map(|a| a.to_string()).collect(),
            allow_always,
        ));
        self.answers
            .pop_front()
            .unwrap_or(Ok(Consent::ConsentOnce))
    }

    fn show_message(&mut self, _message: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// Options with the user interface disabled
pub fn options_without_ui() -> Options {
    let mut options = Options::default();
    options.ui_enabled = false;
    options
}

pub fn with_card<F: FnOnce(TestCard) -> R, R>(f: F) -> R {
    with_options(options_without_ui(), ScriptedGate::unreachable(), f)
}

pub fn with_options<F: FnOnce(TestCard) -> R, R>(options: Options, gate: ScriptedGate, f: F) -> R {
    let card = Card::new(catalog(), MockProver::default(), gate, options);
    f(card)
}

/// Status words the card answers with
pub const STATUSES: [Status; 11] = [
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

/// Splits a response into data and status word
pub fn split(response: &[u8]) -> (&[u8], Status) {
    assert!(response.len() >= 2, "response too short: {response:02x?}");
    let (data, sw) = response.split_at(response.len() - 2);
    let status = Status::from([sw[0], sw[1]]);
    assert!(
        STATUSES.contains(&status),
        "unknown status word in {response:02x?}"
    );
    (data, status)
}

/// Sends a command and returns the data of a successful response
pub fn transmit(card: &mut TestCard, apdu: &[u8]) -> Result<Vec<u8>, Status> {
    let response = card.process(apdu);
    match split(&response) {
        (data, Status::Success) => Ok(data.to_vec()),
        (data, status) => {
            assert!(data.is_empty(), "error response with data: {response:02x?}");
            Err(status)
        }
    }
}

pub fn command(cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8]) -> Vec<u8> {
    let mut res = vec![cla, ins, p1, p2, u8::try_from(data.len()).unwrap()];
    res.extend_from_slice(data);
    res
}

pub fn select(aid: &[u8]) -> Vec<u8> {
    command(0x00, 0xA4, 0x04, 0x00, aid)
}

pub fn verify_pin(p2: u8, pin: &[u8]) -> Vec<u8> {
    command(0x00, 0x20, 0x00, p2, pin)
}

pub fn prove_credential(id: u16, mask: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&id.to_be_bytes());
    data.extend_from_slice(&mask.to_be_bytes());
    data.extend_from_slice(&CONTEXT);
    data.extend_from_slice(&TIMESTAMP.to_be_bytes());
    command(0x80, 0x20, 0x00, 0x00, &data)
}

pub fn prove_commitment() -> Vec<u8> {
    command(0x80, 0x2A, 0x00, 0x00, &NONCE)
}

pub fn prove_signature(p1: u8) -> Vec<u8> {
    vec![0x80, 0x2B, p1, 0x00]
}

pub fn get_response(index: u8) -> Vec<u8> {
    vec![0x80, 0x2C, index, 0x00]
}

/// Runs PROVE CREDENTIAL and PROVE COMMITMENT, returning `c`
pub fn start_proof(card: &mut TestCard, id: u16, mask: u16) -> Vec<u8> {
    assert_eq!(transmit(card, &prove_credential(id, mask)), Ok(vec![]));
    transmit(card, &prove_commitment()).unwrap()
}
