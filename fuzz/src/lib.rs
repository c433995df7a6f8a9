// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: CC0-1.0

use arbitrary::Arbitrary;
use zeroize::Zeroizing;

use idemix_card::consent::{Consent, ConsentGate, UiStatus};
use idemix_card::prover::{Proof, Prover};
use idemix_card::{Catalog, Credential, Error};

#[derive(Arbitrary, Debug)]
pub struct Input {
    pub commands: Vec<Vec<u8>>,
    pub user_pin: Vec<u8>,
    pub ui_enabled: bool,
    pub ui_optional: bool,
    pub ui_reachable: bool,
    pub consent: Vec<u8>,
    pub prover_fails: bool,
}

/// Credentials covering an empty, a small and an oversized attribute list
pub fn catalog() -> Catalog<()> {
    [
        Credential::new(0x0000, "empty", "fuzz", Vec::<String>::new(), ()),
        Credential::new(0x0001, "small", "fuzz", ["A", "B", "C"], ()),
        Credential::new(
            0x0102,
            "large",
            "fuzz",
            (0..20).map(|i| format!("attr{i}")),
            (),
        ),
    ]
    .into_iter()
    .collect()
}

/// Prover returning well-formed dummy values
#[derive(Debug)]
pub struct FuzzProver {
    pub fails: bool,
}

impl Prover for FuzzProver {
    type Handle = ();

    fn prove(
        &mut self,
        disclosure: &[bool],
        nonce: &[u8],
        context: &[u8],
        _credential: &Credential<()>,
    ) -> Result<Proof, Error> {
        if self.fails {
            return Err(Error::Prover);
        }
        let hidden = disclosure.iter().filter(|r| !**r).count() + 1;
        let revealed = disclosure.len() + 1 - hidden;
        Ok(Proof {
            c: context.to_vec(),
            a_prime: nonce.to_vec(),
            e_hat: vec![0xE0; 8],
            v_prime_hat: vec![0x70; 8],
            hidden: (0..hidden).map(|i| vec![i as u8; 4]).collect(),
            revealed: (0..revealed).map(|i| vec![0x80 | i as u8]).collect(),
        })
    }
}

/// User interface replaying the fuzzer's consent codes
#[derive(Debug)]
pub struct FuzzGate {
    pub reachable: bool,
    pub connected: bool,
    pub answers: std::vec::IntoIter<u8>,
}

impl ConsentGate for FuzzGate {
    fn connect(&mut self) -> Result<(), Error> {
        self.connected = self.reachable;
        if self.connected {
            Ok(())
        } else {
            Err(Error::ConnectFailed)
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn show_status(&mut self, _status: UiStatus) -> Result<(), Error> {
        Ok(())
    }

    fn request_pin(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        Ok(Zeroizing::new(Vec::new()))
    }

    fn request_consent(
        &mut self,
        _requester: &str,
        _attributes: &[&str],
        _allow_always: bool,
    ) -> Result<Consent, Error> {
        let code = self.answers.next().ok_or(Error::Disconnected)?;
        Consent::try_from(code)
    }

    fn show_message(&mut self, _message: &str) -> Result<(), Error> {
        Ok(())
    }
}
