// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: CC0-1.0

use arbitrary::Arbitrary;
use hex_literal::hex;

use std::fs::File;
use std::io::Write;

use idemix_card_fuzz::Input;

/// Commands with valid framing to help the fuzzer reach the proof states
#[derive(Arbitrary, Debug, Clone)]
enum Command {
    Select,
    VerifyUser,
    VerifyAdmin,
    ProveCredential { id: u16, mask: u16 },
    ProveCommitment,
    ProveSignature(u8),
    GetResponse(u8),
}

impl Command {
    fn as_bytes(&self) -> Vec<u8> {
        match self.clone() {
            Self::Select => Vec::from(hex!("00A40400 09 F849524D4163617264").as_slice()),
            Self::VerifyUser => Vec::from(hex!("00200000 04 00000000").as_slice()),
            Self::VerifyAdmin => Vec::from(hex!("00200001 06 000000000000").as_slice()),
            Self::ProveCredential { id, mask } => {
                let mut res = Vec::from(hex!("80200000 28").as_slice());
                res.extend_from_slice(&id.to_be_bytes());
                res.extend_from_slice(&mask.to_be_bytes());
                res.extend_from_slice(&[0x42; 32]);
                res.extend_from_slice(&hex!("5F000000"));
                res
            }
            Self::ProveCommitment => {
                Vec::from(hex!("802A0000 0A 00112233445566778899").as_slice())
            }
            Self::ProveSignature(p1) => vec![0x80, 0x2B, p1, 0x00],
            Self::GetResponse(p1) => vec![0x80, 0x2C, p1, 0x00],
        }
    }
}

fn as_corpus(commands: &[Command]) -> Vec<u8> {
    let mut res = Vec::new();
    for cmd in commands {
        res.push(1);
        for b in cmd.as_bytes() {
            res.push(1);
            res.push(b);
        }
        res.push(0);
    }
    res.push(0);

    // User PIN
    res.push(0);
    // UI enabled, optional, reachable
    res.extend_from_slice(&[0, 0, 0]);
    // Consent answers
    res.push(0);
    // Prover fails
    res.push(0);

    let mut unstructured = arbitrary::Unstructured::new(&res);
    let parsed = Input::arbitrary(&mut unstructured).unwrap();
    assert_eq!(commands.len(), parsed.commands.len());
    for (idx, cmd) in commands.iter().enumerate() {
        assert_eq!(cmd.as_bytes(), parsed.commands[idx])
    }
    res
}

fn write_corpus(commands: &[Command], file: &str) {
    let mut f = File::create(format!("corpus/{file}")).unwrap();
    f.write_all(&as_corpus(commands)).unwrap();
    f.flush().unwrap();
    println!("Wrote {file}");
}

fn main() {
    write_corpus(
        &[Command::Select, Command::VerifyUser, Command::VerifyAdmin],
        "verify",
    );
    write_corpus(
        &[
            Command::Select,
            Command::ProveCredential { id: 1, mask: 0b0110 },
            Command::ProveCommitment,
            Command::ProveSignature(1),
            Command::ProveSignature(2),
            Command::ProveSignature(3),
            Command::GetResponse(0),
            Command::GetResponse(1),
            Command::GetResponse(2),
            Command::GetResponse(3),
        ],
        "proof",
    );
    write_corpus(
        &[
            Command::Select,
            Command::ProveCredential {
                id: 0x0102,
                mask: 0xFFFF,
            },
            Command::ProveCommitment,
            Command::GetResponse(20),
        ],
        "proof-large",
    );
    write_corpus(
        &[
            Command::ProveCommitment,
            Command::ProveCredential { id: 0, mask: 0 },
            Command::ProveCommitment,
            Command::GetResponse(0),
            Command::GetResponse(0),
        ],
        "out-of-sequence",
    );
}
