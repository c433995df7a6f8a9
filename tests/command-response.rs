// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

use hex_literal::hex;
use idemix_card::consent::Consent;
use ron::{extensions::Extensions, Options};
use serde::Deserialize;

mod card;

use card::{
    command, prove_commitment, prove_credential, with_options, ScriptedGate, TestCard,
};

// iso7816::Status doesn't support serde
#[derive(Deserialize, Debug, PartialEq, Clone, Copy, Default)]
enum Status {
    #[default]
    Success,
    RemainingRetries(u8),
    WrongLength,
    SecurityStatusNotSatisfied,
    ConditionsOfUseNotSatisfied,
    IncorrectDataParameter,
    NotFound,
    WrongParameters,
    InstructionNotSupportedOrInvalid,
    ClassNotSupported,
    UnspecifiedCheckingError,
}

impl TryFrom<u16> for Status {
    type Error = u16;
    fn try_from(sw: u16) -> Result<Self, Self::Error> {
        Ok(match sw {
            sw @ 0x63c0..=0x63cf => Self::RemainingRetries((sw as u8) & 0xf),
            0x6700 => Self::WrongLength,
            0x6982 => Self::SecurityStatusNotSatisfied,
            0x6985 => Self::ConditionsOfUseNotSatisfied,
            0x6a80 => Self::IncorrectDataParameter,
            0x6a82 => Self::NotFound,
            0x6b00 => Self::WrongParameters,
            0x6d00 => Self::InstructionNotSupportedOrInvalid,
            0x6e00 => Self::ClassNotSupported,
            0x6f00 => Self::UnspecifiedCheckingError,
            0x9000 => Self::Success,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
enum HexOrStr {
    Hex(String),
    Str(String),
}

impl HexOrStr {
    fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::Hex(s) => parse_hex(s),
            Self::Str(s) => s.as_bytes().to_vec(),
        }
    }
}

fn parse_hex(data: &str) -> Vec<u8> {
    let tmp: String = data.split_whitespace().collect();
    hex::decode(tmp).unwrap()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
enum OutputMatcher {
    Len(usize),
    And(Vec<OutputMatcher>),
    /// HEX data
    Data(String),
    Str(String),
    NonZero,
}

const MATCH_EMPTY: OutputMatcher = OutputMatcher::Len(0);

impl Default for OutputMatcher {
    fn default() -> Self {
        MATCH_EMPTY
    }
}

impl OutputMatcher {
    fn validate(&self, data: &[u8]) -> bool {
        match self {
            Self::NonZero => data.iter().max() != Some(&0),
            Self::Data(expected) => {
                println!("Validating output with {expected}");
                data == parse_hex(expected)
            }
            Self::Str(expected) => data == expected.as_bytes(),
            Self::Len(len) => data.len() == *len,
            Self::And(matchers) => matchers.iter().all(|m| m.validate(data)),
        }
    }
}

#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(u8)]
enum Pin {
    User = 0x00,
    Admin = 0x01,
}

impl Pin {
    fn default_value(self) -> &'static [u8] {
        match self {
            Pin::User => &idemix_card::DEFAULT_USER_PIN,
            Pin::Admin => &idemix_card::DEFAULT_ADMIN_PIN,
        }
    }
}

#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(u8)]
enum SignatureValue {
    APrime = 0x01,
    EHat = 0x02,
    VPrimeHat = 0x03,
}

#[derive(Deserialize, Debug, Copy, Clone)]
enum Answer {
    Refuse,
    Once,
    Always,
}

impl From<Answer> for Consent {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Refuse => Consent::Refuse,
            Answer::Once => Consent::ConsentOnce,
            Answer::Always => Consent::ConsentAlways,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct IoTest {
    name: String,
    /// Answers of the card holder, the user interface is disabled if `None`
    #[serde(default)]
    consent: Option<Vec<Answer>>,
    cmd_resp: Vec<IoCmd>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
enum IoCmd {
    Select,
    IoData {
        input: String,
        #[serde(default)]
        output: OutputMatcher,
        #[serde(default)]
        expected_status: Status,
    },
    Verify {
        pin: Pin,
        /// None means default value
        #[serde(default)]
        value: Option<HexOrStr>,
        #[serde(default)]
        expected_status: Status,
    },
    ProveCredential {
        id: u16,
        mask: u16,
        #[serde(default)]
        expected_status: Status,
    },
    ProveCommitment {
        #[serde(default)]
        output: OutputMatcher,
        #[serde(default)]
        expected_status: Status,
    },
    ProveSignature {
        value: SignatureValue,
        #[serde(default)]
        output: OutputMatcher,
        #[serde(default)]
        expected_status: Status,
    },
    GetResponse {
        index: u8,
        #[serde(default)]
        output: OutputMatcher,
        #[serde(default)]
        expected_status: Status,
    },
    PowerUp,
    PowerDown,
}

impl IoCmd {
    fn run(&self, card: &mut TestCard) {
        match self {
            Self::Select => Self::run_bytes(
                &command(0x00, 0xA4, 0x04, 0x00, &idemix_card::AID),
                &OutputMatcher::Len(19),
                Status::Success,
                card,
            ),
            Self::IoData {
                input,
                output,
                expected_status,
            } => Self::run_bytes(&parse_hex(input), output, *expected_status, card),
            Self::Verify {
                pin,
                value,
                expected_status,
            } => Self::run_verify(*pin, value, *expected_status, card),
            Self::ProveCredential {
                id,
                mask,
                expected_status,
            } => Self::run_bytes(
                &prove_credential(*id, *mask),
                &MATCH_EMPTY,
                *expected_status,
                card,
            ),
            Self::ProveCommitment {
                output,
                expected_status,
            } => Self::run_bytes(&prove_commitment(), output, *expected_status, card),
            Self::ProveSignature {
                value,
                output,
                expected_status,
            } => Self::run_bytes(
                &[0x80, 0x2B, *value as u8, 0x00],
                output,
                *expected_status,
                card,
            ),
            Self::GetResponse {
                index,
                output,
                expected_status,
            } => Self::run_bytes(
                &[0x80, 0x2C, *index, 0x00],
                output,
                *expected_status,
                card,
            ),
            Self::PowerUp => card.power_up(),
            Self::PowerDown => card.power_down(),
        }
    }

    fn run_bytes(
        input: &[u8],
        output: &OutputMatcher,
        expected_status: Status,
        card: &mut TestCard,
    ) {
        println!("Command: {input:x?}");
        let mut rep: heapless::Vec<u8, 1024> = heapless::Vec::new();
        let status: Status = card
            .handle(input, &mut rep)
            .err()
            .map(|s| TryFrom::<u16>::try_from(s.into()).unwrap())
            .unwrap_or_default();

        println!("Output: {:?}\nStatus: {status:?}", hex::encode(&rep));

        if !output.validate(&rep) {
            panic!("Bad output. Expected {output:?}");
        }
        if status != expected_status {
            panic!("Bad status. Expected {expected_status:?}");
        }
    }

    fn run_verify(
        pin: Pin,
        value: &Option<HexOrStr>,
        expected_status: Status,
        card: &mut TestCard,
    ) {
        let tmp = value.as_ref().map(HexOrStr::as_bytes);
        let value = tmp.as_deref().unwrap_or_else(|| pin.default_value());
        let input = command(0x00, 0x20, 0x00, pin as u8, value);
        Self::run_bytes(&input, &MATCH_EMPTY, expected_status, card)
    }
}

#[test_log::test]
fn command_response() {
    let data = std::fs::read_to_string("tests/command-response.ron").unwrap();
    let ron = Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
    let tests: Vec<IoTest> = ron.from_str(&data).unwrap();
    for t in tests {
        println!("\n\n===========================================================",);
        println!("Running {}", t.name);
        let mut options = idemix_card::Options::default();
        let gate = match &t.consent {
            Some(answers) => {
                ScriptedGate::answering(answers.iter().map(|&a| Ok(Consent::from(a))))
            }
            None => {
                options.ui_enabled = false;
                ScriptedGate::unreachable()
            }
        };
        with_options(options, gate, |mut card| {
            for io in t.cmd_resp {
                io.run(&mut card);
            }
        });
    }
}

#[test_log::test]
fn select_response() {
    with_options(
        idemix_card::Options::default(),
        ScriptedGate::unreachable(),
        |mut card| {
            let mut rep: heapless::Vec<u8, 32> = heapless::Vec::new();
            card.handle(&hex!("00 A4 04 00 09 F849524D4163617264"), &mut rep)
                .unwrap();
            assert_eq!(rep, hex!("6F11 A50F 100D 020100 020108 1005 0C03454D55"));
        },
    );
}
