// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

mod prove;

use iso7816::Status;

use crate::apdu::{self, Apdu};
use crate::card::state::Role;
use crate::card::{Context, AID, VERSION_MAJOR, VERSION_MINOR, VERSION_TAG};
use crate::consent::ConsentGate;
use crate::prover::Prover;
use crate::utils::InspectErr;

const CLA_ISO: u8 = 0x00;
const CLA_IRMA: u8 = 0x80;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Select,
    VerifyPin,
    ProveCredential,
    ProveCommitment,
    ProveSignature,
    GetResponse,
}

impl Command {
    /// Whether a failure of this command aborts the running proof
    fn is_proof_step(&self) -> bool {
        !matches!(self, Self::Select | Self::VerifyPin)
    }

    pub fn exec<const R: usize, P: Prover, G: ConsentGate>(
        &self,
        mut ctx: Context<'_, R, P, G>,
    ) -> Result<(), Status> {
        let result = match self {
            Self::Select => select(ctx.lend()),
            Self::VerifyPin => verify_pin(ctx.lend()),
            Self::ProveCredential => prove::prove_credential(ctx.lend()),
            Self::ProveCommitment => prove::prove_commitment(ctx.lend()),
            Self::ProveSignature => prove::prove_signature(ctx.lend()),
            Self::GetResponse => prove::get_response(ctx.lend()),
        };
        if self.is_proof_step() {
            result.inspect_err_stable(|_err| {
                warn!("{self:?} failed with {_err:?}, aborting proof");
                ctx.state.session.reset();
            })
        } else {
            result
        }
    }
}

impl TryFrom<&Apdu> for Command {
    type Error = Status;

    fn try_from(command: &Apdu) -> Result<Self, Self::Error> {
        match (command.class().into_inner(), u8::from(command.instruction())) {
            (CLA_ISO, 0xA4) => Ok(Self::Select),
            (CLA_ISO, 0x20) => Ok(Self::VerifyPin),
            (CLA_IRMA, 0x20) => Ok(Self::ProveCredential),
            (CLA_IRMA, 0x2A) => Ok(Self::ProveCommitment),
            (CLA_IRMA, 0x2B) => Ok(Self::ProveSignature),
            (CLA_IRMA, 0x2C) => Ok(Self::GetResponse),
            (CLA_ISO | CLA_IRMA, _) => Err(Status::InstructionNotSupportedOrInvalid),
            _ => Err(Status::ClassNotSupported),
        }
    }
}

fn require_lc<const R: usize, P: Prover, G: ConsentGate>(
    ctx: &Context<'_, R, P, G>,
) -> Result<(), Status> {
    if !apdu::has_body(ctx.command) {
        warn!("Command without Lc");
        return Err(Status::WrongLength);
    }
    Ok(())
}

fn select<const R: usize, P: Prover, G: ConsentGate>(
    mut ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    require_lc(&ctx)?;
    let aid = ctx.command.data().as_slice();
    if aid != AID.as_slice() {
        warn!("Selecting unknown application {aid:02X?}");
        return Err(Status::NotFound);
    }

    // Lengths are computed, the inner version tag is 10 05 where older cards sent 10 07
    ctx.reply.tlv(0x6F, |fci| {
        fci.tlv(0xA5, |proprietary| {
            proprietary.tlv(0x10, |version| {
                version.tlv(0x02, |major| major.expand(&[VERSION_MAJOR]))?;
                version.tlv(0x02, |minor| minor.expand(&[VERSION_MINOR]))?;
                version.tlv(0x10, |extra| extra.tlv(0x0C, |tag| tag.expand(VERSION_TAG)))
            })
        })
    })
}

fn verify_pin<const R: usize, P: Prover, G: ConsentGate>(
    ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    require_lc(&ctx)?;
    if ctx.command.p1 != 0x00 {
        warn!("Incorrect P1 for VERIFY PIN: 0x{:02X}", ctx.command.p1);
        return Err(Status::WrongParameters);
    }
    let role = Role::try_from(ctx.command.p2).map_err(|p2| {
        warn!("Unknown PIN reference 0x{p2:02X}");
        Status::WrongParameters
    })?;

    if ctx.state.access.verify(role, ctx.command.data()) {
        info!("{role:?} PIN verified");
        Ok(())
    } else {
        warn!("{role:?} PIN verification failed");
        Err(Status::RemainingRetries(0))
    }
}
