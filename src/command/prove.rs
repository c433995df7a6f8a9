// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! The four round trips of an Idemix proof.
//!
//! Every handler returning an error has the proof aborted by [`Command::exec`][super::Command].

use iso7816::Status;
use zeroize::Zeroizing;

use super::require_lc;
use crate::card::Context;
use crate::consent::ConsentGate;
use crate::disclosure::{Disclosure, DisclosureMask};
use crate::prover::Prover;
use crate::session::{Selection, SessionState};

/// The command data if it has exactly the expected length
fn data_exact<'a, const R: usize, P: Prover, G: ConsentGate>(
    ctx: &Context<'a, R, P, G>,
    name: &str,
    expected: usize,
) -> Result<&'a [u8], Status> {
    let data = ctx.command.data().as_slice();
    if data.len() != expected {
        warn!("{name} with {} byte(s) of data, expected {expected}", data.len());
        return Err(Status::WrongLength);
    }
    Ok(data)
}

fn require_p1_p2_zero<const R: usize, P: Prover, G: ConsentGate>(
    ctx: &Context<'_, R, P, G>,
    status: Status,
) -> Result<(), Status> {
    if ctx.command.p1 != 0x00 || ctx.command.p2 != 0x00 {
        warn!(
            "Incorrect parameters P1 = 0x{:02X}, P2 = 0x{:02X}",
            ctx.command.p1, ctx.command.p2
        );
        return Err(status);
    }
    Ok(())
}

fn require_p2_zero<const R: usize, P: Prover, G: ConsentGate>(
    ctx: &Context<'_, R, P, G>,
) -> Result<(), Status> {
    if ctx.command.p2 != 0x00 {
        warn!("Incorrect parameter P2 = 0x{:02X}", ctx.command.p2);
        return Err(Status::WrongParameters);
    }
    Ok(())
}

/// PROVE CREDENTIAL: selects the credential and the attributes to disclose
pub fn prove_credential<const R: usize, P: Prover, G: ConsentGate>(
    ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    ctx.state.session.reset();

    require_lc(&ctx)?;
    let parameters = ctx.options.parameters;
    let data = data_exact(&ctx, "PROVE CREDENTIAL", parameters.prove_credential_len())?;
    require_p1_p2_zero(&ctx, Status::ConditionsOfUseNotSatisfied)?;

    let (id, data) = data.split_at(2);
    let (mask, data) = data.split_at(2);
    let (context, timestamp) = data.split_at(parameters.context_len());
    let id = u16::from_be_bytes([id[0], id[1]]);
    let mask = DisclosureMask::from_bits_retain(u16::from_be_bytes([mask[0], mask[1]]));
    let timestamp = <[u8; 4]>::try_from(timestamp)
        .map(u32::from_be_bytes)
        .map_err(|_| Status::WrongLength)?;
    info!("Proof context: {context:02X?}");
    info!("Disclosure mask: 0x{:04X}", mask.bits());
    info!("Timestamp: {timestamp}");

    let Some(index) = ctx.catalog.position(id) else {
        warn!("Unknown credential 0x{id:04X}");
        return Err(Status::IncorrectDataParameter);
    };
    let credential = ctx
        .catalog
        .by_index(index)
        .ok_or(Status::IncorrectDataParameter)?;
    info!(
        "Proving credential {} issued by {}",
        credential.name(),
        credential.issuer()
    );

    let disclosure = Disclosure::select(mask, credential.attributes());
    let revealed = disclosure.revealed_names(credential.attributes());
    let granted = ctx
        .gate
        .authorize(
            &ctx.options.requester,
            &revealed,
            ctx.options.allow_persistent_consent,
        )
        .map_err(|err| {
            error!("Cannot ask for consent: {err}");
            Status::UnspecifiedCheckingError
        })?;
    if !granted {
        return Err(Status::SecurityStatusNotSatisfied);
    }

    ctx.state.session.start(Selection {
        credential: index,
        disclosure,
        context: Zeroizing::new(context.to_vec()),
    });
    Ok(())
}

/// PROVE COMMITMENT: runs the prover on the terminal's nonce and returns `c`
pub fn prove_commitment<const R: usize, P: Prover, G: ConsentGate>(
    mut ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    if ctx.state.session.state() != SessionState::Committing {
        warn!(
            "PROVE COMMITMENT in state {:?}",
            ctx.state.session.state()
        );
        return Err(Status::ConditionsOfUseNotSatisfied);
    }
    require_lc(&ctx)?;
    let nonce_len = ctx.options.parameters.nonce_len();
    let nonce = data_exact(&ctx, "PROVE COMMITMENT", nonce_len)?;
    require_p1_p2_zero(&ctx, Status::WrongParameters)?;

    let selection = ctx
        .state
        .session
        .selection()
        .ok_or(Status::ConditionsOfUseNotSatisfied)?;
    let credential = ctx
        .catalog
        .by_index(selection.credential)
        .ok_or(Status::ConditionsOfUseNotSatisfied)?;
    let proof = ctx
        .prover
        .prove(
            selection.disclosure.vector(),
            nonce,
            &selection.context,
            credential,
        )
        .map_err(|err| {
            error!("Proving {} failed: {err}", credential.name());
            Status::UnspecifiedCheckingError
        })?;

    let c = ctx.state.session.prove(proof).ok_or_else(|| {
        error!("Prover output does not match the disclosure");
        Status::UnspecifiedCheckingError
    })?;
    ctx.reply.expand(&c)
}

/// PROVE SIGNATURE: returns `A'`, `e^` or `v'^`
pub fn prove_signature<const R: usize, P: Prover, G: ConsentGate>(
    mut ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    require_p2_zero(&ctx)?;
    let Some(outputs) = ctx.state.session.outputs() else {
        warn!("PROVE SIGNATURE in state {:?}", ctx.state.session.state());
        return Err(Status::ConditionsOfUseNotSatisfied);
    };
    let value = match ctx.command.p1 {
        0x01 => &outputs.a_prime,
        0x02 => &outputs.e_hat,
        0x03 => &outputs.v_prime_hat,
        p1 => {
            warn!("Unknown signature value 0x{p1:02X}");
            return Err(Status::WrongParameters);
        }
    };
    ctx.reply.expand(value)
}

/// GET RESPONSE: returns the response at index P1, ending the proof after the last one
pub fn get_response<const R: usize, P: Prover, G: ConsentGate>(
    mut ctx: Context<'_, R, P, G>,
) -> Result<(), Status> {
    require_p2_zero(&ctx)?;
    let Some(responses) = ctx.state.session.responses() else {
        warn!("GET RESPONSE in state {:?}", ctx.state.session.state());
        return Err(Status::ConditionsOfUseNotSatisfied);
    };
    let index = usize::from(ctx.command.p1);
    let Some(entry) = responses.get(index) else {
        warn!(
            "Response {index} requested, only {} available",
            responses.len()
        );
        return Err(Status::WrongParameters);
    };
    let last = responses.is_last(index);
    ctx.reply.expand(entry)?;

    if last {
        info!("All responses read, proof complete");
        ctx.state.session.reset();
    }
    Ok(())
}
