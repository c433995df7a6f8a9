// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

use hex_literal::hex;
use iso7816::Status;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub(crate) mod reply;
pub mod state;

use crate::apdu::{self, Apdu};
use crate::catalog::Catalog;
use crate::command::Command;
use crate::consent::{ConsentGate, Gate, UiPolicy, UiStatus};
use crate::prover::Prover;
use crate::session::ProofSession;
use crate::utils::{serde_bytes_heapless, InspectErr};
use reply::Reply;
use state::{AccessState, State, MAX_ADMIN_PIN_LENGTH, MAX_USER_PIN_LENGTH};

/// Application identifier of the IRMA card ("IRMAcard" with a proprietary RID)
pub const AID: [u8; 9] = hex!("F8 49 52 4D 41 63 61 72 64");
/// Major version reported in the FCI
pub const VERSION_MAJOR: u8 = 0;
/// Minor version reported in the FCI
pub const VERSION_MINOR: u8 = 8;
/// Version tag reported in the FCI
pub const VERSION_TAG: &[u8] = b"EMU";

/// Size of the response buffer used by [`Card::process`]
pub const MAX_RESPONSE_LEN: usize = 1024;

/// User PIN used if none is configured
pub const DEFAULT_USER_PIN: [u8; 4] = [0; 4];
/// Admin PIN used if none is configured
pub const DEFAULT_ADMIN_PIN: [u8; 6] = [0; 6];
/// Name shown to the card holder when asking for consent
pub const DEFAULT_REQUESTER: &str = "This terminal";

/// IRMA card emulator.
///
/// This is the main entry point for this crate.  It takes care of the command handling and state
/// management.  Big-integer arithmetic is left to the [`Prover`] and consent decisions to the
/// [`ConsentGate`].
pub struct Card<P: Prover, G: ConsentGate> {
    catalog: Catalog<P::Handle>,
    prover: P,
    gate: Gate<G>,
    options: Options,
    state: State,
}

impl<P: Prover, G: ConsentGate> Card<P, G> {
    /// Creates a new card holding the credentials in `catalog`.
    ///
    /// If the user interface is enabled, the card connects to it and shows the
    /// [`Wait`][`UiStatus::Wait`] status.  A failed connection is retried when the first proof
    /// is requested.
    pub fn new(catalog: Catalog<P::Handle>, prover: P, ui: G, options: Options) -> Self {
        let mut gate = Gate::new(ui, options.ui_policy());
        if gate.policy() != UiPolicy::Disabled && gate.ensure_connected().is_ok() {
            gate.notify(UiStatus::Wait);
        }
        info!("Card ready with {} credential(s)", catalog.len());
        let state = State::new(AccessState::new(&options.user_pin, &options.admin_pin));
        Self {
            catalog,
            prover,
            gate,
            options,
            state,
        }
    }

    /// Handles an APDU command and writes the response data to the given buffer.
    ///
    /// The status word is not part of `reply`.  If an error is returned, `reply` is empty.
    pub fn handle<const R: usize>(
        &mut self,
        apdu: &[u8],
        reply: &mut heapless::Vec<u8, R>,
    ) -> Result<(), Status> {
        trace!("Received APDU {:02x?}", apdu);
        reply.clear();
        let command = apdu::parse(apdu)?;
        let card_command = Command::try_from(&command).inspect_err_stable(|_err| {
            warn!("Failed to parse command: {command:02x?} {_err:?}");
        })?;
        info!("Executing command {:?}", card_command);
        let context = Context {
            catalog: &self.catalog,
            prover: &mut self.prover,
            gate: &mut self.gate,
            options: &self.options,
            state: &mut self.state,
            command: &command,
            reply: Reply(reply),
        };
        let result = card_command.exec(context);
        if result.is_err() {
            reply.clear();
        }
        result
    }

    /// Handles an APDU command and returns the response including the status word.
    pub fn process(&mut self, apdu: &[u8]) -> Vec<u8> {
        let mut buffer = heapless::Vec::<u8, MAX_RESPONSE_LEN>::new();
        let status = self.handle(apdu, &mut buffer).err().unwrap_or_default();
        let status: [u8; 2] = status.into();
        let mut response = Vec::with_capacity(buffer.len() + status.len());
        response.extend_from_slice(&buffer);
        response.extend_from_slice(&status);
        trace!("Sending response {:02x?}", response);
        response
    }

    /// Resets the state of the card: verified PINs and any running proof are forgotten.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Resets the card when a terminal powers it up.
    pub fn power_up(&mut self) {
        debug!("Power up");
        self.reset();
        self.gate.notify(UiStatus::Present);
    }

    /// Resets the card when the terminal powers it down.
    pub fn power_down(&mut self) {
        debug!("Power down");
        self.reset();
        self.gate.notify(UiStatus::Wait);
    }

    /// The running proof
    pub fn session(&self) -> &ProofSession {
        &self.state.session
    }

    /// The PIN verification state
    pub fn access(&self) -> &AccessState {
        &self.state.access
    }

    /// The credentials held by the card
    pub fn catalog(&self) -> &Catalog<P::Handle> {
        &self.catalog
    }

    /// The options of the card
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The user interface of the card
    pub fn ui(&self) -> &G {
        self.gate.ui()
    }

    /// The user interface of the card
    pub fn ui_mut(&mut self) -> &mut G {
        self.gate.ui_mut()
    }
}

impl<P: Prover, G: ConsentGate> Drop for Card<P, G> {
    fn drop(&mut self) {
        self.reset();
        self.gate.disconnect();
        self.options.wipe_pins();
    }
}

impl<P: Prover, G: ConsentGate> core::fmt::Debug for Card<P, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Card")
            .field("credentials", &self.catalog.len())
            .field("policy", &self.gate.policy())
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Bit lengths of the Idemix system parameters that determine command sizes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct IdemixParameters {
    /// Length of the hash output, and therefore of the proof context
    pub l_h: usize,
    /// Statistical zero-knowledge security parameter, the length of the nonce
    pub l_statzk: usize,
}

impl IdemixParameters {
    /// Creates parameters with the given bit lengths
    pub fn new(l_h: usize, l_statzk: usize) -> Self {
        Self { l_h, l_statzk }
    }

    /// Length of the proof context in bytes
    pub fn context_len(&self) -> usize {
        self.l_h / 8
    }

    /// Length of the nonce sent with PROVE COMMITMENT
    pub fn nonce_len(&self) -> usize {
        self.l_statzk / 8
    }

    /// Expected `Lc` of PROVE CREDENTIAL: id, disclosure mask, context and timestamp
    pub fn prove_credential_len(&self) -> usize {
        2 + 2 + self.context_len() + 4
    }
}

impl Default for IdemixParameters {
    fn default() -> Self {
        Self {
            l_h: 256,
            l_statzk: 80,
        }
    }
}

/// Options for the IRMA card.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Options {
    /// PIN verified with VERIFY PIN, P2 = 0
    #[serde(with = "serde_bytes_heapless")]
    pub user_pin: heapless::Vec<u8, MAX_USER_PIN_LENGTH>,
    /// PIN verified with VERIFY PIN, P2 = 1
    #[serde(with = "serde_bytes_heapless")]
    pub admin_pin: heapless::Vec<u8, MAX_ADMIN_PIN_LENGTH>,
    /// Use the user interface to ask for consent
    pub ui_enabled: bool,
    /// Grant disclosures if the user interface cannot be reached
    pub ui_optional: bool,
    /// Offer the card holder to always consent to a requester
    pub allow_persistent_consent: bool,
    /// Name of the requester shown in consent requests
    pub requester: String,
    /// Idemix system parameters
    pub parameters: IdemixParameters,
}

impl Options {
    /// The consent policy resulting from `ui_enabled` and `ui_optional`
    pub fn ui_policy(&self) -> UiPolicy {
        UiPolicy::new(self.ui_enabled, self.ui_optional)
    }

    /// Overwrites the configured PINs with zeros
    fn wipe_pins(&mut self) {
        self.user_pin[..].zeroize();
        self.admin_pin[..].zeroize();
    }
}

impl Default for Options {
    fn default() -> Self {
        #[allow(clippy::unwrap_used)]
        Self {
            user_pin: heapless::Vec::from_slice(&DEFAULT_USER_PIN).unwrap(),
            admin_pin: heapless::Vec::from_slice(&DEFAULT_ADMIN_PIN).unwrap(),
            ui_enabled: true,
            ui_optional: false,
            allow_persistent_consent: false,
            requester: DEFAULT_REQUESTER.into(),
            parameters: IdemixParameters::default(),
        }
    }
}

impl core::fmt::Debug for Options {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // PINs are left out
        f.debug_struct("Options")
            .field("ui_enabled", &self.ui_enabled)
            .field("ui_optional", &self.ui_optional)
            .field("allow_persistent_consent", &self.allow_persistent_consent)
            .field("requester", &self.requester)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

pub struct Context<'a, const R: usize, P: Prover, G: ConsentGate> {
    pub catalog: &'a Catalog<P::Handle>,
    pub prover: &'a mut P,
    pub gate: &'a mut Gate<G>,
    pub options: &'a Options,
    pub state: &'a mut State,
    pub command: &'a Apdu,
    pub reply: Reply<'a, R>,
}

impl<'a, const R: usize, P: Prover, G: ConsentGate> Context<'a, R, P, G> {
    /// Lend the context
    ///
    /// The resulting `Context` has a shorter lifetime than the original one, meaning that it
    /// can be passed by value to other functions and the original context can then be used again
    pub fn lend(&mut self) -> Context<'_, R, P, G> {
        Context {
            catalog: self.catalog,
            prover: self.prover,
            gate: self.gate,
            options: self.options,
            state: self.state,
            command: self.command,
            reply: self.reply.lend(),
        }
    }
}
