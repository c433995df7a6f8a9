// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! Asking the card holder for consent before attributes are disclosed.
//!
//! The card talks to the user interface through the [`ConsentGate`] trait.  [`Gate`] wraps an
//! implementation and applies the configured [`UiPolicy`]: with an optional UI, a missing or
//! failing UI counts as consent, with a mandatory UI it aborts the proof.

#[cfg(unix)]
mod socket;

use zeroize::Zeroizing;

use crate::error::Error;

#[cfg(unix)]
pub use socket::{SocketGate, DEFAULT_SOCKET_PATH};

/// Status shown by the user interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum UiStatus {
    /// Waiting for a terminal
    Wait = 0x01,
    /// A terminal is talking to the card
    Present = 0x02,
    /// Operation succeeded
    Ok = 0x03,
    /// Something needs attention
    Warn = 0x04,
    /// Operation failed
    Fail = 0x05,
}

impl From<UiStatus> for u8 {
    fn from(status: UiStatus) -> u8 {
        status as u8
    }
}

/// Answer of the card holder to a disclosure request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Consent {
    /// Do not disclose
    Refuse = 0x01,
    /// Disclose this time
    ConsentOnce = 0x02,
    /// Disclose and remember the decision for this requester
    ConsentAlways = 0x03,
}

impl TryFrom<u8> for Consent {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0x01 => Ok(Self::Refuse),
            0x02 => Ok(Self::ConsentOnce),
            0x03 => Ok(Self::ConsentAlways),
            _ => {
                warn!("Unknown consent code 0x{code:02X}");
                Err(Error::ProtocolError)
            }
        }
    }
}

impl Consent {
    /// Whether the answer allows the disclosure
    pub fn is_granted(self) -> bool {
        !matches!(self, Self::Refuse)
    }
}

/// A user interface able to talk to the card holder.
///
/// Every call blocks until the user interface answers.
pub trait ConsentGate {
    /// Connects to the user interface
    fn connect(&mut self) -> Result<(), Error>;

    /// Closes the connection.  Does nothing if not connected.
    fn disconnect(&mut self);

    /// Whether the user interface is connected
    fn is_connected(&self) -> bool;

    /// Displays a status
    fn show_status(&mut self, status: UiStatus) -> Result<(), Error>;

    /// Asks the card holder for a PIN
    fn request_pin(&mut self) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Asks the card holder whether `requester` may see `attributes`.
    ///
    /// `allow_always` enables the [`Consent::ConsentAlways`] choice.
    fn request_consent(
        &mut self,
        requester: &str,
        attributes: &[&str],
        allow_always: bool,
    ) -> Result<Consent, Error>;

    /// Displays a message
    fn show_message(&mut self, message: &str) -> Result<(), Error>;
}

/// A user interface that is never reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUi;

impl ConsentGate for NoUi {
    fn connect(&mut self) -> Result<(), Error> {
        Err(Error::ConnectFailed)
    }

    fn disconnect(&mut self) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn show_status(&mut self, _status: UiStatus) -> Result<(), Error> {
        Err(Error::NotConnected)
    }

    fn request_pin(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        Err(Error::NotConnected)
    }

    fn request_consent(
        &mut self,
        _requester: &str,
        _attributes: &[&str],
        _allow_always: bool,
    ) -> Result<Consent, Error> {
        Err(Error::NotConnected)
    }

    fn show_message(&mut self, _message: &str) -> Result<(), Error> {
        Err(Error::NotConnected)
    }
}

/// How the card depends on the user interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UiPolicy {
    /// The user interface is not used, every disclosure is granted
    Disabled,
    /// The user interface is asked if reachable, otherwise the disclosure is granted
    Optional,
    /// Disclosures are only granted by the user interface
    Mandatory,
}

impl UiPolicy {
    /// Derives the policy from the `ui_enabled` and `ui_optional` settings
    pub fn new(enabled: bool, optional: bool) -> Self {
        match (enabled, optional) {
            (false, _) => Self::Disabled,
            (true, true) => Self::Optional,
            (true, false) => Self::Mandatory,
        }
    }
}

/// A [`ConsentGate`] together with the policy that applies to it.
#[derive(Debug)]
pub struct Gate<G> {
    ui: G,
    policy: UiPolicy,
}

impl<G: ConsentGate> Gate<G> {
    /// Wraps `ui` without connecting it
    pub fn new(ui: G, policy: UiPolicy) -> Self {
        Self { ui, policy }
    }

    /// The policy of the gate
    pub fn policy(&self) -> UiPolicy {
        self.policy
    }

    /// The wrapped user interface
    pub fn ui(&self) -> &G {
        &self.ui
    }

    /// The wrapped user interface
    pub fn ui_mut(&mut self) -> &mut G {
        &mut self.ui
    }

    /// Connects the user interface unless it is already connected or disabled.
    ///
    /// A single attempt is made.
    pub fn ensure_connected(&mut self) -> Result<(), Error> {
        if self.policy == UiPolicy::Disabled || self.ui.is_connected() {
            return Ok(());
        }
        self.ui.connect().map_err(|err| {
            warn!("Failed to connect to the user interface: {err}");
            err
        })
    }

    /// Shows `status` if the user interface is connected; failures are only logged.
    pub fn notify(&mut self, status: UiStatus) {
        if self.policy == UiPolicy::Disabled || !self.ui.is_connected() {
            return;
        }
        if let Err(err) = self.ui.show_status(status) {
            self.failed("show status", err);
        }
    }

    /// Disconnects the user interface if it is connected
    pub fn disconnect(&mut self) {
        if self.ui.is_connected() {
            debug!("Disconnecting from the user interface");
            self.ui.disconnect();
        }
    }

    /// Asks for consent to disclose `attributes` to `requester`, applying the policy.
    ///
    /// Returns whether the disclosure is granted.  An error is only returned if the user
    /// interface is mandatory and could not be asked.
    pub fn authorize(
        &mut self,
        requester: &str,
        attributes: &[&str],
        allow_always: bool,
    ) -> Result<bool, Error> {
        if self.policy == UiPolicy::Disabled {
            debug!("User interface disabled, disclosure implicitly granted");
            return Ok(true);
        }
        if let Err(err) = self.ensure_connected() {
            return self.fallback(err);
        }

        let consent = match self.ui.request_consent(requester, attributes, allow_always) {
            Ok(consent) => consent,
            Err(err) => {
                self.failed("request consent", err);
                return self.fallback(err);
            }
        };
        match consent {
            Consent::Refuse => {
                info!("Card holder refused the disclosure to {requester}");
                return Ok(false);
            }
            Consent::ConsentOnce => info!("Card holder granted the disclosure to {requester}"),
            Consent::ConsentAlways => {
                info!("Card holder always grants the disclosure to {requester}")
            }
        }

        if let Err(err) = self.ui.show_status(UiStatus::Present) {
            self.failed("show status", err);
            return self.fallback(err);
        }
        Ok(true)
    }

    fn failed(&mut self, operation: &str, err: Error) {
        error!("User interface failed to {operation}: {err}");
        self.ui.disconnect();
    }

    fn fallback(&self, err: Error) -> Result<bool, Error> {
        match self.policy {
            UiPolicy::Mandatory => Err(err),
            _ => {
                info!("User interface optional, disclosure implicitly granted");
                Ok(true)
            }
        }
    }
}
