// Copyright (C) 2022 Nitrokey GmbH
// SPDX-License-Identifier: LGPL-3.0-only

//! The credentials held by the card.
//!
//! Parsing credential files and loading the issuer keys is done by a [`CredentialLoader`]
//! outside of this crate.  The card only needs the metadata of a credential and hands the opaque
//! handle back to the [`Prover`][`crate::prover::Prover`].

use std::path::Path;

use crate::error::Error;

/// A credential issued to the card holder.
#[derive(Clone, Debug)]
pub struct Credential<H> {
    id: u16,
    name: String,
    issuer: String,
    attributes: Vec<String>,
    handle: H,
}

impl<H> Credential<H> {
    /// Creates a credential; `attributes` must follow the order used by the issuer.
    pub fn new(
        id: u16,
        name: impl Into<String>,
        issuer: impl Into<String>,
        attributes: impl IntoIterator<Item = impl Into<String>>,
        handle: H,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            issuer: issuer.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            handle,
        }
    }

    /// The numeric id used by PROVE CREDENTIAL
    pub fn id(&self) -> u16 {
        self.id
    }

    /// The name of the credential
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The issuer of the credential
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The attribute names in declaration order
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Number of attributes, not counting the master secret
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// The prover-specific secret material (signature, master secret, issuer key, ...)
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// Source of credentials, e.g. a directory of credential files.
pub trait CredentialLoader {
    /// The prover handle attached to each credential
    type Handle;

    /// Loads every credential stored in `dir`.
    fn load_all(&mut self, dir: &Path) -> Result<Vec<Credential<Self::Handle>>, Error>;
}

/// The credentials known to the card, looked up by id.
#[derive(Clone, Debug)]
pub struct Catalog<H> {
    credentials: Vec<Credential<H>>,
}

impl<H> Default for Catalog<H> {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
        }
    }
}

impl<H> Catalog<H> {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills a catalog from a loader.
    ///
    /// A failing loader is logged and results in an empty catalog: the card keeps answering
    /// SELECT and reports unknown credentials.
    pub fn load<L>(loader: &mut L, dir: &Path) -> Self
    where
        L: CredentialLoader<Handle = H>,
    {
        match loader.load_all(dir) {
            Ok(credentials) => credentials.into_iter().collect(),
            Err(err) => {
                error!("Failed to load credentials from {}: {err}", dir.display());
                Self::new()
            }
        }
    }

    /// Adds a credential, replacing and returning one with the same id.
    pub fn insert(&mut self, credential: Credential<H>) -> Option<Credential<H>> {
        info!(
            "Loaded credential {} issued by {}",
            credential.name(),
            credential.issuer()
        );
        match self.position(credential.id()) {
            Some(index) => {
                let replaced = core::mem::replace(&mut self.credentials[index], credential);
                warn!(
                    "Credential id 0x{:04X} already in use, {} from {} replaced",
                    replaced.id(),
                    replaced.name(),
                    replaced.issuer()
                );
                Some(replaced)
            }
            None => {
                self.credentials.push(credential);
                None
            }
        }
    }

    /// Returns the credential with the given id
    pub fn get(&self, id: u16) -> Option<&Credential<H>> {
        self.credentials.iter().find(|c| c.id() == id)
    }

    pub(crate) fn position(&self, id: u16) -> Option<usize> {
        self.credentials.iter().position(|c| c.id() == id)
    }

    pub(crate) fn by_index(&self, index: usize) -> Option<&Credential<H>> {
        self.credentials.get(index)
    }

    /// Number of credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the catalog holds no credential
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Iterates over all credentials
    pub fn iter(&self) -> impl Iterator<Item = &Credential<H>> {
        self.credentials.iter()
    }
}

impl<H> FromIterator<Credential<H>> for Catalog<H> {
    fn from_iter<I: IntoIterator<Item = Credential<H>>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for credential in iter {
            catalog.insert(credential);
        }
        catalog
    }
}
