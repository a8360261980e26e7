//! Human-readable labels for keys found in credentials.
//!
//! Labels resolve in a fixed priority order: known space, local identity,
//! contact, then the truncated key itself.

use feedscope_core::display_name::generate_name;
use feedscope_core::{Credential, PublicKey};
use feedscope_feeds::{Contact, IdentityDirectory, Space, SpaceManager};

use crate::graph::NodeContent;

/// Credential type rendered when the assertion carries none.
pub const UNKNOWN_TYPE: &str = "unknown_type";

/// Label resolver over a snapshot of spaces, the local identity and contacts.
#[derive(Clone, Debug, Default)]
pub struct CredentialAnnotator {
    spaces: Vec<Space>,
    identity_key: Option<PublicKey>,
    device_key: Option<PublicKey>,
    contacts: Vec<Contact>,
}

impl CredentialAnnotator {
    /// Snapshot the current state of `spaces` and `identity`.
    pub fn snapshot(spaces: &dyn SpaceManager, identity: &dyn IdentityDirectory) -> Self {
        Self {
            spaces: spaces.spaces(),
            identity_key: identity.identity_key(),
            device_key: identity.device_key(),
            contacts: identity.contacts(),
        }
    }

    /// Label for an identity key and optional device key.
    pub fn label(&self, identity_key: &PublicKey, device_key: Option<&PublicKey>) -> String {
        if let Some(space) = self.spaces.iter().find(|s| &s.key == identity_key) {
            return match &space.name {
                Some(name) if space.is_open => name.clone(),
                _ => format!("Space ({})", identity_key.truncate()),
            };
        }

        let suffix = device_key.unwrap_or(identity_key).truncate();

        if self.identity_key.as_ref() == Some(identity_key) {
            let name = if device_key.is_some() && device_key == self.device_key.as_ref() {
                "this device"
            } else {
                "my device"
            };
            return format!("{name} ({suffix})");
        }

        if let Some(contact) = self.contacts.iter().find(|c| &c.identity_key == identity_key) {
            let name = contact
                .display_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| generate_name(&identity_key.to_hex()));
            return format!("{name} ({suffix})");
        }

        match device_key {
            Some(device) => format!("{} ({})", identity_key.truncate(), device.truncate()),
            None => identity_key.truncate(),
        }
    }

    /// Node content for a credential.
    pub fn content(&self, credential: &Credential) -> NodeContent {
        NodeContent {
            credential_type: credential
                .credential_type()
                .unwrap_or(UNKNOWN_TYPE)
                .to_owned(),
            issuer: self.label(&credential.issuer, credential.signer()),
            subject: self.label(&credential.subject.id, None),
        }
    }
}
