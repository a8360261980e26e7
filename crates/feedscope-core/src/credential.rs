//! Signed credentials replicated through control feeds.
//!
//! Only the fields the pipeline reads are modelled: the issuer, the subject
//! with its typed assertion, and the proof signer. Missing pieces degrade to
//! `None` rather than failing deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keys::PublicKey;

/// A signed assertion binding an issuer key to a subject key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Key that issued the credential.
    pub issuer: PublicKey,
    /// Subject of the claim.
    pub subject: CredentialSubject,
    /// Signature proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

/// Subject of a [`Credential`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    /// Subject key.
    pub id: PublicKey,
    /// Typed claim; its `"@type"` field names the credential type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Value>,
}

/// Proof attached to a [`Credential`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Device (or identity) key that produced the signature.
    pub signer: PublicKey,
}

impl Credential {
    /// Build a credential with an assertion of the given type.
    #[must_use]
    pub fn new(issuer: PublicKey, subject: PublicKey, assertion_type: &str) -> Self {
        Self {
            issuer,
            subject: CredentialSubject {
                id: subject,
                assertion: Some(serde_json::json!({ "@type": assertion_type })),
            },
            proof: None,
        }
    }

    /// Attach a proof signed by `signer`.
    #[must_use]
    pub fn signed_by(mut self, signer: PublicKey) -> Self {
        self.proof = Some(Proof { signer });
        self
    }

    /// The assertion's `"@type"`, when present.
    pub fn credential_type(&self) -> Option<&str> {
        self.subject
            .assertion
            .as_ref()
            .and_then(|a| a.get("@type"))
            .and_then(Value::as_str)
    }

    /// The proof signer, when a proof is attached.
    pub fn signer(&self) -> Option<&PublicKey> {
        self.proof.as_ref().map(|p| &p.signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes(vec![b; 4])
    }

    #[test]
    fn credential_type_reads_assertion() {
        let cred = Credential::new(key(1), key(2), "dxos.halo.credentials.SpaceMember");
        assert_eq!(
            cred.credential_type(),
            Some("dxos.halo.credentials.SpaceMember")
        );
    }

    #[test]
    fn missing_assertion_has_no_type() {
        let mut cred = Credential::new(key(1), key(2), "x");
        cred.subject.assertion = None;
        assert_eq!(cred.credential_type(), None);

        cred.subject.assertion = Some(serde_json::json!({ "role": "admin" }));
        assert_eq!(cred.credential_type(), None);
    }

    #[test]
    fn signer_comes_from_proof() {
        let cred = Credential::new(key(1), key(2), "x");
        assert!(cred.signer().is_none());
        let cred = cred.signed_by(key(3));
        assert_eq!(cred.signer(), Some(&key(3)));
    }

    #[test]
    fn deserializes_without_proof() {
        let json = serde_json::json!({
            "issuer": "01010101",
            "subject": { "id": "02020202" }
        });
        let cred: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(cred.issuer, key(1));
        assert!(cred.proof.is_none());
        assert!(cred.subject.assertion.is_none());
    }
}
