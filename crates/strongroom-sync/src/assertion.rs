//! Signed sender assertions.
//!
//! Every change envelope carries a blob the sender signed over their
//! own name and a timestamp. The raw bytes of that blob double as the
//! AAD of the envelope payload, binding ciphertext and sender identity
//! together: swapping either breaks decryption.

use serde::{Deserialize, Serialize};

use strongroom_core::{Signer, Verifier};

use crate::error::{Result, SyncError};

/// The claim a sender signs when enqueueing a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderAssertion {
    /// Sender's user name.
    pub sender: String,
    /// Unix ms at signing time.
    pub issued_at: i64,
}

impl SenderAssertion {
    /// CBOR-encode and sign, producing the blob stored on envelopes.
    pub fn seal<S: Signer>(sender: &str, issued_at: i64, signer: &S) -> Result<String> {
        let assertion = Self {
            sender: sender.to_string(),
            issued_at,
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&assertion, &mut buf)
            .map_err(|e| SyncError::Codec(e.to_string()))?;
        Ok(signer.sign(&buf)?)
    }

    /// Verify a sealed assertion against the claimed sender's key and
    /// confirm it names that sender.
    pub fn open<V: Verifier>(blob: &str, expected_sender: &str, authority: &V) -> Result<Self> {
        let verification = authority
            .verify(blob)
            .map_err(|e| SyncError::BadAssertion(e.to_string()))?;
        if !verification.valid {
            return Err(SyncError::BadAssertion("signature invalid".into()));
        }

        let assertion: Self = ciborium::from_reader(&verification.data[..])
            .map_err(|e| SyncError::Codec(e.to_string()))?;
        if assertion.sender != expected_sender {
            return Err(SyncError::BadAssertion(format!(
                "assertion names {} but envelope names {}",
                assertion.sender, expected_sender
            )));
        }
        Ok(assertion)
    }
}
