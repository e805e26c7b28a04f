//! Delegation grant tokens.
//!
//! A [`Grant`] records that `signer` gave `grantee` access to an entry.
//! The signature covers the colon-joined `entry:grantee:signer` string,
//! so a grant cannot be replayed for a different entry or user.

use serde::{Deserialize, Serialize};

use strongroom_core::{EntryId, Signer, Verifier};

use crate::error::Result;

/// A signed delegation token binding (entry, grantee, signer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub entry_id: EntryId,
    /// Name of the user receiving access.
    pub grantee: String,
    /// Name of the user who issued the grant.
    pub signer: String,
    /// Self-contained signed blob over the grant message.
    pub signature: String,
}

impl Grant {
    /// The canonical byte string a grant signature covers.
    pub fn message(entry_id: &EntryId, grantee: &str, signer: &str) -> String {
        format!("{}:{}:{}", entry_id.as_str(), grantee, signer)
    }

    /// Issue a new grant signed by `signer`.
    pub fn mint<S: Signer>(
        entry_id: EntryId,
        grantee: &str,
        signer_name: &str,
        signer: &S,
    ) -> Result<Self> {
        let message = Self::message(&entry_id, grantee, signer_name);
        let signature = signer.sign(message.as_bytes())?;
        Ok(Self {
            entry_id,
            grantee: grantee.to_string(),
            signer: signer_name.to_string(),
            signature,
        })
    }

    /// Re-issue this grant under a different signer.
    ///
    /// Used when the original signer changes keys or is removed and an
    /// admin takes over authorship.
    pub fn reissue<S: Signer>(&self, signer_name: &str, signer: &S) -> Result<Self> {
        Self::mint(self.entry_id.clone(), &self.grantee, signer_name, signer)
    }

    /// Whether this grant names the given entry and grantee.
    pub fn is_for(&self, entry_id: &EntryId, grantee: &str) -> bool {
        self.entry_id == *entry_id && self.grantee == grantee
    }

    /// Check the signature against the signer's public key and confirm
    /// it covers exactly this grant's bindings. Any failure is denial.
    pub fn is_valid<V: Verifier>(&self, authority: &V) -> bool {
        let verification = match authority.verify(&self.signature) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let expected = Self::message(&self.entry_id, &self.grantee, &self.signer);
        verification.valid && verification.data == expected.as_bytes()
    }
}
