//! ECDSA P-521 signing over SHA-512.
//!
//! Signed blobs are self-contained: `base64(DER(R, S) ‖ data)`. The DER
//! signature carries its own length, so the verifier can split the blob
//! without any out-of-band framing and hand back the covered bytes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use p521::ecdsa::signature::{Signer, Verifier};
use p521::ecdsa::{Signature, SigningKey, VerifyingKey};

use crate::error::{CryptoError, Result};

/// Outcome of verifying a signed blob.
///
/// `valid` is false when the signature does not check out against the
/// key; the blob being structurally malformed is an error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Whether the signature is valid for the embedded data.
    pub valid: bool,
    /// The data bytes the signature covers.
    pub data: Vec<u8>,
}

/// Sign `data` and produce a self-contained blob.
pub fn sign(data: &[u8], key: &SigningKey) -> Result<String> {
    let signature: Signature = key
        .try_sign(data)
        .map_err(|e| CryptoError::SignatureEncoding(e.to_string()))?;
    let der = signature.to_der();

    let mut blob = Vec::with_capacity(der.as_bytes().len() + data.len());
    blob.extend_from_slice(der.as_bytes());
    blob.extend_from_slice(data);
    Ok(BASE64.encode(blob))
}

/// Verify a signed blob and recover the data it covers.
pub fn verify(blob: &str, key: &VerifyingKey) -> Result<Verification> {
    let raw = BASE64
        .decode(blob)
        .map_err(|e| CryptoError::SignatureEncoding(e.to_string()))?;

    let sig_len = der_sequence_len(&raw)?;
    let (der, data) = raw.split_at(sig_len);

    let signature = Signature::from_der(der)
        .map_err(|e| CryptoError::SignatureEncoding(e.to_string()))?;

    let valid = key.verify(data, &signature).is_ok();
    Ok(Verification {
        valid,
        data: data.to_vec(),
    })
}

/// Total length of the DER SEQUENCE at the head of `raw`.
///
/// ECDSA signatures are short, so only the short form and the one- and
/// two-byte long forms can occur.
fn der_sequence_len(raw: &[u8]) -> Result<usize> {
    let malformed = || CryptoError::SignatureEncoding("malformed DER prefix".into());

    if raw.len() < 2 || raw[0] != 0x30 {
        return Err(malformed());
    }

    let (content_len, header_len) = match raw[1] {
        len @ 0x00..=0x7f => (len as usize, 2),
        0x81 => {
            if raw.len() < 3 {
                return Err(malformed());
            }
            (raw[2] as usize, 3)
        }
        0x82 => {
            if raw.len() < 4 {
                return Err(malformed());
            }
            (usize::from(raw[2]) << 8 | usize::from(raw[3]), 4)
        }
        _ => return Err(malformed()),
    };

    let total = header_len + content_len;
    if raw.len() < total {
        return Err(malformed());
    }
    Ok(total)
}
