//! RSA key management and vote signatures.
//!
//! The voter's hex-encoded DER public key is both identity and verification
//! material: it is committed into the signed payload and independently
//! imported to verify the signature. Signatures are PKCS#1 v1.5 over the
//! SHA-256 of the canonical payload string.
//!
//! Besides the stateless sign/verify operations, a [`Ballot`] owns the
//! node's own keypair (used for mining rewards and server-side signing) and
//! persists it as a two-line `ballot-<node_id>.txt` file: public key first,
//! private key second.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::types::Vote;

/// Key length in bits for voter and miner keypairs.
///
/// Demo-grade on purpose; raising it changes no wire format.
pub const RSA_BITS: usize = 1024;

/// Errors from key generation, encoding, and ballot file I/O.
#[derive(Debug)]
pub enum BallotError {
    /// Key generation, import, or signing failure.
    Key(String),
    /// Ballot file could not be read or written.
    Io(std::io::Error),
}

impl fmt::Display for BallotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallotError::Key(msg) => write!(f, "key error: {msg}"),
            BallotError::Io(err) => write!(f, "ballot file error: {err}"),
        }
    }
}

impl std::error::Error for BallotError {}

impl From<std::io::Error> for BallotError {
    fn from(err: std::io::Error) -> Self {
        BallotError::Io(err)
    }
}

/// Creates, loads, and holds the node's keypair; signs and verifies votes.
#[derive(Clone, Debug)]
pub struct Ballot {
    node_id: u16,
    data_dir: PathBuf,
    /// Hex-encoded SPKI DER public key, once created or loaded.
    pub public_key: Option<String>,
    /// Hex-encoded PKCS#8 DER private key, once created or loaded.
    pub private_key: Option<String>,
}

impl Ballot {
    /// A ballot with no keys yet, persisting under `data_dir`.
    pub fn new(node_id: u16, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_id,
            data_dir: data_dir.into(),
            public_key: None,
            private_key: None,
        }
    }

    fn key_file(&self) -> PathBuf {
        self.data_dir.join(format!("ballot-{}.txt", self.node_id))
    }

    /// Generates a fresh RSA-1024 keypair from the OS entropy source.
    ///
    /// Returns `(private_hex, public_hex)`, both hex-encoded DER.
    pub fn generate_keys() -> Result<(String, String), BallotError> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_BITS)
            .map_err(|e| BallotError::Key(format!("failed to generate keypair: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_der = private_key
            .to_pkcs8_der()
            .map_err(|e| BallotError::Key(format!("failed to encode private key: {e}")))?;
        let public_der = public_key
            .to_public_key_der()
            .map_err(|e| BallotError::Key(format!("failed to encode public key: {e}")))?;

        Ok((
            hex::encode(private_der.as_bytes()),
            hex::encode(public_der.as_bytes()),
        ))
    }

    /// Generates a fresh keypair and installs it as this node's ballot.
    pub fn create_keys(&mut self) -> Result<(), BallotError> {
        let (private_key, public_key) = Self::generate_keys()?;
        self.private_key = Some(private_key);
        self.public_key = Some(public_key);
        Ok(())
    }

    /// Writes the keypair to the ballot file: public key, then private key.
    pub fn save_keys(&self) -> Result<(), BallotError> {
        let (Some(public_key), Some(private_key)) = (&self.public_key, &self.private_key) else {
            return Err(BallotError::Key("no keypair to save".to_string()));
        };
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.key_file(), format!("{public_key}\n{private_key}"))?;
        Ok(())
    }

    /// Loads the keypair from the ballot file into memory.
    pub fn load_keys(&mut self) -> Result<(), BallotError> {
        let raw = fs::read_to_string(self.key_file())?;
        let mut lines = raw.lines();
        let (Some(public_key), Some(private_key)) = (lines.next(), lines.next()) else {
            return Err(BallotError::Key("ballot file is truncated".to_string()));
        };
        self.public_key = Some(public_key.to_string());
        self.private_key = Some(private_key.to_string());
        Ok(())
    }

    /// Signs the canonical payload `voter + candidate + amount`.
    ///
    /// `voter_private_key` is the voter's hex-encoded PKCS#8 DER key; the
    /// returned signature is hex-encoded.
    pub fn sign_vote(
        voter: &str,
        voter_private_key: &str,
        candidate: &str,
        amount: u64,
    ) -> Result<String, BallotError> {
        let der = hex::decode(voter_private_key)
            .map_err(|e| BallotError::Key(format!("private key is not valid hex: {e}")))?;
        let key = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| BallotError::Key(format!("failed to import private key: {e}")))?;

        let digest = Sha256::digest(format!("{voter}{candidate}{amount}").as_bytes());
        let signature = key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest.as_slice())
            .map_err(|e| BallotError::Key(format!("signing failed: {e}")))?;
        Ok(hex::encode(signature))
    }

    /// Verifies a vote's signature against its stated voter.
    ///
    /// Returns `false` on any decode or verification failure, including
    /// coinbase votes (their voter slot is not a key).
    pub fn verify_vote(vote: &Vote) -> bool {
        let Ok(der) = hex::decode(&vote.voter) else {
            return false;
        };
        let Ok(key) = RsaPublicKey::from_public_key_der(&der) else {
            return false;
        };
        let Ok(signature) = hex::decode(&vote.signature) else {
            return false;
        };
        let digest = Sha256::digest(vote.signing_payload().as_bytes());
        key.verify(Pkcs1v15Sign::new::<Sha256>(), digest.as_slice(), &signature)
            .is_ok()
    }
}

/// Shared `(private_hex, public_hex)` pair for tests; keygen is the slow
/// part, so it runs once per test binary.
#[cfg(test)]
pub(crate) fn test_keypair() -> &'static (String, String) {
    use std::sync::OnceLock;
    static KEYS: OnceLock<(String, String)> = OnceLock::new();
    KEYS.get_or_init(|| Ballot::generate_keys().expect("keypair generation should succeed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrips() {
        let (private_key, public_key) = test_keypair();
        let signature =
            Ballot::sign_vote(public_key, private_key, "candidate", 1).expect("signing");
        let vote = Vote::new(public_key.clone(), "candidate", signature, 1);
        assert!(Ballot::verify_vote(&vote));
    }

    #[test]
    fn verify_rejects_payload_changes() {
        let (private_key, public_key) = test_keypair();
        let signature =
            Ballot::sign_vote(public_key, private_key, "candidate", 1).expect("signing");

        let other_candidate = Vote::new(public_key.clone(), "someone-else", signature.clone(), 1);
        assert!(!Ballot::verify_vote(&other_candidate));

        let other_amount = Vote::new(public_key.clone(), "candidate", signature, 2);
        assert!(!Ballot::verify_vote(&other_amount));
    }

    #[test]
    fn verify_rejects_garbage_without_panicking() {
        let not_hex = Vote::new("zz-not-hex", "candidate", "zz", 1);
        assert!(!Ballot::verify_vote(&not_hex));

        let not_a_key = Vote::new("deadbeef", "candidate", "deadbeef", 1);
        assert!(!Ballot::verify_vote(&not_a_key));

        let coinbase = Vote::coinbase("miner");
        assert!(!Ballot::verify_vote(&coinbase));
    }

    #[test]
    fn ballot_file_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ballot = Ballot::new(8900, dir.path());
        ballot.create_keys().expect("create keys");
        ballot.save_keys().expect("save keys");

        let mut reloaded = Ballot::new(8900, dir.path());
        reloaded.load_keys().expect("load keys");
        assert_eq!(reloaded.public_key, ballot.public_key);
        assert_eq!(reloaded.private_key, ballot.private_key);
    }

    #[test]
    fn saving_without_keys_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ballot = Ballot::new(8900, dir.path());
        assert!(ballot.save_keys().is_err());
    }

    #[test]
    fn loading_a_missing_ballot_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ballot = Ballot::new(8901, dir.path());
        assert!(ballot.load_keys().is_err());
    }
}
