//! Vote record and its canonical forms.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{MINING_REWARD, MINING_SENDER};

/// A single vote, immutable once constructed.
///
/// `voter` is the hex-encoded DER public key of the voting participant (or
/// [`MINING_SENDER`] for coinbase votes) and doubles as the voter's
/// identity. `signature` is the hex-encoded PKCS#1 v1.5 signature over the
/// canonical payload `voter + candidate + amount`; coinbase votes carry an
/// empty signature.
///
/// Field order here defines the wire and snapshot JSON shape. Equality is
/// the full four-tuple, which is what mempool pruning matches on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Hex-encoded public key of the voter, or the coinbase literal.
    pub voter: String,
    /// Hex-encoded public key (or opaque identifier) receiving the vote.
    pub candidate: String,
    /// Vote weight; ordinary votes carry `1`.
    pub amount: u64,
    /// Hex-encoded signature over the canonical payload; empty for coinbase.
    pub signature: String,
}

impl Vote {
    /// Constructs a vote. Argument order mirrors the broadcast wire fields.
    pub fn new(
        voter: impl Into<String>,
        candidate: impl Into<String>,
        signature: impl Into<String>,
        amount: u64,
    ) -> Self {
        Self {
            voter: voter.into(),
            candidate: candidate.into(),
            amount,
            signature: signature.into(),
        }
    }

    /// Builds the coinbase vote rewarding `miner` with [`MINING_REWARD`].
    pub fn coinbase(miner: &str) -> Self {
        Self::new(MINING_SENDER, miner, "", MINING_REWARD)
    }

    /// Returns `true` for coinbase votes.
    pub fn is_coinbase(&self) -> bool {
        self.voter == MINING_SENDER
    }

    /// The exact UTF-8 string the voter signs.
    ///
    /// Committing the voter's key into the payload binds the signature to
    /// the identity it will be verified against.
    pub fn signing_payload(&self) -> String {
        format!("{}{}{}", self.voter, self.candidate, self.amount)
    }

    /// Signature-free canonical form used as hash and proof-of-work input.
    ///
    /// Serializing the returned [`Value`] always yields keys in sorted
    /// order, so the same vote produces the same bytes on every platform.
    pub fn to_hash_value(&self) -> Value {
        json!({
            "voter": self.voter,
            "candidate": self.candidate,
            "amount": self.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_keeps_field_order() {
        let vote = Vote::new("v", "c", "sig", 1);
        let encoded = serde_json::to_string(&vote).expect("vote should serialize");
        assert_eq!(
            encoded,
            r#"{"voter":"v","candidate":"c","amount":1,"signature":"sig"}"#
        );
    }

    #[test]
    fn hash_value_sorts_keys_and_drops_signature() {
        let vote = Vote::new("v", "c", "sig", 1);
        assert_eq!(
            vote.to_hash_value().to_string(),
            r#"{"amount":1,"candidate":"c","voter":"v"}"#
        );
    }

    #[test]
    fn coinbase_carries_reward_and_empty_signature() {
        let vote = Vote::coinbase("miner-pk");
        assert!(vote.is_coinbase());
        assert_eq!(vote.candidate, "miner-pk");
        assert_eq!(vote.amount, MINING_REWARD);
        assert!(vote.signature.is_empty());
    }

    #[test]
    fn equality_is_the_full_four_tuple() {
        let vote = Vote::new("v", "c", "sig", 1);
        assert_eq!(vote, Vote::new("v", "c", "sig", 1));
        assert_ne!(vote, Vote::new("v", "c", "other-sig", 1));
    }

    #[test]
    fn wire_shape_roundtrips() {
        let json = r#"{"voter":"v","candidate":"c","amount":2,"signature":"s"}"#;
        let vote: Vote = serde_json::from_str(json).expect("vote should parse");
        assert_eq!(vote.voter, "v");
        assert_eq!(vote.amount, 2);
    }
}
