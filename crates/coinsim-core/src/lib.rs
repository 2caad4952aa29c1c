use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod error;
mod ledger;

pub use error::LedgerError;
pub use ledger::{genesis_block, Ledger};

use constants::HASH_SIZE;

pub type Hash = [u8; HASH_SIZE];

/// One transfer between named accounts. A sender equal to
/// `constants::SYSTEM_SENDER` creates value instead of debiting anyone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: u64,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.receiver, self.amount)
    }
}

/// Block payload: the genesis block carries a free-form label, every other
/// block carries exactly one transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockData {
    Genesis(String),
    Transfer(Transaction),
}

impl BlockData {
    /// Canonical byte form folded into the block hash. Compact JSON keeps
    /// field order fixed, so identical payloads always hash identically.
    fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }
}

impl fmt::Display for BlockData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockData::Genesis(label) => write!(f, "{label}"),
            BlockData::Transfer(tx) => write!(f, "{tx}"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub data: BlockData,
    pub nonce: u64,
    pub hash: Hash,
}

impl Block {
    /// Build a block with nonce 0 and its hash computed immediately.
    pub fn new(index: u64, previous_hash: Hash, timestamp: u64, data: BlockData) -> Self {
        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            data,
            nonce: 0,
            hash: [0u8; HASH_SIZE],
        };
        block.hash = block.compute_hash();
        block
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let data = self.data.canonical_bytes();
        let mut bytes = Vec::with_capacity(8 + HASH_SIZE + 8 + data.len() + 8);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.previous_hash);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&data);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.hash_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(&digest[..]);
        out
    }

    /// Proof-of-work search: bump the nonce and rehash until the hash starts
    /// with `difficulty` zero hex digits, then return the accepted hash.
    /// Unbounded; callers pick difficulties that terminate in practice.
    pub fn mine(&mut self, difficulty: u32) -> Hash {
        while !pow::meets_difficulty(&self.hash, difficulty) {
            self.nonce += 1;
            self.hash = self.compute_hash();
        }
        self.hash
    }
}

/// Seconds since the Unix epoch.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

pub mod pow {
    use super::Hash;

    /// Number of leading `'0'` characters in the hex encoding of `hash`,
    /// counted directly over its nibbles.
    pub fn count_leading_zero_digits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if *b >> 4 == 0 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        count_leading_zero_digits(hash) >= difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENESIS_PREVIOUS_HASH;

    fn sample_data() -> BlockData {
        BlockData::Transfer(Transaction {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: 40,
        })
    }

    #[test]
    fn zero_digit_count_examples() {
        let mut h = [0u8; 32];
        assert_eq!(pow::count_leading_zero_digits(&h), 64);
        h[0] = 0x0F; // hex "0f..."
        assert_eq!(pow::count_leading_zero_digits(&h), 1);
        h[0] = 0xF0; // hex "f0..."
        assert_eq!(pow::count_leading_zero_digits(&h), 0);
        h = [0u8; 32];
        h[1] = 0x10; // hex "0010..."
        assert_eq!(pow::count_leading_zero_digits(&h), 2);
        h[1] = 0x01; // hex "0001..."
        assert_eq!(pow::count_leading_zero_digits(&h), 3);
    }

    #[test]
    fn meets_difficulty_examples() {
        let mut h = [0u8; 32];
        h[1] = 0x10; // two leading zero digits
        assert!(pow::meets_difficulty(&h, 0));
        assert!(pow::meets_difficulty(&h, 2));
        assert!(!pow::meets_difficulty(&h, 3));
    }

    #[test]
    fn block_hash_example() {
        let block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let expected_hex = "a213a3565145a955d8969e4f902869274f33a3df5210d8a8d4ffb658ff0bf3e7";
        assert_eq!(hex::encode(block.hash), expected_hex);
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn genesis_hash_example() {
        let block = Block::new(
            0,
            GENESIS_PREVIOUS_HASH,
            1_600_000_000,
            BlockData::Genesis("Genesis Block".to_string()),
        );
        let expected_hex = "fff38b6584265540edade45882a4072194a3d553cfd9c694f60992db37f65e98";
        assert_eq!(hex::encode(block.hash), expected_hex);
    }

    #[test]
    fn block_hash_consistency() {
        let block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let mut block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let hash1 = block.compute_hash();
        block.nonce += 1;
        let hash2 = block.compute_hash();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn block_hash_changes_with_previous_hash() {
        let block1 = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let block2 = Block::new(1, [7u8; 32], 1_600_000_000, sample_data());
        assert_ne!(block1.hash, block2.hash);
    }

    #[test]
    fn mine_block_example() {
        let mut block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let mined = block.mine(2);
        assert!(hex::encode(mined).starts_with("00"));
        assert!(pow::meets_difficulty(&mined, 2));
        assert_eq!(block.hash, mined);
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn mine_at_zero_difficulty_keeps_nonce() {
        let mut block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let before = block.hash;
        let mined = block.mine(0);
        assert_eq!(block.nonce, 0);
        assert_eq!(mined, before);
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: 40,
        };
        let json = serde_json::to_string(&tx).unwrap();
        let expected_json = r#"{"sender":"alice","receiver":"bob","amount":40}"#;
        assert_eq!(json, expected_json);
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn block_data_serialization_example() {
        let genesis = BlockData::Genesis("Genesis Block".to_string());
        assert_eq!(
            serde_json::to_string(&genesis).unwrap(),
            r#"{"Genesis":"Genesis Block"}"#
        );
        let transfer = sample_data();
        assert_eq!(
            serde_json::to_string(&transfer).unwrap(),
            r#"{"Transfer":{"sender":"alice","receiver":"bob","amount":40}}"#
        );
    }

    #[test]
    fn block_serialization_example() {
        let block = Block::new(1, GENESIS_PREVIOUS_HASH, 1_600_000_000, sample_data());
        let json = serde_json::to_string(&block).unwrap();
        let deserialized: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block.index, deserialized.index);
        assert_eq!(block.previous_hash, deserialized.previous_hash);
        assert_eq!(block.timestamp, deserialized.timestamp);
        assert_eq!(block.data, deserialized.data);
        assert_eq!(block.nonce, deserialized.nonce);
        assert_eq!(block.hash, deserialized.hash);
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            BlockData::Genesis("Genesis Block".to_string()).to_string(),
            "Genesis Block"
        );
        assert_eq!(sample_data().to_string(), "alice -> bob: 40");
    }
}
