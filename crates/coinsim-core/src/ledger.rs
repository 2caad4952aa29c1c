use std::collections::HashMap;

use tracing::{debug, info};

use crate::constants::{GENESIS_LABEL, GENESIS_PREVIOUS_HASH, SYSTEM_SENDER};
use crate::error::LedgerError;
use crate::{unix_timestamp, Block, BlockData, Hash, Transaction};

/// A fresh genesis block. Exempt from proof-of-work: its hash is computed
/// but never required to meet a difficulty target.
pub fn genesis_block() -> Block {
    Block::new(
        0,
        GENESIS_PREVIOUS_HASH,
        unix_timestamp(),
        BlockData::Genesis(GENESIS_LABEL.to_string()),
    )
}

/// The chain plus the balance table derived from it. Append-only: blocks
/// and accounts are never removed, and all mutation is caller-serialized.
pub struct Ledger {
    chain: Vec<Block>,
    difficulty: u32,
    balances: HashMap<String, i64>,
}

impl Ledger {
    /// A ledger seeded with a genesis block and an empty balance table.
    /// `difficulty` is the number of leading zero hex digits required of
    /// every subsequently mined block hash, fixed for the ledger's life.
    pub fn new(difficulty: u32) -> Self {
        Self {
            chain: vec![genesis_block()],
            difficulty,
            balances: HashMap::new(),
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Blocks in chain order, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn balances(&self) -> &HashMap<String, i64> {
        &self.balances
    }

    pub fn latest_block(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    /// Register a new account. Returns false and leaves the table untouched
    /// if the name is already taken. Negative initial balances are accepted.
    pub fn create_account(&mut self, name: &str, initial_balance: i64) -> bool {
        if self.balances.contains_key(name) {
            return false;
        }
        self.balances.insert(name.to_string(), initial_balance);
        debug!("created account '{}' with balance {}", name, initial_balance);
        true
    }

    /// Stored balance, or 0 for unknown accounts. Never fails, never
    /// inserts.
    pub fn get_balance(&self, account: &str) -> i64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Validated transfer: checks that both accounts exist and the sender
    /// can cover `amount`, then builds a candidate block and appends it
    /// under mining. These checks live only here; `append_block` trusts its
    /// caller.
    pub fn transfer(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: u64,
    ) -> Result<Hash, LedgerError> {
        if !self.balances.contains_key(sender) {
            return Err(LedgerError::UnknownSender(sender.to_string()));
        }
        if !self.balances.contains_key(receiver) {
            return Err(LedgerError::UnknownReceiver(receiver.to_string()));
        }
        let balance = self.get_balance(sender);
        if balance < amount as i64 {
            return Err(LedgerError::InsufficientBalance {
                account: sender.to_string(),
                balance,
                amount,
            });
        }

        // previous_hash is a placeholder here; append_block relinks it.
        let candidate = Block::new(
            self.chain.len() as u64,
            GENESIS_PREVIOUS_HASH,
            unix_timestamp(),
            BlockData::Transfer(Transaction {
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                amount,
            }),
        );
        self.append_block(candidate)
    }

    /// Link the candidate to the current tip, mine it at the ledger's
    /// difficulty, push it, then apply its transfer to the balance table.
    /// The balance step runs only after a successful append, so chain and
    /// balances never diverge.
    ///
    /// No account checks happen here: a sender missing from the table is
    /// created at 0 and debited negative. Callers validate first (see
    /// `transfer`).
    pub fn append_block(&mut self, mut candidate: Block) -> Result<Hash, LedgerError> {
        candidate.previous_hash = self.latest_block()?.hash;
        candidate.hash = candidate.compute_hash();
        let mined = candidate.mine(self.difficulty);
        info!(
            "mined block {} with nonce {} and hash {}",
            candidate.index,
            candidate.nonce,
            hex::encode(mined)
        );

        let data = candidate.data.clone();
        self.chain.push(candidate);
        self.apply_block_data(&data);
        Ok(mined)
    }

    /// Balance bookkeeping for one appended block. Genesis payloads are
    /// inert; a transfer debits the sender (unless it is the SYSTEM name)
    /// and credits the receiver, creating missing entries at 0.
    fn apply_block_data(&mut self, data: &BlockData) {
        if let BlockData::Transfer(tx) = data {
            if tx.sender != SYSTEM_SENDER {
                *self.balances.entry(tx.sender.clone()).or_insert(0) -= tx.amount as i64;
            }
            *self.balances.entry(tx.receiver.clone()).or_insert(0) += tx.amount as i64;
            debug!("applied transfer {} to balances", tx);
        }
    }

    /// Recompute every non-genesis hash and re-check linkage against the
    /// predecessor. Pure read; one digest per block.
    pub fn is_chain_valid(&self) -> bool {
        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let previous = &self.chain[i - 1];
            if current.hash != current.compute_hash() {
                return false;
            }
            if current.previous_hash != previous.hash {
                return false;
            }
        }
        true
    }
}
