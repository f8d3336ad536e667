use super::token::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ledger shared between the scanning pipeline (single writer) and readers.
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// A token held by an account, as returned by [`Ledger::tokens_by_account`].
#[derive(Debug, Clone, Serialize)]
pub struct Holding<'a> {
	pub token: &'a Token,
	pub account: &'a Account,
}

/// One activity entry tagged with its token.
#[derive(Debug, Clone, Serialize)]
pub struct AccountActivity<'a> {
	pub contract: &'a str,
	#[serde(flatten)]
	pub activity: &'a Activity,
}

/// Flattened activity entry for block-level listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockActivity {
	pub contract: String,
	pub account: String,
	#[serde(rename = "type")]
	pub kind: ActivityType,
	pub amount: u64,
}

/// In-memory store of every token derived from the chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "LedgerRecord")]
pub struct Ledger {
	/// Tokens in creation order.
	tokens: Vec<Token>,
	/// Height of the block currently being applied.
	height: u64,
	#[serde(skip)]
	index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct LedgerRecord {
	tokens: Vec<Token>,
	height: u64,
}

impl From<LedgerRecord> for Ledger {
	fn from(record: LedgerRecord) -> Self {
		let index = record
			.tokens
			.iter()
			.enumerate()
			.map(|(i, token)| (token.contract.clone(), i))
			.collect();
		Self {
			tokens: record.tokens,
			height: record.height,
			index,
		}
	}
}

impl Ledger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn shared(self) -> SharedLedger {
		Arc::new(RwLock::new(self))
	}

	pub fn height(&self) -> u64 {
		self.height
	}

	/// Record the height of the block about to be applied.
	///
	/// Each advance accrues one block of staking rewards on every SCP-2 token.
	pub fn set_block_height(&mut self, height: u64) {
		if height <= self.height {
			return;
		}
		self.height = height;
		for token in self.tokens.iter_mut() {
			token.accrue_rewards(height);
		}
	}

	pub fn register_token(&mut self, token: Token) -> Result<(), LedgerError> {
		if self.index.contains_key(&token.contract) {
			return Err(LedgerError::TokenExists(token.contract));
		}
		self.index
			.insert(token.contract.clone(), self.tokens.len());
		self.tokens.push(token);
		Ok(())
	}

	pub fn token(&self, contract: &str) -> Option<&Token> {
		self.index.get(contract).map(|&i| &self.tokens[i])
	}

	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	fn token_mut(&mut self, contract: &str) -> Result<&mut Token, LedgerError> {
		match self.index.get(contract) {
			Some(&i) => Ok(&mut self.tokens[i]),
			None => Err(LedgerError::TokenNotFound(contract.to_string())),
		}
	}

	/// Mint `amount` into the token creator's account.
	pub fn mint(&mut self, contract: &str, amount: u64, origin: &Origin<'_>) -> Result<(), LedgerError> {
		let token = self.token_mut(contract)?;
		let creator = token.creator.clone();
		token.credit_account(&creator, amount, origin)
	}

	pub fn burn(
		&mut self,
		contract: &str,
		address: &str,
		amount: u64,
		origin: &Origin<'_>,
	) -> Result<(), LedgerError> {
		self.token_mut(contract)?
			.debit_account(address, amount, origin)
	}

	pub fn transfer(
		&mut self,
		contract: &str,
		from: &str,
		to: &str,
		amount: u64,
		origin: &Origin<'_>,
	) -> Result<(), LedgerError> {
		self.token_mut(contract)?.transfer(from, to, amount, origin)
	}

	/// Redeem the caller's staking rewards, returning the redeemed amount.
	pub fn redeem(&mut self, contract: &str, address: &str, origin: &Origin<'_>) -> Result<u64, LedgerError> {
		self.token_mut(contract)?.redeem_rewards(address, origin)
	}

	pub fn staking_status(&self, contract: &str, address: &str) -> Result<StakingStatus, LedgerError> {
		self.token(contract)
			.ok_or_else(|| LedgerError::TokenNotFound(contract.to_string()))?
			.staking_status(address, self.height)
	}

	/// Every token `address` has an account in.
	pub fn tokens_by_account(&self, address: &str) -> Vec<Holding<'_>> {
		self.tokens
			.iter()
			.filter_map(|token| {
				token
					.account(address)
					.map(|account| Holding { token, account })
			})
			.collect()
	}

	/// History of `address` across all tokens, grouped by token in creation order.
	pub fn activity_by_account(&self, address: &str) -> Vec<AccountActivity<'_>> {
		self.tokens
			.iter()
			.filter_map(|token| token.account(address).map(|account| (token, account)))
			.flat_map(|(token, account)| {
				account.activity.iter().map(|activity| AccountActivity {
					contract: &token.contract,
					activity,
				})
			})
			.collect()
	}

	/// All activity recorded at `height`, across every token and account.
	pub fn block_activity(&self, height: u64) -> Vec<BlockActivity> {
		let mut entries = Vec::new();
		for token in &self.tokens {
			for account in &token.owners {
				for activity in account.activity.iter().filter(|a| a.block == height) {
					entries.push(BlockActivity {
						contract: token.contract.clone(),
						account: account.address.clone(),
						kind: activity.kind,
						amount: activity.amount,
					});
				}
			}
		}
		entries
	}

	/// Total number of activity records in the ledger.
	pub fn activity_count(&self) -> usize {
		self.tokens
			.iter()
			.flat_map(|t| t.owners.iter())
			.map(|a| a.activity.len())
			.sum()
	}
}
