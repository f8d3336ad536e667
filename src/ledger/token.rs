//! Token, account and activity records.
//!
//! Every balance change goes through a method on [`Token`], which validates the change
//! before touching any account and then appends exactly one [`Activity`] per affected
//! account. A rejected change leaves the token untouched.

use serde::{Deserialize, Serialize};

/// Kind of ledger mutation recorded in an account's history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
	/// Issuer credit via `mint`.
	Mint,
	/// Debit via `burn`.
	Burn,
	/// Credit from a `send` by another account.
	Received,
	/// Debit by a `send` to another account.
	Sent,
	/// Unclaimed staking rewards moved to the spendable balance.
	Redeem,
}

/// Immutable record of one balance change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
	#[serde(rename = "type")]
	pub kind: ActivityType,
	pub amount: u64,
	/// Base-chain height of the block containing `txid`.
	pub block: u64,
	pub txid: String,
}

/// The transaction and block a mutation originates from.
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
	pub txid: &'a str,
	pub height: u64,
}

impl Origin<'_> {
	fn activity(&self, kind: ActivityType, amount: u64) -> Activity {
		Activity {
			kind,
			amount,
			block: self.height,
			txid: self.txid.to_string(),
		}
	}
}

/// An address's holdings in a single token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
	pub address: String,
	pub balance: u64,
	/// Accrued staking rewards. Always zero for SCP-1 tokens.
	#[serde(default)]
	pub unclaimed_balance: u64,
	/// Append-only history, oldest first.
	pub activity: Vec<Activity>,
}

impl Account {
	fn new(address: &str) -> Self {
		Self {
			address: address.to_string(),
			balance: 0,
			unclaimed_balance: 0,
			activity: Vec::new(),
		}
	}

	/// Height of the account's most recent activity.
	pub fn last_activity_height(&self) -> u64 {
		self.activity.last().map(|a| a.block).unwrap_or(0)
	}

	fn record(&mut self, activity: Activity) {
		self.activity.push(activity);
	}
}

/// SCP-2 staking parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StakingParams {
	/// Smallest units issued to eligible stakers per block.
	pub inflation: u64,
	/// Blocks an account must stay untouched before it earns rewards.
	pub min_age: u64,
}

/// Staking status of one SCP-2 account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StakingStatus {
	pub enabled: bool,
	pub age: u64,
	pub unclaimed_balance: u64,
}

/// A token contract created by an `SCPCREATE` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
	/// Id of the creation transaction.
	pub contract: String,
	pub name: String,
	pub ticker: String,
	pub version: u8,
	pub max_supply: u64,
	/// Total ever minted. Burns do not free minting capacity.
	#[serde(default)]
	pub minted: u64,
	pub creator: String,
	/// Accounts in order of first touch. The first owner is always the creator.
	pub owners: Vec<Account>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub staking: Option<StakingParams>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
	#[error("Token {0} already exists")]
	TokenExists(String),

	#[error("Token {0} does not exist")]
	TokenNotFound(String),

	#[error("Account {0} does not exist for this token")]
	AccountNotFound(String),

	#[error("Insufficient balance: needed {needed}, available {available}")]
	InsufficientBalance { needed: u64, available: u64 },

	#[error("Mint of {requested} exceeds the remaining supply of {remaining}")]
	SupplyExceeded { requested: u64, remaining: u64 },

	#[error("SCP-2 token has already been minted")]
	AlreadyMinted,

	#[error("Token is not an SCP-2")]
	NotStakeable,

	#[error("No unclaimed balance to redeem")]
	NothingToRedeem,

	#[error("Crediting {amount} would overflow the balance of {address}")]
	BalanceOverflow { address: String, amount: u64 },
}

impl Token {
	pub fn new_scp1(
		contract: String,
		name: String,
		ticker: String,
		max_supply: u64,
		creator: String,
	) -> Self {
		Self {
			contract,
			name,
			ticker,
			version: 1,
			max_supply,
			minted: 0,
			creator,
			owners: Vec::new(),
			staking: None,
		}
	}

	pub fn new_scp2(
		contract: String,
		name: String,
		ticker: String,
		max_supply: u64,
		creator: String,
		staking: StakingParams,
	) -> Self {
		Self {
			version: 2,
			staking: Some(staking),
			..Self::new_scp1(contract, name, ticker, max_supply, creator)
		}
	}

	pub fn account(&self, address: &str) -> Option<&Account> {
		self.owners.iter().find(|a| a.address == address)
	}

	/// Sum of all spendable balances.
	pub fn circulating_supply(&self) -> u128 {
		self.owners.iter().map(|a| a.balance as u128).sum()
	}

	/// Whether the single SCP-2 mint has already happened.
	pub fn is_minted(&self) -> bool {
		self.version == 2 && !self.owners.is_empty()
	}

	fn account_mut(&mut self, address: &str) -> Option<&mut Account> {
		self.owners.iter_mut().find(|a| a.address == address)
	}

	fn account_or_insert(&mut self, address: &str) -> &mut Account {
		let index = match self.owners.iter().position(|a| a.address == address) {
			Some(index) => index,
			None => {
				self.owners.push(Account::new(address));
				self.owners.len() - 1
			}
		};
		&mut self.owners[index]
	}

	fn spendable(&self, address: &str) -> u64 {
		self.account(address).map(|a| a.balance).unwrap_or(0)
	}

	/// Balance of `address` after receiving `amount`, or an error when it would not fit.
	fn credited_balance(&self, address: &str, amount: u64) -> Result<u64, LedgerError> {
		self.spendable(address)
			.checked_add(amount)
			.ok_or_else(|| LedgerError::BalanceOverflow {
				address: address.to_string(),
				amount,
			})
	}

	/// Mint `amount` new units into `address`, bounded by the maximum supply.
	pub fn credit_account(
		&mut self,
		address: &str,
		amount: u64,
		origin: &Origin<'_>,
	) -> Result<(), LedgerError> {
		if self.is_minted() {
			return Err(LedgerError::AlreadyMinted);
		}
		let remaining = self.max_supply.saturating_sub(self.minted);
		if amount > remaining {
			return Err(LedgerError::SupplyExceeded {
				requested: amount,
				remaining,
			});
		}

		let balance = self.credited_balance(address, amount)?;

		self.minted += amount;
		let account = self.account_or_insert(address);
		account.balance = balance;
		account.record(origin.activity(ActivityType::Mint, amount));
		Ok(())
	}

	/// Burn `amount` units from `address`.
	pub fn debit_account(
		&mut self,
		address: &str,
		amount: u64,
		origin: &Origin<'_>,
	) -> Result<(), LedgerError> {
		let available = self.spendable(address);
		if amount > available {
			return Err(LedgerError::InsufficientBalance {
				needed: amount,
				available,
			});
		}

		let account = self.account_or_insert(address);
		account.balance -= amount;
		account.record(origin.activity(ActivityType::Burn, amount));
		Ok(())
	}

	/// Move `amount` units from `from` to `to`.
	pub fn transfer(
		&mut self,
		from: &str,
		to: &str,
		amount: u64,
		origin: &Origin<'_>,
	) -> Result<(), LedgerError> {
		let available = self.spendable(from);
		if amount > available {
			return Err(LedgerError::InsufficientBalance {
				needed: amount,
				available,
			});
		}
		if from != to {
			self.credited_balance(to, amount)?;
		}

		let sender = self.account_or_insert(from);
		sender.balance -= amount;
		sender.record(origin.activity(ActivityType::Sent, amount));

		let receiver = self.account_or_insert(to);
		receiver.balance += amount;
		receiver.record(origin.activity(ActivityType::Received, amount));
		Ok(())
	}

	/// Move the whole unclaimed balance of `address` into its spendable balance.
	pub fn redeem_rewards(&mut self, address: &str, origin: &Origin<'_>) -> Result<u64, LedgerError> {
		if self.staking.is_none() {
			return Err(LedgerError::NotStakeable);
		}
		let account = self
			.account_mut(address)
			.ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))?;
		let amount = account.unclaimed_balance;
		if amount == 0 {
			return Err(LedgerError::NothingToRedeem);
		}
		let balance =
			account
				.balance
				.checked_add(amount)
				.ok_or_else(|| LedgerError::BalanceOverflow {
					address: address.to_string(),
					amount,
				})?;

		account.unclaimed_balance = 0;
		account.balance = balance;
		account.record(origin.activity(ActivityType::Redeem, amount));
		Ok(amount)
	}

	pub fn staking_status(&self, address: &str, height: u64) -> Result<StakingStatus, LedgerError> {
		let staking = self.staking.ok_or(LedgerError::NotStakeable)?;
		let account = self
			.account(address)
			.ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))?;
		let age = height.saturating_sub(account.last_activity_height());
		Ok(StakingStatus {
			enabled: account.balance > 0 && age >= staking.min_age,
			age,
			unclaimed_balance: account.unclaimed_balance,
		})
	}

	/// Distribute one block of staking rewards among the accounts eligible at `height`.
	///
	/// Each eligible account receives `inflation * balance / eligible_total`, rounded down.
	/// Unclaimed rewards are capped so that `balance + unclaimed_balance` fits in a `u64`.
	pub fn accrue_rewards(&mut self, height: u64) {
		let Some(staking) = self.staking else {
			return;
		};
		let is_eligible = |account: &Account| {
			account.balance > 0
				&& height.saturating_sub(account.last_activity_height()) >= staking.min_age
		};

		let eligible_total: u128 = self
			.owners
			.iter()
			.filter(|a| is_eligible(a))
			.map(|a| a.balance as u128)
			.sum();
		if eligible_total == 0 {
			return;
		}

		for account in self.owners.iter_mut().filter(|a| is_eligible(a)) {
			let reward = staking.inflation as u128 * account.balance as u128 / eligible_total;
			let headroom = (u64::MAX - account.balance).max(account.unclaimed_balance);
			let reward = u64::try_from(reward).unwrap_or(u64::MAX);
			account.unclaimed_balance = account
				.unclaimed_balance
				.saturating_add(reward)
				.min(headroom);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn origin(height: u64) -> Origin<'static> {
		Origin {
			txid: "tx",
			height,
		}
	}

	fn scp1(max_supply: u64) -> Token {
		Token::new_scp1(
			"c".repeat(64),
			"MyToken".into(),
			"MTK".into(),
			max_supply,
			"sCreator".into(),
		)
	}

	fn scp2() -> Token {
		Token::new_scp2(
			"d".repeat(64),
			"Stake".into(),
			"STK".into(),
			1_000,
			"sCreator".into(),
			StakingParams {
				inflation: 10,
				min_age: 5,
			},
		)
	}

	#[test]
	fn mint_respects_max_supply() {
		let mut token = scp1(1_000);
		token.credit_account("sCreator", 600, &origin(1)).unwrap();
		let err = token.credit_account("sCreator", 401, &origin(2)).unwrap_err();
		assert_eq!(
			err,
			LedgerError::SupplyExceeded {
				requested: 401,
				remaining: 400
			}
		);
		assert_eq!(token.account("sCreator").unwrap().activity.len(), 1);
		token.credit_account("sCreator", 400, &origin(3)).unwrap();
		assert_eq!(token.circulating_supply(), 1_000);
	}

	#[test]
	fn burned_units_do_not_free_capacity() {
		let mut token = scp1(100);
		token.credit_account("sCreator", 100, &origin(1)).unwrap();
		token.debit_account("sCreator", 40, &origin(2)).unwrap();
		assert!(token.credit_account("sCreator", 1, &origin(3)).is_err());
		assert_eq!(token.circulating_supply() + 40, token.minted as u128);
	}

	#[test]
	fn failed_debit_leaves_no_trace() {
		let mut token = scp1(100);
		token.credit_account("sCreator", 10, &origin(1)).unwrap();
		assert!(token.debit_account("sCreator", 11, &origin(2)).is_err());
		assert!(token.debit_account("sNobody", 1, &origin(2)).is_err());
		assert!(token.account("sNobody").is_none());
		assert_eq!(token.account("sCreator").unwrap().balance, 10);
		assert_eq!(token.account("sCreator").unwrap().activity.len(), 1);
	}

	#[test]
	fn transfer_creates_receiver_lazily() {
		let mut token = scp1(100);
		token.credit_account("sCreator", 50, &origin(1)).unwrap();
		token.transfer("sCreator", "sBob", 20, &origin(2)).unwrap();
		assert_eq!(token.owners.len(), 2);
		assert_eq!(token.account("sBob").unwrap().balance, 20);
		assert_eq!(
			token.account("sBob").unwrap().activity[0].kind,
			ActivityType::Received
		);
		assert_eq!(
			token.account("sCreator").unwrap().activity[1].kind,
			ActivityType::Sent
		);

		let err = token.transfer("sBob", "sCarol", 21, &origin(3)).unwrap_err();
		assert_eq!(
			err,
			LedgerError::InsufficientBalance {
				needed: 21,
				available: 20
			}
		);
		assert!(token.account("sCarol").is_none());
	}

	#[test]
	fn scp2_mints_once() {
		let mut token = scp2();
		token.credit_account("sCreator", 500, &origin(1)).unwrap();
		assert_eq!(
			token.credit_account("sCreator", 1, &origin(2)),
			Err(LedgerError::AlreadyMinted)
		);
	}

	#[test]
	fn rewards_accrue_to_aged_accounts_by_weight() {
		let mut token = scp2();
		token.credit_account("sCreator", 300, &origin(10)).unwrap();
		token.transfer("sCreator", "sBob", 100, &origin(12)).unwrap();

		// sCreator was last touched at 12 as the sender, so nobody is old enough yet.
		token.accrue_rewards(16);
		assert_eq!(token.account("sCreator").unwrap().unclaimed_balance, 0);

		token.accrue_rewards(17);
		assert_eq!(token.account("sCreator").unwrap().unclaimed_balance, 6);
		assert_eq!(token.account("sBob").unwrap().unclaimed_balance, 3);
	}

	#[test]
	fn redeem_moves_unclaimed_and_resets_age() {
		let mut token = scp2();
		token.credit_account("sCreator", 100, &origin(1)).unwrap();
		token.accrue_rewards(6);
		assert_eq!(
			token.staking_status("sCreator", 6).unwrap(),
			StakingStatus {
				enabled: true,
				age: 5,
				unclaimed_balance: 10
			}
		);

		assert_eq!(token.redeem_rewards("sCreator", &origin(7)).unwrap(), 10);
		let account = token.account("sCreator").unwrap();
		assert_eq!(account.balance, 110);
		assert_eq!(account.unclaimed_balance, 0);
		assert!(!token.staking_status("sCreator", 8).unwrap().enabled);
		assert_eq!(
			token.redeem_rewards("sCreator", &origin(9)),
			Err(LedgerError::NothingToRedeem)
		);
	}

	#[test]
	fn oversized_rewards_never_overflow_the_balance() {
		let mut token = Token::new_scp2(
			"f".repeat(64),
			"S".into(),
			"S".into(),
			1,
			"sCreator".into(),
			StakingParams {
				inflation: 9_007_199_254_740_991,
				min_age: 2,
			},
		);
		token.credit_account("sCreator", 1, &origin(1)).unwrap();
		for height in 3..3000 {
			token.accrue_rewards(height);
		}
		let account = token.account("sCreator").unwrap();
		assert_eq!(account.unclaimed_balance, u64::MAX - 1);

		assert_eq!(
			token.redeem_rewards("sCreator", &origin(3000)).unwrap(),
			u64::MAX - 1
		);
		assert_eq!(token.account("sCreator").unwrap().balance, u64::MAX);
		token.accrue_rewards(3005);
		assert_eq!(token.account("sCreator").unwrap().unclaimed_balance, 0);
	}

	#[test]
	fn overflowing_credit_leaves_the_token_untouched() {
		let mut token = scp2();
		token.credit_account("sCreator", 100, &origin(1)).unwrap();
		token.transfer("sCreator", "sBob", 10, &origin(2)).unwrap();
		{
			let bob = token.owners.iter_mut().find(|a| a.address == "sBob").unwrap();
			bob.balance = u64::MAX - 5;
			bob.unclaimed_balance = 6;
		}
		let before = token.clone();

		assert_eq!(
			token.redeem_rewards("sBob", &origin(3)),
			Err(LedgerError::BalanceOverflow {
				address: "sBob".into(),
				amount: 6
			})
		);
		assert_eq!(
			token.transfer("sCreator", "sBob", 6, &origin(3)),
			Err(LedgerError::BalanceOverflow {
				address: "sBob".into(),
				amount: 6
			})
		);
		assert_eq!(token, before);
	}

	#[test]
	fn scp1_has_no_staking() {
		let mut token = scp1(10);
		token.credit_account("sCreator", 10, &origin(1)).unwrap();
		assert_eq!(
			token.redeem_rewards("sCreator", &origin(2)),
			Err(LedgerError::NotStakeable)
		);
		assert_eq!(
			token.staking_status("sCreator", 2),
			Err(LedgerError::NotStakeable)
		);
	}
}
