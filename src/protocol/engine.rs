//! Protocol state machine.
//!
//! The engine turns one decoded message into at most one ledger mutation. Validation and
//! caller authentication run under ledger read guards (they await RPC calls); the write guard
//! is taken only for the final, synchronous mutation.

use super::auth::authenticate;
use super::conventions::{caller_address_of, creator_address_of, pays_deploy_fee};
use super::message::{CreateParams, Operation, parse_message};
use super::types::{Outcome, ProtocolError};
use crate::config::ProtocolParams;
use crate::ledger::{Origin, SharedLedger, Token};
use crate::node::{NodeRpc, RawTransaction};
use crate::utils::format_token_amount;
use std::sync::Arc;
use tracing::{debug, info};

/// What the engine needs to know about a token before mutating it.
struct TokenView {
	version: u8,
	creator: String,
	is_minted: bool,
}

#[derive(Clone)]
pub struct ProtocolEngine {
	node: Arc<dyn NodeRpc>,
	ledger: SharedLedger,
	params: ProtocolParams,
}

impl ProtocolEngine {
	pub fn new(node: Arc<dyn NodeRpc>, ledger: SharedLedger, params: ProtocolParams) -> Self {
		Self {
			node,
			ledger,
			params,
		}
	}

	pub fn ledger(&self) -> &SharedLedger {
		&self.ledger
	}

	/// Parse, validate, authenticate and apply `message` carried by `tx` at `height`.
	pub async fn process(
		&self,
		message: &str,
		tx: &RawTransaction,
		height: u64,
	) -> Result<Outcome, ProtocolError> {
		let Some(operation) = parse_message(message)? else {
			return Ok(Outcome::Ignored);
		};
		let origin = Origin {
			txid: &tx.txid,
			height,
		};

		match operation {
			Operation::Create(params) => self.create(params, tx).await,
			Operation::Mint { contract, amount } => {
				let token = self.token_view(&contract).await?;
				if token.version == 2 && token.is_minted {
					return Err(ProtocolError::ValidationRejected(
						"SCP-2 tokens can only be minted once".to_string(),
					));
				}
				let issuer = required_caller(tx)?;
				if issuer != token.creator {
					return Err(ProtocolError::ValidationRejected(format!(
						"non-issuer mint attempt (issuer: {}, caller: {})",
						token.creator, issuer
					)));
				}
				authenticate(self.node.as_ref(), tx, issuer).await?;

				self.ledger.write().await.mint(&contract, amount, &origin)?;
				info!(
					"Minted {} of SCP-{} {} to {}",
					format_token_amount(amount),
					token.version,
					contract,
					issuer
				);
				Ok(Outcome::Minted { amount })
			}
			Operation::Burn { contract, amount } => {
				self.token_view(&contract).await?;
				let caller = required_caller(tx)?;
				authenticate(self.node.as_ref(), tx, caller).await?;

				self.ledger
					.write()
					.await
					.burn(&contract, caller, amount, &origin)?;
				info!(
					"Burned {} of {} from {}",
					format_token_amount(amount),
					contract,
					caller
				);
				Ok(Outcome::Burned { amount })
			}
			Operation::Send {
				contract,
				amount,
				receiver,
			} => {
				self.token_view(&contract).await?;
				let caller = required_caller(tx)?;
				if !self.node.validate_address(&receiver).await? {
					return Err(ProtocolError::ValidationRejected(format!(
						"receiver {} is not a valid address",
						receiver
					)));
				}
				authenticate(self.node.as_ref(), tx, caller).await?;

				self.ledger
					.write()
					.await
					.transfer(&contract, caller, &receiver, amount, &origin)?;
				info!(
					"Sent {} of {} from {} to {}",
					format_token_amount(amount),
					contract,
					caller,
					receiver
				);
				Ok(Outcome::Sent { amount, receiver })
			}
			Operation::Redeem { contract } => {
				// Staking only exists on SCP-2
				if self.token_view(&contract).await?.version != 2 {
					return Ok(Outcome::NotDispatched);
				}
				let caller = required_caller(tx)?;
				authenticate(self.node.as_ref(), tx, caller).await?;

				let amount = self.ledger.write().await.redeem(&contract, caller, &origin)?;
				info!(
					"Redeemed {} staking rewards of {} for {}",
					format_token_amount(amount),
					contract,
					caller
				);
				Ok(Outcome::Redeemed { amount })
			}
			Operation::Unrecognized { contract, method } => {
				self.token_view(&contract).await?;
				debug!("Method {} is not dispatched by {}", method, contract);
				Ok(Outcome::NotDispatched)
			}
		}
	}

	async fn create(
		&self,
		params: CreateParams,
		tx: &RawTransaction,
	) -> Result<Outcome, ProtocolError> {
		let version = params.version;
		let creator = creator_address_of(tx).ok_or_else(|| {
			ProtocolError::ValidationRejected(format!(
				"SCP-{} create failed to verify outputs: missing creator address",
				version
			))
		})?;
		if !pays_deploy_fee(tx, &self.params) {
			return Err(ProtocolError::ValidationRejected(format!(
				"SCP-{} create has an invalid fee output",
				version
			)));
		}

		let token = match params.staking {
			Some(staking) => Token::new_scp2(
				tx.txid.clone(),
				params.name,
				params.ticker,
				params.max_supply,
				creator.to_string(),
				staking,
			),
			None => Token::new_scp1(
				tx.txid.clone(),
				params.name,
				params.ticker,
				params.max_supply,
				creator.to_string(),
			),
		};

		let summary = format!(
			"{} ({}) max supply {}, creator {}",
			token.name,
			token.ticker,
			format_token_amount(token.max_supply),
			token.creator
		);
		self.ledger.write().await.register_token(token)?;
		info!(
			"New SCP-{} token created: {}, contract {}",
			version, summary, tx.txid
		);

		Ok(Outcome::Created {
			contract: tx.txid.clone(),
			version,
		})
	}

	async fn token_view(&self, contract: &str) -> Result<TokenView, ProtocolError> {
		let ledger = self.ledger.read().await;
		ledger
			.token(contract)
			.map(|token| TokenView {
				version: token.version,
				creator: token.creator.clone(),
				is_minted: token.is_minted(),
			})
			.ok_or_else(|| ProtocolError::UnknownToken(contract.to_string()))
	}
}

fn required_caller(tx: &RawTransaction) -> Result<&str, ProtocolError> {
	caller_address_of(tx).ok_or_else(|| {
		ProtocolError::MalformedTransaction("missing caller address in output 1".to_string())
	})
}
