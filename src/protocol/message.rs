//! Grammar of protocol messages.
//!
//! Two message families exist:
//! - `SCPCREATE[<ver>] <name> <ticker> <maxsupply> [<inflation> <minage>]` deploys a token.
//! - `<contract:64> <method> [args...]` calls a token contract.
//!
//! Fields are separated by single spaces; consecutive spaces produce empty fields.

use super::types::ProtocolError;
use crate::ledger::StakingParams;

pub const CREATE_KEYWORD: &str = "SCPCREATE";
/// Length of a contract id (a transaction id in hex)
pub const CONTRACT_ID_LEN: usize = 64;
/// Largest integer exactly representable in an IEEE-754 double (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParams {
	pub version: u8,
	pub name: String,
	pub ticker: String,
	pub max_supply: u64,
	/// Present exactly for version 2.
	pub staking: Option<StakingParams>,
}

/// A typed protocol operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	Create(CreateParams),
	Mint { contract: String, amount: u64 },
	Burn { contract: String, amount: u64 },
	Send {
		contract: String,
		amount: u64,
		receiver: String,
	},
	Redeem { contract: String },
	Unrecognized { contract: String, method: String },
}

impl Operation {
	pub fn contract(&self) -> Option<&str> {
		match self {
			Operation::Create(_) => None,
			Operation::Mint { contract, .. }
			| Operation::Burn { contract, .. }
			| Operation::Send { contract, .. }
			| Operation::Redeem { contract }
			| Operation::Unrecognized { contract, .. } => Some(contract),
		}
	}
}

/// Parse a positive integer no larger than [`MAX_SAFE_INTEGER`].
///
/// The field is read as a numeric literal (see [`parse_number`]), so `1e3`, `500.0`, `+5` and
/// `0x10` are all integers here while `1.5`, `-5` and an empty field are not.
pub fn parse_amount(field: Option<&str>) -> Option<u64> {
	let value = parse_number(field?)?;
	if value > 0.0 && value.fract() == 0.0 && value <= MAX_SAFE_INTEGER as f64 {
		Some(value as u64)
	} else {
		None
	}
}

/// Read a numeric literal the way deployed ledgers do.
///
/// Surrounding whitespace is ignored and a blank string is zero. Accepted forms are an
/// optionally signed decimal with optional fraction and exponent, `Infinity`, and unsigned
/// `0x`, `0o` or `0b` integers. Anything else is `None`.
fn parse_number(text: &str) -> Option<f64> {
	let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
	if text.is_empty() {
		return Some(0.0);
	}

	let radix = match text.get(..2) {
		Some("0x" | "0X") => Some(16),
		Some("0o" | "0O") => Some(8),
		Some("0b" | "0B") => Some(2),
		_ => None,
	};
	if let Some(radix) = radix {
		let digits = &text[2..];
		if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
			return None;
		}
		return Some(
			digits
				.chars()
				.filter_map(|c| c.to_digit(radix))
				.fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d)),
		);
	}

	let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
	if unsigned == "Infinity" {
		return Some(if text.starts_with('-') {
			f64::NEG_INFINITY
		} else {
			f64::INFINITY
		});
	}

	let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
		Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
		None => (unsigned, None),
	};
	let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
	let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
	if whole.len() + fraction.len() == 0 || !all_digits(whole) || !all_digits(fraction) {
		return None;
	}
	if let Some(exponent) = exponent {
		let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
		if digits.is_empty() || !all_digits(digits) {
			return None;
		}
	}
	text.parse::<f64>().ok()
}

/// Version named by the suffix of the create keyword. Only a suffix reading as 2 selects
/// version 2; anything else, including no suffix, is version 1.
fn create_version(keyword: &str) -> u8 {
	let suffix = keyword.split(CREATE_KEYWORD).nth(1).unwrap_or_default();
	if parse_number(suffix) == Some(2.0) {
		2
	} else {
		1
	}
}

/// Parse a message into an operation.
///
/// Returns `Ok(None)` for text that belongs to neither message family.
pub fn parse_message(message: &str) -> Result<Option<Operation>, ProtocolError> {
	if message.starts_with(CREATE_KEYWORD) {
		return parse_create(message).map(|p| Some(Operation::Create(p)));
	}
	if message.len() > CONTRACT_ID_LEN {
		return parse_call(message).map(Some);
	}
	Ok(None)
}

fn parse_create(message: &str) -> Result<CreateParams, ProtocolError> {
	let fields: Vec<&str> = message.split(' ').collect();

	let version = create_version(fields[0]);
	let expected = if version == 2 { 6 } else { 4 };
	if fields.len() != expected {
		return Err(ProtocolError::ParseRejected(format!(
			"SCP-{} create has {} params, expected {}",
			version,
			fields.len(),
			expected
		)));
	}

	let incorrect = |what: &str| {
		ProtocolError::ParseRejected(format!("SCP-{} create has an invalid {}", version, what))
	};

	let (name, ticker) = (fields[1], fields[2]);
	if name.is_empty() {
		return Err(incorrect("name"));
	}
	if ticker.is_empty() {
		return Err(incorrect("ticker"));
	}
	let max_supply = parse_amount(Some(fields[3])).ok_or_else(|| incorrect("max supply"))?;

	let staking = if version == 2 {
		let inflation = parse_amount(Some(fields[4]))
			.filter(|n| *n > 1)
			.ok_or_else(|| incorrect("inflation"))?;
		let min_age = parse_amount(Some(fields[5]))
			.filter(|n| *n > 1)
			.ok_or_else(|| incorrect("minimum stake age"))?;
		Some(StakingParams { inflation, min_age })
	} else {
		None
	};

	Ok(CreateParams {
		version,
		name: name.to_string(),
		ticker: ticker.to_string(),
		max_supply,
		staking,
	})
}

fn parse_call(message: &str) -> Result<Operation, ProtocolError> {
	let mut fields = message.split(' ');
	let contract = fields.next().unwrap_or_default();
	if contract.len() != CONTRACT_ID_LEN {
		return Err(ProtocolError::ParseRejected(format!(
			"contract id must be {} characters, got {}",
			CONTRACT_ID_LEN,
			contract.len()
		)));
	}
	let method = match fields.next() {
		Some(method) if !method.is_empty() => method,
		_ => {
			return Err(ProtocolError::ParseRejected(
				"contract call has no method".to_string(),
			));
		}
	};

	let contract = contract.to_string();
	let amount = |field: Option<&str>| {
		parse_amount(field).ok_or_else(|| {
			ProtocolError::ParseRejected(format!(
				"{} amount {:?} is not a positive safe integer",
				method,
				field.unwrap_or_default()
			))
		})
	};

	let operation = match method {
		"mint" => Operation::Mint {
			amount: amount(fields.next())?,
			contract,
		},
		"burn" => Operation::Burn {
			amount: amount(fields.next())?,
			contract,
		},
		"send" => {
			let amount = amount(fields.next())?;
			let receiver = fields
				.next()
				.filter(|r| !r.is_empty())
				.ok_or_else(|| ProtocolError::ParseRejected("send has no receiver".to_string()))?;
			Operation::Send {
				contract,
				amount,
				receiver: receiver.to_string(),
			}
		}
		"redeem" => Operation::Redeem { contract },
		other => Operation::Unrecognized {
			method: other.to_string(),
			contract,
		},
	};
	Ok(operation)
}
