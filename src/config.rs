//!
//! Runtime configuration.
//!
//! Protocol constants and tunables default to the StakeCube Protocol main network. Every value
//! can be overridden from the environment, and node credentials can be read from the daemon's
//! own config file.

use std::path::PathBuf;
use std::time::Duration;

/// First block that can carry protocol messages
pub const GENESIS_HEIGHT: u64 = 155_084;
/// Token deployment fee, in coins
pub const DEPLOY_FEE: f64 = 10.0;
pub const DEPLOY_FEE_ADDRESS: &str = "sccburnaddressXXXXXXXXXXXXXXSfqakF";
pub const DEFAULT_RPC_PORT: u16 = 39_999;

/// Error types for loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {value}")]
	InvalidValue { key: String, value: String },

	#[error("Failed to read node config {path:?}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("No transaction index (-txindex=1) detected!")]
	MissingTxIndex,

	#[error("No RPC server (-server=1) detected!")]
	MissingServer,

	#[error("No RPC username (-rpcuser=...) detected!")]
	MissingRpcUser,

	#[error("No RPC password (-rpcpassword=...) detected!")]
	MissingRpcPassword,
}

/// Fixed protocol constants supplied at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolParams {
	pub genesis_height: u64,
	pub deploy_fee: f64,
	pub deploy_fee_address: String,
}

impl Default for ProtocolParams {
	fn default() -> Self {
		Self {
			genesis_height: GENESIS_HEIGHT,
			deploy_fee: DEPLOY_FEE,
			deploy_fee_address: DEPLOY_FEE_ADDRESS.to_string(),
		}
	}
}

/// Scheduling of chain scans.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
	/// Period between scheduler ticks
	pub interval: Duration,
	/// Blocks below the tip rescanned on every warm tick
	pub warm_depth: u64,
}

impl Default for ScanConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(5),
			warm_depth: 20,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	pub rpc_url: String,
	pub rpc_user: Option<String>,
	pub rpc_password: Option<String>,
	pub rpc_timeout: Duration,
	/// Total time allowed for reaching the daemon at startup
	pub connect_budget: Duration,
	pub protocol: ProtocolParams,
	pub scan: ScanConfig,
	/// Where ledger snapshots are kept. Snapshots are disabled when unset.
	pub data_dir: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			rpc_url: rpc_url_for_port(DEFAULT_RPC_PORT),
			rpc_user: None,
			rpc_password: None,
			rpc_timeout: Duration::from_secs(30),
			connect_budget: Duration::from_secs(60),
			protocol: ProtocolParams::default(),
			scan: ScanConfig::default(),
			data_dir: None,
		}
	}
}

fn rpc_url_for_port(port: u16) -> String {
	format!("http://127.0.0.1:{}", port)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
	value
		.trim()
		.parse()
		.map_err(|_| ConfigError::InvalidValue {
			key: key.to_string(),
			value,
		})
}

impl Config {
	/// Load configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Load configuration from `lookup`, applying each present key over the defaults.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Config::default();

		// Node config file first, so explicit RPC keys override it
		if let Some(path) = lookup("SCP_CORE_CONF") {
			let path = PathBuf::from(path);
			let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
				path: path.clone(),
				source,
			})?;
			CoreConf::parse(&content).apply(&mut config)?;
		}

		if let Some(url) = lookup("SCP_RPC_URL") {
			config.rpc_url = url;
		}
		if let Some(user) = lookup("SCP_RPC_USER") {
			config.rpc_user = Some(user);
		}
		if let Some(password) = lookup("SCP_RPC_PASSWORD") {
			config.rpc_password = Some(password);
		}
		if let Some(secs) = lookup("SCP_RPC_TIMEOUT_SECS") {
			config.rpc_timeout = Duration::from_secs(parse_value("SCP_RPC_TIMEOUT_SECS", secs)?);
		}
		if let Some(height) = lookup("SCP_GENESIS_HEIGHT") {
			config.protocol.genesis_height = parse_value("SCP_GENESIS_HEIGHT", height)?;
		}
		if let Some(fee) = lookup("SCP_DEPLOY_FEE") {
			config.protocol.deploy_fee = parse_value("SCP_DEPLOY_FEE", fee)?;
		}
		if let Some(address) = lookup("SCP_DEPLOY_FEE_ADDRESS") {
			config.protocol.deploy_fee_address = address;
		}
		if let Some(secs) = lookup("SCP_SCAN_INTERVAL_SECS") {
			config.scan.interval = Duration::from_secs(parse_value("SCP_SCAN_INTERVAL_SECS", secs)?);
		}
		if let Some(depth) = lookup("SCP_WARM_DEPTH") {
			config.scan.warm_depth = parse_value("SCP_WARM_DEPTH", depth)?;
		}
		if let Some(dir) = lookup("SCP_DATA_DIR") {
			config.data_dir = Some(PathBuf::from(dir));
		}

		Ok(config)
	}

	/// Basic-auth credentials, when both halves are configured.
	pub fn credentials(&self) -> Option<(String, String)> {
		match (&self.rpc_user, &self.rpc_password) {
			(Some(user), Some(password)) => Some((user.clone(), password.clone())),
			_ => None,
		}
	}
}

/// Parsed `key=value` node daemon config.
#[derive(Debug, Clone, Default)]
pub struct CoreConf {
	entries: Vec<(String, String)>,
}

impl CoreConf {
	pub fn parse(content: &str) -> Self {
		let entries = content
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
			.filter_map(|line| line.split_once('='))
			.map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
			.collect();
		Self { entries }
	}

	/// First value set for `key`.
	pub fn value(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Check the daemon is usable by the scanner and copy its RPC settings into `config`.
	pub fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
		self.value("txindex").ok_or(ConfigError::MissingTxIndex)?;
		self.value("server").ok_or(ConfigError::MissingServer)?;
		let user = self.value("rpcuser").ok_or(ConfigError::MissingRpcUser)?;
		let password = self
			.value("rpcpassword")
			.ok_or(ConfigError::MissingRpcPassword)?;
		let port = match self.value("rpcport") {
			Some(port) => parse_value("rpcport", port.to_string())?,
			None => DEFAULT_RPC_PORT,
		};

		config.rpc_url = rpc_url_for_port(port);
		config.rpc_user = Some(user.to_string());
		config.rpc_password = Some(password.to_string());
		Ok(())
	}
}
