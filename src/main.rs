use backoff::{ExponentialBackoff, future::retry};
use scp_state_sync::config::Config;
use scp_state_sync::ledger::Ledger;
use scp_state_sync::node::{NodeRpc, NodeRpcClient, RpcError};
use scp_state_sync::persistence::{FileSnapshotRepository, SnapshotRepository};
use scp_state_sync::protocol::ProtocolEngine;
use scp_state_sync::scanner::{ChainScanner, MessageLog, ScanCursor, ScanScheduler};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		tracing_subscriber::EnvFilter::new("info").add_directive(
			"scp_state_sync=debug"
				.parse()
				.unwrap_or_else(|_| tracing::Level::DEBUG.into()),
		)
	});
	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting SCP state sync service");

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let node: Arc<dyn NodeRpc> = Arc::new(NodeRpcClient::new(
		config.rpc_url.clone(),
		config.credentials(),
		config.rpc_timeout,
	));
	info!("Created node client for {}", config.rpc_url);

	match wait_for_node(node.as_ref(), &config).await {
		Ok(uptime) => info!("Node is up ({} seconds uptime)", uptime),
		Err(e) => {
			error!("Node RPC is unreachable, cannot sync: {}", e);
			return;
		}
	}

	let snapshots = config
		.data_dir
		.clone()
		.map(|dir| Arc::new(FileSnapshotRepository::new(dir)));

	let fresh = || (Ledger::new(), ScanCursor::new(), MessageLog::new());
	let (ledger, cursor, messages) = match &snapshots {
		Some(repo) => match repo.load().await {
			Ok(Some(snapshot)) => {
				info!(
					"Resuming from snapshot at height {} ({} tokens, {} messages)",
					snapshot.height,
					snapshot.ledger.tokens().len(),
					snapshot.messages.confirmed.len()
				);
				(snapshot.ledger, snapshot.cursor, snapshot.messages)
			}
			Ok(None) => fresh(),
			Err(e) => {
				warn!("Ignoring unreadable snapshot, starting cold: {}", e);
				fresh()
			}
		},
		None => fresh(),
	};

	let engine = ProtocolEngine::new(node.clone(), ledger.shared(), config.protocol.clone());
	let scanner = ChainScanner::new(node.clone(), engine, messages.shared())
		.with_cursor(cursor);

	let mut scheduler = ScanScheduler::new(
		Arc::new(scanner),
		node,
		config.protocol.genesis_height,
		config.scan.clone(),
	);
	if let Some(repo) = snapshots {
		scheduler = scheduler.with_snapshots(repo);
	}

	scheduler.run().await;
	info!("SCP state sync service stopped");
}

/// Call `uptime` on the daemon until it answers or the connect budget runs out.
async fn wait_for_node(node: &dyn NodeRpc, config: &Config) -> Result<u64, RpcError> {
	let policy = ExponentialBackoff {
		max_elapsed_time: Some(config.connect_budget),
		..Default::default()
	};
	retry(policy, || async {
		node.uptime().await.map_err(|e| {
			warn!("Node not ready: {}", e);
			backoff::Error::transient(e)
		})
	})
	.await
}
