//! Builds the alloy backed collaborators and runs the pipeline until shutdown.

use crate::{
    args::{ChainArgs, PostmanArgs},
    poller::PollerExit,
    Pipeline, PipelineChains,
};
use std::{sync::Arc, time::Duration};

use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_transport::layers::RetryBackoffLayer;
use postman_db::{Database, DatabaseConnectionProvider};
use postman_migration::{Migrator, MigratorTrait};
use postman_providers::{
    AlloyChainClient, AlloyMessageServiceClient, AlloyTransactionSender,
};
use tokio::sync::watch;

/// Returns a client for the chain, retrying rate limited requests with a backoff.
fn chain_client(chain: &ChainArgs, rpc_timeout: Duration) -> AlloyChainClient<DynProvider> {
    let client = RpcClient::builder()
        .layer(RetryBackoffLayer::new(
            chain.max_retries,
            chain.initial_backoff,
            chain.compute_units_per_second,
        ))
        .http(chain.url.clone());
    let provider = ProviderBuilder::new().connect_client(client).erased();
    AlloyChainClient::new(provider, chain.message_service_address, rpc_timeout)
}

/// The Postman daemon relaying the messages of one direction.
#[derive(Debug)]
pub struct PostmanNode {
    args: PostmanArgs,
}

impl PostmanNode {
    /// Returns a new [`PostmanNode`], validating the arguments.
    pub fn new(args: PostmanArgs) -> eyre::Result<Self> {
        args.validate()?;
        Ok(Self { args })
    }

    /// Runs the pipeline until Ctrl-C is received or every loop stopped.
    pub async fn run(self) -> eyre::Result<()> {
        let args = self.args;
        let direction = args.direction;
        let config = args.pipeline_config();
        tracing::info!(target: "postman::node", %direction, ?config, "Launching postman.");

        let database = Arc::new(Database::new(&args.database.url).await?);
        Migrator::up(database.get_connection(), None).await?;

        let rpc_timeout = Duration::from_millis(args.rpc.timeout);
        let source = chain_client(&args.source(), rpc_timeout);
        let destination = chain_client(&args.destination(), rpc_timeout);

        let chain_id = destination.chain_id().await?;
        let signer = args.signer.signer()?;
        tracing::info!(target: "postman::node", claimer = ?signer.address(), chain_id, "Loaded signer.");

        let sender = AlloyTransactionSender::new(
            destination.provider().clone(),
            signer,
            chain_id,
            rpc_timeout,
        );
        let client = AlloyMessageServiceClient::new(direction, source.clone(), destination.clone());
        let chains = PipelineChains { source, destination, client, sender };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut pollers = Pipeline::new(chains, database, &config).spawn(&config, shutdown_rx);

        let mut fatal = 0usize;
        loop {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    tracing::info!(target: "postman::node", "Received shutdown signal.");
                    let _ = shutdown_tx.send(true);
                    break;
                }
                exit = pollers.join_next() => match exit {
                    Some(Ok(PollerExit::Fatal)) => {
                        fatal += 1;
                        tracing::error!(target: "postman::node", fatal, "A loop stopped on a fatal error.");
                    }
                    Some(Ok(PollerExit::Shutdown)) => {}
                    Some(Err(err)) => {
                        tracing::error!(target: "postman::node", %err, "A loop panicked.");
                    }
                    None => {
                        eyre::bail!("every loop of the {direction} pipeline stopped");
                    }
                }
            }
        }

        while let Some(exit) = pollers.join_next().await {
            if let Err(err) = exit {
                tracing::error!(target: "postman::node", %err, "A loop panicked during shutdown.");
            }
        }
        tracing::info!(target: "postman::node", "Postman shut down.");
        Ok(())
    }
}
