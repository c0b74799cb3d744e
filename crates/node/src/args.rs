use crate::{constants, poller::PollerConfig, PipelineConfig};
use std::{fs, path::PathBuf, time::Duration};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::ArgAction;
use postman_claimer::{
    ClaimPayloadConfig, GasFeeConfig, GateConfig, ReconcilerConfig, SubmitterConfig,
};
use postman_indexer::{
    AnchoringTrackerConfig, MessageFilter, MessageSentIndexerConfig,
};
use postman_primitives::Direction;
use postman_signer::NonceManagerConfig;

/// The arguments of the Postman, every argument can also be set through its `POSTMAN_*`
/// environment variable.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "postman", version, about = "Relays the messages of one bridge direction")]
pub struct PostmanArgs {
    /// The relayed direction, either `L1_TO_L2` or `L2_TO_L1`.
    #[arg(long, env = "POSTMAN_DIRECTION", value_name = "DIRECTION")]
    pub direction: Direction,
    /// Database args.
    #[command(flatten)]
    pub database: DatabaseArgs,
    /// The L1 chain arguments.
    #[command(flatten)]
    pub l1: L1Args,
    /// The L2 chain arguments.
    #[command(flatten)]
    pub l2: L2Args,
    /// The signer arguments.
    #[command(flatten)]
    pub signer: SignerArgs,
    /// The rpc arguments.
    #[command(flatten)]
    pub rpc: RpcArgs,
    /// The listener arguments.
    #[command(flatten)]
    pub listener: ListenerArgs,
    /// The claiming arguments.
    #[command(flatten)]
    pub claiming: ClaimingArgs,
}

impl PostmanArgs {
    /// Validates the arguments before anything is started.
    pub fn validate(&self) -> eyre::Result<()> {
        let claiming = &self.claiming;
        if !claiming.profit_margin.is_finite() || claiming.profit_margin < 0.0 {
            eyre::bail!("profit margin must be a non negative number");
        }
        if !(claiming.rate_limit_margin > 0.0 && claiming.rate_limit_margin <= 1.0) {
            eyre::bail!("rate limit margin must be in (0, 1]");
        }
        if !(0.0..=100.0).contains(&claiming.fee_history_percentile) {
            eyre::bail!("fee history percentile must be in [0, 100]");
        }
        if claiming.fee_history_block_count == 0 {
            eyre::bail!("fee history block count must be positive");
        }
        if claiming.price_bump_percent < constants::PRICE_BUMP_PERCENT {
            eyre::bail!(
                "price bump must be at least {}% for a replacement to be accepted",
                constants::PRICE_BUMP_PERCENT
            );
        }
        if claiming.max_claims_per_tick == 0 {
            eyre::bail!("max claims per tick must be positive");
        }
        if claiming.max_claim_gas_limit == 0 {
            eyre::bail!("max claim gas limit must be positive");
        }
        if self.listener.max_blocks_to_fetch_logs == 0 ||
            self.listener.max_fetch_messages_from_db == 0
        {
            eyre::bail!("fetch limits must be positive");
        }
        for chain in [self.chain(Direction::L1ToL2), self.chain(Direction::L2ToL1)] {
            if chain.max_fee_per_gas_cap == 0 {
                eyre::bail!("{} max fee per gas cap must be positive", chain.name);
            }
        }
        if self.signer.key_file.is_some() && self.signer.private_key.is_some() {
            eyre::bail!("Cannot specify more than one signer key source");
        }
        if self.signer.key_file.is_none() && self.signer.private_key.is_none() {
            eyre::bail!("Either a signer key file or a private key is required");
        }

        Ok(())
    }

    /// Returns the settings of the chain the messages of `direction` are sent on.
    pub fn source(&self) -> ChainArgs {
        self.chain(self.direction)
    }

    /// Returns the settings of the chain the messages of `direction` are claimed on.
    pub fn destination(&self) -> ChainArgs {
        match self.direction {
            Direction::L1ToL2 => self.chain(Direction::L2ToL1),
            Direction::L2ToL1 => self.chain(Direction::L1ToL2),
        }
    }

    /// Returns the settings of the source chain of `direction`.
    fn chain(&self, direction: Direction) -> ChainArgs {
        match direction {
            Direction::L1ToL2 => self.l1.clone().into(),
            Direction::L2ToL1 => self.l2.clone().into(),
        }
    }

    /// Returns the configuration of the components of the relayed direction.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let direction = self.direction;
        let source = self.source();
        let destination = self.destination();
        let listener = &self.listener;
        let claiming = &self.claiming;

        let filter = MessageFilter {
            is_eoa_enabled: listener.is_eoa_enabled,
            is_calldata_enabled: listener.is_calldata_enabled,
            from_address: listener.from_address,
            to_address: listener.to_address,
        };

        PipelineConfig {
            indexer: MessageSentIndexerConfig {
                direction,
                initial_from_block: source.initial_from_block,
                block_confirmation: source.block_confirmation,
                max_blocks_to_fetch_logs: listener.max_blocks_to_fetch_logs,
                filter,
            },
            anchoring: AnchoringTrackerConfig {
                direction,
                initial_from_block: destination.initial_from_block,
                anchoring_confirmations: listener.anchoring_confirmations,
                max_blocks_to_fetch_logs: listener.max_blocks_to_fetch_logs,
                max_fetch_messages_from_db: listener.max_fetch_messages_from_db,
            },
            fees: GasFeeConfig {
                block_count: claiming.fee_history_block_count,
                percentile: claiming.fee_history_percentile,
                max_fee_per_gas_cap: destination.max_fee_per_gas_cap,
                enforce_max_gas_fee: destination.enforce_max_gas_fee,
            },
            payload: ClaimPayloadConfig {
                fee_recipient: claiming.fee_recipient,
                claim_via_address: destination.claim_via_address,
            },
            gate: GateConfig {
                direction,
                max_fetch_messages_from_db: listener.max_fetch_messages_from_db,
                profit_margin: claiming.profit_margin,
                max_claim_gas_limit: claiming.max_claim_gas_limit,
                rate_limit_margin: claiming.rate_limit_margin,
                is_postman_sponsorship_enabled: claiming.is_postman_sponsorship_enabled,
                max_postman_sponsor_gas_limit: claiming.max_postman_sponsor_gas_limit,
                reserved_recipients: claiming.reserved_recipients.iter().copied().collect(),
            },
            submitter: SubmitterConfig {
                direction,
                max_claims_per_tick: claiming.max_claims_per_tick,
                price_bump_percent: claiming.price_bump_percent,
            },
            reconciler: ReconcilerConfig {
                direction,
                max_fetch_messages_from_db: listener.max_fetch_messages_from_db,
                message_submission_timeout: Duration::from_secs(
                    claiming.message_submission_timeout,
                ),
                drop_grace_period: Duration::from_secs(claiming.drop_grace_period),
                retry_delay: Duration::from_secs(claiming.retry_delay),
                max_retries: claiming.max_retries,
                exclusion_resweep_interval: Duration::from_secs(
                    claiming.exclusion_resweep_interval,
                ),
            },
            nonce_manager: NonceManagerConfig {
                direction,
                max_nonce_diff: claiming.max_nonce_diff,
            },
            listener_poller: PollerConfig {
                interval: Duration::from_millis(listener.polling_interval),
                max_backoff: Duration::from_millis(self.rpc.max_backoff),
            },
            claiming_poller: PollerConfig {
                interval: Duration::from_millis(claiming.polling_interval),
                max_backoff: Duration::from_millis(self.rpc.max_backoff),
            },
        }
    }
}

/// The settings of one chain of the corridor.
#[derive(Debug, Clone)]
pub struct ChainArgs {
    /// The name of the chain.
    pub name: &'static str,
    /// The URL of the chain RPC.
    pub url: reqwest::Url,
    /// The message service contract deployed on the chain.
    pub message_service_address: Address,
    /// The first block scanned on the chain.
    pub initial_from_block: u64,
    /// The number of blocks a sent message is buried under before it is indexed.
    pub block_confirmation: u64,
    /// The maximum fee per gas paid for claims on the chain.
    pub max_fee_per_gas_cap: u128,
    /// Whether claim fees are set to the cap instead of being estimated.
    pub enforce_max_gas_fee: bool,
    /// The contract claims on the chain are sent to instead of the message service.
    pub claim_via_address: Option<Address>,
    /// The compute units per second for the provider.
    pub compute_units_per_second: u64,
    /// The max amount of retries for the provider.
    pub max_retries: u32,
    /// The initial backoff for the provider.
    pub initial_backoff: u64,
}

/// The database arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct DatabaseArgs {
    /// The database connection url.
    #[arg(
        long = "db.url",
        id = "db_url",
        env = "POSTMAN_DATABASE_URL",
        value_name = "DB_URL",
        default_value = constants::DEFAULT_DATABASE_URL
    )]
    pub url: String,
}

/// The arguments for the L1 chain.
#[derive(Debug, Clone, clap::Args)]
pub struct L1Args {
    /// The URL for the L1 RPC.
    #[arg(long = "l1.url", id = "l1_url", env = "POSTMAN_L1_RPC_URL", value_name = "L1_URL")]
    pub url: reqwest::Url,
    /// The L1 message service contract.
    #[arg(long = "l1.message-service-address", id = "l1_message_service_address", env = "POSTMAN_L1_MESSAGE_SERVICE_ADDRESS", value_name = "ADDRESS")]
    pub message_service_address: Address,
    /// The first L1 block scanned for messages and anchorings.
    #[arg(long = "l1.initial-from-block", id = "l1_initial_from_block", env = "POSTMAN_L1_INITIAL_FROM_BLOCK", default_value_t = 0)]
    pub initial_from_block: u64,
    /// The number of blocks a message sent on L1 is buried under before it is indexed.
    #[arg(long = "l1.block-confirmation", id = "l1_block_confirmation", env = "POSTMAN_L1_BLOCK_CONFIRMATION", default_value_t = constants::BLOCK_CONFIRMATION)]
    pub block_confirmation: u64,
    /// The maximum fee per gas paid for claims on L1, in wei.
    #[arg(long = "l1.max-fee-per-gas-cap", id = "l1_max_fee_per_gas_cap", env = "POSTMAN_L1_MAX_FEE_PER_GAS_CAP", default_value_t = constants::MAX_FEE_PER_GAS_CAP)]
    pub max_fee_per_gas_cap: u128,
    /// Whether claim fees on L1 are set to the cap instead of being estimated.
    #[arg(long = "l1.enforce-max-gas-fee", id = "l1_enforce_max_gas_fee", env = "POSTMAN_L1_ENFORCE_MAX_GAS_FEE", default_value_t = false, action = ArgAction::Set)]
    pub enforce_max_gas_fee: bool,
    /// The contract claims on L1 are sent to instead of the message service.
    #[arg(long = "l1.claim-via-address", id = "l1_claim_via_address", env = "POSTMAN_L1_CLAIM_VIA_ADDRESS", value_name = "ADDRESS")]
    pub claim_via_address: Option<Address>,
    /// The compute units per second for the provider.
    #[arg(long = "l1.cups", id = "l1_compute_units_per_second", env = "POSTMAN_L1_COMPUTE_UNITS_PER_SECOND", default_value_t = constants::PROVIDER_COMPUTE_UNITS_PER_SECOND)]
    pub compute_units_per_second: u64,
    /// The max amount of retries for the provider.
    #[arg(long = "l1.max-retries", id = "l1_max_retries", env = "POSTMAN_L1_MAX_RETRIES", default_value_t = constants::PROVIDER_MAX_RETRIES)]
    pub max_retries: u32,
    /// The initial backoff for the provider, in milliseconds.
    #[arg(long = "l1.initial-backoff", id = "l1_initial_backoff", env = "POSTMAN_L1_INITIAL_BACKOFF", default_value_t = constants::PROVIDER_INITIAL_BACKOFF)]
    pub initial_backoff: u64,
}

impl From<L1Args> for ChainArgs {
    fn from(args: L1Args) -> Self {
        Self {
            name: "L1",
            url: args.url,
            message_service_address: args.message_service_address,
            initial_from_block: args.initial_from_block,
            block_confirmation: args.block_confirmation,
            max_fee_per_gas_cap: args.max_fee_per_gas_cap,
            enforce_max_gas_fee: args.enforce_max_gas_fee,
            claim_via_address: args.claim_via_address,
            compute_units_per_second: args.compute_units_per_second,
            max_retries: args.max_retries,
            initial_backoff: args.initial_backoff,
        }
    }
}

/// The arguments for the L2 chain.
#[derive(Debug, Clone, clap::Args)]
pub struct L2Args {
    /// The URL for the L2 RPC.
    #[arg(long = "l2.url", id = "l2_url", env = "POSTMAN_L2_RPC_URL", value_name = "L2_URL")]
    pub url: reqwest::Url,
    /// The L2 message service contract.
    #[arg(long = "l2.message-service-address", id = "l2_message_service_address", env = "POSTMAN_L2_MESSAGE_SERVICE_ADDRESS", value_name = "ADDRESS")]
    pub message_service_address: Address,
    /// The first L2 block scanned for messages and anchorings.
    #[arg(long = "l2.initial-from-block", id = "l2_initial_from_block", env = "POSTMAN_L2_INITIAL_FROM_BLOCK", default_value_t = 0)]
    pub initial_from_block: u64,
    /// The number of blocks a message sent on L2 is buried under before it is indexed.
    #[arg(long = "l2.block-confirmation", id = "l2_block_confirmation", env = "POSTMAN_L2_BLOCK_CONFIRMATION", default_value_t = constants::BLOCK_CONFIRMATION)]
    pub block_confirmation: u64,
    /// The maximum fee per gas paid for claims on L2, in wei.
    #[arg(long = "l2.max-fee-per-gas-cap", id = "l2_max_fee_per_gas_cap", env = "POSTMAN_L2_MAX_FEE_PER_GAS_CAP", default_value_t = constants::MAX_FEE_PER_GAS_CAP)]
    pub max_fee_per_gas_cap: u128,
    /// Whether claim fees on L2 are set to the cap instead of being estimated.
    #[arg(long = "l2.enforce-max-gas-fee", id = "l2_enforce_max_gas_fee", env = "POSTMAN_L2_ENFORCE_MAX_GAS_FEE", default_value_t = false, action = ArgAction::Set)]
    pub enforce_max_gas_fee: bool,
    /// The contract claims on L2 are sent to instead of the message service.
    #[arg(long = "l2.claim-via-address", id = "l2_claim_via_address", env = "POSTMAN_L2_CLAIM_VIA_ADDRESS", value_name = "ADDRESS")]
    pub claim_via_address: Option<Address>,
    /// The compute units per second for the provider.
    #[arg(long = "l2.cups", id = "l2_compute_units_per_second", env = "POSTMAN_L2_COMPUTE_UNITS_PER_SECOND", default_value_t = constants::PROVIDER_COMPUTE_UNITS_PER_SECOND)]
    pub compute_units_per_second: u64,
    /// The max amount of retries for the provider.
    #[arg(long = "l2.max-retries", id = "l2_max_retries", env = "POSTMAN_L2_MAX_RETRIES", default_value_t = constants::PROVIDER_MAX_RETRIES)]
    pub max_retries: u32,
    /// The initial backoff for the provider, in milliseconds.
    #[arg(long = "l2.initial-backoff", id = "l2_initial_backoff", env = "POSTMAN_L2_INITIAL_BACKOFF", default_value_t = constants::PROVIDER_INITIAL_BACKOFF)]
    pub initial_backoff: u64,
}

impl From<L2Args> for ChainArgs {
    fn from(args: L2Args) -> Self {
        Self {
            name: "L2",
            url: args.url,
            message_service_address: args.message_service_address,
            initial_from_block: args.initial_from_block,
            block_confirmation: args.block_confirmation,
            max_fee_per_gas_cap: args.max_fee_per_gas_cap,
            enforce_max_gas_fee: args.enforce_max_gas_fee,
            claim_via_address: args.claim_via_address,
            compute_units_per_second: args.compute_units_per_second,
            max_retries: args.max_retries,
            initial_backoff: args.initial_backoff,
        }
    }
}

/// The arguments for the signer.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct SignerArgs {
    /// Path to the file containing the signer's private key
    #[arg(
        long = "signer.key-file",
        env = "POSTMAN_SIGNER_KEY_FILE",
        value_name = "FILE_PATH",
        help = "Path to the hex-encoded private key file for the signer (optional 0x prefix). Mutually exclusive with --signer.private-key"
    )]
    pub key_file: Option<PathBuf>,

    /// The hex-encoded private key of the signer.
    #[arg(
        long = "signer.private-key",
        env = "POSTMAN_SIGNER_PRIVATE_KEY",
        value_name = "PRIVATE_KEY",
        hide_env_values = true
    )]
    pub private_key: Option<String>,
}

impl SignerArgs {
    /// Create a signer based on the configured arguments
    pub fn signer(&self) -> eyre::Result<PrivateKeySigner> {
        let key = if let Some(key_file_path) = &self.key_file {
            fs::read_to_string(key_file_path).map_err(|e| {
                eyre::eyre!("Failed to read signer key file {}: {}", key_file_path.display(), e)
            })?
        } else if let Some(key) = &self.private_key {
            key.clone()
        } else {
            eyre::bail!("Either a signer key file or a private key is required");
        };

        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        key.parse::<PrivateKeySigner>()
            .map_err(|e| eyre::eyre!("Failed to parse signer private key: {e}"))
    }
}

/// The arguments for the rpc requests.
#[derive(Debug, Clone, clap::Args)]
pub struct RpcArgs {
    /// The timeout of a single RPC request, in milliseconds.
    #[arg(long = "rpc.timeout", id = "rpc_timeout", env = "POSTMAN_RPC_TIMEOUT", default_value_t = constants::RPC_TIMEOUT)]
    pub timeout: u64,
    /// The maximum delay between two ticks of a failing loop, in milliseconds.
    #[arg(long = "rpc.max-backoff", id = "rpc_max_backoff", env = "POSTMAN_MAX_BACKOFF", default_value_t = constants::MAX_BACKOFF)]
    pub max_backoff: u64,
}

/// The arguments of the indexing loops.
#[derive(Debug, Clone, clap::Args)]
pub struct ListenerArgs {
    /// The polling interval of the indexing loops, in milliseconds.
    #[arg(long = "listener.polling-interval", id = "listener_polling_interval", env = "POSTMAN_LISTENER_POLLING_INTERVAL", default_value_t = constants::POLLING_INTERVAL)]
    pub polling_interval: u64,
    /// The maximum size of a block range fetched in one request.
    #[arg(long = "listener.max-blocks-to-fetch-logs", id = "listener_max_blocks_to_fetch_logs", env = "POSTMAN_MAX_BLOCKS_TO_FETCH_LOGS", default_value_t = constants::MAX_BLOCKS_TO_FETCH_LOGS)]
    pub max_blocks_to_fetch_logs: u64,
    /// The maximum number of messages read from the database in a tick.
    #[arg(long = "listener.max-fetch-messages-from-db", id = "listener_max_fetch_messages_from_db", env = "POSTMAN_MAX_FETCH_MESSAGES_FROM_DB", default_value_t = constants::MAX_FETCH_MESSAGES_FROM_DB)]
    pub max_fetch_messages_from_db: u64,
    /// The number of blocks an anchoring is buried under before its messages are promoted.
    #[arg(long = "listener.anchoring-confirmations", id = "listener_anchoring_confirmations", env = "POSTMAN_ANCHORING_CONFIRMATIONS", default_value_t = constants::ANCHORING_CONFIRMATIONS)]
    pub anchoring_confirmations: u64,
    /// Whether messages without calldata are relayed.
    #[arg(long = "listener.eoa-enabled", id = "listener_eoa_enabled", env = "POSTMAN_IS_EOA_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub is_eoa_enabled: bool,
    /// Whether messages with calldata are relayed.
    #[arg(long = "listener.calldata-enabled", id = "listener_calldata_enabled", env = "POSTMAN_IS_CALLDATA_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub is_calldata_enabled: bool,
    /// Only relay the messages of this sender.
    #[arg(long = "listener.from-address", id = "listener_from_address", env = "POSTMAN_EVENT_FILTER_FROM_ADDRESS", value_name = "ADDRESS")]
    pub from_address: Option<Address>,
    /// Only relay the messages to this recipient.
    #[arg(long = "listener.to-address", id = "listener_to_address", env = "POSTMAN_EVENT_FILTER_TO_ADDRESS", value_name = "ADDRESS")]
    pub to_address: Option<Address>,
}

/// The arguments of the claiming loops.
#[derive(Debug, Clone, clap::Args)]
pub struct ClaimingArgs {
    /// The polling interval of the claiming loops, in milliseconds.
    #[arg(long = "claiming.polling-interval", id = "claiming_polling_interval", env = "POSTMAN_CLAIMING_POLLING_INTERVAL", default_value_t = constants::POLLING_INTERVAL)]
    pub polling_interval: u64,
    /// The recipient of the message fees, the zero address lets the claimer collect them.
    #[arg(long = "claiming.fee-recipient", id = "claiming_fee_recipient", env = "POSTMAN_FEE_RECIPIENT", default_value_t = Address::ZERO)]
    pub fee_recipient: Address,
    /// The margin applied on top of the claim cost, `0.1` requires a fee 10% above the cost.
    #[arg(long = "claiming.profit-margin", id = "claiming_profit_margin", env = "POSTMAN_PROFIT_MARGIN", default_value_t = constants::PROFIT_MARGIN)]
    pub profit_margin: f64,
    /// The maximum gas a claim can use.
    #[arg(long = "claiming.max-claim-gas-limit", id = "claiming_max_claim_gas_limit", env = "POSTMAN_MAX_CLAIM_GAS_LIMIT", default_value_t = constants::MAX_CLAIM_GAS_LIMIT)]
    pub max_claim_gas_limit: u64,
    /// The share of the rate limit the Postman is allowed to consume.
    #[arg(long = "claiming.rate-limit-margin", id = "claiming_rate_limit_margin", env = "POSTMAN_RATE_LIMIT_MARGIN", default_value_t = constants::RATE_LIMIT_MARGIN)]
    pub rate_limit_margin: f64,
    /// Whether zero fee messages are claimed at the Postman's expense.
    #[arg(long = "claiming.sponsorship-enabled", id = "claiming_sponsorship_enabled", env = "POSTMAN_SPONSORSHIP_ENABLED", default_value_t = false, action = ArgAction::Set)]
    pub is_postman_sponsorship_enabled: bool,
    /// The maximum gas of a sponsored claim.
    #[arg(long = "claiming.max-sponsor-gas-limit", id = "claiming_max_sponsor_gas_limit", env = "POSTMAN_MAX_SPONSOR_GAS_LIMIT", default_value_t = constants::MAX_POSTMAN_SPONSOR_GAS_LIMIT)]
    pub max_postman_sponsor_gas_limit: u64,
    /// The recipients whose messages are never claimed.
    #[arg(long = "claiming.reserved-recipients", id = "claiming_reserved_recipients", env = "POSTMAN_RESERVED_RECIPIENTS", value_name = "ADDRESSES", value_delimiter = ',')]
    pub reserved_recipients: Vec<Address>,
    /// The number of blocks sampled from the fee history.
    #[arg(long = "claiming.fee-history-block-count", id = "claiming_fee_history_block_count", env = "POSTMAN_FEE_HISTORY_BLOCK_COUNT", default_value_t = constants::FEE_HISTORY_BLOCK_COUNT)]
    pub fee_history_block_count: u64,
    /// The reward percentile sampled from the fee history.
    #[arg(long = "claiming.fee-history-percentile", id = "claiming_fee_history_percentile", env = "POSTMAN_FEE_HISTORY_PERCENTILE", default_value_t = constants::FEE_HISTORY_PERCENTILE)]
    pub fee_history_percentile: f64,
    /// The maximum number of claims broadcast in a tick.
    #[arg(long = "claiming.max-claims-per-tick", id = "claiming_max_claims_per_tick", env = "POSTMAN_MAX_CLAIMS_PER_TICK", default_value_t = constants::MAX_CLAIMS_PER_TICK)]
    pub max_claims_per_tick: u64,
    /// The fee increase of a transaction replacing a pending one, in percent.
    #[arg(long = "claiming.price-bump-percent", id = "claiming_price_bump_percent", env = "POSTMAN_PRICE_BUMP_PERCENT", default_value_t = constants::PRICE_BUMP_PERCENT)]
    pub price_bump_percent: u64,
    /// The number of failed claims after which a message is abandoned.
    #[arg(long = "claiming.max-retries", id = "claiming_max_retries", env = "POSTMAN_MAX_RETRIES", default_value_t = constants::MAX_RETRIES)]
    pub max_retries: u32,
    /// The delay before a failed claim is retried, in seconds.
    #[arg(long = "claiming.retry-delay", id = "claiming_retry_delay", env = "POSTMAN_RETRY_DELAY", default_value_t = constants::RETRY_DELAY)]
    pub retry_delay: u64,
    /// The time a claim transaction is given to produce a receipt, in seconds.
    #[arg(long = "claiming.message-submission-timeout", id = "claiming_message_submission_timeout", env = "POSTMAN_MESSAGE_SUBMISSION_TIMEOUT", default_value_t = constants::MESSAGE_SUBMISSION_TIMEOUT)]
    pub message_submission_timeout: u64,
    /// The additional time an unmined claim is given after the submission timeout, in seconds.
    #[arg(long = "claiming.drop-grace-period", id = "claiming_drop_grace_period", env = "POSTMAN_DROP_GRACE_PERIOD", default_value_t = constants::DROP_GRACE_PERIOD)]
    pub drop_grace_period: u64,
    /// The interval between two re-evaluations of the economic exclusions, in seconds.
    #[arg(long = "claiming.exclusion-resweep-interval", id = "claiming_exclusion_resweep_interval", env = "POSTMAN_EXCLUSION_RESWEEP_INTERVAL", default_value_t = constants::EXCLUSION_RESWEEP_INTERVAL)]
    pub exclusion_resweep_interval: u64,
    /// The maximum distance the persisted nonce may be ahead of the chain nonce.
    #[arg(long = "claiming.max-nonce-diff", id = "claiming_max_nonce_diff", env = "POSTMAN_MAX_NONCE_DIFF", default_value_t = constants::MAX_NONCE_DIFF)]
    pub max_nonce_diff: u64,
}
