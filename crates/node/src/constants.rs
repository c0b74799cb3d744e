//! Default values of the Postman configuration.

/// The default database url.
pub(crate) const DEFAULT_DATABASE_URL: &str = "sqlite://postman.db?mode=rwc";

/// The max retries for the chain providers.
pub(crate) const PROVIDER_MAX_RETRIES: u32 = 10;

/// The initial backoff for the chain providers, in milliseconds.
pub(crate) const PROVIDER_INITIAL_BACKOFF: u64 = 100;

/// The default provider compute units per second.
pub(crate) const PROVIDER_COMPUTE_UNITS_PER_SECOND: u64 = 10000;

/// The default timeout of a single RPC request, in milliseconds.
pub(crate) const RPC_TIMEOUT: u64 = 10_000;

/// The default maximum delay between two ticks of a failing loop, in milliseconds.
pub(crate) const MAX_BACKOFF: u64 = 60_000;

/// The default polling interval of the loops, in milliseconds.
pub(crate) const POLLING_INTERVAL: u64 = 4_000;

/// The default number of blocks a message is buried under before it is indexed.
pub(crate) const BLOCK_CONFIRMATION: u64 = 4;

/// The default number of blocks an anchoring is buried under before it is trusted.
pub(crate) const ANCHORING_CONFIRMATIONS: u64 = 4;

/// The default maximum size of a block range fetched in one request.
pub(crate) const MAX_BLOCKS_TO_FETCH_LOGS: u64 = 1_000;

/// The default maximum number of messages read from the database in a tick.
pub(crate) const MAX_FETCH_MESSAGES_FROM_DB: u64 = 1_000;

/// The default margin applied on top of the claim cost.
pub(crate) const PROFIT_MARGIN: f64 = 0.0;

/// The default maximum gas a claim can use.
pub(crate) const MAX_CLAIM_GAS_LIMIT: u64 = 100_000;

/// The default maximum gas of a sponsored claim.
pub(crate) const MAX_POSTMAN_SPONSOR_GAS_LIMIT: u64 = 250_000;

/// The default share of the rate limit the Postman is allowed to consume.
pub(crate) const RATE_LIMIT_MARGIN: f64 = 0.95;

/// The default maximum fee per gas, in wei.
pub(crate) const MAX_FEE_PER_GAS_CAP: u128 = 100_000_000_000;

/// The default number of blocks sampled from the fee history.
pub(crate) const FEE_HISTORY_BLOCK_COUNT: u64 = 10;

/// The default reward percentile sampled from the fee history.
pub(crate) const FEE_HISTORY_PERCENTILE: f64 = 15.0;

/// The default maximum number of claims broadcast in a tick.
pub(crate) const MAX_CLAIMS_PER_TICK: u64 = 10;

/// The default fee increase of a replacement transaction, in percent.
pub(crate) const PRICE_BUMP_PERCENT: u64 = 10;

/// The default number of failed claims after which a message is abandoned.
pub(crate) const MAX_RETRIES: u32 = 5;

/// The default delay before a failed claim is retried, in seconds.
pub(crate) const RETRY_DELAY: u64 = 60;

/// The default time a claim transaction is given to produce a receipt, in seconds.
pub(crate) const MESSAGE_SUBMISSION_TIMEOUT: u64 = 300;

/// The default additional time a pending claim is given before it is dropped, in seconds.
pub(crate) const DROP_GRACE_PERIOD: u64 = 300;

/// The default interval between two re-evaluations of the economic exclusions, in seconds.
pub(crate) const EXCLUSION_RESWEEP_INTERVAL: u64 = 600;

/// The default maximum distance between the persisted and the chain nonce.
pub(crate) const MAX_NONCE_DIFF: u64 = 10_000;
