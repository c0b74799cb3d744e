use crate::ProviderError;

/// A sample of recent fees, as returned by `eth_feeHistory` for one reward percentile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeHistory {
    /// The latest block included in the sample.
    pub latest_block: u64,
    /// The base fee of the block following the latest block.
    pub next_base_fee_per_gas: u128,
    /// The priority fee paid at the requested percentile, per sampled block.
    pub rewards: Vec<u128>,
}

/// An instance of the trait can sample the fee market of a chain.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait FeeHistorySource: Send + Sync {
    /// Returns the fee history of the latest `block_count` blocks at the reward `percentile`.
    async fn fee_history(
        &self,
        block_count: u64,
        percentile: f64,
    ) -> Result<FeeHistory, ProviderError>;
}
