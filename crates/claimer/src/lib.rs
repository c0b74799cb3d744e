//! A library responsible for claiming anchored messages on the destination chain.
//!
//! A message moves through three loops of a direction:
//! - the [`ValidationGate`] decides whether an anchored message is worth claiming,
//! - the [`ClaimSubmitter`] broadcasts the claims of ready messages through the nonce manager,
//! - the [`Reconciler`] resolves the pending claims against their receipts and retries failures.
//!
//! Every status change is a conditional update of the message store, so two loops racing on the
//! same message can never both apply their transition.

mod config;
pub use config::{ClaimPayloadConfig, GasFeeConfig, GateConfig, ReconcilerConfig, SubmitterConfig};

mod error;
pub use error::ClaimerError;

mod fees;
pub use fees::GasFeeEstimator;

mod gate;
pub use gate::{GateSummary, GateVerdict, ValidationGate};

mod metrics;
pub use metrics::{
    BacklogMetrics, ClaimMetrics, ClaimerTask, ExclusionMetrics, FailureMetrics, TaskMetrics,
};

mod payload;
pub use payload::{ClaimPayload, ClaimPayloadBuilder};

mod reconciler;
pub use reconciler::{Reconciler, ReconcilerSummary};

mod recorder;
pub use recorder::{ClaimEconomics, EconomicsRecorder};

mod submitter;
pub use submitter::{ClaimSubmitter, SubmissionOutcome, SubmitterSummary};
