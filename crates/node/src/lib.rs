//! The Postman daemon: configuration, wiring and polling loops of a relayed direction.
//!
//! A running instance relays one [`Direction`](postman_primitives::Direction) of the corridor.
//! Every component runs in its own [`Poller`], the message store is their only coordination
//! point.

mod args;
pub use args::{
    ChainArgs, ClaimingArgs, DatabaseArgs, L1Args, L2Args, ListenerArgs, PostmanArgs, RpcArgs,
    SignerArgs,
};

mod constants;

mod node;
pub use node::PostmanNode;

mod pipeline;
pub use pipeline::{Pipeline, PipelineChains, PipelineConfig};

mod poller;
pub use poller::{Poller, PollerConfig, PollerExit, PollingTask};
