use std::ops::RangeInclusive;

/// An event emitted by the indexer after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerEvent {
    /// There was no block past the confirmation depth left to index.
    UpToDate {
        /// The latest block of the indexed chain.
        head: u64,
    },
    /// A range of source blocks has been indexed.
    MessagesIndexed {
        /// The indexed block range.
        range: RangeInclusive<u64>,
        /// The number of messages stored as `SENT`.
        inserted: usize,
        /// The number of messages stored as excluded by the event filters.
        filtered: usize,
        /// The number of events that were already stored.
        duplicates: usize,
    },
    /// The anchoring events have been indexed and the matching messages promoted.
    AnchoringIndexed {
        /// The indexed destination block range, if any block was past the confirmation depth.
        range: Option<RangeInclusive<u64>>,
        /// The number of new anchoring records.
        anchorings: usize,
        /// The number of messages moved to `ANCHORED`.
        anchored: usize,
    },
}
