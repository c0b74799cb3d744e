/// The lifecycle status of a relayed message.
///
/// The allowed transitions are encoded in [`MessageStatus::can_transition_to`]. Every write to a
/// message status is a compare-and-set keyed on the expected prior status, so a transition not
/// present in the graph is refused by the store.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum MessageStatus {
    /// The message-sent event was observed on the source chain.
    #[strum(serialize = "SENT")]
    Sent,
    /// The message root was anchored on the destination with enough confirmations.
    #[strum(serialize = "ANCHORED")]
    Anchored,
    /// The message passed validation and is waiting to be claimed.
    #[strum(serialize = "READY")]
    Ready,
    /// A claim transaction is outstanding for the message.
    #[strum(serialize = "CLAIMING")]
    Claiming,
    /// The message was claimed by the Postman.
    #[strum(serialize = "CLAIMED")]
    Claimed,
    /// The message was claimed by someone else.
    #[strum(serialize = "CLAIMED_EXTERNAL")]
    ClaimedExternal,
    /// The last claim attempt failed, the message is waiting to be retried.
    #[strum(serialize = "CLAIM_FAILED")]
    ClaimFailed,
    /// The retry budget of the message is exhausted.
    #[strum(serialize = "CLAIM_FAILED_TERMINAL")]
    ClaimFailedTerminal,
    /// The message was excluded from claiming, see [`ExclusionReason`].
    #[strum(serialize = "EXCLUDED")]
    Excluded,
}

impl MessageStatus {
    /// Returns true if the status is terminal.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Claimed | Self::ClaimedExternal | Self::ClaimFailedTerminal)
    }

    /// Returns true if a message can be created with this status.
    pub const fn is_initial(&self) -> bool {
        matches!(self, Self::Sent | Self::Excluded)
    }

    /// Returns true if the transition from `self` to `next` is part of the status graph.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Sent, Self::Anchored) |
                (Self::Anchored, Self::Ready | Self::ClaimedExternal | Self::Excluded) |
                (Self::Excluded, Self::Anchored) |
                (Self::Ready, Self::Claiming | Self::ClaimedExternal) |
                (
                    Self::Claiming,
                    Self::Ready | Self::Claimed | Self::ClaimedExternal | Self::ClaimFailed
                ) |
                (Self::ClaimFailed, Self::Ready | Self::ClaimFailedTerminal)
        )
    }
}

/// The reason a message was excluded from claiming.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum ExclusionReason {
    /// The message carries no fee.
    #[strum(serialize = "ZERO_FEE")]
    ZeroFee,
    /// The fee does not cover the claim gas cost plus the profit margin.
    #[strum(serialize = "UNDERPRICED")]
    Underpriced,
    /// Claiming would exceed the destination rate limit.
    #[strum(serialize = "RATE_LIMITED")]
    RateLimited,
    /// The claim gas estimate is above the configured maximum.
    #[strum(serialize = "GAS_LIMIT_EXCEEDED")]
    GasLimitExceeded,
    /// The claim simulation reverted.
    #[strum(serialize = "SIMULATION_REVERTED")]
    SimulationReverted,
    /// The recipient is on the reserved list.
    #[strum(serialize = "RESERVED_RECIPIENT")]
    ReservedRecipient,
    /// The message was filtered out when indexed.
    #[strum(serialize = "FILTERED")]
    Filtered,
}

impl ExclusionReason {
    /// Returns true if the exclusion depends on market conditions and is worth re-evaluating.
    pub const fn is_economic(&self) -> bool {
        matches!(self, Self::Underpriced | Self::RateLimited)
    }
}

/// The cause of the last failed claim attempt.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum ClaimFailure {
    /// The claim transaction was mined and reverted.
    #[strum(serialize = "REVERTED")]
    Reverted,
    /// The claim transaction never produced a receipt.
    #[strum(serialize = "DROPPED")]
    Dropped,
}

/// The claim status of a message as reported by the destination message service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
pub enum OnChainMessageStatus {
    /// The destination does not know the message yet.
    Unknown,
    /// The message can be claimed.
    Claimable,
    /// The message has already been claimed.
    Claimed,
}

impl OnChainMessageStatus {
    /// Returns the status for the raw code returned by the message service, if known.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Claimable),
            2 => Some(Self::Claimed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_terminal_statuses_have_no_outgoing_transitions() {
        for from in MessageStatus::iter().filter(MessageStatus::is_terminal) {
            for to in MessageStatus::iter() {
                assert!(!from.can_transition_to(to), "{from} -> {to} should be refused");
            }
        }
    }

    #[test]
    fn test_claim_lifecycle_transitions() {
        let path = [
            MessageStatus::Sent,
            MessageStatus::Anchored,
            MessageStatus::Ready,
            MessageStatus::Claiming,
            MessageStatus::ClaimFailed,
            MessageStatus::Ready,
            MessageStatus::Claiming,
            MessageStatus::Claimed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_skipping_states_is_refused() {
        assert!(!MessageStatus::Sent.can_transition_to(MessageStatus::Ready));
        assert!(!MessageStatus::Sent.can_transition_to(MessageStatus::Claiming));
        assert!(!MessageStatus::Anchored.can_transition_to(MessageStatus::Claiming));
        assert!(!MessageStatus::ClaimFailed.can_transition_to(MessageStatus::Claimed));
        assert!(!MessageStatus::Excluded.can_transition_to(MessageStatus::Ready));
        assert!(!MessageStatus::Ready.can_transition_to(MessageStatus::Excluded));
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in MessageStatus::iter() {
            assert_eq!(MessageStatus::from_str(status.as_ref()).unwrap(), status);
        }
        for reason in ExclusionReason::iter() {
            assert_eq!(ExclusionReason::from_str(reason.as_ref()).unwrap(), reason);
        }
    }

    #[test]
    fn test_only_market_exclusions_are_economic() {
        let economic: Vec<_> = ExclusionReason::iter().filter(|r| r.is_economic()).collect();
        assert_eq!(economic, vec![ExclusionReason::Underpriced, ExclusionReason::RateLimited]);
    }

    #[test]
    fn test_on_chain_status_codes() {
        assert_eq!(OnChainMessageStatus::from_code(0), Some(OnChainMessageStatus::Unknown));
        assert_eq!(OnChainMessageStatus::from_code(1), Some(OnChainMessageStatus::Claimable));
        assert_eq!(OnChainMessageStatus::from_code(2), Some(OnChainMessageStatus::Claimed));
        assert_eq!(OnChainMessageStatus::from_code(3), None);
    }
}
