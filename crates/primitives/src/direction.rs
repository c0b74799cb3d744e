/// The direction of a bridge corridor relayed by a Postman instance.
///
/// Each running instance relays exactly one direction. Relaying both directions of a corridor
/// means running two instances, which may share the same database.
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
pub enum Direction {
    /// Messages sent on L1 and claimed on L2.
    #[strum(serialize = "L1_TO_L2")]
    L1ToL2,
    /// Messages sent on L2 and claimed on L1.
    #[strum(serialize = "L2_TO_L1")]
    L2ToL1,
}

impl Direction {
    /// Returns true if claiming on the destination requires a Merkle proof of inclusion.
    pub const fn requires_proof(&self) -> bool {
        matches!(self, Self::L2ToL1)
    }

    /// Returns the name of the source layer.
    pub const fn source(&self) -> &'static str {
        match self {
            Self::L1ToL2 => "L1",
            Self::L2ToL1 => "L2",
        }
    }

    /// Returns the name of the destination layer.
    pub const fn destination(&self) -> &'static str {
        match self {
            Self::L1ToL2 => "L2",
            Self::L2ToL1 => "L1",
        }
    }
}
