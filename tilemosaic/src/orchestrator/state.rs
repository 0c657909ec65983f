//! Lifecycle of a mosaic download.

use std::fmt;

/// Stage of a mosaic download.
///
/// A run moves forward through `Idle → RangeComputed → Fetching →
/// Assembling → Writing → Done`. Invalid input and I/O failures end it in
/// `Failed`; a fired cancellation token ends it in `Cancelled`. The stage is
/// stored as an atomic u8 so it can be observed while a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MosaicState {
    /// No run has started, or the previous run was reset
    Idle = 0,
    /// The tile range and canvas have been computed
    RangeComputed = 1,
    /// Tiles are being downloaded
    Fetching = 2,
    /// Tiles are being decoded and composited
    Assembling = 3,
    /// The GeoTIFF is being written
    Writing = 4,
    /// The output file is complete
    Done = 5,
    /// The run aborted with an error
    Failed = 6,
    /// The run was cancelled while fetching
    Cancelled = 7,
}

impl MosaicState {
    /// Converts from u8 representation.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::RangeComputed),
            2 => Some(Self::Fetching),
            3 => Some(Self::Assembling),
            4 => Some(Self::Writing),
            5 => Some(Self::Done),
            6 => Some(Self::Failed),
            7 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible within a run.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a run may move from `self` to `next`.
    pub fn can_transition_to(&self, next: MosaicState) -> bool {
        use MosaicState::*;
        matches!(
            (self, next),
            (Idle, RangeComputed)
                | (RangeComputed, Fetching)
                | (RangeComputed, Failed)
                | (Fetching, Assembling)
                | (Fetching, Cancelled)
                | (Assembling, Writing)
                | (Writing, Done)
                | (Writing, Failed)
        )
    }

    /// Returns the state name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RangeComputed => "range_computed",
            Self::Fetching => "fetching",
            Self::Assembling => "assembling",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MosaicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MosaicState; 8] = [
        MosaicState::Idle,
        MosaicState::RangeComputed,
        MosaicState::Fetching,
        MosaicState::Assembling,
        MosaicState::Writing,
        MosaicState::Done,
        MosaicState::Failed,
        MosaicState::Cancelled,
    ];

    #[test]
    fn test_u8_round_trip() {
        for state in ALL {
            assert_eq!(MosaicState::from_u8(state as u8), Some(state));
        }
        assert_eq!(MosaicState::from_u8(8), None);
    }

    #[test]
    fn test_happy_path_is_valid() {
        let path = [
            MosaicState::Idle,
            MosaicState::RangeComputed,
            MosaicState::Fetching,
            MosaicState::Assembling,
            MosaicState::Writing,
            MosaicState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_only_from_range_or_writing() {
        let sources: Vec<_> = ALL
            .iter()
            .filter(|s| s.can_transition_to(MosaicState::Failed))
            .copied()
            .collect();
        assert_eq!(sources, vec![MosaicState::RangeComputed, MosaicState::Writing]);
    }

    #[test]
    fn test_cancelled_only_from_fetching() {
        let sources: Vec<_> = ALL
            .iter()
            .filter(|s| s.can_transition_to(MosaicState::Cancelled))
            .copied()
            .collect();
        assert_eq!(sources, vec![MosaicState::Fetching]);
    }

    #[test]
    fn test_terminal_states_have_no_successor() {
        for state in ALL.iter().filter(|s| s.is_terminal()) {
            assert!(ALL.iter().all(|next| !state.can_transition_to(*next)));
        }
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!MosaicState::Idle.can_transition_to(MosaicState::Fetching));
        assert!(!MosaicState::Fetching.can_transition_to(MosaicState::Writing));
        assert!(!MosaicState::Assembling.can_transition_to(MosaicState::Done));
    }

    #[test]
    fn test_display() {
        assert_eq!(MosaicState::RangeComputed.to_string(), "range_computed");
        assert_eq!(MosaicState::Cancelled.to_string(), "cancelled");
    }
}
