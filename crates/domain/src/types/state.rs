//! Per-request dispatch lifecycle

use serde::{Deserialize, Serialize};

/// Where a single request is in its lifecycle
///
/// The only legal path is `NotSent -> Sent -> [AwaitingRefresh -> Resent ->]
/// Terminal`, with `Terminal` reachable from every non-terminal state.
/// `Resent` can be entered at most once, which is what bounds the retry
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    NotSent,
    Sent,
    AwaitingRefresh,
    Resent,
    Terminal,
}

impl_wire_name_conversions!(DispatchState {
    NotSent => "not_sent",
    Sent => "sent",
    AwaitingRefresh => "awaiting_refresh",
    Resent => "resent",
    Terminal => "terminal",
});

impl DispatchState {
    /// Whether `next` may follow `self`
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotSent, Self::Sent)
                | (Self::Sent, Self::AwaitingRefresh)
                | (Self::AwaitingRefresh, Self::Resent)
                | (Self::NotSent | Self::Sent | Self::AwaitingRefresh | Self::Resent, Self::Terminal)
        )
    }

    /// Whether no further transition is possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}
