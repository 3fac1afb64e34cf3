use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

/// Lifecycle state of a transfer. Serialized as the integer the wire has
/// always carried (1 = draft, 2 = in-transit, 3 = received, 4 = cancelled).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(try_from = "i16", into = "i16")]
#[strum(serialize_all = "kebab-case")]
pub enum TransferStatus {
    Draft,
    InTransit,
    Received,
    Cancelled,
}

impl TransferStatus {
    /// Terminal states accept no further line edits.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Received | TransferStatus::Cancelled)
    }

    /// Allowed-transition table. Same-status writes are permitted while the
    /// transfer is still editable (a draft re-saved as draft, a receiver's
    /// partial confirm that leaves the transfer in transit).
    pub fn can_transition_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        match (self, next) {
            (Draft, InTransit) | (Draft, Cancelled) => true,
            (InTransit, Received) | (InTransit, Cancelled) => true,
            (current, target) if current == target => !current.is_terminal(),
            _ => false,
        }
    }
}

impl From<TransferStatus> for i16 {
    fn from(status: TransferStatus) -> i16 {
        match status {
            TransferStatus::Draft => 1,
            TransferStatus::InTransit => 2,
            TransferStatus::Received => 3,
            TransferStatus::Cancelled => 4,
        }
    }
}

impl TryFrom<i16> for TransferStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransferStatus::Draft),
            2 => Ok(TransferStatus::InTransit),
            3 => Ok(TransferStatus::Received),
            4 => Ok(TransferStatus::Cancelled),
            other => Err(format!("unknown transfer status {}", other)),
        }
    }
}

/// Which side of a transfer the acting branch is on. Decides which fields a
/// submission may touch and which statuses it may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferRole {
    Sender,
    Receiver,
}

impl TransferRole {
    /// Derives the acting role for an existing transfer. The receiver role
    /// wins if business data ever makes a branch both ends at once.
    pub fn for_branch(acting_branch: Uuid, from_branch: Uuid, to_branch: Uuid) -> Option<Self> {
        if acting_branch == to_branch {
            Some(TransferRole::Receiver)
        } else if acting_branch == from_branch {
            Some(TransferRole::Sender)
        } else {
            None
        }
    }

    /// Statuses this role is allowed to write. The sender drives the document
    /// until dispatch; the receiver only records receipt.
    pub fn may_write_status(self, status: TransferStatus) -> bool {
        match self {
            TransferRole::Sender => matches!(
                status,
                TransferStatus::Draft | TransferStatus::InTransit | TransferStatus::Cancelled
            ),
            TransferRole::Receiver => {
                matches!(status, TransferStatus::InTransit | TransferStatus::Received)
            }
        }
    }
}

/// Derived receipt reconciliation, computed from lines after a result set
/// loads. Never persisted and never pushed down into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReceiveStatus {
    Matched,
    Unmatched,
}

impl ReceiveStatus {
    /// A transfer is matched when every line was received in full.
    pub fn classify<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (&'a Decimal, &'a Decimal)>,
    {
        let matched = lines
            .into_iter()
            .all(|(send, received)| send == received);
        if matched {
            ReceiveStatus::Matched
        } else {
            ReceiveStatus::Unmatched
        }
    }
}
