use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle. Transitions only move forward; `cancelled` is reachable
/// solely from `pending`, before the seller has acted on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Processing) | (Processing, Shipped)
                | (Shipped, Completed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn forward_progression_is_allowed() {
        assert!(Pending.can_transition(Paid));
        assert!(Paid.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Completed));
    }

    #[test]
    fn cancellation_only_from_pending() {
        assert!(Pending.can_transition(Cancelled));
        assert!(!Paid.can_transition(Cancelled));
        assert!(!Processing.can_transition(Cancelled));
        assert!(!Shipped.can_transition(Cancelled));
        assert!(!Completed.can_transition(Cancelled));
    }

    #[test]
    fn no_backward_or_skipping_moves() {
        assert!(!Pending.can_transition(Processing));
        assert!(!Pending.can_transition(Completed));
        assert!(!Paid.can_transition(Pending));
        assert!(!Shipped.can_transition(Processing));
        assert!(!Completed.can_transition(Paid));
        assert!(!Cancelled.can_transition(Pending));
        assert!(!Cancelled.can_transition(Paid));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [Pending, Paid, Processing, Shipped, Completed, Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
