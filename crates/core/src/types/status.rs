//! Order lifecycle status and its legal transition table.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders always start as [`Pending`](Self::Pending) and move along the
/// directed edges below. [`Delivered`](Self::Delivered) and
/// [`Cancelled`](Self::Cancelled) are terminal.
///
/// ```text
/// Pending ──> Confirmed ──> Shipping ──> Delivered
///    │            │
///    └────────────┴──> Cancelled
/// ```
///
/// Persisted as its numeric code (0-4), matching the storage schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting operator confirmation.
    #[default]
    Pending,
    /// Confirmed by an operator.
    Confirmed,
    /// Service delivery in progress.
    Shipping,
    /// Completed. Terminal.
    Delivered,
    /// Cancelled before shipping. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// All status values, in code order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipping,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The numeric code this status is persisted as.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Shipping => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    /// Whether no further transition leaves this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `self -> target` is a legal edge of the lifecycle.
    ///
    /// A same-status "transition" is not an edge; callers treat it as a
    /// no-op rather than asking this table.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed)
                | (Self::Confirmed, Self::Shipping)
                | (Self::Shipping, Self::Delivered)
                | (Self::Pending | Self::Confirmed, Self::Cancelled)
        )
    }
}

/// Error returned when a numeric status code is out of range.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid order status code: {0}")]
pub struct InvalidStatusCode(pub i16);

impl TryFrom<i16> for OrderStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Confirmed),
            2 => Ok(Self::Shipping),
            3 => Ok(Self::Delivered),
            4 => Ok(Self::Cancelled),
            other => Err(InvalidStatusCode(other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipping" => Ok(Self::Shipping),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

// SQLx support (with postgres feature): stored as SMALLINT codes.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::try_from(code)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGAL_EDGES: [(OrderStatus, OrderStatus); 5] = [
        (OrderStatus::Pending, OrderStatus::Confirmed),
        (OrderStatus::Confirmed, OrderStatus::Shipping),
        (OrderStatus::Shipping, OrderStatus::Delivered),
        (OrderStatus::Pending, OrderStatus::Cancelled),
        (OrderStatus::Confirmed, OrderStatus::Cancelled),
    ];

    #[test]
    fn test_exactly_the_legal_edges_are_allowed() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = LEGAL_EDGES.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "edge {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_outgoing_edges() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "edge {from} -> {to}");
            }
        }
    }

    #[test]
    fn test_code_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::try_from(status.code()), Ok(status));
        }
        assert_eq!(OrderStatus::try_from(5), Err(InvalidStatusCode(5)));
        assert_eq!(OrderStatus::try_from(-1), Err(InvalidStatusCode(-1)));
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.to_string().parse().expect("roundtrip");
            assert_eq!(parsed, status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }
}
