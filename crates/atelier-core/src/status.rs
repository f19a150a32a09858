//! # Order Status Transitions
//!
//! ```text
//!   Processing ──► Shipped ──► Delivered
//!        │                        ▲
//!        └────────────────────────┘
//!          only with direct_fulfillment
//!          AND an offline sale on the order
//! ```
//!
//! Transitions are forward-only. `Delivered` is terminal.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

/// Which optional transitions are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPolicy {
    /// Lets an order rung up in person go straight from `Processing` to
    /// `Delivered`, for goods handed over at the counter.
    #[serde(default)]
    pub direct_fulfillment: bool,
}

impl TransitionPolicy {
    pub const STRICT: TransitionPolicy = TransitionPolicy {
        direct_fulfillment: false,
    };

    pub const DIRECT_FULFILLMENT: TransitionPolicy = TransitionPolicy {
        direct_fulfillment: true,
    };
}

/// Checks a status change against the transition table.
///
/// `has_offline_sale` tells whether the order carries a settlement, which
/// only matters for the direct-fulfillment skip.
///
/// ## Example
/// ```rust
/// use atelier_core::status::{check_transition, TransitionPolicy};
/// use atelier_core::types::OrderStatus;
///
/// let ok = check_transition("o1", OrderStatus::Processing, OrderStatus::Shipped, false, TransitionPolicy::STRICT);
/// assert!(ok.is_ok());
///
/// let skip = check_transition("o1", OrderStatus::Processing, OrderStatus::Delivered, true, TransitionPolicy::STRICT);
/// assert!(skip.is_err());
/// ```
pub fn check_transition(
    order_id: &str,
    from: OrderStatus,
    to: OrderStatus,
    has_offline_sale: bool,
    policy: TransitionPolicy,
) -> CoreResult<()> {
    let allowed = match (from, to) {
        (OrderStatus::Processing, OrderStatus::Shipped) => true,
        (OrderStatus::Shipped, OrderStatus::Delivered) => true,
        (OrderStatus::Processing, OrderStatus::Delivered) => {
            policy.direct_fulfillment && has_offline_sale
        }
        _ => false,
    };

    if !allowed {
        return Err(CoreError::InvalidStatusTransition {
            order_id: order_id.to_string(),
            from,
            to,
        });
    }
    Ok(())
}

/// The single next state along the normal path, if any.
pub fn next_status(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Processing => Some(OrderStatus::Shipped),
        OrderStatus::Shipped => Some(OrderStatus::Delivered),
        OrderStatus::Delivered => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 3] = [Processing, Shipped, Delivered];

    #[test]
    fn test_forward_path() {
        assert!(check_transition("o", Processing, Shipped, false, TransitionPolicy::STRICT).is_ok());
        assert!(check_transition("o", Shipped, Delivered, false, TransitionPolicy::STRICT).is_ok());
    }

    #[test]
    fn test_backward_and_self_transitions_rejected() {
        for policy in [TransitionPolicy::STRICT, TransitionPolicy::DIRECT_FULFILLMENT] {
            for from in ALL {
                for to in ALL {
                    if to <= from {
                        assert!(check_transition("o", from, to, true, policy).is_err());
                    }
                }
            }
        }
    }

    #[test]
    fn test_direct_fulfillment_needs_policy_and_offline_sale() {
        let skip = |offline, policy| check_transition("o", Processing, Delivered, offline, policy);

        assert!(skip(false, TransitionPolicy::STRICT).is_err());
        assert!(skip(true, TransitionPolicy::STRICT).is_err());
        assert!(skip(false, TransitionPolicy::DIRECT_FULFILLMENT).is_err());
        assert!(skip(true, TransitionPolicy::DIRECT_FULFILLMENT).is_ok());
    }

    #[test]
    fn test_error_names_the_order() {
        let err = check_transition("order-9", Delivered, Shipped, false, TransitionPolicy::STRICT).unwrap_err();
        assert_eq!(err.to_string(), "Order order-9 cannot move from delivered to shipped");
    }

    #[test]
    fn test_next_status() {
        assert_eq!(next_status(Processing), Some(Shipped));
        assert_eq!(next_status(Delivered), None);
    }
}
