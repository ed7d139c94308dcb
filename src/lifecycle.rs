//! Order and payment-status state machines.
//!
//! The single authority for status change: services call into these
//! checks with the *persisted* row before mutating anything, and UI
//! layers only request transitions. All checks are pure functions of
//! `(ActorContext, Order)`.
//!
//! Fulfillment path: pending -> processing -> shipped -> delivered,
//! with pending and processing also able to move to cancelled.
//! Delivered and cancelled are terminal. Buyers may only cancel their
//! own pending/processing orders; sellers advance their own orders
//! forward but can never cancel; admins are read-only.

use crate::auth::{ActorContext, Role};
use crate::entities::order::{self, OrderStatus, PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;

/// Legal targets from `current`, before any authority check.
pub fn allowed_targets(current: &OrderStatus) -> &'static [OrderStatus] {
    match current {
        OrderStatus::Pending => &[OrderStatus::Processing, OrderStatus::Cancelled],
        OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
        OrderStatus::Shipped => &[OrderStatus::Delivered],
        OrderStatus::Delivered | OrderStatus::Cancelled => &[],
    }
}

pub fn is_terminal(status: &OrderStatus) -> bool {
    allowed_targets(status).is_empty()
}

fn forbidden(current: &OrderStatus) -> ServiceError {
    ServiceError::ForbiddenTransition {
        current: current.clone(),
        allowed: allowed_targets(current).to_vec(),
    }
}

/// Validates one fulfillment-status transition. State is untouched on
/// failure; the error carries the allowed target set for the caller.
pub fn check_transition(
    actor: &ActorContext,
    order: &order::Model,
    target: &OrderStatus,
) -> Result<(), ServiceError> {
    if !allowed_targets(&order.status).contains(target) {
        return Err(forbidden(&order.status));
    }

    let authorized = match actor.role {
        // Moderation and fulfillment are deliberately separated;
        // admins never transition orders.
        Role::Admin => false,
        Role::Buyer => *target == OrderStatus::Cancelled && actor.user_id == order.buyer_id,
        Role::Seller => *target != OrderStatus::Cancelled && actor.user_id == order.seller_id,
    };

    if !authorized {
        return Err(forbidden(&order.status));
    }
    Ok(())
}

/// Validates marking a COD order as paid. Online-paid orders have
/// their payment status fixed at creation; the `failed` state is
/// reserved for the capture path and is unreachable here.
pub fn check_cod_payment_transition(
    actor: &ActorContext,
    order: &order::Model,
) -> Result<(), ServiceError> {
    if order.payment_method != PaymentMethod::Cod {
        return Err(ServiceError::InvalidOperation(
            "Payment status is settled at capture time for online payments".to_string(),
        ));
    }
    if actor.role != Role::Seller || actor.user_id != order.seller_id {
        return Err(ServiceError::Forbidden(
            "Only the owning seller may record a COD payment".to_string(),
        ));
    }
    if order.payment_status != PaymentStatus::Pending {
        return Err(ServiceError::InvalidOperation(format!(
            "Payment is already {}",
            order.payment_status
        )));
    }
    Ok(())
}

/// Validates a tracking-number assignment: owning seller only, at any
/// non-terminal status. Overwrites are idempotent; no history is kept.
pub fn check_tracking_update(
    actor: &ActorContext,
    order: &order::Model,
) -> Result<(), ServiceError> {
    if actor.role != Role::Seller || actor.user_id != order.seller_id {
        return Err(ServiceError::Forbidden(
            "Only the owning seller may set tracking".to_string(),
        ));
    }
    if is_terminal(&order.status) {
        return Err(ServiceError::InvalidOperation(format!(
            "Tracking cannot change once an order is {}",
            order.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use uuid::Uuid;

    use crate::entities::order::ShippingFeeBasis;

    fn order(status: OrderStatus, method: PaymentMethod) -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            order_number: "ORD-TEST0001".to_string(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            status,
            payment_status: if method == PaymentMethod::Cod {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Paid
            },
            payment_method: method,
            subtotal: dec!(500),
            platform_fee: dec!(50),
            shipping_fee: dec!(50),
            shipping_fee_basis: ShippingFeeBasis::PerItem,
            shipping_savings: dec!(0),
            total_amount: dec!(600),
            shipping_address: json!({}),
            payment_intent_id: None,
            idempotency_key: None,
            tracking_number: None,
            order_date: Utc::now(),
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        }
    }

    #[test]
    fn seller_advances_through_happy_path() {
        let mut o = order(OrderStatus::Pending, PaymentMethod::Cod);
        let seller = ActorContext::seller(o.seller_id);

        for target in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            check_transition(&seller, &o, &target).unwrap();
            o.status = target;
        }
        assert!(o.is_terminal());
    }

    #[test]
    fn seller_cannot_skip_ahead_or_cancel() {
        let o = order(OrderStatus::Pending, PaymentMethod::Cod);
        let seller = ActorContext::seller(o.seller_id);

        assert_matches!(
            check_transition(&seller, &o, &OrderStatus::Shipped),
            Err(ServiceError::ForbiddenTransition { .. })
        );
        assert_matches!(
            check_transition(&seller, &o, &OrderStatus::Cancelled),
            Err(ServiceError::ForbiddenTransition { .. })
        );
    }

    #[test]
    fn buyer_cancels_only_own_pending_or_processing() {
        for status in [OrderStatus::Pending, OrderStatus::Processing] {
            let o = order(status, PaymentMethod::Cod);
            let buyer = ActorContext::buyer(o.buyer_id);
            check_transition(&buyer, &o, &OrderStatus::Cancelled).unwrap();

            let stranger = ActorContext::buyer(Uuid::new_v4());
            assert_matches!(
                check_transition(&stranger, &o, &OrderStatus::Cancelled),
                Err(ServiceError::ForbiddenTransition { .. })
            );
        }

        let shipped = order(OrderStatus::Shipped, PaymentMethod::Cod);
        let buyer = ActorContext::buyer(shipped.buyer_id);
        assert_matches!(
            check_transition(&buyer, &shipped, &OrderStatus::Cancelled),
            Err(ServiceError::ForbiddenTransition { .. })
        );
    }

    #[test]
    fn buyer_cannot_advance_fulfillment() {
        let o = order(OrderStatus::Pending, PaymentMethod::Cod);
        let buyer = ActorContext::buyer(o.buyer_id);
        assert_matches!(
            check_transition(&buyer, &o, &OrderStatus::Processing),
            Err(ServiceError::ForbiddenTransition { .. })
        );
    }

    #[test]
    fn terminal_states_refuse_everything() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let o = order(status, PaymentMethod::Cod);
            let seller = ActorContext::seller(o.seller_id);
            let buyer = ActorContext::buyer(o.buyer_id);

            for target in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ] {
                assert_matches!(
                    check_transition(&seller, &o, &target),
                    Err(ServiceError::ForbiddenTransition { .. })
                );
                assert_matches!(
                    check_transition(&buyer, &o, &target),
                    Err(ServiceError::ForbiddenTransition { .. })
                );
            }
        }
    }

    #[test]
    fn delivered_is_immutable_even_to_the_seller() {
        // A seller walking back a delivered order is the canonical
        // forbidden case.
        let o = order(OrderStatus::Delivered, PaymentMethod::Cod);
        let seller = ActorContext::seller(o.seller_id);
        let err = check_transition(&seller, &o, &OrderStatus::Processing).unwrap_err();
        assert_matches!(
            err,
            ServiceError::ForbiddenTransition { ref allowed, .. } if allowed.is_empty()
        );
    }

    #[test]
    fn admin_transitions_always_fail() {
        let admin = ActorContext::admin(Uuid::new_v4());
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            let o = order(status, PaymentMethod::Cod);
            for target in allowed_targets(&o.status) {
                assert_matches!(
                    check_transition(&admin, &o, target),
                    Err(ServiceError::ForbiddenTransition { .. })
                );
            }
        }
    }

    #[test]
    fn forbidden_transition_reports_allowed_set() {
        let o = order(OrderStatus::Pending, PaymentMethod::Cod);
        let admin = ActorContext::admin(Uuid::new_v4());
        let err = check_transition(&admin, &o, &OrderStatus::Processing).unwrap_err();
        assert_matches!(
            err,
            ServiceError::ForbiddenTransition { allowed, .. }
                if allowed == vec![OrderStatus::Processing, OrderStatus::Cancelled]
        );
    }

    #[test]
    fn cod_payment_marked_paid_by_owning_seller_only() {
        let o = order(OrderStatus::Processing, PaymentMethod::Cod);
        check_cod_payment_transition(&ActorContext::seller(o.seller_id), &o).unwrap();

        assert_matches!(
            check_cod_payment_transition(&ActorContext::seller(Uuid::new_v4()), &o),
            Err(ServiceError::Forbidden(_))
        );
        assert_matches!(
            check_cod_payment_transition(&ActorContext::admin(Uuid::new_v4()), &o),
            Err(ServiceError::Forbidden(_))
        );
        assert_matches!(
            check_cod_payment_transition(&ActorContext::buyer(o.buyer_id), &o),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn online_payment_status_is_immutable() {
        let o = order(OrderStatus::Processing, PaymentMethod::Gcash);
        assert_matches!(
            check_cod_payment_transition(&ActorContext::seller(o.seller_id), &o),
            Err(ServiceError::InvalidOperation(_))
        );
    }

    #[test]
    fn cod_payment_cannot_be_paid_twice() {
        let mut o = order(OrderStatus::Processing, PaymentMethod::Cod);
        o.payment_status = PaymentStatus::Paid;
        assert_matches!(
            check_cod_payment_transition(&ActorContext::seller(o.seller_id), &o),
            Err(ServiceError::InvalidOperation(_))
        );
    }

    #[test]
    fn tracking_rules() {
        let o = order(OrderStatus::Shipped, PaymentMethod::Cod);
        check_tracking_update(&ActorContext::seller(o.seller_id), &o).unwrap();

        assert_matches!(
            check_tracking_update(&ActorContext::admin(Uuid::new_v4()), &o),
            Err(ServiceError::Forbidden(_))
        );

        let done = order(OrderStatus::Delivered, PaymentMethod::Cod);
        assert_matches!(
            check_tracking_update(&ActorContext::seller(done.seller_id), &done),
            Err(ServiceError::InvalidOperation(_))
        );
    }
}
