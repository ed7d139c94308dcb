//! Splits a buyer's cart into the seller-scoped subset being checked
//! out and the lines that stay behind for a later checkout.
//!
//! One checkout produces one order, and one order is bound to exactly
//! one seller, so a multi-seller cart is checked out one seller at a
//! time.

use uuid::Uuid;

use crate::entities::cart_item;
use crate::errors::ServiceError;

/// Result of partitioning: what gets priced and ordered now, and what
/// remains in the cart.
#[derive(Debug, Clone)]
pub struct CartSplit {
    pub checkout: Vec<cart_item::Model>,
    pub remaining: Vec<cart_item::Model>,
}

/// Partitions `cart` by line identity.
///
/// With an explicit `selected` set the checkout lines are exactly those
/// ids; without one the whole cart is the checkout set (single-seller
/// convenience path). Either way the checkout set must be non-empty and
/// homogeneous in seller.
pub fn partition(
    cart: Vec<cart_item::Model>,
    selected: Option<&[Uuid]>,
) -> Result<CartSplit, ServiceError> {
    let split = match selected {
        Some(ids) => {
            let (checkout, remaining): (Vec<_>, Vec<_>) =
                cart.into_iter().partition(|line| ids.contains(&line.id));
            if checkout.len() != ids.len() {
                return Err(ServiceError::NotFound(
                    "One or more selected items are not in the cart".to_string(),
                ));
            }
            CartSplit { checkout, remaining }
        }
        None => CartSplit {
            checkout: cart,
            remaining: Vec::new(),
        },
    };

    if split.checkout.is_empty() {
        return Err(ServiceError::ValidationError(
            "Nothing to check out: the cart selection is empty".to_string(),
        ));
    }

    let seller = split.checkout[0].seller_id;
    if split.checkout.iter().any(|line| line.seller_id != seller) {
        return Err(ServiceError::ValidationError(
            "Checkout items must all belong to one seller; check out each seller separately"
                .to_string(),
        ));
    }

    Ok(split)
}
