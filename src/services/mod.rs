pub mod checkout;
pub mod orders;

pub use checkout::CheckoutService;
pub use orders::OrderService;
