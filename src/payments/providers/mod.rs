//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod flutterwave;

pub use flutterwave::FlutterwaveProvider;
