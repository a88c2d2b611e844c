//! Push-device registration against the exchange.

pub mod registration;

pub use registration::DeviceRegistrar;
