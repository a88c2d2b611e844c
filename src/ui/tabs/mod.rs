//! One module per top-level tab.

pub mod account;
pub mod market;
