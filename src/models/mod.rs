//! Wire and domain types shared across the app.

mod device;
mod market;
mod user;

pub use device::{DeviceRegisterResponse, DeviceRegistration, DeviceTokenUpdate};
pub use market::{
    Cryptocurrency, MarketPricesResponse, MarketSortColumn, PriceHistoryResponse, PricePoint,
    Timeframe,
};
pub use user::{AuthEnvelope, ProfileResponse, User, UserPreferences};
