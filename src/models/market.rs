use serde::{Deserialize, Serialize};

/// One listed asset from GET /api/market/prices. Optional fields are only
/// present on the detail endpoint for some assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cryptocurrency {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "change24h", default)]
    pub change_24h: f64,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "volume24h")]
    pub volume_24h: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPricesResponse {
    #[serde(default)]
    pub cryptocurrencies: Vec<Cryptocurrency>,
}

/// One sample from GET /api/market/prices/{id}/history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryResponse {
    #[serde(default)]
    pub history: Vec<PricePoint>,
}

/// Window selector for the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Timeframe {
    /// Value the server expects in the `timeframe` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
            Timeframe::Year => "1y",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Timeframe::Day => Timeframe::Week,
            Timeframe::Week => Timeframe::Month,
            Timeframe::Month => Timeframe::Year,
            Timeframe::Year => Timeframe::Day,
        }
    }
}

/// Sort order for the market table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketSortColumn {
    #[default]
    MarketCap,
    Name,
    Price,
    Change,
}

impl MarketSortColumn {
    pub fn next(&self) -> Self {
        match self {
            MarketSortColumn::MarketCap => MarketSortColumn::Name,
            MarketSortColumn::Name => MarketSortColumn::Price,
            MarketSortColumn::Price => MarketSortColumn::Change,
            MarketSortColumn::Change => MarketSortColumn::MarketCap,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketSortColumn::MarketCap => "mkt cap",
            MarketSortColumn::Name => "name",
            MarketSortColumn::Price => "price",
            MarketSortColumn::Change => "24h change",
        }
    }

    /// Sorts in place, descending for numeric columns.
    pub fn sort(&self, assets: &mut [Cryptocurrency]) {
        match self {
            MarketSortColumn::MarketCap => assets.sort_by(|a, b| {
                b.market_cap
                    .unwrap_or(0.0)
                    .partial_cmp(&a.market_cap.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            MarketSortColumn::Name => {
                assets.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }
            MarketSortColumn::Price => assets.sort_by(|a, b| {
                b.price
                    .partial_cmp(&a.price)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            MarketSortColumn::Change => assets.sort_by(|a, b| {
                b.change_24h
                    .partial_cmp(&a.change_24h)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, price: f64, change: f64, cap: Option<f64>) -> Cryptocurrency {
        Cryptocurrency {
            id: id.to_string(),
            name: id.to_uppercase(),
            symbol: id[..3.min(id.len())].to_uppercase(),
            price,
            change_24h: change,
            image_url: None,
            market_cap: cap,
            volume_24h: None,
        }
    }

    #[test]
    fn test_cryptocurrency_parses_wire_shape() {
        let json = r#"{"id":"bitcoin","name":"Bitcoin","symbol":"BTC","price":64250.5,"change24h":-1.2,"imageUrl":"https://img.example/btc.png","marketCap":1260000000000.0,"volume24h":31000000000.0}"#;
        let parsed: Cryptocurrency = serde_json::from_str(json).expect("Failed to parse asset");
        assert_eq!(parsed.symbol, "BTC");
        assert_eq!(parsed.change_24h, -1.2);
        assert_eq!(parsed.market_cap, Some(1_260_000_000_000.0));
    }

    #[test]
    fn test_cryptocurrency_tolerates_missing_optionals() {
        let json = r#"{"id":"newcoin","name":"New Coin","symbol":"NEW"}"#;
        let parsed: Cryptocurrency =
            serde_json::from_str(json).expect("Failed to parse sparse asset");
        assert_eq!(parsed.price, 0.0);
        assert_eq!(parsed.market_cap, None);
    }

    #[test]
    fn test_timeframe_query_values() {
        assert_eq!(Timeframe::Day.as_query(), "day");
        assert_eq!(Timeframe::Year.as_query(), "year");
        assert_eq!(Timeframe::Year.next(), Timeframe::Day);
    }

    #[test]
    fn test_sort_by_change_descending() {
        let mut assets = vec![
            asset("a", 1.0, -3.0, None),
            asset("b", 2.0, 5.0, None),
            asset("c", 3.0, 0.5, None),
        ];
        MarketSortColumn::Change.sort(&mut assets);
        let ids: Vec<&str> = assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_market_cap_treats_missing_as_zero() {
        let mut assets = vec![
            asset("a", 1.0, 0.0, None),
            asset("b", 2.0, 0.0, Some(10.0)),
        ];
        MarketSortColumn::MarketCap.sort(&mut assets);
        assert_eq!(assets[0].id, "b");
    }
}
