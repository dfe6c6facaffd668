use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset type as recorded on a portfolio holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Etf,
    MutualFund,
    Crypto,
    Gold,
    Silver,
    Platinum,
    Index,
    Bond,
    RealEstate,
    FixedDeposit,
    Cash,
    Other,
}

impl AssetType {
    /// The pricing class this asset type resolves through.
    pub fn class(&self) -> AssetClass {
        match self {
            AssetType::Stock | AssetType::Etf | AssetType::MutualFund => AssetClass::Equity,
            AssetType::Crypto => AssetClass::Crypto,
            AssetType::Gold | AssetType::Silver | AssetType::Platinum => AssetClass::Commodity,
            AssetType::Index => AssetClass::Index,
            AssetType::Bond
            | AssetType::RealEstate
            | AssetType::FixedDeposit
            | AssetType::Cash
            | AssetType::Other => AssetClass::Manual,
        }
    }

    /// Commodity name used as the class-level cache symbol.
    pub fn commodity_name(&self) -> Option<&'static str> {
        match self {
            AssetType::Gold => Some("GOLD"),
            AssetType::Silver => Some("SILVER"),
            AssetType::Platinum => Some("PLATINUM"),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Etf => "etf",
            AssetType::MutualFund => "mutual_fund",
            AssetType::Crypto => "crypto",
            AssetType::Gold => "gold",
            AssetType::Silver => "silver",
            AssetType::Platinum => "platinum",
            AssetType::Index => "index",
            AssetType::Bond => "bond",
            AssetType::RealEstate => "real_estate",
            AssetType::FixedDeposit => "fixed_deposit",
            AssetType::Cash => "cash",
            AssetType::Other => "other",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let asset_type = match normalized.as_str() {
            "stock" => AssetType::Stock,
            "etf" => AssetType::Etf,
            "mutual_fund" => AssetType::MutualFund,
            "crypto" => AssetType::Crypto,
            "gold" => AssetType::Gold,
            "silver" => AssetType::Silver,
            "platinum" => AssetType::Platinum,
            "index" => AssetType::Index,
            "bond" => AssetType::Bond,
            "real_estate" => AssetType::RealEstate,
            "fixed_deposit" => AssetType::FixedDeposit,
            "cash" => AssetType::Cash,
            "other" => AssetType::Other,
            _ => return Err(format!("unknown asset type: {s}")),
        };
        Ok(asset_type)
    }
}

/// Pricing class: selects the provider chain and cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Crypto,
    Commodity,
    Index,
    /// Priced by the user; never looked up.
    Manual,
}

impl AssetClass {
    /// Classes priced per symbol (as opposed to once per class).
    pub fn is_per_symbol(&self) -> bool {
        matches!(self, AssetClass::Equity | AssetClass::Crypto | AssetClass::Index)
    }

    fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Crypto => "crypto",
            AssetClass::Commodity => "commodity",
            AssetClass::Index => "index",
            AssetClass::Manual => "manual",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equity" => Ok(AssetClass::Equity),
            "crypto" => Ok(AssetClass::Crypto),
            "commodity" => Ok(AssetClass::Commodity),
            "index" => Ok(AssetClass::Index),
            "manual" => Ok(AssetClass::Manual),
            _ => Err(format!("unknown asset class: {s}")),
        }
    }
}

/// Cache and dedup key: a pricing class plus a normalized symbol.
///
/// Commodities are keyed by class-level name (`commodity:GOLD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub class: AssetClass,
    pub symbol: String,
}

impl CacheKey {
    pub fn new(class: AssetClass, symbol: impl AsRef<str>) -> Self {
        Self {
            class,
            symbol: normalize_symbol(symbol.as_ref()),
        }
    }

    /// Key for a holding, or `None` when the asset cannot be priced live
    /// (manual types, or a per-symbol type without a symbol).
    pub fn for_asset(asset_type: AssetType, symbol: Option<&str>) -> Option<Self> {
        let class = asset_type.class();
        match class {
            AssetClass::Manual => None,
            AssetClass::Commodity => asset_type.commodity_name().map(|name| Self::new(class, name)),
            _ => symbol
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Self::new(class, s)),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.symbol)
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, symbol) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed cache key: {s}"))?;
        if symbol.is_empty() {
            return Err(format!("malformed cache key: {s}"));
        }
        Ok(Self::new(class.parse()?, symbol))
    }
}

/// Upper-case and trim a user-supplied symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// The minimal holding shape the batch pricer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRef {
    pub id: String,
    pub asset_type: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl HoldingRef {
    pub fn new(id: impl Into<String>, asset_type: AssetType, symbol: Option<&str>) -> Self {
        Self {
            id: id.into(),
            asset_type,
            symbol: symbol.map(str::to_string),
        }
    }

    pub fn cache_key(&self) -> Option<CacheKey> {
        CacheKey::for_asset(self.asset_type, self.symbol.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_classes() {
        assert_eq!(AssetType::Etf.class(), AssetClass::Equity);
        assert_eq!(AssetType::MutualFund.class(), AssetClass::Equity);
        assert_eq!(AssetType::Silver.class(), AssetClass::Commodity);
        assert_eq!(AssetType::FixedDeposit.class(), AssetClass::Manual);
    }

    #[test]
    fn test_asset_type_parsing() {
        assert_eq!("real-estate".parse::<AssetType>(), Ok(AssetType::RealEstate));
        assert_eq!("Crypto".parse::<AssetType>(), Ok(AssetType::Crypto));
        assert!("warrant".parse::<AssetType>().is_err());
    }

    #[test]
    fn test_cache_key_for_manual_asset_is_none() {
        assert!(CacheKey::for_asset(AssetType::Cash, Some("USD")).is_none());
        assert!(CacheKey::for_asset(AssetType::Stock, None).is_none());
        assert!(CacheKey::for_asset(AssetType::Stock, Some("  ")).is_none());
    }

    #[test]
    fn test_commodity_key_ignores_symbol() {
        let key = CacheKey::for_asset(AssetType::Gold, Some("whatever")).unwrap();
        assert_eq!(key.to_string(), "commodity:GOLD");
    }

    #[test]
    fn test_cache_key_round_trip() {
        let key = CacheKey::for_asset(AssetType::Crypto, Some(" btc ")).unwrap();
        assert_eq!(key.to_string(), "crypto:BTC");
        assert_eq!("crypto:BTC".parse::<CacheKey>(), Ok(key));
        assert!("crypto".parse::<CacheKey>().is_err());
    }

    #[test]
    fn test_holding_ref_deserialization() {
        let json = r#"{"id":"h1","assetType":"stock","symbol":"AAPL"}"#;
        let holding: HoldingRef = serde_json::from_str(json).unwrap();
        assert_eq!(holding.asset_type, AssetType::Stock);
        assert_eq!(holding.cache_key().unwrap().to_string(), "equity:AAPL");

        let json = r#"{"id":"h2","assetType":"gold"}"#;
        let holding: HoldingRef = serde_json::from_str(json).unwrap();
        assert!(holding.symbol.is_none());
    }
}
