//! Symbol aliases used when a class is priced through another provider's namespace.

/// Futures contract traded for a commodity (`GOLD` -> `GC=F`).
pub fn futures_contract(commodity: &str) -> Option<&'static str> {
    match commodity {
        "GOLD" => Some("GC=F"),
        "SILVER" => Some("SI=F"),
        "PLATINUM" => Some("PL=F"),
        _ => None,
    }
}

/// ISO 4217 metal code for a commodity (`GOLD` -> `XAU`).
pub fn metal_code(commodity: &str) -> Option<&'static str> {
    match commodity {
        "GOLD" => Some("XAU"),
        "SILVER" => Some("XAG"),
        "PLATINUM" => Some("XPT"),
        _ => None,
    }
}

/// Index symbol to the ETF that tracks it.
const INDEX_PROXIES: &[(&str, &str)] = &[
    ("^GSPC", "SPY"),
    ("SPX", "SPY"),
    ("^IXIC", "QQQ"),
    ("NDX", "QQQ"),
    ("^DJI", "DIA"),
    ("DJI", "DIA"),
    ("^RUT", "IWM"),
    ("RUT", "IWM"),
];

/// Tradeable proxy for an index. Unknown indices are priced as-is.
pub fn index_proxy(symbol: &str) -> &str {
    INDEX_PROXIES
        .iter()
        .find(|(index, _)| *index == symbol)
        .map(|(_, proxy)| *proxy)
        .unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commodity_aliases() {
        assert_eq!(futures_contract("GOLD"), Some("GC=F"));
        assert_eq!(futures_contract("SILVER"), Some("SI=F"));
        assert_eq!(metal_code("PLATINUM"), Some("XPT"));
        assert_eq!(metal_code("COPPER"), None);
    }

    #[test]
    fn test_index_proxy() {
        assert_eq!(index_proxy("^GSPC"), "SPY");
        assert_eq!(index_proxy("SPX"), "SPY");
        assert_eq!(index_proxy("^RUT"), "IWM");
        assert_eq!(index_proxy("^FTSE"), "^FTSE");
    }
}
