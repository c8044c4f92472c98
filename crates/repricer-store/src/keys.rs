//! Key layout shared with external consumers.
//!
//! Admin UIs and the data populator address these keys directly; the exact
//! spellings are a contract.

/// Hash key holding every listing for one ASIN.
pub fn listing_key(asin: &str) -> String {
    format!("ASIN_{asin}")
}

/// Field within the ASIN hash addressing one seller's listing.
pub fn listing_field(seller_id: &str, sku: &str) -> String {
    format!("{seller_id}:{sku}")
}

/// Split an ASIN-hash field back into (seller_id, sku).
pub fn split_listing_field(field: &str) -> Option<(&str, &str)> {
    field.split_once(':')
}

/// Hash key holding one strategy's flat scalar fields.
pub fn strategy_key(strategy_id: &str) -> String {
    format!("strategy.{strategy_id}")
}

/// Hash key holding all calculated prices for one seller, keyed by SKU.
pub fn calculated_key(seller_id: &str) -> String {
    format!("CALCULATED_PRICES:{seller_id}")
}
