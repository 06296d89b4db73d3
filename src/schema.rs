use serde::Deserialize;

// ------------------------------------------------------------
// Wallet record
// ------------------------------------------------------------
//
// One entry of the upstream wallet balances document:
//
//     [{"AssetId":"BTC","Balance":1.5,"Reserved":0.25}, ...]
//
// Records live for a single scrape cycle only. They are never
// cached or merged across cycles.
//
// NOTES:
// - Field names follow the upstream PascalCase spelling,
//   camelCase is accepted as an alias.
// - All three fields are required. Unknown fields are ignored.
//
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalletRecord {
    /// Asset identifier, exported as the `asset` label
    #[serde(rename = "AssetId", alias = "assetId")]
    pub asset_id: String,

    /// Total balance held for the asset
    #[serde(rename = "Balance", alias = "balance")]
    pub balance: f64,

    /// Part of the balance reserved by open operations
    #[serde(rename = "Reserved", alias = "reserved")]
    pub reserved: f64,
}

/// Records of one response body, in upstream order.
///
/// Duplicate asset identifiers are kept as they are.
pub type ScrapeResult = Vec<WalletRecord>;

/// Parses an upstream response body.
///
/// Anything other than a JSON array of wallet objects (including
/// `null`) is rejected.
pub fn parse_wallets(body: &[u8]) -> Result<ScrapeResult, serde_json::Error> {
    serde_json::from_slice(body)
}
