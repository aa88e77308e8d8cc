/// Upstream provider identifiers.
pub mod providers {
    pub const COINGECKO: &str = "COINGECKO";
    pub const BLOCKCHAIN: &str = "BLOCKCHAIN";
    pub const MEMPOOL: &str = "MEMPOOL";
    pub const ALTERNATIVE_ME: &str = "ALTERNATIVE_ME";
    pub const YAHOO: &str = "YAHOO";
    pub const FRED: &str = "FRED";
    pub const GECKOTERMINAL: &str = "GECKOTERMINAL";
    pub const OPENSEA: &str = "OPENSEA";

    /// Every provider, in configuration order.
    pub const ALL: [&str; 8] = [
        COINGECKO,
        BLOCKCHAIN,
        MEMPOOL,
        ALTERNATIVE_ME,
        YAHOO,
        FRED,
        GECKOTERMINAL,
        OPENSEA,
    ];
}
