//! Well-known Solana tokens
//!
//! Only the entries the fallback path needs. Trending data comes from the
//! providers at runtime.

/// Wrapped SOL mint address
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Identity and ticker used for the SOL fallback record
pub const SOL_SYMBOL: &str = "SOL";
