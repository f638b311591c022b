//! Static registry of the chains the dashboard recognizes.
//!
//! No chain client lives here. The registry only resolves display names and
//! block-explorer links for network ids that arrive attached to user-submitted
//! payment claims.

/// Chain id → display name, sorted by chain id.
const CHAINS: &[(u64, &str)] = &[
    (1, "Ethereum"),
    (10, "Optimism"),
    (56, "BNB Chain"),
    (100, "Gnosis Chain"),
    (137, "Polygon"),
    (314, "Filecoin"),
    (324, "zkSync Era"),
    (1101, "Polygon zkEVM"),
    (8453, "Base"),
    (42161, "Arbitrum"),
    (42220, "Celo"),
    (43114, "Avalanche"),
    (11155111, "Sepolia"),
    (534351, "Scroll Sepolia"),
];

/// Chain id → block explorer transaction URL prefix.
const EXPLORERS: &[(u64, &str)] = &[
    (1, "https://etherscan.io/tx/"),
    (10, "https://optimistic.etherscan.io/tx/"),
    (137, "https://polygonscan.com/tx/"),
    (8453, "https://basescan.org/tx/"),
    (42161, "https://arbiscan.io/tx/"),
    (11155111, "https://sepolia.etherscan.io/tx/"),
];

/// Human-readable chain name; unknown ids render as "Unknown Chain".
pub fn chain_name(chain_id: u64) -> &'static str {
    CHAINS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown Chain")
}

/// Block-explorer URL for a transaction hash on the given chain.
///
/// Falls back to Etherscan for chains without a registered explorer.
pub fn explorer_url(chain_id: u64, hash: &str) -> String {
    let base = EXPLORERS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, url)| *url)
        .unwrap_or("https://etherscan.io/tx/");
    format!("{base}{hash}")
}

/// Syntactic check for an EVM account address (`0x` + 40 hex chars).
pub fn is_address(s: &str) -> bool {
    is_hex_with_prefix(s, 40)
}

/// Syntactic check for an EVM transaction hash (`0x` + 64 hex chars).
pub fn is_tx_hash(s: &str) -> bool {
    is_hex_with_prefix(s, 64)
}

fn is_hex_with_prefix(s: &str, hex_len: usize) -> bool {
    match s.strip_prefix("0x") {
        Some(rest) => rest.len() == hex_len && rest.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
