use std::str::FromStr;

use crate::models::{DAppCategory, DAppListing};

const fn listing(
    name: &'static str,
    category: DAppCategory,
    description: &'static str,
    url: &'static str,
) -> DAppListing {
    DAppListing {
        name,
        category,
        description,
        url,
        verified: true,
    }
}

/// Verified applications, grouped by category and alphabetical within each.
pub const DAPPS: &[DAppListing] = &[
    listing(
        "Omni Hub",
        DAppCategory::Nft,
        "NFT marketplace and management platform on ARC Testnet.",
        "https://omnihub.xyz/create/arc-testnet",
    ),
    listing(
        "Curve Finance",
        DAppCategory::Dex,
        "DEX USDC/WUSDC with deep liquidity pools.",
        "https://curve.fi",
    ),
    listing(
        "Defionarc",
        DAppCategory::Dex,
        "Decentralized exchange on ARC Testnet.",
        "https://www.arcflow.finance/",
    ),
    listing(
        "Synthra",
        DAppCategory::Dex,
        "A CEX-like DEX experience. Smooth swap, clear LP insight.",
        "https://app.synthra.org",
    ),
    listing(
        "Superbridge",
        DAppCategory::Bridge,
        "Bridge to transfer ETH Sepolia to ARC Testnet.",
        "https://superbridge.app",
    ),
    listing(
        "InfinityName",
        DAppCategory::Domain,
        "Register custom domain on ARC Testnet with AI integration.",
        "https://infinityname.com",
    ),
    listing(
        "ZNS",
        DAppCategory::Domain,
        "Experience true digital ownership with domain.",
        "https://infinityname.com",
    ),
    listing(
        "zkCodex",
        DAppCategory::Deploy,
        "Deploy NFT collection on ARC Testnet.",
        "https://zkcodex.com",
    ),
    listing(
        "Gateway",
        DAppCategory::Wallet,
        "Instant cross-chain access to USDC with one unified balance.",
        "https://www.circle.com/pt-br/gateway",
    ),
    listing(
        "zkCodex",
        DAppCategory::Wallet,
        "Wallet and development tools for ARC Testnet.",
        "https://zkcodex.com",
    ),
    listing(
        "Circle Testnet Faucet",
        DAppCategory::Faucet,
        "Send testnet USDC and EURC to your wallet to experiment.",
        "https://faucet.circle.com",
    ),
    listing(
        "Easy Faucet Arc",
        DAppCategory::Faucet,
        "Get up to 100 USDC (testnet) to develop on the ARC Network. The official faucet only provides 1 USDC per hour.",
        "https://easyfaucetarc.xyz",
    ),
];

/// Listings in catalog order, optionally restricted to one category.
pub fn catalog(category: Option<DAppCategory>) -> Vec<DAppListing> {
    DAPPS
        .iter()
        .filter(|d| category.map_or(true, |c| d.category == c))
        .cloned()
        .collect()
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unknown DApp category {0:?}")]
pub struct UnknownCategory(pub String);

impl DAppCategory {
    pub const ALL: [DAppCategory; 7] = [
        DAppCategory::Nft,
        DAppCategory::Dex,
        DAppCategory::Bridge,
        DAppCategory::Domain,
        DAppCategory::Deploy,
        DAppCategory::Wallet,
        DAppCategory::Faucet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DAppCategory::Nft => "NFT",
            DAppCategory::Dex => "DEX",
            DAppCategory::Bridge => "Bridge",
            DAppCategory::Domain => "Domain",
            DAppCategory::Deploy => "Deploy",
            DAppCategory::Wallet => "Wallet",
            DAppCategory::Faucet => "Faucet",
        }
    }
}

impl FromStr for DAppCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DAppCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_verified_listings() {
        let all = catalog(None);
        assert_eq!(all.len(), 12);
        assert!(all.iter().all(|d| d.verified));
        assert_eq!(all[0].name, "Omni Hub");
    }

    #[test]
    fn filters_by_category() {
        let dexes: Vec<&str> = catalog(Some(DAppCategory::Dex)).iter().map(|d| d.name).collect();
        assert_eq!(dexes, vec!["Curve Finance", "Defionarc", "Synthra"]);
        assert_eq!(catalog(Some(DAppCategory::Faucet)).len(), 2);
        assert_eq!(catalog(Some(DAppCategory::Bridge)).len(), 1);
    }

    #[test]
    fn category_names_parse_case_insensitively() {
        assert_eq!("nft".parse::<DAppCategory>(), Ok(DAppCategory::Nft));
        assert_eq!(" Wallet ".parse::<DAppCategory>(), Ok(DAppCategory::Wallet));
        assert!("Gaming".parse::<DAppCategory>().is_err());
    }
}
