//! Well-known asset and flash loan pool addresses per chain

use alloy::primitives::{Address, address};
use super::Chain;

#[derive(Debug, Clone, Copy)]
pub struct AssetInfo {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u32,
}

// (chain, symbol, address, decimals)
const ASSETS: &[(Chain, &str, Address, u32)] = &[
    (Chain::Ethereum, "USDC", address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"), 6),
    (Chain::Ethereum, "USDT", address!("dac17f958d2ee523a2206206994597c13d831ec7"), 6),
    (Chain::Ethereum, "DAI", address!("6b175474e89094c44da98b954eedeac495271d0f"), 18),
    (Chain::Ethereum, "WETH", address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"), 18),
    (Chain::Arbitrum, "USDC", address!("af88d065e77c8cc2239327c5edb3a432268e5831"), 6),
    (Chain::Arbitrum, "WETH", address!("82af49447d8a07e3bd95bd0d56f35241523fbab1"), 18),
    (Chain::Base, "USDC", address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"), 6),
    (Chain::Base, "WETH", address!("4200000000000000000000000000000000000006"), 18),
    (Chain::Polygon, "USDC", address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359"), 6),
    (Chain::Polygon, "WETH", address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619"), 18),
    (Chain::Optimism, "USDC", address!("0b2c639c533813f4aa9d7837caf62653d097ff85"), 6),
    (Chain::Optimism, "WETH", address!("4200000000000000000000000000000000000006"), 18),
];

pub fn asset_info(chain: Chain, symbol: &str) -> Option<AssetInfo> {
    ASSETS
        .iter()
        .find(|(c, s, _, _)| *c == chain && s.eq_ignore_ascii_case(symbol))
        .map(|(_, s, address, decimals)| AssetInfo {
            symbol: *s,
            address: *address,
            decimals: *decimals,
        })
}

// Balancer V2 Vault shares one address across deployments
pub const BALANCER_VAULT: Address = address!("ba12222222228d8ba445958a75a0704d566bf2c8");

pub fn aave_v3_pool(chain: Chain) -> Option<Address> {
    match chain {
        Chain::Ethereum => Some(address!("87870bca3f3fd6335c3f4ce8392d69350b4fa4e2")),
        Chain::Arbitrum | Chain::Optimism | Chain::Polygon => {
            Some(address!("794a61358d6845594f94dc1db02a252b5b4814ad"))
        }
        Chain::Base => Some(address!("a238dd80c259a72e81d7e4664a9801593f98d1c5")),
        Chain::Bsc => None,
    }
}

/// USDC/WETH 0.05% pool, USDC is token0.
pub const UNISWAP_V3_USDC_WETH_ETHEREUM: Address = address!("88e6a0c2ddd26feeb64f039a2c41296fcb3f5640");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_lookup_is_case_insensitive() {
        let usdc = asset_info(Chain::Base, "usdc").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert_eq!(usdc.symbol, "USDC");
        assert!(asset_info(Chain::Bsc, "USDC").is_none());
    }
}
