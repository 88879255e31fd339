//! Engine configuration settings and environment variable handling
//!
//! Every threshold the engine uses lives here. Components receive the struct by
//! reference; nothing else hardcodes a rate or a limit.

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    errors::{BotError, BotResult},
    types::Chain,
};

// Bounds applied while loading
pub const MIN_TICK_INTERVAL_MS: u64 = 250;
pub const MAX_CONCURRENT_EXECUTIONS: usize = 16;
pub const MAX_RATE: Decimal = dec!(0.5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    AaveV3,
    BalancerV2,
    UniswapV3,
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aave" | "aave_v3" | "aave-v3" => Ok(ProtocolKind::AaveV3),
            "balancer" | "balancer_v2" | "balancer-v2" => Ok(ProtocolKind::BalancerV2),
            "uniswap" | "uniswap_v3" | "uniswap-v3" => Ok(ProtocolKind::UniswapV3),
            other => Err(format!("unknown flash loan protocol: {other}")),
        }
    }
}

/// One configured flash loan provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub id: String,
    pub protocol: ProtocolKind,
    pub fee_bps: Decimal,
    pub reliability: Decimal,
    pub max_capacity_usd: Decimal,
    pub supported_assets: Vec<String>,
    pub gas_units: u64,
}

impl ProviderSettings {
    pub fn defaults_for(protocol: ProtocolKind) -> Self {
        match protocol {
            ProtocolKind::AaveV3 => Self {
                id: "aave-v3".to_string(),
                protocol,
                fee_bps: dec!(9),
                reliability: dec!(98),
                max_capacity_usd: dec!(5_000_000),
                supported_assets: vec!["USDC".into(), "USDT".into(), "DAI".into(), "WETH".into()],
                gas_units: 420_000,
            },
            ProtocolKind::BalancerV2 => Self {
                id: "balancer-v2".to_string(),
                protocol,
                fee_bps: dec!(0),
                reliability: dec!(95),
                max_capacity_usd: dec!(2_000_000),
                supported_assets: vec!["USDC".into(), "DAI".into(), "WETH".into()],
                gas_units: 380_000,
            },
            ProtocolKind::UniswapV3 => Self {
                id: "uniswap-v3".to_string(),
                protocol,
                fee_bps: dec!(5),
                reliability: dec!(92),
                max_capacity_usd: dec!(1_000_000),
                supported_assets: vec!["USDC".into(), "WETH".into()],
                gas_units: 360_000,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Scanning
    /// Scheduler tick.
    pub tick_interval_ms: u64,
    /// Token ids (contract addresses) to scan.
    pub tokens: Vec<String>,
    /// Quote currency and flash-loan asset.
    pub quote_asset: String,
    pub price_sources: Vec<String>,
    pub dexscreener_base_url: String,
    /// Per-fetch bound for a single source call.
    pub source_timeout_secs: u64,
    /// Quotes older than this are excluded from comparison.
    pub quote_freshness_secs: i64,
    /// Venues shallower than this are ignored.
    pub min_liquidity_usd: Decimal,

    // Detection
    /// Cheap pre-filter applied before the profitability model, in percent.
    pub min_spread_pct: Decimal,
    pub opportunity_ttl_secs: i64,
    pub top_k: usize,
    /// Target borrow size in quote currency.
    pub trade_size_usd: Decimal,
    /// Borrow is capped to this share of the shallower side's liquidity.
    pub max_liquidity_share: Decimal,
    pub allow_cross_chain: bool,
    pub spread_weight: Decimal,
    pub profit_weight: Decimal,

    // Profitability
    /// Minimum net profit as a percent of the borrow.
    pub min_profit_pct: Decimal,
    /// Fraction of gross profit lost to slippage.
    pub slippage_rate: Decimal,
    /// DEX fee per venue as a fraction of gross profit, charged on both legs.
    pub venue_fee_rate: Decimal,
    /// Loan fee assumed while detecting, before a provider is chosen.
    pub estimate_fee_bps: Decimal,
    pub estimate_gas_units: u64,
    pub default_gas_price_gwei: Decimal,
    pub native_token_usd: Decimal,
    pub gas_oracle_timeout_secs: u64,

    // Flash loan providers
    pub execution_chain: Chain,
    pub providers: Vec<ProviderSettings>,
    pub min_provider_reliability: Decimal,
    pub provider_failure_threshold: u32,
    pub provider_probe_interval_secs: u64,
    pub provider_probe_amount: Decimal,
    pub provider_timeout_secs: u64,
    /// Contract that receives the loan and runs both swaps.
    pub receiver_contract: Address,

    // Risk
    pub max_daily_trades: u32,
    pub max_consecutive_failures: u32,
    pub max_borrow_amount: Decimal,
    pub max_daily_loss: Decimal,
    pub blacklisted_assets: Vec<String>,
    pub blacklisted_venues: Vec<String>,
    /// Empty means every venue is trusted.
    pub trusted_venues: Vec<String>,

    // Execution
    pub max_concurrent_executions: usize,
    pub execution_timeout_secs: u64,
    pub enable_trade_execution: bool,
    pub rpc_url: Option<String>,
    pub gas_limit: u64,
    pub simulated_success_rate: f64,
    pub simulated_latency_ms: u64,

    // Output
    pub journal_dir: Option<String>,
    pub log_dir: String,
    pub stats_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            tokens: Vec::new(),
            quote_asset: "USDC".to_string(),
            price_sources: vec!["dexscreener".to_string()],
            dexscreener_base_url: "https://api.dexscreener.com".to_string(),
            source_timeout_secs: 8,
            quote_freshness_secs: 30,
            min_liquidity_usd: dec!(10_000),

            min_spread_pct: dec!(0.3),
            opportunity_ttl_secs: 30,
            top_k: 10,
            trade_size_usd: dec!(10_000),
            max_liquidity_share: dec!(0.02),
            allow_cross_chain: false,
            spread_weight: dec!(0.4),
            profit_weight: dec!(0.6),

            min_profit_pct: dec!(0.1),
            slippage_rate: dec!(0.005),
            venue_fee_rate: dec!(0.003),
            estimate_fee_bps: dec!(9),
            estimate_gas_units: 400_000,
            default_gas_price_gwei: dec!(20),
            native_token_usd: dec!(3000),
            gas_oracle_timeout_secs: 3,

            execution_chain: Chain::Ethereum,
            providers: vec![
                ProviderSettings::defaults_for(ProtocolKind::AaveV3),
                ProviderSettings::defaults_for(ProtocolKind::BalancerV2),
            ],
            min_provider_reliability: dec!(90),
            provider_failure_threshold: 3,
            provider_probe_interval_secs: 30,
            provider_probe_amount: dec!(1_000),
            provider_timeout_secs: 5,
            receiver_contract: Address::ZERO,

            max_daily_trades: 50,
            max_consecutive_failures: 5,
            max_borrow_amount: dec!(100_000),
            max_daily_loss: dec!(1_000),
            blacklisted_assets: Vec::new(),
            blacklisted_venues: Vec::new(),
            trusted_venues: Vec::new(),

            max_concurrent_executions: 3,
            execution_timeout_secs: 30,
            enable_trade_execution: false,
            rpc_url: None,
            gas_limit: 800_000,
            simulated_success_rate: 0.9,
            simulated_latency_ms: 150,

            journal_dir: Some("output/journal".to_string()),
            log_dir: "output/logs".to_string(),
            stats_interval_secs: 60,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(s.trim()).ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|s| parse_list(&s))
}

pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Defaults overlaid with environment variables.
    pub fn load() -> Self {
        let defaults = Self::default();

        let providers = match env_list("FLASH_PROVIDERS") {
            Some(names) => names
                .iter()
                .filter_map(|name| name.parse::<ProtocolKind>().ok())
                .map(ProviderSettings::defaults_for)
                .map(Self::provider_overrides)
                .collect(),
            None => defaults
                .providers
                .iter()
                .cloned()
                .map(Self::provider_overrides)
                .collect(),
        };

        Self {
            tick_interval_ms: env_parse("TICK_INTERVAL_MS")
                .unwrap_or(defaults.tick_interval_ms)
                .max(MIN_TICK_INTERVAL_MS),
            tokens: env_list("TOKENS").unwrap_or(defaults.tokens),
            quote_asset: env::var("QUOTE_ASSET").unwrap_or(defaults.quote_asset),
            price_sources: env_list("PRICE_SOURCES").unwrap_or(defaults.price_sources),
            dexscreener_base_url: env::var("DEXSCREENER_BASE_URL")
                .unwrap_or(defaults.dexscreener_base_url),
            source_timeout_secs: env_parse("SOURCE_TIMEOUT_SECS").unwrap_or(defaults.source_timeout_secs),
            quote_freshness_secs: env_parse("QUOTE_FRESHNESS_SECS")
                .unwrap_or(defaults.quote_freshness_secs),
            min_liquidity_usd: env_decimal("MIN_LIQUIDITY_USD").unwrap_or(defaults.min_liquidity_usd),

            min_spread_pct: env_decimal("MIN_SPREAD_PCT").unwrap_or(defaults.min_spread_pct),
            opportunity_ttl_secs: env_parse("OPPORTUNITY_TTL_SECS")
                .unwrap_or(defaults.opportunity_ttl_secs),
            top_k: env_parse("TOP_K").unwrap_or(defaults.top_k),
            trade_size_usd: env_decimal("TRADE_SIZE_USD").unwrap_or(defaults.trade_size_usd),
            max_liquidity_share: env_decimal("MAX_LIQUIDITY_SHARE")
                .unwrap_or(defaults.max_liquidity_share),
            allow_cross_chain: env_parse("ALLOW_CROSS_CHAIN").unwrap_or(defaults.allow_cross_chain),
            spread_weight: env_decimal("SPREAD_WEIGHT").unwrap_or(defaults.spread_weight),
            profit_weight: env_decimal("PROFIT_WEIGHT").unwrap_or(defaults.profit_weight),

            min_profit_pct: env_decimal("MIN_PROFIT_PCT").unwrap_or(defaults.min_profit_pct),
            slippage_rate: env_decimal("SLIPPAGE_RATE")
                .unwrap_or(defaults.slippage_rate)
                .min(MAX_RATE),
            venue_fee_rate: env_decimal("VENUE_FEE_RATE")
                .unwrap_or(defaults.venue_fee_rate)
                .min(MAX_RATE),
            estimate_fee_bps: env_decimal("ESTIMATE_FEE_BPS").unwrap_or(defaults.estimate_fee_bps),
            estimate_gas_units: env_parse("ESTIMATE_GAS_UNITS").unwrap_or(defaults.estimate_gas_units),
            default_gas_price_gwei: env_decimal("DEFAULT_GAS_PRICE_GWEI")
                .unwrap_or(defaults.default_gas_price_gwei),
            native_token_usd: env_decimal("NATIVE_TOKEN_USD").unwrap_or(defaults.native_token_usd),
            gas_oracle_timeout_secs: env_parse("GAS_ORACLE_TIMEOUT_SECS")
                .unwrap_or(defaults.gas_oracle_timeout_secs),

            execution_chain: env_parse("EXECUTION_CHAIN").unwrap_or(defaults.execution_chain),
            providers,
            min_provider_reliability: env_decimal("MIN_PROVIDER_RELIABILITY")
                .unwrap_or(defaults.min_provider_reliability),
            provider_failure_threshold: env_parse("PROVIDER_FAILURE_THRESHOLD")
                .unwrap_or(defaults.provider_failure_threshold),
            provider_probe_interval_secs: env_parse("PROVIDER_PROBE_INTERVAL_SECS")
                .unwrap_or(defaults.provider_probe_interval_secs),
            provider_probe_amount: env_decimal("PROVIDER_PROBE_AMOUNT")
                .unwrap_or(defaults.provider_probe_amount),
            provider_timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS")
                .unwrap_or(defaults.provider_timeout_secs),
            receiver_contract: env_parse("RECEIVER_CONTRACT").unwrap_or(defaults.receiver_contract),

            max_daily_trades: env_parse("MAX_DAILY_TRADES").unwrap_or(defaults.max_daily_trades),
            max_consecutive_failures: env_parse("MAX_CONSECUTIVE_FAILURES")
                .unwrap_or(defaults.max_consecutive_failures),
            max_borrow_amount: env_decimal("MAX_BORROW_AMOUNT").unwrap_or(defaults.max_borrow_amount),
            max_daily_loss: env_decimal("MAX_DAILY_LOSS").unwrap_or(defaults.max_daily_loss),
            blacklisted_assets: env_list("BLACKLISTED_ASSETS").unwrap_or(defaults.blacklisted_assets),
            blacklisted_venues: env_list("BLACKLISTED_VENUES").unwrap_or(defaults.blacklisted_venues),
            trusted_venues: env_list("TRUSTED_VENUES").unwrap_or(defaults.trusted_venues),

            max_concurrent_executions: env_parse("MAX_CONCURRENT_EXECUTIONS")
                .unwrap_or(defaults.max_concurrent_executions)
                .min(MAX_CONCURRENT_EXECUTIONS),
            execution_timeout_secs: env_parse("EXECUTION_TIMEOUT_SECS")
                .unwrap_or(defaults.execution_timeout_secs),
            enable_trade_execution: env_parse("ENABLE_TRADE_EXECUTION")
                .unwrap_or(defaults.enable_trade_execution),
            rpc_url: env::var("RPC_URL").ok().or(defaults.rpc_url),
            gas_limit: env_parse("GAS_LIMIT").unwrap_or(defaults.gas_limit),
            simulated_success_rate: env_parse("SIMULATED_SUCCESS_RATE")
                .unwrap_or(defaults.simulated_success_rate),
            simulated_latency_ms: env_parse("SIMULATED_LATENCY_MS")
                .unwrap_or(defaults.simulated_latency_ms),

            journal_dir: match env::var("JOURNAL_DIR") {
                Ok(dir) if dir.trim().is_empty() => None,
                Ok(dir) => Some(dir),
                Err(_) => defaults.journal_dir,
            },
            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            stats_interval_secs: env_parse("STATS_INTERVAL_SECS").unwrap_or(defaults.stats_interval_secs),
        }
    }

    fn provider_overrides(mut settings: ProviderSettings) -> ProviderSettings {
        let prefix = settings.id.to_ascii_uppercase().replace('-', "_");
        if let Some(fee) = env_decimal(&format!("{prefix}_FEE_BPS")) {
            settings.fee_bps = fee;
        }
        if let Some(reliability) = env_decimal(&format!("{prefix}_RELIABILITY")) {
            settings.reliability = reliability;
        }
        if let Some(capacity) = env_decimal(&format!("{prefix}_CAPACITY_USD")) {
            settings.max_capacity_usd = capacity;
        }
        if let Some(assets) = env_list(&format!("{prefix}_ASSETS")) {
            settings.supported_assets = assets;
        }
        settings
    }

    /// Startup check. Any error here is fatal and halts before the tick loop.
    pub fn validate(&self) -> BotResult<()> {
        let fail = |msg: String| Err(BotError::Configuration(msg));

        if self.price_sources.is_empty() {
            return fail("no price sources configured".into());
        }
        if self.tokens.is_empty() {
            return fail("no tokens configured".into());
        }
        if self.providers.is_empty() {
            return fail("no flash loan providers configured".into());
        }
        if self.tick_interval_ms == 0 {
            return fail("tick interval must be positive".into());
        }
        if self.max_concurrent_executions == 0 {
            return fail("max_concurrent_executions must be at least 1".into());
        }
        if self.trade_size_usd <= Decimal::ZERO || self.max_borrow_amount <= Decimal::ZERO {
            return fail("trade size and max borrow amount must be positive".into());
        }
        if self.opportunity_ttl_secs <= 0 || self.quote_freshness_secs <= 0 {
            return fail("TTL and freshness windows must be positive".into());
        }
        if self.top_k == 0 {
            return fail("top_k must be at least 1".into());
        }
        for (name, rate) in [
            ("slippage_rate", self.slippage_rate),
            ("venue_fee_rate", self.venue_fee_rate),
            ("max_liquidity_share", self.max_liquidity_share),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return fail(format!("{name} must be within [0, 1], got {rate}"));
            }
        }
        if self.min_spread_pct < Decimal::ZERO {
            return fail("min_spread_pct must not be negative".into());
        }
        if !(0.0..=1.0).contains(&self.simulated_success_rate) {
            return fail("simulated_success_rate must be within [0, 1]".into());
        }
        let mut ids: Vec<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.providers.len() {
            return fail("duplicate flash loan provider ids".into());
        }
        if self.enable_trade_execution {
            if self.rpc_url.is_none() {
                return fail("RPC_URL is required when trade execution is enabled".into());
            }
            if self.receiver_contract == Address::ZERO {
                return fail("RECEIVER_CONTRACT is required when trade execution is enabled".into());
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn gas_oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.gas_oracle_timeout_secs)
    }

    pub fn quote_freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_freshness_secs)
    }

    pub fn opportunity_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.opportunity_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            tokens: vec!["0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".into()],
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_validate_once_tokens_set() {
        assert!(Config::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_price_sources_is_fatal() {
        let config = Config {
            price_sources: vec![],
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("no price sources"));
    }

    #[test]
    fn test_live_execution_requires_rpc_and_receiver() {
        let config = Config {
            enable_trade_execution: true,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            enable_trade_execution: true,
            rpc_url: Some("http://localhost:8545".into()),
            receiver_contract: Address::repeat_byte(0x11),
            ..valid()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let config = Config {
            slippage_rate: dec!(1.5),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_provider_ids_rejected() {
        let mut config = valid();
        config
            .providers
            .push(ProviderSettings::defaults_for(ProtocolKind::AaveV3));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_list_and_protocol_names() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert_eq!("Aave".parse::<ProtocolKind>().unwrap(), ProtocolKind::AaveV3);
        assert_eq!("balancer-v2".parse::<ProtocolKind>().unwrap(), ProtocolKind::BalancerV2);
        assert!("dydx".parse::<ProtocolKind>().is_err());
    }
}
