//! Display and printing utilities

use tracing::{error, info, warn};
use crate::{
    arbitrage::ProfitEvaluation,
    types::{ArbitrageOpportunity, EngineStats, ExecutionRecord, FlashLoanQuote},
};

pub fn print_session_stats(stats: &EngineStats) {
    let counters = &stats.counters;
    let runtime = stats.uptime_secs / 60;

    info!("\n📊 Session Statistics ({} minutes) [{}]", runtime, stats.state);
    info!("   📈 DETECTION:");
    info!("     Ticks: {}", counters.ticks);
    info!("     Opportunities detected: {}", counters.opportunities_detected);
    info!("     Active: {}", stats.active_opportunities);
    info!("     Expired: {}  Invalidated: {}", counters.expired, counters.invalidated);

    info!("   🛡️  GATING:");
    info!("     Risk denied: {}", counters.skipped_risk);
    info!("     Unprofitable after quote: {}", counters.skipped_unprofitable);
    info!("     No provider: {}", counters.skipped_no_provider);
    info!("     Not executable: {}", counters.skipped_not_executable);

    info!("   🚀 EXECUTION:");
    info!("     Dispatched: {}  In flight: {}", counters.dispatched, stats.in_flight);
    info!("     Succeeded: {}  Failed: {}", counters.succeeded, counters.failed);
    info!("     Success rate: {:.1}%",
        if counters.succeeded + counters.failed > 0 {
            counters.succeeded as f64 / (counters.succeeded + counters.failed) as f64 * 100.0
        } else {
            0.0
        }
    );
    info!("     Total profit: ${:.2}", counters.total_profit);
    info!("     Today: {} trades, ${:.2}", stats.risk.daily_trade_count, stats.risk.daily_profit);

    info!("   ⚙️  SYSTEM:");
    info!("     Sources online: {}/{}", stats.health.sources_online, stats.health.sources_total);
    info!("     Providers healthy: {}/{}", stats.health.providers_healthy, stats.health.providers_total);
    info!("     Circuit breaker: {}", if stats.circuit_breaker_open { "OPEN" } else { "CLOSED" });
    if let Some(reason) = &stats.last_failure_reason {
        info!("     Last failure: {}", reason);
    }

    if !stats.error_counts.is_empty() {
        info!("     Error summary:");
        for (error_type, count) in &stats.error_counts {
            info!("       {}: {}", error_type, count);
        }
    }

    info!("");
}

pub fn print_arbitrage_opportunity(opportunity: &ArbitrageOpportunity) {
    info!("\n🎯 ARBITRAGE OPPORTUNITY #{}", opportunity.id);
    info!("📍 Pair: {}", opportunity.token_pair);
    info!("📋 Route: {}", opportunity.direction());
    info!("   Buy:  ${:.4}", opportunity.buy_price);
    info!("   Sell: ${:.4}", opportunity.sell_price);
    info!("   Spread: {:.3}%", opportunity.spread_pct);
    info!("   Est. net profit: ${:.2} on ${:.2}", opportunity.net_profit_estimate, opportunity.borrow_amount);
}

pub fn print_dispatch(
    opportunity: &ArbitrageOpportunity,
    quote: &FlashLoanQuote,
    evaluation: &ProfitEvaluation,
) {
    warn!("\n🚀 DISPATCHING #{}", opportunity.id);
    warn!("📋 {}", opportunity.direction());
    warn!("🏦 Flash loan: {} {} via {}", quote.borrow_amount, quote.asset, quote.provider_id);
    warn!("💰 Profit Analysis:");
    warn!("   Gross:    ${:.2}", evaluation.gross_profit);
    warn!("   Loan fee: ${:.2}", evaluation.loan_fee);
    warn!("   Gas:      ${:.2}", evaluation.gas_cost);
    warn!("   Slippage: ${:.2}", evaluation.slippage_cost);
    warn!("   DEX fees: ${:.2}", evaluation.venue_fees);
    warn!("   Net:      ${:.2} ({:.3}%)", evaluation.net_profit, evaluation.profit_pct);
}

pub fn print_execution_record(record: &ExecutionRecord) {
    if record.is_success() {
        warn!("\n✅ EXECUTION #{}", record.opportunity_id);
        warn!("   Provider: {}", record.provider_id);
        if let Some(tx) = &record.tx_id {
            warn!("   Tx: {}", tx);
        }
        warn!("   Actual profit: ${:.2}", record.actual_profit);
        warn!("   Gas used: {}", record.gas_used);
    } else {
        error!("\n❌ EXECUTION FAILED #{}", record.opportunity_id);
        error!("   Provider: {}", record.provider_id);
        error!("   Error: {}", record.failure_reason.as_deref().unwrap_or("Unknown"));
    }
}
