//! Tick-driven execution state machine
//!
//! Each tick refreshes prices, detects and merges opportunities, then walks the
//! active set in priority order: re-validate, risk gate, provider selection,
//! dispatch. Executions run as spawned tasks bounded by a semaphore; their
//! outcomes flow back through [`ExecutionOrchestrator::apply_outcome`].
//!
//! Lock order when nesting: state, then risk, then book.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use crate::{
    arbitrage::{OpportunityBook, OpportunityDetector, ProfitEvaluation},
    config::Config,
    errors::{BotError, BotResult, ErrorRecovery},
    execution::TradeExecutor,
    flash_loan::{traded_token, FlashLoanProvider, ProviderRegistry},
    network::GasOracle,
    prices::{PriceAggregator, PriceSource},
    risk::RiskManager,
    storage::{journal_execution, save_opportunity, ExecutionLog},
    types::{
        ArbitrageOpportunity, DenyReason, EngineState, EngineStats, ExecutionCounters,
        ExecutionParams, ExecutionRecord, ExecutionReport, FlashLoanQuote, GasSnapshot,
        PriceQuote, RiskDecision,
    },
    utils::{print_arbitrage_opportunity, print_dispatch, print_execution_record, run_health_check},
    validation::{revalidate, InvalidReason, Revalidation},
};

type Selected = (Arc<dyn FlashLoanProvider>, FlashLoanQuote, ProfitEvaluation, ExecutionParams);

/// External collaborators the engine is built from.
pub struct EngineDeps {
    pub sources: Vec<Arc<dyn PriceSource>>,
    pub providers: Vec<Arc<dyn FlashLoanProvider>>,
    pub executor: Arc<dyn TradeExecutor>,
    pub gas_oracle: Arc<dyn GasOracle>,
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched { provider_id: String },
    Invalidated(InvalidReason),
    RiskDenied(DenyReason),
    /// The route cannot be carried out as a single flash loan.
    NotExecutable(String),
    Unprofitable,
    NoProvider,
    AtCapacity,
    NotRunning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub quotes: usize,
    pub detected: usize,
    pub active: usize,
    pub dispatched: usize,
}

/// Dry-run result. Building one never touches risk state or the active set.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub opportunity: ArbitrageOpportunity,
    pub invalid_reason: Option<String>,
    pub risk: RiskDecision,
    pub provider_id: Option<String>,
    pub loan_quote: Option<FlashLoanQuote>,
    pub evaluation: Option<ProfitEvaluation>,
    pub execution: Option<ExecutionReport>,
    pub would_execute: bool,
    pub notes: Vec<String>,
}

struct Inner {
    config: Config,
    aggregator: PriceAggregator,
    detector: OpportunityDetector,
    registry: ProviderRegistry,
    executor: Arc<dyn TradeExecutor>,
    gas_oracle: Arc<dyn GasOracle>,
    state: RwLock<EngineState>,
    book: RwLock<OpportunityBook>,
    risk: RwLock<RiskManager>,
    counters: RwLock<ExecutionCounters>,
    recovery: RwLock<ErrorRecovery>,
    latest_quotes: RwLock<HashMap<String, Vec<PriceQuote>>>,
    permits: Arc<Semaphore>,
    tick_lock: Mutex<()>,
    shutdown: watch::Sender<bool>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    executions: Mutex<Vec<JoinHandle<()>>>,
    journal_dir: Option<PathBuf>,
    started_at: Instant,
}

/// Cheap to clone; every clone drives the same engine.
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    inner: Arc<Inner>,
}

impl ExecutionOrchestrator {
    pub fn new(config: Config, deps: EngineDeps) -> BotResult<Self> {
        config.validate()?;

        let journal_dir = config.journal_dir.as_ref().map(PathBuf::from);
        let (shutdown, _) = watch::channel(false);

        let inner = Inner {
            aggregator: PriceAggregator::new(deps.sources, &config),
            detector: OpportunityDetector::new(&config),
            registry: ProviderRegistry::new(deps.providers, &config),
            executor: deps.executor,
            gas_oracle: deps.gas_oracle,
            state: RwLock::new(EngineState::Idle),
            book: RwLock::new(OpportunityBook::new(config.top_k)),
            risk: RwLock::new(RiskManager::new(&config, ExecutionLog::in_memory(), Utc::now())),
            counters: RwLock::new(ExecutionCounters::default()),
            recovery: RwLock::new(ErrorRecovery::new()),
            latest_quotes: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            tick_lock: Mutex::new(()),
            shutdown,
            timers: Mutex::new(Vec::new()),
            executions: Mutex::new(Vec::new()),
            journal_dir,
            started_at: Instant::now(),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub async fn state(&self) -> EngineState {
        *self.inner.state.read().await
    }

    async fn transition(&self, to: EngineState) -> BotResult<()> {
        let mut state = self.inner.state.write().await;
        if *state == to {
            return Ok(());
        }
        if !state.can_transition_to(to) {
            return Err(BotError::InvalidStateTransition {
                from: state.to_string(),
                to: to.to_string(),
            });
        }
        debug!("State transition {} -> {}", *state, to);
        *state = to;
        Ok(())
    }

    // ---- lifecycle ---------------------------------------------------------

    /// Idle -> Scanning and spawn the tick loop and the provider probe.
    pub async fn start(&self) -> BotResult<()> {
        self.transition(EngineState::Scanning).await?;
        info!(
            "🚀 Engine started: tick={}ms, tokens={}, sources={}, providers={}, executor={}",
            self.inner.config.tick_interval_ms,
            self.inner.config.tokens.len(),
            self.inner.aggregator.source_count(),
            self.inner.registry.len(),
            self.inner.executor.name()
        );

        let tick_loop = {
            let this = self.clone();
            let mut shutdown = self.inner.shutdown.subscribe();
            let period = self.inner.config.tick_interval();
            tokio::spawn(async move {
                let mut interval = interval_at(tokio::time::Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = this.tick_once().await {
                                debug!("Tick ended early: {}", e);
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let probe_loop = {
            let this = self.clone();
            let mut shutdown = self.inner.shutdown.subscribe();
            let period = std::time::Duration::from_secs(self.inner.config.provider_probe_interval_secs.max(1));
            tokio::spawn(async move {
                let mut interval = interval_at(tokio::time::Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let gas = this.gas_snapshot().await;
                            let healthy = this.inner.registry.probe_all(&gas, Utc::now()).await;
                            debug!(healthy, total = this.inner.registry.len(), "Provider probe");
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        self.inner.timers.lock().await.extend([tick_loop, probe_loop]);
        Ok(())
    }

    pub async fn pause(&self) -> BotResult<()> {
        self.transition(EngineState::Paused).await?;
        info!("⏸️  Engine paused, monitoring continues without dispatch");
        Ok(())
    }

    pub async fn resume(&self) -> BotResult<()> {
        let current = self.state().await;
        if current != EngineState::Paused {
            return Err(BotError::InvalidStateTransition {
                from: current.to_string(),
                to: EngineState::Scanning.to_string(),
            });
        }
        self.transition(EngineState::Scanning).await?;
        info!("▶️  Engine resumed");
        Ok(())
    }

    /// Graceful: stop the timers, then let in-flight executions finish.
    pub async fn stop(&self) -> BotResult<()> {
        self.transition(EngineState::Stopped).await?;
        self.inner.shutdown.send_replace(true);

        let timers: Vec<_> = self.inner.timers.lock().await.drain(..).collect();
        for handle in timers {
            if let Err(e) = handle.await {
                warn!("Timer task ended abnormally: {}", e);
            }
        }
        self.wait_for_in_flight().await;
        info!("🛑 Engine stopped");
        Ok(())
    }

    /// Abort the tick loop immediately. In-flight executions run to completion or timeout.
    pub async fn emergency_stop(&self, reason: &str) -> BotResult<()> {
        self.transition(EngineState::Stopped).await?;
        self.inner.shutdown.send_replace(true);
        for handle in self.inner.timers.lock().await.drain(..) {
            handle.abort();
        }
        error!("🚨 EMERGENCY STOP: {}", reason);
        Ok(())
    }

    pub async fn wait_for_in_flight(&self) {
        let handles: Vec<_> = self.inner.executions.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Execution task ended abnormally: {}", e);
            }
        }
    }

    // ---- tick --------------------------------------------------------------

    async fn gas_snapshot(&self) -> GasSnapshot {
        let config = &self.inner.config;
        let fetched = tokio::time::timeout(
            config.gas_oracle_timeout(),
            self.inner.gas_oracle.current_gas_price(config.execution_chain),
        )
        .await
        .unwrap_or_else(|_| Err(BotError::timeout("fetch gas price", config.gas_oracle_timeout())));

        let gas_price_gwei = match fetched {
            Ok(gwei) => gwei,
            Err(e) => {
                warn!("⚠️ Gas oracle unavailable, using default: {}", e);
                self.inner.recovery.write().await.handle_error(&e);
                config.default_gas_price_gwei
            }
        };

        GasSnapshot {
            gas_price_gwei,
            native_token_usd: config.native_token_usd,
        }
    }

    /// One scheduler tick. Serialized with every other tick.
    pub async fn tick_once(&self) -> BotResult<TickSummary> {
        let _tick = self.inner.tick_lock.lock().await;

        match self.state().await {
            EngineState::Idle => {
                return Err(BotError::InvalidStateTransition {
                    from: EngineState::Idle.to_string(),
                    to: EngineState::Scanning.to_string(),
                })
            }
            EngineState::Stopped => return Ok(TickSummary::default()),
            _ => {}
        }

        let now = Utc::now();
        let gas = self.gas_snapshot().await;
        let refresh = self.inner.aggregator.refresh(&self.inner.config.tokens, now).await;
        if !refresh.errors.is_empty() {
            let mut recovery = self.inner.recovery.write().await;
            for e in &refresh.errors {
                recovery.handle_error(e);
            }
        }

        let detected = self.inner.detector.detect(&refresh.quotes, &gas, now);
        let detected_count = detected.len();
        let merge = self.inner.book.write().await.merge(detected, now);
        if merge.added > 0 {
            // entries added this tick carry this tick's timestamp
            for opportunity in self.inner.book.read().await.live(now).iter().filter(|o| o.discovered_at == now) {
                print_arbitrage_opportunity(opportunity);
            }
        }
        *self.inner.latest_quotes.write().await = refresh.quotes.clone();

        let mut summary = TickSummary {
            quotes: refresh.quote_count(),
            detected: detected_count,
            ..Default::default()
        };
        {
            let mut counters = self.inner.counters.write().await;
            counters.ticks += 1;
            counters.opportunities_detected += merge.added as u64;
            counters.expired += merge.expired as u64;
        }

        if self.state().await == EngineState::Paused {
            summary.active = self.inner.book.read().await.len();
            return Ok(summary);
        }

        let candidates = self.inner.book.read().await.live(now);
        for candidate in candidates {
            if self.inner.permits.available_permits() == 0 {
                debug!("Execution cap reached, remaining candidates wait");
                break;
            }

            match self.process(&candidate.id, &gas, &refresh.quotes, now).await {
                Ok(DispatchOutcome::Dispatched { .. }) => summary.dispatched += 1,
                Ok(DispatchOutcome::NotRunning) => break,
                Ok(_) => {}
                Err(BotError::InvalidStateTransition { .. }) => break,
                Err(e) => {
                    self.inner.recovery.write().await.handle_error(&e);
                }
            }
        }

        if matches!(self.state().await, EngineState::Validating | EngineState::Executing) {
            self.transition(EngineState::Scanning).await?;
        }
        summary.active = self.inner.book.read().await.len();
        Ok(summary)
    }

    /// Manual dispatch of one active opportunity against the latest quotes.
    pub async fn execute_opportunity(&self, id: &str) -> BotResult<DispatchOutcome> {
        let gas = self.gas_snapshot().await;
        let quotes = self.inner.latest_quotes.read().await.clone();
        let outcome = self.process(id, &gas, &quotes, Utc::now()).await;

        if matches!(self.state().await, EngineState::Validating | EngineState::Executing) {
            self.transition(EngineState::Scanning).await?;
        }
        outcome
    }

    async fn process(
        &self,
        id: &str,
        gas: &GasSnapshot,
        quotes: &HashMap<String, Vec<PriceQuote>>,
        now: DateTime<Utc>,
    ) -> BotResult<DispatchOutcome> {
        let inner = &self.inner;
        let mut opportunity = inner.book.read().await.get(id, now)?;
        if let Some(reason) = not_executable(&opportunity) {
            inner.counters.write().await.skipped_not_executable += 1;
            debug!(opportunity_id = id, %reason, "Opportunity cannot be dispatched");
            return Ok(DispatchOutcome::NotExecutable(reason));
        }

        self.transition(EngineState::Validating).await?;
        match revalidate(&opportunity, quotes, &inner.detector, gas, now) {
            Revalidation::Invalid(reason) => {
                inner.book.write().await.invalidate(id);
                let mut counters = inner.counters.write().await;
                if reason == InvalidReason::Expired {
                    counters.expired += 1;
                } else {
                    counters.invalidated += 1;
                }
                debug!(opportunity_id = id, %reason, "Opportunity discarded on re-validation");
                return Ok(DispatchOutcome::Invalidated(reason));
            }
            Revalidation::Valid {
                buy_price,
                sell_price,
                spread_pct,
                evaluation,
            } => {
                opportunity.buy_price = buy_price;
                opportunity.sell_price = sell_price;
                opportunity.spread_pct = spread_pct;
                opportunity.gross_profit_estimate = evaluation.gross_profit;
                opportunity.net_profit_estimate = evaluation.net_profit;
            }
        }

        self.transition(EngineState::Executing).await?;
        if let RiskDecision::Deny(reason) = inner.risk.write().await.gate(&opportunity, opportunity.borrow_amount, now) {
            inner.counters.write().await.skipped_risk += 1;
            return Ok(DispatchOutcome::RiskDenied(reason));
        }

        let Ok(permit) = Arc::clone(&inner.permits).try_acquire_owned() else {
            return Ok(DispatchOutcome::AtCapacity);
        };

        let (provider, quote, evaluation, params) = match self.select_provider(&opportunity, gas, now).await {
            Ok(selected) => selected,
            Err(skipped) => return Ok(skipped),
        };

        // final gate and removal happen together so concurrent dispatchers cannot both pass
        let taken = {
            let state = inner.state.read().await;
            if matches!(*state, EngineState::Paused | EngineState::Stopped) {
                return Ok(DispatchOutcome::NotRunning);
            }
            let mut risk = inner.risk.write().await;
            if let RiskDecision::Deny(reason) = risk.gate(&opportunity, opportunity.borrow_amount, now) {
                drop(risk);
                drop(state);
                inner.counters.write().await.skipped_risk += 1;
                return Ok(DispatchOutcome::RiskDenied(reason));
            }
            let taken = inner.book.write().await.take(id, now)?;
            risk.note_dispatched();
            taken
        };
        opportunity.id = taken.id;

        inner.counters.write().await.dispatched += 1;
        print_dispatch(&opportunity, &quote, &evaluation);
        if let Some(dir) = &inner.journal_dir {
            if let Err(e) = save_opportunity(dir, &opportunity) {
                warn!("⚠️ Failed to save opportunity {}: {:#}", opportunity.id, e);
            }
        }

        self.spawn_execution(params, permit).await;
        Ok(DispatchOutcome::Dispatched {
            provider_id: provider.id().to_string(),
        })
    }

    /// First ranked provider whose real quote still clears the profitability gate.
    /// Unprofitable only when some provider quoted and none cleared it.
    async fn select_provider(
        &self,
        opportunity: &ArbitrageOpportunity,
        gas: &GasSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Selected, DispatchOutcome> {
        let inner = &self.inner;
        let asset = &inner.config.quote_asset;
        let amount = opportunity.borrow_amount;
        let ranked = inner
            .registry
            .ranked_providers(opportunity.execution_chain(), asset, amount)
            .await;

        let mut quoted = false;
        for provider in ranked {
            let quote = match inner.registry.quote(&provider, asset, amount, gas, now).await {
                Ok(quote) => quote,
                Err(e) => {
                    let action = inner.recovery.write().await.handle_error(&e);
                    debug!(provider = provider.id(), ?action, "Quote failed: {}", e);
                    continue;
                }
            };

            quoted = true;

            let evaluation = inner.detector.model().evaluate(opportunity.spread_pct, &quote);
            if !inner.detector.model().accepts(&evaluation) {
                debug!(
                    opportunity_id = %opportunity.id,
                    provider = provider.id(),
                    net = %evaluation.net_profit.round_dp(4),
                    "Unprofitable with this provider's loan quote"
                );
                continue;
            }

            match inner
                .registry
                .build_execution_params(&provider, opportunity, &quote, evaluation.net_profit)
            {
                Ok(params) => return Ok((provider, quote, evaluation, params)),
                Err(e) => {
                    inner.registry.record_failure(provider.id(), &e.to_string(), now).await;
                    inner.recovery.write().await.handle_error(&e);
                }
            }
        }

        if quoted {
            inner.counters.write().await.skipped_unprofitable += 1;
            debug!(opportunity_id = %opportunity.id, "Unprofitable with every real loan quote");
            return Err(DispatchOutcome::Unprofitable);
        }

        let e = BotError::NoHealthyProvider {
            asset: asset.clone(),
            amount,
        };
        inner.recovery.write().await.handle_error(&e);
        inner.counters.write().await.skipped_no_provider += 1;
        debug!(opportunity_id = %opportunity.id, "{}", e);
        Err(DispatchOutcome::NoProvider)
    }

    async fn spawn_execution(&self, params: ExecutionParams, permit: OwnedSemaphorePermit) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let timeout = this.inner.config.execution_timeout();
            let result = tokio::time::timeout(timeout, this.inner.executor.execute(&params))
                .await
                .unwrap_or_else(|_| Err(BotError::timeout(format!("execute {}", params.opportunity_id), timeout)));

            let now = Utc::now();
            let record = match result {
                Ok(report) if report.success => ExecutionRecord::success(
                    &params.opportunity_id,
                    &params.provider_id,
                    report.actual_profit,
                    report.gas_used,
                    report.tx_id,
                    now,
                ),
                Ok(report) => ExecutionRecord::failure(
                    &params.opportunity_id,
                    &params.provider_id,
                    report.error_message.unwrap_or_else(|| "execution failed".to_string()),
                    report.gas_used,
                    report.tx_id,
                    now,
                ),
                Err(e) => {
                    this.inner.recovery.write().await.handle_error(&e);
                    ExecutionRecord::failure(&params.opportunity_id, &params.provider_id, e.to_string(), 0, None, now)
                }
            };
            this.apply_outcome(record).await;
        });

        let mut executions = self.inner.executions.lock().await;
        executions.retain(|h| !h.is_finished());
        executions.push(handle);
    }

    /// The only path through which a completed attempt changes risk state.
    async fn apply_outcome(&self, record: ExecutionRecord) {
        let inner = &self.inner;
        let now = Utc::now();
        print_execution_record(&record);

        if record.is_success() {
            inner.registry.record_success(&record.provider_id, now).await;
        } else {
            let reason = record.failure_reason.as_deref().unwrap_or("execution failed");
            inner.registry.record_failure(&record.provider_id, reason, now).await;
        }

        {
            let mut counters = inner.counters.write().await;
            if record.is_success() {
                counters.succeeded += 1;
                counters.total_profit += record.actual_profit;
            } else {
                counters.failed += 1;
            }
        }

        inner.risk.write().await.record_outcome(record.clone(), now);

        if let Some(dir) = &inner.journal_dir {
            journal_execution(dir.clone(), record).await;
        }
    }

    // ---- control surface ---------------------------------------------------

    /// Live opportunities, best first.
    pub async fn opportunities(&self) -> Vec<ArbitrageOpportunity> {
        self.inner.book.read().await.live(Utc::now())
    }

    pub async fn recent_executions(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.inner.risk.read().await.recent_executions(limit)
    }

    pub async fn stats(&self) -> EngineStats {
        let inner = &self.inner;
        let now = Utc::now();
        let state = self.state().await;
        let (risk, breaker, in_flight) = {
            let risk = inner.risk.read().await;
            (risk.state(now), risk.breaker().clone(), risk.in_flight() as usize)
        };
        let health = run_health_check(
            inner.aggregator.health_snapshot().await,
            inner.registry.health_snapshot().await,
            &breaker,
            inner.started_at,
            inner.config.quote_freshness(),
            now,
        );

        EngineStats {
            state,
            risk,
            circuit_breaker_open: breaker.is_open(),
            last_failure_reason: breaker.last_failure_reason().map(str::to_string),
            counters: inner.counters.read().await.clone(),
            error_counts: inner.recovery.read().await.snapshot(),
            in_flight,
            active_opportunities: inner.book.read().await.live(now).len(),
            uptime_secs: inner.started_at.elapsed().as_secs(),
            health,
        }
    }

    /// Walk the dispatch path for one opportunity without dispatching.
    pub async fn simulate(&self, id: &str) -> BotResult<SimulationReport> {
        let inner = &self.inner;
        let now = Utc::now();
        let opportunity = inner.book.read().await.get(id, now)?;
        let gas = self.gas_snapshot().await;
        let quotes = inner.latest_quotes.read().await.clone();

        let mut report = SimulationReport {
            opportunity: opportunity.clone(),
            invalid_reason: None,
            risk: inner.risk.read().await.preview(&opportunity, opportunity.borrow_amount, now),
            provider_id: None,
            loan_quote: None,
            evaluation: None,
            execution: None,
            would_execute: false,
            notes: Vec::new(),
        };

        if let Some(reason) = not_executable(&opportunity) {
            report.notes.push(reason);
            return Ok(report);
        }

        let spread = match revalidate(&opportunity, &quotes, &inner.detector, &gas, now) {
            Revalidation::Invalid(reason) => {
                report.invalid_reason = Some(reason.to_string());
                report.opportunity.spread_pct
            }
            Revalidation::Valid { spread_pct, .. } => spread_pct,
        };

        let asset = &inner.config.quote_asset;
        let ranked = inner
            .registry
            .ranked_providers(opportunity.execution_chain(), asset, opportunity.borrow_amount)
            .await;
        for provider in ranked {
            let quoted = tokio::time::timeout(
                inner.config.provider_timeout(),
                provider.quote(asset, opportunity.borrow_amount, &gas),
            )
            .await;
            let quote = match quoted {
                Ok(Ok(quote)) => quote,
                Ok(Err(e)) => {
                    report.notes.push(format!("{}: {}", provider.id(), e));
                    continue;
                }
                Err(_) => {
                    report.notes.push(format!("{}: quote timed out", provider.id()));
                    continue;
                }
            };

            let evaluation = inner.detector.model().evaluate(spread, &quote);
            let accepted = inner.detector.model().accepts(&evaluation);
            if accepted {
                match inner
                    .registry
                    .build_execution_params(&provider, &opportunity, &quote, evaluation.net_profit)
                {
                    Ok(params) => {
                        match tokio::time::timeout(inner.config.execution_timeout(), inner.executor.simulate(&params)).await {
                            Ok(Ok(execution)) => report.execution = Some(execution),
                            Ok(Err(e)) => report.notes.push(format!("dry run failed: {e}")),
                            Err(_) => report.notes.push("dry run timed out".to_string()),
                        }
                    }
                    Err(e) => report.notes.push(format!("{}: {}", provider.id(), e)),
                }
            } else {
                report.notes.push("unprofitable with real loan quote".to_string());
            }

            report.provider_id = Some(provider.id().to_string());
            report.loan_quote = Some(quote);
            report.evaluation = Some(evaluation);
            report.would_execute = accepted
                && report.invalid_reason.is_none()
                && report.risk.is_allowed()
                && report.execution.as_ref().map(|e| e.success).unwrap_or(false);
            break;
        }

        if report.provider_id.is_none() {
            report.notes.push(format!("no healthy provider for {} {}", opportunity.borrow_amount, asset));
        }
        Ok(report)
    }

    /// Executions currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.inner.config.max_concurrent_executions - self.inner.permits.available_permits()
    }
}

/// Why an opportunity cannot be dispatched at all, independent of prices and risk.
fn not_executable(opportunity: &ArbitrageOpportunity) -> Option<String> {
    if opportunity.is_cross_chain() {
        return Some(format!(
            "cross-chain route {} -> {} cannot settle within one flash loan",
            opportunity.buy_chain, opportunity.sell_chain
        ));
    }
    traded_token(opportunity).err().map(|e| e.to_string())
}
