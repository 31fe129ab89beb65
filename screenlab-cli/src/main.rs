//! ScreenLab CLI: analyze bar files and screen them against strategies.
//!
//! Commands:
//! - `analyze`: latest-bar summary, pattern report and technical outlook per ticker
//! - `screen`: rank tickers with one strategy, with parameter overrides
//! - `multi`: run several strategies at their defaults
//! - `strategies`: list registered strategies and their default parameters

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use logging::{init_logging, LogFormat};
use screenlab_core::analysis::{summarize, AnalysisSummary, PatternReport, TechnicalOutlook};
use screenlab_core::data::load_bars;
use screenlab_core::domain::{AnalyzedRecord, Ticker};
use screenlab_core::manager::{MultiStrategyReport, StrategyOutcome};
use screenlab_core::{Analyzer, ScreenConfig, ScreeningBatch, StrategyManager, StrategyParameters};

#[derive(Parser)]
#[command(
    name = "screenlab",
    about = "ScreenLab CLI: technical indicator analysis and strategy screening"
)]
struct Cli {
    /// Log output format. The level is read from RUST_LOG.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the latest bar, detect price/volume patterns and score the
    /// technical outlook per ticker.
    Analyze {
        /// CSV file with columns ticker,date,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// Only analyze this ticker.
        #[arg(long)]
        ticker: Option<String>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Screen tickers with one strategy and rank the matches.
    Screen {
        /// CSV file with columns ticker,date,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// Strategy id (see `screenlab strategies`).
        #[arg(long)]
        strategy: String,

        /// Parameter override, e.g. --param min_histogram=30. Repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        /// Maximum results. Defaults to the config's screen.limit.
        #[arg(long)]
        limit: Option<usize>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Screen every bar instead of each ticker's latest one.
        #[arg(long, default_value_t = false)]
        all_dates: bool,
    },
    /// Screen tickers with several strategies at their defaults.
    Multi {
        /// CSV file with columns ticker,date,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// Comma-separated strategy ids. Defaults to all registered strategies.
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<String>,

        /// Maximum results per strategy. Defaults to the config's
        /// screen.limit_per_strategy.
        #[arg(long)]
        limit: Option<usize>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List registered strategies and their default parameters.
    Strategies {
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Analyze {
            bars,
            ticker,
            config,
            json,
        } => run_analyze(&bars, ticker.as_deref(), config.as_deref(), json),
        Commands::Screen {
            bars,
            strategy,
            params,
            limit,
            config,
            json,
            all_dates,
        } => run_screen(
            &bars,
            &strategy,
            params,
            limit,
            config.as_deref(),
            json,
            all_dates,
        ),
        Commands::Multi {
            bars,
            strategies,
            limit,
            config,
            json,
        } => run_multi(&bars, strategies, limit, config.as_deref(), json),
        Commands::Strategies { json } => run_strategies(json),
    }
}

// ─── Argument parsing ────────────────────────────────────────────────

fn parse_param(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value = match value.trim() {
        "true" => 1.0,
        "false" => 0.0,
        number => number
            .parse::<f64>()
            .map_err(|e| format!("bad value for {key}: {e}"))?,
    };
    Ok((key.to_string(), value))
}

/// Reject overrides the strategy does not define. An unknown strategy is
/// left for `StrategyManager::screen` to report.
fn check_param_keys(
    manager: &StrategyManager,
    strategy: &str,
    params: &StrategyParameters,
) -> Result<()> {
    let Some(found) = manager.get(strategy) else {
        return Ok(());
    };
    let defaults = found.default_parameters();
    let unknown = params.unknown_keys(&defaults);
    if !unknown.is_empty() {
        let valid: Vec<&str> = defaults.iter().map(|(name, _)| name).collect();
        bail!(
            "unknown parameter(s) for {}: {} (valid: {})",
            found.name(),
            unknown.join(", "),
            valid.join(", ")
        );
    }
    Ok(())
}

// ─── Shared loading ──────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<ScreenConfig> {
    match path {
        Some(path) => ScreenConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ScreenConfig::default()),
    }
}

fn load_records(
    bars_path: &Path,
    config: &ScreenConfig,
    ticker: Option<&str>,
) -> Result<BTreeMap<Ticker, Vec<AnalyzedRecord>>> {
    let mut bars = load_bars(bars_path)
        .with_context(|| format!("loading bars from {}", bars_path.display()))?;
    if let Some(ticker) = ticker {
        bars.retain(|bar| bar.ticker == ticker);
        if bars.is_empty() {
            bail!("no bars for ticker {ticker} in {}", bars_path.display());
        }
    }
    let bar_count = bars.len();
    let analyzer = Analyzer::new(config.indicators.clone());
    let records = analyzer.analyze_by_ticker(bars);
    info!(bars = bar_count, tickers = records.len(), "analyzed bar file");
    Ok(records)
}

fn latest_records(by_ticker: BTreeMap<Ticker, Vec<AnalyzedRecord>>) -> Vec<AnalyzedRecord> {
    by_ticker
        .into_values()
        .filter_map(|mut records| records.pop())
        .collect()
}

// ─── analyze ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TickerAnalysis {
    summary: AnalysisSummary,
    patterns: PatternReport,
    /// Absent while the ticker's history is too short.
    outlook: Option<TechnicalOutlook>,
}

fn run_analyze(
    bars_path: &Path,
    ticker: Option<&str>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let by_ticker = load_records(bars_path, &config, ticker)?;

    let analyses: Vec<TickerAnalysis> = by_ticker
        .values()
        .filter_map(|records| {
            let patterns = PatternReport::from_records(records)?;
            Some(TickerAnalysis {
                summary: summarize(records)?,
                outlook: TechnicalOutlook::assess(records, &patterns),
                patterns,
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
        return Ok(());
    }

    for analysis in &analyses {
        print_analysis(analysis);
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn label<T: Serialize>(value: &Option<T>) -> String {
    match value {
        Some(v) => serde_json::to_value(v)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        None => "-".to_string(),
    }
}

fn print_analysis(analysis: &TickerAnalysis) {
    let s = &analysis.summary;
    let p = &analysis.patterns;
    println!();
    println!("=== {} ({}) ===", s.ticker, s.analysis_date);
    println!("Price:          {:.0}", s.current_price);
    println!(
        "SMA20:          {} ({})",
        fmt_opt(s.indicators.sma_20, 1),
        label(&s.signals.sma_20)
    );
    println!(
        "RSI14:          {} ({})",
        fmt_opt(s.indicators.rsi_14, 1),
        label(&s.signals.rsi)
    );
    println!(
        "MACD:           {} / {} ({})",
        fmt_opt(s.indicators.macd, 2),
        fmt_opt(s.indicators.macd_signal, 2),
        label(&s.signals.macd)
    );
    println!("Bollinger:      {}", label(&s.signals.bollinger));

    println!();
    println!("--- Patterns ---");
    if let Some(v) = &p.volume {
        println!(
            "Volume:         {:.2}x 20-day avg, trend {}, interest {}{}",
            v.volume_ratio,
            label(&Some(v.volume_trend)),
            label(&Some(v.interest)),
            if v.volume_surge { " (surge)" } else { "" }
        );
    }
    if let Some(m) = &p.structure {
        println!(
            "Structure:      {} ({:.1}% range, {:.0}% in box {:.0}-{:.0}), breakout odds {}%",
            label(&Some(m.market_type)),
            m.price_range_pct,
            m.position_in_range,
            m.box_lower,
            m.box_upper,
            m.breakout_probability
        );
    }
    if let Some(b) = &p.bands {
        println!(
            "Bands:          width {:.1}%, position {:.0}%, volatility {}{}",
            b.band_width_pct,
            b.price_position_pct,
            label(&Some(b.volatility)),
            if b.squeeze { " (squeeze)" } else { "" }
        );
    }
    if let Some(t) = &p.trading {
        println!(
            "Trading:        {} cap ({:.1}bn/day), flow {} (corr {})",
            label(&Some(t.size_tier)),
            t.trading_value / 1e9,
            label(&Some(t.flow)),
            fmt_opt(t.price_volume_correlation, 2)
        );
    }
    if let Some(l) = &p.levels {
        println!(
            "Support:        {:.0} ({:.1}% below, {} pivots)",
            l.key_support, l.distance_to_support_pct, l.support_strength
        );
        println!(
            "Resistance:     {:.0} ({:.1}% above, {} pivots)",
            l.key_resistance, l.distance_to_resistance_pct, l.resistance_strength
        );
    }
    println!("Confidence:     {:.0}", p.confidence);

    println!();
    println!("--- Outlook ---");
    let Some(o) = &analysis.outlook else {
        println!("Insufficient history");
        return;
    };
    let r = &o.recommendation;
    println!(
        "Score:          {:.2} -> {} (risk {}, confidence {:.0})",
        o.technical_score,
        label(&Some(r.signal)),
        label(&Some(r.risk_level)),
        r.confidence
    );
    println!(
        "Components:     macd {} rsi {} bollinger {} pattern {}",
        fmt_opt(o.breakdown.macd, 0),
        fmt_opt(o.breakdown.rsi, 0),
        fmt_opt(o.breakdown.bollinger, 0),
        fmt_opt(o.breakdown.pattern, 0)
    );
    println!("RSI condition:  {}", label(&o.rsi_condition));
    let reversal = &o.macd_reversal;
    if reversal.filter_signal {
        println!(
            "MACD reversal:  {} ({}% odds, {} up / {} down)",
            label(&reversal.direction),
            reversal.reversal_probability,
            reversal.increasing_days,
            reversal.decreasing_days
        );
    } else {
        println!("MACD reversal:  none");
    }
    for reason in &r.reasons {
        println!("  - {reason}");
    }
}

// ─── screen ──────────────────────────────────────────────────────────

fn run_screen(
    bars_path: &Path,
    strategy: &str,
    cli_params: Vec<(String, f64)>,
    limit: Option<usize>,
    config_path: Option<&Path>,
    json: bool,
    all_dates: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = StrategyManager::with_default_strategies();

    let by_ticker = load_records(bars_path, &config, None)?;
    let records: Vec<AnalyzedRecord> = if all_dates {
        by_ticker.into_values().flatten().collect()
    } else {
        latest_records(by_ticker)
    };

    let cli_params: StrategyParameters = cli_params.into_iter().collect();
    check_param_keys(&manager, strategy, &cli_params)?;
    let overrides = config.overrides_for(strategy).merged(&cli_params);
    let limit = limit.unwrap_or(config.screen.limit);
    let batch = manager.screen(strategy, &records, &overrides, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_batch(&batch);
    }
    Ok(())
}

fn print_batch(batch: &ScreeningBatch) {
    println!();
    println!("=== {} ===", batch.strategy_name);
    println!(
        "Analyzed: {}  Matches: {}  Returned: {}  Skipped: {}",
        batch.total_analyzed, batch.matches_found, batch.results_returned, batch.skipped
    );
    let params: Vec<String> = batch
        .parameters_used
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    println!("Parameters: {}", params.join(", "));

    if !batch.results.is_empty() {
        println!();
        println!(
            "{:<5} {:<10} {:<12} {:>12} {:>14} {:>9}",
            "Rank", "Ticker", "Date", "Price", "Volume", "Strength"
        );
        println!("{}", "-".repeat(67));
        for (rank, result) in batch.results.iter().enumerate() {
            println!(
                "{:<5} {:<10} {:<12} {:>12.0} {:>14} {:>9.3}",
                rank + 1,
                result.ticker,
                result.date.to_string(),
                result.current_price,
                result.volume,
                result.signal_strength
            );
            if !result.key_levels.is_empty() {
                let levels: Vec<String> = result
                    .key_levels
                    .iter()
                    .map(|(k, v)| format!("{k} {v:.0}"))
                    .collect();
                println!("      {}", levels.join("  "));
            }
        }
    }

    for err in &batch.errors {
        println!("SKIPPED: {err}");
    }
}

// ─── multi ───────────────────────────────────────────────────────────

fn run_multi(
    bars_path: &Path,
    strategies: Vec<String>,
    limit: Option<usize>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = StrategyManager::with_default_strategies();
    let names = if strategies.is_empty() {
        manager.names()
    } else {
        strategies
    };

    let records = latest_records(load_records(bars_path, &config, None)?);
    let limit = limit.unwrap_or(config.screen.limit_per_strategy);
    let report = manager.screen_many(&names, &records, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_multi(&report);
    }
    Ok(())
}

fn print_multi(report: &MultiStrategyReport) {
    for run in &report.runs {
        match &run.outcome {
            StrategyOutcome::Completed(batch) => print_batch(batch),
            StrategyOutcome::Failed { error, .. } => {
                println!();
                println!("=== {} ===", run.strategy);
                println!("ERROR: {error}");
            }
        }
    }
    println!();
    println!("--- Totals ---");
    println!(
        "Strategies: {} ({} succeeded)  Matches: {}",
        report.strategies_analyzed, report.successful_strategies, report.total_matches_found
    );
}

// ─── strategies ──────────────────────────────────────────────────────

fn run_strategies(json: bool) -> Result<()> {
    let manager = StrategyManager::with_default_strategies();
    let infos = manager.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    for info in &infos {
        println!();
        println!("{}", info.name);
        println!("  {}", info.description);
        for (name, value) in info.parameters.iter() {
            println!("    {name:<28} {value}");
        }
    }
    Ok(())
}
