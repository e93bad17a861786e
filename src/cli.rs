//! CLI definition and dispatch.

use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_portfolio_adapter::CsvPortfolioAdapter;
use crate::adapters::csv_signal_adapter::CsvSignalAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::domain::config_validation::{
    analysis_config_from_config, base_currency_from_config, end_date_from_config,
    lookback_days_from_config, min_overlap_from_config, parse_sector_proxies,
    strategy_from_config, validate_config,
};
use crate::domain::error::ShockwiseError;
use crate::domain::history::{load_history, HistoryLoad};
use crate::domain::portfolio::Portfolio;
use crate::domain::rebalance::Rebalancer;
use crate::domain::recommender::ReductionRequest;
use crate::domain::returns::ReturnSeries;
use crate::domain::risk_overview::{OverviewSettings, RiskOverview};
use crate::domain::scenario::ScenarioCatalog;
use crate::domain::scenario_analysis::{analyze, Evidence, ScenarioSpec};
use crate::domain::sensitivity::FactorProxies;
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::portfolio_port::PortfolioPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "shockwise", about = "Portfolio stress testing and rebalancing")]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Markdown,
    Json,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    pub format: Format,
    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in scenarios and their aliases
    Scenarios {
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Concentration, correlation and factor sensitivity overview
    Risk {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Stress the portfolio with a named scenario or a uniform shock
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Scenario name, alias, or text containing an alias
        #[arg(short, long, required_unless_present = "shock", conflicts_with = "shock")]
        scenario: Option<String>,
        /// Uniform shock applied to every holding, e.g. -0.2
        #[arg(long, allow_negative_numbers = true)]
        shock: Option<f64>,
        #[arg(long, default_value = "custom shock")]
        label: String,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Propose a constrained rebalancing plan
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        /// Preset overriding [strategy] preset
        #[arg(long)]
        strategy: Option<String>,
        /// Scenario whose impacts feed the sell rule
        #[arg(short, long)]
        scenario: Option<String>,
        /// Reduce a group, e.g. sector:Technology:0.5 (repeatable)
        #[arg(long = "reduce", value_name = "DIMENSION:GROUP:FRACTION")]
        reduce: Vec<String>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Validate a configuration file and its portfolio ledger
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), ShockwiseError> {
    match command {
        Command::Scenarios { out } => run_scenarios(&out),
        Command::Risk { config, out } => run_risk(&config, &out),
        Command::Analyze {
            config,
            scenario,
            shock,
            label,
            out,
        } => {
            let spec = match shock {
                Some(shock) => ScenarioSpec::Custom { label, shock },
                None => ScenarioSpec::Named(scenario.unwrap_or_default()),
            };
            run_analyze(&config, &spec, &out)
        }
        Command::Rebalance {
            config,
            strategy,
            scenario,
            reduce,
            out,
        } => run_rebalance(&config, strategy.as_deref(), scenario.as_deref(), &reduce, &out),
        Command::Validate { config } => run_validate(&config),
    }
}

/// A loaded, validated configuration plus the directory relative paths
/// resolve against.
pub struct RunContext {
    config: FileConfigAdapter,
    base_dir: PathBuf,
}

impl RunContext {
    pub fn load(path: &Path) -> Result<Self, ShockwiseError> {
        tracing::info!(path = %path.display(), "loading config");
        let config = FileConfigAdapter::from_file(path)?;
        validate_config(&config)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(RunContext { config, base_dir })
    }

    pub fn config(&self) -> &dyn ConfigPort {
        &self.config
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw.trim());
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    fn path_setting(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.config
            .get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .map(|v| self.resolve_path(&v))
    }

    pub fn load_portfolio(&self) -> Result<Portfolio, ShockwiseError> {
        let path = self
            .path_setting("portfolio", "path")
            .ok_or_else(|| ShockwiseError::ConfigMissing {
                section: "portfolio".into(),
                key: "path".into(),
            })?;
        let holdings = CsvPortfolioAdapter::new(path).load_holdings()?;
        Portfolio::new(holdings)
    }

    pub fn load_signals(&self) -> Result<CsvSignalAdapter, ShockwiseError> {
        CsvSignalAdapter::load(
            self.path_setting("signals", "health").as_deref(),
            self.path_setting("signals", "estimates").as_deref(),
        )
    }

    /// Price window ending at `[prices] end_date` (today when unset).
    fn price_window(&self) -> Result<(NaiveDate, NaiveDate), ShockwiseError> {
        let end = end_date_from_config(&self.config)?
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let lookback = u64::try_from(lookback_days_from_config(&self.config)).unwrap_or(0);
        let start = end
            .checked_sub_days(Days::new(lookback))
            .unwrap_or(NaiveDate::MIN);
        Ok((start, end))
    }

    pub fn load_overview(&self, portfolio: &Portfolio) -> Result<RiskOverview, ShockwiseError> {
        let (history, proxies) = match self.path_setting("prices", "dir") {
            Some(dir) => {
                let (start, end) = self.price_window()?;
                tracing::info!(%start, %end, dir = %dir.display(), "loading price history");
                let prices = CsvPriceAdapter::new(dir);
                let history = load_history(&prices, &portfolio.symbols(), start, end);
                let proxies = self.load_proxies(&prices, start, end)?;
                (history, proxies)
            }
            None => {
                tracing::warn!("no [prices] dir configured, correlations and sensitivities unavailable");
                (HistoryLoad::default(), FactorProxies::default())
            }
        };

        let base_currency = base_currency_from_config(&self.config);
        let analysis = analysis_config_from_config(&self.config);
        RiskOverview::build(
            portfolio,
            &history,
            &proxies,
            OverviewSettings {
                base_currency: &base_currency,
                min_overlap: min_overlap_from_config(&self.config),
                pair_threshold: analysis.contagion_threshold,
            },
        )
    }

    fn load_proxies(
        &self,
        prices: &dyn PricePort,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FactorProxies, ShockwiseError> {
        let fetch = |symbol: &str| -> Option<ReturnSeries> {
            load_history(prices, &[symbol.trim().to_string()], start, end)
                .series
                .into_iter()
                .next()
        };

        let mut proxies = FactorProxies {
            interest_rate: self.config.get_string("proxies", "rate").and_then(|s| fetch(&s)),
            currency: self.config.get_string("proxies", "fx").and_then(|s| fetch(&s)),
            ..Default::default()
        };
        if let Some(raw) = self.config.get_string("proxies", "sectors") {
            for (sector, symbol) in parse_sector_proxies(&raw)? {
                if let Some(series) = fetch(&symbol) {
                    proxies.sectors.insert(sector, series);
                }
            }
        }
        Ok(proxies)
    }
}

fn reporter(format: Format) -> Box<dyn ReportPort> {
    match format {
        Format::Markdown => Box::new(MarkdownReportAdapter),
        Format::Json => Box::new(JsonReportAdapter),
    }
}

fn emit(out: &OutputArgs, content: &str) -> Result<(), ShockwiseError> {
    match &out.output {
        Some(path) => {
            fs::write(path, content)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn run_scenarios(out: &OutputArgs) -> Result<(), ShockwiseError> {
    let catalog = ScenarioCatalog::builtin()?;
    emit(out, &reporter(out.format).render_catalog(&catalog)?)
}

fn run_risk(config_path: &Path, out: &OutputArgs) -> Result<(), ShockwiseError> {
    let ctx = RunContext::load(config_path)?;
    let portfolio = ctx.load_portfolio()?;
    let overview = ctx.load_overview(&portfolio)?;
    emit(out, &reporter(out.format).render_overview(&overview)?)
}

fn run_analyze(config_path: &Path, spec: &ScenarioSpec, out: &OutputArgs) -> Result<(), ShockwiseError> {
    let ctx = RunContext::load(config_path)?;
    let portfolio = ctx.load_portfolio()?;
    let overview = ctx.load_overview(&portfolio)?;
    let catalog = ScenarioCatalog::builtin()?;

    let report = analyze(
        &catalog,
        spec,
        &portfolio,
        overview.evidence(),
        &analysis_config_from_config(ctx.config()),
    )?;
    tracing::info!(
        scenario = %report.scenario,
        impact = report.portfolio_impact,
        "scenario analysed"
    );
    emit(out, &reporter(out.format).render_scenario(&report)?)
}

fn run_rebalance(
    config_path: &Path,
    preset: Option<&str>,
    scenario: Option<&str>,
    reduce: &[String],
    out: &OutputArgs,
) -> Result<(), ShockwiseError> {
    let ctx = RunContext::load(config_path)?;
    let strategy = strategy_from_config(ctx.config(), preset)?;
    let requests = reduce
        .iter()
        .map(|r| r.parse::<ReductionRequest>())
        .collect::<Result<Vec<_>, _>>()?;
    let portfolio = ctx.load_portfolio()?;
    let signals = ctx.load_signals()?;

    let catalog = ScenarioCatalog::builtin()?;
    let baseline = scenario
        .map(|name| {
            analyze(
                &catalog,
                &ScenarioSpec::Named(name.to_string()),
                &portfolio,
                Evidence::default(),
                &analysis_config_from_config(ctx.config()),
            )
        })
        .transpose()?;

    let plan = Rebalancer::new(&signals, &signals).plan(
        &portfolio,
        &strategy,
        baseline.as_ref(),
        &requests,
    )?;
    emit(out, &reporter(out.format).render_plan(&plan)?)
}

fn run_validate(config_path: &Path) -> Result<(), ShockwiseError> {
    let ctx = RunContext::load(config_path)?;
    let portfolio = ctx.load_portfolio()?;
    let strategy = strategy_from_config(ctx.config(), None)?;
    ctx.load_signals()?;
    println!(
        "{}: OK ({} holdings, strategy {})",
        config_path.display(),
        portfolio.len(),
        strategy.name
    );
    Ok(())
}
