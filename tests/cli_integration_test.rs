//! CLI integration tests: real INI, ledger and price files on disk, driven
//! through the same dispatch the binary uses.

mod common;

use clap::Parser;
use common::*;
use shockwise::cli::{execute, Cli, RunContext};
use shockwise::domain::error::ShockwiseError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HOLDINGS: &str = "\
symbol,shares,cost_basis,currency,sector,region,quote_type,market_value
7203.T,100,2500,,Consumer Cyclical,,EQUITY,4000
AAPL,10,150,,Technology,,EQUITY,3000
XOM,20,90,,Energy,,EQUITY,2000
GLD,5,180,,,,ETF,1000
";

const CONFIG: &str = "\
[portfolio]
path = holdings.csv
base_currency = USD

[prices]
dir = prices
end_date = 2026-06-30
lookback_days = 365

[proxies]
rate = TLT
sectors = Technology:XLK

[signals]
health = health.csv
estimates = estimates.csv

[analysis]
min_overlap = 20

[strategy]
preset = balanced
";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.ini"), config).unwrap();
        fs::write(dir.path().join("holdings.csv"), HOLDINGS).unwrap();
        fs::write(dir.path().join("health.csv"), "symbol,status\nXOM,exit\n").unwrap();
        fs::write(
            dir.path().join("estimates.csv"),
            "symbol,optimistic,base,pessimistic\nGLD,0.12,0.06,-0.02\n",
        )
        .unwrap();

        let prices = dir.path().join("prices");
        fs::create_dir(&prices).unwrap();
        let start = date(2026, 3, 1);
        for (i, symbol) in ["7203.T", "AAPL", "XOM", "GLD", "TLT", "XLK"].iter().enumerate() {
            let mut csv = String::from("date,close\n");
            for p in closes_from_returns(start, &noise(i as u64 + 1, 60)) {
                csv.push_str(&format!("{},{:.6}\n", p.date, p.close));
            }
            fs::write(prices.join(format!("{symbol}.csv")), csv).unwrap();
        }

        Fixture { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.ini")
    }

    fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Result<(), ShockwiseError> {
        let config = self.config();
        let mut argv = vec!["shockwise"];
        argv.extend_from_slice(&args[..1]);
        argv.extend_from_slice(&["-c", config.to_str().unwrap()]);
        argv.extend_from_slice(&args[1..]);
        execute(Cli::try_parse_from(argv).unwrap().command)
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_fixture() {
        let fx = Fixture::new(CONFIG);
        fx.run(&["validate"]).unwrap();
    }

    #[test]
    fn scenarios_lists_catalog_as_json() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("catalog.json");
        let cli = Cli::try_parse_from([
            "shockwise",
            "scenarios",
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
        execute(cli.command).unwrap();
        let value: serde_json::Value = serde_json::from_str(&read(&out)).unwrap();
        assert_eq!(value["scenarios"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn risk_overview_uses_price_history() {
        let fx = Fixture::new(CONFIG);
        let out = fx.out("risk.json");
        fx.run(&["risk", "--format", "json", "-o", out.to_str().unwrap()])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&read(&out)).unwrap();
        assert_eq!(value["correlation"]["defined_pairs"], 6);
        assert_eq!(value["sensitivities"]["AAPL"]["scores"]["interest_rate"]["kind"], "scored");
        assert_eq!(value["sensitivities"]["XOM"]["scores"]["currency"]["reason"], "no_proxy");
        assert_eq!(value["sensitivities"]["GLD"]["scores"]["currency"]["score"], -0.8);

        let var = &value["value_at_risk"];
        assert!((var["coverage"].as_f64().unwrap() - 1.0).abs() < 1e-9);
        assert!(var["monthly"]["p99"].as_f64().unwrap() <= var["monthly"]["p95"].as_f64().unwrap());
        assert!(value["alerts"].is_array());
    }

    #[test]
    fn analyze_named_scenario_to_markdown() {
        let fx = Fixture::new(CONFIG);
        let out = fx.out("analysis.md");
        fx.run(&["analyze", "-s", "japan crash", "-o", out.to_str().unwrap()])
            .unwrap();
        let md = read(&out);
        assert!(md.contains("`japan_triple_decline`"));
        assert!(md.contains("| 7203.T | 40.0% | -20.0% | region (region=JP)"));
    }

    #[test]
    fn analyze_custom_shock_is_uniform() {
        let fx = Fixture::new(CONFIG);
        let out = fx.out("custom.json");
        fx.run(&[
            "analyze",
            "--shock",
            "-0.2",
            "--label",
            "flash crash",
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&read(&out)).unwrap();
        assert_eq!(value["label"], "flash crash");
        let impact = value["portfolio_impact"].as_f64().unwrap();
        assert!((impact + 0.2).abs() < 1e-12);
        for row in value["impacts"].as_array().unwrap() {
            assert_eq!(row["stage"], "custom");
        }
    }

    #[test]
    fn rebalance_sells_exit_and_honours_reduce_request() {
        let fx = Fixture::new(CONFIG);
        let out = fx.out("plan.json");
        fx.run(&[
            "rebalance",
            "--strategy",
            "aggressive",
            "--reduce",
            "region:JP:0.5",
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&read(&out)).unwrap();
        assert_eq!(value["strategy"]["name"], "aggressive");

        let actions = value["actions"].as_array().unwrap();
        let find = |symbol: &str| {
            actions
                .iter()
                .find(|a| a["symbol"] == symbol)
                .unwrap_or_else(|| panic!("no action for {symbol}"))
        };
        assert_eq!(find("XOM")["kind"], "sell");
        let toyota = find("7203.T");
        assert_eq!(toyota["kind"], "reduce");
        assert!(toyota["reasons"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["kind"] == "reduction_requested"));
    }
}

mod failures {
    use super::*;

    #[test]
    fn unknown_scenario() {
        let fx = Fixture::new(CONFIG);
        let err = fx.run(&["analyze", "-s", "zombie apocalypse"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::UnknownScenario { .. }));
    }

    #[test]
    fn shock_below_minus_one() {
        let fx = Fixture::new(CONFIG);
        let err = fx.run(&["analyze", "--shock", "-1.5"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::InvalidShock { .. }));
    }

    #[test]
    fn unknown_strategy_preset() {
        let fx = Fixture::new(CONFIG);
        let err = fx.run(&["rebalance", "--strategy", "yolo"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::UnknownStrategy { .. }));
    }

    #[test]
    fn malformed_reduce_request() {
        let fx = Fixture::new(CONFIG);
        let err = fx.run(&["rebalance", "--reduce", "sector:Technology"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::InvalidStrategy { .. }));
    }

    #[test]
    fn invalid_config_value() {
        let fx = Fixture::new(&CONFIG.replace("min_overlap = 20", "min_overlap = 1"));
        let err = fx.run(&["validate"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "min_overlap"));
    }

    #[test]
    fn duplicate_holding_in_ledger() {
        let fx = Fixture::new(CONFIG);
        let ledger = format!("{HOLDINGS}AAPL,1,1,,Technology,,EQUITY,10\n");
        fs::write(fx.dir.path().join("holdings.csv"), ledger).unwrap();
        let err = fx.run(&["validate"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::DuplicateSymbol { ref symbol } if symbol == "AAPL"));
    }

    #[test]
    fn empty_ledger() {
        let fx = Fixture::new(CONFIG);
        fs::write(
            fx.dir.path().join("holdings.csv"),
            "symbol,shares,cost_basis,market_value\n",
        )
        .unwrap();
        let err = fx.run(&["analyze", "-s", "rate_hike"]).unwrap_err();
        assert!(matches!(err, ShockwiseError::EmptyPortfolio));
    }

    #[test]
    fn missing_config_file() {
        let err = RunContext::load(Path::new("/nonexistent/config.ini")).err().unwrap();
        assert!(matches!(err, ShockwiseError::ConfigParse { .. }));
    }
}
