//! Kinship Engine CLI
//!
//! Runs one kinship computation on the built-in demo schedules (or a
//! directory of CSV schedules) and prints a summary excerpt.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use kinship_engine::rates::{demo_rate_set, loader::LoadedRates};
use kinship_engine::{compute_kinship, KinshipConfig};

#[derive(Parser, Debug)]
#[command(name = "kinship_engine", about = "Matrix kinship computation")]
struct Args {
    /// Reference period year
    #[arg(long, default_value_t = 2000)]
    year: i32,

    /// Use the time-varying sweep instead of the stable regime
    #[arg(long)]
    time_varying: bool,

    /// Directory of CSV schedules (survival.csv, fertility.csv, ...);
    /// built-in demo schedules are used when omitted
    #[arg(long)]
    schedules: Option<PathBuf>,

    /// Restrict to these kin codes (comma separated, e.g. "m,d,os")
    #[arg(long)]
    kin: Option<String>,

    /// Also compute deceased kin
    #[arg(long)]
    with_deaths: bool,

    /// Write the full table to this CSV path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Kinship Engine v0.1.0");
    println!("=====================\n");

    let rates = match &args.schedules {
        Some(dir) => LoadedRates::load_from(dir)
            .and_then(|l| l.into_rate_set())
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading schedules from {}", dir.display()))?,
        None => demo_rate_set(args.year.min(1950), args.year.max(2020)),
    };

    let mut config = KinshipConfig {
        stable: !args.time_varying,
        focal_years: vec![args.year],
        living_only: !args.with_deaths,
        ..Default::default()
    };
    if let Some(kin) = &args.kin {
        let codes: Vec<&str> = kin.split(',').map(|c| c.trim()).collect();
        config = config.with_kin_codes(&codes)?;
    }

    println!(
        "Mode: {}   Year: {}   Ages: {}   Kin types: {}",
        if config.stable { "stable" } else { "time-varying" },
        args.year,
        rates.n_ages(),
        config.selection().len()
    );
    println!();

    let result = compute_kinship(&rates, &config)?;

    // Print summary rows for a few milestone Focal ages
    println!(
        "{:>5} {:>6} {:>12} {:>9} {:>8} {:>10} {:>10}",
        "Kin", "Age", "Living", "MeanAge", "SdAge", "Dead", "DeadCum"
    );
    println!("{}", "-".repeat(68));
    let milestones = [0, 20, 40, 60, 80];
    for row in result.summary.rows() {
        if !milestones.contains(&row.age_focal) {
            continue;
        }
        println!(
            "{:>5} {:>6} {:>12.6} {:>9} {:>8} {:>10.6} {:>10.6}",
            row.kin.code(),
            row.age_focal,
            row.count_living,
            row.mean_age
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "-".to_string()),
            row.sd_age
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string()),
            row.count_dead,
            row.count_dead_cum,
        );
    }

    let total_at_40: f64 = result
        .summary
        .rows()
        .iter()
        .filter(|r| r.age_focal == 40)
        .map(|r| r.count_living)
        .sum();
    println!("\nExpected living relatives at Focal age 40: {:.4}", total_at_40);

    if let Some(path) = &args.output {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(["kin", "age_focal", "age_kin", "year", "cohort", "living", "dead"])?;
        for row in result.full.rows() {
            writer.write_record([
                row.kin.code().to_string(),
                row.age_focal.to_string(),
                row.age_kin.to_string(),
                row.year.map(|y| y.to_string()).unwrap_or_default(),
                row.cohort.map(|c| c.to_string()).unwrap_or_default(),
                format!("{:.10}", row.living),
                format!("{:.10}", row.dead),
            ])?;
        }
        writer.flush()?;
        println!("Full table written to: {}", path.display());
    }

    Ok(())
}
