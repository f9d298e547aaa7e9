use clap::{Parser, Subcommand, ValueEnum};
use quill::{
    config::{Config, ConfigStore, FileConfigStore},
    history::{AttemptRecord, HistoryDb},
    progress::{distance_over_progress, pressure_over_progress, speed_over_progress, ProgressPoint},
    session::Comparison,
    Aligner, Trace,
};
use serde::Serialize;
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

/// compare handwritten pen traces against an expert reference
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// config file to use instead of the per-user one
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// log engine decisions (same as RUST_LOG=debug)
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// score a student trace against an expert trace
    Compare {
        #[clap(short, long)]
        student: PathBuf,
        #[clap(short, long)]
        expert: PathBuf,
        /// sections for progressive accuracy (overrides config)
        #[clap(long)]
        sections: Option<usize>,
        /// print the report as JSON
        #[clap(long)]
        json: bool,
        /// store the result in the attempt history under this reference name
        #[clap(long)]
        record: Option<String>,
    },
    /// DTW-align a student trace with an expert trace
    Align {
        #[clap(short, long)]
        student: PathBuf,
        #[clap(short, long)]
        expert: PathBuf,
        /// Sakoe-Chiba window (overrides config)
        #[clap(short, long)]
        window: Option<usize>,
        /// print every (student, expert) index pair
        #[clap(long)]
        show_path: bool,
    },
    /// export a progress graph as CSV
    Graph {
        #[clap(short, long)]
        student: PathBuf,
        #[clap(short, long)]
        expert: PathBuf,
        #[clap(short, long, value_enum, default_value_t = GraphKind::Distance)]
        kind: GraphKind,
        #[clap(short, long)]
        out: PathBuf,
    },
    /// list past attempts
    History {
        #[clap(short, long)]
        reference: Option<String>,
        #[clap(short, long, default_value_t = 10)]
        limit: usize,
        /// delete all recorded attempts
        #[clap(long)]
        clear: bool,
    },
    /// show the active configuration
    Config {
        /// overwrite the config file with defaults
        #[clap(long)]
        reset: bool,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
enum GraphKind {
    Distance,
    Pressure,
    Speed,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    series: &'a str,
    progress: f64,
    value: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = store.load();

    match cli.command {
        Command::Compare {
            student,
            expert,
            sections,
            json,
            record,
        } => {
            let mut config = config;
            if let Some(sections) = sections {
                config.sections = sections;
            }
            let student = load_trace(&student)?;
            let comparison = Comparison::new(load_trace(&expert)?, config);
            let report = comparison.report(&student)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("accuracy: {}%", report.accuracy);
                println!(
                    "progress: {}",
                    report
                        .progressive_accuracy
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                if let Some(dev) = report.deviation {
                    println!(
                        "deviation: mean {:.2}px, std {:.2}px, max {:.2}px",
                        dev.mean, dev.std_dev, dev.max
                    );
                }
                println!("out of range: {}/{}", report.out_of_range, report.student_points);
                if let Some(cost) = report.dtw_cost {
                    println!("dtw cost: {:.2}", cost);
                }
            }

            if let Some(reference) = record {
                let db = HistoryDb::new()?;
                db.record_attempt(&AttemptRecord::from_report(reference, &report))?;
            }
        }
        Command::Align {
            student,
            expert,
            window,
            show_path,
        } => {
            let aligner = match window.or(config.dtw_window) {
                Some(w) => Aligner::with_window(w),
                None => Aligner::new(),
            };
            let alignment = aligner.align(&load_trace(&student)?, &load_trace(&expert)?)?;
            println!("path length: {}", alignment.path.len());
            println!("cost: {:.2}", alignment.cost);
            if show_path {
                for (s, e) in alignment.path.steps() {
                    println!("{s}\t{e}");
                }
            }
        }
        Command::Graph {
            student,
            expert,
            kind,
            out,
        } => {
            let student = load_trace(&student)?;
            let comparison = Comparison::new(load_trace(&expert)?, config);
            let index = comparison.index();
            let series: Vec<(&str, Vec<ProgressPoint>)> = match kind {
                GraphKind::Distance => vec![("distance", distance_over_progress(&student, &index))],
                GraphKind::Pressure => {
                    let p = pressure_over_progress(&student, &index);
                    vec![("student", p.student), ("expert", p.expert)]
                }
                GraphKind::Speed => vec![
                    ("student", speed_over_progress(&student)),
                    ("expert", speed_over_progress(comparison.expert())),
                ],
            };
            write_csv(&out, &series)?;
            println!("wrote {} graph to {}", kind, out.display());
        }
        Command::History {
            reference,
            limit,
            clear,
        } => {
            let db = HistoryDb::new()?;
            if clear {
                db.clear_all()?;
                println!("history cleared");
                return Ok(());
            }
            for attempt in db.recent_attempts(reference.as_deref(), limit)? {
                println!(
                    "{}  {:<20} {:>3}%  {}",
                    attempt.timestamp.format("%Y-%m-%d %H:%M"),
                    attempt.reference,
                    attempt.accuracy,
                    attempt
                        .mean_deviation
                        .map_or(String::from("-"), |d| format!("{:.2}px", d)),
                );
            }
        }
        Command::Config { reset } => {
            let config = if reset {
                let defaults = Config::default();
                store.save(&defaults)?;
                defaults
            } else {
                config
            };
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_trace(path: &Path) -> Result<Trace, Box<dyn Error>> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(Trace::from_json(&bytes)?)
}

fn write_csv(path: &Path, series: &[(&str, Vec<ProgressPoint>)]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for (name, points) in series {
        for p in points {
            writer.serialize(CsvRow {
                series: *name,
                progress: p.progress,
                value: p.value,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
