use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covscan::error::{ModelError, SequenceError, UncalibratedModelError};
use covscan::model;
use covscan::pipeline::{self, SearchArgs};
use covscan::report::{self, OutputFormat, ReportContext};

#[derive(Parser)]
#[command(name = "covscan")]
#[command(version)]
#[command(about = "Covariance-model search of nucleotide databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search sequence database(s) with a covariance model
    Search(SearchArgs),
    /// Load a model and report structural violations
    Validate { cmfile: PathBuf },
    /// Print model metadata
    Info { cmfile: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Search(args) => cmd_search(args),
        Commands::Validate { cmfile } => cmd_validate(&cmfile),
        Commands::Info { cmfile } => cmd_info(&cmfile),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            ExitCode::from(classify(&e))
        }
    }
}

/// Input errors exit 2, engine errors exit 3.
fn classify(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<UncalibratedModelError>().is_some() {
        3
    } else if e.downcast_ref::<ModelError>().is_some() || e.downcast_ref::<SequenceError>().is_some()
    {
        2
    } else {
        1
    }
}

fn load_checked(path: &PathBuf) -> Result<covscan::model::Cm> {
    let cm = model::load(path)?;
    let report = model::validate(&cm);
    if !report.is_ok() {
        return Err(ModelError::Checksum {
            path: path.clone(),
            reason: format!(
                "{} violation(s), first: {}",
                report.violations.len(),
                report.violations[0]
            ),
        }
        .into());
    }
    Ok(cm)
}

fn cmd_search(args: SearchArgs) -> Result<u8> {
    let cfg = args.to_config();
    cfg.validate().map_err(anyhow::Error::msg)?;

    let threads = pipeline::effective_threads(cfg.threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("failed to build worker pool")?;

    let cm = load_checked(&args.cmfile)?;
    if cfg.verbose {
        eprintln!(
            "[INFO] model '{}': {} consensus column(s), {} state(s), {} worker(s)",
            cm.name,
            cm.clen,
            cm.states.len(),
            threads
        );
    }

    let (hits, stats) = pipeline::run_search(&cm, &args.seqdb, &cfg)?;

    let format = if args.tabular {
        OutputFormat::Tabular
    } else {
        OutputFormat::Standard
    };
    let targets = args
        .seqdb
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",");
    let ctx = ReportContext {
        model_name: &cm.name,
        query: args.cmfile.display().to_string(),
        targets,
        stats: &stats,
    };

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    report::render(&hits, &ctx, format, &mut out)?;
    Ok(0)
}

fn cmd_validate(path: &PathBuf) -> Result<u8> {
    let cm = model::load(path)?;
    let report = model::validate(&cm);
    if report.is_ok() {
        println!("{}: OK ({} states, {} nodes)", cm.name, cm.states.len(), cm.nodes.len());
        Ok(0)
    } else {
        for v in &report.violations {
            println!("{}: {v}", cm.name);
        }
        Ok(1)
    }
}

fn cmd_info(path: &PathBuf) -> Result<u8> {
    let cm = model::load(path)?;
    println!("name:        {}", cm.name);
    if let Some(acc) = &cm.accession {
        println!("accession:   {acc}");
    }
    if let Some(desc) = &cm.description {
        println!("description: {desc}");
    }
    println!("alphabet:    {:?}", cm.alphabet);
    println!("clen:        {}", cm.clen);
    println!("states:      {}", cm.states.len());
    println!("nodes:       {}", cm.nodes.len());
    match &cm.calibration {
        Some(cal) => println!(
            "calibration: lambda={} mu={} eff_seqlen={}",
            cal.lambda, cal.mu, cal.eff_seqlen
        ),
        None => println!("calibration: none"),
    }
    println!(
        "filter HMM:  {}",
        if cm.filter_hmm.is_some() { "present" } else { "projected at run time" }
    );
    Ok(0)
}
