//! Analysis Runner - interactive chain testing
//!
//! A small utility for running analysis chains against sample data.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package helion-playground --bin analysis-runner -- --help
//! ```

use clap::{Parser, Subcommand};

use common_config::{ExecutionConfig, HelionConfig};
use common_error::HelionResult;
use helion_core::ArrayView;
use helion_frame::EventFrame;
use helion_hist::Hist1D;

use helion_playground::{create_collision_sample, print_header, print_section};

/// Analysis Runner CLI.
#[derive(Parser, Debug)]
#[command(name = "analysis-runner")]
#[command(about = "Run analysis chains against sample event data")]
#[command(version)]
struct Args {
    /// Number of processing slots (defaults to serial execution).
    #[arg(short, long)]
    slots: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a two-cut selection and print the cutflow report.
    Cutflow {
        /// Transverse-momentum threshold.
        #[arg(long, default_value_t = 40.0)]
        pt_cut: f64,

        /// Pseudorapidity window half-width.
        #[arg(long, default_value_t = 1.5)]
        eta_cut: f64,
    },

    /// Fill and print a jet-momentum histogram.
    Histogram {
        /// Number of bins.
        #[arg(short, long, default_value_t = 8)]
        bins: usize,

        /// Leave axis limits unset and derive them from the data.
        #[arg(long)]
        auto_range: bool,
    },

    /// Print the booked dataflow graph of the demo chain.
    Explain,
}

fn open_frame(slots: Option<usize>) -> HelionResult<EventFrame> {
    let storage = create_collision_sample()?;
    let config = HelionConfig {
        execution: match slots {
            Some(n) => ExecutionConfig::with_parallelism(n),
            None => ExecutionConfig::serial(),
        },
        ..HelionConfig::default()
    };
    let table = common_runtime::block_on(async {
        use helion_storage::Storage;
        storage.open_table("events").await
    })??;
    Ok(EventFrame::with_config(table, &["pt"], &config))
}

fn run_cutflow(frame: &EventFrame, pt_cut: f64, eta_cut: f64) -> HelionResult<()> {
    print_header("Cutflow");

    let selected = frame
        .filter_named("pt", move |pt: f64| pt > pt_cut, &["pt"])?
        .filter_named("eta", move |eta: f64| eta.abs() < eta_cut, &["eta"])?;
    let count = selected.count()?;
    let mean_pt = selected.mean("pt")?;

    println!("selected events : {}", *count.get()?);
    println!("mean pt         : {:.2}", *mean_pt.get()?);

    print_section("named filters");
    frame.report()?.print();
    Ok(())
}

fn run_histogram(frame: &EventFrame, bins: usize, auto_range: bool) -> HelionResult<()> {
    print_header("Jet momentum");

    let model = if auto_range {
        Hist1D::new(bins, 0.0, 0.0)
    } else {
        Hist1D::new(bins, 0.0, 60.0)
    };
    let hist = frame
        .define("njets", |jets: ArrayView<f64>| jets.len() as i32, &["jet_pt"])?
        .filter(|njets: i32| njets > 0, &["njets"])?
        .histo1d(model, "jet_pt")?;

    let hist = hist.get()?;
    println!(
        "axis: [{:.1}, {:.1}), {} entries",
        hist.axis().low(),
        hist.axis().high(),
        hist.entries()
    );
    for bin in 0..hist.axis().nbins() {
        let width = (hist.value(bin) / hist.entries() as f64 * 200.0) as usize;
        println!(
            "{:6.1} | {:6.0} {}",
            hist.axis().bin_low_edge(bin),
            hist.value(bin),
            "#".repeat(width)
        );
    }
    Ok(())
}

fn run_explain(frame: &EventFrame) -> HelionResult<()> {
    print_header("Dataflow graph");

    let selected = frame.filter_named("pt", |pt: f64| pt > 40.0, &["pt"])?;
    let _count = selected.count()?;
    let _mean = selected.mean("eta")?;
    let _all = frame.max("pt")?;

    println!("{}", frame.explain());
    Ok(())
}

fn main() -> HelionResult<()> {
    let args = Args::parse();
    let frame = open_frame(args.slots)?;

    match args.command {
        Commands::Cutflow { pt_cut, eta_cut } => run_cutflow(&frame, pt_cut, eta_cut),
        Commands::Histogram { bins, auto_range } => run_histogram(&frame, bins, auto_range),
        Commands::Explain => run_explain(&frame),
    }
}
