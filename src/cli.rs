/*!
flowmap command line interface

Exports map documents and dashboard pages, and prints activity summaries,
from the raw datasets (falling back to demo data when they are absent).
*/

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use flowmap::page::{self, DashboardView};
use flowmap::reader::{self, DemoReader, LoadOutcome, LoadSource, DEFAULT_SEED};
use flowmap::{FlowmapError, VERSION};

#[derive(Parser)]
#[command(name = "flowmap")]
#[command(about = "Map-layer dashboards for e-commerce activity data")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewArg {
    Distribution,
    Flows,
}

impl From<ViewArg> for DashboardView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Distribution => DashboardView::Distribution,
            ViewArg::Flows => DashboardView::Flows,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the deck.gl JSON document for one view
    Export {
        /// Directory containing the five input CSVs
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Which map to build
        #[arg(long, value_enum, default_value_t = ViewArg::Distribution)]
        view: ViewArg,

        /// Output file path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Seed for flow sampling / demo generation
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Use demo data without trying the input files
        #[arg(long)]
        demo: bool,
    },

    /// Emit the full dashboard HTML for one view
    Page {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = ViewArg::Distribution)]
        view: ViewArg,

        /// Output file path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        #[arg(long)]
        demo: bool,
    },

    /// Print headline metrics and the top-5 city rankings
    Summary {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        #[arg(long)]
        demo: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            data_dir,
            view,
            output,
            seed,
            demo,
        } => {
            let outcome = load(&data_dir, seed, demo)?;
            let view = DashboardView::from(view);
            let doc = page::map_document(&outcome.data, view)?.ok_or_else(|| {
                FlowmapError::MapUnavailable(format!(
                    "no data available for the {} view",
                    view.label().to_lowercase()
                ))
            })?;
            emit(output.as_deref(), &doc)?;
        }

        Commands::Page {
            data_dir,
            view,
            output,
            seed,
            demo,
        } => {
            let outcome = load(&data_dir, seed, demo)?;
            let html = page::render_page(&outcome.data, DashboardView::from(view), &outcome.source)?;
            emit(output.as_deref(), &html)?;
        }

        Commands::Summary {
            data_dir,
            seed,
            demo,
        } => {
            let outcome = load(&data_dir, seed, demo)?;
            print_summary(&outcome)?;
        }
    }

    Ok(())
}

fn load(data_dir: &std::path::Path, seed: u64, demo: bool) -> flowmap::Result<LoadOutcome> {
    if demo {
        Ok(LoadOutcome {
            data: DemoReader::new().with_seed(seed).load()?,
            source: LoadSource::Demo {
                reason: "demo data requested".to_string(),
            },
        })
    } else {
        reader::load_with_fallback(data_dir, seed)
    }
}

fn emit(output: Option<&std::path::Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("written to {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn print_summary(outcome: &LoadOutcome) -> flowmap::Result<()> {
    match &outcome.source {
        LoadSource::Files => println!("source: input files"),
        LoadSource::Demo { reason } => println!("source: demo data ({reason})"),
    }

    let data = &outcome.data;
    if let Some(hub) = data.busiest_city()? {
        println!("primary hub:     {} ({})", hub.city, hub.state);
    }
    println!("total customers: {}", data.total_customers()?);
    println!("total sellers:   {}", data.total_sellers()?);
    println!("flow edges:      {}", data.flows.height());

    println!("\ntop cities by customers:");
    for (i, city) in data.top_by_customers(5)?.iter().enumerate() {
        println!("  {}. {} ({}) - {}", i + 1, city.city, city.state, city.count);
    }
    println!("\ntop cities by sellers:");
    for (i, city) in data.top_by_sellers(5)?.iter().enumerate() {
        println!("  {}. {} ({}) - {}", i + 1, city.city, city.state, city.count);
    }

    Ok(())
}
