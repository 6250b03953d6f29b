use acs_blockgroups::{export, CensusConfig, LookupCatalog, StateContext};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "acs", about = "ACS 5-year block-group table extraction")]
struct Cli {
    /// YAML file with data_dir, catalog_path and geometry_dir.
    #[arg(long, default_value = "census.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every table id in the lookup catalog.
    List,
    /// Show where a table lives and what its columns are.
    Describe { table: String },
    /// Extract one table for one state and write it as Parquet.
    Extract {
        #[arg(long)]
        state: String,
        #[arg(long)]
        table: String,
        /// Join block-group boundaries (GeoJSON geometry column).
        #[arg(long)]
        geo: bool,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,acs_blockgroups=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) config + catalog ─────────────────────────────────────────
    let cli = Cli::parse();
    let config = CensusConfig::from_yaml_file(&cli.config)?;
    let catalog = Arc::new(
        LookupCatalog::load(&config.catalog_path)
            .with_context(|| format!("loading catalog {}", config.catalog_path.display()))?,
    );

    match cli.command {
        Command::List => {
            for id in catalog.table_ids() {
                println!("{}", id);
            }
        }
        Command::Describe { table } => {
            let spec = catalog.resolve(&table)?;
            println!("{}  {}", spec.id, spec.title);
            println!("  {}", spec.universe().unwrap_or_default());
            println!(
                "  sequence {:04}, start {}, {} cells",
                spec.sequence, spec.start_position, spec.num_cells
            );
            for (title, index) in spec.column_titles.iter().zip(&spec.column_indices) {
                println!("  [{:>4}] {}", index, title);
            }
        }
        Command::Extract {
            state,
            table,
            geo,
            out,
        } => {
            // ─── 3) load state, extract, export ──────────────────────
            let start = Instant::now();
            let ctx = StateContext::open(&state, catalog, &config)
                .with_context(|| format!("opening state {}", state))?;
            let extracted = if geo {
                ctx.get_geo_table(&table)?
            } else {
                ctx.get_table(&table)?
            };
            let bytes = export::write_parquet(&extracted, &out)
                .with_context(|| format!("writing {}", out.display()))?;
            info!(
                state = %ctx.info().name,
                table = %table,
                rows = extracted.num_rows(),
                dropped = extracted.dropped(),
                bytes,
                elapsed = ?start.elapsed(),
                "extracted"
            );
        }
    }

    Ok(())
}
