use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lowlight_enhance::{BatchOutcome, DirectoryReporter, DirectorySource, Pipeline, ProfileTable};

#[derive(Parser)]
#[command(name = "lowlight")]
#[command(about = "Enhance dark, low-contrast images and write before/after comparisons")]
struct Cli {
    /// Directory holding the source images
    #[arg(short, long, default_value = "fotos_carga")]
    input: PathBuf,

    /// Directory for the generated artifacts
    #[arg(short, long, default_value = "fotos_result")]
    output: PathBuf,

    /// Image identities to process, comma-separated
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    ids: Vec<String>,

    /// YAML profile table (defaults to the built-in tuning)
    #[arg(short, long)]
    profiles: Option<PathBuf>,

    /// Source image file extension
    #[arg(long, default_value = "png")]
    ext: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lowlight=info,lowlight_enhance=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let table = match &cli.profiles {
        Some(path) => ProfileTable::load(path)
            .with_context(|| format!("loading profiles from {}", path.display()))?,
        None => ProfileTable::default(),
    };

    let mut source = DirectorySource::new(&cli.input, &cli.ext);
    let mut reporter = DirectoryReporter::new(&cli.output)
        .with_context(|| format!("creating output directory {}", cli.output.display()))?;

    let pipeline = Pipeline::new(table);
    match pipeline.run_batch(&cli.ids, &mut source, &mut reporter) {
        BatchOutcome::NothingToProcess { skipped } => {
            tracing::warn!(skipped = skipped.len(), "No images found to process");
        }
        BatchOutcome::Completed(summary) => {
            tracing::info!(
                processed = summary.processed.len(),
                skipped = summary.skipped.len(),
                failed_artifacts = summary.failed_artifacts,
                output = %reporter.dir().display(),
                "Results saved"
            );
        }
    }

    Ok(())
}
