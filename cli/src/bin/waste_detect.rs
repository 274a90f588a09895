use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cli::{config_schema, detect_file, load_config};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};
use yolo::{Artifact, Runner, YoloOperation};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection on a single image
    Detect {
        /// Image to annotate
        #[arg(short, long)]
        image: PathBuf,
        /// Where to copy the annotated image (defaults to the run directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Unpack the dataset, train, and install the trained weights
    Train,
    /// Print the effective configuration as TOML
    Config,
    /// Print the JSON schema of the configuration file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Detect { image, output } => {
            let runner = Runner::from_config(&config)?;
            let annotated = detect_file(&runner, image, output.as_deref())?;
            info!("✅ Annotated image: {}", annotated.display());
        }
        Commands::Train => {
            // the CLI trains regardless of `training.enabled`, which only gates the HTTP route
            let runner = Runner::from_config(&config)?;
            if let Artifact::TrainedWeights(artifact) = runner.execute(YoloOperation::Train)? {
                info!("✅ Trained weights: {}", artifact.trained_model_file_path.display());
                info!("📦 Archived copy: {}", artifact.archived_model_file_path.display());
            }
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
        }
        Commands::Schema => {
            println!("{}", config_schema()?);
        }
    }

    Ok(())
}
