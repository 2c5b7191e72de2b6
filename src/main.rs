use clap::{Parser, Subcommand};
use score2form::{validate_input, Config, ScoreToForm};
use std::path::PathBuf;

/// Score-to-Form Structure Analysis System
#[derive(Parser)]
#[command(name = "score2form")]
#[command(about = "Analyze the hierarchical structure of a symbolic score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a decoded score and write the structural analysis
    Analyze {
        /// Input score file (ParsedScore JSON)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }

            // Load configuration
            let config = if let Some(config_path) = config {
                score2form::config::load_config(config_path)?
            } else {
                Config::default()
            };

            // Validate input
            validate_input(&input, &config)?;

            // Create processor
            let processor = ScoreToForm::new(config);

            if !quiet {
                println!("Analyzing {}...", input.display());
            }

            processor.process(&input, &output)?;

            if !quiet {
                println!("Results saved to {}", output.display());
            }
        }
        Commands::ValidateConfig { config } => {
            let config = score2form::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
