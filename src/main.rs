use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use notechart_lib::commands::{check_token, TokenStatus};
use notechart_lib::config::{self, ServiceConfig};
use notechart_lib::models::{SchemaHint, Strategy};
use notechart_lib::pipeline::structuring::build_prompt;
use notechart_lib::pipeline::NoteProcessor;

#[derive(Parser)]
#[command(name = "notechart")]
#[command(version, about = "Turn free-text clinical notes into structured records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a record and print it as JSON
    Extract {
        /// Extraction strategy: pattern or llm
        #[arg(long, default_value = "pattern")]
        strategy: Strategy,
        /// Ask the model for bulleted exam and plan lists
        #[arg(long)]
        bulleted: bool,
        /// Note file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Print the prompt that would be sent to the model
    Prompt {
        #[arg(long)]
        bulleted: bool,
        /// Note file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Check the configured access token's shape
    CheckToken,
}

fn read_note(file: Option<PathBuf>) -> Result<String, std::io::Error> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut note = String::new();
            std::io::stdin().read_to_string(&mut note)?;
            Ok(note)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    notechart_lib::init_tracing();

    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match cli.command {
        Commands::Extract {
            strategy,
            bulleted,
            file,
        } => {
            let mut service = ServiceConfig::from_env()?;
            if bulleted {
                service.schema_hint = SchemaHint::Bulleted;
            }
            let processor = NoteProcessor::from_config(&service);
            let note = read_note(file)?;

            match processor.process(&note, strategy) {
                Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
                Err(e) => {
                    if let Some(fragment) = e.diagnostic_text() {
                        eprintln!("Model output:\n{fragment}");
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Prompt { bulleted, file } => {
            let hint = if bulleted {
                SchemaHint::Bulleted
            } else {
                SchemaHint::Scalar
            };
            let note = read_note(file)?;
            print!("{}", build_prompt(&note, hint));
        }
        Commands::CheckToken => {
            let service = ServiceConfig::from_env()?;
            let status = check_token(&service);
            println!("{}", status.summary());
            if status == TokenStatus::Malformed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
