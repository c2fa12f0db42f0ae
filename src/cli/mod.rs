pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "notedly")]
#[command(about = "Notedly CLI - offline tools for the GraphQL API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the GraphQL schema (SDL)")]
    Schema,

    #[command(about = "Measure an operation's depth and cost against the query guard")]
    Check {
        #[arg(help = "File containing the GraphQL document, or - for stdin")]
        path: String,

        #[arg(long, help = "Only check the named operation")]
        operation: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Schema => commands::schema::handle(output_format),
        Commands::Check { path, operation } => {
            commands::check::handle(&path, operation.as_deref(), output_format).await
        }
    }
}
