use std::path::PathBuf;

use clap::Subcommand;
use waypoint_optimizer::json::schema::{RequestKind, generate_json_schema};

use crate::parsers;

#[derive(Subcommand)]
pub enum GenerateSubcommands {
    JsonSchema {
        /// One of route, batch, compare, scenario or deviation
        #[arg(short, long, value_parser = parsers::parse_request_kind, default_value = "route")]
        kind: RequestKind,

        /// Output file of the schema
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
}

pub fn run(subcommand: GenerateSubcommands) -> Result<(), anyhow::Error> {
    match subcommand {
        GenerateSubcommands::JsonSchema { kind, out } => {
            let schema = generate_json_schema(kind)?;

            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(out, schema)?;
        }
    }

    Ok(())
}
