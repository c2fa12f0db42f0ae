use serde_json::json;

use crate::cli::OutputFormat;
use crate::graphql::schema_sdl;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let sdl = schema_sdl();
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "sdl": sdl }))?),
        OutputFormat::Text => print!("{}", sdl),
    }
    Ok(())
}
