use anyhow::Context;
use async_graphql::parser::{
    parse_query,
    types::{DocumentOperations, ExecutableDocument, OperationDefinition},
};
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncReadExt;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::graphql::{schema_sdl, OperationMeasure, QueryGuard, SchemaShape};

#[derive(Debug, Serialize)]
struct OperationReport {
    operation: Option<String>,
    #[serde(flatten)]
    measure: OperationMeasure,
    rejected: Option<String>,
}

pub async fn handle(path: &str, operation: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let source = read_source(path).await?;
    let document = parse_query(&source).context("Document is not valid GraphQL")?;

    let shape = SchemaShape::from_sdl(&schema_sdl()).context("Schema SDL did not parse")?;
    let guard = QueryGuard::from_config(&config::config().guard, shape);

    let reports = operations(&document, operation)?
        .into_iter()
        .map(|(name, definition)| report(&guard, &document, name, definition))
        .collect::<Vec<_>>();

    let rejected = reports.iter().filter(|r| r.rejected.is_some()).count();
    let data = Some(json!({ "operations": reports }));

    if let OutputFormat::Text = output_format {
        for r in &reports {
            println!(
                "{:<20} depth {:>3}  cost {:>8}  {}",
                r.operation.as_deref().unwrap_or("(anonymous)"),
                r.measure.depth,
                r.measure.cost,
                r.rejected.as_deref().unwrap_or("ok")
            );
        }
    }

    if rejected > 0 {
        output_error(&output_format, "Operation rejected by the query guard", Some("VALIDATION_REJECTED"), data)?;
        anyhow::bail!("{} of {} operations rejected", rejected, reports.len());
    }
    output_success(&output_format, "All operations within limits", data)
}

fn operations<'a>(
    document: &'a ExecutableDocument,
    only: Option<&str>,
) -> anyhow::Result<Vec<(Option<String>, &'a OperationDefinition)>> {
    let all: Vec<_> = match &document.operations {
        DocumentOperations::Single(op) => vec![(None, &op.node)],
        DocumentOperations::Multiple(ops) => ops
            .iter()
            .map(|(name, op)| (Some(name.to_string()), &op.node))
            .collect(),
    };

    match only {
        None => Ok(all),
        Some(wanted) => {
            let selected: Vec<_> = all
                .into_iter()
                .filter(|(name, _)| name.as_deref() == Some(wanted))
                .collect();
            if selected.is_empty() {
                anyhow::bail!("No operation named '{}'", wanted);
            }
            Ok(selected)
        }
    }
}

fn report(
    guard: &QueryGuard,
    document: &ExecutableDocument,
    name: Option<String>,
    definition: &OperationDefinition,
) -> OperationReport {
    // A fragment cycle has no measure; report it as a rejection with zeros.
    let measure = guard
        .measure(document, definition)
        .unwrap_or_default();
    let rejected = guard
        .validate(document, name.as_deref())
        .err()
        .map(|rejection| rejection.to_string());

    OperationReport {
        operation: name,
        measure,
        rejected,
    }
}

async fn read_source(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .context("Failed to read stdin")?;
        Ok(source)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path))
    }
}
