//! # Searchwire CLI (`swq`)
//!
//! One-shot query tool over a TOML connector configuration. Useful for
//! validating a configuration and inspecting what the compiler sends.
//!
//! ## Usage
//!
//! ```bash
//! swq --config ./config/swq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `swq query "<text>"` | Run one search and print ranked items and facets |
//! | `swq compile "<text>"` | Print the compiled request JSON without posting it |
//!
//! The access token for `query` is read from the `SEARCHWIRE_ACCESS_TOKEN`
//! environment variable.
//!
//! ## Examples
//!
//! ```bash
//! # Page 2 of a filtered search
//! swq query "quarterly report" --page 2 --filter 'filetype="docx","pdf"'
//!
//! # Inspect the request the compiler would send, with a pinned clock
//! swq compile "report" --now 2024-05-15T12:00:00Z
//! ```

mod compiler;
mod config;
mod connector;
mod entity;
mod models;
mod normalizer;
mod preview;
mod request;
mod response;
mod tokens;
mod transport;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConnectorFile;
use crate::connector::SearchConnector;
use crate::models::{FilterOperator, FilterSelection, SearchContext, SortSelection};
use crate::tokens::StaticTokenResolver;
use crate::transport::HttpTransport;

/// Searchwire CLI: run one search against the remote service or inspect
/// the compiled request.
#[derive(Parser)]
#[command(
    name = "swq",
    about = "Searchwire, a connector between abstract search intent and a remote entity-typed search service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/swq.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search and print ranked items and facets.
    ///
    /// Requires `SEARCHWIRE_ACCESS_TOKEN` in the environment.
    Query {
        /// Free-text query. Omit for a match-all search.
        query: Option<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Items per page.
        #[arg(long, default_value_t = 10)]
        page_size: u32,

        /// Sort selection as `field` or `field:desc`.
        #[arg(long)]
        sort: Option<String>,

        /// Filter selection as `field=token[,token...]`. Repeatable.
        #[arg(long)]
        filter: Vec<String>,
    },

    /// Print the compiled request JSON without posting it.
    Compile {
        /// Free-text query. Omit for a match-all search.
        query: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        page_size: u32,

        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        filter: Vec<String>,

        /// Pin the clock (RFC 3339) for deterministic date-bucket ranges.
        #[arg(long)]
        now: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .module("searchwire")
        .verbosity((cli.verbose as usize) + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let file = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Query {
            query,
            page,
            page_size,
            sort,
            filter,
        } => {
            let context = build_context(&file, query, page, page_size, sort, filter)?;
            run_query(&file, context).await?;
        }
        Commands::Compile {
            query,
            page,
            page_size,
            sort,
            filter,
            now,
        } => {
            let context = build_context(&file, query, page, page_size, sort, filter)?;
            run_compile(&file, context, now).await?;
        }
    }

    Ok(())
}

fn build_context(
    file: &ConnectorFile,
    query: Option<String>,
    page: u32,
    page_size: u32,
    sort: Option<String>,
    filters: Vec<String>,
) -> Result<SearchContext> {
    let selected_filters = filters
        .iter()
        .map(|raw| parse_filter(raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchContext {
        input_query_text: query.filter(|text| !text.trim().is_empty()),
        page_number: page,
        items_count_per_page: page_size,
        filters: file.filters.clone(),
        selected_filters,
        filter_operator: FilterOperator::And,
        sort: sort.as_deref().map(parse_sort).transpose()?,
    })
}

/// Parse `field` or `field:asc|desc`.
fn parse_sort(raw: &str) -> Result<SortSelection> {
    let (field, direction) = match raw.split_once(':') {
        Some((field, direction)) => (field, direction),
        None => (raw, "asc"),
    };
    if field.trim().is_empty() {
        bail!("invalid --sort '{}': no field name", raw);
    }
    let descending = match direction {
        "asc" => false,
        "desc" => true,
        other => bail!("invalid --sort direction '{}': use asc or desc", other),
    };
    Ok(SortSelection {
        field: field.to_string(),
        descending,
    })
}

/// Parse `field=token[,token...]`.
fn parse_filter(raw: &str) -> Result<FilterSelection> {
    let (field, values) = raw
        .split_once('=')
        .with_context(|| format!("invalid --filter '{}': no '=' found", raw))?;
    if field.trim().is_empty() {
        bail!("invalid --filter '{}': no field name", raw);
    }
    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        bail!("invalid --filter '{}': no values", raw);
    }
    Ok(FilterSelection {
        field: field.to_string(),
        values,
        operator: FilterOperator::Or,
    })
}

async fn run_query(file: &ConnectorFile, context: SearchContext) -> Result<()> {
    let token = std::env::var("SEARCHWIRE_ACCESS_TOKEN")
        .map_err(|_| anyhow::anyhow!("SEARCHWIRE_ACCESS_TOKEN environment variable not set"))?;

    let transport = Arc::new(HttpTransport::new(token)?);
    let connector = SearchConnector::new(file.source.clone(), transport)
        .with_slots(file.slots.clone())
        .with_locale(file.locale.clone());

    let results = connector.execute(&context).await?;

    if results.items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, item) in results.items.iter().enumerate() {
        let title = item
            .get_str(&file.slots.title)
            .or_else(|| item.get_str("name"))
            .unwrap_or("(untitled)");
        let kind = item
            .entity_type
            .map(|entity| entity.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!("{}. [{}] {}", i + 1, kind, title);
        if let Some(url) = item.get_str("previewUrl") {
            println!("    url: {}", url);
        }
        if let Some(summary) = item.get_str("summary") {
            println!("    excerpt: \"{}\"", summary.replace('\n', " "));
        }
        println!();
    }

    println!(
        "{} of {} results (page {})",
        results.items.len(),
        results.total_count,
        context.page_number
    );

    for filter in &results.filters {
        println!();
        println!("{}:", filter.filter_name);
        for value in &filter.values {
            println!("    {} ({})", value.name, value.count);
        }
    }

    Ok(())
}

async fn run_compile(
    file: &ConnectorFile,
    context: SearchContext,
    now: Option<String>,
) -> Result<()> {
    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .with_context(|| format!("invalid --now '{}': expected RFC 3339", raw))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let resolver =
        StaticTokenResolver::for_query(context.input_query_text.as_deref().unwrap_or(""));
    let request = compiler::compile(&file.source, &context, &resolver, now).await?;
    let body = request::SearchRequestBody::single(request);

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        let sort = parse_sort("created:desc").unwrap();
        assert_eq!(sort.field, "created");
        assert!(sort.descending);

        let sort = parse_sort("title").unwrap();
        assert!(!sort.descending);

        assert!(parse_sort("created:sideways").is_err());
        assert!(parse_sort(":desc").is_err());
    }

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter("filetype=\"docx\",\"pdf\"").unwrap();
        assert_eq!(filter.field, "filetype");
        assert_eq!(filter.values, vec!["\"docx\"", "\"pdf\""]);

        assert!(parse_filter("filetype").is_err());
        assert!(parse_filter("filetype=").is_err());
        assert!(parse_filter("=docx").is_err());
    }
}
