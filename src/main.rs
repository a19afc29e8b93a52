//! CLI entry point for the Tarrific trade-data tool.
//!
//! Provides subcommands for building the sector breakdown, the per-country
//! summary, dataset and product summaries, the high-tariff ranking and the
//! globe's trade arcs from the expanded tariff summary, and for publishing
//! the aggregates to S3.

mod infra;

use crate::infra::restcountries::RestCountriesClient;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use tarrific::analyzers::countries::summarize_countries;
use tarrific::analyzers::flows::{
    DEFAULT_FLOW_LIMIT, build_flows, rank_partners, resolve_coordinates,
};
use tarrific::analyzers::sectors::{DEFAULT_TOP_N, SectorOptions, aggregate_sectors};
use tarrific::analyzers::summary::{
    DEFAULT_RANKING_LIMIT, lookup_product, rank_by_tariff, summarize_dataset,
};
use tarrific::analyzers::types::PublishIndex;
use tarrific::analyzers::writetos3::write_json_to_s3;
use tarrific::categories::CategoryTable;
use tarrific::fetch::BasicClient;
use tarrific::output::{print_pretty, write_csv, write_json};
use tarrific::parser::{Ingested, parse_trade_csv};
use tarrific::source::Source;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "tarrific")]
#[command(about = "Aggregates U.S. trade and tariff data for the Tarrific dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the HS2/HS4 sector breakdown
    Sectors {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// Data dictionary JSON with `hs4_categories`
        #[arg(long, env = "TARRIFIC_DICTIONARY")]
        dictionary: String,

        /// Only aggregate flows with this partner (ISO3)
        #[arg(long)]
        partner: Option<String>,

        /// Number of sectors kept before the rest is folded into "Other"
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// File to write JSON to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Summarize trade and tariffs per partner country
    Countries {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// File to write to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Headline totals and tariff range for the whole dataset
    Summary {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// File to write JSON to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Summarize a single HS4 product across all partners
    Product {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// Data dictionary JSON with `hs4_categories`
        #[arg(long, env = "TARRIFIC_DICTIONARY")]
        dictionary: String,

        /// Four-digit HS4 code (e.g., 8471)
        #[arg(long)]
        hs4: String,

        /// File to write JSON to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Rank HS4 products by tariff, highest first
    HighTariff {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// Data dictionary JSON with `hs4_categories`
        #[arg(long, env = "TARRIFIC_DICTIONARY")]
        dictionary: String,

        /// Number of products to list
        #[arg(short, long, default_value_t = DEFAULT_RANKING_LIMIT)]
        limit: usize,

        /// File to write JSON to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Build GeoJSON trade arcs to the largest partners
    Flows {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// Number of partners to draw
        #[arg(short, long, default_value_t = DEFAULT_FLOW_LIMIT)]
        limit: usize,

        /// File to write JSON to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Aggregate everything and upload the JSON documents to S3
    Publish {
        /// Trade CSV: path, URL or s3://bucket/key
        #[arg(long, env = "TARRIFIC_TRADE_CSV")]
        csv: String,

        /// Data dictionary JSON with `hs4_categories`
        #[arg(long, env = "TARRIFIC_DICTIONARY")]
        dictionary: String,

        /// S3 bucket name to upload aggregated JSON to (e.g., "my-bucket")
        #[arg(long, env = "TARRIFIC_S3_BUCKET")]
        s3_bucket: String,

        /// Key prefix for uploaded objects
        #[arg(long, default_value = "aggregates")]
        prefix: String,

        /// Also publish a sector breakdown for each of the N largest partners
        #[arg(long, default_value_t = 0)]
        partners: usize,

        /// Gzip compress objects before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tarrific.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tarrific.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let http = BasicClient::new().context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Sectors {
            csv,
            dictionary,
            partner,
            top_n,
            output,
        } => {
            let csv: Source = csv.parse()?;
            let dictionary: Source = dictionary.parse()?;
            let s3 = s3_client_for(&[&csv, &dictionary]).await;

            let (ingested, categories) =
                load_inputs(&http, s3.as_ref(), &csv, &dictionary).await?;

            let mut options = SectorOptions {
                top_n,
                ..SectorOptions::default()
            };
            if let Some(partner) = partner {
                options = options.for_partner(&partner);
            }

            let tree = aggregate_sectors(&ingested.records, &categories, &options);
            info!(
                sectors = tree.children.len(),
                total_value = tree.total_value,
                "Sector breakdown built"
            );
            write_json(output.as_deref(), &tree)?;
        }
        Commands::Countries {
            csv,
            output,
            format,
        } => {
            let csv: Source = csv.parse()?;
            let s3 = s3_client_for(&[&csv]).await;

            let ingested = load_trade(&http, s3.as_ref(), &csv).await?;
            let countries = summarize_countries(&ingested.records);
            info!(countries = countries.len(), "Country summary built");

            match format {
                Format::Json => write_json(output.as_deref(), &countries)?,
                Format::Csv => write_csv(output.as_deref(), &countries)?,
            }
        }
        Commands::Summary { csv, output } => {
            let csv: Source = csv.parse()?;
            let s3 = s3_client_for(&[&csv]).await;

            let ingested = load_trade(&http, s3.as_ref(), &csv).await?;
            let summary = summarize_dataset(&ingested.records);
            info!(
                records = summary.total_records,
                total_value = summary.total_trade_value,
                "Dataset summary built"
            );
            write_json(output.as_deref(), &summary)?;
        }
        Commands::Product {
            csv,
            dictionary,
            hs4,
            output,
        } => {
            let csv: Source = csv.parse()?;
            let dictionary: Source = dictionary.parse()?;
            let s3 = s3_client_for(&[&csv, &dictionary]).await;

            let (ingested, categories) =
                load_inputs(&http, s3.as_ref(), &csv, &dictionary).await?;
            let product = lookup_product(&ingested.records, &categories, &hs4)?;
            info!(hs4 = %product.hs4, partners = product.partner_count, "Product found");
            write_json(output.as_deref(), &product)?;
        }
        Commands::HighTariff {
            csv,
            dictionary,
            limit,
            output,
        } => {
            let csv: Source = csv.parse()?;
            let dictionary: Source = dictionary.parse()?;
            let s3 = s3_client_for(&[&csv, &dictionary]).await;

            let (ingested, categories) =
                load_inputs(&http, s3.as_ref(), &csv, &dictionary).await?;
            let ranking = rank_by_tariff(&ingested.records, &categories, limit);
            info!(
                products = ranking.total_products,
                listed = ranking.products.len(),
                "Tariff ranking built"
            );
            write_json(output.as_deref(), &ranking)?;
        }
        Commands::Flows { csv, limit, output } => {
            let csv: Source = csv.parse()?;
            let s3 = s3_client_for(&[&csv]).await;

            let ingested = load_trade(&http, s3.as_ref(), &csv).await?;
            let partners = rank_partners(&ingested.records, limit);
            print_pretty(&partners);

            let lookup = RestCountriesClient::new(
                BasicClient::new().context("Failed to build HTTP client")?,
            );
            let coords = resolve_coordinates(&lookup, &partners).await;
            let flows = build_flows(&partners, &coords);

            info!(
                partners = partners.len(),
                drawn = flows.lines.features.len(),
                "Trade flows built"
            );
            write_json(output.as_deref(), &flows)?;
        }
        Commands::Publish {
            csv,
            dictionary,
            s3_bucket,
            prefix,
            partners,
            gzip,
        } => {
            let csv: Source = csv.parse()?;
            let dictionary: Source = dictionary.parse()?;
            let config = aws_config::load_from_env().await;
            let s3 = aws_sdk_s3::Client::new(&config);

            info!(bucket = %s3_bucket, gzip, "S3 upload enabled");
            publish(
                &http,
                &s3,
                &csv,
                &dictionary,
                &s3_bucket,
                &prefix,
                partners,
                gzip,
            )
            .await?;
        }
    }

    Ok(())
}

/// Creates an S3 client only when one of the inputs lives in S3.
async fn s3_client_for(sources: &[&Source]) -> Option<aws_sdk_s3::Client> {
    if sources.iter().any(|s| s.is_s3()) {
        let config = aws_config::load_from_env().await;
        Some(aws_sdk_s3::Client::new(&config))
    } else {
        None
    }
}

#[tracing::instrument(skip(http, s3), fields(source = %csv))]
async fn load_trade(
    http: &BasicClient,
    s3: Option<&aws_sdk_s3::Client>,
    csv: &Source,
) -> Result<Ingested> {
    let bytes = csv.load(http, s3).await?;
    let ingested = parse_trade_csv(&bytes).with_context(|| format!("Failed to ingest {csv}"))?;

    info!(
        records = ingested.records.len(),
        world_rows = ingested.world_rows,
        skipped = ingested.skipped_rows,
        "Trade data loaded"
    );
    Ok(ingested)
}

/// Fetches the trade CSV and the category dictionary concurrently.
#[tracing::instrument(skip(http, s3), fields(csv = %csv, dictionary = %dictionary))]
async fn load_inputs(
    http: &BasicClient,
    s3: Option<&aws_sdk_s3::Client>,
    csv: &Source,
    dictionary: &Source,
) -> Result<(Ingested, CategoryTable)> {
    let (ingested, dictionary_text) =
        tokio::try_join!(load_trade(http, s3, csv), async {
            Ok::<_, anyhow::Error>(dictionary.load_text(http, s3).await?)
        })?;

    let categories = CategoryTable::from_dictionary_json(&dictionary_text)
        .with_context(|| format!("Failed to load categories from {dictionary}"))?;

    Ok((ingested, categories))
}

/// Uploads the sector tree, the country summary, the dataset summary, the
/// high-tariff ranking, optional per-partner sector trees and an index of
/// everything written.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip(http, s3, csv, dictionary))]
async fn publish(
    http: &BasicClient,
    s3: &aws_sdk_s3::Client,
    csv: &Source,
    dictionary: &Source,
    bucket: &str,
    prefix: &str,
    partners: usize,
    gzip: bool,
) -> Result<()> {
    let (ingested, categories) = load_inputs(http, Some(s3), csv, dictionary).await?;
    let records = &ingested.records;

    let prefix = prefix.trim_end_matches('/');
    let suffix = if gzip { ".json.gz" } else { ".json" };
    let mut objects = Vec::new();

    let tree = aggregate_sectors(records, &categories, &SectorOptions::default());
    let key = format!("{prefix}/sectors{suffix}");
    write_json_to_s3(s3, bucket, &key, &tree, gzip).await?;
    objects.push(key);

    let countries = summarize_countries(records);
    let key = format!("{prefix}/countries{suffix}");
    write_json_to_s3(s3, bucket, &key, &countries, gzip).await?;
    objects.push(key);

    let summary = summarize_dataset(records);
    let key = format!("{prefix}/summary{suffix}");
    write_json_to_s3(s3, bucket, &key, &summary, gzip).await?;
    objects.push(key);

    let ranking = rank_by_tariff(records, &categories, DEFAULT_RANKING_LIMIT);
    let key = format!("{prefix}/high_tariff{suffix}");
    write_json_to_s3(s3, bucket, &key, &ranking, gzip).await?;
    objects.push(key);

    for country in countries.iter().take(partners) {
        let options = SectorOptions::default().for_partner(&country.iso_a3);
        let partner_tree = aggregate_sectors(records, &categories, &options);

        let key = format!("{prefix}/sectors/{}{suffix}", country.iso_a3);
        write_json_to_s3(s3, bucket, &key, &partner_tree, gzip).await?;
        objects.push(key);
    }

    let index = PublishIndex {
        generated_at: Utc::now(),
        total_value: tree.total_value,
        record_count: records.len(),
        objects,
    };
    write_json_to_s3(s3, bucket, &format!("{prefix}/index.json"), &index, false).await?;

    info!(uploaded = index.objects.len() + 1, "S3 publish complete");
    Ok(())
}
