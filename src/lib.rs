//! Atelier Labels — 57×32 mm serialized-stock labels for the repair counter.
//!
//! Generates a printable PDF label for a serialized unit (phone, tablet,
//! accessory with an IMEI or serial number): QR deep link for the companion
//! scanner app, Code 39 barcode of the serial, VAT-regime marker, prices,
//! battery level and technician notes. Labels are generated fresh from the
//! record at hand, optionally refreshed through a best-effort back-office
//! lookup, and handed to the platform's print affordance.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod catalog;
pub mod code39;
pub mod error;
pub mod label;
pub mod pdf;
pub mod present;
pub mod qr;
pub mod vat;

pub use error::{LabelError, Result};
pub use label::{LabelConfig, LabelInput, LabelPlan, LabelRequest};
pub use vat::VatRegime;

use catalog::{CatalogClient, UnitFacts};
use present::PresentOptions;

/// Generate printable labels for serialized stock.
#[derive(Debug, Parser)]
#[command(name = "atelier-labels", version, about)]
pub struct Args {
    /// Serial number or IMEI of the unit.
    #[arg(long, short = 's', required_unless_present = "batch")]
    serial: Option<String>,

    /// Product name printed on the label.
    #[arg(long)]
    name: Option<String>,

    /// Raw VAT-regime marker (e.g. "marge", "ttc"); unknown values print
    /// as TTC.
    #[arg(long)]
    vat: Option<String>,

    /// Retail price (printed rounded, without a currency symbol).
    #[arg(long)]
    retail_price: Option<f64>,

    /// Professional price.
    #[arg(long)]
    pro_price: Option<f64>,

    /// Battery level percentage.
    #[arg(long)]
    battery: Option<f64>,

    /// Free-text note (newlines collapse to spaces).
    #[arg(long)]
    note: Option<String>,

    /// Deep-link scheme of the companion scanner app.
    #[arg(long, default_value = "atelier")]
    scheme: String,

    /// JSON file holding an array of label requests; renders one page per
    /// unit.
    #[arg(long, conflicts_with = "serial")]
    batch: Option<PathBuf>,

    /// Back-office base URL for the best-effort unit lookup.
    #[arg(long, env = "ATELIER_CATALOG_URL")]
    catalog_url: Option<String>,

    /// API key sent with catalog lookups.
    #[arg(long, env = "ATELIER_CATALOG_KEY", hide_env_values = true)]
    catalog_key: Option<String>,

    /// Write the PDF to this path instead of opening it.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Do not ask the platform to open the PDF; save it instead.
    #[arg(long)]
    no_open: bool,

    /// Print the resolved layout plan as JSON and exit without writing a
    /// PDF.
    #[arg(long)]
    dry_run: bool,

    /// Directory for rolling log files (console logging is always on).
    #[arg(long, env = "ATELIER_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

/// Fold looked-up unit facts into a request. The VAT regime is refreshed
/// from the catalog when it answers (the stored marker is authoritative);
/// every other field only fills a gap the caller left open.
fn merge_facts(request: &mut LabelRequest, facts: UnitFacts) {
    if facts.vat_regime.is_some() {
        request.vat_regime = facts.vat_regime;
    }
    if request.name.is_none() {
        request.name = facts.name;
    }
    if request.retail_price.is_none() {
        request.retail_price = facts.retail_price;
    }
    if request.pro_price.is_none() {
        request.pro_price = facts.pro_price;
    }
    if request.battery_level.is_none() {
        request.battery_level = facts.battery_level;
    }
    if request.note.is_none() {
        request.note = facts.note;
    }
}

fn init_logging(
    log_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atelier_labels=debug"));
    let console_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "labels");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            registry.with(file_layer).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn load_requests(args: &Args) -> anyhow::Result<Vec<LabelRequest>> {
    if let Some(path) = &args.batch {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading batch file {}", path.display()))?;
        let requests: Vec<LabelRequest> = serde_json::from_str(&raw)
            .context("batch file must be a JSON array of label requests")?;
        return Ok(requests);
    }

    Ok(vec![LabelRequest {
        serial: args.serial.clone().unwrap_or_default(),
        name: args.name.clone(),
        vat_regime: args.vat.clone(),
        retail_price: args.retail_price,
        pro_price: args.pro_price,
        battery_level: args.battery,
        note: args.note.clone(),
    }])
}

/// Refresh a single-unit request from the catalog, when one is configured.
/// Batch requests come from an export that already reflects current state.
fn refresh_from_catalog(args: &Args, requests: &mut [LabelRequest]) -> anyhow::Result<()> {
    let (Some(url), [request]) = (&args.catalog_url, requests) else {
        return Ok(());
    };
    let Some(client) = CatalogClient::new(url, args.catalog_key.clone()) else {
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime for the catalog lookup")?;
    if let Some(facts) = runtime.block_on(client.unit_by_serial(&request.serial)) {
        merge_facts(request, facts);
    }
    Ok(())
}

/// CLI entry point: assemble the label inputs, render, present.
pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_logging(args.log_dir.as_deref());

    info!("atelier-labels v{}", env!("CARGO_PKG_VERSION"));

    let mut requests = load_requests(&args)?;
    refresh_from_catalog(&args, &mut requests)?;

    let inputs: Vec<LabelInput> = requests.into_iter().map(LabelRequest::into_input).collect();
    let config = LabelConfig {
        scheme: args.scheme.clone(),
    };

    if args.dry_run {
        let plans = inputs
            .iter()
            .map(|input| label::plan(input, &config))
            .collect::<Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    let bytes = match inputs.as_slice() {
        [single] => label::render(single, &config)?,
        many => label::render_batch(many, &config)?,
    };

    let options = PresentOptions {
        output: args.output.clone(),
        open: !args.no_open,
    };
    let path = present::present(&bytes, &options)?;

    info!(labels = inputs.len(), path = %path.display(), "done");
    println!("{}", path.display());
    Ok(())
}
