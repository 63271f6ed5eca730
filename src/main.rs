//! Product Scanner CLI
//!
//! Command-line interface for validating codes and running the scan
//! pipeline end to end, against the mock camera or a native one.

use clap::{Parser, Subcommand};
use product_scanner::{
    capture::{CameraBackend, MockBackend, ScannerConfig},
    decode::{Decoder, PolarityFallback, ScriptedDecoder},
    lifecycle::{LifecycleController, ScanOutcome, TracingObserver},
    lookup::{LookupOutcome, ProductLookup, StaticCatalog},
    scan::{CancelToken, FixedRateTicker},
    CodeValidator, ScanMetrics, ValidatedCode,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Barcode acquisition pipeline for retail products.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate raw code strings.
    Validate {
        #[arg(required = true)]
        raw: Vec<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a scan attempt, against the mock camera unless `--native` is set.
    Scan {
        /// Use the platform camera and the pixel decoder.
        #[arg(long)]
        native: bool,

        /// Texts the scripted decoder reports, in order.
        #[arg(long, num_args = 1.., default_value = "5901234123457")]
        codes: Vec<String>,

        /// Frames that decode to nothing before the first text.
        #[arg(long, default_value_t = 10)]
        misses: usize,

        /// Catalog JSON used to look up the resolved code.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Validate a typed code and look it up.
    Manual {
        text: String,

        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Acquire a native camera, grab a few frames and release it.
    #[cfg(feature = "camera")]
    Probe {
        #[arg(long, default_value_t = 5)]
        frames: u32,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ScannerConfig::from_file(path)?,
        None => ScannerConfig::default(),
    };

    match args.command {
        Command::Validate { raw, json } => validate(&config, &raw, json),
        Command::Scan {
            native,
            codes,
            misses,
            catalog,
        } => scan(&config, native, codes, misses, catalog.as_deref()),
        Command::Manual { text, catalog } => manual(&config, &text, catalog.as_deref()),
        #[cfg(feature = "camera")]
        Command::Probe { frames } => probe(&config, frames),
    }
}

fn validate(config: &ScannerConfig, raw: &[String], json: bool) -> Result<(), Box<dyn Error>> {
    let validator = CodeValidator::new(&config.validation);
    for input in raw {
        let result = validator.validate(input);
        if json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print_code(input, &result);
        }
    }
    Ok(())
}

fn print_code(input: &str, code: &ValidatedCode) {
    match (&code.format, &code.reason) {
        (Some(format), _) => {
            let region = code.region.unwrap_or("unassigned");
            let check = match code.check_digit_ok {
                Some(true) => "ok",
                Some(false) => "mismatch",
                None => "n/a",
            };
            println!(
                "{input}: {} {format} region={region} domestic={} check_digit={check}",
                code.code, code.domestic
            );
        }
        (None, reason) => println!("{input}: rejected ({})", reason.as_deref().unwrap_or("")),
    }
}

fn scan(
    config: &ScannerConfig,
    native: bool,
    codes: Vec<String>,
    misses: usize,
    catalog: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let metrics = ScanMetrics::new()?;
    #[cfg(feature = "metrics")]
    spawn_metrics_server(config.output.metrics_port, &metrics);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling scan");
        handler_token.cancel();
    })?;

    info!("Product Scanner v{}", product_scanner::VERSION);
    let outcome = if native {
        native_scan(config, &metrics, &cancel)?
    } else {
        let decoder = with_polarity(config, ScriptedDecoder::after_misses(misses, codes));
        run_scan(MockBackend::new(), decoder, config, &metrics, &cancel)
    };

    match outcome {
        Some(ScanOutcome::Resolved(code)) => {
            print_code(&code.code, &code);
            if let Some(path) = catalog {
                lookup(path, &code.code)?;
            }
        }
        Some(ScanOutcome::Failed(failure)) => {
            eprintln!("{failure}");
            eprintln!("{}", failure.remediation());
            eprintln!("Type the code instead: product-scanner manual <CODE>");
        }
        Some(ScanOutcome::Cancelled) => println!("Scan cancelled"),
        None => {}
    }

    tracing::debug!(metrics = %metrics.encode()?, "Final metrics");
    Ok(())
}

/// Wraps `decoder` in an inverted-polarity retry when configured.
fn with_polarity<D: Decoder + 'static>(config: &ScannerConfig, decoder: D) -> Box<dyn Decoder> {
    if config.scan.try_inverted {
        Box::new(PolarityFallback::new(decoder))
    } else {
        Box::new(decoder)
    }
}

fn run_scan<B: CameraBackend, D: Decoder>(
    backend: B,
    decoder: D,
    config: &ScannerConfig,
    metrics: &ScanMetrics,
    cancel: &CancelToken,
) -> Option<ScanOutcome> {
    let mut controller = LifecycleController::new(backend, decoder, TracingObserver, config)
        .with_metrics(metrics.clone());
    controller.start_scan();
    let mut ticks = FixedRateTicker::new(config.scan.tick_interval());
    controller.run(&mut ticks, cancel)
}

#[cfg(all(feature = "camera", feature = "decoder"))]
fn native_scan(
    config: &ScannerConfig,
    metrics: &ScanMetrics,
    cancel: &CancelToken,
) -> Result<Option<ScanOutcome>, Box<dyn Error>> {
    use product_scanner::capture::NativeBackend;
    use product_scanner::decode::RxingDecoder;

    let decoder = with_polarity(config, RxingDecoder::new());
    Ok(run_scan(NativeBackend::new(), decoder, config, metrics, cancel))
}

#[cfg(not(all(feature = "camera", feature = "decoder")))]
fn native_scan(
    _config: &ScannerConfig,
    _metrics: &ScanMetrics,
    _cancel: &CancelToken,
) -> Result<Option<ScanOutcome>, Box<dyn Error>> {
    Err("native scanning needs a build with --features camera,decoder".into())
}

fn manual(config: &ScannerConfig, text: &str, catalog: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let code = CodeValidator::new(&config.validation).validate(text);
    print_code(text, &code);
    if let (true, Some(path)) = (code.valid, catalog) {
        lookup(path, &code.code)?;
    }
    Ok(())
}

fn lookup(path: &Path, code: &str) -> Result<(), Box<dyn Error>> {
    let catalog = StaticCatalog::from_file(path)?;
    match catalog.lookup_product(code)? {
        LookupOutcome::Found(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        LookupOutcome::NotFound => println!("{code}: product not found in catalog"),
    }
    Ok(())
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16, metrics: &ScanMetrics) {
    use product_scanner::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), metrics.clone());
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "Failed to start metrics runtime");
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!(error = %e, "Metrics server stopped");
        }
    });
}

#[cfg(feature = "camera")]
fn probe(config: &ScannerConfig, frames: u32) -> Result<(), Box<dyn Error>> {
    use product_scanner::capture::{CameraSessionManager, NativeBackend};
    use product_scanner::scan::TickSource;

    let mut cameras = CameraSessionManager::from_config(NativeBackend::new(), &config.capture);
    let session = cameras.acquire(&config.capture.constraints)?;
    println!(
        "{} ({}) via constraint #{} at {}x{}",
        session.device().label,
        session.device().id,
        session.constraint_index(),
        session.resolution().0,
        session.resolution().1
    );

    let mut ticks = FixedRateTicker::new(config.scan.tick_interval());
    let mut grabbed = 0;
    let mut waited = 0;
    if let Some(session) = cameras.session_mut() {
        while grabbed < frames && waited < frames * 100 {
            waited += 1;
            if session.frame_ready() {
                let frame = session.grab()?;
                println!("{frame:?}");
                grabbed += 1;
            }
            ticks.wait_next();
        }
    }

    cameras.release();
    Ok(())
}
