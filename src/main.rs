use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::Path;

use georoute::{Args, ExportFormat};
use georoute::config::{Config, ConfigFile};
use georoute::error::{TraceError, alternative_targets};
use georoute::export::{export_csv, export_json, generate_report};
use georoute::lookup::{IpApiClient, SelfLocator, resolve_hops};
use georoute::render::render_map;
use georoute::route::{Route, assemble};
use georoute::trace::{TraceInvoker, extract_hops};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_logging(args.verbose);

    let file = ConfigFile::load(args.config.as_deref());
    let config = Config::resolve(&args, &file);

    let route = match run_pipeline(&config).await {
        Ok(route) => route,
        Err(err) => {
            report_trace_failure(&err, &config);
            std::process::exit(1);
        }
    };

    print_route(&route);
    write_output(&route, &config)?;

    Ok(())
}

/// Trace, extract, locate, resolve, assemble.
///
/// Self-location and hop resolution run concurrently; a trace-level failure
/// or an empty extraction halts the pipeline before any resolution happens.
async fn run_pipeline(config: &Config) -> Result<Route, TraceError> {
    println!("Destination: {}", config.target);
    println!("Tracing route to destination (this may take a minute)...");

    let invoker = TraceInvoker::new(config.max_hops, config.timeout);
    let raw = invoker.run(&config.target).await?;

    let hops = extract_hops(&raw);
    if hops.is_empty() {
        return Err(TraceError::NoHopsFound);
    }
    info!("Extracted {} unique hop addresses", hops.len());

    println!("Resolving {} hop locations...", hops.len());

    let locator = SelfLocator::new().map_err(|e| TraceError::TraceFailed {
        status: None,
        stderr: format!("could not build HTTP client: {}", e),
    })?;
    let provider = IpApiClient::new().map_err(|e| TraceError::TraceFailed {
        status: None,
        stderr: format!("could not build HTTP client: {}", e),
    })?;

    let (self_location, results) = tokio::join!(
        locator.locate(),
        resolve_hops(&provider, &hops, config.resolve_mode()),
    );

    Ok(assemble(
        &config.target,
        self_location.coordinates_or_sentinel(),
        &hops,
        &results,
    ))
}

/// Per-hop location lines plus the run summary
fn print_route(route: &Route) {
    println!("\nLocation data:");
    for hop in route.mapped_hops() {
        let place = hop
            .geo
            .as_ref()
            .map(|g| g.place())
            .unwrap_or_default();
        println!("{:>18}     {}", hop.label(), place);
    }
    for hop in &route.unresolved {
        println!("{:>18}     unresolved ({})", hop.address, hop.reason);
    }

    if let Some(ref city) = route.summary.last_city {
        println!(
            "\nYour internet connection made it all the way to {}",
            city
        );
    }
    println!("Total hops attempted: {}", route.summary.hops_attempted);
    println!("Total hops mapped:    {}", route.summary.hops_mapped);
    println!("Total cities visited: {}", route.summary.distinct_cities);
}

/// Write the artifact for the selected format. Non-HTML formats swap the
/// output extension so `-o route.html --format json` lands in `route.json`.
fn write_output(route: &Route, config: &Config) -> Result<()> {
    match config.format {
        ExportFormat::Html => {
            let html = render_map(route);
            write_file(&config.output, html.as_bytes())?;
            println!("\nMap saved to: {}", config.output.display());
        }
        ExportFormat::Json => {
            let path = config.output.with_extension("json");
            let mut buf = Vec::new();
            export_json(route, &mut buf)?;
            write_file(&path, &buf)?;
            println!("\nResults exported to: {}", path.display());
        }
        ExportFormat::Csv => {
            let path = config.output.with_extension("csv");
            let mut buf = Vec::new();
            export_csv(route, &mut buf)?;
            write_file(&path, &buf)?;
            println!("\nResults exported to: {}", path.display());
        }
        ExportFormat::Report => {
            println!();
            generate_report(route, std::io::stdout())?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// Surface a pipeline-halting failure with its remediation hint and, where
/// a different target might help, a short list of well-known alternatives.
fn report_trace_failure(err: &TraceError, config: &Config) {
    eprintln!("\nError: {}", err);
    eprintln!("Hint: {}", err.hint());

    match err {
        TraceError::TraceTimeout(_) => {
            eprintln!("\nTry increasing the timeout:");
            eprintln!("  georoute {} --timeout {}", config.target, config.timeout.as_secs() * 2);
        }
        TraceError::TraceFailed { stderr, .. } => {
            if !stderr.is_empty() {
                eprintln!("\ntraceroute said: {}", stderr);
            }
        }
        _ => {}
    }

    if matches!(
        err,
        TraceError::TraceTimeout(_) | TraceError::TraceFailed { .. } | TraceError::NoHopsFound
    ) {
        eprintln!("\nAlternative targets to try:");
        for target in alternative_targets().iter().take(5) {
            eprintln!("  georoute {}", target);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "georoute=debug" } else { "georoute=warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_secs()
        .init();
}
