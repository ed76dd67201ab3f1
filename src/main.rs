use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use trdp_xml_validate::cli::{Cli, OutputFormat, VerbosityLevel};
use trdp_xml_validate::config::ConfigManager;
use trdp_xml_validate::orchestrator::{PassState, StatusBoard};
use trdp_xml_validate::output::{MarkerView, Output, RunSummary};
use trdp_xml_validate::validator::LibXml2SchemaValidator;
use trdp_xml_validate::workbench::{PaneId, UiAction, Workbench};

/// Exit code for an operational failure
const EXIT_ERROR: u8 = 2;
/// Exit code for a schema- or integrity-invalid document
const EXIT_INVALID: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("loading configuration")?;
    let verbosity = config.output.verbosity();
    init_tracing(verbosity);
    debug!(?config, "configuration loaded");

    let validator = LibXml2SchemaValidator::with_cache_capacity(config.cache.max_parsed_schemas);
    let mut bench = Workbench::new(
        validator,
        StatusBoard::new(),
        config.editor.theme.theme_policy(),
        config.files.clone(),
    );

    let started = Instant::now();

    // Both loads queue a change; they collapse into one pass over both documents
    bench.dispatch(UiAction::LoadExampleSchema);
    bench.dispatch(UiAction::LoadExampleInstance);
    let mut reports = bench.process_pending().await?;

    if cli.normalize {
        bench.dispatch(UiAction::Normalize);
        reports = bench.process_pending().await?;
    }

    let normalized = reports.iter().any(|report| report.normalized);
    let Some(mut report) = reports.pop() else {
        anyhow::bail!("no validation pass ran");
    };
    report.normalized = normalized;
    info!(state = ?report.state, passes = bench.orchestrator().passes(), "run finished");

    let panes = &bench;
    let markers = [PaneId::Instance, PaneId::Schema]
        .into_iter()
        .flat_map(move |id| {
            panes
                .pane(id)
                .markers()
                .iter()
                .map(move |marker| MarkerView::from_marker(id, marker))
        })
        .collect();

    let mut summary = RunSummary::new(report, markers, started.elapsed());
    summary.instance = config.files.instance.clone();
    summary.schema = config.files.schema.clone();

    if cli.write
        && normalized
        && let Some(path) = &config.files.instance
    {
        tokio::fs::write(path, bench.instance().text())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        summary.written = Some(path.clone());
    }

    let output = Output::new(verbosity);
    match OutputFormat::from(config.output.format) {
        OutputFormat::Human => print!("{}", output.format_summary(&summary)),
        OutputFormat::Json => println!("{}", output.format_json(&summary)?),
    }

    Ok(match summary.report.state {
        PassState::Valid => ExitCode::SUCCESS,
        PassState::SchemaInvalid | PassState::IntegrityInvalid => ExitCode::from(EXIT_INVALID),
        PassState::Failed => ExitCode::from(EXIT_ERROR),
    })
}
