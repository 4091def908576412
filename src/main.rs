use anyhow::{anyhow, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use pxo::catalog::STEP_CATALOG;
use pxo::config::{resolve_api_key, resolve_config, PxoConfig};
use pxo::gateway::{AnthropicGateway, ModelGateway, ScriptedGateway};
use pxo::inputs::{AnalysisInputs, MediaType, RawForm, RawImage};
use pxo::pipeline::run_pipeline;
use pxo::report::{build_report, ErrorDocument};
use pxo::server::{self, AppState};
use pxo::stream::SseWriter;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{AnalyzeArgs, Command, DeliveryMode, RootArgs, ServeArgs, StepsArgs};

const EXIT_INVALID_INPUT: u8 = 2;
const EXIT_PIPELINE_FAILED: u8 = 1;

fn main() -> Result<ExitCode> {
    init_tracing();
    let args = RootArgs::parse();

    match args.command {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Serve(args) => cmd_serve(args),
        Command::Steps(args) => cmd_steps(args),
    }
}

/// Logs go to stderr so stdout stays a clean frame or JSON stream.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    if args.mode == DeliveryMode::Stream && args.strategy.is_some() {
        RootArgs::command()
            .error(
                ErrorKind::ArgumentConflict,
                "--strategy only applies to --mode report",
            )
            .exit();
    }
    let config = resolve_config(args.config.as_deref())?;

    // Validate before building the gateway so bad input never needs a key.
    let form = raw_form(&args)?;
    let inputs = match AnalysisInputs::from_form(form) {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("invalid input: {err}");
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    let gateway = build_gateway(&config, args.replay.as_deref())?;
    let output = open_output(args.out.as_deref())?;

    match args.mode {
        DeliveryMode::Stream => {
            let mut writer = SseWriter::new(output, STEP_CATALOG.len());
            let result = run_pipeline(
                gateway.as_ref(),
                &STEP_CATALOG,
                &inputs,
                &config.budgets,
                &mut writer,
            );
            writer.into_inner().flush().context("flush event stream")?;
            match result {
                Ok(outcome) => {
                    tracing::info!(sections = outcome.sections.len(), "analysis complete");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("analysis failed: {err}");
                    Ok(ExitCode::from(EXIT_PIPELINE_FAILED))
                }
            }
        }
        DeliveryMode::Report => {
            let result = build_report(
                gateway.as_ref(),
                &STEP_CATALOG,
                &inputs,
                &config.budgets,
                args.strategy.unwrap_or_default(),
            );
            match result {
                Ok(report) => {
                    write_json(output, &report)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("analysis failed: {err}");
                    write_json(output, &ErrorDocument::new(err.kind(), &err))?;
                    Ok(ExitCode::from(EXIT_PIPELINE_FAILED))
                }
            }
        }
    }
}

fn cmd_serve(args: ServeArgs) -> Result<ExitCode> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let gateway = build_gateway(&config, args.replay.as_deref())?;
    let state = AppState::new(gateway, config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(server::serve(state))?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_steps(args: StepsArgs) -> Result<ExitCode> {
    if args.json {
        let text = serde_json::to_string_pretty(&STEP_CATALOG).context("serialize steps")?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }
    for step in &STEP_CATALOG {
        println!("{:>2}  {:<28} {}", step.id, step.title, step.subtitle);
    }
    Ok(ExitCode::SUCCESS)
}

fn build_gateway(config: &PxoConfig, replay: Option<&Path>) -> Result<Arc<dyn ModelGateway>> {
    if let Some(path) = replay {
        tracing::info!(path = %path.display(), "replaying canned model replies");
        return Ok(Arc::new(ScriptedGateway::load(path)?));
    }
    let api_key = resolve_api_key()
        .ok_or_else(|| anyhow!("no API key; set PXO_API_KEY or ANTHROPIC_API_KEY"))?;
    let gateway = AnthropicGateway::new(config, api_key)?;
    tracing::debug!(model = gateway.model(), "using anthropic gateway");
    Ok(Arc::new(gateway))
}

/// Translate flags into the same raw form the HTTP surface collects.
fn raw_form(args: &AnalyzeArgs) -> Result<RawForm> {
    let image = match &args.image {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read image {}", path.display()))?;
            let content_type = args.media_type.clone().unwrap_or_else(|| {
                // Unknown extensions fall through to content sniffing.
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(MediaType::from_extension)
                    .map_or("application/octet-stream", MediaType::as_mime)
                    .to_string()
            });
            Some(RawImage {
                bytes,
                content_type: Some(content_type),
            })
        }
        None => None,
    };
    Ok(RawForm {
        image,
        problem_statement: args.problem.clone(),
        user_segment: args.segment.clone(),
        metric_at_risk: args.metric.clone(),
        hypothesis_x: args.hypothesis_x.clone(),
        hypothesis_segment: args.hypothesis_segment.clone(),
        hypothesis_metric: args.hypothesis_metric.clone(),
        hypothesis_behavior: args.hypothesis_behavior.clone(),
        risk_level: args.risk.clone(),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn write_json<T: serde::Serialize>(mut output: Box<dyn Write>, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut output, value).context("serialize report")?;
    writeln!(output).context("write report")?;
    output.flush().context("flush report")?;
    Ok(())
}
