//! CLI argument parsing for the PXO analyzer.
//!
//! The CLI is thin: it turns flags into the same form fields the HTTP surface
//! accepts and hands them to the library.
use clap::{Parser, Subcommand, ValueEnum};
use pxo::report::Strategy;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pxo",
    version,
    about = "PXO product analysis from a single screenshot",
    after_help = "Commands:\n  analyze --image <png> --problem <text> --segment <text> --metric <text>\n                        Run the 12-step analysis (event stream or JSON report)\n  serve                 Serve the analysis over HTTP\n  steps                 List the analysis steps\n\nExamples:\n  pxo analyze --image checkout.png --problem \"Users abandon checkout\" \\\n      --segment \"new users\" --metric conversion\n  pxo analyze --image checkout.png ... --mode report --out report.json\n  pxo serve --bind 0.0.0.0:3000",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Serve(ServeArgs),
    Steps(StepsArgs),
}

/// How `analyze` delivers its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
    /// Server-pushed `data: {...}` frames as each stage finishes
    #[default]
    Stream,
    /// One JSON document once every stage has finished
    Report,
}

/// Analyze command inputs. Field flags mirror the HTTP form fields.
#[derive(Parser, Debug)]
#[command(about = "Analyze a product screenshot")]
pub struct AnalyzeArgs {
    /// Screenshot to analyze (png, jpeg, gif or webp)
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Override the image media type (e.g. image/png)
    #[arg(long, value_name = "MIME")]
    pub media_type: Option<String>,

    /// Problem statement
    #[arg(long, value_name = "TEXT")]
    pub problem: Option<String>,

    /// Impacted user segment
    #[arg(long, value_name = "TEXT")]
    pub segment: Option<String>,

    /// Metric at risk
    #[arg(long, value_name = "TEXT")]
    pub metric: Option<String>,

    /// Hypothesis: what to improve
    #[arg(long, value_name = "TEXT")]
    pub hypothesis_x: Option<String>,

    /// Hypothesis: for which segment
    #[arg(long, value_name = "TEXT")]
    pub hypothesis_segment: Option<String>,

    /// Hypothesis: which metric improves
    #[arg(long, value_name = "TEXT")]
    pub hypothesis_metric: Option<String>,

    /// Hypothesis: the behavior that explains it
    #[arg(long, value_name = "TEXT")]
    pub hypothesis_behavior: Option<String>,

    /// Risk level: Low, Medium or High
    #[arg(long, value_name = "LEVEL")]
    pub risk: Option<String>,

    /// Delivery mode
    #[arg(long, value_enum, default_value_t = DeliveryMode::Stream)]
    pub mode: DeliveryMode,

    /// Report strategy [default: sequential]; requires --mode report
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Replay canned model replies from a JSON array instead of calling the API
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Write output here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Config file (JSON); defaults to $PXO_CONFIG or built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Serve command inputs.
#[derive(Parser, Debug)]
#[command(about = "Serve the analysis over HTTP")]
pub struct ServeArgs {
    /// Listen address; overrides config and $PXO_BIND
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Replay canned model replies from a JSON array instead of calling the API
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Config file (JSON); defaults to $PXO_CONFIG or built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Steps command inputs.
#[derive(Parser, Debug)]
#[command(about = "List the analysis steps in execution order")]
pub struct StepsArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
