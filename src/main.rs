mod fit;
mod input;
mod logging;
mod model;
mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::input::platemap::load_platemap;
use crate::input::{InputError, InputLayout, load_input};
use crate::model::profile::{AnalysisProfile, ControlScope, LabelStyle, ProfileError};
use crate::pipeline::stage2_controls::{ControlAggregate, run_stage2};
use crate::pipeline::stage3_normalize::{normalize, run_stage3, run_stage3_knockdown};
use crate::pipeline::stage4_aggregate::run_stage4;
use crate::pipeline::stage5_fit::run_stage5;
use crate::pipeline::stage6_report::{Stage6Input, write_reports};
use crate::report::{ReportError, format_f64_6};

const TOOL_NAME: &str = "kira-viabilityqc";

#[derive(Parser, Debug)]
#[command(name = "kira-viabilityqc")]
#[command(
    version,
    about = "Control-normalized cell death and Hill dose-response fits from plate-reader luminescence",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize, aggregate and (for knockdown input) fit, then write reports
    Run(RunArgs),
    /// Cell death for one value against explicit control readings
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Input table (.csv, .tsv or .gz)
    #[arg(long)]
    input: PathBuf,

    #[arg(long, value_enum)]
    layout: InputLayout,

    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Plate map TSV (plate, well, role, label); required for grid input
    #[arg(long)]
    platemap: Option<PathBuf>,

    /// JSON analysis profile; defaults are used when omitted
    #[arg(long)]
    profile: Option<PathBuf>,

    #[arg(long, value_enum)]
    control_scope: Option<ControlScope>,

    #[arg(long, value_enum)]
    label_style: Option<LabelStyle>,

    /// Keep every observation regardless of cell death value
    #[arg(long)]
    no_range_filter: bool,

    /// Collapse technical replicates (long layout) to their mean first
    #[arg(long)]
    average_replicates: bool,
}

#[derive(Args, Debug, Clone)]
struct NormalizeArgs {
    #[arg(long, allow_negative_numbers = true)]
    value: f64,

    /// Reference-high readings, comma separated
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    high: Vec<f64>,

    /// Reference-low readings, comma separated
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    low: Vec<f64>,
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone)]
struct RunConfig {
    input: PathBuf,
    layout: InputLayout,
    out_dir: PathBuf,
    platemap: Option<PathBuf>,
    profile_path: Option<PathBuf>,
    profile: AnalysisProfile,
}

impl RunConfig {
    /// Profile file first, then command line overrides.
    fn from_args(args: RunArgs) -> Result<Self, PipelineError> {
        let mut profile = match &args.profile {
            Some(path) => AnalysisProfile::from_json_file(path)?,
            None => AnalysisProfile::default_v1(),
        };
        if let Some(scope) = args.control_scope {
            profile.control_scope = scope;
        }
        if let Some(style) = args.label_style {
            profile.label_style = style;
        }
        if args.no_range_filter {
            profile.range_filter = None;
        }
        if args.average_replicates {
            profile.average_replicates = true;
        }
        profile.validate()?;

        Ok(Self {
            input: args.input,
            layout: args.layout,
            out_dir: args.out,
            platemap: args.platemap,
            profile_path: args.profile,
            profile,
        })
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), PipelineError> {
    match command {
        Command::Run(args) => {
            let config = RunConfig::from_args(args)?;
            run_pipeline(&config)
        }
        Command::Normalize(args) => {
            print!("{}", render_normalize(args.value, &args.high, &args.low));
            Ok(())
        }
    }
}

fn run_pipeline(config: &RunConfig) -> Result<(), PipelineError> {
    let profile = &config.profile;
    if let Some(path) = &config.profile_path {
        tracing::info!(profile = %path.display(), "using analysis profile");
    }

    let platemap = match &config.platemap {
        Some(path) => Some(load_platemap(path)?),
        None => None,
    };
    if platemap.is_some() && config.layout != InputLayout::Grid {
        tracing::warn!(
            "--platemap is only used by the grid layout; ignoring it for {}",
            config.layout.as_str()
        );
    }

    let bundle = load_input(config.layout, &config.input, platemap.as_ref(), profile)?;

    let (stage2, stage3) = match config.layout {
        InputLayout::Knockdown => (None, run_stage3_knockdown(&bundle.knockdown, profile)),
        InputLayout::Grid | InputLayout::Long => {
            let stage2 = run_stage2(&bundle.readings, profile.control_scope);
            let stage3 = run_stage3(&bundle.readings, &stage2, profile);
            (Some(stage2), stage3)
        }
    };

    let groups = run_stage4(&stage3.observations);
    tracing::info!(groups = groups.len(), "treatment groups aggregated");

    let fits = match config.layout {
        InputLayout::Knockdown => run_stage5(&stage3.observations, &profile.fit),
        InputLayout::Grid | InputLayout::Long => Vec::new(),
    };

    let input = Stage6Input {
        tool_name: TOOL_NAME.to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        layout: config.layout,
        input_path: bundle.source_path.display().to_string(),
        platemap_path: config.platemap.as_ref().map(|p| p.display().to_string()),
        profile,
        load_audit: &bundle.audit,
        controls: stage2.as_ref(),
        observations: &stage3.observations,
        normalize_audit: &stage3.audit,
        groups: &groups,
        fits: &fits,
    };
    write_reports(&input, &config.out_dir)?;
    Ok(())
}

fn render_normalize(value: f64, high: &[f64], low: &[f64]) -> String {
    let agg = ControlAggregate::from_values("cli", high, low);
    let result = normalize(value, agg.high_avg, agg.low_avg);
    if result.degenerate {
        tracing::warn!(
            high_avg = agg.high_avg,
            low_avg = agg.low_avg,
            "high controls do not exceed low controls; cell death set to 0"
        );
    }
    let mut out = String::new();
    out.push_str(&format!("high_avg\t{}\n", format_f64_6(agg.high_avg)));
    out.push_str(&format!("low_avg\t{}\n", format_f64_6(agg.low_avg)));
    out.push_str(&format!("denominator\t{}\n", format_f64_6(agg.denominator())));
    out.push_str(&format!("value\t{}\n", format_f64_6(value)));
    out.push_str(&format!("cell_death_pct\t{}\n", format_f64_6(result.death_pct)));
    out.push_str(&format!(
        "survival_pct\t{}\n",
        format_f64_6(100.0 - result.death_pct)
    ));
    out.push_str(&format!("degenerate\t{}\n", result.degenerate));
    out
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
