use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use forestgen::ingest::{self, ParsedData};
use forestgen::numeric::format_full;
use forestgen::parser::extract_rows;
use forestgen::{
    ForestPipeline, LayoutStyle, PlotConfig, PreparedPlot, RscriptConfig, RscriptExecutor,
    ValidationPolicy,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forestgen")]
#[command(about = "Generate R forest plot scripts from effect estimate tables", long_about = None)]
struct Cli {
    /// Log derived values and progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the data and print the R script
    Generate(GenerateArgs),
    /// Generate the script and render it to PNG with Rscript
    Render(RenderArgs),
    /// Print the rows embedded in a generated script as CSV
    Inspect {
        /// Script produced by `generate`
        script: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleArg {
    Layered,
    Table,
}

impl From<StyleArg> for LayoutStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Layered => LayoutStyle::Layered,
            StyleArg::Table => LayoutStyle::Table,
        }
    }
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Data file (.csv or .json); CSV is read from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Plot configuration (JSON, camelCase keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured rendering style
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Require value and both confidence bounds on every row
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Write the script here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output PNG path
    #[arg(long)]
    png: PathBuf,

    /// Also keep the generated script
    #[arg(long)]
    script_out: Option<PathBuf>,

    /// Rscript binary
    #[arg(long, default_value = "Rscript")]
    rscript: PathBuf,

    /// Install missing R packages instead of failing
    #[arg(long)]
    install_packages: bool,

    /// Seconds before the R process is killed
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("forestgen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn report(errors: &[String], warnings: &[String]) {
    for e in errors {
        eprintln!("Error: {}", e);
    }
    for w in warnings {
        eprintln!("Warning: {}", w);
    }
}

fn load(args: &InputArgs) -> Result<(ParsedData, PlotConfig)> {
    let mut config = match &args.config {
        Some(path) => PlotConfig::from_path(path)?,
        None => PlotConfig::default(),
    };
    if let Some(style) = args.style {
        config.layout_style = style.into();
    }
    if args.strict {
        config.validation = ValidationPolicy::Strict;
    }

    let parsed = match &args.input {
        Some(path) => ingest::read_path(path, config.validation)?,
        None => ingest::read_csv_from_stdin(config.validation)
            .context("Failed to read CSV from stdin")?,
    };
    report(&parsed.errors, &parsed.warnings);
    Ok((parsed, config))
}

fn prepare(args: &InputArgs) -> Result<PreparedPlot> {
    let (parsed, config) = load(args)?;
    let prepared = forestgen::prepare(&parsed.rows, &config).context("Failed to generate script")?;
    report(&prepared.validation.errors, &prepared.validation.warnings);
    Ok(prepared)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write '{}'", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")
        }
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let prepared = prepare(&args.input)?;
    write_output(args.output.as_deref(), prepared.script.as_bytes())
}

fn render(args: RenderArgs) -> Result<()> {
    let (parsed, config) = load(&args.input)?;

    let mut executor = RscriptExecutor::new(RscriptConfig {
        program: args.rscript.clone(),
        install_missing: args.install_packages,
        timeout: Some(Duration::from_secs(args.timeout)),
        ..RscriptConfig::default()
    });
    executor.initialize().context("R runtime is not available")?;

    let pipeline = ForestPipeline::new(executor);
    let rendered = pipeline
        .render(&parsed.rows, &config)
        .context("Failed to render plot")?;
    report(
        &rendered.prepared.validation.errors,
        &rendered.prepared.validation.warnings,
    );

    if let Some(path) = &args.script_out {
        write_output(Some(path), rendered.prepared.script.as_bytes())?;
    }
    write_output(Some(&args.png), &rendered.image.png)?;
    eprintln!(
        "Wrote {}x{} PNG to {}",
        rendered.image.width,
        rendered.image.height,
        args.png.display()
    );
    Ok(())
}

fn inspect(script: &Path) -> Result<()> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read '{}'", script.display()))?;
    let rows = extract_rows(&text)?;

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["outcome", "value", "ci_lower", "ci_upper", "weight"])?;
    let num = |v: Option<f64>| v.and_then(format_full).unwrap_or_default();
    for row in rows {
        writer.write_record([
            row.outcome,
            num(row.value),
            num(row.ci_lower),
            num(row.ci_upper),
            num(row.weight),
        ])?;
    }
    writer.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Render(args) => render(args),
        Commands::Inspect { script } => inspect(&script),
    }
}
