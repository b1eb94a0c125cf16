//! gen-grooves: CLI tool for generating MEEP control files from a structure description

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use meep_grooves::{translate, write_atomic, Description, GenError, Templates, TranslationConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gen-grooves")]
#[command(about = "Generate MEEP control files for periodic grooved waveguides")]
#[command(version)]
struct Args {
    /// Structure description (YAML, or JSON by extension)
    #[arg(short, long, default_value = "gen.yaml")]
    input: PathBuf,

    /// Template resource file (built-in templates when omitted)
    #[arg(short, long)]
    resource: Option<PathBuf>,

    /// Output control file (defaults to Output.ctl_file, then the input name with .ctl)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit a short run that only renders the structure
    #[arg(long)]
    structure_only: bool,

    /// Print the generated program to stdout instead of a file
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn output_path(args: &Args, ctl_file: Option<&str>) -> PathBuf {
    if let Some(path) = &args.output {
        return path.clone();
    }
    match ctl_file {
        Some(name) => args
            .input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(name),
        None => args.input.with_extension("ctl"),
    }
}

fn run(args: &Args) -> Result<()> {
    let desc = Description::load(&args.input)
        .with_context(|| format!("Failed to read description: {:?}", args.input))?;

    let templates = match &args.resource {
        Some(path) => Templates::load(path)?,
        None => Templates::builtin()?,
    };

    let config = TranslationConfig {
        input_name: args.input.display().to_string(),
        structure_only: args.structure_only,
        ..TranslationConfig::default()
    };

    let translation = translate(&desc, &templates, &config).context("Translation failed")?;
    for warning in translation.diagnostics.warnings() {
        eprintln!("warning {}: {}", warning.kind.code(), warning.message);
    }

    if args.stdout {
        print!("{}", translation.ctl);
    } else {
        let path = output_path(args, translation.ctl_file.as_deref());
        write_atomic(&path, &translation.ctl)
            .with_context(|| format!("Failed to write output file: {:?}", path))?;
        eprintln!("Generated MEEP control file: {:?}", path);
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<GenError>() {
                Some(e) => eprintln!("error {}: {:#}", e.code(), err),
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
