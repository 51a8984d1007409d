//! comfile CLI
//!
//! Usage:
//!   comfile <TEMPLATE> --resources <DIR> --output <FILE>
//!   comfile --manifest <FILE>
//!
//! Options:
//!   -r, --resources <DIR>     Root directory for injected files
//!   -o, --output <FILE>       Destination file
//!   -m, --manifest <FILE>     TOML manifest listing compile jobs
//!       --indent-unit <STR>   Indentation per level (default: tab)
//!   -v, --verbose             More logging (repeatable)
//!   -q, --quiet               Only log errors

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use comfile::{Manifest, TemplateSpec};

#[derive(Parser)]
#[command(name = "comfile")]
#[command(about = "Compile templates by injecting indented resource files")]
struct Cli {
    /// Template file to compile
    #[arg(required_unless_present = "manifest", conflicts_with = "manifest")]
    template: Option<PathBuf>,

    /// Root directory that injection references are resolved against
    #[arg(short, long, requires = "template")]
    resources: Option<PathBuf>,

    /// Destination file
    #[arg(short, long, requires = "template")]
    output: Option<PathBuf>,

    /// TOML manifest listing compile jobs
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// String used for one level of indentation (overrides the manifest)
    #[arg(long)]
    indent_unit: Option<String>,

    /// Increase logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let jobs = match jobs(&cli) {
        Ok(jobs) => jobs,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    let mut failed = false;
    for (spec, output) in &jobs {
        match spec.compile(output) {
            Ok(()) => info!(
                template = %spec.template_path.display(),
                output = %output.display(),
                "compiled"
            ),
            Err(e) => {
                eprintln!("Error: {}", e.report());
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Build the compile jobs from either the manifest or the positional arguments
fn jobs(cli: &Cli) -> Result<Vec<(TemplateSpec, PathBuf)>, String> {
    let mut jobs = if let Some(path) = &cli.manifest {
        let manifest = Manifest::from_file(path)
            .map_err(|e| format!("loading manifest '{}': {}", path.display(), e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.specs(base)
    } else {
        let (Some(template), Some(resources), Some(output)) = (&cli.template, &cli.resources, &cli.output)
        else {
            return Err("a template needs both --resources and --output".to_string());
        };
        vec![(TemplateSpec::new(template, resources), output.clone())]
    };

    if let Some(unit) = &cli.indent_unit {
        for (spec, _) in &mut jobs {
            spec.indent_unit = unit.clone();
        }
    }

    Ok(jobs)
}

fn init_tracing(cli: &Cli) {
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
}
