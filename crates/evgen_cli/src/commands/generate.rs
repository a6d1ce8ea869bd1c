//! Generate command - Compile an API spec into a template file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info, warn};

use evgen_iac::{CompileOptions, TemplateCompiler};
use evgen_spec::{DocumentReader, DocumentWriter};

use super::SourceArgs;

/// Output key the template path is published under.
const TEMPLATE_PATH_OUTPUT: &str = "template-path";

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Template to merge the generated resources into
    #[arg(short, long, env = "INPUT_BLUEPRINT")]
    pub blueprint: Option<PathBuf>,

    /// Output file; a .json extension writes JSON, anything else YAML
    #[arg(short, long, env = "INPUT_OUTPUTFILENAME", default_value = "template.yaml")]
    pub output: PathBuf,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let output = generate(&args)?;

    if let Some(github_output) = std::env::var_os("GITHUB_OUTPUT") {
        publish_output(Path::new(&github_output), output)
            .context("Failed to write GITHUB_OUTPUT")?;
    }

    Ok(())
}

/// Compile and write the template, returning where it was written.
fn generate(args: &GenerateArgs) -> Result<&Path> {
    info!("Generating template from {}", args.source.spec.display());

    let spec = args.source.load_spec()?;
    let options = load_blueprint(args.source.compile_options()?, args.blueprint.as_deref())?;

    let compilation = TemplateCompiler::new(options)
        .compile(&spec)
        .context("Failed to compile template")?;

    for collision in &compilation.collisions {
        warn!(
            "{} from {} was overwritten by {}",
            collision.name, collision.existing, collision.replacement
        );
    }

    DocumentWriter::write(&args.output, &compilation.template)
        .with_context(|| format!("Failed to write template {}", args.output.display()))?;

    info!(
        "Successfully transformed API spec into {}",
        args.output.display()
    );

    Ok(args.output.as_path())
}

fn load_blueprint(options: CompileOptions, blueprint: Option<&Path>) -> Result<CompileOptions> {
    match blueprint {
        Some(path) => {
            debug!("Using blueprint {}", path.display());
            let document = DocumentReader::read_document(path)
                .with_context(|| format!("Failed to read blueprint {}", path.display()))?;
            Ok(options.with_blueprint(document))
        }
        None => Ok(options),
    }
}

/// Append `template-path=<output>` to a CI output file.
fn publish_output(output_file: &Path, template: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)?;
    writeln!(file, "{}={}", TEMPLATE_PATH_OUTPUT, template.display())
}
