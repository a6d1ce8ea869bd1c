//! Validate command - Compile an API spec and report without writing.

use std::fmt::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use evgen_iac::{Compilation, TemplateCompiler};

use super::{SourceArgs, ValidationFailed};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating API spec: {}", args.source.spec.display());

    let spec = args.source.load_spec()?;
    let options = args.source.compile_options()?;

    println!("📋 Compiling {}...", spec.title().unwrap_or("API spec"));

    let compilation = TemplateCompiler::new(options)
        .compile(&spec)
        .context("Validation failed")?;

    let mut report = String::new();
    render_report(&compilation, &mut report)?;
    print!("{}", report);

    if compilation.has_collisions() {
        return Err(ValidationFailed {
            problems: compilation.collisions.len(),
        }
        .into());
    }

    Ok(())
}

fn render_report(compilation: &Compilation, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "   🌐 Base URL: {}", compilation.base_url)?;

    if compilation.destinations.is_empty() {
        writeln!(out, "   ⚠️  No API destinations would be generated")?;
    } else {
        writeln!(
            out,
            "   ✅ {} API destination(s):",
            compilation.destinations.len()
        )?;
        for destination in &compilation.destinations {
            writeln!(
                out,
                "      - {} ({} {}) on '{}'",
                destination.name,
                destination.method.to_uppercase(),
                destination.path,
                destination.trigger
            )?;
        }
    }

    for skipped in &compilation.skipped {
        writeln!(
            out,
            "   ⚠️  Skipped {} {}: {}",
            skipped.method.to_uppercase(),
            skipped.path,
            skipped.reason
        )?;
    }

    for unresolved in &compilation.unresolved_references {
        let location = match &unresolved.method {
            Some(method) => format!("{} {}", method.to_uppercase(), unresolved.path),
            None => unresolved.path.clone(),
        };
        writeln!(
            out,
            "   ⚠️  Unresolved parameter {} on {}",
            unresolved.reference, location
        )?;
    }

    if compilation.has_collisions() {
        writeln!(out, "   ❌ Resource name collisions:")?;
        for collision in &compilation.collisions {
            writeln!(
                out,
                "      - {} from {} is overwritten by {}",
                collision.name, collision.existing, collision.replacement
            )?;
        }
    }

    writeln!(out)?;
    if compilation.has_collisions() {
        writeln!(out, "❌ Validation failed. Please fix the issues above.")?;
    } else {
        writeln!(out, "✅ Validation passed!")?;
    }

    Ok(())
}
