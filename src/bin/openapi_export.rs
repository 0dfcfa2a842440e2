//! Writes the service's OpenAPI document to disk so client generators and
//! reviewers can diff it without starting the server.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "openapi-export", about = "Export the product grouping OpenAPI document")]
struct Args {
    /// Destination file; parent directories are created as needed
    #[arg(long, short, default_value = "openapi/product-grouping.v1.json")]
    output: PathBuf,

    /// Print the document instead of writing it
    #[arg(long)]
    stdout: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let json = product_grouping::openapi::render_json().context("failed to render OpenAPI document")?;

    if args.stdout {
        println!("{json}");
        return Ok(());
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("OpenAPI document written to {}", args.output.display());
    Ok(())
}
