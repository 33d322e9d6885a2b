//! CLI harness for compfill - applies a comparables payload to a workbook
//! on disk, bypassing the request layer entirely.
//!
//! Usage:
//!   compfill template.xlsx --data payload.json
//!   cat payload.json | compfill template.xlsx -o filled.xlsx --summary

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(
    version,
    about = "Fill Comparable_N sheets of an appraisal workbook from a JSON payload."
)]
struct Args {
    /// Workbook to fill (XLSX).
    workbook: PathBuf,

    /// JSON payload file; `-` or omitted reads stdin.
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Where to write the patched workbook [default: <workbook>_out.xlsx].
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the cell values of every Comparable_N sheet afterwards.
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let workbook = fs::read(&args.workbook)
        .with_context(|| format!("reading workbook {}", args.workbook.display()))?;
    let payload = read_payload(args.data.as_deref())?;

    let patched = compfill::apply_comparables_bytes(&workbook, &payload)
        .context("applying comparables")?;

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.workbook));
    fs::write(&output, &patched)
        .with_context(|| format!("writing output {}", output.display()))?;
    eprintln!("Wrote {} ({} bytes)", output.display(), patched.len());

    if args.summary {
        print_summary(&patched)?;
    }

    Ok(())
}

fn read_payload(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read(path).with_context(|| format!("reading payload {}", path.display()))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading payload from stdin")?;
            Ok(buf)
        }
    }
}

/// `template.xlsx` -> `template_out.xlsx`, next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    input.with_file_name(format!("{stem}_out.xlsx"))
}

fn print_summary(patched: &[u8]) -> Result<()> {
    let workbook = compfill::Workbook::load(patched)?;
    let comparables: Vec<String> = workbook
        .sheet_names()
        .filter(|name| name.starts_with("Comparable_"))
        .map(ToString::to_string)
        .collect();

    for name in comparables {
        let Some(values) = workbook.sheet_values(&name)? else {
            continue;
        };
        println!("{name}:");
        for (cell, value) in values {
            println!("  {cell} = {value}");
        }
    }

    Ok(())
}
