//! msaio - alignment format converter
//!
//! ## Usage
//!
//! ```bash
//! msaio <alignment_file>                      # print shape and duplicate identifiers
//! msaio <alignment_file> -o out.sto           # convert, output format from extension
//! msaio -f selex <file> -o - -t fasta         # force formats, write to stdout
//! ```
//!
//! ## Supported Formats
//!
//! - FASTA (.fasta, .fa, .fas, .fna, .faa)
//! - SELEX (.slx, .selex)
//! - Stockholm (.sto, .sth, .stk, .stockholm)

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};

use msaio::formats::fasta::write_fasta;
use msaio::formats::selex::write_selex;
use msaio::formats::{
    detect_format_from_extension, parse_file_with_options, write_file, FileFormat, WriteOptions,
    DEFAULT_LABEL_WIDTH, DEFAULT_LINE_LENGTH,
};
use msaio::model::ParsedAlignment;

/// File format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// FASTA format
    Fasta,
    /// SELEX format
    Selex,
    /// Stockholm format
    Stockholm,
    /// Auto-detect from extension and content
    Auto,
}

impl From<FormatArg> for Option<FileFormat> {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Fasta => Some(FileFormat::Fasta),
            FormatArg::Selex => Some(FileFormat::Selex),
            FormatArg::Stockholm => Some(FileFormat::Stockholm),
            FormatArg::Auto => None,
        }
    }
}

/// msaio - read, check and convert multiple sequence alignments
///
/// Without -o/--output, prints the alignment shape and duplicated identifiers.
/// With -o/--output, converts the alignment and writes it to a file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Alignment file (FASTA, SELEX or Stockholm format)
    file: PathBuf,

    /// Input format (overrides auto-detection)
    #[arg(short = 'f', long = "from", value_enum, default_value = "auto")]
    from: FormatArg,

    /// Output file. Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (default: from output extension, else the input format)
    #[arg(short = 't', long = "to", value_enum, default_value = "auto")]
    to: FormatArg,

    /// FASTA residues per line
    #[arg(long = "line-length", default_value_t = DEFAULT_LINE_LENGTH)]
    line_length: usize,

    /// SELEX/Stockholm label field width
    #[arg(long = "label-width", default_value_t = DEFAULT_LABEL_WIDTH)]
    label_width: usize,
}

/// Prints a short summary of the alignment.
fn print_summary(path: &Path, format: FileFormat, alignment: &ParsedAlignment) {
    println!("{}: {} alignment", path.display(), format);
    println!("  sequences:  {}", alignment.sequence_count());
    println!("  length:     {}", alignment.alignment_length());
    println!(
        "  labels:     {} parsed, {} distinct",
        alignment.parsed_count,
        alignment.registry.len()
    );
    for (key, rows) in alignment.registry.duplicates() {
        println!("  duplicate:  {} (rows {:?})", key, rows);
    }
}

/// Writes the alignment to `output` ("-" for stdout).
fn run_convert(
    alignment: &ParsedAlignment,
    input_format: FileFormat,
    output: &str,
    to: FormatArg,
    options: &WriteOptions,
) -> Result<()> {
    let output_format = Option::<FileFormat>::from(to)
        .or_else(|| detect_format_from_extension(output))
        .unwrap_or(input_format);
    debug!("writing {} as {}", output, output_format);

    let labels = alignment.label_strs();
    if output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        match output_format {
            FileFormat::Fasta => {
                write_fasta(&mut handle, &labels, &alignment.matrix, options.line_length)?
            }
            FileFormat::Selex | FileFormat::Stockholm => write_selex(
                &mut handle,
                &labels,
                &alignment.matrix,
                output_format == FileFormat::Stockholm,
                options.label_width,
            )?,
        }
        handle.flush()?;
    } else {
        let path = write_file(output, output_format, &labels, &alignment.matrix, options)?;
        eprintln!(
            "Wrote {} sequences to {}",
            alignment.sequence_count(),
            path.display()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting msaio on {}", args.file.display());

    if args.line_length == 0 {
        anyhow::bail!("Line length must be positive (got 0)");
    }

    let (alignment, format) = parse_file_with_options(&args.file, args.from.into())?;

    match args.output {
        Some(output) => {
            let options = WriteOptions {
                line_length: args.line_length,
                label_width: args.label_width,
            };
            run_convert(&alignment, format, &output, args.to, &options)?;
        }
        None => print_summary(&args.file, format, &alignment),
    }

    Ok(())
}
