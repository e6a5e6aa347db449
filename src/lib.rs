//! # msaio - Multiple Sequence Alignment I/O
//!
//! Reads FASTA and SELEX/Stockholm alignments into a fixed-width character
//! matrix, a label list and a label registry, and writes them back out.
//!
//! ## Architecture
//!
//! - `model`: output buffer, alignment matrix, label registry
//! - `formats`: format detection, errors and dispatch
//!   - `formats::label`: label and region-suffix scanning
//!   - `formats::fasta`: FASTA reader and writer
//!   - `formats::selex`: SELEX/Stockholm reader and writer
//!
//! ## Example
//!
//! ```
//! use msaio::formats::fasta::parse_fasta_str;
//!
//! let alignment = parse_fasta_str(">a\nACGT\n>b\nACGG\n").unwrap();
//! assert_eq!(alignment.matrix.shape(), (2, 4));
//! assert_eq!(alignment.registry.get("b"), Some(&[1][..]));
//! ```

pub mod formats;
pub mod model;
