//! Data model for parsed alignments.
//!
//! This module contains the structures shared by every format:
//! - `MatrixBuffer`: the caller-allocated, fixed-capacity output buffer
//! - `AlignmentMatrix`: the buffer reinterpreted as rows × columns
//! - `LabelRegistry`: identifier → ordered row indices
//! - `ParsedAlignment`: everything a parse call returns

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::formats::{MsaError, MsaResult};

/// Append-only byte buffer with a hard capacity.
///
/// The capacity is set once by the caller and never grows: an append that
/// would cross it fails with `MsaError::Capacity`. Memory is reserved up
/// front when the allocator grants it, otherwise as bytes arrive.
#[derive(Debug, Clone)]
pub struct MatrixBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl MatrixBuffer {
    /// Creates an empty buffer able to hold exactly `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut data = Vec::new();
        // an oversized bound is still a valid bound
        let _ = data.try_reserve_exact(capacity);
        Self { data, capacity }
    }

    /// Creates a buffer sized for `rows * columns` bytes.
    pub fn for_shape(rows: usize, columns: usize) -> Self {
        Self::with_capacity(rows.saturating_mul(columns))
    }

    /// Creates a buffer large enough for any alignment stored in `path`.
    ///
    /// Every sequence byte is also a file byte, so the file length is a
    /// worst-case bound.
    pub fn for_file<P: AsRef<Path>>(path: P) -> MsaResult<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| MsaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_capacity(metadata.len() as usize))
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) -> MsaResult<()> {
        if self.data.len() >= self.capacity {
            return Err(self.capacity_error());
        }
        self.data.try_reserve(1).map_err(|_| self.capacity_error())?;
        self.data.push(byte);
        Ok(())
    }

    /// Appends a run of bytes, all or nothing.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> MsaResult<()> {
        if bytes.len() > self.remaining() {
            return Err(self.capacity_error());
        }
        self.data
            .try_reserve(bytes.len())
            .map_err(|_| self.capacity_error())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn capacity_error(&self) -> MsaError {
        MsaError::Capacity {
            capacity: self.capacity,
        }
    }

    /// Number of bytes written so far (the global write cursor).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total capacity requested by the caller.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can still be written.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Reinterprets the written bytes as a matrix with `columns` columns.
    ///
    /// Returns `None` when `columns` is zero or does not divide the number of
    /// bytes written.
    pub fn into_matrix(self, columns: usize) -> Option<AlignmentMatrix> {
        if columns == 0 || self.data.len() % columns != 0 {
            return None;
        }
        let rows = self.data.len() / columns;
        Some(AlignmentMatrix {
            data: self.data,
            rows,
            columns,
        })
    }
}

/// A rows × columns matrix of sequence symbols, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMatrix {
    data: Vec<u8>,
    rows: usize,
    columns: usize,
}

impl AlignmentMatrix {
    /// Builds a matrix from equal-length rows.
    ///
    /// Returns `None` if the rows do not all have the same length.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Option<Self> {
        let columns = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if rows.iter().any(|r| r.as_ref().len() != columns) {
            return None;
        }
        let mut data = Vec::with_capacity(rows.len() * columns);
        for row in rows {
            data.extend_from_slice(row.as_ref());
        }
        Some(Self {
            data,
            rows: rows.len(),
            columns,
        })
    }

    /// Number of rows (sequences).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (aligned positions).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Gets a row by index.
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.columns;
        self.data.get(start..start + self.columns)
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.rows).filter_map(move |i| self.row(i))
    }

    /// The whole matrix as one contiguous slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Maps identifiers to the rows they label.
///
/// Each key holds an ordered group of row indices: a unique identifier is a
/// singleton group, duplicates append in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRegistry {
    groups: HashMap<String, Vec<usize>>,
    // first-seen order of keys
    order: Vec<String>,
}

impl LabelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `index` with `key`.
    pub fn insert(&mut self, key: &str, index: usize) {
        match self.groups.get_mut(key) {
            Some(group) => group.push(index),
            None => {
                self.groups.insert(key.to_string(), vec![index]);
                self.order.push(key.to_string());
            }
        }
    }

    /// Rows labelled by `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[usize]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Returns true if `key` has been registered.
    pub fn contains(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no key has been registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over (key, rows) in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.order
            .iter()
            .filter_map(move |k| self.groups.get(k).map(|g| (k.as_str(), g.as_slice())))
    }

    /// Entries whose key labels more than one row.
    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.iter().filter(|(_, rows)| rows.len() > 1)
    }
}

/// The result of parsing an alignment file.
#[derive(Debug, Clone)]
pub struct ParsedAlignment {
    /// Sequence symbols, one row per record
    pub matrix: AlignmentMatrix,
    /// One label per row; `None` where the label text could not be decoded
    pub labels: Vec<Option<String>>,
    /// Identifier → rows
    pub registry: LabelRegistry,
    /// Number of labels successfully registered
    pub parsed_count: usize,
}

impl ParsedAlignment {
    /// Number of sequences.
    pub fn sequence_count(&self) -> usize {
        self.matrix.rows()
    }

    /// Alignment length.
    pub fn alignment_length(&self) -> usize {
        self.matrix.columns()
    }

    /// Labels as text, with an empty string standing in for placeholders.
    pub fn label_strs(&self) -> Vec<&str> {
        self.labels
            .iter()
            .map(|l| l.as_deref().unwrap_or(""))
            .collect()
    }

    /// Sequence row labelled `key`, the first one if the key is duplicated.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        let index = *self.registry.get(key)?.first()?;
        self.matrix.row(index)
    }
}
