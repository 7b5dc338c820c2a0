// runrich: Enrichment statistics for Nanopore adaptive sampling runs.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! Parsers for alignment listings.

// Format specific implementations
pub mod sam;

use std::collections::HashSet;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;

use crate::AlnRecord;

type E = Box<dyn std::error::Error>;

/// Parse all records from a SAM alignment listing.
///
/// Header lines (starting with '@') and empty lines are skipped. Every
/// other line must parse as an alignment record; a malformed line
/// terminates the parse with an error instead of being skipped.
pub fn parse_alignments<R: Read>(conn: &mut R) -> Result<Vec<AlnRecord>, E> {
    let reader = BufReader::new(conn);
    let mut records: Vec<AlnRecord> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        records.push(sam::read_alignment(&mut line.as_bytes())?);
    }
    Ok(records)
}

/// Read ids with more than one mapped record in `records`.
///
/// Secondary and supplementary lines count towards the total, so a read
/// reported at two locations is flagged even when only one is primary.
pub fn multi_aligned(records: &[AlnRecord]) -> HashSet<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut multi: HashSet<String> = HashSet::new();
    for record in records {
        if record.reference.is_none() {
            continue;
        }
        if !seen.insert(record.read_id.as_str()) {
            multi.insert(record.read_id.clone());
        }
    }
    multi
}
