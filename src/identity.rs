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

//! Reconstructing alignment identity from the CIGAR and the NM tag.

use crate::AlnRecord;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct EmptyCigar {
    pub read_id: String,
}

impl std::fmt::Display for EmptyCigar {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "mapped alignment record for read '{}' has no CIGAR operations",
            self.read_id
        )
    }
}

impl std::error::Error for EmptyCigar {}

#[derive(Debug, Clone)]
pub struct ZeroLengthRead {
    pub read_id: String,
}

impl std::fmt::Display for ZeroLengthRead {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "read '{}' has length 0", self.read_id)
    }
}

impl std::error::Error for ZeroLengthRead {}

/// Estimate the fraction of `read_length` bases that match the reference.
///
/// Sums the lengths of the M operations in the CIGAR, then subtracts the
/// number of substitutions recovered from the NM tag. Insertions and
/// deletions are discounted from NM once per operation regardless of their
/// length; the remainder of the NM count is taken as substitutions.
///
/// The denominator is the full read length, so soft-clipped bases lower the
/// identity.
///
/// Terminates with an error if the record has no CIGAR operations or if
/// `read_length` is 0; both indicate a malformed listing, as this function
/// is only defined for mapped records.
pub fn alignment_identity(record: &AlnRecord, read_length: u64) -> Result<f64, E> {
    if record.cigar.is_empty() {
        return Err(Box::new(EmptyCigar {
            read_id: record.read_id.clone(),
        }));
    }
    if read_length == 0 {
        return Err(Box::new(ZeroLengthRead {
            read_id: record.read_id.clone(),
        }));
    }

    let mut num_matches: i64 = 0;
    let mut num_gap_ops: i64 = 0;
    for (len, op) in &record.cigar {
        match op {
            'M' => num_matches += *len as i64,
            'I' | 'D' => num_gap_ops += 1,
            _ => {}
        }
    }

    let num_mismatches = record.edit_distance as i64 - num_gap_ops;
    num_matches -= num_mismatches;

    Ok(num_matches as f64 / read_length as f64)
}
