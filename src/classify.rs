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

//! Bucketing one cohort's alignment records by reference.
//!
//! A cohort is one of the two channel-defined read groups of a run. The
//! classification pass walks the full alignment listing in input order,
//! keeps the records belonging to the cohort, and buckets each one under
//! its reference name or under [UNALIGNED](crate::UNALIGNED):
//!
//!   - records that were unmapped in the listing go to
//!     [UNALIGNED](crate::UNALIGNED) directly, with identity 0,
//!   - mapped records whose identity falls below the threshold, or whose
//!     read is flagged multi-mapping, are rerouted to
//!     [UNALIGNED](crate::UNALIGNED) with their reference name and computed
//!     identity retained,
//!   - everything else lands in the bucket of its own reference.
//!
//! Cohort reads with no record in the listing contribute to nothing; the
//! listing is allowed to be sparser than the sequence input. The reverse
//! mismatch, a listed read the sequence input knows nothing about, means
//! the two inputs are not from the same run and terminates the pass.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::identity::alignment_identity;
use crate::AlnRecord;
use crate::CohortSummary;
use crate::ReadBucketEntry;
use crate::UNALIGNED;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct UnknownReadId {
    pub read_id: String,
}

impl std::fmt::Display for UnknownReadId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "read '{}' appears in the alignment listing but not in the sequence input; the inputs are not from the same run",
            self.read_id
        )
    }
}

impl std::error::Error for UnknownReadId {}

/// Classify the alignment records of one cohort.
///
/// Walks `alignments` in order, skipping records whose read id is not in
/// `cohort`, and returns the per-reference aggregates and bucketed
/// classification decisions. The [UNALIGNED](crate::UNALIGNED) bucket is
/// present in the output even when empty.
///
/// `min_identity` must already be validated to lie in [0, 1].
///
/// Terminates with an error if a record's read id is missing from
/// `read_lengths`, or if a mapped record carries no CIGAR operations.
pub fn classify_cohort(
    cohort: &HashSet<String>,
    alignments: &[AlnRecord],
    read_lengths: &HashMap<String, u64>,
    multi_align: &HashSet<String>,
    min_identity: f64,
) -> Result<CohortSummary, E> {
    let mut summary = CohortSummary::new();

    for record in alignments {
        if !cohort.contains(&record.read_id) {
            continue;
        }
        let read_length = *read_lengths.get(&record.read_id).ok_or_else(|| UnknownReadId {
            read_id: record.read_id.clone(),
        })?;

        let (bucket, reference, identity) = match &record.reference {
            // Unmapped in the listing, no identity filtering applied.
            None => (UNALIGNED, "*".to_string(), 0.0),
            Some(reference) => {
                let identity = alignment_identity(record, read_length)?;
                if identity < min_identity || multi_align.contains(&record.read_id) {
                    (UNALIGNED, reference.clone(), identity)
                } else {
                    (reference.as_str(), reference.clone(), identity)
                }
            }
        };

        summary.record(
            bucket,
            ReadBucketEntry {
                read_id: record.read_id.clone(),
                reference,
                identity,
            },
            read_length,
        );
    }

    Ok(summary)
}
