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

//! runrich is a library and a command-line client for checking whether an
//! adaptive sampling ("Read Until") sequencing run enriched its targets:
//!
//!   - Splitting the reads of a run into a target and a non-target cohort
//!     based on the flow cell channel recorded in the read headers.
//!   - Counting, per alignment reference, how many reads and bases from each
//!     cohort aligned with an identity above a configurable threshold.
//!   - Deriving a per-reference enrichment ratio comparing the reference's
//!     representation in the target cohort against the non-target cohort.
//!
//! Inputs are the .fastq files of the run and an alignment listing in the
//! [SAM](https://samtools.github.io/hts-specs/SAMv1.pdf) format with NM tags
//! set on the mapped records. Alignment itself is left to an external tool
//! such as minimap2.
//!
//! ## Usage
//!
//! ### Command line
//!
//! `runrich analyse` runs the full analysis: read the .fastq files under a
//! directory, split the reads into cohorts by channel, classify both cohorts
//! against the alignment listing, and write a tab-separated summary plus
//! per-reference read extracts.
//!
//! ### Rust API
//!
//! The cohort classification and enrichment computations are available as
//! library functions operating on caller-owned inputs:
//!
//!   - [analyse_from_read] parses an alignment listing from a
//!     [Read](std::io::Read) and runs both cohort passes and the enrichment
//!     computation.
//!   - [analyse_cohorts] does the same for an already parsed listing.
//!   - [classify_cohort](classify::classify_cohort) runs a single cohort pass.
//!   - [compute_enrichment](enrich::compute_enrichment) joins the two cohorts'
//!     aggregates into per-reference enrichment ratios.
//!
//! The two cohort passes share no state and may be run independently.

use std::collections::HashSet;
use std::io::Read;

use indexmap::IndexMap;

pub mod classify;
pub mod enrich;
pub mod identity;
pub mod parser;
pub mod reads;
pub mod report;

use crate::reads::ReadSet;

type E = Box<dyn std::error::Error>;

/// Reserved bucket for reads that did not align or were filtered out.
pub const UNALIGNED: &str = "unaligned";

#[derive(Debug, Clone)]
pub struct InvalidThreshold {
    pub value: f64,
}

impl std::fmt::Display for InvalidThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "identity threshold {} is not within [0, 1]", self.value)
    }
}

impl std::error::Error for InvalidThreshold {}

/// One primary alignment observation from the alignment listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlnRecord {
    /// Name of the read in the query .fastq input.
    pub read_id: String,
    /// Name of the aligned reference sequence, None if the read is unmapped.
    pub reference: Option<String>,
    /// CIGAR operations as (length, operation code) pairs. Empty for
    /// unmapped records.
    pub cigar: Vec<(u32, char)>,
    /// Value of the NM tag (edits between the read and the reference).
    pub edit_distance: u32,
}

/// Read and base counts aggregated under one reference sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceStats {
    pub reference: String,
    pub total_reads: u64,
    /// Sum of the full read lengths of the bucketed reads, not of the
    /// aligned portions.
    pub total_length: u64,
}

/// The classification decision for one alignment record.
///
/// `reference` is the reference named in the record even when the read was
/// routed to the [UNALIGNED] bucket, so filtered reads stay traceable in the
/// output. `identity` is 0 for records that were unmapped in the listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadBucketEntry {
    pub read_id: String,
    pub reference: String,
    pub identity: f64,
}

/// Aggregates from one cohort classification pass.
///
/// Both maps are keyed by reference name, preserve insertion order, and
/// always contain the [UNALIGNED] key. The [UNALIGNED] key is inserted first
/// so that iteration visits the filtered reads before any mapped bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct CohortSummary {
    pub stats: IndexMap<String, ReferenceStats>,
    pub buckets: IndexMap<String, Vec<ReadBucketEntry>>,
}

impl CohortSummary {
    pub fn new() -> Self {
        let mut stats: IndexMap<String, ReferenceStats> = IndexMap::new();
        stats.insert(
            UNALIGNED.to_string(),
            ReferenceStats {
                reference: UNALIGNED.to_string(),
                ..Default::default()
            },
        );
        let mut buckets: IndexMap<String, Vec<ReadBucketEntry>> = IndexMap::new();
        buckets.insert(UNALIGNED.to_string(), Vec::new());
        Self { stats, buckets }
    }

    /// Append `entry` to `bucket` and accumulate the read into the bucket's
    /// stats, creating the bucket on first sight.
    pub fn record(&mut self, bucket: &str, entry: ReadBucketEntry, read_length: u64) {
        let stats = self
            .stats
            .entry(bucket.to_string())
            .or_insert_with(|| ReferenceStats {
                reference: bucket.to_string(),
                ..Default::default()
            });
        stats.total_reads += 1;
        stats.total_length += read_length;
        self.buckets.entry(bucket.to_string()).or_default().push(entry);
    }
}

impl Default for CohortSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-reference enrichment between the two cohorts.
///
/// The proportion fields are present only when the cohort in question had
/// mapped bases for the reference; `ratio` is present only when both are.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrichmentEntry {
    pub target_bases_mapped: Option<u64>,
    pub nontarget_bases_mapped: Option<u64>,
    pub target_proportion: Option<f64>,
    pub nontarget_proportion: Option<f64>,
    pub ratio: Option<f64>,
}

/// Output of a full two-cohort analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub target: CohortSummary,
    pub nontarget: CohortSummary,
    pub enrichment: IndexMap<String, EnrichmentEntry>,
}

/// Classify both cohorts and compute the per-reference enrichment.
///
/// `alignments` is the full listing; each cohort pass picks out the records
/// whose read id belongs to the cohort. Reads flagged in `multi_align` are
/// routed to the [UNALIGNED] bucket in both passes.
///
/// Terminates with an error if `min_identity` is outside [0, 1], if a listed
/// read is unknown to `reads`, or if either cohort contains zero bases.
pub fn analyse_cohorts(
    alignments: &[AlnRecord],
    reads: &ReadSet,
    multi_align: &HashSet<String>,
    min_identity: f64,
) -> Result<RunSummary, E> {
    if !(0.0..=1.0).contains(&min_identity) {
        return Err(Box::new(InvalidThreshold { value: min_identity }));
    }

    let target = classify::classify_cohort(
        &reads.target_reads,
        alignments,
        &reads.lengths,
        multi_align,
        min_identity,
    )?;
    let nontarget = classify::classify_cohort(
        &reads.nontarget_reads,
        alignments,
        &reads.lengths,
        multi_align,
        min_identity,
    )?;

    let enrichment = enrich::compute_enrichment(
        &target.stats,
        &nontarget.stats,
        reads.target_bases,
        reads.nontarget_bases,
    )?;

    Ok(RunSummary {
        target,
        nontarget,
        enrichment,
    })
}

/// Parse an alignment listing from [Read](std::io::Read) and analyse both cohorts.
///
/// With `remove_multi` set, reads with more than one mapped record in the
/// listing are excluded from the mapped buckets.
///
/// ## Usage
/// ```rust
/// use runrich::analyse_from_read;
/// use runrich::reads::ReadSet;
/// use std::io::Cursor;
///
/// // Alignment listing: r1 and r3 map to chrA cleanly, r2 is unmapped.
/// let mut data: Vec<u8> = Vec::new();
/// data.extend(b"r1\t0\tchrA\t1\t60\t100M\t*\t0\t0\t*\t*\tNM:i:0\n".iter());
/// data.extend(b"r2\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*\n".iter());
/// data.extend(b"r3\t0\tchrA\t1\t60\t200M\t*\t0\t0\t*\t*\tNM:i:0\n".iter());
///
/// // r1 and r2 were sequenced on the target channels, r3 elsewhere.
/// let mut reads = ReadSet::default();
/// reads.lengths.insert("r1".to_string(), 100);
/// reads.lengths.insert("r2".to_string(), 100);
/// reads.lengths.insert("r3".to_string(), 200);
/// reads.target_reads.insert("r1".to_string());
/// reads.target_reads.insert("r2".to_string());
/// reads.nontarget_reads.insert("r3".to_string());
/// reads.target_bases = 200;
/// reads.nontarget_bases = 200;
///
/// let mut input = Cursor::new(data);
/// let summary = analyse_from_read(&mut input, &reads, false, 0.8).unwrap();
///
/// // chrA holds half the target bases but all of the non-target bases.
/// assert_eq!(summary.target.stats["chrA"].total_reads, 1);
/// assert_eq!(summary.target.stats["unaligned"].total_reads, 1);
/// assert_eq!(summary.nontarget.stats["chrA"].total_length, 200);
/// assert_eq!(summary.enrichment["chrA"].ratio, Some(0.5));
/// ```
pub fn analyse_from_read<R: Read>(
    conn: &mut R,
    reads: &ReadSet,
    remove_multi: bool,
    min_identity: f64,
) -> Result<RunSummary, E> {
    let alignments = parser::parse_alignments(conn)?;
    let multi_align = if remove_multi {
        parser::multi_aligned(&alignments)
    } else {
        HashSet::new()
    };
    analyse_cohorts(&alignments, reads, &multi_align, min_identity)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn analyse_cohorts_rejects_out_of_range_threshold() {
        use std::collections::HashSet;
        use crate::reads::ReadSet;
        use super::analyse_cohorts;

        let reads = ReadSet::default();
        let multi_align: HashSet<String> = HashSet::new();

        let got = analyse_cohorts(&[], &reads, &multi_align, 1.5);
        assert!(got.is_err());
        assert!(got.unwrap_err().to_string().contains("not within [0, 1]"));

        assert!(analyse_cohorts(&[], &reads, &multi_align, -0.1).is_err());
        assert!(analyse_cohorts(&[], &reads, &multi_align, f64::NAN).is_err());
    }
}
