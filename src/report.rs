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

//! Rendering classification results into the summary and read extracts.
//!
//! The summary is a four-column tab-separated file:
//!
//! ```text
//! Statistic     Channel     Alignment   Value
//! Reads_mapped  Target      unaligned   2
//! Bases_mapped  Target      unaligned   11804
//! Reads_mapped  Target      chrA        117
//! ...
//! Enrichment    NA          chrA        9.731
//! ```
//!
//! Per-reference rows carry the raw bucket aggregates. The `Total` rows are
//! deduplicated with a first-seen-wins pass over the bucket entries, so a
//! read observed on several lines of the listing counts once.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;

use indexmap::IndexMap;

use crate::classify::UnknownReadId;
use crate::CohortSummary;
use crate::EnrichmentEntry;
use crate::ReadBucketEntry;
use crate::UNALIGNED;

type E = Box<dyn std::error::Error>;

/// Deduplicated totals for one cohort's report section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CohortTotals {
    pub reads_total: u64,
    pub reads_mapped: u64,
    pub bases_total: u64,
    pub bases_mapped: u64,
}

/// Count the mapped reads and bases of one cohort, first-seen-wins.
///
/// Buckets are visited in insertion order with
/// [UNALIGNED](crate::UNALIGNED) first, so a read that appears both
/// filtered and mapped counts as whichever entry came first.
pub fn cohort_totals(
    summary: &CohortSummary,
    read_lengths: &HashMap<String, u64>,
    reads_total: u64,
    bases_total: u64,
) -> Result<CohortTotals, E> {
    let mut prev_reads: HashSet<&str> = HashSet::new();
    let mut reads_mapped = 0_u64;
    let mut bases_mapped = 0_u64;

    for (reference, entries) in &summary.buckets {
        for entry in entries {
            if !prev_reads.insert(entry.read_id.as_str()) {
                continue;
            }
            if reference != UNALIGNED {
                let read_length =
                    read_lengths.get(&entry.read_id).ok_or_else(|| UnknownReadId {
                        read_id: entry.read_id.clone(),
                    })?;
                reads_mapped += 1;
                bases_mapped += *read_length;
            }
        }
    }

    Ok(CohortTotals {
        reads_total,
        reads_mapped,
        bases_total,
        bases_mapped,
    })
}

/// Write the full tab-separated run summary.
///
/// Row order: target per-reference rows and totals, non-target
/// per-reference rows, enrichment rows, non-target totals. References
/// without a defined enrichment ratio get no `Enrichment` row.
pub fn write_summary<W: Write>(
    target: &CohortSummary,
    nontarget: &CohortSummary,
    target_totals: &CohortTotals,
    nontarget_totals: &CohortTotals,
    enrichment: &IndexMap<String, EnrichmentEntry>,
    conn: &mut W,
) -> Result<(), E> {
    writeln!(conn, "Statistic\tChannel\tAlignment\tValue")?;

    write_reference_rows(target, "Target", conn)?;
    write_total_rows(target_totals, "Target", conn)?;

    write_reference_rows(nontarget, "Non_target", conn)?;
    for (reference, entry) in enrichment {
        if let Some(ratio) = entry.ratio {
            writeln!(conn, "Enrichment\tNA\t{}\t{}", reference, ratio)?;
        }
    }
    write_total_rows(nontarget_totals, "Non_target", conn)?;

    conn.flush()?;
    Ok(())
}

fn write_reference_rows<W: Write>(
    summary: &CohortSummary,
    channel: &str,
    conn: &mut W,
) -> Result<(), E> {
    for stats in summary.stats.values() {
        writeln!(
            conn,
            "Reads_mapped\t{}\t{}\t{}",
            channel, stats.reference, stats.total_reads
        )?;
        writeln!(
            conn,
            "Bases_mapped\t{}\t{}\t{}",
            channel, stats.reference, stats.total_length
        )?;
    }
    Ok(())
}

fn write_total_rows<W: Write>(
    totals: &CohortTotals,
    channel: &str,
    conn: &mut W,
) -> Result<(), E> {
    writeln!(conn, "Reads_total\t{}\tTotal\t{}", channel, totals.reads_total)?;
    writeln!(conn, "Reads_mapped\t{}\tTotal\t{}", channel, totals.reads_mapped)?;
    writeln!(conn, "Bases_total\t{}\tTotal\t{}", channel, totals.bases_total)?;
    writeln!(conn, "Bases_mapped\t{}\tTotal\t{}", channel, totals.bases_mapped)?;
    Ok(())
}

/// Write one fasta file per bucket, named `<prefix>_<cohort>_<reference>.fasta`.
pub fn write_read_extracts(
    prefix: &str,
    cohort: &str,
    summary: &CohortSummary,
    seqs: &HashMap<String, String>,
) -> Result<(), E> {
    for (reference, entries) in &summary.buckets {
        let out_path = format!("{}_{}_{}.fasta", prefix, cohort, reference);
        let f = File::create(&out_path)?;
        let mut conn = BufWriter::new(f);
        format_extract(entries, seqs, &mut conn)?;
        conn.flush()?;
    }
    Ok(())
}

/// Format one bucket's entries as fasta records.
///
/// The record header carries the classification decision: read name, the
/// reference named in the listing, and the computed identity.
pub fn format_extract<W: Write>(
    entries: &[ReadBucketEntry],
    seqs: &HashMap<String, String>,
    conn: &mut W,
) -> Result<(), E> {
    for entry in entries {
        let seq = seqs.get(&entry.read_id).ok_or_else(|| UnknownReadId {
            read_id: entry.read_id.clone(),
        })?;
        writeln!(conn, ">{} {} {}", entry.read_id, entry.reference, entry.identity)?;
        writeln!(conn, "{}", seq)?;
    }
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::CohortSummary;
    use crate::ReadBucketEntry;

    fn entry(read_id: &str, reference: &str, identity: f64) -> ReadBucketEntry {
        ReadBucketEntry {
            read_id: read_id.to_string(),
            reference: reference.to_string(),
            identity,
        }
    }

    fn lengths(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs
            .iter()
            .map(|(read_id, length)| (read_id.to_string(), *length))
            .collect()
    }

    #[test]
    fn cohort_totals_deduplicate_repeated_reads() {
        use super::cohort_totals;

        let mut summary = CohortSummary::new();
        summary.record("chrA", entry("r1", "chrA", 1.0), 100);
        summary.record("chrA", entry("r1", "chrA", 0.95), 100);
        summary.record("chrB", entry("r2", "chrB", 1.0), 50);

        let got = cohort_totals(&summary, &lengths(&[("r1", 100), ("r2", 50)]), 3, 250).unwrap();

        assert_eq!(got.reads_mapped, 2);
        assert_eq!(got.bases_mapped, 150);
        assert_eq!(got.reads_total, 3);
        assert_eq!(got.bases_total, 250);
    }

    #[test]
    fn cohort_totals_first_seen_wins_across_buckets() {
        use super::cohort_totals;

        // r1 was filtered on its first line; the unaligned bucket comes
        // first in iteration order, so the mapped entry does not count.
        let mut summary = CohortSummary::new();
        summary.record("unaligned", entry("r1", "chrA", 0.5), 100);
        summary.record("chrA", entry("r1", "chrA", 0.95), 100);

        let got = cohort_totals(&summary, &lengths(&[("r1", 100)]), 1, 100).unwrap();

        assert_eq!(got.reads_mapped, 0);
        assert_eq!(got.bases_mapped, 0);
    }

    #[test]
    fn write_summary_rows() {
        use indexmap::IndexMap;
        use crate::EnrichmentEntry;
        use super::{cohort_totals, write_summary};

        let mut target = CohortSummary::new();
        target.record("chrA", entry("r1", "chrA", 1.0), 100);
        let mut nontarget = CohortSummary::new();
        nontarget.record("chrA", entry("r2", "chrA", 1.0), 100);
        nontarget.record("unaligned", entry("r3", "*", 0.0), 300);

        let target_totals =
            cohort_totals(&target, &lengths(&[("r1", 100)]), 1, 200).unwrap();
        let nontarget_totals =
            cohort_totals(&nontarget, &lengths(&[("r2", 100), ("r3", 300)]), 2, 400).unwrap();

        let mut enrichment: IndexMap<String, EnrichmentEntry> = IndexMap::new();
        enrichment.insert(
            "chrA".to_string(),
            EnrichmentEntry {
                ratio: Some(2.0),
                ..Default::default()
            },
        );
        // No ratio defined, must not produce an Enrichment row.
        enrichment.insert("chrB".to_string(), EnrichmentEntry::default());

        let mut got: Vec<u8> = Vec::new();
        write_summary(
            &target,
            &nontarget,
            &target_totals,
            &nontarget_totals,
            &enrichment,
            &mut got,
        )
        .unwrap();

        let got = String::from_utf8(got).unwrap();
        assert!(got.starts_with("Statistic\tChannel\tAlignment\tValue\n"));
        assert!(got.contains("Reads_mapped\tTarget\tchrA\t1\n"));
        assert!(got.contains("Bases_mapped\tTarget\tchrA\t100\n"));
        assert!(got.contains("Reads_total\tTarget\tTotal\t1\n"));
        assert!(got.contains("Bases_mapped\tNon_target\tunaligned\t300\n"));
        assert!(got.contains("Enrichment\tNA\tchrA\t2\n"));
        assert!(!got.contains("chrB"));
    }

    #[test]
    fn format_extract_writes_fasta_records() {
        use super::format_extract;

        let entries = vec![entry("r1", "chrA", 0.89), entry("r2", "chrA", 1.0)];
        let mut seqs: HashMap<String, String> = HashMap::new();
        seqs.insert("r1".to_string(), "ACGT".to_string());
        seqs.insert("r2".to_string(), "GGCC".to_string());

        let mut got: Vec<u8> = Vec::new();
        format_extract(&entries, &seqs, &mut got).unwrap();

        let expected = ">r1 chrA 0.89\nACGT\n>r2 chrA 1\nGGCC\n";
        assert_eq!(String::from_utf8(got).unwrap(), expected);
    }

    #[test]
    fn format_extract_unknown_read_is_an_error() {
        use super::format_extract;

        let entries = vec![entry("r1", "chrA", 0.89)];
        let seqs: HashMap<String, String> = HashMap::new();

        let mut got: Vec<u8> = Vec::new();
        assert!(format_extract(&entries, &seqs, &mut got).is_err());
    }
}
