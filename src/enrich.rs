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

//! Joining the two cohorts' aggregates into enrichment ratios.

use indexmap::IndexMap;

use crate::EnrichmentEntry;
use crate::ReferenceStats;
use crate::UNALIGNED;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct ZeroBaseCohort {
    pub cohort: &'static str,
}

impl std::fmt::Display for ZeroBaseCohort {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "the {} cohort contains no bases; check the channel range and the input files",
            self.cohort
        )
    }
}

impl std::error::Error for ZeroBaseCohort {}

/// Compute per-reference enrichment from the two cohorts' aggregates.
///
/// For every reference mapped in either cohort (the
/// [UNALIGNED](crate::UNALIGNED) bucket is skipped), the returned entry
/// holds the cohort's mapped bases and their proportion of the cohort's
/// total sequenced bases. The enrichment ratio, target proportion over
/// non-target proportion, is set only for references mapped in both
/// cohorts; references seen in one cohort keep `ratio` unset rather than
/// getting a zero or infinite value.
///
/// Terminates with an error if either cohort total is 0: a cohort without
/// bases means the channel split or the inputs are wrong, and no ratio is
/// meaningful.
pub fn compute_enrichment(
    target_stats: &IndexMap<String, ReferenceStats>,
    nontarget_stats: &IndexMap<String, ReferenceStats>,
    target_total_bases: u64,
    nontarget_total_bases: u64,
) -> Result<IndexMap<String, EnrichmentEntry>, E> {
    if target_total_bases == 0 {
        return Err(Box::new(ZeroBaseCohort { cohort: "target" }));
    }
    if nontarget_total_bases == 0 {
        return Err(Box::new(ZeroBaseCohort { cohort: "non-target" }));
    }

    let mut entries: IndexMap<String, EnrichmentEntry> = IndexMap::new();

    for (reference, stats) in target_stats {
        if reference == UNALIGNED {
            continue;
        }
        let entry = entries.entry(reference.clone()).or_default();
        entry.target_bases_mapped = Some(stats.total_length);
        entry.target_proportion = Some(stats.total_length as f64 / target_total_bases as f64);
    }

    for (reference, stats) in nontarget_stats {
        if reference == UNALIGNED {
            continue;
        }
        let entry = entries.entry(reference.clone()).or_default();
        entry.nontarget_bases_mapped = Some(stats.total_length);
        entry.nontarget_proportion =
            Some(stats.total_length as f64 / nontarget_total_bases as f64);
        if let (Some(target), Some(nontarget)) =
            (entry.target_proportion, entry.nontarget_proportion)
        {
            entry.ratio = Some(target / nontarget);
        }
    }

    Ok(entries)
}

// Tests
#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::ReferenceStats;

    fn stats(pairs: &[(&str, u64)]) -> IndexMap<String, ReferenceStats> {
        pairs
            .iter()
            .map(|(reference, total_length)| {
                (
                    reference.to_string(),
                    ReferenceStats {
                        reference: reference.to_string(),
                        total_reads: 1,
                        total_length: *total_length,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn enrichment_ratio_from_proportions() {
        use super::compute_enrichment;

        // Target: 500 of 1000 bases on chrA. Non-target: 100 of 2000.
        let target = stats(&[("unaligned", 250), ("chrA", 500)]);
        let nontarget = stats(&[("unaligned", 900), ("chrA", 100)]);

        let got = compute_enrichment(&target, &nontarget, 1000, 2000).unwrap();

        let entry = &got["chrA"];
        assert_eq!(entry.target_bases_mapped, Some(500));
        assert_eq!(entry.nontarget_bases_mapped, Some(100));
        assert_eq!(entry.target_proportion, Some(0.5));
        assert_eq!(entry.nontarget_proportion, Some(0.05));
        assert_eq!(entry.ratio, Some(10.0));
    }

    #[test]
    fn enrichment_one_sided_references_have_no_ratio() {
        use super::compute_enrichment;

        let target = stats(&[("chrA", 500)]);
        let nontarget = stats(&[("chrB", 100)]);

        let got = compute_enrichment(&target, &nontarget, 1000, 2000).unwrap();

        assert_eq!(got["chrA"].ratio, None);
        assert_eq!(got["chrA"].nontarget_proportion, None);
        assert_eq!(got["chrB"].ratio, None);
        assert_eq!(got["chrB"].target_proportion, None);
    }

    #[test]
    fn enrichment_skips_the_unaligned_bucket() {
        use super::compute_enrichment;

        let target = stats(&[("unaligned", 500)]);
        let nontarget = stats(&[("unaligned", 100)]);

        let got = compute_enrichment(&target, &nontarget, 1000, 2000).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn enrichment_ratio_is_positive_when_defined() {
        use super::compute_enrichment;

        let target = stats(&[("chrA", 1), ("chrB", 999)]);
        let nontarget = stats(&[("chrA", 1999), ("chrB", 1)]);

        let got = compute_enrichment(&target, &nontarget, 1000, 2000).unwrap();

        for entry in got.values() {
            assert!(entry.ratio.unwrap() > 0.0);
        }
    }

    #[test]
    fn enrichment_zero_base_cohort_is_an_error() {
        use super::compute_enrichment;

        let target = stats(&[("chrA", 500)]);
        let nontarget = stats(&[("chrA", 100)]);

        assert!(compute_enrichment(&target, &nontarget, 0, 2000).is_err());
        assert!(compute_enrichment(&target, &nontarget, 1000, 0).is_err());
    }
}
