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
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use clap::Parser;

use runrich::reads::ChannelRange;
use runrich::report::CohortTotals;
use runrich::CohortSummary;

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    match &cli.command {
        // Analyse
        Some(cli::Commands::Analyse {
            reads_dir,
            alignment,
            channels,
            min_identity,
            output,
            remove_multi,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });

            // Missing inputs are reported apart from parse errors.
            if !reads_dir.is_dir() {
                log::error!("Could not find input directory {}", reads_dir.display());
                std::process::exit(2);
            }
            if !alignment.is_file() {
                log::error!("Could not find file {}", alignment.display());
                std::process::exit(2);
            }

            let channels = match ChannelRange::from_str(channels) {
                Ok(channels) => channels,
                Err(message) => {
                    log::error!("{}", message);
                    std::process::exit(1);
                }
            };

            if let Err(e) = analyse(
                reads_dir,
                alignment,
                &channels,
                *min_identity,
                output,
                *remove_multi,
            ) {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            let _ = <cli::Cli as clap::CommandFactory>::command().print_help();
        },
    }
}

fn analyse(
    reads_dir: &Path,
    alignment: &Path,
    channels: &ChannelRange,
    min_identity: f64,
    output: &str,
    remove_multi: bool,
) -> Result<(), E> {
    let files = runrich::reads::find_fastq_files(reads_dir)?;
    log::info!(
        "Found {} fastq file(s) under {}",
        files.len(),
        reads_dir.display()
    );

    let read_set = runrich::reads::read_cohorts(&files, channels)?;
    log::info!(
        "Read {} sequences: {} on channels {}-{}, {} on the other channels",
        read_set.lengths.len(),
        read_set.target_reads.len(),
        channels.min,
        channels.max,
        read_set.nontarget_reads.len()
    );

    let mut conn_in = File::open(alignment)?;
    let summary = runrich::analyse_from_read(&mut conn_in, &read_set, remove_multi, min_identity)?;

    let target_totals = runrich::report::cohort_totals(
        &summary.target,
        &read_set.lengths,
        read_set.target_reads.len() as u64,
        read_set.target_bases,
    )?;
    let nontarget_totals = runrich::report::cohort_totals(
        &summary.nontarget,
        &read_set.lengths,
        read_set.nontarget_reads.len() as u64,
        read_set.nontarget_bases,
    )?;

    log_cohort_stats("target", &summary.target, &target_totals);
    log_cohort_stats("non-target", &summary.nontarget, &nontarget_totals);

    let f = File::create(format!("{}_summary.txt", output))?;
    let mut conn_out = BufWriter::new(f);
    runrich::report::write_summary(
        &summary.target,
        &summary.nontarget,
        &target_totals,
        &nontarget_totals,
        &summary.enrichment,
        &mut conn_out,
    )?;

    runrich::report::write_read_extracts(output, "target", &summary.target, &read_set.seqs)?;
    runrich::report::write_read_extracts(output, "nontarget", &summary.nontarget, &read_set.seqs)?;

    Ok(())
}

fn log_cohort_stats(name: &str, summary: &CohortSummary, totals: &CohortTotals) {
    log::info!("Reference stats for the {} channels:", name);
    for stats in summary.stats.values() {
        log::info!(
            "{}\t{}\t{}",
            stats.reference,
            stats.total_reads,
            stats.total_length
        );
    }
    log::info!(
        "Total number of reads mapped: {}/{}",
        totals.reads_mapped,
        totals.reads_total
    );
    log::info!("Total read bases: {}", totals.bases_total);
    log::info!("Total read bases mapped: {}", totals.bases_mapped);
}
