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
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Classify reads by channel and compute per-reference enrichment
    Analyse {
        // Directory containing the basecalled reads
        #[arg(short = 'f', long = "reads", required = true, help = "Input directory containing fastq files")]
        reads_dir: PathBuf,

        // Alignment of the reads against the reference(s)
        #[arg(short = 'a', long = "alignment", required = true, help = "Alignment listing in SAM format with NM tags")]
        alignment: PathBuf,

        // Target channel range
        #[arg(short = 'c', long = "channels", default_value = "1-256", help = "Channels to separate, in the form \"a-b\"")]
        channels: String,

        // Identity threshold for counting a read as mapped
        #[arg(short = 'p', long = "min-identity", default_value_t = 0.8, help = "Minimum proportion of bases matching the reference in an alignment")]
        min_identity: f64,

        // Output prefix
        #[arg(short = 'o', long = "output", default_value = "RU_output", help = "Output prefix")]
        output: String,

        // Multi-mapping read removal
        #[arg(short = 'r', long = "remove-multi", default_value_t = false, help = "Remove multi-mapping reads")]
        remove_multi: bool,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
