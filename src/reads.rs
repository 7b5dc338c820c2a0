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

//! Reading the query sequences and assigning them to cohorts by channel.
//!
//! Basecalled Nanopore reads carry the flow cell channel in the header as a
//! `ch=<number>` field. Reads sequenced on a channel inside the configured
//! [ChannelRange] form the target cohort, everything else the non-target
//! cohort. The cohorts partition the run: every read belongs to exactly one.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use bstr::ByteSlice;
use needletail::parser::FastxReader;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct MissingChannel {
    pub read_id: String,
}

impl std::fmt::Display for MissingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "read '{}' has no ch=<number> field in its header",
            self.read_id
        )
    }
}

impl std::error::Error for MissingChannel {}

/// Inclusive channel range defining the target cohort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelRange {
    pub min: u32,
    pub max: u32,
}

impl ChannelRange {
    pub fn contains(&self, channel: u32) -> bool {
        channel >= self.min && channel <= self.max
    }
}

impl std::str::FromStr for ChannelRange {
    type Err = String; // Define an error type for parsing failures

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split('-');
        let min = fields.next().and_then(|field| field.parse::<u32>().ok());
        let max = fields.next().and_then(|field| field.parse::<u32>().ok());
        match (min, max, fields.next()) {
            (Some(min), Some(max), None) if min <= max => Ok(ChannelRange { min, max }),
            _ => Err(format!(
                "'{}' is not a valid channel range (expected \"a-b\" with a <= b)",
                s
            )),
        }
    }
}

/// The reads of one run, split into the two channel cohorts.
///
/// `target_reads` and `nontarget_reads` are disjoint; `lengths` and `seqs`
/// cover their union. The base totals count all sequenced bases of each
/// cohort, mapped or not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadSet {
    pub lengths: HashMap<String, u64>,
    pub seqs: HashMap<String, String>,
    pub target_reads: HashSet<String>,
    pub nontarget_reads: HashSet<String>,
    pub target_bases: u64,
    pub nontarget_bases: u64,
}

/// Collect the .fastq files under `dir`, recursively.
///
/// Matches the extensions .fastq, .fq, .fastq.gz and .fq.gz. The result is
/// sorted so runs over the same directory process files in the same order.
pub fn find_fastq_files(dir: &Path) -> Result<Vec<PathBuf>, E> {
    let mut files: Vec<PathBuf> = Vec::new();
    walk_dir(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), E> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if is_fastq(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_fastq(path: &Path) -> bool {
    let name = match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name,
        None => return false,
    };
    [".fastq", ".fq", ".fastq.gz", ".fq.gz"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Read every file in `files` and build the cohort split.
pub fn read_cohorts(files: &[PathBuf], channels: &ChannelRange) -> Result<ReadSet, E> {
    let mut set = ReadSet::default();
    for file in files {
        let mut reader = needletail::parse_fastx_file(file)?;
        scan_reads(reader.as_mut(), channels, &mut set)?;
    }
    Ok(set)
}

/// Scan one fastx stream into `set`.
///
/// Terminates with an error if a read header has no parseable `ch=` field
/// or if a sequence is not valid UTF-8.
pub fn scan_reads(
    reader: &mut dyn FastxReader,
    channels: &ChannelRange,
    set: &mut ReadSet,
) -> Result<(), E> {
    while let Some(record) = reader.next() {
        let record = record?;
        let header = record.id().to_str()?;
        let (read_id, channel) = parse_read_header(header)?;

        let seq = record.seq();
        let length = seq.len() as u64;
        set.lengths.insert(read_id.clone(), length);
        set.seqs.insert(read_id.clone(), String::from_utf8(seq.to_vec())?);

        if channels.contains(channel) {
            set.target_reads.insert(read_id);
            set.target_bases += length;
        } else {
            set.nontarget_reads.insert(read_id);
            set.nontarget_bases += length;
        }
    }
    Ok(())
}

/// Split a read header into the read name and the channel number.
fn parse_read_header(header: &str) -> Result<(String, u32), E> {
    let mut fields = header.split_whitespace();
    let read_id = match fields.next() {
        Some(read_id) => read_id.to_string(),
        None => {
            return Err(Box::new(MissingChannel {
                read_id: String::new(),
            }))
        }
    };
    for field in fields {
        if let Some(value) = field.strip_prefix("ch=") {
            let channel = value.parse::<u32>()?;
            return Ok((read_id, channel));
        }
    }
    Err(Box::new(MissingChannel { read_id }))
}
