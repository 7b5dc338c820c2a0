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
use std::io::Read;

use noodles_sam as sam;
use noodles_sam::alignment::record::cigar::op::Kind;
use noodles_sam::alignment::record::data::field::tag::Tag;
use noodles_sam::alignment::record::Cigar as _;
use noodles_sam::alignment::record::Data as _;

use crate::AlnRecord;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct MalformedAlignment {
    pub reason: String,
}

impl std::fmt::Display for MalformedAlignment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "malformed alignment record: {}", self.reason)
    }
}

impl std::error::Error for MalformedAlignment {}

fn op_char(kind: Kind) -> char {
    match kind {
        Kind::Match => 'M',
        Kind::Insertion => 'I',
        Kind::Deletion => 'D',
        Kind::Skip => 'N',
        Kind::SoftClip => 'S',
        Kind::HardClip => 'H',
        Kind::Pad => 'P',
        Kind::SequenceMatch => '=',
        Kind::SequenceMismatch => 'X',
    }
}

/// Parse a line from a [SAM](https://samtools.github.io/hts-specs/SAMv1.pdf) file.
///
/// Reads one alignment line stored in the *SAM* format.
///
/// Returns the [alignment record](AlnRecord) on the line. Records with `*`
/// in the reference column are returned as unmapped with an empty CIGAR.
/// Mapped records must carry an integer NM tag.
///
pub fn read_alignment<R: Read>(
    conn: &mut R,
) -> Result<AlnRecord, E> {
    let mut contents: String = String::new();
    conn.read_to_string(&mut contents)?;

    let record = sam::Record::try_from(contents.as_bytes())?;

    let read_id: String = record
        .name()
        .ok_or_else(|| MalformedAlignment {
            reason: "record has no read name".to_string(),
        })?
        .to_string();

    let reference: Option<String> = record
        .reference_sequence_name()
        .map(|name| name.to_string());
    if reference.is_none() {
        // Unmapped records carry no CIGAR or NM tag.
        return Ok(AlnRecord {
            read_id,
            ..Default::default()
        });
    }

    let mut cigar: Vec<(u32, char)> = Vec::new();
    for op in record.cigar().iter() {
        let op = op?;
        let len = u32::try_from(op.len()).map_err(|_| MalformedAlignment {
            reason: format!("CIGAR operation length overflows in read '{}'", read_id),
        })?;
        cigar.push((len, op_char(op.kind())));
    }

    let edit_distance: u32 = match record.data().get(&Tag::new(b'N', b'M')) {
        Some(value) => {
            let value = value?.as_int().ok_or_else(|| MalformedAlignment {
                reason: format!("NM tag of read '{}' is not an integer", read_id),
            })?;
            u32::try_from(value).map_err(|_| MalformedAlignment {
                reason: format!(
                    "NM tag of read '{}' is negative ({})",
                    read_id, value
                ),
            })?
        },
        None => {
            return Err(Box::new(MalformedAlignment {
                reason: format!("mapped record for read '{}' has no NM tag", read_id),
            }))
        }
    };

    Ok(AlnRecord {
        read_id,
        reference,
        cigar,
        edit_distance,
    })
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn read_alignment_mapped() {
        use crate::AlnRecord;
        use super::read_alignment;

        let data: Vec<u8> = b"ERR4035126.1\t16\tOZ038621.1\t4541508\t60\t151M\t*\t0\t0\tAGTATTTAGTGACCTAAGTCAATAAAATTTTAATTTACTCACGGCAGGTAACCAGTTCAGAAGCTGCTATCAGACACTCTTTTTTTAATCCACACAGAGACATATTGCCCGTTGCAGTCAGAATGAAAAGCTGAAAATCACTTACTAAGGC\tFJ<<JJFJAA<-JFAJFAF<JFFJJJJJJJFJFJJA<A<AJJAAAFFJJJJFJJFJFJAJJ7JJJJJFJJJJJFFJFFJFJJJJJJFJ7FFJAJJJJJJJJFJJFJJFJFJJJJFJJFJJJJJJJJJFFJJJJJJJJJJJJJFJJJFFAAA\tNM:i:2\tMD:Z:151\tAS:i:151\tXS:i:0".to_vec();

        let expected = AlnRecord {
            read_id: "ERR4035126.1".to_string(),
            reference: Some("OZ038621.1".to_string()),
            cigar: vec![(151, 'M')],
            edit_distance: 2,
        };

        let got = read_alignment(&mut data.as_slice()).unwrap();

        assert_eq!(got, expected);
    }

    #[test]
    fn read_alignment_with_indels() {
        use super::read_alignment;

        let data: Vec<u8> = b"r1\t0\tchrA\t100\t60\t90M1I1D\t*\t0\t0\t*\t*\tNM:i:3".to_vec();

        let got = read_alignment(&mut data.as_slice()).unwrap();

        assert_eq!(got.cigar, vec![(90, 'M'), (1, 'I'), (1, 'D')]);
        assert_eq!(got.edit_distance, 3);
    }

    #[test]
    fn read_alignment_unmapped() {
        use crate::AlnRecord;
        use super::read_alignment;

        let data: Vec<u8> = b"r2\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*".to_vec();

        let expected = AlnRecord {
            read_id: "r2".to_string(),
            reference: None,
            cigar: Vec::new(),
            edit_distance: 0,
        };

        let got = read_alignment(&mut data.as_slice()).unwrap();

        assert_eq!(got, expected);
    }

    #[test]
    fn read_alignment_too_few_fields_is_an_error() {
        use super::read_alignment;

        let data: Vec<u8> = b"r1\t0\tchrA\t100M".to_vec();

        let got = read_alignment(&mut data.as_slice());

        assert!(got.is_err());
    }

    #[test]
    fn read_alignment_mapped_without_nm_is_an_error() {
        use super::read_alignment;

        let data: Vec<u8> = b"r1\t0\tchrA\t100\t60\t100M\t*\t0\t0\t*\t*".to_vec();

        let got = read_alignment(&mut data.as_slice());

        assert!(got.is_err());
    }

    #[test]
    fn read_alignment_negative_nm_is_an_error() {
        use super::read_alignment;

        let data: Vec<u8> = b"r1\t0\tchrA\t100\t60\t100M\t*\t0\t0\t*\t*\tNM:i:-1".to_vec();

        let got = read_alignment(&mut data.as_slice());

        assert!(got.is_err());
        assert!(got.unwrap_err().to_string().contains("negative"));
    }

    #[test]
    fn read_alignment_oversized_cigar_op_is_an_error() {
        use super::read_alignment;

        // Operation length above u32::MAX.
        let data: Vec<u8> = b"r1\t0\tchrA\t100\t60\t4294967296M\t*\t0\t0\t*\t*\tNM:i:0".to_vec();

        let got = read_alignment(&mut data.as_slice());

        assert!(got.is_err());
    }
}
