//! Common helper functions for parsing file input, loading, and setting output
//!
//! The functions are used by the `align` subcommand to turn the command line
//! input into [`Sequence`]s and output streams.

use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;

use needletail::parse_fastx_file;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{Error, Result};
use crate::sequence::Sequence;

/// Set a buffered stream to write to.
///
/// Either a file (if [`Some`]) or stdout otherwise (if [`None`]).
pub fn set_ostream(oprefix: &Option<String>) -> Result<BufWriter<Box<dyn Write>>> {
    let out_writer = match oprefix {
        Some(prefix) => {
            let path = Path::new(prefix);
            Box::new(File::create(path)?) as Box<dyn Write>
        }
        None => Box::new(stdout()) as Box<dyn Write>,
    };
    Ok(BufWriter::new(out_writer))
}

/// First record of a FASTA or FASTQ file (optionally compressed).
pub fn read_sequence(filename: &str) -> Result<Sequence> {
    let input_error = |message: String| Error::SequenceInput {
        path: filename.to_owned(),
        message,
    };
    let mut reader = parse_fastx_file(filename).map_err(|e| input_error(e.to_string()))?;
    let record = match reader.next() {
        Some(rec) => rec.map_err(|e| input_error(e.to_string()))?,
        None => return Err(input_error("no records".to_owned())),
    };
    let id = String::from_utf8_lossy(record.id());
    let name = id.split_whitespace().next().unwrap_or(filename).to_owned();
    let seq = Sequence::from_ascii(&name, &record.seq())?;
    log::info!("Read {} from {}", seq, filename);
    Ok(seq)
}

/// Random generator from `seed`, or from entropy when absent.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => {
            log::info!("Random sequences seeded with {s}");
            StdRng::seed_from_u64(s)
        }
        None => StdRng::from_entropy(),
    }
}

/// A sequence from a file or, failing that, a random one of `random_len` bases.
pub fn load_or_generate(
    name:       &str,
    file:       &Option<String>,
    random_len: Option<usize>,
    rng:        &mut StdRng,
) -> Result<Sequence> {
    match (file, random_len) {
        (Some(f), _) => read_sequence(f),
        (None, Some(len)) => {
            let seq = Sequence::random(name, len, rng);
            log::info!("Generated random {}", seq);
            Ok(seq)
        }
        (None, None) => Err(Error::InvalidUsage(format!("no input given for the {name} sequence"))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("swscan_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_read_first_fasta_record() {
        let path = temp_path("two.fa");
        std::fs::write(&path, b">first some description\nACGTN\n>second\nGGGG\n").unwrap();
        // N is not part of the alphabet
        let err = read_sequence(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidSequence(_)));

        std::fs::write(&path, b">first some description\nACGT\nacgt\n>second\nGGGG\n").unwrap();
        let seq = read_sequence(path.to_str().unwrap()).unwrap();
        assert_eq!(seq.name(), "first");
        assert_eq!(seq.to_ascii(), b"ACGTACGT".to_vec());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = read_sequence("/nonexistent/swscan/input.fa").unwrap_err();
        match err {
            Error::SequenceInput { path, .. } => assert_eq!(path, "/nonexistent/swscan/input.fa"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_load_or_generate_random() {
        let mut rng = make_rng(Some(3));
        let a = load_or_generate("row", &None, Some(12), &mut rng).unwrap();
        let mut rng = make_rng(Some(3));
        let b = load_or_generate("row", &None, Some(12), &mut rng).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(load_or_generate("row", &None, None, &mut rng).is_err());
    }
}
