//! Content digests.
//!
//! A [`Digest`] is the lowercase-hex identifier of a file's full byte content.
//! It names the hash-tree buckets and (optionally) the placed file itself, so
//! identical content always lands in the identical place.

use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Read buffer used when streaming file content through a hasher.
const BUFFER_SIZE: usize = 64 * 1024;

/// A supported digest algorithm. Defaults to [`Blake3`](Self::Blake3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// BLAKE3, rendered as 64 hex characters.
    #[default]
    Blake3,
    /// CRC-32 (IEEE), rendered as 8 hex characters.
    ///
    /// Short enough for compact bucket names, but collisions become likely
    /// long before a store holds millions of files. Avoid combining it with
    /// hashed filenames on large stores.
    Crc32,
}

impl Algorithm {
    /// Number of characters in a digest produced by this algorithm.
    #[inline]
    #[must_use]
    pub const fn hex_len(&self) -> usize {
        match self {
            Algorithm::Blake3 => blake3::OUT_LEN * 2,
            Algorithm::Crc32 => 8,
        }
    }

    /// Returns the short name for configuration (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3",
            Algorithm::Crc32 => "crc32",
        }
    }

    /// Digest everything `reader` yields until EOF.
    pub fn digest_reader(&self, reader: impl Read) -> io::Result<Digest> {
        let hex = match self {
            Algorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                drain(reader, |chunk| {
                    hasher.update(chunk);
                })?;
                hasher.finalize().to_string()
            },
            Algorithm::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                drain(reader, |chunk| hasher.update(chunk))?;
                format!("{:08x}", hasher.finalize())
            },
        };
        Ok(Digest(hex))
    }

    /// Digest the content of the file at `path`.
    ///
    /// # Errors
    /// Returns [`ErrorKind::Read`] (with the I/O error as its child) if the
    /// file cannot be opened or read.
    #[instrument(skip_all, fields(algorithm = %self, path = %path.as_ref().display()))]
    pub fn digest_file(&self, path: impl AsRef<Path>) -> Result<Digest> {
        let path = path.as_ref();
        let file = File::open(path).or_raise(|| ErrorKind::Read(path.to_path_buf()))?;
        self.digest_reader(file).or_raise(|| ErrorKind::Read(path.to_path_buf()))
    }
}

/// Feed `reader` into `update` one buffer at a time.
fn drain(mut reader: impl Read, mut update: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blake3" | "b3" => Ok(Algorithm::Blake3),
            "crc32" | "crc" => Ok(Algorithm::Crc32),
            _ => exn::bail!(ErrorKind::InvalidDigest(s.to_string())),
        }
    }
}

/// Lowercase-hex identifier derived from a file's content.
///
/// Only produced by an [`Algorithm`], so it is always non-empty ASCII hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    // Reference vectors: BLAKE3 of the empty input, and the CRC-32 check value.
    const BLAKE3_EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";
    const CRC32_CHECK: &str = "cbf43926";

    #[rstest]
    #[case("blake3", Algorithm::Blake3)]
    #[case("BLAKE3", Algorithm::Blake3)]
    #[case("b3", Algorithm::Blake3)]
    #[case("crc32", Algorithm::Crc32)]
    #[case(" crc ", Algorithm::Crc32)]
    fn test_from_str(#[case] test: &str, #[case] expected: Algorithm) {
        assert_eq!(test.parse::<Algorithm>().unwrap(), expected);
    }

    #[rstest]
    #[case("sha1")]
    #[case("adler32")]
    #[case("")]
    fn test_from_str_invalid(#[case] test: &str) {
        let err = test.parse::<Algorithm>().unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidDigest(test.to_string()));
    }

    #[test]
    fn test_reference_vectors() {
        let empty = Algorithm::Blake3.digest_reader(Cursor::new(b"")).unwrap();
        assert_eq!(empty.as_str(), BLAKE3_EMPTY);
        let check = Algorithm::Crc32.digest_reader(Cursor::new(b"123456789")).unwrap();
        assert_eq!(check.as_str(), CRC32_CHECK);
    }

    #[rstest]
    #[case(Algorithm::Blake3)]
    #[case(Algorithm::Crc32)]
    fn test_digest_length(#[case] algorithm: Algorithm) {
        let digest = algorithm.digest_reader(Cursor::new(b"This is a test file!")).unwrap();
        assert_eq!(digest.len(), algorithm.hex_len());
        assert!(digest.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        // Spans several read buffers, with a ragged tail.
        let data: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let blake = Algorithm::Blake3.digest_reader(Cursor::new(&data)).unwrap();
        assert_eq!(blake.as_str(), blake3::hash(&data).to_string());
        let crc = Algorithm::Crc32.digest_reader(Cursor::new(&data)).unwrap();
        assert_eq!(crc.as_str(), format!("{:08x}", crc32fast::hash(&data)));
    }

    #[test]
    fn test_digest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("originalFile.txt");
        std::fs::write(&path, b"This is a test file!").unwrap();
        let first = Algorithm::Blake3.digest_file(&path).unwrap();
        let second = Algorithm::Blake3.digest_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), blake3::hash(b"This is a test file!").to_string());
    }

    #[test]
    fn test_digest_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = Algorithm::Blake3.digest_file(&path).unwrap_err();
        assert_eq!(*err, ErrorKind::Read(path));
    }
}
