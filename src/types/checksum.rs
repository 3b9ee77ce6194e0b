use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A checksum as carried in system metadata, object lists and the
/// `DataONE-Checksum` header.
///
/// The algorithm is kept verbatim because nodes are inconsistent about its
/// spelling (`SHA-1`, `SHA1`, `sha1`). Use [`Checksum::algorithm_kind`] to
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "@algorithm")]
    pub algorithm: String,
    #[serde(rename = "$text")]
    pub value: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, value: impl Into<String>) -> Self {
        Checksum {
            algorithm: algorithm.to_string(),
            value: value.into(),
        }
    }

    pub fn algorithm_kind(&self) -> Result<ChecksumAlgorithm, String> {
        self.algorithm.parse()
    }

    /// Compares two checksums, ignoring algorithm spelling and hex case.
    pub fn matches(&self, other: &Checksum) -> bool {
        let same_algorithm = match (self.algorithm_kind(), other.algorithm_kind()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.algorithm.eq_ignore_ascii_case(&other.algorithm),
        };

        same_algorithm && self.value.trim().eq_ignore_ascii_case(other.value.trim())
    }

    /// Parses the `<algorithm>,<value>` form of the `DataONE-Checksum` header.
    pub fn from_header(value: &str) -> Option<Self> {
        let (algorithm, checksum) = value.split_once(',')?;
        Some(Checksum {
            algorithm: algorithm.trim().to_string(),
            value: checksum.trim().to_string(),
        })
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

/// The checksum algorithms this client can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    MD5,
    SHA1,
    SHA256,
    SHA512,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::MD5 => "MD5",
            ChecksumAlgorithm::SHA1 => "SHA-1",
            ChecksumAlgorithm::SHA256 => "SHA-256",
            ChecksumAlgorithm::SHA512 => "SHA-512",
        }
    }
}

impl Default for ChecksumAlgorithm {
    fn default() -> Self {
        ChecksumAlgorithm::SHA256
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();

        match normalised.as_str() {
            "MD5" => Ok(ChecksumAlgorithm::MD5),
            "SHA1" => Ok(ChecksumAlgorithm::SHA1),
            "SHA256" => Ok(ChecksumAlgorithm::SHA256),
            "SHA512" => Ok(ChecksumAlgorithm::SHA512),
            _ => Err(format!("Unsupported checksum algorithm: {s}")),
        }
    }
}

impl Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
