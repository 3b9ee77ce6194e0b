//! Checksum computation for uploads, downloads and system metadata.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::D1Error;
use crate::file::callback::CallbackFun;
use crate::file::uploadfile::{FileSource, UploadFile};
use crate::types::{Checksum, ChecksumAlgorithm};

const READ_BUFFER: usize = 64 * 1024;

/// Incremental hash computation.
///
/// Hashers are shared handles: clones of the callback returned by
/// [`Hasher::to_callback`] feed the same state, so a hasher can be attached
/// to a streamed body and read once the stream is done.
pub trait Hasher {
    /// Feeds a chunk of data into the hash.
    fn consume(&self, data: &[u8]);

    /// The hex encoded digest of everything consumed so far.
    fn compute(&self) -> String;

    /// A chunk callback feeding this hasher.
    fn to_callback(&self) -> CallbackFun;

    fn algorithm(&self) -> ChecksumAlgorithm;

    /// The digest as a DataONE checksum.
    fn to_checksum(&self) -> Checksum {
        Checksum::new(self.algorithm(), self.compute())
    }
}

/// A hasher for any of the supported checksum algorithms.
#[derive(Clone)]
pub enum FileHash {
    MD5(MD5Hasher),
    SHA1(SHA1Hasher),
    SHA256(SHA256Hasher),
    SHA512(SHA512Hasher),
}

impl FileHash {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::MD5 => FileHash::MD5(MD5Hasher::new()),
            ChecksumAlgorithm::SHA1 => FileHash::SHA1(SHA1Hasher::new()),
            ChecksumAlgorithm::SHA256 => FileHash::SHA256(SHA256Hasher::new()),
            ChecksumAlgorithm::SHA512 => FileHash::SHA512(SHA512Hasher::new()),
        }
    }

    /// Hashes the whole content of an upload.
    ///
    /// Files are read in chunks, in-memory content is consumed at once.
    pub async fn hash(&self, file: &UploadFile) -> Result<(), D1Error> {
        match &file.file {
            FileSource::Bytes(content) => {
                self.consume(content);
                Ok(())
            }
            FileSource::Path(path) => {
                let mut file = File::open(path).await.map_err(|e| {
                    D1Error::client_side(format!("Could not open {path:?} for hashing"), Some(e))
                })?;

                let mut buffer = vec![0; READ_BUFFER];
                loop {
                    let bytes_read = file.read(&mut buffer).await?;
                    if bytes_read == 0 {
                        break;
                    }
                    self.consume(&buffer[..bytes_read]);
                }

                Ok(())
            }
        }
    }
}

impl FromStr for FileHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FileHash::new(s.parse()?))
    }
}

impl Hasher for FileHash {
    fn consume(&self, data: &[u8]) {
        match self {
            FileHash::MD5(hasher) => hasher.consume(data),
            FileHash::SHA1(hasher) => hasher.consume(data),
            FileHash::SHA256(hasher) => hasher.consume(data),
            FileHash::SHA512(hasher) => hasher.consume(data),
        }
    }

    fn compute(&self) -> String {
        match self {
            FileHash::MD5(hasher) => hasher.compute(),
            FileHash::SHA1(hasher) => hasher.compute(),
            FileHash::SHA256(hasher) => hasher.compute(),
            FileHash::SHA512(hasher) => hasher.compute(),
        }
    }

    fn to_callback(&self) -> CallbackFun {
        match self {
            FileHash::MD5(hasher) => hasher.to_callback(),
            FileHash::SHA1(hasher) => hasher.to_callback(),
            FileHash::SHA256(hasher) => hasher.to_callback(),
            FileHash::SHA512(hasher) => hasher.to_callback(),
        }
    }

    fn algorithm(&self) -> ChecksumAlgorithm {
        match self {
            FileHash::MD5(hasher) => hasher.algorithm(),
            FileHash::SHA1(hasher) => hasher.algorithm(),
            FileHash::SHA256(hasher) => hasher.algorithm(),
            FileHash::SHA512(hasher) => hasher.algorithm(),
        }
    }
}

/// MD5 through the `md5` crate, which has its own context type.
#[derive(Clone)]
pub struct MD5Hasher(Arc<Mutex<md5::Context>>);

impl MD5Hasher {
    pub fn new() -> Self {
        MD5Hasher(Arc::new(Mutex::new(md5::Context::new())))
    }
}

impl Default for MD5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for MD5Hasher {
    fn consume(&self, data: &[u8]) {
        self.0.lock().consume(data);
    }

    fn compute(&self) -> String {
        let context = self.0.lock().clone();
        format!("{:x}", context.compute())
    }

    fn to_callback(&self) -> CallbackFun {
        let context = Arc::clone(&self.0);
        CallbackFun::wrap(move |data: &[u8]| context.lock().consume(data))
    }

    fn algorithm(&self) -> ChecksumAlgorithm {
        ChecksumAlgorithm::MD5
    }
}

/// A hasher over any RustCrypto digest.
pub struct DigestHasher<D> {
    state: Arc<Mutex<D>>,
    algorithm: ChecksumAlgorithm,
}

pub type SHA1Hasher = DigestHasher<Sha1>;
pub type SHA256Hasher = DigestHasher<Sha256>;
pub type SHA512Hasher = DigestHasher<Sha512>;

impl<D> Clone for DigestHasher<D> {
    fn clone(&self) -> Self {
        DigestHasher {
            state: Arc::clone(&self.state),
            algorithm: self.algorithm,
        }
    }
}

impl SHA1Hasher {
    pub fn new() -> Self {
        Self::with_algorithm(ChecksumAlgorithm::SHA1)
    }
}

impl SHA256Hasher {
    pub fn new() -> Self {
        Self::with_algorithm(ChecksumAlgorithm::SHA256)
    }
}

impl SHA512Hasher {
    pub fn new() -> Self {
        Self::with_algorithm(ChecksumAlgorithm::SHA512)
    }
}

impl<D: Digest> DigestHasher<D> {
    fn with_algorithm(algorithm: ChecksumAlgorithm) -> Self {
        DigestHasher {
            state: Arc::new(Mutex::new(D::new())),
            algorithm,
        }
    }
}

impl<D> Hasher for DigestHasher<D>
where
    D: Digest + Clone + Send + 'static,
{
    fn consume(&self, data: &[u8]) {
        self.state.lock().update(data);
    }

    fn compute(&self) -> String {
        let digest = self.state.lock().clone();
        hex(&digest.finalize())
    }

    fn to_callback(&self) -> CallbackFun {
        let state = Arc::clone(&self.state);
        CallbackFun::wrap(move |data: &[u8]| state.lock().update(data))
    }

    fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Computes the checksum of in-memory content.
pub fn checksum_bytes(algorithm: ChecksumAlgorithm, data: &[u8]) -> Checksum {
    let hasher = FileHash::new(algorithm);
    hasher.consume(data);
    hasher.to_checksum()
}

/// Checks `data` against an expected checksum.
///
/// # Returns
///
/// Whether the digests match, or a client-side error if the algorithm of
/// `expected` is not supported.
pub fn verify(expected: &Checksum, data: &[u8]) -> Result<bool, D1Error> {
    let algorithm = expected.algorithm_kind().map_err(D1Error::client_message)?;
    Ok(checksum_bytes(algorithm, data).matches(expected))
}
