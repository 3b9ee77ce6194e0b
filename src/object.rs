use std::path::Path;

use bytes::Bytes;

use crate::error::D1Error;
use crate::file::UploadFile;
use crate::hasher::{checksum_bytes, FileHash, Hasher};
use crate::types::{
    AccessPolicy, ChecksumAlgorithm, Identifier, ObjectFormatIdentifier, ReplicationPolicy,
    Subject, SystemMetadata,
};

/// An object together with the system metadata describing it, ready to be
/// created on a member node.
#[derive(Debug, Clone)]
pub struct D1Object {
    pub data: UploadFile,
    pub sysmeta: SystemMetadata,
}

impl D1Object {
    /// Builds an object from a local file.
    ///
    /// The file is read once to compute its checksum; the upload itself
    /// streams it again from disk.
    ///
    /// # Arguments
    ///
    /// * `pid` - The identifier to create the object under.
    /// * `path` - Path to the file.
    /// * `format_id` - The object format, e.g. `text/csv`.
    /// * `submitter` - The subject submitting the object.
    /// * `rights_holder` - The subject holding all rights to the object.
    /// * `algorithm` - The checksum algorithm recorded in the metadata.
    pub async fn from_path(
        pid: Identifier,
        path: impl AsRef<Path>,
        format_id: ObjectFormatIdentifier,
        submitter: Subject,
        rights_holder: Subject,
        algorithm: ChecksumAlgorithm,
    ) -> Result<Self, D1Error> {
        let data = UploadFile::from_path(path).await?;

        let hasher = FileHash::new(algorithm);
        hasher.hash(&data).await?;

        let mut sysmeta = SystemMetadata::new(
            pid,
            format_id,
            data.size,
            hasher.to_checksum(),
            submitter,
            rights_holder,
        );
        sysmeta.file_name = Some(data.name.clone());

        Ok(D1Object { data, sysmeta })
    }

    /// Builds an object from content held in memory.
    pub fn from_bytes(
        pid: Identifier,
        file_name: impl Into<String>,
        content: impl Into<Bytes>,
        format_id: ObjectFormatIdentifier,
        submitter: Subject,
        rights_holder: Subject,
        algorithm: ChecksumAlgorithm,
    ) -> Self {
        let content = content.into();
        let checksum = checksum_bytes(algorithm, &content);
        let data = UploadFile::from_bytes(file_name, content);

        let mut sysmeta = SystemMetadata::new(
            pid,
            format_id,
            data.size,
            checksum,
            submitter,
            rights_holder,
        );
        sysmeta.file_name = Some(data.name.clone());

        D1Object { data, sysmeta }
    }

    pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
        self.sysmeta.access_policy = Some(policy);
        self
    }

    pub fn with_replication_policy(mut self, policy: ReplicationPolicy) -> Self {
        self.sysmeta.replication_policy = Some(policy);
        self
    }

    pub fn pid(&self) -> &Identifier {
        &self.sysmeta.identifier
    }
}
