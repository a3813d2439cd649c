//! File digests
//!
//! Computes sha256/sha512/md5/blake2b digests of local files as lowercase hex.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake2::Blake2b512;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::FilesystemError;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Md5,
    Blake2b,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
            Self::Blake2b => "blake2b",
        };
        f.write_str(name)
    }
}

/// Compute the digest of in-memory data
pub fn digest_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
        HashAlgorithm::Blake2b => hex::encode(Blake2b512::digest(data)),
    }
}

/// Compute the digest of a file, streaming its contents
pub fn digest_file(algorithm: HashAlgorithm, path: &Path) -> Result<String, FilesystemError> {
    let file = File::open(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let reader = BufReader::new(file);

    let result = match algorithm {
        HashAlgorithm::Sha256 => stream::<Sha256>(reader),
        HashAlgorithm::Sha512 => stream::<Sha512>(reader),
        HashAlgorithm::Md5 => stream::<Md5>(reader),
        HashAlgorithm::Blake2b => stream::<Blake2b512>(reader),
    };

    result.map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn stream<D: Digest>(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
