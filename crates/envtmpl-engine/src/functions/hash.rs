//! Digests and HMACs over the checksum and cryptographic hash families

use hmac::{Hmac, Mac};
use md5::Md5;
use minijinja::value::Rest;
use minijinja::{Error, Value};
use phf::phf_map;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::{FunctionError, RegistryError};
use crate::registry::{FunctionDescriptor, Registry};
use crate::suggestions::did_you_mean;

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
const CRC64_ECMA: crc::Crc<u64> = crc::Crc::<u64>::new(&crc::CRC_64_XZ);
const CRC64_ISO: crc::Crc<u64> = crc::Crc::<u64>::new(&crc::CRC_64_GO_ISO);

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Adler32,
    Crc32,
    Crc64Ecma,
    Crc64Iso,
    Fnv1_32,
    Fnv1a32,
    Fnv1_64,
    Fnv1a64,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

static ALGORITHMS: phf::Map<&'static str, HashAlgorithm> = phf_map! {
    "adler32" => HashAlgorithm::Adler32,
    "crc32" => HashAlgorithm::Crc32,
    "crc64ecma" => HashAlgorithm::Crc64Ecma,
    "crc64iso" => HashAlgorithm::Crc64Iso,
    "fnv1-32" => HashAlgorithm::Fnv1_32,
    "fnv1a-32" => HashAlgorithm::Fnv1a32,
    "fnv1-64" => HashAlgorithm::Fnv1_64,
    "fnv1a-64" => HashAlgorithm::Fnv1a64,
    "md5" => HashAlgorithm::Md5,
    "sha1" => HashAlgorithm::Sha1,
    "sha224" => HashAlgorithm::Sha224,
    "sha256" => HashAlgorithm::Sha256,
    "sha384" => HashAlgorithm::Sha384,
    "sha512" => HashAlgorithm::Sha512,
};

impl HashAlgorithm {
    /// Every algorithm in help order
    pub const ALL: [HashAlgorithm; 14] = [
        Self::Adler32,
        Self::Crc32,
        Self::Crc64Ecma,
        Self::Crc64Iso,
        Self::Fnv1_32,
        Self::Fnv1a32,
        Self::Fnv1_64,
        Self::Fnv1a64,
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Look an algorithm up by name, ignoring case
    pub fn from_name(name: &str) -> Result<Self, FunctionError> {
        ALGORITHMS
            .get(name.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| FunctionError::UnknownAlgorithm {
                name: name.to_string(),
                suggestion: did_you_mean(&name.to_lowercase(), ALGORITHMS.keys().copied()),
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Adler32 => "adler32",
            Self::Crc32 => "crc32",
            Self::Crc64Ecma => "crc64ecma",
            Self::Crc64Iso => "crc64iso",
            Self::Fnv1_32 => "fnv1-32",
            Self::Fnv1a32 => "fnv1a-32",
            Self::Fnv1_64 => "fnv1-64",
            Self::Fnv1a64 => "fnv1a-64",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Raw digest bytes; checksums are emitted big-endian
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Adler32 => adler2::adler32_slice(data).to_be_bytes().to_vec(),
            Self::Crc32 => CRC32.checksum(data).to_be_bytes().to_vec(),
            Self::Crc64Ecma => CRC64_ECMA.checksum(data).to_be_bytes().to_vec(),
            Self::Crc64Iso => CRC64_ISO.checksum(data).to_be_bytes().to_vec(),
            Self::Fnv1_32 => fnv32(data, false).to_be_bytes().to_vec(),
            Self::Fnv1a32 => fnv32(data, true).to_be_bytes().to_vec(),
            Self::Fnv1_64 => fnv64(data, false).to_be_bytes().to_vec(),
            Self::Fnv1a64 => fnv64(data, true).to_be_bytes().to_vec(),
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Keyed digest (RFC 2104)
    pub fn hmac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, FunctionError> {
        match self {
            Self::Md5 => mac::<Hmac<Md5>>(key, data),
            Self::Sha1 => mac::<Hmac<Sha1>>(key, data),
            Self::Sha224 => mac::<Hmac<Sha224>>(key, data),
            Self::Sha256 => mac::<Hmac<Sha256>>(key, data),
            Self::Sha384 => mac::<Hmac<Sha384>>(key, data),
            Self::Sha512 => mac::<Hmac<Sha512>>(key, data),
            _ => Ok(self.checksum_hmac(key, data)),
        }
    }

    /// Input block size used when keying a checksum
    fn block_size(&self) -> usize {
        match self {
            Self::Adler32 => 4,
            _ => 1,
        }
    }

    fn checksum_hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let block = self.block_size();
        let mut key = if key.len() > block {
            self.digest(key)
        } else {
            key.to_vec()
        };
        key.resize(block, 0);

        let inner_input: Vec<u8> = key
            .iter()
            .map(|b| b ^ IPAD)
            .chain(data.iter().copied())
            .collect();
        let inner = self.digest(&inner_input);

        let outer_input: Vec<u8> = key.iter().map(|b| b ^ OPAD).chain(inner).collect();
        self.digest(&outer_input)
    }
}

fn mac<M>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, FunctionError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| FunctionError::invalid("hash", format!("invalid key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn fnv32(data: &[u8], xor_first: bool) -> u32 {
    data.iter().fold(FNV32_OFFSET, |hash, &byte| {
        if xor_first {
            (hash ^ u32::from(byte)).wrapping_mul(FNV32_PRIME)
        } else {
            hash.wrapping_mul(FNV32_PRIME) ^ u32::from(byte)
        }
    })
}

fn fnv64(data: &[u8], xor_first: bool) -> u64 {
    data.iter().fold(FNV64_OFFSET, |hash, &byte| {
        if xor_first {
            (hash ^ u64::from(byte)).wrapping_mul(FNV64_PRIME)
        } else {
            hash.wrapping_mul(FNV64_PRIME) ^ u64::from(byte)
        }
    })
}

/// Parsed `hash` arguments: `(algorithm, data)` or `(algorithm, key, data)`
#[derive(Debug, Clone, PartialEq, Eq)]
enum HashRequest {
    Digest {
        algorithm: HashAlgorithm,
        data: String,
    },
    Hmac {
        algorithm: HashAlgorithm,
        key: String,
        data: String,
    },
}

impl HashRequest {
    fn parse(args: Vec<String>) -> Result<Self, FunctionError> {
        let got = args.len();
        let mut args = args.into_iter();
        match (args.next(), args.next(), args.next(), args.next()) {
            (Some(algorithm), Some(data), None, None) => Ok(Self::Digest {
                algorithm: HashAlgorithm::from_name(&algorithm)?,
                data,
            }),
            (Some(algorithm), Some(key), Some(data), None) => {
                let algorithm = HashAlgorithm::from_name(&algorithm)?;
                if key.is_empty() {
                    Ok(Self::Digest { algorithm, data })
                } else {
                    Ok(Self::Hmac {
                        algorithm,
                        key,
                        data,
                    })
                }
            }
            _ => Err(FunctionError::arity("hash", "2 or 3", got)),
        }
    }

    fn compute(&self) -> Result<String, FunctionError> {
        let bytes = match self {
            Self::Digest { algorithm, data } => algorithm.digest(data.as_bytes()),
            Self::Hmac {
                algorithm,
                key,
                data,
            } => algorithm.hmac(key.as_bytes(), data.as_bytes())?,
        };
        Ok(hex::encode(bytes))
    }
}

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let descriptor = HashAlgorithm::ALL.iter().fold(
        FunctionDescriptor::plain(
            "Computes the hex digest of a value. An optional key turns it into an HMAC.",
            Value::from_function(hash),
        ),
        |descriptor, algorithm| {
            let name = algorithm.name();
            descriptor.with_example(format!(
                "{{{{ \"Hello World!\" | %s(\"{name}\") }}}}\n{{{{ \"Hello World!\" | %s(\"{name}\", \"a key\") }}}}"
            ))
        },
    );
    registry.register("hash", descriptor)
}

/// Usage: {{ "data" | hash("sha256") }} or {{ "data" | hash("sha256", "key") }}
pub fn hash(args: Rest<String>) -> Result<String, Error> {
    Ok(HashRequest::parse(args.0)?.compute()?)
}
