//! Error types for the build-inspection pipeline

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors raised while analyzing a build
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No container could be opened
    #[error("no container could be opened: {0}")]
    NoContainers(String),

    /// Bundle signature did not match `UnityFS`
    #[error("bad bundle header: {0}")]
    BadBundleHeader(String),

    /// A compression type outside none/LZ4/LZ4HC was encountered
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Block decompression produced no usable output
    #[error("decode failed: {0}")]
    DecodeFailure(String),

    /// A serialized-asset file could not be parsed
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    /// Not enough bytes remained to satisfy a read
    #[error("short read: expected {expected}, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// A zip-level error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Invalid UTF-8 where a string read demanded it
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// LZ4 block decompression error
    #[error("lz4 decompression failed: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),
}

/// Where a failure should be caught and dropped: the whole analysis call,
/// one bundle, or one asset. Mirrors `BinaryError::severity`'s spirit but
/// keyed to the three try-boundaries this pipeline actually has (spec §9
/// "errors vs. recoveries") rather than a generic low/medium/high scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Halts the whole analysis call.
    Fatal,
    /// Local to the bundle currently being read; the bundle is skipped.
    BundleLocal,
    /// Local to the asset (or object) currently being parsed; the asset is skipped.
    AssetLocal,
}

impl AnalyzerError {
    pub fn no_containers<S: Into<String>>(msg: S) -> Self {
        Self::NoContainers(msg.into())
    }

    pub fn bad_bundle_header<S: Into<String>>(msg: S) -> Self {
        Self::BadBundleHeader(msg.into())
    }

    pub fn unsupported_compression<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedCompression(msg.into())
    }

    pub fn decode_failure<S: Into<String>>(msg: S) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn malformed_asset<S: Into<String>>(msg: S) -> Self {
        Self::MalformedAsset(msg.into())
    }

    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortRead { expected, actual }
    }

    /// Which try-boundary this failure belongs to: fatal to the whole
    /// analysis, local to the current bundle, or local to the current asset.
    /// The driver uses this to decide whether to abort, skip the bundle, or
    /// skip just the asset/object being parsed.
    pub fn scope(&self) -> FailureScope {
        match self {
            Self::NoContainers(_) => FailureScope::Fatal,
            Self::Io(_) => FailureScope::Fatal,
            Self::Zip(_) => FailureScope::Fatal,
            Self::BadBundleHeader(_) => FailureScope::BundleLocal,
            Self::UnsupportedCompression(_) => FailureScope::BundleLocal,
            Self::DecodeFailure(_) => FailureScope::BundleLocal,
            Self::MalformedAsset(_) => FailureScope::AssetLocal,
            Self::ShortRead { .. } => FailureScope::AssetLocal,
            Self::InvalidUtf8(_) => FailureScope::AssetLocal,
            Self::Lz4(_) => FailureScope::BundleLocal,
        }
    }

    /// True for the single error kind that halts an entire analysis call.
    /// Every other variant is local to one bundle/asset/node and should be
    /// logged and skipped by the caller.
    pub fn is_fatal(&self) -> bool {
        self.scope() == FailureScope::Fatal
    }
}
