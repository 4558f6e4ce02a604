//! # Error Types
//!
//! General error handling for symtree.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only decoding and resolver setup can fail. Symbolication itself is total:
//! unresolved addresses and frames without a binary identity are represented
//! in the model as absence, never as errors.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for symtree operations
///
/// ## Error Categories
///
/// 1. **Decode errors**: Decode, InvalidTimestamp
/// 2. **Argument errors**: InvalidArgument
/// 3. **Resolver setup errors**: ImageParse, MissingImageId
/// 4. **I/O errors**: Io (for file operations, etc.)
#[derive(Error, Debug)]
pub enum SymtreeError
{
    /// The payload JSON is malformed or misses a required field
    ///
    /// Decoding is atomic: when any diagnostic inside a payload fails to
    /// decode, the whole payload is rejected.
    #[error("Failed to decode diagnostic JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// A payload timestamp matched none of the accepted formats
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Invalid argument passed to a symtree function
    ///
    /// Examples:
    /// - A malformed `UUID=PATH` binary mapping
    /// - A malformed `PLATFORM=MAJOR.MINOR` reconciliation override
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A binary image could not be parsed by the on-disk resolver
    #[error("Failed to parse image {}: {details}", .path.display())]
    ImageParse
    {
        /// Path of the image that failed to parse
        path: PathBuf,
        /// Parser error details
        details: String,
    },

    /// A binary image carries no identifier and none was supplied
    #[error("Image {} has no UUID or build id", .0.display())]
    MissingImageId(PathBuf),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymtreeError>`
///
/// ```rust
/// use symtree_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymtreeError>;
