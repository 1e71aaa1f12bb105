//! Result type alias for archivelink

use super::errors::ArchiveError;

/// Result type alias for archivelink operations
///
/// # Examples
///
/// ```
/// use archivelink::domain::result::Result;
/// use archivelink::domain::errors::ArchiveError;
///
/// fn failing_function() -> Result<()> {
///     Err(ArchiveError::Domain("missing form data".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ArchiveError>;
