//! CLI command implementations
//!
//! Every command returns a process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 2 | Configuration error |
//! | 4 | Platform or transport unreachable or rejecting requests |
//! | 5 | Fatal error |

pub mod init;
pub mod run;
pub mod send;
pub mod validate;

use crate::domain::ArchiveError;

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_CONFIG: i32 = 2;
pub(crate) const EXIT_CONNECTION: i32 = 4;
pub(crate) const EXIT_FATAL: i32 = 5;

/// Exit code for a failed command
pub(crate) fn exit_code_for(error: &ArchiveError) -> i32 {
    match error {
        ArchiveError::Configuration(_) => EXIT_CONFIG,
        ArchiveError::Platform(_) | ArchiveError::Transport(_) => EXIT_CONNECTION,
        _ => EXIT_FATAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlatformError, TransportError};

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&ArchiveError::Configuration("x".to_string())),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code_for(&PlatformError::ConnectionFailed("x".to_string()).into()),
            EXIT_CONNECTION
        );
        assert_eq!(exit_code_for(&TransportError::Closed.into()), EXIT_CONNECTION);
        assert_eq!(
            exit_code_for(&ArchiveError::Domain("x".to_string())),
            EXIT_FATAL
        );
    }
}
