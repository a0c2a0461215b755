//! Command Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What stopped a command before it could finish.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not load keywords")]
    Keywords,
    #[display("could not prepare the output directory")]
    Layout,
    #[display("scan failed")]
    Scan,
    #[display("could not collect statistics")]
    Stats,
    #[display("could not group files")]
    Group,
    #[display("cleanup failed")]
    Cleanup,
}
impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cleanup)
    }

    /// Cleanup only runs once the real work is done; anything else means
    /// nothing useful happened.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Cleanup => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Config, 2)]
    #[case(ErrorKind::Keywords, 2)]
    #[case(ErrorKind::Scan, 2)]
    #[case(ErrorKind::Cleanup, 1)]
    fn exit_codes(#[case] kind: ErrorKind, #[case] code: u8) {
        assert_eq!(kind.exit_code(), code);
    }
}
