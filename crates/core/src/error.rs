use std::fmt;

/// Coarse classification of a failure at the backend boundary.
///
/// Every error raised while talking to the backend maps onto one of these
/// so that log lines and failed acknowledgements can be grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network unreachable, connection refused or a non-2xx status.
    Transport,
    /// The response body was not valid JSON.
    Parse,
    /// Valid JSON that lacks the fields the contract requires.
    Protocol,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
            FailureKind::Protocol => "protocol",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
