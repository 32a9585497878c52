/// Failure reported by a telemetry source.
///
/// These are never interpreted by the aggregation layer; the dashboard hands
/// them back to its caller as-is.
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Source read error: {e}"),
            Self::Parse(e) => write!(f, "Source parse error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Live mode timers could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveModeError {
    /// No tokio runtime is available on the calling thread.
    NoRuntime,
}

impl std::fmt::Display for LiveModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRuntime => write!(f, "Live mode requires a running tokio runtime"),
        }
    }
}

impl std::error::Error for LiveModeError {}

/// Unknown reporting period name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodError(pub String);

impl std::fmt::Display for PeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid period: {}. Use 'day', '7d', '30d' or '90d'.",
            self.0
        )
    }
}

impl std::error::Error for PeriodError {}
