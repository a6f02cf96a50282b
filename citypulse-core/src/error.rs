use thiserror::Error;

/// Error outputs from the CityPulse catalog client.
///
/// The session and favorites layer never surfaces these: its operations
/// degrade to documented defaults instead (see [`crate::SessionContext`]).
/// Only the catalog client, a plain network fetch wrapper, reports
/// failures to its caller.
#[derive(Debug, Error)]
pub enum CityPulseError {
    /// Network connection error with details.
    #[error("network_error: {url} (status: {status:?}): {error}")]
    NetworkError {
        /// URL of the failed request.
        url: String,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Description of the failure.
        error: String,
    },
    /// HTTP request failure.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}
