//! Incremental reading of rental container logs.

use std::time::Duration;

use basilica_core::Error;
use reqwest::Response;

use crate::Result;

/// Request timeout applied to a followed log stream instead of the client-wide one.
pub const LOG_FOLLOW_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Open log stream of a rental.
///
/// Chunks are handed out as the server sends them. With `follow` set the stream only
/// ends when the server closes it, the follow timeout elapses, or the stream is dropped.
#[derive(Debug)]
pub struct LogStream {
    rental_id: String,
    response: Response,
}

impl LogStream {
    pub(crate) fn new(rental_id: impl Into<String>, response: Response) -> Self {
        Self {
            rental_id: rental_id.into(),
            response,
        }
    }

    /// Rental the logs belong to.
    #[must_use]
    pub fn rental_id(&self) -> &str {
        &self.rental_id
    }

    /// Wait for the next chunk of log output. `None` once the server closes the stream.
    ///
    /// Chunk boundaries follow the transport and may split lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the request deadline passes mid-stream, or another
    /// transport error if the connection breaks. Chunks already returned stay valid.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = self.response.chunk().await.map_err(Error::from)?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }

    /// Read the remaining output as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read to the end.
    pub async fn into_text(self) -> Result<String> {
        let rental_id = self.rental_id;
        self.response.text().await.map_err(|err| {
            Error::ParseError(format!("Failed to read logs for rental `{rental_id}`: {err}"))
        })
    }
}
