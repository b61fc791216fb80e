//! HTTP client for the relay's control plane.

use reqwest::Url;

use crate::api::dto::{ChannelsResponse, ResetResponse};
use crate::config::ClientConfig;
use crate::error::CorrelatorError;

/// Thin `reqwest` wrapper around `GET /channels` and
/// `DELETE /channels/{name}`.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AdminClient {
    /// Creates a client for the relay at `base_url` (e.g. `http://localhost:3055`).
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, CorrelatorError> {
        let base_url =
            Url::parse(base_url).map_err(|e| CorrelatorError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// Creates a client for the relay named in `config`.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, CorrelatorError> {
        Self::new(&config.http_url())
    }

    /// Fetches the occupancy snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::Http`] on transport failures or non-2xx
    /// responses.
    pub async fn channels(&self) -> Result<ChannelsResponse, CorrelatorError> {
        let url = self.endpoint(&["channels"])?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Force-resets `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::Http`] on transport failures or non-2xx
    /// responses.
    pub async fn reset(&self, name: &str) -> Result<ResetResponse, CorrelatorError> {
        let url = self.endpoint(&["channels", name])?;
        let response = self.http.delete(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CorrelatorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CorrelatorError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_channel_names() {
        let Ok(client) = AdminClient::new("http://localhost:3055") else {
            panic!("valid url");
        };
        let Ok(url) = client.endpoint(&["channels", "team a/b"]) else {
            panic!("valid endpoint");
        };
        assert_eq!(url.as_str(), "http://localhost:3055/channels/team%20a%2Fb");
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(matches!(
            AdminClient::new("not a url"),
            Err(CorrelatorError::InvalidUrl(_))
        ));
    }
}
