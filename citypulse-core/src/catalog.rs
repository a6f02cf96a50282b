//! Ticketmaster Discovery catalog client.
//!
//! A stateless fetch wrapper over the Discovery v2 API. The session and
//! favorites core only ever stores event ids; nothing in this crate
//! interprets event payloads beyond deserializing them for the UI. Sets
//! sensible defaults — timeout, versioned user-agent — and retries
//! transient failures.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::error::CityPulseError;

/// Public Discovery API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://app.ticketmaster.com/discovery/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRIES: usize = 3; // total attempts = 4
const DEFAULT_PAGE_SIZE: u32 = 20;

/// An event as returned by the Discovery API.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event id — the only field the session core stores.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Promo images.
    #[serde(default)]
    pub images: Vec<EventImage>,
    /// Schedule information, when published.
    #[serde(default)]
    pub dates: Option<EventDates>,
    /// Free-form info text.
    #[serde(default)]
    pub info: Option<String>,
    /// Important notes from the organizer.
    #[serde(default, rename = "pleaseNote")]
    pub please_note: Option<String>,
    #[serde(default, rename = "_embedded")]
    embedded: Option<EventEmbedded>,
}

impl Event {
    /// City of the first listed venue, when present.
    #[must_use]
    pub fn venue_city(&self) -> Option<&str> {
        self.embedded
            .as_ref()?
            .venues
            .first()?
            .city
            .as_ref()
            .map(|city| city.name.as_str())
    }

    /// Name of the first listed venue, when present.
    #[must_use]
    pub fn venue_name(&self) -> Option<&str> {
        self.embedded
            .as_ref()?
            .venues
            .first()?
            .name
            .as_deref()
    }
}

/// A promo image attached to an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventImage {
    /// Image URL.
    pub url: String,
    /// Pixel width.
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height.
    #[serde(default)]
    pub height: Option<u32>,
}

/// Start-date information.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDates {
    /// Start descriptor.
    #[serde(default)]
    pub start: Option<EventStart>,
}

/// Local start date and time.
#[derive(Debug, Clone, Deserialize)]
pub struct EventStart {
    /// Local date (`YYYY-MM-DD`).
    #[serde(default, rename = "localDate")]
    pub local_date: Option<String>,
    /// Local time (`HH:MM:SS`).
    #[serde(default, rename = "localTime")]
    pub local_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventEmbedded {
    #[serde(default)]
    venues: Vec<Venue>,
}

#[derive(Debug, Clone, Deserialize)]
struct Venue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<VenueCity>,
}

#[derive(Debug, Clone, Deserialize)]
struct VenueCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default, rename = "_embedded")]
    embedded: Option<SearchEmbedded>,
}

#[derive(Debug, Deserialize)]
struct SearchEmbedded {
    #[serde(default)]
    events: Vec<Event>,
}

/// Search filters for [`EventCatalog::search_events`].
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Keyword filter.
    pub keyword: Option<String>,
    /// City filter.
    pub city: Option<String>,
    /// Zero-based page number (defaults to 0).
    pub page: Option<u32>,
    /// Page size (defaults to 20).
    pub size: Option<u32>,
}

/// Client for the Ticketmaster Discovery API.
#[derive(Debug)]
pub struct EventCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EventCatalog {
    /// Creates a client against the public Discovery endpoint.
    ///
    /// Without an API key requests still go out; the upstream answers them
    /// with an authentication error the caller sees as a request failure.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client against a custom endpoint (tests, proxies).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Searches events by keyword and/or city.
    ///
    /// Returns an empty list when the response carries no events.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or a
    /// payload that does not deserialize.
    pub async fn search_events(
        &self,
        params: &SearchParams,
    ) -> Result<Vec<Event>, CityPulseError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", params.page.unwrap_or(0).to_string()),
            ("size", params.size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
        ];
        if let Some(keyword) = &params.keyword {
            query.push(("keyword", keyword.clone()));
        }
        if let Some(city) = &params.city {
            query.push(("city", city.clone()));
        }

        let request = self.get("/events.json").query(&query);
        let response = self.handle(request).await?.error_for_status()?;
        let envelope: SearchEnvelope = response.json().await?;
        Ok(envelope
            .embedded
            .map(|embedded| embedded.events)
            .unwrap_or_default())
    }

    /// Fetches one event by id. An upstream 404 is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, any other non-success status,
    /// or a payload that does not deserialize.
    pub async fn event_by_id(&self, id: &str) -> Result<Option<Event>, CityPulseError> {
        let request = self.get(&format!("/events/{id}.json"));
        let response = self.handle(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }

    /// Creates a GET request builder with defaults applied.
    fn get(&self, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .header(
                "User-Agent",
                format!("citypulse-core/{}", env!("CARGO_PKG_VERSION")),
            );
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("apikey", api_key)]);
        }
        request
    }

    /// Sends a request with exponential retries for transient failures.
    async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, CityPulseError> {
        let Some(template) = request_builder.try_clone() else {
            return execute_request_builder(request_builder)
                .await
                .map_err(Into::into);
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(MAX_RETRIES);

        (|| async {
            let request_builder = template.try_clone().ok_or_else(|| {
                TransportError::permanent(
                    "<unknown>",
                    None,
                    "request cannot be retried because it is not cloneable",
                )
            })?;
            execute_request_builder(request_builder).await
        })
        .retry(backoff)
        .when(|err: &TransportError| err.is_retryable())
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug)]
struct TransportError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl TransportError {
    fn retryable(url: impl Into<String>, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            error: error.into(),
            retryable: true,
        }
    }

    fn permanent(url: impl Into<String>, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            error: error.into(),
            retryable: false,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<TransportError> for CityPulseError {
    fn from(value: TransportError) -> Self {
        Self::NetworkError {
            url: value.url,
            status: value.status,
            error: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, TransportError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        TransportError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                return Err(TransportError::retryable(
                    url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ));
            }
            Ok(response)
        }
        Err(err) => {
            if err.is_timeout() || err.is_connect() {
                return Err(TransportError::retryable(
                    url,
                    None,
                    format!("request timeout/connect error: {err}"),
                ));
            }
            Err(TransportError::permanent(
                url,
                None,
                format!("request failed: {err}"),
            ))
        }
    }
}
