//! Push notifications.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::client::Client;
use crate::codec::{self, Date};
use crate::error::{ConfigurationError, Error};
use crate::query::Query;
use crate::rest::{PUSH, RequestAuth};
use crate::schema::Installation;

/// A push notification to a set of installations.
///
/// Targets are channels, an installation query, or both. Pushes are sent
/// with the master key when one is configured and never with a session.
///
/// ```no_run
/// use parsekit::{ClientConfig, Installation, ParseApi, PushNotification, Query};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), parsekit::Error> {
/// let client = ClientConfig::new("app-id", "rest-key")
///     .master_key("master")
///     .build()?;
///
/// let push = PushNotification::new()
///     .channels(["giants"])
///     .where_query(&Query::<Installation>::new().equal_to("deviceType", "ios"))
///     .data(json!({ "alert": "The Giants won!" }).as_object().cloned().unwrap_or_default());
/// client.send_push(&push).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PushNotification {
    channels: Vec<String>,
    filter: Option<Value>,
    push_time: Option<DateTime<Utc>>,
    expiration_time: Option<DateTime<Utc>>,
    expiration_interval: Option<Duration>,
    data: Map<String, Value>,
    error: Option<Error>,
}

impl PushNotification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send to installations subscribed to any of these channels.
    pub fn channels<S: Into<String>>(mut self, channels: impl IntoIterator<Item = S>) -> Self {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Send to installations matching a query.
    pub fn where_query(mut self, query: &Query<Installation>) -> Self {
        match query.where_document() {
            Ok(filter) => self.filter = Some(filter),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
        self
    }

    /// Deliver at a later time instead of immediately.
    pub fn push_time(mut self, at: DateTime<Utc>) -> Self {
        self.push_time = Some(at);
        self
    }

    /// Drop the notification if undelivered by this time.
    pub fn expiration_time(mut self, at: DateTime<Utc>) -> Self {
        self.expiration_time = Some(at);
        self
    }

    /// Drop the notification if undelivered this long after sending.
    ///
    /// A zero interval clears it.
    pub fn expiration_interval(mut self, interval: Duration) -> Self {
        self.expiration_interval = Some(interval).filter(|interval| !interval.is_zero());
        self
    }

    /// The payload delivered to devices, e.g. `alert`, `badge`, `sound`.
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// The request body.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ConflictingExpiration`] when both an
    /// expiration time and interval are set.
    pub fn body(&self) -> Result<Map<String, Value>, Error> {
        if let Some(ref err) = self.error {
            return Err(err.clone());
        }
        if self.expiration_time.is_some() && self.expiration_interval.is_some() {
            return Err(ConfigurationError::ConflictingExpiration.into());
        }

        let mut body = Map::new();
        if !self.channels.is_empty() {
            body.insert("channels".to_string(), codec::to_wire(&self.channels)?);
        }
        if let Some(ref filter) = self.filter {
            body.insert("where".to_string(), filter.clone());
        }
        if let Some(at) = self.push_time {
            body.insert("push_time".to_string(), codec::to_wire(&Date::new(at))?);
        }
        if let Some(at) = self.expiration_time {
            body.insert("expiration_time".to_string(), codec::to_wire(&Date::new(at))?);
        }
        if let Some(interval) = self.expiration_interval {
            body.insert(
                "expiration_interval".to_string(),
                Value::from(interval.as_secs()),
            );
        }
        if !self.data.is_empty() {
            body.insert("data".to_string(), Value::Object(self.data.clone()));
        }
        Ok(body)
    }

    /// Send the notification.
    #[instrument(skip_all, fields(server = %client.server()))]
    pub async fn send(&self, client: &Client) -> Result<(), Error> {
        let body = self.body()?;
        debug!(channels = self.channels.len(), targeted = self.filter.is_some(), "sending push");
        client
            .rest()
            .post(PUSH, &body, RequestAuth::new(None, true))
            .await?;
        Ok(())
    }
}
