//! Operations shared by [`Client`] and [`Session`](crate::Session).

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::auth::SessionToken;
use crate::client::Client;
use crate::codec;
use crate::error::{ConfigurationError, DecodeError, Error, InvalidInputError};
use crate::push::PushNotification;
use crate::query::{ObjectStream, Query, decode_row};
use crate::rest::{
    CONFIG, ConfigResponse, CreateResponse, Envelope, FunctionResponse, HEALTH, RequestAuth,
    function_path,
};
use crate::schema::{DynObject, ParseObject, object_path};
use crate::types::ClassName;

/// Object, query, function and push operations against the backend.
///
/// Implemented by [`Client`], which sends no session, and by
/// [`Session`](crate::Session), which sends its session token on every
/// request and never the master key.
///
/// # Example
///
/// ```no_run
/// use parsekit::{ClientConfig, ParseApi, Query, User};
///
/// # async fn example() -> Result<(), parsekit::Error> {
/// let client = ClientConfig::new("app-id", "rest-key").build()?;
///
/// let admins = client
///     .find(&Query::<User>::new().equal_to("role", "admin").order_by("username"))
///     .await?;
/// println!("{} admins", admins.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ParseApi: Send + Sync {
    /// The client requests go through.
    fn client(&self) -> &Client;

    /// The session bound to requests, if any.
    fn session_token(&self) -> Option<&SessionToken>;

    /// Request authentication for an operation.
    fn auth(&self, use_master_key: bool) -> RequestAuth<'_> {
        RequestAuth::new(self.session_token(), use_master_key)
    }

    /// Save a new object.
    ///
    /// On success the object's id and creation time are set from the
    /// response.
    #[instrument(skip_all, fields(class = %object.class_name()))]
    async fn create<T: ParseObject>(&self, object: &mut T, use_master_key: bool) -> Result<(), Error> {
        let body = codec::encode(object)?;
        let response = self
            .client()
            .rest()
            .post(&object.collection_path(), &body, self.auth(use_master_key))
            .await?;
        let created: CreateResponse = codec::decode(response)?;

        debug!(object_id = %created.object_id, "object created");
        let base = object.base_mut();
        base.object_id = Some(created.object_id);
        base.created_at = created.created_at;
        Ok(())
    }

    /// Delete a saved object.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::MissingObjectId`] if the object has no id.
    #[instrument(skip_all, fields(class = %object.class_name()))]
    async fn delete<T: ParseObject>(&self, object: &T, use_master_key: bool) -> Result<(), Error> {
        let object_id = object
            .object_id()
            .filter(|id| !id.is_empty())
            .ok_or(InvalidInputError::MissingObjectId {
                operation: "delete",
            })?;

        self.client()
            .rest()
            .delete(
                &object_path(object.class_name(), object_id),
                self.auth(use_master_key),
            )
            .await
    }

    /// Fetch one object of `T`'s class by id.
    async fn get<T: ParseObject>(&self, object_id: &str) -> Result<T, Error> {
        self.get_with(&Query::<T>::new(), object_id).await
    }

    /// Fetch one object by id, applying the query's `include` and `keys`.
    #[instrument(skip_all, fields(class = %query.class_name(), object_id = %object_id))]
    async fn get_with<T: ParseObject>(&self, query: &Query<T>, object_id: &str) -> Result<T, Error> {
        if object_id.is_empty() {
            return Err(InvalidInputError::MissingObjectId { operation: "get" }.into());
        }

        let path = format!("{}/{}", query.collection_path()?, object_id);
        let params: Vec<_> = query
            .params()?
            .into_iter()
            .filter(|(key, _)| key == "include" || key == "keys")
            .collect();

        let row = self
            .client()
            .rest()
            .get(&path, &params, self.auth(query.uses_master_key()))
            .await?;
        decode_row(row, query.class_name())
    }

    /// Fetch one object of a class known only at runtime.
    ///
    /// The object decodes into the type registered for the class, or into
    /// [`Object`](crate::Object).
    async fn fetch_dynamic(&self, class_name: &ClassName, object_id: &str) -> Result<DynObject, Error> {
        if object_id.is_empty() {
            return Err(InvalidInputError::MissingObjectId { operation: "get" }.into());
        }

        let row = self
            .client()
            .rest()
            .get(
                &object_path(class_name.as_str(), object_id),
                &[],
                self.auth(false),
            )
            .await?;
        self.client().decode_object(class_name.as_str(), row)
    }

    /// Run a query and decode every result.
    ///
    /// An empty result set is [`Error::NoRows`].
    #[instrument(skip_all, fields(class = %query.class_name()))]
    async fn find<T: ParseObject>(&self, query: &Query<T>) -> Result<Vec<T>, Error> {
        let path = query.collection_path()?;
        let params = query.params()?;
        let response = self
            .client()
            .rest()
            .get(&path, &params, self.auth(query.uses_master_key()))
            .await?;

        let rows = Envelope::parse(response)?.into_results()?;
        debug!(count = rows.len(), "query returned results");
        rows.into_iter()
            .map(|row| decode_row(row, query.class_name()))
            .collect()
    }

    /// Run a query limited to one result.
    async fn first<T: ParseObject>(&self, query: &Query<T>) -> Result<T, Error> {
        self.find(&query.for_first())
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoRows)
    }

    /// Count the objects a query matches.
    #[instrument(skip_all, fields(class = %query.class_name()))]
    async fn count<T: ParseObject>(&self, query: &Query<T>) -> Result<u64, Error> {
        let counting = query.for_count();
        let path = counting.collection_path()?;
        let params = counting.params()?;
        let response = self
            .client()
            .rest()
            .get(&path, &params, self.auth(query.uses_master_key()))
            .await?;

        match Envelope::parse(response)? {
            Envelope::Count(count) => Ok(count),
            _ => Err(DecodeError::TypeMismatch {
                message: "expected a count response".to_string(),
            }
            .into()),
        }
    }

    /// Stream every object a query matches, one batch at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::PagingWithStream`] if the query sets a
    /// limit, skip or order, and any error deferred by the query builder.
    fn stream<T: ParseObject>(&self, query: &Query<T>) -> Result<ObjectStream<T>, Error> {
        if query.has_paging() {
            return Err(ConfigurationError::PagingWithStream.into());
        }
        query.where_document()?;

        let rest = self.client().rest().clone();
        let token = self.session_token().cloned();
        let path = query.collection_path()?;
        let use_master_key = query.uses_master_key();

        debug!(class = %query.class_name(), batch_size = query.effective_batch_size(), "starting stream");
        Ok(ObjectStream::new(query, move |params| {
            let rest = rest.clone();
            let token = token.clone();
            let path = path.clone();
            async move {
                rest.get(&path, &params, RequestAuth::new(token.as_ref(), use_master_key))
                    .await
            }
        }))
    }

    /// Call a cloud function and decode its `result`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::FunctionName`] for an empty name or one
    /// containing `/`.
    #[instrument(skip(self, params))]
    async fn call_function<P, R>(&self, name: &str, params: &P) -> Result<R, Error>
    where
        P: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        validate_function_name(name)?;

        let body = match codec::to_wire(params)? {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let response = self
            .client()
            .rest()
            .post(&function_path(name), &body, self.auth(false))
            .await?;
        let response: FunctionResponse = codec::decode(response)?;
        codec::decode(response.result)
    }

    /// Send a push notification.
    async fn send_push(&self, push: &PushNotification) -> Result<(), Error> {
        push.send(self.client()).await
    }

    /// The server's health report.
    async fn health(&self) -> Result<Map<String, Value>, Error> {
        let response = self
            .client()
            .rest()
            .get(HEALTH, &[], self.auth(false))
            .await?;
        codec::decode(response)
    }

    /// The app's config parameters.
    async fn server_config(&self) -> Result<Map<String, Value>, Error> {
        let response = self
            .client()
            .rest()
            .get(CONFIG, &[], self.auth(false))
            .await?;
        let config: ConfigResponse = codec::decode(response)?;
        Ok(config.params)
    }
}

fn validate_function_name(name: &str) -> Result<(), Error> {
    let reason = if name.is_empty() {
        "cannot be empty"
    } else if name.contains('/') {
        "cannot contain '/'"
    } else {
        return Ok(());
    };
    Err(InvalidInputError::FunctionName {
        value: name.to_string(),
        reason: reason.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_are_validated() {
        assert!(validate_function_name("hello").is_ok());
        assert!(matches!(
            validate_function_name(""),
            Err(Error::InvalidInput(InvalidInputError::FunctionName { .. }))
        ));
        assert!(matches!(
            validate_function_name("a/b"),
            Err(Error::InvalidInput(InvalidInputError::FunctionName { .. }))
        ));
    }
}
