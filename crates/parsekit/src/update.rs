//! Partial updates of saved objects.

use serde::Serialize;
use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::api::ParseApi;
use crate::codec::{self, Acl, Date};
use crate::error::{DecodeError, Error, InvalidInputError};
use crate::rest::UpdateResponse;
use crate::schema::{ParseObject, object_path};

/// One field change.
#[derive(Clone, Debug, PartialEq)]
enum UpdateOp {
    Set(Value),
    Increment(Number),
    Delete,
    Add(Vec<Value>),
    AddUnique(Vec<Value>),
    Remove(Vec<Value>),
}

impl UpdateOp {
    fn to_wire(&self) -> Value {
        match self {
            UpdateOp::Set(value) => value.clone(),
            UpdateOp::Increment(amount) => json!({ "__op": "Increment", "amount": amount }),
            UpdateOp::Delete => json!({ "__op": "Delete" }),
            UpdateOp::Add(objects) => json!({ "__op": "Add", "objects": objects }),
            UpdateOp::AddUnique(objects) => json!({ "__op": "AddUnique", "objects": objects }),
            UpdateOp::Remove(objects) => json!({ "__op": "Remove", "objects": objects }),
        }
    }

    /// Apply the change to a local copy of the object.
    fn apply(self, doc: &mut Map<String, Value>, field: String) {
        match self {
            UpdateOp::Set(value) => {
                doc.insert(field, value);
            }
            UpdateOp::Delete => {
                doc.remove(&field);
            }
            UpdateOp::Increment(amount) => {
                let current = doc.get(&field).and_then(Value::as_number);
                let sum = add_numbers(current, &amount);
                doc.insert(field, Value::Number(sum));
            }
            UpdateOp::Add(objects) => {
                let mut items = take_array(doc, &field);
                items.extend(objects);
                doc.insert(field, Value::Array(items));
            }
            UpdateOp::AddUnique(objects) => {
                let mut items = take_array(doc, &field);
                for object in objects {
                    if !items.contains(&object) {
                        items.push(object);
                    }
                }
                doc.insert(field, Value::Array(items));
            }
            UpdateOp::Remove(objects) => {
                let mut items = take_array(doc, &field);
                items.retain(|item| !objects.contains(item));
                doc.insert(field, Value::Array(items));
            }
        }
    }
}

fn take_array(doc: &mut Map<String, Value>, field: &str) -> Vec<Value> {
    match doc.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn add_numbers(current: Option<&Number>, amount: &Number) -> Number {
    let Some(current) = current else {
        return amount.clone();
    };
    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    let sum = current.as_f64().unwrap_or(0.0) + amount.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| amount.clone())
}

/// A set of field changes to a saved object.
///
/// Changes are collected per field; a later change to the same field
/// replaces an earlier one. [`execute`](Self::execute) sends them in one
/// request and applies them to the local object.
///
/// ```no_run
/// use parsekit::{ClientConfig, ParseApi, Update, User};
///
/// # async fn example(mut user: User) -> Result<(), parsekit::Error> {
/// let client = ClientConfig::new("app-id", "rest-key").build()?;
///
/// Update::new(&mut user)
///     .set("email", "sean@example.com")
///     .increment("logins", 1)
///     .add_unique("tags", ["beta"])
///     .execute(&client)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Update<'a, T: ParseObject> {
    object: &'a mut T,
    ops: BTreeMap<String, UpdateOp>,
    use_master_key: bool,
    error: Option<Error>,
}

impl<'a, T: ParseObject> Update<'a, T> {
    pub fn new(object: &'a mut T) -> Self {
        Self {
            object,
            ops: BTreeMap::new(),
            use_master_key: false,
            error: None,
        }
    }

    /// Set a field to a value.
    pub fn set(mut self, field: &str, value: impl Serialize) -> Self {
        if let Some(value) = self.encode(value) {
            self.ops.insert(field.to_string(), UpdateOp::Set(value));
        }
        self
    }

    /// Add to a numeric field. A missing field counts as zero.
    pub fn increment(mut self, field: &str, amount: impl Serialize) -> Self {
        match self.encode(amount) {
            Some(Value::Number(amount)) => {
                self.ops
                    .insert(field.to_string(), UpdateOp::Increment(amount));
            }
            Some(other) => self.defer(
                DecodeError::TypeMismatch {
                    message: format!(
                        "increment of {field} needs a number, found {}",
                        codec::kind_of(&other)
                    ),
                }
                .into(),
            ),
            None => {}
        }
        self
    }

    /// Remove a field.
    pub fn unset(mut self, field: &str) -> Self {
        self.ops.insert(field.to_string(), UpdateOp::Delete);
        self
    }

    /// Append values to an array field.
    pub fn add<V: Serialize>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Some(values) = self.encode_all(values) {
            self.ops.insert(field.to_string(), UpdateOp::Add(values));
        }
        self
    }

    /// Append values not already present in an array field.
    pub fn add_unique<V: Serialize>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Some(values) = self.encode_all(values) {
            self.ops
                .insert(field.to_string(), UpdateOp::AddUnique(values));
        }
        self
    }

    /// Remove every occurrence of the values from an array field.
    pub fn remove<V: Serialize>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Some(values) = self.encode_all(values) {
            self.ops.insert(field.to_string(), UpdateOp::Remove(values));
        }
        self
    }

    /// Replace the object's ACL.
    pub fn set_acl(self, acl: &Acl) -> Self {
        self.set("ACL", acl)
    }

    pub fn use_master_key(mut self) -> Self {
        self.use_master_key = true;
        self
    }

    /// The request body, or the first value that failed to encode.
    pub fn body(&self) -> Result<Map<String, Value>, Error> {
        if let Some(ref err) = self.error {
            return Err(err.clone());
        }
        Ok(self
            .ops
            .iter()
            .map(|(field, op)| (field.clone(), op.to_wire()))
            .collect())
    }

    /// Send the changes and apply them to the object.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::MissingObjectId`] if the object was
    /// never saved. The object is left unchanged on any error.
    ///
    /// Once the server has accepted the changes this returns `Ok`. If the
    /// changed fields no longer fit `T` (say, a fractional increment of an
    /// integer field), only `updatedAt` is refreshed locally and a warning
    /// is logged.
    #[instrument(skip_all, fields(class = %self.object.class_name()))]
    pub async fn execute<A: ParseApi + ?Sized>(self, api: &A) -> Result<(), Error> {
        let body = self.body()?;
        let object_id = self
            .object
            .object_id()
            .filter(|id| !id.is_empty())
            .ok_or(InvalidInputError::MissingObjectId {
                operation: "update",
            })?
            .to_string();
        let class_name = self.object.class_name().to_string();

        let response = api
            .client()
            .rest()
            .put(
                &object_path(&class_name, &object_id),
                &body,
                api.auth(self.use_master_key),
            )
            .await?;
        let response: UpdateResponse = codec::decode(response)?;
        debug!(object_id = %object_id, fields = self.ops.len(), "object updated");

        match apply_locally(&*self.object, self.ops, response.updated_at.clone(), &class_name) {
            Ok(updated) => *self.object = updated,
            Err(err) => {
                warn!(object_id = %object_id, error = %err, "update saved but not applied locally");
                if let Some(updated_at) = response
                    .updated_at
                    .and_then(|at| codec::decode::<Date>(at).ok())
                {
                    self.object.base_mut().updated_at = Some(updated_at.into_inner());
                }
            }
        }
        Ok(())
    }

    fn encode(&mut self, value: impl Serialize) -> Option<Value> {
        match codec::to_wire(&value) {
            Ok(value) => Some(value),
            Err(err) => {
                self.defer(err);
                None
            }
        }
    }

    fn encode_all<V: Serialize>(&mut self, values: impl IntoIterator<Item = V>) -> Option<Vec<Value>> {
        values.into_iter().map(|v| self.encode(v)).collect()
    }

    fn defer(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// The object as it is on the server after the update.
fn apply_locally<T: ParseObject>(
    object: &T,
    ops: BTreeMap<String, UpdateOp>,
    updated_at: Option<Value>,
    class_name: &str,
) -> Result<T, Error> {
    let mut doc = match codec::to_wire(object)? {
        Value::Object(doc) => doc,
        other => {
            return Err(DecodeError::TypeMismatch {
                message: format!("expected an object, found {}", codec::kind_of(&other)),
            }
            .into());
        }
    };
    for (field, op) in ops {
        op.apply(&mut doc, field);
    }
    if let Some(updated_at) = updated_at {
        doc.insert("updatedAt".to_string(), updated_at);
    }

    let mut updated: T = codec::decode(Value::Object(doc))?;
    updated.bind_class(class_name);
    Ok(updated)
}
