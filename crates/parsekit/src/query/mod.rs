//! Query construction.
//!
//! A [`Query`] accumulates constraints, ordering, paging and projection
//! for one class and is executed through a [`ParseApi`](crate::ParseApi)
//! implementation.
//!
//! # Example
//!
//! ```
//! use parsekit::{Query, User};
//!
//! let query = Query::<User>::new()
//!     .greater_than("loginCount", 5)
//!     .less_than_or_equal("loginCount", 10)
//!     .starts_with("username", "Al")
//!     .order_by_descending("createdAt")
//!     .limit(20);
//!
//! let where_doc = query.where_document().unwrap();
//! assert_eq!(where_doc["loginCount"]["$gt"], 5);
//! assert_eq!(where_doc["username"]["$regex"], "^\\QAl\\E");
//! ```

mod filter;
pub mod stream;

pub use filter::{Filter, quote};
pub use stream::{ObjectStream, StreamHandle};

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use crate::codec::{self, GeoPoint};
use crate::error::{Error, InvalidInputError};
use crate::schema::{self, ParseObject};
use crate::types::ClassName;

/// Default number of objects fetched per request when streaming.
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Largest batch the server accepts.
pub const MAX_BATCH_SIZE: u32 = 1000;

/// A query over the objects of one class, decoded as `T`.
///
/// Builder methods consume and return the query. Clone it to branch.
/// Values that fail to encode are reported by the operation that runs the
/// query.
pub struct Query<T> {
    class_name: String,
    filter: Filter,
    order: Vec<String>,
    limit: Option<u32>,
    skip: Option<u32>,
    include: BTreeSet<String>,
    keys: BTreeSet<String>,
    count: bool,
    batch_size: Option<u32>,
    use_master_key: bool,
    error: Option<Error>,
    _type: PhantomData<fn() -> T>,
}

impl<T: ParseObject> Query<T> {
    /// A query over `T`'s class.
    pub fn new() -> Self {
        Self::with_class_name(T::CLASS_NAME.to_string())
    }

    /// A fresh query on the same class, for use as a sub-query.
    pub fn sub(&self) -> Self {
        Self::with_class_name(self.class_name.clone())
    }
}

impl<T: ParseObject> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Query<T> {
    /// A query over an explicit class, e.g. for [`Object`](crate::Object).
    pub fn for_class(class_name: ClassName) -> Self {
        Self::with_class_name(class_name.into())
    }

    fn with_class_name(class_name: String) -> Self {
        Self {
            class_name,
            filter: Filter::new(),
            order: Vec::new(),
            limit: None,
            skip: None,
            include: BTreeSet::new(),
            keys: BTreeSet::new(),
            count: false,
            batch_size: None,
            use_master_key: false,
            error: None,
            _type: PhantomData,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    pub fn equal_to(mut self, field: &str, value: impl Serialize) -> Self {
        if let Some(value) = self.encode(value) {
            self.filter.equal(field, value);
        }
        self
    }

    pub fn not_equal_to(self, field: &str, value: impl Serialize) -> Self {
        self.compare(field, "$ne", value)
    }

    pub fn greater_than(self, field: &str, value: impl Serialize) -> Self {
        self.compare(field, "$gt", value)
    }

    pub fn greater_than_or_equal(self, field: &str, value: impl Serialize) -> Self {
        self.compare(field, "$gte", value)
    }

    pub fn less_than(self, field: &str, value: impl Serialize) -> Self {
        self.compare(field, "$lt", value)
    }

    pub fn less_than_or_equal(self, field: &str, value: impl Serialize) -> Self {
        self.compare(field, "$lte", value)
    }

    /// The field equals one of the values.
    pub fn contained_in<V: Serialize>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.compare(field, "$in", values.into_iter().collect::<Vec<_>>())
    }

    /// The field equals none of the values.
    pub fn not_contained_in<V: Serialize>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.compare(field, "$nin", values.into_iter().collect::<Vec<_>>())
    }

    /// The array field contains every one of the values.
    pub fn contains_all<V: Serialize>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.compare(field, "$all", values.into_iter().collect::<Vec<_>>())
    }

    pub fn exists(self, field: &str) -> Self {
        self.compare(field, "$exists", true)
    }

    pub fn does_not_exist(self, field: &str) -> Self {
        self.compare(field, "$exists", false)
    }

    // ------------------------------------------------------------------
    // String matching
    // ------------------------------------------------------------------

    /// The string field contains `text`.
    pub fn contains(self, field: &str, text: &str) -> Self {
        self.compare(field, "$regex", quote(text))
    }

    pub fn starts_with(self, field: &str, prefix: &str) -> Self {
        self.compare(field, "$regex", format!("^{}", quote(prefix)))
    }

    pub fn ends_with(self, field: &str, suffix: &str) -> Self {
        self.compare(field, "$regex", format!("{}$", quote(suffix)))
    }

    /// The string field matches a regular expression.
    pub fn matches(self, field: &str, regex: &str, ignore_case: bool, multi_line: bool) -> Self {
        let mut options = String::new();
        if ignore_case {
            options.push('i');
        }
        if multi_line {
            options.push('m');
        }

        let query = self.compare(field, "$regex", regex);
        if options.is_empty() {
            query
        } else {
            query.compare(field, "$options", options)
        }
    }

    // ------------------------------------------------------------------
    // Geo
    // ------------------------------------------------------------------

    /// The point field lies within the box given by its corners.
    pub fn within_geo_box(mut self, field: &str, south_west: GeoPoint, north_east: GeoPoint) -> Self {
        if let Some(corners) = self.encode([south_west, north_east]) {
            self.replace(field, [("$within", json!({ "$box": corners }))]);
        }
        self
    }

    /// Order by distance from a point, nearest first.
    pub fn near(mut self, field: &str, point: GeoPoint) -> Self {
        if let Some(point) = self.encode(point) {
            self.replace(field, [("$nearSphere", point)]);
        }
        self
    }

    pub fn within_miles(self, field: &str, point: GeoPoint, miles: f64) -> Self {
        self.near_within(field, point, "$maxDistanceInMiles", miles)
    }

    pub fn within_kilometers(self, field: &str, point: GeoPoint, kilometers: f64) -> Self {
        self.near_within(field, point, "$maxDistanceInKilometers", kilometers)
    }

    pub fn within_radians(self, field: &str, point: GeoPoint, radians: f64) -> Self {
        self.near_within(field, point, "$maxDistanceInRadians", radians)
    }

    fn near_within(mut self, field: &str, point: GeoPoint, op: &str, distance: f64) -> Self {
        if let Some(point) = self.encode(point) {
            self.replace(field, [("$nearSphere", point), (op, json!(distance))]);
        }
        self
    }

    // ------------------------------------------------------------------
    // Sub-queries
    // ------------------------------------------------------------------

    /// The field equals the value of `key` in some result of `query`.
    pub fn matches_key_in_query<U>(self, field: &str, key: &str, query: &Query<U>) -> Self {
        self.select(field, "$select", key, query)
    }

    /// The field equals the value of `key` in no result of `query`.
    pub fn does_not_match_key_in_query<U>(self, field: &str, key: &str, query: &Query<U>) -> Self {
        self.select(field, "$dontSelect", key, query)
    }

    /// The pointer field points to some result of `query`.
    pub fn matches_query<U>(self, field: &str, query: &Query<U>) -> Self {
        self.in_query(field, "$inQuery", query)
    }

    /// The pointer field points to no result of `query`.
    pub fn does_not_match_query<U>(self, field: &str, query: &Query<U>) -> Self {
        self.in_query(field, "$notInQuery", query)
    }

    /// Match objects satisfying any of the queries' constraints.
    pub fn or(mut self, queries: impl IntoIterator<Item = Query<T>>) -> Self {
        let mut clauses = Vec::new();
        for query in queries {
            if let Some(err) = query.error {
                self.defer(err);
            }
            clauses.push(query.filter.to_value());
        }
        self.filter.equal("$or", Value::Array(clauses));
        self
    }

    fn select<U>(mut self, field: &str, op: &str, key: &str, query: &Query<U>) -> Self {
        if let Some(ref err) = query.error {
            self.defer(err.clone());
        }
        let doc = json!({ "key": key, "query": query.to_document() });
        self.replace(field, [(op, doc)]);
        self
    }

    fn in_query<U>(mut self, field: &str, op: &str, query: &Query<U>) -> Self {
        if let Some(ref err) = query.error {
            self.defer(err.clone());
        }
        self.replace(field, [(op, query.to_document())]);
        self
    }

    /// The query as embedded in another query's constraint.
    fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("where".to_string(), self.filter.to_value());
        doc.insert("className".to_string(), json!(self.class_name));
        if let Some(limit) = self.limit {
            doc.insert("limit".to_string(), json!(limit));
        }
        if let Some(skip) = self.skip {
            doc.insert("skip".to_string(), json!(skip));
        }
        if !self.order.is_empty() {
            doc.insert("order".to_string(), json!(self.order.join(",")));
        }
        if !self.include.is_empty() {
            doc.insert("include".to_string(), json!(join(&self.include)));
        }
        if !self.keys.is_empty() {
            doc.insert("keys".to_string(), json!(join(&self.keys)));
        }
        Value::Object(doc)
    }

    // ------------------------------------------------------------------
    // Ordering, paging, projection
    // ------------------------------------------------------------------

    /// Sort by a field, ascending, replacing any earlier ordering.
    pub fn order_by(mut self, field: &str) -> Self {
        self.order = vec![field.to_string()];
        self
    }

    /// Sort by a field, descending, replacing any earlier ordering.
    pub fn order_by_descending(mut self, field: &str) -> Self {
        self.order = vec![format!("-{field}")];
        self
    }

    /// Break ties by another field, ascending.
    pub fn then_by(mut self, field: &str) -> Self {
        self.order.push(field.to_string());
        self
    }

    /// Break ties by another field, descending.
    pub fn then_by_descending(mut self, field: &str) -> Self {
        self.order.push(format!("-{field}"));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return the objects behind a pointer field (dot paths allowed).
    pub fn include(mut self, path: &str) -> Self {
        self.include.insert(path.to_string());
        self
    }

    /// Restrict the returned fields.
    pub fn keys<S: AsRef<str>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.keys
            .extend(fields.into_iter().map(|f| f.as_ref().to_string()));
        self
    }

    /// Objects fetched per request when streaming.
    ///
    /// Sizes above [`MAX_BATCH_SIZE`] fall back to [`DEFAULT_BATCH_SIZE`].
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Send the master key, when one is configured and no session is bound.
    pub fn use_master_key(mut self) -> Self {
        self.use_master_key = true;
        self
    }

    pub fn uses_master_key(&self) -> bool {
        self.use_master_key
    }

    // ------------------------------------------------------------------
    // Execution support
    // ------------------------------------------------------------------

    /// The `where` document, or the first value that failed to encode.
    pub fn where_document(&self) -> Result<Value, Error> {
        self.check()?;
        Ok(self.filter.to_value())
    }

    /// The URL query parameters for this query.
    pub fn params(&self) -> Result<Vec<(String, String)>, Error> {
        self.check()?;

        let mut params = Vec::new();
        if !self.filter.is_empty() {
            params.push(("where".to_string(), self.filter.to_value().to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(skip) = self.skip {
            params.push(("skip".to_string(), skip.to_string()));
        }
        if self.count {
            params.push(("count".to_string(), "1".to_string()));
        }
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if !self.include.is_empty() {
            params.push(("include".to_string(), join(&self.include)));
        }
        if !self.keys.is_empty() {
            params.push(("keys".to_string(), join(&self.keys)));
        }
        Ok(params)
    }

    /// The collection path, once the class name is known to be valid.
    pub(crate) fn collection_path(&self) -> Result<String, Error> {
        if self.class_name.is_empty() {
            return Err(InvalidInputError::ClassName {
                value: String::new(),
                reason: "a dynamic object query needs Query::for_class".to_string(),
            }
            .into());
        }
        Ok(schema::collection_path(&self.class_name))
    }

    /// The same query limited to one result.
    pub(crate) fn for_first(&self) -> Self {
        let mut query = self.clone();
        query.limit = Some(1);
        query
    }

    /// The same query asking only for the number of matches.
    pub(crate) fn for_count(&self) -> Self {
        let mut query = self.clone();
        query.limit = Some(0);
        query.count = true;
        query
    }

    /// Streaming owns ordering and paging.
    pub(crate) fn has_paging(&self) -> bool {
        self.limit.is_some() || self.skip.is_some() || !self.order.is_empty()
    }

    pub(crate) fn effective_batch_size(&self) -> u32 {
        match self.batch_size {
            Some(size) if size > 0 && size <= MAX_BATCH_SIZE => size,
            _ => DEFAULT_BATCH_SIZE,
        }
    }

    /// The first page of a stream: ordered by id, one batch long.
    pub(crate) fn for_stream(&self) -> Self {
        let mut query = self.clone();
        query.order = vec!["objectId".to_string()];
        query.limit = Some(self.effective_batch_size());
        query
    }

    fn check(&self) -> Result<(), Error> {
        match self.error {
            Some(ref err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn compare(mut self, field: &str, op: &str, value: impl Serialize) -> Self {
        if let Some(value) = self.encode(value) {
            self.filter.operator(field, op, value);
        }
        self
    }

    fn replace<'a>(&mut self, field: &str, ops: impl IntoIterator<Item = (&'a str, Value)>) {
        let doc = ops
            .into_iter()
            .map(|(op, value)| (op.to_string(), value))
            .collect();
        self.filter.replace(field, doc);
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

    fn defer(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            class_name: self.class_name.clone(),
            filter: self.filter.clone(),
            order: self.order.clone(),
            limit: self.limit,
            skip: self.skip,
            include: self.include.clone(),
            keys: self.keys.clone(),
            count: self.count,
            batch_size: self.batch_size,
            use_master_key: self.use_master_key,
            error: self.error.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("class_name", &self.class_name)
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("skip", &self.skip)
            .field("include", &self.include)
            .field("keys", &self.keys)
            .field("use_master_key", &self.use_master_key)
            .finish()
    }
}

/// Decode one result row and bind it to the queried class.
pub(crate) fn decode_row<T: ParseObject>(row: Value, class_name: &str) -> Result<T, Error> {
    let mut object: T = codec::decode(row)?;
    object.bind_class(class_name);
    Ok(object)
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Date, Pointer, Reference};
    use crate::schema::{Object, User};
    use chrono::{TimeZone, Utc};
    use serde::ser::Error as _;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn comparisons_merge_into_one_document() {
        let query = Query::<User>::new()
            .greater_than("x", 5)
            .less_than_or_equal("x", 10);
        assert_eq!(
            query.where_document().unwrap(),
            json!({ "x": { "$gt": 5, "$lte": 10 } })
        );
    }

    #[test]
    fn comparison_after_equality_replaces_it() {
        let query = Query::<User>::new().equal_to("x", 5).greater_than("x", 1);
        assert_eq!(query.where_document().unwrap(), json!({ "x": { "$gt": 1 } }));
    }

    #[test]
    fn starts_with_quotes_prefix() {
        let query = Query::<User>::new().starts_with("name", "Al");
        assert_eq!(
            query.where_document().unwrap(),
            json!({ "name": { "$regex": "^\\QAl\\E" } })
        );
    }

    #[test]
    fn ends_with_and_contains() {
        let query = Query::<User>::new()
            .ends_with("a", "son")
            .contains("b", "mid");
        assert_eq!(
            query.where_document().unwrap(),
            json!({
                "a": { "$regex": "\\Qson\\E$" },
                "b": { "$regex": "\\Qmid\\E" }
            })
        );
    }

    #[test]
    fn matches_with_options() {
        let query = Query::<User>::new().matches("name", "^a.*z$", true, true);
        assert_eq!(
            query.where_document().unwrap(),
            json!({ "name": { "$regex": "^a.*z$", "$options": "im" } })
        );
    }

    #[test]
    fn set_operators() {
        let query = Query::<User>::new()
            .contained_in("a", [1, 2])
            .not_contained_in("b", ["x"])
            .contains_all("c", vec![true])
            .exists("d")
            .does_not_exist("e");
        assert_eq!(
            query.where_document().unwrap(),
            json!({
                "a": { "$in": [1, 2] },
                "b": { "$nin": ["x"] },
                "c": { "$all": [true] },
                "d": { "$exists": true },
                "e": { "$exists": false }
            })
        );
    }

    #[test]
    fn typed_values_use_wire_form() {
        let at = Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap();
        let query = Query::<Object>::for_class(ClassName::new("GameScore").unwrap())
            .greater_than("playedAt", Date::new(at))
            .equal_to("player", Reference::<User>::new("u1"));
        assert_eq!(
            query.where_document().unwrap(),
            json!({
                "playedAt": { "$gt": { "__type": "Date", "iso": "2015-03-01T00:00:00.000Z" } },
                "player": { "__type": "Pointer", "className": "_User", "objectId": "u1" }
            })
        );
    }

    #[test]
    fn geo_operators_replace_constraint() {
        let home = GeoPoint::new(30.0, -20.0);
        let query = Query::<User>::new()
            .exists("location")
            .within_miles("location", home, 10.0);
        assert_eq!(
            query.where_document().unwrap(),
            json!({
                "location": {
                    "$nearSphere": { "__type": "GeoPoint", "latitude": 30.0, "longitude": -20.0 },
                    "$maxDistanceInMiles": 10.0
                }
            })
        );

        let boxed = Query::<User>::new().within_geo_box(
            "location",
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(3.0, 4.0),
        );
        let doc = boxed.where_document().unwrap();
        assert_eq!(doc["location"]["$within"]["$box"][1]["latitude"], 3.0);
    }

    #[test]
    fn sub_query_documents() {
        let teams = Query::<Object>::for_class(ClassName::new("Team").unwrap())
            .greater_than("winPct", 0.5)
            .limit(10);
        let query = Query::<User>::new()
            .matches_key_in_query("hometown", "city", &teams)
            .matches_query("team", &teams);
        let doc = query.where_document().unwrap();
        assert_eq!(
            doc["hometown"],
            json!({
                "$select": {
                    "key": "city",
                    "query": {
                        "where": { "winPct": { "$gt": 0.5 } },
                        "className": "Team",
                        "limit": 10
                    }
                }
            })
        );
        assert_eq!(doc["team"]["$inQuery"]["className"], "Team");
    }

    #[test]
    fn or_combines_filters() {
        let base = Query::<User>::new();
        let query = base.sub().or([
            base.sub().equal_to("wins", 150),
            base.sub().less_than("wins", 5),
        ]);
        assert_eq!(
            query.where_document().unwrap(),
            json!({ "$or": [{ "wins": 150 }, { "wins": { "$lt": 5 } }] })
        );
    }

    #[test]
    fn params_include_paging_and_projection() {
        let query = Query::<User>::new()
            .equal_to("a", 1)
            .order_by("score")
            .then_by_descending("name")
            .limit(5)
            .skip(10)
            .include("team.owner")
            .include("game")
            .keys(["score", "name"]);
        let params = query.params().unwrap();
        assert_eq!(param(&params, "where"), Some(r#"{"a":1}"#));
        assert_eq!(param(&params, "order"), Some("score,-name"));
        assert_eq!(param(&params, "limit"), Some("5"));
        assert_eq!(param(&params, "skip"), Some("10"));
        assert_eq!(param(&params, "include"), Some("game,team.owner"));
        assert_eq!(param(&params, "keys"), Some("name,score"));
        assert_eq!(param(&params, "count"), None);
    }

    #[test]
    fn count_sends_zero_limit() {
        let params = Query::<User>::new().limit(7).for_count().params().unwrap();
        assert_eq!(param(&params, "limit"), Some("0"));
        assert_eq!(param(&params, "count"), Some("1"));
    }

    #[test]
    fn clone_branches_independently() {
        let base = Query::<User>::new().equal_to("a", 1);
        let branch = base.clone().equal_to("b", 2);
        assert!(base.filter().get("b").is_none());
        assert!(branch.filter().get("a").is_some());
    }

    #[test]
    fn encoding_failure_is_deferred() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(S::Error::custom("cannot encode"))
            }
        }

        let query = Query::<User>::new()
            .equal_to("bad", Unencodable)
            .equal_to("good", 1);
        assert!(query.params().is_err());
        assert!(query.filter().get("bad").is_none());
    }

    #[test]
    fn batch_size_bounds() {
        assert_eq!(Query::<User>::new().effective_batch_size(), 100);
        assert_eq!(Query::<User>::new().batch_size(1000).effective_batch_size(), 1000);
        assert_eq!(Query::<User>::new().batch_size(1001).effective_batch_size(), 100);
        let params = Query::<User>::new().batch_size(250).for_stream().params().unwrap();
        assert_eq!(param(&params, "order"), Some("objectId"));
        assert_eq!(param(&params, "limit"), Some("250"));
    }

    #[test]
    fn dynamic_query_needs_class() {
        assert!(Query::<Object>::new().collection_path().is_err());
        assert_eq!(
            Query::<User>::new().collection_path().unwrap(),
            "users"
        );
    }

    #[test]
    fn pointer_equality() {
        let query = Query::<User>::new().equal_to("team", Pointer::new("Team", "t1"));
        assert_eq!(
            query.where_document().unwrap()["team"]["className"],
            "Team"
        );
    }
}
