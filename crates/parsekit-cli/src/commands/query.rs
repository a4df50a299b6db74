//! Query command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use futures_util::StreamExt;
use parsekit::{Object, ParseApi, Query};
use serde_json::{Map, Value};

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Class to query, e.g. GameScore or _User
    pub class: String,

    /// Constraints as a JSON object, e.g. '{"score":{"$gt":1000}}'
    #[arg(long = "where")]
    pub filter: Option<String>,

    /// Comma-separated sort fields; prefix with '-' for descending
    #[arg(long, allow_hyphen_values = true)]
    pub order: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<u32>,

    /// Number of results to skip
    #[arg(long)]
    pub skip: Option<u32>,

    /// Comma-separated fields to return
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Comma-separated pointer fields to include
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Print only the number of matches
    #[arg(long, conflicts_with = "all")]
    pub count: bool,

    /// Stream every match, one request per batch
    #[arg(long)]
    pub all: bool,

    /// Objects per request with --all
    #[arg(long, requires = "all")]
    pub batch_size: Option<u32>,

    /// Send the master key
    #[arg(long)]
    pub master: bool,
}

pub async fn run(args: QueryArgs, connection: ConnectionArgs) -> Result<()> {
    let api = connection::connect(&connection)?;
    let query = build_query(&args)?;

    if args.count {
        let count = api.count(&query).await.context("Count failed")?;
        println!("{count}");
        return Ok(());
    }

    if args.all {
        let mut stream = api.stream(&query).context("Cannot stream this query")?;
        while let Some(object) = stream.next().await {
            output::json(&object.context("Query failed")?)?;
        }
        return Ok(());
    }

    match api.find(&query).await {
        Ok(objects) => {
            for object in &objects {
                output::json(object)?;
            }
            Ok(())
        }
        Err(err) if err.is_no_rows() => {
            output::error("No matching objects");
            Ok(())
        }
        Err(err) => Err(err).context("Query failed"),
    }
}

fn build_query(args: &QueryArgs) -> Result<Query<Object>> {
    let mut query = Query::for_class(super::class_name(&args.class)?);

    if let Some(ref filter) = args.filter {
        for (field, constraint) in parse_where(filter)? {
            query = query.equal_to(&field, constraint);
        }
    }

    if let Some(ref order) = args.order {
        for (i, field) in order.split(',').map(str::trim).filter(|f| !f.is_empty()).enumerate() {
            query = match (i, field.strip_prefix('-')) {
                (0, Some(field)) => query.order_by_descending(field),
                (0, None) => query.order_by(field),
                (_, Some(field)) => query.then_by_descending(field),
                (_, None) => query.then_by(field),
            };
        }
    }

    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(skip) = args.skip {
        query = query.skip(skip);
    }
    if !args.keys.is_empty() {
        query = query.keys(&args.keys);
    }
    for path in &args.include {
        query = query.include(path);
    }
    if let Some(size) = args.batch_size {
        query = query.batch_size(size);
    }
    if args.master {
        query = query.use_master_key();
    }

    Ok(query)
}

fn parse_where(filter: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(filter).context("--where is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("--where must be a JSON object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: QueryArgs,
    }

    fn params(argv: &[&str]) -> Vec<(String, String)> {
        let mut full = vec!["query"];
        full.extend_from_slice(argv);
        let harness = Harness::parse_from(full);
        build_query(&harness.args).unwrap().params().unwrap()
    }

    #[test]
    fn where_is_passed_through() {
        let params = params(&["GameScore", "--where", r#"{"score":{"$gt":1000},"cheat":false}"#]);
        assert_eq!(
            params[0],
            (
                "where".to_string(),
                r#"{"cheat":false,"score":{"$gt":1000}}"#.to_string()
            )
        );
    }

    #[test]
    fn order_and_projection() {
        let params = params(&[
            "GameScore",
            "--order",
            "-score,playerName",
            "--keys",
            "score,playerName",
            "--limit",
            "5",
        ]);
        assert!(params.contains(&("order".to_string(), "-score,playerName".to_string())));
        assert!(params.contains(&("keys".to_string(), "playerName,score".to_string())));
        assert!(params.contains(&("limit".to_string(), "5".to_string())));
    }

    #[test]
    fn where_must_be_an_object() {
        assert!(parse_where("[1,2]").is_err());
        assert!(parse_where("{not json").is_err());
    }
}
