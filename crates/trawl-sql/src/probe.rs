use std::collections::HashMap;
use std::sync::Arc;

use datafusion::arrow::datatypes::{Schema, SchemaRef};
use datafusion::common::ScalarValue;

use crate::connection::ConnectionRef;
use crate::engine::{QueryOutput, SqlEngine};
use crate::error::{SqlReadError, SqlReadResult};
use crate::plan::{count_query, schema_query};

/// Result cardinality and column schema, read without fetching data rows.
#[derive(Debug, Clone)]
pub(crate) struct SourceProfile {
    pub row_count: u64,
    /// Schema of the data columns, with requested index columns removed.
    pub columns: SchemaRef,
}

/// Issue the two metadata queries against the source. Both are cheap and
/// must complete before planning, so they run sequentially. Failure of
/// either aborts the read before any partitioning.
pub(crate) async fn probe_source<E: SqlEngine>(
    engine: &E,
    sql: &str,
    connection: &ConnectionRef,
    index_columns: Option<&[String]>,
    options: &HashMap<String, String>,
) -> SqlReadResult<SourceProfile> {
    let count = engine
        .execute(&count_query(sql), connection, options)
        .await
        .map_err(|e| SqlReadError::ProbeQueryError(Box::new(e)))?;
    let row_count = extract_row_count(&count)?;
    let columns = probe_schema(engine, sql, connection, index_columns, options).await?;
    Ok(SourceProfile { row_count, columns })
}

/// Read the column schema via a zero-row probe, honoring index columns.
pub(crate) async fn probe_schema<E: SqlEngine>(
    engine: &E,
    sql: &str,
    connection: &ConnectionRef,
    index_columns: Option<&[String]>,
    options: &HashMap<String, String>,
) -> SqlReadResult<SchemaRef> {
    let probe = engine
        .execute(&schema_query(sql), connection, options)
        .await
        .map_err(|e| SqlReadError::ProbeQueryError(Box::new(e)))?;
    match index_columns {
        Some(names) => Ok(Arc::new(strip_index_columns(&probe.schema, names)?)),
        None => Ok(probe.schema),
    }
}

fn extract_row_count(output: &QueryOutput) -> SqlReadResult<u64> {
    let batch = output
        .batches
        .iter()
        .find(|batch| batch.num_rows() > 0)
        .ok_or_else(|| SqlReadError::engine("count query returned no rows"))?;
    let column = batch
        .columns()
        .first()
        .ok_or_else(|| SqlReadError::engine("count query returned no columns"))?;
    let value = ScalarValue::try_from_array(column, 0)?;
    match value {
        ScalarValue::Int64(Some(count)) if count >= 0 => Ok(count as u64),
        ScalarValue::UInt64(Some(count)) => Ok(count),
        ScalarValue::Int32(Some(count)) if count >= 0 => Ok(count as u64),
        other => Err(SqlReadError::engine(format!(
            "unexpected count value: {other}"
        ))),
    }
}

fn strip_index_columns(schema: &Schema, index_columns: &[String]) -> SqlReadResult<Schema> {
    for name in index_columns {
        if schema.field_with_name(name).is_err() {
            return Err(SqlReadError::ProbeQueryError(Box::new(SqlReadError::engine(
                format!("index column {name} not found in the query result"),
            ))));
        }
    }
    let fields = schema
        .fields()
        .iter()
        .filter(|field| index_columns.iter().all(|name| name != field.name()))
        .cloned()
        .collect::<Vec<_>>();
    Ok(Schema::new(fields))
}
