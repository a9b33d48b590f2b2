use std::collections::HashMap;
use std::sync::Arc;

use datafusion::arrow::array::ArrayRef;
use datafusion::arrow::compute::concat_batches;
use datafusion::arrow::record_batch::RecordBatch;
use log::debug;

use crate::connection::ConnectionRef;
use crate::dataset::{ColumnBlock, ColumnDtype};
use crate::engine::SqlEngine;
use crate::error::SqlReadResult;
use crate::index::IndexFragment;

/// Everything one fetch task produces for its partition.
pub(crate) struct PartitionFetch {
    pub blocks: Vec<ColumnBlock>,
    pub index: IndexFragment,
    pub dtypes: Vec<ColumnDtype>,
}

/// Execute one bounded sub-query and shape the result for assembly: shard
/// the data columns into `column_splits` blocks, pull out the index fragment,
/// and record the column dtypes.
///
/// Owns all of its arguments so it can run as an independent task; the
/// connection is a URL (or, on the single-unit path, the caller's live
/// handle used exactly once).
pub(crate) async fn fetch_partition<E: SqlEngine>(
    engine: Arc<E>,
    query: String,
    connection: ConnectionRef,
    index_columns: Option<Vec<String>>,
    column_splits: usize,
    options: HashMap<String, String>,
) -> SqlReadResult<PartitionFetch> {
    let output = engine.execute(&query, &connection, &options).await?;
    let batch = concat_batches(&output.schema, &output.batches)?;
    debug!("fetched {} rows for bounded sub-query", batch.num_rows());
    let (data, index) = split_off_index(&batch, index_columns.as_deref())?;
    let dtypes = data
        .schema()
        .fields()
        .iter()
        .map(|field| ColumnDtype {
            name: field.name().clone(),
            data_type: field.data_type().clone(),
        })
        .collect();
    let blocks = shard_columns(&data, column_splits)?;
    Ok(PartitionFetch {
        blocks,
        index,
        dtypes,
    })
}

/// Separate the requested index columns from the data columns. Without index
/// columns the fragment is just the row count.
fn split_off_index(
    batch: &RecordBatch,
    index_columns: Option<&[String]>,
) -> SqlReadResult<(RecordBatch, IndexFragment)> {
    let Some(names) = index_columns else {
        return Ok((batch.clone(), IndexFragment::Length(batch.num_rows())));
    };
    let schema = batch.schema();
    let mut values: Vec<ArrayRef> = Vec::with_capacity(names.len());
    for name in names {
        let i = schema.index_of(name)?;
        values.push(batch.column(i).clone());
    }
    let data_indices = (0..schema.fields().len())
        .filter(|i| names.iter().all(|name| schema.field(*i).name() != name))
        .collect::<Vec<_>>();
    let data = batch.project(&data_indices)?;
    Ok((data, IndexFragment::Values(values)))
}

/// Split the data columns into `splits` contiguous groups. Wider groups come
/// first when the division is uneven; groups beyond the column count are
/// empty so that every partition contributes the same grid width.
fn shard_columns(batch: &RecordBatch, splits: usize) -> SqlReadResult<Vec<ColumnBlock>> {
    let total = batch.num_columns();
    let base = total / splits;
    let remainder = total % splits;
    let mut blocks = Vec::with_capacity(splits);
    let mut start = 0;
    for i in 0..splits {
        let width = base + usize::from(i < remainder);
        let indices = (start..start + width).collect::<Vec<_>>();
        start += width;
        blocks.push(ColumnBlock::new(batch.project(&indices)?));
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};

    use super::*;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["a", "b", "c"])),
                Arc::new(Int64Array::from(vec![10, 20, 30])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_split_off_index_without_index_columns() {
        let batch = sample_batch();
        let (data, index) = split_off_index(&batch, None).unwrap();
        assert_eq!(data.num_columns(), 3);
        assert!(matches!(index, IndexFragment::Length(3)));
    }

    #[test]
    fn test_split_off_index_with_index_column() {
        let batch = sample_batch();
        let names = vec!["id".to_string()];
        let (data, index) = split_off_index(&batch, Some(&names)).unwrap();
        assert_eq!(data.num_columns(), 2);
        assert_eq!(data.schema().field(0).name(), "name");
        let IndexFragment::Values(values) = index else {
            panic!("expected value fragment");
        };
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].len(), 3);
    }

    #[test]
    fn test_shard_columns_even_and_uneven() {
        let batch = sample_batch();
        let blocks = shard_columns(&batch, 2).unwrap();
        assert_eq!(
            blocks.iter().map(|b| b.num_columns()).collect::<Vec<_>>(),
            vec![2, 1]
        );
        let blocks = shard_columns(&batch, 5).unwrap();
        assert_eq!(
            blocks.iter().map(|b| b.num_columns()).collect::<Vec<_>>(),
            vec![1, 1, 1, 0, 0]
        );
        // Empty shards still carry the row count.
        assert!(blocks.iter().all(|b| b.num_rows() == 3));
    }
}
