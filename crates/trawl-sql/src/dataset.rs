use std::sync::Arc;

use datafusion::arrow::array::{RecordBatch, RecordBatchOptions};
use datafusion::arrow::compute::concat_batches;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use trawl_common::error::CommonError;

use crate::error::{SqlReadError, SqlReadResult};
use crate::index::GlobalIndex;

/// Per-column type metadata captured by a fetch task.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDtype {
    pub name: String,
    pub data_type: DataType,
}

/// A contiguous group of data columns fetched by one partition task.
#[derive(Debug, Clone)]
pub struct ColumnBlock {
    batch: RecordBatch,
}

impl ColumnBlock {
    pub(crate) fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Rebuild the block with field names and metadata taken from the given
    /// schema slice, keeping the block's own data.
    fn relabel(&self, schema: &Schema, position: usize) -> SqlReadResult<ColumnBlock> {
        if position + self.batch.num_columns() > schema.fields().len() {
            return Err(SqlReadError::internal(
                "partition grid is wider than the dataset schema",
            ));
        }
        let fields = self
            .batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let target = schema.field(position + i);
                Field::new(
                    target.name(),
                    field.data_type().clone(),
                    field.is_nullable(),
                )
            })
            .collect::<Vec<_>>();
        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            self.batch.columns().to_vec(),
            &RecordBatchOptions::new().with_row_count(Some(self.batch.num_rows())),
        )?;
        Ok(ColumnBlock::new(batch))
    }
}

/// Axes of the partition grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

/// The assembled result of a partitioned read: a grid of column blocks
/// (grid rows are partitions, grid columns are column-block shards), the
/// global row index, and the probed column schema.
///
/// Immutable after assembly, except for label synchronization.
#[derive(Debug)]
pub struct Dataset {
    grid: Vec<Vec<ColumnBlock>>,
    index: GlobalIndex,
    schema: SchemaRef,
    dtypes: Vec<Vec<ColumnDtype>>,
}

impl Dataset {
    pub(crate) fn new(
        grid: Vec<Vec<ColumnBlock>>,
        index: GlobalIndex,
        schema: SchemaRef,
        dtypes: Vec<Vec<ColumnDtype>>,
    ) -> Self {
        Self {
            grid,
            index,
            schema,
            dtypes,
        }
    }

    pub fn index(&self) -> &GlobalIndex {
        &self.index
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn num_partitions(&self) -> usize {
        self.grid.len()
    }

    /// Blocks of one partition, in column order.
    pub fn blocks(&self, partition: usize) -> &[ColumnBlock] {
        &self.grid[partition]
    }

    /// Column dtypes reported by one partition's fetch task.
    pub fn partition_dtypes(&self, partition: usize) -> &[ColumnDtype] {
        &self.dtypes[partition]
    }

    /// Rewrite block-level field names and metadata to match the dataset
    /// schema. Independent fetches may disagree with the probe on derived
    /// column names; the probed schema wins.
    pub fn synchronize_labels(&mut self, axis: Axis) -> SqlReadResult<()> {
        match axis {
            Axis::Rows => {
                for row in &mut self.grid {
                    let mut position = 0;
                    for block in row {
                        *block = block.relabel(&self.schema, position)?;
                        position += block.num_columns();
                    }
                }
                Ok(())
            }
            Axis::Columns => Err(CommonError::unsupported(
                "label synchronization along the column axis",
            )
            .into()),
        }
    }

    /// Concatenate the grid back into a single batch, partitions in plan
    /// order. This resolves the whole dataset in memory and is meant for
    /// consumers of modest results and for tests.
    pub fn to_record_batch(&self) -> SqlReadResult<RecordBatch> {
        let mut rows = Vec::with_capacity(self.grid.len());
        for blocks in &self.grid {
            let row_count = blocks.first().map_or(0, |block| block.num_rows());
            let mut fields = Vec::new();
            let mut arrays = Vec::new();
            for block in blocks {
                fields.extend(block.batch.schema().fields().iter().cloned());
                arrays.extend(block.batch.columns().iter().cloned());
            }
            rows.push(RecordBatch::try_new_with_options(
                Arc::new(Schema::new(fields)),
                arrays,
                &RecordBatchOptions::new().with_row_count(Some(row_count)),
            )?);
        }
        let schema = match rows.first() {
            Some(batch) => batch.schema(),
            None => self.schema.clone(),
        };
        Ok(concat_batches(&schema, &rows)?)
    }
}
