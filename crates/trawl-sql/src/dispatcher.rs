use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use futures::FutureExt;
use log::debug;
use trawl_common::config::AppConfig;
use trawl_common::error::{CommonError, CommonResult};
use trawl_execution::{materialize, JobId, TaskRunner};

use crate::connection::ConnectionRef;
use crate::dataset::{Axis, Dataset};
use crate::engine::SqlEngine;
use crate::error::{SqlReadError, SqlReadResult};
use crate::fetch::{fetch_partition, PartitionFetch};
use crate::index::reconcile_index;
use crate::plan::{bounded_query, plan_partitions};
use crate::probe::{probe_schema, probe_source};

/// Knobs for partitioned reads, threaded explicitly into every call so the
/// planner never depends on ambient process state.
#[derive(Debug, Clone)]
pub struct SqlReadOptions {
    /// The number of partitions to plan. Must be at least one.
    pub partition_count: usize,
    /// The number of column-block shards per partition.
    pub column_splits: usize,
}

impl SqlReadOptions {
    pub fn new(partition_count: usize) -> Self {
        Self {
            partition_count,
            column_splits: partition_count,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let partition_count = config.read.partition_count;
        let column_splits = if config.read.column_splits == 0 {
            partition_count
        } else {
            config.read.column_splits
        };
        Self {
            partition_count,
            column_splits,
        }
    }

    fn validate(&self) -> CommonResult<()> {
        if self.partition_count == 0 {
            return Err(CommonError::invalid("partition count must be at least one"));
        }
        if self.column_splits == 0 {
            return Err(CommonError::invalid("column splits must be at least one"));
        }
        Ok(())
    }
}

/// Reads SQL query results as partitioned datasets.
///
/// The read proceeds through fixed stages: connection normalization, the
/// two metadata probes, range planning, parallel fetch, index
/// reconciliation, and assembly. Any failure before assembly fails the
/// whole read; there are no retries and no partial datasets. An
/// unserializable connection is the one absorbed condition: it degrades the
/// read to a single fetch instead of failing it.
pub struct SqlDispatcher<E, R> {
    engine: Arc<E>,
    runner: R,
    options: SqlReadOptions,
    next_job_id: AtomicU64,
}

impl<E: SqlEngine, R: TaskRunner> SqlDispatcher<E, R> {
    pub fn new(engine: Arc<E>, runner: R, options: SqlReadOptions) -> Self {
        Self {
            engine,
            runner,
            options,
            next_job_id: AtomicU64::new(1),
        }
    }

    pub fn options(&self) -> &SqlReadOptions {
        &self.options
    }

    /// Read a SQL query (or table reference wrapped in a query) into a
    /// partitioned dataset.
    ///
    /// The row count and the partition fetches are separate, non-transactional
    /// queries; under concurrent writes to the source the assembled row count
    /// may drift from the probed one. This is a documented consistency gap,
    /// not a detected condition.
    pub async fn read(
        &self,
        sql: &str,
        connection: &ConnectionRef,
        index_columns: Option<&[String]>,
        read_options: &HashMap<String, String>,
    ) -> SqlReadResult<Dataset> {
        self.options.validate()?;
        let job_id = JobId::from(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let Some(url) = connection.normalize() else {
            return self
                .single_worker_read(sql, connection, index_columns, read_options)
                .await;
        };
        let connection = ConnectionRef::Url(url);
        let profile =
            probe_source(self.engine.as_ref(), sql, &connection, index_columns, read_options)
                .await?;
        debug!(
            "job {job_id}: probed {} rows across {} data columns",
            profile.row_count,
            profile.columns.fields().len()
        );
        let ranges = plan_partitions(profile.row_count, self.options.partition_count);
        let mut handles = Vec::with_capacity(ranges.len());
        for (partition, range) in ranges.iter().enumerate() {
            let task = fetch_partition(
                self.engine.clone(),
                bounded_query(sql, range),
                connection.clone(),
                index_columns.map(|names| names.to_vec()),
                self.options.column_splits,
                read_options.clone(),
            );
            handles.push(self.runner.submit(partition, task.boxed()));
        }
        debug!("job {job_id}: dispatched {} fetch tasks", handles.len());
        let results = materialize(handles).await?;
        self.assemble(results, index_columns, profile.columns)
    }

    /// Degraded mode: the connection cannot be serialized, so the whole
    /// query runs as one fetch on the caller's handle, which never crosses a
    /// task boundary. The output shape is identical to the parallel path
    /// with a single partition.
    async fn single_worker_read(
        &self,
        sql: &str,
        connection: &ConnectionRef,
        index_columns: Option<&[String]>,
        read_options: &HashMap<String, String>,
    ) -> SqlReadResult<Dataset> {
        let columns =
            probe_schema(self.engine.as_ref(), sql, connection, index_columns, read_options)
                .await?;
        let result = fetch_partition(
            self.engine.clone(),
            sql.to_string(),
            connection.clone(),
            index_columns.map(|names| names.to_vec()),
            self.options.column_splits,
            read_options.clone(),
        )
        .await;
        self.assemble(vec![result], index_columns, columns)
    }

    /// Turn per-partition results into the dataset: fail on the first
    /// partition error, reconcile the index in plan order, arrange the grid,
    /// and synchronize labels along the row axis.
    fn assemble(
        &self,
        results: Vec<SqlReadResult<PartitionFetch>>,
        index_columns: Option<&[String]>,
        schema: SchemaRef,
    ) -> SqlReadResult<Dataset> {
        let mut grid = Vec::with_capacity(results.len());
        let mut fragments = Vec::with_capacity(results.len());
        let mut dtypes = Vec::with_capacity(results.len());
        for (partition, result) in results.into_iter().enumerate() {
            let fetch = result.map_err(|e| SqlReadError::PartitionFetchError {
                partition,
                source: Box::new(e),
            })?;
            grid.push(fetch.blocks);
            fragments.push(fetch.index);
            dtypes.push(fetch.dtypes);
        }
        let index = reconcile_index(fragments, index_columns)?;
        let mut dataset = Dataset::new(grid, index, schema, dtypes);
        dataset.synchronize_labels(Axis::Rows)?;
        Ok(dataset)
    }
}
