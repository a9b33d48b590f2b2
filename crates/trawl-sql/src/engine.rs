use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::datatypes::{Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;

use crate::connection::ConnectionRef;
use crate::error::SqlReadResult;

/// Rows returned by the engine for one query, along with their schema.
///
/// The schema is meaningful even when no row is returned, which is how the
/// prober reads column metadata without fetching data.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl QueryOutput {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|batch| batch.num_rows()).sum()
    }
}

/// The SQL execution seam.
///
/// Implementations must support the query shapes produced by the planner:
/// a `COUNT(*)` wrapper, `LIMIT 0` schema-only probing, and
/// `LIMIT <n> OFFSET <m>` row ranges.
#[async_trait]
pub trait SqlEngine: Send + Sync + 'static {
    async fn execute(
        &self,
        query: &str,
        connection: &ConnectionRef,
        options: &HashMap<String, String>,
    ) -> SqlReadResult<QueryOutput>;
}

/// An in-process engine over a DataFusion session with registered tables.
///
/// The connection descriptor is ignored since the session itself is the
/// source; this engine mainly backs tests and embedded use.
pub struct DataFusionEngine {
    context: SessionContext,
}

impl DataFusionEngine {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

#[async_trait]
impl SqlEngine for DataFusionEngine {
    async fn execute(
        &self,
        query: &str,
        _connection: &ConnectionRef,
        _options: &HashMap<String, String>,
    ) -> SqlReadResult<QueryOutput> {
        let frame = self.context.sql(query).await?;
        let schema: SchemaRef = Arc::new(Schema::from(frame.schema()));
        let batches = frame.collect().await?;
        Ok(QueryOutput { schema, batches })
    }
}
