use datafusion::arrow::array::{Array, ArrayRef};
use datafusion::arrow::compute::concat;

use crate::error::{SqlReadError, SqlReadResult};

/// Index data produced by a single partition fetch.
#[derive(Debug, Clone)]
pub enum IndexFragment {
    /// Row count only; used when no index column is requested.
    Length(usize),
    /// One array per requested index column.
    Values(Vec<ArrayRef>),
}

/// The row index spanning all partitions.
#[derive(Debug, Clone)]
pub enum GlobalIndex {
    /// Synthesized positional index `0..len`.
    Range { len: usize },
    /// Index rebuilt from explicit index columns, concatenated in partition
    /// order. `names` and `levels` are parallel; more than one entry forms a
    /// composite index.
    Columns {
        names: Vec<String>,
        levels: Vec<ArrayRef>,
    },
}

impl GlobalIndex {
    pub fn len(&self) -> usize {
        match self {
            GlobalIndex::Range { len } => *len,
            GlobalIndex::Columns { levels, .. } => levels.first().map_or(0, |level| level.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merge per-partition index fragments into one global index.
///
/// Fragments must arrive in plan order; concatenation preserves that order,
/// which is what makes the assembled dataset reproduce the row order of an
/// unpartitioned fetch. Completion order of the fetch tasks plays no role
/// here.
pub(crate) fn reconcile_index(
    fragments: Vec<IndexFragment>,
    index_columns: Option<&[String]>,
) -> SqlReadResult<GlobalIndex> {
    match index_columns {
        None => {
            let mut len = 0usize;
            for fragment in &fragments {
                let IndexFragment::Length(count) = fragment else {
                    return Err(SqlReadError::internal(
                        "expected length fragments for a positional index",
                    ));
                };
                len += count;
            }
            Ok(GlobalIndex::Range { len })
        }
        Some(names) => {
            let mut per_level: Vec<Vec<&dyn Array>> = vec![Vec::new(); names.len()];
            for fragment in &fragments {
                let IndexFragment::Values(values) = fragment else {
                    return Err(SqlReadError::internal(
                        "expected value fragments for an explicit index",
                    ));
                };
                if values.len() != names.len() {
                    return Err(SqlReadError::internal(format!(
                        "expected {} index levels per partition, got {}",
                        names.len(),
                        values.len()
                    )));
                }
                for (level, array) in values.iter().enumerate() {
                    per_level[level].push(array.as_ref());
                }
            }
            let levels = per_level
                .into_iter()
                .map(|arrays| concat(&arrays))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(GlobalIndex::Columns {
                names: names.to_vec(),
                levels,
            })
        }
    }
}
