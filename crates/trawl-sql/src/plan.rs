/// One contiguous row range of the query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub offset: u64,
    pub limit: u64,
}

/// Split `row_count` rows into exactly `partitions` contiguous ranges.
///
/// Every range gets the same limit `ceil(row_count / partitions)`; the
/// source caps the trailing range, so the requested limits may sum to more
/// than `row_count`. A zero row count still yields `partitions` zero-limit
/// ranges: emptiness is resolved by the index reconciler, not here.
///
/// The caller must validate `partitions >= 1`.
pub(crate) fn plan_partitions(row_count: u64, partitions: usize) -> Vec<PartitionRange> {
    let limit = row_count.div_ceil(partitions as u64);
    (0..partitions as u64)
        .map(|part| PartitionRange {
            offset: part * limit,
            limit,
        })
        .collect()
}

pub(crate) fn count_query(sql: &str) -> String {
    format!("SELECT COUNT(*) FROM ({sql}) AS t")
}

pub(crate) fn schema_query(sql: &str) -> String {
    format!("SELECT * FROM ({sql}) AS t LIMIT 0")
}

pub(crate) fn bounded_query(sql: &str, range: &PartitionRange) -> String {
    format!(
        "SELECT * FROM ({sql}) AS t LIMIT {} OFFSET {}",
        range.limit, range.offset
    )
}
