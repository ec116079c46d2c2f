//! Result aggregation, ranking and table rendering.
//!
//! The aggregator runs only at report time, under the same lock-free read
//! discipline as the timing path: it traverses the live generation's
//! points and sums each point's per-worker blocks into one flat row.

use crate::core::error::{MonitorError, Result};
use crate::core::types::MonitorResult;
use crate::registry::{MonitorPoint, Registry};
use std::cmp::Ordering;
use std::fmt::Write;

/// Snapshot every live point into a flat, unranked result list.
pub fn snapshot(registry: &Registry) -> Result<Vec<MonitorResult>> {
    let mut results = Vec::new();
    results
        .try_reserve_exact(registry.live())
        .map_err(|_| MonitorError::alloc("result memory"))?;
    registry.for_each_point(|point| results.push(total_stats(point)));
    Ok(results)
}

/// Sum one point's counters across all workers.
///
/// The cross-worker sum can itself wrap; that is detected the same way the
/// hot path detects it (sum decreasing after an add) and counted into the
/// row's overflow. The average is computed once, after full summation.
fn total_stats(point: &MonitorPoint) -> MonitorResult {
    let mut cost = 0u64;
    let mut overflow = 0u64;
    let mut call_times = 0u64;

    for block in point.blocks() {
        let (block_cost, block_overflow, block_calls) = block.totals();
        call_times = call_times.wrapping_add(block_calls);
        overflow = overflow.wrapping_add(block_overflow);

        let prev = cost;
        cost = cost.wrapping_add(block_cost);
        if cost < prev {
            overflow = overflow.wrapping_add(1);
        }
    }

    let average = if call_times == 0 { 0 } else { cost / call_times };

    MonitorResult {
        name: *point.name(),
        call_times,
        overflow,
        cost,
        average,
    }
}

/// Rank results in place: most expensive first.
///
/// Order: empty (tombstoned) names last regardless of other fields, then
/// overflow count descending (a point that wrapped is worse than any that
/// did not), then total cost descending. The sort is stable, so ties keep
/// their input order.
pub fn rank(results: &mut [MonitorResult]) {
    results.sort_by(|a, b| match (a.name.is_empty(), b.name.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b
            .overflow
            .cmp(&a.overflow)
            .then_with(|| b.cost.cmp(&a.cost)),
    });
}

/// Render ranked results as a fixed-width text table.
///
/// With zero results the single line `No monitor point` is rendered
/// instead of an empty table.
pub fn render(results: &[MonitorResult]) -> String {
    if results.is_empty() {
        return String::from("No monitor point\n");
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32}    {:<10}    {:<8}    {:<22}    {:<22}",
        "monitor", "call_times", "overflow", "total_costs", "average_cost"
    );
    for result in results {
        let _ = writeln!(
            out,
            "{:<32}    {:<10}    {:<8}    {:<22}    {:<22}",
            result.name.as_str(),
            result.call_times,
            result.overflow,
            result.cost,
            result.average
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{hash_name, PointName};
    use pretty_assertions::assert_eq;

    fn row(name: &str, overflow: u64, cost: u64) -> MonitorResult {
        MonitorResult {
            name: PointName::new(name),
            call_times: 1,
            overflow,
            cost,
            average: cost,
        }
    }

    fn point(name: &str, workers: usize) -> MonitorPoint {
        let name = PointName::new(name);
        let hash = hash_name(&name);
        MonitorPoint::try_alloc(name, hash, workers).expect("alloc")
    }

    #[test]
    fn overflow_outranks_cost() {
        let mut results = vec![row("a", 2, 100), row("b", 2, 50), row("c", 1, 999)];
        rank(&mut results);

        let order: Vec<u64> = results.iter().map(|r| r.cost).collect();
        assert_eq!(order, [100, 50, 999]);
    }

    #[test]
    fn ties_keep_input_order() {
        let mut results = vec![row("first", 0, 10), row("second", 0, 10)];
        rank(&mut results);
        assert_eq!(results[0].name.as_str(), "first");
        assert_eq!(results[1].name.as_str(), "second");
    }

    #[test]
    fn empty_names_sort_last() {
        let mut results = vec![row("", 99, 9999), row("live", 0, 1)];
        rank(&mut results);
        assert_eq!(results[0].name.as_str(), "live");
        assert!(results[1].name.is_empty());
    }

    #[test]
    fn cross_worker_sum_wrap_is_counted() {
        let point = point("wrapping", 2);
        // Worker 0 accumulates u64::MAX via a wrapped counter delta.
        point.block(0).begin(1);
        point.block(0).finish(0);
        // Worker 1 adds a little more, wrapping the cross-worker sum.
        point.block(1).begin(2);
        point.block(1).finish(12);

        let result = total_stats(&point);
        assert_eq!(result.call_times, 2);
        assert_eq!(result.overflow, 1);
        assert_eq!(result.cost, 9);
    }

    #[test]
    fn average_is_total_over_calls_with_zero_guard() {
        let busy = point("avg", 2);
        busy.block(0).begin(5);
        busy.block(0).finish(15);
        busy.block(1).begin(10);
        busy.block(1).finish(40);

        let result = total_stats(&busy);
        assert_eq!(result.cost, 40);
        assert_eq!(result.call_times, 2);
        assert_eq!(result.average, 20);

        let idle = point("idle", 1);
        assert_eq!(total_stats(&idle).average, 0);
    }

    #[test]
    fn render_includes_header_and_rows() {
        let results = vec![row("rx_poll", 0, 120)];
        let table = render(&results);
        let mut lines = table.lines();

        let header = lines.next().expect("header");
        assert!(header.starts_with("monitor"));
        assert!(header.contains("call_times"));
        assert!(header.contains("overflow"));
        assert!(header.contains("total_costs"));
        assert!(header.contains("average_cost"));

        let first = lines.next().expect("row");
        assert!(first.starts_with("rx_poll"));
        assert!(first.contains("120"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn render_without_points() {
        assert_eq!(render(&[]), "No monitor point\n");
    }

    #[test]
    fn snapshot_covers_all_points() {
        let registry = Registry::try_new(8, 16, 2).expect("registry");
        registry.insert(&PointName::new("a")).expect("a");
        registry.insert(&PointName::new("b")).expect("b");

        let results = snapshot(&registry).expect("snapshot");
        assert_eq!(results.len(), 2);
    }
}
