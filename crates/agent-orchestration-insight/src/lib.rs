#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use agent_orchestration_domain::{ExecutionRecord, ExecutionStatus, InsightSummary};
use agent_orchestration_store_core::{ExecutionLedger, DEFAULT_EXECUTION_WINDOW};

/// Success rate below this flags a configuration review.
pub const SUCCESS_RATE_THRESHOLD: f64 = 0.80;

/// Average duration above this (milliseconds) flags an optimization review.
pub const AVG_DURATION_THRESHOLD_MS: f64 = 5000.0;

/// The top error category is flagged by name only above this count.
pub const ERROR_PATTERN_MIN_COUNT: u64 = 3;

pub const RECOMMENDATION_INSUFFICIENT_DATA: &str = "Insufficient data.";
pub const RECOMMENDATION_OPTIMAL: &str = "Agent performance is optimal";

/// All-zero summary used for empty windows and degraded reads.
#[must_use]
pub fn empty_summary(agent_key: &str) -> InsightSummary {
    InsightSummary {
        agent_key: agent_key.to_string(),
        total_executions: 0,
        success_rate: 0.0,
        avg_duration_ms: 0.0,
        error_patterns: BTreeMap::new(),
        recommendations: vec![RECOMMENDATION_INSUFFICIENT_DATA.to_string()],
    }
}

fn error_category(error: Option<&str>) -> String {
    match error {
        None => "Unknown".to_string(),
        Some(text) => match text.split_once(':') {
            Some((prefix, _)) => prefix.trim().to_string(),
            None => text.trim().to_string(),
        },
    }
}

/// Most frequent category; ties break to the lexicographically smallest key.
fn top_error_category(patterns: &BTreeMap<String, u64>) -> Option<(&str, u64)> {
    patterns.iter().fold(None, |best, (key, &count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((key.as_str(), count)),
    })
}

/// Derive per-agent statistics over a most-recent-first window of executions.
///
/// Pure and total: an empty or all-failing window degrades to explicit
/// recommendations instead of erroring.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(agent_key: &str, window: &[ExecutionRecord]) -> InsightSummary {
    if window.is_empty() {
        return empty_summary(agent_key);
    }

    let total = window.len();
    let successes = window
        .iter()
        .filter(|row| row.status == ExecutionStatus::Success)
        .count();
    let success_rate = successes as f64 / total as f64;
    let duration_sum: u64 = window.iter().map(|row| row.duration_ms).sum();
    let avg_duration_ms = duration_sum as f64 / total as f64;

    let mut error_patterns: BTreeMap<String, u64> = BTreeMap::new();
    for row in window {
        if row.status == ExecutionStatus::Failed {
            let category = error_category(row.error.as_deref());
            *error_patterns.entry(category).or_insert(0) += 1;
        }
    }

    let mut recommendations = Vec::new();
    if success_rate < SUCCESS_RATE_THRESHOLD {
        recommendations.push(format!(
            "Success rate {success_rate:.2} is below {SUCCESS_RATE_THRESHOLD:.2}; review agent configuration"
        ));
    }
    if avg_duration_ms > AVG_DURATION_THRESHOLD_MS {
        recommendations.push(format!(
            "Average duration {avg_duration_ms:.1}ms exceeds {AVG_DURATION_THRESHOLD_MS:.0}ms; consider optimizing this agent"
        ));
    }
    if let Some((category, count)) = top_error_category(&error_patterns) {
        if count > ERROR_PATTERN_MIN_COUNT {
            recommendations.push(format!(
                "Recurring error pattern \"{category}\" observed {count} times; investigate root cause"
            ));
        }
    }
    if recommendations.is_empty() {
        recommendations.push(RECOMMENDATION_OPTIMAL.to_string());
    }

    InsightSummary {
        agent_key: agent_key.to_string(),
        total_executions: total,
        success_rate,
        avg_duration_ms,
        error_patterns,
        recommendations,
    }
}

/// Read the recent window from the ledger and summarize it.
///
/// Read failures degrade to the safe empty summary; dashboards should never
/// see a raw storage error from this path.
#[must_use]
pub fn insights_for_agent(
    ledger: &dyn ExecutionLedger,
    business_id: &str,
    agent_key: &str,
    window: usize,
) -> InsightSummary {
    let window = if window == 0 {
        DEFAULT_EXECUTION_WINDOW
    } else {
        window
    };
    match ledger.list_executions(business_id, agent_key, window) {
        Ok(rows) => summarize(agent_key, &rows),
        Err(_) => empty_summary(agent_key),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        empty_summary, insights_for_agent, summarize, RECOMMENDATION_INSUFFICIENT_DATA,
        RECOMMENDATION_OPTIMAL,
    };
    use agent_orchestration_domain::{
        now_utc, ExecutionId, ExecutionRecord, ExecutionStatus, NewExecution, RunId,
    };
    use agent_orchestration_store_core::{ExecutionLedger, OrchestrationStore, RunTracker};
    use agent_orchestration_store_sqlite::SqliteOrchestrationStore;
    use ulid::Ulid;

    fn row(status: ExecutionStatus, duration_ms: u64, error: Option<&str>) -> ExecutionRecord {
        ExecutionRecord {
            execution_id: ExecutionId::new(),
            run_id: RunId::new(),
            business_id: "acme".to_string(),
            agent_key: "classifier".to_string(),
            status,
            duration_ms,
            result: None,
            error: error.map(str::to_string),
            created_at: now_utc(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mixed_window_flags_configuration_review() {
        let window = vec![
            row(ExecutionStatus::Success, 100, None),
            row(ExecutionStatus::Success, 120, None),
            row(ExecutionStatus::Failed, 80, Some("TimeoutError: x")),
            row(ExecutionStatus::Failed, 90, Some("TimeoutError: y")),
        ];
        let summary = summarize("classifier", &window);
        assert_eq!(summary.total_executions, 4);
        assert!(close(summary.success_rate, 0.5));
        assert!(close(summary.avg_duration_ms, 97.5));
        assert_eq!(summary.error_patterns.get("TimeoutError"), Some(&2));
        assert_eq!(summary.error_patterns.len(), 1);
        assert!(summary
            .recommendations
            .iter()
            .any(|text| text.contains("review agent configuration")));
        // TimeoutError occurs twice, below the >3 bar, so no pattern flag.
        assert!(!summary
            .recommendations
            .iter()
            .any(|text| text.contains("TimeoutError")));
    }

    #[test]
    fn all_success_window_is_optimal() {
        let window: Vec<ExecutionRecord> = (0..10)
            .map(|_| row(ExecutionStatus::Success, 200, None))
            .collect();
        let summary = summarize("classifier", &window);
        assert!(close(summary.success_rate, 1.0));
        assert!(close(summary.avg_duration_ms, 200.0));
        assert!(summary.error_patterns.is_empty());
        assert_eq!(summary.recommendations, vec![RECOMMENDATION_OPTIMAL]);
    }

    #[test]
    fn empty_window_yields_insufficient_data() {
        let summary = summarize("classifier", &[]);
        assert_eq!(summary.total_executions, 0);
        assert!(close(summary.success_rate, 0.0));
        assert!(close(summary.avg_duration_ms, 0.0));
        assert_eq!(
            summary.recommendations,
            vec![RECOMMENDATION_INSUFFICIENT_DATA]
        );
    }

    #[test]
    fn summarize_is_pure() {
        let window = vec![
            row(ExecutionStatus::Success, 10, None),
            row(ExecutionStatus::Failed, 20, Some("RateLimit: upstream")),
        ];
        assert_eq!(summarize("a", &window), summarize("a", &window));
    }

    #[test]
    fn slow_agent_flags_optimization() {
        let window = vec![
            row(ExecutionStatus::Success, 6000, None),
            row(ExecutionStatus::Success, 7000, None),
        ];
        let summary = summarize("classifier", &window);
        assert!(summary
            .recommendations
            .iter()
            .any(|text| text.contains("consider optimizing")));
        assert!(!summary
            .recommendations
            .iter()
            .any(|text| text == RECOMMENDATION_OPTIMAL));
    }

    #[test]
    fn dominant_error_pattern_named_above_threshold() {
        let mut window = Vec::new();
        for _ in 0..4 {
            window.push(row(ExecutionStatus::Failed, 50, Some("TimeoutError: x")));
        }
        window.push(row(ExecutionStatus::Failed, 50, Some("RateLimit: y")));
        let summary = summarize("classifier", &window);
        assert_eq!(summary.error_patterns.get("TimeoutError"), Some(&4));
        assert!(summary
            .recommendations
            .iter()
            .any(|text| text.contains("TimeoutError")));
        assert!(!summary
            .recommendations
            .iter()
            .any(|text| text.contains("RateLimit")));
    }

    #[test]
    fn error_without_colon_uses_whole_string() {
        let window = vec![row(ExecutionStatus::Failed, 10, Some("boom"))];
        let summary = summarize("classifier", &window);
        assert_eq!(summary.error_patterns.get("boom"), Some(&1));
    }

    #[test]
    fn tie_breaks_to_smallest_category() {
        let mut window = Vec::new();
        for _ in 0..5 {
            window.push(row(ExecutionStatus::Failed, 10, Some("ZetaError: a")));
            window.push(row(ExecutionStatus::Failed, 10, Some("AlphaError: b")));
        }
        let summary = summarize("classifier", &window);
        assert!(summary
            .recommendations
            .iter()
            .any(|text| text.contains("AlphaError")));
        assert!(!summary
            .recommendations
            .iter()
            .any(|text| text.contains("ZetaError")));
    }

    #[test]
    fn insights_for_agent_reads_tenant_scoped_window() {
        let path = std::env::temp_dir().join(format!("ao-insight-{}.sqlite", Ulid::new()));
        let store =
            SqliteOrchestrationStore::open(&path).unwrap_or_else(|_| unreachable!("open store"));
        store.migrate().unwrap_or_else(|_| unreachable!("migrate"));

        let run_id = store
            .start_run(
                "acme",
                agent_orchestration_domain::OrchestrationType::Parallel,
                2,
            )
            .unwrap_or_else(|_| unreachable!("start run"));
        for (status, error) in [
            (ExecutionStatus::Success, None),
            (ExecutionStatus::Failed, Some("TimeoutError: upstream")),
        ] {
            store
                .record_execution(&NewExecution {
                    run_id,
                    business_id: "acme".to_string(),
                    agent_key: "classifier".to_string(),
                    status,
                    duration_ms: 100,
                    result: None,
                    error: error.map(str::to_string),
                })
                .unwrap_or_else(|_| unreachable!("record execution"));
        }

        let summary = insights_for_agent(&store, "acme", "classifier", 0);
        assert_eq!(summary.total_executions, 2);
        assert!(close(summary.success_rate, 0.5));

        let other = insights_for_agent(&store, "globex", "classifier", 0);
        assert_eq!(
            other.recommendations,
            vec![RECOMMENDATION_INSUFFICIENT_DATA]
        );
        assert_eq!(other, empty_summary("classifier"));

        let _ = std::fs::remove_file(&path);
    }
}
