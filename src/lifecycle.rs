use chrono::{DateTime, Local};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LifecyclePhase {
    Unknown,
    Running,
    ScalingDown,
    ScaledDown,
    ScalingUp,
}

impl Display for LifecyclePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Running => "running",
            Self::ScalingDown => "scaling-down",
            Self::ScaledDown => "scaled-down",
            Self::ScalingUp => "scaling-up",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NodegroupStatus {
    pub name: String,
    pub status: Option<String>,
    pub desired_size: u32,
    pub min_size: u32,
    pub max_size: u32,
    pub error: Option<String>,
}

/// Payload of the scaling-status endpoint.
#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScalingReport {
    pub cluster_name: String,
    pub cluster_state: Option<String>,
    pub total_desired_nodes: u32,
    pub nodegroups: Vec<NodegroupStatus>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScaleDirection {
    Down,
    Up,
}

impl ScaleDirection {
    pub fn is_converged(self, report: &ScalingReport) -> bool {
        match self {
            Self::Down => report.total_desired_nodes == 0,
            Self::Up => report.total_desired_nodes > 0,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Down => "Scaling down",
            Self::Up => "Scaling up",
        }
    }

    pub fn failure_fallback(self) -> &'static str {
        match self {
            Self::Down => "Scale down failed",
            Self::Up => "Scale up failed",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LifecycleState {
    pub cluster: String,
    pub phase: LifecyclePhase,
    pub total_desired_nodes: Option<u32>,
    pub nodegroups: Vec<NodegroupStatus>,
    pub last_checked: Option<DateTime<Local>>,
}

impl LifecycleState {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            phase: LifecyclePhase::Unknown,
            total_desired_nodes: None,
            nodegroups: Vec::new(),
            last_checked: None,
        }
    }

    pub fn scale_down_accepted(&mut self) {
        info!(cluster = %self.cluster, from = %self.phase, "scale-down accepted");
        self.phase = LifecyclePhase::ScalingDown;
    }

    pub fn scale_up_accepted(&mut self) {
        info!(cluster = %self.cluster, from = %self.phase, "scale-up accepted");
        self.phase = LifecyclePhase::ScalingUp;
    }

    pub fn apply_report(&mut self, report: ScalingReport, checked_at: DateTime<Local>) {
        let total = report.total_desired_nodes;
        let next = match (self.phase, total) {
            (LifecyclePhase::ScalingDown, 0) => LifecyclePhase::ScaledDown,
            (LifecyclePhase::ScalingDown, _) => LifecyclePhase::ScalingDown,
            (LifecyclePhase::ScalingUp, 0) => LifecyclePhase::ScalingUp,
            (LifecyclePhase::ScalingUp, _) => LifecyclePhase::Running,
            (_, 0) => LifecyclePhase::ScaledDown,
            _ => LifecyclePhase::Running,
        };
        if next != self.phase {
            debug!(
                cluster = %self.cluster,
                from = %self.phase,
                to = %next,
                total,
                "lifecycle phase changed"
            );
        }
        self.phase = next;
        self.total_desired_nodes = Some(total);
        self.nodegroups = report.nodegroups;
        self.last_checked = Some(checked_at);
    }

    pub fn poll_failed(&self, message: &str) {
        warn!(
            cluster = %self.cluster,
            phase = %self.phase,
            error = message,
            "scaling status poll failed"
        );
    }

    /// Scale-down stays disabled while the cluster already reports zero
    /// desired nodes.
    pub fn can_scale_down(&self) -> bool {
        self.total_desired_nodes != Some(0)
    }
}

#[derive(Debug, Default)]
pub struct LifecycleStore {
    states: HashMap<String, LifecycleState>,
}

impl LifecycleStore {
    pub fn get_or_create(&mut self, cluster: &str) -> &mut LifecycleState {
        self.states
            .entry(cluster.to_string())
            .or_insert_with(|| LifecycleState::new(cluster))
    }

    pub fn get(&self, cluster: &str) -> Option<&LifecycleState> {
        self.states.get(cluster)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScaleDownConfirm {
    pub cluster_to_stop: String,
    pub input: String,
}

impl ScaleDownConfirm {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster_to_stop: cluster.into(),
            input: String::new(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.input == self.cluster_to_stop
    }
}

/// Delays between scaling-status polls: doubling from `initial`, capped at
/// `max`, yielding at most `attempts` values.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    next: Duration,
    max: Duration,
    remaining: u32,
}

impl PollBackoff {
    pub fn new(initial: Duration, max: Duration, attempts: u32) -> Self {
        Self {
            next: initial.min(max),
            max,
            remaining: attempts,
        }
    }
}

impl Iterator for PollBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}

/// Polls until the report satisfies `direction` or the backoff runs out.
/// Every answer, failed or not, is handed to `report` as it arrives.
/// Returns whether convergence was observed.
pub async fn poll_until_converged<F, Fut, E, R>(
    backoff: PollBackoff,
    direction: ScaleDirection,
    mut fetch: F,
    mut report: R,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ScalingReport, E>>,
    R: FnMut(Result<ScalingReport, E>),
{
    for delay in backoff {
        tokio::time::sleep(delay).await;
        let result = fetch().await;
        let converged = matches!(&result, Ok(status) if direction.is_converged(status));
        report(result);
        if converged {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::{
        LifecyclePhase, LifecycleStore, PollBackoff, ScaleDirection, ScaleDownConfirm,
        ScalingReport, poll_until_converged,
    };
    use chrono::Local;
    use std::time::Duration;

    fn report(total: u32) -> ScalingReport {
        ScalingReport {
            cluster_name: "prod".to_string(),
            total_desired_nodes: total,
            ..ScalingReport::default()
        }
    }

    #[test]
    fn scale_down_converges_on_zero_nodes() {
        let mut store = LifecycleStore::default();
        let state = store.get_or_create("prod");
        state.apply_report(report(4), Local::now());
        assert_eq!(state.phase, LifecyclePhase::Running);

        state.scale_down_accepted();
        state.apply_report(report(2), Local::now());
        assert_eq!(state.phase, LifecyclePhase::ScalingDown);
        state.apply_report(report(0), Local::now());
        assert_eq!(state.phase, LifecyclePhase::ScaledDown);
    }

    #[test]
    fn scale_up_converges_on_any_node() {
        let mut store = LifecycleStore::default();
        let state = store.get_or_create("prod");
        state.apply_report(report(0), Local::now());
        assert_eq!(state.phase, LifecyclePhase::ScaledDown);

        state.scale_up_accepted();
        state.apply_report(report(0), Local::now());
        assert_eq!(state.phase, LifecyclePhase::ScalingUp);
        state.apply_report(report(3), Local::now());
        assert_eq!(state.phase, LifecyclePhase::Running);
    }

    #[test]
    fn poll_failure_keeps_phase() {
        let mut store = LifecycleStore::default();
        let state = store.get_or_create("prod");
        state.scale_down_accepted();
        state.poll_failed("timeout");
        assert_eq!(store.get("prod").unwrap().phase, LifecyclePhase::ScalingDown);
    }

    #[test]
    fn scale_down_disabled_only_at_zero_nodes() {
        let mut store = LifecycleStore::default();
        let state = store.get_or_create("prod");
        assert!(state.can_scale_down());
        state.apply_report(report(0), Local::now());
        assert!(!state.can_scale_down());
        state.apply_report(report(1), Local::now());
        assert!(state.can_scale_down());
    }

    #[test]
    fn store_is_keyed_by_cluster() {
        let mut store = LifecycleStore::default();
        store.get_or_create("prod").scale_up_accepted();
        store.get_or_create("staging");
        assert_eq!(store.get("prod").unwrap().phase, LifecyclePhase::ScalingUp);
        assert_eq!(store.get("staging").unwrap().phase, LifecyclePhase::Unknown);
        assert!(store.get("dev").is_none());
    }

    #[test]
    fn typed_confirmation_is_byte_exact() {
        let mut confirm = ScaleDownConfirm::new("prod-eu");
        assert!(!confirm.is_armed());
        confirm.input = "PROD-EU".to_string();
        assert!(!confirm.is_armed());
        confirm.input = "prod-eu ".to_string();
        assert!(!confirm.is_armed());
        confirm.input = "prod-eu".to_string();
        assert!(confirm.is_armed());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let delays = PollBackoff::new(Duration::from_secs(2), Duration::from_secs(10), 5)
            .collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
    }

    #[tokio::test]
    async fn polling_stops_at_convergence() {
        let mut answers = vec![Ok(report(3)), Err("throttled"), Ok(report(0)), Ok(report(0))]
            .into_iter();
        let mut seen = Vec::new();
        let converged = poll_until_converged(
            PollBackoff::new(Duration::from_millis(1), Duration::from_millis(2), 8),
            ScaleDirection::Down,
            || {
                let next = answers.next().unwrap_or(Err("exhausted"));
                async move { next }
            },
            |result| seen.push(result.map(|status| status.total_desired_nodes)),
        )
        .await;

        assert!(converged);
        assert_eq!(seen, vec![Ok(3), Err("throttled"), Ok(0)]);
    }

    #[tokio::test]
    async fn polling_gives_up_after_attempts() {
        let mut calls = 0;
        let converged = poll_until_converged(
            PollBackoff::new(Duration::from_millis(1), Duration::from_millis(1), 3),
            ScaleDirection::Up,
            || async { Ok::<_, String>(report(0)) },
            |_| calls += 1,
        )
        .await;
        assert!(!converged);
        assert_eq!(calls, 3);
    }
}
