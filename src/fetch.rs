use crate::model::{ResourceRow, TableData};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FetchKey {
    pub cluster: String,
    pub kind: &'static str,
}

impl FetchKey {
    pub fn new(cluster: impl Into<String>, kind: &'static str) -> Self {
        Self {
            cluster: cluster.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListTicket {
    pub key: FetchKey,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Default, Clone, Copy)]
struct Sequence {
    issued: u64,
    resolved: u64,
}

/// Tracks list requests per (cluster, kind) and keeps the last authoritative
/// table for each pair. Only the highest issued sequence of a pair may write
/// its table; earlier answers are dropped on arrival.
#[derive(Debug, Default)]
pub struct FetchCoordinator {
    sequences: HashMap<FetchKey, Sequence>,
    tables: HashMap<FetchKey, TableData>,
}

impl FetchCoordinator {
    pub fn issue(&mut self, key: FetchKey) -> ListTicket {
        let sequence = self.sequences.entry(key.clone()).or_default();
        sequence.issued += 1;
        debug!(cluster = %key.cluster, kind = key.kind, seq = sequence.issued, "list issued");
        ListTicket {
            seq: sequence.issued,
            key,
        }
    }

    pub fn is_loading(&self, key: &FetchKey) -> bool {
        self.sequences
            .get(key)
            .is_some_and(|sequence| sequence.resolved < sequence.issued)
    }

    pub fn complete(
        &mut self,
        ticket: &ListTicket,
        result: Result<Vec<ResourceRow>, String>,
        now: DateTime<Local>,
    ) -> Completion {
        let Some(sequence) = self.sequences.get_mut(&ticket.key) else {
            debug!(kind = ticket.key.kind, seq = ticket.seq, "list answer for unknown pair");
            return Completion::Stale;
        };
        if ticket.seq != sequence.issued {
            debug!(
                cluster = %ticket.key.cluster,
                kind = ticket.key.kind,
                seq = ticket.seq,
                latest = sequence.issued,
                "stale list answer discarded"
            );
            return Completion::Stale;
        }

        sequence.resolved = ticket.seq;
        let table = self.tables.entry(ticket.key.clone()).or_default();
        match result {
            Ok(rows) => table.set_rows(rows, now),
            Err(message) => table.set_error(message, now),
        }
        Completion::Applied
    }

    pub fn table(&self, key: &FetchKey) -> Option<&TableData> {
        self.tables.get(key)
    }

    pub fn table_mut(&mut self, key: &FetchKey) -> Option<&mut TableData> {
        self.tables.get_mut(key)
    }

    pub fn forget_cluster(&mut self, cluster: &str) {
        self.tables.retain(|key, _| key.cluster != cluster);
    }
}

#[cfg(test)]
mod tests {
    use super::{Completion, FetchCoordinator, FetchKey};
    use crate::model::{CellValue, ResourceRow};
    use chrono::Local;
    use proptest::prelude::*;

    fn rows(names: &[&str]) -> Vec<ResourceRow> {
        names
            .iter()
            .map(|name| {
                ResourceRow::with_fields([
                    ("namespace", CellValue::Text("default".to_string())),
                    ("name", CellValue::Text(name.to_string())),
                ])
            })
            .collect()
    }

    fn names(coordinator: &FetchCoordinator, key: &FetchKey) -> Vec<String> {
        coordinator
            .table(key)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter_map(|row| row.name().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn late_answer_for_older_request_is_discarded() {
        let mut coordinator = FetchCoordinator::default();
        let key = FetchKey::new("prod", "pods");
        let first = coordinator.issue(key.clone());
        let second = coordinator.issue(key.clone());

        assert_eq!(
            coordinator.complete(&second, Ok(rows(&["new"])), Local::now()),
            Completion::Applied
        );
        assert_eq!(
            coordinator.complete(&first, Ok(rows(&["old"])), Local::now()),
            Completion::Stale
        );
        assert_eq!(names(&coordinator, &key), vec!["new"]);
    }

    #[test]
    fn stale_answer_does_not_clear_loading() {
        let mut coordinator = FetchCoordinator::default();
        let key = FetchKey::new("prod", "pods");
        let first = coordinator.issue(key.clone());
        let second = coordinator.issue(key.clone());
        assert!(coordinator.is_loading(&key));

        coordinator.complete(&first, Ok(rows(&["old"])), Local::now());
        assert!(coordinator.is_loading(&key));
        assert!(coordinator.table(&key).is_none());

        coordinator.complete(&second, Ok(rows(&["new"])), Local::now());
        assert!(!coordinator.is_loading(&key));
    }

    #[test]
    fn pairs_are_sequenced_independently() {
        let mut coordinator = FetchCoordinator::default();
        let pods = FetchKey::new("prod", "pods");
        let deployments = FetchKey::new("prod", "deployments");
        let pods_ticket = coordinator.issue(pods.clone());
        let deploy_ticket = coordinator.issue(deployments.clone());

        coordinator.complete(&deploy_ticket, Ok(rows(&["api"])), Local::now());
        assert_eq!(
            coordinator.complete(&pods_ticket, Ok(rows(&["web-1", "web-2", "web-3"])), Local::now()),
            Completion::Applied
        );
        assert_eq!(names(&coordinator, &deployments), vec!["api"]);
        assert_eq!(names(&coordinator, &pods).len(), 3);
    }

    #[test]
    fn failure_replaces_rows_with_error() {
        let mut coordinator = FetchCoordinator::default();
        let key = FetchKey::new("prod", "pods");
        let ok = coordinator.issue(key.clone());
        coordinator.complete(&ok, Ok(rows(&["web-1"])), Local::now());

        let failing = coordinator.issue(key.clone());
        coordinator.complete(&failing, Err("connection refused".to_string()), Local::now());
        let table = coordinator.table(&key).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.error.as_deref(), Some("connection refused"));
        assert!(!coordinator.is_loading(&key));
    }

    proptest! {
        #[test]
        fn only_latest_issue_is_ever_displayed(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let mut coordinator = FetchCoordinator::default();
            let key = FetchKey::new("prod", "pods");
            let tickets = (0..6).map(|_| coordinator.issue(key.clone())).collect::<Vec<_>>();

            for index in order {
                let label = format!("gen-{index}");
                let outcome = coordinator.complete(&tickets[index], Ok(rows(&[label.as_str()])), Local::now());
                prop_assert_eq!(outcome == Completion::Applied, index == 5);
            }

            prop_assert_eq!(names(&coordinator, &key), vec!["gen-5".to_string()]);
            prop_assert!(!coordinator.is_loading(&key));
        }
    }
}
