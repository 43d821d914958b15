use crate::dispatch::RowAction;
use std::collections::HashSet;
use thiserror::Error;

/// Keys the normal-mode router claims before it looks at kind shortcuts.
pub const RESERVED_KEYS: [char; 8] = [':', '?', '/', 'r', 'q', 'l', 'x', 'y'];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ColumnDef {
    pub field: &'static str,
    pub label: &'static str,
    pub width: Option<u16>,
}

const fn col(field: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        field,
        label,
        width: None,
    }
}

const fn wide(field: &'static str, label: &'static str, width: u16) -> ColumnDef {
    ColumnDef {
        field,
        label,
        width: Some(width),
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct ResourceKind {
    pub key: &'static str,
    pub label: &'static str,
    pub shortcut: char,
    pub list_endpoint: &'static str,
    pub response_field: &'static str,
    pub noun: &'static str,
    pub namespaced: bool,
    pub actions: &'static [RowAction],
    pub columns: &'static [ColumnDef],
}

impl ResourceKind {
    pub fn supports(&self, action: RowAction) -> bool {
        self.actions.iter().any(|candidate| {
            std::mem::discriminant(candidate) == std::mem::discriminant(&action)
        })
    }
}

const COMMON: &[RowAction] = &[RowAction::Describe, RowAction::Yaml, RowAction::Delete];
const READ_ONLY: &[RowAction] = &[RowAction::Describe, RowAction::Yaml];
const POD_ACTIONS: &[RowAction] = &[
    RowAction::Logs { previous: false },
    RowAction::Describe,
    RowAction::Yaml,
    RowAction::Delete,
];
const DEPLOYMENT_ACTIONS: &[RowAction] = &[
    RowAction::Restart,
    RowAction::Scale,
    RowAction::Describe,
    RowAction::Yaml,
    RowAction::Delete,
];
const WORKLOAD_ACTIONS: &[RowAction] = &[
    RowAction::Restart,
    RowAction::Describe,
    RowAction::Yaml,
    RowAction::Delete,
];
const CRONJOB_ACTIONS: &[RowAction] = &[
    RowAction::Trigger,
    RowAction::Describe,
    RowAction::Yaml,
    RowAction::Delete,
];

pub static RESOURCE_KINDS: [ResourceKind; 12] = [
    ResourceKind {
        key: "pods",
        label: "Pods",
        shortcut: 'p',
        list_endpoint: "all-pods",
        response_field: "pods",
        noun: "pod",
        namespaced: true,
        actions: POD_ACTIONS,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("status", "Status"),
            col("ready", "Ready"),
            col("restarts", "Restarts"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "deployments",
        label: "Deployments",
        shortcut: 'd',
        list_endpoint: "all-deployments",
        response_field: "deployments",
        noun: "deployment",
        namespaced: true,
        actions: DEPLOYMENT_ACTIONS,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("ready", "Ready"),
            col("upToDate", "Up-to-date"),
            col("available", "Available"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "services",
        label: "Services",
        shortcut: 's',
        list_endpoint: "all-services",
        response_field: "services",
        noun: "service",
        namespaced: true,
        actions: COMMON,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("type", "Type"),
            col("clusterIP", "Cluster IP"),
            col("ports", "Ports"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "configmaps",
        label: "ConfigMaps",
        shortcut: 'c',
        list_endpoint: "all-configmaps",
        response_field: "configmaps",
        noun: "configmap",
        namespaced: true,
        actions: COMMON,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("dataCount", "Data"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "secrets",
        label: "Secrets",
        shortcut: 'e',
        list_endpoint: "all-secrets",
        response_field: "secrets",
        noun: "secret",
        namespaced: true,
        actions: COMMON,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("type", "Type"),
            col("dataCount", "Data"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "ingresses",
        label: "Ingresses",
        shortcut: 'i',
        list_endpoint: "all-ingresses",
        response_field: "ingresses",
        noun: "ingress",
        namespaced: true,
        actions: COMMON,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("class", "Class"),
            col("hosts", "Hosts"),
            col("address", "Address"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "statefulsets",
        label: "StatefulSets",
        shortcut: 't',
        list_endpoint: "all-statefulsets",
        response_field: "statefulsets",
        noun: "statefulset",
        namespaced: true,
        actions: WORKLOAD_ACTIONS,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("ready", "Ready"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "daemonsets",
        label: "DaemonSets",
        shortcut: 'a',
        list_endpoint: "all-daemonsets",
        response_field: "daemonsets",
        noun: "daemonset",
        namespaced: true,
        actions: WORKLOAD_ACTIONS,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("desired", "Desired"),
            col("current", "Current"),
            col("ready", "Ready"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "jobs",
        label: "Jobs",
        shortcut: 'j',
        list_endpoint: "all-jobs",
        response_field: "jobs",
        noun: "job",
        namespaced: true,
        actions: COMMON,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("completions", "Completions"),
            col("active", "Active"),
            col("failed", "Failed"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "cronjobs",
        label: "CronJobs",
        shortcut: 'o',
        list_endpoint: "all-cronjobs",
        response_field: "cronjobs",
        noun: "cronjob",
        namespaced: true,
        actions: CRONJOB_ACTIONS,
        columns: &[
            col("namespace", "Namespace"),
            col("name", "Name"),
            col("schedule", "Schedule"),
            col("suspend", "Suspend"),
            col("active", "Active"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "nodes",
        label: "Nodes",
        shortcut: 'n',
        list_endpoint: "nodes",
        response_field: "nodes",
        noun: "node",
        namespaced: false,
        actions: READ_ONLY,
        columns: &[
            col("name", "Name"),
            col("status", "Status"),
            col("roles", "Roles"),
            col("version", "Version"),
            col("cpu", "CPU"),
            col("memory", "Memory"),
            col("age", "Age"),
        ],
    },
    ResourceKind {
        key: "events",
        label: "Events",
        shortcut: 'v',
        list_endpoint: "all-events",
        response_field: "events",
        noun: "event",
        namespaced: true,
        actions: READ_ONLY,
        columns: &[
            col("namespace", "Namespace"),
            col("type", "Type"),
            col("reason", "Reason"),
            col("object", "Object"),
            wide("message", "Message", 48),
            col("count", "Count"),
            col("age", "Age"),
        ],
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("resource catalog is empty")]
    Empty,

    #[error("duplicate resource key '{0}'")]
    DuplicateKey(&'static str),

    #[error("shortcut '{shortcut}' of '{key}' is already bound to another resource kind")]
    DuplicateShortcut { key: &'static str, shortcut: char },

    #[error("shortcut '{shortcut}' of '{key}' collides with a reserved console key")]
    ReservedShortcut { key: &'static str, shortcut: char },

    #[error("shortcut '{shortcut}' of '{key}' must be a lowercase ascii letter")]
    InvalidShortcut { key: &'static str, shortcut: char },

    #[error("resource '{0}' has no singular noun")]
    MissingNoun(&'static str),

    #[error("resource '{0}' has no list endpoint or response field")]
    MissingEndpoint(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    kinds: &'static [ResourceKind],
}

impl Catalog {
    pub fn validated() -> Result<Self, CatalogError> {
        Self::from_kinds(&RESOURCE_KINDS)
    }

    pub fn from_kinds(kinds: &'static [ResourceKind]) -> Result<Self, CatalogError> {
        if kinds.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut keys = HashSet::new();
        let mut shortcuts = HashSet::new();
        for kind in kinds {
            if !keys.insert(kind.key) {
                return Err(CatalogError::DuplicateKey(kind.key));
            }
            if !kind.shortcut.is_ascii_lowercase() {
                return Err(CatalogError::InvalidShortcut {
                    key: kind.key,
                    shortcut: kind.shortcut,
                });
            }
            if RESERVED_KEYS.contains(&kind.shortcut) {
                return Err(CatalogError::ReservedShortcut {
                    key: kind.key,
                    shortcut: kind.shortcut,
                });
            }
            if !shortcuts.insert(kind.shortcut) {
                return Err(CatalogError::DuplicateShortcut {
                    key: kind.key,
                    shortcut: kind.shortcut,
                });
            }
            if kind.noun.trim().is_empty() {
                return Err(CatalogError::MissingNoun(kind.key));
            }
            if kind.list_endpoint.trim().is_empty() || kind.response_field.trim().is_empty() {
                return Err(CatalogError::MissingEndpoint(kind.key));
            }
        }

        Ok(Self { kinds })
    }

    pub fn kinds(&self) -> &'static [ResourceKind] {
        self.kinds
    }

    pub fn first(&self) -> &'static ResourceKind {
        &self.kinds[0]
    }

    pub fn by_key(&self, key: &str) -> Option<&'static ResourceKind> {
        self.kinds.iter().find(|kind| kind.key == key)
    }

    pub fn by_shortcut(&self, shortcut: char) -> Option<&'static ResourceKind> {
        self.kinds.iter().find(|kind| kind.shortcut == shortcut)
    }
}
