use crate::catalog::ResourceKind;
use crate::model::{FocusState, ResourceRow};
use reqwest::Method;

/// Namespace path segment used for cluster-scoped rows.
pub const CLUSTER_SCOPE_SEGMENT: &str = "-";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowAction {
    Logs { previous: bool },
    Describe,
    Yaml,
    Delete,
    Restart,
    Scale,
    Trigger,
}

impl RowAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Logs { previous: false } => "logs",
            Self::Logs { previous: true } => "previous logs",
            Self::Describe => "describe",
            Self::Yaml => "yaml",
            Self::Delete => "delete",
            Self::Restart => "restart",
            Self::Scale => "scale",
            Self::Trigger => "trigger",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionTarget {
    pub cluster: String,
    pub kind: &'static ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ActionTarget {
    pub fn namespace_segment(&self) -> &str {
        self.namespace.as_deref().unwrap_or(CLUSTER_SCOPE_SEGMENT)
    }

    pub fn display(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{} {namespace}/{}", self.kind.noun, self.name),
            None => format!("{} {}", self.kind.noun, self.name),
        }
    }

    fn resource_segments(&self) -> Vec<String> {
        vec![
            "clusters".to_string(),
            self.cluster.clone(),
            "resources".to_string(),
            self.kind.noun.to_string(),
            self.namespace_segment().to_string(),
            self.name.clone(),
        ]
    }

    fn workload_segments(&self, verb: &str) -> Vec<String> {
        vec![
            "clusters".to_string(),
            self.cluster.clone(),
            self.kind.key.to_string(),
            self.namespace_segment().to_string(),
            self.name.clone(),
            verb.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ActionRequest {
    Logs { target: ActionTarget, previous: bool },
    Describe { target: ActionTarget },
    Yaml { target: ActionTarget },
    Delete { target: ActionTarget },
    Restart { target: ActionTarget },
    Scale { target: ActionTarget, replicas: u32 },
    Trigger { target: ActionTarget },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Endpoint {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
}

impl ActionRequest {
    pub fn target(&self) -> &ActionTarget {
        match self {
            Self::Logs { target, .. }
            | Self::Describe { target }
            | Self::Yaml { target }
            | Self::Delete { target }
            | Self::Restart { target }
            | Self::Scale { target, .. }
            | Self::Trigger { target } => target,
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Delete { .. } | Self::Restart { .. } | Self::Scale { .. } | Self::Trigger { .. }
        )
    }

    pub fn endpoint(&self, tail_lines: u32) -> Endpoint {
        let target = self.target();
        match self {
            Self::Logs { previous, .. } => Endpoint {
                method: Method::GET,
                segments: vec![
                    "clusters".to_string(),
                    target.cluster.clone(),
                    "pods".to_string(),
                    target.namespace_segment().to_string(),
                    target.name.clone(),
                    "logs".to_string(),
                ],
                query: vec![
                    ("previous", previous.to_string()),
                    ("tail", tail_lines.to_string()),
                ],
            },
            Self::Describe { .. } | Self::Yaml { .. } => {
                let mut segments = target.resource_segments();
                segments.push(self.content_field().unwrap_or_default().to_string());
                Endpoint {
                    method: Method::GET,
                    segments,
                    query: Vec::new(),
                }
            }
            Self::Delete { .. } => Endpoint {
                method: Method::DELETE,
                segments: target.resource_segments(),
                query: Vec::new(),
            },
            Self::Restart { .. } => Endpoint {
                method: Method::POST,
                segments: target.workload_segments("restart"),
                query: Vec::new(),
            },
            Self::Scale { replicas, .. } => Endpoint {
                method: Method::POST,
                segments: target.workload_segments("scale"),
                query: vec![("replicas", replicas.to_string())],
            },
            Self::Trigger { .. } => Endpoint {
                method: Method::POST,
                segments: target.workload_segments("trigger"),
                query: Vec::new(),
            },
        }
    }

    /// Payload field holding viewer text for read-only actions.
    pub fn content_field(&self) -> Option<&'static str> {
        match self {
            Self::Logs { .. } => Some("logs"),
            Self::Describe { .. } => Some("describe"),
            Self::Yaml { .. } => Some("yaml"),
            _ => None,
        }
    }

    pub fn title(&self) -> String {
        let target = self.target();
        match self {
            Self::Logs { previous: true, .. } => format!("Previous logs: {}", target.display()),
            Self::Logs { .. } => format!("Logs: {}", target.display()),
            Self::Describe { .. } => format!("Describe: {}", target.display()),
            Self::Yaml { .. } => format!("YAML: {}", target.display()),
            Self::Delete { .. } => format!("Delete {}", target.display()),
            Self::Restart { .. } => format!("Restart {}", target.display()),
            Self::Scale { replicas, .. } => {
                format!("Scale {} to {replicas} replicas", target.display())
            }
            Self::Trigger { .. } => format!("Trigger {}", target.display()),
        }
    }

    pub fn failure_fallback(&self) -> &'static str {
        match self {
            Self::Logs { .. } => "Failed to fetch logs",
            Self::Describe { .. } => "Failed to describe resource",
            Self::Yaml { .. } => "Failed to fetch YAML",
            Self::Delete { .. } => "Failed to delete resource",
            Self::Restart { .. } => "Failed to restart",
            Self::Scale { .. } => "Failed to scale",
            Self::Trigger { .. } => "Failed to trigger CronJob",
        }
    }

    pub fn success_message(&self, detail: Option<&str>) -> String {
        let target = self.target().display();
        let summary = match self {
            Self::Delete { .. } => format!("Deleted {target}"),
            Self::Restart { .. } => format!("Restart initiated for {target}"),
            Self::Scale { replicas, .. } => format!("Scaled {target} to {replicas} replicas"),
            Self::Trigger { .. } => format!("Triggered {target}"),
            _ => self.title(),
        };
        match detail.map(str::trim).filter(|detail| !detail.is_empty()) {
            Some(detail) => format!("{summary}: {detail}"),
            None => summary,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PendingAction {
    pub request: ActionRequest,
    pub prompt: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Preparation {
    Refused(String),
    Confirm(PendingAction),
    PromptReplicas(ActionTarget),
    Issue(ActionRequest),
}

/// Plans a row-level action against the current focus. Nothing here touches
/// the network; the caller issues the returned request.
pub fn prepare(focus: &FocusState, row: Option<&ResourceRow>, action: RowAction) -> Preparation {
    let Some(cluster) = focus.cluster.as_deref() else {
        return Preparation::Refused("Select a cluster first".to_string());
    };
    let kind = focus.kind;
    if !kind.supports(action) {
        return Preparation::Refused(format!(
            "{} does not support {}",
            kind.label,
            action.label()
        ));
    }
    let Some(row) = row else {
        return Preparation::Refused(format!("No {} selected", kind.noun));
    };
    let Some(name) = row.name() else {
        return Preparation::Refused(format!("Selected {} has no name", kind.noun));
    };

    let namespace = if kind.namespaced {
        match row.namespace() {
            Some(namespace) => Some(namespace.to_string()),
            None => {
                return Preparation::Refused(format!("Selected {} has no namespace", kind.noun));
            }
        }
    } else {
        None
    };

    let target = ActionTarget {
        cluster: cluster.to_string(),
        kind,
        namespace,
        name: name.to_string(),
    };

    match action {
        RowAction::Logs { previous } => {
            Preparation::Issue(ActionRequest::Logs { target, previous })
        }
        RowAction::Describe => Preparation::Issue(ActionRequest::Describe { target }),
        RowAction::Yaml => Preparation::Issue(ActionRequest::Yaml { target }),
        RowAction::Restart => Preparation::Issue(ActionRequest::Restart { target }),
        RowAction::Trigger => Preparation::Issue(ActionRequest::Trigger { target }),
        RowAction::Scale => Preparation::PromptReplicas(target),
        RowAction::Delete => {
            let prompt = format!(
                "Delete {}? This cannot be undone. (y/n)",
                target.display()
            );
            Preparation::Confirm(PendingAction {
                request: ActionRequest::Delete { target },
                prompt,
            })
        }
    }
}

pub fn parse_replicas(input: &str) -> Result<u32, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Replica count is required".to_string());
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| format!("Invalid replica count '{trimmed}'"))
}

#[cfg(test)]
mod tests {
    use super::{ActionRequest, Preparation, RowAction, parse_replicas, prepare};
    use crate::catalog::Catalog;
    use crate::model::{CellValue, FocusState, ResourceRow};
    use reqwest::Method;

    fn focus(kind: &str) -> FocusState {
        let catalog = Catalog::validated().unwrap();
        let mut focus = FocusState::new(catalog.by_key(kind).unwrap());
        focus.cluster = Some("prod".to_string());
        focus
    }

    fn row(namespace: Option<&str>, name: &str) -> ResourceRow {
        let mut fields = vec![("name", CellValue::Text(name.to_string()))];
        if let Some(namespace) = namespace {
            fields.push(("namespace", CellValue::Text(namespace.to_string())));
        }
        ResourceRow::with_fields(fields)
    }

    fn issued(preparation: Preparation) -> ActionRequest {
        match preparation {
            Preparation::Issue(request) => request,
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn delete_requires_confirmation_with_noun_path() {
        let web = row(Some("default"), "web-1");
        let Preparation::Confirm(pending) = prepare(&focus("pods"), Some(&web), RowAction::Delete)
        else {
            panic!("delete must ask for confirmation");
        };
        assert!(pending.prompt.contains("pod default/web-1"));
        let endpoint = pending.request.endpoint(500);
        assert_eq!(endpoint.method, Method::DELETE);
        assert_eq!(
            endpoint.segments,
            vec!["clusters", "prod", "resources", "pod", "default", "web-1"]
        );
        assert!(pending.request.is_mutating());
    }

    #[test]
    fn describe_uses_irregular_noun() {
        let ingress = row(Some("edge"), "public");
        let request = issued(prepare(&focus("ingresses"), Some(&ingress), RowAction::Describe));
        let endpoint = request.endpoint(500);
        assert_eq!(endpoint.method, Method::GET);
        assert_eq!(
            endpoint.segments,
            vec!["clusters", "prod", "resources", "ingress", "edge", "public", "describe"]
        );
        assert_eq!(request.content_field(), Some("describe"));
        assert!(!request.is_mutating());
    }

    #[test]
    fn cluster_scoped_rows_use_dash_segment() {
        let node = row(None, "ip-10-0-1-12");
        let request = issued(prepare(&focus("nodes"), Some(&node), RowAction::Yaml));
        assert_eq!(
            request.endpoint(500).segments,
            vec!["clusters", "prod", "resources", "node", "-", "ip-10-0-1-12", "yaml"]
        );
    }

    #[test]
    fn logs_carry_previous_and_tail() {
        let web = row(Some("default"), "web-1");
        let request = issued(prepare(
            &focus("pods"),
            Some(&web),
            RowAction::Logs { previous: true },
        ));
        let endpoint = request.endpoint(200);
        assert_eq!(
            endpoint.segments,
            vec!["clusters", "prod", "pods", "default", "web-1", "logs"]
        );
        assert_eq!(
            endpoint.query,
            vec![("previous", "true".to_string()), ("tail", "200".to_string())]
        );
    }

    #[test]
    fn scale_prompts_then_targets_workload_path() {
        let api = row(Some("default"), "api");
        let Preparation::PromptReplicas(target) =
            prepare(&focus("deployments"), Some(&api), RowAction::Scale)
        else {
            panic!("scale must prompt for replicas");
        };
        let request = ActionRequest::Scale {
            target,
            replicas: 3,
        };
        let endpoint = request.endpoint(500);
        assert_eq!(endpoint.method, Method::POST);
        assert_eq!(
            endpoint.segments,
            vec!["clusters", "prod", "deployments", "default", "api", "scale"]
        );
        assert_eq!(endpoint.query, vec![("replicas", "3".to_string())]);
        assert_eq!(
            request.success_message(None),
            "Scaled deployment default/api to 3 replicas"
        );
    }

    #[test]
    fn unsupported_actions_are_refused() {
        let node = row(None, "ip-10-0-1-12");
        assert!(matches!(
            prepare(&focus("nodes"), Some(&node), RowAction::Delete),
            Preparation::Refused(_)
        ));
        let svc = row(Some("default"), "web");
        assert!(matches!(
            prepare(&focus("services"), Some(&svc), RowAction::Restart),
            Preparation::Refused(_)
        ));
    }

    #[test]
    fn no_cluster_or_row_is_refused() {
        let mut unfocused = focus("pods");
        unfocused.cluster = None;
        let web = row(Some("default"), "web-1");
        assert!(matches!(
            prepare(&unfocused, Some(&web), RowAction::Describe),
            Preparation::Refused(_)
        ));
        assert!(matches!(
            prepare(&focus("pods"), None, RowAction::Describe),
            Preparation::Refused(_)
        ));
    }

    #[test]
    fn replica_input_is_validated() {
        assert_eq!(parse_replicas(" 4 "), Ok(4));
        assert!(parse_replicas("").is_err());
        assert!(parse_replicas("-1").is_err());
        assert!(parse_replicas("two").is_err());
    }
}
