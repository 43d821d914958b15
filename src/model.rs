use crate::catalog::{ColumnDef, ResourceKind};
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceFilter {
    All,
    Named(String),
}

impl NamespaceFilter {
    pub fn label(&self) -> String {
        match self {
            Self::All => "All Namespaces".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }

    /// Rows of cluster-scoped kinds carry no namespace and are always admitted.
    pub fn admits(&self, kind: &ResourceKind, row: &ResourceRow) -> bool {
        match self {
            Self::All => true,
            Self::Named(_) if !kind.namespaced => true,
            Self::Named(namespace) => row.namespace() == Some(namespace.as_str()),
        }
    }
}

impl Display for NamespaceFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FocusState {
    pub cluster: Option<String>,
    pub namespace: NamespaceFilter,
    pub kind: &'static ResourceKind,
    pub filter: String,
}

impl FocusState {
    pub fn new(kind: &'static ResourceKind) -> Self {
        Self {
            cluster: None,
            namespace: NamespaceFilter::All,
            kind,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
    Absent,
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(flag) => Self::Flag(flag),
            Value::String(text) => Self::Text(text),
            Value::Number(number) => Self::Text(number.to_string()),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(text) => text,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl CellValue {
    fn contains_lowercase(&self, needle: &str) -> bool {
        match self {
            Self::Text(text) => text.to_lowercase().contains(needle),
            Self::Flag(flag) => flag.to_string().contains(needle),
            Self::List(items) => items
                .iter()
                .any(|item| item.to_lowercase().contains(needle)),
            Self::Absent => false,
        }
    }

    pub fn render(&self, field: &str, now: DateTime<Utc>) -> String {
        match self {
            Self::Absent => "-".to_string(),
            Self::Flag(true) => "Yes".to_string(),
            Self::Flag(false) => "No".to_string(),
            Self::Text(text) if field == "age" => format_age(text, now),
            Self::Text(text) => text.clone(),
            Self::List(items) if field == "ports" => {
                let mut shown = items.iter().take(2).cloned().collect::<Vec<_>>().join(", ");
                if items.len() > 2 {
                    shown.push_str("...");
                }
                shown
            }
            Self::List(items) if items.is_empty() => "-".to_string(),
            Self::List(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRow {
    fields: BTreeMap<String, CellValue>,
}

impl ResourceRow {
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        Some(Self {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, CellValue::from(value)))
                .collect(),
        })
    }

    #[cfg(test)]
    pub fn with_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> &CellValue {
        self.fields.get(field).unwrap_or(&CellValue::Absent)
    }

    fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(CellValue::Text(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.text("namespace")
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    pub fn identity(&self) -> (Option<String>, Option<String>) {
        (
            self.namespace().map(str::to_string),
            self.name().map(str::to_string),
        )
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }

        let needle = query.to_lowercase();
        self.fields
            .values()
            .any(|value| value.contains_lowercase(&needle))
    }

    pub fn render_columns(&self, columns: &[ColumnDef], now: DateTime<Utc>) -> Vec<String> {
        columns
            .iter()
            .map(|column| self.get(column.field).render(column.field, now))
            .collect()
    }
}

pub fn visible_rows<'a>(
    rows: &'a [ResourceRow],
    kind: &ResourceKind,
    namespace: &NamespaceFilter,
    filter: &str,
) -> Vec<&'a ResourceRow> {
    rows.iter()
        .filter(|row| namespace.admits(kind, row) && row.matches_filter(filter))
        .collect()
}

pub fn format_age(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = DateTime::parse_from_rfc3339(timestamp) else {
        return if timestamp.is_empty() {
            "-".to_string()
        } else {
            timestamp.to_string()
        };
    };

    let elapsed = now.signed_duration_since(created.with_timezone(&Utc));
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else {
        format!("{}m", elapsed.num_minutes().max(0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub rows: Vec<ResourceRow>,
    pub selected: usize,
    pub last_refreshed: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl TableData {
    pub fn set_rows(&mut self, rows: Vec<ResourceRow>, refreshed_at: DateTime<Local>) {
        self.rows = rows;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<Local>) {
        self.rows.clear();
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
        self.selected = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Loading { title: String },
    Loaded { title: String, content: String },
    Failed { title: String, message: String },
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Closed => None,
            Self::Loading { title } | Self::Loaded { title, .. } | Self::Failed { title, .. } => {
                Some(title.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ClusterSummary {
    pub name: String,
    pub status: Option<String>,
    pub version: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpgradeStatus {
    pub current_version: String,
    pub latest_version: String,
    pub is_up_to_date: bool,
}
