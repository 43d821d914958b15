use crate::api::ActionReply;
use crate::catalog::{Catalog, ResourceKind};
use crate::dispatch::{
    ActionRequest, ActionTarget, PendingAction, Preparation, RowAction, parse_replicas, prepare,
};
use crate::error::ApiError;
use crate::fetch::{Completion, FetchCoordinator, FetchKey, ListTicket};
use crate::input::Action;
use crate::lifecycle::{
    LifecycleState, LifecycleStore, ScaleDirection, ScaleDownConfirm, ScalingReport,
};
use crate::model::{
    ClusterSummary, FocusState, ModalState, NamespaceFilter, Notice, NoticeLevel, ResourceRow,
    TableData, UpgradeStatus, visible_rows,
};
use crate::palette::{CommandPalette, PaletteCandidate};
use chrono::Local;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    Palette,
    ClusterPicker,
    ConfirmDelete,
    ScalePrompt,
    ScaleDownConfirm,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    LoadClusters,
    Connect {
        cluster: String,
    },
    LoadNamespaces {
        cluster: String,
    },
    FetchList {
        ticket: ListTicket,
        kind: &'static ResourceKind,
    },
    RunAction {
        token: u64,
        request: ActionRequest,
    },
    ScaleCluster {
        cluster: String,
        direction: ScaleDirection,
    },
    PollScaling {
        cluster: String,
    },
    WatchScaling {
        cluster: String,
        direction: ScaleDirection,
    },
    LoadUpgradeStatus {
        cluster: String,
    },
    Batch(Vec<AppCommand>),
}

/// Results of backend calls, delivered to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Clusters(Result<Vec<ClusterSummary>, ApiError>),
    Connected {
        cluster: String,
        result: Result<String, ApiError>,
    },
    Namespaces {
        cluster: String,
        result: Result<Vec<String>, ApiError>,
    },
    Listed {
        ticket: ListTicket,
        result: Result<Vec<ResourceRow>, ApiError>,
    },
    ActionDone {
        token: u64,
        request: ActionRequest,
        result: Result<ActionReply, ApiError>,
    },
    ScaleAccepted {
        cluster: String,
        direction: ScaleDirection,
        result: Result<String, ApiError>,
    },
    ScalingStatus {
        cluster: String,
        result: Result<ScalingReport, ApiError>,
    },
    UpgradeStatus {
        cluster: String,
        result: Result<UpgradeStatus, ApiError>,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScalePrompt {
    pub target: ActionTarget,
    pub input: String,
}

#[derive(Debug, Default)]
struct ClusterPicker {
    open: bool,
    loading: bool,
    selected: usize,
    error: Option<String>,
}

#[derive(Debug)]
pub struct App {
    catalog: Catalog,
    focus: FocusState,
    fetch: FetchCoordinator,
    namespaces: Vec<String>,
    clusters: Vec<ClusterSummary>,
    picker: ClusterPicker,
    connecting: Option<String>,
    preferred_cluster: Option<String>,
    preferred_namespace: Option<String>,
    lifecycle: LifecycleStore,
    upgrades: HashMap<String, UpgradeStatus>,
    palette: CommandPalette,
    show_help: bool,
    editing_filter: bool,
    pending_delete: Option<PendingAction>,
    scale_prompt: Option<ScalePrompt>,
    scale_down: Option<ScaleDownConfirm>,
    viewer: ModalState,
    viewer_token: Option<u64>,
    viewer_scroll: u16,
    next_token: u64,
    notice: Option<Notice>,
    table_page_size: usize,
    running: bool,
}

impl App {
    pub fn new(
        catalog: Catalog,
        preferred_cluster: Option<String>,
        preferred_namespace: Option<String>,
    ) -> Self {
        Self {
            catalog,
            focus: FocusState::new(catalog.first()),
            fetch: FetchCoordinator::default(),
            namespaces: Vec::new(),
            clusters: Vec::new(),
            picker: ClusterPicker::default(),
            connecting: None,
            preferred_cluster,
            preferred_namespace,
            lifecycle: LifecycleStore::default(),
            upgrades: HashMap::new(),
            palette: CommandPalette::default(),
            show_help: false,
            editing_filter: false,
            pending_delete: None,
            scale_prompt: None,
            scale_down: None,
            viewer: ModalState::Closed,
            viewer_token: None,
            viewer_scroll: 0,
            next_token: 0,
            notice: None,
            table_page_size: 10,
            running: true,
        }
    }

    /// Opens the cluster picker and asks for the cluster list.
    pub fn start(&mut self) -> AppCommand {
        self.picker.open = true;
        self.picker.loading = true;
        self.set_notice(NoticeLevel::Info, "Loading clusters…");
        AppCommand::LoadClusters
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        if self.pending_delete.is_some() {
            InputMode::ConfirmDelete
        } else if self.scale_down.is_some() {
            InputMode::ScaleDownConfirm
        } else if self.scale_prompt.is_some() {
            InputMode::ScalePrompt
        } else if self.viewer.is_open() {
            InputMode::Viewer
        } else if self.palette.is_open() {
            InputMode::Palette
        } else if self.picker.open {
            InputMode::ClusterPicker
        } else if self.editing_filter {
            InputMode::Filter
        } else {
            InputMode::Normal
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    pub fn clusters(&self) -> &[ClusterSummary] {
        &self.clusters
    }

    pub fn cluster_picker_loading(&self) -> bool {
        self.picker.loading
    }

    pub fn cluster_picker_error(&self) -> Option<&str> {
        self.picker.error.as_deref()
    }

    pub fn cluster_picker_selected(&self) -> usize {
        self.picker.selected
    }

    pub fn connecting(&self) -> Option<&str> {
        self.connecting.as_deref()
    }

    pub fn palette(&self) -> &CommandPalette {
        &self.palette
    }

    pub fn palette_candidates(&self) -> Vec<PaletteCandidate> {
        self.palette.candidates(&self.catalog, &self.namespaces)
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_delete(&self) -> Option<&PendingAction> {
        self.pending_delete.as_ref()
    }

    pub fn scale_prompt(&self) -> Option<&ScalePrompt> {
        self.scale_prompt.as_ref()
    }

    pub fn scale_down(&self) -> Option<&ScaleDownConfirm> {
        self.scale_down.as_ref()
    }

    pub fn viewer(&self) -> &ModalState {
        &self.viewer
    }

    pub fn viewer_scroll(&self) -> u16 {
        self.viewer_scroll
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn lifecycle(&self) -> Option<&LifecycleState> {
        self.focus
            .cluster
            .as_deref()
            .and_then(|cluster| self.lifecycle.get(cluster))
    }

    pub fn upgrade(&self) -> Option<&UpgradeStatus> {
        self.focus
            .cluster
            .as_deref()
            .and_then(|cluster| self.upgrades.get(cluster))
    }

    pub fn focused_key(&self) -> Option<FetchKey> {
        self.focus
            .cluster
            .as_deref()
            .map(|cluster| FetchKey::new(cluster, self.focus.kind.key))
    }

    pub fn is_loading(&self) -> bool {
        self.focused_key()
            .is_some_and(|key| self.fetch.is_loading(&key))
    }

    pub fn focused_table(&self) -> Option<&TableData> {
        self.focused_key().and_then(|key| self.fetch.table(&key))
    }

    pub fn visible_rows(&self) -> Vec<&ResourceRow> {
        self.focused_table()
            .map(|table| {
                visible_rows(
                    &table.rows,
                    self.focus.kind,
                    &self.focus.namespace,
                    &self.focus.filter,
                )
            })
            .unwrap_or_default()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let len = self.visible_rows().len();
        if len == 0 {
            return None;
        }
        self.focused_table()
            .map(|table| table.selected.min(len.saturating_sub(1)))
    }

    pub fn selected_row(&self) -> Option<&ResourceRow> {
        let index = self.selected_index()?;
        self.visible_rows().get(index).copied()
    }

    pub fn set_table_page_size(&mut self, rows: usize) {
        self.table_page_size = rows.max(1);
    }

    pub fn set_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            message: normalize_status_text(message.into()),
        });
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if action == Action::Quit {
            self.running = false;
            return AppCommand::None;
        }

        match self.mode() {
            InputMode::ConfirmDelete => self.apply_delete_confirmation(action),
            InputMode::ScaleDownConfirm => self.apply_scale_down_input(action),
            InputMode::ScalePrompt => self.apply_scale_prompt(action),
            InputMode::Viewer => self.apply_viewer(action),
            InputMode::Palette => self.apply_palette(action),
            InputMode::ClusterPicker => self.apply_cluster_picker(action),
            InputMode::Filter => self.apply_filter(action),
            InputMode::Normal => self.apply_normal(action),
        }
    }

    fn apply_normal(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp | Action::ClearOverlays) {
            self.show_help = false;
            return AppCommand::None;
        }

        match action {
            Action::OpenPalette => {
                self.palette.open();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::FocusFilter => {
                self.editing_filter = true;
                AppCommand::None
            }
            Action::Refresh => self.refresh_focused(),
            Action::ClearOverlays => {
                self.palette.close();
                self.show_help = false;
                self.focus.filter.clear();
                self.clamp_selection();
                AppCommand::None
            }
            Action::SelectKind(key) => {
                if self.focus.cluster.is_none() {
                    return AppCommand::None;
                }
                let Some(kind) = self.catalog.by_key(key) else {
                    return AppCommand::None;
                };
                self.focus.kind = kind;
                self.refresh_focused()
            }
            Action::Down => self.move_selection(1),
            Action::Up => self.move_selection(-1),
            Action::PageDown => self.move_selection(self.page_step()),
            Action::PageUp => self.move_selection(-self.page_step()),
            Action::Top => self.move_selection(isize::MIN),
            Action::Bottom => self.move_selection(isize::MAX),
            Action::Row(action) => self.start_row_action(action),
            Action::OpenClusterPicker => {
                self.picker.open = true;
                self.picker.loading = true;
                AppCommand::LoadClusters
            }
            Action::ScaleUpCluster => {
                let Some(cluster) = self.focus.cluster.clone() else {
                    self.set_notice(NoticeLevel::Info, "Select a cluster first");
                    return AppCommand::None;
                };
                self.set_notice(NoticeLevel::Info, format!("Requesting scale-up of {cluster}…"));
                AppCommand::ScaleCluster {
                    cluster,
                    direction: ScaleDirection::Up,
                }
            }
            Action::StartScaleDown => {
                let Some(cluster) = self.focus.cluster.clone() else {
                    self.set_notice(NoticeLevel::Info, "Select a cluster first");
                    return AppCommand::None;
                };
                if self
                    .lifecycle
                    .get(&cluster)
                    .is_some_and(|state| !state.can_scale_down())
                {
                    self.set_notice(
                        NoticeLevel::Info,
                        format!("{cluster} already has 0 desired nodes"),
                    );
                    return AppCommand::None;
                }
                self.scale_down = Some(ScaleDownConfirm::new(cluster));
                AppCommand::None
            }
            Action::RefreshLifecycle => match self.focus.cluster.clone() {
                Some(cluster) => AppCommand::PollScaling { cluster },
                None => AppCommand::None,
            },
            _ => AppCommand::None,
        }
    }

    fn apply_filter(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.focus.filter.push(c);
                self.clamp_selection();
            }
            Action::Backspace => {
                self.focus.filter.pop();
                self.clamp_selection();
            }
            Action::SubmitInput | Action::CancelInput => self.editing_filter = false,
            _ => {}
        }
        AppCommand::None
    }

    fn apply_palette(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => self.palette.push(c),
            Action::Backspace => self.palette.backspace(),
            Action::CancelInput => self.palette.close(),
            Action::SubmitInput => {
                let Some(candidate) = self.palette.resolve(&self.catalog, &self.namespaces)
                else {
                    self.set_notice(
                        NoticeLevel::Info,
                        format!("No match for '{}'", self.palette.query()),
                    );
                    return AppCommand::None;
                };
                self.palette.close();
                return self.commit_candidate(candidate);
            }
            _ => {}
        }
        AppCommand::None
    }

    fn commit_candidate(&mut self, candidate: PaletteCandidate) -> AppCommand {
        match candidate {
            PaletteCandidate::Kind(kind) => {
                self.focus.kind = kind;
                self.refresh_focused()
            }
            PaletteCandidate::Namespace(namespace) => {
                self.set_notice(
                    NoticeLevel::Info,
                    format!("Namespace: {}", namespace.label()),
                );
                self.focus.namespace = namespace;
                self.clamp_selection();
                AppCommand::None
            }
        }
    }

    fn apply_cluster_picker(&mut self, action: Action) -> AppCommand {
        let len = self.clusters.len();
        let step = self.page_step();
        match action {
            Action::Down => self.move_picker(1, len),
            Action::Up => self.move_picker(-1, len),
            Action::PageDown => self.move_picker(step, len),
            Action::PageUp => self.move_picker(-step, len),
            Action::Top => self.picker.selected = 0,
            Action::Bottom => self.picker.selected = len.saturating_sub(1),
            Action::Refresh => {
                self.picker.loading = true;
                return AppCommand::LoadClusters;
            }
            Action::CancelInput => self.picker.open = false,
            Action::SubmitInput => {
                let Some(cluster) = self.clusters.get(self.picker.selected) else {
                    return AppCommand::None;
                };
                if let Some(error) = &cluster.error {
                    let message = format!("{} is unavailable: {error}", cluster.name);
                    self.set_notice(NoticeLevel::Error, message);
                    return AppCommand::None;
                }
                let cluster = cluster.name.clone();
                self.picker.open = false;
                return self.connect(cluster);
            }
            _ => {}
        }
        AppCommand::None
    }

    fn connect(&mut self, cluster: String) -> AppCommand {
        self.set_notice(NoticeLevel::Info, format!("Connecting to {cluster}…"));
        self.connecting = Some(cluster.clone());
        AppCommand::Connect { cluster }
    }

    fn apply_delete_confirmation(&mut self, action: Action) -> AppCommand {
        let Some(pending) = self.pending_delete.take() else {
            return AppCommand::None;
        };
        match action {
            Action::ConfirmYes => self.issue_action(pending.request),
            Action::ConfirmNo => {
                self.set_notice(NoticeLevel::Info, "Delete cancelled");
                AppCommand::None
            }
            _ => {
                self.pending_delete = Some(pending);
                AppCommand::None
            }
        }
    }

    fn apply_scale_prompt(&mut self, action: Action) -> AppCommand {
        let Some(prompt) = self.scale_prompt.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::InputChar(c) => prompt.input.push(c),
            Action::Backspace => {
                prompt.input.pop();
            }
            Action::CancelInput => self.scale_prompt = None,
            Action::SubmitInput => match parse_replicas(&prompt.input) {
                Ok(replicas) => {
                    let target = prompt.target.clone();
                    self.scale_prompt = None;
                    return self.issue_action(ActionRequest::Scale { target, replicas });
                }
                Err(message) => self.set_notice(NoticeLevel::Error, message),
            },
            _ => {}
        }
        AppCommand::None
    }

    fn apply_scale_down_input(&mut self, action: Action) -> AppCommand {
        let Some(confirm) = self.scale_down.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::InputChar(c) => confirm.input.push(c),
            Action::Backspace => {
                confirm.input.pop();
            }
            Action::CancelInput => self.scale_down = None,
            Action::SubmitInput => {
                if !confirm.is_armed() {
                    self.set_notice(
                        NoticeLevel::Info,
                        "Type the exact cluster name to confirm scale-down",
                    );
                    return AppCommand::None;
                }
                let cluster = confirm.cluster_to_stop.clone();
                self.scale_down = None;
                if self
                    .lifecycle
                    .get(&cluster)
                    .is_some_and(|state| !state.can_scale_down())
                {
                    self.set_notice(
                        NoticeLevel::Info,
                        format!("{cluster} already has 0 desired nodes"),
                    );
                    return AppCommand::None;
                }
                let message = format!("Requesting scale-down of {cluster}…");
                self.set_notice(NoticeLevel::Info, message);
                return AppCommand::ScaleCluster {
                    cluster,
                    direction: ScaleDirection::Down,
                };
            }
            _ => {}
        }
        AppCommand::None
    }

    fn apply_viewer(&mut self, action: Action) -> AppCommand {
        let step = self.page_step().unsigned_abs().min(u16::MAX as usize) as u16;
        match action {
            Action::CancelInput => {
                self.viewer = ModalState::Closed;
                self.viewer_token = None;
                self.viewer_scroll = 0;
            }
            Action::Down => self.viewer_scroll = self.viewer_scroll.saturating_add(1),
            Action::Up => self.viewer_scroll = self.viewer_scroll.saturating_sub(1),
            Action::PageDown => self.viewer_scroll = self.viewer_scroll.saturating_add(step),
            Action::PageUp => self.viewer_scroll = self.viewer_scroll.saturating_sub(step),
            Action::Top => self.viewer_scroll = 0,
            Action::Bottom => self.viewer_scroll = self.viewer_max_scroll(),
            _ => {}
        }
        AppCommand::None
    }

    fn viewer_max_scroll(&self) -> u16 {
        match &self.viewer {
            ModalState::Loaded { content, .. } => {
                content.lines().count().saturating_sub(1).min(u16::MAX as usize) as u16
            }
            _ => 0,
        }
    }

    fn start_row_action(&mut self, action: RowAction) -> AppCommand {
        let row = self.selected_row().cloned();
        match prepare(&self.focus, row.as_ref(), action) {
            Preparation::Refused(message) => {
                self.set_notice(NoticeLevel::Info, message);
                AppCommand::None
            }
            Preparation::Confirm(pending) => {
                self.pending_delete = Some(pending);
                AppCommand::None
            }
            Preparation::PromptReplicas(target) => {
                self.scale_prompt = Some(ScalePrompt {
                    target,
                    input: "1".to_string(),
                });
                AppCommand::None
            }
            Preparation::Issue(request) => self.issue_action(request),
        }
    }

    fn issue_action(&mut self, request: ActionRequest) -> AppCommand {
        self.next_token += 1;
        let token = self.next_token;
        if request.is_mutating() {
            self.set_notice(NoticeLevel::Info, format!("{}…", request.title()));
        } else {
            self.viewer = ModalState::Loading {
                title: request.title(),
            };
            self.viewer_token = Some(token);
            self.viewer_scroll = 0;
        }
        AppCommand::RunAction { token, request }
    }

    fn refresh_focused(&mut self) -> AppCommand {
        let Some(key) = self.focused_key() else {
            return AppCommand::None;
        };
        AppCommand::FetchList {
            ticket: self.fetch.issue(key),
            kind: self.focus.kind,
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::Clusters(result) => self.apply_clusters(result),
            AppEvent::Connected { cluster, result } => self.apply_connected(cluster, result),
            AppEvent::Namespaces { cluster, result } => {
                if self.focus.cluster.as_deref() != Some(cluster.as_str()) {
                    return AppCommand::None;
                }
                match result {
                    Ok(mut namespaces) => {
                        namespaces.sort();
                        self.namespaces = namespaces;
                    }
                    Err(error) => {
                        warn!(%cluster, error = %error, "namespace list failed");
                        self.set_notice(NoticeLevel::Error, error.user_message());
                    }
                }
                AppCommand::None
            }
            AppEvent::Listed { ticket, result } => {
                self.apply_listed(ticket, result);
                AppCommand::None
            }
            AppEvent::ActionDone {
                token,
                request,
                result,
            } => self.apply_action_done(token, request, result),
            AppEvent::ScaleAccepted {
                cluster,
                direction,
                result,
            } => match result {
                Ok(message) => {
                    let state = self.lifecycle.get_or_create(&cluster);
                    match direction {
                        ScaleDirection::Down => state.scale_down_accepted(),
                        ScaleDirection::Up => state.scale_up_accepted(),
                    }
                    self.set_notice(NoticeLevel::Success, message);
                    AppCommand::WatchScaling { cluster, direction }
                }
                Err(error) => {
                    self.set_notice(NoticeLevel::Error, error.user_message());
                    AppCommand::None
                }
            },
            AppEvent::ScalingStatus { cluster, result } => {
                let state = self.lifecycle.get_or_create(&cluster);
                match result {
                    Ok(report) => state.apply_report(report, Local::now()),
                    Err(error) => state.poll_failed(&error.user_message()),
                }
                AppCommand::None
            }
            AppEvent::UpgradeStatus { cluster, result } => {
                match result {
                    Ok(status) => {
                        self.upgrades.insert(cluster, status);
                    }
                    Err(error) => warn!(%cluster, error = %error, "upgrade status failed"),
                }
                AppCommand::None
            }
        }
    }

    fn apply_clusters(&mut self, result: Result<Vec<ClusterSummary>, ApiError>) -> AppCommand {
        self.picker.loading = false;
        match result {
            Ok(clusters) => {
                self.picker.error = None;
                self.clusters = clusters;
                self.picker.selected = self
                    .picker
                    .selected
                    .min(self.clusters.len().saturating_sub(1));
                if self.notice.as_ref().is_some_and(|notice| notice.level == NoticeLevel::Info) {
                    self.notice = None;
                }
            }
            Err(error) => {
                self.picker.error = Some(error.user_message());
                return AppCommand::None;
            }
        }

        let Some(preferred) = self.preferred_cluster.take() else {
            return AppCommand::None;
        };
        match self.clusters.iter().position(|cluster| cluster.name == preferred) {
            Some(index) => {
                self.picker.selected = index;
                self.picker.open = false;
                self.connect(preferred)
            }
            None => {
                self.set_notice(NoticeLevel::Error, format!("Cluster '{preferred}' not found"));
                AppCommand::None
            }
        }
    }

    fn apply_connected(&mut self, cluster: String, result: Result<String, ApiError>) -> AppCommand {
        if self.connecting.as_deref() != Some(cluster.as_str()) {
            debug!(%cluster, "connect answer for superseded cluster dropped");
            return AppCommand::None;
        }
        self.connecting = None;

        let message = match result {
            Ok(message) => message,
            Err(error) => {
                self.set_notice(NoticeLevel::Error, error.user_message());
                return AppCommand::None;
            }
        };

        info!(%cluster, "cluster connected");
        if let Some(previous) = self.focus.cluster.replace(cluster.clone())
            && previous != cluster
        {
            self.fetch.forget_cluster(&previous);
        }
        self.focus.namespace = self
            .preferred_namespace
            .take()
            .map(NamespaceFilter::Named)
            .unwrap_or(NamespaceFilter::All);
        self.namespaces.clear();
        self.lifecycle.get_or_create(&cluster);
        self.set_notice(NoticeLevel::Success, message);

        AppCommand::Batch(vec![
            AppCommand::LoadNamespaces {
                cluster: cluster.clone(),
            },
            self.refresh_focused(),
            AppCommand::PollScaling {
                cluster: cluster.clone(),
            },
            AppCommand::LoadUpgradeStatus { cluster },
        ])
    }

    fn apply_listed(&mut self, ticket: ListTicket, result: Result<Vec<ResourceRow>, ApiError>) {
        let focused = self.focused_key().as_ref() == Some(&ticket.key);
        let identity = if focused {
            self.selected_row().map(ResourceRow::identity)
        } else {
            None
        };

        let result = result.map_err(|error| error.user_message());
        if let Err(message) = &result {
            warn!(
                cluster = %ticket.key.cluster,
                kind = ticket.key.kind,
                error = %message,
                "list failed"
            );
        }
        if self.fetch.complete(&ticket, result, Local::now()) == Completion::Stale {
            return;
        }

        match identity {
            Some(identity) => self.select_by_identity(identity),
            None => self.clamp_selection(),
        }
    }

    fn apply_action_done(
        &mut self,
        token: u64,
        request: ActionRequest,
        result: Result<ActionReply, ApiError>,
    ) -> AppCommand {
        if !request.is_mutating() {
            if self.viewer_token != Some(token) || !self.viewer.is_open() {
                debug!(token, "late viewer content dropped");
                return AppCommand::None;
            }
            let title = request.title();
            self.viewer = match result {
                Ok(ActionReply::Content(content)) => ModalState::Loaded { title, content },
                Ok(ActionReply::Done(_)) => ModalState::Loaded {
                    title,
                    content: String::new(),
                },
                Err(error) => ModalState::Failed {
                    title,
                    message: error.user_message(),
                },
            };
            return AppCommand::None;
        }

        match result {
            Ok(reply) => {
                let detail = match &reply {
                    ActionReply::Done(detail) => detail.as_deref(),
                    ActionReply::Content(_) => None,
                };
                info!(action = %request.title(), "row action succeeded");
                self.set_notice(NoticeLevel::Success, request.success_message(detail));
                self.refresh_focused()
            }
            Err(error) => {
                warn!(action = %request.title(), error = %error, "row action failed");
                self.set_notice(NoticeLevel::Error, error.user_message());
                AppCommand::None
            }
        }
    }

    fn focused_table_mut(&mut self) -> Option<&mut TableData> {
        let key = self.focused_key()?;
        self.fetch.table_mut(&key)
    }

    fn move_selection(&mut self, delta: isize) -> AppCommand {
        let visible_len = self.visible_rows().len();
        let Some(table) = self.focused_table_mut() else {
            return AppCommand::None;
        };
        if visible_len == 0 {
            table.selected = 0;
            return AppCommand::None;
        }

        let max_index = visible_len.saturating_sub(1) as isize;
        let current = table.selected.min(max_index as usize) as isize;
        table.selected = current.saturating_add(delta).clamp(0, max_index) as usize;
        AppCommand::None
    }

    fn move_picker(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.picker.selected = 0;
            return;
        }
        let max_index = len.saturating_sub(1) as isize;
        let current = self.picker.selected.min(max_index as usize) as isize;
        self.picker.selected = current.saturating_add(delta).clamp(0, max_index) as usize;
    }

    fn clamp_selection(&mut self) {
        let visible_len = self.visible_rows().len();
        if let Some(table) = self.focused_table_mut() {
            table.selected = table.selected.min(visible_len.saturating_sub(1));
        }
    }

    fn select_by_identity(&mut self, identity: (Option<String>, Option<String>)) {
        let position = self
            .visible_rows()
            .iter()
            .position(|row| row.identity() == identity);
        match position {
            Some(index) => {
                if let Some(table) = self.focused_table_mut() {
                    table.selected = index;
                }
            }
            None => self.clamp_selection(),
        }
    }

    fn page_step(&self) -> isize {
        self.table_page_size.saturating_sub(1).max(1) as isize
    }
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
