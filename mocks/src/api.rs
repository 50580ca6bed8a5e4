//! In-memory implementation of the task management capability traits
//!
//! Provides a thread-safe fake API with:
//! - The server-side checks that matter to the resources (unknown ids,
//!   duplicate status names, dangling status references)
//! - Cursor pagination with a configurable page size
//! - Error injection per operation
//! - Read lag to simulate eventual consistency
//! - Call history tracking for verification

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use taskmgmt_core::{
    api::{FlowRuleApi, StatusApi, WorkbinApi, WorktypeApi},
    error::{Result, TaskMgmtError, TRANSACTION_CANCELLED},
    models::{
        EntityRef, Page, QueryRequest, SchemaRef, StatusCategory, StatusCreate, StatusUpdate,
        Workbin, WorkbinCreate, WorkbinUpdate, WorkitemStatus, Worktype, WorktypeCreate,
        WorktypeUpdate,
    },
    paging::MAX_PAGE_SIZE,
    rules::FlowRuleKind,
};

/// Page size the API uses when a query does not ask for one
const DEFAULT_PAGE_SIZE: u32 = 25;

type RuleKey = (&'static str, String, String);

#[derive(Default)]
struct State {
    workbins: BTreeMap<String, Workbin>,
    worktypes: BTreeMap<String, Worktype>,
    /// Rules are stored as their JSON bodies so every rule kind shares one table
    rules: BTreeMap<RuleKey, Value>,
    /// Reads that still miss a freshly created entity
    pending_reads: HashMap<String, u32>,
}

impl State {
    fn worktype(&self, id: &str) -> Result<&Worktype> {
        self.worktypes
            .get(id)
            .ok_or_else(|| TaskMgmtError::not_found("worktype", id))
    }

    fn worktype_mut(&mut self, id: &str) -> Result<&mut Worktype> {
        self.worktypes
            .get_mut(id)
            .ok_or_else(|| TaskMgmtError::not_found("worktype", id))
    }

    /// Whether this read should still miss `id`
    fn lagging(&mut self, id: &str) -> bool {
        match self.pending_reads.get_mut(id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

/// An error waiting for its call
struct Injected {
    /// Calls that still succeed before this error fires
    skip: usize,
    error: TaskMgmtError,
}

/// Mock implementation of every task management capability
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand another to the proxies.
#[derive(Clone)]
pub struct MockTaskManagementApi {
    state: Arc<Mutex<State>>,
    next_id: Arc<AtomicU64>,
    max_page_size: Arc<AtomicU32>,
    read_lag: Arc<AtomicU32>,
    error_injection: Arc<Mutex<HashMap<String, VecDeque<Injected>>>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl Default for MockTaskManagementApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTaskManagementApi {
    /// Create a new empty mock API
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            max_page_size: Arc::new(AtomicU32::new(MAX_PAGE_SIZE)),
            read_lag: Arc::new(AtomicU32::new(0)),
            error_injection: Arc::new(Mutex::new(HashMap::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Cap every served page at `size` entities
    pub fn with_max_page_size(self, size: u32) -> Self {
        self.max_page_size.store(size.max(1), Ordering::SeqCst);
        self
    }

    /// Entities created from now on are invisible to the next `reads` gets
    pub fn set_read_lag(&self, reads: u32) {
        self.read_lag.store(reads, Ordering::SeqCst);
    }

    /// Seed a workbin as if it had been created earlier
    pub fn insert_workbin(&self, workbin: Workbin) {
        self.state.lock().workbins.insert(workbin.id.clone(), workbin);
    }

    /// Seed a worktype, statuses included
    pub fn insert_worktype(&self, worktype: Worktype) {
        self.state.lock().worktypes.insert(worktype.id.clone(), worktype);
    }

    /// Fail the next call of `operation` with `error`
    ///
    /// Errors queue up; injecting twice fails the next two calls.
    pub fn inject_error(&self, operation: &str, error: TaskMgmtError) {
        self.fail_after(operation, 0, error);
    }

    /// Let `successes` calls of `operation` through, then fail one with `error`
    pub fn fail_after(&self, operation: &str, successes: usize, error: TaskMgmtError) {
        self.error_injection
            .lock()
            .entry(operation.to_string())
            .or_default()
            .push_back(Injected {
                skip: successes,
                error,
            });
    }

    /// Reject the next `times` status updates with a cancelled transaction
    pub fn cancel_status_updates(&self, times: usize) {
        for _ in 0..times {
            self.inject_error("update_status", TaskMgmtError::api(400, TRANSACTION_CANCELLED));
        }
    }

    /// Clear every injected error
    pub fn clear_errors(&self) {
        self.error_injection.lock().clear();
    }

    /// Get history of called methods
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    /// Clear call history
    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        let prefix = format!("{operation}(");
        self.call_history
            .lock()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    /// Assert method was called
    pub fn assert_called(&self, operation: &str) {
        let history = self.call_history.lock();
        let prefix = format!("{operation}(");
        assert!(
            history.iter().any(|call| call.starts_with(&prefix)),
            "Method '{}' was not called. Call history: {:?}",
            operation,
            *history
        );
    }

    /// Assert method was never called
    pub fn assert_not_called(&self, operation: &str) {
        assert_eq!(
            self.call_count(operation),
            0,
            "Method '{}' was called. Call history: {:?}",
            operation,
            self.call_history()
        );
    }

    /// Server-side view of a worktype with its statuses
    pub fn worktype_snapshot(&self, id: &str) -> Option<Worktype> {
        self.state.lock().worktypes.get(id).cloned()
    }

    pub fn workbin_count(&self) -> usize {
        self.state.lock().workbins.len()
    }

    pub fn worktype_count(&self) -> usize {
        self.state.lock().worktypes.len()
    }

    /// Stored rules of one kind across all worktypes
    pub fn rule_count<K: FlowRuleKind>(&self) -> usize {
        self.state
            .lock()
            .rules
            .keys()
            .filter(|(kind, _, _)| *kind == K::PATH_SEGMENT)
            .count()
    }

    fn enter(&self, operation: &str, args: &str) -> Result<()> {
        self.call_history.lock().push(format!("{operation}({args})"));
        let mut injected = self.error_injection.lock();
        let Some(queue) = injected.get_mut(operation) else {
            return Ok(());
        };
        match queue.front_mut() {
            None => return Ok(()),
            Some(next) if next.skip > 0 => {
                next.skip -= 1;
                return Ok(());
            }
            Some(_) => {}
        }
        queue.pop_front().map_or(Ok(()), |next| Err(next.error))
    }

    fn new_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{n:06}")
    }

    fn track_created(&self, state: &mut State, id: &str) {
        let lag = self.read_lag.load(Ordering::SeqCst);
        if lag > 0 {
            state.pending_reads.insert(id.to_string(), lag);
        }
    }

    fn page_size(&self, requested: u32) -> usize {
        let requested = if requested == 0 { DEFAULT_PAGE_SIZE } else { requested };
        requested.min(self.max_page_size.load(Ordering::SeqCst)) as usize
    }
}

fn bad_request(message: impl Into<String>) -> TaskMgmtError {
    TaskMgmtError::api(400, message)
}

/// Slice a listing sorted by id after the `after` cursor.
///
/// The cursor is the id of the last entity of the previous page and is only
/// returned while more entities remain.
fn paginate<T: Clone>(items: Vec<(&String, &T)>, after: Option<&str>, size: usize) -> Page<T> {
    let remaining: Vec<_> = items
        .into_iter()
        .filter(|(id, _)| after.map_or(true, |cursor| id.as_str() > cursor))
        .collect();

    let more = remaining.len() > size;
    let page: Vec<_> = remaining.into_iter().take(size).collect();
    let after = if more {
        page.last().map(|(id, _)| (*id).clone())
    } else {
        None
    };

    Page {
        entities: page.into_iter().map(|(_, item)| item.clone()).collect(),
        after,
    }
}

fn matches_filters(name: &str, query: &QueryRequest) -> bool {
    query
        .filters
        .iter()
        .filter(|f| f.name == "name" && f.operator == "EQ")
        .all(|f| f.values.iter().any(|v| v == name))
}

fn check_references(statuses: &[WorkitemStatus], ids: &[String], default_id: Option<&str>) -> Result<()> {
    for id in ids.iter().map(String::as_str).chain(default_id) {
        if !statuses.iter().any(|s| s.id == id) {
            return Err(bad_request(format!("Destination status {id} does not exist in this worktype")));
        }
    }
    Ok(())
}

#[async_trait]
impl WorkbinApi for MockTaskManagementApi {
    async fn create_workbin(&self, workbin: WorkbinCreate) -> Result<Workbin> {
        self.enter("create_workbin", &workbin.name)?;
        if workbin.name.trim().is_empty() {
            return Err(bad_request("Workbin name is required"));
        }

        let now = Utc::now();
        let created = Workbin {
            id: self.new_id("wb"),
            name: workbin.name,
            description: workbin.description,
            division: workbin.division_id.map(EntityRef::new),
            date_created: Some(now),
            date_modified: Some(now),
        };

        let mut state = self.state.lock();
        self.track_created(&mut state, &created.id);
        state.workbins.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn query_workbins(&self, query: QueryRequest) -> Result<Page<Workbin>> {
        self.enter("query_workbins", query.after.as_deref().unwrap_or(""))?;
        let size = self.page_size(query.page_size);
        let state = self.state.lock();
        let items = state
            .workbins
            .iter()
            .filter(|(_, wb)| matches_filters(&wb.name, &query))
            .collect();
        Ok(paginate(items, query.after.as_deref(), size))
    }

    async fn get_workbin(&self, id: &str) -> Result<Workbin> {
        self.enter("get_workbin", id)?;
        let mut state = self.state.lock();
        if state.lagging(id) {
            return Err(TaskMgmtError::not_found("workbin", id));
        }
        state
            .workbins
            .get(id)
            .cloned()
            .ok_or_else(|| TaskMgmtError::not_found("workbin", id))
    }

    async fn update_workbin(&self, id: &str, update: WorkbinUpdate) -> Result<Workbin> {
        self.enter("update_workbin", id)?;
        if update.is_empty() {
            return Err(bad_request("Update must change at least one field"));
        }

        let mut state = self.state.lock();
        let workbin = state
            .workbins
            .get_mut(id)
            .ok_or_else(|| TaskMgmtError::not_found("workbin", id))?;
        if let Some(name) = update.name {
            workbin.name = name;
        }
        if let Some(description) = update.description {
            workbin.description = Some(description);
        }
        workbin.date_modified = Some(Utc::now());
        Ok(workbin.clone())
    }

    async fn delete_workbin(&self, id: &str) -> Result<()> {
        self.enter("delete_workbin", id)?;
        let mut state = self.state.lock();
        if !state.workbins.contains_key(id) {
            return Err(TaskMgmtError::not_found("workbin", id));
        }
        let in_use = state
            .worktypes
            .values()
            .any(|wt| wt.default_workbin.as_ref().is_some_and(|wb| wb.id == id));
        if in_use {
            return Err(bad_request(format!("Workbin {id} is the default workbin of a worktype")));
        }
        state.workbins.remove(id);
        Ok(())
    }
}

#[async_trait]
impl WorktypeApi for MockTaskManagementApi {
    async fn create_worktype(&self, worktype: WorktypeCreate) -> Result<Worktype> {
        self.enter("create_worktype", &worktype.name)?;
        if worktype.name.trim().is_empty() {
            return Err(bad_request("Worktype name is required"));
        }

        let mut state = self.state.lock();
        if !state.workbins.contains_key(&worktype.default_workbin_id) {
            return Err(bad_request(format!(
                "Workbin {} does not exist",
                worktype.default_workbin_id
            )));
        }

        let now = Utc::now();
        let id = self.new_id("wt");
        let mut created = Worktype {
            id: id.clone(),
            name: worktype.name,
            description: worktype.description,
            division: worktype.division_id.map(EntityRef::new),
            default_workbin: Some(EntityRef::new(worktype.default_workbin_id)),
            default_status: None,
            statuses: Vec::new(),
            default_duration_seconds: worktype.default_duration_seconds,
            default_expiration_seconds: worktype.default_expiration_seconds,
            default_due_duration_seconds: worktype.default_due_duration_seconds,
            default_priority: worktype.default_priority,
            default_ttl_seconds: worktype.default_ttl_seconds,
            default_language: worktype.default_language_id.map(EntityRef::new),
            default_queue: worktype.default_queue_id.map(EntityRef::new),
            default_skills: worktype.default_skill_ids.into_iter().map(EntityRef::new).collect(),
            assignment_enabled: worktype.assignment_enabled,
            schema: worktype.schema_id.map(|schema_id| SchemaRef {
                id: schema_id,
                version: worktype.schema_version,
            }),
            date_created: Some(now),
            date_modified: Some(now),
        };

        if !worktype.disable_default_status_creation {
            for (name, category) in [("Open", StatusCategory::Open), ("Closed", StatusCategory::Closed)] {
                created.statuses.push(WorkitemStatus {
                    id: self.new_id("st"),
                    name: name.to_string(),
                    category,
                    description: None,
                    destination_statuses: Vec::new(),
                    default_destination_status: None,
                    status_transition_delay_seconds: None,
                    status_transition_time: None,
                    worktype: Some(EntityRef::new(id.clone())),
                });
            }
            created.default_status = created.statuses.first().map(|s| EntityRef::new(s.id.clone()));
        }

        self.track_created(&mut state, &id);
        state.worktypes.insert(id, created.clone());
        Ok(created)
    }

    async fn query_worktypes(&self, query: QueryRequest) -> Result<Page<Worktype>> {
        self.enter("query_worktypes", query.after.as_deref().unwrap_or(""))?;
        let size = self.page_size(query.page_size);
        let state = self.state.lock();
        let items = state
            .worktypes
            .iter()
            .filter(|(_, wt)| matches_filters(&wt.name, &query))
            .collect();
        let mut page = paginate(items, query.after.as_deref(), size);
        for worktype in &mut page.entities {
            worktype.statuses.clear();
        }
        Ok(page)
    }

    /// Statuses are left out of the body; list them separately
    async fn get_worktype(&self, id: &str) -> Result<Worktype> {
        self.enter("get_worktype", id)?;
        let mut state = self.state.lock();
        if state.lagging(id) {
            return Err(TaskMgmtError::not_found("worktype", id));
        }
        let mut worktype = state.worktype(id)?.clone();
        worktype.statuses.clear();
        Ok(worktype)
    }

    async fn update_worktype(&self, id: &str, update: WorktypeUpdate) -> Result<Worktype> {
        self.enter("update_worktype", id)?;
        if update.is_empty() {
            return Err(bad_request("Update must change at least one field"));
        }

        let mut state = self.state.lock();
        if let Some(workbin_id) = &update.default_workbin_id {
            if !state.workbins.contains_key(workbin_id) {
                return Err(bad_request(format!("Workbin {workbin_id} does not exist")));
            }
        }

        let worktype = state.worktype_mut(id)?;
        if let Some(status_id) = &update.default_status_id {
            if !worktype.statuses.iter().any(|s| &s.id == status_id) {
                return Err(bad_request(format!("Status {status_id} does not exist in this worktype")));
            }
            worktype.default_status = Some(EntityRef::new(status_id.clone()));
        }
        if let Some(name) = update.name {
            worktype.name = name;
        }
        if let Some(description) = update.description {
            worktype.description = Some(description);
        }
        if let Some(workbin_id) = update.default_workbin_id {
            worktype.default_workbin = Some(EntityRef::new(workbin_id));
        }
        if let Some(schema_id) = update.schema_id {
            worktype.schema = Some(SchemaRef {
                id: schema_id,
                version: update.schema_version,
            });
        }
        if update.default_priority.is_some() {
            worktype.default_priority = update.default_priority;
        }
        if let Some(language_id) = update.default_language_id {
            worktype.default_language = Some(EntityRef::new(language_id));
        }
        if let Some(queue_id) = update.default_queue_id {
            worktype.default_queue = Some(EntityRef::new(queue_id));
        }
        if let Some(skill_ids) = update.default_skill_ids {
            worktype.default_skills = skill_ids.into_iter().map(EntityRef::new).collect();
        }
        if update.assignment_enabled.is_some() {
            worktype.assignment_enabled = update.assignment_enabled;
        }
        if update.default_duration_seconds.is_some() {
            worktype.default_duration_seconds = update.default_duration_seconds;
        }
        if update.default_expiration_seconds.is_some() {
            worktype.default_expiration_seconds = update.default_expiration_seconds;
        }
        if update.default_due_duration_seconds.is_some() {
            worktype.default_due_duration_seconds = update.default_due_duration_seconds;
        }
        if update.default_ttl_seconds.is_some() {
            worktype.default_ttl_seconds = update.default_ttl_seconds;
        }
        worktype.date_modified = Some(Utc::now());

        let mut updated = worktype.clone();
        updated.statuses.clear();
        Ok(updated)
    }

    async fn delete_worktype(&self, id: &str) -> Result<()> {
        self.enter("delete_worktype", id)?;
        let mut state = self.state.lock();
        if state.worktypes.remove(id).is_none() {
            return Err(TaskMgmtError::not_found("worktype", id));
        }
        state.rules.retain(|(_, worktype_id, _), _| worktype_id != id);
        Ok(())
    }
}

#[async_trait]
impl StatusApi for MockTaskManagementApi {
    async fn create_status(&self, worktype_id: &str, status: StatusCreate) -> Result<WorkitemStatus> {
        self.enter("create_status", &format!("{worktype_id}, {}", status.name))?;
        if status.name.trim().is_empty() {
            return Err(bad_request("Status name is required"));
        }

        let id = self.new_id("st");
        let mut state = self.state.lock();
        let worktype = state.worktype_mut(worktype_id)?;
        if worktype.statuses.iter().any(|s| s.name == status.name) {
            return Err(bad_request(format!("A status named {} already exists", status.name)));
        }
        check_references(
            &worktype.statuses,
            &status.destination_status_ids,
            status.default_destination_status_id.as_deref(),
        )?;

        let created = WorkitemStatus {
            id: id.clone(),
            name: status.name,
            category: status.category,
            description: status.description,
            destination_statuses: status
                .destination_status_ids
                .into_iter()
                .map(EntityRef::new)
                .collect(),
            default_destination_status: status.default_destination_status_id.map(EntityRef::new),
            status_transition_delay_seconds: status.status_transition_delay_seconds,
            status_transition_time: status.status_transition_time,
            worktype: Some(EntityRef {
                id: worktype_id.to_string(),
                name: Some(worktype.name.clone()),
            }),
        };
        worktype.statuses.push(created.clone());

        self.track_created(&mut state, &id);
        Ok(created)
    }

    async fn list_statuses(&self, worktype_id: &str) -> Result<Vec<WorkitemStatus>> {
        self.enter("list_statuses", worktype_id)?;
        let state = self.state.lock();
        Ok(state.worktype(worktype_id)?.statuses.clone())
    }

    async fn get_status(&self, worktype_id: &str, status_id: &str) -> Result<WorkitemStatus> {
        self.enter("get_status", &format!("{worktype_id}, {status_id}"))?;
        let mut state = self.state.lock();
        if state.lagging(status_id) {
            return Err(TaskMgmtError::not_found("status", status_id));
        }
        state
            .worktype(worktype_id)?
            .statuses
            .iter()
            .find(|s| s.id == status_id)
            .cloned()
            .ok_or_else(|| TaskMgmtError::not_found("status", status_id))
    }

    async fn update_status(
        &self,
        worktype_id: &str,
        status_id: &str,
        update: StatusUpdate,
    ) -> Result<WorkitemStatus> {
        self.enter("update_status", &format!("{worktype_id}, {status_id}"))?;
        if update.is_empty() {
            return Err(bad_request("Update must change at least one field"));
        }

        let mut state = self.state.lock();
        let worktype = state.worktype_mut(worktype_id)?;
        check_references(
            &worktype.statuses,
            update.destination_status_ids.as_deref().unwrap_or_default(),
            update.default_destination_status_id.as_ref().and_then(Option::as_deref),
        )?;
        if let Some(name) = &update.name {
            if worktype.statuses.iter().any(|s| &s.name == name && s.id != status_id) {
                return Err(bad_request(format!("A status named {name} already exists")));
            }
        }

        let status = worktype
            .statuses
            .iter_mut()
            .find(|s| s.id == status_id)
            .ok_or_else(|| TaskMgmtError::not_found("status", status_id))?;

        if let Some(name) = update.name {
            status.name = name;
        }
        if let Some(description) = update.description {
            status.description = description;
        }
        if let Some(ids) = update.destination_status_ids {
            status.destination_statuses = ids.into_iter().map(EntityRef::new).collect();
        }
        if let Some(id) = update.default_destination_status_id {
            status.default_destination_status = id.map(EntityRef::new);
        }
        if let Some(delay) = update.status_transition_delay_seconds {
            status.status_transition_delay_seconds = delay;
        }
        if let Some(time) = update.status_transition_time {
            status.status_transition_time = time;
        }
        Ok(status.clone())
    }

    /// Deleting a status drops every reference other statuses hold to it
    async fn delete_status(&self, worktype_id: &str, status_id: &str) -> Result<()> {
        self.enter("delete_status", &format!("{worktype_id}, {status_id}"))?;
        let mut state = self.state.lock();
        let worktype = state.worktype_mut(worktype_id)?;

        if worktype.default_status.as_ref().is_some_and(|s| s.id == status_id) {
            return Err(bad_request(format!("Status {status_id} is the default status of the worktype")));
        }
        let before = worktype.statuses.len();
        worktype.statuses.retain(|s| s.id != status_id);
        if worktype.statuses.len() == before {
            return Err(TaskMgmtError::not_found("status", status_id));
        }

        for status in &mut worktype.statuses {
            status.destination_statuses.retain(|d| d.id != status_id);
            if status.default_destination_status.as_ref().is_some_and(|d| d.id == status_id) {
                status.default_destination_status = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<K: FlowRuleKind> FlowRuleApi<K> for MockTaskManagementApi {
    async fn create_rule(&self, worktype_id: &str, rule: K::Create) -> Result<K::Rule> {
        self.enter(
            "create_rule",
            &format!("{}, {worktype_id}, {}", K::PATH_SEGMENT, K::create_name(&rule)),
        )?;

        let id = self.new_id("rule");
        let mut state = self.state.lock();
        let worktype_name = state.worktype(worktype_id)?.name.clone();

        let mut body = serde_json::to_value(&rule)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("id".to_string(), json!(id));
            fields.insert("worktype".to_string(), json!({"id": worktype_id, "name": worktype_name}));
        }
        let created: K::Rule = serde_json::from_value(body.clone())?;

        self.track_created(&mut state, &id);
        state
            .rules
            .insert((K::PATH_SEGMENT, worktype_id.to_string(), id), body);
        Ok(created)
    }

    async fn list_rules(
        &self,
        worktype_id: &str,
        after: Option<String>,
        page_size: u32,
    ) -> Result<Page<K::Rule>> {
        self.enter(
            "list_rules",
            &format!("{}, {worktype_id}, {}", K::PATH_SEGMENT, after.as_deref().unwrap_or("")),
        )?;
        let size = self.page_size(page_size);
        let state = self.state.lock();
        state.worktype(worktype_id)?;

        let items: Vec<(&String, &Value)> = state
            .rules
            .iter()
            .filter(|((kind, wt, _), _)| *kind == K::PATH_SEGMENT && wt == worktype_id)
            .map(|((_, _, id), body)| (id, body))
            .collect();
        let page = paginate(items, after.as_deref(), size);

        Ok(Page {
            entities: page
                .entities
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<_>, serde_json::Error>>()?,
            after: page.after,
        })
    }

    async fn get_rule(&self, worktype_id: &str, rule_id: &str) -> Result<K::Rule> {
        self.enter("get_rule", &format!("{}, {worktype_id}, {rule_id}", K::PATH_SEGMENT))?;
        let mut state = self.state.lock();
        if state.lagging(rule_id) {
            return Err(TaskMgmtError::not_found(K::DISPLAY, rule_id));
        }
        let body = state
            .rules
            .get(&(K::PATH_SEGMENT, worktype_id.to_string(), rule_id.to_string()))
            .cloned()
            .ok_or_else(|| TaskMgmtError::not_found(K::DISPLAY, rule_id))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Top-level fields present in the update replace the stored ones
    async fn update_rule(&self, worktype_id: &str, rule_id: &str, update: K::Update) -> Result<K::Rule> {
        self.enter("update_rule", &format!("{}, {worktype_id}, {rule_id}", K::PATH_SEGMENT))?;
        let patch = serde_json::to_value(&update)?;

        let mut state = self.state.lock();
        let body = state
            .rules
            .get_mut(&(K::PATH_SEGMENT, worktype_id.to_string(), rule_id.to_string()))
            .ok_or_else(|| TaskMgmtError::not_found(K::DISPLAY, rule_id))?;

        match (body, patch) {
            (Value::Object(stored), Value::Object(changes)) if !changes.is_empty() => {
                for (field, value) in changes {
                    stored.insert(field, value);
                }
                Ok(serde_json::from_value(Value::Object(stored.clone()))?)
            }
            _ => Err(bad_request("Update must change at least one field")),
        }
    }

    async fn delete_rule(&self, worktype_id: &str, rule_id: &str) -> Result<()> {
        self.enter("delete_rule", &format!("{}, {worktype_id}, {rule_id}", K::PATH_SEGMENT))?;
        self.state
            .lock()
            .rules
            .remove(&(K::PATH_SEGMENT, worktype_id.to_string(), rule_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| TaskMgmtError::not_found(K::DISPLAY, rule_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmgmt_core::rules::{DateBased, DateBasedCondition, DateBasedRuleCreate, DateBasedRuleUpdate};

    async fn seeded() -> (MockTaskManagementApi, String) {
        let api = MockTaskManagementApi::new();
        let workbin = api
            .create_workbin(WorkbinCreate {
                name: "Inbox".to_string(),
                description: None,
                division_id: None,
            })
            .await
            .unwrap();
        let worktype = api
            .create_worktype(WorktypeCreate {
                name: "Claims".to_string(),
                division_id: None,
                description: None,
                disable_default_status_creation: true,
                default_workbin_id: workbin.id,
                schema_id: None,
                schema_version: None,
                default_priority: None,
                default_language_id: None,
                default_queue_id: None,
                default_skill_ids: vec![],
                assignment_enabled: None,
                default_duration_seconds: None,
                default_expiration_seconds: None,
                default_due_duration_seconds: None,
                default_ttl_seconds: None,
            })
            .await
            .unwrap();
        (api, worktype.id)
    }

    fn status(name: &str) -> StatusCreate {
        StatusCreate {
            name: name.to_string(),
            category: StatusCategory::Open,
            description: None,
            destination_status_ids: vec![],
            default_destination_status_id: None,
            status_transition_delay_seconds: None,
            status_transition_time: None,
        }
    }

    #[test]
    fn test_paginate() {
        let ids: Vec<String> = (0..5).map(|i| format!("id-{i}")).collect();
        let items: Vec<(&String, &String)> = ids.iter().map(|id| (id, id)).collect();

        let first = paginate(items.clone(), None, 2);
        assert_eq!(first.entities, vec!["id-0", "id-1"]);
        assert_eq!(first.after.as_deref(), Some("id-1"));

        let last = paginate(items, Some("id-3"), 2);
        assert_eq!(last.entities, vec!["id-4"]);
        assert_eq!(last.after, None);
    }

    #[tokio::test]
    async fn test_status_references_must_exist() {
        let (api, wt) = seeded().await;

        let mut dangling = status("Approved");
        dangling.default_destination_status_id = Some("st-missing".to_string());
        let err = api.create_status(&wt, dangling).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let open = api.create_status(&wt, status("Open")).await.unwrap();
        let err = api.create_status(&wt, status("Open")).await.unwrap_err();
        assert_eq!(err.status_code(), 400, "duplicate names are rejected");

        let mut linked = status("Working");
        linked.destination_status_ids = vec![open.id.clone()];
        let working = api.create_status(&wt, linked).await.unwrap();
        assert_eq!(working.destination_ids().into_iter().collect::<Vec<_>>(), vec![open.id.as_str()]);
    }

    #[tokio::test]
    async fn test_delete_status_drops_references() {
        let (api, wt) = seeded().await;
        let open = api.create_status(&wt, status("Open")).await.unwrap();
        let mut closing = status("Closing");
        closing.destination_status_ids = vec![open.id.clone()];
        closing.default_destination_status_id = Some(open.id.clone());
        let closing = api.create_status(&wt, closing).await.unwrap();

        api.delete_status(&wt, &open.id).await.unwrap();

        let remaining = api.get_status(&wt, &closing.id).await.unwrap();
        assert!(remaining.destination_statuses.is_empty());
        assert_eq!(remaining.default_destination_id(), None);
    }

    #[tokio::test]
    async fn test_injected_errors_are_consumed_in_order() {
        let (api, wt) = seeded().await;
        let open = api.create_status(&wt, status("Open")).await.unwrap();
        api.cancel_status_updates(2);

        let update = StatusUpdate {
            description: Some(Some("first".to_string())),
            ..Default::default()
        };
        for _ in 0..2 {
            let err = api.update_status(&wt, &open.id, update.clone()).await.unwrap_err();
            assert!(err.is_retryable());
        }
        api.update_status(&wt, &open.id, update).await.unwrap();
        assert_eq!(api.call_count("update_status"), 3);
    }

    #[tokio::test]
    async fn test_read_lag() {
        let api = MockTaskManagementApi::new();
        api.set_read_lag(2);
        let workbin = api
            .create_workbin(WorkbinCreate {
                name: "Inbox".to_string(),
                description: None,
                division_id: None,
            })
            .await
            .unwrap();

        assert!(api.get_workbin(&workbin.id).await.unwrap_err().is_not_found());
        assert!(api.get_workbin(&workbin.id).await.unwrap_err().is_not_found());
        assert_eq!(api.get_workbin(&workbin.id).await.unwrap().name, "Inbox");
    }

    #[tokio::test]
    async fn test_rule_update_replaces_top_level_fields() {
        let (api, wt) = seeded().await;
        let created = FlowRuleApi::<DateBased>::create_rule(
            &api,
            &wt,
            DateBasedRuleCreate {
                name: "Reminder".to_string(),
                condition: DateBasedCondition {
                    attribute: "dateDue".to_string(),
                    relative_minutes_to_invocation: -60,
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(created.worktype.as_ref().map(|w| w.id.as_str()), Some(wt.as_str()));

        let updated = FlowRuleApi::<DateBased>::update_rule(
            &api,
            &wt,
            &created.id,
            DateBasedRuleUpdate {
                name: Some("Late reminder".to_string()),
                condition: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Late reminder");
        assert_eq!(updated.condition.relative_minutes_to_invocation, -60);

        let err = FlowRuleApi::<DateBased>::update_rule(&api, &wt, &created.id, DateBasedRuleUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
