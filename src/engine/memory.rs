//! In-process search engine
//!
//! Implements [`SearchEngine`] over plain maps. Tasks are applied immediately
//! and recorded as succeeded, unless a fault has been injected for their
//! kind. Search is a case-insensitive substring match over string fields,
//! enough to exercise the read path without a running Meilisearch.

use super::{
    EngineError, EngineResult, IndexInfo, IndexPage, IndexSettings, SearchEngine, SearchHits,
    SearchQuery, Task, TaskFailure, TaskInfo, TaskKind, TaskStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
struct MemoryIndex {
    primary_key: Option<String>,
    settings: IndexSettings,
    /// Documents keyed by primary key, in insertion order
    documents: Vec<(String, Value)>,
}

#[derive(Debug, Default)]
struct State {
    indexes: BTreeMap<String, MemoryIndex>,
    tasks: HashMap<u64, Task>,
    next_task_uid: u64,
    failing_kinds: HashSet<TaskKind>,
    stalled_kinds: HashSet<TaskKind>,
    read_failure: Option<(u16, String)>,
    calls: Vec<String>,
}

/// In-memory [`SearchEngine`]
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future task of `kind` finish with status `failed`
    ///
    /// The task is recorded but its effect is not applied.
    pub fn fail_tasks(&self, kind: TaskKind) {
        self.state.lock().failing_kinds.insert(kind);
    }

    /// Leave every future task of `kind` enqueued forever
    pub fn stall_tasks(&self, kind: TaskKind) {
        self.state.lock().stalled_kinds.insert(kind);
    }

    /// Make index lookups, document reads and searches fail with the given HTTP status
    pub fn fail_reads(&self, status: u16, message: impl Into<String>) {
        self.state.lock().read_failure = Some((status, message.into()));
    }

    /// Names of the primitives called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of documents currently stored in an index
    pub fn document_count(&self, uid: &str) -> usize {
        self.state
            .lock()
            .indexes
            .get(uid)
            .map(|idx| idx.documents.len())
            .unwrap_or(0)
    }

    /// Settings last applied to an index
    pub fn settings(&self, uid: &str) -> Option<IndexSettings> {
        self.state
            .lock()
            .indexes
            .get(uid)
            .map(|idx| idx.settings.clone())
    }

    fn check_read(state: &State) -> EngineResult<()> {
        match &state.read_failure {
            Some((status, message)) => Err(EngineError::Api {
                status: *status,
                code: None,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Record a task and apply its effect unless a fault is injected
    fn enqueue(
        state: &mut State,
        uid: &str,
        kind: TaskKind,
        apply: impl FnOnce(&mut State) -> Result<(), String>,
    ) -> TaskInfo {
        let task_uid = state.next_task_uid;
        state.next_task_uid += 1;

        let (status, error) = if state.stalled_kinds.contains(&kind) {
            (TaskStatus::Enqueued, None)
        } else if state.failing_kinds.contains(&kind) {
            (
                TaskStatus::Failed,
                Some(TaskFailure {
                    message: format!("injected failure for {:?}", kind),
                    code: Some("internal".to_string()),
                }),
            )
        } else {
            match apply(state) {
                Ok(()) => (TaskStatus::Succeeded, None),
                Err(message) => (
                    TaskStatus::Failed,
                    Some(TaskFailure {
                        message,
                        code: None,
                    }),
                ),
            }
        };

        state.tasks.insert(
            task_uid,
            Task {
                uid: task_uid,
                index_uid: Some(uid.to_string()),
                status,
                kind,
                error,
            },
        );

        TaskInfo {
            task_uid,
            index_uid: Some(uid.to_string()),
            status: TaskStatus::Enqueued,
            kind,
        }
    }
}

fn primary_key_value(document: &Value, primary_key: &str) -> Option<String> {
    match document.get(primary_key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches_query(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| matches_query(v, needle)),
        Value::Object(map) => map.values().any(|v| matches_query(v, needle)),
        _ => false,
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn get_index(&self, uid: &str) -> EngineResult<Option<IndexInfo>> {
        let mut state = self.state.lock();
        state.calls.push(format!("get_index:{}", uid));
        Self::check_read(&state)?;
        Ok(state.indexes.get(uid).map(|idx| IndexInfo {
            uid: uid.to_string(),
            primary_key: idx.primary_key.clone(),
        }))
    }

    async fn list_indexes(&self, offset: usize, limit: usize) -> EngineResult<IndexPage> {
        let mut state = self.state.lock();
        state.calls.push("list_indexes".to_string());
        let results = state
            .indexes
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(uid, idx)| IndexInfo {
                uid: uid.clone(),
                primary_key: idx.primary_key.clone(),
            })
            .collect();
        Ok(IndexPage {
            results,
            offset,
            limit,
            total: state.indexes.len(),
        })
    }

    async fn create_index(&self, uid: &str, primary_key: &str) -> EngineResult<TaskInfo> {
        let mut state = self.state.lock();
        state.calls.push(format!("create_index:{}", uid));
        let (uid_owned, key) = (uid.to_string(), primary_key.to_string());
        Ok(Self::enqueue(&mut state, uid, TaskKind::IndexCreation, |s| {
            if s.indexes.contains_key(&uid_owned) {
                return Err(format!("Index `{}` already exists.", uid_owned));
            }
            s.indexes.insert(
                uid_owned,
                MemoryIndex {
                    primary_key: Some(key),
                    ..Default::default()
                },
            );
            Ok(())
        }))
    }

    async fn delete_index(&self, uid: &str) -> EngineResult<TaskInfo> {
        let mut state = self.state.lock();
        state.calls.push(format!("delete_index:{}", uid));
        let uid_owned = uid.to_string();
        Ok(Self::enqueue(&mut state, uid, TaskKind::IndexDeletion, |s| {
            s.indexes
                .remove(&uid_owned)
                .map(|_| ())
                .ok_or_else(|| format!("Index `{}` not found.", uid_owned))
        }))
    }

    async fn update_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> EngineResult<TaskInfo> {
        let mut state = self.state.lock();
        state.calls.push(format!("update_settings:{}", uid));
        let uid_owned = uid.to_string();
        let settings = settings.clone();
        Ok(Self::enqueue(&mut state, uid, TaskKind::SettingsUpdate, |s| {
            let idx = s.indexes.entry(uid_owned).or_default();
            idx.settings = settings;
            Ok(())
        }))
    }

    async fn add_documents(
        &self,
        uid: &str,
        documents: Vec<Value>,
    ) -> EngineResult<TaskInfo> {
        let mut state = self.state.lock();
        state.calls.push(format!("add_documents:{}", uid));
        let uid_owned = uid.to_string();
        Ok(Self::enqueue(
            &mut state,
            uid,
            TaskKind::DocumentAdditionOrUpdate,
            |s| {
                let idx = s.indexes.entry(uid_owned).or_default();
                let primary_key = idx
                    .primary_key
                    .clone()
                    .ok_or_else(|| "index has no primary key".to_string())?;
                for document in documents {
                    let id = primary_key_value(&document, &primary_key).ok_or_else(|| {
                        format!("document is missing primary key `{}`", primary_key)
                    })?;
                    match idx.documents.iter_mut().find(|(k, _)| *k == id) {
                        Some(slot) => slot.1 = document,
                        None => idx.documents.push((id, document)),
                    }
                }
                Ok(())
            },
        ))
    }

    async fn delete_all_documents(&self, uid: &str) -> EngineResult<TaskInfo> {
        let mut state = self.state.lock();
        state.calls.push(format!("delete_all_documents:{}", uid));
        let uid_owned = uid.to_string();
        Ok(Self::enqueue(&mut state, uid, TaskKind::DocumentDeletion, |s| {
            match s.indexes.get_mut(&uid_owned) {
                Some(idx) => {
                    idx.documents.clear();
                    Ok(())
                }
                None => Err(format!("Index `{}` not found.", uid_owned)),
            }
        }))
    }

    async fn get_document(&self, uid: &str, document_id: &str) -> EngineResult<Option<Value>> {
        let mut state = self.state.lock();
        state.calls.push(format!("get_document:{}", uid));
        Self::check_read(&state)?;
        Ok(state.indexes.get(uid).and_then(|idx| {
            idx.documents
                .iter()
                .find(|(k, _)| k == document_id)
                .map(|(_, doc)| doc.clone())
        }))
    }

    async fn search(&self, uid: &str, query: &SearchQuery) -> EngineResult<SearchHits> {
        let mut state = self.state.lock();
        state.calls.push(format!("search:{}", uid));
        Self::check_read(&state)?;

        let idx = state.indexes.get(uid).ok_or_else(|| EngineError::Api {
            status: 404,
            code: Some("index_not_found".to_string()),
            message: format!("Index `{}` not found.", uid),
        })?;

        let needle = query.q.to_lowercase();
        let matching: Vec<&Value> = idx
            .documents
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| matches_query(doc, &needle))
            .collect();

        let hits = matching
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|doc| {
                let mut hit = (*doc).clone();
                if let Value::Object(map) = &mut hit {
                    let formatted = Value::Object(map.clone());
                    map.insert("_formatted".to_string(), formatted);
                    if query.show_ranking_score {
                        map.insert("_rankingScore".to_string(), serde_json::json!(1.0));
                    }
                }
                hit
            })
            .collect();

        Ok(SearchHits {
            hits,
            estimated_total_hits: matching.len(),
        })
    }

    async fn get_task(&self, task_uid: u64) -> EngineResult<Task> {
        let state = self.state.lock();
        state
            .tasks
            .get(&task_uid)
            .cloned()
            .ok_or_else(|| EngineError::Api {
                status: 404,
                code: Some("task_not_found".to_string()),
                message: format!("Task `{}` not found.", task_uid),
            })
    }
}
