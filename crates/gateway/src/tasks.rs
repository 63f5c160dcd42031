//! Registry of research runs launched through the API.
//!
//! Lives for the process lifetime; nothing is persisted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use agora_agent::{CancelFlag, ResearchReport};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sentinel domain shown while the model picks one.
pub const AUTO_DOMAIN: &str = "auto-selected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Error,
    Cancelled,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub domain: String,
    pub progress: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
    #[serde(skip)]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    cancel: CancelFlag,
}

/// Why a cancel request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelRefusal {
    NotFound,
    AlreadyFinished(TaskStatus),
}

#[derive(Default)]
pub struct TaskManager {
    tasks: Mutex<HashMap<String, TaskRecord>>,
}

fn new_task_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "research_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TaskRecord>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a running task; the returned flag is the run's cancel switch.
    pub fn create(&self, domain: Option<&str>) -> (String, CancelFlag) {
        let task_id = new_task_id();
        let cancel = CancelFlag::new();
        let record = TaskRecord {
            task_id: task_id.clone(),
            status: TaskStatus::Running,
            domain: domain.unwrap_or(AUTO_DOMAIN).to_string(),
            progress: "Initializing...".into(),
            started_at: Utc::now(),
            completed_at: None,
            report_file: None,
            report: None,
            error: None,
            cancel: cancel.clone(),
        };
        self.lock().insert(task_id.clone(), record);
        (task_id, cancel)
    }

    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.lock().get(task_id).cloned()
    }

    /// All tasks, newest first.
    pub fn list(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self.lock().values().cloned().collect();
        tasks.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.task_id.cmp(&a.task_id)));
        tasks
    }

    /// Only a running task takes progress updates.
    pub fn set_progress(&self, task_id: &str, progress: &str) {
        if let Some(task) = self.lock().get_mut(task_id) {
            if task.status == TaskStatus::Running {
                task.progress = progress.to_string();
            }
        }
    }

    /// Record a finished run. A cancelled task stays cancelled.
    pub fn complete(&self, task_id: &str, report: ResearchReport) {
        let mut tasks = self.lock();
        let Some(task) = tasks.get_mut(task_id) else {
            return;
        };
        task.domain = report.domain;
        task.report_file = report.path;
        task.report = Some(report.markdown);
        task.completed_at = Some(Utc::now());
        if task.status == TaskStatus::Running {
            task.status = TaskStatus::Completed;
            task.progress = "Completed".into();
        }
    }

    /// Record a failed run. A cancelled task stays cancelled.
    pub fn fail(&self, task_id: &str, error: String) {
        let mut tasks = self.lock();
        let Some(task) = tasks.get_mut(task_id) else {
            return;
        };
        task.completed_at = Some(Utc::now());
        if task.status == TaskStatus::Running {
            task.status = TaskStatus::Error;
            task.progress = "Failed".into();
            task.error = Some(error);
        }
    }

    /// Stop a running task at its next step boundary.
    pub fn cancel(&self, task_id: &str) -> Result<(), CancelRefusal> {
        let mut tasks = self.lock();
        let task = tasks.get_mut(task_id).ok_or(CancelRefusal::NotFound)?;
        if task.status != TaskStatus::Running {
            return Err(CancelRefusal::AlreadyFinished(task.status));
        }
        task.cancel.cancel();
        task.status = TaskStatus::Cancelled;
        task.progress = "Cancelled".into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report(domain: &str) -> ResearchReport {
        ResearchReport {
            domain: domain.into(),
            markdown: "# Autonomous Research Report".into(),
            path: Some(PathBuf::from("reports/r.md")),
            workflow: vec![],
            activity: BTreeMap::new(),
        }
    }

    #[test]
    fn task_ids_have_the_expected_shape() {
        let manager = TaskManager::new();
        let (a, _) = manager.create(None);
        let (b, _) = manager.create(None);
        assert_ne!(a, b);
        assert!(a.starts_with("research_"));
        let suffix = a.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn lifecycle_to_completion() {
        let manager = TaskManager::new();
        let (id, _) = manager.create(None);
        assert_eq!(manager.get(&id).unwrap().domain, AUTO_DOMAIN);

        manager.set_progress(&id, "Created plan");
        assert_eq!(manager.get(&id).unwrap().progress, "Created plan");

        manager.complete(&id, report("fusion"));
        let task = manager.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.domain, "fusion");
        assert!(task.report.is_some());
        assert!(task.completed_at.is_some());

        assert_eq!(
            manager.cancel(&id),
            Err(CancelRefusal::AlreadyFinished(TaskStatus::Completed))
        );
    }

    #[test]
    fn failure_records_error() {
        let manager = TaskManager::new();
        let (id, _) = manager.create(Some("x"));
        manager.fail(&id, "Provider error: timeout".into());
        let task = manager.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error.as_deref(), Some("Provider error: timeout"));
    }

    #[test]
    fn cancel_sets_flag_and_sticks() {
        let manager = TaskManager::new();
        let (id, flag) = manager.create(Some("x"));
        manager.cancel(&id).unwrap();
        assert!(flag.is_cancelled());

        manager.fail(&id, "Research run cancelled before step 'planning'".into());
        let task = manager.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(task.error.is_none());
        assert_eq!(manager.cancel("missing"), Err(CancelRefusal::NotFound));
    }

    #[test]
    fn progress_after_cancel_is_ignored() {
        let manager = TaskManager::new();
        let (id, _) = manager.create(Some("x"));
        manager.set_progress(&id, "Planning");
        assert_eq!(manager.get(&id).unwrap().progress, "Planning");

        manager.cancel(&id).unwrap();
        manager.set_progress(&id, "Researching");
        assert_eq!(manager.get(&id).unwrap().progress, "Cancelled");
    }

    #[test]
    fn list_is_newest_first() {
        let manager = TaskManager::new();
        let (first, _) = manager.create(Some("a"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (second, _) = manager.create(Some("b"));
        let ids: Vec<_> = manager.list().into_iter().map(|t| t.task_id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
