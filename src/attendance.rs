//! Daily attendance and checklist reconciliation.
//!
//! The backend only stores the records that were marked. These helpers merge
//! a roster (or task list) with a day's partial records for display, and turn
//! the submitted page back into the records to store.

use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;
use serde_json::{json, Value};

use crate::utils::display_value;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    Unmarked,
}

impl AttendanceStatus {
    pub const CHOICES: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Leave,
        AttendanceStatus::Unmarked,
    ];

    pub fn parse(raw: &str) -> AttendanceStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => AttendanceStatus::Present,
            "absent" | "a" => AttendanceStatus::Absent,
            "leave" | "l" => AttendanceStatus::Leave,
            _ => AttendanceStatus::Unmarked,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Leave => "leave",
            AttendanceStatus::Unmarked => "unmarked",
        }
    }
}

/// Whose attendance a page tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterKind {
    Students,
    Staff,
}

impl RosterKind {
    pub fn parse(raw: Option<&str>) -> RosterKind {
        match raw {
            Some("staff") => RosterKind::Staff,
            _ => RosterKind::Students,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RosterKind::Students => "students",
            RosterKind::Staff => "staff",
        }
    }

    /// Backend collection holding the roster.
    pub fn roster_path(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AttendanceRow {
    pub person_id: String,
    pub name: String,
    pub status: AttendanceStatus,
}

fn id_of(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .map(display_value)
        .filter(|id| !id.is_empty())
}

/// Numeric ids sort numerically, anything else falls back to text order.
fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// One row per roster member, in roster order. Records for people no longer
/// on the roster are dropped; with duplicate records the last one wins.
pub fn reconcile_attendance(roster: &[Value], records: &[Value]) -> Vec<AttendanceRow> {
    let marked: HashMap<String, AttendanceStatus> = records
        .iter()
        .filter_map(|r| {
            let person = id_of(r, "person_id")?;
            let status = r.get("status").map(display_value).unwrap_or_default();
            Some((person, AttendanceStatus::parse(&status)))
        })
        .collect();

    roster
        .iter()
        .filter_map(|person| {
            let person_id = id_of(person, "id")?;
            let status = marked
                .get(&person_id)
                .copied()
                .unwrap_or(AttendanceStatus::Unmarked);
            Some(AttendanceRow {
                name: person.get("name").map(display_value).unwrap_or_default(),
                person_id,
                status,
            })
        })
        .collect()
}

/// Records to store for a submitted attendance sheet. Form keys are
/// `status_<person_id>`; unmarked rows are left out.
pub fn attendance_records(form: &HashMap<String, String>) -> Vec<Value> {
    let mut records: Vec<(String, AttendanceStatus)> = form
        .iter()
        .filter_map(|(key, value)| {
            let person_id = key.strip_prefix("status_")?;
            match AttendanceStatus::parse(value) {
                AttendanceStatus::Unmarked => None,
                status => Some((person_id.to_string(), status)),
            }
        })
        .collect();
    records.sort_by(|a, b| id_order(&a.0, &b.0));
    records
        .into_iter()
        .map(|(person_id, status)| json!({"person_id": person_id, "status": status.as_str()}))
        .collect()
}

/// Checklist state as shown on the page. Storage only knows done/not done;
/// a task without a record is unset.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Done,
    NotDone,
    Unset,
}

impl TaskState {
    /// Map a stored value to a state.
    pub fn from_stored(value: &Value) -> TaskState {
        match value {
            Value::Bool(true) => TaskState::Done,
            Value::Bool(false) => TaskState::NotDone,
            Value::Number(n) if n.as_f64() == Some(1.0) => TaskState::Done,
            Value::Number(n) if n.as_f64() == Some(0.0) => TaskState::NotDone,
            Value::String(s) => match s.trim() {
                "1" | "true" => TaskState::Done,
                "0" | "false" => TaskState::NotDone,
                _ => TaskState::Unset,
            },
            _ => TaskState::Unset,
        }
    }

    /// The binary value to store, or `None` when nothing should be stored.
    pub fn to_stored(self) -> Option<u8> {
        match self {
            TaskState::Done => Some(1),
            TaskState::NotDone => Some(0),
            TaskState::Unset => None,
        }
    }

    pub fn from_form(raw: &str) -> TaskState {
        match raw.trim() {
            "yes" | "done" => TaskState::Done,
            "no" | "not_done" => TaskState::NotDone,
            _ => TaskState::Unset,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChecklistRow {
    pub task_id: String,
    pub title: String,
    pub state: TaskState,
}

pub fn reconcile_checklist(tasks: &[Value], records: &[Value]) -> Vec<ChecklistRow> {
    let stored: HashMap<String, TaskState> = records
        .iter()
        .filter_map(|r| {
            let task = id_of(r, "task_id")?;
            let state = TaskState::from_stored(r.get("done").unwrap_or(&Value::Null));
            Some((task, state))
        })
        .collect();

    tasks
        .iter()
        .filter_map(|task| {
            let task_id = id_of(task, "id")?;
            let state = stored.get(&task_id).copied().unwrap_or(TaskState::Unset);
            Some(ChecklistRow {
                title: task.get("title").map(display_value).unwrap_or_default(),
                task_id,
                state,
            })
        })
        .collect()
}

/// Records to store for a submitted checklist. Form keys are
/// `task_<task_id>`; unset tasks are left out.
pub fn checklist_records(form: &HashMap<String, String>) -> Vec<Value> {
    let mut records: Vec<(String, u8)> = form
        .iter()
        .filter_map(|(key, value)| {
            let task_id = key.strip_prefix("task_")?;
            let done = TaskState::from_form(value).to_stored()?;
            Some((task_id.to_string(), done))
        })
        .collect();
    records.sort_by(|a, b| id_order(&a.0, &b.0));
    records
        .into_iter()
        .map(|(task_id, done)| json!({"task_id": task_id, "done": done}))
        .collect()
}
