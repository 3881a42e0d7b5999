use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::AppError;
use crate::models::{DayBucket, StudentTask, TaskSummary, UserRecord};
use crate::store::{DocumentStore, Filter, InClause, collections};

const NAME_BATCH_SIZE: usize = 10;
const DEFAULT_STUDENT_NAME: &str = "Student";

/// Result of a display-name lookup. `warning` is set when the lookup had to
/// fall back to an empty mapping because the store failed; callers can then
/// tell defaulted-by-failure apart from genuinely missing data.
#[derive(Debug, Serialize)]
pub struct NameResolution {
    pub names: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Buckets due tasks into a Monday-start week and resolves student display
/// names in batches.
pub struct TaskCompletionAggregator {
    store: Arc<dyn DocumentStore>,
}

impl TaskCompletionAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Seven day buckets, Monday first, for the week containing `reference`.
    ///
    /// Tasks are fetched with `dueDate >= week start` and no upper bound;
    /// anything past Sunday simply maps outside index 0-6 and is dropped by
    /// the bucketing.
    pub async fn weekly_completion(
        &self,
        reference: DateTime<Utc>,
    ) -> Result<Vec<DayBucket>, AppError> {
        let week_start = monday_of(reference);

        let mut buckets: Vec<DayBucket> = (0..7)
            .map(|offset| {
                let date = week_start + Days::new(offset);
                DayBucket {
                    day: date.format("%A").to_string(),
                    date: date.format("%b %-d").to_string(),
                    total_tasks: 0,
                    completed_tasks: 0,
                    completion_rate: 0,
                    tasks: Vec::new(),
                }
            })
            .collect();

        let week_start_at = week_start.and_time(NaiveTime::MIN).and_utc();
        let docs = self
            .store
            .query(
                collections::STUDENT_TASKS,
                &[Filter::gte("dueDate", serde_json::to_value(week_start_at)?)],
                None,
            )
            .await?;

        for doc in docs {
            let task: StudentTask = serde_json::from_value(doc)?;
            let day_index = (task.due_date.date_naive() - week_start).num_days();
            if !(0..7).contains(&day_index) {
                continue;
            }

            let bucket = &mut buckets[day_index as usize];
            bucket.total_tasks += 1;
            if task.completed {
                bucket.completed_tasks += 1;
            }
            bucket.tasks.push(TaskSummary {
                id: task.id,
                title: task.title,
                student_id: task.student_id,
                completed: task.completed,
                due_date: task.due_date,
            });
        }

        for bucket in &mut buckets {
            if bucket.total_tasks > 0 {
                bucket.completion_rate = (100.0 * f64::from(bucket.completed_tasks)
                    / f64::from(bucket.total_tasks))
                .round() as u32;
            }
        }

        Ok(buckets)
    }

    /// Maps student ids to display names, batching id lookups to bound the
    /// in-list size per query. The one fail-soft boundary in this crate: a
    /// store failure yields an empty mapping with a warning instead of an
    /// error, so the primary report still renders.
    pub async fn resolve_student_names(&self, student_ids: &[String]) -> NameResolution {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = student_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .collect();

        let mut names = HashMap::new();
        for batch in unique.chunks(NAME_BATCH_SIZE) {
            let in_clause = InClause {
                field: "id".to_string(),
                values: batch.iter().map(|id| Value::String((*id).to_string())).collect(),
            };
            let docs = match self
                .store
                .query(collections::USERS, &[], Some(&in_clause))
                .await
            {
                Ok(docs) => docs,
                Err(e) => {
                    warn!("student name lookup failed, degrading to empty mapping: {}", e);
                    return NameResolution {
                        names: HashMap::new(),
                        warning: Some("student name lookup failed".to_string()),
                    };
                }
            };

            let mut found = HashMap::new();
            for doc in docs {
                match serde_json::from_value::<UserRecord>(doc) {
                    Ok(user) => {
                        let name = display_name(&user);
                        found.insert(user.id, name);
                    }
                    Err(e) => warn!("skipping malformed user record: {}", e),
                }
            }

            for id in batch {
                let name = found
                    .get(*id)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_STUDENT_NAME.to_string());
                names.insert((*id).to_string(), name);
            }
        }

        NameResolution {
            names,
            warning: None,
        }
    }
}

/// Monday of the week containing `reference`, as a naive date. Sunday counts
/// as the last day of the week, six days after its Monday.
fn monday_of(reference: DateTime<Utc>) -> chrono::NaiveDate {
    let back = u64::from(reference.weekday().num_days_from_monday());
    reference.date_naive() - Days::new(back)
}

fn display_name(user: &UserRecord) -> String {
    [&user.display_name, &user.full_name, &user.email]
        .into_iter()
        .find_map(|field| {
            field
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_STUDENT_NAME.to_string())
}
