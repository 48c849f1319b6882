//! Job and JobResult.

use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// One unit of caller-supplied work.
///
/// `task` is opaque to the engine: it is handed to the processor untouched
/// and validating its shape is the processor's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    task: serde_json::Value,
}

impl Job {
    pub fn new(id: u64, task: impl Into<serde_json::Value>) -> Self {
        Self {
            id: JobId::new(id),
            task: task.into(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn task(&self) -> &serde_json::Value {
        &self.task
    }
}

/// Output of one successfully processed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub result: serde_json::Value,
}

impl JobResult {
    pub fn new(job_id: JobId, result: impl Into<serde_json::Value>) -> Self {
        Self {
            job_id,
            result: result.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_keeps_task_untouched() {
        let job = Job::new(1, json!({"nested": [1, 2, 3]}));
        assert_eq!(job.id(), JobId::new(1));
        assert_eq!(job.task(), &json!({"nested": [1, 2, 3]}));
    }

    #[test]
    fn job_result_wire_shape() {
        let result = JobResult::new(JobId::new(9), 81);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"job_id": 9, "result": 81}));
    }
}
