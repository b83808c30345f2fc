use uuid::Uuid;

/// Ephemeral per-task dispatch state. Mutated by the execution engine as
/// attempts proceed; never persisted and never shared across tasks.
#[derive(Debug, Clone)]
pub struct SelectionContext {
    pub task_id: Uuid,
    pub attempt: u32,
    pub max_attempts: u32,
    pub providers_tried: Vec<String>,
    pub last_failure_reason: Option<String>,
    pub is_retry: bool,
}

impl SelectionContext {
    pub fn new_for_fresh_task(task_id: Uuid, max_attempts: u32) -> Self {
        Self {
            task_id,
            attempt: 0,
            max_attempts,
            providers_tried: Vec::new(),
            last_failure_reason: None,
            is_retry: false,
        }
    }
}
