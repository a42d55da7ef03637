use std::sync::Arc;

pub type SessionConfigRef = Arc<SessionConfig>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    /// Parallelism suggested to providers that ask for one.
    pub default_parallelism: usize,
    /// Upper bound of partition tasks running at the same time.
    pub max_concurrent_tasks: usize,
    /// How many times a failed partition task is run before its error surfaces.
    pub task_max_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            name: "noname".to_string(),
            default_parallelism: parallelism,
            max_concurrent_tasks: parallelism,
            task_max_attempts: 1,
        }
    }
}

impl SessionConfig {
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_default_parallelism(self, default_parallelism: usize) -> Self {
        Self {
            default_parallelism: default_parallelism.max(1),
            ..self
        }
    }

    pub fn with_max_concurrent_tasks(self, max_concurrent_tasks: usize) -> Self {
        Self {
            max_concurrent_tasks: max_concurrent_tasks.max(1),
            ..self
        }
    }

    pub fn with_task_max_attempts(self, task_max_attempts: usize) -> Self {
        Self {
            task_max_attempts: task_max_attempts.max(1),
            ..self
        }
    }
}
