use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Database;
use crate::observer::{ChangeNotifier, NotificationSink};
use crate::services::{UserService, ViewCounter};
use crate::tasks::TaskQueue;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<dyn Database>,
    pub tasks: TaskQueue,
    pub users: UserService,
    pub views: ViewCounter,
    /// Announces product creation, modification and deletion
    pub products: Arc<ChangeNotifier>,
}

impl AppState {
    /// Starts the task worker, so this must run inside a tokio runtime
    pub fn new(config: AppConfig, db: Arc<dyn Database>, sink: Arc<dyn NotificationSink>) -> Self {
        let tasks = TaskQueue::from_config(&config.tasks);

        Self {
            users: UserService::new(db.clone(), config.security.password_hash_cost),
            views: ViewCounter::new(db.clone(), tasks.clone()),
            products: Arc::new(ChangeNotifier::new("product", sink)),
            config: Arc::new(config),
            db,
            tasks,
        }
    }
}
