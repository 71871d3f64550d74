//! In-memory stores.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{ApplicationStore, StoreError, UserStore};
use crate::types::{Application, User};

const APPLICATION: &str = "Application";

fn new_stamp() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Applications kept in a map keyed by client id.
#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    applications: RwLock<HashMap<String, Application>>,
}

impl InMemoryApplicationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Application>, StoreError> {
        let applications = self.applications.read().await;
        Ok(applications.values().find(|a| a.id == id).cloned())
    }

    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self.applications.read().await.get(client_id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, StoreError> {
        let applications = self.applications.read().await;
        Ok(applications.values().find(|a| a.name == name).cloned())
    }

    async fn create(&self, mut application: Application) -> Result<Application, StoreError> {
        application.validate().map_err(|e| StoreError::Invalid {
            entity: APPLICATION,
            message: e.to_string(),
        })?;

        let mut applications = self.applications.write().await;
        if applications.contains_key(&application.client_id) {
            return Err(StoreError::duplicate(APPLICATION, &application.client_id));
        }

        application.concurrency_stamp = new_stamp();
        applications.insert(application.client_id.clone(), application.clone());
        tracing::debug!(client_id = %application.client_id, "Created application");
        Ok(application)
    }

    async fn update(&self, mut application: Application) -> Result<Application, StoreError> {
        application.validate().map_err(|e| StoreError::Invalid {
            entity: APPLICATION,
            message: e.to_string(),
        })?;

        let mut applications = self.applications.write().await;
        let stored = applications
            .get_mut(&application.client_id)
            .ok_or_else(|| StoreError::not_found(APPLICATION, &application.client_id))?;
        if stored.concurrency_stamp != application.concurrency_stamp {
            return Err(StoreError::concurrency_failure(
                APPLICATION,
                &application.client_id,
            ));
        }

        application.concurrency_stamp = new_stamp();
        *stored = application.clone();
        Ok(application)
    }

    async fn delete(&self, application: &Application) -> Result<(), StoreError> {
        let mut applications = self.applications.write().await;
        let stored = applications
            .get(&application.client_id)
            .ok_or_else(|| StoreError::not_found(APPLICATION, &application.client_id))?;
        if stored.concurrency_stamp != application.concurrency_stamp {
            return Err(StoreError::concurrency_failure(
                APPLICATION,
                &application.client_id,
            ));
        }

        applications.remove(&application.client_id);
        Ok(())
    }
}

/// Users kept in a map keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.user_name == user_name).cloned())
    }
}
