use crate::error::AppResult as Result;
use crate::notification::{PreferencesRepository, UserPreferences};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryPreferencesRepository {
    by_user: DashMap<Uuid, UserPreferences>,
}

impl InMemoryPreferencesRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryPreferencesRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreferences>> {
        Ok(self.by_user.get(&user_id).map(|p| p.value().clone()))
    }

    async fn upsert(&self, prefs: &UserPreferences) -> Result<()> {
        self.by_user.insert(prefs.user_id, prefs.clone());
        Ok(())
    }
}
