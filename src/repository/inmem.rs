use super::{AssetMetricKey, TimestampRepository};
use crate::error::RepositoryError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    timestamps: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampRepository for InMemoryRepository {
    fn store(&self, key: &AssetMetricKey, ts: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut guard = self
            .timestamps
            .lock()
            .map_err(|_| RepositoryError::Poisoned)?;
        guard.insert(key.signature(), ts);
        Ok(())
    }

    fn get(&self, key: &AssetMetricKey) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let guard = self
            .timestamps
            .lock()
            .map_err(|_| RepositoryError::Poisoned)?;
        Ok(guard.get(&key.signature()).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_key_is_not_an_error() {
        let repo = InMemoryRepository::new();
        let found = repo.get(&AssetMetricKey::new("A1", "asset_speed")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn store_overwrites_previous_value() {
        let repo = InMemoryRepository::new();
        let key = AssetMetricKey::new("A1", "asset_speed");
        let first = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let second = Utc.timestamp_opt(1_700_000_060, 0).unwrap();

        repo.store(&key, first).unwrap();
        repo.store(&key, second).unwrap();
        assert_eq!(repo.get(&key).unwrap(), Some(second));
    }

    #[test]
    fn keys_are_independent_per_metric() {
        let repo = InMemoryRepository::new();
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        repo.store(&AssetMetricKey::new("A1", "asset_gps_latitude"), ts)
            .unwrap();
        assert!(repo
            .get(&AssetMetricKey::new("A1", "asset_gps_longitude"))
            .unwrap()
            .is_none());
    }
}
