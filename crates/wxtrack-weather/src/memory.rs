//! In-memory location storage, for tests and throwaway runs.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{TrackerError, TrackerResult};
use crate::repository::LocationRepository;
use crate::types::{LocationKey, LocationRecord};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<LocationRecord>,
    next_id: i64,
}

impl Inner {
    fn by_id_mut(&mut self, id: i64) -> TrackerResult<&mut LocationRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TrackerError::not_found(format!("id {}", id)))
    }
}

/// Location store backed by a locked `Vec`, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    inner: Mutex<Inner>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, pred: impl Fn(&LocationRecord) -> bool) -> Vec<LocationRecord> {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|r| pred(r))
            .cloned()
            .collect()
    }
}

impl LocationRepository for InMemoryLocationStore {
    fn find(&self, key: &LocationKey) -> TrackerResult<Option<LocationRecord>> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .iter()
            .find(|r| r.city_name == key.city_name && r.country_code == key.country_code)
            .cloned())
    }

    fn upsert(&self, key: &LocationKey, now: DateTime<Utc>) -> TrackerResult<LocationRecord> {
        let mut inner = self.inner.lock();

        if let Some(record) = inner
            .records
            .iter_mut()
            .find(|r| r.city_name == key.city_name && r.country_code == key.country_code)
        {
            record.last_request_at = now;
            record.is_active = true;
            return Ok(record.clone());
        }

        inner.next_id += 1;
        let record = LocationRecord {
            id: inner.next_id,
            city_name: key.city_name.clone(),
            country_code: key.country_code.clone(),
            request_count: 0,
            last_fetched_at: None,
            last_request_at: now,
            is_active: true,
            created_at: now,
        };
        inner.records.push(record.clone());
        tracing::debug!("Created location {} (id {})", key, record.id);
        Ok(record)
    }

    fn increment_request_count(&self, id: i64) -> TrackerResult<LocationRecord> {
        let mut inner = self.inner.lock();
        let record = inner.by_id_mut(id)?;
        record.request_count += 1;
        Ok(record.clone())
    }

    fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> TrackerResult<LocationRecord> {
        let mut inner = self.inner.lock();
        let record = inner.by_id_mut(id)?;
        record.last_fetched_at = Some(at);
        Ok(record.clone())
    }

    fn filter_by_active(&self) -> TrackerResult<Vec<LocationRecord>> {
        Ok(self.select(|r| r.is_active))
    }

    fn filter_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>> {
        Ok(self.select(|r| r.is_active && r.last_request_at < cutoff))
    }

    fn filter_due_for_fetch(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>> {
        Ok(self.select(|r| r.is_due_for_fetch(cutoff)))
    }

    fn deactivate_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<usize> {
        let mut inner = self.inner.lock();
        let mut changed = 0;
        for record in inner
            .records
            .iter_mut()
            .filter(|r| r.is_active && r.last_request_at < cutoff)
        {
            record.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }

    fn count(&self) -> TrackerResult<usize> {
        Ok(self.inner.lock().records.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_ids_are_sequential() {
        let store = InMemoryLocationStore::new();
        let a = store.upsert(&LocationKey::new("a", "za"), t0()).unwrap();
        let b = store.upsert(&LocationKey::new("b", "za"), t0()).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_upsert_then_increment() {
        let store = InMemoryLocationStore::new();
        let key = LocationKey::new("durban", "za");
        let record = store.upsert(&key, t0()).unwrap();
        assert_eq!(record.request_count, 0);

        let record = store.increment_request_count(record.id).unwrap();
        assert_eq!(record.request_count, 1);

        let again = store.upsert(&key, t0() + Duration::hours(1)).unwrap();
        assert_eq!(again.request_count, 1);
        assert_eq!(again.created_at, t0());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_deactivate_counts_only_changed_rows() {
        let store = InMemoryLocationStore::new();
        store.upsert(&LocationKey::new("a", "za"), t0()).unwrap();
        store.upsert(&LocationKey::new("b", "za"), t0() + Duration::days(31)).unwrap();

        let cutoff = t0() + Duration::days(30);
        assert_eq!(store.filter_stale_since(cutoff).unwrap().len(), 1);
        assert_eq!(store.deactivate_stale_since(cutoff).unwrap(), 1);
        assert_eq!(store.deactivate_stale_since(cutoff).unwrap(), 0);
        assert!(store.filter_stale_since(cutoff).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_id_not_found() {
        let store = InMemoryLocationStore::new();
        assert!(matches!(store.increment_request_count(1), Err(TrackerError::NotFound(_))));
        assert!(matches!(store.mark_fetched(1, t0()), Err(TrackerError::NotFound(_))));
    }
}
