use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use training_log::models::*;
use training_log::services::{InMemoryTrainingLogStore, StoreError, TrainingLogStore};
use uuid::Uuid;

fn stored_log(user_id: Uuid, plan_id: Uuid, minutes_ago: i64) -> TrainingLog {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap() - Duration::minutes(minutes_ago);
    TrainingLog {
        id: Uuid::new_v4(),
        user_id,
        plan_id,
        weekday: 1,
        status: TrainingLogStatus::InProgress,
        exercises: vec![],
        total_duration: None,
        rating: None,
        notes: None,
        version: 0,
        created_at,
        updated_at: created_at,
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_update_requires_expected_version() {
        let store = InMemoryTrainingLogStore::new();
        let mut log = stored_log(Uuid::new_v4(), Uuid::new_v4(), 0);
        store.insert(&log).await.unwrap();

        log.status = TrainingLogStatus::Completed;
        log.version = 1;
        assert!(store.update_if_version(&log, 0).await.unwrap());

        // A writer that read version 0 lost the race
        let mut stale = log.clone();
        stale.status = TrainingLogStatus::Aborted;
        stale.version = 1;
        assert!(!store.update_if_version(&stale, 0).await.unwrap());

        let current = store.find_for_user(log.id, log.user_id).await.unwrap().unwrap();
        assert_eq!(current.status, TrainingLogStatus::Completed);
        assert_eq!(current.version, 1);
    }

    #[tokio::test]
    async fn test_preview_status_is_never_stored() {
        let store = InMemoryTrainingLogStore::new();
        let mut log = stored_log(Uuid::new_v4(), Uuid::new_v4(), 0);
        log.status = TrainingLogStatus::Preview;

        assert_matches!(store.insert(&log).await, Err(StoreError::InvalidRecord(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_queries_are_scoped_to_user_and_ordered() {
        let store = InMemoryTrainingLogStore::new();
        let (user_id, plan_id) = (Uuid::new_v4(), Uuid::new_v4());

        let oldest = stored_log(user_id, plan_id, 30);
        let middle = stored_log(user_id, plan_id, 20);
        let newest = stored_log(user_id, plan_id, 10);
        let foreign = stored_log(Uuid::new_v4(), plan_id, 0);
        for log in [&middle, &oldest, &foreign, &newest] {
            store.insert(log).await.unwrap();
        }

        let latest = store.latest_for_plan_day(user_id, plan_id, 1).await.unwrap();
        assert_eq!(latest.map(|log| log.id), Some(newest.id));
        assert_eq!(store.latest_for_plan_day(user_id, plan_id, 2).await.unwrap(), None);

        let listed: Vec<Uuid> = store
            .list_for_user(user_id, 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|log| log.id)
            .collect();
        assert_eq!(listed, vec![newest.id, middle.id, oldest.id]);

        let before: Vec<Uuid> = store
            .with_status_before(user_id, TrainingLogStatus::InProgress, Some(newest.created_at), 10)
            .await
            .unwrap()
            .iter()
            .map(|log| log.id)
            .collect();
        assert_eq!(before, vec![middle.id, oldest.id]);

        assert_eq!(store.count_with_status(user_id, TrainingLogStatus::InProgress).await.unwrap(), 3);
        assert_eq!(store.count_with_status(user_id, TrainingLogStatus::Completed).await.unwrap(), 0);

        assert!(store.find_for_user(foreign.id, user_id).await.unwrap().is_none());
        assert!(!store.delete(foreign.id, user_id).await.unwrap());
        assert!(store.delete(oldest.id, user_id).await.unwrap());
        assert_eq!(store.len().await, 3);
    }
}
