// src/store.rs
use crate::calendar::DayToken;
use crate::db::Error as DbError;
use crate::exercise::{
    validate, DraftExercise, ExerciseId, ExerciseRecord, ValidationError, ValidationPolicy,
};
use crate::kv::{KeyValueStore, EXERCISES_KEY};
use crate::schedule;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Stored exercise data is corrupt: {0}")]
    CorruptData(#[source] serde_json::Error),
    #[error("Failed to serialize exercises: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("No exercise ids left to assign")]
    IdsExhausted,
    #[error("Exercise not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Storage backend failed: {0}")]
    Backend(#[from] DbError),
}

/// Sole owner of the exercise list. Every mutation builds the new list,
/// writes it as one blob, and only then replaces the in-memory snapshot, so a
/// failed write leaves the store exactly as it was.
pub struct ExerciseStore<S: KeyValueStore> {
    kv: S,
    exercises: Vec<ExerciseRecord>,
    policy: ValidationPolicy,
}

impl<S: KeyValueStore> ExerciseStore<S> {
    /// Creates a store with an empty snapshot. Call [`Self::load_all`] to read
    /// what is persisted.
    pub fn new(kv: S, policy: ValidationPolicy) -> Self {
        Self {
            kv,
            exercises: Vec::new(),
            policy,
        }
    }

    /// Creates a store and loads the persisted list.
    /// # Errors
    /// See [`Self::load_all`].
    pub fn open(kv: S, policy: ValidationPolicy) -> Result<Self, StoreError> {
        let mut store = Self::new(kv, policy);
        store.load_all()?;
        Ok(store)
    }

    /// Read-only view of the current list.
    pub fn exercises(&self) -> &[ExerciseRecord] {
        &self.exercises
    }

    pub const fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ValidationPolicy) {
        self.policy = policy;
    }

    pub const fn backend(&self) -> &S {
        &self.kv
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    /// Reads the persisted list, replacing the snapshot. Missing data is an
    /// empty list. Records saved before ids existed get fresh ids here.
    /// # Errors
    /// - `StoreError::CorruptData` if the blob is not a valid exercise list.
    /// - `StoreError::IdsExhausted` if a record lacks an id and none is free.
    /// - `StoreError::Backend` if the read fails.
    pub fn load_all(&mut self) -> Result<Vec<ExerciseRecord>, StoreError> {
        let loaded = match self.kv.get(EXERCISES_KEY)? {
            Some(blob) => {
                let mut records: Vec<ExerciseRecord> =
                    serde_json::from_str(&blob).map_err(StoreError::CorruptData)?;
                assign_missing_ids(&mut records)?;
                records
            }
            None => Vec::new(),
        };
        debug!(count = loaded.len(), "Loaded exercises");
        self.exercises = loaded.clone();
        Ok(loaded)
    }

    /// Overwrites the persisted list with `records`.
    /// # Errors
    /// `StoreError::Serialize` or `StoreError::Backend`; the snapshot is unchanged on error.
    pub fn save_all(&mut self, records: Vec<ExerciseRecord>) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&records).map_err(StoreError::Serialize)?;
        self.kv.set(EXERCISES_KEY, &blob)?;
        debug!(count = records.len(), "Saved exercises");
        self.exercises = records;
        Ok(())
    }

    /// Validates `draft`, appends it with a new id and persists.
    /// # Errors
    /// `StoreError::Invalid` for a bad draft, otherwise see [`Self::save_all`].
    pub fn add(&mut self, draft: &DraftExercise) -> Result<&[ExerciseRecord], StoreError> {
        let mut record = validate(draft, self.policy)?;
        record.id = next_id(&self.exercises)?;
        let mut updated = self.exercises.clone();
        updated.push(record);
        self.save_all(updated)?;
        if let Some(added) = self.exercises.last() {
            info!(id = %added.id, name = %added.name, "Added exercise");
        }
        Ok(&self.exercises)
    }

    /// Replaces the record with the given id, keeping the id.
    /// # Errors
    /// `StoreError::NotFound`, `StoreError::Invalid`, or a persistence error.
    pub fn update(
        &mut self,
        id: ExerciseId,
        draft: &DraftExercise,
    ) -> Result<&[ExerciseRecord], StoreError> {
        let position = self
            .exercises
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("ID {id}")))?;
        self.replace_at(position, draft)
    }

    /// Replaces the first record named `name`, keeping its id.
    /// Names are not unique; prefer [`Self::update`].
    /// # Errors
    /// `StoreError::NotFound`, `StoreError::Invalid`, or a persistence error.
    pub fn update_by_name(
        &mut self,
        name: &str,
        draft: &DraftExercise,
    ) -> Result<&[ExerciseRecord], StoreError> {
        let position = self
            .exercises
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.replace_at(position, draft)
    }

    fn replace_at(
        &mut self,
        position: usize,
        draft: &DraftExercise,
    ) -> Result<&[ExerciseRecord], StoreError> {
        let mut record = validate(draft, self.policy)?;
        record.id = self.exercises[position].id;
        let mut updated = self.exercises.clone();
        updated[position] = record;
        self.save_all(updated)?;
        info!(id = %self.exercises[position].id, "Updated exercise");
        Ok(&self.exercises)
    }

    /// Removes the record with the given id.
    /// # Errors
    /// `StoreError::NotFound` or a persistence error.
    pub fn delete(&mut self, id: ExerciseId) -> Result<&[ExerciseRecord], StoreError> {
        let position = self
            .exercises
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("ID {id}")))?;
        self.remove_at(position)
    }

    /// Removes the `index`-th record of the `day` view produced by
    /// [`schedule::for_day`] over the current snapshot.
    /// # Errors
    /// `StoreError::NotFound` if the view has no such index, or a persistence error.
    pub fn delete_by_day_and_index(
        &mut self,
        day: DayToken,
        index: usize,
    ) -> Result<&[ExerciseRecord], StoreError> {
        let position = schedule::global_index_for_day(&self.exercises, day, index)
            .ok_or_else(|| StoreError::NotFound(format!("{day} #{index}")))?;
        self.remove_at(position)
    }

    fn remove_at(&mut self, position: usize) -> Result<&[ExerciseRecord], StoreError> {
        let mut updated = self.exercises.clone();
        let removed = updated.remove(position);
        self.save_all(updated)?;
        info!(id = %removed.id, name = %removed.name, "Deleted exercise");
        Ok(&self.exercises)
    }

    /// Drops the persisted list and empties the snapshot.
    /// # Errors
    /// `StoreError::Backend`; the snapshot is unchanged on error.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.kv.remove(EXERCISES_KEY)?;
        self.exercises.clear();
        info!("Cleared all exercises");
        Ok(())
    }

    /// Looks a record up by id (when `identifier` parses as one) or by name.
    pub fn find(&self, identifier: &str) -> Option<&ExerciseRecord> {
        let trimmed = identifier.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => self.exercises.iter().find(|r| r.id == ExerciseId(id)),
            Err(_) => self.exercises.iter().find(|r| r.name == trimmed),
        }
    }
}

fn next_id(records: &[ExerciseRecord]) -> Result<ExerciseId, StoreError> {
    let max = records.iter().map(|r| r.id.0).max().unwrap_or(0);
    max.checked_add(1).map(ExerciseId).ok_or(StoreError::IdsExhausted)
}

fn assign_missing_ids(records: &mut [ExerciseRecord]) -> Result<(), StoreError> {
    if records.iter().all(|r| r.id.is_assigned()) {
        return Ok(());
    }
    let mut next = Some(next_id(records)?.0);
    for record in records.iter_mut().filter(|r| !r.id.is_assigned()) {
        let id = next.ok_or(StoreError::IdsExhausted)?;
        record.id = ExerciseId(id);
        next = id.checked_add(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::SetScheme;
    use crate::kv::MemoryKvStore;

    /// Backend whose writes can be switched off.
    #[derive(Default)]
    struct FlakyKv {
        inner: MemoryKvStore,
        fail_writes: bool,
    }

    fn disk_full() -> DbError {
        DbError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }

    impl KeyValueStore for FlakyKv {
        fn get(&self, key: &str) -> Result<Option<String>, DbError> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), DbError> {
            if self.fail_writes {
                return Err(disk_full());
            }
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<(), DbError> {
            if self.fail_writes {
                return Err(disk_full());
            }
            self.inner.remove(key)
        }
        fn clear(&mut self) -> Result<(), DbError> {
            self.inner.clear()
        }
    }

    fn draft(name: &str, days: &[DayToken]) -> DraftExercise {
        DraftExercise {
            name: name.to_string(),
            selected_days: days.to_vec(),
            series: 3,
            reps: SetScheme::Fixed(10),
            weight: SetScheme::Fixed(40.0),
            recovery: 90,
        }
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let mut store = ExerciseStore::new(MemoryKvStore::new(), ValidationPolicy::default());
        store.add(&draft("A", &[DayToken::Lun])).unwrap();
        store.add(&draft("B", &[DayToken::Mar])).unwrap();
        let ids: Vec<_> = store.exercises().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![ExerciseId(1), ExerciseId(2)]);

        store.delete(ExerciseId(1)).unwrap();
        store.add(&draft("C", &[DayToken::Mer])).unwrap();
        assert_eq!(store.exercises()[1].id, ExerciseId(3));
    }

    #[test]
    fn legacy_records_get_ids_on_load() {
        let mut kv = MemoryKvStore::new();
        kv.set(
            EXERCISES_KEY,
            r#"[{"name":"A","selectedDays":["Lun"],"series":3,"reps":[10],"weight":0,"recovery":60},
                {"id":5,"name":"B","selectedDays":["Mar"],"series":3,"reps":10,"weight":0,"recovery":60}]"#,
        )
        .unwrap();
        let store = ExerciseStore::open(kv, ValidationPolicy::default()).unwrap();
        let ids: Vec<_> = store.exercises().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![ExerciseId(6), ExerciseId(5)]);
    }

    #[test]
    fn max_id_does_not_overflow() {
        let mut kv = MemoryKvStore::new();
        kv.set(
            EXERCISES_KEY,
            r#"[{"id":18446744073709551615,"name":"A","selectedDays":["Lun"],"series":3,"reps":10,"weight":0,"recovery":60}]"#,
        )
        .unwrap();
        let mut store = ExerciseStore::open(kv, ValidationPolicy::default()).unwrap();
        assert_eq!(store.exercises()[0].id, ExerciseId(u64::MAX));

        let err = store.add(&draft("B", &[DayToken::Mar])).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted));
        assert_eq!(store.exercises().len(), 1);

        store
            .backend_mut()
            .set(
                EXERCISES_KEY,
                r#"[{"id":18446744073709551615,"name":"A","selectedDays":["Lun"],"series":3,"reps":10,"weight":0,"recovery":60},
                    {"name":"B","selectedDays":["Mar"],"series":3,"reps":10,"weight":0,"recovery":60}]"#,
            )
            .unwrap();
        assert!(matches!(store.load_all(), Err(StoreError::IdsExhausted)));
    }

    #[test]
    fn failed_write_leaves_snapshot_untouched() {
        let mut store = ExerciseStore::new(FlakyKv::default(), ValidationPolicy::default());
        store.add(&draft("A", &[DayToken::Lun])).unwrap();
        store.backend_mut().fail_writes = true;

        let err = store.add(&draft("B", &[DayToken::Mar])).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store.delete(ExerciseId(1)).is_err());
        assert!(store.clear_all().is_err());
        assert_eq!(store.exercises().len(), 1);

        store.backend_mut().fail_writes = false;
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn invalid_draft_is_not_stored() {
        let mut store = ExerciseStore::new(MemoryKvStore::new(), ValidationPolicy::default());
        let err = store.add(&draft("", &[DayToken::Lun])).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(ValidationError::MissingName)));
        assert!(store.backend().get(EXERCISES_KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let mut kv = MemoryKvStore::new();
        kv.set(EXERCISES_KEY, "{not json").unwrap();
        let result = ExerciseStore::open(kv, ValidationPolicy::default());
        assert!(matches!(result, Err(StoreError::CorruptData(_))));
    }

    #[test]
    fn update_by_name_hits_first_match_only() {
        let mut store = ExerciseStore::new(MemoryKvStore::new(), ValidationPolicy::default());
        store.add(&draft("Dup", &[DayToken::Lun])).unwrap();
        store.add(&draft("Dup", &[DayToken::Mar])).unwrap();
        let mut changed = draft("Dup", &[DayToken::Ven]);
        changed.series = 5;
        store.update_by_name("Dup", &changed).unwrap();
        assert_eq!(store.exercises()[0].series, 5);
        assert_eq!(store.exercises()[0].id, ExerciseId(1));
        assert_eq!(store.exercises()[1].series, 3);
        assert!(matches!(
            store.update_by_name("Missing", &changed),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn find_by_id_or_name() {
        let mut store = ExerciseStore::new(MemoryKvStore::new(), ValidationPolicy::default());
        store.add(&draft("Squat", &[DayToken::Lun])).unwrap();
        assert_eq!(store.find("1").map(|r| r.name.as_str()), Some("Squat"));
        assert_eq!(store.find(" Squat ").map(|r| r.id), Some(ExerciseId(1)));
        assert!(store.find("2").is_none());
    }
}
