use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

// --- Declare modules ---
pub mod calendar;
mod config;
pub mod db;
pub mod exercise;
pub mod kv;
pub mod schedule;
pub mod session;
pub mod store;
pub mod timer;

// --- Expose public types ---
pub use calendar::{
    current_day_token, selectable_days, Clock, DayToken, FixedClock, SystemClock, UnknownDay,
    CANONICAL_ORDER,
};
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, Error as ConfigError, StandardColor, Theme,
    TimerDefaults, Units,
};
pub use db::{get_db_path as get_db_path_util, Error as DbError, SqliteKvStore};
pub use exercise::{
    append_slot, normalize_reps, normalize_weights, set_field_at_index, validate,
    DraftExercise, ExerciseId, ExerciseLimits, ExerciseRecord, IndexOutOfBounds, SetScheme,
    ValidationError, ValidationPolicy, MAX_STORED_SERIES,
};
pub use kv::{KeyValueStore, MemoryKvStore};
pub use session::{decide_entry_screen, EntryScreen, SessionFlags};
pub use store::{ExerciseStore, StoreError};
pub use timer::{
    remaining, Alarm, CountdownSetting, Remaining, RestTimer, TickOutcome, Ticker, TimerError,
    TimerMode,
};

/// Changes requested by `edit`. `None` keeps the stored value.
#[derive(Default, Debug, Clone)]
pub struct EditExerciseParams {
    pub identifier: String,
    pub new_name: Option<String>,
    pub new_days: Option<Vec<DayToken>>,
    pub new_series: Option<i64>,
    pub new_reps: Option<SetScheme<i64>>,
    pub new_weight: Option<SetScheme<f64>>,
    pub new_recovery: Option<i64>,
    /// Switch reps between one value and one value per set.
    pub multiple_reps: Option<bool>,
    pub multiple_weights: Option<bool>,
}

/// Values for a single set; `None` leaves that field alone.
#[derive(Default, Debug, Clone, Copy)]
pub struct SetValues {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
}

/// One day of the weekly summary.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub day: DayToken,
    pub exercises: Vec<ExerciseRecord>,
}

pub struct AppService<S: KeyValueStore = SqliteKvStore> {
    pub config: Config,
    pub store: ExerciseStore<S>,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub clock: Box<dyn Clock>,
}

impl AppService<SqliteKvStore> {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let kv = SqliteKvStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        let store = ExerciseStore::open(kv, config.validation_policy())
            .context("Failed to load saved exercises")?;

        Ok(Self {
            config,
            store,
            db_path,
            config_path,
            clock: Box::new(SystemClock),
        })
    }
}

impl<S: KeyValueStore> AppService<S> {
    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// Today's day token according to the service clock.
    pub fn today(&self) -> DayToken {
        current_day_token(self.clock.as_ref())
    }

    /// Days offered by pickers and the weekly summary.
    pub fn selectable_days(&self) -> Vec<DayToken> {
        selectable_days(self.config.include_sunday)
    }

    // --- Exercises ---

    pub fn list_exercises(&self) -> &[ExerciseRecord] {
        self.store.exercises()
    }

    /// Resolves an id or a name to a stored record.
    /// # Errors
    /// `StoreError::NotFound` if nothing matches.
    pub fn resolve(&self, identifier: &str) -> Result<&ExerciseRecord, StoreError> {
        self.store
            .find(identifier)
            .ok_or_else(|| StoreError::NotFound(identifier.trim().to_string()))
    }

    /// Validates and stores a new exercise, returning its id.
    /// # Errors
    /// `StoreError::Invalid` for a bad draft or a persistence error.
    pub fn add_exercise(&mut self, draft: &DraftExercise) -> Result<ExerciseId, StoreError> {
        let records = self.store.add(draft)?;
        Ok(records.last().map_or(ExerciseId::UNASSIGNED, |r| r.id))
    }

    /// Applies `params` to the exercise it names. Per-set toggles expand to the
    /// new set count when one is given; explicit reps/weight given in the same
    /// edit win over the toggles.
    /// # Errors
    /// `StoreError::NotFound`, `StoreError::Invalid`, or a persistence error.
    pub fn edit_exercise(&mut self, params: &EditExerciseParams) -> Result<&ExerciseRecord> {
        let mut current = self.resolve(&params.identifier)?.clone();
        let id = current.id;

        // Out-of-range counts are left for validation to report.
        let max_series = self.store.policy().max_series();
        if let Some(series) = params
            .new_series
            .and_then(|s| u32::try_from(s).ok())
            .filter(|s| (1..=max_series).contains(s))
        {
            current.series = series;
        }
        if let Some(multiple) = params.multiple_reps {
            current = normalize_reps(&current, multiple);
        }
        if let Some(multiple) = params.multiple_weights {
            current = normalize_weights(&current, multiple);
        }

        let mut draft = DraftExercise::from(&current);
        if let Some(name) = &params.new_name {
            draft.name.clone_from(name);
        }
        if let Some(days) = &params.new_days {
            draft.selected_days.clone_from(days);
        }
        if let Some(series) = params.new_series {
            draft.series = series;
        }
        if let Some(reps) = &params.new_reps {
            draft.reps = reps.clone();
        }
        if let Some(weight) = &params.new_weight {
            draft.weight = weight.clone();
        }
        if let Some(recovery) = params.new_recovery {
            draft.recovery = recovery;
        }

        self.store
            .update(id, &draft)
            .with_context(|| format!("Failed to update exercise '{}'", params.identifier))?;
        Ok(self.resolve(&id.to_string())?)
    }

    /// Overwrites one set of a per-set exercise.
    /// # Errors
    /// - Not found or persistence errors from the store.
    /// - `IndexOutOfBounds` when the set does not exist.
    /// - If the field is not per-set (toggle it with `edit` first).
    pub fn set_values_at(
        &mut self,
        identifier: &str,
        set_index: usize,
        values: SetValues,
    ) -> Result<&ExerciseRecord> {
        let current = self.resolve(identifier)?.clone();
        let mut draft = DraftExercise::from(&current);

        if let Some(reps) = values.reps {
            let SetScheme::PerSet(seq) = &draft.reps else {
                bail!("Reps of '{}' are not per set. Enable multiple reps first.", current.name);
            };
            draft.reps = SetScheme::PerSet(set_field_at_index(seq, set_index, i64::from(reps))?);
        }
        if let Some(weight) = values.weight {
            let SetScheme::PerSet(seq) = &draft.weight else {
                bail!(
                    "Weight of '{}' is not per set. Enable multiple weights first.",
                    current.name
                );
            };
            draft.weight = SetScheme::PerSet(set_field_at_index(seq, set_index, weight)?);
        }

        self.store.update(current.id, &draft)?;
        Ok(self.resolve(&current.id.to_string())?)
    }

    /// Adds one set at the end. Per-set fields get a new slot filled with the
    /// given value, or the previous last set's value.
    /// # Errors
    /// Not found, validation or persistence errors.
    pub fn add_set(&mut self, identifier: &str, values: SetValues) -> Result<&ExerciseRecord> {
        let current = self.resolve(identifier)?.clone();
        let mut draft = DraftExercise::from(&current);
        draft.series += 1;

        if let SetScheme::PerSet(seq) = &draft.reps {
            let fill = values
                .reps
                .map(i64::from)
                .or_else(|| seq.last().copied())
                .unwrap_or_default();
            let grown = append_slot(seq);
            draft.reps = SetScheme::PerSet(set_field_at_index(&grown, seq.len(), fill)?);
        }
        if let SetScheme::PerSet(seq) = &draft.weight {
            let fill = values
                .weight
                .or_else(|| seq.last().copied())
                .unwrap_or_default();
            let grown = append_slot(seq);
            draft.weight = SetScheme::PerSet(set_field_at_index(&grown, seq.len(), fill)?);
        }

        self.store.update(current.id, &draft)?;
        Ok(self.resolve(&current.id.to_string())?)
    }

    /// Deletes the exercise named by id or name.
    /// # Errors
    /// `StoreError::NotFound` or a persistence error.
    pub fn delete_exercise(&mut self, identifier: &str) -> Result<ExerciseRecord, StoreError> {
        let record = self.resolve(identifier)?.clone();
        self.store.delete(record.id)?;
        Ok(record)
    }

    /// Deletes the `index`-th exercise of the list shown for `day`.
    /// # Errors
    /// `StoreError::NotFound` or a persistence error.
    pub fn delete_by_day_and_index(
        &mut self,
        day: DayToken,
        index: usize,
    ) -> Result<ExerciseRecord, StoreError> {
        let record = schedule::for_day(self.store.exercises(), day)
            .get(index)
            .map(|r| (*r).clone())
            .ok_or_else(|| StoreError::NotFound(format!("{day} #{index}")))?;
        self.store.delete_by_day_and_index(day, index)?;
        Ok(record)
    }

    pub fn list_for_day(&self, day: DayToken) -> Vec<&ExerciseRecord> {
        schedule::for_day(self.store.exercises(), day)
    }

    pub fn list_today(&self) -> (DayToken, Vec<&ExerciseRecord>) {
        let today = self.today();
        (today, self.list_for_day(today))
    }

    /// Weekly plan grouped per selectable day, in calendar order.
    pub fn week_summary(&self) -> Vec<DaySummary> {
        let mut groups = schedule::group_by_day(self.store.exercises());
        self.selectable_days()
            .into_iter()
            .map(|day| DaySummary {
                day,
                exercises: groups
                    .remove(&day)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    // --- Session ---

    /// Decides the first screen and records the launch.
    /// # Errors
    /// Returns `DbError` if the launch flag cannot be written.
    pub fn begin_session(&mut self) -> Result<EntryScreen, DbError> {
        session::begin_session(self.store.backend_mut())
    }

    pub fn session_flags(&self) -> SessionFlags {
        SessionFlags::load(self.store.backend())
    }

    /// Marks the initial plan as complete.
    /// # Errors
    /// Fails when there are no exercises yet, or the flag cannot be written.
    pub fn finish_initial_setup(&mut self) -> Result<()> {
        if self.store.exercises().is_empty() {
            bail!("Add at least one exercise before finishing setup.");
        }
        session::mark_data_completed(self.store.backend_mut())
            .context("Failed to record completed setup")?;
        info!("Initial setup completed");
        Ok(())
    }

    /// Empties the plan and sends the next start back to the empty-data screen.
    /// # Errors
    /// Persistence errors from the store or the flag backend.
    pub fn clear_plan(&mut self) -> Result<()> {
        self.store.clear_all().context("Failed to clear exercises")?;
        session::reset_data_completed(self.store.backend_mut())
            .context("Failed to reset setup flag")?;
        Ok(())
    }

    /// Wipes every stored key, session flags included.
    /// # Errors
    /// Persistence errors from the backend.
    pub fn reset_all(&mut self) -> Result<()> {
        self.store
            .backend_mut()
            .clear()
            .context("Failed to wipe storage")?;
        self.store.load_all().context("Failed to reload exercises")?;
        info!("All stored data wiped");
        Ok(())
    }

    // --- Timer ---

    /// Countdown from the configured default.
    /// # Errors
    /// `ConfigError::InvalidTimer` for out-of-range defaults.
    pub fn default_countdown(&self) -> Result<CountdownSetting, ConfigError> {
        self.config.timer.setting()
    }

    /// Countdown matching an exercise's recovery time.
    /// # Errors
    /// Not found, or a recovery longer than the picker allows.
    pub fn countdown_for(&self, identifier: &str) -> Result<CountdownSetting> {
        let record = self.resolve(identifier)?;
        CountdownSetting::from_total_seconds(record.recovery).with_context(|| {
            format!(
                "Recovery of '{}' ({}s) does not fit the timer",
                record.name, record.recovery
            )
        })
    }
}
