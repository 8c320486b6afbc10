//! Settings and play records persisted as one JSON blob.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use chrono::NaiveDate;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::games::GameId;

pub const STORAGE_KEY: &str = "asd_eye_training_game";
pub const STORAGE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Speed {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Speed {
    pub const ALL: [Speed; 3] = [Speed::Slow, Speed::Medium, Speed::Fast];

    /// Rail speed factor; the base lap takes 8 s at 1.0.
    pub fn multiplier(self) -> f64 {
        match self {
            Speed::Slow => 0.25,
            Speed::Medium => 0.5,
            Speed::Fast => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Speed::Slow => "Slow",
            Speed::Medium => "Medium",
            Speed::Fast => "Fast",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThemeName {
    #[default]
    White,
    Black,
    Sepia,
    Gray,
}

impl ThemeName {
    pub const ALL: [ThemeName; 4] = [
        ThemeName::White,
        ThemeName::Black,
        ThemeName::Sepia,
        ThemeName::Gray,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ThemeName::White => "white",
            ThemeName::Black => "black",
            ThemeName::Sepia => "sepia",
            ThemeName::Gray => "gray",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeName::White => "White",
            ThemeName::Black => "Black",
            ThemeName::Sepia => "Sepia",
            ThemeName::Gray => "Gray",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSize {
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 2] = [FontSize::Medium, FontSize::Large];

    pub fn key(self) -> &'static str {
        match self {
            FontSize::Medium => "medium",
            FontSize::Large => "large",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FontSize::Medium => "Normal",
            FontSize::Large => "Large",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Contrast {
    Low,
    #[default]
    Medium,
    High,
}

impl Contrast {
    pub const ALL: [Contrast; 3] = [Contrast::Low, Contrast::Medium, Contrast::High];

    pub fn key(self) -> &'static str {
        match self {
            Contrast::Low => "low",
            Contrast::Medium => "medium",
            Contrast::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Contrast::Low => "Soft",
            Contrast::Medium => "Normal",
            Contrast::High => "Strong",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RailType {
    #[default]
    Straight,
    SCurve,
    Circle,
}

impl RailType {
    pub const ALL: [RailType; 3] = [RailType::Straight, RailType::SCurve, RailType::Circle];

    pub fn label(self) -> &'static str {
        match self {
            RailType::Straight => "Straight",
            RailType::SCurve => "S-curve",
            RailType::Circle => "Circle",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeLimit {
    Short,
    #[default]
    Medium,
    Unlimited,
}

impl TimeLimit {
    pub const ALL: [TimeLimit; 3] = [TimeLimit::Short, TimeLimit::Medium, TimeLimit::Unlimited];

    pub fn seconds(self) -> Option<f64> {
        match self {
            TimeLimit::Short => Some(30.0),
            TimeLimit::Medium => Some(60.0),
            TimeLimit::Unlimited => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeLimit::Short => "30 s",
            TimeLimit::Medium => "60 s",
            TimeLimit::Unlimited => "No limit",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Square grid side for row reading.
    pub fn grid_side(self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Normal => 4,
            Difficulty::Hard => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy (3×3)",
            Difficulty::Normal => "Normal (4×4)",
            Difficulty::Hard => "Hard (5×5)",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pattern {
    #[default]
    Horizontal,
    Vertical,
    CenterCross,
    Random,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [
        Pattern::Horizontal,
        Pattern::Vertical,
        Pattern::CenterCross,
        Pattern::Random,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Pattern::Horizontal => "Left / right",
            Pattern::Vertical => "Up / down",
            Pattern::CenterCross => "Through the centre",
            Pattern::Random => "Random",
        }
    }
}

pub const DEFAULT_ROUNDS: u32 = 10;

/// Every field falls back to its default when missing from the saved blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub speed: Speed,
    pub guide: bool,
    pub sound: bool,
    pub theme: ThemeName,
    pub font_size: FontSize,
    pub contrast: Contrast,
    pub rail_type: RailType,
    pub time_limit: TimeLimit,
    pub difficulty: Difficulty,
    pub pattern: Pattern,
    #[serde(rename = "totalRounds")]
    pub rounds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: Speed::Medium,
            guide: true,
            sound: false,
            theme: ThemeName::White,
            font_size: FontSize::Medium,
            contrast: Contrast::Medium,
            rail_type: RailType::Straight,
            time_limit: TimeLimit::Medium,
            difficulty: Difficulty::Normal,
            pattern: Pattern::Horizontal,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameRecord {
    pub play_count: u32,
    pub best_score: Option<u32>,
    pub last_score: Option<u32>,
    pub last_accuracy: Option<u32>,
    pub last_time_secs: Option<u32>,
    pub interrupted: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Records {
    pub consecutive_days: u32,
    pub total_sessions: u32,
    pub last_played_game: Option<GameId>,
    pub last_played_date: Option<NaiveDate>,
    pub game_records: BTreeMap<GameId, GameRecord>,
}

/// What a finished (or abandoned) session contributes to the records.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionData {
    pub score: Option<u32>,
    pub accuracy: Option<u32>,
    pub time_secs: Option<u32>,
    pub interrupted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedData {
    pub version: u32,
    pub settings: Settings,
    pub records: Records,
}

impl Default for PersistedData {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            settings: Settings::default(),
            records: Records::default(),
        }
    }
}

/// Lays every saved field that decodes on its own over the defaults, so one
/// bad value costs only that value.
fn merge_fields<T>(saved: Value, section: &str) -> T
where
    T: Default + Serialize + DeserializeOwned,
{
    let Value::Object(fields) = saved else {
        if !saved.is_null() {
            warn!("saved {} is not an object, using defaults", section);
        }
        return T::default();
    };
    let Ok(mut merged) = serde_json::to_value(T::default()) else {
        return T::default();
    };
    for (key, value) in fields {
        let mut trial = merged.clone();
        if let Value::Object(map) = &mut trial {
            map.insert(key.clone(), value);
        }
        match serde_json::from_value::<T>(trial.clone()) {
            Ok(_) => merged = trial,
            Err(e) => warn!("saved {}.{} unreadable, keeping default: {}", section, key, e),
        }
    }
    serde_json::from_value(merged).unwrap_or_default()
}

/// Keeps the per-game entries whose id is known, each merged field by field.
fn merge_game_records(saved: Value) -> Value {
    let Value::Object(entries) = saved else {
        return Value::Null;
    };
    let kept: serde_json::Map<String, Value> = entries
        .into_iter()
        .filter_map(|(id, record)| {
            if serde_json::from_value::<GameId>(Value::String(id.clone())).is_err() {
                warn!("dropping record for unknown game {:?}", id);
                return None;
            }
            let record: GameRecord = merge_fields(record, "game record");
            serde_json::to_value(record).ok().map(|v| (id, v))
        })
        .collect();
    Value::Object(kept)
}

impl PersistedData {
    /// Lenient decode merged over the defaults. Also returns the version found.
    fn from_value(value: Value) -> (Self, u32) {
        let version = value
            .get("version")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(0);
        let section = |name: &str| value.get(name).cloned().unwrap_or(Value::Null);
        let settings = merge_fields(section("settings"), "settings");
        let mut saved_records = section("records");
        if let Some(games) = saved_records.get_mut("gameRecords") {
            *games = merge_game_records(games.take());
        }
        let records = merge_fields(saved_records, "records");
        (
            Self {
                version: STORAGE_VERSION,
                settings,
                records,
            },
            version,
        )
    }
}

/// Where the blob lives.
pub trait StorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .ok_or(AppError::Missing("window"))?
            .local_storage()?
            .ok_or(AppError::Missing("localStorage"))
    }
}

impl StorageBackend for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(Self::storage()?.get_item(key)?)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        Ok(Self::storage()?.set_item(key, value)?)
    }
}

/// In-memory backend; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value);
        Ok(())
    }
}

pub struct Store<B: StorageBackend = LocalStorage> {
    backend: B,
    data: PersistedData,
}

impl<B: StorageBackend> Store<B> {
    pub fn load(backend: B) -> Self {
        let data = match backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    let (data, found_version) = PersistedData::from_value(value);
                    if found_version != STORAGE_VERSION {
                        info!(
                            "migrating saved data from version {} to {}",
                            found_version, STORAGE_VERSION
                        );
                        Self::write(&backend, &data);
                    }
                    data
                }
                Err(e) => {
                    warn!("saved data is not valid JSON, starting fresh: {}", e);
                    PersistedData::default()
                }
            },
            Ok(None) => PersistedData::default(),
            Err(e) => {
                warn!("could not read saved data: {}", e);
                PersistedData::default()
            }
        };
        Self { backend, data }
    }

    fn write(backend: &B, data: &PersistedData) {
        let result = serde_json::to_string(data)
            .map_err(AppError::from)
            .and_then(|json| backend.write(STORAGE_KEY, &json));
        if let Err(e) = result {
            error!("could not save data: {}", e);
        }
    }

    pub fn save(&self) {
        Self::write(&self.backend, &self.data);
    }

    pub fn data(&self) -> &PersistedData {
        &self.data
    }

    pub fn settings(&self) -> &Settings {
        &self.data.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.data.settings = settings;
        self.save();
    }

    pub fn update_settings(&mut self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.data.settings);
        self.save();
    }

    pub fn records(&self) -> &Records {
        &self.data.records
    }

    pub fn game_record(&self, game: GameId) -> Option<&GameRecord> {
        self.data.records.game_records.get(&game)
    }

    /// Books one session for `game` on `today` and returns the updated record.
    pub fn record_session(&mut self, game: GameId, session: SessionData, today: NaiveDate) -> GameRecord {
        let records = &mut self.data.records;
        records.consecutive_days = match records.last_played_date {
            None => 1,
            Some(last) => match (today - last).num_days() {
                1 => records.consecutive_days + 1,
                d if d > 1 => 1,
                _ => records.consecutive_days.max(1),
            },
        };
        records.total_sessions += 1;
        records.last_played_game = Some(game);
        records.last_played_date = Some(today);

        let entry = records.game_records.entry(game).or_default();
        entry.play_count += 1;
        if let Some(score) = session.score {
            entry.last_score = Some(score);
            if entry.best_score.is_none_or(|best| score > best) {
                entry.best_score = Some(score);
            }
        }
        if session.accuracy.is_some() {
            entry.last_accuracy = session.accuracy;
        }
        if session.time_secs.is_some() {
            entry.last_time_secs = session.time_secs;
        }
        entry.interrupted = session.interrupted;
        let updated = entry.clone();
        self.save();
        updated
    }

    pub fn reset(&mut self) {
        self.data = PersistedData::default();
        self.save();
    }

    pub fn reset_settings(&mut self) {
        self.data.settings = Settings::default();
        self.save();
    }

    pub fn reset_records(&mut self) {
        self.data.records = Records::default();
        self.save();
    }

    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Replaces everything with `json`, merged over defaults.
    pub fn import(&mut self, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;
        let (data, _) = PersistedData::from_value(value);
        self.data = data;
        self.save();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scored(score: u32) -> SessionData {
        SessionData {
            score: Some(score),
            accuracy: Some(80),
            time_secs: Some(30),
            interrupted: false,
        }
    }

    #[test]
    fn settings_survive_a_reload() {
        let mem = MemoryStorage::default();
        let mut store = Store::load(mem.clone());
        store.update_settings(|s| {
            s.theme = ThemeName::Sepia;
            s.speed = Speed::Fast;
            s.sound = true;
            s.rail_type = RailType::Circle;
        });
        let expected = store.settings().clone();

        let reloaded = Store::load(mem);
        assert_eq!(reloaded.settings(), &expected);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mem = MemoryStorage::default();
        mem.set(
            STORAGE_KEY,
            r#"{"version":1,"settings":{"theme":"black"},"records":{"totalSessions":4}}"#,
        );
        let store = Store::load(mem);
        assert_eq!(store.settings().theme, ThemeName::Black);
        assert!(store.settings().guide);
        assert_eq!(store.settings().rounds, DEFAULT_ROUNDS);
        assert_eq!(store.records().total_sessions, 4);
    }

    #[test]
    fn malformed_json_gives_defaults() {
        let mem = MemoryStorage::default();
        mem.set(STORAGE_KEY, "{not json");
        let store = Store::load(mem);
        assert_eq!(store.data(), &PersistedData::default());
    }

    #[test]
    fn old_version_is_migrated_and_saved() {
        let mem = MemoryStorage::default();
        mem.set(STORAGE_KEY, r#"{"version":0,"settings":{"contrast":"high"}}"#);
        let store = Store::load(mem.clone());
        assert_eq!(store.settings().contrast, Contrast::High);
        assert_eq!(store.data().version, STORAGE_VERSION);

        let raw = mem.get(STORAGE_KEY).unwrap();
        assert!(raw.contains("\"version\":1"));
    }

    #[test]
    fn bad_settings_field_keeps_the_rest() {
        let mem = MemoryStorage::default();
        mem.set(
            STORAGE_KEY,
            r#"{"version":1,"settings":{"theme":"neon","speed":"fast","contrast":"high","fontSize":"large","totalRounds":"many"},"records":{"totalSessions":2}}"#,
        );
        let store = Store::load(mem);
        let s = store.settings();
        assert_eq!(s.theme, ThemeName::White);
        assert_eq!(s.rounds, DEFAULT_ROUNDS);
        assert_eq!(s.speed, Speed::Fast);
        assert_eq!(s.contrast, Contrast::High);
        assert_eq!(s.font_size, FontSize::Large);
        assert_eq!(store.records().total_sessions, 2);
    }

    #[test]
    fn unknown_game_record_is_skipped() {
        let mem = MemoryStorage::default();
        mem.set(
            STORAGE_KEY,
            r#"{"version":1,"records":{"consecutiveDays":12,"totalSessions":40,"lastPlayedDate":"someday","gameRecords":{"gameA":{"playCount":3},"rail":{"playCount":5,"bestScore":"lots"}}}}"#,
        );
        let store = Store::load(mem);
        let r = store.records();
        assert_eq!(r.consecutive_days, 12);
        assert_eq!(r.total_sessions, 40);
        assert_eq!(r.last_played_date, None);
        assert_eq!(r.game_records.len(), 1);
        let rail = store.game_record(GameId::Rail).cloned().unwrap_or_default();
        assert_eq!(rail.play_count, 5);
        assert_eq!(rail.best_score, None);
    }

    #[test]
    fn non_object_section_gives_defaults() {
        let mem = MemoryStorage::default();
        mem.set(STORAGE_KEY, r#"{"version":1,"settings":5,"records":{"totalSessions":1}}"#);
        let store = Store::load(mem);
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.records().total_sessions, 1);
    }

    #[test]
    fn consecutive_days() {
        let mut store = Store::load(MemoryStorage::default());
        store.record_session(GameId::Rail, scored(1), day(2024, 3, 1));
        assert_eq!(store.records().consecutive_days, 1);

        store.record_session(GameId::Rail, scored(1), day(2024, 3, 1));
        assert_eq!(store.records().consecutive_days, 1);

        store.record_session(GameId::ReadLine, scored(1), day(2024, 3, 2));
        store.record_session(GameId::ReadLine, scored(1), day(2024, 3, 3));
        assert_eq!(store.records().consecutive_days, 3);

        store.record_session(GameId::Rail, scored(1), day(2024, 3, 6));
        assert_eq!(store.records().consecutive_days, 1);
        assert_eq!(store.records().total_sessions, 5);
        assert_eq!(store.records().last_played_game, Some(GameId::Rail));
        assert_eq!(store.records().last_played_date, Some(day(2024, 3, 6)));
    }

    #[test]
    fn best_score_only_goes_up() {
        let mut store = Store::load(MemoryStorage::default());
        let today = day(2024, 5, 5);
        store.record_session(GameId::PredictSaccade, scored(7), today);
        store.record_session(GameId::PredictSaccade, scored(4), today);
        let rec = store.record_session(GameId::PredictSaccade, scored(9), today);
        assert_eq!(rec.play_count, 3);
        assert_eq!(rec.best_score, Some(9));
        assert_eq!(rec.last_score, Some(9));

        let interrupted = store.record_session(
            GameId::PredictSaccade,
            SessionData {
                time_secs: Some(12),
                interrupted: true,
                ..SessionData::default()
            },
            today,
        );
        assert_eq!(interrupted.best_score, Some(9));
        assert_eq!(interrupted.last_time_secs, Some(12));
        assert!(interrupted.interrupted);
    }

    #[test]
    fn resets_and_import_export() {
        let mut store = Store::load(MemoryStorage::default());
        store.update_settings(|s| s.font_size = FontSize::Large);
        store.record_session(GameId::Rail, scored(3), day(2024, 1, 1));

        let dump = store.export().unwrap();
        assert!(dump.contains("\"fontSize\": \"large\""));
        assert!(dump.contains("\"rail\""));

        store.reset_settings();
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.records().total_sessions, 1);

        store.reset_records();
        assert_eq!(store.records(), &Records::default());

        store.import(&dump).unwrap();
        assert_eq!(store.settings().font_size, FontSize::Large);
        assert_eq!(store.game_record(GameId::Rail).map(|r| r.best_score), Some(Some(3)));

        assert!(store.import("nope").is_err());
        store.reset();
        assert_eq!(store.data(), &PersistedData::default());
    }
}
