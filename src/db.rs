use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::{fold_allergen_name, AllergenMatch, AnalysisOutcome, IngredientMatch, Severity};
use crate::settings::{Theme, UserSettings};

/// A user's profile and declared allergens
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Names as the user typed them; folded only when compared
    pub personal_allergens: Vec<String>,
    pub severity_preferences: HashMap<String, Severity>,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Profile fields written by `/setup` and onboarding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub personal_allergens: Vec<String>,
    pub severity_preferences: HashMap<String, Severity>,
}

/// A stored scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub id: i64,
    pub telegram_id: i64,
    pub scanned_at: DateTime<Utc>,
    pub full_text: String,
    /// Telegram file id of the scanned photo, if it came from one
    pub image_ref: Option<String>,
    pub ingredients: Vec<IngredientMatch>,
    pub allergens: Vec<AllergenMatch>,
    pub has_allergens: bool,
    pub has_personal_allergens: bool,
    pub personal_allergens_found: Vec<String>,
}

const PROFILE_COLUMNS: &str = "id, telegram_id, first_name, last_name, email, personal_allergens, severity_preferences, onboarding_completed, created_at, updated_at";

const SETTINGS_COLUMNS: &str = "notifications_enabled, sound_enabled, vibration_enabled, auto_save_scans, warning_threshold, language, theme";

const SCAN_COLUMNS: &str = "id, telegram_id, scanned_at, full_text, image_ref, ingredients, allergens, has_allergens, has_personal_allergens, personal_allergens_found";

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_profiles (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            first_name VARCHAR(100) NOT NULL DEFAULT '',
            last_name VARCHAR(100) NOT NULL DEFAULT '',
            email VARCHAR(255) NOT NULL DEFAULT '',
            personal_allergens TEXT[] NOT NULL DEFAULT '{}',
            severity_preferences TEXT NOT NULL DEFAULT '{}',
            onboarding_completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create user_profiles table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_settings (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            sound_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            vibration_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            auto_save_scans BOOLEAN NOT NULL DEFAULT TRUE,
            warning_threshold VARCHAR(10) NOT NULL DEFAULT 'MEDIUM',
            language VARCHAR(10) NOT NULL DEFAULT 'ro',
            theme VARCHAR(10) NOT NULL DEFAULT 'SYSTEM',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create user_settings table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS scan_history (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL,
            scanned_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            full_text TEXT NOT NULL,
            image_ref TEXT,
            ingredients TEXT NOT NULL DEFAULT '[]',
            allergens TEXT NOT NULL DEFAULT '[]',
            has_allergens BOOLEAN NOT NULL DEFAULT FALSE,
            has_personal_allergens BOOLEAN NOT NULL DEFAULT FALSE,
            personal_allergens_found TEXT[] NOT NULL DEFAULT '{}'
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create scan_history table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS scan_history_owner_time_idx ON scan_history(telegram_id, scanned_at DESC)",
    )
    .execute(pool)
    .await
    .context("Failed to create scan_history owner index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn profile_from_row(row: &PgRow) -> Result<UserProfile> {
    let preferences: String = row.get(6);
    let severity_preferences = serde_json::from_str(&preferences)
        .context("Failed to decode severity preferences")?;

    Ok(UserProfile {
        id: row.get(0),
        telegram_id: row.get(1),
        first_name: row.get(2),
        last_name: row.get(3),
        email: row.get(4),
        personal_allergens: row.get(5),
        severity_preferences,
        onboarding_completed: row.get(7),
        created_at: row.get(8),
        updated_at: row.get(9),
    })
}

fn settings_from_row(row: &PgRow, telegram_id: i64) -> UserSettings {
    let threshold: String = row.get(4);
    let theme: String = row.get(6);

    UserSettings {
        notifications_enabled: row.get(0),
        sound_enabled: row.get(1),
        vibration_enabled: row.get(2),
        auto_save_scans: row.get(3),
        warning_threshold: threshold.parse().unwrap_or_else(|_| {
            warn!(telegram_id, value = %threshold, "Unknown stored warning threshold, using default");
            Severity::default()
        }),
        language: row.get(5),
        theme: theme.parse().unwrap_or_else(|_| {
            warn!(telegram_id, value = %theme, "Unknown stored theme, using default");
            Theme::default()
        }),
    }
}

fn scan_from_row(row: &PgRow) -> Result<ScanRecord> {
    let ingredients: String = row.get(5);
    let allergens: String = row.get(6);

    Ok(ScanRecord {
        id: row.get(0),
        telegram_id: row.get(1),
        scanned_at: row.get(2),
        full_text: row.get(3),
        image_ref: row.get(4),
        ingredients: serde_json::from_str(&ingredients)
            .context("Failed to decode stored ingredients")?,
        allergens: serde_json::from_str(&allergens).context("Failed to decode stored allergens")?,
        has_allergens: row.get(7),
        has_personal_allergens: row.get(8),
        personal_allergens_found: row.get(9),
    })
}

fn scans_from_rows(rows: Vec<PgRow>) -> Result<Vec<ScanRecord>> {
    rows.iter().map(scan_from_row).collect()
}

/// Case-insensitive dedupe keeping the first spelling of each name
fn dedupe_allergens(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(fold_allergen_name(name)))
        .collect()
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Get a profile by Telegram ID
pub async fn get_profile(pool: &PgPool, telegram_id: i64) -> Result<Option<UserProfile>> {
    debug!(telegram_id = %telegram_id, "Getting profile");

    let row = sqlx::query(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE telegram_id = $1"
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by telegram_id")?;

    row.as_ref().map(profile_from_row).transpose()
}

/// Get a profile, creating an empty one on first contact
pub async fn get_or_create_profile(pool: &PgPool, telegram_id: i64) -> Result<UserProfile> {
    if let Some(profile) = get_profile(pool, telegram_id).await? {
        return Ok(profile);
    }

    debug!(telegram_id = %telegram_id, "Creating empty profile");
    let row = sqlx::query(&format!(
        "INSERT INTO user_profiles (telegram_id) VALUES ($1)
         ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(telegram_id)
    .fetch_one(pool)
    .await
    .context("Failed to create profile")?;

    profile_from_row(&row)
}

/// Insert or replace the profile fields for `telegram_id`
pub async fn upsert_profile(
    pool: &PgPool,
    telegram_id: i64,
    details: &ProfileDetails,
) -> Result<UserProfile> {
    debug!(telegram_id = %telegram_id, "Upserting profile");
    let start = Instant::now();

    let preferences = serde_json::to_string(&details.severity_preferences)
        .context("Failed to encode severity preferences")?;

    let row = sqlx::query(&format!(
        "INSERT INTO user_profiles (telegram_id, first_name, last_name, email, personal_allergens, severity_preferences)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (telegram_id) DO UPDATE SET
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            email = EXCLUDED.email,
            personal_allergens = EXCLUDED.personal_allergens,
            severity_preferences = EXCLUDED.severity_preferences,
            updated_at = CURRENT_TIMESTAMP
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(telegram_id)
    .bind(&details.first_name)
    .bind(&details.last_name)
    .bind(&details.email)
    .bind(dedupe_allergens(&details.personal_allergens))
    .bind(preferences)
    .fetch_one(pool)
    .await
    .context("Failed to upsert profile")?;

    crate::observability::record_db_metrics("upsert_profile", start.elapsed());
    profile_from_row(&row)
}

/// Replace the personal allergen list
pub async fn update_personal_allergens(
    pool: &PgPool,
    telegram_id: i64,
    allergens: &[String],
) -> Result<Vec<String>> {
    debug!(telegram_id = %telegram_id, count = allergens.len(), "Updating personal allergens");

    get_or_create_profile(pool, telegram_id).await?;

    let row = sqlx::query(
        "UPDATE user_profiles SET personal_allergens = $2, updated_at = CURRENT_TIMESTAMP
         WHERE telegram_id = $1 RETURNING personal_allergens",
    )
    .bind(telegram_id)
    .bind(dedupe_allergens(allergens))
    .fetch_one(pool)
    .await
    .context("Failed to update personal allergens")?;

    Ok(row.get(0))
}

/// Add one allergen unless an entry with the same folded name exists
///
/// Returns `true` when the list changed.
pub async fn add_personal_allergen(pool: &PgPool, telegram_id: i64, allergen: &str) -> Result<bool> {
    let allergen = allergen.trim();
    get_or_create_profile(pool, telegram_id).await?;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(
        "SELECT personal_allergens FROM user_profiles WHERE telegram_id = $1 FOR UPDATE",
    )
    .bind(telegram_id)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to lock profile for allergen update")?;
    let mut current: Vec<String> = row.get(0);

    let folded = fold_allergen_name(allergen);
    if current.iter().any(|existing| fold_allergen_name(existing) == folded) {
        debug!(telegram_id = %telegram_id, allergen = %allergen, "Allergen already on profile");
        return Ok(false);
    }
    current.push(allergen.to_string());

    sqlx::query(
        "UPDATE user_profiles SET personal_allergens = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .bind(&current)
    .execute(&mut *tx)
    .await
    .context("Failed to add personal allergen")?;

    tx.commit().await.context("Failed to commit allergen update")?;
    info!(telegram_id = %telegram_id, allergen = %allergen, "Personal allergen added");
    Ok(true)
}

/// Remove every entry whose folded name equals `allergen`
///
/// Returns `true` when something was removed.
pub async fn remove_personal_allergen(
    pool: &PgPool,
    telegram_id: i64,
    allergen: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(
        "SELECT personal_allergens FROM user_profiles WHERE telegram_id = $1 FOR UPDATE",
    )
    .bind(telegram_id)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to lock profile for allergen removal")?;

    let Some(row) = row else {
        return Ok(false);
    };
    let current: Vec<String> = row.get(0);

    let folded = fold_allergen_name(allergen);
    let remaining: Vec<String> = current
        .iter()
        .filter(|existing| fold_allergen_name(existing) != folded)
        .cloned()
        .collect();

    if remaining.len() == current.len() {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE user_profiles SET personal_allergens = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .bind(&remaining)
    .execute(&mut *tx)
    .await
    .context("Failed to remove personal allergen")?;

    tx.commit().await.context("Failed to commit allergen removal")?;
    info!(telegram_id = %telegram_id, allergen = %allergen, "Personal allergen removed");
    Ok(true)
}

/// Mark onboarding as finished (or not)
pub async fn set_onboarding_completed(
    pool: &PgPool,
    telegram_id: i64,
    completed: bool,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE user_profiles SET onboarding_completed = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .bind(completed)
    .execute(pool)
    .await
    .context("Failed to update onboarding flag")?;

    Ok(result.rows_affected() > 0)
}

/// The user's personal allergens; empty when no profile exists
pub async fn get_personal_allergens(pool: &PgPool, telegram_id: i64) -> Result<Vec<String>> {
    let start = Instant::now();
    let row = sqlx::query("SELECT personal_allergens FROM user_profiles WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read personal allergens")?;
    crate::observability::record_db_metrics("get_personal_allergens", start.elapsed());

    Ok(row.map(|row| row.get(0)).unwrap_or_default())
}

/// Create or replace the profile and default settings in one transaction
///
/// Onboarding is marked complete. Existing settings are left untouched.
pub async fn initialize_new_user(
    pool: &PgPool,
    telegram_id: i64,
    details: &ProfileDetails,
    language: &str,
) -> Result<UserProfile> {
    info!(telegram_id = %telegram_id, "Initializing user profile and settings");

    let preferences = serde_json::to_string(&details.severity_preferences)
        .context("Failed to encode severity preferences")?;
    let defaults = UserSettings::with_language(language);

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(&format!(
        "INSERT INTO user_profiles (telegram_id, first_name, last_name, email, personal_allergens, severity_preferences, onboarding_completed)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE)
         ON CONFLICT (telegram_id) DO UPDATE SET
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            email = EXCLUDED.email,
            personal_allergens = EXCLUDED.personal_allergens,
            severity_preferences = EXCLUDED.severity_preferences,
            onboarding_completed = TRUE,
            updated_at = CURRENT_TIMESTAMP
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(telegram_id)
    .bind(&details.first_name)
    .bind(&details.last_name)
    .bind(&details.email)
    .bind(dedupe_allergens(&details.personal_allergens))
    .bind(preferences)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to write profile during initialization")?;

    sqlx::query(
        "INSERT INTO user_settings (telegram_id, notifications_enabled, sound_enabled, vibration_enabled, auto_save_scans, warning_threshold, language, theme)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (telegram_id) DO NOTHING",
    )
    .bind(telegram_id)
    .bind(defaults.notifications_enabled)
    .bind(defaults.sound_enabled)
    .bind(defaults.vibration_enabled)
    .bind(defaults.auto_save_scans)
    .bind(defaults.warning_threshold.as_str())
    .bind(&defaults.language)
    .bind(defaults.theme.as_str())
    .execute(&mut *tx)
    .await
    .context("Failed to write default settings during initialization")?;

    tx.commit().await.context("Failed to commit user initialization")?;

    profile_from_row(&row)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Get stored settings, if any
pub async fn get_settings(pool: &PgPool, telegram_id: i64) -> Result<Option<UserSettings>> {
    debug!(telegram_id = %telegram_id, "Getting settings");

    let row = sqlx::query(&format!(
        "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE telegram_id = $1"
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get settings")?;

    Ok(row.map(|row| settings_from_row(&row, telegram_id)))
}

/// Get settings, storing defaults in `default_language` on first use
pub async fn get_or_create_settings(
    pool: &PgPool,
    telegram_id: i64,
    default_language: &str,
) -> Result<UserSettings> {
    if let Some(settings) = get_settings(pool, telegram_id).await? {
        return Ok(settings);
    }

    let defaults = UserSettings::with_language(default_language);
    update_settings(pool, telegram_id, &defaults).await?;
    Ok(defaults)
}

/// Insert or replace all settings for `telegram_id`
pub async fn update_settings(pool: &PgPool, telegram_id: i64, settings: &UserSettings) -> Result<()> {
    debug!(telegram_id = %telegram_id, "Updating settings");

    sqlx::query(
        "INSERT INTO user_settings (telegram_id, notifications_enabled, sound_enabled, vibration_enabled, auto_save_scans, warning_threshold, language, theme)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (telegram_id) DO UPDATE SET
            notifications_enabled = EXCLUDED.notifications_enabled,
            sound_enabled = EXCLUDED.sound_enabled,
            vibration_enabled = EXCLUDED.vibration_enabled,
            auto_save_scans = EXCLUDED.auto_save_scans,
            warning_threshold = EXCLUDED.warning_threshold,
            language = EXCLUDED.language,
            theme = EXCLUDED.theme,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(telegram_id)
    .bind(settings.notifications_enabled)
    .bind(settings.sound_enabled)
    .bind(settings.vibration_enabled)
    .bind(settings.auto_save_scans)
    .bind(settings.warning_threshold.as_str())
    .bind(&settings.language)
    .bind(settings.theme.as_str())
    .execute(pool)
    .await
    .context("Failed to update settings")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Scan history
// ---------------------------------------------------------------------------

/// Store a finished analysis and return the new row id
pub async fn save_scan(
    pool: &PgPool,
    telegram_id: i64,
    outcome: &AnalysisOutcome,
    image_ref: Option<&str>,
) -> Result<i64> {
    debug!(telegram_id = %telegram_id, "Saving scan");
    let start = Instant::now();

    let ingredients =
        serde_json::to_string(&outcome.ingredients).context("Failed to encode ingredients")?;
    let allergens =
        serde_json::to_string(&outcome.allergens).context("Failed to encode allergens")?;

    let row = sqlx::query(
        "INSERT INTO scan_history (telegram_id, full_text, image_ref, ingredients, allergens, has_allergens, has_personal_allergens, personal_allergens_found)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(telegram_id)
    .bind(&outcome.source_text)
    .bind(image_ref)
    .bind(ingredients)
    .bind(allergens)
    .bind(outcome.has_allergens())
    .bind(outcome.personal_match_detected)
    .bind(&outcome.personal_match_names)
    .fetch_one(pool)
    .await
    .context("Failed to insert scan")?;

    let scan_id: i64 = row.get(0);
    crate::observability::record_db_metrics("save_scan", start.elapsed());
    debug!(scan_id = %scan_id, "Scan saved successfully");

    Ok(scan_id)
}

/// Get one of the user's scans
pub async fn get_scan(pool: &PgPool, telegram_id: i64, scan_id: i64) -> Result<Option<ScanRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {SCAN_COLUMNS} FROM scan_history WHERE id = $1 AND telegram_id = $2"
    ))
    .bind(scan_id)
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read scan")?;

    row.as_ref().map(scan_from_row).transpose()
}

/// The user's scans, newest first, skipping the `offset` newest
pub async fn list_scans(
    pool: &PgPool,
    telegram_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ScanRecord>> {
    debug!(telegram_id = %telegram_id, limit, offset, "Listing scans");
    let start = Instant::now();

    let rows = sqlx::query(&format!(
        "SELECT {SCAN_COLUMNS} FROM scan_history WHERE telegram_id = $1
         ORDER BY scanned_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(telegram_id)
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .context("Failed to list scans")?;

    crate::observability::record_db_metrics("list_scans", start.elapsed());
    scans_from_rows(rows)
}

/// Escape LIKE wildcards so the query matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Scans whose full text contains `query`, case-insensitively, newest first
pub async fn search_scans(
    pool: &PgPool,
    telegram_id: i64,
    query: &str,
    limit: i64,
) -> Result<Vec<ScanRecord>> {
    info!(telegram_id = %telegram_id, query = %query, "Searching scans");

    let rows = sqlx::query(&format!(
        "SELECT {SCAN_COLUMNS} FROM scan_history
         WHERE telegram_id = $1 AND full_text ILIKE $2 ESCAPE '\\'
         ORDER BY scanned_at DESC, id DESC LIMIT $3"
    ))
    .bind(telegram_id)
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search scans")?;

    let scans = scans_from_rows(rows)?;
    info!("Found {} scans matching query", scans.len());
    Ok(scans)
}

/// Scans in which any allergen was detected, newest first
pub async fn list_scans_with_allergens(
    pool: &PgPool,
    telegram_id: i64,
    limit: i64,
) -> Result<Vec<ScanRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {SCAN_COLUMNS} FROM scan_history
         WHERE telegram_id = $1 AND has_allergens = TRUE
         ORDER BY scanned_at DESC, id DESC LIMIT $2"
    ))
    .bind(telegram_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list scans with allergens")?;

    scans_from_rows(rows)
}

/// Scans that matched the user's personal allergens, newest first
pub async fn list_scans_with_personal_allergens(
    pool: &PgPool,
    telegram_id: i64,
    limit: i64,
) -> Result<Vec<ScanRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {SCAN_COLUMNS} FROM scan_history
         WHERE telegram_id = $1 AND has_personal_allergens = TRUE
         ORDER BY scanned_at DESC, id DESC LIMIT $2"
    ))
    .bind(telegram_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list scans with personal allergens")?;

    scans_from_rows(rows)
}

/// Delete one scan owned by `telegram_id`
pub async fn delete_scan(pool: &PgPool, telegram_id: i64, scan_id: i64) -> Result<bool> {
    debug!(scan_id = %scan_id, "Deleting scan");

    let result = sqlx::query("DELETE FROM scan_history WHERE id = $1 AND telegram_id = $2")
        .bind(scan_id)
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("Failed to delete scan")?;

    let deleted = result.rows_affected() > 0;
    if !deleted {
        info!("No scan {scan_id} found for telegram_id: {telegram_id}");
    }
    Ok(deleted)
}

/// Delete the user's scans older than `before`
pub async fn delete_scans_before(
    pool: &PgPool,
    telegram_id: i64,
    before: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM scan_history WHERE telegram_id = $1 AND scanned_at < $2")
        .bind(telegram_id)
        .bind(before)
        .execute(pool)
        .await
        .context("Failed to delete old scans")?;

    info!(telegram_id = %telegram_id, deleted = result.rows_affected(), "Old scans deleted");
    Ok(result.rows_affected())
}

/// Delete the user's whole history
pub async fn delete_all_scans(pool: &PgPool, telegram_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM scan_history WHERE telegram_id = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("Failed to clear scan history")?;

    info!(telegram_id = %telegram_id, deleted = result.rows_affected(), "Scan history cleared");
    Ok(result.rows_affected())
}

/// Number of stored scans for the user
pub async fn count_scans(pool: &PgPool, telegram_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM scan_history WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_one(pool)
        .await
        .context("Failed to count scans")?;

    Ok(row.get(0))
}
