use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use ingredient_guard::analysis::{analyze, Severity};
use ingredient_guard::db::*;
use ingredient_guard::settings::{Theme, UserSettings};
use sqlx::PgPool;
use std::collections::HashMap;
use std::env;
use tokio::sync::OnceCell;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {
        match setup_test_db().await {
            Ok(pool) => $test_fn(&pool).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    };
}

async fn setup_test_db() -> Result<PgPool> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    SCHEMA
        .get_or_try_init(|| async {
            sqlx::query("DROP TABLE IF EXISTS scan_history CASCADE")
                .execute(&pool)
                .await?;
            sqlx::query("DROP TABLE IF EXISTS user_settings CASCADE")
                .execute(&pool)
                .await?;
            sqlx::query("DROP TABLE IF EXISTS user_profiles CASCADE")
                .execute(&pool)
                .await?;
            init_database_schema(&pool).await?;
            Ok::<(), anyhow::Error>(())
        })
        .await?;

    Ok(pool)
}

/// Tests share one database, so each works on its own telegram id
async fn reset_user(pool: &PgPool, telegram_id: i64) -> Result<()> {
    for table in ["scan_history", "user_settings", "user_profiles"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE telegram_id = $1"))
            .bind(telegram_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

fn details(allergens: &[&str]) -> ProfileDetails {
    ProfileDetails {
        first_name: "Ana".to_string(),
        last_name: "Pop".to_string(),
        email: "ana@example.ro".to_string(),
        personal_allergens: allergens.iter().map(|a| a.to_string()).collect(),
        severity_preferences: HashMap::new(),
    }
}

#[tokio::test]
async fn test_profile_operations() -> Result<()> {
    skip_if_no_db!(test_profile_operations_impl)
}

async fn test_profile_operations_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_001;
    reset_user(pool, telegram_id).await?;

    assert_eq!(get_profile(pool, telegram_id).await?, None);
    assert!(get_personal_allergens(pool, telegram_id).await?.is_empty());

    let empty = get_or_create_profile(pool, telegram_id).await?;
    assert_eq!(empty.telegram_id, telegram_id);
    assert!(empty.personal_allergens.is_empty());
    assert!(!empty.onboarding_completed);

    // Second call returns the same row
    let again = get_or_create_profile(pool, telegram_id).await?;
    assert_eq!(again.id, empty.id);

    let mut profile_details = details(&["Lapte", "lapte ", "soia"]);
    profile_details
        .severity_preferences
        .insert("soia".to_string(), Severity::High);
    let profile = upsert_profile(pool, telegram_id, &profile_details).await?;
    assert_eq!(profile.id, empty.id);
    assert_eq!(profile.display_name(), "Ana Pop");
    assert_eq!(profile.personal_allergens, vec!["Lapte", "soia"]);
    assert_eq!(
        profile.severity_preferences.get("soia"),
        Some(&Severity::High)
    );

    assert!(set_onboarding_completed(pool, telegram_id, true).await?);
    let stored = get_profile(pool, telegram_id).await?.context("profile missing")?;
    assert!(stored.onboarding_completed);

    assert!(!set_onboarding_completed(pool, telegram_id + 1, true).await?);

    Ok(())
}

#[tokio::test]
async fn test_personal_allergen_operations() -> Result<()> {
    skip_if_no_db!(test_personal_allergen_operations_impl)
}

async fn test_personal_allergen_operations_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_002;
    reset_user(pool, telegram_id).await?;

    // Adding creates the profile on demand
    assert!(add_personal_allergen(pool, telegram_id, " Arahide ").await?);
    assert!(!add_personal_allergen(pool, telegram_id, "arahide").await?);
    assert!(add_personal_allergen(pool, telegram_id, "gluten").await?);
    assert_eq!(
        get_personal_allergens(pool, telegram_id).await?,
        vec!["Arahide", "gluten"]
    );

    assert!(remove_personal_allergen(pool, telegram_id, "ARAHIDE").await?);
    assert!(!remove_personal_allergen(pool, telegram_id, "arahide").await?);
    assert_eq!(get_personal_allergens(pool, telegram_id).await?, vec!["gluten"]);

    let updated = update_personal_allergens(
        pool,
        telegram_id,
        &["Soia".to_string(), "SOIA".to_string(), "ouă".to_string()],
    )
    .await?;
    assert_eq!(updated, vec!["Soia", "ouă"]);

    let cleared = update_personal_allergens(pool, telegram_id, &[]).await?;
    assert!(cleared.is_empty());

    // Removing for an unknown user is a no-op
    assert!(!remove_personal_allergen(pool, telegram_id + 1_000, "soia").await?);

    Ok(())
}

#[tokio::test]
async fn test_initialize_new_user() -> Result<()> {
    skip_if_no_db!(test_initialize_new_user_impl)
}

async fn test_initialize_new_user_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_003;
    reset_user(pool, telegram_id).await?;

    let profile = initialize_new_user(pool, telegram_id, &details(&["lapte"]), "en").await?;
    assert!(profile.onboarding_completed);
    assert_eq!(profile.personal_allergens, vec!["lapte"]);

    let settings = get_settings(pool, telegram_id)
        .await?
        .context("settings missing")?;
    assert_eq!(settings, UserSettings::with_language("en"));

    // Running setup again keeps customised settings
    let mut custom = settings.clone();
    custom.sound_enabled = false;
    update_settings(pool, telegram_id, &custom).await?;

    let profile = initialize_new_user(pool, telegram_id, &details(&["soia"]), "ro").await?;
    assert_eq!(profile.personal_allergens, vec!["soia"]);
    assert_eq!(get_settings(pool, telegram_id).await?, Some(custom));

    Ok(())
}

#[tokio::test]
async fn test_settings_operations() -> Result<()> {
    skip_if_no_db!(test_settings_operations_impl)
}

async fn test_settings_operations_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_004;
    reset_user(pool, telegram_id).await?;

    assert_eq!(get_settings(pool, telegram_id).await?, None);

    let created = get_or_create_settings(pool, telegram_id, "en-US").await?;
    assert_eq!(created.language, "en");
    assert_eq!(created.warning_threshold, Severity::Medium);

    let updated = UserSettings {
        notifications_enabled: false,
        auto_save_scans: false,
        warning_threshold: Severity::High,
        theme: Theme::Dark,
        ..created.clone()
    };
    update_settings(pool, telegram_id, &updated).await?;
    assert_eq!(get_settings(pool, telegram_id).await?, Some(updated.clone()));

    // Existing settings are returned unchanged
    let existing = get_or_create_settings(pool, telegram_id, "ro").await?;
    assert_eq!(existing, updated);

    Ok(())
}

#[tokio::test]
async fn test_unknown_stored_values_fall_back_to_defaults() -> Result<()> {
    skip_if_no_db!(test_unknown_stored_values_fall_back_to_defaults_impl)
}

async fn test_unknown_stored_values_fall_back_to_defaults_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_005;
    reset_user(pool, telegram_id).await?;

    sqlx::query(
        "INSERT INTO user_settings (telegram_id, warning_threshold, theme) VALUES ($1, 'EXTREME', 'NEON')",
    )
    .bind(telegram_id)
    .execute(pool)
    .await?;

    let settings = get_settings(pool, telegram_id)
        .await?
        .context("settings missing")?;
    assert_eq!(settings.warning_threshold, Severity::Medium);
    assert_eq!(settings.theme, Theme::System);

    Ok(())
}

#[tokio::test]
async fn test_scan_history_operations() -> Result<()> {
    skip_if_no_db!(test_scan_history_operations_impl)
}

async fn test_scan_history_operations_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_006;
    let other_user = 910_007;
    reset_user(pool, telegram_id).await?;
    reset_user(pool, other_user).await?;

    let clean = analyze::<&str>("Apă minerală, sare", &[]);
    let with_allergens = analyze::<&str>("Ingrediente: grâu, zahăr", &[]);
    let personal = analyze("Ingrediente: lapte, cacao", &["lapte"]);

    let clean_id = save_scan(pool, telegram_id, &clean, None).await?;
    let allergens_id = save_scan(pool, telegram_id, &with_allergens, Some("file-1")).await?;
    let personal_id = save_scan(pool, telegram_id, &personal, Some("file-2")).await?;
    save_scan(pool, other_user, &personal, None).await?;

    assert_eq!(count_scans(pool, telegram_id).await?, 3);

    let stored = get_scan(pool, telegram_id, personal_id)
        .await?
        .context("scan missing")?;
    assert_eq!(stored.full_text, personal.source_text);
    assert_eq!(stored.image_ref.as_deref(), Some("file-2"));
    assert_eq!(stored.ingredients, personal.ingredients);
    assert_eq!(stored.allergens, personal.allergens);
    assert!(stored.has_allergens);
    assert!(stored.has_personal_allergens);
    assert_eq!(stored.personal_allergens_found, vec!["lapte"]);

    // Scans are private to their owner
    assert_eq!(get_scan(pool, other_user, personal_id).await?, None);

    let latest: Vec<i64> = list_scans(pool, telegram_id, 10, 0)
        .await?
        .iter()
        .map(|scan| scan.id)
        .collect();
    assert_eq!(latest, vec![personal_id, allergens_id, clean_id]);
    assert_eq!(list_scans(pool, telegram_id, 1, 0).await?.len(), 1);

    // Pages continue where the previous one stopped
    let second_page: Vec<i64> = list_scans(pool, telegram_id, 2, 2)
        .await?
        .iter()
        .map(|scan| scan.id)
        .collect();
    assert_eq!(second_page, vec![clean_id]);
    assert!(list_scans(pool, telegram_id, 2, 4).await?.is_empty());

    let flagged: Vec<i64> = list_scans_with_allergens(pool, telegram_id, 10)
        .await?
        .iter()
        .map(|scan| scan.id)
        .collect();
    assert_eq!(flagged, vec![personal_id, allergens_id]);

    let alerts = list_scans_with_personal_allergens(pool, telegram_id, 10).await?;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, personal_id);

    let found = search_scans(pool, telegram_id, "Grâu", 10).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, allergens_id);
    assert!(search_scans(pool, telegram_id, "%", 10).await?.is_empty());

    assert!(!delete_scan(pool, other_user, clean_id).await?);
    assert!(delete_scan(pool, telegram_id, clean_id).await?);
    assert!(!delete_scan(pool, telegram_id, clean_id).await?);
    assert_eq!(count_scans(pool, telegram_id).await?, 2);

    assert_eq!(delete_all_scans(pool, telegram_id).await?, 2);
    assert_eq!(count_scans(pool, telegram_id).await?, 0);
    assert_eq!(count_scans(pool, other_user).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_scans_before() -> Result<()> {
    skip_if_no_db!(test_delete_scans_before_impl)
}

async fn test_delete_scans_before_impl(pool: &PgPool) -> Result<()> {
    let telegram_id = 910_008;
    reset_user(pool, telegram_id).await?;

    let outcome = analyze::<&str>("zahăr", &[]);
    let old_id = save_scan(pool, telegram_id, &outcome, None).await?;
    let recent_id = save_scan(pool, telegram_id, &outcome, None).await?;

    sqlx::query("UPDATE scan_history SET scanned_at = $2 WHERE id = $1")
        .bind(old_id)
        .bind(Utc::now() - Duration::days(40))
        .execute(pool)
        .await?;

    let deleted = delete_scans_before(pool, telegram_id, Utc::now() - Duration::days(30)).await?;
    assert_eq!(deleted, 1);
    assert_eq!(get_scan(pool, telegram_id, old_id).await?, None);
    assert!(get_scan(pool, telegram_id, recent_id).await?.is_some());

    Ok(())
}
