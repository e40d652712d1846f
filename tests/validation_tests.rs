//! # Validation Tests
//!
//! Command argument parsing for profile, allergen, history and settings
//! commands. Every failure is a localization key.

use ingredient_guard::analysis::Severity;
use ingredient_guard::settings::Theme;
use ingredient_guard::validation::*;

#[test]
fn test_allergen_name_rules() {
    assert_eq!(validate_allergen_name(" Muștar "), Ok("Muștar".to_string()));
    assert_eq!(
        validate_allergen_name("fructe cu coajă-lemnoasă"),
        Ok("fructe cu coajă-lemnoasă".to_string())
    );
    assert_eq!(validate_allergen_name("   "), Err("error-allergen-empty"));
    assert_eq!(
        validate_allergen_name(&"a".repeat(MAX_ALLERGEN_NAME_CHARS + 1)),
        Err("error-allergen-too-long")
    );
    assert_eq!(
        validate_allergen_name("lapte; DROP TABLE"),
        Err("error-allergen-invalid-chars")
    );

    // The limit counts characters, not bytes
    let diacritics = "ă".repeat(MAX_ALLERGEN_NAME_CHARS);
    assert!(validate_allergen_name(&diacritics).is_ok());
}

#[test]
fn test_allergen_list_parsing() {
    assert_eq!(
        parse_allergen_list("Lapte, soia, , LAPTE,ouă"),
        Ok(vec!["Lapte".to_string(), "soia".to_string(), "ouă".to_string()])
    );
    assert_eq!(parse_allergen_list(" , ,"), Err("error-allergen-list-empty"));
    assert_eq!(parse_allergen_list("lapte, 42"), Err("error-allergen-invalid-chars"));

    let too_many = (0..=MAX_PERSONAL_ALLERGENS)
        .map(|i| format!("alergen {}", "x".repeat(i + 1)))
        .collect::<Vec<_>>()
        .join(",");
    assert_eq!(parse_allergen_list(&too_many), Err("error-allergen-list-too-long"));
}

#[test]
fn test_person_name_and_email() {
    assert_eq!(validate_person_name(" Ionuț "), Ok("Ionuț".to_string()));
    assert_eq!(validate_person_name(""), Err("error-name-empty"));
    assert_eq!(
        validate_person_name(&"n".repeat(MAX_PERSON_NAME_CHARS + 1)),
        Err("error-name-too-long")
    );

    assert_eq!(
        validate_email(" Ana.Pop@Example.RO "),
        Ok("ana.pop@example.ro".to_string())
    );
    assert_eq!(validate_email("ana pop@example.ro"), Err("error-email-invalid"));
    assert_eq!(validate_email("ana@example"), Err("error-email-invalid"));
}

#[test]
fn test_setup_args() {
    let details = parse_setup_args("Ana;Pop;ana@example.ro;lapte, Soia, soia").unwrap();
    assert_eq!(details.first_name, "Ana");
    assert_eq!(details.last_name, "Pop");
    assert_eq!(details.email, "ana@example.ro");
    assert_eq!(details.personal_allergens, vec!["lapte", "Soia"]);
    assert!(details.severity_preferences.is_empty());

    for no_allergens in ["Ana;Pop;ana@example.ro", "Ana;Pop;ana@example.ro;", "Ana;Pop;ana@example.ro; - "] {
        let details = parse_setup_args(no_allergens).unwrap();
        assert!(details.personal_allergens.is_empty(), "{}", no_allergens);
    }

    assert_eq!(parse_setup_args("Ana Pop"), Err("error-setup-format"));
    assert_eq!(parse_setup_args(";Pop;ana@example.ro"), Err("error-name-empty"));
    assert_eq!(parse_setup_args("Ana;Pop;not-an-email"), Err("error-email-invalid"));
    assert_eq!(
        parse_setup_args("Ana;Pop;ana@example.ro;lapte, 123"),
        Err("error-allergen-invalid-chars")
    );
}

#[test]
fn test_setting_arguments() {
    assert_eq!(parse_severity("HIGH"), Ok(Severity::High));
    assert_eq!(parse_severity("extreme"), Err("error-invalid-severity"));

    assert_eq!(parse_theme("light"), Ok(Theme::Light));
    assert_eq!(parse_theme("sepia"), Err("error-invalid-theme"));

    assert_eq!(parse_toggle(" da "), Ok(true));
    assert_eq!(parse_toggle("OFF"), Ok(false));
    assert_eq!(parse_toggle(""), Err("error-invalid-toggle"));

    assert_eq!(parse_language("EN"), Ok("en".to_string()));
    assert_eq!(parse_language("ro"), Ok("ro".to_string()));
    assert_eq!(parse_language("fr"), Err("error-invalid-language"));
}

#[test]
fn test_history_arguments() {
    assert_eq!(parse_scan_id("#12"), Ok(12));
    assert_eq!(parse_scan_id(" 7 "), Ok(7));
    assert_eq!(parse_scan_id("0"), Err("error-invalid-scan-id"));
    assert_eq!(parse_scan_id("-3"), Err("error-invalid-scan-id"));
    assert_eq!(parse_scan_id("abc"), Err("error-invalid-scan-id"));

    assert_eq!(parse_history_args(""), Ok(HistoryQuery::Page(1)));
    assert_eq!(parse_history_args(" 3 "), Ok(HistoryQuery::Page(3)));
    assert_eq!(
        parse_history_args("făină de grâu"),
        Ok(HistoryQuery::Search("făină de grâu".to_string()))
    );
    assert_eq!(parse_history_args("E330"), Ok(HistoryQuery::Search("E330".to_string())));
    assert_eq!(parse_history_args("0"), Err("error-invalid-page"));
    assert_eq!(
        parse_history_args(&(MAX_HISTORY_PAGE + 1).to_string()),
        Err("error-invalid-page")
    );

    assert_eq!(parse_retention_days("30"), Ok(30));
    assert_eq!(parse_retention_days("3650"), Ok(3650));
    assert_eq!(parse_retention_days("0"), Err("error-invalid-days"));
    assert_eq!(parse_retention_days("3651"), Err("error-invalid-days"));
    assert_eq!(parse_retention_days("o lună"), Err("error-invalid-days"));
}
