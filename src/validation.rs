//! Validation module for user supplied command arguments
//!
//! Every validator returns the localization key of the error message on
//! failure, so handlers can reply with `t_lang(err, ..)` directly.
//!
//! - Allergen names and comma separated allergen lists
//! - Profile fields (names, email)
//! - Setting values (severity, theme, on/off toggles, language)
//! - The `/setup` argument string

use crate::analysis::{fold_allergen_name, Severity};
use crate::db::ProfileDetails;
use crate::settings::{is_supported_language, Theme};
use lazy_static::lazy_static;
use regex::Regex;

/// Longest accepted allergen name, in characters
pub const MAX_ALLERGEN_NAME_CHARS: usize = 50;

/// Longest accepted first or last name, in characters
pub const MAX_PERSON_NAME_CHARS: usize = 100;

/// Most allergens a user can declare
pub const MAX_PERSONAL_ALLERGENS: usize = 30;

/// Highest page number `/history <page>` accepts
pub const MAX_HISTORY_PAGE: i64 = 10_000;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .expect("Invalid email regex pattern");
}

/// Validates a single allergen name
///
/// # Returns
/// * `Ok(String)` - The trimmed name
/// * `Err(&str)` - "error-allergen-empty", "error-allergen-too-long" or
///   "error-allergen-invalid-chars"
///
/// # Examples
/// ```
/// use ingredient_guard::validation::validate_allergen_name;
///
/// assert_eq!(validate_allergen_name("  Lapte "), Ok("Lapte".to_string()));
/// assert_eq!(validate_allergen_name(""), Err("error-allergen-empty"));
/// assert_eq!(validate_allergen_name("E330"), Err("error-allergen-invalid-chars"));
/// ```
pub fn validate_allergen_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("error-allergen-empty");
    }

    if trimmed.chars().count() > MAX_ALLERGEN_NAME_CHARS {
        return Err("error-allergen-too-long");
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
    {
        return Err("error-allergen-invalid-chars");
    }

    Ok(trimmed.to_string())
}

/// Parse a comma separated allergen list
///
/// Names are trimmed and validated; duplicates (ignoring case) keep their
/// first spelling. An empty input is an error, use `/allergens_set -` to
/// clear the list instead.
///
/// # Examples
/// ```
/// use ingredient_guard::validation::parse_allergen_list;
///
/// let parsed = parse_allergen_list("lapte, Soia, LAPTE").unwrap();
/// assert_eq!(parsed, vec!["lapte".to_string(), "Soia".to_string()]);
/// ```
pub fn parse_allergen_list(input: &str) -> Result<Vec<String>, &'static str> {
    let mut allergens: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for part in input.split(',') {
        if part.trim().is_empty() {
            continue;
        }
        let name = validate_allergen_name(part)?;
        let folded = fold_allergen_name(&name);
        if !seen.contains(&folded) {
            seen.push(folded);
            allergens.push(name);
        }
    }

    if allergens.is_empty() {
        return Err("error-allergen-list-empty");
    }

    if allergens.len() > MAX_PERSONAL_ALLERGENS {
        return Err("error-allergen-list-too-long");
    }

    Ok(allergens)
}

/// Validates a first or last name
///
/// # Examples
/// ```
/// use ingredient_guard::validation::validate_person_name;
///
/// assert_eq!(validate_person_name(" Ana "), Ok("Ana".to_string()));
/// assert_eq!(validate_person_name(" "), Err("error-name-empty"));
/// ```
pub fn validate_person_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("error-name-empty");
    }

    if trimmed.chars().count() > MAX_PERSON_NAME_CHARS {
        return Err("error-name-too-long");
    }

    Ok(trimmed.to_string())
}

/// Validates an email address with a deliberately loose pattern
///
/// # Examples
/// ```
/// use ingredient_guard::validation::validate_email;
///
/// assert!(validate_email("ana@example.ro").is_ok());
/// assert_eq!(validate_email("ana@"), Err("error-email-invalid"));
/// ```
pub fn validate_email(email: &str) -> Result<String, &'static str> {
    let trimmed = email.trim();

    if trimmed.len() > 255 || !EMAIL_PATTERN.is_match(trimmed) {
        return Err("error-email-invalid");
    }

    Ok(trimmed.to_lowercase())
}

/// Parse a warning threshold argument (`low`, `medium`, `high` or Romanian)
pub fn parse_severity(input: &str) -> Result<Severity, &'static str> {
    input.parse()
}

/// Parse a theme argument (`light`, `dark`, `system` or Romanian)
pub fn parse_theme(input: &str) -> Result<Theme, &'static str> {
    input.parse()
}

/// Parse an on/off argument
///
/// # Examples
/// ```
/// use ingredient_guard::validation::parse_toggle;
///
/// assert_eq!(parse_toggle("ON"), Ok(true));
/// assert_eq!(parse_toggle("nu"), Ok(false));
/// assert_eq!(parse_toggle("maybe"), Err("error-invalid-toggle"));
/// ```
pub fn parse_toggle(input: &str) -> Result<bool, &'static str> {
    match input.trim().to_lowercase().as_str() {
        "on" | "da" | "true" | "yes" | "1" => Ok(true),
        "off" | "nu" | "false" | "no" | "0" => Ok(false),
        _ => Err("error-invalid-toggle"),
    }
}

/// Parse a language argument into a supported locale
pub fn parse_language(input: &str) -> Result<String, &'static str> {
    let code = input.trim().to_lowercase();
    if is_supported_language(&code) {
        Ok(code)
    } else {
        Err("error-invalid-language")
    }
}

/// Parse a scan id argument for `/delete`
pub fn parse_scan_id(input: &str) -> Result<i64, &'static str> {
    match input.trim().trim_start_matches('#').parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err("error-invalid-scan-id"),
    }
}

/// What `/history` was asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryQuery {
    /// A 1-based page of the newest-first history
    Page(i64),
    /// A case-insensitive text search
    Search(String),
}

/// Parse the arguments of `/history [page | search]`
///
/// No argument is the first page, a bare number is a page number and
/// anything else is searched for.
pub fn parse_history_args(input: &str) -> Result<HistoryQuery, &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(HistoryQuery::Page(1));
    }
    if !input.chars().all(|c| c.is_ascii_digit()) {
        return Ok(HistoryQuery::Search(input.to_string()));
    }

    match input.parse::<i64>() {
        Ok(page) if (1..=MAX_HISTORY_PAGE).contains(&page) => Ok(HistoryQuery::Page(page)),
        _ => Err("error-invalid-page"),
    }
}

/// Parse the age in days for `/clear_history <days>`
pub fn parse_retention_days(input: &str) -> Result<i64, &'static str> {
    match input.trim().parse::<i64>() {
        Ok(days) if (1..=3650).contains(&days) => Ok(days),
        _ => Err("error-invalid-days"),
    }
}

/// Parse `/setup <first>;<last>;<email>;<allergens>`
///
/// The allergen part may be empty or `-` for a user without allergies.
///
/// # Examples
/// ```
/// use ingredient_guard::validation::parse_setup_args;
///
/// let details = parse_setup_args("Ana; Pop; ana@example.ro; lapte, soia").unwrap();
/// assert_eq!(details.first_name, "Ana");
/// assert_eq!(details.personal_allergens, vec!["lapte".to_string(), "soia".to_string()]);
///
/// assert_eq!(parse_setup_args("Ana;Pop"), Err("error-setup-format"));
/// ```
pub fn parse_setup_args(input: &str) -> Result<ProfileDetails, &'static str> {
    let parts: Vec<&str> = input.splitn(4, ';').collect();
    if parts.len() < 3 {
        return Err("error-setup-format");
    }

    let first_name = validate_person_name(parts[0])?;
    let last_name = validate_person_name(parts[1])?;
    let email = validate_email(parts[2])?;

    let allergen_part = parts.get(3).map(|s| s.trim()).unwrap_or_default();
    let personal_allergens = if allergen_part.is_empty() || allergen_part == "-" {
        Vec::new()
    } else {
        parse_allergen_list(allergen_part)?
    };

    Ok(ProfileDetails {
        first_name,
        last_name,
        email,
        personal_allergens,
        ..Default::default()
    })
}
