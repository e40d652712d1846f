//! # IngredientGuard Telegram Bot
//!
//! A Telegram bot that reads food labels with OCR, detects ingredients and
//! allergens, raises alerts for each user's personal allergens and keeps a
//! searchable scan history.

pub mod analysis;
pub mod bot;
pub mod config;
pub mod db;
pub mod errors;
pub mod instance_manager;
pub mod localization;
pub mod notifications;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod scanner;
pub mod settings;
pub mod validation;

// Re-export types for easier access
pub use analysis::{analyze, AllergenMatch, AnalysisOutcome, IngredientMatch, Severity};
pub use scanner::{ScanError, ScanService};
