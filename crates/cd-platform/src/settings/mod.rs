//! System Settings

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{settings_router, SettingsState};
pub use entity::{AutoRouting, SystemSettings, SYSTEM_SETTINGS_ID};
pub use repository::SettingsRepository;
