//! Access & Quota Engine: ban/premium policy, atomic daily-quota
//! reservation, and the live bot-settings view.

pub mod groups;
pub mod model;
pub mod repository;
pub mod settings;

pub use groups::{Connection, ConnectionStore, Filter, FilterStore};
pub use model::{AccessDecision, AccessReason, Principal};
pub use repository::AccessRepository;
pub use settings::{BotSetting, SettingsView};
