pub mod api_keys;
pub mod auth;
pub mod completions;
pub mod habits;
pub mod health;
pub mod rewards;
pub mod streaks;
pub mod users;
