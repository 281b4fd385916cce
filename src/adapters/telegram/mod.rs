//! Telegram notification adapters.

mod notifier;

pub use notifier::{TelegramConfig, TelegramNotifier};
