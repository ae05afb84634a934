pub mod history;

pub use history::{HistoryStore, HISTORY_CAP};
