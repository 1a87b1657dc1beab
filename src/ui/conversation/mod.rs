//! Chat widget components for the terminal interface

pub mod composer;
pub mod history;
pub mod manager;
pub mod suggestions;

pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::ConversationManager;
pub use suggestions::SuggestionChips;
