//! Terminal presentation of the chat widget

pub mod conversation;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};

use crate::llm::CompletionBackend;
use conversation::ConversationManager;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Take over the terminal, run the widget, and always hand the terminal back.
pub async fn launch<B>(mut manager: ConversationManager<B>) -> Result<()>
where
    B: CompletionBackend + Clone + Send + Sync + 'static,
{
    let mut terminal = enter_terminal()?;
    let result = manager.run(&mut terminal).await;
    restore_terminal(&mut terminal)?;
    result
}

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err).context("Failed to enter alternate screen");
    }
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to restore cursor")?;
    Ok(())
}
