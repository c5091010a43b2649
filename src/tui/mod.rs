pub mod app;
pub mod render;
pub mod resource;
pub mod theme;
pub mod tree;

pub use app::App;
pub use resource::Resource;
pub use theme::{Theme, ThemeVariant};
pub use tree::TreeState;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

const FRAME_TIME: Duration = Duration::from_millis(16);

/// Takes over the terminal until the user quits.
pub async fn launch(app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    info!("TUI started");
    loop {
        let frame_start = std::time::Instant::now();

        // Drain input before drawing for minimal latency
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
        if app.should_quit() {
            break;
        }

        app.tick();
        terminal.draw(|f| render::render(f, &mut app))?;

        if let Some(remaining) = FRAME_TIME.checked_sub(frame_start.elapsed()) {
            tokio::time::sleep(remaining).await;
        }
    }
    info!("TUI exited");
    Ok(())
}
