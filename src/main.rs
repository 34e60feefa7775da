use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use seeker_core::controller::Controller;
use seeker_core::events::{self, Level};
use seeker_core::logger;
use seeker_core::platform::platform_factory;
use seeker_core::settings::Config;

/// Watch a screen column for a color and click the matching reference image.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Use a synthetic display instead of the real desktop.
    #[arg(long)]
    stub: bool,

    /// Settings file, created on first save.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Directory for app.log.
    #[arg(long, default_value = "logs")]
    logs: PathBuf,

    /// Start automation right away.
    #[arg(long)]
    start: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    logger::init(&args.logs)?;

    let (config, fallback_reason) = Config::load(&args.config);
    let (sink, stream) = events::channel(events::DEFAULT_CAPACITY);
    let controller = Controller::new(platform_factory(args.stub), sink);

    let mut app = seeker_tui::App::new(controller, stream, config, args.config.clone());
    app.note(Level::Info, "seeker started");
    if let Some(reason) = fallback_reason {
        app.note(Level::Warning, format!("using default settings ({})", reason));
    }
    for path in app.config.missing_images() {
        let msg = format!("image file {} does not exist yet", path.display());
        app.note(Level::Warning, msg);
    }
    if args.start {
        app.start_stop();
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = seeker_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    app.quit();
    logger::info("seeker exited");
    result
}
