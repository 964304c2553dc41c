use clap::Parser;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use xltool::{App, AppEvent, ConfigManager, APP_NAME};

#[derive(Parser, Debug)]
#[command(version, about = "xltool")]
struct Args {
    /// Workbook to open; when omitted, the last opened file is restored
    path: Option<PathBuf>,

    /// Sheet to load (name, or 0-based index)
    #[arg(long = "sheet")]
    sheet: Option<String>,

    /// Start with an empty session instead of restoring the last file
    #[arg(long = "no-restore", action)]
    no_restore: bool,
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

/// The workbook to open at startup: CLI path first, then the remembered
/// last-opened file (if it still exists).
fn startup_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.path {
        return Some(path.clone());
    }
    if args.no_restore {
        return None;
    }
    let config = ConfigManager::new(APP_NAME).ok()?;
    let last = config.load_settings().last_opened?;
    last.exists().then_some(last)
}

fn run(mut terminal: DefaultTerminal, args: &Args) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(tx.clone());
    render(&mut terminal, &mut app)?;

    if let Some(path) = startup_path(args) {
        tx.send(AppEvent::Open(path, args.sheet.clone()))?;
    }

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = run(terminal, &args);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
