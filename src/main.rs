mod app;
mod builder;
mod compiler;
mod error;
mod models;
mod parser;
mod store;
mod system;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing::warn;
use tracing_subscriber::prelude::*;

use crate::app::App;
use crate::builder::TemplateBuilder;
use crate::error::Error;
use crate::models::{FieldPatch, FormDefinition, Options};
use crate::system::{FormsSource, log_dir};
use crate::ui::render_app;

#[derive(Parser, Debug)]
#[command(name = "formtpl")]
#[command(about = "Build Templater snippets that open Modal Forms")]
struct Args {
    /// Forms file (Modal Forms data.json or a JSON list of forms)
    #[arg(long)]
    forms: Option<PathBuf>,

    /// Print the template for this form and exit instead of starting the TUI
    #[arg(long, value_name = "FORM")]
    print: Option<String>,

    /// Field to leave out of the form (repeatable)
    #[arg(long, value_name = "FIELD", requires = "print")]
    omit: Vec<String>,

    /// Field to write into the frontmatter (repeatable)
    #[arg(long, value_name = "FIELD", requires = "print")]
    frontmatter: Vec<String>,

    /// Write every included field into the frontmatter
    #[arg(long, requires = "print")]
    all_frontmatter: bool,

    /// Do not wrap the output in `---` fences
    #[arg(long)]
    no_fences: bool,

    /// Call the global `MF` handle instead of resolving the plugin API
    #[arg(long)]
    global_handle: bool,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            include_fences: !self.no_fences,
            use_global_handle: self.global_handle,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging_guard(init_logging(), args.print.is_some())?;

    let forms_source = match &args.forms {
        Some(path) => FormsSource::explicit(path.clone()),
        None => FormsSource::default_location()?,
    };

    if let Some(form_name) = &args.print {
        let code = print_template(&args, &forms_source, form_name)?;
        println!("{code}");
        return Ok(());
    }

    let terminal = ratatui::init();
    or_restore(execute!(io::stdout(), EnableMouseCapture), ratatui::restore)?;

    let app = App::load(forms_source, args.options());
    let result = run_app(terminal, app);

    let disabled = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    disabled?;
    result
}

/// Print mode never touches the terminal UI, so it runs on without a log
/// file when logging cannot be set up.
fn logging_guard(init: Result<WorkerGuard>, print_mode: bool) -> Result<Option<WorkerGuard>> {
    match init {
        Ok(guard) => Ok(Some(guard)),
        Err(err) if print_mode => {
            eprintln!("formtpl: logging disabled: {err:#}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Leaves raw mode before handing back a terminal setup error.
fn or_restore<T>(result: io::Result<T>, restore: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        restore();
    }
    result
}

fn print_template(args: &Args, forms_source: &FormsSource, form_name: &str) -> Result<String> {
    let forms = forms_source.load()?;
    let form = forms
        .iter()
        .find(|form| form.name == form_name)
        .ok_or_else(|| Error::UnknownForm(form_name.to_string()))?;

    let builder = TemplateBuilder::new(form);
    builder.set_options(args.options());
    if args.all_frontmatter {
        builder.toggle_all_frontmatter(true);
    }
    for name in &args.frontmatter {
        builder.set_field(name, FieldPatch::frontmatter(true));
    }
    for name in &args.omit {
        builder.omit_field(name, true);
    }
    for name in unmatched_fields(form, args.frontmatter.iter().chain(&args.omit)) {
        warn!(form = %form.name, field = name, "no such field");
        eprintln!("formtpl: form `{}` has no field `{name}`", form.name);
    }
    Ok(builder.code().get())
}

fn unmatched_fields<'a>(
    form: &FormDefinition,
    names: impl IntoIterator<Item = &'a String>,
) -> Vec<&'a str> {
    names
        .into_iter()
        .map(String::as_str)
        .filter(|name| !form.fields.iter().any(|field| field.name == *name))
        .collect()
}

fn init_logging() -> Result<WorkerGuard> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(log_dir.join("formtpl.log"))?;
    let (writer, guard) = tracing_appender::non_blocking(log_file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("formtpl=info"));

    // stdout belongs to the terminal UI
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(file_layer).init();
    Ok(guard)
}

fn run_app(mut terminal: DefaultTerminal, mut app: App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    loop {
        if app.needs_redraw {
            terminal.clear()?;
            app.needs_redraw = false;
        }
        terminal.draw(|frame| render_app(frame, &mut app))?;

        if app.should_quit {
            break;
        }

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        app.on_key(key);
                    }
                }
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }
    }
    Ok(())
}
