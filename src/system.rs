use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use arboard::Clipboard;
use crossterm::cursor::MoveTo;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::FormDefinition;
use crate::parser::parse_forms;

const APP_DIR: &str = "formtpl";
const FORMS_FILE: &str = "forms.json";

const DEFAULT_FORMS: &str = r#"{
  "formDefinitions": [
    {
      "title": "New invoice",
      "name": "Invoice",
      "fields": [
        { "name": "title", "label": "Title", "input": { "type": "text" } },
        { "name": "amount", "label": "Amount", "input": { "type": "number" } },
        { "name": "due", "label": "Due date", "input": { "type": "date" } }
      ]
    },
    {
      "title": "Meeting notes",
      "name": "Meeting",
      "fields": [
        { "name": "topic", "label": "Topic", "input": { "type": "text" } },
        { "name": "attendees", "label": "Attendees", "input": { "type": "text" } },
        { "name": "summary", "label": "Summary", "input": { "type": "textarea" } }
      ]
    }
  ]
}
"#;

/// Where the forms file lives. Only the default location is seeded with the
/// sample forms; a path given on the command line must already exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FormsSource {
    pub(crate) path: PathBuf,
    pub(crate) create_if_missing: bool,
}

impl FormsSource {
    pub(crate) fn explicit(path: PathBuf) -> Self {
        Self {
            path,
            create_if_missing: false,
        }
    }

    pub(crate) fn default_location() -> Result<Self> {
        Ok(Self {
            path: app_dir()?.join(FORMS_FILE),
            create_if_missing: true,
        })
    }

    pub(crate) fn prepare(&self) -> Result<()> {
        if self.create_if_missing {
            ensure_forms_file(&self.path)?;
        }
        Ok(())
    }

    pub(crate) fn load(&self) -> Result<Vec<FormDefinition>> {
        self.prepare()?;
        load_forms(&self.path)
    }
}

pub(crate) fn load_forms(path: &Path) -> Result<Vec<FormDefinition>> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let forms = parse_forms(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if forms.is_empty() {
        return Err(Error::NoForms {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), count = forms.len(), "loaded forms");
    Ok(forms)
}

/// Writes the sample forms file when `path` does not exist yet.
fn ensure_forms_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, DEFAULT_FORMS).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "created sample forms file");
    Ok(())
}

pub(crate) fn log_dir() -> Result<PathBuf> {
    Ok(app_dir()?.join("log"))
}

fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::NoHome)?;
    Ok(home.join(".config").join(APP_DIR))
}

pub(crate) fn run_editor_command(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let command = parts.next().ok_or(Error::EditorUnset)?;
    let args: Vec<&str> = parts.collect();

    disable_raw_mode().map_err(Error::Terminal)?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture).map_err(Error::Terminal)?;

    let status_result = Command::new(command).args(&args).arg(path).status();

    let restore_result = execute!(
        io::stdout(),
        EnterAlternateScreen,
        EnableMouseCapture,
        Clear(ClearType::All),
        MoveTo(0, 0)
    )
    .and_then(|_| enable_raw_mode())
    .map_err(Error::Terminal);

    let status = status_result.map_err(Error::EditorSpawn)?;
    restore_result?;
    if !status.success() {
        return Err(Error::EditorExit(status));
    }
    Ok(())
}

pub(crate) fn set_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}
