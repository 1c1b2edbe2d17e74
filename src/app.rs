use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{info, warn};

use crate::builder::TemplateBuilder;
use crate::models::{Field, FieldPatch, FormDefinition, Options};
use crate::store::SubscriptionId;
use crate::system::{FormsSource, run_editor_command, set_clipboard};

const DOUBLE_CLICK_MS: u128 = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum View {
    List,
    Builder,
    Error,
}

#[derive(Clone, Debug)]
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) since: Instant,
}

pub(crate) struct BuilderState {
    pub(crate) form_index: usize,
    pub(crate) model: TemplateBuilder,
    pub(crate) selected: usize,
    pub(crate) field_scroll: usize,
    pub(crate) status: Option<StatusMessage>,
    /// Latest compiled template, kept current by a subscription on the model.
    pub(crate) preview: Rc<RefCell<String>>,
    preview_subscription: SubscriptionId,
}

pub(crate) struct App {
    pub(crate) forms: Vec<FormDefinition>,
    pub(crate) forms_source: FormsSource,
    pub(crate) default_options: Options,
    pub(crate) list_state: ListState,
    pub(crate) list_scroll: usize,
    pub(crate) view: View,
    pub(crate) builder: Option<BuilderState>,
    pub(crate) error_message: Option<String>,
    pub(crate) last_click: Option<(usize, Instant)>,
    pub(crate) list_area: Rect,
    pub(crate) should_quit: bool,
    pub(crate) list_status: Option<StatusMessage>,
    pub(crate) needs_redraw: bool,
}

impl App {
    pub(crate) fn load(forms_source: FormsSource, default_options: Options) -> Self {
        match forms_source.load() {
            Ok(forms) => Self::with_forms(forms, forms_source, default_options),
            Err(err) => {
                warn!(error = %err, "failed to load forms");
                let mut app = Self::with_forms(Vec::new(), forms_source, default_options);
                app.view = View::Error;
                app.error_message = Some(err.to_string());
                app
            }
        }
    }

    pub(crate) fn with_forms(
        forms: Vec<FormDefinition>,
        forms_source: FormsSource,
        default_options: Options,
    ) -> Self {
        let mut list_state = ListState::default();
        if !forms.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            forms,
            forms_source,
            default_options,
            list_state,
            list_scroll: 0,
            view: View::List,
            builder: None,
            error_message: None,
            last_click: None,
            list_area: Rect::default(),
            should_quit: false,
            list_status: None,
            needs_redraw: false,
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) {
        match self.view {
            View::List => self.on_key_list(key),
            View::Builder => self.on_key_builder(key),
            View::Error => self.on_key_error(key),
        }
    }

    pub(crate) fn on_mouse(&mut self, mouse: MouseEvent) {
        match self.view {
            View::List => self.on_mouse_list(mouse),
            View::Builder => {}
            View::Error => {}
        }
    }

    fn on_key_error(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn on_key_list(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_list(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_list(-1),
            KeyCode::Enter => self.open_selected_form(),
            KeyCode::Char('e') => self.open_forms_in_editor(),
            _ => {}
        }
    }

    fn on_mouse_list(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if let Some(index) = self.index_from_mouse(mouse) {
            self.list_state.select(Some(index));
            let now = Instant::now();
            if let Some((last_index, last_time)) = self.last_click {
                if last_index == index && last_time.elapsed().as_millis() <= DOUBLE_CLICK_MS {
                    self.open_selected_form();
                }
            }
            self.last_click = Some((index, now));
        }
    }

    fn on_key_builder(&mut self, key: KeyEvent) {
        let builder = match self.builder.as_mut() {
            Some(builder) => builder,
            None => return,
        };

        match key.code {
            KeyCode::Esc => {
                self.close_builder();
                return;
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => builder.next_field(),
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => builder.prev_field(),
            KeyCode::Char(' ') | KeyCode::Char('x') => builder.toggle_omit(),
            KeyCode::Char('f') => builder.toggle_frontmatter(),
            KeyCode::Char('b') => builder.toggle_body(),
            KeyCode::Char('a') => builder.toggle_all_frontmatter(),
            KeyCode::Char('t') => {
                builder
                    .model
                    .update_options(|options| options.include_fences = !options.include_fences);
            }
            KeyCode::Char('g') => {
                builder
                    .model
                    .update_options(|options| options.use_global_handle = !options.use_global_handle);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.copy_template();
            }
            KeyCode::Char('y') => self.copy_template(),
            _ => {}
        }
    }

    fn move_list(&mut self, delta: isize) {
        let len = self.forms.len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, (len - 1) as isize) as usize;
        self.list_state.select(Some(next));
    }

    fn open_selected_form(&mut self) {
        let index = match self.list_state.selected() {
            Some(index) => index,
            None => return,
        };
        let form = match self.forms.get(index) {
            Some(form) => form,
            None => return,
        };
        info!(form = %form.name, fields = form.fields.len(), "opening template builder");
        let model = TemplateBuilder::with_options(form, self.default_options);
        self.builder = Some(BuilderState::new(index, model));
        self.view = View::Builder;
    }

    fn close_builder(&mut self) {
        if let Some(builder) = self.builder.take() {
            builder.close();
        }
        self.view = View::List;
    }

    fn copy_template(&mut self) {
        let builder = match self.builder.as_mut() {
            Some(builder) => builder,
            None => return,
        };
        let code = builder.preview.borrow().clone();
        match set_clipboard(&code) {
            Ok(()) => {
                info!(form = %builder.model.form_name(), bytes = code.len(), "copied template");
                builder.set_status("Copied");
            }
            Err(err) => {
                warn!(error = %err, "clipboard copy failed");
                builder.set_status(&err.to_string());
            }
        }
    }

    fn set_list_status(&mut self, text: &str) {
        self.list_status = Some(StatusMessage {
            text: text.to_string(),
            since: Instant::now(),
        });
    }

    fn open_forms_in_editor(&mut self) {
        let editor = match env::var("EDITOR") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                self.set_list_status("EDITOR is not set");
                return;
            }
        };

        if let Err(err) = self.forms_source.prepare() {
            self.set_list_status(&err.to_string());
            return;
        }

        if let Err(err) = run_editor_command(&editor, &self.forms_source.path) {
            warn!(error = %err, "editor command failed");
            self.set_list_status(&err.to_string());
            return;
        }

        self.needs_redraw = true;

        match self.forms_source.load() {
            Ok(forms) => {
                self.forms = forms;
                let mut list_state = ListState::default();
                if !self.forms.is_empty() {
                    list_state.select(Some(0));
                }
                self.list_state = list_state;
                self.list_scroll = 0;
            }
            Err(err) => self.set_list_status(&err.to_string()),
        }
    }

    fn index_from_mouse(&self, mouse: MouseEvent) -> Option<usize> {
        let area = self.list_area;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        if mouse.column < area.x
            || mouse.column >= area.x + area.width
            || mouse.row < area.y
            || mouse.row >= area.y + area.height
        {
            return None;
        }
        let row_offset = (mouse.row - area.y) as usize;
        let index = self.list_scroll + row_offset;
        if index >= self.forms.len() {
            return None;
        }
        Some(index)
    }
}

impl BuilderState {
    fn new(form_index: usize, model: TemplateBuilder) -> Self {
        let preview = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&preview);
        let preview_subscription = model
            .code()
            .subscribe(move |code| *sink.borrow_mut() = code.clone());
        Self {
            form_index,
            model,
            selected: 0,
            field_scroll: 0,
            status: None,
            preview,
            preview_subscription,
        }
    }

    fn close(self) {
        self.model.code().unsubscribe(self.preview_subscription);
    }

    pub(crate) fn selected_field(&self) -> Option<Field> {
        self.model.fields().get(self.selected).cloned()
    }

    fn next_field(&mut self) {
        let len = self.model.fields().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % len;
    }

    fn prev_field(&mut self) {
        let len = self.model.fields().len();
        if len == 0 {
            return;
        }
        if self.selected == 0 {
            self.selected = len - 1;
        } else {
            self.selected -= 1;
        }
    }

    fn toggle_omit(&mut self) {
        if let Some(field) = self.selected_field() {
            self.model.omit_field(field.name(), !field.is_omitted());
        }
    }

    fn toggle_frontmatter(&mut self) {
        match self.selected_field() {
            Some(field) if !field.is_omitted() => self
                .model
                .set_field(field.name(), FieldPatch::frontmatter(!field.on_frontmatter())),
            Some(_) => self.set_status("Field is omitted"),
            None => {}
        }
    }

    fn toggle_body(&mut self) {
        match self.selected_field() {
            Some(field) if !field.is_omitted() => self
                .model
                .set_field(field.name(), FieldPatch::body(!field.on_body())),
            Some(_) => self.set_status("Field is omitted"),
            None => {}
        }
    }

    /// Turns frontmatter on for every included field, or off when all of
    /// them already have it.
    fn toggle_all_frontmatter(&mut self) {
        let fields = self.model.fields();
        let mut included = fields.iter().filter(|field| !field.is_omitted()).peekable();
        let all_on = included.peek().is_some() && included.all(Field::on_frontmatter);
        self.model.toggle_all_frontmatter(!all_on);
    }

    fn set_status(&mut self, text: &str) {
        self.status = Some(StatusMessage {
            text: text.to_string(),
            since: Instant::now(),
        });
    }
}
