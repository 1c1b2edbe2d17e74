use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, BuilderState, StatusMessage, View};
use crate::models::{Field, FieldDefinition, FormDefinition};

const STATUS_DURATION_MS: u128 = 1500;
const SELECTED_MARKER: &str = "▸ ";
const UNSELECTED_MARKER: &str = "  ";
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";

pub(crate) fn render_app(frame: &mut Frame, app: &mut App) {
    match app.view {
        View::List => render_list(frame, app),
        View::Builder => render_builder(frame, app),
        View::Error => render_error(frame, app),
    }
}

fn render_error(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let message = app
        .error_message
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());
    let block = Block::bordered().title("Error");
    let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::new().fg(Color::Red))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_list(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(area);

    let list_area = layout[0];
    let help_area = layout[1];

    let title = format!("Forms ({})", app.forms.len());
    let block = Block::bordered().title(title);
    let inner = inner_rect(list_area);
    app.list_area = inner;

    let view_height = inner.height as usize;
    app.list_scroll = ensure_visible(
        app.list_scroll,
        app.list_state.selected().unwrap_or(0),
        app.forms.len(),
        view_height,
    );

    let start = app.list_scroll;
    let end = (start + view_height).min(app.forms.len());
    let selected = app.list_state.selected().unwrap_or(0);

    let items: Vec<ListItem> = app.forms[start..end]
        .iter()
        .enumerate()
        .map(|(idx, form)| {
            let marker = if start + idx == selected {
                SELECTED_MARKER
            } else {
                UNSELECTED_MARKER
            };
            ListItem::new(format!("{marker}{}", form_line(form)))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("");

    let mut state = ListState::default();
    if let Some(selected) = app.list_state.selected() {
        if selected >= start && selected < end {
            state.select(Some(selected - start));
        }
    }
    frame.render_stateful_widget(list, list_area, &mut state);

    let help = with_status(
        "↑↓/j k select  Enter/double-click open  e edit forms  q quit",
        app.list_status.as_ref(),
    );
    let help = Paragraph::new(help).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(help, help_area);
}

fn render_builder(frame: &mut Frame, app: &mut App) {
    let form = app
        .builder
        .as_ref()
        .and_then(|builder| app.forms.get(builder.form_index));
    let title = form
        .map(|form| format!("Template: {}", form.name))
        .unwrap_or_else(|| "Template".to_string());
    let caption = form.and_then(|form| {
        let builder = app.builder.as_ref()?;
        form.fields.get(builder.selected).map(FieldDefinition::caption)
    });

    let builder = match app.builder.as_mut() {
        Some(builder) => builder,
        None => return,
    };

    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(area);

    let content_area = layout[0];
    let status_area = layout[1];

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(content_area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(3)])
        .split(horizontal[0]);

    render_fields(frame, builder, left[0]);
    let caption = Paragraph::new(caption.unwrap_or_default())
        .block(Block::bordered().title("Field"))
        .wrap(Wrap { trim: true });
    frame.render_widget(caption, left[1]);
    let preview = builder.preview.borrow().clone();
    render_preview(frame, &title, &preview, horizontal[1]);

    let status = with_status(
        "Esc back  ↑↓ move  Space omit  f frontmatter  b body  a all  t fences  g global  y copy",
        builder.status.as_ref(),
    );
    let status = Paragraph::new(status).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(status, status_area);
}

fn render_fields(frame: &mut Frame, builder: &mut BuilderState, area: Rect) {
    let options = builder.model.options();
    let title = format!(
        "Fields  fences:{}  handle:{}",
        on_off(options.include_fences),
        if options.use_global_handle { "MF" } else { "api" }
    );
    let block = Block::bordered().title(title);
    let inner = inner_rect(area);

    let fields = builder.model.fields();
    builder.field_scroll = ensure_visible(
        builder.field_scroll,
        builder.selected,
        fields.len(),
        inner.height as usize,
    );

    let start = builder.field_scroll;
    let end = (start + inner.height as usize).min(fields.len());
    let lines: Vec<Line> = fields[start..end]
        .iter()
        .enumerate()
        .map(|(idx, field)| field_line(field, start + idx == builder.selected))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_line(field: &Field, is_selected: bool) -> Line<'static> {
    let marker = if is_selected {
        SELECTED_MARKER
    } else {
        UNSELECTED_MARKER
    };
    let name_style = if is_selected {
        Style::new().fg(Color::Blue).add_modifier(Modifier::BOLD)
    } else {
        Style::new()
    };
    match field {
        Field::Included {
            name,
            on_frontmatter,
            on_body,
        } => Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{name:<20}"), name_style),
            Span::raw(format!(" {} fm", checkbox(*on_frontmatter))),
            Span::raw(format!(" {} body", checkbox(*on_body))),
        ]),
        Field::Omitted { name } => Line::from(vec![
            Span::raw(marker),
            Span::styled(
                format!("{name:<20}"),
                name_style
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT),
            ),
            Span::styled(" omitted", Style::new().fg(Color::DarkGray)),
        ]),
    }
}

fn render_preview(frame: &mut Frame, title: &str, code: &str, area: Rect) {
    let paragraph = Paragraph::new(code)
        .block(Block::bordered().title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn form_line(form: &FormDefinition) -> String {
    format!("{}  [{} fields]", form.display_title(), form.fields.len())
}

fn with_status(help: &str, status: Option<&StatusMessage>) -> String {
    let mut line = help.to_string();
    if let Some(message) =
        status.filter(|msg| msg.since.elapsed().as_millis() <= STATUS_DURATION_MS)
    {
        line.push_str("  |  ");
        line.push_str(&message.text);
    }
    line
}

fn checkbox(value: bool) -> &'static str {
    if value { CHECKED } else { UNCHECKED }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn inner_rect(area: Rect) -> Rect {
    let mut inner = area;
    if inner.width >= 2 {
        inner.x += 1;
        inner.width -= 2;
    }
    if inner.height >= 2 {
        inner.y += 1;
        inner.height -= 2;
    }
    inner
}

fn ensure_visible(current_scroll: usize, selected: usize, total: usize, view_height: usize) -> usize {
    if total == 0 || view_height == 0 {
        return 0;
    }
    let mut scroll = current_scroll.min(total.saturating_sub(1));
    if selected < scroll {
        scroll = selected;
    } else if selected >= scroll + view_height {
        scroll = selected + 1 - view_height;
    }
    scroll
}
