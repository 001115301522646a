use crate::board::{
    DragPayload, Notice, NoticeLevel, Notifier, PendingRemoval, TaskBoard, REMOVE_CATEGORY_WARNING,
};
use crate::model::{Task, TaskId};
use crate::storage::KeyValueStore;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::debug;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(3);
const TASK_ITEM_HEIGHT: u16 = 2;

pub fn run<S: KeyValueStore>(store: S, source: String) -> Result<()> {
    let board = TaskBoard::load(store, Toasts::default())?;
    let mut terminal = setup_terminal()?;
    let mut app = App::new(board, source);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

#[derive(Debug, Default)]
pub struct Toasts {
    current: Option<(Notice, Instant)>,
}

impl Notifier for Toasts {
    fn notify(&mut self, notice: Notice) {
        self.current = Some((notice, Instant::now()));
    }
}

impl Toasts {
    fn visible(&self) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|(_, shown)| shown.elapsed() < TOAST_TTL)
            .map(|(notice, _)| notice)
    }
}

struct App<S: KeyValueStore> {
    board: TaskBoard<S, Toasts>,
    source: String,
    selected_column: usize,
    selected_task: usize,
    scroll_offsets: Vec<usize>,
    column_areas: Vec<Rect>,
    mode: Mode,
}

enum Mode {
    Normal,
    AddingTask(TaskForm),
    AddingCategory(FieldValue),
    ConfirmRemoval(PendingRemoval),
    Dragging(DragState),
}

struct DragState {
    payload: DragPayload,
    /// Column currently under the pointer or keyboard cursor.
    hover: Option<usize>,
    moved: bool,
}

struct TaskForm {
    text: FieldValue,
    field: TaskField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum TaskField {
    Text,
    Category,
    Type,
}

#[derive(Clone, Default)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl TaskForm {
    fn new(text: &str) -> Self {
        TaskForm {
            text: FieldValue::new(text),
            field: TaskField::Text,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            TaskField::Text => TaskField::Category,
            TaskField::Category => TaskField::Type,
            TaskField::Type => TaskField::Text,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            TaskField::Text => TaskField::Type,
            TaskField::Category => TaskField::Text,
            TaskField::Type => TaskField::Category,
        };
    }
}

impl<S: KeyValueStore> App<S> {
    fn new(board: TaskBoard<S, Toasts>, source: String) -> Self {
        let columns = board.categories().len();
        App {
            board,
            source,
            selected_column: 0,
            selected_task: 0,
            scroll_offsets: vec![0; columns],
            column_areas: Vec::new(),
            mode: Mode::Normal,
        }
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                let quit = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key)?,
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse)?;
                        false
                    }
                    _ => false,
                };
                if quit {
                    break;
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::AddingTask(_) | Mode::AddingCategory(_) => {
                self.handle_form_key(key)?;
                Ok(false)
            }
            Mode::ConfirmRemoval(_) => {
                self.handle_confirm_key(key)?;
                Ok(false)
            }
            Mode::Dragging(_) => {
                self.handle_drag_key(key)?;
                Ok(false)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => self.prev_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_task(),
            KeyCode::Down | KeyCode::Char('j') => self.next_task(),
            KeyCode::Char('n') => {
                self.mode = Mode::AddingTask(TaskForm::new(&self.board.drafts.task_text));
            }
            KeyCode::Char('c') => {
                self.mode = Mode::AddingCategory(FieldValue::new(&self.board.drafts.new_category));
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_task_id() {
                    self.board.remove_task(id)?;
                    self.ensure_bounds();
                }
            }
            KeyCode::Char('x') => {
                if let Some(name) = self.selected_category() {
                    let pending = self.board.request_category_removal(&name);
                    self.mode = Mode::ConfirmRemoval(pending);
                }
            }
            KeyCode::Char('g') | KeyCode::Char(' ') => {
                if let Some(id) = self.selected_task_id() {
                    self.begin_drag(id, Some(self.selected_column));
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::AddingTask(form) => self.process_task_form_key(form, key)?,
            Mode::AddingCategory(field) => self.process_category_form_key(field, key)?,
            _ => false,
        };
        if !close {
            self.mode = mode;
        }
        Ok(())
    }

    fn process_task_form_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => {
                self.board.drafts.task_text = form.text.value.clone();
                return Ok(true);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => {
                self.board.drafts.task_text = form.text.value.clone();
                if let Ok(id) = self.board.add_task()? {
                    self.select_task(id);
                    return Ok(true);
                }
            }
            _ => match form.field {
                TaskField::Text => {
                    form.text.handle_edit_key(key);
                }
                TaskField::Category => match key.code {
                    KeyCode::Left => self.cycle_draft_category(-1),
                    KeyCode::Right | KeyCode::Char(' ') => self.cycle_draft_category(1),
                    _ => {}
                },
                TaskField::Type => {
                    if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                        self.board.drafts.kind = self.board.drafts.kind.toggle();
                    }
                }
            },
        }
        Ok(false)
    }

    fn process_category_form_key(&mut self, field: &mut FieldValue, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => {
                self.board.drafts.new_category = field.value.clone();
                Ok(true)
            }
            KeyCode::Enter => {
                self.board.drafts.new_category = field.value.clone();
                if self.board.add_category()? {
                    self.scroll_offsets.push(0);
                    self.selected_column = self.board.categories().len() - 1;
                    self.selected_task = 0;
                    return Ok(true);
                }
                Ok(false)
            }
            _ => {
                field.handle_edit_key(key);
                Ok(false)
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        let confirmed = match key.code {
            KeyCode::Char('y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Esc => false,
            _ => return Ok(()),
        };
        if let Mode::ConfirmRemoval(pending) = std::mem::replace(&mut self.mode, Mode::Normal) {
            let removed_idx = self
                .board
                .categories()
                .iter()
                .position(|c| c == pending.category());
            self.board.resolve_removal(pending, confirmed)?;
            if confirmed {
                if let Some(idx) = removed_idx {
                    if idx < self.scroll_offsets.len() {
                        self.scroll_offsets.remove(idx);
                    }
                }
            }
            self.ensure_bounds();
        }
        Ok(())
    }

    fn handle_drag_key(&mut self, key: KeyEvent) -> Result<()> {
        let columns = self.board.categories().len();
        match key.code {
            KeyCode::Esc => self.cancel_drag(),
            KeyCode::Left | KeyCode::Char('h') => {
                if let Mode::Dragging(drag) = &mut self.mode {
                    let current = drag.hover.unwrap_or(self.selected_column);
                    drag.hover = Some(current.saturating_sub(1));
                    drag.moved = true;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if let Mode::Dragging(drag) = &mut self.mode {
                    let current = drag.hover.unwrap_or(self.selected_column);
                    drag.hover = Some((current + 1).min(columns.saturating_sub(1)));
                    drag.moved = true;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('g') => self.finish_drag()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !matches!(self.mode, Mode::Normal) {
                    return Ok(());
                }
                if let Some((col, row)) = self.hit_task(mouse.column, mouse.row) {
                    self.selected_column = col;
                    self.selected_task = row;
                    if let Some(id) = self.selected_task_id() {
                        self.begin_drag(id, Some(col));
                    }
                } else if let Some(col) = self.hit_column(mouse.column, mouse.row) {
                    self.selected_column = col;
                    self.selected_task = 0;
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let hover = self.hit_column(mouse.column, mouse.row);
                if let Mode::Dragging(drag) = &mut self.mode {
                    drag.hover = hover;
                    drag.moved = true;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let hover = self.hit_column(mouse.column, mouse.row);
                if let Mode::Dragging(drag) = &mut self.mode {
                    drag.hover = hover;
                    if drag.moved {
                        self.finish_drag()?;
                    } else {
                        self.cancel_drag();
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn begin_drag(&mut self, id: TaskId, origin: Option<usize>) {
        let payload = self.board.start_drag(id);
        self.mode = Mode::Dragging(DragState {
            payload,
            hover: origin,
            moved: false,
        });
    }

    fn cancel_drag(&mut self) {
        if matches!(self.mode, Mode::Dragging(_)) {
            debug!("event=drag_cancel module=ui");
            self.mode = Mode::Normal;
        }
    }

    /// Drops onto the hovered column; dropping outside every column cancels.
    fn finish_drag(&mut self) -> Result<()> {
        let drag = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Dragging(drag) => drag,
            other => {
                self.mode = other;
                return Ok(());
            }
        };
        let target = drag
            .hover
            .and_then(|idx| self.board.categories().get(idx).cloned());
        let category = match target {
            Some(category) => category,
            None => {
                debug!("event=drag_cancel module=ui reason=no_target");
                return Ok(());
            }
        };
        if self.board.drop_on(drag.payload, &category)?.is_ok() {
            self.select_task(drag.payload.task_id());
        }
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_columns(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::AddingTask(form) => self.draw_task_form(f, form),
            Mode::AddingCategory(field) => self.draw_category_form(f, field),
            Mode::ConfirmRemoval(pending) => self.draw_confirm(f, pending),
            Mode::Normal | Mode::Dragging(_) => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "taskboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} task(s)", self.board.tasks().len()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} categories", self.board.categories().len()),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(self.source.clone(), Style::default().fg(Color::DarkGray)),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_columns(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let categories = self.board.categories().to_vec();
        if categories.is_empty() {
            self.column_areas.clear();
            let msg = Paragraph::new("No categories yet. Press c to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("taskboard"));
            f.render_widget(Clear, area);
            f.render_widget(msg, area);
            return;
        }
        if self.scroll_offsets.len() != categories.len() {
            self.scroll_offsets.resize(categories.len(), 0);
        }

        let constraints = categories
            .iter()
            .map(|_| Constraint::Ratio(1, categories.len() as u32))
            .collect::<Vec<_>>();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);
        self.column_areas = chunks.to_vec();

        let (dragged, hover) = match &self.mode {
            Mode::Dragging(drag) => (Some(drag.payload.task_id()), drag.hover),
            _ => (None, None),
        };

        for (idx, category) in categories.iter().enumerate() {
            let accent = color_for_index(idx);
            let width = chunks[idx].width.saturating_sub(2);
            let tasks = self.board.state().tasks_in(category).collect::<Vec<_>>();
            let items = tasks
                .iter()
                .enumerate()
                .map(|(t_idx, task)| {
                    task_item(
                        task,
                        width,
                        idx == self.selected_column && t_idx == self.selected_task,
                        dragged == Some(task.id),
                    )
                })
                .collect::<Vec<_>>();

            let mut state = ListState::default().with_offset(self.scroll_offsets[idx]);
            if idx == self.selected_column && !tasks.is_empty() {
                state.select(Some(self.selected_task));
            }

            let is_drop_target = hover == Some(idx);
            let border = if is_drop_target { Color::LightYellow } else { accent };
            let mut title = format!("{} ({})", category, tasks.len());
            if is_drop_target {
                title.push_str("  ⇣ drop here");
            }
            let block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(border)
                        .add_modifier(if idx == self.selected_column {
                            Modifier::BOLD | Modifier::UNDERLINED
                        } else {
                            Modifier::BOLD
                        }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(Color::Rgb(16, 18, 24)));

            let list = List::new(items).block(block);
            f.render_stateful_widget(list, chunks[idx], &mut state);
            self.scroll_offsets[idx] = state.offset();
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let toast = match self.board.notifier().visible() {
            Some(notice) => Line::from(Span::styled(
                notice.message.clone(),
                Style::default()
                    .fg(notice_color(notice.level))
                    .add_modifier(Modifier::BOLD),
            )),
            None => Line::from(""),
        };
        let status = Paragraph::new(toast).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(status, bottom[0]);

        let detail = Paragraph::new(self.selected_detail())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let spans = match self.mode {
            Mode::Dragging(_) => vec![
                key("←→ / drag", Color::LightCyan),
                Span::raw(" choose category  "),
                key("Enter/release", Color::LightGreen),
                Span::raw(" drop  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ],
            _ => vec![
                key("←↑↓→ / h j k l", Color::LightCyan),
                Span::raw(" select  "),
                key("g/space", Color::LightGreen),
                Span::raw(" grab  "),
                key("n", Color::LightMagenta),
                Span::raw(" new task  "),
                key("c", Color::LightMagenta),
                Span::raw(" new category  "),
                key("d", Color::LightRed),
                Span::raw(" delete task  "),
                key("x", Color::LightRed),
                Span::raw(" delete category  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ],
        };
        Line::from(spans)
    }

    fn selected_detail(&self) -> Line<'static> {
        match self.selected_task_ref() {
            Some(task) => Line::from(vec![
                Span::styled(
                    task.text.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("{} - {}", task.category, task.kind),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw("  "),
                Span::styled(format!("#{}", task.id), Style::default().fg(Color::DarkGray)),
            ]),
            None => Line::from("No task selected"),
        }
    }

    fn draw_task_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 40, f.size());
        let drafts = &self.board.drafts;
        let category = if drafts.category.is_empty() {
            "(choose a category)".to_string()
        } else {
            drafts.category.clone()
        };
        let mut lines = vec![field_line(
            "Task",
            &if form.field == TaskField::Text {
                form.text.with_caret()
            } else {
                form.text.value.clone()
            },
            form.field == TaskField::Text,
        )];
        lines.push(field_line(
            "Category",
            &format!("◂ {} ▸", category),
            form.field == TaskField::Category,
        ));
        lines.push(field_line(
            "Type",
            &format!("◂ {} ▸", drafts.kind),
            form.field == TaskField::Type,
        ));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to add • Esc to close • Tab to move • ←→ to choose",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(popup_block("New Task", Color::Cyan))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_category_form(&self, f: &mut ratatui::Frame<'_>, field: &FieldValue) {
        let area = centered_rect(50, 25, f.size());
        let lines = vec![
            field_line("Name", &field.with_caret(), true),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to add • Esc to close",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(lines)
            .block(popup_block("New Category", Color::LightGreen))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, pending: &PendingRemoval) {
        let area = centered_rect(50, 30, f.size());
        let count = self.board.state().tasks_in(pending.category()).count();
        let body = vec![
            Line::from(Span::styled(
                format!("Remove \"{}\"?", pending.category()),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(REMOVE_CATEGORY_WARNING),
            Line::from(format!("{} task(s) will be deleted.", count)),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(popup_block("Warning", Color::LightRed));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn prev_column(&mut self) {
        if self.selected_column > 0 {
            self.selected_column -= 1;
            self.selected_task = 0;
        }
    }

    fn next_column(&mut self) {
        if self.selected_column + 1 < self.board.categories().len() {
            self.selected_column += 1;
            self.selected_task = 0;
        }
    }

    fn prev_task(&mut self) {
        self.selected_task = self.selected_task.saturating_sub(1);
    }

    fn next_task(&mut self) {
        if self.selected_task + 1 < self.column_len(self.selected_column) {
            self.selected_task += 1;
        }
    }

    fn cycle_draft_category(&mut self, delta: isize) {
        let categories = self.board.categories();
        // Slot 0 is "no category".
        let slots = categories.len() as isize + 1;
        let current = categories
            .iter()
            .position(|c| *c == self.board.drafts.category)
            .map(|i| i as isize + 1)
            .unwrap_or(0);
        let next = (current + delta).rem_euclid(slots);
        self.board.drafts.category = if next == 0 {
            String::new()
        } else {
            categories[(next - 1) as usize].clone()
        };
    }

    fn selected_category(&self) -> Option<String> {
        self.board.categories().get(self.selected_column).cloned()
    }

    fn column_len(&self, column: usize) -> usize {
        match self.board.categories().get(column) {
            Some(category) => self.board.state().tasks_in(category).count(),
            None => 0,
        }
    }

    fn selected_task_ref(&self) -> Option<&Task> {
        let category = self.board.categories().get(self.selected_column)?;
        self.board.state().tasks_in(category).nth(self.selected_task)
    }

    fn selected_task_id(&self) -> Option<TaskId> {
        self.selected_task_ref().map(|t| t.id)
    }

    fn select_task(&mut self, id: TaskId) {
        let state = self.board.state();
        if let Some(task) = state.find_task(id) {
            if let Some(col) = state.categories.iter().position(|c| *c == task.category) {
                let row = state
                    .tasks_in(&task.category)
                    .position(|t| t.id == id)
                    .unwrap_or(0);
                self.selected_column = col;
                self.selected_task = row;
            }
        }
    }

    fn ensure_bounds(&mut self) {
        let columns = self.board.categories().len();
        if self.selected_column >= columns {
            self.selected_column = columns.saturating_sub(1);
        }
        let len = self.column_len(self.selected_column);
        if self.selected_task >= len {
            self.selected_task = len.saturating_sub(1);
        }
    }

    fn hit_column(&self, x: u16, y: u16) -> Option<usize> {
        self.column_areas
            .iter()
            .position(|area| contains(*area, x, y))
    }

    fn hit_task(&self, x: u16, y: u16) -> Option<(usize, usize)> {
        let col = self.hit_column(x, y)?;
        let area = self.column_areas[col];
        let inner_top = area.y + 1;
        let inner_bottom = area.y + area.height.saturating_sub(1);
        if y < inner_top || y >= inner_bottom {
            return None;
        }
        let offset = self.scroll_offsets.get(col).copied().unwrap_or(0);
        let row = offset + ((y - inner_top) / TASK_ITEM_HEIGHT) as usize;
        if row < self.column_len(col) {
            Some((col, row))
        } else {
            None
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn popup_block(title: &'static str, color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(cursor)
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => Color::LightGreen,
        NoticeLevel::Warning => Color::LightYellow,
        NoticeLevel::Error => Color::LightRed,
    }
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn task_item(task: &Task, width: u16, selected: bool, dragged: bool) -> ListItem<'static> {
    let inner = width.saturating_sub(2) as usize;
    let lines = vec![
        Line::from(Span::styled(
            format!(" {}", truncate_text(&task.text, inner)),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {}", truncate_text(&format!("{} - {}", task.category, task.kind), inner)),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let mut style = Style::default().bg(Color::Rgb(22, 24, 30)).fg(Color::Gray);
    if selected {
        style = Style::default()
            .bg(Color::Rgb(252, 214, 112))
            .fg(Color::Black);
    }
    if dragged {
        style = style.add_modifier(Modifier::DIM | Modifier::ITALIC);
    }
    ListItem::new(lines).style(style)
}

fn field_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(value.to_string(), value_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskType;
    use crate::storage::{load_state, save_categories, MemoryStore};
    use ratatui::backend::TestBackend;

    fn app_with(categories: &[&str]) -> App<MemoryStore> {
        let mut store = MemoryStore::new();
        let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        save_categories(&mut store, &categories).unwrap();
        let board = TaskBoard::load(store, Toasts::default()).unwrap();
        App::new(board, "memory".into())
    }

    fn press(app: &mut App<MemoryStore>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn type_text(app: &mut App<MemoryStore>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn mouse(app: &mut App<MemoryStore>, kind: MouseEventKind, column: u16, row: u16) {
        app.handle_mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
        .unwrap();
    }

    fn render(app: &mut App<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn add_task_via_form(app: &mut App<MemoryStore>, text: &str, category_steps: usize) {
        press(app, KeyCode::Char('n'));
        type_text(app, text);
        press(app, KeyCode::Tab);
        for _ in 0..category_steps {
            press(app, KeyCode::Right);
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn empty_board_invites_adding_a_category() {
        let mut app = app_with(&[]);
        let screen = render(&mut app);
        assert!(screen.contains("No categories yet"));
    }

    #[test]
    fn category_form_adds_a_column() {
        let mut app = app_with(&["home"]);
        press(&mut app, KeyCode::Char('c'));
        type_text(&mut app, "work");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.board.categories(), ["home", "work"]);
        assert_eq!(app.selected_column, 1);
        let screen = render(&mut app);
        assert!(screen.contains("work (0)"));
    }

    #[test]
    fn duplicate_category_keeps_form_open() {
        let mut app = app_with(&["home"]);
        press(&mut app, KeyCode::Char('c'));
        type_text(&mut app, "home");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::AddingCategory(_)));
        assert_eq!(app.board.categories(), ["home"]);
    }

    #[test]
    fn task_form_requires_a_category() {
        let mut app = app_with(&["home"]);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "buy milk");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::AddingTask(_)));
        assert!(app.board.tasks().is_empty());
        let notice = app.board.notifier().visible().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[test]
    fn task_form_adds_task_with_chosen_type() {
        let mut app = app_with(&["home", "work"]);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "report");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let task = &app.board.tasks()[0];
        assert_eq!(task.text, "report");
        assert_eq!(task.category, "work");
        assert_eq!(task.kind, TaskType::OneOff);
        assert_eq!((app.selected_column, app.selected_task), (1, 0));
        let screen = render(&mut app);
        assert!(screen.contains("Task added"));
        assert!(screen.contains("work - one-off"));
    }

    #[test]
    fn keyboard_drag_moves_task_between_columns() {
        let mut app = app_with(&["home", "work"]);
        add_task_via_form(&mut app, "buy milk", 1);
        assert_eq!(app.selected_column, 0);

        press(&mut app, KeyCode::Char('g'));
        assert!(matches!(app.mode, Mode::Dragging(_)));
        press(&mut app, KeyCode::Right);
        let screen = render(&mut app);
        assert!(screen.contains("drop here"));
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.board.tasks()[0].category, "work");
        assert_eq!(app.selected_column, 1);
    }

    #[test]
    fn escape_cancels_a_drag() {
        let mut app = app_with(&["home", "work"]);
        add_task_via_form(&mut app, "buy milk", 1);
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.board.tasks()[0].category, "home");
    }

    #[test]
    fn mouse_drag_drops_on_the_released_column() {
        let mut app = app_with(&["home", "work"]);
        add_task_via_form(&mut app, "buy milk", 1);
        render(&mut app);

        let home = app.column_areas[0];
        let work = app.column_areas[1];
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), home.x + 2, home.y + 1);
        assert!(matches!(app.mode, Mode::Dragging(_)));
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), work.x + 2, work.y + 3);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), work.x + 2, work.y + 3);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.board.tasks()[0].category, "work");
        let stored = load_state(app.board.store()).unwrap();
        assert_eq!(stored.tasks[0].category, "work");
    }

    #[test]
    fn mouse_click_without_drag_only_selects() {
        let mut app = app_with(&["home", "work"]);
        add_task_via_form(&mut app, "buy milk", 1);
        render(&mut app);
        let home = app.column_areas[0];
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), home.x + 2, home.y + 1);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), home.x + 2, home.y + 1);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.board.tasks()[0].category, "home");
    }

    #[test]
    fn removing_a_category_waits_for_confirmation() {
        let mut app = app_with(&["home", "work"]);
        add_task_via_form(&mut app, "buy milk", 2);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('x'));
        assert!(matches!(app.mode, Mode::ConfirmRemoval(_)));
        let screen = render(&mut app);
        assert!(screen.contains("Remove \"work\"?"));

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.board.categories(), ["home", "work"]);
        assert_eq!(app.board.tasks().len(), 1);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.board.categories(), ["home"]);
        assert!(app.board.tasks().is_empty());
        assert_eq!(app.selected_column, 0);
    }

    #[test]
    fn delete_key_removes_selected_task() {
        let mut app = app_with(&["home"]);
        add_task_via_form(&mut app, "one", 1);
        add_task_via_form(&mut app, "two", 0);
        assert_eq!(app.selected_task, 1);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.board.tasks().len(), 1);
        assert_eq!(app.board.tasks()[0].text, "one");
        assert_eq!(app.selected_task, 0);
    }

    #[test]
    fn field_value_edits_multibyte_text() {
        let mut field = FieldValue::new("zadań");
        field.backspace();
        assert_eq!(field.value, "zada");
        field.move_left();
        field.insert_char('ł');
        assert_eq!(field.value, "zadła");
        assert_eq!(field.with_caret(), "zadł▌a");
    }

    #[test]
    fn truncate_text_marks_cut_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long task name", 8), "a lon...");
    }
}
