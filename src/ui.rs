use std::collections::BTreeSet;
use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use crossterm::event::{
	self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEvent, KeyEventKind,
	KeyModifiers, KeyboardEnhancementFlags, ModifierKeyCode, MouseButton, MouseEvent, MouseEventKind,
	PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
	disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};

use crate::domain::{DayId, DayRecord, HourTotals, SLOTS_PER_DAY, SlotStatus};
use crate::selection::ModifierKey;
use crate::session::{EditState, Editor};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const SELECTED_SLOT_BACKGROUND_COLOR: Color = Color::Blue;
const WORK_COLOR: Color = Color::Rgb(74, 222, 128);
const NC_COLOR: Color = Color::Rgb(253, 186, 116);
const REST_COLOR: Color = Color::Gray;
const ROW_LABEL_WIDTH: usize = 8;
const CELL_WIDTH: usize = 3;
const COLLAPSED_DAY_HEIGHT: u16 = 5;
const EXPANDED_DAY_HEIGHT: u16 = 10;

pub fn run_dashboard(editor: &mut Editor) -> Result<(), Box<dyn Error>> {
	let mut session = TerminalSession::enter()?;
	info!("dashboard mounted");

	let result = run_event_loop(&mut session.terminal, editor);

	editor.unmount();
	drop(session);
	info!("dashboard unmounted");
	result
}

/// Raw mode, alternate screen, mouse capture and key release reporting,
/// all undone when the session is dropped.
struct TerminalSession {
	terminal: Terminal<CrosstermBackend<io::Stdout>>,
	keyboard_enhanced: bool,
}

impl TerminalSession {
	fn enter() -> Result<Self, Box<dyn Error>> {
		enable_raw_mode()?;
		let terminal = match Terminal::new(CrosstermBackend::new(io::stdout())) {
			Ok(terminal) => terminal,
			Err(err) => {
				let _ = disable_raw_mode();
				return Err(err.into());
			}
		};

		let mut session = Self {
			terminal,
			keyboard_enhanced: false,
		};
		execute!(session.terminal.backend_mut(), EnterAlternateScreen, EnableMouseCapture)?;
		if matches!(supports_keyboard_enhancement(), Ok(true)) {
			execute!(
				session.terminal.backend_mut(),
				PushKeyboardEnhancementFlags(
					KeyboardEnhancementFlags::REPORT_EVENT_TYPES
						| KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
				)
			)?;
			session.keyboard_enhanced = true;
		}

		Ok(session)
	}
}

impl Drop for TerminalSession {
	fn drop(&mut self) {
		if self.keyboard_enhanced {
			let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
		}
		let _ = disable_raw_mode();
		let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture);
		let _ = self.terminal.show_cursor();
	}
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	editor: &mut Editor,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	loop {
		app.clamp(editor);
		let mut hits = HitMap::default();
		terminal.draw(|frame| draw_dashboard(frame, &app, editor, &mut hits))?;

		if !event::poll(StdDuration::from_millis(250))? {
			continue;
		}

		let should_quit = match event::read()? {
			CEvent::Key(key) => handle_key(&mut app, editor, key),
			CEvent::Mouse(mouse) => {
				handle_mouse(&mut app, editor, mouse, &hits);
				false
			}
			_ => false,
		};

		if should_quit {
			break;
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, editor: &Editor, hits: &mut HitMap) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(COLLAPSED_DAY_HEIGHT), Constraint::Length(5)])
		.split(frame.area());

	let grid_width = (ROW_LABEL_WIDTH + CELL_WIDTH * SLOTS_PER_DAY + 2) as u16;
	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Min(grid_width), Constraint::Length(34)])
		.split(layout[0]);

	render_week_panel(frame, body[0], app, editor, hits);
	render_week_stats_panel(frame, body[1], editor);
	render_footer(frame, layout[1], app, editor);
}

fn render_week_panel(frame: &mut Frame, area: Rect, app: &App, editor: &Editor, hits: &mut HitMap) {
	let days = editor.week().days();
	let mut constraints = days
		.iter()
		.map(|day| {
			if editor.expanded_day() == Some(day.id()) {
				Constraint::Length(EXPANDED_DAY_HEIGHT)
			} else {
				Constraint::Length(COLLAPSED_DAY_HEIGHT)
			}
		})
		.collect::<Vec<_>>();
	constraints.push(Constraint::Min(0));

	let rows = Layout::default()
		.direction(Direction::Vertical)
		.constraints(constraints)
		.split(area);

	for (index, day) in days.iter().enumerate() {
		render_day_block(frame, rows[index], app, editor, index, day, hits);
	}
}

fn render_day_block(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	editor: &Editor,
	index: usize,
	day: &DayRecord,
	hits: &mut HitMap,
) {
	if area.is_empty() {
		return;
	}

	let expanded = editor.expanded_day() == Some(day.id());
	let title = format!(
		" {} {} · {} {}",
		day.month_label(),
		day.id(),
		day.weekday_label(),
		if expanded { "[editing] " } else { "[edit] " }
	);
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(index == app.focus));
	let inner = block.inner(area);
	frame.render_widget(block, area);
	hits.push(Rect::new(area.x, area.y, area.width, 1), HitTarget::DayHeader(day.id()));

	let mut rows = vec![
		hour_header_row(),
		slot_row(day, editor, app, expanded),
		totals_row(day.totals()),
	];
	if expanded {
		rows.extend(edit_panel_rows(editor));
	}

	let mut lines = Vec::with_capacity(rows.len());
	for (line_index, row) in rows.into_iter().enumerate() {
		let y = inner.y.saturating_add(line_index as u16);
		for (offset, width, target) in &row.targets {
			let cell = Rect::new(inner.x.saturating_add(*offset), y, *width, 1).intersection(inner);
			if !cell.is_empty() {
				hits.push(cell, *target);
			}
		}
		lines.push(Line::from(row.spans));
	}

	frame.render_widget(Paragraph::new(lines), inner);
}

fn hour_header_row() -> RowBuilder {
	let mut row = RowBuilder::default().text(Span::styled(
		format!("{:<ROW_LABEL_WIDTH$}", "Hour"),
		Style::default().fg(Color::DarkGray),
	));
	for hour in 0..SLOTS_PER_DAY {
		row = row.text(Span::styled(
			format!("{hour:>2} "),
			Style::default().fg(Color::DarkGray),
		));
	}
	row
}

fn slot_row(day: &DayRecord, editor: &Editor, app: &App, expanded: bool) -> RowBuilder {
	let mut row = RowBuilder::default().text(Span::styled(
		format!("{:<ROW_LABEL_WIDTH$}", "Status"),
		Style::default().fg(Color::DarkGray),
	));

	for (hour, status) in day.slots().iter().enumerate() {
		let mut style = Style::default().fg(status_color(status));
		if expanded && editor.is_selected(hour) {
			style = style.bg(SELECTED_SLOT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD);
		}
		if expanded && hour == app.cursor {
			style = style.add_modifier(Modifier::UNDERLINED);
		}

		let cell = Span::styled(format!(" {} ", status_glyph(status)), style);
		row = if expanded {
			row.target(cell, HitTarget::Slot(hour))
		} else {
			row.text(cell)
		};
	}
	row
}

fn totals_row(totals: HourTotals) -> RowBuilder {
	RowBuilder::default()
		.text(format!("{:<ROW_LABEL_WIDTH$}", ""))
		.text(Span::styled("Work: ", Style::default().add_modifier(Modifier::BOLD)))
		.text(format!("{}h  ", totals.work))
		.text(Span::styled("Rest: ", Style::default().add_modifier(Modifier::BOLD)))
		.text(format!("{}h  ", totals.rest))
		.text(Span::styled("NC: ", Style::default().add_modifier(Modifier::BOLD)))
		.text(format!("{}h", totals.non_compliant))
}

fn edit_panel_rows(editor: &Editor) -> Vec<RowBuilder> {
	let mut apply_row = RowBuilder::default().text(Span::styled(
		format!("{:<ROW_LABEL_WIDTH$}", "Apply"),
		Style::default().fg(Color::DarkGray),
	));
	for status in SlotStatus::ALL {
		apply_row = apply_row
			.target(
				Span::styled(
					format!("[ {} {} ]", status_glyph(status), status.label()),
					Style::default().fg(status_color(status)),
				),
				HitTarget::Apply(status),
			)
			.text(" ");
	}
	apply_row = apply_row
		.text(Span::styled(
			format!(" {} + Click for multi-select ", modifier_label(editor.modifier().key())),
			Style::default().fg(Color::DarkGray),
		))
		.target(Span::raw("[ Clear Selection ]"), HitTarget::ClearSelection);

	let selected = if editor.selection().is_empty() {
		"none".to_string()
	} else {
		format_hours(editor.selection())
	};
	let mut selection_row = RowBuilder::default()
		.text(Span::styled(
			format!("{:<ROW_LABEL_WIDTH$}", "Selected"),
			Style::default().fg(Color::DarkGray),
		))
		.text(selected);
	if editor.is_dragging() {
		selection_row = selection_row.text(Span::styled(" (dragging)", Style::default().fg(Color::Yellow)));
	}
	if editor.modifier().is_held() {
		selection_row = selection_row.text(Span::styled(
			format!(" ({} held)", modifier_label(editor.modifier().key())),
			Style::default().fg(Color::Yellow),
		));
	}

	let actions_row = RowBuilder::default()
		.text(format!("{:<ROW_LABEL_WIDTH$}", ""))
		.target(
			Span::styled("[ x Cancel ]", Style::default().fg(Color::LightRed)),
			HitTarget::Cancel,
		)
		.text("  ")
		.target(
			Span::styled("[ Save ]", Style::default().fg(Color::LightBlue)),
			HitTarget::Save,
		);

	let heading_row = match editor.expanded_record() {
		Some(day) => RowBuilder::default().text(Span::styled(
			format!("Edit: {} {}", day.month_label(), day.id()),
			Style::default().add_modifier(Modifier::BOLD),
		)),
		None => RowBuilder::default(),
	};

	vec![
		heading_row,
		apply_row,
		selection_row,
		RowBuilder::default(),
		actions_row,
	]
}

fn render_week_stats_panel(frame: &mut Frame, area: Rect, editor: &Editor) {
	let week = editor.week();
	let mut lines = vec![Line::from("Day        Work  Rest  NC"), Line::from("")];
	for day in week.days() {
		let totals = day.totals();
		lines.push(Line::from(format!(
			"{} {:>2}     {:>4}  {:>4}  {:>2}",
			day.date().format("%a"),
			day.id(),
			totals.work,
			totals.rest,
			totals.non_compliant
		)));
	}

	let totals = week.week_totals();
	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		format!(
			"Total      {:>4}  {:>4}  {:>2}",
			totals.work, totals.rest, totals.non_compliant
		),
		Style::default().add_modifier(Modifier::BOLD),
	)));
	lines.push(Line::from(""));
	lines.push(Line::from(
		SlotStatus::ALL
			.into_iter()
			.flat_map(|status| {
				[
					Span::styled(status_glyph(status).to_string(), Style::default().fg(status_color(status))),
					Span::raw(format!(" {}  ", status.label())),
				]
			})
			.collect::<Vec<_>>(),
	));

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Week"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, editor: &Editor) {
	let footer_lines = match editor.state() {
		EditState::Collapsed => vec![
			Line::from("arrows/jk choose day | Enter/e or click a day title to edit | q quit"),
			Line::from(""),
			Line::from(app.status.clone()),
		],
		EditState::Expanded(_) => vec![
			Line::from("click/drag hours | hl move cursor | space select | w work | r rest | n nc"),
			Line::from(format!(
				"{} + click/space toggles | c clear selection | Esc cancel | s save | q quit",
				modifier_label(editor.modifier().key())
			)),
			Line::from(app.status.clone()),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn handle_key(app: &mut App, editor: &mut Editor, key: KeyEvent) -> bool {
	if let KeyCode::Modifier(code) = key.code {
		if let Some(modifier) = modifier_for_code(code) {
			match key.kind {
				KeyEventKind::Press | KeyEventKind::Repeat => editor.key_down(modifier),
				KeyEventKind::Release => editor.key_up(modifier),
			}
		}
		return false;
	}

	editor.sync_modifier(modifier_held(key.modifiers, editor.modifier().key()));
	if key.kind != KeyEventKind::Press {
		return false;
	}

	handle_normal_key(app, editor, key.code)
}

fn handle_normal_key(app: &mut App, editor: &mut Editor, code: KeyCode) -> bool {
	match code {
		KeyCode::Char('q') => true,
		KeyCode::Esc => {
			if editor.state() == EditState::Collapsed {
				return true;
			}
			editor.cancel();
			app.status = "Edit cancelled".to_string();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			app.move_focus(-1, editor);
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			app.move_focus(1, editor);
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			app.move_cursor(-1);
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			app.move_cursor(1);
			false
		}
		KeyCode::Enter | KeyCode::Char('e') => {
			if let Some(day) = editor.week().day(app.focus).map(DayRecord::id) {
				toggle_day(app, editor, day);
			}
			false
		}
		KeyCode::Char(' ') => {
			if editor.state() == EditState::Collapsed {
				app.status = "Open a day to select hours".to_string();
				return false;
			}
			editor.pointer_down(app.cursor);
			editor.pointer_up_global();
			false
		}
		KeyCode::Char('w') => {
			apply(app, editor, SlotStatus::Work);
			false
		}
		KeyCode::Char('r') => {
			apply(app, editor, SlotStatus::Rest);
			false
		}
		KeyCode::Char('n') => {
			apply(app, editor, SlotStatus::NonCompliant);
			false
		}
		KeyCode::Char('c') => {
			editor.clear_selection();
			app.status = "Selection cleared".to_string();
			false
		}
		KeyCode::Char('s') => {
			if editor.state() != EditState::Collapsed {
				editor.save();
				app.status = "Saved".to_string();
			}
			false
		}
		_ => false,
	}
}

fn handle_mouse(app: &mut App, editor: &mut Editor, mouse: MouseEvent, hits: &HitMap) {
	editor.sync_modifier(modifier_held(mouse.modifiers, editor.modifier().key()));
	let target = hits.target_at(mouse.column, mouse.row);

	match mouse.kind {
		MouseEventKind::Down(MouseButton::Left) => match target {
			Some(HitTarget::Slot(hour)) => {
				app.cursor = hour;
				editor.pointer_down(hour);
			}
			Some(HitTarget::DayHeader(day)) => toggle_day(app, editor, day),
			Some(HitTarget::Apply(status)) => apply(app, editor, status),
			Some(HitTarget::ClearSelection) => {
				editor.clear_selection();
				app.status = "Selection cleared".to_string();
			}
			Some(HitTarget::Cancel) => {
				editor.cancel();
				app.status = "Edit cancelled".to_string();
			}
			Some(HitTarget::Save) => {
				editor.save();
				app.status = "Saved".to_string();
			}
			None => {}
		},
		MouseEventKind::Drag(MouseButton::Left) => {
			if let Some(HitTarget::Slot(hour)) = target {
				app.cursor = hour;
				editor.pointer_enter(hour);
			}
		}
		MouseEventKind::Up(_) => editor.pointer_up_global(),
		_ => {}
	}
}

fn toggle_day(app: &mut App, editor: &mut Editor, day: DayId) {
	match editor.expand_toggle(day) {
		Ok(EditState::Expanded(day)) => {
			if let Ok(index) = editor.week().get_day(day) {
				app.focus = index;
			}
			app.cursor = 0;
			app.status = format!("Editing day {day}");
		}
		Ok(EditState::Collapsed) => app.status = "Editor closed".to_string(),
		Err(err) => app.status = format!("error: {err}"),
	}
}

fn apply(app: &mut App, editor: &mut Editor, status: SlotStatus) {
	app.status = match editor.apply_status(status) {
		Ok(Some(applied)) => format!(
			"Set {} hour(s) of day {} to {}",
			applied.hours,
			applied.day,
			applied.status.label()
		),
		Ok(None) => "Select hours first".to_string(),
		Err(err) => {
			warn!(%err, "apply refused");
			format!("error: {err}")
		}
	};
}

fn modifier_for_code(code: ModifierKeyCode) -> Option<ModifierKey> {
	match code {
		ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => Some(ModifierKey::Shift),
		ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Some(ModifierKey::Control),
		ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => Some(ModifierKey::Alt),
		_ => None,
	}
}

fn modifier_held(modifiers: KeyModifiers, key: ModifierKey) -> bool {
	match key {
		ModifierKey::Shift => modifiers.contains(KeyModifiers::SHIFT),
		ModifierKey::Control => modifiers.contains(KeyModifiers::CONTROL),
		ModifierKey::Alt => modifiers.contains(KeyModifiers::ALT),
	}
}

fn modifier_label(key: ModifierKey) -> &'static str {
	match key {
		ModifierKey::Shift => "Shift",
		ModifierKey::Control => "Ctrl",
		ModifierKey::Alt => "Alt",
	}
}

fn status_glyph(status: SlotStatus) -> char {
	match status {
		SlotStatus::Rest => '·',
		SlotStatus::Work => '●',
		SlotStatus::NonCompliant => '▲',
	}
}

fn status_color(status: SlotStatus) -> Color {
	match status {
		SlotStatus::Rest => REST_COLOR,
		SlotStatus::Work => WORK_COLOR,
		SlotStatus::NonCompliant => NC_COLOR,
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

/// Renders hours as compact ranges, e.g. `8-10, 14`.
fn format_hours(hours: &BTreeSet<usize>) -> String {
	let mut ranges: Vec<(usize, usize)> = Vec::new();
	for &hour in hours {
		match ranges.last_mut() {
			Some((_, end)) if *end + 1 == hour => *end = hour,
			_ => ranges.push((hour, hour)),
		}
	}

	ranges
		.into_iter()
		.map(|(start, end)| {
			if start == end {
				start.to_string()
			} else {
				format!("{start}-{end}")
			}
		})
		.collect::<Vec<_>>()
		.join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitTarget {
	DayHeader(DayId),
	Slot(usize),
	Apply(SlotStatus),
	ClearSelection,
	Cancel,
	Save,
}

#[derive(Debug, Default)]
struct HitMap {
	regions: Vec<(Rect, HitTarget)>,
}

impl HitMap {
	fn push(&mut self, area: Rect, target: HitTarget) {
		self.regions.push((area, target));
	}

	fn target_at(&self, column: u16, row: u16) -> Option<HitTarget> {
		let position = Position::new(column, row);
		self.regions
			.iter()
			.rev()
			.find(|(area, _)| area.contains(position))
			.map(|(_, target)| *target)
	}
}

#[derive(Default)]
struct RowBuilder {
	spans: Vec<Span<'static>>,
	targets: Vec<(u16, u16, HitTarget)>,
}

impl RowBuilder {
	fn text(mut self, span: impl Into<Span<'static>>) -> Self {
		self.spans.push(span.into());
		self
	}

	fn target(mut self, span: Span<'static>, target: HitTarget) -> Self {
		let offset = self.width();
		self.targets.push((offset, span.width() as u16, target));
		self.spans.push(span);
		self
	}

	fn width(&self) -> u16 {
		self.spans.iter().map(Span::width).sum::<usize>() as u16
	}
}

#[derive(Debug, Clone)]
struct App {
	focus: usize,
	cursor: usize,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			focus: 0,
			cursor: 0,
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn clamp(&mut self, editor: &Editor) {
		self.focus = self.focus.min(editor.week().len().saturating_sub(1));
		self.cursor = self.cursor.min(SLOTS_PER_DAY - 1);
	}

	fn move_focus(&mut self, delta: i32, editor: &Editor) {
		let len = editor.week().len();
		if len == 0 {
			return;
		}
		let next = (self.focus as i32 + delta).clamp(0, len as i32 - 1);
		self.focus = next as usize;
	}

	fn move_cursor(&mut self, delta: i32) {
		let next = (self.cursor as i32 + delta).clamp(0, SLOTS_PER_DAY as i32 - 1);
		self.cursor = next as usize;
	}
}
