use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Datelike, Duration, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::domain::{Board, Importance, Urgency, date_label};
use crate::ledger::{MonthGroup, chart_ticks};
use crate::schedule::{DayStatus, TimelineLayout, daily_statuses, timeline_layout};
use crate::storage::save_board;
use crate::timer::{FocusTimer, TimerMode};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const CHART_BAR_WIDTH: usize = 20;

pub fn run_dashboard(board: &mut Board, board_path: &Path) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, board, board_path);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

// Counts whole elapsed seconds for the state machine. While the timer is
// paused the reference point follows the clock, so a resume can neither
// replay the paused span nor fire twice for one second.
struct Ticker {
	last: Instant,
}

impl Ticker {
	fn new() -> Self {
		Self {
			last: Instant::now(),
		}
	}

	fn drain(&mut self, active: bool) -> u64 {
		let now = Instant::now();
		if !active {
			self.last = now;
			return 0;
		}

		let seconds = now.duration_since(self.last).as_secs();
		if seconds > 0 {
			self.last += StdDuration::from_secs(seconds);
		}
		seconds
	}
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	board: &mut Board,
	board_path: &Path,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();
	let mut timer = FocusTimer::new(&board.settings);
	let mut ticker = Ticker::new();

	loop {
		let today = Local::now().date_naive();
		for _ in 0..ticker.drain(timer.is_active) {
			if let Some(next_mode) = timer.on_tick(board, today) {
				app.status = match next_mode {
					TimerMode::Pomodoro => "break over, back to focus".to_string(),
					TimerMode::ShortBreak | TimerMode::LongBreak => {
						"pomodoro logged, time for a break".to_string()
					}
				};
				if let Err(err) = save_board(board_path, board) {
					app.status = format!("error: {err}");
				}
			}
		}

		let view = build_view(&app, board, &timer, today);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view, board, &timer))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => {
						handle_prompt_key(&mut app, key.code, board, board_path, &mut timer)
					}
					InputMode::Select(_) => handle_select_key(&mut app, key.code, board, board_path),
					InputMode::Normal => handle_normal_key(
						&mut app,
						key.code,
						board,
						board_path,
						&mut timer,
						&view,
						today,
					),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel, board: &Board, timer: &FocusTimer) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(7), Constraint::Min(12), Constraint::Length(4)])
		.split(frame.area());

	render_timer_panel(frame, layout[0], board, timer, view);

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
		.split(layout[1]);

	let left = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(11), Constraint::Min(8)])
		.split(body[0]);

	render_calendar_panel(frame, left[0], app, &view.calendar_marks);
	render_explorer_panel(frame, left[1], app, view);
	render_overview_panel(frame, body[1], app, view, board);
	render_footer(frame, layout[2], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_timer_panel(frame: &mut Frame, area: Rect, board: &Board, timer: &FocusTimer, view: &ViewModel) {
	let mut tabs = Vec::new();
	for mode in [TimerMode::Pomodoro, TimerMode::ShortBreak, TimerMode::LongBreak] {
		let accent = mode_color(board, mode);
		let style = if mode == timer.mode {
			Style::default().fg(Color::Black).bg(accent).add_modifier(Modifier::BOLD)
		} else {
			Style::default().fg(Color::DarkGray)
		};
		tabs.push(Span::styled(format!(" {} ", mode.title()), style));
		tabs.push(Span::raw(" "));
	}

	let state = if timer.is_active { "RUNNING" } else { "PAUSED" };
	let clock_style = Style::default()
		.fg(mode_color(board, timer.mode))
		.add_modifier(Modifier::BOLD);

	let lines = vec![
		Line::from(tabs),
		Line::from(""),
		Line::from(vec![
			Span::styled(format!("  {}  ", timer.display()), clock_style),
			Span::raw(state),
		]),
		Line::from(format!(
			"sessions this run: {} | today: {}m | focus: {}",
			timer.completed_pomodoros, view.today_minutes, view.focus_label
		)),
		Line::from("space start/pause | s skip | r reset | 1/2/3 mode"),
	];

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timer"));
	frame.render_widget(panel, area);
}

fn render_calendar_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	marks: &HashMap<NaiveDate, CalendarMark>,
) {
	let month = app.calendar_month;
	let selected_day = app.selected_day;
	let mut lines = Vec::new();
	lines.push(Line::from(format!("{} {}", month.format("%B"), month.year())));
	lines.push(Line::from("Mo Tu We Th Fr Sa Su"));

	let first_weekday = month.weekday().number_from_monday() as usize - 1;
	let days_in_month = days_in_month(month.year(), month.month());
	let mut day_counter = 1u32;
	for week in 0..6 {
		let mut spans = Vec::new();
		for weekday_index in 0..7 {
			let before_first = week == 0 && weekday_index < first_weekday;
			let after_last = day_counter > days_in_month;
			if before_first || after_last {
				spans.push(Span::raw("   "));
				continue;
			}

			let date = NaiveDate::from_ymd_opt(month.year(), month.month(), day_counter)
				.expect("calendar day must be valid");
			let mut style = Style::default();
			if let Some(mark) = marks.get(&date) {
				style = match mark {
					CalendarMark::Done => Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
					CalendarMark::Missed => Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
					CalendarMark::Upcoming => Style::default().fg(Color::DarkGray),
					CalendarMark::Active => Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD),
				};
			}
			if date == selected_day {
				style = Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD);
			}

			spans.push(Span::styled(format!("{:>2} ", day_counter), style));
			day_counter += 1;
		}
		lines.push(Line::from(spans));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Calendar")
		.border_style(border_style(app.focus == FocusPane::Calendar));
	let calendar = Paragraph::new(lines).block(block);
	frame.render_widget(calendar, area);
}

fn render_explorer_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let title = match &app.explorer_mode {
		ExplorerMode::Projects => "Projects".to_string(),
		ExplorerMode::ProjectSubtasks { project_name, .. } => format!("Subtasks: {project_name}"),
	};

	let items = view
		.explorer_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.explorer_rows.is_empty() {
		state.select(Some(app.explorer_index.min(view.explorer_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Explorer));
	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(empty)")]
	} else {
		items
	})
	.block(block)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_overview_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel, board: &Board) {
	let lines = match app.overview {
		OverviewTab::Chart => chart_lines(view),
		OverviewTab::Timeline => timeline_lines(&view.timeline, area),
		OverviewTab::Day => day_lines(app.selected_day, view, board),
	};

	let title = format!("Overview: {} (v to switch)", app.overview.title());
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Overview));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn chart_lines(view: &ViewModel) -> Vec<Line<'static>> {
	if view.chart_months.is_empty() {
		return vec![Line::from("(no sessions recorded yet)")];
	}

	let top = view.chart_top.max(1);
	let mut lines = Vec::new();
	for group in &view.chart_months {
		lines.push(Line::from(Span::styled(
			group.title.clone(),
			Style::default().add_modifier(Modifier::BOLD),
		)));
		for entry in &group.days {
			let width = ((entry.minutes as f64 / top as f64) * CHART_BAR_WIDTH as f64).round() as usize;
			let bar = "=".repeat(width.min(CHART_BAR_WIDTH));
			lines.push(Line::from(format!(
				"  {} {:>5}m {}",
				entry.day.format("%d %a"),
				entry.minutes,
				bar
			)));
		}
		lines.push(Line::from(""));
	}
	lines.push(Line::from(format!("scale 0..{top}m")));
	lines
}

fn timeline_lines(layout: &TimelineLayout, area: Rect) -> Vec<Line<'static>> {
	let Some(first) = layout.axis.days.first().copied() else {
		return vec![Line::from("(nothing to lay out)")];
	};
	let last = layout.axis.days.last().copied().unwrap_or(first);

	let gutter = 16usize;
	let cells = (area.width as usize)
		.saturating_sub(gutter + 3)
		.min(layout.axis.days.len())
		.max(1);

	let mut lines = Vec::new();
	lines.push(Line::from(format!(
		"{} .. {} ({} days)",
		first,
		last,
		layout.axis.days.len()
	)));

	if let Some(index) = layout.axis.today_index {
		if index < cells {
			lines.push(Line::from(format!(
				"{:>gutter$} {}v today",
				"",
				" ".repeat(index),
			)));
		}
	}

	if layout.bars.is_empty() {
		lines.push(Line::from("(no one-off projects)"));
		return lines;
	}

	for bar in &layout.bars {
		let start_index = layout
			.axis
			.days
			.iter()
			.position(|day| *day == bar.start)
			.unwrap_or(0);
		lines.push(Line::from(vec![
			Span::styled(
				format!("{:<gutter$}", clipped(&bar.name, gutter)),
				Style::default().add_modifier(Modifier::BOLD),
			),
			Span::raw(format!(
				" {} {:>3.0}%",
				track_cells(start_index, bar.span_days as f64, bar.fill, cells, '='),
				(bar.fill * 100.0).min(999.0)
			)),
		]));

		for subtask in &bar.subtasks {
			// Fractional offsets round only here, at cell granularity.
			let offset = start_index as f64 + subtask.offset_days;
			lines.push(Line::from(format!(
				"  {:<14} {} {:>3.0}%",
				clipped(&subtask.name, 14),
				track_cells(offset.round() as usize, subtask.span_days, subtask.fill, cells, '-'),
				(subtask.fill * 100.0).min(999.0)
			)));
		}
	}

	lines
}

fn track_cells(start: usize, span_days: f64, fill: f64, cells: usize, empty: char) -> String {
	let start = start.min(cells.saturating_sub(1));
	let span = (span_days.round() as usize).max(1).min(cells - start);
	let filled = ((span as f64) * fill.clamp(0.0, 1.0)).round() as usize;

	let mut track = String::new();
	for _ in 0..start {
		track.push(' ');
	}
	for index in 0..span {
		track.push(if index < filled { '#' } else { empty });
	}
	track
}

fn day_lines(selected_day: NaiveDate, view: &ViewModel, board: &Board) -> Vec<Line<'static>> {
	let label = date_label(selected_day);
	let minutes = board
		.history
		.minutes_by_date()
		.get(&label)
		.copied()
		.unwrap_or(0);

	let mut lines = Vec::new();
	lines.push(Line::from(Span::styled(
		label.clone(),
		Style::default().add_modifier(Modifier::BOLD),
	)));
	lines.push(Line::from(format!("focus minutes: {minutes}")));
	lines.push(Line::from(""));

	let mut any = false;
	for project in &board.projects {
		let done = board.history.count_completions(&project.id, &label);
		if done > 0 {
			lines.push(Line::from(format!("{} | {} sessions", project.name, done)));
			any = true;
		}
	}
	if !any {
		lines.push(Line::from("(no attributed sessions)"));
	}

	if let Some(mark) = view.calendar_marks.get(&selected_day) {
		if let Some(status) = mark.status_label() {
			lines.push(Line::from(""));
			lines.push(Line::from(format!("daily goal: {status}")));
		}
	}

	if let Some(note) = board.day_notes.get(&label) {
		lines.push(Line::from(""));
		lines.push(Line::from(Span::styled(
			"note".to_string(),
			Style::default().add_modifier(Modifier::BOLD),
		)));
		for text in note.lines() {
			lines.push(Line::from(format!("  {text}")));
		}
	}

	if let Some(agenda) = board.day_agendas.get(&label) {
		lines.push(Line::from(""));
		lines.push(Line::from(Span::styled(
			"agenda".to_string(),
			Style::default().add_modifier(Modifier::BOLD),
		)));
		for (hour, text) in agenda {
			lines.push(Line::from(format!("  {hour} {text}")));
		}
	}

	lines
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/hjkl navigate | n/N month | Enter open/focus | q quit"),
			Line::from("p project | t subtask | e edit target | c clear focus | d durations | g capacity | v view"),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(62, 55, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()).style(option.style))
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	board: &mut Board,
	board_path: &Path,
	timer: &mut FocusTimer,
	view: &ViewModel,
	today: NaiveDate,
) -> bool {
	match code {
		KeyCode::Char('q') => true,
		KeyCode::Esc => {
			if app.focus == FocusPane::Explorer {
				if let ExplorerMode::ProjectSubtasks { .. } = app.explorer_mode {
					app.explorer_mode = ExplorerMode::Projects;
					app.explorer_index = 0;
					app.status = "Back to projects".to_string();
					return false;
				}
			}
			true
		}
		KeyCode::Tab => {
			app.focus = app.focus.next();
			false
		}
		KeyCode::BackTab => {
			app.focus = app.focus.prev();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(-7),
				FocusPane::Explorer => app.move_explorer_selection(-1, view),
				FocusPane::Overview => app.overview = app.overview.prev(),
			}
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(7),
				FocusPane::Explorer => app.move_explorer_selection(1, view),
				FocusPane::Overview => app.overview = app.overview.next(),
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(-1),
				FocusPane::Explorer => {}
				FocusPane::Overview => app.overview = app.overview.prev(),
			}
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(1),
				FocusPane::Explorer => {}
				FocusPane::Overview => app.overview = app.overview.next(),
			}
			false
		}
		KeyCode::Char('n') => {
			app.shift_selected_month(1);
			false
		}
		KeyCode::Char('N') => {
			app.shift_selected_month(-1);
			false
		}
		KeyCode::Char('v') => {
			app.overview = app.overview.next();
			false
		}
		KeyCode::Char(' ') => {
			timer.toggle();
			app.status = if timer.is_active {
				format!("{} running", timer.mode.title())
			} else {
				format!("{} paused", timer.mode.title())
			};
			false
		}
		KeyCode::Char('s') => {
			let was_pomodoro = timer.mode == TimerMode::Pomodoro;
			let next = timer.skip(board, today);
			if was_pomodoro {
				match persist(board_path, board) {
					Ok(()) => app.status = format!("session logged, next: {}", next.title()),
					Err(err) => app.status = format!("error: {err}"),
				}
			} else {
				app.status = format!("break skipped, next: {}", next.title());
			}
			false
		}
		KeyCode::Char('r') => {
			timer.reset(&board.settings);
			app.status = format!("{} reset", timer.mode.title());
			false
		}
		KeyCode::Char('1') => {
			timer.switch_mode(TimerMode::Pomodoro, &board.settings);
			app.status = "Pomodoro selected".to_string();
			false
		}
		KeyCode::Char('2') => {
			timer.switch_mode(TimerMode::ShortBreak, &board.settings);
			app.status = "Short Break selected".to_string();
			false
		}
		KeyCode::Char('3') => {
			timer.switch_mode(TimerMode::LongBreak, &board.settings);
			app.status = "Long Break selected".to_string();
			false
		}
		KeyCode::Char('p') => {
			app.mode = InputMode::Prompt(PromptState::new("Project name", PromptKind::ProjectName));
			false
		}
		KeyCode::Char('d') => {
			let durations = &board.settings.durations;
			app.mode = InputMode::Prompt(PromptState::new(
				format!(
					"Durations in minutes: pomodoro short long (now {} {} {})",
					durations.pomodoro, durations.short_break, durations.long_break
				),
				PromptKind::EditDurations,
			));
			false
		}
		KeyCode::Char('g') => {
			app.mode = InputMode::Prompt(PromptState::new(
				format!(
					"Daily session capacity (now {})",
					board.settings.daily_target()
				),
				PromptKind::EditDailyTarget,
			));
			false
		}
		KeyCode::Char('t') => {
			if let Some(project_id) = app.selected_project_for_new_subtask(view) {
				app.mode = InputMode::Prompt(PromptState::new(
					"Subtask name",
					PromptKind::SubtaskName { project_id },
				));
			} else {
				app.status = "Select a project first".to_string();
			}
			false
		}
		KeyCode::Char('e') => {
			match app.selected_explorer_row_kind(view) {
				Some(ExplorerRowKind::Subtask {
					project_id,
					subtask_id,
					name,
				}) => {
					app.mode = InputMode::Prompt(PromptState::new(
						format!("New session target for {name}"),
						PromptKind::AdjustTarget {
							project_id,
							subtask_id,
						},
					));
				}
				_ => app.status = "Select a subtask to edit its target".to_string(),
			}
			false
		}
		KeyCode::Char('c') => {
			timer.set_focus(None, None);
			app.status = "Focus attribution cleared".to_string();
			false
		}
		KeyCode::Enter => {
			if app.focus != FocusPane::Explorer {
				return false;
			}
			match app.selected_explorer_row_kind(view) {
				Some(ExplorerRowKind::Project {
					project_id,
					project_name,
				}) => {
					app.explorer_mode = ExplorerMode::ProjectSubtasks {
						project_id,
						project_name,
					};
					app.explorer_index = 0;
				}
				Some(ExplorerRowKind::Subtask {
					project_id,
					subtask_id,
					name,
				}) => {
					timer.set_focus(Some(project_id), Some(subtask_id));
					app.status = format!("focus: {name}");
				}
				Some(ExplorerRowKind::Empty) | None => {}
			}
			false
		}
		_ => false,
	}
}

fn handle_prompt_key(
	app: &mut App,
	code: KeyCode,
	board: &mut Board,
	board_path: &Path,
	timer: &mut FocusTimer,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), board, board_path, timer) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(app: &mut App, code: KeyCode, board: &mut Board, board_path: &Path) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), board, board_path) {
				Ok(SelectOutcome::NextPrompt(prompt)) => app.mode = InputMode::Prompt(prompt),
				Ok(SelectOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(
	prompt: PromptState,
	board: &mut Board,
	board_path: &Path,
	timer: &mut FocusTimer,
) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::EditDurations => {
			let durations = parse_durations(&prompt.input)?;
			board.settings.durations = durations;
			// Only an idle countdown picks the new length up immediately.
			timer.refresh_from_settings(&board.settings);
			persist(board_path, board)?;
			Ok(PromptOutcome::Done(format!(
				"durations set to {}/{}/{} minutes",
				board.settings.durations.pomodoro,
				board.settings.durations.short_break,
				board.settings.durations.long_break
			)))
		}
		PromptKind::EditDailyTarget => {
			let target = parse_count(&prompt.input)?;
			board.settings.daily_pomodoro_target = target;
			persist(board_path, board)?;
			Ok(PromptOutcome::Done(format!("daily capacity set to {target} sessions")))
		}
		PromptKind::ProjectName => {
			let name = required_text(&prompt.input, "project name")?;
			Ok(PromptOutcome::Select(build_project_kind_select(name)))
		}
		PromptKind::DailyEndDate { name } => {
			let ends_on = parse_iso_day(&prompt.input)?;
			let created_name = name.clone();
			board.add_daily_project(name, None, chrono::Utc::now(), ends_on)?;
			persist(board_path, board)?;
			Ok(PromptOutcome::Done(format!("created daily project: {created_name}")))
		}
		PromptKind::SubtaskName { project_id } => {
			let name = required_text(&prompt.input, "subtask name")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Target sessions",
				PromptKind::SubtaskTarget { project_id, name },
			)))
		}
		PromptKind::SubtaskTarget { project_id, name } => {
			let target = parse_count(&prompt.input)?;
			Ok(PromptOutcome::Select(build_quadrant_select(project_id, name, target)))
		}
		PromptKind::AdjustTarget {
			project_id,
			subtask_id,
		} => {
			let target = parse_count(&prompt.input)?;
			let applied = board.set_subtask_target(&project_id, &subtask_id, target)?;
			persist(board_path, board)?;
			Ok(PromptOutcome::Done(format!("target set to {applied}")))
		}
	}
}

fn submit_select(
	select: SelectState,
	board: &mut Board,
	board_path: &Path,
) -> Result<SelectOutcome, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::ProjectKind { name } => {
			if selected_value == "daily" {
				return Ok(SelectOutcome::NextPrompt(PromptState::new(
					"Repeat until (YYYY-MM-DD)",
					PromptKind::DailyEndDate { name },
				)));
			}

			let created_name = name.clone();
			board.add_project(name, None, chrono::Utc::now());
			persist(board_path, board)?;
			Ok(SelectOutcome::Done(format!("created project: {created_name}")))
		}
		SelectKind::SubtaskQuadrant {
			project_id,
			name,
			target,
		} => {
			let (importance, urgency) = match selected_value.as_str() {
				"ie" => (Importance::Important, Urgency::Emergent),
				"in" => (Importance::Important, Urgency::NotEmergent),
				"ne" => (Importance::NotImportant, Urgency::Emergent),
				_ => (Importance::NotImportant, Urgency::NotEmergent),
			};

			let created_name = name.clone();
			board.add_subtask(&project_id, name, None, target, importance, urgency)?;
			persist(board_path, board)?;
			Ok(SelectOutcome::Done(format!("created subtask: {created_name}")))
		}
	}
}

fn build_project_kind_select(name: String) -> SelectState {
	let options = vec![
		SelectOption::new("One-off project", "oneoff".to_string(), Style::default()),
		SelectOption::new(
			"Daily project (repeats until an end date)",
			"daily".to_string(),
			Style::default().fg(Color::LightCyan),
		),
	];
	SelectState::new("Project kind", SelectKind::ProjectKind { name }, options)
}

fn build_quadrant_select(project_id: String, name: String, target: i64) -> SelectState {
	let options = vec![
		SelectOption::new(
			"Important + emergent",
			"ie".to_string(),
			Style::default().fg(Color::LightRed),
		),
		SelectOption::new(
			"Important, not emergent",
			"in".to_string(),
			Style::default().fg(Color::LightYellow),
		),
		SelectOption::new(
			"Not important, emergent",
			"ne".to_string(),
			Style::default().fg(Color::LightBlue),
		),
		SelectOption::new("Not important, not emergent", "nn".to_string(), Style::default()),
	];
	SelectState::new(
		"How does it classify?",
		SelectKind::SubtaskQuadrant {
			project_id,
			name,
			target,
		},
		options,
	)
}

fn build_view(app: &App, board: &Board, timer: &FocusTimer, today: NaiveDate) -> ViewModel {
	let explorer_rows = build_explorer_rows(app, board, timer);
	let calendar_marks = build_calendar_marks(app, board, &explorer_rows, today);

	let chart_months = board.history.month_groups();
	let max_minutes = chart_months
		.iter()
		.map(|group| group.max_minutes())
		.max()
		.unwrap_or(0);
	let chart_top = chart_ticks(max_minutes).last().copied().unwrap_or(10);

	let timeline = timeline_layout(&board.projects, board.settings.daily_target(), today);

	let today_minutes = board
		.history
		.minutes_by_date()
		.get(&date_label(today))
		.copied()
		.unwrap_or(0);

	let focus_label = timer
		.active_project_id
		.as_deref()
		.zip(timer.active_subtask_id.as_deref())
		.and_then(|(project_id, subtask_id)| {
			let project = board.project(project_id)?;
			let subtask = project.subtask(subtask_id)?;
			Some(format!("{} / {}", project.name, subtask.name))
		})
		.unwrap_or_else(|| "(none)".to_string());

	ViewModel {
		calendar_marks,
		explorer_rows,
		chart_months,
		chart_top,
		timeline,
		today_minutes,
		focus_label,
	}
}

// Daily projects paint goal status; everything else just shows activity.
fn build_calendar_marks(
	app: &App,
	board: &Board,
	explorer_rows: &[ExplorerRow],
	today: NaiveDate,
) -> HashMap<NaiveDate, CalendarMark> {
	let mut marks = HashMap::new();

	for label in board.history.minutes_by_date().keys() {
		if let Some(day) = crate::domain::parse_date_label(label) {
			marks.insert(day, CalendarMark::Active);
		}
	}

	let daily_project_id = match &app.explorer_mode {
		ExplorerMode::ProjectSubtasks { project_id, .. } => board
			.project(project_id)
			.filter(|project| project.is_daily)
			.map(|project| project.id.clone()),
		ExplorerMode::Projects => match explorer_rows.get(app.explorer_index) {
			Some(ExplorerRow {
				kind: ExplorerRowKind::Project { project_id, .. },
				..
			}) => board
				.project(project_id)
				.filter(|project| project.is_daily)
				.map(|project| project.id.clone()),
			_ => None,
		},
	};

	if let Some(project_id) = daily_project_id {
		if let Some(project) = board.project(&project_id) {
			for (day, status) in daily_statuses(project, &board.history, today) {
				let mark = match status {
					DayStatus::Success => CalendarMark::Done,
					DayStatus::Failed => CalendarMark::Missed,
					DayStatus::Pending => CalendarMark::Upcoming,
				};
				marks.insert(day, mark);
			}
		}
	}

	marks
}

fn build_explorer_rows(app: &App, board: &Board, timer: &FocusTimer) -> Vec<ExplorerRow> {
	match &app.explorer_mode {
		ExplorerMode::Projects => {
			if board.projects.is_empty() {
				return vec![ExplorerRow::empty("(no projects, press 'p')")];
			}

			board
				.projects
				.iter()
				.map(|project| {
					let detail = if project.is_daily {
						let ends_on = project
							.recurrence_end_date
							.map(|day| day.format("%d %b").to_string())
							.unwrap_or_else(|| "?".to_string());
						format!("daily until {ends_on}")
					} else {
						format!(
							"{}/{}",
							project.total_completed_sessions(),
							project.total_target_sessions()
						)
					};
					let style = if project.is_daily {
						Style::default().fg(Color::LightCyan)
					} else {
						Style::default()
					};
					ExplorerRow {
						line: Line::from(vec![
							Span::styled(project.name.clone(), style),
							Span::raw(format!(" | {detail}")),
						]),
						kind: ExplorerRowKind::Project {
							project_id: project.id.clone(),
							project_name: project.name.clone(),
						},
					}
				})
				.collect::<Vec<_>>()
		}
		ExplorerMode::ProjectSubtasks { project_id, .. } => {
			let Some(project) = board.project(project_id) else {
				return vec![ExplorerRow::empty("(project no longer exists)")];
			};
			if project.subtasks.is_empty() {
				return vec![ExplorerRow::empty("(no subtasks, press 't')")];
			}

			project
				.subtasks
				.iter()
				.map(|subtask| {
					let focused = timer.active_subtask_id.as_deref() == Some(subtask.id.as_str());
					let marker = if focused { "> " } else { "  " };
					let gauge = progress_cells(subtask.fill_fraction(), 10);

					let mut tags = String::new();
					if subtask.importance == Importance::Important {
						tags.push_str(" [!]");
					}
					if subtask.urgency == Urgency::Emergent {
						tags.push_str(" [~]");
					}

					let style = if focused {
						Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD)
					} else {
						Style::default()
					};

					ExplorerRow {
						line: Line::from(vec![Span::styled(
							format!(
								"{}{} [{}] {}/{}{}",
								marker,
								subtask.name,
								gauge,
								subtask.completed_sessions,
								subtask.target_sessions,
								tags
							),
							style,
						)]),
						kind: ExplorerRowKind::Subtask {
							project_id: project.id.clone(),
							subtask_id: subtask.id.clone(),
							name: subtask.name.clone(),
						},
					}
				})
				.collect::<Vec<_>>()
		}
	}
}

fn progress_cells(fill: f64, width: usize) -> String {
	let filled = ((width as f64) * fill.clamp(0.0, 1.0)).round() as usize;
	let mut cells = String::new();
	for index in 0..width {
		cells.push(if index < filled { '#' } else { '-' });
	}
	cells
}

fn persist(path: &Path, board: &Board) -> Result<(), String> {
	save_board(path, board).map_err(|err| err.to_string())
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn parse_durations(input: &str) -> Result<crate::domain::Durations, String> {
	let values = input
		.split_whitespace()
		.map(|part| part.parse::<i64>().ok())
		.collect::<Option<Vec<_>>>()
		.filter(|values| values.len() == 3)
		.ok_or_else(|| "expected three numbers, e.g. '25 5 15'".to_string())?;

	Ok(crate::domain::Durations {
		pomodoro: values[0],
		short_break: values[1],
		long_break: values[2],
	}
	.sanitized())
}

fn parse_count(input: &str) -> Result<i64, String> {
	input
		.trim()
		.parse::<i64>()
		.ok()
		.filter(|value| *value >= 1)
		.ok_or_else(|| format!("expected a positive number, got '{}'", input.trim()))
}

fn parse_iso_day(input: &str) -> Result<NaiveDate, String> {
	NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
		.map_err(|_| format!("expected YYYY-MM-DD, got '{}'", input.trim()))
}

fn clipped(text: &str, max: usize) -> String {
	text.chars().take(max).collect()
}

fn mode_color(board: &Board, mode: TimerMode) -> Color {
	let name = match mode {
		TimerMode::Pomodoro => board.settings.colors.pomodoro.as_str(),
		TimerMode::ShortBreak => board.settings.colors.short_break.as_str(),
		TimerMode::LongBreak => board.settings.colors.long_break.as_str(),
	};
	color_from_name(name).unwrap_or(Color::White)
}

fn color_from_name(color_name: &str) -> Option<Color> {
	match color_name {
		"black" => Some(Color::Black),
		"red" => Some(Color::Red),
		"green" => Some(Color::Green),
		"yellow" => Some(Color::Yellow),
		"blue" => Some(Color::Blue),
		"magenta" => Some(Color::Magenta),
		"cyan" => Some(Color::Cyan),
		"gray" => Some(Color::Gray),
		"dark_gray" => Some(Color::DarkGray),
		"light_red" => Some(Color::LightRed),
		"light_green" => Some(Color::LightGreen),
		"light_yellow" => Some(Color::LightYellow),
		"light_blue" => Some(Color::LightBlue),
		"light_magenta" => Some(Color::LightMagenta),
		"light_cyan" => Some(Color::LightCyan),
		"white" => Some(Color::White),
		_ => None,
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

fn days_in_month(year: i32, month: u32) -> u32 {
	let first_of_next = if month == 12 {
		NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("next year date should be valid")
	} else {
		NaiveDate::from_ymd_opt(year, month + 1, 1).expect("next month date should be valid")
	};
	(first_of_next - Duration::days(1)).day()
}

fn first_day_of_month(day: NaiveDate) -> NaiveDate {
	NaiveDate::from_ymd_opt(day.year(), day.month(), 1).expect("first day of month must be valid")
}

fn shift_month(day: NaiveDate, delta: i32) -> NaiveDate {
	let mut year = day.year();
	let mut month = day.month() as i32 + delta;
	while month > 12 {
		year += 1;
		month -= 12;
	}
	while month < 1 {
		year -= 1;
		month += 12;
	}
	let month_u32 = month as u32;
	let max_day = days_in_month(year, month_u32);
	let target_day = day.day().min(max_day);
	NaiveDate::from_ymd_opt(year, month_u32, target_day).expect("shifted month date must be valid")
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
enum SelectOutcome {
	NextPrompt(PromptState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: String,
	style: Style,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: String, style: Style) -> Self {
		Self {
			label: label.into(),
			value,
			style,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	EditDurations,
	EditDailyTarget,
	ProjectName,
	DailyEndDate {
		name: String,
	},
	SubtaskName {
		project_id: String,
	},
	SubtaskTarget {
		project_id: String,
		name: String,
	},
	AdjustTarget {
		project_id: String,
		subtask_id: String,
	},
}

#[derive(Debug, Clone)]
enum SelectKind {
	ProjectKind {
		name: String,
	},
	SubtaskQuadrant {
		project_id: String,
		name: String,
		target: i64,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Calendar,
	Explorer,
	Overview,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Explorer,
			FocusPane::Explorer => FocusPane::Overview,
			FocusPane::Overview => FocusPane::Calendar,
		}
	}

	fn prev(self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Overview,
			FocusPane::Explorer => FocusPane::Calendar,
			FocusPane::Overview => FocusPane::Explorer,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverviewTab {
	Chart,
	Timeline,
	Day,
}

impl OverviewTab {
	fn title(self) -> &'static str {
		match self {
			OverviewTab::Chart => "Performance",
			OverviewTab::Timeline => "Timeline",
			OverviewTab::Day => "Day",
		}
	}

	fn next(self) -> Self {
		match self {
			OverviewTab::Chart => OverviewTab::Timeline,
			OverviewTab::Timeline => OverviewTab::Day,
			OverviewTab::Day => OverviewTab::Chart,
		}
	}

	fn prev(self) -> Self {
		match self {
			OverviewTab::Chart => OverviewTab::Day,
			OverviewTab::Timeline => OverviewTab::Chart,
			OverviewTab::Day => OverviewTab::Timeline,
		}
	}
}

#[derive(Debug, Clone)]
enum ExplorerMode {
	Projects,
	ProjectSubtasks {
		project_id: String,
		project_name: String,
	},
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	focus: FocusPane,
	selected_day: NaiveDate,
	calendar_month: NaiveDate,
	explorer_mode: ExplorerMode,
	explorer_index: usize,
	overview: OverviewTab,
	mode: InputMode,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		let today = Local::now().date_naive();
		Self {
			focus: FocusPane::Explorer,
			selected_day: today,
			calendar_month: first_day_of_month(today),
			explorer_mode: ExplorerMode::Projects,
			explorer_index: 0,
			overview: OverviewTab::Chart,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn clamp_selection(&mut self, view: &ViewModel) {
		if view.explorer_rows.is_empty() {
			self.explorer_index = 0;
		} else {
			self.explorer_index = self.explorer_index.min(view.explorer_rows.len() - 1);
		}
	}

	fn shift_selected_day(&mut self, delta_days: i64) {
		self.selected_day += Duration::days(delta_days);
		self.calendar_month = first_day_of_month(self.selected_day);
	}

	fn shift_selected_month(&mut self, delta_months: i32) {
		self.selected_day = shift_month(self.selected_day, delta_months);
		self.calendar_month = first_day_of_month(self.selected_day);
	}

	fn move_explorer_selection(&mut self, delta: i32, view: &ViewModel) {
		if view.explorer_rows.is_empty() {
			self.explorer_index = 0;
			return;
		}

		if delta > 0 {
			self.explorer_index = (self.explorer_index + delta as usize).min(view.explorer_rows.len() - 1);
		} else {
			self.explorer_index = self.explorer_index.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_explorer_row_kind(&self, view: &ViewModel) -> Option<ExplorerRowKind> {
		view.explorer_rows
			.get(self.explorer_index)
			.map(|row| row.kind.clone())
	}

	fn selected_project_for_new_subtask(&self, view: &ViewModel) -> Option<String> {
		if let ExplorerMode::ProjectSubtasks { project_id, .. } = &self.explorer_mode {
			return Some(project_id.clone());
		}

		match self.selected_explorer_row_kind(view) {
			Some(ExplorerRowKind::Project { project_id, .. }) => Some(project_id),
			Some(ExplorerRowKind::Subtask { project_id, .. }) => Some(project_id),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalendarMark {
	Active,
	Done,
	Missed,
	Upcoming,
}

impl CalendarMark {
	fn status_label(self) -> Option<&'static str> {
		match self {
			CalendarMark::Done => Some("done"),
			CalendarMark::Missed => Some("missed"),
			CalendarMark::Upcoming => Some("pending"),
			CalendarMark::Active => None,
		}
	}
}

struct ViewModel {
	calendar_marks: HashMap<NaiveDate, CalendarMark>,
	explorer_rows: Vec<ExplorerRow>,
	chart_months: Vec<MonthGroup>,
	chart_top: i64,
	timeline: TimelineLayout,
	today_minutes: i64,
	focus_label: String,
}

#[derive(Clone)]
struct ExplorerRow {
	line: Line<'static>,
	kind: ExplorerRowKind,
}

impl ExplorerRow {
	fn empty(text: impl Into<String>) -> Self {
		Self {
			line: Line::from(text.into()),
			kind: ExplorerRowKind::Empty,
		}
	}
}

#[derive(Debug, Clone)]
enum ExplorerRowKind {
	Empty,
	Project {
		project_id: String,
		project_name: String,
	},
	Subtask {
		project_id: String,
		subtask_id: String,
		name: String,
	},
}
