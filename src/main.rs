mod boards;
mod domain;
mod ledger;
mod schedule;
mod storage;
mod timer;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::boards::{recent_boards, remember_board, resolve_board_path};
use crate::domain::{Board, Importance, Urgency, date_label};
use crate::ledger::chart_ticks;
use crate::schedule::{daily_statuses, timeline_layout};
use crate::storage::{load_board, save_board};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "focusboard", about = "Terminal-first focus timer and project tracker")]
struct Cli {
	#[arg(long)]
	board: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	AddProject {
		#[arg(long)]
		name: String,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		daily: bool,
		#[arg(long)]
		until: Option<NaiveDate>,
	},
	AddSubtask {
		#[arg(long)]
		project: String,
		#[arg(long)]
		name: String,
		#[arg(long)]
		description: Option<String>,
		#[arg(long, default_value_t = 1)]
		target: i64,
		#[arg(long)]
		important: bool,
		#[arg(long)]
		emergent: bool,
	},
	Log {
		#[arg(long)]
		project: String,
		#[arg(long)]
		subtask: Option<String>,
		#[arg(long)]
		date: Option<NaiveDate>,
	},
	ListProjects,
	Summary {
		#[arg(long)]
		day: Option<NaiveDate>,
	},
	Chart,
	Timeline,
	Status {
		#[arg(long)]
		project: String,
	},
	History {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Boards {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Boards { limit }) = &cli.command {
		print_recent_boards(*limit)?;
		return Ok(());
	}

	let board_path = resolve_board_path(cli.board);
	let mut board = load_board(&board_path)?;
	if let Err(err) = remember_board(&board_path) {
		eprintln!("warning: failed to store recent board: {err}");
	}

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			save_board(&board_path, &board)?;
			println!("initialized board at {}", board_path.display());
		}
		Command::Dashboard => {
			run_dashboard(&mut board, &board_path)?;
		}
		Command::AddProject {
			name,
			description,
			daily,
			until,
		} => {
			let project_id = if daily {
				let until =
					until.ok_or("a daily project needs --until <YYYY-MM-DD> for its end date")?;
				board.add_daily_project(name, description, Utc::now(), until)?
			} else {
				board.add_project(name, description, Utc::now())
			};
			save_board(&board_path, &board)?;
			println!("created project {project_id}");
		}
		Command::AddSubtask {
			project,
			name,
			description,
			target,
			important,
			emergent,
		} => {
			let importance = if important {
				Importance::Important
			} else {
				Importance::NotImportant
			};
			let urgency = if emergent {
				Urgency::Emergent
			} else {
				Urgency::NotEmergent
			};
			let subtask_id =
				board.add_subtask(&project, name, description, target, importance, urgency)?;
			save_board(&board_path, &board)?;
			println!("created subtask {subtask_id}");
		}
		Command::Log {
			project,
			subtask,
			date,
		} => {
			if board.project(&project).is_none() {
				return Err(format!("project not found: {project}").into());
			}
			if let Some(subtask_id) = &subtask {
				let known = board
					.project(&project)
					.map(|found| found.subtask(subtask_id).is_some())
					.unwrap_or(false);
				if !known {
					return Err(format!("subtask not found: {subtask_id}").into());
				}
			}

			let day = date.unwrap_or_else(|| Local::now().date_naive());
			board.record_completion(Some(&project), subtask.as_deref(), day);
			save_board(&board_path, &board)?;
			println!("logged session for {}", date_label(day));
		}
		Command::ListProjects => {
			print_projects(&board);
		}
		Command::Summary { day } => {
			print_summary(&board, day.unwrap_or_else(|| Local::now().date_naive()));
		}
		Command::Chart => {
			print_chart(&board);
		}
		Command::Timeline => {
			print_timeline(&board);
		}
		Command::Status { project } => {
			print_status(&board, &project)?;
		}
		Command::History { limit } => {
			print_history(&board, limit);
		}
		Command::Boards { .. } => {}
	}

	Ok(())
}

fn print_recent_boards(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_boards(limit)?;
	if rows.is_empty() {
		println!("no recent boards");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn print_projects(board: &Board) {
	if board.projects.is_empty() {
		println!("no projects yet");
		return;
	}

	for project in &board.projects {
		let kind = if project.is_daily {
			let ends_on = project
				.recurrence_end_date
				.map(|day| day.to_string())
				.unwrap_or_else(|| "?".to_string());
			format!("daily until {ends_on}")
		} else {
			format!(
				"{}/{} sessions",
				project.total_completed_sessions(),
				project.total_target_sessions()
			)
		};
		println!("{} | {} | {}", project.id, project.name, kind);

		for subtask in &project.subtasks {
			let mut tags = String::new();
			if subtask.importance == Importance::Important {
				tags.push_str(" [important]");
			}
			if subtask.urgency == Urgency::Emergent {
				tags.push_str(" [emergent]");
			}
			println!(
				"  {} | {} | {}/{}{}",
				subtask.id,
				subtask.name,
				subtask.completed_sessions,
				subtask.target_sessions,
				tags
			);
		}
	}
}

fn print_summary(board: &Board, day: NaiveDate) {
	let label = date_label(day);
	let minutes = board
		.history
		.minutes_by_date()
		.get(&label)
		.copied()
		.unwrap_or(0);

	println!("summary for {label}");
	println!("focus minutes: {minutes}");

	let mut any = false;
	for project in &board.projects {
		let done = board.history.count_completions(&project.id, &label);
		if done > 0 {
			println!("{} | {} sessions", project.name, done);
			any = true;
		}
	}
	if !any {
		println!("no attributed sessions for this day");
	}

	if let Some(note) = board.day_notes.get(&label) {
		println!("\nnote:");
		for line in note.lines() {
			println!("  {line}");
		}
	}
}

fn print_chart(board: &Board) {
	let months = board.history.month_groups();
	if months.is_empty() {
		println!("no sessions recorded yet");
		return;
	}

	let max_minutes = months
		.iter()
		.map(|group| group.max_minutes())
		.max()
		.unwrap_or(0);
	let ticks = chart_ticks(max_minutes);
	let top = ticks.last().copied().unwrap_or(10).max(1);

	for group in months {
		println!("{}", group.title);
		for entry in &group.days {
			let width = ((entry.minutes as f64 / top as f64) * 24.0).round() as usize;
			let bar = "=".repeat(width.min(24));
			println!(
				"  {} {:>5}m {}",
				entry.day.format("%d %a"),
				entry.minutes,
				bar
			);
		}
	}
	println!(
		"scale: 0..{top} minutes, gridlines every {}",
		ticks.get(1).copied().unwrap_or(10)
	);
}

fn print_timeline(board: &Board) {
	let today = Local::now().date_naive();
	let layout = timeline_layout(&board.projects, board.settings.daily_target(), today);

	let Some(first) = layout.axis.days.first() else {
		println!("nothing to lay out");
		return;
	};
	let last = layout.axis.days.last().unwrap_or(first);
	match layout.axis.today_index {
		Some(index) => println!(
			"timeline {} .. {} ({} days, today at day {})",
			first,
			last,
			layout.axis.days.len(),
			index + 1
		),
		None => println!(
			"timeline {} .. {} ({} days)",
			first,
			last,
			layout.axis.days.len()
		),
	}

	if layout.bars.is_empty() {
		println!("no one-off projects to schedule");
		return;
	}

	for bar in &layout.bars {
		println!(
			"{} | {} .. {} | {}d | {:>3.0}%",
			bar.name,
			bar.start,
			bar.last_day(),
			bar.span_days,
			(bar.fill * 100.0).min(999.0)
		);
		for subtask in &bar.subtasks {
			println!(
				"  {} | +{:.2}d | {:.2}d | {:>3.0}%",
				subtask.name,
				subtask.offset_days,
				subtask.span_days,
				(subtask.fill * 100.0).min(999.0)
			);
		}
	}
}

fn print_status(board: &Board, project_id: &str) -> Result<(), Box<dyn Error>> {
	let project = board
		.project(project_id)
		.ok_or_else(|| format!("project not found: {project_id}"))?;
	if !project.is_daily {
		println!("{} is a one-off project; see `timeline`", project.name);
		return Ok(());
	}

	let today = Local::now().date_naive();
	let statuses = daily_statuses(project, &board.history, today);
	println!(
		"{} | target {}/day",
		project.name,
		project.total_target_sessions()
	);
	for (day, status) in statuses {
		let marker = if day == today { " <- today" } else { "" };
		println!("{} {}{}", day, status.label(), marker);
	}

	Ok(())
}

fn print_history(board: &Board, limit: usize) {
	if board.history.entries.is_empty() {
		println!("no sessions recorded yet");
		return;
	}

	for entry in board.history.entries.iter().rev().take(limit) {
		let project = entry
			.project_id
			.as_deref()
			.and_then(|id| board.project(id))
			.map(|project| project.name.clone())
			.unwrap_or_else(|| "Unattributed".to_string());
		let subtask = entry
			.project_id
			.as_deref()
			.zip(entry.subtask_id.as_deref())
			.and_then(|(project_id, subtask_id)| {
				board
					.project(project_id)
					.and_then(|project| project.subtask(subtask_id))
			})
			.map(|subtask| subtask.name.clone())
			.unwrap_or_else(|| "-".to_string());
		println!(
			"{} | {} | {} | {}",
			entry.date, entry.duration, project, subtask
		);
	}
}
