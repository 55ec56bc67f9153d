mod config;
mod domain;
mod logging;
mod seed;
mod selection;
mod session;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{Overrides, Settings};
use crate::domain::{HourTotals, WeekStore};
use crate::logging::init_logging;
use crate::seed::{builtin_week, load_week, render_seed};
use crate::selection::ModifierKey;
use crate::session::Editor;
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "hourgrid", about = "Weekly hour-by-hour schedule editor")]
struct Cli {
	#[arg(long)]
	seed: Option<PathBuf>,
	#[arg(long)]
	log_file: Option<PathBuf>,
	#[arg(long, value_enum)]
	multi_select_key: Option<ModifierKey>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	Summary {
		#[arg(long)]
		json: bool,
	},
	Seed,
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let overrides = Overrides {
		seed: cli.seed,
		multi_select_key: cli.multi_select_key,
		log_file: cli.log_file,
	};

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			let (settings, week) = prepare(overrides)?;
			let mut editor = Editor::new(week, settings.multi_select_key);
			run_dashboard(&mut editor)?;
		}
		Command::Summary { json } => {
			let (_, week) = prepare(overrides)?;
			print_summary(&week, json)?;
		}
		Command::Seed => {
			print!("{}", render_seed(&builtin_week()?)?);
		}
	}

	Ok(())
}

fn prepare(overrides: Overrides) -> Result<(Settings, WeekStore), Box<dyn Error>> {
	let settings = Settings::resolve(overrides)?;
	if let Err(err) = init_logging(&settings) {
		eprintln!("warning: logging disabled: {err}");
	}

	let week = load_week(settings.seed.as_deref())?;
	Ok((settings, week))
}

#[derive(Debug, Serialize)]
struct DaySummary {
	date: String,
	weekday: String,
	#[serde(flatten)]
	totals: HourTotals,
}

#[derive(Debug, Serialize)]
struct WeekSummary {
	days: Vec<DaySummary>,
	total: HourTotals,
}

fn summarize(week: &WeekStore) -> WeekSummary {
	WeekSummary {
		days: week
			.days()
			.iter()
			.map(|day| DaySummary {
				date: day.date().format("%Y-%m-%d").to_string(),
				weekday: day.weekday_label(),
				totals: day.totals(),
			})
			.collect(),
		total: week.week_totals(),
	}
}

fn print_summary(week: &WeekStore, json: bool) -> Result<(), Box<dyn Error>> {
	let summary = summarize(week);
	if json {
		println!("{}", serde_json::to_string_pretty(&summary)?);
	} else {
		print!("{}", summary_table(&summary));
	}
	Ok(())
}

fn summary_table(summary: &WeekSummary) -> String {
	let mut out = String::new();
	for day in &summary.days {
		out.push_str(&summary_line(&format!("{} | {:<9}", day.date, day.weekday), day.totals));
	}
	out.push_str(&summary_line(&format!("{:<10} | {:<9}", "week", ""), summary.total));
	out
}

fn summary_line(label: &str, totals: HourTotals) -> String {
	format!(
		"{label} | work {:>2}h | rest {:>2}h | nc {:>2}h | total {:>3}h\n",
		totals.work,
		totals.rest,
		totals.non_compliant,
		totals.total()
	)
}
