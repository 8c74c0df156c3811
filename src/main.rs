//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, Write};
use std::ops::ControlFlow;
use std::sync::mpsc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use ugym_lib::{
    Alarm, AppService, CountdownSetting, DaySummary, DraftExercise, EditExerciseParams,
    EntryScreen, ExerciseRecord, Remaining, RestTimer, SetValues, StoreError, TickOutcome, Ticker,
    Units,
};

const TICK: Duration = Duration::from_secs(1);

/// Terminal bell plus a message.
struct BellAlarm;

impl Alarm for BellAlarm {
    fn ring(&mut self) {
        print!("\x07");
        println!("\rRest is over, next set!   ");
    }
}

/// Validation and lookup errors are shown as they are. Storage failures are
/// logged in full and reported with a generic message.
fn store_failure(action: &str, err: StoreError) -> anyhow::Error {
    match err {
        StoreError::Invalid(_) | StoreError::NotFound(_) => {
            anyhow::anyhow!("Error {action}: {err}")
        }
        other => {
            error!(error = %other, "{action} failed");
            anyhow::anyhow!("Error {action}: the workout plan could not be saved.")
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args(); // Parse arguments once
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command(); // Get the command structure
        let bin_name = cmd.get_name().to_string(); // Get the binary name

        eprintln!("Generating completion script for {shell}..."); // Print to stderr
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout()); // Print script to stdout
        return Ok(());
    }

    // Initialize the application service (loads config, opens the store)
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = service.config.theme.header();
    let units = service.config.units;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Add {
            name,
            days,
            series,
            reps,
            weight,
            recovery,
        } => {
            let draft = DraftExercise {
                name,
                selected_days: days,
                series,
                reps,
                weight,
                recovery,
            };
            match service.add_exercise(&draft) {
                Ok(id) => println!("Added exercise '{}' with ID {id}.", draft.name.trim()),
                Err(e) => return Err(store_failure("adding exercise", e)),
            }
        }
        cli::Commands::Edit {
            identifier,
            name,
            days,
            series,
            reps,
            weight,
            recovery,
            multiple_reps,
            multiple_weights,
        } => {
            let params = EditExerciseParams {
                identifier,
                new_name: name,
                new_days: days,
                new_series: series,
                new_reps: reps,
                new_weight: weight,
                new_recovery: recovery,
                multiple_reps,
                multiple_weights,
            };
            let updated = service
                .edit_exercise(&params)
                .with_context(|| format!("Error editing exercise '{}'", params.identifier))?
                .clone();
            println!("Updated exercise '{}' (ID {}).", updated.name, updated.id);
            print_exercise_table(&[&updated], header_color, units);
        }
        cli::Commands::SetValue {
            identifier,
            set,
            reps,
            weight,
        } => {
            if reps.is_none() && weight.is_none() {
                bail!("Nothing to change: pass --reps and/or --weight.");
            }
            let updated = service
                .set_values_at(&identifier, set, SetValues { reps, weight })?
                .clone();
            print_exercise_table(&[&updated], header_color, units);
        }
        cli::Commands::AddSet {
            identifier,
            reps,
            weight,
        } => {
            let updated = service
                .add_set(&identifier, SetValues { reps, weight })?
                .clone();
            println!("'{}' now has {} sets.", updated.name, updated.series);
        }
        cli::Commands::Delete {
            identifier,
            day,
            index,
        } => {
            let removed = match (identifier, day, index) {
                (Some(identifier), _, _) => service.delete_exercise(&identifier),
                (None, Some(day), Some(index)) => service.delete_by_day_and_index(day, index),
                _ => bail!("Pass an exercise ID/name, or both --day and --index."),
            };
            match removed {
                Ok(record) => println!("Deleted exercise '{}' (ID {}).", record.name, record.id),
                Err(e) => return Err(store_failure("deleting exercise", e)),
            }
        }
        cli::Commands::List { day, today } => {
            let (title, records) = if today {
                let (day, records) = service.list_today();
                (Some(day), records)
            } else if let Some(day) = day {
                (Some(day), service.list_for_day(day))
            } else {
                (None, service.list_exercises().iter().collect())
            };

            if export_csv {
                print_exercise_csv(&records, units)?;
            } else if records.is_empty() {
                match title {
                    Some(day) => println!("No exercises for {}.", day.display_label()),
                    None => println!("No exercises planned yet. Use 'ugym add' to create one."),
                }
            } else {
                if let Some(day) = title {
                    println!("{}", day.display_label());
                }
                print_exercise_table(&records, header_color, units);
            }
        }
        cli::Commands::Week => {
            let summary = service.week_summary();
            if export_csv {
                print_week_csv(&summary)?;
            } else {
                print_week_table(&summary, header_color);
            }
        }
        cli::Commands::Clear { yes } => {
            if !yes && !confirm("Delete every exercise from your plan?")? {
                println!("Cancelled.");
                return Ok(());
            }
            service.clear_plan()?;
            println!("All exercises deleted.");
        }
        cli::Commands::Reset { yes } => {
            if !yes && !confirm("Wipe all stored data, including first-launch state?")? {
                println!("Cancelled.");
                return Ok(());
            }
            service.reset_all()?;
            println!("All data wiped.");
        }
        cli::Commands::Start => match service.begin_session()? {
            EntryScreen::Onboarding => {
                println!("Welcome to ugym!");
                println!("Plan your week with 'ugym add', then run 'ugym finish-setup'.");
            }
            EntryScreen::EmptyData => {
                println!("Your plan is empty.");
                println!("Add exercises with 'ugym add', then run 'ugym finish-setup'.");
            }
            EntryScreen::Main => {
                let (day, records) = service.list_today();
                println!("Today is {}.", day.display_label());
                if records.is_empty() {
                    println!("Rest day, nothing planned.");
                } else {
                    print_exercise_table(&records, header_color, units);
                }
            }
        },
        cli::Commands::FinishSetup => {
            service.finish_initial_setup()?;
            println!("Setup complete. 'ugym start' now opens your plan.");
        }
        cli::Commands::Timer {
            minutes,
            seconds,
            exercise,
        } => {
            let setting = match (exercise, minutes, seconds) {
                (Some(identifier), _, _) => service.countdown_for(&identifier)?,
                (None, None, None) => service.default_countdown()?,
                (None, m, s) => CountdownSetting::new(m.unwrap_or(0), s.unwrap_or(0))?,
            };
            run_countdown(setting, &mut BellAlarm)?;
        }
        cli::Commands::Stopwatch => run_stopwatch()?,
        cli::Commands::SetUnits { units } => {
            let lib_units = match units {
                cli::UnitsCli::Metric => Units::Metric,
                cli::UnitsCli::Imperial => Units::Imperial,
            };
            service
                .set_units(lib_units)
                .context("Failed to save units preference")?;
            println!("Units set to {lib_units:?}.");
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn show(remaining: Remaining) -> Result<()> {
    print!("\r{remaining} ");
    stdout().flush()?;
    Ok(())
}

fn run_countdown(setting: CountdownSetting, alarm: &mut dyn Alarm) -> Result<()> {
    let mut timer = RestTimer::countdown(setting);
    match timer.start() {
        TickOutcome::Finished => {
            alarm.ring();
            return Ok(());
        }
        TickOutcome::Running(remaining) => show(remaining)?,
        TickOutcome::Idle => return Ok(()),
    }

    let (tx, rx) = mpsc::channel();
    let ticker = Ticker::spawn(TICK, move || {
        let outcome = timer.tick();
        if tx.send(outcome).is_err() || !matches!(outcome, TickOutcome::Running(_)) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    for outcome in rx {
        match outcome {
            TickOutcome::Running(remaining) => show(remaining)?,
            TickOutcome::Finished => {
                alarm.ring();
                break;
            }
            TickOutcome::Idle => break,
        }
    }
    ticker.stop();
    Ok(())
}

fn run_stopwatch() -> Result<()> {
    let mut timer = RestTimer::stopwatch();
    if let TickOutcome::Running(start) = timer.start() {
        println!("Stopwatch running, press Enter to stop.");
        show(start)?;
    }

    let (tx, rx) = mpsc::channel();
    let ticker = Ticker::spawn(TICK, move || {
        let elapsed = timer.tick();
        if let TickOutcome::Running(elapsed) = elapsed {
            print!("\r{elapsed} ");
            let _ = stdout().flush();
        }
        if tx.send(elapsed).is_err() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    ticker.stop();

    let total = rx
        .try_iter()
        .filter_map(|outcome| match outcome {
            TickOutcome::Running(elapsed) => Some(elapsed),
            _ => None,
        })
        .last()
        .unwrap_or(Remaining::from_seconds(0));
    println!("Stopped at {total}.");
    Ok(())
}

fn weight_header(units: Units) -> String {
    format!("Weight ({})", units.weight_label())
}

/// Prints exercises in a formatted table.
fn print_exercise_table(records: &[&ExerciseRecord], header_color: Color, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Days").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Reps").fg(header_color),
            Cell::new(weight_header(units)).fg(header_color),
            Cell::new("Recovery (s)").fg(header_color),
        ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.id.to_string()),
            Cell::new(&record.name),
            Cell::new(record.days_label()),
            Cell::new(record.series.to_string()),
            Cell::new(record.reps_label()),
            Cell::new(record.weight_label()),
            Cell::new(record.recovery.to_string()),
        ]);
    }
    println!("{table}");
}

fn print_week_table(summary: &[DaySummary], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Day").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);

    for day in summary {
        let names = if day.exercises.is_empty() {
            "-".to_string()
        } else {
            day.exercises
                .iter()
                .map(|r| format!("{} ({}x{})", r.name, r.series, r.reps_label()))
                .collect::<Vec<_>>()
                .join("\n")
        };
        table.add_row(vec![Cell::new(day.day.display_label()), Cell::new(names)]);
    }
    println!("{table}");
}

fn print_exercise_csv(records: &[&ExerciseRecord], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "ID",
        "Name",
        "Days",
        "Sets",
        "Reps",
        format!("Weight_{}", units.weight_label()).as_str(),
        "Recovery_s",
    ])?;

    for record in records {
        let days = record
            .days_for_display()
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(",");
        writer.write_record([
            record.id.to_string(),
            record.name.clone(),
            days,
            record.series.to_string(),
            record.reps_label(),
            record.weight_label(),
            record.recovery.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn print_week_csv(summary: &[DaySummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Day", "ID", "Name"])?;
    for day in summary {
        for record in &day.exercises {
            writer.write_record([
                day.day.as_str(),
                record.id.to_string().as_str(),
                record.name.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
