// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::str::FromStr;
use ugym_lib::{DayToken, SetScheme};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan your weekly gym routine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print list output as CSV instead of a table
    #[arg(long, global = true)]
    pub export_csv: bool,
}

/// "10" is the same value for every set, "12,10,8" is one value per set.
fn parse_scheme<T: FromStr>(s: &str) -> Result<SetScheme<T>, String>
where
    T::Err: std::fmt::Display,
{
    let mut values = s
        .split(',')
        .map(str::trim)
        .map(|part| {
            part.parse::<T>()
                .map_err(|e| format!("Invalid value '{part}': {e}"))
        })
        .collect::<Result<Vec<T>, String>>()?;
    if values.len() == 1 {
        Ok(SetScheme::Fixed(values.remove(0)))
    } else {
        Ok(SetScheme::PerSet(values))
    }
}

pub fn parse_reps(s: &str) -> Result<SetScheme<i64>, String> {
    parse_scheme(s)
}

pub fn parse_weights(s: &str) -> Result<SetScheme<f64>, String> {
    parse_scheme(s)
}

pub fn parse_day(s: &str) -> Result<DayToken, String> {
    DayToken::from_str(s).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an exercise to the weekly plan
    Add {
        /// Name of the exercise (e.g., "Squat")
        #[arg(short, long)]
        name: String,
        /// Comma-separated days (Lun,Mar,Mer,Gio,Ven,Sab,Dom)
        #[arg(short, long, value_parser = parse_day, value_delimiter = ',', required = true)]
        days: Vec<DayToken>,
        /// Number of sets
        #[arg(short, long)]
        series: i64,
        /// Reps for every set ("10") or per set ("12,10,8")
        #[arg(short, long, value_parser = parse_reps)]
        reps: SetScheme<i64>,
        /// Weight for every set ("60") or per set ("60,65,70")
        #[arg(short, long, value_parser = parse_weights, default_value = "0")]
        weight: SetScheme<f64>,
        /// Rest between sets, in seconds
        #[arg(long)]
        recovery: i64,
    },
    /// Edit an exercise; unspecified fields keep their value
    Edit {
        identifier: String, // Can be the name or id
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, value_parser = parse_day, value_delimiter = ',')]
        days: Option<Vec<DayToken>>,
        #[arg(short, long)]
        series: Option<i64>,
        #[arg(short, long, value_parser = parse_reps)]
        reps: Option<SetScheme<i64>>,
        #[arg(short, long, value_parser = parse_weights)]
        weight: Option<SetScheme<f64>>,
        #[arg(long)]
        recovery: Option<i64>,
        /// Switch reps between one value and one value per set
        #[arg(long)]
        multiple_reps: Option<bool>,
        /// Switch weight between one value and one value per set
        #[arg(long)]
        multiple_weights: Option<bool>,
    },
    /// Change the reps and/or weight of a single set (0-based)
    SetValue {
        identifier: String,
        #[arg(long)]
        set: usize,
        #[arg(short, long)]
        reps: Option<u32>,
        #[arg(short, long)]
        weight: Option<f64>,
    },
    /// Add one set at the end of an exercise
    AddSet {
        identifier: String,
        #[arg(short, long)]
        reps: Option<u32>,
        #[arg(short, long)]
        weight: Option<f64>,
    },
    /// Delete an exercise by id/name, or by its position in a day's list
    Delete {
        #[arg(required_unless_present = "day", conflicts_with_all = &["day", "index"])]
        identifier: Option<String>,
        #[arg(long, value_parser = parse_day, requires = "index")]
        day: Option<DayToken>,
        #[arg(long, requires = "day")]
        index: Option<usize>,
    },
    /// List exercises (all, for one day, or for today)
    List {
        #[arg(long, value_parser = parse_day, conflicts_with = "today")]
        day: Option<DayToken>,
        #[arg(long)]
        today: bool,
    },
    /// Weekly summary grouped by day
    Week,
    /// Remove every exercise from the plan
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Wipe all stored data, including first-launch state
    Reset {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show which screen the app opens on and record the launch
    Start,
    /// Mark the initial plan as complete
    FinishSetup,
    /// Countdown rest timer
    Timer {
        #[arg(short, long, conflicts_with = "exercise")]
        minutes: Option<u32>,
        #[arg(short, long, conflicts_with = "exercise")]
        seconds: Option<u32>,
        /// Use this exercise's recovery time
        #[arg(short, long)]
        exercise: Option<String>,
    },
    /// Stopwatch; press Enter to stop
    Stopwatch,
    /// Set preferred units (metric/imperial)
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_list_parsing() {
        let cli = Cli::try_parse_from([
            "ugym", "add", "-n", "Squat", "-d", "Lun,gio", "-s", "3", "-r", "10", "--recovery",
            "90",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { days, weight, .. } => {
                assert_eq!(days, vec![DayToken::Lun, DayToken::Gio]);
                assert_eq!(weight, SetScheme::Fixed(0.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(parse_day("Xyz").is_err());
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!(parse_reps("10").unwrap(), SetScheme::Fixed(10));
        assert_eq!(parse_reps("12,10,8").unwrap(), SetScheme::PerSet(vec![12, 10, 8]));
        assert_eq!(parse_reps("12,").ok(), None);
        assert_eq!(parse_weights("62.5").unwrap(), SetScheme::Fixed(62.5));
        assert_eq!(parse_weights("60,65").unwrap(), SetScheme::PerSet(vec![60.0, 65.0]));
    }

    #[test]
    fn test_cli_definition() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_delete_by_position() {
        let cli = Cli::try_parse_from(["ugym", "delete", "--day", "Mar", "--index", "0"]).unwrap();
        match cli.command {
            Commands::Delete { identifier, day, index } => {
                assert_eq!(identifier, None);
                assert_eq!(day, Some(DayToken::Mar));
                assert_eq!(index, Some(0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["ugym", "delete", "--day", "Mar"]).is_err());
    }
}
