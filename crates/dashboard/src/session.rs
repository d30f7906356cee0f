use crate::error::DashboardError;
use chrono::NaiveDate;
use std::str::FromStr;

/// Help text listing the interactive commands.
pub const HELP: &str = "\
Commands:
  select <TICKER>        show another ticker
  ma on|off              toggle the moving averages
  vol on|off             toggle the rolling volatility
  range <FROM> <TO>      change the date range (YYYY-MM-DD)
  rows <N>               number of recent dates in the price table
  refresh                drop the cached prices and fetch again
  help                   show this text
  quit                   leave the dashboard";

/// The widget state of the dashboard. Every change re-renders from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub ticker: String,
    pub show_ma: bool,
    pub show_volatility: bool,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
}

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(String),
    MovingAverages(bool),
    Volatility(bool),
    Range(NaiveDate, NaiveDate),
    Rows(usize),
    Refresh,
    Help,
    Quit,
}

/// What the caller should do after applying a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Render,
    /// Drop the cached panel, then render.
    Refetch,
    ShowHelp,
    Quit,
}

impl FromStr for Command {
    type Err = DashboardError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: String| DashboardError::InvalidCommand(msg);
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| invalid("empty command".to_string()))?
            .to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (verb.as_str(), args.as_slice()) {
            ("select" | "s", [ticker]) => Command::Select(ticker.to_uppercase()),
            ("ma", [flag]) => Command::MovingAverages(parse_flag(flag)?),
            ("vol" | "volatility", [flag]) => Command::Volatility(parse_flag(flag)?),
            ("range", [from, to]) => Command::Range(parse_date(from)?, parse_date(to)?),
            ("rows", [n]) => Command::Rows(
                n.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(format!("'{n}' is not a positive row count")))?,
            ),
            ("refresh" | "r", []) => Command::Refresh,
            ("help" | "h" | "?", []) => Command::Help,
            ("quit" | "q" | "exit", []) => Command::Quit,
            _ => return Err(invalid(format!("'{}' (type 'help')", line.trim()))),
        };
        Ok(command)
    }
}

fn parse_flag(flag: &str) -> Result<bool, DashboardError> {
    match flag.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(DashboardError::InvalidCommand(format!(
            "expected on/off, got '{other}'"
        ))),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DashboardError> {
    s.parse()
        .map_err(|_| DashboardError::InvalidCommand(format!("'{s}' is not a YYYY-MM-DD date")))
}

impl DashboardState {
    /// Applies a command. `universe` is the set of tickers the dashboard
    /// fetches; selecting anything else is rejected without changing state.
    pub fn apply(
        &mut self,
        command: Command,
        universe: &[String],
    ) -> Result<Transition, DashboardError> {
        let transition = match command {
            Command::Select(ticker) => {
                if !universe.contains(&ticker) {
                    return Err(DashboardError::InvalidCommand(format!(
                        "{ticker} is not one of {}",
                        universe.join(", ")
                    )));
                }
                self.ticker = ticker;
                Transition::Render
            }
            Command::MovingAverages(on) => {
                self.show_ma = on;
                Transition::Render
            }
            Command::Volatility(on) => {
                self.show_volatility = on;
                Transition::Render
            }
            Command::Range(start, end) => {
                if start >= end {
                    return Err(DashboardError::InvalidCommand(format!(
                        "range start {start} must be before end {end}"
                    )));
                }
                self.start = start;
                self.end = end;
                Transition::Render
            }
            Command::Rows(rows) => {
                self.rows = rows;
                Transition::Render
            }
            Command::Refresh => Transition::Refetch,
            Command::Help => Transition::ShowHelp,
            Command::Quit => Transition::Quit,
        };

        tracing::debug!(state = ?self, ?transition, "Applied command.");
        Ok(transition)
    }
}
