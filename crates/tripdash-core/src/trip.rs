//! Static trip shown on the dashboard: header, dates, travelers, todo list,
//! weather card, day timeline and expense split.

use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const EMBEDDED_TRIP: &str = include_str!("../../../config/trip.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Flight,
    Bus,
    Hotel,
    Activity,
    Transport,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EventKind::Flight => "flight",
            EventKind::Bus => "bus",
            EventKind::Hotel => "hotel",
            EventKind::Activity => "activity",
            EventKind::Transport => "transport",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sky {
    Sun,
    Cloud,
    Drizzle,
    Snow,
    Wind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: u32,
    pub task: String,
    pub assignee: String,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temp: i32,
    pub sky: Sky,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub temp: i32,
    pub sky: Sky,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub location: String,
    pub current: Reading,
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub title: String,
    pub kind: EventKind,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimelineEvent {
    /// `8:00 - 9:15` style range, hours unpadded.
    #[must_use]
    pub fn time_range(&self) -> String {
        format!("{} - {}", self.start.format("%-H:%M"), self.end.format("%-H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseShare {
    pub name: String,
    pub percent: u8,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub destination: String,
    pub title: String,
    pub header_image: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub origin_country: String,
    pub destination_country: String,
    pub flight_time: String,
    pub travelers: Vec<Traveler>,
    pub todos: Vec<TodoItem>,
    pub weather: Weather,
    pub timeline: Vec<TimelineEvent>,
    pub expense_shares: Vec<ExpenseShare>,
}

impl Trip {
    /// The trip compiled in from `config/trip.yaml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the embedded file fails to parse or validate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_yaml_str(EMBEDDED_TRIP)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// # Errors
    ///
    /// Propagates errors from [`Trip::load`] or [`Trip::embedded`].
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` on parse or validation failure.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let trip: Trip = serde_yaml::from_str(content)?;
        trip.validate()?;
        Ok(trip)
    }

    /// Dates as shown on the travel-date card, e.g. `01.09.2021`.
    #[must_use]
    pub fn date_range(&self) -> (String, String) {
        (
            self.start_date.format("%d.%m.%Y").to_string(),
            self.end_date.format("%d.%m.%Y").to_string(),
        )
    }

    #[must_use]
    pub fn open_todos(&self) -> impl Iterator<Item = &TodoItem> {
        self.todos.iter().filter(|t| !t.completed)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));

        if self.destination.trim().is_empty() {
            return fail("trip destination must be non-empty".to_string());
        }
        if self.end_date < self.start_date {
            return fail(format!(
                "trip ends ({}) before it starts ({})",
                self.end_date, self.start_date
            ));
        }
        let span = (self.end_date - self.start_date).num_days();
        if i64::from(self.days) != span {
            return fail(format!(
                "trip days is {} but the dates span {span} days",
                self.days
            ));
        }

        let mut seen = HashSet::new();
        for todo in &self.todos {
            if !seen.insert(todo.id) {
                return fail(format!("duplicate todo id {}", todo.id));
            }
        }

        for event in &self.timeline {
            if event.end < event.start {
                return fail(format!("timeline event '{}' ends before it starts", event.title));
            }
        }

        if !self.expense_shares.is_empty() {
            let total: u32 = self.expense_shares.iter().map(|s| u32::from(s.percent)).sum();
            if total != 100 {
                return fail(format!("expense shares sum to {total}, expected 100"));
            }
        }

        Ok(())
    }
}
