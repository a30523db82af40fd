//! `dashboard` command: plain-text rendering of the trip widgets.

use anyhow::Context;
use tripdash_core::trip::{Sky, Trip};
use tripdash_core::AppConfig;

fn sky_label(sky: Sky) -> &'static str {
    match sky {
        Sky::Sun => "sunny",
        Sky::Cloud => "cloudy",
        Sky::Drizzle => "drizzle",
        Sky::Snow => "snow",
        Sky::Wind => "windy",
    }
}

/// # Errors
///
/// Returns an error if the trip file cannot be loaded or fails validation.
pub(crate) fn run_dashboard(config: &AppConfig) -> anyhow::Result<()> {
    let trip = Trip::load_or_embedded(config.trip_path.as_deref())
        .context("failed to load trip dashboard data")?;
    print_dashboard(&trip);
    Ok(())
}

fn print_dashboard(trip: &Trip) {
    let (start, end) = trip.date_range();
    println!("{}", trip.title);
    println!("{}", "=".repeat(trip.title.chars().count()));
    println!();
    println!("Travel date   {} days  {start} - {end}", trip.days);
    let names: Vec<&str> = trip.travelers.iter().map(|t| t.name.as_str()).collect();
    println!(
        "People        {} /adults  {}",
        trip.travelers.len(),
        names.join(", ")
    );
    println!(
        "Destination   {}  {} -> {}, {}",
        trip.destination, trip.origin_country, trip.destination_country, trip.flight_time
    );

    println!();
    println!("TO DO");
    println!("{:<4}{:<50}{:<10}PRIORITY", "ID", "TASK", "ASSIGNEE");
    for todo in &trip.todos {
        let check = if todo.completed { "x" } else { " " };
        println!(
            "{:<4}[{check}] {:<46}{:<10}{}",
            todo.id, todo.task, todo.assignee, todo.priority
        );
    }

    println!();
    let weather = &trip.weather;
    println!(
        "WEATHER  {}  {}°  {}",
        weather.location,
        weather.current.temp,
        sky_label(weather.current.sky)
    );
    let forecast: Vec<String> = weather
        .forecast
        .iter()
        .map(|d| format!("{} {}° {}", d.day, d.temp, sky_label(d.sky)))
        .collect();
    println!("  {}", forecast.join(" | "));

    println!();
    println!("TIMELINE");
    for event in &trip.timeline {
        println!(
            "  {:<14}{:<10}{}",
            event.time_range(),
            event.kind.to_string(),
            event.title
        );
    }

    println!();
    println!("EXPENSES");
    for share in &trip.expense_shares {
        println!("  {:<12}{:>3}%  {}", share.name, share.percent, share.color);
    }
}
