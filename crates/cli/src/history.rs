//! Per-device history: package updates and events

use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;

use crate::Context;

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct UpdatesCommand {
    /// Device id
    pub device_id: String,
}

impl UpdatesCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        ctx.print_stream(|client, s| client.list_updates(s, &self.device_id))
            .await
    }
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct EventsCommand {
    /// Device id
    pub device_id: String,

    /// Only events after this point: RFC 3339 timestamp or a span back from now (30m, 24h, 7d, 2w)
    #[arg(long = "since", value_parser = parse_since)]
    pub since: Option<DateTime<Utc>>,
}

impl EventsCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        ctx.print_stream(|client, s| client.device_events_since(s, &self.device_id, self.since))
            .await
    }
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    parse_since_at(value, Utc::now())
}

fn parse_since_at(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    let invalid = || {
        format!(
            "Invalid time '{}': expected RFC 3339 or a span such as 30m, 24h, 7d",
            value
        )
    };
    let unit = value.chars().last().ok_or_else(invalid)?;
    let amount: i64 = value[..value.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    now.checked_sub_signed(span).ok_or_else(invalid)
}
