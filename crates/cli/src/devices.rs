use clap::{Parser, Subcommand};
use console::style;
use fleet_types::Device;
use serde_json::Value as JsonValue;

use crate::{Context, output::OutputFormat};

#[derive(Subcommand, PartialEq, Clone, Debug)]
pub enum DevicesCommand {
    /// List devices
    List(ListDevices),
    /// Show a single device
    Show {
        /// Device id
        device_id: String,
    },
}

#[derive(Parser, PartialEq, Clone, Debug, Default)]
pub struct ListDevices {
    /// Only devices of this segment
    #[arg(long = "segment", short = 's', conflicts_with_all = ["all_segments", "filter"])]
    pub segment: Option<String>,

    /// Devices of every active segment, fetched in parallel
    #[arg(long = "all-segments", conflicts_with = "filter")]
    pub all_segments: bool,

    /// Only devices matching a JSON query, e.g. '{"status":"online"}'
    #[arg(long = "filter", value_parser = parse_query)]
    pub filter: Option<JsonValue>,
}

fn parse_query(value: &str) -> Result<JsonValue, String> {
    let query: JsonValue =
        serde_json::from_str(value).map_err(|e| format!("Invalid filter JSON: {}", e))?;
    if !query.is_object() {
        return Err("Filter must be a JSON object".to_string());
    }
    Ok(query)
}

impl DevicesCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        match self {
            DevicesCommand::List(list) => list.execute(ctx).await,
            DevicesCommand::Show { device_id } => show(ctx, device_id).await,
        }
    }
}

impl ListDevices {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        if let Some(segment) = &self.segment {
            ctx.print_stream(|client, s| client.list_segment_devices(s, segment))
                .await
        } else if self.all_segments {
            ctx.print_stream(|client, s| client.list_all_devices(s)).await
        } else if let Some(query) = &self.filter {
            ctx.print_stream(|client, s| client.list_filtered_devices(s, query))
                .await
        } else {
            ctx.print_stream(|client, s| client.list_devices(s)).await
        }
    }
}

async fn show(ctx: &Context, device_id: &str) -> Result<(), String> {
    let device = ctx
        .client()?
        .get_device(device_id)
        .await
        .map_err(|e| match e.status() {
            Some(status) if status.as_u16() == 404 => format!("Device '{}' not found", device_id),
            _ => e.to_string(),
        })?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&device)
                .map_err(|e| format!("Failed to serialize device: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Pretty => print_device(&device),
    }
    Ok(())
}

fn print_device(device: &Device) {
    println!("{}", style(device.display_name()).bold());
    println!("  ID:       {}", device.id);
    println!("  Status:   {}", device.status);
    if let Some(segment) = &device.segment_id {
        println!("  Segment:  {}", segment);
    }
    if let Some(version) = &device.installed_version {
        println!("  Version:  {}", version);
    }
    if let Some(seen) = device.last_seen_at {
        println!("  Seen:     {}", seen.to_rfc3339());
    }
    if !device.tags.is_empty() {
        println!("  Tags:");
        for (key, value) in &device.tags {
            println!("    {} = {}", key, value);
        }
    }
}
