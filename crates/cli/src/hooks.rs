use clap::Subcommand;
use console::style;
use fleet_types::Hook;

use crate::{Context, output::OutputFormat};

#[derive(Subcommand, PartialEq, Clone, Debug)]
pub enum HooksCommand {
    /// List webhooks
    List,
    /// Register a webhook
    Create {
        /// URL the service will call
        #[arg(long = "url")]
        url: String,
        /// Event type to subscribe to (repeatable)
        #[arg(long = "event", short = 'e', required = true)]
        events: Vec<String>,
    },
    /// Remove a webhook
    Delete {
        /// Hook id
        hook_id: String,
    },
}

impl HooksCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        match self {
            HooksCommand::List => ctx.print_stream(|client, s| client.list_hooks(s)).await,
            HooksCommand::Create { url, events } => {
                let created = ctx
                    .client()?
                    .create_hook(&Hook::new(url.as_str(), events.clone()))
                    .await
                    .map_err(|e| format!("Failed to create hook: {}", e))?;
                match ctx.format {
                    OutputFormat::Json => {
                        let json = serde_json::to_string_pretty(&created)
                            .map_err(|e| format!("Failed to serialize hook: {}", e))?;
                        println!("{}", json);
                    }
                    OutputFormat::Pretty => {
                        println!("{} Created hook {}", style("✓").green(), style(&created.id).bold());
                    }
                }
                Ok(())
            }
            HooksCommand::Delete { hook_id } => {
                ctx.client()?
                    .delete_hook(hook_id)
                    .await
                    .map_err(|e| format!("Failed to delete hook {}: {}", hook_id, e))?;
                if ctx.format == OutputFormat::Pretty {
                    println!("{} Deleted hook {}", style("✓").green(), hook_id);
                }
                Ok(())
            }
        }
    }
}
