//! Login, logout and status

use clap::Parser;
use console::style;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use fleet_client::LoginRequest;

use crate::{Context, config::mask_token};

#[derive(Parser, PartialEq, Clone, Debug, Default)]
pub struct LoginCommand {
    /// Store an existing API token instead of signing in
    #[arg(long = "with-token", conflicts_with_all = ["email", "password"])]
    pub with_token: Option<String>,

    /// Account email (prompted if omitted)
    #[arg(long = "email", short = 'e')]
    pub email: Option<String>,

    /// Account password (prompted if omitted)
    #[arg(long = "password", short = 'p', requires = "email", hide = true)]
    pub password: Option<String>,
}

impl LoginCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let mut config = ctx.config.clone();
        config.api_url = Some(ctx.api_url.clone());

        if let Some(token) = &self.with_token {
            config.token = Some(token.clone());
            config.user = None;
            config.save(&ctx.config_path)?;
            println!("{} Token saved to {}", style("✓").green(), ctx.config_path.display());
            return Ok(());
        }

        let email = match &self.email {
            Some(email) => email.clone(),
            None => Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Email")
                .interact_text()
                .map_err(|e| format!("Failed to read email: {}", e))?,
        };
        let password = match &self.password {
            Some(password) => password.clone(),
            None => Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Password")
                .interact()
                .map_err(|e| format!("Failed to read password: {}", e))?,
        };

        println!("{} Signing in to {}", style("→").cyan(), ctx.api_url);
        let response = ctx
            .anonymous_client()?
            .login(&LoginRequest {
                email: email.clone(),
                password,
            })
            .await
            .map_err(|e| match e.status() {
                Some(status) if status.as_u16() == 401 => "Invalid email or password".to_string(),
                _ => format!("Login failed: {}", e),
            })?;

        config.user = Some(response.email.unwrap_or(email));
        config.token = Some(response.token);
        config.save(&ctx.config_path)?;

        println!(
            "{} Logged in as {}",
            style("✓").green(),
            style(config.user.as_deref().unwrap_or_default()).bold()
        );
        Ok(())
    }
}

pub fn logout(ctx: &Context) -> Result<(), String> {
    let mut config = ctx.config.clone();
    if config.token.is_none() {
        println!("Not logged in");
        return Ok(());
    }
    config.clear_credentials();
    config.save(&ctx.config_path)?;
    println!("{} Logged out", style("✓").green());
    Ok(())
}

pub fn status(ctx: &Context) -> Result<(), String> {
    println!("{}", style("Fleet CLI").bold());
    println!("  API URL: {}", ctx.api_url);
    println!("  Config:  {}", ctx.config_path.display());
    match &ctx.token {
        Some(token) => {
            let user = ctx.config.user.as_deref().unwrap_or("(token)");
            println!("  {} Logged in as {}", style("✓").green(), user);
            println!("  Token:   {}", mask_token(token));
        }
        None => println!("  {} Not logged in", style("✗").red()),
    }
    Ok(())
}
