use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::models::AdminRole;
use crate::services::{NewAdmin, ProvisionOutcome};
use crate::state::SharedState;

use super::read_password;

pub async fn cmd_create_admin(
    config: Config,
    username: &str,
    password: Option<String>,
    email: Option<String>,
    role: &str,
) -> anyhow::Result<()> {
    let role = role.parse::<AdminRole>()?;
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let state = SharedState::new(config).await?;

    let outcome = state
        .auth
        .provision_admin(NewAdmin {
            username: username.to_string(),
            password,
            email,
            role,
        })
        .await
        .context("Failed to create admin")?;

    match outcome {
        ProvisionOutcome::Created(admin) => {
            println!("✓ Created {} '{}' (ID: {})", admin.role, admin.username, admin.id);
        }
        ProvisionOutcome::AlreadyExists => {
            println!("Admin '{username}' already exists; left unchanged.");
        }
    }

    Ok(())
}

pub async fn cmd_set_active(config: &Config, username: &str, active: bool) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if store.set_admin_active(username, active).await? {
        let state = if active { "enabled" } else { "disabled" };
        println!("✓ Admin '{username}' {state}");
    } else {
        println!("Admin '{username}' not found.");
    }

    Ok(())
}

pub async fn cmd_set_role(config: &Config, username: &str, role: &str) -> anyhow::Result<()> {
    let role = role.parse::<AdminRole>()?;
    let store = Store::new(&config.general.database_path).await?;

    if store.set_admin_role(username, role).await? {
        println!("✓ Admin '{username}' is now {role}");
        println!("Tokens issued before this change keep their old role until they expire.");
    } else {
        println!("Admin '{username}' not found.");
    }

    Ok(())
}
