//! Account maintenance command handlers

use std::sync::Arc;

use crate::api::validation::normalize_email;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountError, AccountService, ConsoleMailer, SeaOrmAccountService, UserProfile,
};

async fn account_service(config: &Config) -> anyhow::Result<SeaOrmAccountService> {
    let store = Store::new(&config.general.database_path).await?;
    Ok(SeaOrmAccountService::new(
        store,
        config.clone(),
        Arc::new(ConsoleMailer),
    ))
}

fn report(result: Result<UserProfile, AccountError>, email: &str, done: &str) -> anyhow::Result<()> {
    match result {
        Ok(user) => {
            println!("{done}: {} (id {})", user.email, user.id);
            Ok(())
        }
        Err(AccountError::UserNotFound) => {
            println!("No account with email {email}");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}

pub async fn cmd_user_activate(config: &Config, email: &str) -> anyhow::Result<()> {
    let email = normalize_email(email);
    let service = account_service(config).await?;
    report(service.force_activate(&email).await, &email, "Activated")
}

pub async fn cmd_user_unlock(config: &Config, email: &str) -> anyhow::Result<()> {
    let email = normalize_email(email);
    let service = account_service(config).await?;
    report(service.unlock(&email).await, &email, "Unlocked")
}
