//! Account management commands.

use roost_core::{Account, Config, Store};

use crate::AccountsAction;

pub async fn handle(config: &Config, action: AccountsAction) -> anyhow::Result<()> {
    let store = Store::open(config.data_dir()).await?;
    match action {
        AccountsAction::List => {
            let accounts = store.accounts().await?;
            if accounts.is_empty() {
                println!("No accounts stored");
            }
            for account in accounts {
                let auth = if account.password.is_some() {
                    "authenticated"
                } else {
                    "offline"
                };
                println!("{} ({})", account.username, auth);
            }
        }
        AccountsAction::Add { username, password } => {
            store
                .upsert_account(Account {
                    username: username.clone(),
                    password,
                })
                .await?;
            println!("Saved account: {}", username);
        }
        AccountsAction::Remove { username } => {
            if store.remove_account(&username).await? {
                println!("Removed account: {}", username);
            } else {
                println!("No such account: {}", username);
            }
        }
    }
    Ok(())
}
