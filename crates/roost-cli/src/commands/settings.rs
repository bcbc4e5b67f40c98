//! Fleet settings commands.

use roost_core::{Config, Store};

use crate::SettingsAction;

pub async fn handle(config: &Config, action: SettingsAction) -> anyhow::Result<()> {
    let store = Store::open(config.data_dir()).await?;
    match action {
        SettingsAction::Show => {
            let info = store.server_info().await?;
            let settings = store.settings().await?;
            println!("Server:");
            println!("{}", serde_json::to_string_pretty(&info)?);
            println!("Settings:");
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Migrate => {
            // Loading runs the migrator and persists any upgraded layout.
            store.settings().await?;
            println!("Settings are up to date");
        }
    }
    Ok(())
}
