//! Operator settings: persisted schema, defaults, and the schema migrator.
//!
//! Settings are stored as JSON with camelCase keys so existing data files
//! keep working across versions. Older files carried singular
//! `joinMessageText` / `worldChangeMessageText` fields; [`migrate_settings`]
//! rewrites those into the list form the current schema uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection parameters shared by the whole fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerInfo {
    /// Server hostname or address
    pub server_ip: String,
    /// Server port
    pub server_port: u16,
    /// Protocol version string
    pub version: String,
    /// Seconds to wait before each connection attempt
    pub login_delay: u64,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            server_ip: "localhost".to_string(),
            server_port: 25565,
            version: "1.20.1".to_string(),
            login_delay: 5,
        }
    }
}

/// Which physical anti-idle actions fire on each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AntiIdlePhysical {
    pub forward: bool,
    pub head: bool,
    pub arm: bool,
    pub jump: bool,
}

impl Default for AntiIdlePhysical {
    fn default() -> Self {
        Self {
            forward: true,
            head: true,
            arm: false,
            jump: true,
        }
    }
}

/// Optional chat ping sent on each anti-idle tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AntiIdleChat {
    pub message: String,
    pub send: bool,
}

impl Default for AntiIdleChat {
    fn default() -> Self {
        Self {
            message: "/ping".to_string(),
            send: false,
        }
    }
}

/// Fleet-wide behavior settings, read once per session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Skip authentication and join with the bare username
    pub offline_mode: bool,
    /// Hold the sneak control after login
    pub sneak: bool,
    /// Enable client-side physics
    pub bot_physics: bool,
    /// Enable the anti-idle timer
    #[serde(rename = "antiAFK")]
    pub anti_afk: bool,
    /// Anti-idle interval in minutes
    #[serde(rename = "antiAFKInterval")]
    pub anti_afk_interval: u64,
    /// Physical anti-idle actions
    #[serde(rename = "antiAFKPhysical")]
    pub anti_afk_physical: AntiIdlePhysical,
    /// Chat anti-idle action
    #[serde(rename = "antiAFKChat")]
    pub anti_afk_chat: AntiIdleChat,
    /// Send the join-message burst after login
    pub join_messages: bool,
    /// Seconds between login and the join burst
    pub join_message_delay: u64,
    /// Ordered join-message burst
    pub join_messages_list: Vec<String>,
    /// Send the world-change burst after spawn
    pub world_change_messages: bool,
    /// Seconds between spawn and the world-change burst
    pub world_change_message_delay: u64,
    /// Ordered world-change burst
    pub world_change_messages_list: Vec<String>,
    /// Re-issue a start after unplanned termination
    pub auto_reconnect: bool,
    /// Seconds between termination and the reconnect attempt
    pub auto_reconnect_delay: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            offline_mode: false,
            sneak: false,
            bot_physics: true,
            anti_afk: true,
            anti_afk_interval: 1,
            anti_afk_physical: AntiIdlePhysical::default(),
            anti_afk_chat: AntiIdleChat::default(),
            join_messages: true,
            join_message_delay: 2,
            join_messages_list: vec![DEFAULT_JOIN_MESSAGE.to_string()],
            world_change_messages: true,
            world_change_message_delay: 5,
            world_change_messages_list: vec![DEFAULT_WORLD_CHANGE_MESSAGE.to_string()],
            auto_reconnect: true,
            auto_reconnect_delay: 4,
        }
    }
}

/// Default join burst for settings files that predate the list schema.
pub const DEFAULT_JOIN_MESSAGE: &str = "Hello world";
/// Default world-change burst for settings files that predate the list schema.
pub const DEFAULT_WORLD_CHANGE_MESSAGE: &str = "/home";

/// Migrate a raw settings blob to the current schema.
///
/// Pure and idempotent: calling it on already-migrated data changes nothing
/// and returns `false`. Returns `true` when any field was rewritten so the
/// caller can decide whether to persist.
pub fn migrate_settings(settings: &mut Value) -> bool {
    let Some(map) = settings.as_object_mut() else {
        return false;
    };
    let mut changed = false;

    changed |= migrate_singular(map, "joinMessageText", "joinMessagesList", DEFAULT_JOIN_MESSAGE);
    changed |= migrate_singular(
        map,
        "worldChangeMessageText",
        "worldChangeMessagesList",
        DEFAULT_WORLD_CHANGE_MESSAGE,
    );

    changed
}

fn migrate_singular(
    map: &mut serde_json::Map<String, Value>,
    singular_key: &str,
    list_key: &str,
    default: &str,
) -> bool {
    let mut changed = false;

    let has_list = map.get(list_key).map(Value::is_array).unwrap_or(false);
    if !has_list {
        if let Some(Value::String(text)) = map.get(singular_key).cloned() {
            map.insert(list_key.to_string(), Value::Array(vec![Value::String(text)]));
            map.remove(singular_key);
            changed = true;
        }
    }

    // Still no list: the blob never had either form.
    if !map.get(list_key).map(Value::is_array).unwrap_or(false) {
        map.insert(
            list_key.to_string(),
            Value::Array(vec![Value::String(default.to_string())]),
        );
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_singular_field_wrapped_into_list() {
        let mut blob = json!({ "joinMessageText": "hi" });
        let changed = migrate_settings(&mut blob);
        assert!(changed);
        assert_eq!(blob["joinMessagesList"], json!(["hi"]));
        assert!(blob.get("joinMessageText").is_none());
    }

    #[test]
    fn test_empty_blob_gets_defaults() {
        let mut blob = json!({});
        let changed = migrate_settings(&mut blob);
        assert!(changed);
        assert_eq!(blob["joinMessagesList"], json!(["Hello world"]));
        assert_eq!(blob["worldChangeMessagesList"], json!(["/home"]));
    }

    #[test]
    fn test_world_change_singular_wrapped() {
        let mut blob = json!({ "worldChangeMessageText": "/spawn" });
        migrate_settings(&mut blob);
        assert_eq!(blob["worldChangeMessagesList"], json!(["/spawn"]));
        assert!(blob.get("worldChangeMessageText").is_none());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut blob = json!({ "joinMessageText": "hi", "worldChangeMessageText": "/spawn" });
        assert!(migrate_settings(&mut blob));
        let after_first = blob.clone();
        assert!(!migrate_settings(&mut blob));
        assert_eq!(blob, after_first);
    }

    #[test]
    fn test_existing_list_untouched() {
        let mut blob = json!({ "joinMessagesList": ["a", "b"], "worldChangeMessagesList": [] });
        let changed = migrate_settings(&mut blob);
        assert!(!changed);
        assert_eq!(blob["joinMessagesList"], json!(["a", "b"]));
    }

    #[test]
    fn test_list_wins_over_leftover_singular() {
        // A blob that somehow carries both keeps the list form.
        let mut blob = json!({ "joinMessageText": "old", "joinMessagesList": ["new"] });
        migrate_settings(&mut blob);
        assert_eq!(blob["joinMessagesList"], json!(["new"]));
    }

    #[test]
    fn test_default_settings_round_trip_camel_case() {
        let settings = Settings::default();
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["offlineMode"], json!(false));
        assert_eq!(value["antiAFKInterval"], json!(1));
        assert_eq!(value["joinMessagesList"], json!(["Hello world"]));

        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back.auto_reconnect_delay, 4);
    }

    #[test]
    fn test_settings_deserialize_after_migration() {
        let mut blob = json!({ "joinMessageText": "hi", "antiAFK": false });
        migrate_settings(&mut blob);
        let settings: Settings = serde_json::from_value(blob).unwrap();
        assert!(!settings.anti_afk);
        assert_eq!(settings.join_messages_list, vec!["hi"]);
        // Untouched fields fall back to defaults.
        assert_eq!(settings.world_change_messages_list, vec!["/home"]);
    }
}
