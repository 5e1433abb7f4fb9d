//! `courier state` handlers.

use crate::cli::StateCommands;
use courier_error::CourierResult;
use courier_script::{STATE_KEY, ScriptStateRecord};
use courier_storage::{FileSystemStateStore, StateStore};
use std::path::PathBuf;
use tracing::{info, instrument};

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("courier").join("state"))
        .unwrap_or_else(|| PathBuf::from(".courier/state"))
}

/// Human readable view of a persisted call stack.
pub fn describe_record(channel: &str, record: &ScriptStateRecord) -> String {
    let saved = chrono::DateTime::from_timestamp_millis(record.timestamp)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| record.timestamp.to_string());

    let mut out = format!(
        "channel: {}\nversion: {}\nsaved: {}\ncall stack (outer to inner):\n",
        channel, record.version, saved
    );
    for (depth, frame) in record.call_stack.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} @ {}\n     vars: {}\n",
            depth,
            frame.name,
            frame.stop_at.as_deref().unwrap_or("<start>"),
            frame.vars
        ));
    }
    out
}

/// Show the persisted script state of a channel.
pub async fn show_state<S: StateStore>(store: &S, channel: &str) -> CourierResult<Option<String>> {
    let Some(value) = store.get(channel, STATE_KEY).await? else {
        return Ok(None);
    };
    let record = ScriptStateRecord::from_value(channel, value)?;
    Ok(Some(describe_record(channel, &record)))
}

/// Handle a `courier state` subcommand.
#[instrument(skip_all)]
pub async fn handle_state_command(command: StateCommands) -> CourierResult<()> {
    match command {
        StateCommands::Show { channel, dir } => {
            let store = FileSystemStateStore::new(dir.unwrap_or_else(default_state_dir))?;
            match show_state(&store, &channel).await? {
                Some(description) => print!("{}", description),
                None => println!("No script state for channel '{}'", channel),
            }
        }

        StateCommands::Clear { channel, dir } => {
            let store = FileSystemStateStore::new(dir.unwrap_or_else(default_state_dir))?;
            if store.delete(&channel, STATE_KEY).await? {
                info!(channel = %channel, "Cleared script state");
                println!("Cleared script state of channel '{}'", channel);
            } else {
                println!("No script state for channel '{}'", channel);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_storage::InMemoryStateStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_show_state_describes_frames() {
        let store = InMemoryStateStore::new();
        store
            .set(
                "chat-1",
                STATE_KEY,
                json!({
                    "version": "0",
                    "timestamp": 0,
                    "call_stack": [
                        { "name": "onboarding", "vars": {}, "stop_at": "QUIZ" },
                        { "name": "quiz", "vars": { "score": 1 }, "stop_at": "ANSWER" },
                    ],
                }),
            )
            .await
            .unwrap();

        let out = show_state(&store, "chat-1").await.unwrap().unwrap();
        assert!(out.contains("saved: 1970-01-01T00:00:00+00:00"));
        assert!(out.contains("0. onboarding @ QUIZ"));
        assert!(out.contains("1. quiz @ ANSWER"));
        assert!(out.contains("vars: {\"score\":1}"));

        assert!(show_state(&store, "chat-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_show_state_rejects_unknown_version() {
        let store = InMemoryStateStore::new();
        store
            .set("chat-1", STATE_KEY, json!({ "version": "9", "timestamp": 0, "call_stack": [] }))
            .await
            .unwrap();

        assert!(show_state(&store, "chat-1").await.is_err());
    }
}
