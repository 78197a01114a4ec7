//! API-key command handler.

use anyhow::{Context, Result};

use cbot::credentials::CredentialStore;

use super::KeyAction;

/// Manage the stored Gemini API key.
pub(crate) fn cmd_key(action: KeyAction) -> Result<()> {
    let store = CredentialStore::open_default();

    match action {
        KeyAction::Set => {
            let key = rpassword::prompt_password("Gemini API key: ")
                .with_context(|| "Failed to read key from terminal")?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("The key cannot be empty");
            }
            store
                .save(key)
                .with_context(|| "Failed to write credential file")?;
            println!("API key saved.");
        }
        KeyAction::Show => match store.load() {
            Some(key) => println!("API key stored: {}", mask(&key)),
            None => println!("No API key stored. Run `cbot key set`."),
        },
        KeyAction::Clear => {
            if store.clear().with_context(|| "Failed to remove credential file")? {
                println!("API key removed.");
            } else {
                println!("No API key was stored.");
            }
        }
    }

    Ok(())
}

/// Keep enough of the key visible to recognize it, no more.
fn mask(key: &str) -> String {
    if !key.is_ascii() || key.len() <= 8 {
        return "****".to_string();
    }
    format!("{}…{}", &key[..4], &key[key.len() - 4..])
}
