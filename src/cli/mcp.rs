//! MCP cache management command handler.

use anyhow::Result;

use cbot::mcp::{McpEntry, McpStore};

use super::McpAction;

/// Inspect and edit the knowledge cache.
pub(crate) fn cmd_mcp(action: McpAction) -> Result<()> {
    let store = McpStore::open_default();

    match action {
        McpAction::List => {
            let entries = store.load();
            if entries.is_empty() {
                println!("The MCP cache is empty.");
                return Ok(());
            }
            println!("{} cached entries:", entries.len());
            for (number, entry) in entries.iter().enumerate() {
                println!("{}. Q: {}", number + 1, entry.question);
                println!("   A: {}", entry.answer);
            }
        }
        McpAction::Add { question, answer } => {
            if question.trim().is_empty() || answer.trim().is_empty() {
                anyhow::bail!("Both question and answer must be non-empty");
            }
            if !store.append(McpEntry::new(question, answer)) {
                anyhow::bail!("An entry with the same question already exists");
            }
            println!("Entry added.");
        }
        McpAction::Edit {
            index,
            question,
            answer,
        } => {
            if question.is_none() && answer.is_none() {
                anyhow::bail!("Nothing to change: pass --question and/or --answer");
            }
            let mut entries = store.load();
            let entry = entry_at(&mut entries, index)?;
            if let Some(question) = question {
                entry.question = question;
            }
            if let Some(answer) = answer {
                entry.answer = answer;
            }
            store.save(&entries);
            println!("Entry {} updated.", index);
        }
        McpAction::Delete { index } => {
            let mut entries = store.load();
            entry_at(&mut entries, index)?;
            let removed = entries.remove(index - 1);
            store.save(&entries);
            println!("Deleted entry {}: {}", index, removed.question);
        }
    }

    Ok(())
}

/// Resolve a 1-based list number into an entry, with a friendly error.
fn entry_at(entries: &mut [McpEntry], index: usize) -> Result<&mut McpEntry> {
    if index == 0 || index > entries.len() {
        anyhow::bail!(
            "No entry {} (the cache has {} entries; see `cbot mcp list`)",
            index,
            entries.len()
        );
    }
    Ok(&mut entries[index - 1])
}
