use anyhow::{anyhow, Result};

use super::args::MemosCliArgs;
use crate::memos;

pub fn handle_memos_command(args: MemosCliArgs) -> Result<()> {
    if let Some(id) = args.show {
        let memo = memos::get(&id)?.ok_or_else(|| anyhow!("Memo {} not found", id))?;
        println!("ID: {}", memo.id);
        println!("Date: {}", memo.created_at);
        println!("Color: {}", memo.color);
        if let Some(audio) = &memo.audio_path {
            println!("Audio: {}", audio);
        }
        println!("\n{}", memo.text);
        return Ok(());
    }

    if let Some(id) = args.delete {
        memos::delete(&id)?;
        println!("Deleted memo {}", id);
        return Ok(());
    }

    let entries = memos::list(args.query.as_deref(), args.limit)?;

    if entries.is_empty() {
        println!("No memos found matching your criteria.");
        return Ok(());
    }

    println!("Found {} memo(s):\n", entries.len());

    for memo in entries {
        // Truncate long text for display, on a char boundary.
        let display_text = if memo.text.chars().count() > 60 {
            let truncated: String = memo.text.chars().take(60).collect();
            format!("{}...", truncated)
        } else {
            memo.text.clone()
        };

        let kind = if memo.audio_path.is_some() {
            "audio"
        } else {
            "text"
        };

        println!("ID: {}", memo.id);
        println!("Date: {} ({})", memo.created_at, kind);
        println!("Text: {}", display_text);
        println!("---");
    }

    println!("\nTo read one in full: koemo memos --show <ID>");

    Ok(())
}
