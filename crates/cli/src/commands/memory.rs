//! `ctxforge memory`: Inspect and clean up stored memory.

use super::load_service;

pub async fn show(session: &str) -> Result<(), Box<dyn std::error::Error>> {
    let service = load_service()?;
    let entries = service.memory().try_short_term(session).await?;

    println!("🧠 Session '{session}' ({} entries, backend: {})", entries.len(), service.memory().backend_name());
    if entries.is_empty() {
        println!("   No interactions recorded yet.");
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {} [{:?}] {}",
            i + 1,
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.outcome,
            truncate(&entry.user_input, 80)
        );
        if !entry.output.is_empty() {
            println!("      → {}", truncate(&entry.output, 100));
        }
    }
    Ok(())
}

pub async fn profile(user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let service = load_service()?;
    let profile = service.memory().try_long_term(user).await?;

    println!("👤 Profile '{}'", profile.user_id);
    if !profile.has_history() {
        println!("   No preferences learned yet.");
        return Ok(());
    }
    let technologies = profile.preferred_technologies(5);
    if !technologies.is_empty() {
        println!("  Technologies:   {}", technologies.join(", "));
    }
    println!("  Response style: {:?}", profile.communication.response_length);
    println!("  Test-first:     {}", profile.workflow.test_first());
    println!("  Interactions:   {}", profile.learning.interactions);
    if let Some(rate) = profile.learning.success_rate() {
        println!("  Success rate:   {:.0}%", rate * 100.0);
    }
    println!("  Updated:        {}", profile.updated_at.format("%Y-%m-%d %H:%M"));
    Ok(())
}

pub async fn cleanup(days: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let service = load_service()?;
    let removed = match days {
        Some(days) => service.memory().cleanup(days).await,
        None => service.cleanup().await,
    };
    println!("🗑️  Removed {removed} short-term entries.");
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
