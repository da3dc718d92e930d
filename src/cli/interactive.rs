use anyhow::{Result, anyhow};
use inquire::{Confirm, Select, Text, validator::Validation};

use crate::Milestone;

/// Modular milestone selection - only open milestones
pub fn prompt_existing_milestone(milestones: &[Milestone]) -> Result<Milestone> {
    let open_milestones: Vec<_> = milestones.iter().filter(|m| m.state == "open").collect();

    if open_milestones.is_empty() {
        return Err(anyhow!(
            "No open milestones found. Please ensure there are open milestones with issues."
        ));
    }

    let milestone_titles: Vec<String> = open_milestones
        .iter()
        .map(|m| format!("🎯 {}", m.title))
        .collect();

    let selection = Select::new("Select a milestone:", milestone_titles)
        .prompt()
        .map_err(|e| anyhow!("Selection cancelled: {}", e))?;

    let milestone_title = selection.strip_prefix("🎯 ").unwrap_or(&selection);
    if let Some(milestone) = milestones.iter().find(|m| m.title == milestone_title) {
        Ok(milestone.clone())
    } else {
        Err(anyhow!("Selected milestone not found"))
    }
}

/// Prompt for a required, non-blank unapproval reason.
pub fn prompt_reason(label: &str, initial: Option<&str>) -> Result<String> {
    let prompt_text = format!("📝 Reason for unapproving {label}:");
    let mut text = Text::new(&prompt_text).with_validator(|input: &str| {
        if input.trim().is_empty() {
            Ok(Validation::Invalid("A reason is required".into()))
        } else {
            Ok(Validation::Valid)
        }
    });
    if let Some(initial) = initial {
        text = text.with_initial_value(initial);
    }

    let reason = text
        .prompt()
        .map_err(|e| anyhow!("Input cancelled: {}", e))?;
    Ok(reason.trim().to_string())
}

pub fn prompt_confirm(message: &str) -> Result<bool> {
    Confirm::new(message)
        .with_default(false)
        .prompt()
        .map_err(|e| anyhow!("Confirmation cancelled: {}", e))
}

/// Pick one of `options`.
pub fn prompt_choice<T: std::fmt::Display>(message: &str, options: Vec<T>) -> Result<T> {
    Select::new(message, options)
        .with_page_size(15)
        .prompt()
        .map_err(|e| anyhow!("Selection cancelled: {}", e))
}
