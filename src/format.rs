// ABOUTME: Shared text formatting helpers for user-facing messages.
// ABOUTME: Elapsed-time rendering, tool label humanizing, and question formatting.

use courier_agent::QuestionPrompt;

/// Render elapsed seconds as `Ns` under a minute, `Mm Ss` otherwise
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Turn a machine tool name into a readable label: split on separators and
/// title-case each word ("web_search" -> "Web Search")
pub fn humanize_tool_label(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Safe message preview for logging (respects UTF-8 boundaries)
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Format an agent question into a single outbound message: headers,
/// question text, labeled options, and a multi-select hint
pub fn format_question(prompt: &QuestionPrompt) -> String {
    let mut out = String::from("❓ The agent needs your input:\n");
    for entry in &prompt.entries {
        out.push('\n');
        if let Some(header) = &entry.header {
            out.push_str(&format!("{}\n", header));
        }
        out.push_str(&entry.text);
        out.push('\n');
        for option in &entry.options {
            match &option.description {
                Some(desc) => out.push_str(&format!("  • {} — {}\n", option.label, desc)),
                None => out.push_str(&format!("  • {}\n", option.label)),
            }
        }
        if entry.multiple {
            out.push_str("(multiple answers allowed)\n");
        }
    }
    out.push_str("\nReply to this message to answer.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_agent::{QuestionEntry, QuestionOption};

    #[test]
    fn test_format_elapsed_under_a_minute() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(7), "7s");
        assert_eq!(format_elapsed(59), "59s");
    }

    #[test]
    fn test_format_elapsed_minutes_and_seconds() {
        assert_eq!(format_elapsed(60), "1m 0s");
        assert_eq!(format_elapsed(61), "1m 1s");
        assert_eq!(format_elapsed(754), "12m 34s");
    }

    #[test]
    fn test_humanize_tool_label() {
        assert_eq!(humanize_tool_label("web_search"), "Web Search");
        assert_eq!(humanize_tool_label("read-file"), "Read File");
        assert_eq!(humanize_tool_label("bash"), "Bash");
        assert_eq!(humanize_tool_label("fs.read_text"), "Fs Read Text");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 5), "héllo");
        assert_eq!(preview("short", 50), "short");
    }

    #[test]
    fn test_format_question_with_options_and_hint() {
        let prompt = QuestionPrompt {
            question_id: "q1".to_string(),
            entries: vec![QuestionEntry {
                header: Some("Deployment".to_string()),
                text: "Which environments should I update?".to_string(),
                options: vec![
                    QuestionOption {
                        label: "staging".to_string(),
                        description: Some("the staging cluster".to_string()),
                    },
                    QuestionOption {
                        label: "prod".to_string(),
                        description: None,
                    },
                ],
                multiple: true,
            }],
        };

        let text = format_question(&prompt);
        assert!(text.contains("Deployment"));
        assert!(text.contains("Which environments should I update?"));
        assert!(text.contains("• staging — the staging cluster"));
        assert!(text.contains("• prod"));
        assert!(text.contains("multiple answers allowed"));
        assert!(text.contains("Reply to this message"));
    }

    #[test]
    fn test_format_question_free_form() {
        let prompt = QuestionPrompt {
            question_id: "q2".to_string(),
            entries: vec![QuestionEntry {
                header: None,
                text: "What should I name the branch?".to_string(),
                options: vec![],
                multiple: false,
            }],
        };

        let text = format_question(&prompt);
        assert!(text.contains("What should I name the branch?"));
        assert!(!text.contains("•"));
        assert!(!text.contains("multiple answers"));
    }
}
