//! Terminal interaction: note drafts in $EDITOR and y/N prompts

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use camptrack_core::NoteKind;

const COMMENT: &str = "<!--";

/// A note being written in the user's editor
pub struct NoteDraft<'a> {
    pub athlete: &'a str,
    pub kind: NoteKind,
    pub date: NaiveDate,
}

impl NoteDraft<'_> {
    /// Open the draft in $VISUAL or $EDITOR and return the note body
    ///
    /// Header comment lines are dropped; an empty result means the user
    /// wrote nothing.
    pub fn write(&self) -> Result<String> {
        self.write_with(&editor_command())
    }

    fn write_with(&self, editor: &str) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("camptrack_note_")
            .suffix(".md")
            .tempfile()
            .context("Failed to create note draft")?;
        fs::write(file.path(), self.template())
            .with_context(|| format!("Failed to write note draft: {:?}", file.path()))?;

        let mut words = editor.split_whitespace();
        let program = words.next().unwrap_or("vi");
        let status = Command::new(program)
            .args(words)
            .arg(file.path())
            .status()
            .with_context(|| format!("Failed to run editor: {}", editor))?;
        if !status.success() {
            bail!("Editor '{}' failed ({}). Note not saved.", editor, status);
        }

        let edited = fs::read_to_string(file.path())
            .with_context(|| format!("Failed to read note draft: {:?}", file.path()))?;
        Ok(note_body(&edited))
    }

    fn template(&self) -> String {
        format!(
            "{c} {kind} note for {athlete} on {date} -->\n\
             {c} Lines like these are ignored. Leave the note empty to cancel. -->\n\n",
            c = COMMENT,
            kind = self.kind.label(),
            athlete = self.athlete,
            date = self.date,
        )
    }
}

/// Editor to run; $VISUAL wins over $EDITOR and may carry arguments
fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        })
}

/// Note text without header comments or surrounding blank lines
fn note_body(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Ask a yes/no question; anything but y/yes is no
///
/// Without a terminal on stdin nothing is asked and the answer is no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NoteDraft<'static> {
        NoteDraft {
            athlete: "Jordan Lee",
            kind: NoteKind::Performance,
            date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
        }
    }

    #[test]
    fn test_template_names_the_athlete() {
        let template = draft().template();
        assert!(
            template.starts_with("<!-- Performance note for Jordan Lee on 2024-07-02 -->")
        );
        assert_eq!(note_body(&template), "");
    }

    #[test]
    fn test_note_body_drops_header() {
        let edited = format!("{}Forgot water bottle\nParent called\n\n", draft().template());
        assert_eq!(note_body(&edited), "Forgot water bottle\nParent called");
        assert_eq!(
            note_body("  <!-- indented header -->\nKeep <!-- this -->"),
            "Keep <!-- this -->"
        );
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("yep"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unchanged_draft_is_empty() {
        assert_eq!(draft().write_with("true").unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor_is_an_error() {
        let err = draft().write_with("false").unwrap_err();
        assert!(err.to_string().contains("Note not saved"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_editor_arguments_are_passed() {
        // GNU sed appends a line to the draft in place
        let body = draft().write_with("sed -i $aStrong_backhand").unwrap();
        assert_eq!(body, "Strong_backhand");
    }
}
