//! `<boltAction>` tag recognition and the start-command reminder.
//!
//! Model output carries actions as tags:
//!
//! ```text
//! <boltAction type="file" filePath="src/App.tsx">...</boltAction>
//! <boltAction type="shell">npm install</boltAction>
//! <boltAction type="start">npm run dev</boltAction>
//! ```
//!
//! Tags are matched case-sensitively. Extra attributes after `type` are
//! tolerated. All helpers here are stateless.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Kind of action a tag describes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    File,
    Shell,
    Start,
}

const OPENING_TAGS: &[(ActionKind, &str)] = &[
    (ActionKind::File, r#"<boltAction\s+type="file""#),
    (ActionKind::Shell, r#"<boltAction\s+type="shell""#),
    (ActionKind::Start, r#"<boltAction\s+type="start""#),
];

static OPENING_TAG_TABLE: LazyLock<Vec<(ActionKind, Regex)>> = LazyLock::new(|| {
    OPENING_TAGS
        .iter()
        .map(|&(kind, pattern)| {
            let re = Regex::new(pattern).expect("action tag regex must be valid");
            (kind, re)
        })
        .collect()
});

static START_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<boltAction\s+type="start"[^>]*>(.*?)</boltAction>"#)
        .expect("start block regex must be valid")
});

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::File, ActionKind::Shell, ActionKind::Start];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::File => "file",
            ActionKind::Shell => "shell",
            ActionKind::Start => "start",
        }
    }

    /// Whether `text` contains an opening tag of this kind.
    pub fn appears_in(self, text: &str) -> bool {
        OPENING_TAG_TABLE
            .iter()
            .any(|(kind, re)| *kind == self && re.is_match(text))
    }

    /// Distinct kinds present in `text`, in [`ALL`](Self::ALL) order.
    pub fn scan(text: &str) -> Vec<ActionKind> {
        OPENING_TAG_TABLE
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reminder asking the model to add a start action running `command`.
pub fn reminder_text(command: &str) -> String {
    format!(
        "IMPORTANT REMINDER: The development server needs to be started to preview your application.\n\
         \n\
         Please add a start action to run the development server:\n\
         \n\
         <boltAction type=\"start\">\n\
         {command}\n\
         </boltAction>\n\
         \n\
         This will launch the preview so users can see the application running."
    )
}

/// True iff the response has file or shell actions but no start action.
pub fn has_missing_start_command(response: &str) -> bool {
    let kinds = ActionKind::scan(response);
    let does_work = kinds.contains(&ActionKind::File) || kinds.contains(&ActionKind::Shell);
    does_work && !kinds.contains(&ActionKind::Start)
}

/// Trimmed bodies of every non-empty start action, in order of appearance.
///
/// Bodies may span lines. Matching is non-greedy, so adjacent start blocks
/// are returned separately.
pub fn extract_start_commands(response: &str) -> Vec<String> {
    START_BLOCK
        .captures_iter(response)
        .filter_map(|caps| {
            let command = caps[1].trim();
            (!command.is_empty()).then(|| command.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_only_response_is_missing_start() {
        let response = r#"<boltAction type="file" filePath="index.html"><h1>hi</h1></boltAction>"#;
        assert!(has_missing_start_command(response));
    }

    #[test]
    fn shell_only_response_is_missing_start() {
        let response = r#"<boltAction type="shell">npm install</boltAction>"#;
        assert!(has_missing_start_command(response));
    }

    #[test]
    fn file_and_start_is_complete() {
        let response = r#"
<boltAction type="file" filePath="a.js">x</boltAction>
<boltAction type="start">npm run dev</boltAction>"#;
        assert!(!has_missing_start_command(response));
    }

    #[test]
    fn no_actions_is_not_missing() {
        assert!(!has_missing_start_command("Here is an explanation."));
        assert!(!has_missing_start_command(""));
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!(!has_missing_start_command(r#"<BoltAction type="file">x</BoltAction>"#));
        assert!(!ActionKind::File.appears_in(r#"<boltAction type="FILE">"#));
    }

    #[test]
    fn scan_lists_distinct_kinds() {
        let response = r#"<boltAction type="shell">a</boltAction>
<boltAction  type="start">b</boltAction>
<boltAction type="shell">c</boltAction>"#;
        assert_eq!(
            ActionKind::scan(response),
            vec![ActionKind::Shell, ActionKind::Start]
        );
    }

    #[test]
    fn extracts_single_command() {
        let response = r#"<boltAction type="start">npm run dev</boltAction>"#;
        assert_eq!(extract_start_commands(response), vec!["npm run dev"]);
    }

    #[test]
    fn extracts_multiline_and_multiple_in_order() {
        let response = r#"before
<boltAction type="start" id="one">
  pnpm dev
</boltAction>
middle
<boltAction type="start">   </boltAction>
<boltAction type="start">cargo run
--release</boltAction>"#;
        assert_eq!(
            extract_start_commands(response),
            vec!["pnpm dev", "cargo run\n--release"]
        );
    }

    #[test]
    fn unclosed_start_tag_yields_nothing() {
        assert!(extract_start_commands(r#"<boltAction type="start">npm run dev"#).is_empty());
    }

    #[test]
    fn reminder_embeds_command_in_start_block() {
        let text = reminder_text("yarn dev");
        assert!(text.starts_with("IMPORTANT REMINDER:"));
        assert!(text.contains("<boltAction type=\"start\">\nyarn dev\n</boltAction>"));
        assert!(text.ends_with("see the application running."));
        assert_eq!(extract_start_commands(&text), vec!["yarn dev"]);
    }

    #[test]
    fn kind_names() {
        let names: Vec<_> = ActionKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["file", "shell", "start"]);
    }
}
