//! Line commands available inside `codespace join`.

use codespace_core::space::normalize_new_file_name;
use codespace_core::{ClientEvent, ClientReplica, CodespaceError, ReplicaChange, Result};

pub const HELP: &str = "\
Commands:
  ls                     list files (* active, + open)
  tabs                   list open tabs
  open <file>            open a file and make it active
  close <file>           close a tab
  new <file> [language]  create a file
  rm <file>              delete a file
  write <text>           replace the active file's content (\\n for newlines)
  show [file]            print a file (default: active)
  run <command>          run an allowed command on the server
  help                   show this help
  quit                   leave the space";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    List,
    Tabs,
    Open(String),
    Close(String),
    New {
        name: String,
        language: Option<String>,
    },
    Remove(String),
    Write(String),
    Show(Option<String>),
    Run(String),
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &str| -> Result<String> {
            if rest.is_empty() {
                Err(CodespaceError::Validation(format!("usage: {} <{}>", word, what)))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word {
            "ls" => ReplCommand::List,
            "tabs" => ReplCommand::Tabs,
            "open" => ReplCommand::Open(required("file")?),
            "close" => ReplCommand::Close(required("file")?),
            "new" => {
                let mut parts = required("file")?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into_iter();
                let name = parts.next().unwrap_or_default();
                ReplCommand::New {
                    name,
                    language: parts.next(),
                }
            }
            "rm" => ReplCommand::Remove(required("file")?),
            "write" => ReplCommand::Write(rest.replace("\\n", "\n")),
            "show" => ReplCommand::Show((!rest.is_empty()).then(|| rest.to_string())),
            "run" => ReplCommand::Run(required("command")?),
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => {
                return Err(CodespaceError::Validation(format!(
                    "Unknown command '{}' (try 'help')",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

/// Result of executing a command: events to send and lines to print
#[derive(Debug, Default)]
pub struct Outcome {
    pub events: Vec<ClientEvent>,
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Outcome {
    fn say(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            ..Self::default()
        }
    }

    fn send(event: ClientEvent) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }
}

pub fn execute(replica: &mut ClientReplica, command: ReplCommand) -> Outcome {
    match command {
        ReplCommand::List => {
            let active = replica.active_name();
            let lines = replica
                .files()
                .iter()
                .map(|file| {
                    let marker = if Some(file.name.as_str()) == active {
                        '*'
                    } else if replica.open_tabs().contains(&file.name) {
                        '+'
                    } else {
                        ' '
                    };
                    format!("{} {} ({})", marker, file.name, file.language)
                })
                .collect();
            Outcome {
                lines,
                ..Outcome::default()
            }
        }
        ReplCommand::Tabs => Outcome::say(tab_bar(replica)),
        ReplCommand::Open(name) => match replica.open(&name) {
            Ok(()) => Outcome::say(tab_bar(replica)),
            Err(e) => Outcome::say(e.to_string()),
        },
        ReplCommand::Close(name) => match replica.close(&name) {
            Some(event) => Outcome {
                events: vec![event],
                lines: vec![tab_bar(replica)],
                quit: false,
            },
            None => Outcome::say(format!("'{}' is not open", name)),
        },
        ReplCommand::New { name, language } => match normalize_new_file_name(&name) {
            Ok(file_name) => Outcome::send(ClientEvent::CreateFile {
                space_name: replica.space_name().to_string(),
                file_name,
                language,
            }),
            Err(e) => Outcome::say(e.to_string()),
        },
        ReplCommand::Remove(name) => {
            let space_name = replica.space_name().to_string();
            replica.remove_file(&name);
            Outcome {
                events: vec![ClientEvent::DeleteFile {
                    space_name,
                    file_name: name,
                }],
                lines: vec![tab_bar(replica)],
                quit: false,
            }
        }
        ReplCommand::Write(content) => match replica.edit_active(content) {
            Some(event) => Outcome::send(event),
            None => Outcome::say("No active file"),
        },
        ReplCommand::Show(name) => {
            let file = match &name {
                Some(name) => replica.file(name),
                None => replica.active(),
            };
            match file {
                Some(file) => Outcome::say(format!("--- {} ---\n{}", file.name, file.content)),
                None => Outcome::say("No such file"),
            }
        }
        ReplCommand::Run(command) => Outcome::send(ClientEvent::TerminalCommand {
            space_name: replica.space_name().to_string(),
            command,
        }),
        ReplCommand::Help => Outcome::say(HELP),
        ReplCommand::Quit => Outcome {
            quit: true,
            ..Outcome::default()
        },
    }
}

/// One-line rendering of the open tabs, active tab in brackets
pub fn tab_bar(replica: &ClientReplica) -> String {
    if replica.open_tabs().is_empty() {
        return "(no open tabs)".to_string();
    }
    replica
        .open_tabs()
        .iter()
        .map(|name| {
            if Some(name.as_str()) == replica.active_name() {
                format!("[{}]", name)
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Message to print for a change applied from the server
pub fn describe(change: &ReplicaChange) -> Option<String> {
    match change {
        ReplicaChange::ContentUpdated { file } => Some(format!("~ {} updated by a peer", file)),
        ReplicaChange::FilesReplaced { added } if !added.is_empty() => {
            Some(format!("+ {}", added.join(", ")))
        }
        ReplicaChange::FilesReplaced { .. } => None,
        ReplicaChange::FileRemoved { file, active } => Some(match active {
            Some(active) => format!("- {} deleted (active: {})", file, active),
            None => format!("- {} deleted (no open tabs)", file),
        }),
        ReplicaChange::PrivacyUpdated { is_public } => Some(format!(
            "Space is now {}",
            if *is_public { "public" } else { "private" }
        )),
        ReplicaChange::PeerClosed { file } => Some(format!("A peer closed {}", file)),
        ReplicaChange::PeerJoined { id } => Some(format!("A peer joined ({})", id)),
        ReplicaChange::TerminalOutput { text } => Some(text.trim_end().to_string()),
        ReplicaChange::Error { message } => Some(format!("Error: {}", message)),
        ReplicaChange::Ignored => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespace_core::{SpaceData, SpaceFile};

    fn replica() -> ClientReplica {
        ClientReplica::from_snapshot(SpaceData {
            name: "demo".into(),
            is_public: true,
            has_secret: false,
            files: vec![
                SpaceFile::default_file(),
                SpaceFile::new("app.js", None),
                SpaceFile::new("style.css", None),
            ],
        })
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("   ").unwrap(), None);
        assert_eq!(ReplCommand::parse("ls").unwrap(), Some(ReplCommand::List));
        assert_eq!(
            ReplCommand::parse("open app.js").unwrap(),
            Some(ReplCommand::Open("app.js".into()))
        );
        assert_eq!(
            ReplCommand::parse("new main py").unwrap(),
            Some(ReplCommand::New {
                name: "main".into(),
                language: Some("py".into())
            })
        );
        assert_eq!(
            ReplCommand::parse("write a\\nb").unwrap(),
            Some(ReplCommand::Write("a\nb".into()))
        );
        assert_eq!(
            ReplCommand::parse("run node app.js").unwrap(),
            Some(ReplCommand::Run("node app.js".into()))
        );
        assert_eq!(ReplCommand::parse("show").unwrap(), Some(ReplCommand::Show(None)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ReplCommand::parse("open").is_err());
        assert!(ReplCommand::parse("frobnicate").is_err());
    }

    #[test]
    fn test_write_edits_active_file() {
        let mut replica = replica();
        let outcome = execute(&mut replica, ReplCommand::Write("<p>hi</p>".into()));

        assert_eq!(
            outcome.events,
            vec![ClientEvent::CodeChange {
                space_name: "demo".into(),
                file: "index.html".into(),
                content: "<p>hi</p>".into(),
            }]
        );
        assert_eq!(replica.active().unwrap().content, "<p>hi</p>");
    }

    #[test]
    fn test_new_normalizes_name() {
        let mut replica = replica();
        let outcome = execute(
            &mut replica,
            ReplCommand::New {
                name: "notes".into(),
                language: None,
            },
        );
        assert_eq!(
            outcome.events,
            vec![ClientEvent::CreateFile {
                space_name: "demo".into(),
                file_name: "notes.txt".into(),
                language: None,
            }]
        );
    }

    #[test]
    fn test_rm_applies_tie_break_locally() {
        let mut replica = replica();
        execute(&mut replica, ReplCommand::Open("app.js".into()));
        execute(&mut replica, ReplCommand::Open("style.css".into()));
        execute(&mut replica, ReplCommand::Open("app.js".into()));

        let outcome = execute(&mut replica, ReplCommand::Remove("app.js".into()));

        assert_eq!(replica.active_name(), Some("index.html"));
        assert_eq!(outcome.lines, vec!["[index.html] style.css".to_string()]);
        assert!(matches!(
            outcome.events.as_slice(),
            [ClientEvent::DeleteFile { file_name, .. }] if file_name == "app.js"
        ));
    }

    #[test]
    fn test_close_emits_advisory_event() {
        let mut replica = replica();
        let outcome = execute(&mut replica, ReplCommand::Close("index.html".into()));
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.lines, vec!["(no open tabs)".to_string()]);

        let outcome = execute(&mut replica, ReplCommand::Write("x".into()));
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_list_marks_tabs() {
        let mut replica = replica();
        execute(&mut replica, ReplCommand::Open("app.js".into()));

        let outcome = execute(&mut replica, ReplCommand::List);
        assert_eq!(
            outcome.lines,
            vec![
                "+ index.html (html)".to_string(),
                "* app.js (js)".to_string(),
                "  style.css (css)".to_string(),
            ]
        );
    }

    #[test]
    fn test_quit() {
        let mut replica = replica();
        assert!(execute(&mut replica, ReplCommand::Quit).quit);
    }
}
