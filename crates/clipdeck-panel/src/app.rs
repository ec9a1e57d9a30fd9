//! Panel state and command handling
//!
//! The panel is the presentation collaborator the core expects: it turns
//! operator commands into core calls and renders the events coming back.
//! All state mutation happens on the single event-loop thread in main.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clipdeck_core::listing::display_label;
use clipdeck_core::remote::RemoteTarget;
use clipdeck_core::section::SectionRegistry;
use clipdeck_core::selection::{ClickOutcome, SelectionEngine};
use clipdeck_core::services::{AppEvent, CommitPlan, SyncClient, WatchClient};

/// Parsed operator command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(PathBuf),
    Remove(String),
    List,
    /// Rename the engine input a section feeds
    Input { section: String, input_name: String },
    /// Toggle replace/append mode
    Replace(String),
    /// Plain click on the n-th item (1-based)
    Click { section: String, index: usize },
    /// Modifier-held click: toggle the item in the pending batch
    MultiClick { section: String, index: usize },
    /// Modifier released: flush all pending batches
    Release,
    /// Override the engine address for subsequent commits
    Target { host: String, port: String },
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(String::new)?;
        let rest: Vec<&str> = words.collect();

        let arg = |n: usize, what: &str| -> Result<String, String> {
            rest.get(n)
                .map(|s| s.to_string())
                .ok_or_else(|| format!("{verb}: missing {what}"))
        };

        match verb {
            "add" => Ok(Command::Add(PathBuf::from(arg(0, "directory")?))),
            "remove" | "rm" => Ok(Command::Remove(arg(0, "section")?)),
            "ls" | "list" => Ok(Command::List),
            "input" => Ok(Command::Input {
                section: arg(0, "section")?,
                input_name: arg(1, "input name")?,
            }),
            "replace" => Ok(Command::Replace(arg(0, "section")?)),
            "click" => Ok(Command::Click {
                section: arg(0, "section")?,
                index: parse_index(&arg(1, "item number")?)?,
            }),
            "mclick" => Ok(Command::MultiClick {
                section: arg(0, "section")?,
                index: parse_index(&arg(1, "item number")?)?,
            }),
            "release" => Ok(Command::Release),
            "target" => Ok(Command::Target {
                host: arg(0, "host")?,
                port: arg(1, "port")?,
            }),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command: {other} (try 'help')")),
        }
    }
}

/// 1-based item number as typed by the operator
fn parse_index(word: &str) -> Result<usize, String> {
    match word.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("not an item number: {word}")),
    }
}

pub const HELP: &str = "\
commands:
  add <dir>                 watch a directory as a new section
  remove <section>          drop a section and stop watching
  ls                        show sections, items and marks
  input <section> <name>    set the vMix input the section feeds
  replace <section>         toggle replace/append commit mode
  click <section> <n>       send item n (replace mode clears the list first)
  mclick <section> <n>      toggle item n in the pending batch
  release                   commit all pending batches
  target <host> <port>      point commits at another engine
  quit";

pub struct PanelApp {
    registry: SectionRegistry,
    selection: SelectionEngine,
    watch: WatchClient,
    sync: SyncClient,
    target: RemoteTarget,
    /// Sections with a commit in flight; their controls are disabled
    busy: HashSet<PathBuf>,
}

impl PanelApp {
    pub fn new(watch: WatchClient, sync: SyncClient, target: RemoteTarget) -> Self {
        Self {
            registry: SectionRegistry::new(),
            selection: SelectionEngine::new(),
            watch,
            sync,
            target,
            busy: HashSet::new(),
        }
    }

    /// Handle one operator line; returns false when the panel should exit.
    pub fn handle_line(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        match Command::parse(line) {
            Ok(Command::Quit) => return false,
            Ok(cmd) => self.run_command(cmd),
            Err(e) => {
                if !e.is_empty() {
                    println!("{e}");
                }
            }
        }
        true
    }

    fn run_command(&mut self, cmd: Command) {
        match cmd {
            Command::Add(path) => match self.watch.watch(path.clone()) {
                Ok(items) => {
                    let section = self.registry.add(path, items);
                    println!(
                        "section '{}' -> input '{}', {} item(s)",
                        section.name,
                        section.input_name,
                        section.items().len()
                    );
                }
                Err(e) => println!("add failed: {e}"),
            },

            Command::Remove(key) => {
                let Some(path) = self.resolve(&key) else {
                    println!("no such section: {key}");
                    return;
                };
                if let Err(e) = self.watch.unwatch(path.clone()) {
                    log::warn!("unwatch failed: {e}");
                }
                self.selection.clear_section(&path);
                self.busy.remove(&path);
                self.registry.remove(&path);
                println!("removed {}", path.display());
            }

            Command::List => self.print_sections(),

            Command::Input { section, input_name } => {
                let Some(path) = self.resolve(&section) else {
                    println!("no such section: {section}");
                    return;
                };
                if let Some(s) = self.registry.get_mut(&path) {
                    s.set_input_name(&input_name);
                    println!("{} -> input '{input_name}'", s.name);
                }
            }

            Command::Replace(section) => {
                let Some(path) = self.resolve(&section) else {
                    println!("no such section: {section}");
                    return;
                };
                if let Some(s) = self.registry.get_mut(&path) {
                    let on = s.toggle_replace();
                    println!("{}: replace {}", s.name, if on { "ON" } else { "OFF" });
                }
            }

            Command::Click { section, index } => self.click(&section, index, false),
            Command::MultiClick { section, index } => self.click(&section, index, true),

            Command::Release => {
                let flushed = self.selection.release_modifier();
                if flushed.is_empty() {
                    return;
                }
                for (dir_path, items) in flushed {
                    self.dispatch_commit(&dir_path, items);
                }
            }

            Command::Target { host, port } => {
                self.target = RemoteTarget::from_overrides(&host, &port);
                println!("engine target: {}", self.target.api_url());
            }

            Command::Help => println!("{HELP}"),
            Command::Quit => unreachable!("handled in handle_line"),
        }
    }

    fn click(&mut self, section: &str, index: usize, modifier_held: bool) {
        let Some(path) = self.resolve(section) else {
            println!("no such section: {section}");
            return;
        };
        if self.busy.contains(&path) {
            println!("section busy, commit in flight");
            return;
        }
        let Some(item) = self
            .registry
            .get(&path)
            .and_then(|s| s.item_at(index))
            .cloned()
        else {
            println!("no item {} in {}", index + 1, path.display());
            return;
        };

        match self.selection.click(&path, &item, modifier_held) {
            ClickOutcome::AddedToBatch => {
                println!("+ {} (pending: {})", display_label(&item), self.selection.pending(&path).len());
            }
            ClickOutcome::RemovedFromBatch => {
                println!("- {} (pending: {})", display_label(&item), self.selection.pending(&path).len());
            }
            ClickOutcome::Commit(items) => self.dispatch_commit(&path, items),
        }
    }

    fn dispatch_commit(&mut self, dir_path: &Path, items: Vec<PathBuf>) {
        let Some(section) = self.registry.get(dir_path) else {
            return;
        };
        let plan = CommitPlan {
            dir_path: dir_path.to_path_buf(),
            input_name: section.input_name.clone(),
            replace: section.replace_mode,
            items,
            target: self.target.clone(),
        };
        // Outcome arrives on the event bus; the reply channel is dropped
        match self.sync.request_commit(plan) {
            Ok(_pending) => {}
            Err(e) => println!("commit failed to queue: {e}"),
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::DirectoryChanged { path, items } => {
                if let Some(section) = self.registry.get_mut(&path) {
                    section.set_items(items);
                    println!(
                        "[{}] listing updated: {} item(s)",
                        section.name,
                        section.items().len()
                    );
                }
            }

            AppEvent::CommitStarted { dir_path, input_name, item_count } => {
                self.busy.insert(dir_path);
                println!("Sending {item_count} item(s) to vMix input '{input_name}'...");
            }

            AppEvent::CommitFinished { plan, result } => {
                self.busy.remove(&plan.dir_path);
                let name = self
                    .registry
                    .get(&plan.dir_path)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| plan.dir_path.display().to_string());
                match result {
                    Ok(()) => {
                        if let Some(section) = self.registry.get_mut(&plan.dir_path) {
                            section.apply_commit(&plan.items, plan.replace);
                        }
                        let verb = if plan.replace { "Set" } else { "Added" };
                        match plan.items.as_slice() {
                            [single] => println!("[{name}] {verb}: {}", display_label(single)),
                            items => println!("[{name}] {verb}: {} items", items.len()),
                        }
                    }
                    Err(e) => println!("[{name}] Error: {e}"),
                }
            }

            AppEvent::CommitRejected { dir_path, error } => {
                println!("[{}] refused: {error}", dir_path.display());
            }

            AppEvent::ServiceStarted { service_name } => {
                log::debug!("{service_name} started");
            }
            AppEvent::ServiceStopped { service_name } => {
                log::debug!("{service_name} stopped");
            }
            AppEvent::ServiceError { service_name, error } => {
                println!("{service_name} error: {error}");
            }
        }
    }

    fn print_sections(&self) {
        if self.registry.is_empty() {
            println!("no sections (use: add <dir>)");
            return;
        }
        for section in self.registry.iter() {
            let mode = if section.replace_mode { "replace" } else { "append" };
            let busy = if self.busy.contains(&section.dir_path) { " [busy]" } else { "" };
            println!(
                "{} ({}) -> input '{}' [{mode}]{busy}",
                section.name,
                section.dir_path.display(),
                section.input_name
            );
            let pending = self.selection.pending(&section.dir_path);
            for (i, item) in section.items().iter().enumerate() {
                let mark = if pending.contains(item) {
                    '+'
                } else if section.is_active(item) {
                    '*'
                } else {
                    ' '
                };
                println!("  {:>3} {mark} {}", i + 1, display_label(item));
            }
        }
    }

    /// Resolve a section key typed by the operator: exact directory
    /// path first, then section name.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let as_path = Path::new(key);
        if self.registry.get(as_path).is_some() {
            return Some(as_path.to_path_buf());
        }
        self.registry
            .iter()
            .find(|s| s.name == key)
            .map(|s| s.dir_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click_commands() {
        assert_eq!(
            Command::parse("click clips 3").unwrap(),
            Command::Click { section: "clips".to_string(), index: 2 }
        );
        assert_eq!(
            Command::parse("mclick /media/clips 1").unwrap(),
            Command::MultiClick { section: "/media/clips".to_string(), index: 0 }
        );
        assert!(Command::parse("click clips 0").is_err());
        assert!(Command::parse("click clips x").is_err());
        assert!(Command::parse("click clips").is_err());
    }

    #[test]
    fn test_parse_section_commands() {
        assert_eq!(Command::parse("add /media/clips").unwrap(), Command::Add(PathBuf::from("/media/clips")));
        assert_eq!(Command::parse("rm clips").unwrap(), Command::Remove("clips".to_string()));
        assert_eq!(
            Command::parse("input clips Replays").unwrap(),
            Command::Input { section: "clips".to_string(), input_name: "Replays".to_string() }
        );
        assert_eq!(Command::parse("release").unwrap(), Command::Release);
        assert_eq!(
            Command::parse("target 10.0.0.5 9000").unwrap(),
            Command::Target { host: "10.0.0.5".to_string(), port: "9000".to_string() }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_verbs() {
        assert!(Command::parse("frobnicate").is_err());
    }
}
