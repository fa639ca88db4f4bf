use colored::{ColoredString, Colorize};
use deploygraph::{Notifier, Prompter};
use dialoguer::Input;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print the final error before exiting
pub fn fatal(msg: &str) {
    eprintln!("{}", format!("FATAL: {msg}").red());
}

// ============================================================================
// Deploy notices
// ============================================================================

/// Style one notice: the action word colored, step counters highlighted.
fn styled_notice(message: &str) -> String {
    if let Some(rest) = message.strip_prefix('[')
        && let Some((counter, tail)) = rest.split_once(']')
    {
        return format!("{}{tail}", format!("[{counter}]").blue().bold());
    }

    let (word, tail) = message.split_once(' ').unwrap_or((message, ""));
    let word: ColoredString = match word {
        "created" => word.green(),
        "updated" => word.yellow(),
        "deleted" => word.red(),
        "deployed" | "undeployed" => word.bold(),
        _ => word.normal(),
    };
    if tail.is_empty() {
        word.to_string()
    } else {
        format!("{word} {tail}")
    }
}

/// Prints deploy notices to stdout
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, message: &str) {
        log::info!("{message}");
        if !self.quiet {
            println!("{}", styled_notice(message));
        }
    }
}

/// Asks `!prompt:` questions on the terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, text: &str) -> deploygraph::Result<String> {
        Input::<String>::new()
            .with_prompt(text)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| deploygraph::Error::config(format!("prompt '{text}' failed: {e}")))
    }

    fn rejected(&mut self, value: &str, pattern: &str) {
        warn(&format!("'{value}' does not match {pattern}"));
    }
}

// ============================================================================
// Tests
// ============================================================================
