use std::borrow::Cow::{self, Borrowed, Owned};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rustyline::Context;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter, MatchingBracketHighlighter};
use rustyline::hint::HistoryHinter;
use rustyline::validate::MatchingBracketValidator;
use rustyline_derive::{Completer, Helper, Hinter, Validator};

use super::command::{Command, PageMove, Screen};

const PAGE_SIZES: &[&str] = &["5", "10", "20", "50"];

const FIELD_KEYS: &[&str] = &[
    "first=", "last=", "second=", "email=", "active=", "user=", "product=", "qty=", "price=",
];

// 行首命令词
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(\.?[A-Za-z]+)").expect("命令词正则无效"));
// key=value 中的 key
static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s)([A-Za-z]+)=").expect("字段正则无效"));

#[derive(Helper, Completer, Hinter, Validator)]
pub struct CommandHelper {
    #[rustyline(Completer)]
    completer: CommandCompleter,
    highlighter: MatchingBracketHighlighter,
    #[rustyline(Validator)]
    validator: MatchingBracketValidator,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    colored_prompt: String,
}

impl Default for CommandHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHelper {
    pub fn new() -> Self {
        Self {
            completer: CommandCompleter,
            highlighter: MatchingBracketHighlighter::new(),
            validator: MatchingBracketValidator::new(),
            hinter: HistoryHinter::new(),
            colored_prompt: "".to_owned(),
        }
    }

    pub fn with_colored_prompt(&mut self, prompt: String) {
        self.colored_prompt = prompt;
    }

    /// 已知命令词为蓝色，未知为红色，字段名为黄色
    fn highlight_command(line: &str) -> String {
        let result = COMMAND_RE.replace(line, |caps: &Captures| {
            let word = caps[2].to_lowercase();
            let known = Command::KEYWORDS.contains(&word.as_str())
                || Command::META_COMMANDS.contains(&word.as_str());
            let color = if known { "34" } else { "31" };
            format!("{}\x1b[{}m{}\x1b[0m", &caps[1], color, &caps[2])
        });

        FIELD_RE
            .replace_all(&result, |caps: &Captures| {
                format!("{}\x1b[33m{}\x1b[0m=", &caps[1], &caps[2])
            })
            .to_string()
    }
}

impl Highlighter for CommandHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default && !self.colored_prompt.is_empty() {
            Borrowed(&self.colored_prompt)
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(format!("\x1b[1m{}\x1b[m", hint))
    }

    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let highlighted = Self::highlight_command(line);
        if highlighted != line {
            Owned(highlighted)
        } else {
            self.highlighter.highlight(line, pos)
        }
    }

    fn highlight_char(&self, line: &str, pos: usize, forced: CmdKind) -> bool {
        // 每次按键都重新着色命令词
        self.highlighter.highlight_char(line, pos, forced) || !line.trim().is_empty()
    }
}

/// 补全命令词、页面名、翻页方向、每页条数和字段名
pub struct CommandCompleter;

impl CommandCompleter {
    fn candidates(line: &str, word_start: usize) -> Vec<&'static str> {
        let before = line[..word_start].trim();
        if before.is_empty() {
            return Command::KEYWORDS
                .iter()
                .chain(Command::META_COMMANDS)
                .copied()
                .collect();
        }

        let head = before
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match head.as_str() {
            "use" => Screen::NAMES.to_vec(),
            "page" => PageMove::NAMES.to_vec(),
            "size" => PAGE_SIZES.to_vec(),
            "new" | "edit" => FIELD_KEYS.to_vec(),
            _ => Vec::new(),
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let line_up_to_pos = &line[..pos];
        let word_start = line_up_to_pos
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = line_up_to_pos[word_start..].to_lowercase();

        let matches: Vec<Pair> = Self::candidates(line_up_to_pos, word_start)
            .into_iter()
            .filter(|candidate| candidate.starts_with(&prefix))
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();

        Ok((word_start, matches))
    }
}
