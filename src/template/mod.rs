//! Step template expansion.
//!
//! A template is lexed into words, then every `{name}` reference is
//! replaced from the active [`Scope`]. Expansion is purely textual; all
//! platform branching already happened when the variable set was resolved.

pub mod lexer;

pub use lexer::{Lexer, Token, Word};

use crate::error::{DjmakeError, Result};
use crate::platform::PlatformVariableSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

static VARIABLE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").unwrap());

/// Fragments may reference other fragments; this bounds the nesting.
const MAX_SPLICE_DEPTH: usize = 8;

/// Values visible to a template: the platform variables plus whatever the
/// invocation supplied (prompt answers).
pub struct Scope<'a> {
    vars: &'a PlatformVariableSet,
    inputs: &'a BTreeMap<String, String>,
}

enum Value<'a> {
    /// Platform fragment, spliced as words when it stands alone.
    Fragment(&'a str),
    /// Invocation input, always a single literal word.
    Literal(&'a str),
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a PlatformVariableSet, inputs: &'a BTreeMap<String, String>) -> Self {
        Self { vars, inputs }
    }

    fn lookup(&self, name: &str) -> Result<Value<'a>> {
        if let Some(value) = self.inputs.get(name) {
            return Ok(Value::Literal(value));
        }
        self.vars
            .get(name)
            .map(Value::Fragment)
            .ok_or_else(|| DjmakeError::UnknownVariable(name.to_string()))
    }
}

/// A fully expanded process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// File that receives the child's stdout, when redirected.
    pub stdout: Option<String>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", display_word(arg))?;
        }
        if let Some(target) = &self.stdout {
            write!(f, " > {}", display_word(target))?;
        }
        Ok(())
    }
}

fn display_word(word: &str) -> String {
    if word.is_empty() || word.chars().any(|c| c.is_whitespace() || c == '\'') {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        word.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Word(String),
    RedirectOut,
}

/// Expands a template into a command line.
pub fn expand(template: &str, scope: &Scope<'_>) -> Result<CommandLine> {
    let pieces = expand_pieces(template, scope, 0)?;

    let mut words = Vec::new();
    let mut stdout = None;
    let mut iter = pieces.into_iter();
    while let Some(piece) = iter.next() {
        match piece {
            Piece::Word(word) => words.push(word),
            Piece::RedirectOut => match iter.next() {
                Some(Piece::Word(target)) if stdout.is_none() => stdout = Some(target),
                Some(Piece::Word(_)) => {
                    return Err(DjmakeError::Template(format!(
                        "more than one redirect in `{}`",
                        template
                    )))
                }
                _ => {
                    return Err(DjmakeError::Template(format!(
                        "redirect without a target in `{}`",
                        template
                    )))
                }
            },
        }
    }

    let mut words = words.into_iter();
    let program = words
        .next()
        .ok_or_else(|| DjmakeError::Template(format!("`{}` expands to an empty command", template)))?;

    Ok(CommandLine {
        program,
        args: words.collect(),
        stdout,
    })
}

/// Expands a template that must produce exactly one word, such as a path.
pub fn expand_word(template: &str, scope: &Scope<'_>) -> Result<String> {
    let line = expand(template, scope)?;
    if !line.args.is_empty() || line.stdout.is_some() {
        return Err(DjmakeError::Template(format!(
            "`{}` must expand to a single word",
            template
        )));
    }
    Ok(line.program)
}

fn expand_pieces(template: &str, scope: &Scope<'_>, depth: usize) -> Result<Vec<Piece>> {
    if depth > MAX_SPLICE_DEPTH {
        return Err(DjmakeError::Template(format!(
            "variables nest deeper than {} levels",
            MAX_SPLICE_DEPTH
        )));
    }

    let mut pieces = Vec::new();
    for token in Lexer::new(template).tokenize()? {
        match token {
            Token::RedirectOut => pieces.push(Piece::RedirectOut),
            Token::Word(word) => match standalone_reference(&word) {
                Some(name) => match scope.lookup(name)? {
                    Value::Fragment(fragment) => {
                        pieces.extend(expand_pieces(fragment, scope, depth + 1)?)
                    }
                    Value::Literal(value) => pieces.push(Piece::Word(value.to_string())),
                },
                None => pieces.push(Piece::Word(substitute(&word.text, scope)?)),
            },
            Token::Eof => break,
        }
    }
    Ok(pieces)
}

/// Name of the variable when an unquoted word is nothing but `{name}`.
fn standalone_reference(word: &Word) -> Option<&str> {
    if word.quoted {
        return None;
    }
    let caps = VARIABLE_REF.captures(&word.text)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == word.text.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

/// Raw textual substitution inside a single word.
fn substitute(text: &str, scope: &Scope<'_>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in VARIABLE_REF.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        match scope.lookup(name.as_str())? {
            Value::Fragment(value) | Value::Literal(value) => out.push_str(value),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
