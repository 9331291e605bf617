//! Macro-invocation recognition for a single code line.
//!
//! Lines follow the usual assembler layout:
//!
//! ```text
//! label:   name   param, param, ...   ; comment
//! ```
//!
//! A label starts in column 0 (or is any token ending in `:`). The first
//! token after it names the macro and everything after that is a
//! comma-separated parameter list.

use serde::Serialize;

/// One parameter of a macro invocation, as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroParam {
    raw: String,
}

impl MacroParam {
    /// Create a parameter from raw text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The parameter text, trimmed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parse as a plain integer or `$hex` literal.
    pub fn try_int(&self) -> Option<i64> {
        let text = self.raw.trim();
        if let Ok(v) = text.parse::<i64>() {
            return Some(v);
        }
        let (negate, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let hex = body.strip_prefix('$')?;
        let v = i64::from_str_radix(hex, 16).ok()?;
        Some(if negate { -v } else { v })
    }
}

/// A recognized macro call: a name plus ordered, possibly absent parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroInvocation {
    name: String,
    params: Vec<Option<MacroParam>>,
}

impl MacroInvocation {
    /// Create an invocation.
    pub fn new(name: impl Into<String>, params: Vec<Option<MacroParam>>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Macro name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Parameter at `idx`, if present and non-empty.
    pub fn param(&self, idx: usize) -> Option<&MacroParam> {
        self.params.get(idx).and_then(Option::as_ref)
    }

    /// Raw text of the parameter at `idx`, or `""` when absent.
    pub fn param_text(&self, idx: usize) -> &str {
        self.param(idx).map(MacroParam::raw).unwrap_or("")
    }

    /// Number of parameter slots (including absent ones).
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The parameter list joined back together with `,`.
    pub fn params_joined(&self) -> String {
        self.params
            .iter()
            .map(|p| p.as_ref().map(MacroParam::raw).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Structure recognized on a code line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedLine {
    /// Label defined on the line, without a trailing `:`.
    pub label: Option<String>,
    /// Macro invocation, if the line names one.
    pub invocation: Option<MacroInvocation>,
}

impl ParsedLine {
    /// Whether the line carries neither a label nor an invocation.
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.invocation.is_none()
    }
}

/// Recognize the label and macro invocation on one line of source.
pub fn parse_line(raw: &str) -> ParsedLine {
    let code = strip_comment(raw);
    if code.trim().is_empty() {
        return ParsedLine::default();
    }

    let starts_in_column_zero = !code.starts_with(char::is_whitespace);
    let mut rest = code.trim();
    let mut label = None;

    let (first, after_first) = split_token(rest);
    if starts_in_column_zero || first.ends_with(':') {
        let name = first.trim_end_matches(':');
        if !name.is_empty() {
            label = Some(name.to_string());
        }
        rest = after_first;
    }

    let invocation = if rest.is_empty() {
        None
    } else {
        let (name, args) = split_token(rest);
        Some(MacroInvocation::new(name, split_params(args)))
    };

    ParsedLine { label, invocation }
}

/// Text before the first `;` that is not inside a quoted string.
fn strip_comment(raw: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (None, ';') => return &raw[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            _ => {}
        }
    }
    raw
}

/// Split off the first whitespace-delimited token.
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

fn split_params(args: &str) -> Vec<Option<MacroParam>> {
    if args.trim().is_empty() {
        return Vec::new();
    }
    args.split(',')
        .map(|p| {
            let p = p.trim();
            (!p.is_empty()).then(|| MacroParam::new(p))
        })
        .collect()
}
