//! Processing recipes: one operation call per line, validated against the registry

use std::fmt;
use std::fs;
use std::io;
use std::iter::Peekable;
use std::path::Path;
use std::str::CharIndices;

use serde::Serialize;
use tracing::debug;

use crate::error::RecipeError;
use crate::registry::{Operation, OperationRegistry, Step};

/// Literal argument value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    /// Bare word, e.g. `mode=ppm`
    Ident(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Ident(s) => f.write_str(s),
        }
    }
}

/// One parsed call before registry lookup
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
    /// 1-based source line
    pub line: usize,
}

/// Cursor over a single recipe line
struct LineParser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> LineParser<'a> {
    fn new(src: &'a str, line: usize) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line,
        }
    }

    fn error(&self, reason: impl Into<String>) -> RecipeError {
        RecipeError::Syntax {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn expect(&mut self, wanted: char) -> Result<(), RecipeError> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, c)) if c == wanted => Ok(()),
            Some((_, c)) => Err(self.error(format!("expected '{}', found '{}'", wanted, c))),
            None => Err(self.error(format!("expected '{}', found end of line", wanted))),
        }
    }

    fn ident(&mut self) -> Result<&'a str, RecipeError> {
        self.skip_ws();
        let start = match self.chars.peek().copied() {
            Some((idx, c)) if c.is_ascii_alphabetic() || c == '_' => idx,
            Some((_, c)) => return Err(self.error(format!("expected a name, found '{}'", c))),
            None => return Err(self.error("expected a name, found end of line")),
        };
        let mut end = start;
        while let Some((idx, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        {
            end = idx + c.len_utf8();
        }
        let src = self.src;
        Ok(&src[start..end])
    }

    fn string(&mut self, quote: char) -> Result<String, RecipeError> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, c)) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<f64, RecipeError> {
        let start = self.chars.peek().map(|(idx, _)| *idx).unwrap_or(self.src.len());
        let mut end = start;
        let mut prev = ' ';
        while let Some((idx, c)) = self.chars.next_if(|(_, c)| {
            c.is_ascii_digit() || matches!(*c, '.' | 'e' | 'E' | '+' | '-')
        }) {
            // Signs are only valid at the start or after an exponent marker
            if matches!(c, '+' | '-') && idx != start && !matches!(prev, 'e' | 'E') {
                return Err(self.error(format!("unexpected '{}' in number", c)));
            }
            prev = c;
            end = idx + c.len_utf8();
        }
        let src = self.src;
        let text = &src[start..end];
        text.parse()
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn value(&mut self) -> Result<Value, RecipeError> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => Ok(Value::Str(self.string(q)?)),
            Some(c) if c.is_ascii_digit() || matches!(c, '.' | '+' | '-') => {
                Ok(Value::Number(self.number()?))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Ok(match self.ident()? {
                "True" => Value::Bool(true),
                "False" => Value::Bool(false),
                word => Value::Ident(word.to_string()),
            }),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("expected a value, found end of line")),
        }
    }

    /// `NAME ( [arg {, arg}] )` followed only by whitespace or a comment
    fn call(mut self) -> Result<Call, RecipeError> {
        let name = self.ident()?.to_string();
        self.expect('(')?;

        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Value)> = Vec::new();

        self.skip_ws();
        if self.peek() == Some(')') {
            self.chars.next();
        } else {
            loop {
                self.skip_ws();
                let value = self.value()?;
                self.skip_ws();

                if self.peek() == Some('=') {
                    let Value::Ident(key) = value else {
                        return Err(self.error("keyword argument name must be a plain word"));
                    };
                    self.chars.next();
                    keywords.push((key, self.value()?));
                } else if !keywords.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                } else {
                    positional.push(value);
                }

                self.skip_ws();
                match self.chars.next() {
                    Some((_, ',')) => continue,
                    Some((_, ')')) => break,
                    Some((_, c)) => {
                        return Err(self.error(format!("expected ',' or ')', found '{}'", c)));
                    }
                    None => return Err(self.error("missing ')'")),
                }
            }
        }

        self.skip_ws();
        match self.chars.next() {
            None | Some((_, '#')) => Ok(Call {
                name,
                positional,
                keywords,
                line: self.line,
            }),
            Some((_, c)) => Err(self.error(format!("unexpected '{}' after call", c))),
        }
    }
}

/// Parse the calls of a recipe without looking them up
pub fn parse_calls(input: &str) -> Result<Vec<Call>, RecipeError> {
    let mut calls = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        calls.push(LineParser::new(trimmed, idx + 1).call()?);
    }
    Ok(calls)
}

/// A validated sequence of processing steps
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recipe {
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Parse and validate against the built-in registry
    pub fn parse(input: &str) -> Result<Self, RecipeError> {
        Self::parse_with(input, &OperationRegistry::builtin()?)
    }

    pub fn parse_with(input: &str, registry: &OperationRegistry) -> Result<Self, RecipeError> {
        let calls = parse_calls(input)?;
        let mut steps = Vec::with_capacity(calls.len());
        let mut lines = Vec::with_capacity(calls.len());

        for call in &calls {
            let step = registry.build(call)?;
            if !step.extra.is_empty() {
                debug!(
                    line = call.line,
                    op = step.op.name(),
                    keywords = ?step.extra.keys().collect::<Vec<_>>(),
                    "passing keywords through to the engine"
                );
            }
            steps.push(step);
            lines.push(call.line);
        }

        let operations: Vec<&Operation> = steps.iter().map(|step| &step.op).collect();
        Self::check_order(&operations, &lines)?;
        debug!(steps = steps.len(), "recipe validated");
        Ok(Self { steps })
    }

    pub fn from_file(path: &Path) -> Result<Self, RecipeError> {
        Self::from_file_with(path, &OperationRegistry::builtin()?)
    }

    pub fn from_file_with(path: &Path, registry: &OperationRegistry) -> Result<Self, RecipeError> {
        let input = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RecipeError::MissingInput {
                path: path.to_path_buf(),
            },
            _ => RecipeError::Io(e),
        })?;
        Self::parse_with(&input, registry)
    }

    /// FID first, CREATE before any DIM, per-dimension steps after a DIM, run() once and last
    fn check_order(operations: &[&Operation], lines: &[usize]) -> Result<(), RecipeError> {
        let order = |line: usize, reason: &str| RecipeError::Order {
            line,
            reason: reason.to_string(),
        };

        let Some(first) = operations.first() else {
            return Err(order(1, "recipe is empty"));
        };
        if !matches!(first, Operation::Fid { .. }) {
            return Err(order(lines[0], "recipe must start with FID"));
        }

        let mut created = false;
        let mut in_dim = false;

        for (idx, (&op, &line)) in operations.iter().zip(lines).enumerate().skip(1) {
            match op {
                Operation::Fid { .. } => return Err(order(line, "FID may only appear once")),
                Operation::Create { .. } if created => {
                    return Err(order(line, "CREATE may only appear once"));
                }
                Operation::Create { .. } if in_dim => {
                    return Err(order(line, "CREATE must come before the first DIM"));
                }
                Operation::Create { .. } => created = true,
                Operation::Dim { .. } if !created => {
                    return Err(order(line, "CREATE must come before the first DIM"));
                }
                Operation::Dim { .. } => in_dim = true,
                Operation::Run if idx + 1 != operations.len() => {
                    return Err(order(line, "run() must be the last operation"));
                }
                Operation::Run => {}
                op if op.is_per_dimension() && !in_dim => {
                    let reason = format!("{} must follow a DIM", op.name());
                    return Err(order(line, reason.as_str()));
                }
                _ => {}
            }
        }

        if !matches!(operations.last(), Some(Operation::Run)) {
            let last_line = lines.last().copied().unwrap_or(1);
            return Err(order(last_line, "recipe must end with run()"));
        }

        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(f, "{}", step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HSQC: &str = "\
# 2D HSQC
FID('data/hsqc/fid')
CREATE(\"out/hsqc.nv\")

DIM(1)
SB()
ZF()
FT()
PHASE(12.5, -3)   # tuned by hand
EXTRACT(0.1, 0.6, mode=fraction)
DIM(2)
SB(offset=0.35, power=1)
ZF(factor=2)
FT()
REAL()
run()
";

    #[test]
    fn test_parse_full_recipe() {
        let recipe = Recipe::parse(HSQC).unwrap();
        assert_eq!(recipe.steps.len(), 14);
        assert_eq!(recipe.steps[0].op, Operation::Fid { path: "data/hsqc/fid".into() });
        assert_eq!(recipe.steps[6].op, Operation::Phase { ph0: 12.5, ph1: -3.0 });
        assert_eq!(
            recipe.steps[9].op,
            Operation::Sb { offset: 0.35, end: 1.0, power: 1.0 }
        );
        assert_eq!(recipe.steps.last(), Some(&Step::new(Operation::Run)));
    }

    #[test]
    fn test_canonical_form_reparses() {
        let recipe = Recipe::parse(HSQC).unwrap();
        let canonical = recipe.to_string();
        assert!(canonical.starts_with("FID('data/hsqc/fid')\nCREATE('out/hsqc.nv')\nDIM(1)\n"));
        assert_eq!(Recipe::parse(&canonical).unwrap(), recipe);
    }

    #[test]
    fn test_call_syntax() {
        let calls = parse_calls("  DIM( 1 , 2 )  \nFID('a\\'b')\nX(flag=True, n=-1.5e3)\n").unwrap();
        assert_eq!(calls[0].positional, [Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(calls[0].line, 1);
        assert_eq!(calls[1].positional, [Value::Str("a'b".into())]);
        assert_eq!(
            calls[2].keywords,
            [
                ("flag".to_string(), Value::Bool(true)),
                ("n".to_string(), Value::Number(-1500.0))
            ]
        );
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "FT",
            "FT(",
            "FT() extra",
            "PHASE(1,)",
            "PHASE(ph0=1, 2)",
            "FID('open",
            "1FT()",
            "PHASE(1-2)",
            "EXTRACT('a'=1)",
        ] {
            let err = parse_calls(bad).unwrap_err();
            assert!(matches!(err, RecipeError::Syntax { line: 1, .. }), "{}: {:?}", bad, err);
        }
    }

    #[test]
    fn test_order_rules() {
        let cases = [
            ("", "empty"),
            ("CREATE('o')\nFID('f')\nrun()", "start with FID"),
            ("FID('f')\nDIM(1)\nrun()", "before the first DIM"),
            ("FID('f')\nCREATE('o')\nFT()\nrun()", "must follow a DIM"),
            ("FID('f')\nCREATE('o')\nDIM(1)\nFT()", "end with run()"),
            ("FID('f')\nCREATE('o')\nrun()\nDIM(1)\nrun()", "last operation"),
            ("FID('f')\nFID('g')\nrun()", "only appear once"),
            ("FID('f')\nCREATE('o')\nDIM(1)\nCREATE('p')\nrun()", "only appear once"),
        ];
        for (input, expected) in cases {
            let err = Recipe::parse(input).unwrap_err();
            assert!(
                matches!(err, RecipeError::Order { .. }) && err.to_string().contains(expected),
                "{:?} -> {}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_error_line_numbers() {
        let err = Recipe::parse("FID('f')\n\n# note\nNOPE()\n").unwrap_err();
        assert!(matches!(err, RecipeError::UnknownOperation { line: 4, .. }));
    }

    #[test]
    fn test_json_form() {
        let recipe = Recipe::parse("FID('f')\nCREATE('o')\nDIM()\nZF(2)\nrun()\n").unwrap();
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["steps"][0]["op"], "FID");
        assert_eq!(json["steps"][3]["factor"], 2);
        assert_eq!(json["steps"][4]["op"], "run");
    }

    #[test]
    fn test_engine_keywords_survive() {
        let input = "\
FID('f')
CREATE('o')
DIM(1)
SB(c=0.5)
ZF(size=4096)
PHASE(10, 0, dimag=False)
EXTRACT(start=0.1, end=0.6, mode='region')
run()
";
        let recipe = Recipe::parse(input).unwrap();
        assert_eq!(recipe.steps[3].extra.get("c"), Some(&Value::Number(0.5)));
        assert_eq!(
            recipe.steps[6].op,
            Operation::Extract { start: 0.1, end: 0.6, mode: "region".into() }
        );

        let canonical = recipe.to_string();
        assert!(canonical.contains("PHASE(ph0=10, ph1=0, dimag=False)\n"));
        assert_eq!(Recipe::parse(&canonical).unwrap(), recipe);

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["steps"][4]["op"], "ZF");
        assert_eq!(json["steps"][4]["extra"]["size"], 4096.0);
        assert!(json["steps"][2].get("extra").is_none());
    }
}
