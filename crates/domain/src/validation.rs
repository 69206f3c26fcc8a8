//! Explicit request validation.
//!
//! Each request type lists its fields and the rules that apply to them in
//! [`Validate::rules`]. The [`Validator`] walks that list and records the
//! first failing rule of every field in a field-keyed [`ValidationErrors`] map.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Field-keyed validation messages.
///
/// Nested fields use `items[i].field` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation error")]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Creates an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error map holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Records a message unless the field already failed.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Returns the message recorded for a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The value a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Text(&'a str),
    Number(f64),
    /// Length of a list.
    Count(usize),
    /// An optional field that was not supplied.
    Absent,
}

/// A single validation rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Non-empty text, non-zero number or non-empty list.
    Required,
    /// Supplied at all, even if zero.
    Present,
    /// Minimum character count (text) or element count (list).
    MinLen(usize),
    /// Maximum character count (text) or element count (list).
    MaxLen(usize),
    Gt(f64),
    Gte(f64),
    Lte(f64),
    OneOf(&'static [&'static str]),
}

impl Rule {
    /// Returns the failure message, or `None` if the value passes.
    fn check(&self, value: Value<'_>) -> Option<String> {
        let passes = match (*self, value) {
            (Rule::Required, Value::Text(s)) => !s.is_empty(),
            (Rule::Required, Value::Number(n)) => n != 0.0,
            (Rule::Required, Value::Count(c)) => c > 0,
            (Rule::Required | Rule::Present, Value::Absent) => false,
            (Rule::MinLen(min), Value::Text(s)) => s.chars().count() >= min,
            (Rule::MinLen(min), Value::Count(c)) => c >= min,
            (Rule::MaxLen(max), Value::Text(s)) => s.chars().count() <= max,
            (Rule::MaxLen(max), Value::Count(c)) => c <= max,
            (Rule::Gt(bound), Value::Number(n)) => n > bound,
            (Rule::Gte(bound), Value::Number(n)) => n >= bound,
            (Rule::Lte(bound), Value::Number(n)) => n <= bound,
            (Rule::OneOf(options), Value::Text(s)) => options.contains(&s),
            // A rule that does not apply to this kind of value passes.
            _ => true,
        };

        if passes { None } else { Some(self.to_string()) }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required | Rule::Present => write!(f, "field is required"),
            Rule::MinLen(n) => write!(f, "minimum length is {n}"),
            Rule::MaxLen(n) => write!(f, "maximum length is {n}"),
            Rule::Gt(n) => write!(f, "must be greater than {}", Bound(*n)),
            Rule::Gte(n) => write!(f, "must be greater than or equal to {}", Bound(*n)),
            Rule::Lte(n) => write!(f, "must be less than or equal to {}", Bound(*n)),
            Rule::OneOf(options) => write!(f, "must be one of: {}", options.join(" ")),
        }
    }
}

/// Prints whole bounds without a fractional part.
struct Bound(f64);

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The rules declared for one field.
#[derive(Debug, Clone)]
pub struct Check<'a> {
    field: String,
    value: Value<'a>,
    rules: Vec<Rule>,
}

impl<'a> Check<'a> {
    pub fn text(field: impl Into<String>, value: &'a str) -> Self {
        Self::new(field, Value::Text(value))
    }

    pub fn number(field: impl Into<String>, value: f64) -> Self {
        Self::new(field, Value::Number(value))
    }

    pub fn integer(field: impl Into<String>, value: i64) -> Self {
        Self::new(field, Value::Number(value as f64))
    }

    pub fn optional_integer(field: impl Into<String>, value: Option<i64>) -> Self {
        match value {
            Some(n) => Self::integer(field, n),
            None => Self::new(field, Value::Absent),
        }
    }

    pub fn count(field: impl Into<String>, len: usize) -> Self {
        Self::new(field, Value::Count(len))
    }

    fn new(field: impl Into<String>, value: Value<'a>) -> Self {
        Self {
            field: field.into(),
            value,
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn present(self) -> Self {
        self.rule(Rule::Present)
    }

    pub fn min_len(self, n: usize) -> Self {
        self.rule(Rule::MinLen(n))
    }

    pub fn max_len(self, n: usize) -> Self {
        self.rule(Rule::MaxLen(n))
    }

    pub fn gt(self, n: f64) -> Self {
        self.rule(Rule::Gt(n))
    }

    pub fn gte(self, n: f64) -> Self {
        self.rule(Rule::Gte(n))
    }

    pub fn lte(self, n: f64) -> Self {
        self.rule(Rule::Lte(n))
    }

    pub fn one_of(self, options: &'static [&'static str]) -> Self {
        self.rule(Rule::OneOf(options))
    }

    fn first_failure(&self) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.check(self.value))
    }
}

/// Evaluates field checks and collects their failures.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates one field, keeping only its first failing rule.
    pub fn check(&mut self, check: Check<'_>) {
        if let Some(message) = check.first_failure() {
            self.errors.insert(check.field, message);
        }
    }

    /// Returns the collected errors, if any.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// A request with a statically declared validation schema.
pub trait Validate {
    /// Normalizes the request before validation, usually by trimming text fields.
    fn sanitize(&mut self) {}

    /// Declares the checks for every field.
    fn rules(&self) -> Vec<Check<'_>>;

    /// Runs every check.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut validator = Validator::new();
        for check in self.rules() {
            validator.check(check);
        }
        validator.finish()
    }

    /// Sanitizes and validates in one step.
    fn validated(mut self) -> Result<Self, ValidationErrors>
    where
        Self: Sized,
    {
        self.sanitize();
        self.validate()?;
        Ok(self)
    }
}

/// Trims surrounding whitespace in place.
pub fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
