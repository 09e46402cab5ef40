//! DN and filter templates with a numeric placeholder
//!
//! A template holds at most one `%d`, `%Nd` or `%0Nd` placeholder, e.g.
//! `cn=user%04d,dc=example,dc=com`. When an identifier range is configured
//! every rendered value substitutes an id drawn uniformly from the range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder {
    width: usize,
    zero_pad: bool,
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    /// (prefix, placeholder, suffix) when the template is parameterized
    parts: Option<(String, Placeholder, String)>,
}

impl Template {
    /// Parse a template. Text without `%` is a literal.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some(start) = raw.find('%') else {
            return Ok(Self {
                raw: raw.to_string(),
                parts: None,
            });
        };

        let invalid = |reason: &str| BenchError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let spec = &raw[start + 1..];
        let digits: String = spec.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !spec[digits.len()..].starts_with('d') {
            return Err(invalid("placeholder must be %d, %Nd or %0Nd"));
        }

        let zero_pad = digits.starts_with('0');
        let width = if digits.is_empty() {
            0
        } else {
            digits
                .parse::<usize>()
                .map_err(|_| invalid("placeholder width is not a number"))?
        };

        let suffix = &spec[digits.len() + 1..];
        if suffix.contains('%') {
            return Err(invalid("only one placeholder is supported"));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts: Some((
                raw[..start].to_string(),
                Placeholder { width, zero_pad },
                suffix.to_string(),
            )),
        })
    }

    pub fn is_parameterized(&self) -> bool {
        self.parts.is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitute `id` into the placeholder. Literal templates ignore `id`.
    pub fn render(&self, id: u64) -> String {
        match &self.parts {
            None => self.raw.clone(),
            Some((prefix, ph, suffix)) => {
                let value = if ph.zero_pad {
                    format!("{:0width$}", id, width = ph.width)
                } else {
                    format!("{:>width$}", id, width = ph.width)
                };
                format!("{}{}{}", prefix, value, suffix)
            }
        }
    }
}

/// Inclusive identifier range `[first, last]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub first: u64,
    pub last: u64,
}

impl IdRange {
    /// Returns `None` when the range is disabled (`last == 0`) or empty
    pub fn new(first: u64, last: u64) -> Option<Self> {
        (last > 0 && last >= first).then_some(Self { first, last })
    }

    pub fn contains(&self, id: u64) -> bool {
        (self.first..=self.last).contains(&id)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.first..=self.last)
    }
}

/// Produces concrete values from a template and an optional id range
#[derive(Debug)]
pub struct TemplateGenerator {
    template: Template,
    range: Option<IdRange>,
    rng: StdRng,
}

impl TemplateGenerator {
    pub fn new(template: Template, range: Option<IdRange>) -> Self {
        Self::with_rng(template, range, StdRng::from_entropy())
    }

    pub fn with_rng(template: Template, range: Option<IdRange>, rng: StdRng) -> Self {
        Self { template, range, rng }
    }

    /// True when each call to [`next_value`](Self::next_value) draws a fresh id
    pub fn is_randomized(&self) -> bool {
        self.template.is_parameterized() && self.range.is_some()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn next_value(&mut self) -> String {
        match self.range {
            Some(range) if self.template.is_parameterized() => {
                let id = range.sample(&mut self.rng);
                self.template.render(id)
            }
            _ => self.template.as_str().to_string(),
        }
    }
}
