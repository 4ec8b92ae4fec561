use std::collections::HashSet;

use rand::Rng;

use crate::value::GeneratedValue;

/// Suffix attempts that honor the column length before the limit is dropped.
const SUFFIX_ATTEMPTS: usize = 10_000;

/// What to produce once random retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Scan upward from `floor` for the first unused integer.
    Integer { floor: i64 },
    /// Stamp `<base>_<n>_<1000..=9999>` where `n` starts at the set size plus one.
    /// Without a base the last drawn value is used.
    Suffix { base: Option<String> },
}

/// Result of a uniqueness resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueOutcome {
    pub value: GeneratedValue,
    /// The value came from the fallback instead of the rule.
    pub fallback: bool,
}

/// Per-column set of issued values with retry-then-fallback resolution.
///
/// The fallback trades the declared domain for progress: it can emit
/// integers outside the rule range or text in a non-text column, but it
/// always terminates.
#[derive(Debug, Clone)]
pub struct UniquenessResolver {
    seen: HashSet<String>,
    max_int: Option<i64>,
    max_retry: u32,
    scan_limit: u64,
    max_length: Option<usize>,
}

impl UniquenessResolver {
    pub fn new(max_retry: u32, scan_limit: u64) -> Self {
        Self {
            seen: HashSet::new(),
            max_int: None,
            max_retry,
            scan_limit,
            max_length: None,
        }
    }

    /// Keep suffixed fallback values within a character limit when possible.
    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, value: &GeneratedValue) -> bool {
        self.seen.contains(&value.key())
    }

    /// Record a value; returns false when it was already issued.
    pub fn record(&mut self, value: &GeneratedValue) -> bool {
        if !self.seen.insert(value.key()) {
            return false;
        }
        if let Some(int) = value.as_i64() {
            self.max_int = Some(self.max_int.map_or(int, |max| max.max(int)));
        }
        true
    }

    /// Draw until an unseen value appears, at most `max_retry` times, then fall back.
    pub fn resolve<R, F>(
        &mut self,
        rng: &mut R,
        strategy: &FallbackStrategy,
        mut draw: F,
    ) -> UniqueOutcome
    where
        R: Rng + ?Sized,
        F: FnMut(&mut R) -> GeneratedValue,
    {
        let mut last = None;
        for _ in 0..self.max_retry {
            let candidate = draw(rng);
            if self.record(&candidate) {
                return UniqueOutcome {
                    value: candidate,
                    fallback: false,
                };
            }
            last = Some(candidate);
        }

        let value = match strategy {
            FallbackStrategy::Integer { floor } => match self.integer_fallback(*floor) {
                Some(value) => value,
                None => self.suffix_fallback(rng, &base_text(None, last.as_ref())),
            },
            FallbackStrategy::Suffix { base } => {
                self.suffix_fallback(rng, &base_text(base.as_deref(), last.as_ref()))
            }
        };
        self.record(&value);
        UniqueOutcome {
            value,
            fallback: true,
        }
    }

    fn integer_fallback(&self, floor: i64) -> Option<GeneratedValue> {
        let mut candidate = floor;
        for _ in 0..self.scan_limit {
            if !self.seen.contains(&candidate.to_string()) {
                return Some(GeneratedValue::Int(candidate));
            }
            candidate = candidate.checked_add(1)?;
        }

        // Scan exhausted: continue above everything issued so far.
        let mut candidate = self.max_int.unwrap_or(floor).max(candidate).checked_add(1)?;
        while self.seen.contains(&candidate.to_string()) {
            candidate = candidate.checked_add(1)?;
        }
        Some(GeneratedValue::Int(candidate))
    }

    fn suffix_fallback<R: Rng + ?Sized>(&self, rng: &mut R, base: &str) -> GeneratedValue {
        let mut counter = self.seen.len() + 1;
        for _ in 0..SUFFIX_ATTEMPTS {
            let suffix = format!("_{counter}_{}", rng.random_range(1000..=9999));
            let text = fit(base, &suffix, self.max_length);
            if !self.seen.contains(&text) {
                return GeneratedValue::Text(text);
            }
            counter += 1;
        }

        // The limit is too tight to hold a distinct suffix; ignore it.
        loop {
            let text = format!("{base}_{counter}");
            if !self.seen.contains(&text) {
                return GeneratedValue::Text(text);
            }
            counter += 1;
        }
    }
}

fn base_text(base: Option<&str>, last: Option<&GeneratedValue>) -> String {
    match (base, last) {
        (Some(base), _) => base.to_string(),
        (None, Some(value)) => value.key(),
        (None, None) => "fallback".to_string(),
    }
}

fn fit(base: &str, suffix: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) => {
            let keep = max.saturating_sub(suffix.chars().count());
            let mut text: String = base.chars().take(keep).collect();
            text.push_str(suffix);
            text.chars().take(max).collect()
        }
        None => format!("{base}{suffix}"),
    }
}
