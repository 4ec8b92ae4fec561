//! Value synthesis: typed rules and column heuristics.
//!
//! Rules are compiled once per table so contradictions surface before the
//! first row. Sampling itself cannot fail.

pub mod heuristic;
pub mod temporal;
pub mod text;

use rand::Rng;
use rand::seq::IndexedRandom;
use rowsmith_config::validate::{MAX_DECIMAL_PRECISION, decimal_span_is_samplable};
use rowsmith_config::{ColumnRule, parse_boundary_date, parse_boundary_timestamp};

use crate::errors::GenerationError;
use crate::value::GeneratedValue;

pub use heuristic::{HeuristicKind, HeuristicSampler};
pub use temporal::{DateRange, TimestampRange};

/// A validated, ready-to-sample column rule.
#[derive(Debug, Clone)]
pub enum RuleSampler {
    Int { min: i64, max: i64 },
    Decimal { min: f64, max: f64, precision: u32 },
    Boolean { true_probability: f64 },
    Date(DateRange),
    Timestamp(TimestampRange),
    Email { domains: Vec<String> },
    Pattern { template: Vec<char> },
    Enum { values: Vec<String> },
    Text {
        min_words: u32,
        max_words: u32,
        include_words: Vec<String>,
    },
}

impl RuleSampler {
    pub fn compile(rule: &ColumnRule) -> Result<Self, GenerationError> {
        let sampler = match rule {
            ColumnRule::Int(int) => {
                if int.min_value > int.max_value {
                    return Err(range_error("int", int.min_value, int.max_value));
                }
                RuleSampler::Int {
                    min: int.min_value,
                    max: int.max_value,
                }
            }
            ColumnRule::Decimal(decimal) => {
                if !decimal.min_value.is_finite() || !decimal.max_value.is_finite() {
                    return Err(GenerationError::Configuration(
                        "decimal bounds must be finite".to_string(),
                    ));
                }
                if decimal.min_value > decimal.max_value {
                    return Err(range_error("decimal", decimal.min_value, decimal.max_value));
                }
                if !decimal_span_is_samplable(decimal.min_value, decimal.max_value) {
                    return Err(GenerationError::Configuration(format!(
                        "decimal range [{}, {}] is too wide to sample",
                        decimal.min_value, decimal.max_value
                    )));
                }
                if decimal.precision > MAX_DECIMAL_PRECISION {
                    return Err(GenerationError::Configuration(format!(
                        "decimal precision {} exceeds {MAX_DECIMAL_PRECISION}",
                        decimal.precision
                    )));
                }
                RuleSampler::Decimal {
                    min: decimal.min_value,
                    max: decimal.max_value,
                    precision: decimal.precision,
                }
            }
            ColumnRule::Boolean(boolean) => {
                if !(0.0..=1.0).contains(&boolean.true_probability) {
                    return Err(GenerationError::Configuration(format!(
                        "true_probability {} is outside [0, 1]",
                        boolean.true_probability
                    )));
                }
                RuleSampler::Boolean {
                    true_probability: boolean.true_probability,
                }
            }
            ColumnRule::Date(date) => {
                let start = parse_date(&date.start_date)?;
                let end = parse_date(&date.end_date)?;
                RuleSampler::Date(
                    DateRange::new(start, end)
                        .ok_or_else(|| range_error("date", &date.start_date, &date.end_date))?,
                )
            }
            ColumnRule::Timestamp(timestamp) => {
                let start = parse_timestamp(&timestamp.start_date)?;
                let end = parse_timestamp(&timestamp.end_date)?;
                RuleSampler::Timestamp(TimestampRange::new(start, end).ok_or_else(|| {
                    range_error("timestamp", &timestamp.start_date, &timestamp.end_date)
                })?)
            }
            ColumnRule::Email(email) => {
                if email.domains.is_empty() {
                    return Err(GenerationError::Configuration(
                        "email rule has no domains".to_string(),
                    ));
                }
                RuleSampler::Email {
                    domains: email.domains.clone(),
                }
            }
            ColumnRule::Pattern(pattern) => RuleSampler::Pattern {
                template: pattern.pattern.chars().collect(),
            },
            ColumnRule::Enum(choices) => {
                if choices.values.is_empty() {
                    return Err(GenerationError::Configuration(
                        "enum rule has no values".to_string(),
                    ));
                }
                RuleSampler::Enum {
                    values: choices.values.clone(),
                }
            }
            ColumnRule::Text(text) => {
                if text.min_words > text.max_words {
                    return Err(range_error("text", text.min_words, text.max_words));
                }
                RuleSampler::Text {
                    min_words: text.min_words,
                    max_words: text.max_words,
                    include_words: text.include_words.clone(),
                }
            }
        };
        Ok(sampler)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedValue {
        match self {
            RuleSampler::Int { min, max } => GeneratedValue::Int(rng.random_range(*min..=*max)),
            RuleSampler::Decimal {
                min,
                max,
                precision,
            } => {
                let raw = rng.random_range(*min..=*max);
                GeneratedValue::Float(round_within(raw, *precision, *min, *max))
            }
            RuleSampler::Boolean { true_probability } => {
                GeneratedValue::Bool(rng.random_bool(*true_probability))
            }
            RuleSampler::Date(range) => GeneratedValue::Date(range.sample(rng)),
            RuleSampler::Timestamp(range) => GeneratedValue::Timestamp(range.sample(rng)),
            RuleSampler::Email { domains } => {
                let len = rng.random_range(5..=10);
                let local = text::lowercase(len, rng);
                let domain = domains.choose(rng).map(String::as_str).unwrap_or_default();
                GeneratedValue::Text(text::email(&local, domain, rng))
            }
            RuleSampler::Pattern { template } => {
                GeneratedValue::Text(text::fill_pattern(template, rng))
            }
            RuleSampler::Enum { values } => {
                GeneratedValue::Text(values.choose(rng).cloned().unwrap_or_default())
            }
            RuleSampler::Text {
                min_words,
                max_words,
                include_words,
            } => GeneratedValue::Text(text::words(*min_words, *max_words, include_words, rng)),
        }
    }

    /// Starting point of the integer uniqueness fallback scan.
    pub fn integer_floor(&self) -> Option<i64> {
        match self {
            RuleSampler::Int { min, .. } => Some(*min),
            _ => None,
        }
    }
}

/// Compile and sample a rule in one step.
pub fn synthesize<R: Rng + ?Sized>(
    rule: &ColumnRule,
    rng: &mut R,
) -> Result<GeneratedValue, GenerationError> {
    Ok(RuleSampler::compile(rule)?.sample(rng))
}

/// Round half away from zero to `precision` fractional digits.
///
/// Idempotent: rounding an already rounded value returns it unchanged.
/// Values too large to scale carry no fractional digits and pass through.
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Round, then pull back inside `[min, max]` along the precision grid.
fn round_within(value: f64, precision: u32, min: f64, max: f64) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = round_to_precision(value, precision);
    if rounded > max {
        let floored = (max * factor).floor() / factor;
        if floored.is_finite() { floored } else { max }
    } else if rounded < min {
        let ceiled = (min * factor).ceil() / factor;
        if ceiled.is_finite() { ceiled } else { min }
    } else {
        rounded
    }
}

fn parse_date(value: &str) -> Result<chrono::NaiveDate, GenerationError> {
    parse_boundary_date(value)
        .ok_or_else(|| GenerationError::Configuration(format!("cannot parse date `{value}`")))
}

fn parse_timestamp(value: &str) -> Result<chrono::NaiveDateTime, GenerationError> {
    parse_boundary_timestamp(value)
        .ok_or_else(|| GenerationError::Configuration(format!("cannot parse timestamp `{value}`")))
}

fn range_error(kind: &str, min: impl std::fmt::Display, max: impl std::fmt::Display) -> GenerationError {
    GenerationError::Configuration(format!(
        "{kind} rule lower bound {min} is greater than upper bound {max}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rowsmith_config::{DateRule, DecimalRule, IntRule, TimestampRule};

    #[test]
    fn rounding_is_idempotent() {
        for value in [0.125, 2.675, -1.005, 999.999, 1.0 / 3.0] {
            for precision in 0..6 {
                let once = round_to_precision(value, precision);
                assert_eq!(round_to_precision(once, precision), once);
            }
        }
        assert_eq!(round_to_precision(2.5, 0), 3.0);
        assert_eq!(round_to_precision(-2.5, 0), -3.0);
        assert_eq!(round_to_precision(1e300, 12), 1e300);
    }

    #[test]
    fn huge_decimal_ranges_sample_finite_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let rule = ColumnRule::Decimal(DecimalRule {
            min_value: -1e300,
            max_value: 1e300,
            precision: 12,
        });
        let sampler = RuleSampler::compile(&rule).expect("compile");
        for _ in 0..100 {
            match sampler.sample(&mut rng) {
                GeneratedValue::Float(value) => {
                    assert!(value.is_finite() && (-1e300..=1e300).contains(&value));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        let edge = ColumnRule::Decimal(DecimalRule {
            min_value: 0.0,
            max_value: f64::MAX,
            precision: 0,
        });
        assert!(RuleSampler::compile(&edge).is_err());
    }

    #[test]
    fn decimal_values_stay_inside_tight_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let rule = ColumnRule::Decimal(DecimalRule {
            min_value: 1.001,
            max_value: 1.009,
            precision: 2,
        });
        let sampler = RuleSampler::compile(&rule).expect("compile");
        for _ in 0..500 {
            match sampler.sample(&mut rng) {
                GeneratedValue::Float(value) => {
                    assert!((1.0..=1.01).contains(&value), "{value}");
                    assert_eq!(round_to_precision(value, 2), value);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn contradictory_rules_fail_to_compile() {
        let int = ColumnRule::Int(IntRule {
            min_value: 5,
            max_value: 4,
        });
        assert!(matches!(
            RuleSampler::compile(&int),
            Err(GenerationError::Configuration(_))
        ));
        let stamp = ColumnRule::Timestamp(TimestampRule {
            start_date: "2024-01-01 00:00:01".to_string(),
            end_date: "2024-01-01 00:00:00".to_string(),
        });
        assert!(RuleSampler::compile(&stamp).is_err());
        let wide = ColumnRule::Decimal(DecimalRule {
            min_value: -1e308,
            max_value: 1e308,
            precision: 2,
        });
        assert!(matches!(
            RuleSampler::compile(&wide),
            Err(GenerationError::Configuration(_))
        ));
        let date = ColumnRule::Date(DateRule {
            start_date: "next week".to_string(),
            end_date: "2024-01-01".to_string(),
        });
        assert!(RuleSampler::compile(&date).is_err());
    }

    #[test]
    fn synthesize_samples_compiled_rule() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rule = ColumnRule::Int(IntRule {
            min_value: 7,
            max_value: 7,
        });
        assert_eq!(synthesize(&rule, &mut rng).expect("value"), GeneratedValue::Int(7));
    }
}
