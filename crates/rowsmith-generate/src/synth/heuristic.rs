use chrono::{NaiveDate, NaiveTime, Timelike};
use rand::Rng;
use rand::seq::IndexedRandom;
use rowsmith_core::{Column, TypeFamily};

use crate::synth::round_to_precision;
use crate::synth::temporal::{DateRange, TimestampRange};
use crate::synth::text;
use crate::value::GeneratedValue;

/// Length assumed for character columns without a declared limit.
pub const DEFAULT_MAX_LENGTH: usize = 50;

const FIRST_NAMES: &[&str] = &[
    "Ivan", "Petr", "Maria", "Anna", "Sergey", "Olga", "Alexey", "Elena",
];
const LAST_NAMES: &[&str] = &["Ivanov", "Petrov", "Sidorov", "Smirnov", "Kuznetsov", "Popov"];
const CITIES: &[&str] = &[
    "Moscow",
    "Saint Petersburg",
    "Novosibirsk",
    "Yekaterinburg",
    "Kazan",
];
pub(crate) const EMAIL_DOMAINS: &[&str] = &["gmail.com", "mail.ru", "yandex.ru"];

/// Shape picked for a column that has no configured rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicKind {
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    Timestamp,
    Time,
    Uuid,
    GivenName,
    FamilyName,
    Email,
    City,
    Alphanumeric,
    Opaque,
}

/// Value source inferred from column type and name.
#[derive(Debug, Clone)]
pub struct HeuristicSampler {
    kind: HeuristicKind,
    max_length: Option<usize>,
    dates: Option<DateRange>,
    timestamps: Option<TimestampRange>,
}

impl HeuristicSampler {
    pub fn for_column(column: &Column) -> Self {
        let family = column.type_family();
        let kind = match family {
            TypeFamily::Integer => HeuristicKind::Integer,
            TypeFamily::Decimal => HeuristicKind::Decimal,
            TypeFamily::Float => HeuristicKind::Float,
            TypeFamily::Boolean => HeuristicKind::Boolean,
            TypeFamily::Date => HeuristicKind::Date,
            TypeFamily::Timestamp => HeuristicKind::Timestamp,
            TypeFamily::Time => HeuristicKind::Time,
            TypeFamily::Uuid => HeuristicKind::Uuid,
            TypeFamily::Character => kind_for_name(&column.name),
            TypeFamily::Other => HeuristicKind::Opaque,
        };
        let max_length = match family {
            TypeFamily::Character => Some(column.max_length().unwrap_or(DEFAULT_MAX_LENGTH)),
            _ => None,
        };

        let first = NaiveDate::from_ymd_opt(2020, 1, 1);
        let last = NaiveDate::from_ymd_opt(2024, 12, 31);
        let (dates, timestamps) = match (first, last) {
            (Some(first), Some(last)) => (
                DateRange::new(first, last),
                TimestampRange::new(
                    first.and_time(NaiveTime::MIN),
                    last.and_hms_opt(23, 59, 0).unwrap_or(last.and_time(NaiveTime::MIN)),
                ),
            ),
            _ => (None, None),
        };

        Self {
            kind,
            max_length,
            dates,
            timestamps,
        }
    }

    pub fn kind(&self) -> HeuristicKind {
        self.kind
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedValue {
        let value = match self.kind {
            HeuristicKind::Integer => GeneratedValue::Int(rng.random_range(1..=1000)),
            HeuristicKind::Decimal => {
                GeneratedValue::Float(round_to_precision(rng.random_range(1.0..=1000.0), 2))
            }
            HeuristicKind::Float => GeneratedValue::Float(rng.random_range(1.0..=1000.0)),
            HeuristicKind::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
            HeuristicKind::Date => match self.dates {
                Some(range) => GeneratedValue::Date(range.sample(rng)),
                None => opaque(rng),
            },
            HeuristicKind::Timestamp => match self.timestamps {
                // whole minutes only
                Some(range) => {
                    let drawn = range.sample(rng);
                    GeneratedValue::Timestamp(
                        drawn.with_second(0).unwrap_or(drawn),
                    )
                }
                None => opaque(rng),
            },
            HeuristicKind::Time => {
                let seconds = rng.random_range(0..86_400u32);
                GeneratedValue::Time(
                    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
                        .unwrap_or(NaiveTime::MIN),
                )
            }
            HeuristicKind::Uuid => {
                let bytes: [u8; 16] = rng.random();
                GeneratedValue::Text(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
            HeuristicKind::GivenName => pick_text(FIRST_NAMES, rng),
            HeuristicKind::FamilyName => pick_text(LAST_NAMES, rng),
            HeuristicKind::City => pick_text(CITIES, rng),
            HeuristicKind::Email => {
                let local = FIRST_NAMES
                    .choose(rng)
                    .map(|name| name.to_ascii_lowercase())
                    .unwrap_or_else(|| "user".to_string());
                let domain = EMAIL_DOMAINS.choose(rng).copied().unwrap_or("example.com");
                GeneratedValue::Text(text::email(&local, domain, rng))
            }
            HeuristicKind::Alphanumeric => {
                let limit = self.max_length.unwrap_or(DEFAULT_MAX_LENGTH).min(20);
                let len = if limit <= 5 {
                    limit
                } else {
                    rng.random_range(5..=limit)
                };
                GeneratedValue::Text(text::alphanumeric(len, rng))
            }
            HeuristicKind::Opaque => opaque(rng),
        };

        match self.max_length {
            Some(max) => value.truncated(max),
            None => value,
        }
    }
}

/// Case-insensitive name matching for character columns, first match wins.
fn kind_for_name(name: &str) -> HeuristicKind {
    let name = name.to_ascii_lowercase();
    if name.contains("name") && !name.contains("last") {
        HeuristicKind::GivenName
    } else if name.contains("last") || name.contains("surname") {
        HeuristicKind::FamilyName
    } else if name.contains("email") {
        HeuristicKind::Email
    } else if name.contains("city") || name.contains("address") {
        HeuristicKind::City
    } else {
        HeuristicKind::Alphanumeric
    }
}

fn pick_text<R: Rng + ?Sized>(choices: &[&str], rng: &mut R) -> GeneratedValue {
    GeneratedValue::Text(choices.choose(rng).copied().unwrap_or_default().to_string())
}

fn opaque<R: Rng + ?Sized>(rng: &mut R) -> GeneratedValue {
    GeneratedValue::Text(format!("data_{}", rng.random_range(1..=1000)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use chrono::Datelike;
    use rowsmith_core::ColumnType;

    fn varchar(name: &str, len: i32) -> Column {
        Column::new(
            name,
            ColumnType::new(format!("character varying({len})"), "varchar").with_max_length(len),
        )
    }

    #[test]
    fn name_matching_order() {
        assert_eq!(kind_for_name("first_name"), HeuristicKind::GivenName);
        assert_eq!(kind_for_name("last_name"), HeuristicKind::FamilyName);
        assert_eq!(kind_for_name("Surname"), HeuristicKind::FamilyName);
        assert_eq!(kind_for_name("contact_email"), HeuristicKind::Email);
        assert_eq!(kind_for_name("home_address"), HeuristicKind::City);
        assert_eq!(kind_for_name("sku"), HeuristicKind::Alphanumeric);
    }

    #[test]
    fn character_values_fit_declared_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for column in [varchar("city", 4), varchar("code", 3), varchar("email", 8)] {
            let sampler = HeuristicSampler::for_column(&column);
            for _ in 0..100 {
                let value = sampler.sample(&mut rng);
                let text = value.as_str().expect("text");
                assert!(text.chars().count() <= column.max_length().unwrap_or(0));
            }
        }
    }

    #[test]
    fn alphanumeric_length_follows_limit() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let sampler = HeuristicSampler::for_column(&Column::new("code", ColumnType::new("text", "text")));
        for _ in 0..200 {
            let value = sampler.sample(&mut rng);
            let len = value.as_str().expect("text").len();
            assert!((5..=20).contains(&len));
        }
    }

    #[test]
    fn typed_families_produce_typed_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let int = HeuristicSampler::for_column(&Column::new("qty", ColumnType::new("integer", "int4")));
        let stamp = HeuristicSampler::for_column(&Column::new(
            "created_at",
            ColumnType::new("timestamp without time zone", "timestamp"),
        ));
        let other = HeuristicSampler::for_column(&Column::new("area", ColumnType::new("polygon", "polygon")));
        for _ in 0..100 {
            match int.sample(&mut rng) {
                GeneratedValue::Int(value) => assert!((1..=1000).contains(&value)),
                value => panic!("unexpected {value:?}"),
            }
            match stamp.sample(&mut rng) {
                GeneratedValue::Timestamp(value) => {
                    assert_eq!(value.second(), 0);
                    assert!((2020..=2024).contains(&value.year()));
                }
                value => panic!("unexpected {value:?}"),
            }
            let text = other.sample(&mut rng).to_string();
            assert!(text.starts_with("data_"));
        }
    }
}
