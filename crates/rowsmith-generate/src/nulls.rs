use rand::Rng;
use rowsmith_core::Column;

use crate::errors::GenerationError;

/// Bernoulli null decision for nullable columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullInjector {
    probability: f64,
}

impl NullInjector {
    pub fn new(probability: f64) -> Result<Self, GenerationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(GenerationError::Configuration(format!(
                "null probability {probability} is outside [0, 1]"
            )));
        }
        Ok(Self { probability })
    }

    /// NOT NULL columns never draw.
    pub fn should_null<R: Rng + ?Sized>(&self, column: &Column, rng: &mut R) -> bool {
        column.is_nullable && self.probability > 0.0 && rng.random_bool(self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rowsmith_core::ColumnType;

    fn column(nullable: bool) -> Column {
        let column = Column::new("note", ColumnType::new("text", "text"));
        if nullable { column } else { column.not_null() }
    }

    #[test]
    fn null_frequency_converges_to_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let injector = NullInjector::new(0.3).expect("injector");
        let nullable = column(true);
        let trials = 100_000;
        let nulls = (0..trials)
            .filter(|_| injector.should_null(&nullable, &mut rng))
            .count();
        let frequency = nulls as f64 / trials as f64;
        assert!((frequency - 0.3).abs() < 0.01, "frequency {frequency}");
    }

    #[test]
    fn not_null_columns_never_receive_nulls() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let injector = NullInjector::new(1.0).expect("injector");
        assert!((0..1000).all(|_| !injector.should_null(&column(false), &mut rng)));
        assert!((0..1000).all(|_| injector.should_null(&column(true), &mut rng)));
    }

    #[test]
    fn rejects_invalid_probability() {
        assert!(NullInjector::new(1.01).is_err());
        assert!(NullInjector::new(f64::NAN).is_err());
    }
}
