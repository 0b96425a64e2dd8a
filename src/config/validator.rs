use crate::config::Config;
use crate::error::{Result, SemrankError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_expansion(config, &mut errors);
        Self::validate_ranking(config, &mut errors);
        Self::validate_evaluation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SemrankError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.corpus.max_term_text_len == 0 {
            errors.push(ValidationError::new(
                "corpus.max_term_text_len",
                "Maximum term text length must be greater than 0",
            ));
        }
    }

    fn validate_expansion(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.expansion.max_neighbors == 0 {
            errors.push(ValidationError::new(
                "expansion.max_neighbors",
                "Neighbor count must be greater than 0",
            ));
        }

        let min_sim = config.expansion.min_similarity;
        if !(0.0..=1.0).contains(&min_sim) {
            errors.push(ValidationError::new(
                "expansion.min_similarity",
                format!("Similarity threshold must be within [0, 1], got {}", min_sim),
            ));
        }

        if config.expansion.lambda < 0.0 {
            errors.push(ValidationError::new(
                "expansion.lambda",
                format!(
                    "Neighbor discount must be non-negative, got {}",
                    config.expansion.lambda
                ),
            ));
        }
    }

    fn validate_ranking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.ranking.k <= 0.0 {
            errors.push(ValidationError::new(
                "ranking.k",
                format!("Saturation parameter must be positive, got {}", config.ranking.k),
            ));
        }

        let b = config.ranking.b;
        if !(0.0..=1.0).contains(&b) {
            errors.push(ValidationError::new(
                "ranking.b",
                format!("Length normalization must be within [0, 1], got {}", b),
            ));
        }

        if config.ranking.top_k == 0 {
            errors.push(ValidationError::new(
                "ranking.top_k",
                "Result list limit must be greater than 0",
            ));
        }
    }

    fn validate_evaluation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.evaluation.cutoff == 0 {
            errors.push(ValidationError::new(
                "evaluation.cutoff",
                "Metric cutoff must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut config = Config::default();
        config.expansion.min_similarity = 1.5;
        config.ranking.b = -0.1;
        config.ranking.top_k = 0;

        let err = ConfigValidator::validate(&config).unwrap_err();
        match err {
            SemrankError::ConfigValidation { errors } => {
                assert_eq!(errors.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_boundary_values() {
        let mut config = Config::default();
        config.expansion.min_similarity = 0.0;
        config.expansion.lambda = 0.0;
        config.ranking.b = 1.0;

        assert!(ConfigValidator::validate(&config).is_ok());
    }
}
