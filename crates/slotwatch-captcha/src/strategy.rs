//! Strategy catalog and best-candidate selection.

use crate::normalize::{normalize, MAX_LEN};
use crate::preprocess::Preprocessor;
use crate::recognizer::Recognizer;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shortest reading worth submitting.
pub const MIN_LEN: usize = 3;

/// Longest reading that earns the length bonus.
pub const BONUS_MAX_LEN: usize = 5;

const LENGTH_BONUS: f32 = 100.0;

/// One preprocessing configuration: binarization threshold and polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyConfig {
    /// Pixels at or above this luminance become white
    pub threshold: u8,
    /// Invert after binarizing
    pub invert: bool,
    /// Name used in logs and debug artifacts
    pub label: &'static str,
}

/// Strategies in priority order. Earlier entries win ties.
pub const CATALOG: [StrategyConfig; 5] = [
    StrategyConfig {
        threshold: 140,
        invert: true,
        label: "threshold-140-neg",
    },
    StrategyConfig {
        threshold: 120,
        invert: true,
        label: "threshold-120-neg",
    },
    StrategyConfig {
        threshold: 160,
        invert: true,
        label: "threshold-160-neg",
    },
    StrategyConfig {
        threshold: 140,
        invert: false,
        label: "threshold-140",
    },
    StrategyConfig {
        threshold: 100,
        invert: true,
        label: "threshold-100-neg",
    },
];

/// A scored reading produced by one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    /// Strategy that produced the reading
    pub strategy_label: &'static str,
    /// Normalized text
    pub candidate_text: String,
    /// OCR confidence, 0 to 100
    pub confidence: f32,
    /// Confidence plus the length bonus
    pub composite_score: f32,
}

impl StrategyResult {
    /// Normalize `raw_text` and score it.
    #[must_use]
    pub fn scored(strategy_label: &'static str, raw_text: &str, confidence: f32) -> Self {
        let candidate_text = normalize(raw_text);
        let composite_score = composite_score(candidate_text.chars().count(), confidence);
        Self {
            strategy_label,
            candidate_text,
            confidence,
            composite_score,
        }
    }

    /// Whether the reading may be submitted: plausible length and a
    /// positive score.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        (MIN_LEN..=MAX_LEN).contains(&self.candidate_text.chars().count())
            && self.composite_score > 0.0
    }
}

/// `confidence + 100` when the length is in the typical band, else `confidence`.
#[must_use]
pub fn composite_score(len: usize, confidence: f32) -> f32 {
    if (MIN_LEN..=BONUS_MAX_LEN).contains(&len) {
        confidence + LENGTH_BONUS
    } else {
        confidence
    }
}

/// Highest-scoring eligible result; the first one seen wins a tie.
#[must_use]
pub fn pick_best(results: &[StrategyResult]) -> Option<&StrategyResult> {
    let mut best: Option<&StrategyResult> = None;
    for result in results.iter().filter(|r| r.is_eligible()) {
        if best.map_or(true, |b| result.composite_score > b.composite_score) {
            best = Some(result);
        }
    }
    best
}

/// Runs every strategy against one image and picks the best reading.
#[derive(Clone)]
pub struct StrategySelector {
    recognizer: Arc<dyn Recognizer>,
    preprocessor: Preprocessor,
    catalog: Vec<StrategyConfig>,
}

impl StrategySelector {
    /// Selector over the default [`CATALOG`].
    pub fn new(recognizer: Arc<dyn Recognizer>, preprocessor: Preprocessor) -> Self {
        Self {
            recognizer,
            preprocessor,
            catalog: CATALOG.to_vec(),
        }
    }

    /// Replace the strategy catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<StrategyConfig>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Strategies in the order they run.
    #[must_use]
    pub fn catalog(&self) -> &[StrategyConfig] {
        &self.catalog
    }

    /// Best eligible reading, or `None` when no strategy produced one.
    pub async fn select(&self, image: &[u8]) -> Option<StrategyResult> {
        let results = self.select_all(image).await;
        let best = pick_best(&results).cloned();
        match &best {
            Some(result) => debug!(
                strategy = result.strategy_label,
                "Best reading {:?} (score {:.1})", result.candidate_text, result.composite_score
            ),
            None => debug!("No strategy produced a plausible reading"),
        }
        best
    }

    /// Every strategy's reading, in catalog order.
    ///
    /// Strategies whose preprocessing or recognition fails are skipped.
    pub async fn select_all(&self, image: &[u8]) -> Vec<StrategyResult> {
        let image: Arc<[u8]> = Arc::from(image);
        let mut results = Vec::with_capacity(self.catalog.len());

        for strategy in &self.catalog {
            let preprocessor = self.preprocessor.clone();
            let source = Arc::clone(&image);
            let strategy = *strategy;
            let processed = tokio::task::spawn_blocking(move || {
                preprocessor.preprocess(&source, &strategy)
            })
            .await;

            let processed = match processed {
                Ok(Ok(png)) => png,
                Ok(Err(e)) => {
                    warn!(strategy = strategy.label, "Skipping strategy: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!(strategy = strategy.label, "Preprocess task failed: {}", e);
                    continue;
                }
            };

            match self.recognizer.recognize(&processed).await {
                Ok(recognition) => {
                    let result = StrategyResult::scored(
                        strategy.label,
                        &recognition.text,
                        recognition.confidence,
                    );
                    debug!(
                        strategy = strategy.label,
                        "Read {:?} -> {:?} (confidence {:.1})",
                        recognition.text.trim(),
                        result.candidate_text,
                        result.confidence
                    );
                    results.push(result);
                }
                Err(e) => warn!(strategy = strategy.label, "Skipping strategy: {}", e),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let labels: Vec<_> = CATALOG.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                "threshold-140-neg",
                "threshold-120-neg",
                "threshold-160-neg",
                "threshold-140",
                "threshold-100-neg",
            ]
        );
        assert!(CATALOG.iter().filter(|s| !s.invert).count() == 1);
    }

    #[test]
    fn test_composite_score_bands() {
        assert!((composite_score(2, 95.0) - 95.0).abs() < f32::EPSILON);
        assert!((composite_score(3, 10.0) - 110.0).abs() < f32::EPSILON);
        assert!((composite_score(5, 10.0) - 110.0).abs() < f32::EPSILON);
        assert!((composite_score(6, 10.0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_short_reading_never_eligible() {
        let short = StrategyResult::scored("a", "X9", 99.0);
        assert!(!short.is_eligible());
        assert!(pick_best(&[short]).is_none());
    }

    #[test]
    fn test_higher_confidence_wins_within_band() {
        let results = vec![
            StrategyResult::scored("a", "AB12", 60.0),
            StrategyResult::scored("b", "AB13", 75.0),
        ];
        assert_eq!(pick_best(&results).unwrap().strategy_label, "b");
    }

    #[test]
    fn test_bonus_band_beats_raw_confidence() {
        let results = vec![
            StrategyResult::scored("six", "ABCDEF", 99.0),
            StrategyResult::scored("four", "ABCD", 20.0),
        ];
        assert_eq!(pick_best(&results).unwrap().strategy_label, "four");
    }

    #[test]
    fn test_tie_keeps_first() {
        let results = vec![
            StrategyResult::scored("first", "Q1W2", 80.0),
            StrategyResult::scored("second", "Q1W3", 80.0),
        ];
        assert_eq!(pick_best(&results).unwrap().strategy_label, "first");
    }

    #[test]
    fn test_six_chars_need_some_confidence() {
        let zero = StrategyResult::scored("zero", "ABCDEF", 0.0);
        assert!(!zero.is_eligible());
        assert!(pick_best(&[zero]).is_none());

        let faint = StrategyResult::scored("faint", "ABCDEF", 0.5);
        assert!(faint.is_eligible());
        assert_eq!(pick_best(&[faint]).unwrap().candidate_text, "ABCDEF");
    }

    #[test]
    fn test_bonus_band_eligible_at_zero_confidence() {
        let result = StrategyResult::scored("a", "ABC", 0.0);
        assert!(result.is_eligible());
        assert!((result.composite_score - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scored_normalizes_text() {
        let result = StrategyResult::scored("a", " ab 12\n", 50.0);
        assert_eq!(result.candidate_text, "ab12");
        assert!((result.composite_score - 150.0).abs() < f32::EPSILON);
    }
}
