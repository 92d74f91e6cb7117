//! Ensemble fusion: one (label, confidence) per claim, then one per input.
//!
//! Evidence-first blending. Professional fact-check consensus overrides
//! everything; otherwise web evidence (weight 0.6) dominates over the
//! reasoning-model verdict (0.25) and the classifier (0.15). Aggregation
//! across claims is majority vote with an average-confidence tie-break and a
//! logarithmic damper against single-claim overconfidence.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierScores;
use crate::constants::clamp01;
use crate::corroborate::CorroborationStatus;
use crate::factcheck::FactCheckStatus;

/// Final veracity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
    Misleading,
    Unknown,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
            Label::Misleading => "Misleading",
            Label::Unknown => "Unknown",
            Label::NotApplicable => "Not Applicable",
        }
    }

    /// Parses the label names the reasoning model is instructed to emit.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Real" => Some(Label::Real),
            "Fake" => Some(Label::Fake),
            "Misleading" => Some(Label::Misleading),
            "Unknown" => Some(Label::Unknown),
            "Not Applicable" => Some(Label::NotApplicable),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const W_EVIDENCE: f64 = 0.6;
const W_REASONING: f64 = 0.25;
const W_CLASSIFIER: f64 = 0.15;

/// Fuses the per-claim signals into a final (label, confidence).
///
/// `evidence_strength` is the net supports-minus-contradicts confidence sum
/// in `[-1, 1]`.
pub fn adjusted_ensemble(
    reasoning_label: Label,
    reasoning_conf: u32,
    classifier: ClassifierScores,
    fact_check_status: FactCheckStatus,
    corroboration_status: CorroborationStatus,
    evidence_strength: f64,
) -> (Label, u32) {
    // Fact-check consensus takes absolute priority.
    match fact_check_status {
        FactCheckStatus::PredominantlyFalse => {
            return (Label::Fake, (reasoning_conf + 10).min(97));
        }
        FactCheckStatus::PredominantlyTrue => {
            return (Label::Real, (reasoning_conf.max(85) + 10).min(98));
        }
        FactCheckStatus::MixedRatings => {
            return (Label::Misleading, reasoning_conf.max(70));
        }
        _ => {}
    }

    // Coarse probability triple for the reasoning verdict.
    let p_reason_real = if reasoning_label == Label::Real { 0.7 } else { 0.15 };
    let p_reason_fake = if reasoning_label == Label::Fake { 0.7 } else { 0.15 };
    let p_reason_mis = if reasoning_label == Label::Misleading { 0.6 } else { 0.1 };

    let p_evidence_real = clamp01(0.5 + 0.5 * evidence_strength);
    let p_evidence_fake = 1.0 - p_evidence_real;

    let real_score =
        W_EVIDENCE * p_evidence_real + W_REASONING * p_reason_real + W_CLASSIFIER * classifier.real;
    let fake_score =
        W_EVIDENCE * p_evidence_fake + W_REASONING * p_reason_fake + W_CLASSIFIER * classifier.fake;
    // No evidence channel for Misleading; the classifier term is discounted.
    let mis_score = W_REASONING * p_reason_mis + W_CLASSIFIER * classifier.misleading * 0.8;

    let total = real_score + fake_score + mis_score;
    let probs = [
        (Label::Real, real_score / total),
        (Label::Fake, fake_score / total),
        (Label::Misleading, mis_score / total),
    ];

    let (label, max_prob) = probs
        .iter()
        .fold((Label::Real, f64::MIN), |best, (label, p)| {
            if *p > best.1 { (*label, *p) } else { best }
        });

    let mut confidence = ((max_prob * 100.0).min(100.0)) as u32;

    match corroboration_status {
        CorroborationStatus::Corroborated if evidence_strength > 0.4 => {
            confidence = (confidence + 10).min(100);
        }
        CorroborationStatus::Weak => {
            confidence = confidence.saturating_sub(5).max(60);
        }
        CorroborationStatus::NoResults => {
            confidence = confidence.saturating_sub(10).max(55);
        }
        _ => {}
    }

    (label, confidence)
}

/// Combines per-claim (label, confidence) pairs into one overall pair.
///
/// Majority label wins outright when it holds a strict majority; otherwise
/// the label with the highest average confidence is chosen. The final
/// confidence is the chosen label's average, damped by
/// `0.65 + 0.35·ln(1+count)` and capped at 100.
pub fn aggregate(verdicts: &[(Label, u32)]) -> Option<(Label, u32)> {
    if verdicts.is_empty() {
        return None;
    }

    // Insertion-ordered so ties resolve toward the earliest claim.
    let mut stats: Vec<(Label, f64, usize)> = Vec::new();
    for (label, confidence) in verdicts {
        match stats.iter_mut().find(|(l, _, _)| *l == *label) {
            Some((_, sum, count)) => {
                *sum += *confidence as f64;
                *count += 1;
            }
            None => stats.push((*label, *confidence as f64, 1)),
        }
    }

    let (majority_label, majority_count) = stats
        .iter()
        .fold((stats[0].0, 0usize), |best, (label, _, count)| {
            if *count > best.1 { (*label, *count) } else { best }
        });

    let overall_label = if majority_count * 2 > verdicts.len() {
        majority_label
    } else {
        stats
            .iter()
            .fold((stats[0].0, f64::MIN), |best, (label, sum, count)| {
                let avg = sum / *count as f64;
                if avg > best.1 { (*label, avg) } else { best }
            })
            .0
    };

    let (_, sum, count) = stats
        .iter()
        .find(|(label, _, _)| *label == overall_label)
        .expect("chosen label present");
    let avg_conf = sum / *count as f64;
    let damped = avg_conf * (0.65 + 0.35 * (1.0 + *count as f64).ln());

    Some((overall_label, (damped.min(100.0)) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior() -> ClassifierScores {
        ClassifierScores::fallback_prior()
    }

    #[test]
    fn predominantly_false_overrides_everything() {
        for (label, conf, strength) in [
            (Label::Real, 95, 1.0),
            (Label::Misleading, 10, 0.0),
            (Label::Fake, 50, -1.0),
        ] {
            let (out, confidence) = adjusted_ensemble(
                label,
                conf,
                ClassifierScores { real: 0.99, fake: 0.0, misleading: 0.01 },
                FactCheckStatus::PredominantlyFalse,
                CorroborationStatus::Corroborated,
                strength,
            );
            assert_eq!(out, Label::Fake);
            assert_eq!(confidence, (conf + 10).min(97));
        }
    }

    #[test]
    fn predominantly_true_override_floors_confidence() {
        let (label, confidence) = adjusted_ensemble(
            Label::Fake,
            40,
            prior(),
            FactCheckStatus::PredominantlyTrue,
            CorroborationStatus::NoResults,
            -0.8,
        );
        assert_eq!(label, Label::Real);
        assert_eq!(confidence, 95); // max(40, 85) + 10
    }

    #[test]
    fn mixed_ratings_override() {
        let (label, confidence) = adjusted_ensemble(
            Label::Real,
            90,
            prior(),
            FactCheckStatus::MixedRatings,
            CorroborationStatus::Weak,
            0.5,
        );
        assert_eq!(label, Label::Misleading);
        assert_eq!(confidence, 90);

        let (_, low) = adjusted_ensemble(
            Label::Real,
            10,
            prior(),
            FactCheckStatus::MixedRatings,
            CorroborationStatus::Weak,
            0.5,
        );
        assert_eq!(low, 70);
    }

    #[test]
    fn strong_supporting_evidence_yields_real() {
        let (label, confidence) = adjusted_ensemble(
            Label::Real,
            85,
            prior(),
            FactCheckStatus::NoFactChecks,
            CorroborationStatus::Corroborated,
            0.9,
        );
        assert_eq!(label, Label::Real);
        assert!(confidence >= 85, "got {confidence}");
    }

    #[test]
    fn strong_contradicting_evidence_yields_fake() {
        let (label, _) = adjusted_ensemble(
            Label::Real,
            70,
            prior(),
            FactCheckStatus::Inconclusive,
            CorroborationStatus::Corroborated,
            -0.9,
        );
        assert_eq!(label, Label::Fake);
    }

    #[test]
    fn weak_corroboration_floors_at_60() {
        let (_, confidence) = adjusted_ensemble(
            Label::Misleading,
            30,
            ClassifierScores { real: 0.34, fake: 0.33, misleading: 0.33 },
            FactCheckStatus::Inconclusive,
            CorroborationStatus::Weak,
            0.0,
        );
        assert!(confidence >= 60);
    }

    #[test]
    fn no_results_floors_at_55() {
        let (_, confidence) = adjusted_ensemble(
            Label::Unknown,
            60,
            prior(),
            FactCheckStatus::NoFactChecks,
            CorroborationStatus::NoResults,
            0.0,
        );
        assert!(confidence >= 55);
    }

    #[test]
    fn majority_wins_outright() {
        let overall = aggregate(&[(Label::Fake, 70), (Label::Fake, 80), (Label::Real, 99)]);
        assert_eq!(overall.unwrap().0, Label::Fake);
    }

    #[test]
    fn tie_breaks_by_average_confidence() {
        let (label, confidence) = aggregate(&[(Label::Fake, 80), (Label::Real, 60)]).unwrap();
        assert_eq!(label, Label::Fake);
        // 80 * (0.65 + 0.35 ln 2) ≈ 71
        assert_eq!(confidence, 71);
    }

    #[test]
    fn damper_limits_single_claim_confidence() {
        let (_, confidence) = aggregate(&[(Label::Real, 100)]).unwrap();
        // 100 * (0.65 + 0.35 ln 2) ≈ 89
        assert_eq!(confidence, 89);
    }

    #[test]
    fn aggregate_caps_at_100() {
        let verdicts: Vec<(Label, u32)> = (0..20).map(|_| (Label::Real, 100)).collect();
        let (_, confidence) = aggregate(&verdicts).unwrap();
        assert_eq!(confidence, 100);
    }

    #[test]
    fn empty_input_aggregates_to_none() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn label_serde_names() {
        assert_eq!(serde_json::to_string(&Label::NotApplicable).unwrap(), "\"Not Applicable\"");
        assert_eq!(Label::parse("Not Applicable"), Some(Label::NotApplicable));
        assert_eq!(Label::parse("nonsense"), None);
    }
}
