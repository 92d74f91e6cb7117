//! End-to-end pipeline scenarios over mock collaborators.

mod common;

use common::{harness, seed_domain_trust};
use verity::factcheck::{ClaimReview, Publisher, ReviewedClaim};
use verity::{CacheSource, Label, MockSearchClient};

const BOILING: &str = "Scientists confirm water boils at 100C at sea level";

fn fact_check_claim(rating: &str) -> ReviewedClaim {
    ReviewedClaim {
        text: "water boils at 100C".to_string(),
        reviews: vec![ClaimReview {
            publisher: Publisher {
                name: "CheckDesk".to_string(),
            },
            textual_rating: rating.to_string(),
            title: String::new(),
            url: String::new(),
        }],
    }
}

#[tokio::test]
async fn strongly_corroborated_claim_is_real_with_high_confidence() {
    let h = harness().await;

    // No professional fact-checks, strong web corroboration from trusted
    // domains.
    for domain in ["reuters.com", "bbc.com", "apnews.com"] {
        seed_domain_trust(&h.docstore, domain, 0.85).await;
    }

    h.search.set_default(vec![
        MockSearchClient::hit(
            "Boiling point of water confirmed",
            "Scientists confirm water boils at 100C at sea level in repeated tests.",
            "https://reuters.com/science/water",
        ),
        MockSearchClient::hit(
            "Water boils at 100 degrees",
            "At sea level water boils at 100C, the standard boiling point.",
            "https://bbc.com/science/boiling",
        ),
        MockSearchClient::hit(
            "Sea level boiling point",
            "Water boils at 100C at sea level according to scientists.",
            "https://apnews.com/physics/water",
        ),
    ]);

    h.llm.respond_with(
        "evaluate whether news articles",
        r#"{"evaluated": [
            {"title": "Boiling point of water confirmed", "link": "https://reuters.com/science/water", "relevance": "supports", "confidence": 95},
            {"title": "Water boils at 100 degrees", "link": "https://bbc.com/science/boiling", "relevance": "supports", "confidence": 90},
            {"title": "Sea level boiling point", "link": "https://apnews.com/physics/water", "relevance": "supports", "confidence": 85}
        ]}"#,
    );
    h.llm.respond_with(
        "fact-checking assistant",
        r#"{"prediction": "Real", "confidence": 90, "explanation": "Basic physics, widely corroborated"}"#,
    );

    let response = h.engine.analyze("https://example.com/post", BOILING).await;

    assert_eq!(response.prediction, Label::Real);
    assert!(response.score >= 85, "expected >= 85, got {}", response.score);
    assert_eq!(response.source, CacheSource::NewAnalysis);
    assert_eq!(response.claims_checked, Some(1));
}

#[tokio::test]
async fn no_signal_short_circuits_to_unknown_without_reasoning_call() {
    let h = harness().await;
    // no search hits, no fact-checks

    let report = h.engine.detect_text(BOILING).await;

    assert_eq!(report.details.len(), 1);
    let verdict = &report.details[0];
    assert_eq!(verdict.final_prediction, Label::Unknown);
    assert_eq!(verdict.final_confidence, 60);

    // The per-claim synthesis prompt must never have been issued.
    assert!(
        h.llm
            .prompts()
            .iter()
            .all(|p| !p.contains("fact-checking assistant")),
        "reasoning model was invoked despite missing grounding signal"
    );
}

#[tokio::test]
async fn predominantly_false_fact_checks_override_to_fake() {
    let h = harness().await;

    h.factcheck.set_claims(vec![
        fact_check_claim("False"),
        fact_check_claim("Pants on Fire!"),
        fact_check_claim("Mostly False"),
    ]);
    // The reasoning model disagrees; the override must win anyway.
    h.llm.respond_with(
        "fact-checking assistant",
        r#"{"prediction": "Real", "confidence": 80, "explanation": "Looks fine to me"}"#,
    );

    let report = h.engine.detect_text(BOILING).await;
    assert_eq!(report.prediction, Label::Fake);
    assert_eq!(report.details[0].final_confidence, 90); // 80 + 10, under the 97 cap
}

#[tokio::test]
async fn multi_claim_majority_aggregation() {
    let h = harness().await;

    let text = "First claim sentence that is clearly long enough to qualify. \
                Second claim sentence that is also long enough to qualify. \
                Third claim sentence that is definitely long enough to qualify.";

    // Give the pipeline some corroboration so claims reach the reasoning step.
    h.search.set_default(vec![
        MockSearchClient::hit(
            "Coverage A",
            "A long enough snippet covering the first and second claims nicely.",
            "https://site-a.com/x",
        ),
        MockSearchClient::hit(
            "Coverage B",
            "Another long enough snippet covering the remaining claim material.",
            "https://site-b.com/y",
        ),
    ]);
    h.llm.respond_with(
        "evaluate whether news articles",
        r#"{"evaluated": [
            {"title": "Coverage A", "link": "https://site-a.com/x", "relevance": "contradicts", "confidence": 85},
            {"title": "Coverage B", "link": "https://site-b.com/y", "relevance": "contradicts", "confidence": 80}
        ]}"#,
    );

    h.llm.respond_with(
        r#"Input claim: """First"#,
        r#"{"prediction": "Fake", "confidence": 90, "explanation": "Contradicted by coverage"}"#,
    );
    h.llm.respond_with(
        r#"Input claim: """Second"#,
        r#"{"prediction": "Fake", "confidence": 80, "explanation": "Contradicted as well"}"#,
    );
    h.llm.respond_with(
        r#"Input claim: """Third"#,
        r#"{"prediction": "Real", "confidence": 99, "explanation": "This one held up"}"#,
    );

    let report = h.engine.detect_text(text).await;

    assert_eq!(report.claims_checked, 3);
    // Net contradicting evidence pushes every claim's blend toward Fake, and
    // the 2-of-3 majority holds regardless of the third claim's confidence.
    assert_eq!(report.prediction, Label::Fake);
    assert!(
        report.explanation.matches(" | ").count() >= 2,
        "explanation concatenates the first three claim explanations"
    );
}

#[tokio::test]
async fn classifier_outage_still_produces_answer() {
    let h = harness().await;

    h.classifier.fail_with(verity::classifier::ClassifierError::BadStatus { status: 500 });
    h.search.set_default(vec![MockSearchClient::hit(
        "Coverage",
        "A sufficiently long snippet that corroborates the claim material.",
        "https://site.com/a",
    )]);
    h.llm.respond_with(
        "evaluate whether news articles",
        r#"{"evaluated": [{"title": "Coverage", "link": "https://site.com/a", "relevance": "supports", "confidence": 75}]}"#,
    );
    h.llm.respond_with(
        "fact-checking assistant",
        r#"{"prediction": "Real", "confidence": 70, "explanation": "Weakly supported"}"#,
    );

    let report = h.engine.detect_text(BOILING).await;
    // fallback prior flowed into the blend; a verdict still came out
    assert!(matches!(report.prediction, Label::Real | Label::Unknown));
    assert!(report.score >= 55);
}

#[tokio::test]
async fn malformed_verdict_reply_falls_back_to_synthetic_explanation() {
    let h = harness().await;

    h.search.set_default(vec![MockSearchClient::hit(
        "Coverage",
        "A sufficiently long snippet that corroborates the claim material.",
        "https://site.com/a",
    )]);
    h.llm.respond_with(
        "evaluate whether news articles",
        r#"{"evaluated": [{"title": "Coverage", "link": "https://site.com/a", "relevance": "supports", "confidence": 75}]}"#,
    );
    h.llm.respond_with("fact-checking assistant", "sorry, I refuse to answer in JSON");

    let report = h.engine.detect_text(BOILING).await;
    let verdict = &report.details[0];
    // fallback verdict (Unknown, 70) flows through the ensemble; the
    // explanation is synthesized from the outcome
    assert_eq!(verdict.reasoning.confidence, 70);
    assert!(verdict.explanation.contains("evidence="));
}

#[tokio::test]
async fn non_factual_content_is_not_applicable() {
    let h = harness().await;

    h.search.set_default(vec![MockSearchClient::hit(
        "Travel vlog",
        "A long enough snippet about someone's wonderful trip to the museum.",
        "https://blog.example/trip",
    )]);
    h.llm.respond_with(
        "evaluate whether news articles",
        r#"{"evaluated": [{"title": "Travel vlog", "link": "https://blog.example/trip", "relevance": "supports", "confidence": 50}]}"#,
    );
    h.llm.respond_with(
        "fact-checking assistant",
        r#"{"prediction": "Not Applicable", "confidence": 100, "explanation": "Personal travel content without factual claims"}"#,
    );

    let report = h
        .engine
        .detect_text("My amazing trip to the science museum was the best day ever honestly")
        .await;

    assert_eq!(report.prediction, Label::NotApplicable);
    assert_eq!(report.details[0].final_confidence, 100);
}

#[tokio::test]
async fn quick_assessment_never_scores() {
    let h = harness().await;
    h.llm.respond_with(
        "quick initial impression",
        "This reads like a news-style statement about physics. It sounds factual. \
         Please wait for the full verification.",
    );

    let value = h.engine.quick_assessment(BOILING).await;
    assert_eq!(value["status"], "ok");
    assert!(
        value["initial_analysis"]
            .as_str()
            .unwrap()
            .contains("news-style")
    );
}
