//! Multi-objective scorer that turns terminal call results into a ranked
//! recommendation set. See SPEC §4.10.

use std::collections::HashMap;

use uuid::Uuid;

use vco_domain::model::{
    Availability, CallOutcome, CallStatus, ExcludedProvider, Provider, RecommendationSet,
    RecommendedProvider, StructuredCallData,
};

const TOP_N: usize = 3;

pub struct Recommender;

impl Default for Recommender {
    fn default() -> Self {
        Self::new()
    }
}

impl Recommender {
    pub fn new() -> Self {
        Self
    }

    /// Scores every provider, applies the hard filters, and returns the
    /// top 3 survivors. Pure — callers own persisting the result via
    /// `CallRepository::save_recommendations`.
    pub fn recommend(&self, request_id: Uuid, providers: &[Provider]) -> RecommendationSet {
        let mut candidates: Vec<(&Provider, &StructuredCallData, u8)> = Vec::new();
        let mut excluded: Vec<ExcludedProvider> = Vec::new();

        for provider in providers {
            match exclusion_reason(provider) {
                Some(reason) => excluded.push(ExcludedProvider {
                    provider_id: provider.id,
                    name: provider.name.clone(),
                    reason,
                }),
                None => {
                    // `exclusion_reason` returning `None` guarantees `call_result` is `Some`.
                    let data = provider.call_result.as_ref().expect("checked by exclusion_reason");
                    let score = score_provider(data, provider.rating, provider.review_count);
                    candidates.push((provider, data, score));
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| b.0.rating.partial_cmp(&a.0.rating).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.0.review_count.cmp(&a.0.review_count))
        });

        let recommended: Vec<RecommendedProvider> = candidates
            .into_iter()
            .take(TOP_N)
            .map(|(provider, data, score)| RecommendedProvider {
                provider_id: provider.id,
                name: provider.name.clone(),
                phone: provider.phone.clone(),
                score,
                rating: provider.rating,
                review_count: provider.review_count,
                summary: provider.call_summary.clone(),
                earliest_availability: data.earliest_availability.clone(),
                estimated_rate: data.estimated_rate.clone(),
            })
            .collect();

        let overall_recommendation = if recommended.is_empty() {
            explain_empty(&excluded)
        } else {
            format!(
                "{} candidate{} evaluated; top pick is {} with a score of {}.",
                recommended.len() + excluded.len(),
                if recommended.len() + excluded.len() == 1 { "" } else { "s" },
                recommended[0].name,
                recommended[0].score,
            )
        };

        vco_domain::trace::TraceEvent::RecommendationsGenerated {
            request_id: request_id.to_string(),
            candidate_count: providers.len(),
            recommended_count: recommended.len(),
        }
        .emit();

        RecommendationSet {
            request_id,
            providers: recommended,
            excluded,
            overall_recommendation,
        }
    }
}

/// `None` means the provider passes every hard filter and carries a
/// `call_result` safe to score. `Some(reason)` names why it was excluded.
fn exclusion_reason(provider: &Provider) -> Option<String> {
    if provider.call_status != Some(CallStatus::Completed) {
        return Some(match provider.call_status {
            Some(CallStatus::NoAnswer) => "did not answer".to_string(),
            Some(CallStatus::Voicemail) => "reached voicemail".to_string(),
            Some(CallStatus::Busy) => "line was busy".to_string(),
            Some(CallStatus::Timeout) => "call timed out".to_string(),
            Some(CallStatus::Error) => "call errored".to_string(),
            Some(CallStatus::Failed) => "call failed".to_string(),
            _ => "call did not complete".to_string(),
        });
    }
    let Some(data) = provider.call_result.as_ref() else {
        return Some("no structured call result".to_string());
    };
    match data.call_outcome {
        CallOutcome::NoAnswer => return Some("did not answer".to_string()),
        CallOutcome::Voicemail => return Some("reached voicemail".to_string()),
        CallOutcome::Busy => return Some("line was busy".to_string()),
        _ => {}
    }
    if data.disqualified {
        return Some(
            data.disqualification_reason
                .clone()
                .unwrap_or_else(|| "disqualified".to_string()),
        );
    }
    None
}

fn score_provider(data: &StructuredCallData, rating: Option<f32>, review_count: Option<u32>) -> u8 {
    let mut score: i32 = 0;

    // Conversation quality, max 35.
    score += match data.call_outcome {
        CallOutcome::Positive => 20,
        CallOutcome::Neutral => 10,
        _ => 0,
    };
    if data.earliest_availability.as_deref().is_some_and(|s| !s.is_empty()) {
        score += 8;
    }
    if data.estimated_rate.as_deref().is_some_and(|s| !s.is_empty()) {
        score += 7;
    }

    // Service fit, max 30.
    if data.all_criteria_met {
        score += 20;
    }
    score += match data.availability {
        Availability::Available => 7,
        Availability::CallbackRequested => 3,
        _ => 0,
    };
    if data.single_person_found {
        score += 3;
    }

    // Reputation, max 25.
    score += rating_tier_points(rating);
    score += review_volume_points(review_count);

    // Trust, max 10.
    if data.recommended {
        score += 10;
    }

    score.clamp(0, 100) as u8
}

fn rating_tier_points(rating: Option<f32>) -> i32 {
    match rating {
        Some(r) if r >= 4.5 => 20,
        Some(r) if r >= 4.0 => 16,
        Some(r) if r >= 3.5 => 12,
        Some(r) if r >= 3.0 => 8,
        Some(r) if r > 0.0 => 4,
        _ => 0,
    }
}

fn review_volume_points(review_count: Option<u32>) -> i32 {
    match review_count {
        Some(n) if n >= 100 => 5,
        Some(n) if n >= 50 => 4,
        Some(n) if n >= 20 => 3,
        Some(n) if n >= 10 => 2,
        Some(n) if n > 0 => 1,
        _ => 0,
    }
}

/// Builds the user-facing "why nothing qualified" explanation from a
/// breakdown of rejection reasons, not just a bare count (§10.7).
fn explain_empty(excluded: &[ExcludedProvider]) -> String {
    if excluded.is_empty() {
        return "No providers were called.".to_string();
    }

    let mut by_reason: HashMap<String, usize> = HashMap::new();
    for e in excluded {
        *by_reason.entry(e.reason.clone()).or_insert(0) += 1;
    }

    let mut breakdown: Vec<String> = by_reason
        .into_iter()
        .map(|(reason, count)| format!("{count} {reason}"))
        .collect();
    breakdown.sort();

    format!(
        "No providers met the criteria out of {}: {}.",
        excluded.len(),
        breakdown.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vco_domain::model::CallMethod;

    fn structured(outcome: CallOutcome, all_criteria_met: bool, disqualified: bool) -> StructuredCallData {
        StructuredCallData {
            availability: Availability::Available,
            estimated_rate: Some("$120".into()),
            single_person_found: true,
            technician_name: None,
            all_criteria_met,
            criteria_details: HashMap::new(),
            call_outcome: outcome,
            recommended: true,
            disqualified,
            disqualification_reason: disqualified.then(|| "failed background check".to_string()),
            earliest_availability: Some("Tomorrow 2pm".into()),
            notes: None,
        }
    }

    fn completed_provider(name: &str, rating: f32, review_count: u32, data: StructuredCallData) -> Provider {
        let mut provider = Provider::new(Uuid::new_v4(), name, "+15551234567");
        provider.rating = Some(rating);
        provider.review_count = Some(review_count);
        provider.call_status = Some(CallStatus::Completed);
        provider.call_method = Some(CallMethod::Webhook);
        provider.call_result = Some(data);
        provider
    }

    #[test]
    fn ranks_top_three_by_score_with_rating_tiebreak() {
        let p1 = completed_provider("Acme", 4.8, 200, structured(CallOutcome::Positive, true, false));
        let p2 = completed_provider("Best", 4.3, 30, structured(CallOutcome::Positive, true, false));
        let p3 = completed_provider("Third", 3.9, 8, structured(CallOutcome::Positive, true, false));
        let recommender = Recommender::new();
        let set = recommender.recommend(Uuid::new_v4(), &[p1, p2, p3]);
        assert_eq!(set.providers.len(), 3);
        assert_eq!(set.providers[0].name, "Acme");
        assert!(set.providers[0].score >= 80);
        assert!(set.excluded.is_empty());
    }

    #[test]
    fn disqualified_and_no_answer_are_excluded_with_reasons() {
        let mut no_answer = Provider::new(Uuid::new_v4(), "Ghost", "+15551234567");
        no_answer.call_status = Some(CallStatus::NoAnswer);

        let disqualified = completed_provider(
            "Rejected",
            4.0,
            10,
            structured(CallOutcome::Positive, false, true),
        );

        let recommender = Recommender::new();
        let set = recommender.recommend(Uuid::new_v4(), &[no_answer, disqualified]);
        assert!(set.providers.is_empty());
        assert_eq!(set.excluded.len(), 2);
        assert!(set.overall_recommendation.contains("did not answer"));
        assert!(set.overall_recommendation.contains("failed background check"));
    }

    #[test]
    fn negative_outcome_still_scored_but_ranks_lower() {
        let positive = completed_provider("Good", 4.0, 10, structured(CallOutcome::Positive, true, false));
        let neutral = completed_provider("Meh", 4.0, 10, structured(CallOutcome::Neutral, true, false));
        let recommender = Recommender::new();
        let set = recommender.recommend(Uuid::new_v4(), &[positive, neutral]);
        assert_eq!(set.providers[0].name, "Good");
        assert_eq!(set.providers[1].name, "Meh");
    }
}
