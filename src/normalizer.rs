use crate::classifier::classify;
use crate::models::{Difficulty, GenerationRequest};

/// Shortest time limit any quiz may have, in minutes
pub const MIN_TIME_LIMIT_MINUTES: u32 = 5;

/// Total time limit for a quiz: `max(5, floor(count * seconds_per_question / 60))`
pub fn time_limit_minutes(question_count: u32, difficulty: Difficulty) -> u32 {
    let total_seconds = question_count.saturating_mul(difficulty.seconds_per_question());
    (total_seconds / 60).max(MIN_TIME_LIMIT_MINUTES)
}

/// Fill in the derived fields of a request. Fields the caller already set are left alone.
pub fn normalize(request: &mut GenerationRequest) {
    if request.time_limit_minutes.is_none() {
        request.time_limit_minutes =
            Some(time_limit_minutes(request.question_count, request.difficulty));
    }

    if request.category.is_none() {
        request.category = Some(classify(&request.topic));
    }
}
