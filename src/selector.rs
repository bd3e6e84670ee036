//! Picks which generated post goes to a platform.
//!
//! Each call weighs every candidate as
//!
//! ```text
//! weight = engagement_score + type bonus + uniform[0, 1)
//! ```
//!
//! and returns the heaviest. The random term is drawn fresh on every call, so
//! selecting once per platform from the same batch spreads different posts
//! across platforms instead of sending the top-scored one everywhere.

use crate::models::CandidatePost;
use rand::Rng;

/// Return the best candidate, or `None` if `candidates` is empty.
pub fn select_best<'a, R>(candidates: &'a [CandidatePost], rng: &mut R) -> Option<&'a CandidatePost>
where
    R: Rng + ?Sized,
{
    candidates
        .iter()
        .map(|post| (post, weight(post) + rng.random::<f64>()))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(post, _)| post)
}

fn weight(post: &CandidatePost) -> f64 {
    post.engagement_score + post.post_type.bonus()
}
