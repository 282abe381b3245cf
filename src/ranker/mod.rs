//! Feed Ranker
//!
//! Assembles a ranked feed for a user: gather recent posts from every
//! followed author, score them by engagement with time decay, and order
//! deterministically.
//!
//! # Scoring
//!
//! ```text
//!   engagement = likes * w_l + shares * w_s + comments * w_c
//!   decay      = 1 / (1 + age_hours / 24)
//!   score      = engagement * decay
//! ```
//!
//! # Ordering
//!
//! Score descending, then timestamp descending (newer first), then post id
//! ascending. Two runs over the same inputs at the same reference time yield
//! the same feed.
//!
//! # Failure policy
//!
//! A failing follow-list fetch is fatal. A failing per-author candidate
//! fetch is skipped and counted; the result is marked partial. When more
//! fetches fail than the configured tolerance, the whole assembly fails.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{ContentStore, PostCandidate, PostId, SocialGraph, UserId};
use crate::error::{Error, Result};
use crate::metrics::AccessMetrics;

/// Default posts fetched per followed author
pub const DEFAULT_CANDIDATE_WINDOW: usize = 20;

/// Per-signal weights applied before time decay.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub likes: f64,
    pub shares: f64,
    pub comments: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            likes: 1.0,
            shares: 2.0,
            comments: 1.5,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("likes", self.likes),
            ("shares", self.shares),
            ("comments", self.comments),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "scoring weight for {} must be finite and non-negative, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Ranker configuration.
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Recent posts considered per followed author
    pub candidate_window: usize,
    /// Failed candidate fetches tolerated before the assembly fails outright
    pub max_fetch_failures: usize,
    pub weights: ScoringWeights,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            candidate_window: DEFAULT_CANDIDATE_WINDOW,
            max_fetch_failures: usize::MAX,
            weights: ScoringWeights::default(),
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.candidate_window == 0 {
            return Err(Error::Config(
                "candidate window must be positive".to_string(),
            ));
        }
        self.weights.validate()
    }
}

/// A ranked feed page.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeed {
    /// Post ids, best first
    pub posts: Vec<PostId>,
    /// True when one or more candidate fetches failed
    pub partial: bool,
    /// Number of followed authors whose fetch failed
    pub failed_fetches: usize,
    /// True when the page was served from the feed cache
    pub from_cache: bool,
}

impl RankedFeed {
    pub(crate) fn cached(posts: Vec<PostId>) -> Self {
        Self {
            posts,
            partial: false,
            failed_fetches: 0,
            from_cache: true,
        }
    }
}

/// Scores and orders feed candidates.
pub struct FeedRanker {
    graph: Arc<dyn SocialGraph>,
    content: Arc<dyn ContentStore>,
    config: RankerConfig,
    metrics: Arc<AccessMetrics>,
}

impl FeedRanker {
    pub fn new(
        graph: Arc<dyn SocialGraph>,
        content: Arc<dyn ContentStore>,
        config: RankerConfig,
        metrics: Arc<AccessMetrics>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            graph,
            content,
            config,
            metrics,
        })
    }

    /// Assemble a feed page of at most `page_size` posts for `user`,
    /// scored against the reference time `now`.
    pub async fn assemble(
        &self,
        user: &UserId,
        page_size: usize,
        now: DateTime<Utc>,
    ) -> Result<RankedFeed> {
        let following = self.graph.following(user).await?;
        if following.is_empty() {
            self.metrics.record_feed_assembled(false, 0);
            return Ok(RankedFeed {
                posts: Vec::new(),
                partial: false,
                failed_fetches: 0,
                from_cache: false,
            });
        }

        // Fetch every author's candidates concurrently; failures are
        // collected rather than short-circuiting the batch.
        let fetches = following
            .iter()
            .map(|author| self.content.recent_posts(author, self.config.candidate_window));
        let outcomes = join_all(fetches).await;

        let mut candidates: Vec<PostCandidate> = Vec::new();
        let mut failed_fetches = 0usize;
        for (author, outcome) in following.iter().zip(outcomes) {
            match outcome {
                Ok(posts) => candidates.extend(posts),
                Err(err) => {
                    failed_fetches += 1;
                    warn!(user = %user, author = %author, error = %err, "Candidate fetch failed, skipping author");
                }
            }
        }

        if failed_fetches > self.config.max_fetch_failures {
            return Err(Error::FeedUnavailable {
                user_id: user.to_string(),
                failed_fetches,
            });
        }

        let scored_count = candidates.len() as u64;
        let mut scored: Vec<ScoredPost> = candidates
            .into_iter()
            .map(|candidate| ScoredPost {
                score: score_post(&candidate, &self.config.weights, now),
                timestamp: candidate.timestamp,
                post_id: candidate.post_id,
            })
            .collect();

        scored.sort_by(compare_scored);
        scored.truncate(page_size);

        let partial = failed_fetches > 0;
        self.metrics.record_feed_assembled(partial, scored_count);
        debug!(
            user = %user,
            authors = following.len(),
            scored = scored_count,
            returned = scored.len(),
            partial,
            "Feed assembled"
        );

        Ok(RankedFeed {
            posts: scored.into_iter().map(|s| s.post_id).collect(),
            partial,
            failed_fetches,
            from_cache: false,
        })
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }
}

struct ScoredPost {
    score: f64,
    timestamp: DateTime<Utc>,
    post_id: PostId,
}

/// Engagement-weighted score with 24-hour half-scale time decay.
fn score_post(candidate: &PostCandidate, weights: &ScoringWeights, now: DateTime<Utc>) -> f64 {
    let engagement = candidate.engagement.likes as f64 * weights.likes
        + candidate.engagement.shares as f64 * weights.shares
        + candidate.engagement.comments as f64 * weights.comments;

    // Posts timestamped in the future decay as if brand new
    let age_ms = now
        .signed_duration_since(candidate.timestamp)
        .num_milliseconds()
        .max(0);
    let age_hours = age_ms as f64 / 3_600_000.0;

    engagement * (1.0 / (1.0 + age_hours / 24.0))
}

/// Score descending, timestamp descending, post id ascending.
fn compare_scored(a: &ScoredPost, b: &ScoredPost) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.post_id.cmp(&b.post_id))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryContentStore, InMemorySocialGraph};
    use crate::domain::EngagementCounts;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn candidate(
        id: &str,
        author: &str,
        age_hours: i64,
        likes: u64,
        shares: u64,
        comments: u64,
        now: DateTime<Utc>,
    ) -> PostCandidate {
        PostCandidate::new(
            id,
            author,
            now - Duration::hours(age_hours),
            EngagementCounts {
                likes,
                shares,
                comments,
            },
        )
    }

    fn ranker_fixture(
        config: RankerConfig,
    ) -> (FeedRanker, Arc<InMemorySocialGraph>, Arc<InMemoryContentStore>) {
        let graph = Arc::new(InMemorySocialGraph::new());
        let content = Arc::new(InMemoryContentStore::new());
        let ranker = FeedRanker::new(
            graph.clone(),
            content.clone(),
            config,
            Arc::new(AccessMetrics::new()),
        )
        .unwrap();
        (ranker, graph, content)
    }

    #[test]
    fn test_config_validation() {
        let mut config = RankerConfig::default();
        config.candidate_window = 0;
        assert_matches!(config.validate(), Err(Error::Config(_)));

        let mut config = RankerConfig::default();
        config.weights.shares = -1.0;
        assert_matches!(config.validate(), Err(Error::Config(_)));

        assert!(RankerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_time_decay_shape() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        // 10 likes fresh vs 10 likes a day old: the fresh post scores
        // double (decay 1.0 vs 0.5)
        let fresh = score_post(&candidate("a", "u", 0, 10, 0, 0, now), &weights, now);
        let day_old = score_post(&candidate("b", "u", 24, 10, 0, 0, now), &weights, now);
        assert!((fresh - 10.0).abs() < 1e-9);
        assert!((day_old - 5.0).abs() < 1e-9);

        // Future-dated posts are treated as age zero
        let future = PostCandidate::new(
            "f",
            "u",
            now + Duration::hours(5),
            EngagementCounts {
                likes: 10,
                shares: 0,
                comments: 0,
            },
        );
        assert!((score_post(&future, &weights, now) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_applied() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        // 1 like + 1 share + 1 comment = 1.0 + 2.0 + 1.5
        let post = candidate("a", "u", 0, 1, 1, 1, now);
        assert!((score_post(&post, &weights, now) - 4.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_following_yields_empty_feed() {
        let (ranker, _, _) = ranker_fixture(RankerConfig::default());

        let feed = ranker
            .assemble(&UserId::new("loner"), 25, Utc::now())
            .await
            .unwrap();
        assert!(feed.posts.is_empty());
        assert!(!feed.partial);
    }

    #[tokio::test]
    async fn test_higher_engagement_ranks_first() {
        let now = Utc::now();
        let (ranker, graph, content) = ranker_fixture(RankerConfig::default());
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("author"));

        content.add_post(candidate("low", "author", 1, 1, 0, 0, now));
        content.add_post(candidate("high", "author", 1, 100, 10, 5, now));

        let feed = ranker.assemble(&user, 25, now).await.unwrap();
        assert_eq!(feed.posts, vec![PostId::new("high"), PostId::new("low")]);
    }

    #[tokio::test]
    async fn test_equal_score_newer_wins_then_id() {
        let now = Utc::now();
        let (ranker, graph, content) = ranker_fixture(RankerConfig::default());
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("author"));

        // Same engagement and same age: id ascending breaks the tie
        content.add_post(candidate("b-post", "author", 2, 5, 0, 0, now));
        content.add_post(candidate("a-post", "author", 2, 5, 0, 0, now));
        // Same engagement, fresher: timestamp wins over id
        content.add_post(candidate("z-new", "author", 0, 10, 0, 0, now));
        content.add_post(candidate("a-old", "author", 40, 10, 0, 0, now));

        let feed = ranker.assemble(&user, 25, now).await.unwrap();
        let ids: Vec<&str> = feed.posts.iter().map(|p| p.as_str()).collect();

        let z_pos = ids.iter().position(|id| *id == "z-new").unwrap();
        let old_pos = ids.iter().position(|id| *id == "a-old").unwrap();
        assert!(z_pos < old_pos, "fresher post must outrank the decayed one");

        let a_pos = ids.iter().position(|id| *id == "a-post").unwrap();
        let b_pos = ids.iter().position(|id| *id == "b-post").unwrap();
        assert!(a_pos < b_pos, "id ascending breaks exact ties");
    }

    #[tokio::test]
    async fn test_page_size_truncation() {
        let now = Utc::now();
        let (ranker, graph, content) = ranker_fixture(RankerConfig::default());
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("author"));

        for i in 0..10 {
            content.add_post(candidate(&format!("p{}", i), "author", 1, i, 0, 0, now));
        }

        let feed = ranker.assemble(&user, 3, now).await.unwrap();
        assert_eq!(feed.posts.len(), 3);
        // The 3 highest-engagement posts survive truncation
        assert_eq!(feed.posts[0], PostId::new("p9"));
    }

    #[tokio::test]
    async fn test_deterministic_across_runs() {
        let now = Utc::now();
        let (ranker, graph, content) = ranker_fixture(RankerConfig::default());
        let user = UserId::new("reader");
        for author in ["a1", "a2", "a3"] {
            graph.follow(&user, &UserId::new(author));
            for i in 0..5 {
                content.add_post(candidate(
                    &format!("{}-{}", author, i),
                    author,
                    i as i64,
                    i * 3 % 7,
                    i % 2,
                    i % 3,
                    now,
                ));
            }
        }

        let first = ranker.assemble(&user, 25, now).await.unwrap();
        let second = ranker.assemble(&user, 25, now).await.unwrap();
        assert_eq!(first.posts, second.posts);
    }

    #[tokio::test]
    async fn test_failed_fetch_marks_partial() {
        let now = Utc::now();
        let (ranker, graph, content) = ranker_fixture(RankerConfig::default());
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("healthy"));
        graph.follow(&user, &UserId::new("broken"));

        content.add_post(candidate("ok", "healthy", 1, 5, 0, 0, now));
        content.fail_for(&UserId::new("broken"));

        let feed = ranker.assemble(&user, 25, now).await.unwrap();
        assert!(feed.partial);
        assert_eq!(feed.failed_fetches, 1);
        assert_eq!(feed.posts, vec![PostId::new("ok")]);
    }

    #[tokio::test]
    async fn test_failure_tolerance_exceeded() {
        let now = Utc::now();
        let config = RankerConfig {
            max_fetch_failures: 0,
            ..RankerConfig::default()
        };
        let (ranker, graph, content) = ranker_fixture(config);
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("broken"));
        content.fail_for(&UserId::new("broken"));

        assert_matches!(
            ranker.assemble(&user, 25, now).await,
            Err(Error::FeedUnavailable {
                failed_fetches: 1,
                ..
            })
        );
    }

    #[tokio::test]
    async fn test_candidate_window_limits_per_author() {
        let now = Utc::now();
        let config = RankerConfig {
            candidate_window: 2,
            ..RankerConfig::default()
        };
        let (ranker, graph, content) = ranker_fixture(config);
        let user = UserId::new("reader");
        graph.follow(&user, &UserId::new("prolific"));

        // Oldest posts have the highest engagement, but only the 2 most
        // recent are in the window
        for i in 0..5 {
            content.add_post(candidate(
                &format!("p{}", i),
                "prolific",
                (10 - i) as i64,
                (100 - i * 10) as u64,
                0,
                0,
                now,
            ));
        }

        let feed = ranker.assemble(&user, 25, now).await.unwrap();
        assert_eq!(feed.posts.len(), 2);
        assert!(feed.posts.contains(&PostId::new("p4")));
        assert!(feed.posts.contains(&PostId::new("p3")));
    }
}
