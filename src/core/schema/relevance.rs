//! Keyword-weighted relevance ranking for table names. Wide databases would
//! otherwise blow up prompt construction, so the analyzer keeps only the
//! top-scored tables. This is a cost bound, not an accuracy guarantee.

/// Score given to a table name that matches no keyword at all.
pub const DEFAULT_SCORE: i32 = 3;

/// Ranking weights. Kept as data so deployments with different domain
/// vocabularies can swap the policy without touching the analyzer.
pub struct RankingPolicy {
    keywords: Vec<(&'static str, i32)>,
    prefix_bonuses: Vec<(&'static str, i32)>,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            keywords: vec![
                ("reservation", 10),
                ("booking", 10),
                ("revenue", 9),
                ("payment", 9),
                ("invoice", 8),
                ("order", 8),
                ("sale", 8),
                ("transaction", 7),
                ("customer", 7),
                ("guest", 7),
                ("room", 6),
                ("product", 6),
                ("account", 5),
                ("user", 5),
                ("session", 1),
                ("queue", 1),
                ("token", 1),
                ("log", 0),
                ("migration", 0),
                ("cache", 0),
                ("backup", 0),
                ("temp", 0),
            ],
            prefix_bonuses: vec![("res_", 2), ("fact_", 2), ("dim_", 2)],
        }
    }
}

impl RankingPolicy {
    /// Case-insensitive substring match; the best-scoring keyword wins, an
    /// unmatched name scores `DEFAULT_SCORE`. Prefix bonuses stack on top.
    pub fn score_table(&self, name: &str) -> i32 {
        let lower = name.to_lowercase();
        let keyword_score = self
            .keywords
            .iter()
            .filter(|(keyword, _)| lower.contains(keyword))
            .map(|(_, weight)| *weight)
            .max()
            .unwrap_or(DEFAULT_SCORE);
        let bonus: i32 = self
            .prefix_bonuses
            .iter()
            .filter(|(prefix, _)| lower.starts_with(prefix))
            .map(|(_, bonus)| *bonus)
            .sum();
        keyword_score + bonus
    }

    /// Top `cap` table names by score. Name order breaks ties so the result
    /// is deterministic across calls.
    pub fn rank_tables(&self, tables: &[String], cap: usize) -> Vec<String> {
        let mut scored: Vec<(i32, &String)> =
            tables.iter().map(|t| (self.score_table(t), t)).collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().take(cap).map(|(_, t)| t.clone()).collect()
    }
}
