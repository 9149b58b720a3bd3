//! Review aggregation over a project's taggings.
//!
//! # Responsibility
//! - Split taggings into per-category highlight lists.
//! - Compute member contribution and team progress percentages.
//!
//! # Invariants
//! - Every percentage is clamped to `0..=100`.
//! - A "log" is one memo on which a member has at least one tagging.

use crate::model::category::Category;
use crate::model::document::{DocumentId, ProjectId};
use crate::repo::tagging_store::{ProjectReviewStore, ProjectTagging, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One tagged fragment in a review list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub memo_id: DocumentId,
    pub memo_date: String,
    pub user_name: String,
    pub text: String,
}

/// Highlights split by category, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBuckets {
    pub problem: Vec<Highlight>,
    pub idea: Vec<Highlight>,
    pub solution: Vec<Highlight>,
}

impl CategoryBuckets {
    pub fn bucket(&self, category: Category) -> &[Highlight] {
        match category {
            Category::Problem => &self.problem,
            Category::Idea => &self.idea,
            Category::Solution => &self.solution,
        }
    }

    pub fn total(&self) -> usize {
        self.problem.len() + self.idea.len() + self.solution.len()
    }

    fn push(&mut self, category: Category, highlight: Highlight) {
        match category {
            Category::Problem => self.problem.push(highlight),
            Category::Idea => self.idea.push(highlight),
            Category::Solution => self.solution.push(highlight),
        }
    }
}

/// Groups taggings by category.
pub fn group_by_category<'a>(
    taggings: impl IntoIterator<Item = &'a ProjectTagging>,
) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for tagging in taggings {
        buckets.push(
            tagging.category,
            Highlight {
                memo_id: tagging.memo_id,
                memo_date: tagging.memo_date.clone(),
                user_name: tagging.user_name.clone(),
                text: tagging.text.clone(),
            },
        );
    }
    buckets
}

/// One member's taggings, grouped by category.
pub fn my_highlights(taggings: &[ProjectTagging], user_name: &str) -> CategoryBuckets {
    group_by_category(taggings.iter().filter(|t| t.user_name == user_name))
}

/// Loads a project's taggings and groups them by category.
pub async fn project_taggings<S: ProjectReviewStore>(
    store: &S,
    project_id: ProjectId,
) -> StoreResult<CategoryBuckets> {
    let taggings = store.list_project_taggings(project_id).await?;
    Ok(group_by_category(&taggings))
}

/// One row of the member contribution sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub member: String,
    /// Logs collected by this member.
    pub total: u32,
    pub max_possible: u32,
    pub percent: u8,
}

/// Contribution of every member plus every tagger not listed as a member.
///
/// Sorted by `total` descending, then by name.
pub fn member_contributions(
    taggings: &[ProjectTagging],
    members: &[String],
    max_possible: u32,
) -> Vec<Contribution> {
    let mut logs: BTreeMap<&str, BTreeSet<DocumentId>> = members
        .iter()
        .map(|member| (member.as_str(), BTreeSet::new()))
        .collect();
    for tagging in taggings {
        logs.entry(tagging.user_name.as_str())
            .or_default()
            .insert(tagging.memo_id);
    }

    let mut rows: Vec<Contribution> = logs
        .into_iter()
        .map(|(member, memos)| {
            let total = u32::try_from(memos.len()).unwrap_or(u32::MAX);
            Contribution {
                member: member.to_string(),
                total,
                max_possible,
                percent: clamped_percent(total, max_possible),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.member.cmp(&b.member)));
    rows
}

/// Team completion; 0 when nothing is required.
pub fn team_progress(current: u32, required: u32) -> u8 {
    clamped_percent(current, required)
}

/// Progress view of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReview {
    pub project_id: ProjectId,
    pub project_name: String,
    /// Logs collected by all members together.
    pub team_logs: u32,
    pub required_logs: u32,
    pub team_percent: u8,
    pub contributions: Vec<Contribution>,
    pub my_highlights: CategoryBuckets,
}

/// Builds the review screen of `project_id` for `user_name`.
///
/// A member can earn at most one log per project memo.
pub async fn project_review<S: ProjectReviewStore>(
    store: &S,
    project_id: ProjectId,
    user_name: &str,
) -> StoreResult<ProjectReview> {
    let summary = store.load_project(project_id).await?;
    let taggings = store.list_project_taggings(project_id).await?;

    let memo_count: BTreeSet<DocumentId> = taggings.iter().map(|t| t.memo_id).collect();
    let max_possible = u32::try_from(memo_count.len()).unwrap_or(u32::MAX);
    let contributions = member_contributions(&taggings, &summary.members, max_possible);
    let team_logs = contributions
        .iter()
        .fold(0u32, |sum, row| sum.saturating_add(row.total));

    Ok(ProjectReview {
        project_id,
        project_name: summary.name,
        team_logs,
        required_logs: summary.required_taggings,
        team_percent: team_progress(team_logs, summary.required_taggings),
        contributions,
        my_highlights: my_highlights(&taggings, user_name),
    })
}

fn clamped_percent(value: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let percent = u64::from(value) * 100 / u64::from(whole);
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::{group_by_category, member_contributions, my_highlights, team_progress};
    use crate::model::category::Category;
    use crate::repo::tagging_store::ProjectTagging;

    fn tagging(id: i64, memo_id: i64, user: &str, category: Category) -> ProjectTagging {
        ProjectTagging {
            id,
            memo_id,
            memo_date: format!("2024-05-{memo_id:02}"),
            user_name: user.to_string(),
            category,
            start: 0,
            end: 3,
            text: "abc".to_string(),
        }
    }

    #[test]
    fn team_progress_is_clamped() {
        assert_eq!(team_progress(0, 0), 0);
        assert_eq!(team_progress(5, 0), 0);
        assert_eq!(team_progress(3, 12), 25);
        assert_eq!(team_progress(40, 12), 100);
    }

    #[test]
    fn grouping_keeps_input_order_per_category() {
        let taggings = vec![
            tagging(1, 1, "ana", Category::Idea),
            tagging(2, 2, "ana", Category::Problem),
            tagging(3, 3, "bo", Category::Idea),
        ];
        let buckets = group_by_category(&taggings);
        assert_eq!(buckets.total(), 3);
        let idea_memos: Vec<i64> = buckets.idea.iter().map(|h| h.memo_id).collect();
        assert_eq!(idea_memos, vec![1, 3]);
        assert!(buckets.solution.is_empty());

        let mine = my_highlights(&taggings, "bo");
        assert_eq!(mine.total(), 1);
        assert_eq!(mine.bucket(Category::Idea)[0].user_name, "bo");
    }

    #[test]
    fn contributions_count_memos_not_taggings() {
        let taggings = vec![
            tagging(1, 1, "bo", Category::Idea),
            tagging(2, 1, "bo", Category::Problem),
            tagging(3, 2, "ana", Category::Idea),
            tagging(4, 3, "ana", Category::Solution),
        ];
        let members = vec!["ana".to_string(), "bo".to_string(), "cy".to_string()];
        let rows = member_contributions(&taggings, &members, 4);
        let summary: Vec<(&str, u32, u8)> = rows
            .iter()
            .map(|row| (row.member.as_str(), row.total, row.percent))
            .collect();
        assert_eq!(summary, vec![("ana", 2, 50), ("bo", 1, 25), ("cy", 0, 0)]);
    }

    #[test]
    fn contribution_percent_never_exceeds_hundred() {
        let taggings = vec![
            tagging(1, 1, "ana", Category::Idea),
            tagging(2, 2, "ana", Category::Idea),
        ];
        let rows = member_contributions(&taggings, &[], 1);
        assert_eq!(rows[0].percent, 100);
        assert_eq!(member_contributions(&taggings, &[], 0)[0].percent, 0);
    }
}
