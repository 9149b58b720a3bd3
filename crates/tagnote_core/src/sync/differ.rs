//! Baseline vs working diff.

use crate::model::span::{Span, SpanId};
use std::collections::HashSet;

/// Operations needed to make the store match the working set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Baseline ids missing from the working set, in baseline order.
    pub to_delete: Vec<SpanId>,
    /// Local-only working spans, in working order.
    pub to_create: Vec<Span>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.to_delete.len() + self.to_create.len()
    }
}

/// Computes the plan turning `baseline` into `working`.
///
/// Working spans that carry an id are treated as unchanged.
pub fn diff(baseline: &[Span], working: &[Span]) -> ReconcilePlan {
    let kept: HashSet<SpanId> = working.iter().filter_map(|span| span.id).collect();
    let mut seen = HashSet::new();
    let to_delete = baseline
        .iter()
        .filter_map(|span| span.id)
        .filter(|id| !kept.contains(id) && seen.insert(*id))
        .collect();
    let to_create = working
        .iter()
        .filter(|span| span.is_local_only())
        .cloned()
        .collect();
    ReconcilePlan {
        to_delete,
        to_create,
    }
}

#[cfg(test)]
mod tests {
    use super::diff;
    use crate::model::category::Category;
    use crate::model::span::{Span, SpanRange};

    const TEXT: &str = "0123456789";

    fn persisted(id: i64, start: usize, end: usize) -> Span {
        let range = SpanRange::new(start, end, TEXT.len()).unwrap();
        Span::persisted(id, Category::Problem, range, range.slice(TEXT))
    }

    #[test]
    fn identical_sets_need_nothing() {
        let baseline = vec![persisted(1, 0, 2), persisted(2, 4, 6)];
        let plan = diff(&baseline, &baseline.clone());
        assert!(plan.is_empty());
    }

    #[test]
    fn category_change_is_delete_plus_create() {
        let baseline = vec![persisted(7, 0, 4)];
        let working = vec![Span::local(Category::Idea, 0, 4, TEXT).unwrap()];
        let plan = diff(&baseline, &working);
        assert_eq!(plan.to_delete, vec![7]);
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].category, Category::Idea);
        assert_eq!(plan.operation_count(), 2);
    }

    #[test]
    fn empty_working_deletes_everything() {
        let baseline = vec![persisted(1, 0, 2), persisted(2, 4, 6)];
        let plan = diff(&baseline, &[]);
        assert_eq!(plan.to_delete, vec![1, 2]);
        assert!(plan.to_create.is_empty());
    }
}
