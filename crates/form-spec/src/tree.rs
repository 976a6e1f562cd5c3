use std::collections::HashMap;

use crate::spec::{id::ItemId, question::QuestionSpec};

/// Parent to ordered-children index over a flat question list.
///
/// The questions stay in the caller's slice; the tree only stores positions
/// into it. Siblings are sorted by `order_index` with a stable sort, so equal
/// indexes keep their snapshot order.
#[derive(Debug, Clone)]
pub struct FormTree<'a> {
    questions: &'a [QuestionSpec],
    roots: Vec<usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

/// A question reached by [`FormTree::walk`], with its nesting depth.
#[derive(Debug, Clone, Copy)]
pub struct TreeNode<'a> {
    pub question: &'a QuestionSpec,
    pub depth: usize,
}

impl<'a> FormTree<'a> {
    pub fn build(questions: &'a [QuestionSpec]) -> Self {
        let mut roots = Vec::new();
        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();

        for (index, question) in questions.iter().enumerate() {
            match &question.parent_id {
                Some(parent) => children.entry(parent.as_str()).or_default().push(index),
                None => roots.push(index),
            }
        }

        roots.sort_by_key(|index| questions[*index].order_index);
        for siblings in children.values_mut() {
            siblings.sort_by_key(|index| questions[*index].order_index);
        }

        Self {
            questions,
            roots,
            children,
        }
    }

    pub fn questions(&self) -> &'a [QuestionSpec] {
        self.questions
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Top-level questions in order.
    pub fn roots(&self) -> impl Iterator<Item = &'a QuestionSpec> + '_ {
        self.roots.iter().map(|index| &self.questions[*index])
    }

    /// Direct children of `parent` in order; empty for unknown ids.
    pub fn children(&self, parent: &ItemId) -> impl Iterator<Item = &'a QuestionSpec> + '_ {
        self.children
            .get(parent.as_str())
            .into_iter()
            .flatten()
            .map(|index| &self.questions[*index])
    }

    /// Depth-first pre-order walk from the root level.
    ///
    /// A node for which `keep` answers false is skipped together with its
    /// subtree. Only sections are descended into. Every snapshot entry is
    /// yielded at most once, so duplicate ids cannot make the walk loop.
    pub fn walk<F>(&self, mut keep: F) -> Vec<TreeNode<'a>>
    where
        F: FnMut(&QuestionSpec) -> bool,
    {
        let mut visited = vec![false; self.questions.len()];
        let mut out = Vec::new();
        self.walk_level(&self.roots, 0, &mut keep, &mut visited, &mut out);
        out
    }

    fn walk_level<F>(
        &self,
        level: &[usize],
        depth: usize,
        keep: &mut F,
        visited: &mut [bool],
        out: &mut Vec<TreeNode<'a>>,
    ) where
        F: FnMut(&QuestionSpec) -> bool,
    {
        for &index in level {
            if visited[index] {
                continue;
            }
            visited[index] = true;

            let question = &self.questions[index];
            if !keep(question) {
                continue;
            }
            out.push(TreeNode { question, depth });

            if question.kind.is_section()
                && let Some(children) = self.children.get(question.id.as_str())
            {
                self.walk_level(children, depth + 1, keep, visited, out);
            }
        }
    }

    /// Every question reachable from the root level, in walk order.
    pub fn reachable(&self) -> Vec<TreeNode<'a>> {
        self.walk(|_| true)
    }
}
