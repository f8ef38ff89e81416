use std::sync::Arc;

use {
    patchbay_config::{PresenterSpec, RouteConfig},
    patchbay_workflow::WorkflowTemplate,
};

use crate::{
    Error, Result,
    pattern::RoutePattern,
};

/// Everything the dispatcher needs once a route has matched: the workflow
/// to instantiate and how to present its outcome.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    /// Pattern text as configured, kept for logs and the `routes` command.
    pub pattern: String,
    pub workflow: WorkflowTemplate,
    pub presenter: Option<PresenterSpec>,
}

/// Ordered table of compiled route patterns.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<(RoutePattern, Arc<RouteBinding>)>,
}

impl RouteTable {
    /// Compile every configured route, preserving declaration order.
    pub fn compile(routes: &[RouteConfig]) -> Result<Self> {
        let mut entries = Vec::with_capacity(routes.len());
        for (index, route) in routes.iter().enumerate() {
            let pattern =
                RoutePattern::compile(&route.pattern).map_err(|source| Error::InvalidPattern {
                    index,
                    pattern: route.pattern.clone(),
                    source,
                })?;
            let binding = Arc::new(RouteBinding {
                pattern: pattern.raw().to_string(),
                workflow: route.workflow.clone(),
                presenter: route.presenter.clone(),
            });
            entries.push((pattern, binding));
        }
        Ok(Self { entries })
    }

    /// First binding whose pattern matches `route`. Declaration order is
    /// match order; nothing past the first hit is consulted.
    #[must_use]
    pub fn first_match(&self, route: &str) -> Option<Arc<RouteBinding>> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(route))
            .map(|(_, binding)| Arc::clone(binding))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings in declaration order, for listing and diagnostics.
    pub fn bindings(&self) -> impl Iterator<Item = &Arc<RouteBinding>> {
        self.entries.iter().map(|(_, binding)| binding)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &str) -> RouteConfig {
        RouteConfig {
            pattern: pattern.into(),
            workflow: WorkflowTemplate::default(),
            presenter: None,
        }
    }

    #[test]
    fn first_match_wins_over_later_entries() {
        let table =
            RouteTable::compile(&[route("chat/(send|edit)"), route("chat/send")]).unwrap();
        let binding = table.first_match("chat/send").unwrap();
        assert_eq!(binding.pattern, "chat/(send|edit)");
    }

    #[test]
    fn unmatched_route_returns_none() {
        let table = RouteTable::compile(&[route("chat/send")]).unwrap();
        assert!(table.first_match("nope").is_none());
    }

    #[test]
    fn match_covers_the_full_route_string() {
        let table = RouteTable::compile(&[route("chat")]).unwrap();
        assert!(table.first_match("chat").is_some());
        assert!(table.first_match("chat/send").is_none());
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = RouteTable::default();
        assert!(table.is_empty());
        assert!(table.first_match("anything").is_none());
    }

    #[test]
    fn invalid_pattern_reports_its_position() {
        let err = RouteTable::compile(&[route("fine"), route("broken(")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("routes[1]"), "got: {msg}");
        assert!(msg.contains("broken("), "got: {msg}");
    }

    #[test]
    fn bindings_iterate_in_declaration_order() {
        let table = RouteTable::compile(&[route("a"), route("b"), route("c")]).unwrap();
        let patterns: Vec<_> = table.bindings().map(|b| b.pattern.clone()).collect();
        assert_eq!(patterns, ["a", "b", "c"]);
        assert_eq!(table.len(), 3);
    }
}
