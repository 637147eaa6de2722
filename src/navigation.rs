//! Hand-off to the search view.
//!
//! On commit the session calls a `SearchNavigator` with the final query and
//! expects nothing back. Any `FnMut(&str)` is a navigator; `SearchRoute`
//! builds the search view's URL for hosts that route by location.

use url::Url;

use crate::error::{Result, TypeaheadError};

/// External collaborator that turns a committed query into search results.
pub trait SearchNavigator: Send {
    fn navigate(&mut self, query: &str);
}

impl<F> SearchNavigator for F
where
    F: FnMut(&str) + Send,
{
    fn navigate(&mut self, query: &str) {
        self(query)
    }
}

/// Builds `<base>/search?q=<query>` locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoute {
    base: Url,
}

impl SearchRoute {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| TypeaheadError::Config(format!("search_base '{}': {}", base, e)))?;
        Ok(Self { base })
    }

    /// Location of the search view for `query`, with the query URL-encoded.
    ///
    /// `search` is appended to the base path, so a base of
    /// `http://host/app/` routes to `http://host/app/search`.
    pub fn location(&self, query: &str) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}/search", self.base.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_fragment(None);
        url.query_pairs_mut().clear().append_pair("q", query);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_encodes_query() {
        let route = SearchRoute::new("http://localhost:5173/").unwrap();
        let url = route.location("kubernetes scheduling & more");

        assert_eq!(url.path(), "/search");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "q");
        assert_eq!(value, "kubernetes scheduling & more");
    }

    #[test]
    fn location_replaces_existing_query_and_fragment() {
        let route = SearchRoute::new("https://docs.example.com/?tab=1#top").unwrap();
        let url = route.location("golang");
        assert_eq!(url.as_str(), "https://docs.example.com/search?q=golang");
    }

    #[test]
    fn location_keeps_base_path_prefix() {
        let with_slash = SearchRoute::new("http://host/app/").unwrap();
        assert_eq!(
            with_slash.location("golang").as_str(),
            "http://host/app/search?q=golang"
        );

        let without_slash = SearchRoute::new("http://host/app").unwrap();
        assert_eq!(
            without_slash.location("golang").as_str(),
            "http://host/app/search?q=golang"
        );
    }

    #[test]
    fn rejects_relative_base() {
        assert!(matches!(
            SearchRoute::new("/search"),
            Err(TypeaheadError::Config(_))
        ));
    }

    #[test]
    fn closures_are_navigators() {
        let mut seen = Vec::new();
        {
            let mut navigator = |q: &str| seen.push(q.to_string());
            navigator.navigate("golang");
        }
        assert_eq!(seen, vec!["golang"]);
    }
}
