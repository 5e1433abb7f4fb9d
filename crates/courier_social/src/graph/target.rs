//! Graph API dispatch targets.

use super::GRAPH_PLATFORM;
use courier_interface::DispatchTarget;

/// A Messenger conversation between a page and a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct GraphChat {
    page_id: String,
    user_id: String,
}

impl GraphChat {
    /// Conversation of `page_id` with the user known to the page as `user_id`.
    pub fn new(page_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl DispatchTarget for GraphChat {
    fn platform(&self) -> &str {
        GRAPH_PLATFORM
    }

    fn uid(&self) -> String {
        format!("graph.{}.{}", self.page_id, self.user_id)
    }
}

/// A page feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct GraphPage {
    page_id: String,
}

impl GraphPage {
    /// The feed of `page_id`.
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
        }
    }
}

impl DispatchTarget for GraphPage {
    fn platform(&self) -> &str {
        GRAPH_PLATFORM
    }

    fn uid(&self) -> String {
        format!("graph.{}", self.page_id)
    }

    fn allow_pause(&self) -> bool {
        false
    }
}

/// The comment thread of a post, photo or comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct GraphThread {
    page_id: String,
    object_id: String,
}

impl GraphThread {
    /// Thread under `object_id`, commented on as `page_id`.
    pub fn new(page_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl DispatchTarget for GraphThread {
    fn platform(&self) -> &str {
        GRAPH_PLATFORM
    }

    fn uid(&self) -> String {
        format!("graph.{}/{}", self.page_id, self.object_id)
    }
}
