//! Built-in job implementations.

pub mod ancestors;
pub mod emptiness;
pub mod extensions;
pub mod links;
pub mod modified;
pub mod reset;
pub mod sync;
pub mod warnings;

pub use ancestors::{AncestorChain, AncestorsJob};
pub use emptiness::{Emptiness, EmptinessJob};
pub use extensions::{ExtensionSet, ExtensionsJob};
pub use links::LinksJob;
pub use modified::{LastModified, ModifiedJob};
pub use reset::ResetJob;
pub use sync::SyncJob;
pub use warnings::WarningsJob;

use crate::context::EngineContext;
use crate::fold::Foldmachine;

/// A driver over the live node table with the configured limits.
pub(crate) fn foldmachine(ctx: &EngineContext) -> Foldmachine {
    Foldmachine::new(
        ctx.nodes.clone(),
        ctx.config.batch_size,
        ctx.config.page_size,
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use treehub_core::config::EngineConfig;
    use treehub_database::{MemoryNodeStore, MemoryReferenceSource};
    use treehub_entity::Node;

    use crate::context::EngineContext;

    /// Live store, staging store, reference source and context over them.
    pub struct Fixture {
        pub nodes: Arc<MemoryNodeStore>,
        pub staging: Arc<MemoryNodeStore>,
        pub references: Arc<MemoryReferenceSource>,
        pub ctx: EngineContext,
    }

    pub fn fixture(nodes: Vec<Node>) -> Fixture {
        fixture_with(nodes, Vec::new(), EngineConfig::default())
    }

    pub fn fixture_with(nodes: Vec<Node>, staging: Vec<Node>, config: EngineConfig) -> Fixture {
        let nodes = Arc::new(MemoryNodeStore::with_nodes("files", nodes));
        let staging = Arc::new(MemoryNodeStore::with_nodes("files_tmp", staging));
        let references = Arc::new(MemoryReferenceSource::new());
        let ctx = EngineContext::new(
            nodes.clone(),
            staging.clone(),
            references.clone(),
            config,
        );
        Fixture {
            nodes,
            staging,
            references,
            ctx,
        }
    }

    /// The A/B/C tree: folder A with file B (txt) and empty folder C.
    pub fn abc() -> Vec<Node> {
        vec![
            Node::folder("A", None, 0, "A"),
            Node::file("B", Some("A"), 1, "b.txt"),
            Node::folder("C", Some("A"), 1, "C"),
        ]
    }

    /// A four-level tree with mixed content.
    ///
    /// ```text
    /// r (folder)
    /// ├── a (folder)
    /// │   ├── a1.pdf
    /// │   └── aa (folder)
    /// │       └── Thumbs.db (warning)
    /// ├── b (folder)
    /// │   └── bb (folder)
    /// │       └── x.DWG
    /// └── readme
    /// ```
    pub fn deep() -> Vec<Node> {
        let mut thumbs = Node::file("aa1", Some("aa"), 3, "Thumbs.db");
        thumbs.is_warning = true;
        vec![
            Node::folder("r", None, 0, "r"),
            Node::folder("a", Some("r"), 1, "a"),
            Node::file("a1", Some("a"), 2, "a1.pdf"),
            Node::folder("aa", Some("a"), 2, "aa"),
            thumbs,
            Node::folder("b", Some("r"), 1, "b"),
            Node::folder("bb", Some("b"), 2, "bb"),
            Node::file("bb1", Some("bb"), 3, "x.DWG"),
            Node::file("readme", Some("r"), 1, "readme"),
        ]
    }
}
