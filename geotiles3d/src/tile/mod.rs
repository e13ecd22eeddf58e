//! In-memory tile hierarchy.
//!
//! The tree is produced by the source database reader and only read here.
//! Child slots are sparse: a quadtree node may have some of its four
//! children missing, so children are stored as `Option<TileNode>`.

use crate::geodesy::BoundingRegion;

/// One node of the spatial hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    region: BoundingRegion,
    content_uri: Option<String>,
    children: Vec<Option<TileNode>>,
}

impl TileNode {
    /// Create a node with no content and no children.
    pub fn new(region: BoundingRegion) -> Self {
        Self {
            region,
            content_uri: None,
            children: Vec::new(),
        }
    }

    /// Set the explicit content URI.
    pub fn with_content_uri(mut self, uri: impl Into<String>) -> Self {
        self.content_uri = Some(uri.into());
        self
    }

    /// Append a child slot (`None` for an empty slot).
    pub fn with_child(mut self, child: Option<TileNode>) -> Self {
        self.children.push(child);
        self
    }

    /// Replace all child slots.
    pub fn with_children(mut self, children: Vec<Option<TileNode>>) -> Self {
        self.children = children;
        self
    }

    pub fn region(&self) -> &BoundingRegion {
        &self.region
    }

    pub fn content_uri(&self) -> Option<&str> {
        self.content_uri.as_deref()
    }

    /// All child slots, including empty ones.
    pub fn child_slots(&self) -> &[Option<TileNode>] {
        &self.children
    }

    /// Non-empty children in slot order.
    pub fn children(&self) -> impl Iterator<Item = &TileNode> {
        self.children.iter().flatten()
    }

    /// A leaf has no non-empty child slots.
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// A tile hierarchy with an optional root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tileset {
    root: Option<TileNode>,
}

impl Tileset {
    pub fn new(root: TileNode) -> Self {
        Self { root: Some(root) }
    }

    /// A tileset with no root.
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&TileNode> {
        self.root.as_ref()
    }
}
