//! Line handles and the sub-line tree behind them.
//!
//! All nodes of one display live in a single arena. A node stores its parent
//! and child indices, so a print on any sub-line can find its root row
//! without reference cycles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::RenderError;

/// Receiver of formatted root rows. Implemented by the render engine.
pub(crate) trait RowSink: Send + Sync {
    /// Queue `text` as the new content of `row`.
    fn submit(&self, row: usize, text: String);
}

#[derive(Debug, Default)]
struct Node {
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Row index for root nodes, `None` for sub-lines
    row: Option<usize>,
}

/// Arena holding every line of one display.
pub(crate) struct LineTree {
    nodes: Mutex<Vec<Node>>,
    sink: Option<Arc<dyn RowSink>>,
}

impl LineTree {
    /// Create a tree with `rows` root nodes, ids `0..rows`.
    pub(crate) fn with_roots(rows: usize, sink: Option<Arc<dyn RowSink>>) -> Arc<Self> {
        let nodes = (0..rows)
            .map(|row| Node {
                row: Some(row),
                ..Node::default()
            })
            .collect();
        Arc::new(Self {
            nodes: Mutex::new(nodes),
            sink,
        })
    }

    fn nodes(&self) -> MutexGuard<'_, Vec<Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn root_of(nodes: &[Node], mut id: usize) -> usize {
    while let Some(parent) = nodes[id].parent {
        id = parent;
    }
    id
}

fn format_node(nodes: &[Node], id: usize, out: &mut String) {
    let node = &nodes[id];
    out.push_str(&node.text);
    for &child in &node.children {
        out.push('\n');
        format_node(nodes, child, out);
    }
}

/// Handle to one logical line of the display.
///
/// Handles are cheap to clone; clones refer to the same line. Root handles
/// come from [`RenderEngine::printer`](super::RenderEngine::printer), sub-line
/// handles from [`LineHandle::subprinter`].
#[derive(Clone)]
pub struct LineHandle {
    tree: Arc<LineTree>,
    id: usize,
}

impl std::fmt::Debug for LineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineHandle")
            .field("id", &self.id)
            .field("row", &self.row())
            .finish()
    }
}

impl LineHandle {
    pub(crate) fn new(tree: Arc<LineTree>, id: usize) -> Self {
        Self { tree, id }
    }

    /// A root line that belongs to no render engine.
    ///
    /// Formatting works as usual, but [`print`](Self::print) fails with
    /// [`RenderError::Detached`].
    pub fn detached() -> Self {
        Self::new(LineTree::with_roots(1, None), 0)
    }

    /// Set this line's text and queue a repaint of its root row.
    pub fn print(&self, message: impl Into<String>) -> Result<(), RenderError> {
        let sink = self.tree.sink.as_ref().ok_or(RenderError::Detached)?;

        let mut nodes = self.tree.nodes();
        nodes[self.id].text = message.into();
        let root = root_of(&nodes, self.id);
        let row = nodes[root].row.ok_or(RenderError::Detached)?;
        let mut formatted = String::new();
        format_node(&nodes, root, &mut formatted);

        // Submit under the lock so queue order matches snapshot order
        sink.submit(row, formatted);
        Ok(())
    }

    /// Append a new sub-line beneath this line and return its handle.
    pub fn subprinter(&self) -> LineHandle {
        let mut nodes = self.tree.nodes();
        let child = nodes.len();
        nodes.push(Node {
            parent: Some(self.id),
            ..Node::default()
        });
        nodes[self.id].children.push(child);
        LineHandle::new(Arc::clone(&self.tree), child)
    }

    /// This line's text followed by every sub-line, one per row.
    pub fn format(&self) -> String {
        let nodes = self.tree.nodes();
        let mut out = String::new();
        format_node(&nodes, self.id, &mut out);
        out
    }

    /// The text most recently printed on this line.
    pub fn text(&self) -> String {
        self.tree.nodes()[self.id].text.clone()
    }

    /// Row index for root lines; `None` for sub-lines.
    pub fn row(&self) -> Option<usize> {
        self.tree.nodes()[self.id].row
    }

    /// Handles for the direct sub-lines, in display order.
    pub fn children(&self) -> Vec<LineHandle> {
        let nodes = self.tree.nodes();
        nodes[self.id]
            .children
            .iter()
            .map(|&id| LineHandle::new(Arc::clone(&self.tree), id))
            .collect()
    }
}
