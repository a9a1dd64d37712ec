//! Scope tree: nested lexical blocks and the lines emitted into them.
//!
//! Blocks, lines and variables live in flat arenas and refer to each other by
//! index. A [`Cursor`] names the block being extended and the index of the
//! last node written there; new nodes always go right after it, which is how
//! materialization inserts a declaration above the statement being built.
use crate::types::TypeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Line(LineId),
    Block(BlockId),
}

#[derive(Debug, Default)]
pub struct Block {
    pub parent: Option<BlockId>,
    pub nodes: Vec<Node>,
    /// A line may still be inserted before the current point.
    pub extendable: bool,
    pub breakable: bool,
    pub continuable: bool,
    /// Outermost block of a function declaration; labels never climb past it.
    pub func_boundary: bool,
}

#[derive(Debug, Default)]
pub struct Line {
    pub text: String,
    pub vars: Vec<VarId>,
    pub types: Vec<TypeId>,
}

#[derive(Debug)]
pub struct Var {
    pub name: String,
    pub ty: TypeId,
    /// `None` for package-level variables.
    pub block: Option<BlockId>,
    pub used: bool,
}

/// Insertion point: new nodes land at `pos + 1` of `block`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub block: BlockId,
    pub pos: isize,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    blocks: Vec<Block>,
    lines: Vec<Line>,
    vars: Vec<Var>,
}

impl ScopeTree {
    pub fn new() -> Self { Self::default() }

    pub fn block(&self, b: BlockId) -> &Block { &self.blocks[b.0 as usize] }

    pub fn block_mut(&mut self, b: BlockId) -> &mut Block { &mut self.blocks[b.0 as usize] }

    pub fn line(&self, l: LineId) -> &Line { &self.lines[l.0 as usize] }

    pub fn var(&self, v: VarId) -> &Var { &self.vars[v.0 as usize] }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &Var)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i as u32), v))
    }

    /// Root block of a compilation unit.
    pub fn new_root(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block { extendable: true, ..Block::default() });
        id
    }

    /// Number of nodes currently in `b`.
    pub fn width(&self, b: BlockId) -> usize { self.block(b).nodes.len() }

    /// Index of `child` inside its parent.
    pub fn index_in_parent(&self, child: BlockId) -> Option<(BlockId, usize)> {
        let parent = self.block(child).parent?;
        let idx = self.block(parent).nodes.iter().position(|n| *n == Node::Block(child))?;
        Some((parent, idx))
    }

    fn insert(&mut self, cur: &mut Cursor, node: Node) {
        let at = (cur.pos + 1) as usize;
        self.block_mut(cur.block).nodes.insert(at, node);
        cur.pos += 1;
    }

    // ------------------------------ Emission ------------------------------ //

    pub fn emit(&mut self, cur: &mut Cursor, text: impl Into<String>) -> LineId {
        let id = LineId(self.lines.len() as u32);
        self.lines.push(Line { text: text.into(), ..Line::default() });
        self.insert(cur, Node::Line(id));
        id
    }

    pub fn set_text(&mut self, line: LineId, text: impl Into<String>) {
        self.lines[line.0 as usize].text = text.into();
    }

    pub fn declare_var(&mut self, line: LineId, block: Option<BlockId>, name: impl Into<String>, ty: TypeId) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var { name: name.into(), ty, block, used: false });
        self.lines[line.0 as usize].vars.push(id);
        id
    }

    /// Package-level variable; visible through its unit rather than a line.
    pub fn declare_global(&mut self, name: impl Into<String>, ty: TypeId) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var { name: name.into(), ty, block: None, used: true });
        id
    }

    pub fn declare_type(&mut self, line: LineId, ty: TypeId) {
        self.lines[line.0 as usize].types.push(ty);
    }

    pub fn mark_used(&mut self, v: VarId) { self.vars[v.0 as usize].used = true; }

    /// Open a child block after the cursor. Break/continue eligibility is
    /// inherited from the enclosing block.
    pub fn enter(&mut self, cur: &mut Cursor, extendable: bool) -> BlockId {
        let parent = self.block(cur.block);
        let child = Block {
            parent: Some(cur.block),
            nodes: Vec::new(),
            extendable,
            breakable: parent.breakable,
            continuable: parent.continuable,
            func_boundary: false,
        };
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(child);
        self.insert(cur, Node::Block(id));
        *cur = Cursor { block: id, pos: -1 };
        id
    }

    /// Emit a `_ = v` discard for every unused variable declared on one of
    /// the cursor block's own lines.
    pub fn discard_unused(&mut self, cur: &mut Cursor) {
        let unused: Vec<VarId> = self
            .block(cur.block)
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Line(l) => Some(l),
                Node::Block(_) => None,
            })
            .flat_map(|l| self.line(*l).vars.iter().copied())
            .filter(|v| !self.var(*v).used)
            .collect();
        for v in unused {
            let text = format!("_ = {}", self.var(v).name);
            self.emit(cur, text);
            self.mark_used(v);
        }
    }

    /// Seal the cursor's block with [`ScopeTree::discard_unused`], then
    /// return the cursor to the parent just after the block.
    pub fn leave(&mut self, cur: &mut Cursor) {
        self.discard_unused(cur);
        if let Some((parent, idx)) = self.index_in_parent(cur.block) {
            *cur = Cursor { block: parent, pos: idx as isize };
        }
    }

    // ----------------------------- Visibility ----------------------------- //

    /// Lines textually before the cursor, innermost block first.
    fn visible_lines(&self, cur: Cursor) -> Vec<LineId> {
        let mut out = Vec::new();
        let mut block = cur.block;
        let mut pos = cur.pos;
        loop {
            let nodes = &self.block(block).nodes;
            let end = (pos + 1).clamp(0, nodes.len() as isize) as usize;
            out.extend(nodes[..end].iter().filter_map(|n| match n {
                Node::Line(l) => Some(*l),
                Node::Block(_) => None,
            }));
            match self.index_in_parent(block) {
                Some((parent, idx)) => {
                    block = parent;
                    pos = idx as isize;
                }
                None => break,
            }
        }
        out
    }

    pub fn visible_vars(&self, cur: Cursor) -> Vec<VarId> {
        self.visible_lines(cur).iter().flat_map(|l| self.line(*l).vars.iter().copied()).collect()
    }

    pub fn visible_types(&self, cur: Cursor) -> Vec<TypeId> {
        self.visible_lines(cur).iter().flat_map(|l| self.line(*l).types.iter().copied()).collect()
    }

    // ---------------------------- Serialization --------------------------- //

    /// Depth-first text of `node`.
    pub fn collect_text(&self, node: Node, out: &mut Vec<String>) {
        match node {
            Node::Line(l) => {
                let text = &self.line(l).text;
                if !text.is_empty() {
                    out.push(text.clone());
                }
            }
            Node::Block(b) => {
                for n in &self.block(b).nodes {
                    self.collect_text(*n, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeArena;

    #[test]
    fn visibility_is_textual_order() {
        let arena = TypeArena::new();
        let int = arena.pre.int;
        let mut tree = ScopeTree::new();
        let root = tree.new_root();
        let mut cur = Cursor { block: root, pos: -1 };
        let body = tree.enter(&mut cur, true);
        let l1 = tree.emit(&mut cur, "Var1 := 1");
        let v1 = tree.declare_var(l1, Some(body), "Var1", int);
        let inner = tree.enter(&mut cur, true);
        let l2 = tree.emit(&mut cur, "Var2 := 2");
        let v2 = tree.declare_var(l2, Some(inner), "Var2", int);
        assert_eq!(tree.visible_vars(cur), vec![v2, v1]);
        tree.leave(&mut cur);
        // inner declarations disappear once the block is left
        assert_eq!(tree.visible_vars(cur), vec![v1]);
        // and the position before the first line sees nothing
        assert!(tree.visible_vars(Cursor { block: body, pos: -1 }).is_empty());
    }

    #[test]
    fn insertion_before_the_cursor_is_visible() {
        let arena = TypeArena::new();
        let mut tree = ScopeTree::new();
        let root = tree.new_root();
        let mut cur = Cursor { block: root, pos: -1 };
        let body = tree.enter(&mut cur, true);
        tree.emit(&mut cur, "a()");
        tree.emit(&mut cur, "b()");
        let mut early = Cursor { block: body, pos: 0 };
        let l = tree.emit(&mut early, "Var3 := 3");
        let v = tree.declare_var(l, Some(body), "Var3", arena.pre.int);
        let mut text = Vec::new();
        tree.collect_text(Node::Block(body), &mut text);
        assert_eq!(text, vec!["a()", "Var3 := 3", "b()"]);
        assert_eq!(tree.visible_vars(Cursor { block: body, pos: 2 }), vec![v]);
    }

    #[test]
    fn leave_discards_unused_vars() {
        let arena = TypeArena::new();
        let mut tree = ScopeTree::new();
        let root = tree.new_root();
        let mut cur = Cursor { block: root, pos: -1 };
        let body = tree.enter(&mut cur, true);
        let l = tree.emit(&mut cur, "Var1, Var2 := 1, 2");
        let v1 = tree.declare_var(l, Some(body), "Var1", arena.pre.int);
        let v2 = tree.declare_var(l, Some(body), "Var2", arena.pre.int);
        tree.mark_used(v1);
        tree.leave(&mut cur);
        assert!(tree.var(v2).used);
        let mut text = Vec::new();
        tree.collect_text(Node::Block(body), &mut text);
        assert_eq!(text, vec!["Var1, Var2 := 1, 2", "_ = Var2"]);
        assert_eq!(cur, Cursor { block: root, pos: 0 });
    }

    #[test]
    fn children_inherit_loop_flags() {
        let mut tree = ScopeTree::new();
        let root = tree.new_root();
        let mut cur = Cursor { block: root, pos: -1 };
        let outer = tree.enter(&mut cur, false);
        tree.block_mut(outer).breakable = true;
        let inner = tree.enter(&mut cur, true);
        assert!(tree.block(inner).breakable);
        assert!(!tree.block(inner).continuable);
        assert!(tree.block(inner).extendable);
        assert_eq!(tree.block(inner).parent, Some(outer));
    }
}
