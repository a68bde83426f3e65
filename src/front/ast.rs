//! The syntax tree.
//!
//! One arena (`Tree`) owns every node; nodes refer to each other through
//! [`NodeId`] indices rather than `Box`/`Rc` pointers. This is what lets the
//! symbol table and the IR hold onto tree positions (a declaration's node, a
//! branch's backpatch target) without fighting the borrow checker.

use crate::common::{Id, NodeId, ScopeId};

/// The two top-level node kinds a tree node can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Stmt(StmtKind),
    Expr(ExprKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtKind {
    Compound,
    If,
    While,
    Return,
    Read,
    Write,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    Op,
    Const,
    VarDecl,
    Var,
    ParamVar,
    ArrDecl,
    Arr,
    ParamArr,
    FuncDecl,
    FuncCall,
}

impl ExprKind {
    /// Declarations introduce a name; uses (`Var`/`Arr`/`FuncCall`) resolve one.
    pub fn is_decl(self) -> bool {
        matches!(
            self,
            ExprKind::VarDecl
                | ExprKind::ArrDecl
                | ExprKind::ParamVar
                | ExprKind::ParamArr
                | ExprKind::FuncDecl
        )
    }

    pub fn is_array(self) -> bool {
        matches!(self, ExprKind::ArrDecl | ExprKind::ParamArr | ExprKind::Arr)
    }
}

/// Semantic type, assigned by the parser for literals/operators and by the
/// analyzer for everything that resolves a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Void,
    Integer,
    Boolean,
}

/// The five arithmetic and six relational operators `Op` nodes carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl OpKind {
    pub fn is_relational(self) -> bool {
        use OpKind::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }
}

/// A node's single attribute: an operator token, an integer literal, or an
/// identifier name. Never more than one is meaningful for a given node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    None,
    Op(OpKind),
    Int(i64),
    Name(Id),
}

impl Attr {
    pub fn name(self) -> Id {
        match self {
            Attr::Name(n) => n,
            _ => panic!("node has no name attribute"),
        }
    }

    pub fn int(self) -> i64 {
        match self {
            Attr::Int(v) => v,
            _ => panic!("node has no integer attribute"),
        }
    }

    pub fn op(self) -> OpKind {
        match self {
            Attr::Op(o) => o,
            _ => panic!("node has no operator attribute"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub line: u32,
    pub kind: NodeKind,
    pub ty: ExprType,
    pub attr: Attr,
    pub children: [Option<NodeId>; 3],
    pub sibling: Option<NodeId>,

    /// Assigned by the analyzer.
    pub scope: Option<ScopeId>,
    /// Assigned by the code generator: the virtual register holding this
    /// expression's computed value.
    pub vreg: Option<u32>,
}

impl Node {
    pub fn is_decl(&self) -> bool {
        matches!(self.kind, NodeKind::Expr(k) if k.is_decl())
    }
}

/// The syntax tree: a single arena of [`Node`]s plus the id of the top-level
/// declaration list (functions and globals, linked through `sibling`).
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    pub root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Tree { nodes: Vec::new(), root: None }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn name(&self, id: NodeId) -> Id {
        self.get(id).attr.name()
    }

    /// Collects `id` and every node reachable through `sibling`, in order.
    pub fn siblings(&self, id: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = id;
        while let Some(n) = cur {
            out.push(n);
            cur = self.get(n).sibling;
        }
        out
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn stmt(&mut self, line: u32, kind: StmtKind, children: [Option<NodeId>; 3]) -> NodeId {
        self.alloc(Node {
            line,
            kind: NodeKind::Stmt(kind),
            ty: ExprType::Void,
            attr: Attr::None,
            children,
            sibling: None,
            scope: None,
            vreg: None,
        })
    }

    fn expr(
        &mut self,
        line: u32,
        kind: ExprKind,
        ty: ExprType,
        attr: Attr,
        children: [Option<NodeId>; 3],
    ) -> NodeId {
        self.alloc(Node {
            line,
            kind: NodeKind::Expr(kind),
            ty,
            attr,
            children,
            sibling: None,
            scope: None,
            vreg: None,
        })
    }

    // --- statement constructors: each enforces the structural shape §3.1
    // contracts for that variant, rather than leaving callers to place
    // children in the right slots by convention. ---

    pub fn new_compound(&mut self, line: u32, decls: Option<NodeId>, stmts: Option<NodeId>) -> NodeId {
        self.stmt(line, StmtKind::Compound, [decls, stmts, None])
    }

    pub fn new_if(&mut self, line: u32, cond: NodeId, then_body: NodeId, else_body: Option<NodeId>) -> NodeId {
        self.stmt(line, StmtKind::If, [Some(cond), Some(then_body), else_body])
    }

    pub fn new_while(&mut self, line: u32, cond: NodeId, body: NodeId) -> NodeId {
        self.stmt(line, StmtKind::While, [Some(cond), Some(body), None])
    }

    pub fn new_return(&mut self, line: u32, value: Option<NodeId>) -> NodeId {
        self.stmt(line, StmtKind::Return, [value, None, None])
    }

    pub fn new_read(&mut self, line: u32, lvalue: NodeId) -> NodeId {
        self.stmt(line, StmtKind::Read, [Some(lvalue), None, None])
    }

    pub fn new_write(&mut self, line: u32, value: NodeId) -> NodeId {
        self.stmt(line, StmtKind::Write, [Some(value), None, None])
    }

    pub fn new_assign(&mut self, line: u32, lvalue: NodeId, rvalue: NodeId) -> NodeId {
        self.stmt(line, StmtKind::Assign, [Some(lvalue), Some(rvalue), None])
    }

    // --- expression constructors ---

    pub fn new_op(&mut self, line: u32, op: OpKind, lhs: NodeId, rhs: NodeId) -> NodeId {
        let ty = if op.is_relational() { ExprType::Boolean } else { ExprType::Integer };
        self.expr(line, ExprKind::Op, ty, Attr::Op(op), [Some(lhs), Some(rhs), None])
    }

    pub fn new_const(&mut self, line: u32, val: i64) -> NodeId {
        self.expr(line, ExprKind::Const, ExprType::Integer, Attr::Int(val), [None, None, None])
    }

    pub fn new_var_decl(&mut self, line: u32, name: Id) -> NodeId {
        self.expr(line, ExprKind::VarDecl, ExprType::Integer, Attr::Name(name), [None, None, None])
    }

    /// `length` must be a `Const` node (the array's element count).
    pub fn new_arr_decl(&mut self, line: u32, name: Id, length: NodeId) -> NodeId {
        self.expr(line, ExprKind::ArrDecl, ExprType::Integer, Attr::Name(name), [Some(length), None, None])
    }

    pub fn new_param_var(&mut self, line: u32, name: Id) -> NodeId {
        self.expr(line, ExprKind::ParamVar, ExprType::Integer, Attr::Name(name), [None, None, None])
    }

    pub fn new_param_arr(&mut self, line: u32, name: Id) -> NodeId {
        self.expr(line, ExprKind::ParamArr, ExprType::Integer, Attr::Name(name), [None, None, None])
    }

    pub fn new_var(&mut self, line: u32, name: Id) -> NodeId {
        self.expr(line, ExprKind::Var, ExprType::Integer, Attr::Name(name), [None, None, None])
    }

    /// `index` is absent for a bare-array use (e.g. an array argument passed
    /// by reference); present for an indexed element access.
    pub fn new_arr(&mut self, line: u32, name: Id, index: Option<NodeId>) -> NodeId {
        self.expr(line, ExprKind::Arr, ExprType::Integer, Attr::Name(name), [index, None, None])
    }

    pub fn new_func_decl(
        &mut self,
        line: u32,
        name: Id,
        ret_ty: ExprType,
        params: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.expr(line, ExprKind::FuncDecl, ret_ty, Attr::Name(name), [params, Some(body), None])
    }

    pub fn new_func_call(&mut self, line: u32, name: Id, args: Option<NodeId>) -> NodeId {
        self.expr(line, ExprKind::FuncCall, ExprType::Void, Attr::Name(name), [args, None, None])
    }

    pub fn link_sibling(&mut self, first: NodeId, next: NodeId) {
        self.get_mut(first).sibling = Some(next);
    }
}
