//! The linear, doubly-linked intermediate representation (spec.md §3.3/§4.3),
//! grounded in `original_source/src/utils/ir.h`/`ir.c`'s `IRNode`/`IR`
//! structs and `ir_insert_*` family.
//!
//! The "doubly-linked list" is realized as an append-only arena (`Vec<IrNode>`
//! indexed by [`IrId`]) rather than actual `next`/`prev` pointers: nodes are
//! never reordered or removed, so adjacent arena slots already give the
//! list structure the spec describes, the same arena technique the syntax
//! tree (`front::ast::Tree`) uses for the same reason — branch/label
//! backpatching needs a stable reference into the structure that survives
//! further insertion, which an index gives for free and a linked list needs
//! unsafe code or `Rc<RefCell<_>>` to get.

use derive_more::Display;

use crate::common::Id;

use super::bitset::BitSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IrId(u32);

impl IrId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A physical machine register referenced directly, bypassing allocation
/// (spec.md §3.3: "negative register ids... bypass allocation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum MReg {
    #[display("zero")]
    Zero,
    #[display("ra")]
    Ra,
    #[display("sp")]
    Sp,
    #[display("fp")]
    Fp,
    #[display("a0")]
    A0,
    #[display("a1")]
    A1,
    #[display("a7")]
    A7,
    #[display("t0")]
    T0,
}

/// A register operand: either an unbounded-id virtual register awaiting
/// allocation, or a named machine register used directly. Rustifying the
/// original's "positive = virtual, 0 = hardware zero, negative = named
/// machine register" sentinel convention as a closed sum type rules out the
/// id-0 special case and out-of-range negative ids entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reg {
    Virtual(u32),
    Machine(MReg),
}

impl Reg {
    pub fn as_virtual(self) -> Option<u32> {
        match self {
            Reg::Virtual(id) => Some(id),
            Reg::Machine(_) => None,
        }
    }
}

/// Opcodes, grouped as spec.md §3.3 groups them. Immediate-vs-register forms
/// (`ADDI`/`ADD`, `SLLI`/`SLL`, ...) share one opcode each; which form a node
/// uses is determined by whether `src2` is present, not a separate tag —
/// `Option<Reg>` already encodes the "source-kind" spec.md calls out, so a
/// redundant enum would just be a second way to express the same fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Mov,
    Li,
    Lui,
    Auipc,
    Load,
    Store,

    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Sll,
    Sra,
    Srl,

    Jump,
    JumpReg,

    Beq,
    Bne,
    Blt,
    Ble,
    Bge,
    Bgt,

    Call,
    Ecall,

    Nop,
    Comment,
    Label,
}

impl Op {
    pub fn is_branch(self) -> bool {
        matches!(self, Op::Beq | Op::Bne | Op::Blt | Op::Ble | Op::Bge | Op::Bgt)
    }
}

/// One instruction node (spec.md §3.3's `IRNode`).
#[derive(Debug, Clone)]
pub struct IrNode {
    pub op: Op,
    pub dest: Option<Reg>,
    pub src1: Option<Reg>,
    pub src2: Option<Reg>,
    pub imm: i64,
    /// Backpatched branch/jump target, set once the destination label node
    /// exists (spec.md "Design Notes": absence means unresolved).
    pub target: Option<IrId>,
    /// The symbolic name a `LABEL`/`CALL`/`JUMP` node carries, and the free
    /// text a `COMMENT` node carries.
    pub text: Option<String>,
    pub address: u32,
    pub live_in: Option<BitSet>,
    pub live_out: Option<BitSet>,
}

impl IrNode {
    fn new(op: Op) -> Self {
        IrNode {
            op,
            dest: None,
            src1: None,
            src2: None,
            imm: 0,
            target: None,
            text: None,
            address: 0,
            live_in: None,
            live_out: None,
        }
    }
}

/// Append-only builder over the IR arena, grounded in the `IR`/`ir_insert_*`
/// API of `original_source/src/utils/ir.h`.
#[derive(Debug, Default)]
pub struct Ir {
    nodes: Vec<IrNode>,
    next_vreg: u32,
    next_if: u32,
    next_while: u32,
    last_address: u32,
}

impl Ir {
    pub fn new() -> Self {
        Ir { nodes: Vec::new(), next_vreg: 1, next_if: 0, next_while: 0, last_address: 0 }
    }

    pub fn get(&self, id: IrId) -> &IrNode {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: IrId) -> &mut IrNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate node ids in program order, i.e. the arena's implicit
    /// "next" link.
    pub fn ids(&self) -> impl Iterator<Item = IrId> {
        (0..self.nodes.len() as u32).map(IrId)
    }

    /// The next non-`COMMENT` node after `id`, if any — the default
    /// fall-through successor spec.md §4.5 requires for liveness.
    pub fn fallthrough(&self, id: IrId) -> Option<IrId> {
        let mut i = id.index() + 1;
        while i < self.nodes.len() {
            if self.nodes[i].op != Op::Comment {
                return Some(IrId(i as u32));
            }
            i += 1;
        }
        None
    }

    /// Total vreg ids handed out so far; 1-based, so this is also the size
    /// a liveness bitset/interference graph needs to accommodate.
    pub fn vreg_count(&self) -> u32 {
        self.next_vreg
    }

    pub fn new_vreg(&mut self) -> Reg {
        let id = self.next_vreg;
        self.next_vreg += 1;
        Reg::Virtual(id)
    }

    pub fn next_if_label(&mut self) -> u32 {
        let n = self.next_if;
        self.next_if += 1;
        n
    }

    pub fn next_while_label(&mut self) -> u32 {
        let n = self.next_while;
        self.next_while += 1;
        n
    }

    fn insert(&mut self, node: IrNode) -> IrId {
        let id = IrId(self.nodes.len() as u32);
        let advances_address = node.op != Op::Comment;
        let mut node = node;
        if advances_address {
            node.address = self.last_address;
            self.last_address += 4;
        }
        self.nodes.push(node);
        id
    }

    // --- data motion ---

    pub fn insert_mov(&mut self, dest: Reg, src1: Reg) -> IrId {
        self.insert(IrNode { dest: Some(dest), src1: Some(src1), ..IrNode::new(Op::Mov) })
    }

    pub fn insert_li(&mut self, dest: Reg, imm: i64) -> IrId {
        self.insert(IrNode { dest: Some(dest), imm, ..IrNode::new(Op::Li) })
    }

    pub fn insert_lui(&mut self, dest: Reg, imm: i64) -> IrId {
        self.insert(IrNode { dest: Some(dest), imm, ..IrNode::new(Op::Lui) })
    }

    pub fn insert_auipc(&mut self, dest: Reg, imm: i64) -> IrId {
        self.insert(IrNode { dest: Some(dest), imm, ..IrNode::new(Op::Auipc) })
    }

    pub fn insert_load(&mut self, dest: Reg, imm: i32, src1: Reg) -> IrId {
        self.insert(IrNode { dest: Some(dest), src1: Some(src1), imm: imm as i64, ..IrNode::new(Op::Load) })
    }

    pub fn insert_store(&mut self, src2_value: Reg, imm: i32, src1_base: Reg) -> IrId {
        self.insert(IrNode {
            src1: Some(src1_base),
            src2: Some(src2_value),
            imm: imm as i64,
            ..IrNode::new(Op::Store)
        })
    }

    // --- arithmetic/logical: register-register form ---

    fn insert_rr(&mut self, op: Op, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert(IrNode { dest: Some(dest), src1: Some(src1), src2: Some(src2), ..IrNode::new(op) })
    }

    pub fn insert_add(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Add, dest, src1, src2)
    }

    pub fn insert_sub(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Sub, dest, src1, src2)
    }

    pub fn insert_mul(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Mul, dest, src1, src2)
    }

    pub fn insert_div(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Div, dest, src1, src2)
    }

    pub fn insert_rem(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Rem, dest, src1, src2)
    }

    pub fn insert_sll(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Sll, dest, src1, src2)
    }

    pub fn insert_sra(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Sra, dest, src1, src2)
    }

    pub fn insert_srl(&mut self, dest: Reg, src1: Reg, src2: Reg) -> IrId {
        self.insert_rr(Op::Srl, dest, src1, src2)
    }

    // --- arithmetic/logical: register-immediate form ---

    fn insert_ri(&mut self, op: Op, dest: Reg, src1: Reg, imm: i32) -> IrId {
        self.insert(IrNode { dest: Some(dest), src1: Some(src1), imm: imm as i64, ..IrNode::new(op) })
    }

    pub fn insert_addi(&mut self, dest: Reg, src1: Reg, imm: i32) -> IrId {
        self.insert_ri(Op::Add, dest, src1, imm)
    }

    pub fn insert_slli(&mut self, dest: Reg, src1: Reg, imm: i32) -> IrId {
        self.insert_ri(Op::Sll, dest, src1, imm)
    }

    pub fn insert_srai(&mut self, dest: Reg, src1: Reg, imm: i32) -> IrId {
        self.insert_ri(Op::Sra, dest, src1, imm)
    }

    pub fn insert_srli(&mut self, dest: Reg, src1: Reg, imm: i32) -> IrId {
        self.insert_ri(Op::Srl, dest, src1, imm)
    }

    pub fn insert_nop(&mut self) -> IrId {
        self.insert(IrNode::new(Op::Nop))
    }

    // --- comments and labels ---

    pub fn insert_comment(&mut self, text: impl Into<String>) -> IrId {
        self.insert(IrNode { text: Some(text.into()), ..IrNode::new(Op::Comment) })
    }

    pub fn insert_label(&mut self, name: Id) -> IrId {
        self.insert(IrNode { text: Some(name.to_string()), ..IrNode::new(Op::Label) })
    }

    // --- control flow ---

    /// Returns the new node's id so the caller can backpatch `target` once
    /// the destination label exists.
    pub fn insert_jump(&mut self, label: Id) -> IrId {
        self.insert(IrNode { text: Some(label.to_string()), ..IrNode::new(Op::Jump) })
    }

    pub fn insert_jump_reg(&mut self, src1: Reg) -> IrId {
        self.insert(IrNode {
            dest: Some(Reg::Machine(MReg::Zero)),
            src1: Some(src1),
            ..IrNode::new(Op::JumpReg)
        })
    }

    /// The label name is known at emission time (codegen computes it via a
    /// counter before the destination label node exists), so it's recorded
    /// immediately; only the numeric `target` id needs backpatching once the
    /// label node itself is inserted, via [`Ir::set_target`].
    fn insert_branch(&mut self, op: Op, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert(IrNode {
            src1: Some(src1),
            src2: Some(src2),
            text: Some(label.to_string()),
            ..IrNode::new(op)
        })
    }

    pub fn insert_beq(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Beq, src1, src2, label)
    }

    pub fn insert_bne(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Bne, src1, src2, label)
    }

    pub fn insert_blt(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Blt, src1, src2, label)
    }

    pub fn insert_ble(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Ble, src1, src2, label)
    }

    pub fn insert_bge(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Bge, src1, src2, label)
    }

    pub fn insert_bgt(&mut self, src1: Reg, src2: Reg, label: Id) -> IrId {
        self.insert_branch(Op::Bgt, src1, src2, label)
    }

    /// Backpatch a previously emitted branch/jump node's target, once the
    /// destination label node has been inserted.
    pub fn set_target(&mut self, branch: IrId, label: IrId) {
        self.get_mut(branch).target = Some(label);
    }

    // --- calls ---

    pub fn insert_call(&mut self, label: Id) -> IrId {
        self.insert(IrNode { text: Some(label.to_string()), ..IrNode::new(Op::Call) })
    }

    pub fn insert_ecall(&mut self) -> IrId {
        self.insert(IrNode::new(Op::Ecall))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_advance_by_four_and_skip_comments() {
        let mut ir = Ir::new();
        let r = ir.new_vreg();
        let a = ir.insert_li(r, 1);
        let _c = ir.insert_comment("a comment");
        let b = ir.insert_li(r, 2);
        assert_eq!(ir.get(a).address, 0);
        assert_eq!(ir.get(b).address, 4);
    }

    #[test]
    fn vreg_ids_start_at_one_and_increase() {
        let mut ir = Ir::new();
        assert_eq!(ir.new_vreg(), Reg::Virtual(1));
        assert_eq!(ir.new_vreg(), Reg::Virtual(2));
        assert_eq!(ir.vreg_count(), 3);
    }

    #[test]
    fn backpatch_sets_target_and_label_text() {
        let mut ir = Ir::new();
        let r1 = ir.new_vreg();
        let r2 = ir.new_vreg();
        let label_name = internment::Intern::new("end_if_0".to_string());
        let branch = ir.insert_beq(r1, r2, label_name);
        let label = ir.insert_label(label_name);
        ir.set_target(branch, label);
        assert_eq!(ir.get(branch).target, Some(label));
        assert_eq!(ir.get(branch).text.as_deref(), Some("end_if_0"));
    }

    #[test]
    fn fallthrough_skips_comments() {
        let mut ir = Ir::new();
        let a = ir.insert_nop();
        let _ = ir.insert_comment("skip me");
        let b = ir.insert_nop();
        assert_eq!(ir.fallthrough(a), Some(b));
    }
}
