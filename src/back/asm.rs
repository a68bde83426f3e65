//! The textual RISC-V (rv32i+M) emitter (spec.md §4.6), grounded in
//! `original_source/src/utils/object_code.c`'s per-opcode format strings.
//!
//! Walks the IR once, in program order, mapping every [`Reg::Virtual`]
//! through the [`ColorMap`] the register allocator produced into one of a
//! 7-slot `t0`..`t6` temp-name table (spec.md reserves all seven even though
//! [`super::regalloc::DEFAULT_K`] only hands out four); [`Reg::Machine`]
//! operands print their fixed name directly.

use super::ir::{Ir, IrNode, Op, Reg};
use super::regalloc::ColorMap;

const TEMP_NAMES: [&str; 7] = ["t0", "t1", "t2", "t3", "t4", "t5", "t6"];

fn reg_name(reg: Reg, colors: &ColorMap) -> String {
    match reg {
        Reg::Machine(m) => m.to_string(),
        Reg::Virtual(id) => {
            let color = colors.get(&id).unwrap_or_else(|| panic!("vreg {id} was never colored"));
            TEMP_NAMES[*color].to_string()
        }
    }
}

/// Emits one line per non-`COMMENT` node (`LABEL` nodes additionally get a
/// blank line before them, the usual assembly-listing convention); `COMMENT`
/// nodes are only emitted when `comments` is set, matching the `--tc` trace
/// flag.
pub fn emit(ir: &Ir, colors: &ColorMap, comments: bool) -> String {
    let mut out = String::new();
    for id in ir.ids() {
        let node = ir.get(id);
        match node.op {
            Op::Comment => {
                if comments {
                    out.push_str("    # ");
                    out.push_str(node.text.as_deref().unwrap_or(""));
                    out.push('\n');
                }
            }
            Op::Label => {
                out.push('\n');
                out.push_str(node.text.as_deref().expect("label node always carries a name"));
                out.push_str(":\n");
            }
            _ => {
                out.push_str("    ");
                out.push_str(&emit_instruction(colors, node));
                out.push('\n');
            }
        }
    }
    out
}

fn emit_instruction(colors: &ColorMap, node: &IrNode) -> String {
    let r = |reg: Reg| reg_name(reg, colors);
    match node.op {
        Op::Mov => format!("mv {}, {}", r(node.dest.unwrap()), r(node.src1.unwrap())),
        Op::Li => format!("li {}, {}", r(node.dest.unwrap()), node.imm),
        Op::Lui => format!("lui {}, {}", r(node.dest.unwrap()), node.imm),
        Op::Auipc => format!("auipc {}, {}", r(node.dest.unwrap()), node.imm),
        Op::Load => format!("lw {}, {}({})", r(node.dest.unwrap()), node.imm, r(node.src1.unwrap())),
        Op::Store => format!("sw {}, {}({})", r(node.src2.unwrap()), node.imm, r(node.src1.unwrap())),

        Op::Add => arith(node, &r, "add", "addi"),
        Op::Sub => arith(node, &r, "sub", "addi"),
        // MUL/DIV/REM are M-extension register-register-only instructions;
        // the IR never builds an immediate form for them (no `insert_muli`
        // exists), so the immediate-form mnemonic here is unreachable.
        Op::Mul => arith(node, &r, "mul", "mul"),
        Op::Div => arith(node, &r, "div", "div"),
        Op::Rem => arith(node, &r, "rem", "rem"),
        Op::Sll => arith(node, &r, "sll", "slli"),
        Op::Sra => arith(node, &r, "sra", "srai"),
        Op::Srl => arith(node, &r, "srl", "srli"),

        Op::Jump => format!("j {}", node.text.as_deref().unwrap()),
        Op::JumpReg => format!("jalr {}, {}, 0", r(node.dest.unwrap()), r(node.src1.unwrap())),

        Op::Beq => branch(node, &r, "beq"),
        Op::Bne => branch(node, &r, "bne"),
        Op::Blt => branch(node, &r, "blt"),
        Op::Ble => branch(node, &r, "ble"),
        Op::Bge => branch(node, &r, "bge"),
        Op::Bgt => branch(node, &r, "bgt"),

        Op::Call => format!("call {}", node.text.as_deref().unwrap()),
        Op::Ecall => "ecall".to_string(),
        Op::Nop => "nop".to_string(),
        Op::Comment | Op::Label => unreachable!("handled by the caller before reaching emit_instruction"),
    }
}

/// `ADD`/`ADDI` and friends share one [`Op`] each; `src2` being present is
/// the register-form signal, matching how the IR builder records it.
fn arith(node: &IrNode, r: &impl Fn(Reg) -> String, rr_mnemonic: &str, ri_mnemonic: &str) -> String {
    let dest = r(node.dest.unwrap());
    let src1 = r(node.src1.unwrap());
    match node.src2 {
        Some(src2) => format!("{rr_mnemonic} {dest}, {src1}, {}", r(src2)),
        None => format!("{ri_mnemonic} {dest}, {src1}, {}", node.imm),
    }
}

fn branch(node: &IrNode, r: &impl Fn(Reg) -> String, mnemonic: &str) -> String {
    format!("{mnemonic} {}, {}, {}", r(node.src1.unwrap()), r(node.src2.unwrap()), node.text.as_deref().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Map;

    #[test]
    fn register_form_add_and_immediate_form_addi_differ() {
        let mut ir = Ir::new();
        let r1 = ir.new_vreg();
        let r2 = ir.new_vreg();
        ir.insert_add(r1, r2, r2);
        ir.insert_addi(r1, r2, 4);
        let mut colors: ColorMap = Map::new();
        colors.insert(1, 0);
        colors.insert(2, 1);
        let text = emit(&ir, &colors, false);
        assert!(text.contains("add t0, t1, t1"));
        assert!(text.contains("addi t0, t1, 4"));
    }

    #[test]
    fn machine_registers_print_their_fixed_name() {
        let mut ir = Ir::new();
        ir.insert_ecall();
        let colors: ColorMap = Map::new();
        let text = emit(&ir, &colors, false);
        assert!(text.contains("ecall"));
    }

    #[test]
    fn labels_get_a_leading_blank_line_and_a_colon() {
        let mut ir = Ir::new();
        ir.insert_label(internment::Intern::new("end_if_0".to_string()));
        let colors: ColorMap = Map::new();
        let text = emit(&ir, &colors, false);
        assert_eq!(text, "\nend_if_0:\n");
    }

    #[test]
    fn comments_are_suppressed_unless_requested() {
        let mut ir = Ir::new();
        ir.insert_comment("a note");
        let colors: ColorMap = Map::new();
        assert_eq!(emit(&ir, &colors, false), "");
        assert_eq!(emit(&ir, &colors, true), "    # a note\n");
    }
}
