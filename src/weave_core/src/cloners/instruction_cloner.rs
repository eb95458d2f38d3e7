//! InstructionCloner (§4.D): rewrites one instruction's operand by kind and
//! appends the result to the owning method's shared `MethodBodyPlan`.
//! Like `VariableCloner`, it never touches dotscope's assembler directly —
//! `MethodBodyCloner` replays the whole plan once every instruction in the
//! method has populated.

use std::rc::Rc;

use weave_il::{InstructionHandle, Operand, SourceModule};

use super::{PlannedInstruction, SharedMethodBodyPlan};
use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct InstructionCloner {
    source: InstructionHandle,
    target: InstructionHandle,
    source_module: Rc<SourceModule>,
    plan: SharedMethodBodyPlan,
}

impl InstructionCloner {
    pub fn new(source: InstructionHandle, target: InstructionHandle, source_module: Rc<SourceModule>, plan: SharedMethodBodyPlan) -> Self {
        Self { source, target, source_module, plan }
    }
}

impl Cloner for InstructionCloner {
    fn source(&self) -> Vertex {
        Vertex::Instruction(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Instruction(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.instruction_at(self.source)?;
        let operand = rewrite_operand(&info.operand, importer)?;

        let mut plan = self.plan.borrow_mut();
        let idx = self.target.index as usize;
        let planned = PlannedInstruction { mnemonic: info.mnemonic, operand };
        if plan.instructions.len() <= idx {
            plan.instructions.resize_with(idx + 1, || PlannedInstruction { mnemonic: "nop".into(), operand: Operand::None });
        }
        plan.instructions[idx] = planned;
        Ok(())
    }
}

fn rewrite_operand(op: &Operand, importer: &RootImportEngine) -> Result<Operand> {
    Ok(match op {
        // Args keep their ordinal position: the target method shell was
        // built with the same parameter count and order as the source, so
        // a slot index needs no translation.
        Operand::None | Operand::Primitive(_) | Operand::String(_) | Operand::Param(_) => op.clone(),
        Operand::Type(ts) => {
            importer.root_import_type(ts)?;
            op.clone()
        }
        Operand::Field { owner, name } => {
            importer.root_import_field(owner, name)?;
            Operand::Field { owner: owner.clone(), name: name.clone() }
        }
        Operand::Method { owner, name, signature } => {
            importer.root_import_method(owner, name, signature)?;
            Operand::Method { owner: owner.clone(), name: name.clone(), signature: signature.clone() }
        }
        Operand::Variable(v) => Operand::Variable(importer.root_import_variable(*v).unwrap_or(*v)),
        Operand::Branch(target) => Operand::Branch(importer.root_import_instruction(*target).unwrap_or(*target)),
        Operand::BranchTable(targets) => {
            Operand::BranchTable(targets.iter().map(|t| importer.root_import_instruction(*t).unwrap_or(*t)).collect())
        }
    })
}
