use crate::analysis::topology;
use crate::compute::error::ComputationError;
use crate::store::{Access, KindTag, NodeId, Registry};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Evaluate a parameter at the new step.
    Parameter,
    /// Call converter logic.
    Convert,
    /// Call flow logic; the result is also a stock transfer.
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub source: NodeId,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub node: NodeId,
    pub op: OpCode,
    pub operands: SmallVec<[Operand; 4]>,
}

/// A flow's effect on its endpoints. `None` marks a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub flow: NodeId,
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
}

/// The per-step execution tape derived from a registry's structure.
///
/// A plan depends only on the structure captured by `fingerprint`, so it can
/// be shared by every registry with the same fingerprint.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// The topological execution order (stocks included).
    pub order: Vec<NodeId>,
    /// One instruction per parameter, converter and flow, in `order`.
    pub instructions: Vec<Instruction>,
    /// Flow transfers, in execution order.
    pub transfers: Vec<Transfer>,
    /// Every stock, in declaration order.
    pub stocks: Vec<NodeId>,
    pub fingerprint: u64,
}

impl Plan {
    pub fn is_compatible(&self, registry: &Registry) -> bool { self.fingerprint == topology::fingerprint(registry) }
}

pub struct Compiler<'a> {
    registry: &'a Registry,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Orders the graph and lowers it into a linear program.
    pub fn compile(&self) -> Result<Plan, ComputationError> {
        let order = topology::build_order(self.registry)?;
        let mut instructions = Vec::with_capacity(order.len());
        let mut transfers = Vec::new();

        for &node in &order {
            let Some(op) = self.opcode(node)? else {
                continue;
            };

            let operands = self
                .registry
                .get_inputs(node)
                .map(|(source, access)| Operand { source, access })
                .collect();
            instructions.push(Instruction { node, op, operands });

            if op == OpCode::Flow {
                if let Some((from, to)) = self.registry.endpoints(node) {
                    transfers.push(Transfer { flow: node, from: self.stock_or_none(from), to: self.stock_or_none(to) });
                }
            }
        }

        let stocks = self.registry.ids().filter(|&id| self.registry.tag(id) == KindTag::Stock).collect();

        let plan = Plan { order, instructions, transfers, stocks, fingerprint: topology::fingerprint(self.registry) };
        tracing::info!(
            nodes = self.registry.count(),
            instructions = plan.instructions.len(),
            transfers = plan.transfers.len(),
            "compiled evaluation plan"
        );
        Ok(plan)
    }

    /// `None` for stocks, which are carried forward without an instruction.
    fn opcode(&self, node: NodeId) -> Result<Option<OpCode>, ComputationError> {
        match self.registry.tag(node) {
            KindTag::Parameter => Ok(Some(OpCode::Parameter)),
            KindTag::Converter => Ok(Some(OpCode::Convert)),
            KindTag::Flow => Ok(Some(OpCode::Flow)),
            KindTag::Stock => Ok(None),
            tag @ (KindTag::Unit | KindTag::Boundary) => Err(ComputationError::InvalidReference {
                node: self.registry.key(node).to_string(),
                reference: format!("{} node", tag),
                role: "an evaluated node",
                expected: "a parameter, converter, flow or stock",
            }),
        }
    }

    fn stock_or_none(&self, id: NodeId) -> Option<NodeId> {
        (self.registry.tag(id) == KindTag::Stock).then_some(id)
    }
}
