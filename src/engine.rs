//! The execution engine.
//!
//! A verification runs the unlocking script, then the locking script, then
//! (for pay-to-script-hash spends) the redeem script popped from the stack the
//! unlocking script left behind. All scripts are decoded up front; execution
//! walks the decoded ops by index so loops can jump backwards.

mod ops;

use bitcoin::Transaction;
use log::{debug, trace};

use crate::{
    cond::CondStack,
    config::{LoopOpCounting, ScriptConfig, ScriptFlags},
    error::ScriptError,
    num::cast_to_bool,
    opcode::Opcode,
    parser::{disasm_ops, ops_push_only, parse_script, ParsedOp},
    sigcheck::SignatureChecker,
    stack::StackMachine,
};

/// Phase names, indexed by script position.
const PHASES: [&str; 3] = ["unlocking", "locking", "redeem"];

/// Interpreter state for one input of one transaction.
pub struct Engine<'tx> {
    scripts: Vec<Vec<ParsedOp>>,
    script_idx: usize,
    pc: usize,
    last_separator: usize,
    stack: StackMachine,
    cond: CondStack,
    saved_stack: Option<Vec<Vec<u8>>>,
    bip16: bool,
    num_ops: usize,
    /// First op index not yet reached in the current script.
    furthest: usize,
    iterations: usize,
    op_fresh: bool,
    done: bool,
    flags: ScriptFlags,
    config: ScriptConfig,
    tx: &'tx Transaction,
    input_index: usize,
    checker: SignatureChecker<'tx>,
}

impl<'tx> Engine<'tx> {
    /// Prepares verification of input `input_index` of `tx`: parses both
    /// scripts, checks the script size limits and, when `P2SH` is set and the
    /// locking script is a script-hash template, arms the redeem phase.
    pub fn new(
        tx: &'tx Transaction,
        input_index: usize,
        locking_script: &[u8],
        unlocking_script: &[u8],
        flags: ScriptFlags,
        config: ScriptConfig,
    ) -> Result<Self, ScriptError> {
        if input_index >= tx.input.len() {
            return Err(ScriptError::InvalidIndex);
        }

        let unlocking = parse_script(unlocking_script, config.max_script_size)?;
        let locking = parse_script(locking_script, config.max_script_size)?;

        let bip16 = flags.p2sh() && is_pay_to_script_hash(locking_script);
        if bip16 && flags.p2sh_push_only() && !ops_push_only(&unlocking) {
            return Err(ScriptError::P2shNonPushOnly);
        }

        Ok(Self {
            scripts: vec![unlocking, locking],
            script_idx: 0,
            pc: 0,
            last_separator: 0,
            stack: StackMachine::new(config.max_stack_size, config.max_element_size),
            cond: CondStack::new(),
            saved_stack: None,
            bip16,
            num_ops: 0,
            furthest: 0,
            iterations: 0,
            op_fresh: true,
            done: false,
            flags,
            config,
            tx,
            input_index,
            checker: SignatureChecker::new(tx, input_index, flags),
        })
    }

    /// Runs every phase to completion and returns the verdict.
    pub fn execute(&mut self) -> Result<(), ScriptError> {
        while !self.step()? {}
        self.check_error_condition()
    }

    /// Executes one op. Returns `true` once every script has finished.
    pub fn step(&mut self) -> Result<bool, ScriptError> {
        self.advance_scripts()?;
        if self.done {
            return Ok(true);
        }

        let op = self.scripts[self.script_idx][self.pc].clone();
        trace!(
            "{}:{:04x} {} (stack depth {})",
            PHASES[self.script_idx.min(2)],
            self.pc,
            op,
            self.stack.depth()
        );
        self.execute_op(&op)?;

        self.advance_scripts()?;
        Ok(self.done)
    }

    /// Final verdict. Fails with `ScriptUnfinished` until every phase has run.
    pub fn check_error_condition(&self) -> Result<(), ScriptError> {
        if !self.done {
            return Err(ScriptError::ScriptUnfinished);
        }
        self.check_top_truthy()?;
        if self.flags.clean_stack() && self.stack.depth() != 1 {
            return Err(ScriptError::CleanStack);
        }
        Ok(())
    }

    /// Disassembly of the op about to run.
    pub fn disasm_pc(&self) -> Result<String, ScriptError> {
        let op = self
            .scripts
            .get(self.script_idx)
            .and_then(|ops| ops.get(self.pc))
            .ok_or(ScriptError::InvalidScriptIndex)?;
        Ok(format!("{:02x}:{:04x}: {}", self.script_idx, self.pc, op))
    }

    /// Disassembly of one loaded script, one op per line.
    pub fn disasm_script(&self, index: usize) -> Result<String, ScriptError> {
        let ops = self
            .scripts
            .get(index)
            .ok_or(ScriptError::InvalidScriptIndex)?;
        let mut out = String::new();
        for (pc, op) in ops.iter().enumerate() {
            out.push_str(&format!("{index:02x}:{pc:04x}: {op}\n"));
        }
        Ok(out)
    }

    /// Current main stack, bottom first.
    pub fn stack(&self) -> &[Vec<u8>] {
        self.stack.items()
    }

    /// Operations charged against `max_ops` so far, across all phases.
    pub fn num_ops(&self) -> usize {
        self.num_ops
    }

    /// Whether the locking script is a script-hash template and the redeem
    /// phase will run.
    pub fn is_pay_to_script_hash(&self) -> bool {
        self.bip16
    }

    /// True once every phase has executed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn execute_op(&mut self, op: &ParsedOp) -> Result<(), ScriptError> {
        let opcode = op.opcode;

        if opcode.is_disabled() {
            return Err(ScriptError::DisabledOpcode);
        }
        if opcode.is_always_illegal() {
            return Err(ScriptError::ReservedOpcode);
        }

        self.op_fresh = match self.config.loop_ops {
            LoopOpCounting::EveryIteration => true,
            LoopOpCounting::FirstPassOnly { .. } => self.pc >= self.furthest,
        };
        if self.op_fresh {
            self.furthest = self.pc + 1;
            if opcode.counts_toward_op_limit() {
                self.add_ops(1)?;
            }
        }

        self.stack.check_element_size(op.data.len())?;

        if self.flags.script_version() && opcode.min_script_version() > self.tx.version.0 {
            return Err(ScriptError::ScriptVersion);
        }

        let executing = self.cond.is_executing();
        if !executing && !opcode.is_conditional() {
            self.pc += 1;
            return Ok(());
        }

        if executing && opcode.is_data_push() && self.flags.minimal_data() && !op.is_minimal_push() {
            return Err(ScriptError::MinimalData);
        }

        match self.dispatch(op)? {
            Some(target) => self.jump_back(target)?,
            None => self.pc += 1,
        }
        Ok(())
    }

    fn jump_back(&mut self, target: usize) -> Result<(), ScriptError> {
        if let LoopOpCounting::FirstPassOnly { max_iterations } = self.config.loop_ops {
            self.iterations += 1;
            if self.iterations > max_iterations {
                return Err(ScriptError::TooManyOperations);
            }
        }
        self.pc = target;
        Ok(())
    }

    fn add_ops(&mut self, count: usize) -> Result<(), ScriptError> {
        self.num_ops += count;
        if self.num_ops > self.config.max_ops {
            return Err(ScriptError::TooManyOperations);
        }
        Ok(())
    }

    /// Moves past finished scripts, running the between-phase bookkeeping.
    fn advance_scripts(&mut self) -> Result<(), ScriptError> {
        while !self.done && self.pc >= self.scripts[self.script_idx].len() {
            self.finish_script()?;
        }
        Ok(())
    }

    fn finish_script(&mut self) -> Result<(), ScriptError> {
        self.cond.ensure_closed()?;
        self.cond.reset();
        self.stack.clear_alt();
        self.pc = 0;
        self.last_separator = 0;
        self.furthest = 0;

        match self.script_idx {
            0 if self.bip16 => {
                self.saved_stack = Some(self.stack.items().to_vec());
            }
            1 if self.bip16 => {
                self.check_top_truthy()?;
                let mut saved = self.saved_stack.take().unwrap_or_default();
                let redeem = saved.pop().ok_or(ScriptError::StackUnderflow)?;
                let ops = parse_script(&redeem, self.config.max_script_size)?;
                debug!("pay-to-script-hash redeem script: {}", disasm_ops(&ops));
                self.scripts.push(ops);
                self.stack.replace_main(saved);
            }
            _ => {}
        }

        self.script_idx += 1;
        if self.script_idx >= self.scripts.len() {
            self.done = true;
            debug!(
                "script execution finished after {} ops, stack depth {}",
                self.num_ops,
                self.stack.depth()
            );
        } else {
            debug!("entering {} phase", PHASES[self.script_idx.min(2)]);
        }
        Ok(())
    }

    fn check_top_truthy(&self) -> Result<(), ScriptError> {
        let top = self.stack.peek(0).map_err(|_| ScriptError::EmptyStack)?;
        if !cast_to_bool(top) {
            return Err(ScriptError::ScriptFailed);
        }
        Ok(())
    }
}

/// `HASH160 <20 bytes> EQUAL`.
pub(crate) fn is_pay_to_script_hash(script: &[u8]) -> bool {
    script.len() == 23
        && script[0] == Opcode::OP_HASH160.to_u8()
        && script[1] == Opcode::OP_DATA_20.to_u8()
        && script[22] == Opcode::OP_EQUAL.to_u8()
}
