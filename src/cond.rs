//! Branch and loop nesting.

use crate::error::ScriptError;

/// One open `IF`/`NOTIF` or `WHILE` block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CondFrame {
    pub taken: bool,
    pub is_loop: bool,
    /// Index of the opening `WHILE`; zero for branch frames.
    pub loop_start: usize,
}

/// Stack of open blocks. An instruction executes only when every frame is taken.
#[derive(Debug, Clone, Default)]
pub struct CondStack {
    frames: Vec<CondFrame>,
}

impl CondStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_executing(&self) -> bool {
        self.frames.iter().all(|frame| frame.taken)
    }

    pub fn open_if(&mut self, taken: bool) {
        self.frames.push(CondFrame {
            taken,
            is_loop: false,
            loop_start: 0,
        });
    }

    pub fn open_while(&mut self, taken: bool, loop_start: usize) {
        self.frames.push(CondFrame {
            taken,
            is_loop: true,
            loop_start,
        });
    }

    fn innermost_branch(&mut self) -> Result<&mut CondFrame, ScriptError> {
        match self.frames.last_mut() {
            Some(frame) if !frame.is_loop => Ok(frame),
            _ => Err(ScriptError::NoIf),
        }
    }

    pub fn flip_else(&mut self) -> Result<(), ScriptError> {
        let frame = self.innermost_branch()?;
        frame.taken = !frame.taken;
        Ok(())
    }

    pub fn close_if(&mut self) -> Result<(), ScriptError> {
        self.innermost_branch()?;
        self.frames.pop();
        Ok(())
    }

    /// Pops the innermost loop frame so the caller can decide whether to jump.
    pub fn close_while(&mut self) -> Result<CondFrame, ScriptError> {
        match self.frames.last() {
            Some(frame) if frame.is_loop => {}
            _ => return Err(ScriptError::NoWhile),
        }
        self.frames.pop().ok_or(ScriptError::NoWhile)
    }

    pub fn ensure_closed(&self) -> Result<(), ScriptError> {
        if self.frames.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::MissingEnd)
        }
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_branches_gate_execution() {
        let mut cond = CondStack::new();
        assert!(cond.is_executing());
        cond.open_if(false);
        assert!(!cond.is_executing());
        cond.open_if(true);
        assert!(!cond.is_executing());
        cond.flip_else().unwrap();
        assert!(!cond.is_executing());
        cond.close_if().unwrap();
        cond.flip_else().unwrap();
        assert!(cond.is_executing());
        cond.close_if().unwrap();
        assert!(cond.ensure_closed().is_ok());
    }

    #[test]
    fn unmatched_closers() {
        let mut cond = CondStack::new();
        assert_eq!(cond.flip_else(), Err(ScriptError::NoIf));
        assert_eq!(cond.close_if(), Err(ScriptError::NoIf));
        assert_eq!(cond.close_while(), Err(ScriptError::NoWhile));
    }

    #[test]
    fn loops_and_branches_do_not_cross() {
        let mut cond = CondStack::new();
        cond.open_while(true, 4);
        assert_eq!(cond.flip_else(), Err(ScriptError::NoIf));
        assert_eq!(cond.close_if(), Err(ScriptError::NoIf));
        cond.open_if(true);
        assert_eq!(cond.close_while(), Err(ScriptError::NoWhile));
        cond.close_if().unwrap();
        let frame = cond.close_while().unwrap();
        assert!(frame.taken);
        assert_eq!(frame.loop_start, 4);
    }

    #[test]
    fn open_frames_are_reported() {
        let mut cond = CondStack::new();
        cond.open_if(true);
        assert_eq!(cond.ensure_closed(), Err(ScriptError::MissingEnd));
        cond.reset();
        assert!(cond.ensure_closed().is_ok());
    }
}
