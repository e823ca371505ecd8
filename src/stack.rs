//! Main and alternate stacks with depth and element-size limits.

use crate::{
    error::ScriptError,
    num::{cast_to_bool, ScriptNum},
};

/// The two data stacks of a running script.
///
/// Depth limits apply to the combined size of both stacks; element limits apply
/// to every value at the moment it is pushed.
#[derive(Debug, Clone)]
pub struct StackMachine {
    main: Vec<Vec<u8>>,
    alt: Vec<Vec<u8>>,
    max_depth: usize,
    max_element_size: usize,
}

impl StackMachine {
    pub fn new(max_depth: usize, max_element_size: usize) -> Self {
        Self {
            main: Vec::new(),
            alt: Vec::new(),
            max_depth,
            max_element_size,
        }
    }

    pub fn depth(&self) -> usize {
        self.main.len()
    }

    /// Main stack contents, bottom first.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.main
    }

    pub fn check_element_size(&self, len: usize) -> Result<(), ScriptError> {
        if len > self.max_element_size {
            return Err(ScriptError::ElementTooBig);
        }
        Ok(())
    }

    fn ensure_room(&self, additional: usize) -> Result<(), ScriptError> {
        if self.main.len() + self.alt.len() + additional > self.max_depth {
            return Err(ScriptError::StackOverflow);
        }
        Ok(())
    }

    pub fn push(&mut self, data: Vec<u8>) -> Result<(), ScriptError> {
        self.check_element_size(data.len())?;
        self.ensure_room(1)?;
        self.main.push(data);
        Ok(())
    }

    pub fn push_bool(&mut self, value: bool) -> Result<(), ScriptError> {
        if value {
            self.push(vec![1])
        } else {
            self.push(Vec::new())
        }
    }

    pub fn push_num(&mut self, num: ScriptNum) -> Result<(), ScriptError> {
        self.push(num.encode())
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.main.pop().ok_or(ScriptError::StackUnderflow)
    }

    pub fn pop_bool(&mut self) -> Result<bool, ScriptError> {
        Ok(cast_to_bool(&self.pop()?))
    }

    pub fn pop_num(&mut self, max_width: usize, require_minimal: bool) -> Result<ScriptNum, ScriptError> {
        let bytes = self.pop()?;
        ScriptNum::decode(&bytes, max_width, require_minimal)
    }

    /// The element `idx` positions below the top (`0` is the top).
    pub fn peek(&self, idx: usize) -> Result<&[u8], ScriptError> {
        let len = self.main.len();
        if idx >= len {
            return Err(ScriptError::StackUnderflow);
        }
        Ok(&self.main[len - 1 - idx])
    }

    pub fn peek_num(&self, idx: usize, max_width: usize, require_minimal: bool) -> Result<ScriptNum, ScriptError> {
        ScriptNum::decode(self.peek(idx)?, max_width, require_minimal)
    }

    fn require(&self, n: usize) -> Result<(), ScriptError> {
        if self.main.len() < n {
            return Err(ScriptError::StackUnderflow);
        }
        Ok(())
    }

    /// Removes the top `n` items.
    pub fn drop_n(&mut self, n: usize) -> Result<(), ScriptError> {
        self.require(n)?;
        let len = self.main.len();
        self.main.truncate(len - n);
        Ok(())
    }

    /// Duplicates the top `n` items in order.
    pub fn dup_n(&mut self, n: usize) -> Result<(), ScriptError> {
        self.require(n)?;
        self.ensure_room(n)?;
        let start = self.main.len() - n;
        for i in 0..n {
            let item = self.main[start + i].clone();
            self.main.push(item);
        }
        Ok(())
    }

    /// Copies the `n` items sitting below the top `n` onto the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), ScriptError> {
        self.require(2 * n)?;
        self.ensure_room(n)?;
        let start = self.main.len() - 2 * n;
        for i in 0..n {
            let item = self.main[start + i].clone();
            self.main.push(item);
        }
        Ok(())
    }

    /// Moves the third group of `n` items to the top.
    pub fn rot_n(&mut self, n: usize) -> Result<(), ScriptError> {
        self.require(3 * n)?;
        let start = self.main.len() - 3 * n;
        self.main[start..].rotate_left(n);
        Ok(())
    }

    /// Swaps the top two groups of `n` items.
    pub fn swap_n(&mut self, n: usize) -> Result<(), ScriptError> {
        self.require(2 * n)?;
        let start = self.main.len() - 2 * n;
        self.main[start..].rotate_left(n);
        Ok(())
    }

    /// Removes the item `idx` positions below the top.
    pub fn nip(&mut self, idx: usize) -> Result<Vec<u8>, ScriptError> {
        self.require(idx + 1)?;
        let pos = self.main.len() - 1 - idx;
        Ok(self.main.remove(pos))
    }

    /// Copies the top item below the second one.
    pub fn tuck(&mut self) -> Result<(), ScriptError> {
        self.require(2)?;
        self.ensure_room(1)?;
        let top = self.main[self.main.len() - 1].clone();
        let pos = self.main.len() - 2;
        self.main.insert(pos, top);
        Ok(())
    }

    pub fn pick(&mut self, idx: usize) -> Result<(), ScriptError> {
        let item = self.peek(idx)?.to_vec();
        self.push(item)
    }

    pub fn roll(&mut self, idx: usize) -> Result<(), ScriptError> {
        let item = self.nip(idx)?;
        self.main.push(item);
        Ok(())
    }

    pub fn to_alt(&mut self) -> Result<(), ScriptError> {
        let item = self.pop()?;
        self.alt.push(item);
        Ok(())
    }

    pub fn from_alt(&mut self) -> Result<(), ScriptError> {
        let item = self.alt.pop().ok_or(ScriptError::StackUnderflow)?;
        self.main.push(item);
        Ok(())
    }

    pub fn clear_alt(&mut self) {
        self.alt.clear();
    }

    /// Replaces the main stack, returning the previous contents.
    pub fn replace_main(&mut self, items: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        core::mem::replace(&mut self.main, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(items: &[u8]) -> StackMachine {
        let mut stack = StackMachine::new(1000, 520);
        for item in items {
            stack.push(vec![*item]).unwrap();
        }
        stack
    }

    fn contents(stack: &StackMachine) -> Vec<u8> {
        stack.items().iter().map(|item| item[0]).collect()
    }

    #[test]
    fn underflow_on_empty() {
        let mut stack = machine(&[]);
        assert_eq!(stack.pop(), Err(ScriptError::StackUnderflow));
        assert_eq!(stack.peek(0), Err(ScriptError::StackUnderflow));
        assert_eq!(stack.from_alt(), Err(ScriptError::StackUnderflow));
    }

    #[test]
    fn combined_depth_is_bounded() {
        let mut stack = StackMachine::new(3, 520);
        stack.push(vec![1]).unwrap();
        stack.push(vec![2]).unwrap();
        stack.to_alt().unwrap();
        stack.push(vec![3]).unwrap();
        assert_eq!(stack.push(vec![4]), Err(ScriptError::StackOverflow));
        assert_eq!(stack.dup_n(1), Err(ScriptError::StackOverflow));
    }

    #[test]
    fn element_size_is_bounded() {
        let mut stack = StackMachine::new(10, 4);
        assert!(stack.push(vec![0; 4]).is_ok());
        assert_eq!(stack.push(vec![0; 5]), Err(ScriptError::ElementTooBig));
    }

    #[test]
    fn group_operations() {
        let mut stack = machine(&[1, 2, 3, 4, 5, 6]);
        stack.rot_n(2).unwrap();
        assert_eq!(contents(&stack), vec![3, 4, 5, 6, 1, 2]);
        stack.swap_n(2).unwrap();
        assert_eq!(contents(&stack), vec![3, 4, 1, 2, 5, 6]);
        stack.over_n(1).unwrap();
        assert_eq!(contents(&stack), vec![3, 4, 1, 2, 5, 6, 5]);
        stack.drop_n(3).unwrap();
        stack.dup_n(2).unwrap();
        assert_eq!(contents(&stack), vec![3, 4, 1, 2, 1, 2]);
    }

    #[test]
    fn pick_roll_tuck_nip() {
        let mut stack = machine(&[1, 2, 3]);
        stack.pick(2).unwrap();
        assert_eq!(contents(&stack), vec![1, 2, 3, 1]);
        stack.roll(1).unwrap();
        assert_eq!(contents(&stack), vec![1, 2, 1, 3]);
        stack.tuck().unwrap();
        assert_eq!(contents(&stack), vec![1, 2, 3, 1, 3]);
        stack.nip(1).unwrap();
        assert_eq!(contents(&stack), vec![1, 2, 3, 3]);
        assert_eq!(stack.pick(4), Err(ScriptError::StackUnderflow));
    }
}
