use crate::error::{Error, Result};
use nix::unistd::Pid;
use std::process::Command;
use tracing::debug;

/// Parent-to-children lookup against live kernel state.
///
/// A PID returned here is only guaranteed valid at the instant of the
/// lookup; callers must tolerate it vanishing before they act on it.
pub trait ChildLookup {
    fn children_of(&self, pid: Pid) -> Result<Vec<Pid>>;
}

/// Child lookup via `pgrep -P <pid>`.
pub struct PgrepLookup;

impl PgrepLookup {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgrepLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildLookup for PgrepLookup {
    fn children_of(&self, pid: Pid) -> Result<Vec<Pid>> {
        // pgrep exits 1 with empty stdout when nothing matches; that is
        // the childless case, not a failure
        let output = Command::new("pgrep")
            .arg("-P")
            .arg(pid.to_string())
            .output()
            .map_err(|e| Error::Tree(format!("Failed to run pgrep: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut children = Vec::new();

        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<i32>() {
                Ok(raw) => children.push(Pid::from_raw(raw)),
                Err(_) => debug!("Ignoring unparseable pgrep line: {:?}", line),
            }
        }

        Ok(children)
    }
}

/// Streaming pre-order walk over the descendants of a root process.
///
/// Each `next()` performs at most one child lookup, so a caller acting on
/// PIDs as they are discovered can stop partway without paying for the
/// full enumeration. The root itself is not yielded.
///
/// Traversal uses an explicit stack; very deep trees cannot overflow the
/// call stack. A lookup failure for a node skips that node's subtree and
/// continues with its siblings.
pub struct DescendantWalk<'a, L: ChildLookup + ?Sized> {
    lookup: &'a L,
    stack: Vec<Pid>,
}

impl<'a, L: ChildLookup + ?Sized> DescendantWalk<'a, L> {
    pub fn new(lookup: &'a L, root: Pid) -> Self {
        let mut stack = Vec::new();
        match lookup.children_of(root) {
            // Reversed so the first child is popped (and yielded) first
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => debug!("Child lookup for root {} failed: {}", root, e),
        }
        Self { lookup, stack }
    }
}

impl<L: ChildLookup + ?Sized> Iterator for DescendantWalk<'_, L> {
    type Item = Pid;

    fn next(&mut self) -> Option<Pid> {
        let pid = self.stack.pop()?;

        match self.lookup.children_of(pid) {
            Ok(children) => self.stack.extend(children.into_iter().rev()),
            Err(e) => debug!("Child lookup for {} failed, skipping subtree: {}", pid, e),
        }

        Some(pid)
    }
}

/// Collect every descendant of `root` in pre-order.
pub fn descendants<L: ChildLookup + ?Sized>(lookup: &L, root: Pid) -> Vec<Pid> {
    DescendantWalk::new(lookup, root).collect()
}
