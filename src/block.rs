//! Block-nesting tracker.
//!
//! Every open `if`/`elif` branch and every loop owns one frame. The depth of
//! the stack is the indentation level of the statements being emitted.

use crate::error::TranslateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    Loop,
}

impl BlockKind {
    pub fn closer(self) -> &'static str {
        match self {
            BlockKind::If => "fi",
            BlockKind::Loop => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: BlockKind,
    /// Keyword that opened the frame, for diagnostics.
    pub opener: String,
    pub line: usize,
    /// Set on the inner frame of an `elif`; the `fi` that closes it also
    /// closes the frame below.
    pub chained: bool,
    /// The conditional is already in its `else` branch.
    pub in_else: bool,
    /// C lines emitted right after the frame's closing brace.
    pub epilogue: Vec<String>,
}

impl Frame {
    pub fn new(kind: BlockKind, opener: &str, line: usize) -> Self {
        Self {
            kind,
            opener: opener.to_string(),
            line,
            chained: false,
            in_else: false,
            epilogue: Vec::new(),
        }
    }

    pub fn chained(mut self, chained: bool) -> Self {
        self.chained = chained;
        self
    }

    pub fn with_epilogue(mut self, epilogue: Vec<String>) -> Self {
        self.epilogue = epilogue;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BlockStack {
    frames: Vec<Frame>,
    unit: String,
}

impl BlockStack {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { frames: Vec::new(), unit: unit.into() }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Indentation for a statement at the current depth. The entry routine's
    /// body already sits one unit deep.
    pub fn prefix(&self) -> String {
        self.unit.repeat(self.frames.len() + 1)
    }

    pub fn push(&mut self, frame: Frame) {
        log::debug!("open `{}` block at depth {}", frame.opener, self.frames.len());
        self.frames.push(frame);
    }

    /// Pops the innermost frame on behalf of the closing `keyword`.
    pub fn pop(&mut self, keyword: &str) -> Result<Frame, TranslateError> {
        self.pop_innermost().ok_or_else(|| TranslateError::structural(keyword))
    }

    pub fn pop_innermost(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        log::debug!("close `{}` block at depth {}", frame.opener, self.frames.len());
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_tracks_depth() {
        let mut blocks = BlockStack::new("  ");
        assert_eq!(blocks.prefix(), "  ");
        blocks.push(Frame::new(BlockKind::If, "if", 1));
        blocks.push(Frame::new(BlockKind::Loop, "for", 2));
        assert_eq!(blocks.depth(), 2);
        assert_eq!(blocks.prefix(), "      ");
        assert_eq!(blocks.pop("done").unwrap().kind, BlockKind::Loop);
        assert_eq!(blocks.pop("fi").unwrap().kind, BlockKind::If);
        assert_eq!(blocks.depth(), 0);
    }

    #[test]
    fn popping_empty_stack_is_structural_error() {
        let mut blocks = BlockStack::new("    ");
        assert_eq!(blocks.pop("fi"), Err(TranslateError::structural("fi")));
        assert_eq!(blocks.depth(), 0);
        assert_eq!(blocks.pop_innermost(), None);
    }

    #[test]
    fn frames_keep_their_flags() {
        let mut blocks = BlockStack::new("    ");
        blocks.push(Frame::new(BlockKind::If, "if", 2));
        blocks.push(Frame::new(BlockKind::If, "elif", 4).chained(true));
        let inner = blocks.pop("fi").unwrap();
        assert!(inner.chained);
        assert_eq!(inner.line, 4);
        let outer = blocks.pop("fi").unwrap();
        assert!(!outer.chained);
    }

    #[test]
    fn epilogue_travels_with_frame() {
        let mut blocks = BlockStack::new("    ");
        blocks.push(Frame::new(BlockKind::Loop, "for", 1).with_epilogue(vec!["free(x);".into()]));
        assert_eq!(blocks.pop("done").unwrap().epilogue, vec!["free(x);".to_string()]);
    }
}
