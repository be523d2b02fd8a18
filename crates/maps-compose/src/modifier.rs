//! Layout hints attached to the embedded map node.
//!
//! The map binding does not lay anything out itself; the host reads these
//! operations when it places the widget.

use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub enum ModOp {
    Size { width: f32, height: f32 },
    Width(f32),
    Height(f32),
    FillMaxWidth(f32),
    FillMaxHeight(f32),
    Padding(f32),
    TestTag(String),
}

#[derive(Clone, Default)]
pub struct Modifier(Rc<Vec<ModOp>>);

impl PartialEq for Modifier {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl Modifier {
    pub fn empty() -> Self {
        Self::default()
    }

    fn with_op(op: ModOp) -> Self {
        Self(Rc::new(vec![op]))
    }

    pub fn size(width: f32, height: f32) -> Self {
        Self::with_op(ModOp::Size { width, height })
    }

    pub fn width(width: f32) -> Self {
        Self::with_op(ModOp::Width(width))
    }

    pub fn height(height: f32) -> Self {
        Self::with_op(ModOp::Height(height))
    }

    pub fn fill_max_width() -> Self {
        Self::with_op(ModOp::FillMaxWidth(1.0))
    }

    pub fn fill_max_height() -> Self {
        Self::with_op(ModOp::FillMaxHeight(1.0))
    }

    pub fn fill_max_size() -> Self {
        Self::fill_max_width().then(Self::fill_max_height())
    }

    pub fn padding(padding: f32) -> Self {
        Self::with_op(ModOp::Padding(padding))
    }

    pub fn test_tag(tag: impl Into<String>) -> Self {
        Self::with_op(ModOp::TestTag(tag.into()))
    }

    pub fn then(&self, next: Modifier) -> Modifier {
        if self.0.is_empty() {
            return next;
        }
        if next.0.is_empty() {
            return self.clone();
        }
        let mut ops = (*self.0).clone();
        ops.extend(next.0.iter().cloned());
        Modifier(Rc::new(ops))
    }

    pub fn ops(&self) -> &[ModOp] {
        &self.0
    }

    pub fn test_tag_value(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|op| match op {
            ModOp::TestTag(tag) => Some(tag.as_str()),
            _ => None,
        })
    }
}
