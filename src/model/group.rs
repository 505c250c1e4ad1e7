//! Shape groups and their one-time prepare pass.

use crate::foundation::core::BlendMode;
use crate::model::object::{Object, ObjectKind, Transform};

/// Ordered list of shape-tree children with flags computed at prepare time.
#[derive(Clone, Debug)]
pub struct Group {
    /// Document name.
    pub name: Option<String>,
    /// Children in document order (topmost first).
    pub children: Vec<Object>,
    /// Blend mode applied when the group is composited.
    pub blend: BlendMode,
    /// Hidden groups are skipped by the builder.
    pub hidden: bool,
    kind: ObjectKind,
    visible: bool,
    allow_merge: bool,
    requires_fragment: bool,
    trimpath: bool,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: None,
            children: Vec::new(),
            blend: BlendMode::Normal,
            hidden: false,
            kind: ObjectKind::Group,
            visible: false,
            allow_merge: true,
            requires_fragment: false,
            trimpath: false,
        }
    }
}

impl Group {
    /// Group over `children`. Flags stay at their defaults until [`Group::prepare`].
    pub fn new(children: Vec<Object>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// `Group`, or `Layer` for a layer's root group.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// `true` when some descendant draws something.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// `true` when the group can share its parent's drawing context.
    pub fn allow_merge(&self) -> bool {
        self.allow_merge
    }

    /// `true` when the group must draw into its own context so overlapping strokes and
    /// fills keep their order.
    pub fn requires_fragment(&self) -> bool {
        self.requires_fragment
    }

    /// `true` when a direct child is a trim-path modifier.
    pub fn has_trimpath(&self) -> bool {
        self.trimpath
    }

    /// The group's own transform child, if any.
    pub fn transform(&self) -> Option<&Transform> {
        self.children.iter().rev().find_map(|c| match c {
            Object::Transform(t) => Some(t),
            _ => None,
        })
    }

    /// Classify the children once, deepest groups first.
    ///
    /// Nested groups are prepared before their parent reads their flags. Run it once per
    /// group: the trim reorder is not idempotent.
    pub fn prepare(&mut self, kind: ObjectKind) {
        self.kind = kind;
        for child in &mut self.children {
            if let Object::Group(g) = child {
                g.prepare(ObjectKind::Group);
            }
        }
        if self.children.is_empty() {
            return;
        }

        let mut strokes = 0usize;
        let mut fills = 0usize;

        for child in self.children.iter().rev() {
            let ckind = child.kind();
            if ckind == ObjectKind::Trimpath {
                self.trimpath = true;
            }

            if self.allow_merge && (child.is_group() || !child.mergeable()) {
                self.allow_merge = false;
            }

            match child {
                Object::Group(g) => self.visible |= g.visible,
                Object::Rect(_)
                | Object::Ellipse(_)
                | Object::Path(_)
                | Object::Polystar(_)
                | Object::Image(_)
                | Object::Text(_) => self.visible = true,
                _ => {}
            }

            if self.requires_fragment {
                continue;
            }

            match ckind {
                _ if child.is_group() && !child.mergeable() => {
                    if strokes > 0 || fills > 0 {
                        self.requires_fragment = true;
                    }
                }
                ObjectKind::SolidStroke | ObjectKind::GradientStroke => {
                    if strokes > 0 {
                        self.requires_fragment = true;
                    } else {
                        strokes += 1;
                    }
                }
                ObjectKind::SolidFill | ObjectKind::GradientFill => {
                    if fills > 0 {
                        self.requires_fragment = true;
                    } else {
                        fills += 1;
                    }
                }
                _ => {}
            }
        }

        if self.trimpath {
            self.reorder_for_trim();
        }
    }

    /// Rotate runs of mergeable, non-transform children so trimmed strokes draw in the
    /// order the trim expects.
    fn reorder_for_trim(&mut self) {
        let n = self.children.len();
        let movable = |o: &Object| o.mergeable() && o.kind() != ObjectKind::Transform;
        let mut i = 0;
        while i + 1 < n {
            if !movable(&self.children[i + 1]) {
                i += 2;
                continue;
            }
            if !movable(&self.children[i]) {
                i += 1;
                continue;
            }
            self.children.swap(i, i + 1);
            i += 1;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/group.rs"]
mod tests;
