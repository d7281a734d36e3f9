use super::Object;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A trie over integer OID arcs. Lookups return the deepest matching node
/// plus the unmatched arc tail (the "residual"), so a varbind OID that
/// extends a known table column can still be located by its parent.
#[derive(Default)]
pub struct OidTree {
    root: Node,
}

#[derive(Default)]
struct Node {
    object: Option<Rc<RefCell<Object>>>,
    children: BTreeMap<u32, Node>,
}

impl OidTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `object` at `arcs`. If a node already holds an object the new
    /// one overwrites it (documented last-write-wins, see DESIGN.md).
    pub fn insert(&mut self, arcs: &[u32], object: Rc<RefCell<Object>>) {
        let mut node = &mut self.root;
        for arc in arcs {
            node = node.children.entry(*arc).or_default();
        }
        node.object = Some(object);
    }

    /// Longest-prefix match: returns the deepest node on `oid`'s path that
    /// carries an Object, plus everything after it.
    pub fn find(&self, oid: &[u32]) -> (Option<Rc<RefCell<Object>>>, Vec<u32>) {
        let mut node = &self.root;
        let mut best: Option<(Rc<RefCell<Object>>, usize)> = None;
        for (i, arc) in oid.iter().enumerate() {
            match node.children.get(arc) {
                Some(child) => {
                    node = child;
                    if let Some(obj) = &node.object {
                        best = Some((obj.clone(), i + 1));
                    }
                }
                None => break,
            }
        }
        match best {
            Some((obj, consumed)) => (Some(obj), oid[consumed..].to_vec()),
            None => (None, oid.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    fn obj(name: &str) -> Rc<RefCell<Object>> {
        Rc::new(RefCell::new(Object {
            source: Position::eof("t"),
            name: name.to_string(),
            module: "t".to_string(),
            elements: Vec::new(),
            arcs: None,
            meta: None,
            metadata: Default::default(),
        }))
    }

    #[test]
    fn exact_match_has_empty_residual() {
        let mut tree = OidTree::new();
        let o = obj("foo");
        tree.insert(&[1, 3, 6], o.clone());
        let (found, residual) = tree.find(&[1, 3, 6]);
        assert!(found.is_some());
        assert!(residual.is_empty());
    }

    #[test]
    fn prefix_match_returns_residual() {
        let mut tree = OidTree::new();
        tree.insert(&[1, 3, 6], obj("foo"));
        let (found, residual) = tree.find(&[1, 3, 6, 5, 6]);
        assert!(found.is_some());
        assert_eq!(residual, vec![5, 6]);
    }

    #[test]
    fn later_insert_wins_on_collision() {
        let mut tree = OidTree::new();
        tree.insert(&[1, 2], obj("first"));
        tree.insert(&[1, 2], obj("second"));
        let (found, _) = tree.find(&[1, 2]);
        assert_eq!(found.unwrap().borrow().name, "second");
    }
}
