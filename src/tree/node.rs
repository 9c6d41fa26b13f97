use crate::value::{Map, Value};
use std::collections::BTreeMap;

/// One node of the config tree.
///
/// Directories are branches, decoded files are leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Branch(BTreeMap<String, Node>),
	Leaf(Value),
}

impl Default for Node {
	fn default() -> Self {
		Node::empty()
	}
}

impl Node {
	pub fn empty() -> Self {
		Node::Branch(BTreeMap::new())
	}

	/// Place `node` at `path`, creating branches on the way.
	///
	/// Leaves standing where a branch is needed are replaced.
	pub fn insert(&mut self, path: &[String], node: Node) {
		match path.split_last() {
			None => *self = node,
			Some((last, parents)) => {
				self.ensure_branch(parents).insert(last.clone(), node);
			}
		}
	}

	/// The children of the branch at `path`, creating it if needed.
	pub fn ensure_branch(&mut self, path: &[String]) -> &mut BTreeMap<String, Node> {
		let mut node = self;
		for component in path {
			node = node
				.make_branch()
				.entry(component.clone())
				.or_insert_with(Node::empty);
		}
		node.make_branch()
	}

	fn make_branch(&mut self) -> &mut BTreeMap<String, Node> {
		if let Node::Leaf(_) = self {
			*self = Node::empty();
		}
		match self {
			Node::Branch(children) => children,
			Node::Leaf(_) => unreachable!("leaf was just replaced by a branch"),
		}
	}

	/// The node at `path`, if every step exists.
	pub fn lookup(&self, path: &[String]) -> Option<&Node> {
		path.iter().try_fold(self, |node, component| match node {
			Node::Branch(children) => children.get(component),
			Node::Leaf(_) => None,
		})
	}

	/// Nest this node one level deeper under `name`.
	pub fn wrap(self, name: String) -> Node {
		Node::Branch(BTreeMap::from([(name, self)]))
	}

	/// Owned copy of the subtree as a value; branches become maps.
	pub fn to_value(&self) -> Value {
		match self {
			Node::Leaf(value) => value.clone(),
			Node::Branch(children) => Value::Map(
				children
					.iter()
					.map(|(name, child)| (name.clone(), child.to_value()))
					.collect::<Map>(),
			),
		}
	}
}
