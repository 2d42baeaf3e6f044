use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::value::is_blank;

/// The field name bound to a non-mapping element while a section iterates
/// over a sequence.
pub const IMPLICIT_ITEM: &str = ".";

/// How a name is matched against the scopes of a [`ScopeChain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Resolution {
	/// The first scope holding a non-empty value wins. Absent names, empty
	/// strings and `null` all fall through to the next scope.
	#[default]
	FirstNonEmpty,
	/// The first scope holding the name wins, whatever its value.
	FirstPresent,
}

impl Resolution {
	pub fn accepts(self, value: &Value) -> bool {
		match self {
			Self::FirstNonEmpty => !is_blank(value),
			Self::FirstPresent => true,
		}
	}
}

/// A single scope in a [`ScopeChain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scope<'a> {
	/// A mapping from field names to values.
	Map(&'a Map<String, Value>),
	/// A sequence element that is not a mapping, visible as `.`.
	Item(&'a Value),
}

impl<'a> Scope<'a> {
	pub fn get(&self, name: &str) -> Option<&'a Value> {
		match self {
			Self::Map(map) => map.get(name),
			Self::Item(value) => (name == IMPLICIT_ITEM).then_some(*value),
		}
	}
}

impl<'a> From<&'a Map<String, Value>> for Scope<'a> {
	fn from(map: &'a Map<String, Value>) -> Self {
		Self::Map(map)
	}
}

/// Ordered scopes consulted innermost first. Earlier scopes shadow later ones.
#[derive(Debug, Clone, Default, Deref)]
pub struct ScopeChain<'a>(Vec<Scope<'a>>);

impl<'a> ScopeChain<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	/// A chain holding a single global scope.
	pub fn global(map: &'a Map<String, Value>) -> Self {
		Self(vec![Scope::Map(map)])
	}

	/// Append a scope as the new outermost scope.
	pub fn push_outer(&mut self, scope: impl Into<Scope<'a>>) {
		self.0.push(scope.into());
	}

	/// A copy of this chain with `scope` prepended as the innermost scope.
	#[must_use]
	pub fn with_inner(&self, scope: Scope<'a>) -> Self {
		let mut scopes = Vec::with_capacity(self.0.len() + 1);
		scopes.push(scope);
		scopes.extend_from_slice(&self.0);
		Self(scopes)
	}

	/// Find `name` in the first scope whose value the policy accepts. `None`
	/// stands for the empty string.
	pub fn resolve(&self, name: &str, policy: Resolution) -> Option<&'a Value> {
		self.0
			.iter()
			.filter_map(|scope| scope.get(name))
			.find(|value| policy.accepts(value))
	}

	/// Resolve a field path such as `user.name` or `items[0]`. The head name is
	/// resolved through the chain, the remaining accessors select into the
	/// value found.
	pub fn lookup(&self, field: &str, policy: Resolution) -> Option<&'a Value> {
		let (head, accessors) = split_path(field);
		let mut value = self.resolve(head, policy)?;

		for accessor in accessors {
			value = accessor.select(value)?;
		}

		tracing::trace!(field, "resolved field");
		Some(value)
	}
}

impl<'a> FromIterator<Scope<'a>> for ScopeChain<'a> {
	fn from_iter<T: IntoIterator<Item = Scope<'a>>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accessor<'f> {
	/// `.name`
	Key(&'f str),
	/// `[index]`
	Index(&'f str),
}

impl Accessor<'_> {
	fn select<'v>(&self, value: &'v Value) -> Option<&'v Value> {
		match (self, value) {
			(Self::Key(key) | Self::Index(key), Value::Object(map)) => map.get(*key),
			(Self::Index(index), Value::Array(items)) => {
				index.trim().parse::<usize>().ok().and_then(|i| items.get(i))
			}
			_ => None,
		}
	}
}

/// Split `a.b[0]` into the head name `a` and its accessors. The implicit item
/// `.` is a head name on its own.
pub(crate) fn split_path(field: &str) -> (&str, Vec<Accessor<'_>>) {
	if field == IMPLICIT_ITEM {
		return (field, vec![]);
	}

	let head_end = field.find(['.', '[']).unwrap_or(field.len());
	let head = &field[..head_end];
	let mut rest = &field[head_end..];
	let mut accessors = vec![];

	while !rest.is_empty() {
		if let Some(after) = rest.strip_prefix('[') {
			let end = after.find(']').unwrap_or(after.len());
			accessors.push(Accessor::Index(&after[..end]));
			rest = after.get(end + 1..).unwrap_or_default();
		} else {
			let after = rest.strip_prefix('.').unwrap_or(rest);
			let end = after.find(['.', '[']).unwrap_or(after.len());
			accessors.push(Accessor::Key(&after[..end]));
			rest = &after[end..];
		}
	}

	(head, accessors)
}
