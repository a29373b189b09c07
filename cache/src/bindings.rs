use std::fmt;
use std::hash::{Hash, Hasher};

use crate::value::Value;

/// The concrete parameter values that identify one cached query result.
///
/// Bindings remember insertion order, which is the order their locks are
/// acquired in. Equality and hashing ignore that order: a reader that bound
/// `phone` before `city` and a writer that bound `city` before `phone` address
/// the same secondary index entry.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
  feature = "serde",
  serde(from = "Vec<(String, Value)>", into = "Vec<(String, Value)>")
)]
pub struct ParameterBindings {
  entries: Vec<(String, Value)>,
}

impl ParameterBindings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
    }
  }

  /// Builder-style [`set`](Self::set).
  pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.set(name, value);
    self
  }

  /// Binds `name` to `value`, returning the previous value.
  ///
  /// Rebinding a name keeps its original position.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    let name = name.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
      Some((_, slot)) => Some(std::mem::replace(slot, value)),
      None => {
        self.entries.push((name, value));
        None
      }
    }
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self
      .entries
      .iter()
      .find(|(existing, _)| existing == name)
      .map(|(_, value)| value)
  }

  pub fn remove(&mut self, name: &str) -> Option<Value> {
    let position = self.entries.iter().position(|(existing, _)| existing == name)?;
    Some(self.entries.remove(position).1)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Iterates `(name, value)` pairs in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(name, value)| (name.as_str(), value))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(name, _)| name.as_str())
  }

  fn sorted(&self) -> Vec<&(String, Value)> {
    let mut sorted: Vec<_> = self.entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
  }
}

impl PartialEq for ParameterBindings {
  fn eq(&self, other: &Self) -> bool {
    // Names are unique within one bindings set.
    self.len() == other.len()
      && self
        .entries
        .iter()
        .all(|(name, value)| other.get(name) == Some(value))
  }
}

impl Eq for ParameterBindings {}

impl Hash for ParameterBindings {
  fn hash<H: Hasher>(&self, state: &mut H) {
    let sorted = self.sorted();
    state.write_usize(sorted.len());
    for (name, value) in sorted {
      name.hash(state);
      value.hash(state);
    }
  }
}

impl fmt::Debug for ParameterBindings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.iter()).finish()
  }
}

impl fmt::Display for ParameterBindings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (name, value)) in self.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{name}={value}")?;
    }
    write!(f, "}}")
  }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for ParameterBindings {
  fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
    let mut bindings = ParameterBindings::new();
    for (name, value) in iter {
      bindings.set(name, value);
    }
    bindings
  }
}

/// Later pairs rebind earlier ones with the same name.
impl From<Vec<(String, Value)>> for ParameterBindings {
  fn from(pairs: Vec<(String, Value)>) -> Self {
    pairs.into_iter().collect()
  }
}

impl From<ParameterBindings> for Vec<(String, Value)> {
  fn from(bindings: ParameterBindings) -> Self {
    bindings.entries
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::hash_map::DefaultHasher;

  fn hash_of(bindings: &ParameterBindings) -> u64 {
    let mut hasher = DefaultHasher::new();
    bindings.hash(&mut hasher);
    hasher.finish()
  }

  #[test]
  fn equality_and_hash_ignore_insertion_order() {
    let a = ParameterBindings::new().with("phone", "123").with("city", "Tver");
    let b = ParameterBindings::new().with("city", "Tver").with("phone", "123");

    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert_eq!(a.names().collect::<Vec<_>>(), vec!["phone", "city"]);
    assert_eq!(b.names().collect::<Vec<_>>(), vec!["city", "phone"]);
  }

  #[test]
  fn differing_values_or_names_are_not_equal() {
    let base = ParameterBindings::new().with("phone", "123");
    assert_ne!(base, ParameterBindings::new().with("phone", "124"));
    assert_ne!(base, ParameterBindings::new().with("mobile", "123"));
    assert_ne!(base, base.clone().with("city", "Tver"));
  }

  #[test]
  fn rebinding_keeps_position() {
    let mut bindings = ParameterBindings::new().with("a", 1).with("b", 2);
    assert_eq!(bindings.set("a", 3), Some(Value::Int(1)));
    assert_eq!(bindings.iter().collect::<Vec<_>>(), vec![("a", &Value::Int(3)), ("b", &Value::Int(2))]);
    assert_eq!(bindings.remove("a"), Some(Value::Int(3)));
    assert_eq!(bindings.len(), 1);
  }

  #[test]
  fn duplicate_names_collapse_into_one_binding() {
    let pairs = vec![
      ("phone".to_string(), Value::from("1")),
      ("city".to_string(), Value::from("Tver")),
      ("phone".to_string(), Value::from("2")),
    ];
    let bindings = ParameterBindings::from(pairs);
    let expected = ParameterBindings::new().with("phone", "2").with("city", "Tver");

    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings, expected);
    assert_eq!(expected, bindings);
    assert_eq!(hash_of(&bindings), hash_of(&expected));
  }

  #[cfg(feature = "serde")]
  #[test]
  fn deserializing_duplicate_names_keeps_the_last_value() {
    let bindings: ParameterBindings =
      serde_json::from_str(r#"[["phone",{"Text":"1"}],["phone",{"Text":"2"}]]"#).unwrap();
    assert_eq!(bindings, ParameterBindings::new().with("phone", "2"));
    assert_eq!(bindings.len(), 1);

    let json = serde_json::to_string(&bindings).unwrap();
    assert_eq!(json, r#"[["phone",{"Text":"2"}]]"#);
  }

  #[test]
  fn display_lists_pairs_in_order() {
    let bindings: ParameterBindings = [("phone", Value::from("555")), ("id", Value::from(7))].into_iter().collect();
    assert_eq!(bindings.to_string(), "{phone=\"555\", id=7}");
  }
}
