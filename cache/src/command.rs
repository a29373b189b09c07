use crate::bindings::ParameterBindings;
use crate::query_cache::{Mutation, MutationKind};
use crate::row::ResultRow;
use crate::value::Value;

/// The kind of entity change being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
  Insert,
  Delete,
  Update,
}

/// What a mapping callback reports about one changed entity: the bindings of
/// the cached query it affects and the row that query would return for it.
#[derive(Debug, Clone, Default)]
pub struct Command {
  bindings: ParameterBindings,
  row: Option<ResultRow>,
  unique: bool,
  add: bool,
  remove: bool,
}

impl Command {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
    self.bindings.set(name, value);
    self
  }

  /// Sets the row the entity contributes to the cached result.
  ///
  /// For updates this also marks the row to be appended.
  pub fn add_result(&mut self, row: impl Into<ResultRow>) -> &mut Self {
    self.row = Some(row.into());
    self.add = true;
    self
  }

  /// Sets the row of a query that returns at most one result.
  pub fn set_unique_result(&mut self, row: impl Into<ResultRow>) -> &mut Self {
    self.row = Some(row.into());
    self.unique = true;
    self
  }

  /// Marks `row` to be removed from the cached result on update.
  pub fn remove_result(&mut self, row: impl Into<ResultRow>) -> &mut Self {
    self.row = Some(row.into());
    self.remove = true;
    self
  }

  pub fn bindings(&self) -> &ParameterBindings {
    &self.bindings
  }

  pub fn row(&self) -> Option<&ResultRow> {
    self.row.as_ref()
  }

  pub fn is_unique_result(&self) -> bool {
    self.unique
  }

  pub fn should_add(&self) -> bool {
    self.add
  }

  pub fn should_remove(&self) -> bool {
    self.remove
  }

  /// Translates the command into the mutations to apply for `change`.
  ///
  /// A command without a row yields nothing. An update of a unique result
  /// replaces it, keeping the row unless it was marked for removal; any
  /// other update appends and then removes as marked.
  pub fn into_mutations(self, change: ChangeKind) -> Vec<Mutation> {
    let Some(row) = self.row else {
      return Vec::new();
    };

    let kinds: Vec<MutationKind> = match change {
      ChangeKind::Insert if self.unique => vec![MutationKind::ReplaceUnique { add: true }],
      ChangeKind::Insert => vec![MutationKind::Add],
      ChangeKind::Delete => vec![MutationKind::Remove],
      ChangeKind::Update if self.unique => vec![MutationKind::ReplaceUnique { add: !self.remove }],
      ChangeKind::Update => {
        let mut kinds = Vec::with_capacity(2);
        if self.add {
          kinds.push(MutationKind::Add);
        }
        if self.remove {
          kinds.push(MutationKind::Remove);
        }
        kinds
      }
    };

    kinds
      .into_iter()
      .map(|kind| Mutation::new(self.bindings.clone(), row.clone(), kind))
      .collect()
  }
}
