use crate::command::Command;
use crate::error::CallbackError;

/// Maps a changed entity of type `T` onto the cached query it affects.
///
/// Every hook has an empty default, so a callback only implements the
/// changes it cares about. `common_params` runs first for every change and
/// is the place to bind parameters shared by all kinds.
///
/// ```
/// use latchkey_cache::{CacheCallback, Command, CallbackError};
///
/// struct Person { id: i64, phone: String }
///
/// struct ByPhone;
///
/// impl CacheCallback<Person> for ByPhone {
///   fn on_insert_or_delete(&self, command: &mut Command, person: &Person) -> Result<(), CallbackError> {
///     command.set_parameter("phone", person.phone.as_str()).add_result(person.id);
///     Ok(())
///   }
/// }
/// ```
pub trait CacheCallback<T>: Send + Sync {
  fn common_params(&self, _command: &mut Command, _entity: &T) -> Result<(), CallbackError> {
    Ok(())
  }

  fn on_insert_or_delete(&self, _command: &mut Command, _entity: &T) -> Result<(), CallbackError> {
    Ok(())
  }

  fn on_update(&self, _command: &mut Command, _entity: &T) -> Result<(), CallbackError> {
    Ok(())
  }
}

/// A plain closure handles inserts and deletes.
impl<T, F> CacheCallback<T> for F
where
  F: Fn(&mut Command, &T) -> Result<(), CallbackError> + Send + Sync,
{
  fn on_insert_or_delete(&self, command: &mut Command, entity: &T) -> Result<(), CallbackError> {
    self(command, entity)
  }
}
