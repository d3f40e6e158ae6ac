/// Generic result type for component key handling.
///
/// Standardizes how overlay components report key handling back to the
/// view that owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for the parent to handle
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try the next handler
  NotHandled,
}
