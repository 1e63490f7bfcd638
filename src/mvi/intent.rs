/// Marker trait for intents.
///
/// Intents represent user actions and the results of side effects. Reducers
/// consume them to produce new states.
pub trait Intent: Send + 'static {}
