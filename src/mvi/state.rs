/// Marker trait for feature state.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Comparable (PartialEq so unchanged writes record nothing)
pub trait State: Clone + PartialEq + Default + Send + Sync + 'static {}
