/// Subscriber to raw connectivity transitions. The sync scheduler registers
/// one of these so connectivity-restored events can trigger a drain without
/// binding the tracker to any platform event source.
pub trait ConnectivityObserver: Send + Sync {
    fn connectivity_changed(&self, online: bool);
}
