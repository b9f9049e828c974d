/// Why an optimistic slot access could not complete.
///
/// Callers treat both variants the same way: back off and retry the
/// whole operation against a fresh version snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Contention {
    /// A writer holds the version lock.
    Locked,
    /// The version changed between snapshot and validation.
    VersionChanged,
}
