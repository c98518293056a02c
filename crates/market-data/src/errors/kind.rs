/// Classification of why a provider declined a request.
///
/// Every decline makes the orchestrator move on to the next provider; the
/// class only decides how the decline is logged and counted.
///
/// # Behavior Summary
///
/// | Class | Reached the network? | Counted as |
/// |-------|----------------------|------------|
/// | `Unconfigured` | No | skip |
/// | `CoverageGap` | No | skip |
/// | `Transient` | Yes (or tried to) | failure |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The provider has no credential configured and disables itself.
    Unconfigured,

    /// The provider structurally cannot serve this symbol or operation
    /// (e.g. a Turkish ticker on a US-only API).
    CoverageGap,

    /// Timeout, HTTP error, rate limit, malformed or empty payload.
    /// Another provider, or the same one later, may succeed.
    Transient,
}
