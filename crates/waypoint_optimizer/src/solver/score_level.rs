#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLevel {
    /// Feasibility, any positive value makes a tour infeasible.
    Hard,
    Soft,
}
