/// A step of an encode or decode run, in the order it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadCover,
    LoadPayload,
    Encrypt,
    BuildMetadata,
    Embed,
    Save,
    LoadStego,
    Extract,
    Decrypt,
    WritePayload,
    Done,
}

impl Stage {
    /// Fraction of the run completed when this stage starts.
    pub fn fraction(self) -> f64 {
        match self {
            Stage::LoadCover => 0.05,
            Stage::LoadPayload => 0.15,
            Stage::Encrypt => 0.30,
            Stage::BuildMetadata => 0.45,
            Stage::Embed => 0.60,
            Stage::Save => 0.85,
            Stage::LoadStego => 0.05,
            Stage::Extract => 0.20,
            Stage::Decrypt => 0.50,
            Stage::WritePayload => 0.75,
            Stage::Done => 1.0,
        }
    }
}

/// Observer for the stages of an encode or decode.
///
/// Implement this to drive a progress display from a front end. Calls happen
/// on whatever thread runs the pipeline; an implementation that touches UI
/// state is responsible for marshalling back to its own thread.
///
/// # Example
///
/// ```rust
/// use lsbvault::{ProgressHook, Stage};
///
/// struct PrintHook;
///
/// impl ProgressHook for PrintHook {
///     fn on_progress(&self, stage: Stage) {
///         println!("{:?}: {:.0}%", stage, stage.fraction() * 100.0);
///     }
/// }
/// ```
pub trait ProgressHook {
    /// Called as each stage begins.
    fn on_progress(&self, stage: Stage);

    /// Called once when the run ends, with a short status message.
    fn on_finished(&self, _success: bool, _message: &str) {}
}

/// A hook that ignores every notification.
///
/// Used as the default when no progress reporting is needed.
pub struct NoopHook;

impl ProgressHook for NoopHook {
    fn on_progress(&self, _stage: Stage) {}
}
