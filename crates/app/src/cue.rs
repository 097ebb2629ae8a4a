/// Seam to the visual stimulus presenter. The real full-screen prompt UI is
/// a separate process; the recorder only needs somewhere to send cue
/// transitions, so the default implementation just logs them.
pub trait CuePresenter: Send + Sync {
    fn task_cue(&self, task: &str, trial: u32, total: u32);
    fn rest_cue(&self);
    fn session_complete(&self);
    fn session_stopped(&self);
}

pub struct LogPresenter;

impl CuePresenter for LogPresenter {
    fn task_cue(&self, task: &str, trial: u32, total: u32) {
        tracing::info!(trial, total, "Imagine: {task}");
    }

    fn rest_cue(&self) {
        tracing::info!("Rest");
    }

    fn session_complete(&self) {
        tracing::info!("Training complete");
    }

    fn session_stopped(&self) {
        tracing::info!("Training stopped");
    }
}
