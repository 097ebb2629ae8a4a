pub mod aligner;
pub mod buffer;
pub mod marker;
pub mod monitor;
pub mod source;
pub mod synth;
pub mod types;

pub use aligner::{AlignerConfig, AlignerHandle, StreamAligner};
pub use buffer::{RecordingBuffer, SessionSnapshot};
pub use marker::{marker_channel, MarkerInlet, MarkerOutlet};
pub use monitor::{MonitorConfig, MonitorState, SessionMonitor};
pub use source::{MarkerSource, SampleSource, StreamMeta};
pub use synth::{SynthConfig, SyntheticSampleSource};
pub use types::{LabeledSample, MarkerEvent, Sample, NO_MARKER_LABEL};
