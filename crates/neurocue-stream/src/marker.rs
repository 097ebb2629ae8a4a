use crossbeam_channel::{Receiver, Sender, TryRecvError};

use neurocue_foundation::{SharedClock, SourceError};

use crate::source::MarkerSource;
use crate::types::MarkerEvent;

/// Fire-and-forget marker push for the stimulus side. Cloneable so the
/// schedule runner and the controller can both emit. Events are stamped at
/// emit time on the shared clock.
#[derive(Clone)]
pub struct MarkerOutlet {
    tx: Sender<MarkerEvent>,
    clock: SharedClock,
}

impl MarkerOutlet {
    pub fn emit(&self, label: impl Into<String>) {
        let event = MarkerEvent::new(self.clock.now_secs(), label);
        tracing::debug!(label = %event.label, timestamp = event.timestamp, "marker emitted");
        if self.tx.send(event).is_err() {
            // Recorder already gone; the stimulus loop must never block or
            // fail on this.
            tracing::warn!("marker dropped, recording side disconnected");
        }
    }
}

/// Receiving end consumed by the aligner, single consumer by design.
pub struct MarkerInlet {
    rx: Receiver<MarkerEvent>,
    outlet_gone: bool,
}

impl MarkerSource for MarkerInlet {
    fn poll_nonblocking(&mut self) -> Result<Option<MarkerEvent>, SourceError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                // All outlets dropped: the stimulus loop has finished. The
                // marker stream simply ended; this is not a lost source, and
                // the grace-period tail still has to run.
                if !self.outlet_gone {
                    self.outlet_gone = true;
                    tracing::debug!("marker outlet closed, no further markers expected");
                }
                Ok(None)
            }
        }
    }
}

/// In-process marker channel: foreground stimulus loop -> aligner.
pub fn marker_channel(clock: SharedClock) -> (MarkerOutlet, MarkerInlet) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        MarkerOutlet { tx, clock },
        MarkerInlet {
            rx,
            outlet_gone: false,
        },
    )
}
