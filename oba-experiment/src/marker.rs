/// Fire-and-forget annotation sink for the recording hardware. The real
/// amplifier link lives behind this trait; the controller only ever labels
/// trial onsets with it.
pub trait MarkerSink {
    fn send_marker(&mut self, label: &str);
}

/// Sink used when hardware recording is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMarker;

impl MarkerSink for NullMarker {
    fn send_marker(&mut self, _label: &str) {}
}

impl<M: MarkerSink + ?Sized> MarkerSink for Box<M> {
    fn send_marker(&mut self, label: &str) {
        (**self).send_marker(label);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::MarkerSink;

    /// Records every label it receives, for controller tests.
    #[derive(Debug, Default)]
    pub struct RecordingMarker {
        pub labels: Vec<String>,
    }

    impl MarkerSink for RecordingMarker {
        fn send_marker(&mut self, label: &str) {
            self.labels.push(label.to_string());
        }
    }
}
