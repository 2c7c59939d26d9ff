use oba_experiment::MarkerSink;

/// Stand-in for the amplifier link: annotations go to the console so a
/// session transcript still shows where each trial began.
#[derive(Debug, Default)]
pub struct ConsoleMarker;

impl MarkerSink for ConsoleMarker {
    fn send_marker(&mut self, label: &str) {
        println!("[marker] {label}");
    }
}
