use crate::distributor::EventDistributor;

/// Quick-settings panel binding.
///
/// The panel does its own layout and rendering; the registry only hands it
/// the event distributor once and asks it to refresh after each rebuild.
pub trait QsPanel {
    /// Called once, on the first successful rebuild
    fn set_event_distributor(&mut self, distributor: EventDistributor);

    /// Called after every committed rebuild
    fn update_resources(&mut self);
}
