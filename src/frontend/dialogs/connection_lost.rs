//! Connection lost acknowledgment
//!
//! Modal shown once per `Connected -> Disconnected` transition. The app
//! closes it on its own when the station comes back.

use super::{Dialog, DialogAction, DialogState, DialogWindowConfig};
use egui::{RichText, Ui};

#[derive(Debug, Default)]
pub struct ConnectionLostState {
    pub reason: String,
}

impl DialogState for ConnectionLostState {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionLostAction {
    Acknowledge,
}

/// Context for rendering (none needed for this simple dialog)
pub struct ConnectionLostContext;

pub struct ConnectionLostDialog;

impl Dialog for ConnectionLostDialog {
    type State = ConnectionLostState;
    type Action = ConnectionLostAction;
    type Context<'a> = ConnectionLostContext;

    fn title(_state: &Self::State) -> &'static str {
        "Connection Lost"
    }

    fn window_config() -> DialogWindowConfig {
        DialogWindowConfig::centered_modal(340.0)
    }

    fn render(
        state: &mut Self::State,
        _ctx: Self::Context<'_>,
        ui: &mut Ui,
    ) -> DialogAction<Self::Action> {
        ui.label("Lost connection to the weather station.");
        if !state.reason.is_empty() {
            ui.label(RichText::new(&state.reason).small().weak());
        }
        ui.label("Polling continues in the background.");

        ui.separator();

        if ui.button("OK").clicked() {
            DialogAction::CloseWithAction(ConnectionLostAction::Acknowledge)
        } else {
            DialogAction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledge_closes_modal() {
        let config = ConnectionLostDialog::window_config();
        assert!(config.modal);

        let action = DialogAction::CloseWithAction(ConnectionLostAction::Acknowledge);
        assert!(action.should_close());
        assert_eq!(action.into_action(), Some(ConnectionLostAction::Acknowledge));
    }
}
