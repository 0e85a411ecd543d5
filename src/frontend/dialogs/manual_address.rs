//! Manual station address dialog
//!
//! Shown when the scan finds nothing. Accepts an IPv4/IPv6 address or a
//! `host[:port]`; schemes and paths are rejected because the endpoint path
//! is appended by the client.

use super::{Dialog, DialogAction, DialogState, DialogWindowConfig};
use egui::{Color32, Key, Ui};
use std::net::{IpAddr, SocketAddr};

/// State for the manual address dialog
#[derive(Debug, Default)]
pub struct ManualAddressState {
    pub input: String,
    pub error: Option<String>,
}

impl DialogState for ManualAddressState {
    fn is_valid(&self) -> bool {
        validate_address(&self.input).is_ok()
    }
}

/// Action from the manual address dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualAddressAction {
    Connect(String),
    Cancel,
}

/// Context for rendering
pub struct ManualAddressContext<'a> {
    /// Address tried last, shown as a hint
    pub last_address: Option<&'a str>,
}

/// The manual address dialog
pub struct ManualAddressDialog;

impl Dialog for ManualAddressDialog {
    type State = ManualAddressState;
    type Action = ManualAddressAction;
    type Context<'a> = ManualAddressContext<'a>;

    fn title(_state: &Self::State) -> &'static str {
        "Station Address"
    }

    fn window_config() -> DialogWindowConfig {
        DialogWindowConfig::centered_modal(320.0)
    }

    fn render(
        state: &mut Self::State,
        ctx: Self::Context<'_>,
        ui: &mut Ui,
    ) -> DialogAction<Self::Action> {
        ui.label("The station was not found on the network.");
        ui.label("Enter its IP address:");

        let response = ui.add(
            egui::TextEdit::singleline(&mut state.input)
                .hint_text(ctx.last_address.unwrap_or("192.168.1.50"))
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            state.error = None;
        }
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));

        if let Some(error) = &state.error {
            ui.colored_label(Color32::LIGHT_RED, error);
        }

        ui.separator();

        let mut action = DialogAction::None;
        ui.horizontal(|ui| {
            let connect = ui
                .add_enabled(!state.input.trim().is_empty(), egui::Button::new("Connect"))
                .clicked();

            if connect || submitted {
                match validate_address(&state.input) {
                    Ok(address) => {
                        action = DialogAction::CloseWithAction(ManualAddressAction::Connect(address))
                    }
                    Err(reason) => state.error = Some(reason),
                }
            }

            if ui.button("Cancel").clicked() {
                action = DialogAction::CloseWithAction(ManualAddressAction::Cancel);
            }
        });

        action
    }
}

/// Normalize and check a typed address
///
/// Returns the trimmed address or a one-line reason it was rejected.
pub fn validate_address(input: &str) -> Result<String, String> {
    let address = input.trim();

    if address.is_empty() {
        return Err("Enter an address".to_string());
    }
    if address.contains("://") || address.contains('/') {
        return Err("Enter only the address, without http:// or a path".to_string());
    }
    if address.parse::<IpAddr>().is_ok() || address.parse::<SocketAddr>().is_ok() {
        return Ok(address.to_string());
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (address, None),
    };

    if let Some(port) = port {
        if port.parse::<u16>().map(|p| p == 0).unwrap_or(true) {
            return Err(format!("Invalid port: {}", port));
        }
    }

    if is_hostname(host) {
        Ok(address.to_string())
    } else {
        Err(format!("Not a valid address: {}", address))
    }
}

fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
