//! Dialog trait system for unified dialog management
//!
//! Each dialog implements the `Dialog` trait, encapsulating its state,
//! actions, and rendering. [`show_dialog`] drives the open/close lifecycle.

use egui::{Align2, Context, Ui};

/// Actions that a dialog can return after rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogAction<A> {
    /// Keep the dialog open, no action needed
    #[default]
    None,
    /// Close the dialog without performing any action
    Close,
    /// Close the dialog and perform the specified action
    CloseWithAction(A),
    /// Keep the dialog open but perform the specified action
    Action(A),
}

impl<A> DialogAction<A> {
    /// Check if the action indicates the dialog should close
    pub fn should_close(&self) -> bool {
        matches!(self, DialogAction::Close | DialogAction::CloseWithAction(_))
    }

    /// Extract the action if present
    pub fn into_action(self) -> Option<A> {
        match self {
            DialogAction::CloseWithAction(a) | DialogAction::Action(a) => Some(a),
            _ => None,
        }
    }
}

/// Lifecycle hooks for dialog state
pub trait DialogState: Default {
    /// Reset the dialog state to its default values
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check if the dialog has valid data to proceed with its action
    fn is_valid(&self) -> bool {
        true
    }
}

/// Configuration for dialog window appearance and behavior
#[derive(Debug, Clone)]
pub struct DialogWindowConfig {
    pub default_width: f32,
    pub resizable: bool,
    /// Optional anchor position (alignment and offset)
    pub anchor: Option<(Align2, [f32; 2])>,
    /// Block the rest of the UI until dismissed
    pub modal: bool,
}

impl Default for DialogWindowConfig {
    fn default() -> Self {
        Self {
            default_width: 400.0,
            resizable: true,
            anchor: None,
            modal: false,
        }
    }
}

impl DialogWindowConfig {
    /// Create a centered modal dialog configuration
    pub fn centered_modal(width: f32) -> Self {
        Self {
            default_width: width,
            resizable: false,
            anchor: Some((Align2::CENTER_CENTER, [0.0, 0.0])),
            modal: true,
        }
    }
}

/// Main dialog trait for implementing dialogs
pub trait Dialog {
    /// The state type for this dialog
    type State: DialogState;

    /// The action type this dialog can produce
    type Action;

    /// The context type needed to render this dialog
    type Context<'a>;

    /// Get the window title for this dialog
    fn title(state: &Self::State) -> &'static str;

    /// Get the window configuration for this dialog
    fn window_config() -> DialogWindowConfig {
        DialogWindowConfig::default()
    }

    /// Render the dialog content
    fn render(
        state: &mut Self::State,
        ctx: Self::Context<'_>,
        ui: &mut Ui,
    ) -> DialogAction<Self::Action>;
}

/// Show a dialog using the Dialog trait
///
/// Only renders if `is_open` is true. Modal dialogs use [`egui::Modal`] and
/// block input to the rest of the window; the others are regular windows.
/// On close the state is reset.
///
/// Returns `Some(action)` if the dialog produced an action, `None` otherwise.
pub fn show_dialog<D: Dialog>(
    ctx: &Context,
    is_open: &mut bool,
    state: &mut D::State,
    dialog_ctx: D::Context<'_>,
) -> Option<D::Action> {
    if !*is_open {
        return None;
    }

    let config = D::window_config();
    let title = D::title(state);

    let action = if config.modal {
        egui::Modal::new(egui::Id::new(title))
            .show(ctx, |ui| {
                ui.set_width(config.default_width);
                ui.heading(title);
                ui.separator();
                D::render(state, dialog_ctx, ui)
            })
            .inner
    } else {
        let mut window = egui::Window::new(title)
            .collapsible(false)
            .resizable(config.resizable)
            .default_width(config.default_width);

        if let Some((align, offset)) = config.anchor {
            window = window.anchor(align, offset);
        }

        window
            .show(ctx, |ui| D::render(state, dialog_ctx, ui))
            .and_then(|response| response.inner)
            .unwrap_or(DialogAction::None)
    };

    let should_close = action.should_close();
    let result = action.into_action();

    if should_close {
        *is_open = false;
        state.reset();
    }

    result
}

pub mod connection_lost;
pub mod manual_address;

pub use connection_lost::{
    ConnectionLostAction, ConnectionLostContext, ConnectionLostDialog, ConnectionLostState,
};
pub use manual_address::{
    validate_address, ManualAddressAction, ManualAddressContext, ManualAddressDialog,
    ManualAddressState,
};
