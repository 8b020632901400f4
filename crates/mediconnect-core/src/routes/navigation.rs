use tokio::sync::mpsc;
use tracing::debug;

/// Entry point for signing in
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationCommand {
    /// Replace the current location with `to`
    Redirect { to: String },
}

/// Sends navigation commands to whatever front end owns the location.
#[derive(Clone)]
pub struct Navigator {
    tx: Option<mpsc::UnboundedSender<NavigationCommand>>,
}

impl Navigator {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NavigationCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A navigator whose commands go nowhere
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn redirect(&self, to: &str) {
        debug!(to = to, "Navigation requested");
        if let Some(ref tx) = self.tx {
            // Receiver gone means nobody is displaying anything
            let _ = tx.send(NavigationCommand::Redirect { to: to.to_string() });
        }
    }

    pub fn redirect_to_login(&self) {
        self.redirect(LOGIN_PATH);
    }
}
