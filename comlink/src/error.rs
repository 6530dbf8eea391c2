use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors reported by a network controller.
pub enum NicError {
    #[error("Controller has no room for another frame")]
    Busy,
    #[error("Frame does not fit in the buffer")]
    /// The frame was consumed from the controller but discarded.
    Oversized,
    #[error("Controller reported a hardware error")]
    Hardware,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogError {
    #[error("No timer left")]
    Exhausted,
    #[error("Timer does not exist")]
    UnknownTimer,
}

pub type WatchdogResult<T> = Result<T, WatchdogError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComlinkError {
    #[error("No network interface to drive")]
    NoInterfaces,
    #[error("Configuration is invalid")]
    InvalidConfig,
    #[error("Unknown device")]
    UnknownDevice,
    #[error("Interface is already up")]
    AlreadyUp,
    #[error("Cannot attach the interrupt line: {0}")]
    IrqAttach(NicError),
    #[error("Watchdog error: {0}")]
    Watchdog(#[from] WatchdogError),
    #[error("Hardware error: {0}")]
    Hardware(#[from] NicError),
}

pub type ComlinkResult<T> = Result<T, ComlinkError>;
